//! Persistence boundary for the star schema. The store only executes
//! mechanical lookups and inserts; the get-or-create decision (and therefore
//! surrogate-id ownership) lives in the dimension resolver.

use crate::domain::{DimMaterial, DimRegion, DimTime, FactForecast, FactSales, REGION_SEED};
use crate::error::Result;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

pub trait Store {
    fn find_material(&self, material_number: &str) -> Result<Option<i64>>;
    fn insert_material(&mut self, material_number: &str) -> Result<i64>;

    fn find_time(&self, period: &str) -> Result<Option<i64>>;
    fn insert_time(&mut self, period: &str, year: i32) -> Result<i64>;

    /// Region rows are seeded, never inserted from data.
    fn find_region(&self, region_code: &str) -> Result<Option<i64>>;

    fn insert_sales_facts(&mut self, facts: &[FactSales]) -> Result<usize>;
    fn insert_forecast_facts(&mut self, facts: &[FactForecast]) -> Result<usize>;
}

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS dim_material (
    material_id     INTEGER PRIMARY KEY AUTOINCREMENT,
    material_number TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS dim_time (
    time_id INTEGER PRIMARY KEY AUTOINCREMENT,
    period  TEXT NOT NULL UNIQUE,
    year    INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS dim_region (
    region_id          INTEGER PRIMARY KEY AUTOINCREMENT,
    region_code        TEXT NOT NULL UNIQUE,
    region_description TEXT NOT NULL
);

INSERT OR IGNORE INTO dim_region (region_code, region_description) VALUES
    ('1', 'EMEA'),
    ('2', 'Americas'),
    ('4', 'Asia Pacific');

CREATE TABLE IF NOT EXISTS fact_sales (
    sales_id    INTEGER PRIMARY KEY AUTOINCREMENT,
    material_id INTEGER NOT NULL REFERENCES dim_material(material_id),
    time_id     INTEGER NOT NULL REFERENCES dim_time(time_id),
    region_code TEXT NOT NULL REFERENCES dim_region(region_code),
    gross_sales DECIMAL(18,2) NOT NULL,
    net_sales   DECIMAL(18,2) NOT NULL
);

CREATE TABLE IF NOT EXISTS fact_forecast (
    forecast_id    INTEGER PRIMARY KEY AUTOINCREMENT,
    material_id    INTEGER NOT NULL REFERENCES dim_material(material_id),
    time_id        INTEGER NOT NULL REFERENCES dim_time(time_id),
    forecast_value DECIMAL(18,2) NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_dim_region_code ON dim_region(region_code);
CREATE INDEX IF NOT EXISTS idx_fact_sales_material ON fact_sales(material_id);
CREATE INDEX IF NOT EXISTS idx_fact_sales_time ON fact_sales(time_id);
CREATE INDEX IF NOT EXISTS idx_fact_sales_region ON fact_sales(region_code);
CREATE INDEX IF NOT EXISTS idx_fact_forecast_material ON fact_forecast(material_id);
CREATE INDEX IF NOT EXISTS idx_fact_forecast_time ON fact_forecast(time_id);

CREATE VIEW IF NOT EXISTS vw_sales_vs_forecast AS
SELECT
    s.sales_id,
    m.material_number,
    t.period,
    t.year,
    s.region_code,
    CASE s.region_code
        WHEN '1' THEN 'EMEA'
        WHEN '2' THEN 'Americas'
        WHEN '4' THEN 'Asia Pacific'
    END AS region_description,
    s.gross_sales,
    s.net_sales,
    f.forecast_value,
    CASE
        WHEN f.forecast_value IS NULL OR CAST(f.forecast_value AS REAL) = 0.0 THEN NULL
        ELSE ROUND((CAST(s.net_sales AS REAL) - CAST(f.forecast_value AS REAL))
                   / CAST(f.forecast_value AS REAL) * 100, 2)
    END AS variance_percentage
FROM fact_sales s
JOIN dim_material m ON m.material_id = s.material_id
JOIN dim_time t ON t.time_id = s.time_id
LEFT JOIN fact_forecast f
    ON f.material_id = s.material_id
   AND f.time_id = s.time_id;
"#;

/// SQLite-backed star schema store.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        info!("star schema ready");
        Ok(Self { conn })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn materials(&self) -> Result<Vec<DimMaterial>> {
        let mut stmt = self
            .conn
            .prepare("SELECT material_id, material_number FROM dim_material ORDER BY material_id")?;
        let rows = stmt
            .query_map([], |row| {
                Ok(DimMaterial {
                    material_id: row.get(0)?,
                    material_number: row.get(1)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn times(&self) -> Result<Vec<DimTime>> {
        let mut stmt = self
            .conn
            .prepare("SELECT time_id, period, year FROM dim_time ORDER BY time_id")?;
        let rows = stmt
            .query_map([], |row| {
                Ok(DimTime {
                    time_id: row.get(0)?,
                    period: row.get(1)?,
                    year: row.get(2)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn regions(&self) -> Result<Vec<DimRegion>> {
        let mut stmt = self.conn.prepare(
            "SELECT region_id, region_code, region_description FROM dim_region ORDER BY region_id",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok(DimRegion {
                    region_id: row.get(0)?,
                    region_code: row.get(1)?,
                    region_description: row.get(2)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }
}

impl Store for SqliteStore {
    fn find_material(&self, material_number: &str) -> Result<Option<i64>> {
        let id = self
            .conn
            .query_row(
                "SELECT material_id FROM dim_material WHERE material_number = ?1",
                params![material_number],
                |row| row.get(0),
            )
            .optional()?;
        Ok(id)
    }

    fn insert_material(&mut self, material_number: &str) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO dim_material (material_number) VALUES (?1)",
            params![material_number],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn find_time(&self, period: &str) -> Result<Option<i64>> {
        let id = self
            .conn
            .query_row(
                "SELECT time_id FROM dim_time WHERE period = ?1",
                params![period],
                |row| row.get(0),
            )
            .optional()?;
        Ok(id)
    }

    fn insert_time(&mut self, period: &str, year: i32) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO dim_time (period, year) VALUES (?1, ?2)",
            params![period, year],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn find_region(&self, region_code: &str) -> Result<Option<i64>> {
        let id = self
            .conn
            .query_row(
                "SELECT region_id FROM dim_region WHERE region_code = ?1",
                params![region_code],
                |row| row.get(0),
            )
            .optional()?;
        Ok(id)
    }

    fn insert_sales_facts(&mut self, facts: &[FactSales]) -> Result<usize> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO fact_sales (material_id, time_id, region_code, gross_sales, net_sales)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for fact in facts {
                stmt.execute(params![
                    fact.material_id,
                    fact.time_id,
                    fact.region_code,
                    fact.gross_sales.to_string(),
                    fact.net_sales.to_string(),
                ])?;
            }
        }
        tx.commit()?;
        debug!(rows = facts.len(), "inserted sales facts");
        Ok(facts.len())
    }

    fn insert_forecast_facts(&mut self, facts: &[FactForecast]) -> Result<usize> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO fact_forecast (material_id, time_id, forecast_value)
                 VALUES (?1, ?2, ?3)",
            )?;
            for fact in facts {
                stmt.execute(params![
                    fact.material_id,
                    fact.time_id,
                    fact.forecast_value.to_string(),
                ])?;
            }
        }
        tx.commit()?;
        debug!(rows = facts.len(), "inserted forecast facts");
        Ok(facts.len())
    }
}

/// In-memory store for development and tests; mirrors the SQLite layout.
pub struct InMemoryStore {
    materials: HashMap<String, i64>,
    times: HashMap<String, (i64, i32)>,
    regions: HashMap<String, i64>,
    pub sales_facts: Vec<FactSales>,
    pub forecast_facts: Vec<FactForecast>,
    next_material_id: i64,
    next_time_id: i64,
}

impl InMemoryStore {
    pub fn new() -> Self {
        let regions = REGION_SEED
            .iter()
            .enumerate()
            .map(|(idx, (code, _))| (code.to_string(), idx as i64 + 1))
            .collect();
        Self {
            materials: HashMap::new(),
            times: HashMap::new(),
            regions,
            sales_facts: Vec::new(),
            forecast_facts: Vec::new(),
            next_material_id: 1,
            next_time_id: 1,
        }
    }

    pub fn material_count(&self) -> usize {
        self.materials.len()
    }

    pub fn time_count(&self) -> usize {
        self.times.len()
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Store for InMemoryStore {
    fn find_material(&self, material_number: &str) -> Result<Option<i64>> {
        Ok(self.materials.get(material_number).copied())
    }

    fn insert_material(&mut self, material_number: &str) -> Result<i64> {
        let id = self.next_material_id;
        self.next_material_id += 1;
        self.materials.insert(material_number.to_string(), id);
        Ok(id)
    }

    fn find_time(&self, period: &str) -> Result<Option<i64>> {
        Ok(self.times.get(period).map(|(id, _)| *id))
    }

    fn insert_time(&mut self, period: &str, year: i32) -> Result<i64> {
        let id = self.next_time_id;
        self.next_time_id += 1;
        self.times.insert(period.to_string(), (id, year));
        Ok(id)
    }

    fn find_region(&self, region_code: &str) -> Result<Option<i64>> {
        Ok(self.regions.get(region_code).copied())
    }

    fn insert_sales_facts(&mut self, facts: &[FactSales]) -> Result<usize> {
        self.sales_facts.extend_from_slice(facts);
        Ok(facts.len())
    }

    fn insert_forecast_facts(&mut self, facts: &[FactForecast]) -> Result<usize> {
        self.forecast_facts.extend_from_slice(facts);
        Ok(facts.len())
    }
}
