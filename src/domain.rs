use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

/// Region dimension seed: (code, description). Fixed by the business; rows
/// are never created from incoming data.
pub const REGION_SEED: [(&str, &str); 3] = [
    ("1", "EMEA"),
    ("2", "Americas"),
    ("4", "Asia Pacific"),
];

/// Which team's export a batch came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DatasetKind {
    Sales,
    Forecast,
}

impl std::fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DatasetKind::Sales => write!(f, "sales"),
            DatasetKind::Forecast => write!(f, "forecast"),
        }
    }
}

/// A loosely-typed cell value as delivered by the extraction boundary.
/// Normalization pattern-matches on the tag explicitly; there is no implicit
/// coercion anywhere downstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    Number(f64),
    Missing,
}

impl FieldValue {
    pub fn is_missing(&self) -> bool {
        matches!(self, FieldValue::Missing)
    }
}

static MISSING: FieldValue = FieldValue::Missing;

/// One source row, column name to untyped value, as emitted by the extraction
/// collaborator. Ephemeral: discarded once a normalized record exists, kept
/// only in the reject audit log otherwise.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawRecord {
    pub fields: HashMap<String, FieldValue>,
    /// File (or collaborator label) the row came from.
    pub source: String,
    /// 1-based row number within the source, for the audit trail.
    pub line: u64,
}

impl RawRecord {
    pub fn field(&self, name: &str) -> &FieldValue {
        self.fields.get(name).unwrap_or(&MISSING)
    }
}

/// Why a single record was excluded. Recovered locally; a reject never aborts
/// the run.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RejectReason {
    #[error("missing required field {0}")]
    MissingRequiredField(String),

    #[error("could not normalize {field}: {raw}")]
    Normalization { field: String, raw: String },

    #[error("net sales exceed gross sales beyond the 1% tolerance")]
    SalesInvariantViolation,

    #[error("invalid decimal in {0}")]
    InvalidDecimal(String),

    #[error("unknown region code {0}")]
    UnknownRegion(String),

    #[error("unresolved dimension for {0}")]
    UnresolvedDimension(String),
}

impl RejectReason {
    /// Stable category label used for quality-report counting.
    pub fn category(&self) -> &'static str {
        match self {
            RejectReason::MissingRequiredField(_) => "MissingRequiredField",
            RejectReason::Normalization { .. } => "NormalizationError",
            RejectReason::SalesInvariantViolation => "SalesInvariantViolation",
            RejectReason::InvalidDecimal(_) => "InvalidDecimal",
            RejectReason::UnknownRegion(_) => "UnknownRegionError",
            RejectReason::UnresolvedDimension(_) => "UnresolvedDimension",
        }
    }
}

/// Canonical business key shared by sales and forecast records. Material
/// numbers are exactly 8 digits, zero-padded; periods are `YYYY.MM`; the
/// region is absent for forecast data.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CanonicalKey {
    pub material_number: String,
    pub period: String,
    pub region_code: Option<String>,
}

impl std::fmt::Display for CanonicalKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.region_code {
            Some(region) => write!(f, "{}/{}/{}", self.material_number, self.period, region),
            None => write!(f, "{}/{}", self.material_number, self.period),
        }
    }
}

/// A sales row that has passed every validation stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedSales {
    pub material_number: String,
    pub period: String,
    pub year: i32,
    pub region_code: String,
    pub gross_sales: Decimal,
    pub net_sales: Decimal,
}

impl NormalizedSales {
    pub fn canonical_key(&self) -> CanonicalKey {
        CanonicalKey {
            material_number: self.material_number.clone(),
            period: self.period.clone(),
            region_code: Some(self.region_code.clone()),
        }
    }
}

/// A forecast row that has passed every validation stage. The period is
/// derived from the YEAR column as `YYYY.01`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedForecast {
    pub material_number: String,
    pub period: String,
    pub year: i32,
    pub forecast_value: Decimal,
}

impl NormalizedForecast {
    pub fn canonical_key(&self) -> CanonicalKey {
        CanonicalKey {
            material_number: self.material_number.clone(),
            period: self.period.clone(),
            region_code: None,
        }
    }
}

/// Material dimension row. Created on first encounter, immutable thereafter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimMaterial {
    pub material_id: i64,
    pub material_number: String,
}

/// Time dimension row; the year is derived from the period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimTime {
    pub time_id: i64,
    pub period: String,
    pub year: i32,
}

/// Region dimension row. Pre-seeded from [`REGION_SEED`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimRegion {
    pub region_id: i64,
    pub region_code: String,
    pub region_description: String,
}

/// Sales fact row ready for load. The surrogate primary key is assigned by
/// the store on insert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactSales {
    pub material_id: i64,
    pub time_id: i64,
    pub region_code: String,
    pub gross_sales: Decimal,
    pub net_sales: Decimal,
}

/// Forecast fact row ready for load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactForecast {
    pub material_id: i64,
    pub time_id: i64,
    pub forecast_value: Decimal,
}

/// Per-batch, per-stage validation outcome summary. Write-once; consumed by
/// the reporting sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    pub stage: String,
    pub total_in: u64,
    pub total_accepted: u64,
    pub total_rejected: u64,
    pub rejection_reasons: BTreeMap<String, u64>,
}
