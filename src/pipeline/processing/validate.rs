//! Batch validation. Each record runs a staged admission pipeline that
//! short-circuits at the first failing stage; the batch as a whole always
//! runs to completion, so one malformed row never blocks the rest.

use crate::domain::{NormalizedForecast, NormalizedSales, RawRecord, RejectReason};
use crate::pipeline::processing::normalize;
use rust_decimal::Decimal;
use tracing::debug;

/// Columns a sales row must carry, post header-aliasing.
pub const SALES_REQUIRED_COLUMNS: [&str; 5] = [
    "PERIOD",
    "MATERIAL_NBR",
    "GROSS_SALES",
    "NET_SALES",
    "REGION_CODE",
];

/// Columns a forecast row must carry, post header-aliasing.
pub const FORECAST_REQUIRED_COLUMNS: [&str; 3] = ["MATERIAL_NUMBER", "YEAR", "FORECAST_VAL"];

/// A single business rule. Rules are independent of each other; new ones are
/// added by appending to the validator's sequence, not by editing existing
/// rules.
pub trait Rule<T>: Send + Sync {
    fn check(&self, record: &T) -> Result<(), RejectReason>;
}

/// Net sales may exceed gross sales by at most the configured tolerance
/// (inclusive boundary).
pub struct SalesToleranceRule {
    tolerance: Decimal,
}

impl SalesToleranceRule {
    pub fn new(tolerance: Decimal) -> Self {
        Self { tolerance }
    }
}

impl Default for SalesToleranceRule {
    fn default() -> Self {
        // 1% business tolerance
        Self::new(Decimal::new(1, 2))
    }
}

impl Rule<NormalizedSales> for SalesToleranceRule {
    fn check(&self, record: &NormalizedSales) -> Result<(), RejectReason> {
        let limit = record.gross_sales * (Decimal::ONE + self.tolerance);
        if record.net_sales <= limit {
            Ok(())
        } else {
            Err(RejectReason::SalesInvariantViolation)
        }
    }
}

/// Accepted records plus every reject with the first reason that disqualified
/// it. Rejected raw records are kept whole for the audit trail.
pub struct ValidationOutcome<T> {
    pub accepted: Vec<T>,
    pub rejected: Vec<(RawRecord, RejectReason)>,
}

impl<T> Default for ValidationOutcome<T> {
    fn default() -> Self {
        Self {
            accepted: Vec::new(),
            rejected: Vec::new(),
        }
    }
}

pub struct Validator {
    sales_rules: Vec<Box<dyn Rule<NormalizedSales>>>,
    forecast_rules: Vec<Box<dyn Rule<NormalizedForecast>>>,
}

impl Validator {
    pub fn new() -> Self {
        Self {
            sales_rules: vec![Box::new(SalesToleranceRule::default())],
            forecast_rules: Vec::new(),
        }
    }

    /// Append a sales rule to the sequence.
    pub fn with_sales_rule(mut self, rule: Box<dyn Rule<NormalizedSales>>) -> Self {
        self.sales_rules.push(rule);
        self
    }

    /// Append a forecast rule to the sequence.
    pub fn with_forecast_rule(mut self, rule: Box<dyn Rule<NormalizedForecast>>) -> Self {
        self.forecast_rules.push(rule);
        self
    }

    pub fn validate_sales_batch(&self, records: &[RawRecord]) -> ValidationOutcome<NormalizedSales> {
        let mut outcome = ValidationOutcome::default();
        for record in records {
            match self.admit_sales(record) {
                Ok(normalized) => outcome.accepted.push(normalized),
                Err(reason) => {
                    debug!(source = %record.source, line = record.line, %reason, "rejected sales record");
                    outcome.rejected.push((record.clone(), reason));
                }
            }
        }
        outcome
    }

    pub fn validate_forecast_batch(
        &self,
        records: &[RawRecord],
    ) -> ValidationOutcome<NormalizedForecast> {
        let mut outcome = ValidationOutcome::default();
        for record in records {
            match self.admit_forecast(record) {
                Ok(normalized) => outcome.accepted.push(normalized),
                Err(reason) => {
                    debug!(source = %record.source, line = record.line, %reason, "rejected forecast record");
                    outcome.rejected.push((record.clone(), reason));
                }
            }
        }
        outcome
    }

    fn admit_sales(&self, record: &RawRecord) -> Result<NormalizedSales, RejectReason> {
        require_fields(record, &SALES_REQUIRED_COLUMNS)?;
        let material_number = normalize::normalize_material_number(record.field("MATERIAL_NBR"))?;
        let (period, year) = normalize::normalize_period(record.field("PERIOD"))?;
        let region_code = normalize::normalize_region_code(record.field("REGION_CODE"))?;
        let gross_sales = normalize::parse_decimal("GROSS_SALES", record.field("GROSS_SALES"))?;
        let net_sales = normalize::parse_decimal("NET_SALES", record.field("NET_SALES"))?;
        let normalized = NormalizedSales {
            material_number,
            period,
            year,
            region_code,
            gross_sales,
            net_sales,
        };
        for rule in &self.sales_rules {
            rule.check(&normalized)?;
        }
        Ok(normalized)
    }

    fn admit_forecast(&self, record: &RawRecord) -> Result<NormalizedForecast, RejectReason> {
        require_fields(record, &FORECAST_REQUIRED_COLUMNS)?;
        let material_number =
            normalize::normalize_material_number(record.field("MATERIAL_NUMBER"))?;
        let year = normalize::normalize_year(record.field("YEAR"))?;
        let period = normalize::forecast_period(year);
        let forecast_value = normalize::parse_decimal("FORECAST_VAL", record.field("FORECAST_VAL"))?;
        let normalized = NormalizedForecast {
            material_number,
            period,
            year,
            forecast_value,
        };
        for rule in &self.forecast_rules {
            rule.check(&normalized)?;
        }
        Ok(normalized)
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new()
    }
}

fn require_fields(record: &RawRecord, columns: &[&str]) -> Result<(), RejectReason> {
    for column in columns {
        if record.field(column).is_missing() {
            return Err(RejectReason::MissingRequiredField(column.to_string()));
        }
    }
    Ok(())
}
