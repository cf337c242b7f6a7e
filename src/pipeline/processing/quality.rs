//! Quality reporting: per-stage aggregation of validation outcomes, an
//! injected sink for the surrounding monitoring, and the NDJSON reject audit
//! log. Pure consumers; nothing here mutates upstream data.

use crate::domain::{QualityReport, RejectReason};
use crate::error::Result;
use chrono::Utc;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;
use tracing::info;

pub struct QualityReporter;

impl QualityReporter {
    /// Aggregate one batch's outcome at one stage into a write-once report.
    pub fn report<'a, I>(stage: &str, total_in: usize, accepted: usize, rejected: I) -> QualityReport
    where
        I: IntoIterator<Item = &'a RejectReason>,
    {
        let mut rejection_reasons: BTreeMap<String, u64> = BTreeMap::new();
        let mut total_rejected = 0u64;
        for reason in rejected {
            *rejection_reasons
                .entry(reason.category().to_string())
                .or_insert(0) += 1;
            total_rejected += 1;
        }
        QualityReport {
            stage: stage.to_string(),
            total_in: total_in as u64,
            total_accepted: accepted as u64,
            total_rejected,
            rejection_reasons,
        }
    }
}

/// Reporting sink the pipeline emits quality reports into. Injected at
/// construction so tests can capture reports instead of reading logs.
pub trait ReportSink {
    fn emit(&self, report: &QualityReport);
}

/// Emits reports through the process-wide tracing subscriber.
pub struct LogSink;

impl ReportSink for LogSink {
    fn emit(&self, report: &QualityReport) {
        info!(
            stage = %report.stage,
            total_in = report.total_in,
            accepted = report.total_accepted,
            rejected = report.total_rejected,
            reasons = ?report.rejection_reasons,
            "quality report"
        );
    }
}

#[derive(Serialize)]
struct AuditEntry<'a, T: Serialize> {
    stage: &'a str,
    category: &'static str,
    reason: String,
    record: &'a T,
}

/// Append every reject as one JSON line to the dated audit file under
/// `audit_dir`. Rejected records must stay retrievable; dropping them
/// silently is not an option.
pub fn append_rejects<T: Serialize>(
    audit_dir: &Path,
    stage: &str,
    rejected: &[(T, RejectReason)],
) -> Result<()> {
    if rejected.is_empty() {
        return Ok(());
    }
    fs::create_dir_all(audit_dir)?;
    let file_name = format!("rejects_{}.ndjson", Utc::now().format("%Y-%m-%d"));
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(audit_dir.join(file_name))?;
    for (record, reason) in rejected {
        let entry = AuditEntry {
            stage,
            category: reason.category(),
            reason: reason.to_string(),
            record,
        };
        let line = serde_json::to_string(&entry)?;
        writeln!(file, "{}", line)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FieldValue, RawRecord};
    use std::collections::HashMap;

    #[test]
    fn test_report_counts_reasons_per_category() {
        let rejected = vec![
            RejectReason::MissingRequiredField("PERIOD".to_string()),
            RejectReason::MissingRequiredField("NET_SALES".to_string()),
            RejectReason::UnknownRegion("3".to_string()),
        ];
        let report = QualityReporter::report("validate_sales", 10, 7, rejected.iter());

        assert_eq!(report.stage, "validate_sales");
        assert_eq!(report.total_in, 10);
        assert_eq!(report.total_accepted, 7);
        assert_eq!(report.total_rejected, 3);
        assert_eq!(report.rejection_reasons["MissingRequiredField"], 2);
        assert_eq!(report.rejection_reasons["UnknownRegionError"], 1);
    }

    #[test]
    fn test_report_with_clean_batch_has_no_reasons() {
        let report = QualityReporter::report("validate_forecast", 5, 5, std::iter::empty());
        assert_eq!(report.total_rejected, 0);
        assert!(report.rejection_reasons.is_empty());
    }

    #[test]
    fn test_append_rejects_writes_ndjson_lines() {
        let dir = tempfile::tempdir().unwrap();
        let record = RawRecord {
            fields: HashMap::from([(
                "REGION_CODE".to_string(),
                FieldValue::Text("3".to_string()),
            )]),
            source: "sales_test.csv".to_string(),
            line: 4,
        };
        let rejected = vec![(record, RejectReason::UnknownRegion("3".to_string()))];
        append_rejects(dir.path(), "validate_sales", &rejected).unwrap();
        append_rejects(dir.path(), "validate_sales", &rejected).unwrap();

        let file_name = format!("rejects_{}.ndjson", Utc::now().format("%Y-%m-%d"));
        let content = fs::read_to_string(dir.path().join(file_name)).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        let entry: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(entry["stage"], "validate_sales");
        assert_eq!(entry["category"], "UnknownRegionError");
        assert_eq!(entry["record"]["line"], 4);
    }

    #[test]
    fn test_append_rejects_with_nothing_to_write_creates_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let rejected: Vec<(RawRecord, RejectReason)> = Vec::new();
        append_rejects(dir.path(), "validate_sales", &rejected).unwrap();
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
