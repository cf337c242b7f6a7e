//! Batch pipeline: extract, validate, resolve dimensions, build facts, load.
//! Single-threaded and synchronous by design; dimension resolution needs one
//! consistent run-local view of the key-to-id mapping, so batches are
//! processed as whole units.

pub mod processing;

use crate::config::Config;
use crate::domain::{DatasetKind, QualityReport, RawRecord};
use crate::error::Result;
use crate::extract;
use crate::pipeline::processing::facts::FactBuilder;
use crate::pipeline::processing::quality::{self, QualityReporter, ReportSink};
use crate::pipeline::processing::resolve::DimensionResolver;
use crate::pipeline::processing::validate::Validator;
use crate::storage::Store;
use tracing::info;

/// Totals for one completed run, plus every stage report emitted on the way.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub sales_in: u64,
    pub sales_loaded: u64,
    pub sales_rejected: u64,
    pub forecast_in: u64,
    pub forecast_loaded: u64,
    pub forecast_rejected: u64,
    pub reports: Vec<QualityReport>,
}

pub struct Pipeline<S: Store> {
    store: S,
    sink: Box<dyn ReportSink>,
    validator: Validator,
}

impl<S: Store> Pipeline<S> {
    pub fn new(store: S, sink: Box<dyn ReportSink>) -> Self {
        Self {
            store,
            sink,
            validator: Validator::new(),
        }
    }

    /// Replace the default validator, e.g. to append business rules.
    pub fn with_validator(mut self, validator: Validator) -> Self {
        self.validator = validator;
        self
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Run the full pipeline over every configured input file. Per-record
    /// problems are recorded and recovered; any error returned here is a
    /// run-level fault for the orchestrator to retry wholesale.
    pub fn run(&mut self, config: &Config) -> Result<RunSummary> {
        let mut summary = RunSummary::default();

        for (region_name, path) in &config.input.sales {
            let span = tracing::info_span!("sales_batch", region = %region_name);
            let _enter = span.enter();
            let override_code = extract::region_code_for(region_name);
            let records = extract::read_csv(path, DatasetKind::Sales, override_code)?;
            self.load_sales_batch(&records, config, &mut summary)?;
        }

        if let Some(path) = &config.input.forecast {
            let span = tracing::info_span!("forecast_batch");
            let _enter = span.enter();
            let records = extract::read_csv(path, DatasetKind::Forecast, None)?;
            self.load_forecast_batch(&records, config, &mut summary)?;
        }

        info!(
            sales_loaded = summary.sales_loaded,
            sales_rejected = summary.sales_rejected,
            forecast_loaded = summary.forecast_loaded,
            forecast_rejected = summary.forecast_rejected,
            "run complete"
        );
        Ok(summary)
    }

    fn load_sales_batch(
        &mut self,
        records: &[RawRecord],
        config: &Config,
        summary: &mut RunSummary,
    ) -> Result<()> {
        summary.sales_in += records.len() as u64;

        let outcome = self.validator.validate_sales_batch(records);
        let report = QualityReporter::report(
            "validate_sales",
            records.len(),
            outcome.accepted.len(),
            outcome.rejected.iter().map(|(_, reason)| reason),
        );
        self.sink.emit(&report);
        quality::append_rejects(&config.audit.dir, "validate_sales", &outcome.rejected)?;
        summary.sales_rejected += report.total_rejected;
        summary.reports.push(report);

        let mut builder = FactBuilder::new(DimensionResolver::new(&mut self.store));
        let batch = builder.build_sales_facts(&outcome.accepted)?;
        drop(builder);
        let report = QualityReporter::report(
            "build_sales_facts",
            outcome.accepted.len(),
            batch.facts.len(),
            batch.rejected.iter().map(|(_, reason)| reason),
        );
        self.sink.emit(&report);
        quality::append_rejects(&config.audit.dir, "build_sales_facts", &batch.rejected)?;
        summary.sales_rejected += report.total_rejected;
        summary.reports.push(report);

        summary.sales_loaded += self.store.insert_sales_facts(&batch.facts)? as u64;
        Ok(())
    }

    fn load_forecast_batch(
        &mut self,
        records: &[RawRecord],
        config: &Config,
        summary: &mut RunSummary,
    ) -> Result<()> {
        summary.forecast_in += records.len() as u64;

        let outcome = self.validator.validate_forecast_batch(records);
        let report = QualityReporter::report(
            "validate_forecast",
            records.len(),
            outcome.accepted.len(),
            outcome.rejected.iter().map(|(_, reason)| reason),
        );
        self.sink.emit(&report);
        quality::append_rejects(&config.audit.dir, "validate_forecast", &outcome.rejected)?;
        summary.forecast_rejected += report.total_rejected;
        summary.reports.push(report);

        let mut builder = FactBuilder::new(DimensionResolver::new(&mut self.store));
        let batch = builder.build_forecast_facts(&outcome.accepted)?;
        drop(builder);
        let report = QualityReporter::report(
            "build_forecast_facts",
            outcome.accepted.len(),
            batch.facts.len(),
            batch.rejected.iter().map(|(_, reason)| reason),
        );
        self.sink.emit(&report);
        quality::append_rejects(&config.audit.dir, "build_forecast_facts", &batch.rejected)?;
        summary.forecast_rejected += report.total_rejected;
        summary.reports.push(report);

        summary.forecast_loaded += self.store.insert_forecast_facts(&batch.facts)? as u64;
        Ok(())
    }
}

/// Validate every configured input without touching a store. Used by the
/// `check` subcommand for dry runs against fresh exports.
pub fn check(config: &Config, sink: &dyn ReportSink) -> Result<Vec<QualityReport>> {
    let validator = Validator::new();
    let mut reports = Vec::new();

    for (region_name, path) in &config.input.sales {
        let override_code = extract::region_code_for(region_name);
        let records = extract::read_csv(path, DatasetKind::Sales, override_code)?;
        let outcome = validator.validate_sales_batch(&records);
        let report = QualityReporter::report(
            "validate_sales",
            records.len(),
            outcome.accepted.len(),
            outcome.rejected.iter().map(|(_, reason)| reason),
        );
        sink.emit(&report);
        reports.push(report);
    }

    if let Some(path) = &config.input.forecast {
        let records = extract::read_csv(path, DatasetKind::Forecast, None)?;
        let outcome = validator.validate_forecast_batch(&records);
        let report = QualityReporter::report(
            "validate_forecast",
            records.len(),
            outcome.accepted.len(),
            outcome.rejected.iter().map(|(_, reason)| reason),
        );
        sink.emit(&report);
        reports.push(report);
    }

    Ok(reports)
}
