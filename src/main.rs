use clap::{Parser, Subcommand};
use sales_forecast_etl::config::Config;
use sales_forecast_etl::logging;
use sales_forecast_etl::pipeline::{self, Pipeline};
use sales_forecast_etl::pipeline::processing::quality::LogSink;
use sales_forecast_etl::storage::SqliteStore;
use std::path::PathBuf;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "sales_forecast_etl")]
#[command(about = "Sales vs. forecast spreadsheet ETL with a star-schema store")]
#[command(version = "0.1.0")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, default_value = "config/dev.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the star schema and seed the region dimension
    InitDb,
    /// Run the full extract/validate/load pipeline
    Run,
    /// Validate the configured inputs and print quality reports, no loading
    Check,
}

fn print_reports(reports: &[sales_forecast_etl::domain::QualityReport]) {
    for report in reports {
        println!(
            "   {}: {} in / {} accepted / {} rejected",
            report.stage, report.total_in, report.total_accepted, report.total_rejected
        );
        for (reason, count) in &report.rejection_reasons {
            println!("      - {}: {}", reason, count);
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init_logging();

    let cli = Cli::parse();
    let config = Config::load(&cli.config)?;

    match cli.command {
        Commands::InitDb => {
            let _store = SqliteStore::open(&config.database.path)?;
            info!(path = %config.database.path.display(), "schema initialized");
            println!("📦 Star schema ready at {}", config.database.path.display());
        }
        Commands::Run => {
            println!("🔄 Running ETL pipeline...");
            let store = SqliteStore::open(&config.database.path)?;
            let mut pipeline = Pipeline::new(store, Box::new(LogSink));
            match pipeline.run(&config) {
                Ok(summary) => {
                    println!("\n📊 Run results:");
                    println!(
                        "   Sales: {} in / {} loaded / {} rejected",
                        summary.sales_in, summary.sales_loaded, summary.sales_rejected
                    );
                    println!(
                        "   Forecast: {} in / {} loaded / {} rejected",
                        summary.forecast_in, summary.forecast_loaded, summary.forecast_rejected
                    );
                    if summary.sales_rejected + summary.forecast_rejected > 0 {
                        println!("\n⚠️  Rejections by stage:");
                        print_reports(&summary.reports);
                        println!(
                            "   Full records are in the audit log under {}",
                            config.audit.dir.display()
                        );
                    }
                }
                Err(e) => {
                    error!("pipeline failed: {}", e);
                    return Err(e.into());
                }
            }
        }
        Commands::Check => {
            println!("🔎 Validating inputs (dry run)...");
            let reports = pipeline::check(&config, &LogSink)?;
            println!("\n📊 Quality reports:");
            print_reports(&reports);
        }
    }

    Ok(())
}
