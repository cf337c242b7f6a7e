use thiserror::Error;

/// Run-level faults. Per-record problems are not errors in this sense; they
/// are `RejectReason` values recovered locally by the validator and fact
/// builder.
#[derive(Error, Debug)]
pub enum EtlError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV read failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("database error: {0}")]
    Sql(#[from] rusqlite::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("input file produced no records: {0}")]
    EmptyInput(String),
}

pub type Result<T> = std::result::Result<T, EtlError>;
