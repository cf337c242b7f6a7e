use crate::error::{EtlError, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub input: InputConfig,
    #[serde(default)]
    pub audit: AuditConfig,
}

#[derive(Debug, Deserialize)]
pub struct DatabaseConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize)]
pub struct InputConfig {
    /// Sales exports keyed by region name (emea, americas, asia). The key
    /// decides the region code stamped onto every row of that file.
    #[serde(default)]
    pub sales: BTreeMap<String, PathBuf>,
    pub forecast: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
pub struct AuditConfig {
    /// Directory the reject audit log (NDJSON) is written to.
    pub dir: PathBuf,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("logs"),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            EtlError::Config(format!(
                "failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_full_config() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
[database]
path = "data/sales_forecast.db"

[input]
forecast = "data/forecast.csv"

[input.sales]
emea = "data/sales_emea.csv"
americas = "data/sales_americas.csv"

[audit]
dir = "audit"
"#
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.database.path, PathBuf::from("data/sales_forecast.db"));
        assert_eq!(config.input.sales.len(), 2);
        assert_eq!(
            config.input.forecast.as_deref(),
            Some(Path::new("data/forecast.csv"))
        );
        assert_eq!(config.audit.dir, PathBuf::from("audit"));
    }

    #[test]
    fn test_audit_dir_defaults_to_logs() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
[database]
path = "data/x.db"

[input]
forecast = "data/forecast.csv"
"#
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.audit.dir, PathBuf::from("logs"));
        assert!(config.input.sales.is_empty());
    }

    #[test]
    fn test_missing_config_file_is_a_config_error() {
        let err = Config::load(Path::new("does/not/exist.toml")).unwrap_err();
        assert!(matches!(err, EtlError::Config(_)));
    }
}
