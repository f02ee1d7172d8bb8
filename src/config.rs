//! TOML configuration parsing, environment overrides, and validation.
//!
//! Every section is optional. A missing section takes its defaults, so an
//! empty file (or no file at all, see [`Config::default`]) is a valid setup
//! that reads `contacts.xlsx` and writes `contact_status.json` in the
//! working directory.
//!
//! ```toml
//! [source]
//! path = "data/contacts.xlsx"
//!
//! [records]
//! schema_mode = "lenient"
//! missing_value = ""
//!
//! [ledger]
//! path = "data/contact_status.json"
//!
//! [cache]
//! path = "data/records_cache.json"
//!
//! [server]
//! bind = "0.0.0.0:5001"
//! ```
//!
//! Environment variables override the file: `CDIR_SPREADSHEET`,
//! `CDIR_STATUS_PATH`, `CDIR_CACHE_PATH`, and `PORT` (replaces the port of
//! `server.bind`, keeping its host).

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const ENV_SPREADSHEET: &str = "CDIR_SPREADSHEET";
pub const ENV_STATUS_PATH: &str = "CDIR_STATUS_PATH";
pub const ENV_CACHE_PATH: &str = "CDIR_CACHE_PATH";
pub const ENV_PORT: &str = "PORT";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub records: RecordsConfig,
    #[serde(default)]
    pub ledger: LedgerConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SourceConfig {
    #[serde(default = "default_source_path")]
    pub path: PathBuf,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            path: default_source_path(),
        }
    }
}

fn default_source_path() -> PathBuf {
    PathBuf::from("contacts.xlsx")
}

/// What to do when a spreadsheet has none of the expected columns.
#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SchemaMode {
    /// Warn and keep every source column.
    #[default]
    Lenient,
    /// Refuse the spreadsheet.
    Strict,
}

impl SchemaMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SchemaMode::Lenient => "lenient",
            SchemaMode::Strict => "strict",
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct RecordsConfig {
    #[serde(default)]
    pub schema_mode: SchemaMode,
    #[serde(default = "default_missing_value")]
    pub missing_value: String,
}

impl Default for RecordsConfig {
    fn default() -> Self {
        Self {
            schema_mode: SchemaMode::default(),
            missing_value: default_missing_value(),
        }
    }
}

fn default_missing_value() -> String {
    contact_directory_core::models::DEFAULT_MISSING_VALUE.to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct LedgerConfig {
    #[serde(default = "default_ledger_path")]
    pub path: PathBuf,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            path: default_ledger_path(),
        }
    }
}

fn default_ledger_path() -> PathBuf {
    PathBuf::from("contact_status.json")
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct CacheConfig {
    #[serde(default)]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0:5001".to_string()
}

impl Config {
    /// Applies overrides from `lookup` (normally `std::env::var`).
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup(ENV_SPREADSHEET) {
            self.source.path = PathBuf::from(path);
        }
        if let Some(path) = lookup(ENV_STATUS_PATH) {
            self.ledger.path = PathBuf::from(path);
        }
        if let Some(path) = lookup(ENV_CACHE_PATH) {
            self.cache.path = Some(PathBuf::from(path));
        }
        if let Some(port) = lookup(ENV_PORT) {
            let port: u16 = port
                .trim()
                .parse()
                .with_context(|| format!("{} must be a port number, got '{}'", ENV_PORT, port))?;
            let host = split_bind(&self.server.bind)?.0.to_string();
            self.server.bind = format!("{}:{}", host, port);
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        split_bind(&self.server.bind)?;
        if self.source.path.as_os_str().is_empty() {
            bail!("source.path must not be empty");
        }
        if self.ledger.path.as_os_str().is_empty() {
            bail!("ledger.path must not be empty");
        }
        Ok(())
    }
}

fn split_bind(bind: &str) -> Result<(&str, u16)> {
    let (host, port) = bind
        .rsplit_once(':')
        .with_context(|| format!("server.bind must be host:port, got '{}'", bind))?;
    let port: u16 = port
        .parse()
        .with_context(|| format!("server.bind has an invalid port: '{}'", bind))?;
    Ok((host, port))
}

/// Parses and validates a config document, without environment overrides.
pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;
    config.validate()?;
    Ok(config)
}

/// Reads `path`, applies environment overrides, and validates.
///
/// When `allow_missing` is set and the file does not exist, defaults are used.
pub fn load_config(path: &Path, allow_missing: bool) -> Result<Config> {
    let mut config = if allow_missing && !path.exists() {
        Config::default()
    } else {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        parse_config(&content)?
    };

    config.apply_env_overrides(|key| std::env::var(key).ok())?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn empty_document_uses_defaults() {
        let cfg = parse_config("").unwrap();
        assert_eq!(cfg.source.path, PathBuf::from("contacts.xlsx"));
        assert_eq!(cfg.ledger.path, PathBuf::from("contact_status.json"));
        assert_eq!(cfg.records.schema_mode, SchemaMode::Lenient);
        assert_eq!(cfg.records.missing_value, "");
        assert!(cfg.cache.path.is_none());
        assert_eq!(cfg.server.bind, "0.0.0.0:5001");
    }

    #[test]
    fn full_document() {
        let cfg = parse_config(
            r#"
[source]
path = "data/people.xlsx"

[records]
schema_mode = "strict"
missing_value = "N/A"

[ledger]
path = "data/status.json"

[cache]
path = "data/cache.json"

[server]
bind = "127.0.0.1:8080"
"#,
        )
        .unwrap();
        assert_eq!(cfg.source.path, PathBuf::from("data/people.xlsx"));
        assert_eq!(cfg.records.schema_mode, SchemaMode::Strict);
        assert_eq!(cfg.records.missing_value, "N/A");
        assert_eq!(cfg.cache.path, Some(PathBuf::from("data/cache.json")));
        assert_eq!(cfg.server.bind, "127.0.0.1:8080");
    }

    #[test]
    fn unknown_schema_mode_rejected() {
        assert!(parse_config("[records]\nschema_mode = \"loose\"\n").is_err());
    }

    #[test]
    fn bad_bind_rejected() {
        assert!(parse_config("[server]\nbind = \"localhost\"\n").is_err());
        assert!(parse_config("[server]\nbind = \"localhost:http\"\n").is_err());
    }

    #[test]
    fn env_overrides_paths_and_port() {
        let mut cfg = Config::default();
        cfg.apply_env_overrides(env(&[
            (ENV_SPREADSHEET, "/srv/contacts.xlsx"),
            (ENV_STATUS_PATH, "/srv/status.json"),
            (ENV_CACHE_PATH, "/srv/cache.json"),
            (ENV_PORT, "9000"),
        ]))
        .unwrap();
        assert_eq!(cfg.source.path, PathBuf::from("/srv/contacts.xlsx"));
        assert_eq!(cfg.ledger.path, PathBuf::from("/srv/status.json"));
        assert_eq!(cfg.cache.path, Some(PathBuf::from("/srv/cache.json")));
        assert_eq!(cfg.server.bind, "0.0.0.0:9000");
    }

    #[test]
    fn invalid_port_rejected() {
        let mut cfg = Config::default();
        assert!(cfg.apply_env_overrides(env(&[(ENV_PORT, "seventy")])).is_err());
        assert!(cfg.apply_env_overrides(env(&[(ENV_PORT, "70000")])).is_err());
    }

    #[test]
    fn missing_file_allowed_only_when_requested() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("nope.toml");
        assert!(load_config(&path, false).is_err());
        assert!(load_config(&path, true).is_ok());
    }
}
