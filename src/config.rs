use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_USERS_DATABASE: &str = "users.db";
pub const DEFAULT_PRODUCTS_DATABASE: &str = "inventory.db";
pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_SESSION_HOURS: i64 = 8;

/// Contents of `stockroom.toml`. Every field is optional.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct StockroomConfig {
    pub users_database: Option<String>,
    pub products_database: Option<String>,
    pub port: Option<u16>,
    pub session_hours: Option<i64>,
    pub secure_cookies: Option<bool>,
    /// Truncated at start-up; logs go to stdout when unset
    pub log_file: Option<String>,
}

impl StockroomConfig {
    /// A config with every default written out, for `init --write-config`
    pub fn with_defaults() -> Self {
        Self {
            users_database: Some(DEFAULT_USERS_DATABASE.to_string()),
            products_database: Some(DEFAULT_PRODUCTS_DATABASE.to_string()),
            port: Some(DEFAULT_PORT),
            session_hours: Some(DEFAULT_SESSION_HOURS),
            secure_cookies: Some(false),
            log_file: None,
        }
    }
}

/// Effective settings after defaults and config file are merged
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub users_database: PathBuf,
    pub products_database: PathBuf,
    pub port: u16,
    pub session_hours: i64,
    pub secure_cookies: bool,
    pub log_file: Option<PathBuf>,
}

impl Settings {
    pub fn from_config(config: StockroomConfig) -> anyhow::Result<Self> {
        let session_hours = config.session_hours.unwrap_or(DEFAULT_SESSION_HOURS);
        if session_hours <= 0 {
            anyhow::bail!("session_hours must be positive, got {}", session_hours);
        }

        Ok(Self {
            users_database: PathBuf::from(
                config.users_database.unwrap_or_else(|| DEFAULT_USERS_DATABASE.to_string()),
            ),
            products_database: PathBuf::from(
                config.products_database.unwrap_or_else(|| DEFAULT_PRODUCTS_DATABASE.to_string()),
            ),
            port: config.port.unwrap_or(DEFAULT_PORT),
            session_hours,
            secure_cookies: config.secure_cookies.unwrap_or(false),
            log_file: config.log_file.map(PathBuf::from),
        })
    }
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("stockroom.toml")
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Option<StockroomConfig>> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path)?;
    let config: StockroomConfig = toml::from_str(&contents)?;
    Ok(Some(config))
}

pub fn write_config(path: &Path, config: &StockroomConfig, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!("config already exists at {} (use --force to overwrite)", path.display());
    }

    let contents = toml::to_string_pretty(config)?;
    std::fs::write(path, contents)?;
    Ok(())
}
