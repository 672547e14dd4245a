use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::PathBuf;

use thiserror::Error;

/// Application-level constants
pub const APP_NAME: &str = "Psicoflow";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const DEFAULT_BIND: &str = "127.0.0.1:3000";
pub const DEFAULT_ALLOWED_ORIGINS: &[&str] = &["http://localhost:5500", "http://127.0.0.1:5500"];

/// Request body ceiling for the API.
pub const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Rate limit: requests per window per client address.
pub const RATE_LIMIT_REQUESTS: usize = 100;
pub const RATE_LIMIT_WINDOW_SECS: u64 = 15 * 60;

const ENV_BIND: &str = "PSICOFLOW_BIND";
const ENV_DB_PATH: &str = "PSICOFLOW_DB_PATH";
const ENV_FIELD_PASSPHRASE: &str = "PSICOFLOW_FIELD_PASSPHRASE";
const ENV_FIELD_SALT: &str = "PSICOFLOW_FIELD_SALT";
const ENV_TOKEN_SECRET: &str = "PSICOFLOW_TOKEN_SECRET";
const ENV_ALLOWED_ORIGINS: &str = "PSICOFLOW_ALLOWED_ORIGINS";
const ENV_STATIC_DIR: &str = "PSICOFLOW_STATIC_DIR";
const ENV_BOOTSTRAP_ADMIN: &str = "PSICOFLOW_BOOTSTRAP_ADMIN";
const ENV_BOOTSTRAP_SECRET: &str = "PSICOFLOW_BOOTSTRAP_SECRET";

/// Get the application data directory: ~/Psicoflow/
pub fn app_data_dir() -> Result<PathBuf, ConfigError> {
    dirs::home_dir()
        .map(|home| home.join(APP_NAME))
        .ok_or(ConfigError::NoHomeDir)
}

/// Default database location inside the data directory.
pub fn default_db_path() -> Result<PathBuf, ConfigError> {
    Ok(app_data_dir()?.join("psicoflow.db"))
}

/// `RUST_LOG` fallback.
pub fn default_log_filter() -> &'static str {
    "psicoflow_lib=info,psicoflow=info,tower_http=warn"
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required setting {0}")]
    Missing(&'static str),

    #[error("Invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },

    #[error("Cannot determine home directory")]
    NoHomeDir,
}

/// Startup configuration, read once from the environment.
pub struct Config {
    pub bind: SocketAddr,
    pub db_path: PathBuf,
    pub field_passphrase: String,
    pub field_salt: String,
    /// `None`: a random secret is drawn per process.
    pub token_secret: Option<String>,
    pub allowed_origins: Vec<String>,
    pub static_dir: Option<PathBuf>,
    pub bootstrap_admin: Option<(String, String)>,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("bind", &self.bind)
            .field("db_path", &self.db_path)
            .field("field_passphrase", &"[redacted]")
            .field("field_salt", &"[redacted]")
            .field("token_secret", &self.token_secret.as_ref().map(|_| "[redacted]"))
            .field("allowed_origins", &self.allowed_origins)
            .field("static_dir", &self.static_dir)
            .field("bootstrap_admin", &self.bootstrap_admin.as_ref().map(|(id, _)| id))
            .finish()
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&std::env::vars().collect())
    }

    /// Build from an explicit variable map.
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let get = |name: &str| vars.get(name).map(|v| v.trim()).filter(|v| !v.is_empty());

        let bind_raw = get(ENV_BIND).unwrap_or(DEFAULT_BIND);
        let bind = bind_raw.parse().map_err(|e: std::net::AddrParseError| ConfigError::Invalid {
            name: ENV_BIND,
            reason: e.to_string(),
        })?;

        let db_path = match get(ENV_DB_PATH) {
            Some(path) => PathBuf::from(path),
            None => default_db_path()?,
        };

        let field_passphrase = get(ENV_FIELD_PASSPHRASE)
            .ok_or(ConfigError::Missing(ENV_FIELD_PASSPHRASE))?
            .to_string();
        let field_salt = get(ENV_FIELD_SALT)
            .ok_or(ConfigError::Missing(ENV_FIELD_SALT))?
            .to_string();

        let token_secret = get(ENV_TOKEN_SECRET).map(str::to_string);
        if token_secret.as_ref().is_some_and(|s| s.len() < 32) {
            return Err(ConfigError::Invalid {
                name: ENV_TOKEN_SECRET,
                reason: "must be at least 32 characters".into(),
            });
        }

        let allowed_origins: Vec<String> = match get(ENV_ALLOWED_ORIGINS) {
            Some(list) => list
                .split(',')
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect(),
            None => DEFAULT_ALLOWED_ORIGINS.iter().map(|o| o.to_string()).collect(),
        };
        // Credentialed CORS cannot use a wildcard origin.
        if allowed_origins.iter().any(|o| o == "*") {
            return Err(ConfigError::Invalid {
                name: ENV_ALLOWED_ORIGINS,
                reason: "wildcard origin is not allowed; list origins explicitly".into(),
            });
        }

        let static_dir = get(ENV_STATIC_DIR).map(PathBuf::from);

        let bootstrap_admin = match (get(ENV_BOOTSTRAP_ADMIN), get(ENV_BOOTSTRAP_SECRET)) {
            (Some(id), Some(secret)) => Some((id.to_string(), secret.to_string())),
            (None, None) => None,
            (Some(_), None) => return Err(ConfigError::Missing(ENV_BOOTSTRAP_SECRET)),
            (None, Some(_)) => return Err(ConfigError::Missing(ENV_BOOTSTRAP_ADMIN)),
        };

        Ok(Self {
            bind,
            db_path,
            field_passphrase,
            field_salt,
            token_secret,
            allowed_origins,
            static_dir,
            bootstrap_admin,
        })
    }
}
