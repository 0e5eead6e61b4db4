//! Credentials and session configuration.
//!
//! Credentials are looked up by an opaque key: first the environment variable
//! of that name (`user=…,password=…,host=…,port=…[,database=…]`), then the
//! `[credentials.<key>]` table of the config file.
//!
//! ```toml
//! catalog = "local"
//! database = "tech_store"
//! data_dir = "data"
//!
//! [credentials.tech_store_db]
//! user = "root"
//! password = "secret"
//! host = "localhost"
//! port = 3306
//! ```

use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::catalog::CatalogMode;
use crate::error::{SqlError, SqlResult};
use crate::parser::parse_key_values;

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 3306;
const LOCAL_CONFIG: &str = "connect-sql.toml";

/// Connection parameters for one server.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct Credentials {
    pub user: String,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub database: Option<String>,
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .finish()
    }
}

impl Credentials {
    pub fn new(user: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            password: None,
            host: default_host(),
            port: DEFAULT_PORT,
            database: None,
        }
    }

    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    /// Parse the `user=…,password=…,host=…,port=…` form.
    pub fn parse(input: &str) -> SqlResult<Self> {
        let mut user = None;
        let mut creds = Credentials::new("");

        for (key, value) in parse_key_values(input)? {
            match key.as_str() {
                "user" => user = Some(value),
                "password" => creds.password = Some(value),
                "host" => creds.host = value,
                "port" => {
                    creds.port = value
                        .parse()
                        .map_err(|_| SqlError::Credentials(format!("invalid port '{}'", value)))?
                }
                "database" => creds.database = Some(value).filter(|v| !v.is_empty()),
                other => {
                    return Err(SqlError::Credentials(format!("unknown credential key '{}'", other)));
                }
            }
        }

        creds.user = user
            .filter(|u| !u.is_empty())
            .ok_or_else(|| SqlError::Credentials("missing 'user'".to_string()))?;
        Ok(creds)
    }

    /// Read credentials from the environment variable `key`.
    pub fn from_env(key: &str) -> SqlResult<Self> {
        let raw = std::env::var(key)
            .map_err(|_| SqlError::Credentials(format!("environment variable '{}' is not set", key)))?;
        Self::parse(&raw)
    }
}

/// File-backed configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Where catalog lookups are answered.
    pub catalog: CatalogMode,
    /// Database to create or select after connecting.
    pub database: Option<String>,
    /// Directory holding CSV fixtures.
    pub data_dir: Option<PathBuf>,
    /// Named credential sets.
    pub credentials: HashMap<String, Credentials>,
}

impl Config {
    pub fn from_toml(content: &str) -> SqlResult<Self> {
        toml::from_str(content).map_err(|e| SqlError::Config(e.to_string()))
    }

    pub fn from_path(path: &Path) -> SqlResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| SqlError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml(&content)
    }

    /// Load from `explicit`, else `./connect-sql.toml`, else the user config
    /// directory, else defaults.
    pub fn load(explicit: Option<&Path>) -> SqlResult<Self> {
        if let Some(path) = explicit {
            return Self::from_path(path);
        }
        for candidate in Self::search_paths() {
            if candidate.exists() {
                tracing::debug!(path = %candidate.display(), "loading config");
                return Self::from_path(&candidate);
            }
        }
        Ok(Self::default())
    }

    fn search_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(LOCAL_CONFIG)];
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join("connect-sql").join("config.toml"));
        }
        paths
    }

    /// Resolve credentials for `key`: environment first, then this file.
    pub fn credentials(&self, key: &str) -> SqlResult<Credentials> {
        match Credentials::from_env(key) {
            Ok(creds) => Ok(creds),
            Err(env_err) => self.credentials.get(key).cloned().ok_or_else(|| {
                SqlError::Credentials(format!("{}; no [credentials.{}] in config either", env_err, key))
            }),
        }
    }
}
