use std::fs;
use std::net::SocketAddr;
use std::path::PathBuf;

use serde::Deserialize;

use crate::error::{Error, Result};

pub const CONFIG_FILE: &str = "assetrack.toml";
pub const DB_FILE: &str = "assetrack.db";
pub const SECRET_FILE: &str = ".jwt_secret";
pub const ADMIN_PASSWORD_FILE: &str = ".admin_password";

const DEFAULT_TOKEN_TTL_HOURS: i64 = 24;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub data_dir: PathBuf,
    /// Lifetime of issued bearer tokens.
    pub token_ttl_hours: i64,
    /// HS256 signing secret. Falls back to `<data_dir>/.jwt_secret`.
    pub jwt_secret: Option<String>,
    /// Take the client address from `X-Forwarded-For`. Only enable behind
    /// a reverse proxy that overwrites the header.
    pub trust_proxy_headers: bool,
}

/// Optional overrides read from `<data_dir>/assetrack.toml`.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub token_ttl_hours: Option<i64>,
    pub jwt_secret: Option<String>,
    pub trust_proxy_headers: Option<bool>,
}

impl ServerConfig {
    /// Defaults for `data_dir`, overlaid with the config file when present.
    pub fn load(data_dir: impl Into<PathBuf>) -> Result<Self> {
        let mut config = Self {
            data_dir: data_dir.into(),
            ..Self::default()
        };

        let path = config.config_path();
        if path.exists() {
            let raw = fs::read_to_string(&path)?;
            let file: FileConfig = toml::from_str(&raw)
                .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
            config.apply(file);
        }

        Ok(config)
    }

    pub fn apply(&mut self, file: FileConfig) {
        if let Some(host) = file.host {
            self.host = host;
        }
        if let Some(port) = file.port {
            self.port = port;
        }
        if let Some(ttl) = file.token_ttl_hours {
            self.token_ttl_hours = ttl;
        }
        if file.jwt_secret.is_some() {
            self.jwt_secret = file.jwt_secret;
        }
        if let Some(trust) = file.trust_proxy_headers {
            self.trust_proxy_headers = trust;
        }
    }

    /// The configured signing secret, or the one written by `admin init`.
    pub fn signing_secret(&self) -> Result<String> {
        if let Some(secret) = self.jwt_secret.as_deref().filter(|s| !s.is_empty()) {
            return Ok(secret.to_string());
        }

        let path = self.secret_path();
        let secret = fs::read_to_string(&path)
            .map_err(|e| Error::Config(format!("cannot read {}: {e}", path.display())))?;
        let secret = secret.trim();
        if secret.is_empty() {
            return Err(Error::Config(format!("{} is empty", path.display())));
        }
        Ok(secret.to_string())
    }

    pub fn socket_addr(&self) -> std::result::Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }

    #[must_use]
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join(DB_FILE)
    }

    #[must_use]
    pub fn config_path(&self) -> PathBuf {
        self.data_dir.join(CONFIG_FILE)
    }

    #[must_use]
    pub fn secret_path(&self) -> PathBuf {
        self.data_dir.join(SECRET_FILE)
    }

    #[must_use]
    pub fn admin_password_path(&self) -> PathBuf {
        self.data_dir.join(ADMIN_PASSWORD_FILE)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            data_dir: PathBuf::from("./data"),
            token_ttl_hours: DEFAULT_TOKEN_TTL_HOURS,
            jwt_secret: None,
            trust_proxy_headers: false,
        }
    }
}
