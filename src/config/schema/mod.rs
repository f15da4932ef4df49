use crate::errors::SessionError;
use crate::session::manager::MAX_SESSION_TTL;
use crate::session::{BackendKind, LockMode};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

fn default_backend() -> String {
    "memory".to_string()
}

fn default_ttl() -> String {
    "1h".to_string()
}

fn default_storage_dir() -> String {
    "storage/sessions".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionConfig {
    /// `"memory"` or `"file"`.
    #[serde(default = "default_backend")]
    pub backend: String,
    /// Humantime duration, e.g. `"30m"` or `"1h 30m"`.
    #[serde(default = "default_ttl")]
    pub ttl: String,
    #[serde(default = "default_storage_dir")]
    pub storage_dir: String,
    #[serde(default)]
    pub lock_mode: LockMode,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            ttl: default_ttl(),
            storage_dir: default_storage_dir(),
            lock_mode: LockMode::default(),
        }
    }
}

impl SessionConfig {
    pub fn ttl(&self) -> Result<Duration, SessionError> {
        parse_duration("session.ttl", &self.ttl)
    }

    pub fn backend_kind(&self) -> Result<BackendKind, SessionError> {
        self.backend.parse()
    }

    pub fn storage_path(&self) -> PathBuf {
        PathBuf::from(&self.storage_dir)
    }
}

// ---------------------------------------------------------------------------
// Gateway
// ---------------------------------------------------------------------------

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_cookie_name() -> String {
    "session_id".to_string()
}

fn default_sweep_interval() -> String {
    "5m".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cookie_name: default_cookie_name(),
            sweep_interval: default_sweep_interval(),
        }
    }
}

impl GatewayConfig {
    pub fn sweep_interval(&self) -> Result<Duration, SessionError> {
        parse_duration("gateway.sweepInterval", &self.sweep_interval)
    }
}

fn parse_duration(field: &str, raw: &str) -> Result<Duration, SessionError> {
    humantime::parse_duration(raw.trim())
        .map_err(|e| SessionError::Config(format!("{} {:?} is not a duration: {}", field, raw, e)))
}

/// RFC 6265 cookie-name token characters.
fn is_cookie_token(name: &str) -> bool {
    !name.is_empty()
        && name.bytes().all(|b| {
            b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b)
        })
}

impl Config {
    /// Validate configuration values
    pub fn validate(&self) -> Result<(), SessionError> {
        self.validate_session()?;
        self.validate_gateway()?;
        Ok(())
    }

    fn validate_session(&self) -> Result<(), SessionError> {
        let s = &self.session;
        let kind = s.backend_kind()?;

        let ttl = s.ttl()?;
        if ttl.is_zero() {
            return Err(SessionError::Config(
                "session.ttl must be greater than zero".into(),
            ));
        }
        if ttl > MAX_SESSION_TTL {
            return Err(SessionError::Config(format!(
                "session.ttl {:?} exceeds the one year maximum",
                s.ttl
            )));
        }

        if kind == BackendKind::File && s.storage_dir.trim().is_empty() {
            return Err(SessionError::Config(
                "session.storageDir must not be empty for the file backend".into(),
            ));
        }
        Ok(())
    }

    fn validate_gateway(&self) -> Result<(), SessionError> {
        let g = &self.gateway;
        if !is_cookie_token(&g.cookie_name) {
            return Err(SessionError::Config(format!(
                "gateway.cookieName {:?} is not a valid cookie name",
                g.cookie_name
            )));
        }
        if g.sweep_interval()?.is_zero() {
            return Err(SessionError::Config(
                "gateway.sweepInterval must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}
