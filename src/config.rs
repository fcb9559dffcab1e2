//! Layered configuration.
//!
//! Sources, highest priority last:
//! 1. Built-in defaults
//! 2. `<config dir>/resultd/config.toml`
//! 3. `./resultd.toml`
//! 4. Environment variables with the `RESULTD_` prefix, `__` between section
//!    and key (`RESULTD_AUTH__UPLOAD_CODE` -> `auth.upload_code`)

use std::path::PathBuf;
use std::time::Duration;

use figment::providers::{Env, Format, Serialized, Toml};
use figment::value::Value;
use figment::Figment;
use serde::{Deserialize, Deserializer, Serialize};

use crate::sheet::SheetCredentials;

/// Accepts numbers and booleans where a string is expected. Environment
/// values like `RESULTD_AUTH__UPLOAD_CODE=1234` arrive as integers.
fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Str(String),
        Int(i64),
        Uint(u64),
        Float(f64),
        Bool(bool),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Str(s) => s,
        Raw::Int(v) => v.to_string(),
        Raw::Uint(v) => v.to_string(),
        Raw::Float(v) => v.to_string(),
        Raw::Bool(v) => v.to_string(),
    })
}

/// Text settings whose configured value arrived as a number and went through
/// `lenient_string`. `0123` becomes `123` on that path.
pub fn numeric_text_keys(figment: &Figment) -> Vec<&'static str> {
    ["auth.upload_code", "sheets.access_token"]
        .into_iter()
        .filter(|key| matches!(figment.find_value(key), Ok(Value::Num(..))))
        .collect()
}

const fn default_session_ttl_minutes() -> i64 {
    30
}

const fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct WorkspaceConfig {
    /// Workspace opened at startup, before any `workspace.select`.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    /// Code exchanged for an upload session. Empty disables uploads.
    #[serde(default, deserialize_with = "lenient_string")]
    pub upload_code: String,

    #[serde(default = "default_session_ttl_minutes")]
    pub session_ttl_minutes: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            upload_code: String::new(),
            session_ttl_minutes: default_session_ttl_minutes(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SheetsConfig {
    /// Bearer token sent with remote sheet fetches.
    #[serde(default, deserialize_with = "lenient_string")]
    pub access_token: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for SheetsConfig {
    fn default() -> Self {
        Self {
            access_token: String::new(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl SheetsConfig {
    pub fn credentials(&self) -> SheetCredentials {
        let token = self.access_token.trim();
        SheetCredentials {
            access_token: (!token.is_empty()).then(|| token.to_string()),
            timeout: Duration::from_secs(self.timeout_secs.max(1)),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub workspace: WorkspaceConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub sheets: SheetsConfig,
}

impl Config {
    pub fn load() -> Result<Self, figment::Error> {
        let figment = Self::figment();
        let config = figment.extract()?;
        for key in numeric_text_keys(&figment) {
            tracing::warn!(
                key,
                "configured value was read as a number; leading zeros are lost, quote it in TOML"
            );
        }
        Ok(config)
    }

    pub fn figment() -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(global_path) = dirs::config_dir().map(|p| p.join("resultd").join("config.toml"))
        {
            if global_path.exists() {
                figment = figment.merge(Toml::file(global_path));
            }
        }

        let local_path = PathBuf::from("resultd.toml");
        if local_path.exists() {
            figment = figment.merge(Toml::file(local_path));
        }

        figment.merge(Env::prefixed("RESULTD_").split("__"))
    }
}
