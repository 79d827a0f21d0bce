//! Configuration resolution for waymark-server
//!
//! Two-tier resolution with ENV → TOML priority; compiled defaults as the
//! fallback. The classifier API key is the only required value with no
//! default.

use serde::Deserialize;
use std::path::PathBuf;
use tracing::warn;
use waymark_common::{config as common_config, Error, Result};

const DEFAULT_PORT: u16 = 5860;
const DEFAULT_VISION_URL: &str = "https://vision.example.com";
const DEFAULT_VISION_MODEL: &str = "landmark-v1";
const DEFAULT_VISION_TIMEOUT_SECS: u64 = 30;
const DEFAULT_GEOCODER_URL: &str = "https://nominatim.openstreetmap.org";
const DEFAULT_GEOCODER_TIMEOUT_SECS: u64 = 10;

/// Vision classifier settings
#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub timeout_secs: u64,
}

/// Geocoder settings
#[derive(Debug, Clone)]
pub struct GeocoderConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

/// Full server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub database_path: PathBuf,
    pub classifier: ClassifierConfig,
    pub geocoder: GeocoderConfig,
}

/// TOML file shape; every field optional so a partial file is fine
#[derive(Debug, Default, Deserialize)]
struct TomlConfig {
    port: Option<u16>,
    database_path: Option<String>,
    vision_url: Option<String>,
    vision_api_key: Option<String>,
    vision_model: Option<String>,
    vision_timeout_secs: Option<u64>,
    geocoder_url: Option<String>,
    geocoder_timeout_secs: Option<u64>,
}

impl ServerConfig {
    /// Load configuration with ENV → TOML → default priority.
    pub fn load() -> Result<Self> {
        let toml_config = load_toml_config();

        let api_key = resolve_string(
            "WAYMARK_VISION_API_KEY",
            toml_config.vision_api_key.as_deref(),
            None,
        )
        .ok_or_else(|| {
            Error::Config(
                "Vision API key not configured (set WAYMARK_VISION_API_KEY or vision_api_key in config.toml)"
                    .to_string(),
            )
        })?;

        let database_path = match resolve_string(
            "WAYMARK_DB_PATH",
            toml_config.database_path.as_deref(),
            None,
        ) {
            Some(path) => PathBuf::from(path),
            None => {
                let data_dir = common_config::resolve_data_dir(None);
                common_config::ensure_data_dir(&data_dir, "waymark.db")?
            }
        };

        Ok(Self {
            port: resolve_parsed("WAYMARK_PORT", toml_config.port, DEFAULT_PORT)?,
            database_path,
            classifier: ClassifierConfig {
                base_url: resolve_string(
                    "WAYMARK_VISION_URL",
                    toml_config.vision_url.as_deref(),
                    None,
                )
                .unwrap_or_else(|| DEFAULT_VISION_URL.to_string()),
                api_key,
                model: resolve_string(
                    "WAYMARK_VISION_MODEL",
                    toml_config.vision_model.as_deref(),
                    None,
                )
                .unwrap_or_else(|| DEFAULT_VISION_MODEL.to_string()),
                timeout_secs: resolve_parsed(
                    "WAYMARK_VISION_TIMEOUT_SECS",
                    toml_config.vision_timeout_secs,
                    DEFAULT_VISION_TIMEOUT_SECS,
                )?,
            },
            geocoder: GeocoderConfig {
                base_url: resolve_string(
                    "WAYMARK_GEOCODER_URL",
                    toml_config.geocoder_url.as_deref(),
                    None,
                )
                .unwrap_or_else(|| DEFAULT_GEOCODER_URL.to_string()),
                timeout_secs: resolve_parsed(
                    "WAYMARK_GEOCODER_TIMEOUT_SECS",
                    toml_config.geocoder_timeout_secs,
                    DEFAULT_GEOCODER_TIMEOUT_SECS,
                )?,
            },
        })
    }
}

fn load_toml_config() -> TomlConfig {
    let Ok(path) = common_config::locate_config_file() else {
        return TomlConfig::default();
    };
    match std::fs::read_to_string(&path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => config,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Malformed config file, ignoring");
                TomlConfig::default()
            }
        },
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Unreadable config file, ignoring");
            TomlConfig::default()
        }
    }
}

/// ENV → TOML → default for string-valued settings
fn resolve_string(env_var: &str, toml_value: Option<&str>, default: Option<&str>) -> Option<String> {
    if let Ok(value) = std::env::var(env_var) {
        if !value.trim().is_empty() {
            return Some(value);
        }
    }
    if let Some(value) = toml_value {
        if !value.trim().is_empty() {
            return Some(value.to_string());
        }
    }
    default.map(|d| d.to_string())
}

/// ENV → TOML → default for numeric settings
fn resolve_parsed<T>(env_var: &str, toml_value: Option<T>, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    if let Ok(value) = std::env::var(env_var) {
        return value
            .parse::<T>()
            .map_err(|e| Error::Config(format!("Invalid {}: {}", env_var, e)));
    }
    Ok(toml_value.unwrap_or(default))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_string_prefers_toml_over_default() {
        let value = resolve_string("WAYMARK_TEST_UNSET_VAR", Some("from-toml"), Some("fallback"));
        assert_eq!(value, Some("from-toml".to_string()));
    }

    #[test]
    fn resolve_string_falls_back_to_default() {
        let value = resolve_string("WAYMARK_TEST_UNSET_VAR", None, Some("fallback"));
        assert_eq!(value, Some("fallback".to_string()));
    }

    #[test]
    fn resolve_parsed_uses_default_when_nothing_set() {
        let value: u16 = resolve_parsed("WAYMARK_TEST_UNSET_VAR", None, 5860).unwrap();
        assert_eq!(value, 5860);
    }
}
