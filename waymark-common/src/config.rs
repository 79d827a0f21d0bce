//! Data directory resolution
//!
//! The on-device cache and the server database both live under a data
//! directory resolved with the same priority order:
//! 1. Caller-supplied path (highest priority)
//! 2. `WAYMARK_DATA_DIR` environment variable
//! 3. `data_dir` key in the TOML config file
//! 4. OS-dependent default (fallback)

use crate::{Error, Result};
use std::path::PathBuf;

/// Resolve the Waymark data directory.
pub fn resolve_data_dir(explicit: Option<&str>) -> PathBuf {
    // Priority 1: caller-supplied path
    if let Some(path) = explicit {
        return PathBuf::from(path);
    }

    // Priority 2: environment variable
    if let Ok(path) = std::env::var("WAYMARK_DATA_DIR") {
        return PathBuf::from(path);
    }

    // Priority 3: TOML config file
    if let Ok(config_path) = locate_config_file() {
        if let Ok(toml_content) = std::fs::read_to_string(&config_path) {
            if let Ok(config) = toml::from_str::<toml::Value>(&toml_content) {
                if let Some(data_dir) = config.get("data_dir").and_then(|v| v.as_str()) {
                    return PathBuf::from(data_dir);
                }
            }
        }
    }

    // Priority 4: OS-dependent default
    default_data_dir()
}

/// Ensure the data directory exists, returning the path to the database
/// file inside it.
pub fn ensure_data_dir(dir: &PathBuf, db_file: &str) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .map_err(|e| Error::Config(format!("Failed to create data directory {:?}: {}", dir, e)))?;
    Ok(dir.join(db_file))
}

/// Locate the Waymark config file for the platform.
pub fn locate_config_file() -> Result<PathBuf> {
    if cfg!(target_os = "linux") {
        // ~/.config/waymark/config.toml first, then /etc/waymark/config.toml
        if let Some(path) = dirs::config_dir().map(|d| d.join("waymark").join("config.toml")) {
            if path.exists() {
                return Ok(path);
            }
        }
        let system_config = PathBuf::from("/etc/waymark/config.toml");
        if system_config.exists() {
            return Ok(system_config);
        }
        Err(Error::Config("No config file found".to_string()))
    } else {
        let path = dirs::config_dir()
            .map(|d| d.join("waymark").join("config.toml"))
            .ok_or_else(|| Error::Config("Could not determine config directory".to_string()))?;
        if path.exists() {
            Ok(path)
        } else {
            Err(Error::Config(format!("Config file not found: {:?}", path)))
        }
    }
}

/// OS-dependent default data directory
fn default_data_dir() -> PathBuf {
    if cfg!(target_os = "linux") {
        dirs::data_local_dir()
            .map(|d| d.join("waymark"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/waymark"))
    } else if cfg!(target_os = "macos") {
        dirs::data_dir()
            .map(|d| d.join("waymark"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/waymark"))
    } else if cfg!(target_os = "windows") {
        dirs::data_local_dir()
            .map(|d| d.join("waymark"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\waymark"))
    } else {
        PathBuf::from("./waymark_data")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_path_wins() {
        let dir = resolve_data_dir(Some("/tmp/waymark-test"));
        assert_eq!(dir, PathBuf::from("/tmp/waymark-test"));
    }

    #[test]
    fn ensure_data_dir_creates_and_joins() {
        let tmp = tempfile::tempdir().unwrap();
        let nested = tmp.path().join("deep").join("dir");
        let db_path = ensure_data_dir(&nested, "waymark.db").unwrap();
        assert!(nested.exists());
        assert!(db_path.ends_with("waymark.db"));
    }
}
