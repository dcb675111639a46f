use crate::config::ConfigError;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Data-governance table: where results go, which datasets exist, and which
/// user may touch which dataset. The gate in `crate::access` consumes this.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AccessRules {
    pub result_path: PathBuf,
    pub datasets: BTreeMap<String, PathBuf>,
    pub permissions: BTreeMap<String, Vec<String>>,
}

impl AccessRules {
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let rules: Self = serde_yaml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;
        Ok(rules)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.result_path.as_os_str().is_empty() {
            return Err(ConfigError::AccessRules(
                "result_path must be non-empty".to_string(),
            ));
        }
        for (name, path) in &self.datasets {
            if name.trim().is_empty() {
                return Err(ConfigError::AccessRules(
                    "dataset names must be non-empty".to_string(),
                ));
            }
            if path.as_os_str().is_empty() {
                return Err(ConfigError::AccessRules(format!(
                    "dataset `{name}` has an empty path"
                )));
            }
        }
        for user in self.permissions.keys() {
            if user.trim().is_empty() {
                return Err(ConfigError::AccessRules(
                    "user names must be non-empty".to_string(),
                ));
            }
        }
        Ok(())
    }
}
