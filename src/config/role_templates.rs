use crate::config::ConfigError;
use crate::tools::ToolId;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Capability profile for one role as configured: display role line,
/// objective, persona text, code-execution permission, and bindable tools.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RoleTemplate {
    pub role: String,
    pub goal: String,
    pub backstory: String,
    #[serde(default)]
    pub allow_code_execution: bool,
    #[serde(default)]
    pub tools: Vec<String>,
}

/// Values substituted into the raw role file before parsing. Role text may
/// reference `{dataset_name}` and `{result_path}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleSubstitutions {
    pub dataset_name: String,
    pub result_path: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(transparent)]
pub struct RoleTemplates(BTreeMap<String, RoleTemplate>);

impl RoleTemplates {
    pub fn from_path(path: &Path, subs: &RoleSubstitutions) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml(&raw, subs).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn from_yaml(raw: &str, subs: &RoleSubstitutions) -> Result<Self, serde_yaml::Error> {
        let resolved = raw
            .replace("{dataset_name}", &subs.dataset_name)
            .replace("{result_path}", &subs.result_path);
        serde_yaml::from_str(&resolved)
    }

    pub fn get(&self, name: &str) -> Option<&RoleTemplate> {
        self.0.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn validate(&self, required: &[&str]) -> Result<(), ConfigError> {
        for name in required {
            if !self.0.contains_key(*name) {
                return Err(ConfigError::RoleTemplates(format!(
                    "missing role template `{name}`"
                )));
            }
        }
        for (name, role) in &self.0 {
            if role.role.trim().is_empty() || role.goal.trim().is_empty() {
                return Err(ConfigError::RoleTemplates(format!(
                    "role `{name}` must set non-empty `role` and `goal`"
                )));
            }
            for tool in &role.tools {
                ToolId::try_from(tool.as_str()).map_err(|reason| {
                    ConfigError::RoleTemplates(format!("role `{name}`: {reason}"))
                })?;
            }
        }
        Ok(())
    }
}
