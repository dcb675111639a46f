use crate::config::ConfigError;
use crate::tasks::{template, RECOGNIZED_PLACEHOLDERS};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// One stage's task template: instruction body, expected-output description,
/// and an optional output file path, all subject to placeholder substitution.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TaskTemplate {
    pub description: String,
    pub expected_output: String,
    #[serde(default)]
    pub output_path: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(transparent)]
pub struct TaskTemplates(BTreeMap<String, TaskTemplate>);

impl TaskTemplates {
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        serde_yaml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn get(&self, name: &str) -> Option<&TaskTemplate> {
        self.0.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Rejects template sets that would fail mid-run: missing stage
    /// templates, malformed placeholders, or references to unrecognized
    /// placeholder names.
    pub fn validate(&self, required: &[&str]) -> Result<(), ConfigError> {
        for name in required {
            if !self.0.contains_key(*name) {
                return Err(ConfigError::TaskTemplates(format!(
                    "missing task template `{name}`"
                )));
            }
        }

        for (name, task) in &self.0 {
            let sections = [
                ("description", task.description.as_str()),
                ("expected_output", task.expected_output.as_str()),
                ("output_path", task.output_path.as_deref().unwrap_or("")),
            ];
            for (section, text) in sections {
                let tokens = template::scan_placeholders(text).map_err(|reason| {
                    ConfigError::TaskTemplates(format!("task `{name}` {section}: {reason}"))
                })?;
                for token in tokens {
                    if !RECOGNIZED_PLACEHOLDERS.contains(&token.as_str()) {
                        return Err(ConfigError::TaskTemplates(format!(
                            "task `{name}` {section} references unrecognized placeholder `{{{token}}}`"
                        )));
                    }
                }
            }
        }

        Ok(())
    }
}
