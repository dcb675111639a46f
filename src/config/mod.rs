pub mod access_rules;
pub mod defaults;
pub mod error;
pub mod role_templates;
pub mod style;
pub mod task_templates;

pub use access_rules::AccessRules;
pub use defaults::{
    default_access_rules_yaml, default_plot_style_yaml, default_roles_yaml, default_tasks_yaml,
    write_default_config_files,
};
pub use error::ConfigError;
pub use role_templates::{RoleSubstitutions, RoleTemplate, RoleTemplates};
pub use style::{PlotStyleConfig, PLOT_STYLE_KINDS};
pub use task_templates::{TaskTemplate, TaskTemplates};

use std::path::{Path, PathBuf};

pub const ACCESS_FILE: &str = "access.yaml";
pub const ROLES_FILE: &str = "roles.yaml";
pub const TASKS_FILE: &str = "tasks.yaml";
pub const STYLE_FILE: &str = "plot_style.yaml";

/// Task templates every pipeline run requires.
pub const REQUIRED_TASKS: &[&str] = &["analysis", "visualization", "report"];
/// Roles every pipeline run requires.
pub const REQUIRED_ROLES: &[&str] = &["analyst", "visualizer", "reporter"];

/// All startup configuration, loaded and validated once and injected into
/// constructors. A missing or malformed file is fatal here; the pipeline
/// never starts in a partially configured state.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub config_dir: PathBuf,
    pub access: AccessRules,
    pub tasks: TaskTemplates,
    pub plot_style: PlotStyleConfig,
}

impl AppConfig {
    pub fn from_dir(dir: &Path) -> Result<Self, ConfigError> {
        let access = AccessRules::from_path(&dir.join(ACCESS_FILE))?;
        access.validate()?;

        let tasks = TaskTemplates::from_path(&dir.join(TASKS_FILE))?;
        tasks.validate(REQUIRED_TASKS)?;

        let plot_style = PlotStyleConfig::from_path(&dir.join(STYLE_FILE))?;
        plot_style.validate()?;

        // Structural check of the role file up front; the provisioner
        // re-loads it with the run's real substitutions.
        let probe = RoleSubstitutions {
            dataset_name: "dataset".to_string(),
            result_path: "results".to_string(),
        };
        let roles = RoleTemplates::from_path(&dir.join(ROLES_FILE), &probe)?;
        roles.validate(REQUIRED_ROLES)?;

        Ok(Self {
            config_dir: dir.to_path_buf(),
            access,
            tasks,
            plot_style,
        })
    }

    pub fn roles_path(&self) -> PathBuf {
        self.config_dir.join(ROLES_FILE)
    }
}
