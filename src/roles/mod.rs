//! Role provisioning: turns role templates into immutable capability
//! profiles for the run and prepares the run's output directories.

use crate::config::{ConfigError, RoleSubstitutions, RoleTemplates};
use crate::tools::ToolId;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum RoleError {
    #[error("no role template named `{role}`")]
    RoleNotFound { role: String },
    #[error("role `{role}` configuration invalid: {reason}")]
    InvalidRole { role: String, reason: String },
    #[error("failed to create directory {path}: {source}")]
    CreateDir {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Immutable capability profile presented to a capability provider: one
/// instance per role for the whole run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleDescriptor {
    pub name: String,
    pub objective: String,
    pub persona: String,
    pub tools: Vec<ToolId>,
    pub allow_code_execution: bool,
}

#[derive(Debug, Clone)]
pub struct RoleProvisioner {
    templates: RoleTemplates,
}

impl RoleProvisioner {
    /// Loads the role file with the run's substitutions and creates the
    /// run's result and images directories. Creating an already-existing
    /// directory is not an error.
    pub fn provision(
        roles_path: &Path,
        subs: &RoleSubstitutions,
        run_dir: &Path,
        images_dir: &Path,
    ) -> Result<Self, RoleError> {
        let templates = RoleTemplates::from_path(roles_path, subs)?;
        for dir in [run_dir, images_dir] {
            fs::create_dir_all(dir).map_err(|source| RoleError::CreateDir {
                path: dir.display().to_string(),
                source,
            })?;
        }
        Ok(Self { templates })
    }

    /// The tool identifiers a role's template declares.
    pub fn declared_tools(&self, role_name: &str) -> Result<Vec<ToolId>, RoleError> {
        let template =
            self.templates
                .get(role_name)
                .ok_or_else(|| RoleError::RoleNotFound {
                    role: role_name.to_string(),
                })?;
        template
            .tools
            .iter()
            .map(|raw| {
                ToolId::try_from(raw.as_str()).map_err(|reason| RoleError::InvalidRole {
                    role: role_name.to_string(),
                    reason,
                })
            })
            .collect()
    }

    /// Builds the role descriptor. Roles without code-execution permission
    /// never receive the sandbox binding, whatever was requested.
    pub fn create(
        &self,
        role_name: &str,
        tool_bindings: &[ToolId],
    ) -> Result<RoleDescriptor, RoleError> {
        let template =
            self.templates
                .get(role_name)
                .ok_or_else(|| RoleError::RoleNotFound {
                    role: role_name.to_string(),
                })?;

        let tools = tool_bindings
            .iter()
            .copied()
            .filter(|tool| template.allow_code_execution || *tool != ToolId::PythonRepl)
            .collect();

        Ok(RoleDescriptor {
            name: role_name.to_string(),
            objective: template.goal.clone(),
            persona: format!("{}\n{}", template.role.trim(), template.backstory.trim()),
            tools,
            allow_code_execution: template.allow_code_execution,
        })
    }
}

/// Derived output locations for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunPaths {
    pub run_dir: PathBuf,
    pub images_dir: PathBuf,
    pub report_path: PathBuf,
}

impl RunPaths {
    pub fn derive(result_path: &Path, dataset_name: &str) -> Self {
        let run_dir = result_path.join(dataset_name);
        Self {
            images_dir: run_dir.join("images"),
            report_path: run_dir.join(format!("{dataset_name}.md")),
            run_dir,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write_roles(dir: &Path) -> PathBuf {
        let path = dir.join("roles.yaml");
        fs::write(
            &path,
            r#"
analyst:
  role: Senior Data Analyst
  goal: "Dig into {dataset_name}"
  backstory: careful
  allow_code_execution: true
  tools: [python_repl]
reporter:
  role: Report Writer
  goal: summarize
  backstory: terse
  allow_code_execution: false
  tools: []
"#,
        )
        .expect("write roles");
        path
    }

    fn subs() -> RoleSubstitutions {
        RoleSubstitutions {
            dataset_name: "chinook".to_string(),
            result_path: "/tmp/r".to_string(),
        }
    }

    #[test]
    fn provision_creates_output_directories_idempotently() {
        let dir = tempdir().expect("tempdir");
        let roles_path = write_roles(dir.path());
        let paths = RunPaths::derive(&dir.path().join("results"), "chinook");

        for _ in 0..2 {
            RoleProvisioner::provision(&roles_path, &subs(), &paths.run_dir, &paths.images_dir)
                .expect("provision");
        }
        assert!(paths.images_dir.is_dir());
    }

    #[test]
    fn create_strips_sandbox_from_roles_without_code_execution() {
        let dir = tempdir().expect("tempdir");
        let roles_path = write_roles(dir.path());
        let paths = RunPaths::derive(&dir.path().join("results"), "chinook");
        let provisioner =
            RoleProvisioner::provision(&roles_path, &subs(), &paths.run_dir, &paths.images_dir)
                .expect("provision");

        let analyst = provisioner
            .create("analyst", &[ToolId::PythonRepl])
            .expect("analyst");
        assert_eq!(analyst.tools, vec![ToolId::PythonRepl]);
        assert_eq!(analyst.objective, "Dig into chinook");

        let reporter = provisioner
            .create("reporter", &[ToolId::PythonRepl, ToolId::PlotStyle])
            .expect("reporter");
        assert_eq!(reporter.tools, vec![ToolId::PlotStyle]);

        let missing = provisioner.create("stylist", &[]);
        assert!(matches!(missing, Err(RoleError::RoleNotFound { .. })));
    }

    #[test]
    fn run_paths_derive_report_and_images_locations() {
        let paths = RunPaths::derive(Path::new("/srv/results"), "chinook");
        assert_eq!(paths.report_path, PathBuf::from("/srv/results/chinook/chinook.md"));
        assert_eq!(paths.images_dir, PathBuf::from("/srv/results/chinook/images"));
    }
}
