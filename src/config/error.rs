#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to create directory {path}: {source}")]
    CreateDir {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write file {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid yaml in {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("access rules validation failed: {0}")]
    AccessRules(String),
    #[error("role template validation failed: {0}")]
    RoleTemplates(String),
    #[error("task template validation failed: {0}")]
    TaskTemplates(String),
    #[error("plot style validation failed: {0}")]
    PlotStyle(String),
    #[error("missing required environment variable `{0}`")]
    MissingEnvVar(String),
}
