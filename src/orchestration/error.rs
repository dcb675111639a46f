use crate::access::AccessError;
use crate::config::ConfigError;
use crate::orchestration::decision::DecisionError;
use crate::orchestration::machine::Stage;
use crate::provider::ProviderError;
use crate::roles::RoleError;
use crate::tasks::TaskError;

/// Run-level failure taxonomy. Access denials and configuration errors are
/// fatal before the state machine starts; provider failures abort the run
/// mid-flight. Sandbox failures never appear here (they degrade to stage
/// text), and invalid review input never leaves the decision port.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Access(#[from] AccessError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Role(#[from] RoleError),
    #[error(transparent)]
    Task(#[from] TaskError),
    #[error(transparent)]
    Decision(#[from] DecisionError),
    #[error("capability provider failed during {stage}: {source}")]
    Provider {
        stage: Stage,
        #[source]
        source: ProviderError,
    },
    #[error("run setup invalid: {0}")]
    Setup(String),
    #[error("stage order violation: {0}")]
    StageOrder(String),
    #[error("failed to write report {path}: {source}")]
    WriteReport {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
