pub mod decision;
pub mod engine;
pub mod error;
pub mod logging;
pub mod machine;
pub mod state;

pub use decision::{
    stdio_decision_port, AnalysisReviewDecision, ConsoleDecisionPort, DecisionError,
    DecisionPort, ScriptedDecisionPort, VisualizationReviewDecision,
};
pub use engine::{PipelineEngine, PipelineRoles, RunOutcome};
pub use error::PipelineError;
pub use machine::{apply, Stage, TransitionLabel, ALL_LABELS, ALL_STAGES};
pub use state::{InteractionRecord, RunState};
