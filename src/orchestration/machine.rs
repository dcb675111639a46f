//! The stage machine as an explicit transition table. Every legal
//! transition is one `(Stage, TransitionLabel)` pair here; anything else is
//! `None`. The engine never moves between stages except through `apply`.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Start,
    Analysis,
    ReviewAnalysis,
    Visualization,
    ReviewVisualization,
    Report,
    Terminated,
}

pub const ALL_STAGES: &[Stage] = &[
    Stage::Start,
    Stage::Analysis,
    Stage::ReviewAnalysis,
    Stage::Visualization,
    Stage::ReviewVisualization,
    Stage::Report,
    Stage::Terminated,
];

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Start => "start",
            Stage::Analysis => "analysis",
            Stage::ReviewAnalysis => "review_analysis",
            Stage::Visualization => "visualization",
            Stage::ReviewVisualization => "review_visualization",
            Stage::Report => "report",
            Stage::Terminated => "terminated",
        }
    }

    pub fn is_terminal(self) -> bool {
        self == Stage::Terminated
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionLabel {
    Begin,
    AnalysisDone,
    Retry,
    Proceed,
    VisualizationDone,
    NewPlots,
    Restart,
    ReportDone,
    Quit,
}

pub const ALL_LABELS: &[TransitionLabel] = &[
    TransitionLabel::Begin,
    TransitionLabel::AnalysisDone,
    TransitionLabel::Retry,
    TransitionLabel::Proceed,
    TransitionLabel::VisualizationDone,
    TransitionLabel::NewPlots,
    TransitionLabel::Restart,
    TransitionLabel::ReportDone,
    TransitionLabel::Quit,
];

impl TransitionLabel {
    pub fn as_str(self) -> &'static str {
        match self {
            TransitionLabel::Begin => "begin",
            TransitionLabel::AnalysisDone => "analysis_done",
            TransitionLabel::Retry => "retry",
            TransitionLabel::Proceed => "proceed",
            TransitionLabel::VisualizationDone => "visualization_done",
            TransitionLabel::NewPlots => "new_plots",
            TransitionLabel::Restart => "restart",
            TransitionLabel::ReportDone => "report_done",
            TransitionLabel::Quit => "quit",
        }
    }
}

impl std::fmt::Display for TransitionLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The transition table. `Quit` is legal only at review points; `Terminated`
/// is absorbing.
pub fn apply(stage: Stage, label: TransitionLabel) -> Option<Stage> {
    use Stage::*;
    use TransitionLabel::*;

    match (stage, label) {
        (Start, Begin) => Some(Analysis),
        (Analysis, AnalysisDone) => Some(ReviewAnalysis),
        (ReviewAnalysis, Retry) => Some(Analysis),
        (ReviewAnalysis, Proceed) => Some(Visualization),
        (Visualization, VisualizationDone) => Some(ReviewVisualization),
        (ReviewVisualization, NewPlots) => Some(Visualization),
        (ReviewVisualization, Restart) => Some(Analysis),
        (ReviewVisualization, Proceed) => Some(Report),
        (Report, ReportDone) => Some(Terminated),
        (ReviewAnalysis | ReviewVisualization, Quit) => Some(Terminated),
        _ => None,
    }
}
