//! The pipeline engine. Drives the stage sequence over the run state and
//! resolves review decisions into transitions. Strictly sequential: a
//! stage's state mutation is committed before the review point reads it,
//! and the review decision is applied before the next stage runs.

use crate::orchestration::decision::{
    AnalysisReviewDecision, DecisionPort, VisualizationReviewDecision,
};
use crate::orchestration::error::PipelineError;
use crate::orchestration::logging::append_run_log;
use crate::orchestration::machine::{apply, Stage, TransitionLabel};
use crate::orchestration::state::RunState;
use crate::provider::CapabilityProvider;
use crate::roles::{RoleDescriptor, RunPaths};
use crate::tasks::{ContextBlocks, TaskSpec, TaskSpecBuilder};
use crate::tools::ToolHost;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// The three capability profiles for the run, built once at provisioning.
#[derive(Debug, Clone)]
pub struct PipelineRoles {
    pub analyst: RoleDescriptor,
    pub visualizer: RoleDescriptor,
    pub reporter: RoleDescriptor,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The report stage ran and its file was written.
    Completed { report_path: PathBuf },
    /// The human quit at a review point; no report was generated.
    Aborted,
}

pub struct PipelineEngine<P: CapabilityProvider, D: DecisionPort> {
    state: RunState,
    stage: Stage,
    paths: RunPaths,
    tasks: TaskSpecBuilder,
    roles: PipelineRoles,
    tools: ToolHost,
    provider: P,
    decisions: D,
    dataset_overview: Option<String>,
    invocations: u32,
}

impl<P: CapabilityProvider, D: DecisionPort> PipelineEngine<P, D> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        state: RunState,
        paths: RunPaths,
        tasks: TaskSpecBuilder,
        roles: PipelineRoles,
        tools: ToolHost,
        provider: P,
        decisions: D,
    ) -> Self {
        Self {
            state,
            stage: Stage::Start,
            paths,
            tasks,
            roles,
            tools,
            provider,
            decisions,
            dataset_overview: None,
            invocations: 0,
        }
    }

    pub fn with_dataset_overview(mut self, overview: impl Into<String>) -> Self {
        self.dataset_overview = Some(overview.into());
        self
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn provider_invocations(&self) -> u32 {
        self.invocations
    }

    /// Runs the pipeline to termination. Fires once per engine.
    pub fn run(&mut self) -> Result<RunOutcome, PipelineError> {
        append_run_log(
            &self.paths.run_dir,
            "run_started",
            &format!("user={} dataset={}", self.state.user(), self.state.dataset_name()),
        );
        self.transition(TransitionLabel::Begin)?;

        loop {
            match self.stage {
                Stage::Analysis => {
                    self.run_analysis()?;
                    self.transition(TransitionLabel::AnalysisDone)?;
                }
                Stage::ReviewAnalysis => {
                    let label = self.review_analysis_point()?;
                    self.transition(label)?;
                }
                Stage::Visualization => {
                    self.run_visualization()?;
                    self.transition(TransitionLabel::VisualizationDone)?;
                }
                Stage::ReviewVisualization => {
                    let label = self.review_visualization_point()?;
                    self.transition(label)?;
                }
                Stage::Report => {
                    let report_path = self.run_report()?;
                    self.transition(TransitionLabel::ReportDone)?;
                    return Ok(RunOutcome::Completed { report_path });
                }
                Stage::Terminated => {
                    append_run_log(&self.paths.run_dir, "run_terminated", "user quit");
                    return Ok(RunOutcome::Aborted);
                }
                Stage::Start => {
                    return Err(PipelineError::StageOrder(
                        "engine re-entered the start stage".to_string(),
                    ));
                }
            }
        }
    }

    fn transition(&mut self, label: TransitionLabel) -> Result<(), PipelineError> {
        let next = apply(self.stage, label).ok_or_else(|| {
            PipelineError::StageOrder(format!(
                "no transition from `{}` on `{label}`",
                self.stage
            ))
        })?;
        append_run_log(
            &self.paths.run_dir,
            "transition",
            &format!("{} --{label}--> {next}", self.stage),
        );
        self.stage = next;
        Ok(())
    }

    fn invoke(
        &mut self,
        stage: Stage,
        role: &RoleDescriptor,
        task: &TaskSpec,
    ) -> Result<String, PipelineError> {
        self.invocations += 1;
        append_run_log(
            &self.paths.run_dir,
            "provider_invoked",
            &format!("stage={stage} role={}", role.name),
        );
        self.provider
            .invoke(role, task, &self.tools)
            .map_err(|source| PipelineError::Provider { stage, source })
    }

    fn task_values(&self, output_path: &Path, context: String) -> BTreeMap<String, String> {
        BTreeMap::from_iter([
            (
                "dataset_path".to_string(),
                self.state.dataset_path().display().to_string(),
            ),
            (
                "dataset_name".to_string(),
                self.state.dataset_name().to_string(),
            ),
            ("user_query".to_string(), self.state.query.clone()),
            ("context".to_string(), context),
            (
                "output_path".to_string(),
                output_path.display().to_string(),
            ),
        ])
    }

    fn analysis_context(&self) -> String {
        let mut parts = Vec::new();
        if let Some(overview) = &self.dataset_overview {
            parts.push(format!("Dataset overview: {overview}"));
        }
        let transcript = self.state.history_transcript();
        if !transcript.is_empty() {
            parts.push(transcript);
        }
        if !self.state.analysis_feedback.is_empty() {
            parts.push(format!("Steering notes: {}", self.state.analysis_feedback));
        }
        parts.join("\n\n")
    }

    fn visualization_context(&self) -> String {
        let mut parts = Vec::new();
        let transcript = self.state.history_transcript();
        if !transcript.is_empty() {
            parts.push(transcript);
        }
        if !self.state.viz_feedback.is_empty() {
            parts.push(format!("Plot feedback: {}", self.state.viz_feedback));
        }
        parts.join("\n\n")
    }

    fn run_analysis(&mut self) -> Result<(), PipelineError> {
        append_run_log(&self.paths.run_dir, "stage_started", Stage::Analysis.as_str());
        let values = self.task_values(&self.paths.run_dir.clone(), self.analysis_context());
        let task = self.tasks.build("analysis", &values, &ContextBlocks::default())?;
        let role = self.roles.analyst.clone();
        let output = self.invoke(Stage::Analysis, &role, &task)?;
        self.state.analysis_output = output.clone();
        self.state.record_interaction(Stage::Analysis, &output);
        append_run_log(&self.paths.run_dir, "stage_finished", Stage::Analysis.as_str());
        Ok(())
    }

    fn run_visualization(&mut self) -> Result<(), PipelineError> {
        if self.state.analysis_output.trim().is_empty() {
            return Err(PipelineError::StageOrder(
                "visualization requires a prior analysis result".to_string(),
            ));
        }
        append_run_log(
            &self.paths.run_dir,
            "stage_started",
            Stage::Visualization.as_str(),
        );
        let values =
            self.task_values(&self.paths.images_dir.clone(), self.visualization_context());
        let context = ContextBlocks {
            analyst: Some(self.state.analysis_output.clone()),
            ..ContextBlocks::default()
        };
        let task = self.tasks.build("visualization", &values, &context)?;
        let role = self.roles.visualizer.clone();
        let output = self.invoke(Stage::Visualization, &role, &task)?;
        self.state.viz_output = output.clone();
        self.state.record_interaction(Stage::Visualization, &output);
        append_run_log(
            &self.paths.run_dir,
            "stage_finished",
            Stage::Visualization.as_str(),
        );
        Ok(())
    }

    fn run_report(&mut self) -> Result<PathBuf, PipelineError> {
        if self.state.analysis_output.trim().is_empty() || self.state.viz_output.trim().is_empty()
        {
            return Err(PipelineError::StageOrder(
                "report requires analysis and visualization results".to_string(),
            ));
        }
        append_run_log(&self.paths.run_dir, "stage_started", Stage::Report.as_str());
        let values =
            self.task_values(&self.paths.run_dir.clone(), self.state.history_transcript());
        let context = ContextBlocks {
            analyst: Some(self.state.analysis_output.clone()),
            visualizer: Some(self.state.viz_output.clone()),
            user_query: Some(self.state.query.clone()),
        };
        let task = self.tasks.build("report", &values, &context)?;
        let role = self.roles.reporter.clone();
        let output = self.invoke(Stage::Report, &role, &task)?;

        let report_path = task
            .output_path
            .clone()
            .unwrap_or_else(|| self.paths.report_path.clone());
        fs::write(&report_path, &output).map_err(|source| PipelineError::WriteReport {
            path: report_path.display().to_string(),
            source,
        })?;
        self.state.record_interaction(Stage::Report, &output);
        append_run_log(
            &self.paths.run_dir,
            "report_written",
            &report_path.display().to_string(),
        );
        Ok(report_path)
    }

    fn review_analysis_point(&mut self) -> Result<TransitionLabel, PipelineError> {
        let decision = self
            .decisions
            .review_analysis(&self.state.analysis_output)?;
        let label = match decision {
            AnalysisReviewDecision::Retry { query, feedback } => {
                if let Some(query) = query {
                    if !query.trim().is_empty() {
                        self.state.query = query.trim().to_string();
                    }
                }
                self.state.analysis_feedback = feedback
                    .map(|text| text.trim().to_string())
                    .unwrap_or_default();
                TransitionLabel::Retry
            }
            AnalysisReviewDecision::Proceed => {
                self.state.analysis_feedback.clear();
                TransitionLabel::Proceed
            }
            AnalysisReviewDecision::Quit => TransitionLabel::Quit,
        };
        append_run_log(&self.paths.run_dir, "decision", label.as_str());
        Ok(label)
    }

    fn review_visualization_point(&mut self) -> Result<TransitionLabel, PipelineError> {
        let decision = self
            .decisions
            .review_visualization(&self.state.viz_output)?;
        let label = match decision {
            VisualizationReviewDecision::NewPlots { feedback } => {
                self.state.viz_feedback = feedback.trim().to_string();
                TransitionLabel::NewPlots
            }
            VisualizationReviewDecision::Restart { query } => {
                if let Some(query) = query {
                    if !query.trim().is_empty() {
                        self.state.query = query.trim().to_string();
                    }
                }
                // A full re-analysis invalidates prior steering context.
                self.state.viz_feedback.clear();
                self.state.analysis_feedback.clear();
                TransitionLabel::Restart
            }
            VisualizationReviewDecision::Proceed { report_note } => {
                if let Some(note) = report_note {
                    if !note.trim().is_empty() {
                        self.state.query = note.trim().to_string();
                    }
                }
                TransitionLabel::Proceed
            }
            VisualizationReviewDecision::Quit => TransitionLabel::Quit,
        };
        append_run_log(&self.paths.run_dir, "decision", label.as_str());
        Ok(label)
    }
}
