use datasteer::config::TaskTemplates;
use datasteer::orchestration::{
    AnalysisReviewDecision, PipelineEngine, PipelineError, PipelineRoles, RunOutcome, RunState,
    ScriptedDecisionPort, Stage, VisualizationReviewDecision,
};
use datasteer::provider::{CapabilityProvider, ProviderError};
use datasteer::roles::{RoleDescriptor, RunPaths};
use datasteer::tasks::{TaskSpec, TaskSpecBuilder};
use datasteer::tools::ToolHost;
use std::cell::RefCell;
use std::path::Path;

#[derive(Default)]
struct StubProvider {
    calls: RefCell<Vec<(String, String)>>,
    fail_on_role: Option<String>,
}

impl StubProvider {
    fn failing_at(role: &str) -> Self {
        Self {
            calls: RefCell::new(Vec::new()),
            fail_on_role: Some(role.to_string()),
        }
    }

    fn instructions_for(&self, role: &str) -> Vec<String> {
        self.calls
            .borrow()
            .iter()
            .filter(|(name, _)| name == role)
            .map(|(_, instruction)| instruction.clone())
            .collect()
    }
}

impl CapabilityProvider for StubProvider {
    fn invoke(
        &self,
        role: &RoleDescriptor,
        task: &TaskSpec,
        _tools: &ToolHost,
    ) -> Result<String, ProviderError> {
        if self.fail_on_role.as_deref() == Some(role.name.as_str()) {
            return Err(ProviderError::Request("backend unavailable".to_string()));
        }
        self.calls
            .borrow_mut()
            .push((role.name.clone(), task.instruction.clone()));
        Ok(format!("{} result #{}", role.name, self.calls.borrow().len()))
    }
}

fn role(name: &str) -> RoleDescriptor {
    RoleDescriptor {
        name: name.to_string(),
        objective: format!("{name} objective"),
        persona: format!("{name} persona"),
        tools: Vec::new(),
        allow_code_execution: false,
    }
}

fn task_builder() -> TaskSpecBuilder {
    let templates: TaskTemplates = serde_yaml::from_str(
        r#"
analysis:
  description: "analyze {dataset_path} q={user_query} ctx={context}"
  expected_output: findings
visualization:
  description: "plot into {output_path} ctx={context}"
  expected_output: images
report:
  description: "report on {dataset_name} q={user_query}"
  expected_output: markdown
  output_path: "{output_path}/{dataset_name}.md"
"#,
    )
    .expect("templates");
    TaskSpecBuilder::new(templates)
}

fn engine<'a>(
    results_root: &Path,
    provider: &'a StubProvider,
    decisions: ScriptedDecisionPort,
) -> PipelineEngine<&'a StubProvider, ScriptedDecisionPort> {
    let state = RunState::new(
        "userC",
        "chinook.db",
        Path::new("/data/chinook.db"),
        results_root,
        "how many tables?",
    )
    .expect("state");
    let paths = RunPaths::derive(state.result_path(), state.dataset_name());
    std::fs::create_dir_all(&paths.images_dir).expect("dirs");
    let roles = PipelineRoles {
        analyst: role("analyst"),
        visualizer: role("visualizer"),
        reporter: role("reporter"),
    };
    PipelineEngine::new(
        state,
        paths,
        task_builder(),
        roles,
        ToolHost::new(),
        provider,
        decisions,
    )
    .with_dataset_overview("2 tables: albums (2 rows), artists (0 rows)")
}

#[test]
fn straight_run_invokes_each_role_once_and_writes_the_report() {
    let dir = tempfile::tempdir().expect("tempdir");
    let provider = StubProvider::default();
    let decisions = ScriptedDecisionPort::new(
        vec![AnalysisReviewDecision::Proceed],
        vec![VisualizationReviewDecision::Proceed { report_note: None }],
    );

    let mut engine = engine(dir.path(), &provider, decisions);
    let outcome = engine.run().expect("run");

    assert_eq!(engine.provider_invocations(), 3);
    assert_eq!(engine.stage(), Stage::Terminated);
    let RunOutcome::Completed { report_path } = outcome else {
        panic!("expected completion");
    };
    assert_eq!(
        report_path,
        dir.path().join("chinook").join("chinook.md")
    );
    let report = std::fs::read_to_string(&report_path).expect("report file");
    assert!(report.contains("reporter result"));
    assert_eq!(engine.state().history().len(), 3);
}

#[test]
fn retry_reruns_analysis_with_the_revised_query() {
    let dir = tempfile::tempdir().expect("tempdir");
    let provider = StubProvider::default();
    let decisions = ScriptedDecisionPort::new(
        vec![
            AnalysisReviewDecision::Retry {
                query: Some("top artists instead".to_string()),
                feedback: Some("ignore singles".to_string()),
            },
            AnalysisReviewDecision::Proceed,
        ],
        vec![VisualizationReviewDecision::Proceed { report_note: None }],
    );

    let mut engine = engine(dir.path(), &provider, decisions);
    engine.run().expect("run");

    assert_eq!(engine.provider_invocations(), 4);
    let analysis_runs = provider.instructions_for("analyst");
    assert_eq!(analysis_runs.len(), 2);
    assert!(analysis_runs[0].contains("q=how many tables?"));
    assert!(analysis_runs[1].contains("q=top artists instead"));
    assert!(analysis_runs[1].contains("Steering notes: ignore singles"));
    // First analysis result is visible to the second run as history.
    assert!(analysis_runs[1].contains("analyst result #1"));
    // Only stage execution appends history; the retry decision itself adds
    // nothing (2 analysis + 1 visualization + 1 report).
    assert_eq!(engine.state().history().len(), 4);
}

#[test]
fn quit_at_analysis_review_terminates_with_no_report() {
    let dir = tempfile::tempdir().expect("tempdir");
    let provider = StubProvider::default();
    let decisions =
        ScriptedDecisionPort::new(vec![AnalysisReviewDecision::Quit], Vec::new());

    let mut engine = engine(dir.path(), &provider, decisions);
    let outcome = engine.run().expect("run");

    assert_eq!(outcome, RunOutcome::Aborted);
    assert_eq!(engine.provider_invocations(), 1);
    assert!(!dir.path().join("chinook").join("chinook.md").exists());
}

#[test]
fn new_plots_reruns_visualization_with_feedback() {
    let dir = tempfile::tempdir().expect("tempdir");
    let provider = StubProvider::default();
    let decisions = ScriptedDecisionPort::new(
        vec![AnalysisReviewDecision::Proceed],
        vec![
            VisualizationReviewDecision::NewPlots {
                feedback: "use a heatmap".to_string(),
            },
            VisualizationReviewDecision::Proceed { report_note: None },
        ],
    );

    let mut engine = engine(dir.path(), &provider, decisions);
    engine.run().expect("run");

    assert_eq!(engine.provider_invocations(), 4);
    let viz_runs = provider.instructions_for("visualizer");
    assert_eq!(viz_runs.len(), 2);
    assert!(!viz_runs[0].contains("Plot feedback"));
    assert!(viz_runs[1].contains("Plot feedback: use a heatmap"));
}

#[test]
fn restart_returns_to_analysis_and_discards_viz_feedback() {
    let dir = tempfile::tempdir().expect("tempdir");
    let provider = StubProvider::default();
    let decisions = ScriptedDecisionPort::new(
        vec![AnalysisReviewDecision::Proceed, AnalysisReviewDecision::Proceed],
        vec![
            VisualizationReviewDecision::NewPlots {
                feedback: "use a heatmap".to_string(),
            },
            VisualizationReviewDecision::Restart {
                query: Some("start over with revenue".to_string()),
            },
            VisualizationReviewDecision::Proceed { report_note: None },
        ],
    );

    let mut engine = engine(dir.path(), &provider, decisions);
    let outcome = engine.run().expect("run");

    // analysis x2, visualization x3, report x1
    assert_eq!(engine.provider_invocations(), 6);
    assert!(matches!(outcome, RunOutcome::Completed { .. }));
    let viz_runs = provider.instructions_for("visualizer");
    assert_eq!(viz_runs.len(), 3);
    // Feedback set by new-plots is cleared by the restart.
    assert!(viz_runs[1].contains("Plot feedback: use a heatmap"));
    assert!(!viz_runs[2].contains("Plot feedback"));
    let analysis_runs = provider.instructions_for("analyst");
    assert!(analysis_runs[1].contains("q=start over with revenue"));
}

#[test]
fn report_note_at_proceed_reaches_the_report_task() {
    let dir = tempfile::tempdir().expect("tempdir");
    let provider = StubProvider::default();
    let decisions = ScriptedDecisionPort::new(
        vec![AnalysisReviewDecision::Proceed],
        vec![VisualizationReviewDecision::Proceed {
            report_note: Some("keep it to one page".to_string()),
        }],
    );

    let mut engine = engine(dir.path(), &provider, decisions);
    engine.run().expect("run");

    let report_runs = provider.instructions_for("reporter");
    assert_eq!(report_runs.len(), 1);
    assert!(report_runs[0].contains("q=keep it to one page"));
}

#[test]
fn provider_failure_aborts_the_run_with_no_report() {
    let dir = tempfile::tempdir().expect("tempdir");
    let provider = StubProvider::failing_at("visualizer");
    let decisions = ScriptedDecisionPort::new(
        vec![AnalysisReviewDecision::Proceed],
        Vec::new(),
    );

    let mut engine = engine(dir.path(), &provider, decisions);
    let err = engine.run().expect_err("provider failure");
    assert!(matches!(err, PipelineError::Provider { .. }));
    assert!(!dir.path().join("chinook").join("chinook.md").exists());
}

#[test]
fn proceed_leaves_the_accepted_analysis_output_intact() {
    let dir = tempfile::tempdir().expect("tempdir");
    let provider = StubProvider::default();
    let decisions = ScriptedDecisionPort::new(
        vec![AnalysisReviewDecision::Proceed],
        vec![VisualizationReviewDecision::Proceed { report_note: None }],
    );

    let mut engine = engine(dir.path(), &provider, decisions);
    engine.run().expect("run");
    assert_eq!(engine.state().analysis_output, "analyst result #1");
}
