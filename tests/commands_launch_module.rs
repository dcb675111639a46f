use datasteer::commands::{launch, LaunchRequest};
use datasteer::config::{write_default_config_files, AppConfig};
use datasteer::orchestration::{
    AnalysisReviewDecision, PipelineError, RunOutcome, ScriptedDecisionPort,
    VisualizationReviewDecision,
};
use datasteer::provider::{CapabilityProvider, ProviderError};
use datasteer::roles::RoleDescriptor;
use datasteer::tasks::TaskSpec;
use datasteer::tools::ToolHost;
use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Default)]
struct StubProvider {
    invocations: RefCell<u32>,
}

impl CapabilityProvider for StubProvider {
    fn invoke(
        &self,
        role: &RoleDescriptor,
        _task: &TaskSpec,
        _tools: &ToolHost,
    ) -> Result<String, ProviderError> {
        *self.invocations.borrow_mut() += 1;
        Ok(format!("{} finished", role.name))
    }
}

struct Fixture {
    config_dir: PathBuf,
    results_root: PathBuf,
    _guard: tempfile::TempDir,
}

fn fixture() -> Fixture {
    let guard = tempfile::tempdir().expect("tempdir");
    let root = guard.path();
    let config_dir = root.join("config");
    write_default_config_files(&config_dir).expect("scaffold");

    let datas_dir = root.join("datas");
    fs::create_dir_all(&datas_dir).expect("datas dir");
    seed_dataset(&datas_dir.join("chinook.db"));

    let results_root = root.join("results");
    fs::write(
        config_dir.join("access.yaml"),
        format!(
            r#"result_path: {}
datasets:
  chinook.db: {}
permissions:
  admin: [chinook.db]
  userC: [chinook.db]
  userS: [sakila.db]
"#,
            results_root.display(),
            datas_dir.join("chinook.db").display()
        ),
    )
    .expect("access.yaml");

    Fixture {
        config_dir,
        results_root,
        _guard: guard,
    }
}

fn seed_dataset(path: &Path) {
    let conn = rusqlite::Connection::open(path).expect("create dataset");
    conn.execute_batch(
        "CREATE TABLE albums (id INTEGER PRIMARY KEY, title TEXT);
         INSERT INTO albums (title) VALUES ('one'), ('two');",
    )
    .expect("seed dataset");
}

#[test]
fn granted_run_drives_all_three_stages_and_writes_one_report() {
    let fixture = fixture();
    let config = AppConfig::from_dir(&fixture.config_dir).expect("config");
    let provider = StubProvider::default();
    let decisions = ScriptedDecisionPort::new(
        vec![AnalysisReviewDecision::Proceed],
        vec![VisualizationReviewDecision::Proceed { report_note: None }],
    );

    let request = LaunchRequest {
        config: &config,
        user: "userC",
        dataset: "chinook.db",
        query: "how many albums?",
    };
    let summary = launch(&request, &provider, decisions).expect("run");

    assert_eq!(summary.provider_invocations, 3);
    assert_eq!(*provider.invocations.borrow(), 3);
    let report_path = fixture.results_root.join("chinook").join("chinook.md");
    assert_eq!(
        summary.outcome,
        RunOutcome::Completed {
            report_path: report_path.clone()
        }
    );
    let report = fs::read_to_string(&report_path).expect("report");
    assert_eq!(report, "reporter finished");
    assert!(fixture.results_root.join("chinook").join("images").is_dir());
}

#[test]
fn denial_aborts_before_any_side_effects() {
    let fixture = fixture();
    let config = AppConfig::from_dir(&fixture.config_dir).expect("config");
    let provider = StubProvider::default();
    let decisions = ScriptedDecisionPort::new(Vec::new(), Vec::new());

    let request = LaunchRequest {
        config: &config,
        user: "stranger",
        dataset: "chinook.db",
        query: "anything",
    };
    let err = launch(&request, &provider, decisions).expect_err("denied");

    assert!(matches!(err, PipelineError::Access(_)));
    assert_eq!(*provider.invocations.borrow(), 0);
    assert!(!fixture.results_root.exists(), "no directories on denial");
}

#[test]
fn authorized_but_unregistered_dataset_is_denied() {
    let fixture = fixture();
    let config = AppConfig::from_dir(&fixture.config_dir).expect("config");
    let provider = StubProvider::default();
    let decisions = ScriptedDecisionPort::new(Vec::new(), Vec::new());

    let request = LaunchRequest {
        config: &config,
        user: "userS",
        dataset: "sakila.db",
        query: "anything",
    };
    let err = launch(&request, &provider, decisions).expect_err("denied");
    assert!(matches!(err, PipelineError::Access(_)));
}

#[test]
fn quit_at_first_review_leaves_no_report_behind() {
    let fixture = fixture();
    let config = AppConfig::from_dir(&fixture.config_dir).expect("config");
    let provider = StubProvider::default();
    let decisions =
        ScriptedDecisionPort::new(vec![AnalysisReviewDecision::Quit], Vec::new());

    let request = LaunchRequest {
        config: &config,
        user: "userC",
        dataset: "chinook.db",
        query: "how many albums?",
    };
    let summary = launch(&request, &provider, decisions).expect("run");

    assert_eq!(summary.outcome, RunOutcome::Aborted);
    assert_eq!(summary.provider_invocations, 1);
    assert!(!fixture
        .results_root
        .join("chinook")
        .join("chinook.md")
        .exists());
}
