//! Command dispatch and pipeline assembly. The binary and the CLI adapter
//! both funnel through `run_cli`.

use crate::access::AccessGate;
use crate::config::{write_default_config_files, AppConfig, ConfigError, RoleSubstitutions};
use crate::dataset;
use crate::orchestration::{
    stdio_decision_port, DecisionPort, PipelineEngine, PipelineError, PipelineRoles, RunOutcome,
    RunState,
};
use crate::provider::{CapabilityProvider, HttpProvider, HttpProviderConfig, ProviderCredentials};
use crate::roles::{RoleProvisioner, RunPaths};
use crate::sandbox::{CodeSandbox, SandboxConfig};
use crate::tasks::TaskSpecBuilder;
use crate::tools::ToolHost;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

pub const API_KEY_ENV: &str = "DATASTEER_API_KEY";
pub const API_ORG_ENV: &str = "DATASTEER_API_ORG";
const DEFAULT_CONFIG_DIR: &str = "config";

const USAGE: &str = "usage: datasteer [command] [--config <dir>]

commands:
  run         start an interactive analysis run (default)
  init        write default config files into the config directory
  datasets    list registered datasets
  help        show this message";

pub fn run_cli(args: Vec<String>) -> Result<String, String> {
    let (command, config_dir) = parse_args(args)?;
    match command.as_str() {
        "run" => cmd_run(&config_dir),
        "init" => cmd_init(&config_dir),
        "datasets" => cmd_datasets(&config_dir),
        "help" => Ok(USAGE.to_string()),
        other => Err(format!("unknown command `{other}`\n\n{USAGE}")),
    }
}

fn parse_args(args: Vec<String>) -> Result<(String, PathBuf), String> {
    let mut command = None;
    let mut config_dir = PathBuf::from(DEFAULT_CONFIG_DIR);
    let mut iter = args.into_iter();

    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" => {
                let dir = iter
                    .next()
                    .ok_or_else(|| "`--config` requires a directory argument".to_string())?;
                config_dir = PathBuf::from(dir);
            }
            "--help" | "-h" => {
                command.get_or_insert("help".to_string());
            }
            other if command.is_none() => command = Some(other.to_string()),
            other => return Err(format!("unexpected argument `{other}`\n\n{USAGE}")),
        }
    }

    Ok((command.unwrap_or_else(|| "run".to_string()), config_dir))
}

fn cmd_init(config_dir: &Path) -> Result<String, String> {
    let written = write_default_config_files(config_dir).map_err(|e| e.to_string())?;
    if written.is_empty() {
        return Ok(format!(
            "config directory {} already initialized",
            config_dir.display()
        ));
    }
    let listing = written
        .iter()
        .map(|path| format!("  {}", path.display()))
        .collect::<Vec<_>>()
        .join("\n");
    Ok(format!("wrote default config files:\n{listing}"))
}

fn cmd_datasets(config_dir: &Path) -> Result<String, String> {
    let config = AppConfig::from_dir(config_dir).map_err(|e| e.to_string())?;
    let gate = AccessGate::new(config.access.clone());
    let listing = gate
        .registered_datasets()
        .map(|(name, path)| format!("  {name} -> {}", path.display()))
        .collect::<Vec<_>>()
        .join("\n");
    Ok(format!("registered datasets:\n{listing}"))
}

fn cmd_run(config_dir: &Path) -> Result<String, String> {
    let config = AppConfig::from_dir(config_dir).map_err(|e| e.to_string())?;
    let credentials = credentials_from_env().map_err(|e| e.to_string())?;

    let stdin = io::stdin();
    let mut input = stdin.lock();
    let stdout = io::stdout();
    let mut output = stdout.lock();

    let user = read_prompt(&mut input, &mut output, "username: ")?;
    let dataset = read_prompt(&mut input, &mut output, "dataset (e.g. chinook.db): ")?;
    let query = read_prompt(&mut input, &mut output, "analysis query: ")?;
    drop(input);
    drop(output);

    let provider = HttpProvider::new(credentials, HttpProviderConfig::default());
    let request = LaunchRequest {
        config: &config,
        user: &user,
        dataset: &dataset,
        query: &query,
    };
    let summary =
        launch(&request, provider, stdio_decision_port()).map_err(|e| e.to_string())?;

    match summary.outcome {
        RunOutcome::Completed { report_path } => Ok(format!(
            "report written to {} ({} provider invocations)",
            report_path.display(),
            summary.provider_invocations
        )),
        RunOutcome::Aborted => Ok("run terminated; no report generated".to_string()),
    }
}

fn credentials_from_env() -> Result<ProviderCredentials, ConfigError> {
    let api_key = std::env::var(API_KEY_ENV)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| ConfigError::MissingEnvVar(API_KEY_ENV.to_string()))?;
    let api_org = std::env::var(API_ORG_ENV).unwrap_or_default();
    Ok(ProviderCredentials { api_key, api_org })
}

fn read_prompt<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    label: &str,
) -> Result<String, String> {
    write!(output, "{label}").map_err(|e| format!("failed to write prompt: {e}"))?;
    output
        .flush()
        .map_err(|e| format!("failed to flush prompt: {e}"))?;
    let mut line = String::new();
    let read = input
        .read_line(&mut line)
        .map_err(|e| format!("failed to read input: {e}"))?;
    if read == 0 {
        return Err("input stream closed".to_string());
    }
    Ok(line.trim().to_string())
}

#[derive(Debug, Clone)]
pub struct LaunchRequest<'a> {
    pub config: &'a AppConfig,
    pub user: &'a str,
    pub dataset: &'a str,
    pub query: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub outcome: RunOutcome,
    pub provider_invocations: u32,
}

/// Wires one pipeline run: access gate, dataset probe, role provisioning,
/// tool host, engine. The gate and provisioning run to completion before
/// the state machine starts; any failure here means the machine was never
/// entered.
pub fn launch<P: CapabilityProvider, D: DecisionPort>(
    request: &LaunchRequest<'_>,
    provider: P,
    decisions: D,
) -> Result<RunSummary, PipelineError> {
    let gate = AccessGate::new(request.config.access.clone());
    let dataset_path = gate.verify(request.user, request.dataset)?;
    let overview = dataset::probe(&dataset_path)
        .map_err(|err| PipelineError::Setup(err.to_string()))?
        .describe();

    let state = RunState::new(
        request.user,
        request.dataset,
        &dataset_path,
        gate.result_path(),
        request.query,
    )?;
    let paths = RunPaths::derive(state.result_path(), state.dataset_name());

    let subs = RoleSubstitutions {
        dataset_name: state.dataset_name().to_string(),
        result_path: paths.run_dir.display().to_string(),
    };
    let provisioner = RoleProvisioner::provision(
        &request.config.roles_path(),
        &subs,
        &paths.run_dir,
        &paths.images_dir,
    )?;
    let roles = PipelineRoles {
        analyst: provisioner.create("analyst", &provisioner.declared_tools("analyst")?)?,
        visualizer: provisioner.create("visualizer", &provisioner.declared_tools("visualizer")?)?,
        reporter: provisioner.create("reporter", &provisioner.declared_tools("reporter")?)?,
    };

    let sandbox = CodeSandbox::new(SandboxConfig::new(&paths.run_dir));
    let tools = ToolHost::new()
        .with_sandbox(sandbox)
        .with_plot_style(request.config.plot_style.clone());
    let tasks = TaskSpecBuilder::new(request.config.tasks.clone());

    let mut engine = PipelineEngine::new(state, paths, tasks, roles, tools, provider, decisions)
        .with_dataset_overview(overview);
    let outcome = engine.run()?;
    Ok(RunSummary {
        outcome,
        provider_invocations: engine.provider_invocations(),
    })
}
