//! Default configuration file contents, written by `datasteer init`.
//! Existing files are never overwritten.

use crate::config::{ConfigError, ACCESS_FILE, ROLES_FILE, STYLE_FILE, TASKS_FILE};
use std::fs;
use std::path::{Path, PathBuf};

pub fn default_access_rules_yaml() -> &'static str {
    r#"result_path: results
datasets:
  chinook.db: datas/chinook.db
  northwind_small.sqlite: datas/northwind_small.sqlite
  sakila.db: datas/sakila.db
permissions:
  admin: [chinook.db, northwind_small.sqlite, sakila.db]
  userC: [chinook.db]
  userN: [northwind_small.sqlite]
  userS: [sakila.db]
"#
}

pub fn default_roles_yaml() -> &'static str {
    r#"analyst:
  role: Senior Data Analyst
  goal: Answer analytical questions about the {dataset_name} dataset with verifiable numbers
  backstory: |
    A meticulous analyst who works directly against SQLite extracts and
    refuses to report an aggregate without re-computing it in code first.
  allow_code_execution: true
  tools: [python_repl]

visualizer:
  role: Data Visualization Specialist
  goal: Turn confirmed findings about {dataset_name} into clear, house-styled figures
  backstory: |
    Renders findings as figures, always fetching the house style parameters
    before plotting, and saves every image under {result_path}/images.
  allow_code_execution: true
  tools: [python_repl, plot_style]

reporter:
  role: Analytical Report Writer
  goal: Assemble the run's confirmed findings and figures into one Markdown report
  backstory: |
    Writes tight executive summaries. Never invents numbers; only restates
    what the analyst and visualizer produced, with figure references.
  allow_code_execution: false
  tools: []
"#
}

pub fn default_tasks_yaml() -> &'static str {
    r#"analysis:
  description: |
    You are working with the SQLite dataset at {dataset_path}.
    Answer the user's question with concrete, verifiable numbers. Use the
    python_repl tool for every query or computation; assign your final value
    to `result` or print it.

    User question: {user_query}

    Prior interactions:
    {context}
  expected_output: >
    A concise factual answer to the question, including the numbers it rests
    on and how they were computed.

visualization:
  description: |
    Create the plots that best support the findings below. Save every figure
    as a .png file under {output_path}. Fetch the house style parameters with
    the plot_style tool before plotting and apply them.

    Plot request: {user_query}

    Prior interactions:
    {context}
  expected_output: >
    A short list of the image files written and one line on what each shows.

report:
  description: |
    Write the final analysis report for the {dataset_name} dataset in plain
    Markdown. Cover the questions asked, the confirmed findings, and the
    saved figures (reference them by relative path under images/).

    Final user note: {user_query}

    Prior interactions:
    {context}
  expected_output: >
    A complete, self-contained Markdown report.
  output_path: "{output_path}/{dataset_name}.md"
"#
}

pub fn default_plot_style_yaml() -> &'static str {
    r#"company_style:
  plot_types:
    basic:
      figsize: [10, 6]
      dpi: 120
      style: seaborn-v0_8-whitegrid
      palette: deep
    line:
      linewidth: 2
      marker: o
    bar:
      edgecolor: black
      width: 0.8
    scatter:
      s: 40
      alpha: 0.8
    heatmap:
      annot: true
      fmt: ".2f"
      cmap: vlag
"#
}

/// Scaffolds the config directory. Returns the paths actually written;
/// files that already exist are left alone.
pub fn write_default_config_files(dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    fs::create_dir_all(dir).map_err(|source| ConfigError::CreateDir {
        path: dir.display().to_string(),
        source,
    })?;

    let files = [
        (ACCESS_FILE, default_access_rules_yaml()),
        (ROLES_FILE, default_roles_yaml()),
        (TASKS_FILE, default_tasks_yaml()),
        (STYLE_FILE, default_plot_style_yaml()),
    ];

    let mut written = Vec::new();
    for (name, content) in files {
        let path = dir.join(name);
        if path.exists() {
            continue;
        }
        fs::write(&path, content).map_err(|source| ConfigError::Write {
            path: path.display().to_string(),
            source,
        })?;
        written.push(path);
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use tempfile::tempdir;

    #[test]
    fn default_files_scaffold_and_load_cleanly() {
        let dir = tempdir().expect("tempdir");
        let written = write_default_config_files(dir.path()).expect("scaffold");
        assert_eq!(written.len(), 4);
        AppConfig::from_dir(dir.path()).expect("defaults must validate");
    }

    #[test]
    fn scaffold_never_overwrites_existing_files() {
        let dir = tempdir().expect("tempdir");
        let access = dir.path().join(ACCESS_FILE);
        fs::write(&access, "result_path: custom\ndatasets: {}\npermissions: {}\n")
            .expect("seed");
        let written = write_default_config_files(dir.path()).expect("scaffold");
        assert_eq!(written.len(), 3);
        let kept = fs::read_to_string(&access).expect("read");
        assert!(kept.contains("custom"));
    }
}
