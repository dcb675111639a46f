//! The single mutable run record. The engine owns exactly one `RunState`
//! for the run's lifetime; collaborators receive copies of the fields they
//! need, never a writable reference.

use crate::orchestration::error::PipelineError;
use crate::orchestration::machine::Stage;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// One completed stage interaction. History is append-only and its order is
/// what report context is built from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InteractionRecord {
    pub stage: Stage,
    pub query: String,
    pub result: String,
}

#[derive(Debug, Clone)]
pub struct RunState {
    user: String,
    dataset_name: String,
    dataset_path: PathBuf,
    result_path: PathBuf,
    pub query: String,
    pub analysis_output: String,
    pub viz_output: String,
    pub analysis_feedback: String,
    pub viz_feedback: String,
    history: Vec<InteractionRecord>,
}

impl RunState {
    /// `dataset_label` is the registry name (`chinook.db`); the stored
    /// dataset name is its stem (`chinook`). Identity fields are set here
    /// once and are immutable afterwards.
    pub fn new(
        user: &str,
        dataset_label: &str,
        dataset_path: &Path,
        result_path: &Path,
        query: &str,
    ) -> Result<Self, PipelineError> {
        let dataset_name = dataset_label
            .split('.')
            .next()
            .unwrap_or(dataset_label)
            .trim()
            .to_string();

        for (field, value) in [
            ("user", user.trim()),
            ("dataset name", dataset_name.as_str()),
        ] {
            if value.is_empty() {
                return Err(PipelineError::Setup(format!("{field} must be non-empty")));
            }
        }
        if dataset_path.as_os_str().is_empty() {
            return Err(PipelineError::Setup("dataset path must be non-empty".to_string()));
        }
        if result_path.as_os_str().is_empty() {
            return Err(PipelineError::Setup("result path must be non-empty".to_string()));
        }

        Ok(Self {
            user: user.trim().to_string(),
            dataset_name,
            dataset_path: dataset_path.to_path_buf(),
            result_path: result_path.to_path_buf(),
            query: query.trim().to_string(),
            analysis_output: String::new(),
            viz_output: String::new(),
            analysis_feedback: String::new(),
            viz_feedback: String::new(),
            history: Vec::new(),
        })
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn dataset_name(&self) -> &str {
        &self.dataset_name
    }

    pub fn dataset_path(&self) -> &Path {
        &self.dataset_path
    }

    pub fn result_path(&self) -> &Path {
        &self.result_path
    }

    /// Appends one interaction for the current query. The only way history
    /// grows; records are never edited or removed.
    pub fn record_interaction(&mut self, stage: Stage, result: &str) {
        self.history.push(InteractionRecord {
            stage,
            query: self.query.clone(),
            result: result.to_string(),
        });
    }

    pub fn history(&self) -> &[InteractionRecord] {
        &self.history
    }

    /// Flat transcript of prior interactions, oldest first, for `{context}`
    /// substitution.
    pub fn history_transcript(&self) -> String {
        self.history
            .iter()
            .map(|record| format!("Query: {}\nResult: {}", record.query, record.result))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
