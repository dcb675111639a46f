//! Task specification building: a named stage template plus runtime values
//! becomes the instruction/expected-output/output-path triple handed to a
//! capability provider. Substitution is strict: a template referencing a
//! value the run did not supply fails instead of leaking raw braces.

pub mod template;

use crate::config::TaskTemplates;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Placeholder names a task template may reference.
pub const RECOGNIZED_PLACEHOLDERS: &[&str] = &[
    "dataset_path",
    "user_query",
    "context",
    "dataset_name",
    "output_path",
];

#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    #[error("no task template named `{task}`")]
    TemplateNotFound { task: String },
    #[error("task template `{task}` references `{{{placeholder}}}` but no value was supplied")]
    MissingPlaceholder { task: String, placeholder: String },
}

/// Fully substituted work order for one stage invocation. Created fresh per
/// invocation and consumed exactly once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskSpec {
    pub instruction: String,
    pub expected_output: String,
    pub output_path: Option<PathBuf>,
}

/// Prior-stage context appended to the instruction body in fixed order:
/// analyst findings, then visualizer output, then the user query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContextBlocks {
    pub analyst: Option<String>,
    pub visualizer: Option<String>,
    pub user_query: Option<String>,
}

impl ContextBlocks {
    fn render(&self) -> String {
        let mut blocks = String::new();
        let mut push = |title: &str, body: &Option<String>| {
            if let Some(body) = body {
                if !body.trim().is_empty() {
                    blocks.push_str(&format!("\n\n=== {title} ===\n{}", body.trim_end()));
                }
            }
        };
        push("Analyst findings", &self.analyst);
        push("Visualizer output", &self.visualizer);
        push("User query", &self.user_query);
        blocks
    }
}

#[derive(Debug, Clone)]
pub struct TaskSpecBuilder {
    templates: TaskTemplates,
}

impl TaskSpecBuilder {
    pub fn new(templates: TaskTemplates) -> Self {
        Self { templates }
    }

    /// Builds the task spec for `task_name`, substituting `values` into all
    /// three template strings and appending `context` blocks to the
    /// instruction body.
    pub fn build(
        &self,
        task_name: &str,
        values: &BTreeMap<String, String>,
        context: &ContextBlocks,
    ) -> Result<TaskSpec, TaskError> {
        let template = self
            .templates
            .get(task_name)
            .ok_or_else(|| TaskError::TemplateNotFound {
                task: task_name.to_string(),
            })?;

        let resolve = |token: &str| -> Result<String, TaskError> {
            values
                .get(token)
                .cloned()
                .ok_or_else(|| TaskError::MissingPlaceholder {
                    task: task_name.to_string(),
                    placeholder: token.to_string(),
                })
        };

        let mut instruction = template::substitute(&template.description, |t| resolve(t))?;
        instruction.push_str(&context.render());
        let expected_output = template::substitute(&template.expected_output, |t| resolve(t))?;
        let output_path = match &template.output_path {
            Some(raw) if !raw.trim().is_empty() => {
                Some(PathBuf::from(template::substitute(raw, |t| resolve(t))?))
            }
            _ => None,
        };

        Ok(TaskSpec {
            instruction,
            expected_output,
            output_path,
        })
    }
}
