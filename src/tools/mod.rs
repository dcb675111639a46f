//! Tool bindings offered to roles. Tools degrade: a failed or unbound tool
//! call returns an error string to the caller, never an error value, so a
//! broken tool invocation surfaces in stage output instead of aborting the
//! run.

use crate::config::PlotStyleConfig;
use crate::sandbox::CodeSandbox;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ToolId {
    PythonRepl,
    PlotStyle,
}

impl ToolId {
    pub fn as_str(self) -> &'static str {
        match self {
            ToolId::PythonRepl => "python_repl",
            ToolId::PlotStyle => "plot_style",
        }
    }

    /// Human-facing usage line included in role instructions.
    pub fn describe(self) -> &'static str {
        match self {
            ToolId::PythonRepl => {
                "python_repl: executes a Python snippet against the bound data stack and returns its output"
            }
            ToolId::PlotStyle => {
                "plot_style: returns house plot style parameters for one of line, bar, scatter, heatmap, general"
            }
        }
    }
}

impl std::fmt::Display for ToolId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ToolId {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "python_repl" => Ok(Self::PythonRepl),
            "plot_style" => Ok(Self::PlotStyle),
            other => Err(format!("unknown tool `{other}`")),
        }
    }
}

/// Owns the constructed tools for one run and dispatches calls by id.
#[derive(Debug, Default)]
pub struct ToolHost {
    sandbox: Option<CodeSandbox>,
    plot_style: Option<PlotStyleConfig>,
}

impl ToolHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sandbox(mut self, sandbox: CodeSandbox) -> Self {
        self.sandbox = Some(sandbox);
        self
    }

    pub fn with_plot_style(mut self, plot_style: PlotStyleConfig) -> Self {
        self.plot_style = Some(plot_style);
        self
    }

    /// Runs one tool call. Unbound tools and tool-level failures come back
    /// as error text in the same channel as ordinary output.
    pub fn run(&self, tool: ToolId, input: &str) -> String {
        match tool {
            ToolId::PythonRepl => match &self.sandbox {
                Some(sandbox) => sandbox.execute(input),
                None => format!("Error: tool `{tool}` is not bound for this role."),
            },
            ToolId::PlotStyle => match &self.plot_style {
                Some(style) => style.lookup(input),
                None => format!("Error: tool `{tool}` is not bound for this role."),
            },
        }
    }
}
