//! Decision ports: how a review point obtains its human decision. The
//! engine only ever sees a recognized decision; unrecognized input is
//! rejected and re-prompted inside the port and never consumes a
//! transition.

use std::io::{self, BufRead, BufReader, Stdin, Stdout, Write};

#[derive(Debug, thiserror::Error)]
pub enum DecisionError {
    #[error("decision input stream closed")]
    InputClosed,
    #[error("failed to read decision input: {0}")]
    Read(String),
    #[error("failed to write review output: {0}")]
    Write(String),
    #[error("scripted decision port has no decision left for {0}")]
    ScriptExhausted(String),
}

/// Decision at the analysis review point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisReviewDecision {
    /// Re-run analysis; optionally replace the query and the steering notes.
    Retry {
        query: Option<String>,
        feedback: Option<String>,
    },
    Proceed,
    Quit,
}

/// Decision at the visualization review point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VisualizationReviewDecision {
    /// Re-run visualization with fresh steering feedback.
    NewPlots { feedback: String },
    /// Back to analysis; optionally replace the query. Accumulated
    /// visualization feedback is discarded by the engine.
    Restart { query: Option<String> },
    /// On to the report; optionally a final note folded into the query.
    Proceed { report_note: Option<String> },
    Quit,
}

pub trait DecisionPort {
    fn review_analysis(&mut self, output: &str)
        -> Result<AnalysisReviewDecision, DecisionError>;
    fn review_visualization(
        &mut self,
        output: &str,
    ) -> Result<VisualizationReviewDecision, DecisionError>;
}

/// Synchronous console adapter. Presents the stage output and menu, then
/// loops until it reads a recognized token.
pub struct ConsoleDecisionPort<R: BufRead, W: Write> {
    input: R,
    output: W,
}

pub fn stdio_decision_port() -> ConsoleDecisionPort<BufReader<Stdin>, Stdout> {
    ConsoleDecisionPort::new(BufReader::new(io::stdin()), io::stdout())
}

impl<R: BufRead, W: Write> ConsoleDecisionPort<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    fn write_line(&mut self, line: &str) -> Result<(), DecisionError> {
        writeln!(self.output, "{line}").map_err(|e| DecisionError::Write(e.to_string()))
    }

    fn present(&mut self, title: &str, output: &str) -> Result<(), DecisionError> {
        self.write_line(&format!("\n{}", "=".repeat(40)))?;
        self.write_line(title)?;
        self.write_line("")?;
        self.write_line(output)?;
        self.write_line(&"=".repeat(40))?;
        Ok(())
    }

    fn read_token(&mut self, prompt: &str) -> Result<String, DecisionError> {
        write!(self.output, "{prompt}").map_err(|e| DecisionError::Write(e.to_string()))?;
        self.output
            .flush()
            .map_err(|e| DecisionError::Write(e.to_string()))?;

        let mut line = String::new();
        let read = self
            .input
            .read_line(&mut line)
            .map_err(|e| DecisionError::Read(e.to_string()))?;
        if read == 0 {
            return Err(DecisionError::InputClosed);
        }
        Ok(line.trim().to_string())
    }

    /// Free-text follow-up; empty input means "keep as is".
    fn read_optional(&mut self, prompt: &str) -> Result<Option<String>, DecisionError> {
        let text = self.read_token(prompt)?;
        if text.is_empty() {
            Ok(None)
        } else {
            Ok(Some(text))
        }
    }
}

impl<R: BufRead, W: Write> DecisionPort for ConsoleDecisionPort<R, W> {
    fn review_analysis(
        &mut self,
        output: &str,
    ) -> Result<AnalysisReviewDecision, DecisionError> {
        self.present("Analysis result:", output)?;

        loop {
            self.write_line("Next step:")?;
            self.write_line("  [1] re-run analysis with a revised query (analysis)")?;
            self.write_line("  [2] proceed to visualization (plot)")?;
            self.write_line("  [q] quit (exit)")?;
            let token = self.read_token("select> ")?.to_ascii_lowercase();

            match token.as_str() {
                "1" | "analysis" => {
                    let query = self.read_optional("revised query (Enter to keep current): ")?;
                    let feedback =
                        self.read_optional("steering notes for the analyst (Enter to skip): ")?;
                    return Ok(AnalysisReviewDecision::Retry { query, feedback });
                }
                "2" | "plot" => return Ok(AnalysisReviewDecision::Proceed),
                "q" | "exit" => return Ok(AnalysisReviewDecision::Quit),
                other => {
                    self.write_line(&format!(
                        "unrecognized option `{other}`; expected 1/analysis, 2/plot, q/exit"
                    ))?;
                }
            }
        }
    }

    fn review_visualization(
        &mut self,
        output: &str,
    ) -> Result<VisualizationReviewDecision, DecisionError> {
        self.present("Visualization result:", output)?;

        loop {
            self.write_line("Next step:")?;
            self.write_line("  [1] restart analysis with a revised query (analysis)")?;
            self.write_line("  [2] request different plots (plot)")?;
            self.write_line("  [3] proceed to the final report (report)")?;
            self.write_line("  [q] quit (exit)")?;
            let token = self.read_token("select> ")?.to_ascii_lowercase();

            match token.as_str() {
                "1" | "analysis" => {
                    let query = self.read_optional("revised query (Enter to keep current): ")?;
                    return Ok(VisualizationReviewDecision::Restart { query });
                }
                "2" | "plot" => {
                    let feedback = self
                        .read_optional("describe the plots you want: ")?
                        .unwrap_or_default();
                    return Ok(VisualizationReviewDecision::NewPlots { feedback });
                }
                "3" | "report" => {
                    let report_note =
                        self.read_optional("anything to add to the report? (Enter to skip): ")?;
                    return Ok(VisualizationReviewDecision::Proceed { report_note });
                }
                "q" | "exit" => return Ok(VisualizationReviewDecision::Quit),
                other => {
                    self.write_line(&format!(
                        "unrecognized option `{other}`; expected 1/analysis, 2/plot, 3/report, q/exit"
                    ))?;
                }
            }
        }
    }
}

/// Replays canned decisions; the remote/asynchronous adapter stand-in used
/// by scripted runs and tests.
#[derive(Debug, Default)]
pub struct ScriptedDecisionPort {
    analysis: std::collections::VecDeque<AnalysisReviewDecision>,
    visualization: std::collections::VecDeque<VisualizationReviewDecision>,
}

impl ScriptedDecisionPort {
    pub fn new(
        analysis: Vec<AnalysisReviewDecision>,
        visualization: Vec<VisualizationReviewDecision>,
    ) -> Self {
        Self {
            analysis: analysis.into(),
            visualization: visualization.into(),
        }
    }
}

impl DecisionPort for ScriptedDecisionPort {
    fn review_analysis(
        &mut self,
        _output: &str,
    ) -> Result<AnalysisReviewDecision, DecisionError> {
        self.analysis
            .pop_front()
            .ok_or_else(|| DecisionError::ScriptExhausted("review_analysis".to_string()))
    }

    fn review_visualization(
        &mut self,
        _output: &str,
    ) -> Result<VisualizationReviewDecision, DecisionError> {
        self.visualization
            .pop_front()
            .ok_or_else(|| DecisionError::ScriptExhausted("review_visualization".to_string()))
    }
}
