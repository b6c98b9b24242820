//! Output formatter trait

use toolmux_application::RunTurnOutput;

/// Trait for formatting orchestration run results
pub trait OutputFormatter {
    /// Format the answer together with a summary of the run
    fn format(&self, output: &RunTurnOutput) -> String;

    /// Format as JSON
    fn format_json(&self, output: &RunTurnOutput) -> String;

    /// Format the answer only (concise output)
    fn format_answer_only(&self, output: &RunTurnOutput) -> String;
}
