//! Output formatting for CLI commands.
//!
//! Renders the stack event stream and command results for the terminal,
//! with a JSON mode for scripting.

use colored::Colorize;
use tabled::{Table, Tabled};

use crate::controlplane::StackEvent;
use crate::deploy::{CleanupCandidate, EventSink, StackAction, StackProgress, classify};

use super::commands::OutputFormat;

use std::collections::BTreeMap;

/// Event sink that prints one line per stack event.
#[derive(Debug, Default)]
pub struct ConsoleSink;

impl ConsoleSink {
    /// Creates a new console sink.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Formats one event line: timestamp, action, stack, resource type,
    /// logical id, status, reason.
    fn format_line(action: StackAction, stack_name: &str, event: &StackEvent) -> String {
        let status = match classify(&event.status) {
            StackProgress::Success => event.status.green().to_string(),
            StackProgress::Failure => event.status.red().to_string(),
            StackProgress::Pending => event.status.yellow().to_string(),
        };

        let mut line = format!(
            "{} {} {} {} {} {}",
            event.timestamp.format("%Y-%m-%d %H:%M:%S"),
            action,
            stack_name,
            event.resource_type,
            event.logical_id,
            status,
        );
        if let Some(reason) = &event.status_reason {
            line.push(' ');
            line.push_str(reason);
        }
        line
    }
}

impl EventSink for ConsoleSink {
    fn event(&self, action: StackAction, stack_name: &str, event: &StackEvent) {
        eprintln!("{}", Self::format_line(action, stack_name, event));
    }
}

/// Output formatter for CLI command results.
#[derive(Debug)]
pub struct OutputFormatter {
    /// Output format.
    format: OutputFormat,
}

/// Stack output row for table display.
#[derive(Tabled)]
struct OutputRow {
    #[tabled(rename = "Key")]
    key: String,
    #[tabled(rename = "Value")]
    value: String,
}

/// Cleanup candidate row for table display.
#[derive(Tabled)]
struct CandidateRow {
    #[tabled(rename = "Stack")]
    name: String,
    #[tabled(rename = "Created")]
    created: String,
}

impl OutputFormatter {
    /// Creates a new output formatter.
    #[must_use]
    pub const fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Formats a stack's outputs.
    #[must_use]
    pub fn format_outputs(&self, outputs: &BTreeMap<String, String>) -> String {
        match self.format {
            OutputFormat::Json => {
                serde_json::to_string_pretty(outputs).unwrap_or_default()
            }
            OutputFormat::Text => {
                if outputs.is_empty() {
                    return String::from("No outputs.");
                }
                let rows: Vec<OutputRow> = outputs
                    .iter()
                    .map(|(key, value)| OutputRow {
                        key: key.clone(),
                        value: value.clone(),
                    })
                    .collect();
                Table::new(rows).to_string()
            }
        }
    }

    /// Formats the cleanup candidate report.
    #[must_use]
    pub fn format_candidates(&self, candidates: &[CleanupCandidate], dry_run: bool) -> String {
        match self.format {
            OutputFormat::Json => {
                serde_json::to_string_pretty(candidates).unwrap_or_default()
            }
            OutputFormat::Text => {
                if candidates.is_empty() {
                    return String::from("No matching stacks.");
                }
                let rows: Vec<CandidateRow> = candidates
                    .iter()
                    .map(|candidate| CandidateRow {
                        name: candidate.name.clone(),
                        created: candidate
                            .creation_time
                            .format("%Y-%m-%d %H:%M:%S")
                            .to_string(),
                    })
                    .collect();
                let verb = if dry_run { "would delete" } else { "deleting" };
                format!("{} {} stack(s):\n{}", verb, candidates.len(), Table::new(rows))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn event(status: &str, reason: Option<&str>) -> StackEvent {
        StackEvent {
            event_id: String::from("evt-1"),
            logical_id: String::from("demo"),
            resource_type: String::from("AWS::CloudFormation::Stack"),
            status: status.to_string(),
            status_reason: reason.map(str::to_string),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_event_line_carries_ordering_fields() {
        colored::control::set_override(false);
        let line = ConsoleSink::format_line(
            StackAction::Create,
            "demo",
            &event("CREATE_IN_PROGRESS", None),
        );
        assert!(line.contains("create"));
        assert!(line.contains("demo"));
        assert!(line.contains("AWS::CloudFormation::Stack"));
        assert!(line.contains("CREATE_IN_PROGRESS"));
    }

    #[test]
    fn test_event_line_appends_reason() {
        colored::control::set_override(false);
        let line = ConsoleSink::format_line(
            StackAction::Update,
            "demo",
            &event("UPDATE_FAILED", Some("rate exceeded")),
        );
        assert!(line.ends_with("rate exceeded"));
    }

    #[test]
    fn test_format_outputs_json() {
        let formatter = OutputFormatter::new(OutputFormat::Json);
        let mut outputs = BTreeMap::new();
        outputs.insert(String::from("ApiUrl"), String::from("https://example.com"));

        let rendered = formatter.format_outputs(&outputs);
        assert!(rendered.contains("\"ApiUrl\""));
    }

    #[test]
    fn test_format_outputs_empty_text() {
        let formatter = OutputFormatter::new(OutputFormat::Text);
        assert_eq!(formatter.format_outputs(&BTreeMap::new()), "No outputs.");
    }
}
