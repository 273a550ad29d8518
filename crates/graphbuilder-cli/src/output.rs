//! Output formatting for the CLI.

use crate::config::OutputFormat;
use crate::error::Result;
use colored::*;
use graphbuilder_domain::{ExtractionOutcome, GraphDocument};
use tabled::{
    builder::Builder,
    settings::{object::Rows, Alignment, Modify, Style},
};

/// Output formatter.
pub struct Formatter {
    format: OutputFormat,
    color_enabled: bool,
}

impl Formatter {
    /// Create a new formatter.
    pub fn new(format: OutputFormat, color_enabled: bool) -> Self {
        Self {
            format,
            color_enabled,
        }
    }

    /// Format extraction results.
    pub fn format_graphs(&self, graphs: &[GraphDocument]) -> Result<String> {
        match self.format {
            OutputFormat::Json => graphs_json(graphs),
            OutputFormat::Table => Ok(self.format_graphs_table(graphs)),
            OutputFormat::Quiet => Ok(format_graphs_quiet(graphs)),
        }
    }

    /// Format results as a per-document summary table.
    fn format_graphs_table(&self, graphs: &[GraphDocument]) -> String {
        if graphs.is_empty() {
            return self.colorize("No documents processed.", "yellow");
        }

        let mut builder = Builder::default();
        builder.push_record(["#", "Source", "Nodes", "Relationships", "Status"]);

        for (index, graph) in graphs.iter().enumerate() {
            let status = match &graph.outcome {
                ExtractionOutcome::Complete => self.colorize("ok", "green"),
                ExtractionOutcome::Degraded { failure, .. } => {
                    self.colorize(&format!("degraded ({})", failure), "red")
                }
            };
            builder.push_record([
                (index + 1).to_string(),
                source_label(graph),
                graph.nodes.len().to_string(),
                graph.relationships.len().to_string(),
                status,
            ]);
        }

        let mut table = builder.build();
        table
            .with(Style::rounded())
            .with(Modify::new(Rows::first()).with(Alignment::center()));

        table.to_string()
    }

    /// Format a success message.
    pub fn success(&self, message: &str) -> String {
        self.colorize(&format!("✓ {}", message), "green")
    }

    /// Format a warning message.
    pub fn warning(&self, message: &str) -> String {
        self.colorize(&format!("⚠ {}", message), "yellow")
    }

    /// Summary line for a finished batch.
    pub fn batch_summary(&self, graphs: &[GraphDocument]) -> String {
        let degraded = graphs.iter().filter(|g| g.is_degraded()).count();
        let message = format!("Processed {} document(s)", graphs.len());
        if degraded == 0 {
            self.success(&message)
        } else {
            self.warning(&format!("{}, {} degraded", message, degraded))
        }
    }

    /// Colorize text if color is enabled.
    fn colorize(&self, text: &str, color: &str) -> String {
        if !self.color_enabled {
            return text.to_string();
        }

        match color {
            "red" => text.red().to_string(),
            "green" => text.green().to_string(),
            "yellow" => text.yellow().to_string(),
            _ => text.to_string(),
        }
    }
}

/// Serialize results as pretty JSON.
pub fn graphs_json(graphs: &[GraphDocument]) -> Result<String> {
    Ok(serde_json::to_string_pretty(graphs)?)
}

fn format_graphs_quiet(graphs: &[GraphDocument]) -> String {
    graphs
        .iter()
        .map(|g| {
            let status = if g.is_degraded() { "degraded" } else { "ok" };
            format!(
                "{}\t{}\t{}\t{}",
                source_label(g),
                g.nodes.len(),
                g.relationships.len(),
                status
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Name shown for a document: its `source` metadata, else a text preview.
fn source_label(graph: &GraphDocument) -> String {
    if let Some(source) = graph.source.metadata.get("source").and_then(|v| v.as_str()) {
        return match graph.source.metadata.get("position").and_then(|v| v.as_u64()) {
            Some(position) => format!("{}#{}", source, position),
            None => source.to_string(),
        };
    }
    let preview: String = graph.source.text.chars().take(24).collect();
    if preview.len() < graph.source.text.len() {
        format!("{}…", preview)
    } else {
        preview
    }
}
