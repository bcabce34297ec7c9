//! Table output formatting for CLI commands
//!
//! Uses comfy-table. Colors are dropped when `NO_COLOR` is set or the
//! terminal is dumb, with text markers in their place.

use std::env;

use comfy_table::{presets, Attribute, Cell, Color, ContentArrangement, Table};

use crate::cli::commands::check::CheckEntry;

/// Table formatter for CLI output
pub struct TableFormatter {
    /// Whether to use colors in output
    use_colors: bool,
    /// Maximum width for tables (None = auto)
    max_width: Option<u16>,
}

impl TableFormatter {
    pub fn new() -> Self {
        Self {
            use_colors: supports_color(),
            max_width: None,
        }
    }

    pub fn with_config(use_colors: bool, max_width: Option<u16>) -> Self {
        Self {
            use_colors,
            max_width,
        }
    }

    /// Format manifest check results
    pub fn format_check(&self, entries: &[CheckEntry]) -> String {
        let mut table = self.create_base_table();

        table.set_header(vec![
            Cell::new("Task").add_attribute(Attribute::Bold),
            Cell::new("Agent").add_attribute(Attribute::Bold),
            Cell::new("Depth").add_attribute(Attribute::Bold),
            Cell::new("Resources").add_attribute(Attribute::Bold),
            Cell::new("Result").add_attribute(Attribute::Bold),
        ]);

        for entry in entries {
            let resources = if entry.resources.is_empty() {
                "-".to_string()
            } else {
                entry.resources.join(", ")
            };
            let depth = entry
                .depth
                .map_or_else(|| "-".to_string(), |d| d.to_string());

            table.add_row(vec![
                Cell::new(truncate_text(&entry.task_id, 32)),
                Cell::new(truncate_text(&entry.agent_id, 24)),
                Cell::new(depth),
                Cell::new(resources),
                self.result_cell(entry),
            ]);
        }

        table.to_string()
    }

    fn result_cell(&self, entry: &CheckEntry) -> Cell {
        let (text, color, icon) = match (&entry.rejection, entry.acquired, &entry.blocked_by) {
            (Some(reason), _, _) => (format!("rejected: {reason}"), Color::Red, "✗"),
            (None, Some(false), Some(holder)) => {
                (format!("blocked by {holder}"), Color::Yellow, "⏸")
            }
            _ => ("ready".to_string(), Color::Green, "✓"),
        };

        if self.use_colors {
            Cell::new(text).fg(color)
        } else {
            Cell::new(format!("{icon} {text}"))
        }
    }

    fn create_base_table(&self) -> Table {
        let mut table = Table::new();
        table
            .load_preset(presets::UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic);

        if let Some(width) = self.max_width {
            table.set_width(width);
        }

        table
    }
}

impl Default for TableFormatter {
    fn default() -> Self {
        Self::new()
    }
}

/// Check if terminal supports colors
fn supports_color() -> bool {
    if env::var("NO_COLOR").is_ok() {
        return false;
    }
    if let Ok(term) = env::var("TERM") {
        if term == "dumb" {
            return false;
        }
    }
    true
}

fn truncate_text(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let kept: String = text.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}
