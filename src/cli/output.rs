//! Terminal output
//!
//! Human-readable messages go through `colored`; with `--json` only the
//! structured payload is printed so the output can be piped.

use crate::error::Result;
use colored::Colorize;
use serde::Serialize;

#[derive(Debug, Clone, Copy)]
pub struct OutputFormatter {
    json: bool,
}

impl OutputFormatter {
    #[must_use]
    pub fn new(json: bool, no_color: bool) -> Self {
        if no_color {
            colored::control::set_override(false);
        }
        Self { json }
    }

    #[must_use]
    pub const fn is_json(&self) -> bool {
        self.json
    }

    pub fn success(&self, message: &str) {
        if !self.json {
            println!("{}", message.green());
        }
    }

    pub fn info(&self, message: &str) {
        if !self.json {
            println!("{message}");
        }
    }

    pub fn warning(&self, message: &str) {
        if !self.json {
            eprintln!("{}", message.yellow());
        }
    }

    /// Errors always go to stderr, also in JSON mode
    pub fn error(&self, message: &str) {
        eprintln!("{} {}", "Error:".red().bold(), message);
    }

    pub fn print_json<T: Serialize + ?Sized>(&self, value: &T) -> Result<()> {
        println!("{}", serde_json::to_string_pretty(value)?);
        Ok(())
    }

    /// Print rows as left-aligned columns under a bold header
    pub fn table(&self, headers: &[&str], rows: &[Vec<String>]) {
        if self.json {
            return;
        }
        let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
        for row in rows {
            for (width, cell) in widths.iter_mut().zip(row) {
                *width = (*width).max(cell.chars().count());
            }
        }

        let line = |cells: Vec<String>| {
            cells
                .iter()
                .zip(&widths)
                .map(|(cell, width)| format!("{cell:<width$}"))
                .collect::<Vec<_>>()
                .join("  ")
                .trim_end()
                .to_string()
        };

        println!(
            "{}",
            line(headers.iter().map(ToString::to_string).collect()).bold()
        );
        for row in rows {
            println!("{}", line(row.clone()));
        }
    }
}
