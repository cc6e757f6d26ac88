//! Output formatting utilities

use chrono::{DateTime, Local};
use clap::ValueEnum;
use colored::{ColoredString, Colorize};
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Print a table from a list of rows
pub fn print_table<T: Tabled>(rows: &[T], empty_message: &str) {
    if rows.is_empty() {
        println!("{}", empty_message.yellow());
        return;
    }
    let table = Table::new(rows).with(Style::rounded()).to_string();
    println!("{}", table);
}

/// Print any response as pretty JSON
pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print an error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Severity colored the way the dashboard badges are
pub fn severity_label(severity: &str) -> ColoredString {
    match severity {
        "danger" => severity.red().bold(),
        "warning" => severity.yellow().bold(),
        "info" => severity.blue(),
        other => other.normal(),
    }
}

/// Overlay color of a detection category
pub fn category_label(category: &str) -> ColoredString {
    match category {
        "intruder" => category.red(),
        "animal" => category.green(),
        "feed_container" | "feed" => category.blue(),
        other => other.dimmed(),
    }
}

pub fn on_off(enabled: bool) -> ColoredString {
    if enabled {
        "on".green().bold()
    } else {
        "off".red().bold()
    }
}

/// Format an RFC 3339 timestamp in local time, passing through anything unparseable
pub fn format_timestamp(ts: &str) -> String {
    match DateTime::parse_from_rfc3339(ts) {
        Ok(dt) => dt.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string(),
        Err(_) => ts.to_string(),
    }
}

/// Text bar for a fill level, e.g. `[###-------] 30%`
pub fn fill_bar(percent: u8) -> String {
    let percent = percent.min(100);
    let filled = (percent as usize + 5) / 10;
    format!("[{}{}] {}%", "#".repeat(filled), "-".repeat(10 - filled), percent)
}
