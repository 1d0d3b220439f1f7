//! Rendering of command results for `--format text|json`.

use clap::ValueEnum;
use serde::Serialize;
use serde_json::json;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "lowercase")]
enum Status {
    Success,
    Error,
}

/// One-line outcome: the bare message in text mode, a
/// `{"status", "message"}` object in JSON mode.
fn status_line(status: Status, message: &str, format: &OutputFormat) -> String {
    match (format, status) {
        (OutputFormat::Text, Status::Success) => message.to_string(),
        (OutputFormat::Text, Status::Error) => format!("Error: {}", message),
        (OutputFormat::Json, _) => json!({ "status": status, "message": message }).to_string(),
    }
}

fn row(label: &str, value: &str) -> String {
    format!("  {:<16} {}", format!("{}:", label), value)
}

pub fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Error: could not encode output: {}", e),
    }
}

pub fn print_success(message: &str, format: &OutputFormat) {
    println!("{}", status_line(Status::Success, message, format));
}

/// Errors go to stderr in both formats.
pub fn print_error(message: &str, format: &OutputFormat) {
    eprintln!("{}", status_line(Status::Error, message, format));
}

/// Labelled field of a user or status listing.
pub fn print_row(label: &str, value: &str) {
    println!("{}", row(label, value));
}

pub fn print_heading(text: &str) {
    println!("\n{}\n{}", text, "-".repeat(50));
}
