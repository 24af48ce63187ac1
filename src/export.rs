use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::Local;

use crate::models::Task;
use crate::storage::{write_atomic, StorageError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Markdown,
    Csv,
    Json,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Markdown => "md",
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "md" | "markdown" => Ok(ExportFormat::Markdown),
            "csv" => Ok(ExportFormat::Csv),
            "json" => Ok(ExportFormat::Json),
            other => Err(format!("unknown export format: {other}")),
        }
    }
}

pub fn render(format: ExportFormat, title: &str, tasks: &[Task]) -> Result<String, StorageError> {
    match format {
        ExportFormat::Markdown => Ok(render_markdown(title, tasks)),
        ExportFormat::Csv => Ok(render_csv(tasks)),
        ExportFormat::Json => {
            let mut json = serde_json::to_string_pretty(tasks)?;
            json.push('\n');
            Ok(json)
        }
    }
}

fn render_markdown(title: &str, tasks: &[Task]) -> String {
    let mut out = format!("# {title}\n\n");
    if tasks.is_empty() {
        out.push_str("_Empty_\n");
        return out;
    }
    for task in tasks {
        let mark = if task.is_completed { "x" } else { " " };
        let name = task.name.replace("\r\n", "\n").replace('\n', " ");
        out.push_str(&format!("- [{mark}] {name}\n"));
    }
    out
}

fn csv_escape(value: &str) -> String {
    let escaped = value.replace('"', "\"\"");
    format!("\"{escaped}\"")
}

fn render_csv(tasks: &[Task]) -> String {
    let mut out = String::from("index,name,is_completed\n");
    for (index, task) in tasks.iter().enumerate() {
        out.push_str(&index.to_string());
        out.push(',');
        out.push_str(&csv_escape(&task.name));
        out.push(',');
        out.push_str(if task.is_completed { "true" } else { "false" });
        out.push('\n');
    }
    out
}

pub fn export_default_path(root: &Path, format: ExportFormat) -> PathBuf {
    let stamp = Local::now().format("%Y%m%d-%H%M%S").to_string();
    root.join("exports")
        .join(format!("tasks-{stamp}.{}", format.extension()))
}

/// Renders the list and writes it to `path`, creating parent directories.
pub fn export_to_path(
    path: &Path,
    format: ExportFormat,
    title: &str,
    tasks: &[Task],
) -> Result<(), StorageError> {
    let body = render(format, title, tasks)?;
    let parent = path
        .parent()
        .ok_or_else(|| StorageError::Io(std::io::Error::other("invalid export path")))?;
    fs::create_dir_all(parent)?;
    write_atomic(path, body.as_bytes())
}
