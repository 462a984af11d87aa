use anyhow::{Context, Result};
use colored::*;
use comfy_table::{Cell, CellAlignment, Color, ContentArrangement, Table, presets::UTF8_FULL};
use repopack_core::{FileSummary, PackStats, TokenBudget};
use serde::Serialize;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;

use crate::cli_args::FormatOutputOpts;

/// Prints `plain_text` for the text format, otherwise serializes `data`.
pub fn print_data_or_text<T: Serialize>(
    data: &T,
    plain_text: Option<String>,
    format_opts: &FormatOutputOpts,
    default_format: &str,
) -> Result<()> {
    let format = format_opts
        .format
        .as_deref()
        .unwrap_or(default_format)
        .to_lowercase();

    match (format.as_str(), plain_text) {
        ("text", Some(text)) => write_to_stdout(&text),
        ("yaml" | "yml", _) => {
            let content = serde_yml::to_string(data).context("Failed to serialize YAML")?;
            write_to_stdout(&content)
        }
        _ => {
            let content =
                serde_json::to_string_pretty(data).context("Failed to serialize JSON")?;
            write_to_stdout(&content)
        }
    }
}

pub fn write_to_file(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    let mut file =
        File::create(path).with_context(|| format!("Failed to create file {}", path.display()))?;
    file.write_all(content.as_bytes())
        .with_context(|| format!("Failed to write to file {}", path.display()))?;
    Ok(())
}

pub fn write_to_stdout(content: &str) -> Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    handle
        .write_all(content.as_bytes())
        .context("Failed to write to stdout")?;
    if !content.ends_with('\n') {
        handle
            .write_all(b"\n")
            .context("Failed to write newline to stdout")?;
    }
    handle.flush().context("Failed to flush stdout")?;
    Ok(())
}

fn budget_label(budget: TokenBudget) -> ColoredString {
    match budget {
        TokenBudget::Comfortable => "comfortable".green(),
        TokenBudget::Warning => "large (over 128k)".yellow(),
        TokenBudget::Danger => "very large (over 200k)".red().bold(),
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StatsReport<'a> {
    #[serde(flatten)]
    stats: &'a PackStats,
    budget: TokenBudget,
    tokenizer: &'a str,
}

/// Run statistics go to stderr so stdout carries only the document.
pub fn print_stats(stats: &PackStats, tokenizer: &str, format: &str) -> Result<()> {
    match format {
        "none" => Ok(()),
        "json" => {
            let report = StatsReport {
                stats,
                budget: stats.budget(),
                tokenizer,
            };
            let content = serde_json::to_string(&report).context("Failed to serialize stats")?;
            eprintln!("{}", content);
            Ok(())
        }
        _ => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic);
            table.set_header(vec![
                Cell::new("Files").fg(Color::Green),
                Cell::new("Characters").fg(Color::Green),
                Cell::new(format!("Tokens ({})", tokenizer)).fg(Color::Green),
                Cell::new("Ignored").fg(Color::Green),
            ]);
            table.add_row(vec![
                Cell::new(stats.file_count).set_alignment(CellAlignment::Right),
                Cell::new(stats.char_count).set_alignment(CellAlignment::Right),
                Cell::new(stats.estimated_token_count).set_alignment(CellAlignment::Right),
                Cell::new(stats.ignored_count)
                    .set_alignment(CellAlignment::Right)
                    .fg(Color::DarkGrey),
            ]);
            eprintln!("{table}");
            eprintln!("{:<14} {}", "Context size:".green(), budget_label(stats.budget()));
            Ok(())
        }
    }
}

pub fn print_metrics_pretty_table(stats: &PackStats, files: &[FileSummary], tokenizer: &str) {
    println!();
    println!("{}", " Pack Metrics Summary ".green().bold().underline());
    println!(
        "{:<20} {}",
        "Total Files:".green(),
        stats.file_count.to_string().cyan()
    );
    println!(
        "{:<20} {}",
        "Total Characters:".green(),
        stats.char_count.to_string().cyan()
    );
    println!(
        "{:<20} {} ({})",
        "Est. Tokens:".green(),
        stats.estimated_token_count.to_string().cyan(),
        tokenizer.dimmed()
    );
    println!(
        "{:<20} {}",
        "Ignored:".green(),
        stats.ignored_count.to_string().cyan()
    );
    println!("{:<20} {}", "Context Size:".green(), budget_label(stats.budget()));

    if files.is_empty() {
        println!("\n{}", "(No files would be packed)".yellow());
    } else {
        println!("\n{}", " File Details ".green().bold().underline());
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic);
        table.set_header(vec![
            Cell::new("Path").fg(Color::Green),
            Cell::new("Characters").fg(Color::Green),
            Cell::new("Tokens").fg(Color::Green),
            Cell::new("Share").fg(Color::Green),
        ]);
        let total = stats.estimated_token_count.max(1) as f64;
        for file in files {
            let share = file.estimated_token_count as f64 * 100.0 / total;
            table.add_row(vec![
                Cell::new(&file.path).fg(Color::Cyan),
                Cell::new(file.char_count).set_alignment(CellAlignment::Right),
                Cell::new(file.estimated_token_count).set_alignment(CellAlignment::Right),
                Cell::new(format!("{:.1}%", share))
                    .set_alignment(CellAlignment::Right)
                    .fg(Color::DarkGrey),
            ]);
        }
        println!("{table}");
    }
    println!();
}
