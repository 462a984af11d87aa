use crate::cli_args::UnpackArgs;
use crate::output::{print_data_or_text, write_to_file};
use anyhow::{Context, Result};
use colored::*;
use repopack_core::tokens::estimate_tokens;
use repopack_core::{self as core, AppError, ParsedDocument};
use serde::Serialize;
use std::fs;
use std::io::{self, Read};
use std::path::{Component, Path, PathBuf};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UnpackedFile {
    path: String,
    char_count: usize,
    estimated_token_count: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UnpackSummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    prompt: Option<String>,
    has_tree: bool,
    files: Vec<UnpackedFile>,
}

pub fn handle_unpack_command(args: UnpackArgs, quiet: bool) -> Result<()> {
    let text = read_input(&args.file)?;
    let parsed = core::parse_document(&text)
        .with_context(|| format!("'{}' is not a packed document", args.file))?;
    log::info!("Found {} file records in {}", parsed.files.len(), args.file);

    if let Some(dir) = &args.extract {
        let written = extract_files(&parsed, dir, args.force)?;
        if !quiet {
            eprintln!(
                "{} Extracted {} files to: {}",
                "✅".green(),
                written,
                dir.display().to_string().blue()
            );
        }
        return Ok(());
    }

    let summary = UnpackSummary {
        prompt: parsed.prompt.clone(),
        has_tree: parsed.tree.is_some(),
        files: parsed
            .files
            .iter()
            .map(|f| UnpackedFile {
                path: f.path.clone(),
                char_count: f.content.chars().count(),
                estimated_token_count: estimate_tokens(&f.content),
            })
            .collect(),
    };
    let text = summary
        .files
        .iter()
        .map(|f| format!("{:>8}  {}", f.char_count, f.path))
        .collect::<Vec<_>>()
        .join("\n");
    print_data_or_text(&summary, Some(text), &args.format_output, "text")
}

fn read_input(file: &str) -> Result<String> {
    if file == "-" {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .context("Failed to read document from stdin")?;
        return Ok(buffer);
    }
    let path = PathBuf::from(file);
    fs::read_to_string(&path)
        .map_err(|source| AppError::FileRead { path, source })
        .map_err(anyhow::Error::from)
}

/// Resolves a record path below `root`, refusing anything that would escape it.
fn target_path(root: &Path, record_path: &str) -> Result<PathBuf> {
    let relative = Path::new(record_path);
    let safe = relative
        .components()
        .all(|c| matches!(c, Component::Normal(_)));
    if !safe || record_path.is_empty() {
        anyhow::bail!(AppError::InvalidArgument(format!(
            "Refusing to extract unsafe path '{}'",
            record_path
        )));
    }
    Ok(root.join(relative))
}

fn extract_files(parsed: &ParsedDocument, root: &Path, force: bool) -> Result<usize> {
    let mut written = 0;
    for file in &parsed.files {
        let target = target_path(root, &file.path)?;
        if target.exists() && !force {
            log::warn!(
                "Skipping existing file {} (use --force to overwrite)",
                target.display()
            );
            continue;
        }
        write_to_file(&target, &file.content)?;
        log::debug!("Extracted {}", target.display());
        written += 1;
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsafe_record_paths_are_rejected() {
        let root = Path::new("/tmp/out");
        assert!(target_path(root, "src/main.rs").is_ok());
        assert!(target_path(root, "../etc/passwd").is_err());
        assert!(target_path(root, "/etc/passwd").is_err());
        assert!(target_path(root, "a/./b").is_ok());
        assert!(target_path(root, "").is_err());
    }
}
