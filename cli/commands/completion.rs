use anyhow::{Context, Result};
use clap::CommandFactory;
use clap_complete::{Shell, generate};
use colored::*;
use repopack_core::AppError;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::PathBuf;

use crate::cli_args::{Cli, CompletionArgs};

fn parse_shell(name: &str) -> Result<Shell, AppError> {
    match name.trim().to_lowercase().as_str() {
        "fish" => Ok(Shell::Fish),
        "bash" => Ok(Shell::Bash),
        "zsh" => Ok(Shell::Zsh),
        "powershell" | "pwsh" => Ok(Shell::PowerShell),
        "elvish" => Ok(Shell::Elvish),
        other => Err(AppError::InvalidArgument(format!(
            "Unsupported shell for completion: {}",
            other
        ))),
    }
}

/// Per-user location each shell loads completions from, if there is one.
fn default_completion_path(shell: Shell, bin_name: &str) -> Option<PathBuf> {
    match shell {
        Shell::Fish => dirs::config_dir()
            .map(|p| p.join("fish").join("completions").join(format!("{}.fish", bin_name))),
        Shell::Bash => dirs::data_local_dir().map(|p| {
            p.join("bash-completion")
                .join("completions")
                .join(bin_name)
        }),
        Shell::Zsh => dirs::data_local_dir()
            .map(|p| p.join("zsh").join("site-functions").join(format!("_{}", bin_name))),
        _ => None,
    }
}

fn confirm_overwrite(path: &PathBuf, quiet: bool) -> Result<bool> {
    if quiet {
        anyhow::bail!(
            "Target file '{}' exists. Overwrite prevented in quiet mode.",
            path.display()
        );
    }
    print!(
        "{} Completion file already exists at '{}'. Overwrite? [{}/{}] ",
        "⚠️".yellow(),
        path.display().to_string().cyan(),
        "y".green(),
        "N".red()
    );
    io::stdout().flush().context("Failed to flush stdout")?;
    let mut response = String::new();
    io::stdin()
        .read_line(&mut response)
        .context("Failed to read user input")?;
    Ok(response.trim().eq_ignore_ascii_case("y"))
}

pub fn handle_completion_command(args: &CompletionArgs, quiet: bool) -> Result<()> {
    let shell_name = args.shell.as_deref().unwrap_or("fish");
    let shell = parse_shell(shell_name)?;
    let mut command = Cli::command();
    let bin_name = command.get_name().to_string();

    if !args.save {
        generate(shell, &mut command, bin_name, &mut io::stdout());
        return Ok(());
    }

    let save_path = default_completion_path(shell, &bin_name).ok_or_else(|| {
        AppError::InvalidArgument(format!(
            "Default save location not known for shell: {}",
            shell_name
        ))
    })?;
    if save_path.exists() && !confirm_overwrite(&save_path, quiet)? {
        println!("Save cancelled.");
        return Ok(());
    }
    if let Some(dir) = save_path.parent() {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create directory {}", dir.display()))?;
    }
    let mut file = File::create(&save_path)
        .with_context(|| format!("Failed to create file {}", save_path.display()))?;
    generate(shell, &mut command, bin_name, &mut file);
    log::debug!("Completion script written for {}", shell);

    if !quiet {
        println!(
            "{} {} completions saved to: {}",
            "✅".green(),
            shell_name.cyan(),
            save_path.display().to_string().blue()
        );
    }
    Ok(())
}
