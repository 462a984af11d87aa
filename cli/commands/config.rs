use crate::cli_args::ConfigArgs;
use crate::output::{write_to_file, write_to_stdout};
use anyhow::{Context, Result};
use colored::*;
use repopack_core::Config;
use repopack_core::config::DEFAULT_CONFIG_FILENAME;
use std::env;
use std::io::{self, Write};

const HEADER: &str = "# repopack configuration. Every key is optional.\n\
# [filters] ignore entries may hold several comma-separated patterns;\n\
# a leading '!' re-includes a path. The last matching pattern wins.\n\n";

pub fn default_config_text() -> Result<String> {
    let body = Config::default()
        .to_toml()
        .context("Failed to serialize default configuration")?;
    Ok(format!("{}{}", HEADER, body))
}

pub fn handle_config_command(args: &ConfigArgs, quiet: bool) -> Result<()> {
    let text = default_config_text()?;
    if !args.save {
        return write_to_stdout(&text);
    }

    let target = env::current_dir()
        .context("Failed to determine current directory")?
        .join(DEFAULT_CONFIG_FILENAME);
    if target.exists() {
        if quiet {
            anyhow::bail!(
                "Target file '{}' exists. Overwrite prevented in quiet mode.",
                target.display()
            );
        }
        print!(
            "{} '{}' already exists. Overwrite? [{}/{}] ",
            "⚠️".yellow(),
            target.display().to_string().cyan(),
            "y".green(),
            "N".red()
        );
        io::stdout().flush().context("Failed to flush stdout")?;
        let mut response = String::new();
        io::stdin()
            .read_line(&mut response)
            .context("Failed to read user input")?;
        if !response.trim().eq_ignore_ascii_case("y") {
            println!("Save cancelled.");
            return Ok(());
        }
    }

    write_to_file(&target, &text)?;
    if !quiet {
        println!(
            "{} Default config saved to: {}",
            "✅".green(),
            target.display().to_string().blue()
        );
    }
    Ok(())
}
