mod cli_args;
mod commands;
mod output;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use colored::*;
use std::path::{Path, PathBuf};
use std::process;

use cli_args::{Cli, Commands, FilterOpts, ProjectConfigOpts};
use repopack_core::{AppError, Config};

fn main() {
    let cli_args = Cli::parse();

    setup_logging(cli_args.quiet, cli_args.verbose);

    let quiet = cli_args.quiet;

    log::debug!("CLI args parsed: {:?}", cli_args);

    let exit_code = match run_app(cli_args, quiet) {
        Ok(_) => {
            log::info!("Application finished successfully.");
            0
        }
        Err(e) => {
            let exit_code = exit_code_for(&e);
            if !quiet || exit_code == 1 || exit_code == 5 {
                eprintln!("{} {:#}", "Error:".red().bold(), e);
            } else {
                log::error!("Application failed: {:#}", e);
            }
            exit_code
        }
    };
    log::debug!("Exiting with code {}", exit_code);
    process::exit(exit_code);
}

fn exit_code_for(error: &anyhow::Error) -> i32 {
    match error.downcast_ref::<AppError>() {
        Some(AppError::Config(_)) => 1,
        Some(AppError::TomlParse(_)) => 1,
        Some(AppError::TomlSerialize(_)) => 1,
        Some(AppError::DataLoading(_)) => 1,
        Some(AppError::Io(_)) => 2,
        Some(AppError::FileRead { .. }) => 2,
        Some(AppError::FileWrite { .. }) => 2,
        Some(AppError::UnreadableEntry { .. }) => 2,
        Some(AppError::InvalidSourceReference(_)) => 3,
        Some(AppError::RemoteResourceNotFound(_)) => 4,
        Some(AppError::Http(_)) => 4,
        Some(AppError::TransientFetch { .. }) => 4,
        Some(AppError::InvalidArgument(_)) => 5,
        Some(AppError::JsonSerialize(_)) => 6,
        Some(AppError::YamlError(_)) => 6,
        Some(AppError::XmlParse(_)) => 7,
        Some(AppError::TikToken(_)) => 8,
        Some(_) => 1,
        None => 1,
    }
}

fn setup_logging(quiet: bool, verbose: u8) {
    let log_level = if quiet {
        log::LevelFilter::Off
    } else {
        match verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    };
    env_logger::Builder::new()
        .filter_level(log_level)
        .format_timestamp(None)
        .init();
    log::trace!("Logger initialized with level: {:?}", log_level);
}

fn run_app(cli: Cli, quiet: bool) -> Result<()> {
    match cli.command {
        None => {
            Cli::command().print_help()?;
        }
        Some(command) => match command {
            Commands::Pack(args) => {
                log::debug!("Executing 'pack' command...");
                commands::pack::handle_pack_command(args, quiet)?;
            }
            Commands::Tree(args) => {
                log::debug!("Executing 'tree' command...");
                commands::tree::handle_tree_command(args)?;
            }
            Commands::Check(args) => {
                log::debug!("Executing 'check' command...");
                commands::check::handle_check_command(args)?;
            }
            Commands::Unpack(args) => {
                log::debug!("Executing 'unpack' command...");
                commands::unpack::handle_unpack_command(args, quiet)?;
            }
            Commands::Show(args) => {
                log::debug!("Executing 'show' command...");
                commands::show::handle_show_command(args)?;
            }
            Commands::Metrics(args) => {
                log::debug!("Executing 'metrics' command...");
                commands::metrics::handle_metrics_command(args, quiet)?;
            }
            Commands::Completion(args) => {
                log::debug!("Executing 'completion' command...");
                commands::completion::handle_completion_command(&args, quiet)?;
            }
            Commands::Config(args) => {
                log::debug!("Executing 'config' command...");
                commands::config::handle_config_command(&args, quiet)?;
            }
        },
    }
    Ok(())
}

/// Directory whose `.repopack.toml` applies: the source itself when it is
/// local, otherwise the current directory.
pub fn project_root_for(source: &str) -> Result<PathBuf> {
    let expanded = PathBuf::from(shellexpand::tilde(source).as_ref());
    let candidate = expanded.is_dir().then_some(expanded);
    Config::determine_project_root(candidate.as_ref()).context("Failed to determine project root")
}

fn merge_filter_overrides(config: &mut Config, filters: &FilterOpts) {
    log::trace!("Applying filter overrides to config...");
    if filters.no_gitignore {
        config.filters.use_gitignore = false;
    }
    if filters.no_repomixignore {
        config.filters.use_repomixignore = false;
    }
    if filters.no_builtin_ignore {
        config.filters.builtin_defaults = false;
    }
    if let Some(preset) = &filters.preset {
        config.filters.preset = Some(preset.clone());
    }
    config.filters.ignore.extend(filters.ignore.iter().cloned());
}

/// Loads the config that applies to `project_root` and layers CLI filter
/// flags on top.
pub fn load_config_for_command(
    project_root: &Path,
    project_opts: &ProjectConfigOpts,
    filters: Option<&FilterOpts>,
) -> Result<Config> {
    let config_path = Config::resolve_config_path(
        project_root,
        project_opts.config.as_ref(),
        project_opts.no_config,
    )
    .context("Failed to resolve configuration path")?;

    let mut config = match &config_path {
        Some(path) => Config::load_from_path(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::default(),
    };

    if let Some(filters) = filters {
        merge_filter_overrides(&mut config, filters);
    }
    config
        .validate()
        .context("Configuration is invalid after applying command-line flags")?;
    log::trace!("Config after CLI overrides: {:?}", config);
    Ok(config)
}
