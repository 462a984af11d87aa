use crate::cli_args::PackArgs;
use crate::output::{print_stats, write_to_file, write_to_stdout};
use crate::{load_config_for_command, project_root_for};
use anyhow::{Context, Result};
use colored::Colorize;
use repopack_core::{self as core, Config, Tokenizer};

fn apply_document_overrides(config: &mut Config, args: &PackArgs) -> Result<()> {
    if let Some(prompt) = &args.prompt {
        config.output.prompt = Some(prompt.clone());
        config.output.prompt_id = None;
    }
    if let Some(id) = &args.prompt_id {
        config.output.prompt_id = Some(id.clone());
        config.output.prompt = None;
    }
    if args.no_tree {
        config.output.include_file_tree = false;
    }
    if args.folders_first {
        config.output.folders_first = true;
    }
    if args.remove_comments {
        config.output.remove_comments = true;
    }
    if let Some(tokenizer) = &args.tokenizer {
        config.output.tokenizer = tokenizer.parse::<Tokenizer>()?;
    }
    config.validate()?;
    Ok(())
}

pub fn handle_pack_command(args: PackArgs, quiet: bool) -> Result<()> {
    let project_root = project_root_for(&args.source.source)?;
    log::info!("Project root determined: {}", project_root.display());

    let mut config =
        load_config_for_command(&project_root, &args.project_config, Some(&args.filters))
            .context("Failed to load configuration")?;
    apply_document_overrides(&mut config, &args).context("Invalid pack options")?;

    let source = core::source_for(&args.source.source, &config)
        .with_context(|| format!("Cannot open source '{}'", args.source.source))?;
    let result = core::pack(source.as_ref(), &config)
        .with_context(|| format!("Failed to pack {}", source.describe()))?;

    match &args.output {
        Some(path) => {
            write_to_file(path, &result.document)?;
            if !quiet {
                eprintln!(
                    "{} Document saved to: {}",
                    "✅".green(),
                    path.display().to_string().blue()
                );
            }
        }
        None => write_to_stdout(&result.document)?,
    }

    if !quiet {
        print_stats(
            &result.stats,
            &config.output.tokenizer.to_string(),
            &args.stats_format,
        )?;
    }
    Ok(())
}
