use crate::cli_args::MetricsArgs;
use crate::output::{print_data_or_text, print_metrics_pretty_table};
use crate::{load_config_for_command, project_root_for};
use anyhow::{Context, Result};
use repopack_core::{self as core, FileSummary, PackStats, TokenBudget, Tokenizer};
use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PackMetrics {
    pub tokenizer: String,
    #[serde(flatten)]
    pub stats: PackStats,
    pub budget: TokenBudget,
    pub files: Vec<FileSummary>,
}

pub fn handle_metrics_command(args: MetricsArgs, quiet: bool) -> Result<()> {
    let project_root = project_root_for(&args.source.source)?;
    log::info!("Project root determined: {}", project_root.display());

    let mut config =
        load_config_for_command(&project_root, &args.project_config, Some(&args.filters))
            .context("Failed to load configuration for metrics command")?;
    if let Some(tokenizer) = &args.tokenizer {
        config.output.tokenizer = tokenizer.parse::<Tokenizer>()?;
    }
    // the document body is discarded; skip the tree block
    config.output.include_file_tree = false;

    let source = core::source_for(&args.source.source, &config)
        .with_context(|| format!("Cannot open source '{}'", args.source.source))?;
    let result = core::pack(source.as_ref(), &config)
        .with_context(|| format!("Failed to measure {}", source.describe()))?;

    if result.files.is_empty() && !quiet {
        eprintln!("No files would be packed from {}.", source.describe());
    }

    let metrics = build_metrics(
        result.stats,
        result.files,
        config.output.tokenizer,
        args.top,
    );

    if args.format_output.format.is_none() {
        print_metrics_pretty_table(&metrics.stats, &metrics.files, &metrics.tokenizer);
        Ok(())
    } else {
        print_data_or_text(&metrics, None, &args.format_output, "json")
    }
}

/// Largest files first; ties keep path order.
fn build_metrics(
    stats: PackStats,
    mut files: Vec<FileSummary>,
    tokenizer: Tokenizer,
    top: Option<usize>,
) -> PackMetrics {
    files.sort_by(|a, b| b.estimated_token_count.cmp(&a.estimated_token_count));
    if let Some(limit) = top {
        files.truncate(limit);
    }
    PackMetrics {
        tokenizer: tokenizer.to_string(),
        budget: stats.budget(),
        stats,
        files,
    }
}
