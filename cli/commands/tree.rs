use crate::cli_args::TreeArgs;
use crate::output::print_data_or_text;
use crate::{load_config_for_command, project_root_for};
use anyhow::{Context, Result};
use repopack_core::source::Listing;
use repopack_core::{self as core, PackOptions, TreeOrder, tree};

pub fn handle_tree_command(args: TreeArgs) -> Result<()> {
    let project_root = project_root_for(&args.source.source)?;
    let config = load_config_for_command(&project_root, &args.project_config, Some(&args.filters))
        .context("Failed to load configuration for tree command")?;

    let source = core::source_for(&args.source.source, &config)
        .with_context(|| format!("Cannot open source '{}'", args.source.source))?;
    let rules = core::build_pattern_set(source.as_ref(), &config)
        .context("Failed to build ignore rules")?;
    let listing: Listing = source
        .list_entries(&rules)
        .with_context(|| format!("Failed to list {}", source.describe()))?;

    let order = if args.folders_first {
        TreeOrder::FoldersFirst
    } else {
        config.tree_order()
    };
    let result = core::assemble(&listing, &rules, &PackOptions::default());
    log::debug!(
        "Tree has {} directories and {} files.",
        result.tree.directory_count(),
        result.tree.file_count()
    );

    let rendered = tree::render(&result.tree, order);
    print_data_or_text(
        &result.tree.to_nested(order),
        Some(rendered),
        &args.format_output,
        "text",
    )
}
