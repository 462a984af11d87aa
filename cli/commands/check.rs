use crate::cli_args::CheckArgs;
use crate::output::print_data_or_text;
use crate::{load_config_for_command, project_root_for};
use anyhow::{Context, Result};
use colored::*;
use repopack_core::{self as core, MatchCondition, RuleOrigin};
use serde::Serialize;

#[derive(Debug, Serialize)]
struct PathVerdict {
    path: String,
    ignored: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    rule: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    origin: Option<RuleOrigin>,
    #[serde(skip_serializing_if = "Option::is_none")]
    rule_index: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    condition: Option<MatchCondition>,
}

pub fn handle_check_command(args: CheckArgs) -> Result<()> {
    let project_root = project_root_for(&args.source)?;
    let config = load_config_for_command(&project_root, &args.project_config, Some(&args.filters))
        .context("Failed to load configuration for check command")?;
    let source = core::source_for(&args.source, &config)
        .with_context(|| format!("Cannot open source '{}'", args.source))?;
    let rules = core::build_pattern_set(source.as_ref(), &config)
        .context("Failed to build ignore rules")?;
    log::info!("Checking {} paths against {} rules.", args.paths.len(), rules.len());

    let verdicts: Vec<PathVerdict> = args
        .paths
        .iter()
        .map(|raw| {
            let path = normalize_query(raw);
            match core::explain(&path, rules.rules()) {
                Some(verdict) => PathVerdict {
                    path,
                    ignored: verdict.ignored,
                    rule: Some(verdict.rule.raw.clone()),
                    origin: Some(verdict.rule.origin),
                    rule_index: Some(verdict.rule_index),
                    condition: Some(verdict.condition),
                },
                None => PathVerdict {
                    path,
                    ignored: false,
                    rule: None,
                    origin: None,
                    rule_index: None,
                    condition: None,
                },
            }
        })
        .collect();

    let text = verdicts
        .iter()
        .map(format_verdict)
        .collect::<Vec<_>>()
        .join("\n");
    print_data_or_text(&verdicts, Some(text), &args.format_output, "text")
}

/// Accepts `./src/x.rs` or `src\x.rs` the same as `src/x.rs`.
fn normalize_query(raw: &str) -> String {
    raw.replace('\\', "/")
        .split('/')
        .filter(|s| !s.is_empty() && *s != ".")
        .collect::<Vec<_>>()
        .join("/")
}

fn format_verdict(v: &PathVerdict) -> String {
    let status = if v.ignored {
        "ignored".red().bold()
    } else {
        "kept".green().bold()
    };
    match (&v.rule, v.origin, v.rule_index, v.condition) {
        (Some(rule), Some(origin), Some(index), Some(condition)) => format!(
            "{:<8} {}  {} '{}' #{} ({:?})",
            status,
            v.path.cyan(),
            origin.to_string().dimmed(),
            rule,
            index,
            condition
        ),
        _ => format!("{:<8} {}  {}", status, v.path.cyan(), "(no rule matched)".dimmed()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_paths_are_normalized() {
        assert_eq!(normalize_query("./src/main.rs"), "src/main.rs");
        assert_eq!(normalize_query("src\\lib.rs"), "src/lib.rs");
        assert_eq!(normalize_query("/a//b/"), "a/b");
    }
}
