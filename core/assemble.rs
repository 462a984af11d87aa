use crate::document::DocumentWriter;
use crate::patterns::PatternSet;
use crate::source::{FileEntry, Listing, SkipReason};
use crate::tokens::{CharRatio, TokenEstimator};
use crate::tree::{self, Tree, TreeOrder};
use serde::Serialize;

pub const TOKEN_LIMIT_WARNING: usize = 128_000;
pub const TOKEN_LIMIT_DANGER: usize = 200_000;

/// Document-level options for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackOptions {
    pub prepend_prompt: Option<String>,
    pub include_file_tree: bool,
    pub tree_order: TreeOrder,
    /// Accepted for compatibility; bodies are emitted unchanged.
    pub remove_comments: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PackStats {
    pub file_count: usize,
    pub char_count: usize,
    pub estimated_token_count: usize,
    pub ignored_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenBudget {
    Comfortable,
    Warning,
    Danger,
}

impl PackStats {
    pub fn budget(&self) -> TokenBudget {
        if self.estimated_token_count > TOKEN_LIMIT_DANGER {
            TokenBudget::Danger
        } else if self.estimated_token_count > TOKEN_LIMIT_WARNING {
            TokenBudget::Warning
        } else {
            TokenBudget::Comfortable
        }
    }
}

/// Per-file figures for a kept entry, in document order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileSummary {
    pub path: String,
    pub char_count: usize,
    pub estimated_token_count: usize,
}

#[derive(Debug, Clone)]
pub struct PackResult {
    pub document: String,
    pub stats: PackStats,
    pub tree: Tree,
    pub files: Vec<FileSummary>,
    /// Paths that were dropped, with the reason, in the order they were seen.
    pub dropped: Vec<(String, SkipReason)>,
}

/// Filters, counts and serializes a listing using the default estimator.
pub fn assemble(listing: &Listing, rules: &PatternSet, options: &PackOptions) -> PackResult {
    assemble_with(listing, rules, options, &CharRatio)
}

pub fn assemble_with(
    listing: &Listing,
    rules: &PatternSet,
    options: &PackOptions,
    estimator: &dyn TokenEstimator,
) -> PackResult {
    log::debug!(
        "Assembling {} entries ({} pre-skipped) against {} rules...",
        listing.entries.len(),
        listing.skipped.len(),
        rules.len()
    );
    if options.remove_comments {
        log::debug!("remove_comments is set; file bodies are passed through unchanged.");
    }

    let mut stats = PackStats {
        ignored_count: listing.skipped.len(),
        ..PackStats::default()
    };
    let mut dropped: Vec<(String, SkipReason)> = listing
        .skipped
        .iter()
        .map(|s| (s.path.clone(), s.reason.clone()))
        .collect();
    let mut kept: Vec<(&FileEntry, usize)> = Vec::with_capacity(listing.entries.len());

    for entry in &listing.entries {
        let reason = if rules.is_ignored(&entry.path) {
            Some(SkipReason::Ignored)
        } else if entry.is_binary() {
            Some(SkipReason::Binary)
        } else {
            None
        };
        match reason {
            Some(reason) => {
                log::trace!("Dropping {} ({:?})", entry.path, reason);
                stats.ignored_count += 1;
                dropped.push((entry.path.clone(), reason));
            }
            None => {
                let tokens = estimator.estimate(&entry.content);
                stats.char_count += entry.char_count;
                stats.estimated_token_count += tokens;
                kept.push((entry, tokens));
            }
        }
    }
    stats.file_count = kept.len();

    let tree = Tree::build(kept.iter().map(|(e, _)| e.path.as_str()));

    let mut writer = DocumentWriter::new(options.prepend_prompt.as_deref());
    if options.include_file_tree {
        writer.tree(&tree::render(&tree, options.tree_order));
    }
    kept.sort_by(|(a, _), (b, _)| a.path.cmp(&b.path));
    let mut files = Vec::with_capacity(kept.len());
    for (entry, tokens) in kept {
        writer.file(&entry.path, &entry.content);
        files.push(FileSummary {
            path: entry.path.clone(),
            char_count: entry.char_count,
            estimated_token_count: tokens,
        });
    }
    let document = writer.finish();

    log::info!(
        "Packed {} files ({} chars, ~{} tokens), ignored {}.",
        stats.file_count,
        stats.char_count,
        stats.estimated_token_count,
        stats.ignored_count
    );
    PackResult {
        document,
        stats,
        tree,
        files,
        dropped,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::parse_document;
    use crate::patterns::PatternSetBuilder;
    use crate::presets::builtin_defaults;
    use crate::source::SkippedEntry;

    fn default_rules() -> PatternSet {
        PatternSetBuilder::new().builtin(builtin_defaults()).build()
    }

    fn listing(entries: &[(&str, &str)]) -> Listing {
        Listing::from_entries(
            entries
                .iter()
                .map(|(p, c)| FileEntry::new(*p, *c))
                .collect(),
        )
    }

    #[test]
    fn readme_and_binary_logo() {
        let input = listing(&[("README.md", "hi"), ("logo.png", "\0binary")]);
        let result = assemble(&input, &default_rules(), &PackOptions::default());
        assert_eq!(result.stats.file_count, 1);
        assert_eq!(result.stats.ignored_count, 1);
        assert_eq!(result.document.matches("<file path=").count(), 1);
        assert!(result.document.contains("<file path=\"README.md\">"));
    }

    #[test]
    fn binary_content_is_dropped_even_when_no_rule_matches() {
        let input = listing(&[("data.bin", "a\0b"), ("ok.txt", "fine")]);
        let result = assemble(&input, &PatternSet::default(), &PackOptions::default());
        assert_eq!(result.stats.file_count, 1);
        assert_eq!(result.dropped, [("data.bin".to_string(), SkipReason::Binary)]);
    }

    #[test]
    fn declared_media_kind_marks_binary() {
        let mut input = listing(&[("photo.heic", "not really text")]);
        input.entries[0] = input.entries[0].clone().with_media_kind("image/heic");
        let result = assemble(&input, &PatternSet::default(), &PackOptions::default());
        assert_eq!(result.stats.file_count, 0);
        assert_eq!(result.stats.ignored_count, 1);
    }

    #[test]
    fn stats_sum_exact_lengths_and_rounded_estimates() {
        let input = listing(&[("a", "x"), ("b", "xxxx"), ("c", "xxxxx")]);
        let result = assemble(&input, &PatternSet::default(), &PackOptions::default());
        assert_eq!(result.stats.char_count, 10);
        assert_eq!(result.stats.estimated_token_count, 1 + 1 + 2);
        assert_eq!(result.stats.file_count, 3);
        assert_eq!(result.stats.ignored_count, 0);
    }

    #[test]
    fn pre_skipped_entries_count_as_ignored() {
        let mut input = listing(&[("a.txt", "a")]);
        input.skipped.push(SkippedEntry {
            path: "locked.txt".to_string(),
            reason: SkipReason::Unreadable("permission denied".to_string()),
        });
        let result = assemble(&input, &PatternSet::default(), &PackOptions::default());
        assert_eq!(result.stats.ignored_count, 1);
        assert_eq!(result.stats.file_count, 1);
        assert_eq!(result.dropped[0].0, "locked.txt");
    }

    #[test]
    fn body_is_alphabetical_while_tree_follows_its_order() {
        let input = listing(&[("z.txt", "z"), ("src/b.rs", "b"), ("A.md", "a"), ("src/a.rs", "a")]);
        let options = PackOptions {
            include_file_tree: true,
            tree_order: TreeOrder::FoldersFirst,
            ..PackOptions::default()
        };
        let result = assemble(&input, &PatternSet::default(), &options);

        let parsed = parse_document(&result.document).unwrap();
        let paths: Vec<_> = parsed.files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, ["A.md", "src/a.rs", "src/b.rs", "z.txt"]);
        assert_eq!(
            parsed.tree.as_deref(),
            Some("├── src\n│   ├── a.rs\n│   └── b.rs\n├── A.md\n└── z.txt")
        );
    }

    #[test]
    fn tree_block_is_optional() {
        let input = listing(&[("a.txt", "a")]);
        let result = assemble(&input, &PatternSet::default(), &PackOptions::default());
        assert!(!result.document.contains("<file_tree>"));
        // the tree is still returned to the caller
        assert!(result.tree.get("a.txt").is_some());
    }

    #[test]
    fn prompt_leads_the_document() {
        let input = listing(&[("a.txt", "a")]);
        let options = PackOptions {
            prepend_prompt: Some("Review this.".to_string()),
            ..PackOptions::default()
        };
        let result = assemble(&input, &PatternSet::default(), &options);
        assert!(result.document.starts_with("Review this.\n\n<repository_context>\n"));
        assert!(result.document.ends_with("</repository_context>"));
    }

    #[test]
    fn content_with_terminator_survives_packing() {
        let body = "let s = \"]]>\"; // ]]> twice";
        let input = listing(&[("tricky.rs", body)]);
        let result = assemble(&input, &PatternSet::default(), &PackOptions::default());
        let parsed = parse_document(&result.document).unwrap();
        assert_eq!(parsed.files[0].content, body);
    }

    #[test]
    fn remove_comments_is_a_passthrough() {
        let input = listing(&[("a.rs", "// comment\nfn a() {}")]);
        let options = PackOptions {
            remove_comments: true,
            ..PackOptions::default()
        };
        let result = assemble(&input, &PatternSet::default(), &options);
        assert!(result.document.contains("// comment"));
    }

    #[test]
    fn budget_thresholds() {
        let stats = |tokens| PackStats {
            estimated_token_count: tokens,
            ..PackStats::default()
        };
        assert_eq!(stats(128_000).budget(), TokenBudget::Comfortable);
        assert_eq!(stats(128_001).budget(), TokenBudget::Warning);
        assert_eq!(stats(200_001).budget(), TokenBudget::Danger);
    }

    struct WordCount;

    impl TokenEstimator for WordCount {
        fn name(&self) -> &'static str {
            "words"
        }

        fn estimate(&self, text: &str) -> usize {
            text.split_whitespace().count()
        }
    }

    #[test]
    fn estimator_is_swappable() {
        let input = listing(&[("a.txt", "one two three")]);
        let result = assemble_with(&input, &PatternSet::default(), &PackOptions::default(), &WordCount);
        assert_eq!(result.stats.estimated_token_count, 3);
        assert_eq!(result.stats.char_count, 13);
        assert_eq!(result.files[0].estimated_token_count, 3);
    }

    #[test]
    fn per_file_tokens_follow_the_selected_estimator() {
        let input = listing(&[("a.txt", "one two three"), ("b.txt", "four five")]);
        let result = assemble_with(&input, &PatternSet::default(), &PackOptions::default(), &WordCount);
        let counts: Vec<_> = result.files.iter().map(|f| f.estimated_token_count).collect();
        assert_eq!(counts, [3, 2]);
        assert_eq!(result.stats.estimated_token_count, counts.iter().sum::<usize>());
    }
}
