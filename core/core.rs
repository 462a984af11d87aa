pub mod assemble;
pub mod config;
pub mod document;
pub mod error;
pub mod matcher;
pub mod pack;
pub mod patterns;
pub mod presets;
pub mod remote;
pub mod source;
pub mod tokens;
pub mod tree;

pub use assemble::{FileSummary, PackOptions, PackResult, PackStats, TokenBudget, assemble, assemble_with};
pub use config::Config;
pub use document::{PackedFile, ParsedDocument, parse_document};
pub use error::{AppError, Result};
pub use matcher::{MatchCondition, Verdict, explain, is_ignored};
pub use pack::{build_pattern_set, pack, source_for};
pub use patterns::{PatternRule, PatternSet, PatternSetBuilder, RuleOrigin};
pub use presets::{PredefinedPrompt, Preset};
pub use remote::{CachedFetcher, FetchError, Fetcher, GithubRef, HttpFetcher, RemoteSource};
pub use source::{EntrySource, FileEntry, IgnoreFile, Listing, LocalSource, SkipReason};
pub use tokens::{TokenEstimator, Tokenizer};
pub use tree::{Tree, TreeNode, TreeOrder};
