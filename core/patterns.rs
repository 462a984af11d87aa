//! Ignore-pattern parsing.
//!
//! Patterns come from several sources (built-in defaults, `.gitignore`,
//! `.repomixignore`, a preset, free text typed by the user). Each source is
//! parsed into [`PatternRule`]s and the [`PatternSetBuilder`] concatenates
//! them in a fixed order. Order is precedence: the last matching rule wins.

use serde::Serialize;
use std::fmt;

/// Descriptive classification of a rule's clean pattern.
///
/// Matching itself always walks the full condition ladder in
/// [`crate::matcher`]; the kind only tells a reader what sort of pattern
/// they are looking at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    /// A bare name such as `node_modules` or `README.md`.
    ExactSegment,
    /// `*` or `*.ext`.
    WildcardExtension,
    /// A pattern containing `/`, such as `src/generated`.
    Anchored,
    /// Anything else; only ever matches by literal comparison.
    Substring,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleOrigin {
    Builtin,
    GitIgnore,
    RepomixIgnore,
    Preset,
    User,
}

impl fmt::Display for RuleOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RuleOrigin::Builtin => "builtin",
            RuleOrigin::GitIgnore => ".gitignore",
            RuleOrigin::RepomixIgnore => ".repomixignore",
            RuleOrigin::Preset => "preset",
            RuleOrigin::User => "user",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PatternRule {
    /// The pattern as authored, after trimming and trailing-slash removal.
    pub raw: String,
    pub negated: bool,
    /// `raw` without its leading `!`, trimmed. Empty means the rule is inert.
    pub pattern: String,
    pub kind: RuleKind,
    pub origin: RuleOrigin,
}

impl PatternRule {
    pub fn new(raw: impl Into<String>, origin: RuleOrigin) -> Self {
        let raw = raw.into();
        let (negated, pattern) = match raw.strip_prefix('!') {
            Some(rest) => (true, rest.trim().to_string()),
            None => (false, raw.trim().to_string()),
        };
        let kind = classify(&pattern);
        Self {
            raw,
            negated,
            pattern,
            kind,
            origin,
        }
    }

    pub fn is_inert(&self) -> bool {
        self.pattern.is_empty()
    }
}

fn classify(pattern: &str) -> RuleKind {
    if pattern == "*" || pattern.starts_with("*.") {
        RuleKind::WildcardExtension
    } else if pattern.contains('/') {
        RuleKind::Anchored
    } else if pattern.contains('*') {
        RuleKind::Substring
    } else {
        RuleKind::ExactSegment
    }
}

/// Normalizes one candidate line. Returns `None` for blanks and comments.
fn normalize_line(line: &str) -> Option<&str> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return None;
    }
    Some(trimmed.strip_suffix('/').unwrap_or(trimmed))
}

/// Parses `.gitignore`-style text: one pattern per line, `\n` or `\r\n`.
pub fn parse_ignore_text(text: &str, origin: RuleOrigin) -> Vec<PatternRule> {
    // `str::lines` already strips a trailing `\r`.
    text.lines()
        .filter_map(normalize_line)
        .map(|p| PatternRule::new(p, origin))
        .collect()
}

/// Parses comma-separated user input such as `"*.log, tmp/, !keep.log"`.
pub fn parse_user_text(text: &str) -> Vec<PatternRule> {
    text.split(',')
        .filter_map(normalize_line)
        .map(|p| PatternRule::new(p, RuleOrigin::User))
        .collect()
}

/// Parses an already-split list (preset entries, config arrays).
pub fn parse_pattern_list<S: AsRef<str>>(patterns: &[S], origin: RuleOrigin) -> Vec<PatternRule> {
    patterns
        .iter()
        .filter_map(|p| normalize_line(p.as_ref()))
        .map(|p| PatternRule::new(p, origin))
        .collect()
}

/// Immutable, ordered rule list for one packing run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PatternSet {
    rules: Vec<PatternRule>,
}

impl PatternSet {
    pub fn rules(&self) -> &[PatternRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn is_ignored(&self, path: &str) -> bool {
        crate::matcher::is_ignored(path, &self.rules)
    }
}

impl From<Vec<PatternRule>> for PatternSet {
    fn from(rules: Vec<PatternRule>) -> Self {
        Self { rules }
    }
}

/// Collects rules per source and concatenates them in a fixed order on
/// [`build`](Self::build): builtin, `.gitignore`, `.repomixignore`, preset,
/// user. Calling the setters in a different order does not change the result.
#[derive(Debug, Default)]
pub struct PatternSetBuilder {
    builtin: Vec<PatternRule>,
    gitignore: Vec<PatternRule>,
    repomixignore: Vec<PatternRule>,
    preset: Vec<PatternRule>,
    user: Vec<PatternRule>,
}

impl PatternSetBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builtin<S: AsRef<str>>(mut self, patterns: &[S]) -> Self {
        self.builtin
            .extend(parse_pattern_list(patterns, RuleOrigin::Builtin));
        self
    }

    pub fn gitignore(mut self, text: &str) -> Self {
        self.gitignore
            .extend(parse_ignore_text(text, RuleOrigin::GitIgnore));
        self
    }

    pub fn repomixignore(mut self, text: &str) -> Self {
        self.repomixignore
            .extend(parse_ignore_text(text, RuleOrigin::RepomixIgnore));
        self
    }

    pub fn preset<S: AsRef<str>>(mut self, patterns: &[S]) -> Self {
        self.preset
            .extend(parse_pattern_list(patterns, RuleOrigin::Preset));
        self
    }

    /// Each item may itself hold several comma-separated patterns.
    pub fn user<S: AsRef<str>>(mut self, texts: &[S]) -> Self {
        for text in texts {
            self.user.extend(parse_user_text(text.as_ref()));
        }
        self
    }

    pub fn build(self) -> PatternSet {
        let mut rules = self.builtin;
        rules.extend(self.gitignore);
        rules.extend(self.repomixignore);
        rules.extend(self.preset);
        rules.extend(self.user);
        log::debug!("Pattern set built with {} rules.", rules.len());
        PatternSet { rules }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raws(rules: &[PatternRule]) -> Vec<&str> {
        rules.iter().map(|r| r.raw.as_str()).collect()
    }

    #[test]
    fn ignore_text_drops_comments_blanks_and_trailing_slash() {
        let text = "# build output\r\ntarget/\r\n\r\n   *.log  \n#another\n!keep.log\n";
        let rules = parse_ignore_text(text, RuleOrigin::GitIgnore);
        assert_eq!(raws(&rules), ["target", "*.log", "!keep.log"]);
        assert!(rules[2].negated);
        assert_eq!(rules[2].pattern, "keep.log");
    }

    #[test]
    fn indented_comment_is_still_a_comment() {
        let rules = parse_ignore_text("   # not a pattern\nfoo", RuleOrigin::User);
        assert_eq!(raws(&rules), ["foo"]);
    }

    #[test]
    fn only_one_trailing_slash_is_stripped() {
        let rules = parse_ignore_text("docs//", RuleOrigin::User);
        assert_eq!(rules[0].raw, "docs/");
    }

    #[test]
    fn duplicates_are_kept_in_order() {
        let rules = parse_ignore_text("a\nb\na", RuleOrigin::User);
        assert_eq!(raws(&rules), ["a", "b", "a"]);
    }

    #[test]
    fn user_text_splits_on_commas() {
        let rules = parse_user_text("*.md, docs/ ,, !README.md");
        assert_eq!(raws(&rules), ["*.md", "docs", "!README.md"]);
        assert!(rules.iter().all(|r| r.origin == RuleOrigin::User));
    }

    #[test]
    fn negation_with_space_after_bang_is_trimmed() {
        let rule = PatternRule::new("! README.md", RuleOrigin::User);
        assert!(rule.negated);
        assert_eq!(rule.pattern, "README.md");
    }

    #[test]
    fn lone_bang_is_inert() {
        assert!(PatternRule::new("!", RuleOrigin::User).is_inert());
    }

    #[test]
    fn kinds_are_classified() {
        let kind = |p: &str| PatternRule::new(p, RuleOrigin::User).kind;
        assert_eq!(kind("node_modules"), RuleKind::ExactSegment);
        assert_eq!(kind("*.png"), RuleKind::WildcardExtension);
        assert_eq!(kind("*"), RuleKind::WildcardExtension);
        assert_eq!(kind("src/gen"), RuleKind::Anchored);
        assert_eq!(kind("foo*bar"), RuleKind::Substring);
        assert_eq!(kind("!*.md"), RuleKind::WildcardExtension);
    }

    #[test]
    fn builder_order_is_fixed_regardless_of_call_order() {
        let set = PatternSetBuilder::new()
            .user(&["user-rule"])
            .preset(&["preset-rule"])
            .repomixignore("repomix-rule")
            .gitignore("git-rule")
            .builtin(&["builtin-rule"])
            .build();
        assert_eq!(
            raws(set.rules()),
            [
                "builtin-rule",
                "git-rule",
                "repomix-rule",
                "preset-rule",
                "user-rule"
            ]
        );
        let origins: Vec<_> = set.rules().iter().map(|r| r.origin).collect();
        assert_eq!(
            origins,
            [
                RuleOrigin::Builtin,
                RuleOrigin::GitIgnore,
                RuleOrigin::RepomixIgnore,
                RuleOrigin::Preset,
                RuleOrigin::User
            ]
        );
    }

    #[test]
    fn later_sources_can_negate_earlier_ones() {
        let set = PatternSetBuilder::new()
            .builtin(&["*.md"])
            .user(&["!README.md"])
            .build();
        assert!(!set.is_ignored("README.md"));
        assert!(set.is_ignored("CHANGELOG.md"));
    }
}
