use crate::patterns::PatternRule;
use serde::Serialize;

/// Which rung of the matching ladder accepted a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchCondition {
    MatchAll,
    ExactPath,
    Segment,
    InteriorSequence,
    Prefix,
    Extension,
    Suffix,
}

/// The rule that decided a path's fate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Verdict<'a> {
    pub ignored: bool,
    pub rule_index: usize,
    pub rule: &'a PatternRule,
    pub condition: MatchCondition,
}

/// Tests the clean pattern against a path. The first rung that applies is
/// authoritative: a `*.ext` pattern never falls through to the suffix rung.
pub fn match_condition(path: &str, pattern: &str) -> Option<MatchCondition> {
    if pattern.is_empty() {
        return None;
    }
    if pattern == "*" {
        Some(MatchCondition::MatchAll)
    } else if path == pattern {
        Some(MatchCondition::ExactPath)
    } else if path.split('/').any(|segment| segment == pattern) {
        Some(MatchCondition::Segment)
    } else if path.contains(&format!("/{}/", pattern)) {
        Some(MatchCondition::InteriorSequence)
    } else if path.starts_with(&format!("{}/", pattern)) {
        Some(MatchCondition::Prefix)
    } else if let Some(extension) = pattern.strip_prefix('*').filter(|e| e.starts_with('.')) {
        path.ends_with(extension)
            .then_some(MatchCondition::Extension)
    } else if path.ends_with(&format!("/{}", pattern)) {
        Some(MatchCondition::Suffix)
    } else {
        None
    }
}

/// Evaluates every rule in order; the last one that matches decides.
pub fn is_ignored(path: &str, rules: &[PatternRule]) -> bool {
    explain(path, rules).is_some_and(|verdict| verdict.ignored)
}

/// Like [`is_ignored`] but reports the deciding rule. `None` means no rule
/// matched and the path is kept.
pub fn explain<'a>(path: &str, rules: &'a [PatternRule]) -> Option<Verdict<'a>> {
    let mut decision = None;
    for (rule_index, rule) in rules.iter().enumerate() {
        if let Some(condition) = match_condition(path, &rule.pattern) {
            log::trace!(
                "Rule #{} '{}' matched '{}' ({:?})",
                rule_index,
                rule.raw,
                path,
                condition
            );
            decision = Some(Verdict {
                ignored: !rule.negated,
                rule_index,
                rule,
                condition,
            });
        }
    }
    decision
}
