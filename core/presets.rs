use crate::error::{AppError, Result};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preset {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub patterns: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct BuiltinIgnores {
    #[serde(default)]
    pub defaults: Vec<String>,
    #[serde(default)]
    pub presets: Vec<Preset>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredefinedPrompt {
    pub id: String,
    pub label: String,
    pub text: String,
}

static BUILTIN_IGNORES: Lazy<BuiltinIgnores> = Lazy::new(|| {
    let yaml_content = include_str!(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/../data/builtin_ignores.yaml"
    ));
    serde_yml::from_str(yaml_content).expect("Failed to parse embedded data/builtin_ignores.yaml")
});
static PREDEFINED_PROMPTS: Lazy<Vec<PredefinedPrompt>> = Lazy::new(|| {
    let yaml_content = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/../data/prompts.yaml"));
    serde_yml::from_str(yaml_content).expect("Failed to parse embedded data/prompts.yaml")
});

pub fn builtin_defaults() -> &'static [String] {
    &BUILTIN_IGNORES.defaults
}

pub fn presets() -> &'static [Preset] {
    &BUILTIN_IGNORES.presets
}

pub fn predefined_prompts() -> &'static [PredefinedPrompt] {
    &PREDEFINED_PROMPTS
}

/// Looks a preset up by name. Underscores and case are ignored so that
/// `CODE_ONLY` and `code-only` resolve to the same list.
pub fn find_preset(name: &str) -> Result<&'static Preset> {
    let wanted = normalize_name(name);
    presets()
        .iter()
        .find(|p| normalize_name(&p.name) == wanted)
        .ok_or_else(|| {
            AppError::InvalidArgument(format!(
                "Unknown preset \"{}\". Available: {}",
                name,
                presets()
                    .iter()
                    .map(|p| p.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            ))
        })
}

pub fn find_prompt(id: &str) -> Result<&'static PredefinedPrompt> {
    let wanted = normalize_name(id);
    predefined_prompts()
        .iter()
        .find(|p| normalize_name(&p.id) == wanted)
        .ok_or_else(|| {
            AppError::InvalidArgument(format!(
                "Predefined prompt \"{}\" not found. Available: {}",
                id,
                predefined_prompts()
                    .iter()
                    .map(|p| p.id.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            ))
        })
}

fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase().replace('_', "-")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_defaults_cover_common_noise() {
        let defaults = builtin_defaults();
        assert!(defaults.iter().any(|p| p == "node_modules"));
        assert!(defaults.iter().any(|p| p == "*.png"));
        assert!(defaults.iter().any(|p| p == ".git"));
    }

    #[test]
    fn default_preset_mirrors_builtin_defaults() {
        let preset = find_preset("default").unwrap();
        assert_eq!(preset.patterns.as_slice(), builtin_defaults());
    }

    #[test]
    fn preset_lookup_accepts_constant_style_names() {
        assert_eq!(find_preset("DOCS_ONLY").unwrap().name, "docs-only");
        assert_eq!(find_preset("tests-only").unwrap().patterns[0], "*");
        assert!(matches!(
            find_preset("everything"),
            Err(AppError::InvalidArgument(_))
        ));
    }

    #[test]
    fn prompts_are_loaded_in_authoring_order() {
        let ids: Vec<_> = predefined_prompts().iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, ["readme", "wins", "arch", "audit", "explain"]);
        assert!(find_prompt("audit").unwrap().text.contains("security"));
        assert!(find_prompt("nope").is_err());
    }
}
