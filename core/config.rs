use crate::assemble::PackOptions;
use crate::error::{AppError, Result};
use crate::presets;
use crate::tokens::Tokenizer;
use crate::tree::TreeOrder;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILENAME: &str = ".repopack.toml";
pub const DEFAULT_BATCH_SIZE: usize = 5;
pub const DEFAULT_BRANCH: &str = "main";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub filters: FiltersConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub remote: RemoteConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct FiltersConfig {
    #[serde(default = "default_true")]
    pub use_gitignore: bool,
    #[serde(default = "default_true")]
    pub use_repomixignore: bool,
    #[serde(default = "default_true")]
    pub builtin_defaults: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preset: Option<String>,
    /// Extra patterns; each item may hold several comma-separated patterns.
    #[serde(default)]
    pub ignore: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    #[serde(default = "default_true")]
    pub include_file_tree: bool,
    #[serde(default)]
    pub folders_first: bool,
    #[serde(default)]
    pub remove_comments: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_id: Option<String>,
    #[serde(default)]
    pub tokenizer: Tokenizer,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RemoteConfig {
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_branch")]
    pub default_branch: String,
}

fn default_true() -> bool {
    true
}
fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}
fn default_branch() -> String {
    DEFAULT_BRANCH.to_string()
}

impl Default for FiltersConfig {
    fn default() -> Self {
        Self {
            use_gitignore: default_true(),
            use_repomixignore: default_true(),
            builtin_defaults: default_true(),
            preset: None,
            ignore: Vec::new(),
        }
    }
}
impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            include_file_tree: default_true(),
            folders_first: false,
            remove_comments: false,
            prompt: None,
            prompt_id: None,
            tokenizer: Tokenizer::default(),
        }
    }
}
impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            default_branch: default_branch(),
        }
    }
}

impl Config {
    pub fn determine_project_root(cli_project_root: Option<&PathBuf>) -> Result<PathBuf> {
        let path_str_opt = cli_project_root
            .map(|p| p.to_string_lossy().to_string())
            .or_else(|| env::var("PROJECT_ROOT").ok().filter(|s| !s.is_empty()));

        let path_to_resolve = match path_str_opt {
            Some(p_str) => PathBuf::from(shellexpand::tilde(&p_str).as_ref()),
            None => env::current_dir().map_err(AppError::Io)?,
        };

        path_to_resolve.canonicalize().map_err(|e| {
            AppError::Io(std::io::Error::new(
                e.kind(),
                format!(
                    "Failed to canonicalize project root '{}': {}",
                    path_to_resolve.display(),
                    e
                ),
            ))
        })
    }

    /// `--config` wins, then `.repopack.toml` in the project root. A missing
    /// default file is not an error; a missing explicit one is.
    pub fn resolve_config_path(
        project_root: &Path,
        cli_config_file: Option<&String>,
        cli_disable_config: bool,
    ) -> Result<Option<PathBuf>> {
        if cli_disable_config {
            log::debug!("Config file loading disabled via CLI flag.");
            return Ok(None);
        }

        match cli_config_file {
            Some(p_str) => {
                let path = PathBuf::from(shellexpand::tilde(p_str).as_ref());
                let path = if path.is_absolute() {
                    path
                } else {
                    project_root.join(path)
                };
                if !path.is_file() {
                    return Err(AppError::Config(format!(
                        "Specified config file not found at path: {}",
                        path.display()
                    )));
                }
                log::debug!("Using specified config file path: {}", path.display());
                Ok(Some(path))
            }
            None => {
                let default_path = project_root.join(DEFAULT_CONFIG_FILENAME);
                if default_path.is_file() {
                    log::debug!("Using default config file path: {}", default_path.display());
                    Ok(Some(default_path))
                } else {
                    log::debug!(
                        "No config file specified and default not found at: {}",
                        default_path.display()
                    );
                    Ok(None)
                }
            }
        }
    }

    pub fn load_from_path(config_path: &Path) -> Result<Self> {
        log::info!("Loading configuration from: {}", config_path.display());
        let toml_content = fs::read_to_string(config_path).map_err(|e| AppError::FileRead {
            path: config_path.to_path_buf(),
            source: e,
        })?;
        Self::from_toml(&toml_content).map_err(|e| match e {
            AppError::TomlParse(msg) => AppError::TomlParse(format!(
                "Error parsing config file '{}': {}",
                config_path.display(),
                msg
            )),
            other => other,
        })
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        let config = toml::from_str::<Config>(text).map_err(|e| {
            AppError::TomlParse(format!("{}. Check TOML syntax and structure.", e))
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.remote.batch_size == 0 {
            return Err(AppError::Config(
                "remote.batch_size must be at least 1".to_string(),
            ));
        }
        if let Some(preset) = &self.filters.preset {
            presets::find_preset(preset)?;
        }
        if self.output.prompt.as_ref().is_none_or(|p| p.is_empty()) {
            if let Some(id) = &self.output.prompt_id {
                presets::find_prompt(id)?;
            }
        }
        Ok(())
    }

    /// The instruction block placed before the document. A literal prompt
    /// overrides a predefined one.
    pub fn effective_prompt(&self) -> Result<Option<String>> {
        if let Some(prompt) = self.output.prompt.as_ref().filter(|p| !p.is_empty()) {
            return Ok(Some(prompt.clone()));
        }
        match &self.output.prompt_id {
            Some(id) => Ok(Some(presets::find_prompt(id)?.text.clone())),
            None => Ok(None),
        }
    }

    pub fn tree_order(&self) -> TreeOrder {
        TreeOrder::from_folders_first(self.output.folders_first)
    }

    pub fn pack_options(&self) -> Result<PackOptions> {
        Ok(PackOptions {
            prepend_prompt: self.effective_prompt()?,
            include_file_tree: self.output.include_file_tree,
            tree_order: self.tree_order(),
            remove_comments: self.output.remove_comments,
        })
    }
}
