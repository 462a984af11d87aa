use crate::assemble::{PackResult, assemble_with};
use crate::config::Config;
use crate::error::{AppError, Result};
use crate::patterns::{PatternSet, PatternSetBuilder};
use crate::presets;
use crate::remote::{CachedFetcher, GithubRef, HttpFetcher, RemoteSource};
use crate::source::{EntrySource, IgnoreFile, LocalSource};
use std::path::Path;

/// Builds the run's rule list: builtin defaults, `.gitignore`,
/// `.repomixignore`, preset, then user patterns.
pub fn build_pattern_set(source: &dyn EntrySource, config: &Config) -> Result<PatternSet> {
    let filters = &config.filters;
    let mut builder = PatternSetBuilder::new();
    if filters.builtin_defaults {
        builder = builder.builtin(presets::builtin_defaults());
    }
    if filters.use_gitignore {
        if let Some(text) = source.read_ignore_file(IgnoreFile::Git)? {
            log::debug!("Applying {}", IgnoreFile::Git.file_name());
            builder = builder.gitignore(&text);
        }
    }
    if filters.use_repomixignore {
        if let Some(text) = source.read_ignore_file(IgnoreFile::Repomix)? {
            log::debug!("Applying {}", IgnoreFile::Repomix.file_name());
            builder = builder.repomixignore(&text);
        }
    }
    if let Some(name) = &filters.preset {
        let preset = presets::find_preset(name)?;
        log::debug!("Applying preset '{}'", preset.name);
        builder = builder.preset(&preset.patterns);
    }
    Ok(builder.user(&filters.ignore).build())
}

/// Runs a whole packing pass over one source.
pub fn pack(source: &dyn EntrySource, config: &Config) -> Result<PackResult> {
    log::info!("Packing {}", source.describe());
    let rules = build_pattern_set(source, config)?;
    let options = config.pack_options()?;
    let estimator = config.output.tokenizer.estimator()?;
    let listing = source.list_entries(&rules)?;
    Ok(assemble_with(&listing, &rules, &options, estimator.as_ref()))
}

/// An existing directory is packed locally; anything else must parse as a
/// GitHub reference.
pub fn source_for(input: &str, config: &Config) -> Result<Box<dyn EntrySource>> {
    let expanded = shellexpand::tilde(input);
    let path = Path::new(expanded.as_ref());
    if path.is_dir() {
        return Ok(Box::new(LocalSource::new(path)?));
    }
    match GithubRef::parse(input) {
        Ok(reference) => {
            log::debug!("Treating '{}' as remote repository {}", input, reference);
            let source = RemoteSource::new(reference, CachedFetcher::new(HttpFetcher::new()?))
                .with_batch_size(config.remote.batch_size)
                .with_fallback_branch(config.remote.default_branch.clone());
            Ok(Box::new(source))
        }
        Err(AppError::InvalidSourceReference(reason)) => Err(AppError::InvalidSourceReference(
            format!("'{}' is neither a directory nor a GitHub repository ({})", input, reason),
        )),
        Err(other) => Err(other),
    }
}
