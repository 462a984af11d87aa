//! GitHub repositories as an entry source.
//!
//! The recursive git tree is listed once through the REST API; file bodies
//! are downloaded from `raw.githubusercontent.com` in fixed-size batches.

use crate::error::{AppError, Result};
use crate::patterns::PatternSet;
use crate::source::{EntrySource, FileEntry, IgnoreFile, Listing, SkipReason, SkippedEntry, media_kind_for};
use once_cell::sync::OnceCell;
use rayon::prelude::*;
use reqwest::StatusCode;
use reqwest::blocking::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;

const API_BASE: &str = "https://api.github.com";
const RAW_BASE: &str = "https://raw.githubusercontent.com";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// `owner/repo`, optionally pinned to a branch and narrowed to a subpath.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GithubRef {
    pub owner: String,
    pub repo: String,
    pub branch: Option<String>,
    pub subpath: Option<String>,
}

impl GithubRef {
    /// Accepts `https://github.com/o/r`, `github.com/o/r` and `o/r`, each
    /// optionally followed by `/tree/<branch>/<subpath>`.
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        let without_scheme = trimmed
            .strip_prefix("https://")
            .or_else(|| trimmed.strip_prefix("http://"));
        let rest = match without_scheme {
            Some(rest) => {
                let rest = rest.strip_prefix("www.").unwrap_or(rest);
                rest.strip_prefix("github.com/").ok_or_else(|| {
                    AppError::InvalidSourceReference(format!(
                        "'{}' is not a github.com URL",
                        trimmed
                    ))
                })?
            }
            None => trimmed
                .strip_prefix("www.github.com/")
                .or_else(|| trimmed.strip_prefix("github.com/"))
                .unwrap_or(trimmed),
        };

        let parts: Vec<&str> = rest.split('/').filter(|p| !p.is_empty()).collect();
        if parts.len() < 2 {
            return Err(AppError::InvalidSourceReference(format!(
                "'{}' does not name an owner and a repository",
                trimmed
            )));
        }
        let owner = parts[0];
        let repo = parts[1].strip_suffix(".git").unwrap_or(parts[1]);
        if !is_valid_name(owner) || !is_valid_name(repo) {
            return Err(AppError::InvalidSourceReference(format!(
                "'{}' has an invalid owner or repository name",
                trimmed
            )));
        }

        let (branch, subpath) = match parts.get(2) {
            Some(&"tree") if parts.len() > 3 => {
                let subpath = parts[4..].join("/");
                (
                    Some(parts[3].to_string()),
                    Some(subpath).filter(|s| !s.is_empty()),
                )
            }
            Some(extra) => {
                log::debug!("Ignoring trailing URL component '{}' in {}", extra, trimmed);
                (None, None)
            }
            None => (None, None),
        };

        Ok(Self {
            owner: owner.to_string(),
            repo: repo.to_string(),
            branch,
            subpath,
        })
    }

    pub fn api_repo_url(&self) -> String {
        format!("{}/repos/{}/{}", API_BASE, self.owner, self.repo)
    }

    pub fn tree_url(&self, branch: &str) -> String {
        format!("{}/git/trees/{}?recursive=1", self.api_repo_url(), branch)
    }

    pub fn raw_url(&self, branch: &str, path: &str) -> String {
        format!("{}/{}/{}/{}/{}", RAW_BASE, self.owner, self.repo, branch, path)
    }

    /// Whether a repository-relative path lies under the subpath, on a
    /// directory boundary.
    pub fn contains(&self, path: &str) -> bool {
        match &self.subpath {
            None => true,
            Some(sub) => {
                path == sub
                    || path
                        .strip_prefix(sub.as_str())
                        .is_some_and(|rest| rest.starts_with('/'))
            }
        }
    }
}

impl fmt::Display for GithubRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "github.com/{}/{}", self.owner, self.repo)?;
        if let Some(branch) = &self.branch {
            write!(f, "/tree/{}", branch)?;
            if let Some(sub) = &self.subpath {
                write!(f, "/{}", sub)?;
            }
        }
        Ok(())
    }
}

fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },
    #[error("request to {url} failed: {reason}")]
    Transport { url: String, reason: String },
}

impl FetchError {
    pub fn into_transient(self, url: &str) -> AppError {
        AppError::TransientFetch {
            url: url.to_string(),
            reason: self.to_string(),
        }
    }
}

/// Retrieves a URL as text.
pub trait Fetcher: Send + Sync {
    fn fetch_text(&self, url: &str) -> Result<String, FetchError>;
}

pub struct HttpFetcher {
    client: Client,
    token: Option<String>,
}

impl HttpFetcher {
    /// `GITHUB_TOKEN`, when set, is sent as a bearer token.
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("repopack/", env!("CARGO_PKG_VERSION")))
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| AppError::Http(e.to_string()))?;
        let token = env::var("GITHUB_TOKEN").ok().filter(|t| !t.trim().is_empty());
        if token.is_some() {
            log::debug!("Using GITHUB_TOKEN for GitHub requests.");
        }
        Ok(Self { client, token })
    }
}

impl Fetcher for HttpFetcher {
    fn fetch_text(&self, url: &str) -> Result<String, FetchError> {
        log::trace!("GET {}", url);
        let mut request = self.client.get(url);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        let transport = |e: reqwest::Error| FetchError::Transport {
            url: url.to_string(),
            reason: e.to_string(),
        };
        let response = request.send().map_err(transport)?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(FetchError::NotFound(url.to_string()));
        }
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        response.text().map_err(transport)
    }
}

type CacheSlot = Arc<OnceCell<Result<String, FetchError>>>;

/// Memoizes every URL for the lifetime of the wrapper. Concurrent requests
/// for the same URL wait on the first one instead of issuing their own.
pub struct CachedFetcher<F> {
    inner: F,
    cache: Mutex<HashMap<String, CacheSlot>>,
}

impl<F: Fetcher> CachedFetcher<F> {
    pub fn new(inner: F) -> Self {
        Self {
            inner,
            cache: Mutex::new(HashMap::new()),
        }
    }

    fn slot(&self, url: &str) -> CacheSlot {
        let mut cache = match self.cache.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        cache.entry(url.to_string()).or_default().clone()
    }
}

impl<F: Fetcher> Fetcher for CachedFetcher<F> {
    fn fetch_text(&self, url: &str) -> Result<String, FetchError> {
        self.slot(url)
            .get_or_init(|| self.inner.fetch_text(url))
            .clone()
    }
}

#[derive(Debug, Deserialize)]
struct RepoMetadata {
    default_branch: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TreeResponse {
    tree: Option<Vec<TreeItem>>,
    #[serde(default)]
    truncated: bool,
}

#[derive(Debug, Deserialize)]
struct TreeItem {
    path: String,
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Debug)]
struct RemoteTree {
    branch: String,
    blobs: Vec<String>,
}

pub struct RemoteSource<F: Fetcher> {
    reference: GithubRef,
    fetcher: F,
    batch_size: usize,
    fallback_branch: String,
    tree: OnceCell<RemoteTree>,
}

impl<F: Fetcher> RemoteSource<F> {
    pub fn new(reference: GithubRef, fetcher: F) -> Self {
        Self {
            reference,
            fetcher,
            batch_size: crate::config::DEFAULT_BATCH_SIZE,
            fallback_branch: crate::config::DEFAULT_BRANCH.to_string(),
            tree: OnceCell::new(),
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_fallback_branch(mut self, branch: impl Into<String>) -> Self {
        self.fallback_branch = branch.into();
        self
    }

    pub fn reference(&self) -> &GithubRef {
        &self.reference
    }

    fn resolve_branch(&self) -> String {
        if let Some(branch) = &self.reference.branch {
            return branch.clone();
        }
        let url = self.reference.api_repo_url();
        let detected = self
            .fetcher
            .fetch_text(&url)
            .map_err(|e| e.to_string())
            .and_then(|body| {
                serde_json::from_str::<RepoMetadata>(&body).map_err(|e| e.to_string())
            })
            .map(|meta| meta.default_branch.filter(|b| !b.is_empty()));
        match detected {
            Ok(Some(branch)) => {
                log::debug!("Default branch of {}: {}", self.reference, branch);
                branch
            }
            Ok(None) => self.fallback_branch.clone(),
            Err(e) => {
                log::warn!(
                    "Failed to fetch repository info ({}), assuming '{}'.",
                    e,
                    self.fallback_branch
                );
                self.fallback_branch.clone()
            }
        }
    }

    fn remote_tree(&self) -> Result<&RemoteTree> {
        self.tree.get_or_try_init(|| {
            let branch = self.resolve_branch();
            let url = self.reference.tree_url(&branch);
            log::info!("Listing {} at branch '{}'...", self.reference, branch);
            let body = self.fetcher.fetch_text(&url).map_err(|e| match e {
                FetchError::NotFound(_) => AppError::RemoteResourceNotFound(format!(
                    "{} (branch '{}')",
                    self.reference, branch
                )),
                other => AppError::Http(other.to_string()),
            })?;
            let response: TreeResponse = serde_json::from_str(&body)?;
            let items = response.tree.ok_or_else(|| {
                AppError::RemoteResourceNotFound(format!(
                    "{} has no tree at branch '{}'",
                    self.reference, branch
                ))
            })?;
            if response.truncated {
                log::warn!(
                    "GitHub truncated the tree listing for {}; some files will be missing.",
                    self.reference
                );
            }
            let blobs: Vec<String> = items
                .into_iter()
                .filter(|item| item.kind == "blob")
                .map(|item| item.path)
                .collect();
            log::info!("Remote tree lists {} files.", blobs.len());
            Ok(RemoteTree { branch, blobs })
        })
    }
}

impl<F: Fetcher> EntrySource for RemoteSource<F> {
    fn describe(&self) -> String {
        self.reference.to_string()
    }

    /// Ignore files are only looked up at the repository root. A failed
    /// download is logged and treated as absent.
    fn read_ignore_file(&self, file: IgnoreFile) -> Result<Option<String>> {
        let tree = self.remote_tree()?;
        let name = file.file_name();
        if !tree.blobs.iter().any(|p| p == name) {
            return Ok(None);
        }
        let url = self.reference.raw_url(&tree.branch, name);
        match self.fetcher.fetch_text(&url) {
            Ok(text) => Ok(Some(text)),
            Err(e) => {
                log::warn!("{}", e.into_transient(&url));
                Ok(None)
            }
        }
    }

    fn list_entries(&self, rules: &PatternSet) -> Result<Listing> {
        let tree = self.remote_tree()?;
        let mut listing = Listing::default();
        let mut candidates = Vec::new();
        for path in tree.blobs.iter().filter(|p| self.reference.contains(p)) {
            if rules.is_ignored(path) {
                log::trace!("Ignored before fetch: {}", path);
                listing.skipped.push(SkippedEntry {
                    path: path.clone(),
                    reason: SkipReason::Ignored,
                });
            } else {
                candidates.push(path.as_str());
            }
        }
        log::info!(
            "Fetching {} files in batches of {}...",
            candidates.len(),
            self.batch_size
        );

        for batch in candidates.chunks(self.batch_size) {
            let results: Vec<(&str, Result<String, FetchError>)> = batch
                .par_iter()
                .map(|path| {
                    let url = self.reference.raw_url(&tree.branch, path);
                    (*path, self.fetcher.fetch_text(&url))
                })
                .collect();
            for (path, result) in results {
                match result {
                    Ok(content) => {
                        let entry = FileEntry::new(path, content);
                        listing.entries.push(match media_kind_for(path) {
                            Some(kind) => entry.with_media_kind(kind),
                            None => entry,
                        });
                    }
                    Err(e) => {
                        let url = self.reference.raw_url(&tree.branch, path);
                        let reason = e.to_string();
                        log::warn!("{}", e.into_transient(&url));
                        listing.skipped.push(SkippedEntry {
                            path: path.to_string(),
                            reason: SkipReason::FetchFailed(reason),
                        });
                    }
                }
            }
        }
        log::debug!(
            "Fetched {} files, skipped {}.",
            listing.entries.len(),
            listing.skipped.len()
        );
        Ok(listing)
    }
}
