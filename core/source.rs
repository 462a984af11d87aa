use crate::error::{AppError, Result};
use crate::patterns::PatternSet;
use ignore::{WalkBuilder, WalkState};
use rayon::prelude::*;
use serde::Serialize;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::mpsc;

/// One candidate file as supplied by an ingestion collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// Forward-slash separated, relative, no leading slash.
    pub path: String,
    pub content: String,
    /// Declared media type (`image/png`, `text/plain`, ...) when the source knows it.
    pub media_kind: Option<String>,
    pub char_count: usize,
}

impl FileEntry {
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        let content = content.into();
        Self {
            path: path.into(),
            char_count: content.chars().count(),
            content,
            media_kind: None,
        }
    }

    pub fn with_media_kind(mut self, media_kind: impl Into<String>) -> Self {
        self.media_kind = Some(media_kind.into());
        self
    }

    /// Binary when the declared media type is image/video/audio or the
    /// content carries a NUL character.
    pub fn is_binary(&self) -> bool {
        let declared_binary = self.media_kind.as_deref().is_some_and(|kind| {
            ["image/", "video/", "audio/"]
                .iter()
                .any(|prefix| kind.starts_with(prefix))
        });
        declared_binary || self.content.contains('\0')
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", content = "detail", rename_all = "snake_case")]
pub enum SkipReason {
    Ignored,
    Binary,
    Unreadable(String),
    FetchFailed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedEntry {
    pub path: String,
    #[serde(flatten)]
    pub reason: SkipReason,
}

/// Everything a source produced for one run: readable entries plus the
/// paths it dropped on the way. Every skipped path counts as ignored.
#[derive(Debug, Clone, Default)]
pub struct Listing {
    pub entries: Vec<FileEntry>,
    pub skipped: Vec<SkippedEntry>,
}

impl Listing {
    pub fn from_entries(entries: Vec<FileEntry>) -> Self {
        Self {
            entries,
            skipped: Vec::new(),
        }
    }

    fn skip(&mut self, path: impl Into<String>, reason: SkipReason) {
        self.skipped.push(SkippedEntry {
            path: path.into(),
            reason,
        });
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreFile {
    Git,
    Repomix,
}

impl IgnoreFile {
    pub fn file_name(self) -> &'static str {
        match self {
            IgnoreFile::Git => ".gitignore",
            IgnoreFile::Repomix => ".repomixignore",
        }
    }
}

/// Supplies entries and ignore-file text to the packing engine.
///
/// `list_entries` receives the run's pattern set so a source can avoid
/// reading or downloading paths that would be dropped anyway; the engine
/// still evaluates every entry it is given.
pub trait EntrySource {
    fn describe(&self) -> String;
    fn read_ignore_file(&self, file: IgnoreFile) -> Result<Option<String>>;
    fn list_entries(&self, rules: &PatternSet) -> Result<Listing>;
}

/// A directory on the local filesystem.
#[derive(Debug, Clone)]
pub struct LocalSource {
    root: PathBuf,
}

impl LocalSource {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if !root.is_dir() {
            return Err(AppError::InvalidSourceReference(format!(
                "'{}' is not a directory",
                root.display()
            )));
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn walk_files(&self) -> Vec<String> {
        let mut builder = WalkBuilder::new(&self.root);
        // Every file is a candidate; filtering belongs to the pattern set.
        builder.standard_filters(false);
        builder.follow_links(false);
        builder.threads(rayon::current_num_threads().min(12));

        let (tx, rx) = mpsc::channel::<String>();
        let root = self.root.clone();
        builder.build_parallel().run(move || {
            let tx = tx.clone();
            let root = root.clone();
            Box::new(move |entry_result| {
                match entry_result {
                    Ok(entry) => {
                        if !entry.file_type().is_some_and(|ft| ft.is_file()) {
                            return WalkState::Continue;
                        }
                        let relative = entry
                            .path()
                            .strip_prefix(&root)
                            .ok()
                            .map(Path::to_path_buf)
                            .or_else(|| pathdiff::diff_paths(entry.path(), &root));
                        match relative {
                            Some(relative) => {
                                if tx.send(to_slash_path(&relative)).is_err() {
                                    log::error!("Receiver dropped for walked paths, stopping walk early.");
                                    return WalkState::Quit;
                                }
                            }
                            None => {
                                log::warn!("Could not get relative path for: {}", entry.path().display());
                            }
                        }
                    }
                    Err(e) => {
                        log::warn!("Error walking directory: {}", e);
                    }
                }
                WalkState::Continue
            })
        });

        let mut paths: Vec<String> = rx.into_iter().collect();
        paths.sort();
        paths
    }
}

impl EntrySource for LocalSource {
    fn describe(&self) -> String {
        self.root.display().to_string()
    }

    fn read_ignore_file(&self, file: IgnoreFile) -> Result<Option<String>> {
        let path = self.root.join(file.file_name());
        if !path.is_file() {
            log::trace!("No {} at {}", file.file_name(), path.display());
            return Ok(None);
        }
        fs::read_to_string(&path)
            .map(Some)
            .map_err(|source| AppError::FileRead { path, source })
    }

    fn list_entries(&self, rules: &PatternSet) -> Result<Listing> {
        log::info!("Walking project directory: {}", self.root.display());
        let paths = self.walk_files();
        log::info!("Directory walk complete. Found {} files.", paths.len());

        let mut listing = Listing::default();
        let mut to_read = Vec::new();
        for path in paths {
            if rules.is_ignored(&path) {
                log::trace!("Ignored before read: {}", path);
                listing.skip(path, SkipReason::Ignored);
            } else {
                to_read.push(path);
            }
        }

        let results: Vec<(String, Result<FileEntry, SkipReason>)> = to_read
            .into_par_iter()
            .map(|path| {
                let outcome = read_entry(&self.root, &path);
                (path, outcome)
            })
            .collect();

        for (path, outcome) in results {
            match outcome {
                Ok(entry) => listing.entries.push(entry),
                Err(reason) => {
                    if let SkipReason::Unreadable(detail) = &reason {
                        log::warn!(
                            "{}",
                            AppError::UnreadableEntry {
                                path: path.clone(),
                                reason: detail.clone(),
                            }
                        );
                    }
                    listing.skip(path, reason);
                }
            }
        }
        log::debug!(
            "Read {} files, skipped {}.",
            listing.entries.len(),
            listing.skipped.len()
        );
        Ok(listing)
    }
}

fn read_entry(root: &Path, relative: &str) -> Result<FileEntry, SkipReason> {
    let bytes = fs::read(root.join(relative)).map_err(|e| SkipReason::Unreadable(e.to_string()))?;
    let content = String::from_utf8(bytes).map_err(|e| {
        log::debug!("Skipping non-UTF-8 file: {} ({})", relative, e);
        SkipReason::Binary
    })?;
    let entry = FileEntry::new(relative, content);
    Ok(match media_kind_for(relative) {
        Some(kind) => entry.with_media_kind(kind),
        None => entry,
    })
}

fn to_slash_path(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(name) => Some(name.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Media type guessed from the extension, for the types that mark a file
/// as binary.
pub fn media_kind_for(path: &str) -> Option<&'static str> {
    let extension = path.rsplit_once('.')?.1.to_lowercase();
    let kind = match extension.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        "ico" => "image/x-icon",
        "svg" => "image/svg+xml",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "mov" => "video/quicktime",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "ogg" => "audio/ogg",
        "flac" => "audio/flac",
        _ => return None,
    };
    Some(kind)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patterns::PatternSetBuilder;
    use tempfile::TempDir;

    fn write(dir: &TempDir, path: &str, content: &[u8]) {
        let full = dir.path().join(path);
        fs::create_dir_all(full.parent().unwrap()).unwrap();
        fs::write(full, content).unwrap();
    }

    #[test]
    fn entry_counts_are_per_entry() {
        assert_eq!(FileEntry::new("a.txt", "hello").char_count, 5);
        assert_eq!(FileEntry::new("b.txt", "héllo wörld").char_count, 11);
    }

    #[test]
    fn binary_detection_uses_media_kind_and_nul() {
        assert!(FileEntry::new("x", "\0abc").is_binary());
        assert!(FileEntry::new("x.bin", "plain").with_media_kind("video/mp4").is_binary());
        assert!(!FileEntry::new("x.txt", "plain").with_media_kind("text/plain").is_binary());
        assert!(!FileEntry::new("x.txt", "plain").is_binary());
    }

    #[test]
    fn media_kinds_cover_binary_families() {
        assert_eq!(media_kind_for("a/b/logo.PNG"), Some("image/png"));
        assert_eq!(media_kind_for("clip.mov"), Some("video/quicktime"));
        assert_eq!(media_kind_for("main.rs"), None);
        assert_eq!(media_kind_for("Makefile"), None);
    }

    #[test]
    fn local_source_lists_relative_slash_paths_sorted() {
        let dir = TempDir::new().unwrap();
        write(&dir, "src/main.rs", b"fn main() {}");
        write(&dir, "README.md", b"hi");
        write(&dir, ".hidden/conf", b"x=1");

        let source = LocalSource::new(dir.path()).unwrap();
        let listing = source.list_entries(&PatternSet::default()).unwrap();
        let paths: Vec<_> = listing.entries.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, [".hidden/conf", "README.md", "src/main.rs"]);
        assert!(listing.skipped.is_empty());
    }

    #[test]
    fn local_source_skips_ignored_and_non_utf8_files() {
        let dir = TempDir::new().unwrap();
        write(&dir, "keep.txt", b"ok");
        write(&dir, "node_modules/pkg/index.js", b"module.exports = 1");
        write(&dir, "blob.dat", &[0xff, 0xfe, 0x00, 0x81]);

        let rules = PatternSetBuilder::new().builtin(&["node_modules"]).build();
        let listing = LocalSource::new(dir.path()).unwrap().list_entries(&rules).unwrap();

        assert_eq!(listing.entries.len(), 1);
        assert_eq!(listing.entries[0].path, "keep.txt");
        let mut skipped: Vec<_> = listing.skipped.iter().map(|s| (s.path.as_str(), &s.reason)).collect();
        skipped.sort_by_key(|(p, _)| *p);
        assert_eq!(
            skipped,
            [
                ("blob.dat", &SkipReason::Binary),
                ("node_modules/pkg/index.js", &SkipReason::Ignored)
            ]
        );
    }

    #[test]
    fn local_source_reads_ignore_files_from_root() {
        let dir = TempDir::new().unwrap();
        write(&dir, ".gitignore", b"target/\n");
        let source = LocalSource::new(dir.path()).unwrap();
        assert_eq!(
            source.read_ignore_file(IgnoreFile::Git).unwrap().as_deref(),
            Some("target/\n")
        );
        assert_eq!(source.read_ignore_file(IgnoreFile::Repomix).unwrap(), None);
    }

    #[test]
    fn missing_directory_is_an_invalid_reference() {
        let dir = TempDir::new().unwrap();
        let err = LocalSource::new(dir.path().join("nope")).unwrap_err();
        assert!(matches!(err, AppError::InvalidSourceReference(_)));
    }
}
