//! Tier 1: regex search over an index of files under the search roots.
//!
//! The index is built on first use with the `ignore` walker (hidden entries
//! and .gitignore'd paths are skipped) and is read-only afterwards, so one
//! tier can serve concurrent resolutions.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use ignore::WalkBuilder;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use super::{SearchItem, SearchTier};
use crate::error::TierError;

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Restricts which index entries a pattern may match.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchKind {
    /// Any file or folder whose name or path matches the regex.
    #[default]
    Regex,
    Audio,
    Video,
    Picture,
    Document,
    Executable,
    Folder,
    Archive,
    /// The pattern is a list of extensions (`"docx, pdf"`), not a regex.
    Extension,
}

impl SearchKind {
    pub const ALL: [SearchKind; 9] = [
        Self::Regex,
        Self::Audio,
        Self::Video,
        Self::Picture,
        Self::Document,
        Self::Executable,
        Self::Folder,
        Self::Archive,
        Self::Extension,
    ];

    /// Extensions admitted by a category kind, lowercase without the dot.
    pub fn extensions(self) -> Option<&'static [&'static str]> {
        match self {
            Self::Audio => Some(&["mp3", "wav", "flac", "aac", "ogg", "wma", "m4a", "ape"]),
            Self::Video => Some(&["mp4", "mkv", "avi", "mov", "wmv", "flv", "webm", "m4v"]),
            Self::Picture => Some(&["jpg", "jpeg", "png", "gif", "bmp", "webp", "tif", "tiff"]),
            Self::Document => Some(&[
                "doc", "docx", "pdf", "txt", "odt", "rtf", "xls", "xlsx", "ppt", "pptx", "md",
            ]),
            Self::Executable => Some(&["exe", "bat", "cmd", "msi", "lnk", "com", "app"]),
            Self::Archive => Some(&["zip", "rar", "7z", "tar", "gz", "bz2", "xz"]),
            Self::Regex | Self::Folder | Self::Extension => None,
        }
    }

    fn admits(self, entry: &IndexEntry) -> bool {
        match self {
            Self::Regex | Self::Extension => true,
            Self::Folder => entry.is_dir,
            _ => {
                let (Some(set), Some(ext)) = (self.extensions(), entry.extension()) else {
                    return false;
                };
                !entry.is_dir && set.contains(&ext.as_str())
            }
        }
    }
}

impl fmt::Display for SearchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Regex => "regex",
            Self::Audio => "audio",
            Self::Video => "video",
            Self::Picture => "picture",
            Self::Document => "document",
            Self::Executable => "executable",
            Self::Folder => "folder",
            Self::Archive => "archive",
            Self::Extension => "extension",
        };
        f.write_str(s)
    }
}

impl FromStr for SearchKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.to_string().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown search kind '{s}'"))
    }
}

/// One file or folder found under a search root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    pub name: String,
    pub path: PathBuf,
    /// `path` below its search root; what patterns are matched against.
    pub relative: PathBuf,
    pub is_dir: bool,
}

impl IndexEntry {
    fn extension(&self) -> Option<String> {
        self.path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
    }
}

/// Name/path index of everything under a set of roots.
#[derive(Debug, Default)]
pub struct FileIndex {
    entries: Vec<IndexEntry>,
}

impl FileIndex {
    /// Walk `roots` and record every file and folder below them.
    pub fn build(roots: &[PathBuf], max_depth: Option<usize>) -> Self {
        let never = AtomicBool::new(false);
        Self::build_cancellable(roots, max_depth, &never).unwrap_or_default()
    }

    /// [`FileIndex::build`] that gives up with `None` once `cancel` is set.
    ///
    /// The flag is checked before every walker entry.
    pub fn build_cancellable(
        roots: &[PathBuf],
        max_depth: Option<usize>,
        cancel: &AtomicBool,
    ) -> Option<Self> {
        let mut entries = Vec::new();
        for root in roots {
            if !root.exists() {
                warn!(root = %root.display(), "Search root does not exist, skipping");
                continue;
            }
            let walker = WalkBuilder::new(root)
                .hidden(true)
                .git_ignore(true)
                .max_depth(max_depth)
                .build();

            let mut unreadable = 0usize;
            for result in walker {
                if cancel.load(Ordering::Relaxed) {
                    debug!(root = %root.display(), indexed = entries.len(), "Index build cancelled");
                    return None;
                }
                let entry = match result {
                    Ok(entry) => entry,
                    Err(e) => {
                        unreadable += 1;
                        debug!(error = %e, "Skipping unreadable entry");
                        continue;
                    }
                };
                if entry.depth() == 0 {
                    continue;
                }
                let path = entry.path();
                let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                    continue;
                };
                entries.push(IndexEntry {
                    name: name.to_string(),
                    path: path.to_path_buf(),
                    relative: path.strip_prefix(root).unwrap_or(path).to_path_buf(),
                    is_dir: entry.file_type().is_some_and(|t| t.is_dir()),
                });
            }
            if unreadable > 0 {
                warn!(root = %root.display(), unreadable, "Some entries could not be indexed");
            }
        }

        entries.sort_by(|a, b| a.path.cmp(&b.path));
        entries.dedup_by(|a, b| a.path == b.path);
        Some(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries admitted by `kind` and matched by `pattern`, at most `max_results`.
    pub fn search(&self, pattern: &str, kind: SearchKind, max_results: usize) -> Vec<SearchItem> {
        let matcher = Matcher::new(pattern, kind);
        self.entries
            .iter()
            .filter(|e| kind.admits(e) && matcher.matches(e))
            .take(max_results)
            .map(|e| SearchItem::new(e.name.clone(), e.path.clone()))
            .collect()
    }
}

enum Matcher {
    Pattern(Regex),
    Extensions(Vec<String>),
    Nothing,
}

impl Matcher {
    fn new(pattern: &str, kind: SearchKind) -> Self {
        if kind == SearchKind::Extension {
            let exts = pattern
                .split(|c: char| c == ',' || c == ';' || c == '|' || c.is_whitespace())
                .map(|e| e.trim_start_matches('*').trim_start_matches('.').to_ascii_lowercase())
                .filter(|e| !e.is_empty())
                .collect();
            return Self::Extensions(exts);
        }

        let regex = RegexBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .or_else(|e| {
                warn!(%pattern, error = %e, "Invalid search pattern, matching it literally");
                RegexBuilder::new(&regex::escape(pattern))
                    .case_insensitive(true)
                    .build()
            });
        match regex {
            Ok(r) => Self::Pattern(r),
            // only reachable when the literal exceeds the regex size limit
            Err(_) => Self::Nothing,
        }
    }

    fn matches(&self, entry: &IndexEntry) -> bool {
        match self {
            Self::Pattern(r) => {
                r.is_match(&entry.name) || r.is_match(&entry.relative.to_string_lossy())
            }
            Self::Extensions(exts) if exts.is_empty() => true,
            Self::Extensions(exts) => entry.extension().is_some_and(|e| exts.contains(&e)),
            Self::Nothing => false,
        }
    }
}

/// Tier 1: pattern search over a lazily built [`FileIndex`].
pub struct IndexedSearchTier {
    roots: Vec<PathBuf>,
    max_depth: Option<usize>,
    kind: SearchKind,
    timeout: Duration,
    index: OnceCell<Arc<FileIndex>>,
}

impl IndexedSearchTier {
    pub fn new(roots: Vec<PathBuf>) -> Self {
        Self {
            roots,
            max_depth: None,
            kind: SearchKind::Regex,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            index: OnceCell::new(),
        }
    }

    pub fn with_kind(mut self, kind: SearchKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    async fn index(&self) -> Result<Arc<FileIndex>, TierError> {
        self.index
            .get_or_try_init(|| async {
                let roots = self.roots.clone();
                let max_depth = self.max_depth;
                let cancel = Arc::new(AtomicBool::new(false));
                let flag = Arc::clone(&cancel);
                let mut task = tokio::task::spawn_blocking(move || {
                    FileIndex::build_cancellable(&roots, max_depth, &flag)
                });

                let index = match tokio::time::timeout(self.timeout, &mut task).await {
                    Ok(Ok(Some(index))) => index,
                    Ok(Ok(None)) => return Err(TierError::Join("index build cancelled".into())),
                    Ok(Err(e)) => return Err(TierError::Join(e.to_string())),
                    Err(_) => {
                        cancel.store(true, Ordering::Relaxed);
                        // Returns at the walker's next entry.
                        if let Err(e) = task.await {
                            debug!(error = %e, "Cancelled index build did not join cleanly");
                        }
                        let timeout_ms = self.timeout.as_millis() as u64;
                        warn!(timeout_ms, roots = self.roots.len(), "File index build timed out");
                        return Err(TierError::Timeout { timeout_ms });
                    }
                };
                info!(entries = index.len(), roots = self.roots.len(), "File index built");
                Ok(Arc::new(index))
            })
            .await
            .cloned()
    }
}

#[async_trait]
impl SearchTier for IndexedSearchTier {
    fn name(&self) -> &str {
        "indexed"
    }

    async fn search(
        &self,
        pattern: &str,
        max_results: usize,
    ) -> Result<Vec<SearchItem>, TierError> {
        let index = self.index().await?;
        let results = index.search(pattern, self.kind, max_results);
        debug!(%pattern, kind = %self.kind, hits = results.len(), "Indexed search finished");
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;

    fn index_root(root: &Path) -> FileIndex {
        FileIndex::build(&[root.to_path_buf()], None)
    }

    fn fixture() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("projects/project-2")).unwrap();
        fs::create_dir_all(root.join("music")).unwrap();
        fs::write(root.join("projects/project-2/Report.DOCX"), "r").unwrap();
        fs::write(root.join("projects/project-2/notes.txt"), "n").unwrap();
        fs::write(root.join("projects/project-1-report.pdf"), "p").unwrap();
        fs::write(root.join("music/song.mp3"), "m").unwrap();
        fs::write(root.join(".hidden-report.docx"), "h").unwrap();
        dir
    }

    #[test]
    fn test_index_skips_hidden_and_root() {
        let dir = fixture();
        let index = index_root(dir.path());
        assert!(index.entries.iter().all(|e| !e.name.starts_with('.')));
        assert!(index.entries.iter().all(|e| e.path != dir.path()));
        // 3 dirs + 4 visible files
        assert_eq!(index.len(), 7);
    }

    #[test]
    fn test_root_prefix_is_not_matched() {
        let base = tempfile::tempdir().unwrap();
        let root = base.path().join("alice-reports");
        fs::create_dir_all(root.join("music")).unwrap();
        fs::write(root.join("budget.xlsx"), "b").unwrap();
        fs::write(root.join("music/song.mp3"), "m").unwrap();
        let index = index_root(&root);

        assert!(index.search("report", SearchKind::Regex, 10).is_empty());
        assert!(index.search("alice", SearchKind::Regex, 10).is_empty());

        let hits = index.search("music.song", SearchKind::Regex, 10);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].path, root.join("music").join("song.mp3"));
    }

    #[test]
    fn test_cancelled_build_returns_nothing() {
        let dir = fixture();
        let cancel = AtomicBool::new(true);
        assert!(FileIndex::build_cancellable(&[dir.path().to_path_buf()], None, &cancel).is_none());

        let cancel = AtomicBool::new(false);
        let index = FileIndex::build_cancellable(&[dir.path().to_path_buf()], None, &cancel);
        assert_eq!(index.map(|i| i.len()), Some(7));
    }

    #[test]
    fn test_regex_is_case_insensitive_over_name_and_path() {
        let dir = fixture();
        let index = index_root(dir.path());

        let hits = index.search(r"report\.docx$", SearchKind::Regex, 10);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "Report.DOCX");

        // Matches via the parent folder in the path.
        let hits = index.search("project-2.*notes", SearchKind::Regex, 10);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "notes.txt");
    }

    #[test]
    fn test_kind_filters() {
        let dir = fixture();
        let index = index_root(dir.path());

        let docs = index.search("report", SearchKind::Document, 10);
        let names: Vec<_> = docs.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, ["project-1-report.pdf", "Report.DOCX"]);

        let folders = index.search("project", SearchKind::Folder, 10);
        assert!(folders.iter().all(|f| f.path.is_dir()));
        assert_eq!(folders.len(), 2);

        let audio = index.search("", SearchKind::Audio, 10);
        assert_eq!(audio.len(), 1);
        assert_eq!(audio[0].name, "song.mp3");
    }

    #[test]
    fn test_extension_kind_takes_extension_list() {
        let dir = fixture();
        let index = index_root(dir.path());
        let hits = index.search("*.docx, .mp3", SearchKind::Extension, 10);
        let mut names: Vec<_> = hits.iter().map(|h| h.name.clone()).collect();
        names.sort();
        assert_eq!(names, ["Report.DOCX", "song.mp3"]);
    }

    #[test]
    fn test_invalid_regex_falls_back_to_literal() {
        let dir = fixture();
        fs::write(dir.path().join("music/a(b.txt"), "x").unwrap();
        let index = index_root(dir.path());
        let hits = index.search("a(b", SearchKind::Regex, 10);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "a(b.txt");
    }

    #[test]
    fn test_max_results_caps_output() {
        let dir = fixture();
        let index = index_root(dir.path());
        assert_eq!(index.search("", SearchKind::Regex, 3).len(), 3);
    }

    #[test]
    fn test_search_kind_parse() {
        assert_eq!("Document".parse::<SearchKind>().unwrap(), SearchKind::Document);
        assert_eq!(" folder ".parse::<SearchKind>().unwrap(), SearchKind::Folder);
        assert!("spreadsheet".parse::<SearchKind>().is_err());
    }

    #[tokio::test]
    async fn test_tier_builds_index_once() {
        let dir = fixture();
        let tier = IndexedSearchTier::new(vec![dir.path().to_path_buf()]);
        let first = tier.search("song", 10).await.unwrap();
        fs::write(dir.path().join("music/song2.mp3"), "m").unwrap();
        let second = tier.search("song", 10).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 1);
    }

    #[tokio::test]
    async fn test_timed_out_build_is_abandoned_each_time() {
        let dir = fixture();
        for i in 0..300 {
            fs::write(dir.path().join(format!("music/track-{i:03}.mp3")), "m").unwrap();
        }
        let tier =
            IndexedSearchTier::new(vec![dir.path().to_path_buf()]).with_timeout(Duration::ZERO);

        for _ in 0..2 {
            let err = tier.search("song", 10).await.unwrap_err();
            assert!(matches!(err, TierError::Timeout { timeout_ms: 0 }));
            assert_eq!(err.to_string(), "search timed out after 0ms");
        }
        assert!(tier.index.get().is_none());
    }

    #[tokio::test]
    async fn test_missing_root_yields_no_results() {
        let tier = IndexedSearchTier::new(vec![PathBuf::from("/definitely/not/here")]);
        assert!(tier.search(".*", 10).await.unwrap().is_empty());
    }
}
