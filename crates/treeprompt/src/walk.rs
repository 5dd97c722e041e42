//! Project file collection: directory walks and explicit file lists.

use std::path::{Path, PathBuf};

use ignore::overrides::{Override, OverrideBuilder};

use crate::lang::detect_language;
use crate::output::{PROMPT_FILE_NAME, TREE_FILE_NAME};

/// File and directory names that are never collected.  A matching
/// directory is pruned together with everything beneath it.
pub const IGNORED_NAMES: &[&str] = &[
    ".git",
    ".hg",
    ".svn",
    "__pycache__",
    ".pytest_cache",
    ".mypy_cache",
    ".ipynb_checkpoints",
    ".idea",
    ".vscode",
    ".env",
    ".venv",
    "venv",
    PROMPT_FILE_NAME,
];

/// Returns `true` if `name` is on the [`IGNORED_NAMES`] list.
#[must_use]
pub fn is_ignored_name(name: &str) -> bool {
    IGNORED_NAMES.contains(&name)
}

/// Globs for files this tool writes itself (logs, saved replies, saved
/// trees).  They match at any depth during a directory walk.
pub const GENERATED_FILE_GLOBS: &[&str] = &["log_*.log", "response_*.txt", TREE_FILE_NAME];

/// Default per-file size cap (3 MB).
pub const MAX_FILE_SIZE: u64 = 3 * 1024 * 1024;
/// Number of bytes read for UTF-8 sniffing.
const SNIFF_BYTES: usize = 8 * 1024;

/// A readable, non-blank project file destined for the prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    rel_path: PathBuf,
    language: Option<&'static str>,
    content: String,
}

impl FileRecord {
    /// Build a record, or `None` if `content` is blank after trimming.
    #[must_use]
    pub fn new(
        rel_path: impl Into<PathBuf>,
        language: Option<&'static str>,
        content: String,
    ) -> Option<Self> {
        if content.trim().is_empty() {
            return None;
        }
        Some(Self {
            rel_path: rel_path.into(),
            language,
            content,
        })
    }

    /// Path shown in the prompt (relative to the walk root, or as typed).
    #[must_use]
    pub fn rel_path(&self) -> &Path {
        &self.rel_path
    }

    /// Code-fence language tag, if one was detected.
    #[must_use]
    pub fn language(&self) -> Option<&'static str> {
        self.language
    }

    /// Full UTF-8 content.
    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }
}

/// Why a file was left out of the prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Content is not valid UTF-8.
    NotUtf8,
    /// File exceeds [`WalkOptions::max_file_size`].
    TooLarge(u64),
    /// File is empty or whitespace only.
    Blank,
    /// The file could not be read.
    Unreadable(String),
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotUtf8 => f.write_str("not UTF-8 text"),
            Self::TooLarge(size) => write!(f, "too large ({size} bytes)"),
            Self::Blank => f.write_str("blank"),
            Self::Unreadable(msg) => write!(f, "unreadable: {msg}"),
        }
    }
}

/// A file that was found but not collected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedFile {
    /// Path as it would have appeared in the prompt.
    pub rel_path: PathBuf,
    /// Why it was skipped.
    pub reason: SkipReason,
}

/// Options controlling collection.
#[derive(Debug, Clone)]
pub struct WalkOptions {
    /// Also honour `.gitignore` files (off by default).
    pub git_ignore: bool,
    /// Files larger than this many bytes are skipped.
    pub max_file_size: u64,
    /// Directories pruned from a walk when they lie under its root, such
    /// as the log directory.
    pub exclude_dirs: Vec<PathBuf>,
}

impl Default for WalkOptions {
    fn default() -> Self {
        Self {
            git_ignore: false,
            max_file_size: MAX_FILE_SIZE,
            exclude_dirs: Vec::new(),
        }
    }
}

/// Everything gathered by one collection pass.
#[derive(Debug, Default)]
pub struct CollectResult {
    /// Collected files in traversal order.
    pub records: Vec<FileRecord>,
    /// Files that were found but skipped.
    pub skipped: Vec<SkippedFile>,
    /// Traversal errors (e.g. permission denied on a subdirectory).  These
    /// don't prevent the rest of the walk from completing.
    pub errors: Vec<WalkIssue>,
}

impl CollectResult {
    /// Returns `true` if the walk encountered any traversal errors.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    fn push(&mut self, rel_path: PathBuf, outcome: Result<FileRecord, SkipReason>) {
        match outcome {
            Ok(record) => {
                tracing::debug!(path = %record.rel_path.display(), language = ?record.language, "collected file");
                self.records.push(record);
            }
            Err(SkipReason::Blank) => {
                tracing::debug!(path = %rel_path.display(), "skipping blank file");
                self.skipped.push(SkippedFile {
                    rel_path,
                    reason: SkipReason::Blank,
                });
            }
            Err(reason) => {
                tracing::warn!(path = %rel_path.display(), %reason, "skipping file");
                self.skipped.push(SkippedFile { rel_path, reason });
            }
        }
    }
}

/// Fatal collection errors.  Both are recoverable by asking again.
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum WalkError {
    /// The directory to walk does not exist or is not a directory.
    #[error("{} is not a directory", .0.display())]
    #[diagnostic(code(treeprompt::walk::not_a_directory))]
    NotADirectory(PathBuf),

    /// None of the comma-separated paths named an existing regular file.
    #[error("no valid files in {0:?}")]
    #[diagnostic(
        code(treeprompt::walk::no_valid_files),
        help("separate paths with commas; each must be an existing regular file")
    )]
    NoValidFiles(String),

    /// An exclusion glob could not be compiled.
    #[error("invalid exclusion pattern")]
    #[diagnostic(code(treeprompt::walk::exclusion))]
    Exclusion(#[source] ignore::Error),
}

/// A bundle of non-fatal walk errors, rendered as related diagnostics.
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
#[error("errors while walking {}", root.display())]
#[diagnostic(code(treeprompt::walk))]
pub struct WalkIssues {
    root: PathBuf,
    #[related]
    related: Vec<WalkIssue>,
}

impl WalkIssues {
    /// Build a diagnostic from a [`CollectResult`]'s errors (cloning them).
    /// Returns `None` if there are no errors.
    #[must_use]
    pub fn from_result(root: &Path, result: &CollectResult) -> Option<Self> {
        if result.errors.is_empty() {
            return None;
        }
        Some(Self {
            root: root.to_path_buf(),
            related: result.errors.clone(),
        })
    }
}

/// A non-fatal error encountered while walking a directory tree.
#[derive(Debug, Clone, thiserror::Error, miette::Diagnostic)]
#[error("{message}")]
#[diagnostic(code(treeprompt::walk::entry))]
pub struct WalkIssue {
    message: String,
}

/// Recursively collect every file under `root`.
///
/// Entries are visited in file-name order at each level, so the result is
/// deterministic for a fixed filesystem state.  Anything on the
/// [`IGNORED_NAMES`] list is pruned along with its descendants, as are the
/// [`GENERATED_FILE_GLOBS`] and any [`WalkOptions::exclude_dirs`] inside
/// `root`.
pub fn collect_dir(root: &Path, opts: &WalkOptions) -> Result<CollectResult, WalkError> {
    if !root.is_dir() {
        return Err(WalkError::NotADirectory(root.to_path_buf()));
    }

    let mut builder = ignore::WalkBuilder::new(root);
    builder
        .standard_filters(false)
        .overrides(exclusions(root, opts)?)
        .git_ignore(opts.git_ignore)
        .git_exclude(opts.git_ignore)
        .require_git(false)
        .sort_by_file_name(|a, b| a.cmp(b))
        .filter_entry(|entry| !is_ignored_name(&entry.file_name().to_string_lossy()));

    let mut result = CollectResult::default();
    for item in builder.build() {
        match item {
            Ok(entry) => {
                if !entry.file_type().is_some_and(|ft| ft.is_file()) {
                    continue;
                }
                let rel_path = entry
                    .path()
                    .strip_prefix(root)
                    .unwrap_or(entry.path())
                    .to_path_buf();
                let outcome = read_record(entry.path(), &rel_path, opts);
                result.push(rel_path, outcome);
            }
            Err(e) => {
                tracing::warn!(error = %e, "walk error");
                result.errors.push(WalkIssue {
                    message: e.to_string(),
                });
            }
        }
    }

    tracing::info!(
        root = %root.display(),
        collected = result.records.len(),
        skipped = result.skipped.len(),
        "directory scanned"
    );
    Ok(result)
}

/// Ignore-only overrides for generated files and excluded directories.
fn exclusions(root: &Path, opts: &WalkOptions) -> Result<Override, WalkError> {
    let mut builder = OverrideBuilder::new(root);
    for glob in GENERATED_FILE_GLOBS {
        builder
            .add(&format!("!{glob}"))
            .map_err(WalkError::Exclusion)?;
    }

    if let Ok(canonical_root) = root.canonicalize() {
        for dir in &opts.exclude_dirs {
            // A directory that doesn't exist yet has nothing to prune.
            let Ok(dir) = dir.canonicalize() else { continue };
            let Ok(rel) = dir.strip_prefix(&canonical_root) else {
                continue;
            };
            if rel.as_os_str().is_empty() {
                continue;
            }
            let rel = rel
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            tracing::debug!(dir = %rel, "excluding directory");
            builder
                .add(&format!("!/{rel}/"))
                .map_err(WalkError::Exclusion)?;
        }
    }

    builder.build().map_err(WalkError::Exclusion)
}

/// Collect an explicit comma-separated list of file paths.
///
/// Blank entries and paths that are not existing regular files are dropped;
/// if nothing is left the caller gets [`WalkError::NoValidFiles`] and should
/// ask again.  Each path is shown in the prompt exactly as typed.
pub fn collect_files(list: &str, opts: &WalkOptions) -> Result<CollectResult, WalkError> {
    let valid: Vec<PathBuf> = list
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(PathBuf::from)
        .filter(|p| {
            let ok = p.is_file();
            if !ok {
                tracing::warn!(path = %p.display(), "not a regular file, ignoring");
            }
            ok
        })
        .collect();

    if valid.is_empty() {
        return Err(WalkError::NoValidFiles(list.to_string()));
    }

    let mut result = CollectResult::default();
    for path in valid {
        let outcome = read_record(&path, &path, opts);
        result.push(path, outcome);
    }
    Ok(result)
}

/// Read one file into a [`FileRecord`], or explain why it was skipped.
fn read_record(path: &Path, rel_path: &Path, opts: &WalkOptions) -> Result<FileRecord, SkipReason> {
    let meta = std::fs::metadata(path).map_err(|e| SkipReason::Unreadable(e.to_string()))?;
    if meta.len() > opts.max_file_size {
        return Err(SkipReason::TooLarge(meta.len()));
    }

    // Sniff the head first so large binaries are rejected without a full read.
    let sniff = read_first_bytes(path, SNIFF_BYTES).map_err(|e| SkipReason::Unreadable(e.to_string()))?;
    if !is_valid_utf8_sniff(&sniff) {
        return Err(SkipReason::NotUtf8);
    }

    let content = std::fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::InvalidData {
            SkipReason::NotUtf8
        } else {
            SkipReason::Unreadable(e.to_string())
        }
    })?;

    FileRecord::new(rel_path, detect_language(path), content).ok_or(SkipReason::Blank)
}

/// Returns `true` if `bytes` is valid UTF-8 or only has an incomplete
/// multi-byte sequence at the very end (the sniff buffer was truncated
/// mid-character).
fn is_valid_utf8_sniff(bytes: &[u8]) -> bool {
    match std::str::from_utf8(bytes) {
        Ok(_) => true,
        Err(e) => e.error_len().is_none(),
    }
}

fn read_first_bytes(path: &Path, limit: usize) -> std::io::Result<Vec<u8>> {
    use std::io::Read;
    let mut file = std::fs::File::open(path)?;
    let mut buf = Vec::with_capacity(limit);
    file.take(limit as u64).read_to_end(&mut buf)?;
    Ok(buf)
}
