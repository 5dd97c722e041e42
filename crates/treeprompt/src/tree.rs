//! Connector-style directory tree rendering.
//!
//! [`Tree`] is a small recursive label tree that knows how to lay itself out
//! with box-drawing connectors; [`render_tree`] builds one from a directory
//! and wraps it in a Markdown code fence for the prompt.

use std::fmt::Display;
use std::io;
use std::path::Path;

use crate::walk::is_ignored_name;

const MIDDLE_ITEM: &str = "├── ";
const LAST_ITEM: &str = "└── ";
const MIDDLE_SKIP: &str = "│   ";
const LAST_SKIP: &str = "    ";

/// A label with ordered children.
#[derive(Debug, Clone)]
pub struct Tree<D: Display> {
    /// The label for this node.
    pub root: D,
    /// Child nodes, rendered in order.
    pub leaves: Vec<Tree<D>>,
}

impl<D: Display> Tree<D> {
    /// Create a new tree node with no children.
    pub const fn new(root: D) -> Self {
        Self {
            root,
            leaves: Vec::new(),
        }
    }

    /// Builder: set the child nodes.
    #[must_use]
    pub fn with_leaves(mut self, leaves: Vec<Self>) -> Self {
        self.leaves = leaves;
        self
    }

    /// One string per rendered line, root label first.
    ///
    /// The last child at every level gets the closing connector and its
    /// descendants a blank continuation instead of a vertical bar.
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        let mut out = vec![self.root.to_string()];
        self.push_child_lines("", &mut out);
        out
    }

    fn push_child_lines(&self, prefix: &str, out: &mut Vec<String>) {
        let count = self.leaves.len();
        for (i, leaf) in self.leaves.iter().enumerate() {
            let last = i + 1 == count;
            let connector = if last { LAST_ITEM } else { MIDDLE_ITEM };
            out.push(format!("{prefix}{connector}{}", leaf.root));

            if !leaf.leaves.is_empty() {
                let skip = if last { LAST_SKIP } else { MIDDLE_SKIP };
                leaf.push_child_lines(&format!("{prefix}{skip}"), out);
            }
        }
    }
}

// ─── Directory trees ─────────────────────────────────────────────────────────

/// Fence line that opens and closes the rendered block.
const FENCE: &str = "```";

/// Render `dir` as a fenced tree: the fence, `<root>/`, the entries, the
/// closing fence.
///
/// Directories that are hidden (leading `.`) or on the ignore list are
/// pruned from the walk; ignored files are omitted.  Entries at each level
/// are sorted by name.
pub fn render_tree(dir: &Path) -> io::Result<Vec<String>> {
    let tree = build_dir_tree(dir)?;
    let mut lines = Vec::with_capacity(tree.leaves.len() + 3);
    lines.push(FENCE.to_string());
    lines.extend(tree.lines());
    lines.push(FENCE.to_string());
    Ok(lines)
}

/// Write rendered tree lines to `output`, joined by newlines.
pub fn save_tree(lines: &[String], output: &Path) -> io::Result<()> {
    std::fs::write(output, lines.join("\n"))
}

/// Build the label tree for `dir` without the surrounding fence.
pub fn build_dir_tree(dir: &Path) -> io::Result<Tree<String>> {
    Ok(Tree::new(format!("{}/", root_name(dir))).with_leaves(dir_children(dir)?))
}

/// Display name of the walk root: the final path component after
/// resolving `.`/`..`, falling back to the path as given.
fn root_name(dir: &Path) -> String {
    dir.canonicalize()
        .ok()
        .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
        .unwrap_or_else(|| dir.display().to_string().trim_end_matches('/').to_string())
}

fn is_pruned_dir(name: &str) -> bool {
    name.starts_with('.') || is_ignored_name(name)
}

fn dir_children(dir: &Path) -> io::Result<Vec<Tree<String>>> {
    let mut entries: Vec<(String, bool)> = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        // Symlinks are listed but never followed.
        let is_dir = entry.file_type()?.is_dir();
        let keep = if is_dir {
            !is_pruned_dir(&name)
        } else {
            !is_ignored_name(&name)
        };
        if keep {
            entries.push((name, is_dir));
        }
    }
    entries.sort();

    let mut leaves = Vec::with_capacity(entries.len());
    for (name, is_dir) in entries {
        if is_dir {
            let path = dir.join(&name);
            let children = dir_children(&path).unwrap_or_else(|e| {
                tracing::warn!(path = %path.display(), error = %e, "cannot list directory");
                Vec::new()
            });
            leaves.push(Tree::new(format!("{name}/")).with_leaves(children));
        } else {
            leaves.push(Tree::new(name));
        }
    }
    Ok(leaves)
}
