//! Best-effort language detection from file names.
//!
//! The tag is only used to label fenced code blocks in the prompt, so a
//! miss is harmless: unknown files get an untagged fence.

use std::path::Path;

/// Guess a code-fence language tag for `path`.
///
/// Well-known file names (`Dockerfile`, `Makefile`, …) are checked first,
/// then the lowercased extension.  Returns `None` when nothing matches.
#[must_use]
pub fn detect_language(path: &Path) -> Option<&'static str> {
    let name = path.file_name()?.to_str()?;
    if let Some(tag) = by_file_name(name) {
        return Some(tag);
    }
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    by_extension(&ext)
}

fn by_file_name(name: &str) -> Option<&'static str> {
    let tag = match name {
        "Dockerfile" | "Containerfile" => "dockerfile",
        "Makefile" | "GNUmakefile" | "makefile" => "makefile",
        "CMakeLists.txt" => "cmake",
        "Cargo.lock" | "Pipfile" | "poetry.lock" => "toml",
        "Gemfile" | "Rakefile" => "ruby",
        "Jenkinsfile" => "groovy",
        ".bashrc" | ".zshrc" | ".profile" => "bash",
        _ => return None,
    };
    Some(tag)
}

fn by_extension(ext: &str) -> Option<&'static str> {
    let tag = match ext {
        "rs" => "rust",
        "py" | "pyi" => "python",
        "ipynb" => "json",
        "js" | "mjs" | "cjs" => "javascript",
        "jsx" => "jsx",
        "ts" | "mts" | "cts" => "typescript",
        "tsx" => "tsx",
        "go" => "go",
        "java" => "java",
        "kt" | "kts" => "kotlin",
        "scala" => "scala",
        "swift" => "swift",
        "c" | "h" => "c",
        "cpp" | "cc" | "cxx" | "hpp" | "hh" | "hxx" => "cpp",
        "cs" => "csharp",
        "php" => "php",
        "rb" => "ruby",
        "lua" => "lua",
        "sh" | "bash" | "zsh" => "bash",
        "ps1" => "powershell",
        "sql" => "sql",
        "html" | "htm" => "html",
        "css" => "css",
        "scss" | "sass" => "scss",
        "vue" => "vue",
        "json" => "json",
        "toml" => "toml",
        "yaml" | "yml" => "yaml",
        "xml" => "xml",
        "ini" | "cfg" => "ini",
        "md" | "markdown" => "markdown",
        "rst" => "rst",
        "tex" => "latex",
        "r" => "r",
        "dart" => "dart",
        "ex" | "exs" => "elixir",
        "hs" => "haskell",
        "tf" => "hcl",
        "proto" => "protobuf",
        "graphql" | "gql" => "graphql",
        _ => return None,
    };
    Some(tag)
}
