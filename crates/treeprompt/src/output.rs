//! Output files and console formatting helpers.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeZone};
use owo_colors::OwoColorize;

/// Name of the Markdown file holding the assembled prompt.
///
/// The collector skips this name so a previous run's prompt never ends up
/// inside the next one.
pub const PROMPT_FILE_NAME: &str = "prompt.md";

/// Default output file of the standalone tree utility.
pub const TREE_FILE_NAME: &str = "project_structure.md";

/// Writing an output file failed.
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
#[error("failed to write {}", path.display())]
#[diagnostic(
    code(treeprompt::output::persist),
    help("check that the output directory exists and is writable")
)]
pub struct PersistError {
    /// File (or directory) that could not be written.
    pub path: PathBuf,
    /// Underlying I/O failure.
    #[source]
    pub source: io::Error,
}

/// Write `contents` to `dir/file_name`, creating `dir` if needed and
/// replacing any previous file of the same name.
pub fn write_file(dir: &Path, file_name: &str, contents: &str) -> Result<PathBuf, PersistError> {
    std::fs::create_dir_all(dir).map_err(|source| PersistError {
        path: dir.to_path_buf(),
        source,
    })?;
    let path = dir.join(file_name);
    std::fs::write(&path, contents).map_err(|source| PersistError {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}

/// Write `contents` to a file that did not exist before.
///
/// The name is `{stem}_{YYYYMMDD_HHMMSS}.{ext}`; when two runs land in the
/// same second a `_1`, `_2`, … suffix keeps the earlier file intact.
pub fn write_timestamped<Tz: TimeZone>(
    dir: &Path,
    stem: &str,
    ext: &str,
    at: &DateTime<Tz>,
    contents: &str,
) -> Result<PathBuf, PersistError>
where
    Tz::Offset: std::fmt::Display,
{
    std::fs::create_dir_all(dir).map_err(|source| PersistError {
        path: dir.to_path_buf(),
        source,
    })?;

    let base = format!("{stem}_{}", format_timestamp(at));
    let mut attempt = 0u32;
    loop {
        let name = if attempt == 0 {
            format!("{base}.{ext}")
        } else {
            format!("{base}_{attempt}.{ext}")
        };
        let path = dir.join(name);
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(mut file) => {
                return match file.write_all(contents.as_bytes()) {
                    Ok(()) => Ok(path),
                    Err(source) => Err(PersistError { path, source }),
                };
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => attempt += 1,
            Err(source) => return Err(PersistError { path, source }),
        }
    }
}

/// Second-resolution timestamp used in generated file names.
#[must_use]
pub fn format_timestamp<Tz: TimeZone>(at: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    at.format("%Y%m%d_%H%M%S").to_string()
}

/// Whether stdout should receive ANSI colors.
#[must_use]
pub fn use_color(no_color: bool) -> bool {
    use std::io::IsTerminal;
    !no_color && std::env::var_os("NO_COLOR").is_none() && io::stdout().is_terminal()
}

/// Format a number with thousands separators (commas).
#[must_use]
pub fn format_number(n: usize) -> String {
    let s = n.to_string();
    let len = s.len();
    let mut result = String::with_capacity(len + len / 3);
    for (i, c) in s.chars().enumerate() {
        if i > 0 && (len - i).is_multiple_of(3) {
            result.push(',');
        }
        result.push(c);
    }
    result
}

/// Format a dollar amount with six decimals (`$0.000123`).
#[must_use]
pub fn format_usd(usd: f64) -> String {
    format!("${usd:.6}")
}

/// Directory label with a trailing slash, bold when `color` is set.
#[must_use]
pub fn format_dir_label(name: &str, color: bool) -> String {
    let display = if name.ends_with('/') {
        name.to_string()
    } else {
        format!("{name}/")
    };
    if color {
        display.bold().to_string()
    } else {
        display
    }
}

/// Section heading such as `=== Final Prompt ===`.
#[must_use]
pub fn format_heading(title: &str, color: bool) -> String {
    let line = format!("=== {title} ===");
    if color {
        line.cyan().bold().to_string()
    } else {
        line
    }
}
