//! Prompt assembly: template filling and the system/user message pair.

mod templates;

use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::fmt::Write as _;

pub use templates::{AssistanceType, ROLES, SYSTEM_TEMPLATE, param_label};

use crate::walk::FileRecord;

/// Error type for prompt assembly.
#[derive(Debug, PartialEq, Eq, thiserror::Error, miette::Diagnostic)]
pub enum PromptError {
    /// A template placeholder has no value.
    #[error("missing value for template parameter `{name}`")]
    #[diagnostic(
        code(treeprompt::prompt::missing_parameter),
        help("every parameter declared by the selected assistance type must be supplied")
    )]
    MissingParameter {
        /// Name of the unfilled placeholder.
        name: String,
    },
}

/// The two messages sent to the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledPrompt {
    /// Role, project structure, project files, standard notes.
    pub system: String,
    /// The assistance-specific request.
    pub user: String,
}

impl AssembledPrompt {
    /// Markdown document persisted next to the response for auditing.
    #[must_use]
    pub fn to_markdown(&self) -> String {
        format!("# System\n\n{}\n\n# User\n\n{}\n", self.system, self.user)
    }
}

/// Substitute `{name}` placeholders in `template` from `params`.
///
/// Substitution is a single textual pass: values are inserted verbatim and
/// never scanned for placeholders themselves.  `{{` and `}}` produce
/// literal braces, and braces that do not enclose an identifier are kept
/// as-is.  A placeholder without a value is an error.
pub fn fill_template<K, V>(template: &str, params: &BTreeMap<K, V>) -> Result<String, PromptError>
where
    K: Borrow<str> + Ord,
    V: AsRef<str>,
{
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(pos) = rest.find(['{', '}']) {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];

        if tail.starts_with("{{") || tail.starts_with("}}") {
            out.push_str(&tail[..1]);
            rest = &tail[2..];
            continue;
        }

        if let Some(name) = placeholder_at(tail) {
            let value = params
                .get(name)
                .ok_or_else(|| PromptError::MissingParameter {
                    name: name.to_string(),
                })?;
            out.push_str(value.as_ref());
            rest = &tail[name.len() + 2..];
            continue;
        }

        out.push_str(&tail[..1]);
        rest = &tail[1..];
    }

    out.push_str(rest);
    Ok(out)
}

/// If `tail` starts with `{identifier}`, return the identifier.
fn placeholder_at(tail: &str) -> Option<&str> {
    let inner = tail.strip_prefix('{')?;
    let end = inner.find('}')?;
    let name = &inner[..end];
    let mut chars = name.chars();
    let first = chars.next()?;
    let valid = (first.is_ascii_alphabetic() || first == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    valid.then_some(name)
}

/// Concatenate file records into the "Project files" section.
///
/// Each file gets a `### path` heading and a fenced block tagged with its
/// language.  The fence is lengthened when the content itself contains
/// backtick runs.
#[must_use]
pub fn format_project_files(records: &[FileRecord]) -> String {
    if records.is_empty() {
        return "(no files selected)".to_string();
    }

    let mut out = String::new();
    for (i, record) in records.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        let fence = "`".repeat(longest_backtick_run(record.content()).max(2) + 1);
        let content = record.content().trim_end_matches(['\r', '\n']);
        let _ = write!(
            out,
            "### {}\n{fence}{}\n{content}\n{fence}\n",
            record.rel_path().display(),
            record.language().unwrap_or(""),
        );
    }
    out
}

fn longest_backtick_run(s: &str) -> usize {
    s.split(|c| c != '`').map(str::len).max().unwrap_or(0)
}

/// Build the system and user messages.
///
/// `params` must hold a value for every parameter `assistance` requires;
/// extra entries are ignored.
pub fn assemble<K, V>(
    role: &str,
    project_structure: &str,
    project_files: &str,
    assistance: AssistanceType,
    params: &BTreeMap<K, V>,
) -> Result<AssembledPrompt, PromptError>
where
    K: Borrow<str> + Ord,
    V: AsRef<str>,
{
    if let Some(missing) = assistance
        .required_params()
        .iter()
        .find(|name| !params.contains_key(**name))
    {
        return Err(PromptError::MissingParameter {
            name: (*missing).to_string(),
        });
    }

    let context = BTreeMap::from([
        ("role", role),
        ("project_structure", project_structure),
        ("project_files", project_files),
    ]);
    let system = fill_template(SYSTEM_TEMPLATE, &context)?;
    let user = fill_template(assistance.template(), params)?;

    tracing::debug!(
        assistance = assistance.key(),
        system_len = system.len(),
        user_len = user.len(),
        "prompt assembled"
    );
    Ok(AssembledPrompt { system, user })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn params(pairs: &[(&'static str, &'static str)]) -> BTreeMap<&'static str, &'static str> {
        pairs.iter().copied().collect()
    }

    /// Placeholder names used by `template`, in order of first appearance.
    fn placeholders(template: &str) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        let mut rest = template;
        while let Some(pos) = rest.find('{') {
            let tail = &rest[pos..];
            if tail.starts_with("{{") {
                rest = &tail[2..];
            } else if let Some(name) = placeholder_at(tail) {
                if !names.contains(&name) {
                    names.push(name);
                }
                rest = &tail[name.len() + 2..];
            } else {
                rest = &tail[1..];
            }
        }
        names
    }

    // ── fill_template ──────────────────────────────────────────────────────

    #[rstest]
    #[case("Hello {name}!", &[("name", "world")], "Hello world!")]
    #[case("{a}{b}", &[("a", "1"), ("b", "2")], "12")]
    #[case("no placeholders", &[], "no placeholders")]
    #[case("literal {{braces}}", &[], "literal {braces}")]
    #[case("fn main() { }", &[], "fn main() { }")]
    #[case("{not a name}", &[], "{not a name}")]
    #[case("{1abc}", &[], "{1abc}")]
    #[case("unclosed {name", &[], "unclosed {name")]
    fn fill_template_substitutes(
        #[case] template: &str,
        #[case] pairs: &[(&'static str, &'static str)],
        #[case] expected: &str,
    ) {
        assert_eq!(fill_template(template, &params(pairs)).unwrap(), expected);
    }

    #[test]
    fn fill_template_is_single_pass() {
        let p = params(&[("error", "{error} at {line}")]);
        assert_eq!(
            fill_template("Error: {error}", &p).unwrap(),
            "Error: {error} at {line}"
        );
    }

    #[test]
    fn fill_template_reports_missing_parameter() {
        let err = fill_template("{present} {absent}", &params(&[("present", "x")])).unwrap_err();
        assert_eq!(
            err,
            PromptError::MissingParameter {
                name: "absent".into()
            }
        );
    }

    #[test]
    fn fill_template_accepts_owned_maps() {
        let mut p: BTreeMap<String, String> = BTreeMap::new();
        p.insert("x".into(), "y".into());
        assert_eq!(fill_template("{x}", &p).unwrap(), "y");
    }

    // ── registry ───────────────────────────────────────────────────────────

    #[rstest]
    #[case(AssistanceType::FeatureImplementation)]
    #[case(AssistanceType::Debugging)]
    #[case(AssistanceType::ReadmeGeneration)]
    fn templates_use_exactly_their_required_params(#[case] kind: AssistanceType) {
        assert_eq!(placeholders(kind.template()), kind.required_params());
    }

    #[test]
    fn system_template_placeholders() {
        assert_eq!(
            placeholders(SYSTEM_TEMPLATE),
            vec!["role", "project_structure", "project_files"]
        );
    }

    #[rstest]
    #[case(AssistanceType::FeatureImplementation, "- Ensure the implementation is efficient and maintainable.")]
    #[case(AssistanceType::Debugging, "- Analyze the error to identify the source of the error.")]
    #[case(
        AssistanceType::ReadmeGeneration,
        "- Identify areas where README files are missing or insufficient."
    )]
    fn templates_keep_their_full_task_lists(#[case] kind: AssistanceType, #[case] line: &str) {
        assert!(kind.template().lines().any(|l| l == line));
    }

    #[test]
    fn feature_template_lists_every_task_and_note() {
        let template = AssistanceType::FeatureImplementation.template();
        let bullets = template.lines().filter(|l| l.starts_with("- ")).count();
        assert_eq!(bullets, 16);
    }

    #[rstest]
    #[case("feature_description", "Feature description")]
    #[case("error", "Error")]
    #[case("", "")]
    fn param_labels_are_readable(#[case] name: &str, #[case] expected: &str) {
        assert_eq!(param_label(name), expected);
    }

    // ── format_project_files ───────────────────────────────────────────────

    #[test]
    fn files_are_fenced_with_language() {
        let records = vec![
            FileRecord::new("src/main.rs", Some("rust"), "fn main() {}\n".into()).unwrap(),
            FileRecord::new("NOTES", None, "remember".into()).unwrap(),
        ];
        assert_eq!(
            format_project_files(&records),
            "### src/main.rs\n```rust\nfn main() {}\n```\n\n### NOTES\n```\nremember\n```\n"
        );
    }

    #[test]
    fn fence_outgrows_backticks_in_content() {
        let records =
            vec![FileRecord::new("README.md", Some("markdown"), "```sh\nls\n```".into()).unwrap()];
        let text = format_project_files(&records);
        assert!(text.starts_with("### README.md\n````markdown\n"));
        assert!(text.ends_with("\n````\n"));
    }

    #[test]
    fn no_files_yields_placeholder_text() {
        assert_eq!(format_project_files(&[]), "(no files selected)");
    }

    // ── assemble ───────────────────────────────────────────────────────────

    #[test]
    fn debugging_prompt_carries_error_and_role() {
        let p = params(&[("error", "NullPointerException")]);
        let prompt = assemble(
            "Python Developer",
            "```\nproj/\n```",
            &format_project_files(&[]),
            AssistanceType::Debugging,
            &p,
        )
        .unwrap();

        assert!(prompt.user.contains("NullPointerException"));
        assert!(prompt.system.contains("Role: You are a professional Python Developer."));
        assert!(prompt.system.contains("```\nproj/\n```"));
        assert!(!prompt.system.contains("NullPointerException"));
    }

    #[test]
    fn assemble_fails_on_missing_required_param() {
        let err = assemble(
            "DevOps Engineer",
            "",
            "",
            AssistanceType::FeatureImplementation,
            &BTreeMap::<&str, &str>::new(),
        )
        .unwrap_err();
        assert_eq!(
            err,
            PromptError::MissingParameter {
                name: "feature_description".into()
            }
        );
    }

    #[test]
    fn readme_needs_no_params() {
        let prompt = assemble(
            "Web Developer",
            "tree",
            "files",
            AssistanceType::ReadmeGeneration,
            &BTreeMap::<&str, &str>::new(),
        )
        .unwrap();
        assert!(prompt.user.starts_with("Task:"));
    }

    #[test]
    fn file_contents_with_braces_are_not_expanded() {
        let files = "### a.py\n```python\nprint(f\"{role}\")\n```\n";
        let prompt = assemble(
            "Web Developer",
            "",
            files,
            AssistanceType::ReadmeGeneration,
            &BTreeMap::<&str, &str>::new(),
        )
        .unwrap();
        assert!(prompt.system.contains("print(f\"{role}\")"));
    }

    #[test]
    fn markdown_has_both_sections() {
        let prompt = AssembledPrompt {
            system: "sys".into(),
            user: "usr".into(),
        };
        assert_eq!(prompt.to_markdown(), "# System\n\nsys\n\n# User\n\nusr\n");
    }
}
