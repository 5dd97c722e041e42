//! Interactive console session: asks for every input, then runs the
//! pipeline and reports what happened.

use std::collections::BTreeMap;
use std::fmt::Display;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use crate::cost::{CostEstimator, PreCallEstimate};
use crate::gateway::{Gateway, GatewayError};
use crate::output::{
    PROMPT_FILE_NAME, PersistError, format_dir_label, format_heading, format_usd, write_file,
};
use crate::pipeline::{self, RunReport};
use crate::prompt::{
    AssembledPrompt, AssistanceType, PromptError, ROLES, assemble, format_project_files,
    param_label,
};
use crate::tree::render_tree;
use crate::walk::{CollectResult, WalkIssues, WalkOptions, collect_dir, collect_files};

/// Errors that end an interactive session.
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum DriverError {
    /// Console I/O failed.
    #[error("console I/O failed")]
    #[diagnostic(code(treeprompt::driver::io))]
    Io(#[from] io::Error),

    /// Standard input ended before every question was answered.
    #[error("input ended before the session was complete")]
    #[diagnostic(
        code(treeprompt::driver::input_closed),
        help("run treeprompt from an interactive terminal or pipe in every answer")
    )]
    InputClosed,

    /// The prompt could not be assembled.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Prompt(#[from] PromptError),

    /// The completion call or saving its result failed.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Gateway(#[from] GatewayError),

    /// `prompt.md` could not be written.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Persist(#[from] PersistError),
}

/// Answers gathered from the operator.
#[derive(Debug)]
pub struct Session {
    /// Selected assistant role.
    pub role: &'static str,
    /// Directory whose tree was rendered.
    pub project_dir: PathBuf,
    /// Rendered tree, fence lines included.
    pub tree: Vec<String>,
    /// Files selected for the prompt.
    pub files: CollectResult,
    /// Requested kind of help.
    pub assistance: AssistanceType,
    /// Values for the assistance type's parameters.
    pub params: BTreeMap<&'static str, String>,
}

impl Session {
    /// Build the system/user message pair from the answers.
    pub fn assemble(&self) -> Result<AssembledPrompt, PromptError> {
        assemble(
            self.role,
            &self.tree.join("\n"),
            &format_project_files(&self.files.records),
            self.assistance,
            &self.params,
        )
    }
}

/// Question-and-answer loop over any line source and sink.
pub struct Driver<R, W> {
    input: R,
    out: W,
    color: bool,
    walk: WalkOptions,
}

impl<R: BufRead, W: Write> Driver<R, W> {
    /// A driver reading answers from `input` and writing to `out`.
    pub fn new(input: R, out: W, color: bool, walk: WalkOptions) -> Self {
        Self {
            input,
            out,
            color,
            walk,
        }
    }

    /// Print `prompt` and read one trimmed line.
    fn read_line(&mut self, prompt: &str) -> Result<String, DriverError> {
        write!(self.out, "{prompt}")?;
        self.out.flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(DriverError::InputClosed);
        }
        Ok(line.trim().to_string())
    }

    fn heading(&mut self, title: &str) -> Result<(), DriverError> {
        writeln!(self.out, "{}", format_heading(title, self.color))?;
        Ok(())
    }

    /// Show a numbered menu and ask until a listed number is entered.
    fn ask_choice<T: Copy + Display>(
        &mut self,
        title: &str,
        options: &[T],
        prompt: &str,
    ) -> Result<T, DriverError> {
        writeln!(self.out, "{title}")?;
        for (i, option) in options.iter().enumerate() {
            writeln!(self.out, "{}. {option}", i + 1)?;
        }
        loop {
            let answer = self.read_line(prompt)?;
            match answer.parse::<usize>() {
                Ok(n) if (1..=options.len()).contains(&n) => return Ok(options[n - 1]),
                Ok(_) => writeln!(
                    self.out,
                    "Please choose a number between 1 and {}.",
                    options.len()
                )?,
                Err(_) => writeln!(self.out, "Invalid input. Please enter a number.")?,
            }
        }
    }

    /// Ask which role the assistant should take.
    pub fn ask_role(&mut self) -> Result<&'static str, DriverError> {
        let role = self.ask_choice(
            "Choose the assistant's role:",
            ROLES,
            "Enter the number of the role: ",
        )?;
        writeln!(self.out, "Selected Role: {role}")?;
        Ok(role)
    }

    /// Ask for the project directory and render its tree.
    pub fn ask_project_tree(&mut self) -> Result<(PathBuf, Vec<String>), DriverError> {
        loop {
            let answer = self.read_line("Enter the project directory path: ")?;
            let dir = PathBuf::from(&answer);
            if answer.is_empty() || !dir.is_dir() {
                writeln!(self.out, "Invalid directory. Please try again.")?;
                continue;
            }
            match render_tree(&dir) {
                Ok(lines) => {
                    tracing::info!(dir = %dir.display(), lines = lines.len(), "project tree rendered");
                    return Ok((dir, lines));
                }
                Err(e) => {
                    tracing::warn!(dir = %dir.display(), error = %e, "cannot render tree");
                    writeln!(self.out, "Cannot read {}: {e}. Please try again.", dir.display())?;
                }
            }
        }
    }

    /// Ask whether to collect a directory or an explicit file list, and
    /// collect it.  A blank directory answer reuses `project_dir`.
    pub fn ask_files(&mut self, project_dir: &Path) -> Result<CollectResult, DriverError> {
        loop {
            let choice = self
                .read_line("Do you want to provide a directory (d) or a list of files (f)? (d/f): ")?
                .to_lowercase();
            match choice.as_str() {
                "d" => {
                    let prompt = format!(
                        "Enter the directory path (blank for {}): ",
                        project_dir.display()
                    );
                    let answer = self.read_line(&prompt)?;
                    let dir = if answer.is_empty() {
                        project_dir.to_path_buf()
                    } else {
                        PathBuf::from(answer)
                    };
                    match collect_dir(&dir, &self.walk) {
                        Ok(result) => {
                            if result.has_errors()
                                && let Some(issues) = WalkIssues::from_result(&dir, &result)
                            {
                                writeln!(self.out, "{:?}", miette::Report::new(issues))?;
                            }
                            let label = format_dir_label(&dir.display().to_string(), self.color);
                            writeln!(self.out, "Collected from {label}")?;
                            return Ok(result);
                        }
                        Err(e) => writeln!(self.out, "{e}. Please try again.")?,
                    }
                }
                "f" => {
                    let answer = self.read_line("Enter the file paths, separated by commas: ")?;
                    match collect_files(&answer, &self.walk) {
                        Ok(result) => return Ok(result),
                        Err(e) => writeln!(self.out, "{e}. Please try again.")?,
                    }
                }
                _ => writeln!(self.out, "Invalid choice. Please try again.")?,
            }
        }
    }

    /// Ask which kind of help is wanted.
    pub fn ask_assistance_type(&mut self) -> Result<AssistanceType, DriverError> {
        let assistance = self.ask_choice(
            "Choose the type of assistance:",
            &AssistanceType::ALL,
            "Enter the number corresponding to the assistance type: ",
        )?;
        writeln!(self.out, "Selected Assistance Type: {assistance}")?;
        Ok(assistance)
    }

    /// Ask for every parameter `assistance` requires, in order.  Answers
    /// are free text and may be empty.
    pub fn ask_parameters(
        &mut self,
        assistance: AssistanceType,
    ) -> Result<BTreeMap<&'static str, String>, DriverError> {
        let mut params = BTreeMap::new();
        for &name in assistance.required_params() {
            let value = self.read_line(&format!("Provide the {}: ", param_label(name)))?;
            params.insert(name, value);
        }
        Ok(params)
    }

    /// Ask every question in order.
    pub fn gather(&mut self) -> Result<Session, DriverError> {
        self.heading("Assistant Configuration")?;
        let role = self.ask_role()?;
        let (project_dir, tree) = self.ask_project_tree()?;
        let files = self.ask_files(&project_dir)?;
        let assistance = self.ask_assistance_type()?;
        let params = self.ask_parameters(assistance)?;
        Ok(Session {
            role,
            project_dir,
            tree,
            files,
            assistance,
            params,
        })
    }

    fn show_session(&mut self, session: &Session) -> Result<(), DriverError> {
        self.heading("Project Structure")?;
        for line in &session.tree {
            writeln!(self.out, "{line}")?;
        }

        self.heading("Selected Files")?;
        for record in &session.files.records {
            writeln!(self.out, "{}", record.rel_path().display())?;
        }
        for skipped in &session.files.skipped {
            writeln!(
                self.out,
                "skipped {} ({})",
                skipped.rel_path.display(),
                skipped.reason
            )?;
        }
        Ok(())
    }

    fn show_estimate(&mut self, estimate: &PreCallEstimate) -> Result<(), DriverError> {
        self.heading("Cost Estimate")?;
        writeln!(self.out, "Input: {}", estimate.input)?;
        writeln!(
            self.out,
            "Output (if as long as the input): {}",
            estimate.hypothetical_output
        )?;
        Ok(())
    }

    fn show_report(&mut self, report: &RunReport) -> Result<(), DriverError> {
        self.heading("Response")?;
        writeln!(self.out, "{}", report.response)?;
        writeln!(self.out, "Response saved to {}", report.response_path.display())?;

        self.heading("Cost")?;
        writeln!(self.out, "Output: {}", report.output)?;
        writeln!(self.out, "Total: {}", format_usd(report.total_usd()))?;
        Ok(())
    }

    /// Run a full session: ask, assemble, save `prompt.md`, show the
    /// estimate, call the model through `gateway` and report costs.
    pub fn run(
        &mut self,
        gateway: &Gateway,
        estimator: &CostEstimator,
        output_dir: &Path,
    ) -> Result<RunReport, DriverError> {
        let session = self.gather()?;
        self.show_session(&session)?;

        let prompt = session.assemble()?;
        let prompt_path = write_file(output_dir, PROMPT_FILE_NAME, &prompt.to_markdown())?;
        writeln!(self.out, "Prompt saved to {}", prompt_path.display())?;

        let prepared = pipeline::prepare(&prompt.system, &prompt.user, estimator);
        self.show_estimate(&prepared.estimate)?;

        if gateway.is_live() {
            writeln!(self.out, "Sending request to {}...", gateway.model())?;
        } else {
            writeln!(self.out, "Dry run: no request will be sent.")?;
        }
        let report = pipeline::execute(prepared, gateway, estimator, output_dir)?;
        self.show_report(&report)?;
        self.heading("Configuration Complete")?;
        Ok(report)
    }
}
