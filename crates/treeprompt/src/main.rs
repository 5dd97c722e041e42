//! treeprompt: build an LLM prompt from a project tree, price it, send it.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use treeprompt::config::{self, Settings};
use treeprompt::cost::TokenizerKind;
use treeprompt::driver::{Driver, DriverError};
use treeprompt::gateway::DEFAULT_DRY_RUN_RESPONSE;
use treeprompt::logging::LogSession;
use treeprompt::output::use_color;

// ─── CLI ──────────────────────────────────────────────────────────────────────

#[derive(Debug, Parser)]
#[command(
    name = "treeprompt",
    about = "Build an LLM prompt from a project tree, estimate its cost and send it",
    version
)]
#[allow(clippy::struct_excessive_bools)]
struct Cli {
    /// API key (falls back to `OPENAI_API_KEY`).
    #[arg(long, env = "TREEPROMPT_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Value for the `OpenAI-Project` header.
    #[arg(long, env = "OPENAI_PROJECT_ID")]
    project_id: Option<String>,

    /// Value for the `OpenAI-Organization` header.
    #[arg(long, env = "OPENAI_ORGANIZATION")]
    organization: Option<String>,

    /// API root URL.
    #[arg(long, env = "TREEPROMPT_BASE_URL", default_value = config::DEFAULT_BASE_URL)]
    base_url: String,

    /// Model id, also used for pricing.
    #[arg(short, long, env = "TREEPROMPT_MODEL", default_value = config::DEFAULT_MODEL)]
    model: String,

    /// Token counter for cost estimates.
    #[arg(long, value_enum, env = "TREEPROMPT_TOKENIZER", default_value_t = TokenizerKind::Bpe)]
    tokenizer: TokenizerKind,

    /// Sampling temperature (0.0 to 2.0).
    #[arg(long, env = "TREEPROMPT_TEMPERATURE", default_value_t = config::DEFAULT_TEMPERATURE)]
    temperature: f32,

    /// Completion length cap.
    #[arg(long, env = "TREEPROMPT_MAX_TOKENS", default_value_t = config::DEFAULT_MAX_TOKENS)]
    max_tokens: u32,

    /// Send the request.  Without this flag a canned response is used.
    #[arg(long, env = "TREEPROMPT_LIVE")]
    live: bool,

    /// Response used when not running live.
    #[arg(long, env = "TREEPROMPT_DRY_RUN_RESPONSE", default_value = DEFAULT_DRY_RUN_RESPONSE)]
    dry_run_response: String,

    /// Whole-request timeout in seconds.
    #[arg(long, value_name = "SECS", default_value_t = config::DEFAULT_REQUEST_TIMEOUT_SECS)]
    request_timeout: u64,

    /// Connect timeout in seconds.
    #[arg(long, value_name = "SECS", default_value_t = config::DEFAULT_CONNECT_TIMEOUT_SECS)]
    connect_timeout: u64,

    /// Directory for `prompt.md` and saved responses.
    #[arg(short, long, env = "TREEPROMPT_OUTPUT_DIR", default_value = ".")]
    output_dir: PathBuf,

    /// Directory for log files.
    #[arg(long, env = "TREEPROMPT_LOG_DIR", default_value = "logs")]
    log_dir: PathBuf,

    /// Honour `.gitignore` files when collecting a directory.
    #[arg(long)]
    gitignore: bool,

    /// Show debug events on the console.
    #[arg(short, long)]
    verbose: bool,

    /// Disable ANSI colors.
    #[arg(long)]
    no_color: bool,
}

impl Cli {
    fn into_settings(self) -> Settings {
        let fallback = std::env::var("OPENAI_API_KEY").ok();
        Settings {
            api_key: config::select_api_key(self.api_key, fallback),
            project_id: self.project_id,
            organization: self.organization,
            base_url: self.base_url,
            model: self.model,
            tokenizer: self.tokenizer,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            live: self.live,
            dry_run_response: self.dry_run_response,
            request_timeout: Duration::from_secs(self.request_timeout),
            connect_timeout: Duration::from_secs(self.connect_timeout),
            output_dir: self.output_dir,
            log_dir: self.log_dir,
            git_ignore: self.gitignore,
            no_color: self.no_color,
        }
    }
}

// ─── Helpers ──────────────────────────────────────────────────────────────────

fn exit_with(report: miette::Report, code: exitcode::ExitCode) -> ! {
    eprintln!("{report:?}");
    std::process::exit(code);
}

fn exit_code(err: &DriverError) -> exitcode::ExitCode {
    match err {
        DriverError::InputClosed => exitcode::NOINPUT,
        DriverError::Io(_) | DriverError::Persist(_) => exitcode::IOERR,
        DriverError::Prompt(_) => exitcode::DATAERR,
        DriverError::Gateway(_) => exitcode::UNAVAILABLE,
    }
}

// ─── Entry point ──────────────────────────────────────────────────────────────

fn main() {
    // A missing .env file is normal.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let verbose = cli.verbose;
    let settings = cli.into_settings();

    let session = match LogSession::init(&settings.log_dir, verbose) {
        Ok(s) => s,
        Err(e) => exit_with(e.into(), exitcode::CANTCREAT),
    };
    tracing::debug!(log = %session.path().display(), "session started");

    if let Err(e) = settings.validate() {
        exit_with(e.into(), exitcode::CONFIG);
    }
    tracing::info!(
        model = %settings.model,
        tokenizer = ?settings.tokenizer,
        live = settings.live,
        output_dir = %settings.output_dir.display(),
        "configuration loaded"
    );

    let estimator = match settings.build_estimator() {
        Ok(e) => e,
        Err(e) => exit_with(e.into(), exitcode::CONFIG),
    };
    let gateway = match settings.build_gateway() {
        Ok(g) => g,
        Err(e) => exit_with(e.into(), exitcode::SOFTWARE),
    };

    let stdin = io::stdin().lock();
    let stdout = io::stdout().lock();
    let mut driver = Driver::new(
        stdin,
        stdout,
        use_color(settings.no_color),
        settings.walk_options(),
    );

    if let Err(e) = driver.run(&gateway, &estimator, &settings.output_dir) {
        tracing::error!(error = %e, "session failed");
        let code = exit_code(&e);
        exit_with(e.into(), code);
    }
}
