//! Runtime settings and gateway construction.

use std::ops::RangeInclusive;
use std::path::PathBuf;
use std::time::Duration;

use crate::cost::{CostError, CostEstimator, TokenizerKind};
use crate::gateway::{
    CompletionParams, DEFAULT_DRY_RUN_RESPONSE, Gateway, OpenAiTransport, TransportConfig,
    TransportError,
};
use crate::walk::{MAX_FILE_SIZE, WalkOptions};

/// Default model id.
pub const DEFAULT_MODEL: &str = "gpt-4o";
/// Default sampling temperature.
pub const DEFAULT_TEMPERATURE: f32 = 0.2;
/// Default completion length cap.
pub const DEFAULT_MAX_TOKENS: u32 = 4096;
/// Default API root.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
/// Default whole-request timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;
/// Default connect timeout in seconds.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

const TEMPERATURE_RANGE: RangeInclusive<f32> = 0.0..=2.0;

/// Configuration problems detected before any work starts.
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum ConfigError {
    /// Live mode was requested without credentials.
    #[error("no API key configured")]
    #[diagnostic(
        code(treeprompt::config::no_api_key),
        help("set TREEPROMPT_API_KEY or OPENAI_API_KEY, or drop --live to do a dry run")
    )]
    NoApiKey,

    /// Temperature outside the accepted range.
    #[error("temperature {0} is out of range")]
    #[diagnostic(
        code(treeprompt::config::temperature),
        help("use a value between 0.0 and 2.0")
    )]
    InvalidTemperature(f32),

    /// The HTTP transport could not be set up.
    #[error("could not set up the API client")]
    #[diagnostic(code(treeprompt::config::transport))]
    Transport(#[source] TransportError),
}

/// Pick the API key, preferring the first candidate.  Empty values count
/// as unset.
#[must_use]
pub fn select_api_key(preferred: Option<String>, fallback: Option<String>) -> Option<String> {
    let present = |k: &String| !k.trim().is_empty();
    preferred.filter(present).or_else(|| fallback.filter(present))
}

/// Everything the tool needs to know before it starts asking questions.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Bearer token; only required in live mode.
    pub api_key: Option<String>,
    /// `OpenAI-Project` header value.
    pub project_id: Option<String>,
    /// `OpenAI-Organization` header value.
    pub organization: Option<String>,
    /// API root.
    pub base_url: String,
    /// Model id, also used for pricing.
    pub model: String,
    /// Token counter used for cost estimates.
    pub tokenizer: TokenizerKind,
    /// Sampling temperature.
    pub temperature: f32,
    /// Completion length cap.
    pub max_tokens: u32,
    /// Send real requests instead of answering with `dry_run_response`.
    pub live: bool,
    /// Reply used when not live.
    pub dry_run_response: String,
    /// Whole-request timeout.
    pub request_timeout: Duration,
    /// Connect timeout.
    pub connect_timeout: Duration,
    /// Where `prompt.md` and responses are written.
    pub output_dir: PathBuf,
    /// Where the log file goes.
    pub log_dir: PathBuf,
    /// Honour `.gitignore` during directory collection.
    pub git_ignore: bool,
    /// Disable ANSI colors.
    pub no_color: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_key: None,
            project_id: None,
            organization: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            tokenizer: TokenizerKind::default(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            live: false,
            dry_run_response: DEFAULT_DRY_RUN_RESPONSE.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            output_dir: PathBuf::from("."),
            log_dir: PathBuf::from("logs"),
            git_ignore: false,
            no_color: false,
        }
    }
}

impl Settings {
    /// Reject combinations that would only fail later.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !TEMPERATURE_RANGE.contains(&self.temperature) {
            return Err(ConfigError::InvalidTemperature(self.temperature));
        }
        if self.live && self.api_key.is_none() {
            return Err(ConfigError::NoApiKey);
        }
        Ok(())
    }

    /// Sampling parameters for the gateway.
    #[must_use]
    pub fn completion_params(&self) -> CompletionParams {
        CompletionParams {
            model: self.model.clone(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }

    /// Cost estimator for the configured model and tokenizer.
    pub fn build_estimator(&self) -> Result<CostEstimator, CostError> {
        CostEstimator::for_model(&self.model, self.tokenizer)
    }

    /// A live gateway over [`OpenAiTransport`], or a dry-run gateway.
    pub fn build_gateway(&self) -> Result<Gateway, ConfigError> {
        if !self.live {
            return Ok(Gateway::dry_run(
                self.completion_params(),
                self.dry_run_response.clone(),
            ));
        }
        let api_key = self.api_key.clone().ok_or(ConfigError::NoApiKey)?;
        let transport = OpenAiTransport::new(TransportConfig {
            base_url: self.base_url.clone(),
            api_key,
            project_id: self.project_id.clone(),
            organization: self.organization.clone(),
            request_timeout: self.request_timeout,
            connect_timeout: self.connect_timeout,
        })
        .map_err(ConfigError::Transport)?;
        Ok(Gateway::live(self.completion_params(), Box::new(transport)))
    }

    /// Collection options derived from these settings.  The log
    /// directory is excluded so a session never collects its own log.
    #[must_use]
    pub fn walk_options(&self) -> WalkOptions {
        WalkOptions {
            git_ignore: self.git_ignore,
            max_file_size: MAX_FILE_SIZE,
            exclude_dirs: vec![self.log_dir.clone()],
        }
    }
}
