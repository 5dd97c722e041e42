//! One prompt run: estimate, call, price the reply, persist it.
//!
//! [`prepare`] and [`execute`] are separate so the estimate can be shown
//! before the request goes out.

use std::path::{Path, PathBuf};

use chrono::Local;

use crate::cost::{CostEstimate, CostEstimator, PreCallEstimate};
use crate::gateway::{Gateway, GatewayError, persist_response, prepare_messages};
use crate::message::Message;

/// Everything a run produced.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    /// Response text as received (or the dry-run stand-in).
    pub response: String,
    /// Where the response was saved.
    pub response_path: PathBuf,
    /// Cost of the assembled messages as input.
    pub input: CostEstimate,
    /// Cost of a reply as long as the prompt.
    pub hypothetical_output: CostEstimate,
    /// Cost of the reply actually received.
    pub output: CostEstimate,
}

impl RunReport {
    /// Input plus actual output cost.
    #[must_use]
    pub fn total_usd(&self) -> f64 {
        self.input.usd + self.output.usd
    }
}

/// The message pair for one run, priced before anything is sent.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedRun {
    /// System then user message.
    pub messages: [Message; 2],
    /// Cost of `messages` as input, and of a reply as long as them.
    pub estimate: PreCallEstimate,
}

/// Build the messages for `system` + `user` and price them.
///
/// The caller can show [`PreparedRun::estimate`] before deciding to
/// [`execute`].
#[must_use]
pub fn prepare(system: &str, user: &str, estimator: &CostEstimator) -> PreparedRun {
    let messages = prepare_messages(system, user);
    let estimate = estimator.pre_call(&messages);
    tracing::info!(
        model = estimator.model(),
        tokens = estimate.input.tokens,
        input_usd = estimate.input.usd,
        hypothetical_output_usd = estimate.hypothetical_output.usd,
        "pre-call estimate"
    );
    PreparedRun { messages, estimate }
}

/// Send a prepared run through `gateway`, price the reply and save it under
/// `out_dir`.
///
/// Steps run strictly in order; the first failure ends the run.
pub fn execute(
    prepared: PreparedRun,
    gateway: &Gateway,
    estimator: &CostEstimator,
    out_dir: &Path,
) -> Result<RunReport, GatewayError> {
    let PreparedRun { messages, estimate } = prepared;
    let response = gateway.complete(&messages)?;

    let output = estimator.post_call(&response);
    tracing::info!(
        tokens = output.tokens,
        output_usd = output.usd,
        total_usd = estimate.input.usd + output.usd,
        "post-call cost"
    );

    let response_path = persist_response(out_dir, &response, &Local::now())?;

    Ok(RunReport {
        response,
        response_path,
        input: estimate.input,
        hypothetical_output: estimate.hypothetical_output,
        output,
    })
}

/// [`prepare`] then [`execute`] in one step.
pub fn run(
    system: &str,
    user: &str,
    gateway: &Gateway,
    estimator: &CostEstimator,
    out_dir: &Path,
) -> Result<RunReport, GatewayError> {
    execute(prepare(system, user, estimator), gateway, estimator, out_dir)
}
