//! Chat-completion gateway: message preparation, the remote call (or its
//! dry-run stand-in) and response persistence.

mod error;
mod transport;

use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeZone};

pub use error::{GatewayError, TransportError};
pub use transport::{ChatRequest, ChatTransport, OpenAiTransport, TransportConfig};

use crate::message::Message;
use crate::output::write_timestamped;

/// Reply returned when no request is sent.
pub const DEFAULT_DRY_RUN_RESPONSE: &str = "This is a dummy response for testing purposes.";

/// The two-message conversation sent for every prompt.
#[must_use]
pub fn prepare_messages(system: &str, user: &str) -> [Message; 2] {
    [Message::system(system), Message::user(user)]
}

/// Sampling parameters forwarded with every request.
#[derive(Clone, Debug, PartialEq)]
pub struct CompletionParams {
    /// Model id.
    pub model: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Completion length cap.
    pub max_tokens: u32,
}

enum Backend {
    Live(Box<dyn ChatTransport>),
    DryRun { canned: String },
}

/// Sends prepared messages, or answers from a canned response in dry-run
/// mode.
pub struct Gateway {
    params: CompletionParams,
    backend: Backend,
}

impl Gateway {
    /// A gateway that forwards every call to `transport`.
    #[must_use]
    pub fn live(params: CompletionParams, transport: Box<dyn ChatTransport>) -> Self {
        Self {
            params,
            backend: Backend::Live(transport),
        }
    }

    /// A gateway that never leaves the process.
    #[must_use]
    pub fn dry_run(params: CompletionParams, canned: impl Into<String>) -> Self {
        Self {
            params,
            backend: Backend::DryRun {
                canned: canned.into(),
            },
        }
    }

    /// `true` when calls reach a real transport.
    #[must_use]
    pub fn is_live(&self) -> bool {
        matches!(self.backend, Backend::Live(_))
    }

    /// Model requests are made for.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.params.model
    }

    /// Obtain a completion for `messages`.
    ///
    /// One attempt, no retry.  Any transport failure is logged with its
    /// cause and surfaced as [`GatewayError::ApiCommunication`].
    pub fn complete(&self, messages: &[Message]) -> Result<String, GatewayError> {
        match &self.backend {
            Backend::DryRun { canned } => {
                tracing::info!(model = %self.params.model, "dry run, request not sent");
                Ok(canned.clone())
            }
            Backend::Live(transport) => {
                let request = ChatRequest {
                    model: &self.params.model,
                    messages,
                    temperature: self.params.temperature,
                    max_tokens: self.params.max_tokens,
                };
                tracing::info!(
                    model = %self.params.model,
                    messages = messages.len(),
                    "sending chat completion request"
                );
                match transport.send(&request) {
                    Ok(text) => {
                        tracing::info!(chars = text.len(), "chat completion received");
                        Ok(text)
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "chat completion request failed");
                        Err(GatewayError::ApiCommunication(e))
                    }
                }
            }
        }
    }
}

/// Save `text` verbatim as `response_{YYYYMMDD_HHMMSS}.txt` under `dir`.
pub fn persist_response<Tz: TimeZone>(
    dir: &Path,
    text: &str,
    at: &DateTime<Tz>,
) -> Result<PathBuf, GatewayError>
where
    Tz::Offset: std::fmt::Display,
{
    let path = write_timestamped(dir, "response", "txt", at, text).map_err(|e| {
        tracing::error!(path = %e.path.display(), error = %e.source, "could not save response");
        GatewayError::Persistence(e)
    })?;
    tracing::info!(path = %path.display(), "response saved");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use chrono::Utc;
    use rstest::{fixture, rstest};

    #[fixture]
    fn params() -> CompletionParams {
        CompletionParams {
            model: "gpt-4o".to_string(),
            temperature: 0.2,
            max_tokens: 512,
        }
    }

    struct FixedReply(&'static str);

    impl ChatTransport for FixedReply {
        fn send(&self, _: &ChatRequest<'_>) -> Result<String, TransportError> {
            Ok(self.0.to_string())
        }
    }

    struct Unreachable;

    impl ChatTransport for Unreachable {
        fn send(&self, _: &ChatRequest<'_>) -> Result<String, TransportError> {
            Err(TransportError::Network("connection refused".into()))
        }
    }

    /// Records the model, message count and length cap of every call.
    #[derive(Clone, Default)]
    struct Recorder {
        seen: Rc<RefCell<Vec<(String, usize, u32)>>>,
    }

    impl ChatTransport for Recorder {
        fn send(&self, req: &ChatRequest<'_>) -> Result<String, TransportError> {
            self.seen
                .borrow_mut()
                .push((req.model.to_string(), req.messages.len(), req.max_tokens));
            Ok("recorded".into())
        }
    }

    #[test]
    fn messages_are_system_then_user_verbatim() {
        let [system, user] = prepare_messages("  sys\n", "usr {x}");
        assert_eq!(system, Message::system("  sys\n"));
        assert_eq!(user, Message::user("usr {x}"));
    }

    #[rstest]
    fn live_gateway_returns_transport_text(params: CompletionParams) {
        let gw = Gateway::live(params, Box::new(FixedReply("X")));
        let messages = prepare_messages("s", "u");
        assert_eq!(gw.complete(&messages).unwrap(), "X");
        assert!(gw.is_live());
    }

    #[rstest]
    fn live_gateway_forwards_params_once(params: CompletionParams) {
        let recorder = Recorder::default();
        let seen = Rc::clone(&recorder.seen);
        let gw = Gateway::live(params, Box::new(recorder));
        gw.complete(&prepare_messages("s", "u")).unwrap();

        assert_eq!(*seen.borrow(), [("gpt-4o".to_string(), 2, 512)]);
    }

    #[rstest]
    fn dry_run_answers_without_transport(params: CompletionParams) {
        let gw = Gateway::dry_run(params, DEFAULT_DRY_RUN_RESPONSE);
        assert!(!gw.is_live());
        assert_eq!(
            gw.complete(&prepare_messages("s", "u")).unwrap(),
            DEFAULT_DRY_RUN_RESPONSE
        );
    }

    #[rstest]
    fn transport_failure_is_api_communication(params: CompletionParams) {
        let gw = Gateway::live(params, Box::new(Unreachable));
        let err = gw.complete(&prepare_messages("s", "u")).unwrap_err();
        assert!(matches!(
            err,
            GatewayError::ApiCommunication(TransportError::Network(_))
        ));
    }

    #[test]
    fn response_is_saved_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let at = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        let path = persist_response(dir.path(), "line one\nline two\n", &at).unwrap();

        assert_eq!(path.file_name().unwrap(), "response_20240309_140507.txt");
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "line one\nline two\n"
        );
    }

    #[test]
    fn unwritable_location_is_persistence_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, "").unwrap();

        let err = persist_response(&blocker, "x", &Utc::now()).unwrap_err();
        assert!(matches!(err, GatewayError::Persistence(_)));
    }
}
