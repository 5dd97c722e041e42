use crate::output::PersistError;

/// Low-level failures talking to the chat-completion endpoint.
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum TransportError {
    /// The HTTP client could not be built.
    #[error("HTTP client setup failed: {0}")]
    #[diagnostic(code(treeprompt::transport::client))]
    Client(String),

    /// The async runtime for the request could not be started.
    #[error("runtime setup failed: {0}")]
    #[diagnostic(code(treeprompt::transport::runtime))]
    Runtime(String),

    /// Network / transport error, including timeouts.
    #[error("network error: {0}")]
    #[diagnostic(code(treeprompt::transport::network))]
    Network(String),

    /// The API answered with a non-success HTTP status.
    #[error("API error (HTTP {status}): {body}")]
    #[diagnostic(code(treeprompt::transport::api_error))]
    Api {
        /// HTTP status code from the API.
        status: u16,
        /// Response body from the API.
        body: String,
    },

    /// Response JSON was not parseable.
    #[error("response parse error: {0}")]
    #[diagnostic(code(treeprompt::transport::parse))]
    Parse(String),

    /// The response held no choice with message content.
    #[error("response contained no message content")]
    #[diagnostic(code(treeprompt::transport::empty))]
    EmptyResponse,
}

/// Gateway failures surfaced to the operator.
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum GatewayError {
    /// Anything that went wrong with the remote call.
    #[error("an error occurred while communicating with the chat completion API")]
    #[diagnostic(
        code(treeprompt::gateway::api),
        help("check the API key, network access and model name; the log file has details")
    )]
    ApiCommunication(#[source] TransportError),

    /// The response could not be saved.
    #[error("an error occurred while saving the response to a file")]
    #[diagnostic(code(treeprompt::gateway::persistence))]
    Persistence(#[source] PersistError),
}
