/// Error type for token counting and pricing.
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum CostError {
    /// Tokenizer vocabulary could not be loaded.
    #[error("tokenizer init failed: {0}")]
    #[diagnostic(code(treeprompt::cost::init))]
    Init(String),

    /// The model has no entry in the price table.
    #[error("no price known for model `{model}`")]
    #[diagnostic(code(treeprompt::cost::unknown_model))]
    UnknownModel {
        /// The model id that was looked up.
        model: String,
        /// Which models do have prices.
        #[help]
        hint: String,
    },
}
