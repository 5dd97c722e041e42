use super::error::CostError;

/// Common interface for offline token counters.
pub trait Tokenizer {
    /// Short identifier shown in logs (e.g. `"o200k_base"`).
    fn name(&self) -> &'static str;
    /// Count the tokens in `content`.
    fn count_tokens(&self, content: &str) -> usize;
}

/// Which counter backs a [`CostEstimator`](super::CostEstimator).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum TokenizerKind {
    /// The model's own BPE vocabulary (`"bpe"`).
    #[default]
    Bpe,
    /// One token per four characters (`"heuristic"`).
    Heuristic,
}

impl TokenizerKind {
    /// Build the tokenizer for `model`.
    pub fn build(self, model: &str) -> Result<Box<dyn Tokenizer>, CostError> {
        Ok(match self {
            Self::Bpe => Box::new(BpeTokenizer::for_model(model)?),
            Self::Heuristic => Box::new(HeuristicTokenizer),
        })
    }
}

// ─── tiktoken BPE ────────────────────────────────────────────────────────────

/// Offline tokenizer backed by `OpenAI`'s BPE vocabularies.
pub struct BpeTokenizer {
    bpe: tiktoken_rs::CoreBPE,
    name: &'static str,
}

impl BpeTokenizer {
    /// The vocabulary the model was trained with, or `o200k_base` when
    /// tiktoken does not recognise the model id.
    pub fn for_model(model: &str) -> Result<Self, CostError> {
        match tiktoken_rs::get_bpe_from_model(model) {
            Ok(bpe) => Ok(Self {
                bpe,
                name: "tiktoken",
            }),
            Err(e) => {
                tracing::debug!(model, error = %e, "no dedicated vocabulary, using o200k_base");
                Self::o200k()
            }
        }
    }

    /// The `o200k_base` vocabulary (GPT-4o family).
    pub fn o200k() -> Result<Self, CostError> {
        let bpe = tiktoken_rs::o200k_base().map_err(|e| CostError::Init(e.to_string()))?;
        Ok(Self {
            bpe,
            name: "o200k_base",
        })
    }
}

impl Tokenizer for BpeTokenizer {
    fn name(&self) -> &'static str {
        self.name
    }

    fn count_tokens(&self, content: &str) -> usize {
        self.bpe.encode_ordinary(content).len()
    }
}

// ─── character heuristic ─────────────────────────────────────────────────────

/// Vocabulary-free estimate: one token per four characters, rounded up.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeuristicTokenizer;

impl HeuristicTokenizer {
    const CHARS_PER_TOKEN: usize = 4;
}

impl Tokenizer for HeuristicTokenizer {
    fn name(&self) -> &'static str {
        "chars/4"
    }

    fn count_tokens(&self, content: &str) -> usize {
        content.chars().count().div_ceil(Self::CHARS_PER_TOKEN)
    }
}
