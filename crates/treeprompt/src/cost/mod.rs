//! Token counting and dollar-cost estimation.

mod error;
mod pricing;
mod tokenizer;

use std::fmt;

pub use error::CostError;
pub use pricing::{Direction, ModelPrice, PriceTable, price_usd};
pub use tokenizer::{BpeTokenizer, HeuristicTokenizer, Tokenizer, TokenizerKind};

use crate::message::Message;
use crate::output::{format_number, format_usd};

/// Framing tokens added around every chat message.
const TOKENS_PER_MESSAGE: usize = 3;
/// Tokens that prime the assistant's reply.
const REPLY_PRIMING_TOKENS: usize = 3;

/// Count the tokens a list of chat messages occupies in a request.
///
/// Each message costs its role and content tokens plus a fixed envelope;
/// a non-empty list additionally pays for priming the reply.  An empty list
/// costs nothing.
#[must_use]
pub fn count_message_tokens(messages: &[Message], tokenizer: &dyn Tokenizer) -> usize {
    if messages.is_empty() {
        return 0;
    }
    messages
        .iter()
        .map(|m| {
            TOKENS_PER_MESSAGE
                + tokenizer.count_tokens(m.role.as_str())
                + tokenizer.count_tokens(&m.content)
        })
        .sum::<usize>()
        + REPLY_PRIMING_TOKENS
}

/// A token count and what it costs.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CostEstimate {
    /// Number of tokens.
    pub tokens: usize,
    /// Estimated price in USD.
    pub usd: f64,
}

impl fmt::Display for CostEstimate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} tokens ({})", format_number(self.tokens), format_usd(self.usd))
    }
}

/// Estimates made before the request is sent.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PreCallEstimate {
    /// The assembled messages, billed as input.
    pub input: CostEstimate,
    /// The same token count billed as output: what a reply as long as the
    /// prompt would cost.
    pub hypothetical_output: CostEstimate,
}

/// Prices message lists for a single model.
pub struct CostEstimator {
    model: String,
    price: ModelPrice,
    tokenizer: Box<dyn Tokenizer>,
}

impl CostEstimator {
    /// Bind `model` to its price.  Fails if the table has no entry for it.
    pub fn new(
        model: impl Into<String>,
        prices: &PriceTable,
        tokenizer: Box<dyn Tokenizer>,
    ) -> Result<Self, CostError> {
        let model = model.into();
        let price = prices.price(&model)?;
        tracing::debug!(model = %model, tokenizer = tokenizer.name(), ?price, "cost estimator ready");
        Ok(Self {
            model,
            price,
            tokenizer,
        })
    }

    /// Built-in prices and a tokenizer of the requested kind.
    pub fn for_model(model: &str, kind: TokenizerKind) -> Result<Self, CostError> {
        Self::new(model, &PriceTable::builtin(), kind.build(model)?)
    }

    /// The model being priced.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Count and price `messages`, billed as `direction`.
    #[must_use]
    pub fn estimate(&self, messages: &[Message], direction: Direction) -> CostEstimate {
        let tokens = count_message_tokens(messages, self.tokenizer.as_ref());
        CostEstimate {
            tokens,
            usd: price_usd(tokens, self.price.rate(direction)),
        }
    }

    /// Input cost of the assembled messages and the cost of an equally long
    /// reply.
    #[must_use]
    pub fn pre_call(&self, messages: &[Message]) -> PreCallEstimate {
        let input = self.estimate(messages, Direction::Input);
        PreCallEstimate {
            input,
            hypothetical_output: CostEstimate {
                tokens: input.tokens,
                usd: price_usd(input.tokens, self.price.output_per_mtok),
            },
        }
    }

    /// Actual output cost of a reply, counted as one assistant message.
    #[must_use]
    pub fn post_call(&self, response: &str) -> CostEstimate {
        self.estimate(&[Message::assistant(response)], Direction::Output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    const EPS: f64 = 1e-12;

    // ── fixtures ───────────────────────────────────────────────────────────

    #[fixture]
    fn prices() -> PriceTable {
        PriceTable::builtin()
    }

    #[fixture]
    fn heuristic_estimator(prices: PriceTable) -> CostEstimator {
        CostEstimator::new("gpt-4o", &prices, Box::new(HeuristicTokenizer)).unwrap()
    }

    // ── pricing ────────────────────────────────────────────────────────────

    #[rstest]
    #[case(Direction::Input)]
    #[case(Direction::Output)]
    fn zero_tokens_cost_nothing(prices: PriceTable, #[case] direction: Direction) {
        let rate = prices.price("gpt-4o").unwrap().rate(direction);
        assert_eq!(price_usd(0, rate), 0.0);
    }

    #[rstest]
    #[case("gpt-4o", Direction::Input)]
    #[case("gpt-4o-mini", Direction::Output)]
    #[case("gpt-3.5-turbo", Direction::Input)]
    fn price_scales_linearly(prices: PriceTable, #[case] model: &str, #[case] direction: Direction) {
        let rate = prices.price(model).unwrap().rate(direction);
        let p100 = price_usd(100, rate);
        let p10k = price_usd(10_000, rate);
        assert!(p100 > 0.0);
        assert!((p10k - 100.0 * p100).abs() < EPS);
    }

    #[test]
    fn one_million_tokens_cost_the_list_rate() {
        let rate = PriceTable::builtin().price("gpt-4o").unwrap().rate(Direction::Output);
        let usd = price_usd(1_000_000, rate);
        assert!((usd - 10.0).abs() < EPS);
    }

    #[rstest]
    #[case("gpt-5-imaginary")]
    #[case("GPT-4O")]
    #[case("")]
    fn unknown_model_is_an_error(prices: PriceTable, #[case] model: &str) {
        let err = prices.price(model).unwrap_err();
        assert!(matches!(err, CostError::UnknownModel { model: m, .. } if m == model));
    }

    #[test]
    fn builtin_table_has_list_prices() {
        assert_eq!(
            PriceTable::builtin().price("gpt-4o-mini").unwrap(),
            ModelPrice::new(0.15, 0.60)
        );
    }

    #[rstest]
    #[case(TokenizerKind::Bpe, "tiktoken")]
    #[case(TokenizerKind::Heuristic, "chars/4")]
    fn tokenizer_kind_selects_counter(#[case] kind: TokenizerKind, #[case] name: &str) {
        assert_eq!(kind.build("gpt-4o").unwrap().name(), name);
    }

    #[test]
    fn heuristic_estimator_from_kind_counts_characters() {
        let estimator = CostEstimator::for_model("gpt-4o", TokenizerKind::Heuristic).unwrap();
        // "user" → 1, "abcdefgh" → 2, +3 envelope, +3 priming.
        let estimate = estimator.estimate(&[Message::user("abcdefgh")], Direction::Input);
        assert_eq!(estimate.tokens, 9);
    }

    #[test]
    fn estimator_rejects_unknown_model_up_front() {
        let result = CostEstimator::new("mystery", &PriceTable::builtin(), Box::new(HeuristicTokenizer));
        assert!(matches!(result, Err(CostError::UnknownModel { .. })));
    }

    // ── tokenizers ─────────────────────────────────────────────────────────

    #[rstest]
    #[case("", 0)]
    #[case("abc", 1)]
    #[case("abcd", 1)]
    #[case("abcde", 2)]
    #[case("héllo wörld", 3)]
    fn heuristic_rounds_up(#[case] text: &str, #[case] expected: usize) {
        assert_eq!(HeuristicTokenizer.count_tokens(text), expected);
    }

    #[test]
    fn bpe_counts_grow_with_text() {
        let bpe = BpeTokenizer::for_model("gpt-4o").unwrap();
        assert_eq!(bpe.count_tokens(""), 0);
        let short = bpe.count_tokens("hi");
        let long = bpe.count_tokens("hello world this is a longer sentence with many more words");
        assert!(short > 0);
        assert!(long > short);
    }

    #[test]
    fn bpe_falls_back_for_unrecognised_models() {
        let bpe = BpeTokenizer::for_model("not-a-real-model").unwrap();
        assert_eq!(bpe.name(), "o200k_base");
        assert!(bpe.count_tokens("fn main() {}") > 0);
    }

    // ── message counting ───────────────────────────────────────────────────

    #[test]
    fn empty_message_list_is_zero_tokens() {
        assert_eq!(count_message_tokens(&[], &HeuristicTokenizer), 0);
    }

    #[test]
    fn message_envelope_is_counted() {
        // "user" → 1 token, "abcd" → 1 token, +3 envelope, +3 priming.
        let n = count_message_tokens(&[Message::user("abcd")], &HeuristicTokenizer);
        assert_eq!(n, 8);
    }

    // ── CostEstimator ──────────────────────────────────────────────────────

    #[rstest]
    fn pre_call_prices_same_tokens_both_ways(heuristic_estimator: CostEstimator) {
        let messages = [Message::system("s".repeat(400)), Message::user("u".repeat(400))];
        let pre = heuristic_estimator.pre_call(&messages);

        assert_eq!(pre.input.tokens, pre.hypothetical_output.tokens);
        assert!((pre.input.usd - price_usd(pre.input.tokens, 2.50)).abs() < EPS);
        assert!((pre.hypothetical_output.usd - price_usd(pre.input.tokens, 10.00)).abs() < EPS);
    }

    #[rstest]
    fn post_call_counts_one_assistant_message(heuristic_estimator: CostEstimator) {
        let post = heuristic_estimator.post_call("abcdefgh");
        // "assistant" → 3, "abcdefgh" → 2, +3 envelope, +3 priming.
        assert_eq!(post.tokens, 11);
        assert!((post.usd - price_usd(11, 10.00)).abs() < EPS);
    }

    #[test]
    fn estimate_display_is_readable() {
        let e = CostEstimate {
            tokens: 12_345,
            usd: 0.030_862_1,
        };
        assert_eq!(e.to_string(), "12,345 tokens ($0.030862)");
    }
}
