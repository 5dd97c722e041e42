use std::collections::BTreeMap;

use super::error::CostError;

/// Per-model prices in USD per one million tokens.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ModelPrice {
    /// Price of prompt (input) tokens.
    pub input_per_mtok: f64,
    /// Price of completion (output) tokens.
    pub output_per_mtok: f64,
}

impl ModelPrice {
    /// Build a price entry.
    #[must_use]
    pub const fn new(input_per_mtok: f64, output_per_mtok: f64) -> Self {
        Self {
            input_per_mtok,
            output_per_mtok,
        }
    }

    /// Rate for one side of the exchange.
    #[must_use]
    pub fn rate(&self, direction: Direction) -> f64 {
        match direction {
            Direction::Input => self.input_per_mtok,
            Direction::Output => self.output_per_mtok,
        }
    }
}

/// Which side of the exchange a token count is billed as.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    /// Prompt tokens.
    Input,
    /// Completion tokens.
    Output,
}

/// Published list prices, USD per million tokens.
const BUILTIN_PRICES: &[(&str, ModelPrice)] = &[
    ("gpt-4o", ModelPrice::new(2.50, 10.00)),
    ("gpt-4o-mini", ModelPrice::new(0.15, 0.60)),
    ("gpt-4.1", ModelPrice::new(2.00, 8.00)),
    ("gpt-4.1-mini", ModelPrice::new(0.40, 1.60)),
    ("gpt-4.1-nano", ModelPrice::new(0.10, 0.40)),
    ("gpt-4-turbo", ModelPrice::new(10.00, 30.00)),
    ("gpt-4", ModelPrice::new(30.00, 60.00)),
    ("gpt-3.5-turbo", ModelPrice::new(0.50, 1.50)),
    ("o1", ModelPrice::new(15.00, 60.00)),
    ("o1-mini", ModelPrice::new(1.10, 4.40)),
    ("o3-mini", ModelPrice::new(1.10, 4.40)),
];

/// Model id → price lookup.  Lookups are exact; an unknown id is an error,
/// never a free model.
#[derive(Clone, Debug, Default)]
pub struct PriceTable {
    entries: BTreeMap<String, ModelPrice>,
}

impl PriceTable {
    /// The built-in list prices.
    #[must_use]
    pub fn builtin() -> Self {
        Self {
            entries: BUILTIN_PRICES
                .iter()
                .map(|(model, price)| ((*model).to_string(), *price))
                .collect(),
        }
    }

    /// Price entry for `model`.
    pub fn price(&self, model: &str) -> Result<ModelPrice, CostError> {
        self.entries
            .get(model)
            .copied()
            .ok_or_else(|| CostError::UnknownModel {
                model: model.to_string(),
                hint: format!(
                    "priced models: {}",
                    self.entries.keys().cloned().collect::<Vec<_>>().join(", ")
                ),
            })
    }
}

/// `tokens` priced at `rate_per_mtok` USD per million tokens.
#[must_use]
pub fn price_usd(tokens: usize, rate_per_mtok: f64) -> f64 {
    tokens as f64 / 1_000_000.0 * rate_per_mtok
}
