//! Token usage and estimated cost.
//!
//! [`CostLedger`] is a plain value: each completion call's [`Usage`] is
//! recorded into the ledger of the quiz being processed, and the batch folds
//! quiz ledgers together with [`CostLedger::merge`]. Nothing here influences
//! control flow; the estimate is reported at the end of a run.

use serde::{Deserialize, Serialize};

/// Tokens reported by one completion call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

/// Price per million tokens, in US dollars.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pricing {
    pub input_per_million: f64,
    pub output_per_million: f64,
}

impl Pricing {
    pub const fn new(input_per_million: f64, output_per_million: f64) -> Self {
        Self {
            input_per_million,
            output_per_million,
        }
    }

    /// Published list price for well-known vision models. Unknown models
    /// fall back to `gpt-4.1-nano` pricing.
    pub fn for_model(model: &str) -> Self {
        let m = model.to_ascii_lowercase();
        match m.as_str() {
            m if m.starts_with("gpt-4.1-nano") => Self::new(0.10, 0.40),
            m if m.starts_with("gpt-4.1-mini") => Self::new(0.40, 1.60),
            m if m.starts_with("gpt-4.1") => Self::new(2.00, 8.00),
            m if m.starts_with("gpt-4o-mini") => Self::new(0.15, 0.60),
            m if m.starts_with("gpt-4o") => Self::new(2.50, 10.00),
            m if m.starts_with("claude-sonnet") => Self::new(3.00, 15.00),
            m if m.starts_with("claude-haiku") => Self::new(0.80, 4.00),
            m if m.starts_with("gemini-2.0-flash") => Self::new(0.10, 0.40),
            m if m.starts_with("gemini-2.5-pro") => Self::new(1.25, 10.00),
            m if m.starts_with("llava") || m.contains("llama3.2-vision") => Self::new(0.0, 0.0),
            _ => Self::new(0.10, 0.40),
        }
    }
}

impl Default for Pricing {
    fn default() -> Self {
        Self::for_model("gpt-4.1-nano")
    }
}

/// Running usage totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostLedger {
    pub calls: u64,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

impl CostLedger {
    pub fn record(&mut self, usage: Usage) {
        self.calls += 1;
        self.prompt_tokens += usage.prompt_tokens;
        self.completion_tokens += usage.completion_tokens;
    }

    pub fn merge(mut self, other: CostLedger) -> Self {
        self.calls += other.calls;
        self.prompt_tokens += other.prompt_tokens;
        self.completion_tokens += other.completion_tokens;
        self
    }

    /// Estimated spend in US dollars.
    pub fn estimated_cost(&self, pricing: &Pricing) -> f64 {
        (self.prompt_tokens as f64 * pricing.input_per_million
            + self.completion_tokens as f64 * pricing.output_per_million)
            / 1_000_000.0
    }
}
