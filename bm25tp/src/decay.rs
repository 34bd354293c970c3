//! Per-term usage counts threaded through the second pass in rank order.
//!
//! Each time a higher-ranked document is credited for a term, later
//! documents get `exp(-uses * rate)` of the reward for it. Counts only grow.

use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct DecayState {
    rate: f32,
    usage: HashMap<String, u32>,
}

impl DecayState {
    pub fn new(rate: f32) -> Self {
        Self { rate, usage: HashMap::new() }
    }

    pub fn usage(&self, term: &str) -> u32 {
        self.usage.get(term).copied().unwrap_or(0)
    }

    /// Multiplier for `term` given the uses recorded so far.
    ///
    /// The exponent is formed in `f32`, the precision the rate arrives in.
    pub fn factor(&self, term: &str) -> f64 {
        let exponent = -(self.usage(term) as f32) * self.rate;
        f64::from(exponent).exp()
    }

    /// Record one more use of `term`.
    pub fn record(&mut self, term: &str) {
        *self.usage.entry(term.to_string()).or_insert(0) += 1;
    }
}

/// Decay multiplier when a state may be absent (pass 1 runs without one).
pub(crate) fn decay_factor(decay: Option<&DecayState>, term: &str) -> f64 {
    decay.map_or(1.0, |d| d.factor(term))
}
