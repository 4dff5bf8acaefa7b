use crate::catalog::ModelCapability;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Complexity band used as the Q-learning state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComplexityState {
    Simple,
    Moderate,
    Complex,
}

impl ComplexityState {
    pub fn from_score(score: u32) -> Self {
        if score < 30 {
            ComplexityState::Simple
        } else if score < 60 {
            ComplexityState::Moderate
        } else {
            ComplexityState::Complex
        }
    }
}

/// Q-values per complexity state and model key. Owned and persisted by the
/// caller; selection only reads it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QTable {
    values: HashMap<ComplexityState, HashMap<String, f64>>,
}

impl QTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn value(&self, state: ComplexityState, model_key: &str) -> f64 {
        self.values
            .get(&state)
            .and_then(|row| row.get(model_key))
            .copied()
            .unwrap_or(0.0)
    }

    pub fn set(&mut self, state: ComplexityState, model_key: impl Into<String>, value: f64) {
        self.values
            .entry(state)
            .or_default()
            .insert(model_key.into(), value);
    }

    /// `Q += alpha * (reward - Q)`
    pub fn update(
        &mut self,
        state: ComplexityState,
        model_key: &str,
        reward: f64,
        learning_rate: f64,
    ) -> f64 {
        let current = self.value(state, model_key);
        let next = current + learning_rate * (reward - current);
        self.set(state, model_key, next);
        next
    }
}

/// With probability `epsilon` pick uniformly at random, otherwise the
/// highest Q-value for `state` (first candidate on ties).
pub fn select_epsilon_greedy<'a, R: Rng + ?Sized>(
    candidates: &'a [ModelCapability],
    q_table: &QTable,
    state: ComplexityState,
    epsilon: f64,
    rng: &mut R,
) -> Option<&'a ModelCapability> {
    if candidates.is_empty() {
        return None;
    }
    if rng.gen::<f64>() < epsilon.clamp(0.0, 1.0) {
        return candidates.get(rng.gen_range(0..candidates.len()));
    }
    crate::first_max_by(candidates, |c| q_table.value(state, &c.key()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_moves_toward_reward() {
        let mut table = QTable::new();
        let v = table.update(ComplexityState::Simple, "bedrock:a", 1.0, 0.5);
        assert!((v - 0.5).abs() < 1e-9);
        let v = table.update(ComplexityState::Simple, "bedrock:a", 1.0, 0.5);
        assert!((v - 0.75).abs() < 1e-9);
        assert_eq!(table.value(ComplexityState::Complex, "bedrock:a"), 0.0);
    }

    #[test]
    fn states_follow_score_bands() {
        assert_eq!(ComplexityState::from_score(10), ComplexityState::Simple);
        assert_eq!(ComplexityState::from_score(45), ComplexityState::Moderate);
        assert_eq!(ComplexityState::from_score(90), ComplexityState::Complex);
    }
}
