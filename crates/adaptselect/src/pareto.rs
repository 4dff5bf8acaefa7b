//! Weighted cost/quality/speed scoring and the cost-performance frontier.

use crate::catalog::ModelCapability;
use serde::{Deserialize, Serialize};

/// Relative importance of cost, quality and speed. Only ratios matter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParetoWeights {
    pub cost: f64,
    pub quality: f64,
    pub speed: f64,
}

impl Default for ParetoWeights {
    fn default() -> Self {
        Self {
            cost: 1.0,
            quality: 1.0,
            speed: 1.0,
        }
    }
}

impl ParetoWeights {
    pub fn new(cost: f64, quality: f64, speed: f64) -> Self {
        Self {
            cost,
            quality,
            speed,
        }
    }

    /// Weights scaled to sum to 1. Non-positive totals fall back to equal weights.
    pub fn normalized(&self) -> Self {
        let cost = self.cost.max(0.0);
        let quality = self.quality.max(0.0);
        let speed = self.speed.max(0.0);
        let sum = cost + quality + speed;
        if sum <= 0.0 || !sum.is_finite() {
            let third = 1.0 / 3.0;
            return Self::new(third, third, third);
        }
        Self::new(cost / sum, quality / sum, speed / sum)
    }
}

/// Weighted score in [0, 1]; cost is inverted against the most expensive candidate
pub fn pareto_score(candidate: &ModelCapability, max_cost: f64, weights: &ParetoWeights) -> f64 {
    let w = weights.normalized();
    let cost_score = if max_cost > 0.0 {
        1.0 - candidate.effective_cost() / max_cost
    } else {
        1.0
    };
    let quality_score = candidate.quality() / 10.0;
    let speed_score = candidate.speed / 10.0;
    w.cost * cost_score + w.quality * quality_score + w.speed * speed_score
}

pub fn select_pareto<'a>(
    candidates: &'a [ModelCapability],
    weights: &ParetoWeights,
) -> Option<&'a ModelCapability> {
    let max_cost = candidates
        .iter()
        .map(|c| c.effective_cost())
        .fold(0.0_f64, f64::max);
    crate::first_max_by(candidates, |c| pareto_score(c, max_cost, weights))
}

/// Hard minimums a candidate must meet to be on the frontier
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrontierConstraints {
    #[serde(default)]
    pub min_reasoning: Option<f64>,
    #[serde(default)]
    pub min_accuracy: Option<f64>,
    #[serde(default)]
    pub min_speed: Option<f64>,
    #[serde(default)]
    pub max_latency_ms: Option<f64>,
}

impl FrontierConstraints {
    pub fn admits(&self, candidate: &ModelCapability) -> bool {
        self.min_reasoning
            .map_or(true, |min| candidate.reasoning_capability >= min)
            && self.min_accuracy.map_or(true, |min| candidate.accuracy >= min)
            && self.min_speed.map_or(true, |min| candidate.speed >= min)
            && self
                .max_latency_ms
                .map_or(true, |max| candidate.average_latency_ms <= max)
    }
}

/// Cheapest candidate meeting every minimum. When nothing qualifies, the
/// strongest reasoner of the full set is returned instead.
pub fn select_frontier<'a>(
    candidates: &'a [ModelCapability],
    constraints: &FrontierConstraints,
) -> Option<&'a ModelCapability> {
    let cheapest = candidates
        .iter()
        .filter(|c| constraints.admits(c))
        .fold(None::<&ModelCapability>, |best, c| match best {
            Some(b) if b.effective_cost() <= c.effective_cost() => Some(b),
            _ => Some(c),
        });

    cheapest.or_else(|| crate::first_max_by(candidates, |c| c.reasoning_capability))
}
