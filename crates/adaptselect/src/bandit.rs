//! Multi-armed bandit selectors: UCB1 and Thompson Sampling.

use crate::catalog::ModelCapability;
use crate::history::{BanditState, HistoryMap};
use rand::Rng;
use std::f64::consts::PI;

/// UCB1. Any candidate without recorded uses is returned before scores are
/// compared.
pub fn select_ucb<'a>(
    candidates: &'a [ModelCapability],
    history: &HistoryMap,
) -> Option<&'a ModelCapability> {
    let uses = |c: &ModelCapability| history.get(&c.key()).map_or(0, |h| h.total_uses);

    if let Some(untried) = candidates.iter().find(|c| uses(c) == 0) {
        return Some(untried);
    }

    let total_tries: u64 = candidates.iter().map(uses).sum();
    crate::first_max_by(candidates, |c| {
        BanditState::derive(history.get(&c.key()), total_tries).upper_bound()
    })
}

/// Thompson Sampling over `Beta(successes + 1, failures + 1)`
pub fn select_thompson<'a, R: Rng + ?Sized>(
    candidates: &'a [ModelCapability],
    history: &HistoryMap,
    rng: &mut R,
) -> Option<&'a ModelCapability> {
    let mut best: Option<(&ModelCapability, f64)> = None;
    for candidate in candidates {
        let (successes, failures) = history
            .get(&candidate.key())
            .map_or((0, 0), |h| (h.successful_uses, h.failed_uses));
        let sample = sample_beta(successes as f64 + 1.0, failures as f64 + 1.0, rng);
        if best.map_or(true, |(_, b)| sample > b) {
            best = Some((candidate, sample));
        }
    }
    best.map(|(c, _)| c)
}

/// Beta draw as the ratio of two Gamma draws
pub fn sample_beta<R: Rng + ?Sized>(alpha: f64, beta: f64, rng: &mut R) -> f64 {
    let x = sample_gamma(alpha, rng);
    let y = sample_gamma(beta, rng);
    if x + y <= 0.0 {
        0.5
    } else {
        x / (x + y)
    }
}

/// Marsaglia-Tsang Gamma(shape, 1) sampler
pub fn sample_gamma<R: Rng + ?Sized>(shape: f64, rng: &mut R) -> f64 {
    if shape < 1.0 {
        let u: f64 = rng.gen();
        return sample_gamma(shape + 1.0, rng) * u.powf(1.0 / shape);
    }

    let d = shape - 1.0 / 3.0;
    let c = 1.0 / (9.0 * d).sqrt();
    loop {
        let x = sample_standard_normal(rng);
        let v = 1.0 + c * x;
        if v <= 0.0 {
            continue;
        }
        let v = v * v * v;
        let u: f64 = rng.gen();
        if u < 1.0 - 0.0331 * x.powi(4) {
            return d * v;
        }
        if u.ln() < 0.5 * x * x + d * (1.0 - v + v.ln()) {
            return d * v;
        }
    }
}

/// Box-Muller transform
pub fn sample_standard_normal<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    // u1 in (0, 1] keeps ln finite
    let u1: f64 = 1.0 - rng.gen::<f64>();
    let u2: f64 = rng.gen();
    (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
}
