//! Model selection for the adaptive workflow engine
//!
//! A static capability catalog, per-model performance history and five
//! interchangeable selection algorithms (UCB1, Thompson Sampling, Pareto
//! weighting, cost-performance frontier, epsilon-greedy Q-learning), plus the
//! complexity scorer and modality detector behind the unified decision.
//! History and Q-tables are always passed in explicitly.

pub mod bandit;
pub mod catalog;
pub mod complexity;
mod error;
pub mod history;
pub mod modality;
pub mod pareto;
pub mod qlearning;
mod strategy;
mod unified;

pub use catalog::{Modality, ModelCapability, ModelCatalog, ModelTier};
pub use complexity::{score_complexity, ComplexityFactors, ComplexityScore, TaskSignals};
pub use error::SelectionError;
pub use history::{
    BanditState, HistoryMap, HistoryStore, InMemoryHistoryStore, InvocationOutcome,
    PerformanceHistory,
};
pub use modality::{detect_modality, ModalitySignals};
pub use pareto::{FrontierConstraints, ParetoWeights};
pub use qlearning::{ComplexityState, QTable};
pub use strategy::{select_model, SelectionContext, SelectionStrategy};
pub use unified::{
    decide_unified_model_switch, estimate_cost, DecisionSignals, SelectionOptions,
    UnifiedModelDecision, UnifiedRequest,
};

/// First element with the highest score; NaN scores never win
pub(crate) fn first_max_by<T, F>(items: &[T], mut score: F) -> Option<&T>
where
    F: FnMut(&T) -> f64,
{
    let mut best: Option<(&T, f64)> = None;
    for item in items {
        let s = score(item);
        if s.is_nan() {
            continue;
        }
        if best.map_or(true, |(_, b)| s > b) {
            best = Some((item, s));
        }
    }
    best.map(|(item, _)| item).or_else(|| items.first())
}
