use crate::bandit::{select_thompson, select_ucb};
use crate::catalog::ModelCapability;
use crate::history::HistoryMap;
use crate::pareto::{select_frontier, select_pareto, FrontierConstraints, ParetoWeights};
use crate::qlearning::{select_epsilon_greedy, ComplexityState, QTable};
use rand::Rng;
use serde::{Deserialize, Serialize};

fn default_epsilon() -> f64 {
    0.1
}

/// One of the interchangeable selection algorithms, with its parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "algorithm", rename_all = "kebab-case")]
pub enum SelectionStrategy {
    Ucb,
    Thompson,
    Pareto {
        #[serde(default)]
        weights: ParetoWeights,
    },
    Frontier {
        #[serde(default)]
        constraints: FrontierConstraints,
    },
    QLearning {
        #[serde(default = "default_epsilon")]
        epsilon: f64,
    },
}

impl SelectionStrategy {
    pub fn name(&self) -> &'static str {
        match self {
            SelectionStrategy::Ucb => "ucb",
            SelectionStrategy::Thompson => "thompson",
            SelectionStrategy::Pareto { .. } => "pareto",
            SelectionStrategy::Frontier { .. } => "frontier",
            SelectionStrategy::QLearning { .. } => "q-learning",
        }
    }
}

/// Read-only state a selection consults
#[derive(Debug, Clone, Copy)]
pub struct SelectionContext<'a> {
    pub history: &'a HistoryMap,
    pub q_table: &'a QTable,
    pub complexity_score: u32,
}

/// Runs `strategy` over `candidates`; `None` only when `candidates` is empty
pub fn select_model<'a, R: Rng + ?Sized>(
    strategy: &SelectionStrategy,
    candidates: &'a [ModelCapability],
    ctx: SelectionContext<'_>,
    rng: &mut R,
) -> Option<&'a ModelCapability> {
    let selected = match strategy {
        SelectionStrategy::Ucb => select_ucb(candidates, ctx.history),
        SelectionStrategy::Thompson => select_thompson(candidates, ctx.history, rng),
        SelectionStrategy::Pareto { weights } => select_pareto(candidates, weights),
        SelectionStrategy::Frontier { constraints } => select_frontier(candidates, constraints),
        SelectionStrategy::QLearning { epsilon } => select_epsilon_greedy(
            candidates,
            ctx.q_table,
            ComplexityState::from_score(ctx.complexity_score),
            *epsilon,
            rng,
        ),
    };
    if let Some(model) = selected {
        tracing::debug!(algorithm = strategy.name(), model = %model.key(), "selection made");
    }
    selected
}
