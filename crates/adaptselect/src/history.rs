use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Per-model usage counters, keyed by `provider:modelId`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceHistory {
    pub model_key: String,
    pub total_uses: u64,
    pub successful_uses: u64,
    pub failed_uses: u64,
    pub average_response_time_ms: f64,
    pub average_satisfaction: f64,
    pub total_cost: f64,
}

impl PerformanceHistory {
    pub fn new(model_key: impl Into<String>) -> Self {
        Self {
            model_key: model_key.into(),
            ..Self::default()
        }
    }

    /// History with only success/failure counts set
    pub fn with_outcomes(model_key: impl Into<String>, successes: u64, failures: u64) -> Self {
        Self {
            model_key: model_key.into(),
            total_uses: successes + failures,
            successful_uses: successes,
            failed_uses: failures,
            ..Self::default()
        }
    }

    pub fn success_rate(&self) -> f64 {
        if self.total_uses == 0 {
            0.0
        } else {
            self.successful_uses as f64 / self.total_uses as f64
        }
    }

    pub fn record(&mut self, outcome: &InvocationOutcome) {
        self.total_uses += 1;
        if outcome.success {
            self.successful_uses += 1;
        } else {
            self.failed_uses += 1;
        }
        let n = self.total_uses as f64;
        self.average_response_time_ms +=
            (outcome.response_time_ms as f64 - self.average_response_time_ms) / n;
        if let Some(satisfaction) = outcome.satisfaction {
            self.average_satisfaction += (satisfaction - self.average_satisfaction) / n;
        }
        self.total_cost += outcome.cost;
    }
}

pub type HistoryMap = HashMap<String, PerformanceHistory>;

/// Result of one real model invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvocationOutcome {
    pub success: bool,
    pub response_time_ms: u64,
    pub cost: f64,
    #[serde(default)]
    pub satisfaction: Option<f64>,
}

/// Bandit view of a candidate, derived from its history
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BanditState {
    pub wins: u64,
    pub tries: u64,
    pub estimated_value: f64,
    /// UCB1 exploration bonus; infinite for untried arms
    pub confidence: f64,
}

impl BanditState {
    pub fn derive(history: Option<&PerformanceHistory>, total_tries: u64) -> Self {
        let (wins, tries) = history
            .map(|h| (h.successful_uses, h.total_uses))
            .unwrap_or((0, 0));
        if tries == 0 {
            return Self {
                wins,
                tries,
                estimated_value: 0.0,
                confidence: f64::INFINITY,
            };
        }
        let total = total_tries.max(tries) as f64;
        Self {
            wins,
            tries,
            estimated_value: wins as f64 / tries as f64,
            confidence: (2.0 * total.ln() / tries as f64).sqrt(),
        }
    }

    pub fn upper_bound(&self) -> f64 {
        self.estimated_value + self.confidence
    }
}

/// Performance counters owned outside a single decision
#[async_trait]
pub trait HistoryStore: Send + Sync {
    async fn snapshot(&self) -> HistoryMap;

    async fn record(&self, model_key: &str, outcome: InvocationOutcome);
}

#[derive(Default)]
pub struct InMemoryHistoryStore {
    entries: RwLock<HistoryMap>,
}

impl InMemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entries(entries: HistoryMap) -> Self {
        Self {
            entries: RwLock::new(entries),
        }
    }
}

#[async_trait]
impl HistoryStore for InMemoryHistoryStore {
    async fn snapshot(&self) -> HistoryMap {
        self.entries.read().await.clone()
    }

    async fn record(&self, model_key: &str, outcome: InvocationOutcome) {
        let mut entries = self.entries.write().await;
        entries
            .entry(model_key.to_string())
            .or_insert_with(|| PerformanceHistory::new(model_key))
            .record(&outcome);
    }
}
