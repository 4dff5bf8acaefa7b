use adaptselect::{
    decide_unified_model_switch, HistoryStore, ModelCatalog, QTable, SelectionError,
    UnifiedModelDecision, UnifiedRequest,
};
use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

/// Picks a model for a request; used for `modelId: "auto"` and the unified agent
#[async_trait]
pub trait ModelDecider: Send + Sync {
    async fn decide(&self, request: &UnifiedRequest) -> Result<UnifiedModelDecision, SelectionError>;
}

/// Decider backed by the capability catalog, a shared history store and a
/// shared Q-table
pub struct CatalogDecider {
    catalog: ModelCatalog,
    history: Arc<dyn HistoryStore>,
    q_table: Arc<RwLock<QTable>>,
    rng: Mutex<StdRng>,
}

impl CatalogDecider {
    pub fn new(catalog: ModelCatalog, history: Arc<dyn HistoryStore>) -> Self {
        Self {
            catalog,
            history,
            q_table: Arc::new(RwLock::new(QTable::new())),
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    pub fn with_q_table(mut self, q_table: Arc<RwLock<QTable>>) -> Self {
        self.q_table = q_table;
        self
    }

    /// Deterministic exploration, for tests and replays
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = Mutex::new(StdRng::seed_from_u64(seed));
        self
    }

    pub fn catalog(&self) -> &ModelCatalog {
        &self.catalog
    }

    pub fn history(&self) -> &Arc<dyn HistoryStore> {
        &self.history
    }

    pub fn q_table(&self) -> &Arc<RwLock<QTable>> {
        &self.q_table
    }
}

#[async_trait]
impl ModelDecider for CatalogDecider {
    async fn decide(&self, request: &UnifiedRequest) -> Result<UnifiedModelDecision, SelectionError> {
        let history = self.history.snapshot().await;
        let q_table = self.q_table.read().await;
        let mut rng = self.rng.lock().await;
        decide_unified_model_switch(request, &self.catalog, &history, &q_table, &mut *rng)
    }
}
