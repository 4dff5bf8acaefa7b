//! Single-call agent path: decide a model for one chat message, call it, and
//! feed the outcome back into history and the Q-table.

use crate::compositor::Compositor;
use crate::decider::{CatalogDecider, ModelDecider};
use adaptcore::{
    ChatMessage, ComposedMessage, EventBus, ExecutionEvent, MessageExecutor, ModelConfig,
    Provider, RateDecision, RateLimiter, TierResolver,
};
use adaptselect::{ComplexityState, InvocationOutcome, UnifiedModelDecision, UnifiedRequest};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

pub const UNIFIED_PROMPT_ID: &str = "unified";

const DEFAULT_LEARNING_RATE: f64 = 0.1;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnifiedResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decision: Option<UnifiedModelDecision>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_after_secs: Option<u64>,
}

impl UnifiedResponse {
    fn failure(decision: Option<UnifiedModelDecision>, error: impl ToString) -> Self {
        Self {
            success: false,
            text: None,
            decision,
            error: Some(error.to_string()),
            retry_after_secs: None,
        }
    }
}

pub struct UnifiedAgent {
    decider: Arc<CatalogDecider>,
    executor: Arc<dyn MessageExecutor>,
    tiers: Arc<dyn TierResolver>,
    limiter: Arc<dyn RateLimiter>,
    compositor: Compositor,
    learning_rate: f64,
    event_bus: Option<Arc<EventBus>>,
}

impl UnifiedAgent {
    pub fn new(
        decider: Arc<CatalogDecider>,
        executor: Arc<dyn MessageExecutor>,
        tiers: Arc<dyn TierResolver>,
        limiter: Arc<dyn RateLimiter>,
    ) -> Self {
        Self {
            decider,
            executor,
            tiers,
            limiter,
            compositor: Compositor::default(),
            learning_rate: DEFAULT_LEARNING_RATE,
            event_bus: None,
        }
    }

    pub fn with_compositor(mut self, compositor: Compositor) -> Self {
        self.compositor = compositor;
        self
    }

    pub fn with_learning_rate(mut self, learning_rate: f64) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    /// Broadcast `ModelSelected` for every decision
    pub fn with_event_bus(mut self, event_bus: Arc<EventBus>) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    pub fn decider(&self) -> &Arc<CatalogDecider> {
        &self.decider
    }

    pub async fn handle(&self, user_id: &str, mut request: UnifiedRequest) -> UnifiedResponse {
        let tier = self.tiers.resolve_tier(user_id).await;
        request.selection_options.user_tier = tier;

        let decision = match self.decider.decide(&request).await {
            Ok(decision) => decision,
            Err(e) => {
                tracing::error!("Model selection failed for {}: {}", user_id, e);
                return UnifiedResponse::failure(None, e);
            }
        };
        let model_key = decision.selected_model.key();

        if let Some(bus) = &self.event_bus {
            bus.emit(ExecutionEvent::ModelSelected {
                model_key: model_key.clone(),
                modality: decision.modality.as_str().to_string(),
                complexity_score: decision.complexity_score,
                timestamp: Utc::now(),
            });
        }

        if decision.selected_model.provider == Provider::Bedrock {
            if let RateDecision::Rejected {
                reason,
                retry_after_secs,
            } = self.limiter.check(user_id, tier, &model_key).await
            {
                tracing::warn!("Rate limit rejected {} on {}: {}", user_id, model_key, reason);
                return UnifiedResponse {
                    retry_after_secs: Some(retry_after_secs),
                    ..UnifiedResponse::failure(Some(decision), format!("Rate limited: {}", reason))
                };
            }
        }

        let message = self.compose(&request, &decision);
        let start = Instant::now();
        let outcome = self.executor.execute_composed(&message).await;
        let response_time_ms = start.elapsed().as_millis() as u64;

        let success = outcome.is_ok();
        self.learn(&decision, success, response_time_ms).await;

        match outcome {
            Ok(reply) => {
                tracing::info!("Unified request for {} completed on {} in {}ms", user_id, model_key, response_time_ms);
                UnifiedResponse {
                    success: true,
                    text: Some(reply.text),
                    decision: Some(decision),
                    error: None,
                    retry_after_secs: None,
                }
            }
            Err(e) => {
                tracing::error!("Provider call to {} failed for {}: {}", model_key, user_id, e);
                UnifiedResponse::failure(Some(decision), e)
            }
        }
    }

    /// Conversation history followed by the new user message
    fn compose(&self, request: &UnifiedRequest, decision: &UnifiedModelDecision) -> ComposedMessage {
        let mut messages = request.conversation_history.clone();
        messages.push(ChatMessage::user(request.message.clone()));

        let model = ModelConfig::new(
            decision.selected_model.provider,
            decision.selected_model.model_id.clone(),
        );
        ComposedMessage {
            prompt_id: UNIFIED_PROMPT_ID.to_string(),
            system: None,
            target: self.compositor.target_for(&model, None, &messages),
            messages,
        }
    }

    async fn learn(&self, decision: &UnifiedModelDecision, success: bool, response_time_ms: u64) {
        let key = decision.selected_model.key();
        let outcome = InvocationOutcome {
            success,
            response_time_ms,
            cost: if success { decision.estimated_cost } else { 0.0 },
            satisfaction: None,
        };
        self.decider.history().record(&key, outcome).await;

        let state = ComplexityState::from_score(decision.complexity_score);
        let reward = if success { 1.0 } else { 0.0 };
        let value = self
            .decider
            .q_table()
            .write()
            .await
            .update(state, &key, reward, self.learning_rate);
        tracing::debug!(model = %key, ?state, q = value, "Updated Q-value");
    }
}
