use adaptcore::{
    ChatMessage, ComposedMessage, ComposedTarget, EventBus, ExecutionEvent, MessageExecutor,
    Provider, ProviderError, ProviderReply, RateDecision, RateLimiter, Role, TierResolver,
    UserTier,
};
use adaptruntime::{CatalogDecider, UnifiedAgent, UNIFIED_PROMPT_ID};
use adaptselect::{
    ComplexityState, HistoryStore, InMemoryHistoryStore, Modality, ModelCapability, ModelCatalog,
    ModelTier, UnifiedRequest,
};
use async_trait::async_trait;
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

struct FixedTiers {
    tiers: HashMap<String, UserTier>,
}

impl FixedTiers {
    fn new(entries: &[(&str, UserTier)]) -> Arc<dyn TierResolver> {
        Arc::new(Self {
            tiers: entries.iter().map(|(u, t)| (u.to_string(), *t)).collect(),
        })
    }
}

#[async_trait]
impl TierResolver for FixedTiers {
    async fn resolve_tier(&self, user_id: &str) -> UserTier {
        self.tiers.get(user_id).copied().unwrap_or_default()
    }
}

struct ScriptedLimiter {
    allow: bool,
    checks: AtomicUsize,
}

impl ScriptedLimiter {
    fn new(allow: bool) -> Arc<Self> {
        Arc::new(Self {
            allow,
            checks: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl RateLimiter for ScriptedLimiter {
    async fn check(&self, _user_id: &str, _tier: UserTier, _model_key: &str) -> RateDecision {
        self.checks.fetch_add(1, Ordering::SeqCst);
        if self.allow {
            RateDecision::Allowed
        } else {
            RateDecision::Rejected {
                reason: "10 requests per minute".to_string(),
                retry_after_secs: 30,
            }
        }
    }
}

struct ScriptedExecutor {
    fail: bool,
    seen: Mutex<Vec<ComposedMessage>>,
}

impl ScriptedExecutor {
    fn new(fail: bool) -> Arc<Self> {
        Arc::new(Self {
            fail,
            seen: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl MessageExecutor for ScriptedExecutor {
    async fn execute_composed(
        &self,
        message: &ComposedMessage,
    ) -> Result<ProviderReply, ProviderError> {
        self.seen.lock().unwrap().push(message.clone());
        if self.fail {
            return Err(ProviderError::Status {
                status: 503,
                body: "overloaded".to_string(),
            });
        }
        Ok(ProviderReply {
            text: "Hello back".to_string(),
            raw: json!({}),
        })
    }
}

fn bedrock_only_catalog() -> ModelCatalog {
    ModelCatalog::new(vec![ModelCapability {
        provider: Provider::Bedrock,
        model_id: "amazon.nova-micro-v1:0".to_string(),
        display_name: "Amazon Nova Micro".to_string(),
        modality: Modality::Text,
        tier: ModelTier::Fast,
        cost_per_1k: 0.0001,
        cost_per_unit: None,
        average_latency_ms: 400.0,
        reasoning_capability: 5.0,
        accuracy: 6.0,
        creativity: 5.0,
        speed: 9.5,
        max_concurrency: 50,
        features: Vec::new(),
    }])
}

fn decider(catalog: ModelCatalog, history: Arc<InMemoryHistoryStore>) -> Arc<CatalogDecider> {
    Arc::new(CatalogDecider::new(catalog, history).with_seed(11))
}

#[tokio::test]
async fn test_freemium_chat_uses_local_model_and_learns() {
    let history = Arc::new(InMemoryHistoryStore::new());
    let executor = ScriptedExecutor::new(false);
    let limiter = ScriptedLimiter::new(true);
    let agent = UnifiedAgent::new(
        decider(ModelCatalog::builtin(), history.clone()),
        executor.clone(),
        FixedTiers::new(&[]),
        limiter.clone(),
    );

    let mut request = UnifiedRequest::new("What's up?");
    request.conversation_history = vec![ChatMessage::user("hi"), ChatMessage::assistant("hello")];
    let response = agent.handle("anonymous", request).await;

    assert!(response.success, "chat should succeed: {:?}", response.error);
    assert_eq!(response.text.as_deref(), Some("Hello back"));
    let decision = response.decision.unwrap();
    assert_eq!(decision.selected_model.key(), "ollama:llama3.2");
    assert_eq!(decision.signals.algorithm, "cheapest");
    assert_eq!(limiter.checks.load(Ordering::SeqCst), 0, "local models skip rate limits");

    let seen = executor.seen.lock().unwrap();
    assert_eq!(seen[0].prompt_id, UNIFIED_PROMPT_ID);
    let ComposedTarget::Ollama(payload) = &seen[0].target else {
        panic!("expected ollama payload");
    };
    let roles: Vec<Role> = payload.messages.iter().map(|m| m.role).collect();
    assert_eq!(roles, vec![Role::User, Role::Assistant, Role::User]);
    assert_eq!(payload.messages[2].content, "What's up?");

    let snapshot = history.snapshot().await;
    let entry = &snapshot["ollama:llama3.2"];
    assert_eq!(entry.total_uses, 1);
    assert_eq!(entry.successful_uses, 1);

    let q = agent
        .decider()
        .q_table()
        .read()
        .await
        .value(ComplexityState::from_score(decision.complexity_score), "ollama:llama3.2");
    assert!((q - 0.1).abs() < 1e-9, "first success moves Q by the learning rate");
}

#[tokio::test]
async fn test_rate_limited_bedrock_call_is_not_executed() {
    let history = Arc::new(InMemoryHistoryStore::new());
    let executor = ScriptedExecutor::new(false);
    let limiter = ScriptedLimiter::new(false);
    let agent = UnifiedAgent::new(
        decider(bedrock_only_catalog(), history.clone()),
        executor.clone(),
        FixedTiers::new(&[("pro-user", UserTier::Pro)]),
        limiter.clone(),
    );

    let response = agent.handle("pro-user", UnifiedRequest::new("Summarize this")).await;

    assert!(!response.success);
    assert_eq!(response.error.as_deref(), Some("Rate limited: 10 requests per minute"));
    assert_eq!(response.retry_after_secs, Some(30));
    assert!(response.decision.is_some(), "the decision is still reported");
    assert_eq!(limiter.checks.load(Ordering::SeqCst), 1);
    assert!(executor.seen.lock().unwrap().is_empty());
    assert!(history.snapshot().await.is_empty(), "nothing is learned from rejected calls");
}

#[tokio::test]
async fn test_provider_failure_is_recorded_without_cost() {
    let history = Arc::new(InMemoryHistoryStore::new());
    let agent = UnifiedAgent::new(
        decider(bedrock_only_catalog(), history.clone()),
        ScriptedExecutor::new(true),
        FixedTiers::new(&[]),
        ScriptedLimiter::new(true),
    );

    let response = agent.handle("someone", UnifiedRequest::new("hello")).await;

    assert!(!response.success);
    assert!(response.error.unwrap().contains("503"));

    let snapshot = history.snapshot().await;
    let entry = &snapshot["bedrock:amazon.nova-micro-v1:0"];
    assert_eq!(entry.failed_uses, 1);
    assert_eq!(entry.total_cost, 0.0);
}

#[tokio::test]
async fn test_bedrock_payload_carries_history_and_selection_event() {
    let executor = ScriptedExecutor::new(false);
    let bus = Arc::new(EventBus::new(16));
    let mut events = bus.subscribe();
    let agent = UnifiedAgent::new(
        decider(bedrock_only_catalog(), Arc::new(InMemoryHistoryStore::new())),
        executor.clone(),
        FixedTiers::new(&[("ent", UserTier::Enterprise)]),
        ScriptedLimiter::new(true),
    )
    .with_event_bus(bus.clone());

    let mut request = UnifiedRequest::new("Continue");
    request.conversation_history = vec![ChatMessage::system("Answer in French")];
    let response = agent.handle("ent", request).await;

    assert!(response.success);
    let decision = response.decision.unwrap();
    assert_eq!(decision.signals.algorithm, "tier-table");

    let seen = executor.seen.lock().unwrap();
    let ComposedTarget::Bedrock(payload) = &seen[0].target else {
        panic!("expected bedrock payload");
    };
    assert_eq!(payload.messages[0].role, Role::User);
    assert_eq!(payload.messages[0].content[0].text, "[System]: Answer in French");
    assert_eq!(payload.messages[1].content[0].text, "Continue");

    match events.try_recv() {
        Ok(ExecutionEvent::ModelSelected { model_key, modality, .. }) => {
            assert_eq!(model_key, "bedrock:amazon.nova-micro-v1:0");
            assert_eq!(modality, "text");
        }
        other => panic!("expected ModelSelected, got {:?}", other),
    }
}

#[tokio::test]
async fn test_empty_catalog_fails_before_any_call() {
    let executor = ScriptedExecutor::new(false);
    let agent = UnifiedAgent::new(
        decider(ModelCatalog::new(Vec::new()), Arc::new(InMemoryHistoryStore::new())),
        executor.clone(),
        FixedTiers::new(&[]),
        ScriptedLimiter::new(true),
    );

    let response = agent.handle("user", UnifiedRequest::new("hi")).await;

    assert!(!response.success);
    assert!(response.decision.is_none());
    assert!(executor.seen.lock().unwrap().is_empty());
}
