use adaptcore::{
    BedrockInferenceConfig, BedrockRequest, ComposedMessage, ComposedTarget, MessageExecutor,
    NodeConfig, ProviderError, ToolConfig, Workflow, WorkflowStore,
};
use adaptnodes::{register_all, InMemoryWorkflowStore, ProviderExecutor, StoreError};
use adaptruntime::{ExecuteRequest, FlowRuntime, ProvidersConfig, RuntimeConfig, ToolRegistry};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("adaptnodes-{}-{}", name, std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn message(target: ComposedTarget) -> ComposedMessage {
    ComposedMessage {
        prompt_id: "p".to_string(),
        system: None,
        messages: Vec::new(),
        target,
    }
}

fn internal(name: &str, params: Value) -> NodeConfig {
    NodeConfig::Tool(ToolConfig::Internal {
        name: name.to_string(),
        params: params.as_object().cloned().unwrap_or_default(),
        batch: Vec::new(),
    })
}

#[tokio::test]
async fn test_store_loads_json_graphs_by_file_stem() {
    let dir = scratch_dir("store");
    std::fs::write(
        dir.join("greeting.json"),
        r#"{
            "name": "greeting",
            "nodes": [
                {"id": "p", "kind": "prompt", "config": {}},
                {"id": "m", "kind": "model", "config": {"provider": "ollama", "modelId": "llama3.2"}}
            ],
            "edges": [{"id": "e1", "source": "p", "target": "m"}]
        }"#,
    )
    .unwrap();
    std::fs::write(dir.join("notes.txt"), "ignored").unwrap();

    let store = InMemoryWorkflowStore::load_dir(&dir).unwrap();

    assert_eq!(store.ids().await, vec!["greeting".to_string()]);
    let workflow = store.get_workflow("greeting").await.expect("workflow should load");
    assert_eq!(workflow.nodes.len(), 2);
    assert_eq!(workflow.edges[0].target, "m");
    assert!(store.get_workflow("notes").await.is_none());
}

#[tokio::test]
async fn test_store_reports_invalid_graph_file() {
    let dir = scratch_dir("invalid");
    std::fs::write(
        dir.join("broken.json"),
        r#"{"nodes": [{"id": "m", "kind": "model", "config": {"provider": "openai"}}]}"#,
    )
    .unwrap();

    match InMemoryWorkflowStore::load_dir(&dir) {
        Err(StoreError::Parse { path, .. }) => assert!(path.ends_with("broken.json")),
        Err(other) => panic!("expected parse error, got {}", other),
        Ok(_) => panic!("invalid provider should not load"),
    }
}

#[tokio::test]
async fn test_provider_rejects_tool_only_messages() {
    let executor = ProviderExecutor::new(&ProvidersConfig::default()).unwrap();

    let err = executor
        .execute_composed(&message(ComposedTarget::ToolOnly))
        .await
        .unwrap_err();

    assert_eq!(err, ProviderError::ToolOnlyTarget);
}

#[tokio::test]
async fn test_bedrock_requires_credentials_before_network() {
    let config = ProvidersConfig {
        bedrock_token_env: "ADAPTNODES_TEST_UNSET_BEDROCK_TOKEN".to_string(),
        bedrock_region: "invalid-region.localhost".to_string(),
        ..ProvidersConfig::default()
    };
    let executor = ProviderExecutor::new(&config).unwrap();
    let target = ComposedTarget::Bedrock(BedrockRequest {
        model_id: "amazon.nova-micro-v1:0".to_string(),
        messages: Vec::new(),
        system: Vec::new(),
        inference_config: BedrockInferenceConfig {
            max_tokens: 16,
            temperature: 0.7,
            top_p: 0.9,
        },
    });

    let err = executor.execute_composed(&message(target)).await.unwrap_err();

    assert_eq!(
        err,
        ProviderError::MissingCredentials {
            provider: "bedrock".to_string(),
            variable: "ADAPTNODES_TEST_UNSET_BEDROCK_TOKEN".to_string(),
        }
    );
}

#[tokio::test]
async fn test_builtin_tools_chain_through_runtime() {
    let mut registry = ToolRegistry::new();
    register_all(&mut registry);
    assert!(registry.contains("transform.json_parse"));
    assert!(registry.contains("http.request"));

    let runtime = FlowRuntime::with_registry(
        Arc::new(InMemoryWorkflowStore::new()),
        Arc::new(registry),
        RuntimeConfig::default(),
    );

    let workflow = Workflow::new("builtin chain")
        .with_node("parse", internal("transform.json_parse", json!({})))
        .with_node("pick", internal("transform.json_extract", json!({"path": "user.name"})))
        .with_node(
            "greet",
            internal("text.template", json!({"template": "Hello, {{input}}!"})),
        )
        .with_edge("parse", "pick")
        .with_edge("pick", "greet");

    let request = ExecuteRequest::new("builtin", json!(r#"{"user": {"name": "Grace"}}"#));
    let response = runtime.execute_workflow(&workflow, &request).await;

    assert!(response.success, "chain should run: {:?}", response.error);
    assert_eq!(response.result, Some(json!("Hello, Grace!")));
}

#[tokio::test]
async fn test_registered_tools_have_metadata() {
    let mut registry = ToolRegistry::new();
    register_all(&mut registry);

    let listings = registry.listings();
    assert_eq!(listings.len(), 9);
    let http = listings.iter().find(|l| l.name == "http.request").unwrap();
    assert_eq!(http.metadata.category, "http");
    assert!(http.metadata.params.iter().any(|p| p.name == "url" && p.required));

    let wire = serde_json::to_value(&listings[0]).unwrap();
    assert!(wire.get("description").is_some(), "metadata is flattened: {}", wire);
}
