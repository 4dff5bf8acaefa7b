use adaptcore::{
    ComposedTarget, CompositionError, ModelConfig, ModelSetConfig, Node, NodeConfig,
    PromptTextConfig, Provider, Role, TextBlock, Workflow,
};
use adaptruntime::{compose, ComposeOptions, DEFAULT_SYSTEM_PROMPT};
use serde_json::{json, Map, Value};

fn bedrock_model(id: &str) -> NodeConfig {
    NodeConfig::Model(ModelConfig::new(Provider::Bedrock, id))
}

fn prompt() -> NodeConfig {
    NodeConfig::Prompt(Map::new())
}

fn compose_workflow(workflow: &Workflow, options: &ComposeOptions) -> Result<adaptcore::ComposedMessage, CompositionError> {
    compose(&workflow.nodes, &workflow.edges, options)
}

#[test]
fn test_preamble_groups_are_ordered_by_position() {
    let mut workflow = Workflow::new("ordering");
    workflow.add_node(Node::new("p", prompt()));
    workflow.add_node(Node::new("m", bedrock_model("anthropic.claude-haiku-4-5-20251001-v1:0")));
    workflow.add_node(
        Node::new("b2", NodeConfig::Background(TextBlock::new("second background"))).with_position(0.0, 20.0),
    );
    workflow.add_node(
        Node::new("b1", NodeConfig::Background(TextBlock::new("first background"))).with_position(50.0, 10.0),
    );
    workflow.add_node(
        Node::new("b0", NodeConfig::Background(TextBlock::new("left background"))).with_position(0.0, 10.0),
    );
    workflow.add_node(Node::new("c", NodeConfig::Context(TextBlock::new("context"))).with_position(0.0, 0.0));
    workflow.add_node(Node::new("o", NodeConfig::OutputIndicator(TextBlock::new("answer in json"))));
    for source in ["o", "c", "b2", "b1", "b0"] {
        workflow.connect(source, "p");
    }
    workflow.connect("p", "m");

    let message = compose_workflow(&workflow, &ComposeOptions::default()).unwrap();

    assert_eq!(
        message.system.as_deref(),
        Some("left background\nfirst background\nsecond background\n\ncontext\n\nanswer in json"),
        "Background comes first, each group sorted by y then x"
    );
    match &message.target {
        ComposedTarget::Bedrock(request) => {
            assert_eq!(request.system.len(), 1);
            assert!(request.system[0].text.starts_with("left background"));
        }
        other => panic!("expected bedrock target, got {:?}", other),
    }
}

#[test]
fn test_prompt_text_renders_runtime_inputs_over_static() {
    let mut workflow = Workflow::new("templates");
    workflow.add_node(Node::new("p", prompt()));
    workflow.add_node(Node::new("m", bedrock_model("amazon.nova-micro-v1:0")));
    workflow.add_node(Node::new(
        "t",
        NodeConfig::PromptText(
            PromptTextConfig::new("Hello {{name}} from {{ place }}, see {{missing}}")
                .with_role(Role::User)
                .with_input("name", "Static")
                .with_input("place", "Paris"),
        ),
    ));
    workflow.connect("t", "p");
    workflow.connect("p", "m");

    let mut runtime_inputs = Map::new();
    runtime_inputs.insert("name".to_string(), json!("Runtime"));
    let options = ComposeOptions {
        prompt_id: None,
        runtime_inputs,
    };
    let message = compose_workflow(&workflow, &options).unwrap();

    assert_eq!(message.messages.len(), 1);
    assert_eq!(message.messages[0].role, Role::User);
    assert_eq!(message.messages[0].text, "Hello Runtime from Paris, see {{missing}}");
}

#[test]
fn test_label_or_default_when_no_prompt_text() {
    let workflow = Workflow::new("bare").with_node("p", prompt());
    let message = compose_workflow(&workflow, &ComposeOptions::default()).unwrap();
    assert_eq!(message.messages[0].text, DEFAULT_SYSTEM_PROMPT);
    assert_eq!(message.messages[0].role, Role::System);

    let mut labelled = Workflow::new("labelled");
    labelled.add_node(Node::new("p", prompt()).with_label("You are a pirate."));
    let message = compose_workflow(&labelled, &ComposeOptions::default()).unwrap();
    assert_eq!(message.messages[0].text, "You are a pirate.");
}

#[test]
fn test_background_label_and_bedrock_model_compose_end_to_end() {
    let mut workflow = Workflow::new("end-to-end");
    workflow.add_node(Node::new("bg", NodeConfig::Background(TextBlock::new("bg"))));
    workflow.add_node(Node::new("p", prompt()).with_label("Be helpful"));
    workflow.add_node(Node::new("m", bedrock_model("amazon.nova-micro-v1:0")));
    workflow.connect("bg", "p");
    workflow.connect("p", "m");

    let message = compose_workflow(&workflow, &ComposeOptions::default()).unwrap();

    assert_eq!(message.prompt_id, "p");
    assert_eq!(message.system.as_deref(), Some("bg"));
    assert_eq!(message.messages.len(), 1);
    assert_eq!(message.messages[0].role, Role::System);
    assert_eq!(message.messages[0].text, "Be helpful");

    let ComposedTarget::Bedrock(request) = &message.target else {
        panic!("expected bedrock target");
    };
    assert_eq!(request.model_id, "amazon.nova-micro-v1:0");
    assert_eq!(request.messages.len(), 1);
    assert_eq!(request.messages[0].role, Role::User);
    assert_eq!(request.messages[0].content.len(), 1);
    assert_eq!(request.messages[0].content[0].text, "[System]: Be helpful");
    assert_eq!(request.system[0].text, "bg");
}

#[test]
fn test_bedrock_shaping_remaps_system_messages() {
    let workflow = Workflow::new("bedrock")
        .with_node("p", prompt())
        .with_node("m", bedrock_model("amazon.nova-micro-v1:0"))
        .with_node("s", NodeConfig::PromptText(PromptTextConfig::new("Be terse.")))
        .with_node(
            "u",
            NodeConfig::PromptText(PromptTextConfig::new("What is Rust?").with_role(Role::User)),
        )
        .with_edge("s", "p")
        .with_edge("u", "p")
        .with_edge("p", "m");

    let message = compose_workflow(&workflow, &ComposeOptions::default()).unwrap();

    assert_eq!(message.messages[0].role, Role::System, "canonical roles are kept");
    let ComposedTarget::Bedrock(request) = &message.target else {
        panic!("expected bedrock target");
    };
    assert_eq!(request.messages[0].role, Role::User);
    assert_eq!(request.messages[0].content[0].text, "[System]: Be terse.");
    assert_eq!(request.messages[1].content[0].text, "What is Rust?");
    assert_eq!(request.inference_config.max_tokens, 2048);
    assert!(request.system.is_empty());
}

#[test]
fn test_ollama_keeps_roles_and_prepends_preamble() {
    let mut model = ModelConfig::new(Provider::Ollama, "llama3.2");
    model.endpoint = Some("http://gpu-box:11434".to_string());
    model.temperature = Some(0.2);
    let workflow = Workflow::new("ollama")
        .with_node("p", prompt())
        .with_node("m", NodeConfig::Model(model))
        .with_node("bg", NodeConfig::Background(TextBlock::new("You review code.")))
        .with_node("s", NodeConfig::PromptText(PromptTextConfig::new("Focus on safety.")))
        .with_edge("bg", "p")
        .with_edge("s", "p")
        .with_edge("p", "m");

    let message = compose_workflow(&workflow, &ComposeOptions::default()).unwrap();

    let ComposedTarget::Ollama(request) = &message.target else {
        panic!("expected ollama target");
    };
    assert_eq!(request.endpoint, "http://gpu-box:11434");
    assert!(!request.stream);
    assert_eq!(request.options.temperature, 0.2);
    assert_eq!(request.messages.len(), 2);
    assert_eq!(request.messages[0].role, Role::System);
    assert_eq!(request.messages[0].content, "You review code.");
    assert_eq!(request.messages[1].role, Role::System);
    assert_eq!(request.messages[1].content, "Focus on safety.");
}

#[test]
fn test_model_set_uses_primary_then_first_inbound_model() {
    let base = || {
        Workflow::new("set")
            .with_node("p", prompt())
            .with_node("m1", bedrock_model("first"))
            .with_node("m2", bedrock_model("second"))
            .with_edge("m1", "set")
            .with_edge("m2", "set")
            .with_edge("p", "set")
    };

    let with_primary = base().with_node(
        "set",
        NodeConfig::ModelSet(ModelSetConfig {
            strategy: "single".to_string(),
            primary: Some("m2".to_string()),
        }),
    );
    let message = compose_workflow(&with_primary, &ComposeOptions::default()).unwrap();
    assert_eq!(message.target.model_id(), Some("second"));

    let dangling_primary = base().with_node(
        "set",
        NodeConfig::ModelSet(ModelSetConfig {
            strategy: "single".to_string(),
            primary: Some("nope".to_string()),
        }),
    );
    let message = compose_workflow(&dangling_primary, &ComposeOptions::default()).unwrap();
    assert_eq!(message.target.model_id(), Some("first"));
}

#[test]
fn test_model_set_rejects_other_strategies() {
    let workflow = Workflow::new("set")
        .with_node("p", prompt())
        .with_node("m", bedrock_model("first"))
        .with_node(
            "set",
            NodeConfig::ModelSet(ModelSetConfig {
                strategy: "round-robin".to_string(),
                primary: None,
            }),
        )
        .with_edge("m", "set")
        .with_edge("p", "set");

    let err = compose_workflow(&workflow, &ComposeOptions::default()).unwrap_err();
    assert_eq!(err, CompositionError::UnsupportedStrategy("round-robin".to_string()));
}

#[test]
fn test_prompt_without_model_is_tool_only() {
    let workflow = Workflow::new("tools").with_node("p", prompt());
    let message = compose_workflow(&workflow, &ComposeOptions::default()).unwrap();
    assert!(matches!(message.target, ComposedTarget::ToolOnly));
    assert_eq!(message.target_name(), "tool-only");
}

#[test]
fn test_prompt_selection_prefers_explicit_then_model_reaching() {
    let mut workflow = Workflow::new("two prompts");
    workflow.add_node(Node::new("draft", prompt()).with_label("Draft prompt"));
    workflow.add_node(Node::new("final", prompt()).with_label("Final prompt"));
    workflow.add_node(Node::new("m", bedrock_model("amazon.nova-micro-v1:0")));
    workflow.connect("final", "m");

    let message = compose_workflow(&workflow, &ComposeOptions::default()).unwrap();
    assert_eq!(message.prompt_id, "final");

    let options = ComposeOptions {
        prompt_id: Some("draft".to_string()),
        runtime_inputs: Map::new(),
    };
    let message = compose_workflow(&workflow, &options).unwrap();
    assert_eq!(message.prompt_id, "draft");

    let bogus = ComposeOptions {
        prompt_id: Some("m".to_string()),
        runtime_inputs: Map::new(),
    };
    let message = compose_workflow(&workflow, &bogus).unwrap();
    assert_eq!(message.prompt_id, "final", "non-prompt ids are ignored");
}

#[test]
fn test_structural_errors() {
    let empty = Workflow::new("empty").with_node("m", bedrock_model("x"));
    assert_eq!(
        compose_workflow(&empty, &ComposeOptions::default()).unwrap_err(),
        CompositionError::NoPromptNode
    );

    let dangling = Workflow::new("dangling")
        .with_node("p", prompt())
        .with_edge("ghost", "p");
    assert_eq!(
        compose_workflow(&dangling, &ComposeOptions::default()).unwrap_err(),
        CompositionError::NodeNotFound("ghost".to_string())
    );
}

#[test]
fn test_composed_message_serializes_target_tag() {
    let workflow = Workflow::new("wire")
        .with_node("p", prompt())
        .with_node("m", bedrock_model("amazon.nova-micro-v1:0"))
        .with_edge("p", "m");
    let message = compose_workflow(&workflow, &ComposeOptions::default()).unwrap();

    let wire: Value = serde_json::to_value(&message).unwrap();
    assert_eq!(wire["promptId"], "p");
    assert_eq!(wire["target"], "bedrock");
    assert_eq!(wire["payload"]["modelId"], "amazon.nova-micro-v1:0");
    assert_eq!(wire["payload"]["inferenceConfig"]["topP"], 0.9);
}
