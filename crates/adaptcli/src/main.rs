use adaptcore::{
    ExecutionEvent, ModelConfig, Node, NodeConfig, PromptTextConfig, Provider, TextBlock, UserTier,
    Workflow,
};
use adaptnodes::{read_workflow, InMemoryWorkflowStore, McpToolInvoker, ProviderExecutor};
use adaptruntime::{
    validate_dag, CatalogDecider, ComposeOptions, EngineConfig, ExecuteRequest, ExecutionStrategy,
    FlowRuntime, InferenceDefaults, ModelDecider, ToolRegistry,
};
use adaptselect::{InMemoryHistoryStore, Modality, ModelCatalog, SelectionStrategy, UnifiedRequest};
use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "adapt")]
#[command(about = "Adaptive workflow engine CLI", long_about = None)]
struct Cli {
    /// Engine configuration (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Show debug logs
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a workflow file
    Run {
        /// Path to workflow JSON file
        #[arg(short, long)]
        file: PathBuf,

        /// Input value; parsed as JSON when possible, otherwise a plain string
        #[arg(short, long)]
        input: Option<String>,

        /// Template values for PromptText placeholders, as a JSON object
        #[arg(short, long)]
        runtime_inputs: Option<String>,
    },

    /// Print the provider message a prompt graph composes to
    Compose {
        /// Path to workflow JSON file
        #[arg(short, long)]
        file: PathBuf,

        /// Prompt node to compose
        #[arg(short, long)]
        prompt_id: Option<String>,

        /// Template values for PromptText placeholders, as a JSON object
        #[arg(short, long)]
        runtime_inputs: Option<String>,
    },

    /// Show which model the selector would pick for a message
    Decide {
        /// User message
        #[arg(short, long)]
        message: String,

        /// freemium, pro or enterprise
        #[arg(short, long, default_value = "freemium")]
        tier: String,

        /// Force a modality instead of detecting it
        #[arg(long)]
        modality: Option<String>,

        /// ucb, thompson, pareto, frontier or q-learning
        #[arg(short, long)]
        strategy: Option<String>,

        /// Prefer the premium model for the tier
        #[arg(long)]
        high_quality: bool,
    },

    /// List registered internal tools
    Tools,

    /// Validate a workflow file
    Validate {
        /// Path to workflow JSON file
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Create a new example workflow
    Init {
        /// Output file path
        #[arg(short, long, default_value = "workflow.json")]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .init();

    let config = match &cli.config {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => EngineConfig::default(),
    };

    match cli.command {
        Commands::Run {
            file,
            input,
            runtime_inputs,
        } => {
            run_workflow(&config, &file, input, runtime_inputs).await?;
        }

        Commands::Compose {
            file,
            prompt_id,
            runtime_inputs,
        } => {
            compose_workflow(&config, &file, prompt_id, runtime_inputs)?;
        }

        Commands::Decide {
            message,
            tier,
            modality,
            strategy,
            high_quality,
        } => {
            decide(message, &tier, modality, strategy, high_quality).await?;
        }

        Commands::Tools => {
            list_tools();
        }

        Commands::Validate { file } => {
            validate_workflow(&file)?;
        }

        Commands::Init { output } => {
            create_example_workflow(&output)?;
        }
    }

    Ok(())
}

fn parse_input(raw: Option<String>) -> Value {
    match raw {
        Some(text) => serde_json::from_str(&text).unwrap_or(Value::String(text)),
        None => Value::Null,
    }
}

fn parse_runtime_inputs(raw: Option<String>) -> Result<Map<String, Value>> {
    let Some(text) = raw else {
        return Ok(Map::new());
    };
    match serde_json::from_str(&text).context("runtime inputs must be JSON")? {
        Value::Object(map) => Ok(map),
        _ => bail!("Runtime inputs must be a JSON object"),
    }
}

fn inference_defaults(config: &EngineConfig) -> InferenceDefaults {
    InferenceDefaults {
        ollama_endpoint: config.providers.ollama_endpoint.clone(),
        ..InferenceDefaults::default()
    }
}

fn workflow_id(file: &Path) -> String {
    file.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("workflow")
        .to_string()
}

async fn run_workflow(
    config: &EngineConfig,
    file: &Path,
    input: Option<String>,
    runtime_inputs: Option<String>,
) -> Result<()> {
    println!("🚀 Loading workflow from: {}", file.display());

    let workflow = read_workflow(file)?;
    let strategy = ExecutionStrategy::for_workflow(&workflow);

    println!("📋 Workflow: {}", workflow.name);
    println!("   Nodes: {}", workflow.nodes.len());
    println!("   Edges: {}", workflow.edges.len());
    println!("   Strategy: {}", strategy.as_str());
    println!();

    let id = workflow_id(file);
    let store = Arc::new(InMemoryWorkflowStore::new());
    store.insert(id.clone(), workflow).await;

    let mut registry = ToolRegistry::new();
    adaptnodes::register_all(&mut registry);

    let decider = CatalogDecider::new(
        ModelCatalog::builtin(),
        Arc::new(InMemoryHistoryStore::new()),
    );
    let runtime = FlowRuntime::with_registry(store, Arc::new(registry), config.runtime.clone())
        .with_inference_defaults(inference_defaults(config))
        .with_tool_invoker(Arc::new(McpToolInvoker::new(&config.mcp)))
        .with_message_executor(Arc::new(ProviderExecutor::new(&config.providers)?))
        .with_decider(Arc::new(decider));

    let mut events = runtime.subscribe_events();

    let event_task = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                ExecutionEvent::WorkflowStarted { strategy, .. } => {
                    println!("▶️  Workflow started ({})", strategy);
                }
                ExecutionEvent::NodeStarted {
                    node_id, node_kind, ..
                } => {
                    println!("  ⚡ Starting node: {} ({})", node_id, node_kind);
                }
                ExecutionEvent::NodeCompleted {
                    node_id,
                    duration_ms,
                    ..
                } => {
                    println!("  ✅ Node {} completed in {}ms", node_id, duration_ms);
                }
                ExecutionEvent::ModelSelected {
                    model_key,
                    modality,
                    complexity_score,
                    ..
                } => {
                    println!(
                        "     🧠 Selected {} for {} (complexity {})",
                        model_key, modality, complexity_score
                    );
                }
                ExecutionEvent::WorkflowCompleted {
                    success,
                    duration_ms,
                    ..
                } => {
                    if success {
                        println!("✨ Workflow completed successfully in {}ms", duration_ms);
                    } else {
                        println!("💥 Workflow failed after {}ms", duration_ms);
                    }
                }
            }
        }
    });

    let request = ExecuteRequest {
        workflow_id: id,
        input: parse_input(input),
        runtime_inputs: parse_runtime_inputs(runtime_inputs)?,
        ..ExecuteRequest::default()
    };
    let response = runtime.execute(request).await;

    // Let the printer drain before the summary
    tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
    event_task.abort();

    println!();
    println!("📊 Execution Summary:");
    println!("   Execution ID: {}", response.execution_id);
    println!("   Nodes run: {}", response.execution_log.len());
    println!("   Time: {}ms", response.execution_time_ms);

    if let Some(error) = &response.error {
        println!();
        println!("❌ Error: {}", error);
    }
    if let Some(result) = &response.result {
        println!();
        println!("📤 Result:");
        println!("{}", serde_json::to_string_pretty(result)?);
    }

    if !response.success {
        bail!("workflow execution failed");
    }
    Ok(())
}

fn compose_workflow(
    config: &EngineConfig,
    file: &Path,
    prompt_id: Option<String>,
    runtime_inputs: Option<String>,
) -> Result<()> {
    let workflow = read_workflow(file)?;
    let options = ComposeOptions {
        prompt_id,
        runtime_inputs: parse_runtime_inputs(runtime_inputs)?,
    };

    let compositor = adaptruntime::Compositor::new(inference_defaults(config));
    let message = compositor.compose(&workflow.nodes, &workflow.edges, &options)?;

    println!("{}", serde_json::to_string_pretty(&message)?);
    Ok(())
}

async fn decide(
    message: String,
    tier: &str,
    modality: Option<String>,
    strategy: Option<String>,
    prefer_high_quality: bool,
) -> Result<()> {
    let mut request = UnifiedRequest::new(message);
    request.selection_options.user_tier = serde_json::from_value::<UserTier>(Value::String(tier.to_string()))
        .with_context(|| format!("unknown tier: {}", tier))?;
    request.selection_options.prefer_high_quality = prefer_high_quality;

    if let Some(modality) = modality {
        request.modality_override = Some(modality.parse::<Modality>().map_err(anyhow::Error::msg)?);
    }
    if let Some(name) = strategy {
        let strategy: SelectionStrategy =
            serde_json::from_value(serde_json::json!({ "algorithm": name }))
                .with_context(|| format!("unknown strategy: {}", name))?;
        request.selection_options.strategy = Some(strategy);
    }

    let decider = CatalogDecider::new(
        ModelCatalog::builtin(),
        Arc::new(InMemoryHistoryStore::new()),
    );
    let decision = decider.decide(&request).await?;

    println!("🧠 Model decision:");
    println!("   Model: {}", decision.selected_model.key());
    println!("   Modality: {}", decision.modality);
    println!("   Complexity: {}", decision.complexity_score);
    println!("   Algorithm: {}", decision.signals.algorithm);
    println!("   Estimated cost: ${:.6}", decision.estimated_cost);
    println!("   Reasoning: {}", decision.reasoning);

    Ok(())
}

fn list_tools() {
    println!("📦 Available Tools:");
    println!();

    let mut registry = ToolRegistry::new();
    adaptnodes::register_all(&mut registry);

    for listing in registry.listings() {
        println!("  • {} ({})", listing.name, listing.metadata.category);
        println!("    {}", listing.metadata.description);
        for param in &listing.metadata.params {
            let marker = if param.required { "*" } else { " " };
            println!("      {}{}: {}", marker, param.name, param.description);
        }
    }
}

fn validate_workflow(file: &Path) -> Result<()> {
    println!("🔍 Validating workflow: {}", file.display());

    let workflow = read_workflow(file)?;
    let strategy = ExecutionStrategy::for_workflow(&workflow);

    match strategy {
        ExecutionStrategy::Dag => validate_dag(&workflow)?,
        ExecutionStrategy::PromptModel => {
            adaptruntime::compose(&workflow.nodes, &workflow.edges, &ComposeOptions::default())?;
        }
        ExecutionStrategy::Router => {
            let entries = workflow
                .nodes
                .iter()
                .filter(|n| workflow.incoming(&n.id).next().is_none())
                .count();
            if entries != 1 {
                bail!("Router graphs need exactly one entry node, found {}", entries);
            }
        }
    }

    println!("✅ Workflow is valid:");
    println!("   Name: {}", workflow.name);
    println!("   Nodes: {}", workflow.nodes.len());
    println!("   Edges: {}", workflow.edges.len());
    println!("   Strategy: {}", strategy.as_str());

    Ok(())
}

fn create_example_workflow(output: &Path) -> Result<()> {
    let mut workflow = Workflow::new("Example Prompt Workflow");

    let background = workflow.add_node(
        Node::new(
            "background",
            NodeConfig::Background(TextBlock::new("You are a concise technical writer.")),
        )
        .with_position(100.0, 100.0),
    );
    let question = workflow.add_node(
        Node::new(
            "question",
            NodeConfig::PromptText(
                PromptTextConfig::new("Explain {{topic}} in two sentences.")
                    .with_input("topic", "ownership in Rust"),
            ),
        )
        .with_position(100.0, 250.0),
    );
    let prompt = workflow.add_node(
        Node::new("prompt", NodeConfig::Prompt(Map::new()))
            .with_label("Explain a topic")
            .with_position(350.0, 175.0),
    );
    let model = workflow.add_node(
        Node::new(
            "model",
            NodeConfig::Model(ModelConfig::new(Provider::Ollama, "llama3.2")),
        )
        .with_position(600.0, 175.0),
    );

    workflow.connect(background, prompt.clone());
    workflow.connect(question, prompt.clone());
    workflow.connect(prompt, model);

    let json = serde_json::to_string_pretty(&workflow)?;
    std::fs::write(output, json)?;

    println!("✨ Created example workflow: {}", output.display());
    println!();
    println!("Run it with:");
    println!(
        "  adapt run --file {} --runtime-inputs '{{\"topic\": \"lifetimes\"}}'",
        output.display()
    );

    Ok(())
}
