use actix_cors::Cors;
use actix_web::{get, post, web, App, HttpResponse, HttpServer, Responder, Result as ActixResult};
use actix_ws::Message;
use adaptcore::{Edge, Node, Workflow};
use adaptnodes::{
    FixedWindowRateLimiter, InMemoryWorkflowStore, McpToolInvoker, ProviderExecutor,
    StaticTierResolver,
};
use adaptruntime::{
    CatalogDecider, ComposeOptions, Compositor, EngineConfig, ExecuteRequest, FlowRuntime,
    InferenceDefaults, ModelDecider, ToolRegistry, UnifiedAgent,
};
use adaptselect::{InMemoryHistoryStore, ModelCatalog, UnifiedRequest};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Application state shared across handlers
struct AppState {
    runtime: Arc<FlowRuntime>,
    agent: Arc<UnifiedAgent>,
    decider: Arc<CatalogDecider>,
    store: Arc<InMemoryWorkflowStore>,
    compositor: Compositor,
}

/// Request body for ad-hoc composition
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ComposeRequest {
    nodes: Vec<Node>,
    #[serde(default)]
    edges: Vec<Edge>,
    #[serde(default)]
    prompt_id: Option<String>,
    #[serde(default)]
    runtime_inputs: Map<String, Value>,
}

/// Request body for the unified chat endpoint
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChatRequest {
    user_id: String,
    #[serde(flatten)]
    request: UnifiedRequest,
}

/// Error response
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

impl ErrorResponse {
    fn new(error: impl ToString) -> Self {
        Self {
            error: error.to_string(),
        }
    }
}

/// Health check endpoint
#[get("/health")]
async fn health_check() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "adaptserver"
    }))
}

/// List stored workflow ids
#[get("/api/workflows")]
async fn list_workflows(data: web::Data<AppState>) -> ActixResult<impl Responder> {
    Ok(HttpResponse::Ok().json(data.store.ids().await))
}

/// Store a workflow under an id, replacing any previous version
#[post("/api/workflows/{id}")]
async fn put_workflow(
    data: web::Data<AppState>,
    path: web::Path<String>,
    workflow: web::Json<Workflow>,
) -> ActixResult<impl Responder> {
    let id = path.into_inner();
    let workflow = workflow.into_inner();

    info!(workflow = %id, nodes = workflow.nodes.len(), "Storing workflow");
    data.store.insert(id.clone(), workflow).await;

    Ok(HttpResponse::Created().json(serde_json::json!({
        "id": id,
        "message": "Workflow stored"
    })))
}

#[get("/api/workflows/{id}")]
async fn get_workflow(
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> ActixResult<impl Responder> {
    use adaptcore::WorkflowStore;

    let id = path.into_inner();
    match data.store.get_workflow(&id).await {
        Some(workflow) => Ok(HttpResponse::Ok().json(workflow)),
        None => Ok(HttpResponse::NotFound().json(ErrorResponse::new(format!(
            "Workflow {} not found",
            id
        )))),
    }
}

/// Execute a stored workflow
#[post("/api/workflows/{id}/execute")]
async fn execute_workflow(
    data: web::Data<AppState>,
    path: web::Path<String>,
    req: web::Json<ExecuteRequest>,
) -> ActixResult<impl Responder> {
    let mut request = req.into_inner();
    request.workflow_id = path.into_inner();

    info!(workflow = %request.workflow_id, "Executing workflow");
    let workflow_id = request.workflow_id.clone();
    let response = data.runtime.execute(request).await;

    if response.success {
        info!(
            workflow = %workflow_id,
            nodes = response.execution_log.len(),
            duration_ms = response.execution_time_ms,
            "Workflow completed"
        );
        Ok(HttpResponse::Ok().json(response))
    } else {
        error!(
            workflow = %workflow_id,
            error = response.error.as_deref().unwrap_or_default(),
            "Workflow execution failed"
        );
        Ok(HttpResponse::InternalServerError().json(response))
    }
}

/// Compose a provider message from a posted graph without calling a provider
#[post("/api/compose")]
async fn compose_message(
    data: web::Data<AppState>,
    req: web::Json<ComposeRequest>,
) -> ActixResult<impl Responder> {
    let req = req.into_inner();
    let options = ComposeOptions {
        prompt_id: req.prompt_id,
        runtime_inputs: req.runtime_inputs,
    };

    match data.compositor.compose(&req.nodes, &req.edges, &options) {
        Ok(message) => Ok(HttpResponse::Ok().json(message)),
        Err(e) => Ok(HttpResponse::BadRequest().json(ErrorResponse::new(e))),
    }
}

/// Model decision for a message, without executing it
#[post("/api/decide")]
async fn decide_model(
    data: web::Data<AppState>,
    req: web::Json<UnifiedRequest>,
) -> ActixResult<impl Responder> {
    let request = req.into_inner();
    match data.decider.decide(&request).await {
        Ok(decision) => Ok(HttpResponse::Ok().json(decision)),
        Err(e) => Ok(HttpResponse::UnprocessableEntity().json(ErrorResponse::new(e))),
    }
}

/// Single-call agent: decide, compose, rate-limit, execute, learn
#[post("/api/chat")]
async fn chat(data: web::Data<AppState>, req: web::Json<ChatRequest>) -> ActixResult<impl Responder> {
    let ChatRequest { user_id, request } = req.into_inner();
    let response = data.agent.handle(&user_id, request).await;

    if response.success {
        return Ok(HttpResponse::Ok().json(response));
    }
    if let Some(retry_after) = response.retry_after_secs {
        warn!(user = %user_id, retry_after, "Chat request rate limited");
        return Ok(HttpResponse::TooManyRequests()
            .insert_header(("Retry-After", retry_after.to_string()))
            .json(response));
    }
    Ok(HttpResponse::BadGateway().json(response))
}

/// WebSocket endpoint for real-time events
#[get("/api/events")]
async fn websocket_events(
    req: actix_web::HttpRequest,
    stream: web::Payload,
    data: web::Data<AppState>,
) -> ActixResult<HttpResponse> {
    let (res, mut session, mut msg_stream) = actix_ws::handle(&req, stream)?;

    info!("WebSocket client connected");

    let mut events = data.runtime.subscribe_events();

    actix_web::rt::spawn(async move {
        loop {
            tokio::select! {
                event = events.recv() => {
                    match event {
                        Ok(event) => {
                            if let Ok(json) = serde_json::to_string(&event) {
                                if session.text(json).await.is_err() {
                                    break;
                                }
                            }
                        }
                        Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                            warn!(skipped, "WebSocket client lagging behind events");
                        }
                        Err(_) => break,
                    }
                }

                Some(Ok(msg)) = msg_stream.recv() => {
                    match msg {
                        Message::Ping(bytes) => {
                            if session.pong(&bytes).await.is_err() {
                                break;
                            }
                        }
                        Message::Close(_) => break,
                        _ => {}
                    }
                }

                else => break,
            }
        }

        info!("WebSocket client disconnected");
        let _ = session.close(None).await;
    });

    Ok(res)
}

/// List registered internal tools
#[get("/api/tools")]
async fn list_tools(data: web::Data<AppState>) -> ActixResult<impl Responder> {
    Ok(HttpResponse::Ok().json(data.runtime.registry().listings()))
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("🚀 Starting adaptive workflow server");

    let config = match std::env::var("ADAPT_CONFIG") {
        Ok(path) => EngineConfig::load(&PathBuf::from(path))?,
        Err(_) => EngineConfig::default(),
    };

    let store = Arc::new(match &config.workflows_dir {
        Some(dir) => InMemoryWorkflowStore::load_dir(dir)?,
        None => InMemoryWorkflowStore::new(),
    });

    let mut registry = ToolRegistry::new();
    adaptnodes::register_all(&mut registry);

    let defaults = InferenceDefaults {
        ollama_endpoint: config.providers.ollama_endpoint.clone(),
        ..InferenceDefaults::default()
    };
    let provider = Arc::new(ProviderExecutor::new(&config.providers)?);
    let decider = Arc::new(CatalogDecider::new(
        ModelCatalog::builtin(),
        Arc::new(InMemoryHistoryStore::new()),
    ));

    let runtime = FlowRuntime::with_registry(store.clone(), Arc::new(registry), config.runtime.clone())
        .with_inference_defaults(defaults.clone())
        .with_tool_invoker(Arc::new(McpToolInvoker::new(&config.mcp)))
        .with_message_executor(provider.clone())
        .with_decider(decider.clone());

    let agent = UnifiedAgent::new(
        decider.clone(),
        provider,
        Arc::new(StaticTierResolver::new(config.tiers.clone())),
        Arc::new(FixedWindowRateLimiter::new(config.rate_limits.clone())),
    )
    .with_compositor(Compositor::new(defaults.clone()))
    .with_event_bus(runtime.event_bus().clone());

    info!(tools = runtime.registry().len(), "✅ Runtime initialized with standard tools");

    let app_state = web::Data::new(AppState {
        runtime: Arc::new(runtime),
        agent: Arc::new(agent),
        decider,
        store,
        compositor: Compositor::new(defaults),
    });

    let bind_address =
        std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".to_string());

    info!("🌐 Server starting on http://{}", bind_address);

    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .app_data(app_state.clone())
            .wrap(cors)
            .wrap(actix_web::middleware::Logger::default())
            .service(health_check)
            .service(list_workflows)
            .service(put_workflow)
            .service(get_workflow)
            .service(execute_workflow)
            .service(compose_message)
            .service(decide_model)
            .service(chat)
            .service(websocket_events)
            .service(list_tools)
    })
    .bind(&bind_address)?
    .run()
    .await?;

    Ok(())
}
