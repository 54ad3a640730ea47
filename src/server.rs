use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse,
    },
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    net::SocketAddr,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::{Duration, SystemTime, UNIX_EPOCH},
};
use tokio::sync::{broadcast, Mutex};
use tokio_stream::{wrappers::BroadcastStream, StreamExt};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::api::{
    ApiEnhanceRequest, ApiEnhanceResponse, ApiError, ApiHistoryResponse, ApiScoreRequest,
};
use post_enhancer::config::EnhancerConfig;
use post_enhancer::{
    Diagnostics, DiagnosticsScorer, EnhanceError, EnhancementOrchestrator, EnhancementPhase, Identity,
};

#[derive(Clone)]
struct AppState {
    orchestrator: Arc<EnhancementOrchestrator>,
    config: Arc<EnhancerConfig>,
    channels: Arc<Mutex<HashMap<String, broadcast::Sender<StreamEvent>>>>,
}

#[derive(Clone, Serialize)]
struct StreamEvent {
    event: String,
    message: String,
    timestamp_ms: u128,
}

#[derive(Deserialize)]
struct StreamQuery {
    request_id: String,
}

#[derive(Deserialize)]
struct HistoryQuery {
    user_id: Option<String>,
}

static REQUEST_COUNTER: AtomicUsize = AtomicUsize::new(0);

/// How long a finished enhancement keeps its progress channel.
const CHANNEL_GRACE: Duration = Duration::from_secs(10);
/// How long a stream-opened channel waits for its enhancement.
const STREAM_WINDOW: Duration = Duration::from_secs(120);

pub async fn serve(args: crate::ServeArgs, config: EnhancerConfig) -> Result<(), String> {
    let orchestrator = EnhancementOrchestrator::from_config(&config, args.offline)?;
    let state = AppState {
        orchestrator: Arc::new(orchestrator),
        config: Arc::new(config),
        channels: Arc::new(Mutex::new(HashMap::new())),
    };

    let app = Router::new()
        .route("/api/health", get(health))
        .route("/api/enhance", post(enhance_handler))
        .route("/api/enhance/stream", get(stream_handler))
        .route("/api/score", post(score_handler))
        .route("/api/history", get(history_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr: SocketAddr = format!("{}:{}", args.host, args.port)
        .parse()
        .map_err(|err| format!("invalid bind address: {}", err))?;

    info!("listening on {}", addr);
    axum::serve(tokio::net::TcpListener::bind(addr).await.map_err(|err| {
        format!("failed to bind server: {}", err)
    })?, app)
    .await
    .map_err(|err| format!("server error: {}", err))?;

    Ok(())
}

async fn health() -> impl IntoResponse {
    StatusCode::OK
}

fn identity_for(config: &EnhancerConfig, user_id: Option<String>) -> Identity {
    match user_id.filter(|id| !id.trim().is_empty()) {
        Some(id) if config.usage.is_admin(&id) => Identity::admin(id),
        Some(id) => Identity::user(id),
        None => Identity::guest(),
    }
}

fn error_status(err: &EnhanceError) -> StatusCode {
    match err {
        EnhanceError::Validation(_) => StatusCode::BAD_REQUEST,
        EnhanceError::UsageLimitReached { .. } => StatusCode::PAYMENT_REQUIRED,
        EnhanceError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

async fn enhance_handler(
    State(state): State<AppState>,
    Json(request): Json<ApiEnhanceRequest>,
) -> Result<Json<ApiEnhanceResponse>, (StatusCode, Json<ApiError>)> {
    let request_id = request
        .request_id
        .clone()
        .unwrap_or_else(generate_request_id);
    let identity = identity_for(&state.config, request.user_id.clone());
    let enhancement = request
        .into_request()
        .map_err(|err| (StatusCode::BAD_REQUEST, Json(ApiError::from(err))))?;

    let sender = get_or_create_channel(&state, &request_id).await;
    let observer_sender = sender.clone();
    let observer = move |phase: EnhancementPhase| {
        send_event(&observer_sender, phase.label(), phase_message(phase));
    };

    let outcome = state
        .orchestrator
        .enhance_observed(&identity, &enhancement, &observer)
        .await;
    schedule_cleanup(state.channels.clone(), request_id.clone(), CHANNEL_GRACE);

    match outcome {
        Ok(result) => Ok(Json(ApiEnhanceResponse::from_result(result, request_id))),
        Err(err) => {
            send_event(&sender, "error", err.code());
            Err((error_status(&err), Json(ApiError::from(&err))))
        }
    }
}

async fn score_handler(
    Json(request): Json<ApiScoreRequest>,
) -> Result<Json<Diagnostics>, (StatusCode, Json<ApiError>)> {
    let (text, category, tone) = request
        .into_parts()
        .map_err(|err| (StatusCode::BAD_REQUEST, Json(ApiError::from(err))))?;
    Ok(Json(DiagnosticsScorer::score(&text, category, tone, None)))
}

async fn history_handler(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> Json<ApiHistoryResponse> {
    let identity = identity_for(&state.config, query.user_id);
    let records = state.orchestrator.history(&identity).await;
    Json(ApiHistoryResponse { records })
}

async fn stream_handler(
    State(state): State<AppState>,
    Query(query): Query<StreamQuery>,
) -> Result<Sse<impl tokio_stream::Stream<Item = Result<Event, std::convert::Infallible>>>, StatusCode>
{
    let sender = get_or_create_channel(&state, &query.request_id).await;
    let receiver = sender.subscribe();
    // Channels opened by a stream that never sees an enhancement are reclaimed too.
    schedule_cleanup(state.channels.clone(), query.request_id.clone(), STREAM_WINDOW);
    let stream = BroadcastStream::new(receiver).filter_map(|event| {
        match event {
            Ok(event) => {
                let data = serde_json::to_string(&event).unwrap_or_default();
                Some(Ok(Event::default().data(data)))
            }
            Err(_) => None,
        }
    });

    send_event(&sender, "connected", "Streaming enhancement progress");
    Ok(Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(8))))
}

fn phase_message(phase: EnhancementPhase) -> &'static str {
    match phase {
        EnhancementPhase::CheckingEntitlement => "Checking usage allowance",
        EnhancementPhase::CacheHit => "Reusing a recent identical enhancement",
        EnhancementPhase::Generating => "Generating platform variants",
        EnhancementPhase::FallbackGenerating => "Remote generation unavailable, writing variants locally",
        EnhancementPhase::Scoring => "Scoring virality",
        EnhancementPhase::Persisting => "Saving to history",
        EnhancementPhase::Done => "Enhancement complete",
    }
}

async fn get_or_create_channel(
    state: &AppState,
    request_id: &str,
) -> broadcast::Sender<StreamEvent> {
    let mut guard = state.channels.lock().await;
    if let Some(sender) = guard.get(request_id) {
        return sender.clone();
    }
    let (sender, _) = broadcast::channel(32);
    guard.insert(request_id.to_string(), sender.clone());
    sender
}

fn send_event(sender: &broadcast::Sender<StreamEvent>, event: &str, message: &str) {
    let _ = sender.send(StreamEvent {
        event: event.to_string(),
        message: message.to_string(),
        timestamp_ms: now_ms(),
    });
}

fn schedule_cleanup(
    channels: Arc<Mutex<HashMap<String, broadcast::Sender<StreamEvent>>>>,
    request_id: String,
    after: Duration,
) {
    tokio::spawn(async move {
        tokio::time::sleep(after).await;
        let mut guard = channels.lock().await;
        guard.remove(&request_id);
    });
}

fn generate_request_id() -> String {
    let counter = REQUEST_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("req-{}-{}", now_ms(), counter)
}

fn now_ms() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_millis())
        .unwrap_or(0)
}
