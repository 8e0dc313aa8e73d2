use axum::{
    extract::{multipart::MultipartError, DefaultBodyLimit, Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use serde_json::json;
use std::{collections::HashMap, sync::Arc, time::Duration};
use tokio::time::Instant;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use uuid::Uuid;

use crate::{
    models::AnalysisRequest,
    pipeline::{AnalyzeError, ProductAnalyzer},
    view::AnalysisView,
};

#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<Sessions>,
    pub analyzer: Arc<ProductAnalyzer>,
}

impl AppState {
    pub fn new(analyzer: ProductAnalyzer, sessions: Sessions) -> Self {
        Self { sessions: Arc::new(sessions), analyzer: Arc::new(analyzer) }
    }
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct AnalyzeResponse {
    #[serde(flatten)]
    pub view: AnalysisView,
    pub session_id: Option<Uuid>,
    pub sequence: Option<u64>,
    /// A newer request for the same session started before this one finished.
    pub superseded: bool,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug)]
struct SessionSlot {
    latest_started: u64,
    latest: Option<AnalyzeResponse>,
    touched: Instant,
}

#[derive(Debug, Default)]
struct SessionTable {
    next_sequence: u64,
    slots: HashMap<Uuid, SessionSlot>,
}

/// Per-session request ordering: only the most recently started request may
/// publish its result, whatever order the requests finish in.
///
/// Session ids come from clients, so idle slots expire after `ttl` and at most
/// `max_sessions` are held. Sequence numbers are drawn from one counter, so a
/// session that was evicted and comes back never reuses a number.
#[derive(Debug)]
pub struct Sessions {
    table: RwLock<SessionTable>,
    ttl: Duration,
    max_sessions: usize,
}

impl Sessions {
    pub fn new(ttl: Duration, max_sessions: usize) -> Self {
        Self {
            table: RwLock::default(),
            ttl,
            max_sessions: max_sessions.max(1),
        }
    }

    /// Register a new request and return its sequence number.
    pub fn begin(&self, session: Uuid) -> u64 {
        let now = Instant::now();
        let mut table = self.table.write();
        self.evict(&mut table.slots, session, now);

        table.next_sequence += 1;
        let sequence = table.next_sequence;
        let slot = table.slots.entry(session).or_insert(SessionSlot {
            latest_started: 0,
            latest: None,
            touched: now,
        });
        slot.latest_started = sequence;
        slot.latest = None;
        slot.touched = now;
        sequence
    }

    fn evict(&self, slots: &mut HashMap<Uuid, SessionSlot>, incoming: Uuid, now: Instant) {
        let before = slots.len();
        slots.retain(|_, slot| now.duration_since(slot.touched) < self.ttl);

        if !slots.contains_key(&incoming) {
            while slots.len() >= self.max_sessions {
                let oldest = slots.iter().min_by_key(|(_, slot)| slot.touched).map(|(id, _)| *id);
                match oldest {
                    Some(id) => slots.remove(&id),
                    None => break,
                };
            }
        }

        let evicted = before - slots.len();
        if evicted > 0 {
            tracing::debug!(evicted, remaining = slots.len(), "Evicted idle sessions");
        }
    }

    /// Store `response` unless a newer request has started. Returns whether it was stored.
    pub fn publish(&self, session: Uuid, sequence: u64, response: &AnalyzeResponse) -> bool {
        let mut table = self.table.write();
        match table.slots.get_mut(&session) {
            Some(slot) if slot.latest_started == sequence => {
                slot.latest = Some(response.clone());
                slot.touched = Instant::now();
                true
            }
            _ => false,
        }
    }

    pub fn latest(&self, session: Uuid) -> Option<AnalyzeResponse> {
        self.table.read().slots.get(&session).and_then(|slot| slot.latest.clone())
    }

    #[cfg(test)]
    fn tracked(&self) -> usize {
        self.table.read().slots.len()
    }
}

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Upload(MultipartError),
    Analyze(AnalyzeError),
}

impl From<AnalyzeError> for ApiError {
    fn from(e: AnalyzeError) -> Self {
        ApiError::Analyze(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind, message) = match &self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.clone()),
            ApiError::Upload(e) if e.status() == StatusCode::PAYLOAD_TOO_LARGE => {
                (StatusCode::PAYLOAD_TOO_LARGE, "payload_too_large", e.body_text())
            }
            ApiError::Upload(e) => (e.status(), "bad_request", e.body_text()),
            ApiError::Analyze(e @ AnalyzeError::Image(_)) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "image", e.user_message().to_string())
            }
            ApiError::Analyze(e @ AnalyzeError::Transport(_)) => {
                (StatusCode::BAD_GATEWAY, "transport", e.user_message().to_string())
            }
        };
        (status, Json(json!({ "error": kind, "message": message }))).into_response()
    }
}

pub fn app(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/analyze", post(analyze))
        .route("/api/sessions/:id/latest", get(latest_for_session))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods(Any)
                        .allow_headers(Any),
                )
                .layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .with_state(state)
}

pub async fn health() -> &'static str {
    "ok"
}

struct AnalyzeForm {
    query: Option<String>,
    image: Option<Bytes>,
    session_id: Option<Uuid>,
}

async fn read_form(mut multipart: Multipart) -> Result<AnalyzeForm, ApiError> {
    let mut form = AnalyzeForm { query: None, image: None, session_id: None };
    let bad = ApiError::Upload;

    while let Some(field) = multipart.next_field().await.map_err(bad)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "query" => form.query = Some(field.text().await.map_err(bad)?),
            "image" => form.image = Some(field.bytes().await.map_err(bad)?),
            "session_id" => {
                let raw = field.text().await.map_err(bad)?;
                let id = Uuid::parse_str(raw.trim())
                    .map_err(|_| ApiError::BadRequest(format!("invalid session_id: {raw:?}")))?;
                form.session_id = Some(id);
            }
            other => tracing::debug!("Ignoring unknown form field {:?}", other),
        }
    }
    Ok(form)
}

pub async fn analyze(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<AnalyzeResponse>, ApiError> {
    let form = read_form(multipart).await?;
    let request = AnalysisRequest::new(form.query, form.image);
    if request.is_empty() {
        return Err(ApiError::BadRequest("provide a query, an image, or both".into()));
    }

    let sequence = form.session_id.map(|id| state.sessions.begin(id));
    tracing::info!(session = ?form.session_id, ?sequence, "🎯 Analysis requested");

    let result = state.analyzer.analyze(request).await?;

    let mut response = AnalyzeResponse {
        view: AnalysisView::from(&result),
        session_id: form.session_id,
        sequence,
        superseded: false,
        completed_at: Utc::now(),
    };

    if let (Some(id), Some(seq)) = (form.session_id, sequence) {
        if !state.sessions.publish(id, seq, &response) {
            tracing::info!(session = %id, sequence = seq, "Discarding stale result, a newer request was started");
            response.superseded = true;
        }
    }

    Ok(Json(response))
}

pub async fn latest_for_session(Path(id): Path<Uuid>, State(state): State<AppState>) -> Response {
    match state.sessions.latest(id) {
        Some(r) => Json(r).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}
