use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use draw_core::{EventId, ManageView, ParticipantView, Token};
use serde::{Deserialize, Serialize};

pub mod config;
pub mod error;
pub mod shutdown;
pub mod store;

use error::ApiError;
use store::EventStore;

#[derive(Clone, Default)]
pub struct AppState {
    store: EventStore,
}

impl AppState {
    pub fn new(store: EventStore) -> Self {
        Self { store }
    }

    pub async fn with_persistence(path: impl Into<std::path::PathBuf>) -> Self {
        Self::new(EventStore::with_persistence(path).await)
    }

    pub fn store(&self) -> &EventStore {
        &self.store
    }
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/draw", post(create_event))
        .route("/draw/:id/join", post(join_event))
        .route("/draw/:id/manage", get(manage_event))
        .route("/draw/:id/draw", post(run_draw))
        .route("/draw/:id/participant/:token", get(participant_view))
        .with_state(state)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_check() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Deserialize)]
struct CreateEventRequest {
    name: String,
    organizer_name: String,
    #[serde(default)]
    organizer_wish: String,
    expected_participants: Option<usize>,
}

#[derive(Serialize)]
struct CreateEventResponse {
    event_id: EventId,
    organizer_token: Token,
    durable: bool,
}

#[derive(Deserialize)]
struct JoinRequest {
    name: String,
    #[serde(default)]
    wish: String,
}

#[derive(Serialize)]
struct JoinResponse {
    token: Token,
    durable: bool,
}

#[derive(Serialize)]
struct DrawResponse {
    draw_done: bool,
    durable: bool,
}

async fn create_event(
    State(state): State<AppState>,
    Json(payload): Json<CreateEventRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let committed = state
        .store
        .create(
            &payload.name,
            &payload.organizer_name,
            &payload.organizer_wish,
            payload.expected_participants,
        )
        .await?;
    let durable = committed.is_durable();
    let (event_id, organizer_token) = committed.value;

    Ok((
        StatusCode::CREATED,
        Json(CreateEventResponse {
            event_id,
            organizer_token,
            durable,
        }),
    ))
}

async fn join_event(
    State(state): State<AppState>,
    Path(event_id): Path<String>,
    Json(payload): Json<JoinRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let committed = state
        .store
        .join(&event_id, &payload.name, &payload.wish)
        .await?;
    let durable = committed.is_durable();

    Ok(Json(JoinResponse {
        token: committed.value,
        durable,
    }))
}

async fn manage_event(
    State(state): State<AppState>,
    Path(event_id): Path<String>,
) -> Result<Json<ManageView>, ApiError> {
    Ok(Json(state.store.manage_view(&event_id).await?))
}

async fn run_draw(
    State(state): State<AppState>,
    Path(event_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let committed = state.store.run_draw(&event_id).await?;

    Ok(Json(DrawResponse {
        draw_done: true,
        durable: committed.is_durable(),
    }))
}

async fn participant_view(
    State(state): State<AppState>,
    Path((event_id, token)): Path<(String, String)>,
) -> Result<Json<ParticipantView>, ApiError> {
    Ok(Json(state.store.resolve_view(&event_id, &token).await?))
}
