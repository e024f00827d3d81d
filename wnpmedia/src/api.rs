//! Handlers HTTP de l'API média
//!
//! Routes montées par [`crate::MediaApiExt`] :
//!
//! - `GET /api/media/detect` et `GET /api/media/status` : état courant
//! - `POST /api/media/control` : commande de lecture
//! - `GET /health` : état du pont
//! - `GET /` : dashboard HTML
//!
//! Toutes les réponses JSON suivent l'enveloppe `{success, error|message, data?}`.

use crate::snapshot::{MediaSnapshot, SnapshotStore};
use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};
use wnpsource::{MediaCommand, MediaSource, SourceError};

pub const NO_MEDIA_ERROR: &str = "No media detected";
pub const DASHBOARD_NOT_FOUND: &str = "Dashboard not found";

const DEFAULT_SEEK_POSITION: f64 = 0.0;
const DEFAULT_VOLUME: f64 = 50.0;

/// État partagé des handlers
#[derive(Clone)]
pub struct MediaApiState {
    pub store: SnapshotStore,
    pub source: Arc<dyn MediaSource>,
    /// Document servi sur `/`
    pub dashboard: PathBuf,
}

impl MediaApiState {
    pub fn new(store: SnapshotStore, source: Arc<dyn MediaSource>, dashboard: impl Into<PathBuf>) -> Self {
        Self {
            store,
            source,
            dashboard: dashboard.into(),
        }
    }
}

// ============================================================================
// DTOs
// ============================================================================

/// Métadonnées du média courant
#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MediaData {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub source: String,
    pub url: Option<String>,
    /// `"playing"` ou `"paused"`
    pub playback_state: String,
    pub artwork: Option<String>,
    pub supports_control: bool,
    pub is_playing: bool,
    pub duration: f64,
    pub position: f64,
    pub volume: u8,
    pub player: Option<String>,
}

impl From<&MediaSnapshot> for MediaData {
    fn from(snapshot: &MediaSnapshot) -> Self {
        let is_playing = snapshot.is_playing();
        Self {
            title: snapshot.title.clone(),
            artist: snapshot.artist.clone(),
            album: snapshot.album.clone(),
            source: snapshot.source.to_string(),
            url: None,
            playback_state: if is_playing { "playing" } else { "paused" }.to_string(),
            artwork: snapshot.cover.clone(),
            supports_control: true,
            is_playing,
            duration: snapshot.duration,
            position: snapshot.position,
            volume: snapshot.volume,
            player: snapshot.player.clone(),
        }
    }
}

/// Réponse de `/api/media/detect` et `/api/media/status`
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct MediaResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub data: Option<MediaData>,
}

/// Corps de `/api/media/control`
#[derive(Debug, Default, Deserialize, utoipa::ToSchema)]
pub struct ControlRequest {
    /// play, pause, toggle, next, previous, seek ou volume
    #[schema(value_type = String)]
    pub action: Option<Value>,
    /// Position cible en secondes (seek, défaut 0)
    #[schema(value_type = f64)]
    pub position: Option<Value>,
    /// Volume cible en pourcentage (volume, défaut 50)
    #[schema(value_type = f64)]
    pub volume: Option<Value>,
}

/// Lit un argument numérique ; seule l'action qui l'utilise le consulte
fn number_or(value: &Option<Value>, default: f64) -> f64 {
    value.as_ref().and_then(Value::as_f64).unwrap_or(default)
}

impl ControlRequest {
    /// Nom de l'action tel qu'il apparaît dans les messages
    fn action_name(&self) -> String {
        match &self.action {
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => "null".to_string(),
        }
    }

    /// Traduit la requête en commande pour l'adaptateur
    pub fn command(&self) -> Result<MediaCommand, ApiError> {
        let action = self.action_name();
        let command = match action.as_str() {
            "play" => MediaCommand::Play,
            "pause" => MediaCommand::Pause,
            "toggle" => MediaCommand::Toggle,
            "next" => MediaCommand::Next,
            "previous" => MediaCommand::Previous,
            "seek" => MediaCommand::Seek(number_or(&self.position, DEFAULT_SEEK_POSITION).max(0.0)),
            "volume" => {
                let volume = number_or(&self.volume, DEFAULT_VOLUME).round().clamp(0.0, 100.0);
                MediaCommand::Volume(volume as u8)
            }
            _ => return Err(ApiError::UnknownAction(action)),
        };
        Ok(command)
    }
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ControlResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}

/// Résultat du dernier relevé de l'adaptateur
#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PollReport {
    pub ok: bool,
    pub error: Option<String>,
    pub consecutive_failures: u32,
    pub last_success: Option<i64>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    /// Horodatage RFC 3339
    pub timestamp: String,
    pub has_media: bool,
    pub adapter: String,
    pub last_poll: PollReport,
}

// ============================================================================
// ERREURS
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Unknown action: {0}")]
    UnknownAction(String),

    #[error("{0}")]
    InvalidBody(String),

    #[error(transparent)]
    Source(#[from] SourceError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::UnknownAction(_) => StatusCode::BAD_REQUEST,
            ApiError::InvalidBody(_) | ApiError::Source(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status(),
            Json(ErrorResponse {
                success: false,
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}

// ============================================================================
// HANDLERS
// ============================================================================

fn media_response(store: &SnapshotStore) -> MediaResponse {
    let snapshot = store.read();
    if snapshot.has_media() {
        debug!(
            "✅ [API] Returning WebNowPlaying data: {:?} by {:?}",
            snapshot.title, snapshot.artist
        );
        MediaResponse {
            success: true,
            error: None,
            data: Some(MediaData::from(&*snapshot)),
        }
    } else {
        debug!("❌ [API] No media data from WebNowPlaying");
        MediaResponse {
            success: false,
            error: Some(NO_MEDIA_ERROR.to_string()),
            data: None,
        }
    }
}

/// GET /api/media/detect - Média en cours de lecture
#[utoipa::path(
    get,
    path = "/api/media/detect",
    responses(
        (status = 200, description = "Média courant, ou success=false si aucun média", body = MediaResponse)
    ),
    tag = "media"
)]
pub async fn detect(State(state): State<MediaApiState>) -> Json<MediaResponse> {
    debug!("🔍 [API] Media detection requested");
    Json(media_response(&state.store))
}

/// GET /api/media/status - Alias de detect
#[utoipa::path(
    get,
    path = "/api/media/status",
    responses(
        (status = 200, description = "Média courant, ou success=false si aucun média", body = MediaResponse)
    ),
    tag = "media"
)]
pub async fn status(State(state): State<MediaApiState>) -> Json<MediaResponse> {
    debug!("🔍 [API] Media status requested");
    Json(media_response(&state.store))
}

/// POST /api/media/control - Envoie une commande à l'extension
///
/// La commande est transmise sans attendre d'effet : l'état renvoyé par
/// `detect` ne change qu'au relevé suivant.
#[utoipa::path(
    post,
    path = "/api/media/control",
    request_body = ControlRequest,
    responses(
        (status = 200, description = "Commande transmise", body = ControlResponse),
        (status = 400, description = "Action inconnue", body = ErrorResponse),
        (status = 500, description = "Corps invalide ou échec de l'adaptateur", body = ErrorResponse)
    ),
    tag = "media"
)]
pub async fn control(
    State(state): State<MediaApiState>,
    body: Bytes,
) -> Result<Json<ControlResponse>, ApiError> {
    let request: ControlRequest = serde_json::from_slice(&body).map_err(|e| {
        warn!("❌ [API] Error processing control command: {}", e);
        ApiError::InvalidBody(e.to_string())
    })?;

    let command = request.command()?;
    info!("🎮 [API] Control command received: {:?}", command);

    state.source.send(&command).map_err(|e| {
        warn!("❌ [API] Error processing control command: {}", e);
        ApiError::from(e)
    })?;

    Ok(Json(ControlResponse {
        success: true,
        message: format!(
            "✅ WebNowPlaying control command sent: {}",
            command.action()
        ),
    }))
}

/// GET /health - État du pont
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Le pont répond", body = HealthResponse)
    ),
    tag = "media"
)]
pub async fn health(State(state): State<MediaApiState>) -> Json<HealthResponse> {
    let poll = state.store.poll_status();
    Json(HealthResponse {
        status: "ok".to_string(),
        timestamp: Utc::now().to_rfc3339(),
        has_media: state.store.read().has_media(),
        adapter: state.source.name().to_string(),
        last_poll: PollReport {
            ok: poll.ok,
            error: poll.last_error,
            consecutive_failures: poll.consecutive_failures,
            last_success: poll.last_success,
        },
    })
}

/// GET / - Dashboard HTML, relu à chaque requête
pub async fn dashboard(State(state): State<MediaApiState>) -> Response {
    match tokio::fs::read_to_string(&state.dashboard).await {
        Ok(html) => Html(html).into_response(),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %state.dashboard.display(), "Dashboard file not found");
            (StatusCode::NOT_FOUND, DASHBOARD_NOT_FOUND).into_response()
        }
        Err(e) => {
            warn!(path = %state.dashboard.display(), "Cannot read dashboard: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Cannot read dashboard: {}", e),
            )
                .into_response()
        }
    }
}

/// Routes montées sous `/api/media`
pub fn create_media_router(state: MediaApiState) -> Router {
    Router::new()
        .route("/detect", get(detect))
        .route("/status", get(status))
        .route("/control", post(control))
        .with_state(state)
}

/// Routes montées à la racine
pub fn create_root_router(state: MediaApiState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/", get(dashboard))
        .with_state(state)
}
