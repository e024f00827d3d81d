//! # wnpmedia
//!
//! Cœur de WNPBridge : l'enregistrement partagé du dernier état du lecteur
//! ([`SnapshotStore`]), la boucle qui le tient à jour ([`Poller`]) et l'API
//! HTTP qui le lit ou transmet des commandes à l'adaptateur.
//!
//! ```text
//! MediaSource ──(tick / changement)──> SnapshotStore ──> handlers HTTP
//! handlers HTTP ──(commande)──> MediaSource
//! ```
//!
//! ## Intégration serveur
//!
//! ```rust,ignore
//! use wnpmedia::{MediaApiExt, MediaApiState, SnapshotStore};
//!
//! let store = SnapshotStore::new();
//! let state = MediaApiState::new(store.clone(), source.clone(), "media-dashboard.html");
//! server.init_media_api(state).await?;
//! ```

pub mod api;
pub mod bridge;
pub mod openapi;
pub mod poller;
pub mod snapshot;

pub use api::MediaApiState;
pub use bridge::{Bridge, BridgeSettings};
pub use openapi::MediaApiDoc;
pub use poller::Poller;
pub use snapshot::{MediaSnapshot, PollStatus, SnapshotStore};

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use utoipa::OpenApi;
use wnpserver::Server;
use wnpsource::{SourceLogLevel, SourceLogger};

/// Trait d'extension pour ajouter l'API média à wnpserver
#[async_trait]
pub trait MediaApiExt {
    /// Enregistre les routes HTTP du pont
    ///
    /// # Routes enregistrées
    ///
    /// - `GET /api/media/detect`, `GET /api/media/status`
    /// - `POST /api/media/control`
    /// - `GET /health`
    /// - `GET /` (dashboard)
    /// - `GET /swagger-ui/media` - Documentation interactive Swagger
    async fn init_media_api(&mut self, state: MediaApiState) -> Result<()>;
}

#[async_trait]
impl MediaApiExt for Server {
    async fn init_media_api(&mut self, state: MediaApiState) -> Result<()> {
        let api_router = api::create_media_router(state.clone());
        self.add_openapi(api_router, MediaApiDoc::openapi(), "media")
            .await;
        self.add_router(api::create_root_router(state)).await;
        Ok(())
    }
}

/// Callback de log de l'adaptateur, relayé vers `tracing`
pub fn tracing_logger() -> SourceLogger {
    Arc::new(|level: SourceLogLevel, message: &str| match level {
        SourceLogLevel::Debug => tracing::debug!(target: "wnpsource", "{}", message),
        SourceLogLevel::Info => tracing::info!(target: "wnpsource", "{}", message),
        SourceLogLevel::Warn => tracing::warn!(target: "wnpsource", "{}", message),
        SourceLogLevel::Error => tracing::error!(target: "wnpsource", "{}", message),
    })
}
