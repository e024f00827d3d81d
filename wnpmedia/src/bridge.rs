//! Démarrage et arrêt ordonnés du pont
//!
//! 1. L'adaptateur démarre en premier ; un échec est fatal et aucun socket
//!    HTTP n'est ouvert.
//! 2. Le serveur HTTP monte l'API média puis écoute.
//! 3. La boucle de relevé tourne sur un jeton enfant de celui du serveur.
//!
//! L'arrêt suit l'ordre inverse : boucle, adaptateur, serveur.

use crate::{MediaApiExt, MediaApiState, Poller, SnapshotStore, tracing_logger};
use anyhow::Result;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use wnpconfig::Config;
use wnpserver::{Server, ServerBuilder};
use wnpsource::MediaSource;

/// Paramètres du pont, lus dans la configuration
#[derive(Debug, Clone)]
pub struct BridgeSettings {
    pub adapter_port: u16,
    pub adapter_version: String,
    pub bind_address: IpAddr,
    pub http_port: u16,
    pub cors: bool,
    pub poll_interval: Duration,
    pub dashboard: PathBuf,
}

impl BridgeSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            adapter_port: config.get_adapter_port(),
            adapter_version: config.get_adapter_version(),
            bind_address: config.get_bind_address(),
            http_port: config.get_http_port(),
            cors: config.get_cors_enabled().unwrap_or(true),
            poll_interval: config.get_poll_interval(),
            dashboard: config.get_dashboard_path(),
        }
    }
}

/// Pont démarré : serveur à l'écoute et boucle de relevé en cours
pub struct Bridge {
    source: Arc<dyn MediaSource>,
    server: Server,
    poller: JoinHandle<()>,
    addr: SocketAddr,
}

impl Bridge {
    pub async fn start(source: Arc<dyn MediaSource>, settings: &BridgeSettings) -> Result<Self> {
        if settings.adapter_port == settings.http_port {
            warn!(
                "⚠️ Adapter port and HTTP port are both {}, one of them will fail to bind",
                settings.http_port
            );
        }

        info!(
            "🔌 Starting WebNowPlaying connection on port {}...",
            settings.adapter_port
        );
        if let Err(e) = source
            .start(
                settings.adapter_port,
                &settings.adapter_version,
                tracing_logger(),
            )
            .await
        {
            error!("❌ Failed to start WebNowPlaying adapter: {}", e);
            return Err(e.into());
        }
        info!("✅ WebNowPlaying adapter {} started", source.name());

        let store = SnapshotStore::new();
        let mut server = ServerBuilder::new("WNPBridge")
            .bind_address(settings.bind_address)
            .http_port(settings.http_port)
            .cors(settings.cors)
            .build();

        let addr = match Self::serve(&mut server, &store, &source, settings).await {
            Ok(addr) => addr,
            Err(e) => {
                error!("❌ {:#}", e);
                if let Err(stop_err) = source.stop().await {
                    warn!("Failed to stop WebNowPlaying adapter: {}", stop_err);
                }
                return Err(e);
            }
        };

        let poller = Poller::new(source.clone(), store)
            .with_interval(settings.poll_interval)
            .spawn(server.shutdown_token().child_token());

        Ok(Self {
            source,
            server,
            poller,
            addr,
        })
    }

    async fn serve(
        server: &mut Server,
        store: &SnapshotStore,
        source: &Arc<dyn MediaSource>,
        settings: &BridgeSettings,
    ) -> Result<SocketAddr> {
        server
            .init_media_api(MediaApiState::new(
                store.clone(),
                source.clone(),
                settings.dashboard.clone(),
            ))
            .await?;
        server.start().await
    }

    /// Adresse effectivement liée par le serveur HTTP
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Jeton d'arrêt : annulé sur Ctrl+C ou par `shutdown()`
    pub fn shutdown_token(&self) -> CancellationToken {
        self.server.shutdown_token()
    }

    pub fn shutdown(&self) {
        self.server.shutdown();
    }

    /// Attend l'arrêt, puis libère boucle, adaptateur et serveur dans cet ordre
    pub async fn wait(mut self) {
        self.server.shutdown_token().cancelled().await;

        info!("👋 Bridge shutting down...");
        if let Err(e) = self.poller.await {
            warn!("Polling task ended abnormally: {}", e);
        }
        if let Err(e) = self.source.stop().await {
            warn!("Failed to stop WebNowPlaying adapter: {}", e);
        }
        self.server.wait().await;
    }
}
