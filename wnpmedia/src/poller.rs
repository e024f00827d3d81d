//! Boucle de relevé de l'adaptateur
//!
//! `Running` : relève l'état à chaque tick (1 s par défaut) et à chaque
//! notification de changement de l'adaptateur. L'annulation du jeton fait
//! passer la boucle en `ShuttingDown` puis la termine ; l'arrêt de
//! l'adaptateur et du serveur HTTP revient à l'appelant.
//!
//! Pas de reprise ni de backoff : un relevé en échec est journalisé, consigné
//! dans le [`SnapshotStore`], et la boucle continue au tick suivant.

use crate::snapshot::SnapshotStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use wnpsource::MediaSource;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

pub struct Poller {
    source: Arc<dyn MediaSource>,
    store: SnapshotStore,
    interval: Duration,
    last_line: Option<String>,
}

impl Poller {
    pub fn new(source: Arc<dyn MediaSource>, store: SnapshotStore) -> Self {
        Self {
            source,
            store,
            interval: DEFAULT_POLL_INTERVAL,
            last_line: None,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Un relevé : met à jour l'enregistrement et journalise l'état
    ///
    /// Retourne `false` si l'adaptateur n'a pas pu être lu.
    pub fn tick(&mut self) -> bool {
        match self.store.refresh_from(self.source.as_ref()) {
            Ok(snapshot) => {
                let line = snapshot.status_line();
                if self.last_line.as_deref() == Some(line.as_str()) {
                    debug!("{}", line);
                } else {
                    info!("{}", line);
                    self.last_line = Some(line);
                }
                true
            }
            Err(e) => {
                warn!("⚠️ Polling tick failed: {}", e);
                self.last_line = None;
                false
            }
        }
    }

    /// Tourne jusqu'à l'annulation de `shutdown`
    pub async fn run(mut self, shutdown: CancellationToken) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let changes = self.source.changes();

        info!(
            "🔄 Polling {} every {:?}",
            self.source.name(),
            self.interval
        );

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {}
                _ = wait_for_change(changes.as_deref()) => {
                    debug!("Media source reported a change");
                }
            }
            self.tick();
        }

        info!("👋 Polling loop shutting down");
    }

    pub fn spawn(self, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }
}

async fn wait_for_change(changes: Option<&Notify>) {
    match changes {
        Some(notify) => notify.notified().await,
        None => std::future::pending().await,
    }
}
