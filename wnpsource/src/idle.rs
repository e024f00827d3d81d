//! Adaptateur sans backend protocolaire
//!
//! Démarre sans erreur, ne rapporte jamais de média et refuse les commandes.
//! C'est l'adaptateur lié au binaire tant qu'aucune implémentation du
//! protocole WebNowPlaying n'est branchée via [`MediaSource`].

use crate::{MediaInfo, MediaSource, Result, SourceError, SourceLogLevel, SourceLogger};
use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::debug;

pub const IDLE_SOURCE_NAME: &str = "wnpbridge-idle";

#[derive(Default)]
pub struct IdleSource {
    logger: Mutex<Option<SourceLogger>>,
}

impl IdleSource {
    pub fn new() -> Self {
        Self::default()
    }

    fn reject(&self, command: &str) -> Result<()> {
        if let Some(logger) = self.logger.lock().as_ref() {
            logger(
                SourceLogLevel::Debug,
                &format!("Ignoring '{}': no extension connected", command),
            );
        }
        Err(SourceError::NotConnected)
    }
}

#[async_trait]
impl MediaSource for IdleSource {
    fn name(&self) -> &str {
        IDLE_SOURCE_NAME
    }

    async fn start(&self, port: u16, version: &str, logger: SourceLogger) -> Result<()> {
        logger(
            SourceLogLevel::Warn,
            &format!(
                "No WebNowPlaying protocol backend linked (port {}, version {}); no media will be reported",
                port, version
            ),
        );
        *self.logger.lock() = Some(logger);
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        debug!("Idle media source stopped");
        self.logger.lock().take();
        Ok(())
    }

    fn current(&self) -> Result<MediaInfo> {
        Ok(MediaInfo::default())
    }

    fn try_play(&self) -> Result<()> {
        self.reject("play")
    }

    fn try_pause(&self) -> Result<()> {
        self.reject("pause")
    }

    fn try_toggle_play_pause(&self) -> Result<()> {
        self.reject("toggle")
    }

    fn try_skip_next(&self) -> Result<()> {
        self.reject("next")
    }

    fn try_skip_previous(&self) -> Result<()> {
        self.reject("previous")
    }

    fn try_set_position_seconds(&self, _seconds: f64) -> Result<()> {
        self.reject("seek")
    }

    fn try_set_volume(&self, _percentage: u8) -> Result<()> {
        self.reject("volume")
    }
}
