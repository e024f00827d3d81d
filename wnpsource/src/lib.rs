//! # wnpsource
//!
//! Interface entre WNPBridge et l'adaptateur qui maintient la connexion avec
//! l'extension navigateur WebNowPlaying.
//!
//! L'adaptateur possède la connexion live, expose l'état courant du lecteur
//! ([`MediaInfo`]) et des primitives de contrôle « fire-and-forget » : une
//! commande signale une intention à l'extension, l'état observé ne change
//! qu'au prochain relevé.
//!
//! ## Implémentations
//!
//! - [`IdleSource`] : adaptateur sans backend protocolaire, ne rapporte aucun média
//! - `testing::ScriptedSource` (feature `testing`) : adaptateur en mémoire pour les tests
//!
//! ```rust,ignore
//! use wnpsource::{MediaSource, MediaCommand};
//!
//! source.start(8974, "1.0.0", logger).await?;
//! let info = source.current()?;
//! source.send(&MediaCommand::Seek(42.0))?;
//! ```

pub mod idle;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use idle::IdleSource;

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use tokio::sync::Notify;

/// Error types for media source operations
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("Failed to start media source: {0}")]
    StartFailed(String),

    #[error("Media source not connected")]
    NotConnected,

    #[error("Command '{command}' failed: {reason}")]
    Command { command: String, reason: String },

    #[error("Cannot read media state: {0}")]
    State(String),
}

/// Result type for media source operations
pub type Result<T> = std::result::Result<T, SourceError>;

/// État de lecture tel que rapporté par l'extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Playing,
    Paused,
    Stopped,
}

impl PlaybackState {
    /// Représentation WebNowPlaying (`PLAYING`, `PAUSED`, `STOPPED`)
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Playing => "PLAYING",
            Self::Paused => "PAUSED",
            Self::Stopped => "STOPPED",
        }
    }
}

impl fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// État courant exposé par l'adaptateur
///
/// Chaque champ peut être vide : une chaîne vide ou un `None` signifie que
/// l'extension n'a rien rapporté.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MediaInfo {
    pub title: String,
    pub artist: String,
    pub album: String,
    pub state: Option<PlaybackState>,
    pub cover_url: String,
    pub duration_seconds: f64,
    pub position_seconds: f64,
    /// Volume en pourcentage
    pub volume: Option<u32>,
    pub player_name: String,
}

/// Niveau des messages émis par l'adaptateur via son callback de log
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceLogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

/// Callback `(level, message)` fourni à [`MediaSource::start`]
pub type SourceLogger = Arc<dyn Fn(SourceLogLevel, &str) + Send + Sync>;

/// Commande de lecture envoyée à l'extension
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MediaCommand {
    Play,
    Pause,
    Toggle,
    Next,
    Previous,
    /// Position cible en secondes
    Seek(f64),
    /// Volume cible en pourcentage (0-100)
    Volume(u8),
}

impl MediaCommand {
    /// Nom de l'action côté API HTTP
    pub fn action(&self) -> &'static str {
        match self {
            Self::Play => "play",
            Self::Pause => "pause",
            Self::Toggle => "toggle",
            Self::Next => "next",
            Self::Previous => "previous",
            Self::Seek(_) => "seek",
            Self::Volume(_) => "volume",
        }
    }
}

/// Adaptateur de source média
///
/// Les primitives `try_*` ne sont pas synchrones avec l'état : elles ne font
/// que transmettre la commande. Les implémentations doivent être `Send + Sync`,
/// l'adaptateur étant partagé entre la boucle de relevé et les handlers HTTP.
#[async_trait]
pub trait MediaSource: Send + Sync {
    /// Identifiant de l'adaptateur, rapporté par `/health`
    fn name(&self) -> &str;

    /// Établit la connexion avec l'extension
    async fn start(&self, port: u16, version: &str, logger: SourceLogger) -> Result<()>;

    /// Ferme la connexion
    async fn stop(&self) -> Result<()>;

    /// État courant du lecteur
    fn current(&self) -> Result<MediaInfo>;

    /// Notification déclenchée quand l'adaptateur observe un changement d'état
    ///
    /// Les sources sans notification s'appuient uniquement sur le relevé périodique.
    fn changes(&self) -> Option<Arc<Notify>> {
        None
    }

    fn try_play(&self) -> Result<()>;
    fn try_pause(&self) -> Result<()>;
    fn try_toggle_play_pause(&self) -> Result<()>;
    fn try_skip_next(&self) -> Result<()>;
    fn try_skip_previous(&self) -> Result<()>;
    fn try_set_position_seconds(&self, seconds: f64) -> Result<()>;
    fn try_set_volume(&self, percentage: u8) -> Result<()>;

    /// Route une commande vers la primitive correspondante
    fn send(&self, command: &MediaCommand) -> Result<()> {
        match *command {
            MediaCommand::Play => self.try_play(),
            MediaCommand::Pause => self.try_pause(),
            MediaCommand::Toggle => self.try_toggle_play_pause(),
            MediaCommand::Next => self.try_skip_next(),
            MediaCommand::Previous => self.try_skip_previous(),
            MediaCommand::Seek(seconds) => self.try_set_position_seconds(seconds),
            MediaCommand::Volume(percentage) => self.try_set_volume(percentage),
        }
    }
}
