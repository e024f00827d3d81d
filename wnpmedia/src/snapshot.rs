//! Dernier état connu du lecteur
//!
//! Un seul [`SnapshotStore`] existe par processus. La boucle de relevé est
//! l'unique écrivain ; les handlers HTTP lisent. Chaque mise à jour construit
//! un [`MediaSnapshot`] immuable et remplace l'`Arc` courant sous un verrou
//! court : un lecteur voit l'ancien ou le nouvel enregistrement, jamais un
//! mélange des deux.

use chrono::Utc;
use parking_lot::RwLock;
use std::sync::Arc;
use wnpsource::{MediaInfo, MediaSource, PlaybackState, SourceError};

/// Provenance rapportée dans chaque réponse
pub const SOURCE_TAG: &str = "WebNowPlaying";

const DEFAULT_VOLUME: u8 = 100;
const MAX_VOLUME: u32 = 100;

#[derive(Debug, Clone, PartialEq)]
pub struct MediaSnapshot {
    /// `None` : aucun média détecté, les autres champs n'ont alors pas de sens
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub state: PlaybackState,
    /// URL de la pochette
    pub cover: Option<String>,
    /// Durée totale, en secondes
    pub duration: f64,
    /// Position de lecture, en secondes
    pub position: f64,
    pub volume: u8,
    pub player: Option<String>,
    pub source: &'static str,
    /// Date de la dernière mise à jour (secondes Unix)
    pub timestamp: i64,
}

impl Default for MediaSnapshot {
    fn default() -> Self {
        Self {
            title: None,
            artist: None,
            album: None,
            state: PlaybackState::Stopped,
            cover: None,
            duration: 0.0,
            position: 0.0,
            volume: DEFAULT_VOLUME,
            player: None,
            source: SOURCE_TAG,
            timestamp: 0,
        }
    }
}

impl MediaSnapshot {
    /// Construit un enregistrement à partir de l'état de l'adaptateur
    pub fn from_info(info: &MediaInfo, timestamp: i64) -> Self {
        Self {
            title: non_empty(&info.title),
            artist: non_empty(&info.artist),
            album: non_empty(&info.album),
            state: info.state.unwrap_or(PlaybackState::Stopped),
            cover: non_empty(&info.cover_url),
            duration: seconds(info.duration_seconds),
            position: seconds(info.position_seconds),
            volume: info
                .volume
                .map(|v| v.min(MAX_VOLUME) as u8)
                .unwrap_or(DEFAULT_VOLUME),
            player: Some(non_empty(&info.player_name).unwrap_or_else(|| SOURCE_TAG.to_string())),
            source: SOURCE_TAG,
            timestamp,
        }
    }

    pub fn has_media(&self) -> bool {
        self.title.is_some()
    }

    pub fn is_playing(&self) -> bool {
        self.state == PlaybackState::Playing
    }

    /// Résumé d'une ligne pour les logs de la boucle de relevé
    pub fn status_line(&self) -> String {
        match &self.title {
            Some(title) => format!(
                "🎵 Media updated: \"{}\" by \"{}\" ({})",
                title,
                self.artist.as_deref().unwrap_or("Unknown"),
                self.state
            ),
            None => "🔇 No media playing".to_string(),
        }
    }
}

fn non_empty(value: &str) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

fn seconds(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

/// Résultat du dernier relevé
#[derive(Debug, Clone, PartialEq)]
pub struct PollStatus {
    pub ok: bool,
    pub last_error: Option<String>,
    pub consecutive_failures: u32,
    /// Date du dernier relevé réussi (secondes Unix)
    pub last_success: Option<i64>,
}

impl Default for PollStatus {
    fn default() -> Self {
        Self {
            ok: true,
            last_error: None,
            consecutive_failures: 0,
            last_success: None,
        }
    }
}

struct StoreInner {
    snapshot: RwLock<Arc<MediaSnapshot>>,
    poll: RwLock<PollStatus>,
}

/// Handle partagé sur l'unique [`MediaSnapshot`] du processus
#[derive(Clone)]
pub struct SnapshotStore {
    inner: Arc<StoreInner>,
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(StoreInner {
                snapshot: RwLock::new(Arc::new(MediaSnapshot::default())),
                poll: RwLock::new(PollStatus::default()),
            }),
        }
    }

    /// Enregistrement courant
    pub fn read(&self) -> Arc<MediaSnapshot> {
        self.inner.snapshot.read().clone()
    }

    /// Remplace tous les champs d'un coup et horodate la mise à jour
    pub fn update(&self, info: &MediaInfo) -> Arc<MediaSnapshot> {
        let snapshot = Arc::new(MediaSnapshot::from_info(info, Utc::now().timestamp()));
        *self.inner.snapshot.write() = snapshot.clone();
        snapshot
    }

    pub fn poll_status(&self) -> PollStatus {
        self.inner.poll.read().clone()
    }

    /// Relit l'état de l'adaptateur et met à jour l'enregistrement
    ///
    /// Point d'entrée unique des deux chemins de mise à jour (tick et
    /// notification de changement). En cas d'échec l'enregistrement précédent
    /// est conservé et l'erreur est consignée dans [`PollStatus`].
    pub fn refresh_from(&self, source: &dyn MediaSource) -> Result<Arc<MediaSnapshot>, SourceError> {
        match source.current() {
            Ok(info) => {
                let snapshot = self.update(&info);
                let mut poll = self.inner.poll.write();
                poll.ok = true;
                poll.last_error = None;
                poll.consecutive_failures = 0;
                poll.last_success = Some(snapshot.timestamp);
                Ok(snapshot)
            }
            Err(e) => {
                let mut poll = self.inner.poll.write();
                poll.ok = false;
                poll.last_error = Some(e.to_string());
                poll.consecutive_failures = poll.consecutive_failures.saturating_add(1);
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wnpsource::testing::ScriptedSource;

    fn song() -> MediaInfo {
        MediaInfo {
            title: "Song A".into(),
            artist: "Band B".into(),
            state: Some(PlaybackState::Playing),
            duration_seconds: 200.0,
            position_seconds: 50.0,
            volume: Some(80),
            ..Default::default()
        }
    }

    #[test]
    fn initial_snapshot_has_no_media() {
        let store = SnapshotStore::new();
        let snapshot = store.read();
        assert!(!snapshot.has_media());
        assert_eq!(snapshot.state, PlaybackState::Stopped);
        assert_eq!(snapshot.volume, 100);
        assert_eq!(snapshot.source, SOURCE_TAG);
        assert_eq!(snapshot.timestamp, 0);
    }

    #[test]
    fn empty_strings_become_none() {
        let info = MediaInfo {
            title: "  ".into(),
            artist: String::new(),
            cover_url: String::new(),
            ..Default::default()
        };
        let snapshot = MediaSnapshot::from_info(&info, 1);
        assert_eq!(snapshot.title, None);
        assert_eq!(snapshot.artist, None);
        assert_eq!(snapshot.cover, None);
        assert_eq!(snapshot.player.as_deref(), Some(SOURCE_TAG));
    }

    #[test]
    fn numbers_are_normalised() {
        let info = MediaInfo {
            title: "x".into(),
            duration_seconds: f64::NAN,
            position_seconds: -3.0,
            volume: Some(250),
            ..Default::default()
        };
        let snapshot = MediaSnapshot::from_info(&info, 1);
        assert_eq!(snapshot.duration, 0.0);
        assert_eq!(snapshot.position, 0.0);
        assert_eq!(snapshot.volume, 100);

        let muted = MediaInfo {
            volume: Some(0),
            ..Default::default()
        };
        assert_eq!(MediaSnapshot::from_info(&muted, 1).volume, 0);
        assert_eq!(MediaSnapshot::from_info(&MediaInfo::default(), 1).volume, 100);
    }

    #[test]
    fn update_replaces_every_field_and_stamps_time() {
        let store = SnapshotStore::new();
        let before = store.read();

        let after = store.update(&song());
        assert!(after.timestamp > 0);
        assert_eq!(after.title.as_deref(), Some("Song A"));
        assert_eq!(*store.read(), *after);

        // Les lecteurs déjà servis gardent leur enregistrement intact
        assert!(!before.has_media());

        store.update(&MediaInfo::default());
        let cleared = store.read();
        assert_eq!(cleared.title, None);
        assert_eq!(cleared.artist, None);
        assert_eq!(cleared.duration, 0.0);
    }

    #[test]
    fn status_line_describes_media() {
        let snapshot = MediaSnapshot::from_info(&song(), 1);
        assert_eq!(
            snapshot.status_line(),
            "🎵 Media updated: \"Song A\" by \"Band B\" (PLAYING)"
        );
        assert_eq!(MediaSnapshot::default().status_line(), "🔇 No media playing");
    }

    #[test]
    fn failed_refresh_keeps_previous_snapshot() {
        let store = SnapshotStore::new();
        let source = ScriptedSource::new();
        source.set_media(song());

        store.refresh_from(&source).unwrap();
        assert!(store.poll_status().ok);
        assert!(store.poll_status().last_success.is_some());

        source.fail_reads(Some("extension disconnected"));
        assert!(store.refresh_from(&source).is_err());
        assert!(store.refresh_from(&source).is_err());

        assert_eq!(store.read().title.as_deref(), Some("Song A"));
        let poll = store.poll_status();
        assert!(!poll.ok);
        assert_eq!(poll.consecutive_failures, 2);
        assert_eq!(
            poll.last_error.as_deref(),
            Some("Cannot read media state: extension disconnected")
        );

        source.fail_reads(None);
        store.refresh_from(&source).unwrap();
        let poll = store.poll_status();
        assert!(poll.ok);
        assert_eq!(poll.consecutive_failures, 0);
        assert_eq!(poll.last_error, None);
    }
}
