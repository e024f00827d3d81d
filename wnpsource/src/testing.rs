//! Adaptateur scriptable pour les tests
//!
//! L'état est fixé par le test, les commandes sont enregistrées au lieu
//! d'être transmises. Chaque `set_media` déclenche la notification de
//! changement, comme le ferait une vraie connexion.

use crate::{MediaCommand, MediaInfo, MediaSource, Result, SourceError, SourceLogger};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::Notify;

pub const SCRIPTED_SOURCE_NAME: &str = "scripted";

#[derive(Default)]
pub struct ScriptedSource {
    media: Mutex<MediaInfo>,
    read_error: Mutex<Option<String>>,
    command_error: Mutex<Option<String>>,
    start_error: Mutex<Option<String>>,
    commands: Mutex<Vec<MediaCommand>>,
    reads: AtomicUsize,
    running: AtomicBool,
    started_with: Mutex<Option<(u16, String)>>,
    notify: Arc<Notify>,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remplace l'état rapporté et notifie les abonnés
    pub fn set_media(&self, info: MediaInfo) {
        *self.media.lock() = info;
        self.notify.notify_one();
    }

    /// Fait échouer les lectures d'état (`None` pour rétablir)
    pub fn fail_reads(&self, message: Option<&str>) {
        *self.read_error.lock() = message.map(str::to_string);
    }

    /// Fait échouer les commandes (`None` pour rétablir)
    pub fn fail_commands(&self, message: Option<&str>) {
        *self.command_error.lock() = message.map(str::to_string);
    }

    /// Fait échouer le prochain `start`
    pub fn fail_start(&self, message: &str) {
        *self.start_error.lock() = Some(message.to_string());
    }

    /// Commandes reçues, dans l'ordre
    pub fn commands(&self) -> Vec<MediaCommand> {
        self.commands.lock().clone()
    }

    /// Nombre de lectures d'état effectuées
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Port et version passés au dernier `start` réussi
    pub fn started_with(&self) -> Option<(u16, String)> {
        self.started_with.lock().clone()
    }

    fn record(&self, command: MediaCommand) -> Result<()> {
        if let Some(reason) = self.command_error.lock().clone() {
            return Err(SourceError::Command {
                command: command.action().to_string(),
                reason,
            });
        }
        self.commands.lock().push(command);
        Ok(())
    }
}

#[async_trait]
impl MediaSource for ScriptedSource {
    fn name(&self) -> &str {
        SCRIPTED_SOURCE_NAME
    }

    async fn start(&self, port: u16, version: &str, _logger: SourceLogger) -> Result<()> {
        if let Some(reason) = self.start_error.lock().take() {
            return Err(SourceError::StartFailed(reason));
        }
        *self.started_with.lock() = Some((port, version.to_string()));
        self.running.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        self.running.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn current(&self) -> Result<MediaInfo> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = self.read_error.lock().clone() {
            return Err(SourceError::State(message));
        }
        Ok(self.media.lock().clone())
    }

    fn changes(&self) -> Option<Arc<Notify>> {
        Some(self.notify.clone())
    }

    fn try_play(&self) -> Result<()> {
        self.record(MediaCommand::Play)
    }

    fn try_pause(&self) -> Result<()> {
        self.record(MediaCommand::Pause)
    }

    fn try_toggle_play_pause(&self) -> Result<()> {
        self.record(MediaCommand::Toggle)
    }

    fn try_skip_next(&self) -> Result<()> {
        self.record(MediaCommand::Next)
    }

    fn try_skip_previous(&self) -> Result<()> {
        self.record(MediaCommand::Previous)
    }

    fn try_set_position_seconds(&self, seconds: f64) -> Result<()> {
        self.record(MediaCommand::Seek(seconds))
    }

    fn try_set_volume(&self, percentage: u8) -> Result<()> {
        self.record(MediaCommand::Volume(percentage))
    }
}
