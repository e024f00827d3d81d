// logs.rs
use anyhow::{Result, anyhow};
use tracing::{Level, info};
use tracing_subscriber::{Registry, filter::LevelFilter, layer::SubscriberExt, util::SubscriberInitExt};
use wnpconfig::get_config;

/// Options d'initialisation du système de logging
///
/// Les champs à `None` sont lus dans la configuration (`host.logger.*`).
#[derive(Debug, Clone, Default)]
pub struct LoggingOptions {
    /// Niveau minimum des événements émis
    pub min_level: Option<Level>,
    /// Activer la sortie vers la console
    pub enable_console: Option<bool>,
}

/// Initialise le système de logging
///
/// Échoue si un subscriber global est déjà installé.
///
/// # Exemple
/// ```rust,no_run
/// use wnpserver::logs::{init_logging, LoggingOptions};
///
/// init_logging(LoggingOptions {
///     min_level: Some(tracing::Level::DEBUG),
///     enable_console: Some(true),
/// })?;
/// # Ok::<(), anyhow::Error>(())
/// ```
pub fn init_logging(options: LoggingOptions) -> Result<()> {
    let config = get_config();

    let level = options.min_level.unwrap_or_else(|| {
        config
            .get_log_min_level()
            .ok()
            .and_then(|l| string_to_level(&l))
            .unwrap_or(Level::INFO)
    });

    // Le filtre doit être appliqué en premier
    let subscriber = Registry::default().with(LevelFilter::from_level(level));

    let enable_console = options
        .enable_console
        .unwrap_or_else(|| config.get_log_enable_console().unwrap_or(true));

    let result = if enable_console {
        subscriber
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_level(true)
                    .with_ansi(true),
            )
            .try_init()
    } else {
        subscriber.try_init()
    };
    result.map_err(|e| anyhow!("Failed to install tracing subscriber: {}", e))?;

    // La configuration est chargée avant le subscriber : ses propres logs sont perdus
    info!(config_file = %config.path(), "📁 Configuration loaded");
    Ok(())
}

pub fn string_to_level(s: &str) -> Option<Level> {
    match s.trim().to_uppercase().as_str() {
        "ERROR" => Some(Level::ERROR),
        "WARN" | "WARNING" => Some(Level::WARN),
        "INFO" => Some(Level::INFO),
        "DEBUG" => Some(Level::DEBUG),
        "TRACE" => Some(Level::TRACE),
        _ => None,
    }
}
