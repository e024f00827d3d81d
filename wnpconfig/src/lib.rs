//! # WNPBridge Configuration Module
//!
//! This module provides configuration management for WNPBridge, including:
//! - Loading configuration from YAML files
//! - Merging with embedded default configuration
//! - Environment variable overrides
//! - Type-safe getters with logged fallbacks to defaults
//! - Thread-safe singleton access pattern
//!
//! ## Usage
//!
//! ```no_run
//! use wnpconfig::get_config;
//!
//! // Get the global configuration
//! let config = get_config();
//!
//! // Access configuration values
//! let port = config.get_http_port();
//! let adapter_port = config.get_adapter_port();
//! ```

use anyhow::{Result, anyhow};
use dirs::home_dir;
use lazy_static::lazy_static;
use serde_yaml::{Mapping, Value};
use std::{
    env, fs,
    net::{IpAddr, Ipv4Addr},
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};
use tracing::info;

// Configuration par défaut intégrée
const DEFAULT_CONFIG: &str = include_str!("wnpbridge.yaml");

lazy_static! {
    static ref CONFIG: Arc<Config> =
        Arc::new(Config::load_config("").expect("Failed to load WNPBridge configuration"));
}

const ENV_CONFIG_DIR: &str = "WNPBRIDGE_CONFIG";
const ENV_PREFIX: &str = "WNPBRIDGE_CONFIG__";
const CONFIG_DIR_NAME: &str = ".wnpbridge";

// Default values for configuration
pub const DEFAULT_HTTP_PORT: u16 = 8080;
pub const DEFAULT_ADAPTER_PORT: u16 = 8974;
pub const DEFAULT_ADAPTER_VERSION: &str = "1.0.0";
pub const DEFAULT_DASHBOARD_PATH: &str = "media-dashboard.html";
const DEFAULT_BIND_ADDRESS: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);
const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;
const DEFAULT_LOG_MIN_LEVEL: &str = "INFO";
const DEFAULT_LOG_ENABLE_CONSOLE: bool = true;
const DEFAULT_CORS_ENABLED: bool = true;

/// Macro to generate a getter for bool values with default
macro_rules! impl_bool_config {
    ($getter:ident, $path:expr, $default:expr) => {
        pub fn $getter(&self) -> Result<bool> {
            match self.get_value($path)? {
                Value::Bool(b) => Ok(b),
                _ => Ok($default),
            }
        }
    };
}

/// Configuration manager for WNPBridge
///
/// This structure manages the application configuration, including:
/// - Loading configuration from YAML files
/// - Merging with default configuration
/// - Handling environment variable overrides
/// - Providing typed getters for configuration values
///
/// # Examples
///
/// ```no_run
/// use wnpconfig::get_config;
///
/// let config = get_config();
/// let port = config.get_http_port();
/// println!("HTTP port: {}", port);
/// ```
#[derive(Debug)]
pub struct Config {
    path: String,
    data: Value,
}

impl Config {
    /// Finds a config directory by trying different locations in order
    fn find_config_dir(directory: &str) -> String {
        // 1. Try provided directory
        if !directory.is_empty() {
            return directory.to_string();
        }

        // 2. Try environment variable
        if let Ok(env_path) = env::var(ENV_CONFIG_DIR) {
            info!(env_var=ENV_CONFIG_DIR, path=%env_path, "Trying to load config from env");
            return env_path;
        }

        // 3. Try current directory
        if Path::new(CONFIG_DIR_NAME).exists() {
            return CONFIG_DIR_NAME.to_string();
        }

        // 4. Try home directory
        if let Some(home) = home_dir() {
            let home_config = home.join(CONFIG_DIR_NAME);
            if home_config.exists() {
                return home_config.to_string_lossy().to_string();
            }
        }

        CONFIG_DIR_NAME.to_string()
    }

    /// Validates and prepares a config directory
    fn validate_config_dir(path: &Path) -> Result<()> {
        if !path.exists() {
            fs::create_dir_all(path)?;
        }

        if !path.is_dir() {
            return Err(anyhow!(
                "Le chemin spécifié n'est pas un répertoire: {}",
                path.display()
            ));
        }

        // Test write permission
        let test_file = path.join(".write_test");
        fs::write(&test_file, b"test")?;
        fs::remove_file(&test_file)?;

        Ok(())
    }

    /// Determines and validates the configuration directory
    ///
    /// The directory is searched in the following order:
    /// 1. The provided `directory` parameter if not empty
    /// 2. The `WNPBRIDGE_CONFIG` environment variable
    /// 3. `.wnpbridge` in the current directory
    /// 4. `.wnpbridge` in the user's home directory
    ///
    /// The directory is created if it doesn't exist.
    pub fn config_dir(directory: &str) -> Result<String> {
        let dir_path = Self::find_config_dir(directory);
        Self::validate_config_dir(Path::new(&dir_path))?;
        Ok(dir_path)
    }

    /// Loads the configuration from the specified directory
    ///
    /// This method:
    /// 1. Determines the configuration directory
    /// 2. Loads the default embedded configuration
    /// 3. Merges it with the external config.yaml file if present
    /// 4. Applies environment variable overrides
    /// 5. Saves the merged configuration
    pub fn load_config(directory: &str) -> Result<Self> {
        let config_dir = Self::config_dir(directory)?;
        info!(config_dir=%config_dir, "Using config directory");

        let config_file_path = Path::new(&config_dir).join("config.yaml");
        let path = config_file_path.to_string_lossy().to_string();

        let mut default_value: Value = serde_yaml::from_str(DEFAULT_CONFIG)?;

        let yaml_data = if let Ok(data) = fs::read(&path) {
            info!(config_file=%path, "Loaded config file");
            data
        } else {
            info!(config_file=%path, "Config file not found, using default embedded config");
            DEFAULT_CONFIG.as_bytes().to_vec()
        };

        let external_value: Value = serde_yaml::from_slice(&yaml_data)?;
        merge_yaml(&mut default_value, &external_value);
        let mut config_value = Self::lower_keys_value(default_value);

        Self::apply_env_overrides(&mut config_value, env::vars());

        let config = Config {
            path,
            data: config_value,
        };

        config.save()?;
        Ok(config)
    }

    /// Saves the current configuration to the config.yaml file
    pub fn save(&self) -> Result<()> {
        fs::write(&self.path, serde_yaml::to_string(&self.data)?)?;
        Ok(())
    }

    /// Chemin du fichier `config.yaml` effectivement utilisé
    pub fn path(&self) -> &str {
        &self.path
    }

    fn set_value_internal(data: &mut Value, path: &[&str], value: Value) -> Result<()> {
        if path.is_empty() {
            *data = value;
            return Ok(());
        }
        if let Value::Mapping(map) = data {
            let key_value = Value::String(path[0].to_lowercase());
            if path.len() == 1 {
                map.insert(key_value, value);
            } else {
                let entry = map
                    .entry(key_value)
                    .or_insert(Value::Mapping(Mapping::new()));
                Self::set_value_internal(entry, &path[1..], value)?;
            }
            Ok(())
        } else {
            Err(anyhow!("Current node is not a map"))
        }
    }

    /// Gets a configuration value at the specified path
    ///
    /// Returns an error if the path doesn't exist
    pub fn get_value(&self, path: &[&str]) -> Result<Value> {
        Self::get_value_internal(&self.data, path)
    }

    fn get_value_internal(data: &Value, path: &[&str]) -> Result<Value> {
        let mut current = data;
        for (i, key) in path.iter().enumerate() {
            if let Value::Mapping(map) = current {
                match map.get(&Value::String(key.to_lowercase())) {
                    Some(next) => current = next,
                    None => return Err(anyhow!("Path {} does not exist", path[..=i].join("."))),
                }
            } else {
                return Err(anyhow!("Path {} is not a Config", path[..i].join(".")));
            }
        }
        Ok(current.clone())
    }

    fn apply_env_overrides<I>(config: &mut Value, vars: I)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in vars {
            if let Some(stripped) = key.strip_prefix(ENV_PREFIX) {
                let key_path = stripped.split("__").collect::<Vec<_>>();
                let yaml_value = Self::convert_env_value(&value);
                if let Err(e) = Self::set_value_internal(config, &key_path, yaml_value) {
                    tracing::warn!(env_var=%key, "Ignoring config override: {}", e);
                }
            }
        }
    }

    fn convert_env_value(value: &str) -> Value {
        serde_yaml::from_str::<Value>(value).unwrap_or_else(|_| Value::String(value.to_string()))
    }

    fn lower_keys_value(value: Value) -> Value {
        match value {
            Value::Mapping(map) => {
                let mut new_map = Mapping::new();
                for (k, v) in map {
                    let key = match k {
                        Value::String(s) => Value::String(s.to_lowercase()),
                        other => other,
                    };
                    new_map.insert(key, Self::lower_keys_value(v));
                }
                Value::Mapping(new_map)
            }
            Value::Sequence(seq) => {
                Value::Sequence(seq.into_iter().map(Self::lower_keys_value).collect())
            }
            _ => value,
        }
    }

    /// Lit un port TCP, avec repli sur `default` si la valeur est absente ou invalide
    fn get_port(&self, path: &[&str], default: u16) -> u16 {
        let key = path.join(".");
        match self.get_value(path) {
            Ok(Value::Number(n)) => match n.as_u64().and_then(|p| u16::try_from(p).ok()) {
                Some(port) => port,
                None => {
                    tracing::warn!("Invalid {} '{}', using default {}", key, n, default);
                    default
                }
            },
            Ok(Value::String(s)) => match s.parse::<u16>() {
                Ok(port) => port,
                Err(_) => {
                    tracing::warn!("Invalid {} '{}', using default {}", key, s, default);
                    default
                }
            },
            Ok(_) => {
                tracing::warn!("{} not a number or string, using default {}", key, default);
                default
            }
            Err(err) => {
                tracing::warn!("Failed to get {}: {}, using default {}", key, err, default);
                default
            }
        }
    }

    /// Gets the HTTP port of the API server (default 8080)
    pub fn get_http_port(&self) -> u16 {
        self.get_port(&["host", "http_port"], DEFAULT_HTTP_PORT)
    }

    /// Gets the interface the HTTP server binds to (default loopback)
    pub fn get_bind_address(&self) -> IpAddr {
        match self.get_value(&["host", "bind_address"]) {
            Ok(Value::String(s)) => s.parse().unwrap_or_else(|_| {
                tracing::warn!(
                    "Invalid bind address '{}', using default {}",
                    s,
                    DEFAULT_BIND_ADDRESS
                );
                DEFAULT_BIND_ADDRESS
            }),
            _ => DEFAULT_BIND_ADDRESS,
        }
    }

    /// Gets the port the media source adapter listens on (default 8974)
    ///
    /// Must differ from the HTTP port: both sockets live on the same host.
    pub fn get_adapter_port(&self) -> u16 {
        self.get_port(&["adapter", "port"], DEFAULT_ADAPTER_PORT)
    }

    /// Version string announced by the adapter to the browser extension
    pub fn get_adapter_version(&self) -> String {
        match self.get_value(&["adapter", "version"]) {
            Ok(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
            // `2.0` en variable d'environnement est lu comme un flottant
            Ok(Value::Number(n)) => n.to_string(),
            _ => DEFAULT_ADAPTER_VERSION.to_string(),
        }
    }

    /// Interval between two polling ticks (default 1 s)
    pub fn get_poll_interval(&self) -> Duration {
        let ms = match self.get_value(&["adapter", "poll_interval_ms"]) {
            Ok(Value::Number(n)) => match n.as_u64() {
                Some(ms) if ms > 0 => ms,
                _ => {
                    tracing::warn!(
                        "Invalid poll interval '{}', using default {}ms",
                        n,
                        DEFAULT_POLL_INTERVAL_MS
                    );
                    DEFAULT_POLL_INTERVAL_MS
                }
            },
            _ => DEFAULT_POLL_INTERVAL_MS,
        };
        Duration::from_millis(ms)
    }

    /// Chemin du document HTML servi sur `/`
    ///
    /// Un chemin relatif est résolu par rapport au répertoire courant du processus.
    pub fn get_dashboard_path(&self) -> PathBuf {
        match self.get_value(&["host", "dashboard"]) {
            Ok(Value::String(s)) if !s.is_empty() => PathBuf::from(s),
            _ => PathBuf::from(DEFAULT_DASHBOARD_PATH),
        }
    }

    impl_bool_config!(
        get_cors_enabled,
        &["host", "cors"],
        DEFAULT_CORS_ENABLED
    );

    impl_bool_config!(
        get_log_enable_console,
        &["host", "logger", "enable_console"],
        DEFAULT_LOG_ENABLE_CONSOLE
    );

    /// Récupère le niveau de log minimum depuis la configuration
    pub fn get_log_min_level(&self) -> Result<String> {
        match self.get_value(&["host", "logger", "min_level"])? {
            Value::String(s) => Ok(s),
            _ => Ok(DEFAULT_LOG_MIN_LEVEL.to_string()),
        }
    }
}

/// Returns the global configuration instance
///
/// The configuration is lazily loaded on first access.
pub fn get_config() -> Arc<Config> {
    CONFIG.clone()
}

/// Merges external YAML configuration into default configuration
///
/// - For mappings (objects), it merges keys from external into default
/// - For scalars and sequences, external values replace default values
fn merge_yaml(default: &mut Value, external: &Value) {
    match (default, external) {
        (Value::Mapping(dmap), Value::Mapping(emap)) => {
            for (k, v) in emap {
                match dmap.get_mut(k) {
                    Some(dv) => merge_yaml(dv, v),
                    None => {
                        dmap.insert(k.clone(), v.clone());
                    }
                }
            }
        }
        (d, e) => *d = e.clone(),
    }
}
