//! TOML-based configuration persistence for the client.
//!
//! Reads and writes [`AppConfig`] to the platform-appropriate config file:
//! - Windows:  `%APPDATA%\PCloud\config.toml`
//! - Linux:    `$XDG_CONFIG_HOME/pcloud/config.toml` or `~/.config/pcloud/config.toml`
//! - macOS:    `~/Library/Application Support/PCloud/config.toml`
//!
//! A complete file looks like this; every key is optional:
//!
//! ```toml
//! [client]
//! log_level = "info"
//!
//! [resolver]
//! probe_timeout_ms = 800
//! concurrency = 64
//! attempts = 9
//! retry_interval_secs = 5
//! background_interval_secs = 30
//! health_path = "/healthz"
//!
//! [session]
//! codec = "h264"
//! audio = true
//! fps = 60
//! width = 1920
//! height = 1080
//! preset = "p1"
//! bitrate = "25M"
//! capture = "desktop"
//! fit = "contain"
//! input_reliability = "unreliable"
//! frame_rate_hz = 120
//!
//! [[hosts]]
//! id = "6f1c0d2e-3a4b-4c5d-8e9f-0a1b2c3d4e5f"
//! name = "Living Room"
//! mac = "AA:BB:CC:DD:EE:FF"
//! ip = "192.168.0.42"
//! port = 8080
//!
//! [[pairings]]
//! device_id = "dev-1"
//! broker = "wss://broker.example/ws"
//! ```
//!
//! # Serde default values
//!
//! Fields annotated with `#[serde(default = "some_fn")]` take the return
//! value of `some_fn()` when the key is absent, so a first run (no file) and
//! an older file missing newer keys both load.

use std::path::{Path, PathBuf};
use std::time::Duration;

use pcloud_core::domain::viewport::{FitMode, Viewport};
use pcloud_core::{Bitrate, HostProfile, PairingRecord, SessionConfig};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::application::peer::{InputReliability, PeerSetup};
use crate::application::resolve_host::ResolverConfig;
use crate::application::retry::RetryPolicy;
use crate::application::session_controller::SessionOptions;

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level configuration stored on disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub client: ClientSection,
    #[serde(default)]
    pub resolver: ResolverSection,
    #[serde(default)]
    pub session: SessionSection,
    #[serde(default)]
    pub hosts: Vec<HostProfile>,
    #[serde(default)]
    pub pairings: Vec<PairingRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClientSection {
    /// `tracing` filter used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Discovery tunables.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResolverSection {
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,
    /// Maximum probes in flight during a /24 sweep.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default = "default_attempts")]
    pub attempts: u32,
    #[serde(default = "default_retry_interval_secs")]
    pub retry_interval_secs: u64,
    #[serde(default = "default_background_interval_secs")]
    pub background_interval_secs: u64,
    #[serde(default = "default_health_path")]
    pub health_path: String,
}

/// Defaults for new sessions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionSection {
    #[serde(default = "default_codec")]
    pub codec: String,
    #[serde(default = "default_true")]
    pub audio: bool,
    #[serde(default = "default_fps")]
    pub fps: u32,
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default = "default_preset")]
    pub preset: String,
    #[serde(default = "default_bitrate")]
    pub bitrate: Bitrate,
    #[serde(default = "default_capture")]
    pub capture: String,
    #[serde(default)]
    pub fit: FitMode,
    #[serde(default)]
    pub input_reliability: InputReliability,
    /// Pointer flush and controller polling rate.
    #[serde(default = "default_frame_rate_hz")]
    pub frame_rate_hz: u32,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_log_level() -> String {
    "info".to_string()
}
fn default_probe_timeout_ms() -> u64 {
    800
}
fn default_concurrency() -> usize {
    64
}
fn default_attempts() -> u32 {
    9
}
fn default_retry_interval_secs() -> u64 {
    5
}
fn default_background_interval_secs() -> u64 {
    30
}
fn default_health_path() -> String {
    "/healthz".to_string()
}
fn default_codec() -> String {
    "h264".to_string()
}
fn default_true() -> bool {
    true
}
fn default_fps() -> u32 {
    60
}
fn default_width() -> u32 {
    1920
}
fn default_height() -> u32 {
    1080
}
fn default_preset() -> String {
    "p1".to_string()
}
fn default_bitrate() -> Bitrate {
    Bitrate::megabits(25)
}
fn default_capture() -> String {
    "desktop".to_string()
}
fn default_frame_rate_hz() -> u32 {
    120
}

impl Default for ClientSection {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl Default for ResolverSection {
    fn default() -> Self {
        Self {
            probe_timeout_ms: default_probe_timeout_ms(),
            concurrency: default_concurrency(),
            attempts: default_attempts(),
            retry_interval_secs: default_retry_interval_secs(),
            background_interval_secs: default_background_interval_secs(),
            health_path: default_health_path(),
        }
    }
}

impl Default for SessionSection {
    fn default() -> Self {
        Self {
            codec: default_codec(),
            audio: default_true(),
            fps: default_fps(),
            width: default_width(),
            height: default_height(),
            preset: default_preset(),
            bitrate: default_bitrate(),
            capture: default_capture(),
            fit: FitMode::default(),
            input_reliability: InputReliability::default(),
            frame_rate_hz: default_frame_rate_hz(),
        }
    }
}

impl ResolverSection {
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn background_interval(&self) -> Duration {
        Duration::from_secs(self.background_interval_secs)
    }

    pub fn resolver_config(&self) -> ResolverConfig {
        ResolverConfig {
            probe_timeout: self.probe_timeout(),
            concurrency: self.concurrency,
            retry: RetryPolicy::new(self.attempts, Duration::from_secs(self.retry_interval_secs)),
        }
    }
}

impl SessionSection {
    /// A session config for `server` with these defaults.
    pub fn session_config(&self, server: impl Into<String>) -> SessionConfig {
        SessionConfig {
            server: server.into(),
            codec: self.codec.clone(),
            audio: self.audio,
            fps: self.fps,
            width: self.width,
            height: self.height,
            preset: self.preset.clone(),
            bitrate: self.bitrate,
            capture: self.capture.clone(),
        }
    }

    /// Session options for a display element of `width`×`height` pixels.
    pub fn session_options(&self, width: f64, height: f64) -> SessionOptions {
        let mut viewport = Viewport::new(width, height, self.fit);
        viewport.video_size = Some((self.width, self.height));
        SessionOptions {
            setup: PeerSetup {
                audio: self.audio,
                input_reliability: self.input_reliability,
            },
            viewport,
            frame_rate_hz: self.frame_rate_hz,
        }
    }
}

// ── Config repository ─────────────────────────────────────────────────────────

/// Determines the platform-appropriate directory for the config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] when the platform config base
/// directory cannot be determined from the environment.
pub fn config_dir() -> Result<PathBuf, ConfigError> {
    platform_config_dir().ok_or(ConfigError::NoPlatformConfigDir)
}

/// Resolves the full path to the default config file.
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    Ok(config_dir()?.join("config.toml"))
}

/// Loads the config from the default location.
pub fn load_config() -> Result<AppConfig, ConfigError> {
    load_config_from(&config_file_path()?)
}

/// Saves the config to the default location.
pub fn save_config(config: &AppConfig) -> Result<(), ConfigError> {
    save_config_to(&config_file_path()?, config)
}

/// Loads `AppConfig` from `path`, returning `AppConfig::default()` if the
/// file does not yet exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config_from(path: &Path) -> Result<AppConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(toml::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(AppConfig::default()),
        Err(source) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Writes `config` to `path`, creating the parent directory if needed.
pub fn save_config_to(path: &Path, config: &AppConfig) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Resolves the platform config base directory plus the `PCloud` subdirectory.
fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("PCloud"))
    }

    #[cfg(target_os = "linux")]
    {
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("pcloud"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join("PCloud")
        })
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
