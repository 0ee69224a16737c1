use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::speech::{OutOfRange, VoiceParams};

/// Default speech engine program.
pub const DEFAULT_PROGRAM: &str = "espeak-ng";
/// Default TUI theme.
pub const DEFAULT_THEME: &str = "hacker";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },
    #[error(transparent)]
    OutOfRange(#[from] OutOfRange),
}

/// On-disk TOML configuration structure.
/// All fields are optional so partial configs work (merge with defaults).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigFile {
    pub voice: Option<VoiceConfig>,
    pub speech: Option<SpeechConfig>,
    pub display: Option<DisplayConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VoiceConfig {
    pub rate: Option<f32>,
    pub pitch: Option<f32>,
    /// Engine-specific voice name, e.g. `en-us`.
    pub voice: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpeechConfig {
    pub program: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DisplayConfig {
    pub theme: Option<String>,
}

/// Fully resolved, validated settings.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub params: VoiceParams,
    pub voice: Option<String>,
    pub program: String,
    pub theme: String,
}

impl ConfigFile {
    /// Overlay built from command-line flags.
    pub fn from_flags(
        rate: Option<f32>,
        pitch: Option<f32>,
        voice: Option<String>,
        program: Option<String>,
        theme: Option<String>,
    ) -> Self {
        Self {
            voice: Some(VoiceConfig { rate, pitch, voice }),
            speech: Some(SpeechConfig { program }),
            display: Some(DisplayConfig { theme }),
        }
    }

    /// Fill unset fields with defaults and validate the voice parameters.
    pub fn resolve(&self) -> Result<Settings, ConfigError> {
        let defaults = VoiceParams::default();
        let voice = self.voice.as_ref();
        let rate = voice.and_then(|v| v.rate).unwrap_or(defaults.rate);
        let pitch = voice.and_then(|v| v.pitch).unwrap_or(defaults.pitch);

        Ok(Settings {
            params: VoiceParams::new(rate, pitch)?,
            voice: voice.and_then(|v| v.voice.clone()),
            program: self
                .speech
                .as_ref()
                .and_then(|s| s.program.clone())
                .unwrap_or_else(|| DEFAULT_PROGRAM.to_string()),
            theme: self
                .display
                .as_ref()
                .and_then(|d| d.theme.clone())
                .unwrap_or_else(|| DEFAULT_THEME.to_string()),
        })
    }
}

/// Platform config directory path: `<config_dir>/lectern/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("lectern").join("config.toml"))
}

/// Load config by cascading CWD `.lectern.toml` over platform config.
/// CWD values override platform values.
pub fn load_config() -> ConfigFile {
    let platform = config_path().and_then(|p| load_from_path(&p));
    let cwd = load_from_path(Path::new(".lectern.toml"));

    match (platform, cwd) {
        (None, None) => ConfigFile::default(),
        (Some(p), None) => p,
        (None, Some(c)) => c,
        (Some(p), Some(c)) => merge(p, c),
    }
}

/// Load a config from a specific path. Returns `None` if the file doesn't
/// exist or can't be parsed.
pub fn load_from_path(path: &Path) -> Option<ConfigFile> {
    let content = std::fs::read_to_string(path).ok()?;
    match toml::from_str(&content) {
        Ok(config) => Some(config),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "ignoring unparseable config file");
            None
        }
    }
}

/// Overlay read from `LECTERN_RATE`, `LECTERN_PITCH`, `LECTERN_VOICE` and
/// `LECTERN_ESPEAK`.
pub fn env_overrides() -> Result<ConfigFile, ConfigError> {
    overrides_from(|key| std::env::var(key).ok())
}

fn overrides_from(lookup: impl Fn(&str) -> Option<String>) -> Result<ConfigFile, ConfigError> {
    let parse = |key: &'static str| -> Result<Option<f32>, ConfigError> {
        match lookup(key) {
            None => Ok(None),
            Some(raw) => raw
                .trim()
                .parse::<f32>()
                .map(Some)
                .map_err(|_| ConfigError::InvalidValue { key, value: raw }),
        }
    };

    Ok(ConfigFile {
        voice: Some(VoiceConfig {
            rate: parse("LECTERN_RATE")?,
            pitch: parse("LECTERN_PITCH")?,
            voice: lookup("LECTERN_VOICE"),
        }),
        speech: Some(SpeechConfig {
            program: lookup("LECTERN_ESPEAK"),
        }),
        display: None,
    })
}

/// Resolve settings with precedence flags > environment > config files > defaults.
pub fn resolve_settings(flags: ConfigFile) -> Result<Settings, ConfigError> {
    let layered = merge(merge(load_config(), env_overrides()?), flags);
    layered.resolve()
}

/// Merge two configs: `overlay` values take precedence over `base`.
pub fn merge(base: ConfigFile, overlay: ConfigFile) -> ConfigFile {
    ConfigFile {
        voice: Some(VoiceConfig {
            rate: overlay
                .voice
                .as_ref()
                .and_then(|v| v.rate)
                .or_else(|| base.voice.as_ref().and_then(|v| v.rate)),
            pitch: overlay
                .voice
                .as_ref()
                .and_then(|v| v.pitch)
                .or_else(|| base.voice.as_ref().and_then(|v| v.pitch)),
            voice: overlay
                .voice
                .as_ref()
                .and_then(|v| v.voice.clone())
                .or_else(|| base.voice.as_ref().and_then(|v| v.voice.clone())),
        }),
        speech: Some(SpeechConfig {
            program: overlay
                .speech
                .as_ref()
                .and_then(|s| s.program.clone())
                .or_else(|| base.speech.as_ref().and_then(|s| s.program.clone())),
        }),
        display: Some(DisplayConfig {
            theme: overlay
                .display
                .as_ref()
                .and_then(|d| d.theme.clone())
                .or_else(|| base.display.as_ref().and_then(|d| d.theme.clone())),
        }),
    }
}
