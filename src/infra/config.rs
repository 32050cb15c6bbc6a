// src/infra/config.rs — Configuration loading (TOML + environment)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::infra::errors::GatewayError;
use crate::infra::paths;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub telegram: TelegramConfig,

    #[serde(default)]
    pub openai: OpenAIConfig,

    #[serde(default)]
    pub image: ImageConfig,

    #[serde(default)]
    pub audio: AudioConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    pub bot_token: Option<String>,
    /// Long-poll timeout passed to getUpdates.
    pub poll_timeout_secs: u64,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: None,
            poll_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAIConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub chat_model: String,
    pub transcription_model: String,
    /// Prepended to every chat request; never stored in the transcript.
    pub system_prompt: Option<String>,
    /// Bound on each chat / transcription request.
    pub timeout_secs: u64,
}

impl Default for OpenAIConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.openai.com/v1".into(),
            chat_model: "gpt-3.5-turbo".into(),
            transcription_model: "whisper-1".into(),
            system_prompt: None,
            timeout_secs: 60,
        }
    }
}

impl OpenAIConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageConfig {
    /// AUTOMATIC1111 web UI root, e.g. http://127.0.0.1:7860
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:7860".into(),
            timeout_secs: 300,
        }
    }
}

impl ImageConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// ffmpeg executable used for ogg -> mp3 conversion.
    pub ffmpeg: String,
    /// Scratch directory for voice files (defaults to the cache dir).
    pub voice_dir: Option<PathBuf>,
    /// Bound on one ffmpeg conversion.
    pub convert_timeout_secs: u64,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            ffmpeg: "ffmpeg".into(),
            voice_dir: None,
            convert_timeout_secs: 60,
        }
    }
}

impl AudioConfig {
    pub fn convert_timeout(&self) -> Duration {
        Duration::from_secs(self.convert_timeout_secs)
    }

    pub fn resolved_voice_dir(&self) -> PathBuf {
        self.voice_dir.clone().unwrap_or_else(paths::voice_dir)
    }
}

impl Config {
    /// Load config from the default location, falling back to defaults,
    /// then apply environment overrides.
    pub fn load() -> anyhow::Result<Self> {
        let path = paths::config_file_path();
        let mut config = if path.exists() {
            Self::load_from(&path)?
        } else {
            Self::default()
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Override secrets and endpoints from the environment.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(token) = lookup("TELEGRAM_BOT_TOKEN") {
            self.telegram.bot_token = Some(token);
        }
        if let Some(key) = lookup("OPENAI_API_KEY") {
            self.openai.api_key = Some(key);
        }
        if let Some(url) = lookup("A1111_API_URL") {
            self.image.base_url = url;
        }
    }

    /// Ensure everything needed to start the gateway is present.
    pub fn validate(&self) -> Result<(), GatewayError> {
        if self.telegram.bot_token.as_deref().is_none_or(str::is_empty) {
            return Err(GatewayError::Config(
                "telegram.bot_token is not set (or TELEGRAM_BOT_TOKEN)".into(),
            ));
        }
        if self.openai.api_key.as_deref().is_none_or(str::is_empty) {
            return Err(GatewayError::Config(
                "openai.api_key is not set (or OPENAI_API_KEY)".into(),
            ));
        }
        if self.image.timeout_secs == 0 {
            return Err(GatewayError::Config(
                "image.timeout_secs must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}
