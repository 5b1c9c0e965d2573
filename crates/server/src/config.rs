//! On-disk configuration: one nested, `#[serde(default)]` struct per config
//! area, following `burka-voicsh::config::Config`'s convention. Every field
//! defaults to the value in spec.md's configuration table, so a zero-config
//! run is always valid; a TOML file only needs to override what it cares
//! about, and CLI flags layered on top in `main` override the file.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AudioConfig {
    pub sample_rate: u32,
    pub chunk_size: usize,
    pub buffer_duration: f32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16_000,
            chunk_size: 1024,
            buffer_duration: 10.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BatcherConfig {
    pub min_batch_duration: f32,
    pub max_batch_duration: f32,
    pub silence_duration_threshold: f32,
    pub batch_overlap: f32,
}

impl Default for BatcherConfig {
    fn default() -> Self {
        Self {
            min_batch_duration: 3.0,
            max_batch_duration: 30.0,
            silence_duration_threshold: 0.5,
            batch_overlap: 0.5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct VadConfig {
    pub silence_threshold: f32,
}

impl Default for VadConfig {
    fn default() -> Self {
        Self { silence_threshold: 500.0 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DispatcherConfig {
    pub transcription_model: String,
    pub model_fallback: Vec<String>,
    pub api_timeout: u64,
    pub max_retries: u32,
    pub retry_delay: f32,
    /// Base URL of the transcription service. Not a §6 table entry (the
    /// table only names the model id), but wiring needs somewhere to send
    /// the multipart upload; left pointed at a local dev instance.
    pub transcription_base_url: String,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            transcription_model: "whisper-large".to_string(),
            model_fallback: Vec::new(),
            api_timeout: 30,
            max_retries: 3,
            retry_delay: 1.0,
            transcription_base_url: "http://localhost:8000".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ContextConfig {
    pub insight_interval: u64,
    pub question_update_interval: u64,
    pub num_dynamic_questions: usize,
    /// Base URL of the generative-AI service, same rationale as
    /// `DispatcherConfig::transcription_base_url`.
    pub generative_ai_base_url: String,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            insight_interval: 60,
            question_update_interval: 15,
            num_dynamic_questions: 4,
            generative_ai_base_url: "http://localhost:8001".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub server_host: String,
    pub server_port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            server_host: "localhost".to_string(),
            server_port: 8765,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub audio: AudioConfig,
    pub batcher: BatcherConfig,
    pub vad: VadConfig,
    pub dispatcher: DispatcherConfig,
    pub context: ContextConfig,
    pub server: ServerConfig,
}

impl Config {
    /// Loads from a TOML file. Missing fields fall back to defaults;
    /// a missing file is reported so the caller can decide whether that's
    /// fatal (an explicit `--config` path) or fine (the default path).
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::NotFound { path: path.display().to_string() }
            } else {
                ConfigError::Io { path: path.display().to_string(), source: e }
            }
        })?;
        Ok(toml::from_str(&contents)?)
    }

    /// Loads from `path`, or returns built-in defaults if the file is
    /// simply absent. Any other error (malformed TOML, unreadable file)
    /// still propagates.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        match Self::load(path) {
            Ok(config) => Ok(config),
            Err(ConfigError::NotFound { .. }) => Ok(Self::default()),
            Err(e) => Err(e),
        }
    }
}
