//! Process configuration, read once at startup and passed to components.
//!
//! No core module reads the environment on its own; everything flows from
//! [`AssistantConfig`].

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::utilities::errors::ConfigError;

/// Default Gemini REST endpoint.
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Default chat model.
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";

/// Placeholder support line used until a real number is configured.
pub const DEFAULT_SUPPORT_NUMBER: &str = "1800-XXX-XXXX";

/// Configuration for the assistant service.
#[derive(Debug, Clone)]
pub struct AssistantConfig {
    /// HTTP port.
    pub port: u16,
    /// Google API key used for Gemini generation and transcription.
    pub google_api_key: Option<String>,
    /// Gemini model name.
    pub gemini_model: String,
    /// Gemini API base URL.
    pub gemini_base_url: String,
    /// TomTom key for place search and routing.
    pub tomtom_api_key: Option<String>,
    /// Directory served under `/static`.
    pub static_dir: PathBuf,
    /// URL prefix under which cached audio files are reachable.
    pub audio_public_prefix: String,
    /// SMV support number quoted in every reply.
    pub support_number: String,
    /// Upper bound for a single generation call.
    pub generation_timeout: Duration,
    /// Sessions idle longer than this are evicted.
    pub session_idle_ttl: Duration,
    /// Maximum characters sent to speech synthesis.
    pub tts_max_chars: usize,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            port: 9090,
            google_api_key: None,
            gemini_model: DEFAULT_GEMINI_MODEL.into(),
            gemini_base_url: DEFAULT_GEMINI_BASE_URL.into(),
            tomtom_api_key: None,
            static_dir: PathBuf::from("static"),
            audio_public_prefix: "/static/audio/cache".into(),
            support_number: DEFAULT_SUPPORT_NUMBER.into(),
            generation_timeout: Duration::from_secs(30),
            session_idle_ttl: Duration::from_secs(2 * 60 * 60),
            tts_max_chars: crate::speech::clean::MAX_SPEECH_CHARS,
        }
    }
}

impl AssistantConfig {
    /// Load from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load from an arbitrary variable lookup. Unset or blank variables
    /// fall back to defaults; set-but-unparseable numbers are an error.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        Ok(Self {
            port: parse_or(&get, "PORT", defaults.port)?,
            google_api_key: get("GOOGLE_API_KEY").or_else(|| get("GEMINI_API_KEY")),
            gemini_model: get("GEMINI_MODEL").unwrap_or(defaults.gemini_model),
            gemini_base_url: get("GEMINI_BASE_URL")
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or(defaults.gemini_base_url),
            tomtom_api_key: get("TOMTOM_API_KEY"),
            static_dir: get("STATIC_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.static_dir),
            audio_public_prefix: get("AUDIO_PUBLIC_PREFIX")
                .map(|p| p.trim_end_matches('/').to_string())
                .unwrap_or(defaults.audio_public_prefix),
            support_number: get("SMV_SUPPORT_NUMBER").unwrap_or(defaults.support_number),
            generation_timeout: Duration::from_secs(parse_or(
                &get,
                "GENERATION_TIMEOUT_SECS",
                defaults.generation_timeout.as_secs(),
            )?),
            session_idle_ttl: Duration::from_secs(parse_or(
                &get,
                "SESSION_IDLE_TTL_SECS",
                defaults.session_idle_ttl.as_secs(),
            )?),
            tts_max_chars: parse_or(&get, "TTS_MAX_CHARS", defaults.tts_max_chars)?,
        })
    }

    /// Directory holding synthesized audio artifacts.
    pub fn audio_cache_dir(&self) -> PathBuf {
        self.static_dir.join("audio").join("cache")
    }
}

fn parse_or<T, G>(get: &G, name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(name) {
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
            name,
            value: raw,
        }),
        None => Ok(default),
    }
}
