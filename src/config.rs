//! Configuration: TOML file + environment overrides.

use crate::defaults;
use crate::session::BargeInPolicy;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub audio: AudioConfig,
    pub vad: VadSection,
    pub segmenter: SegmenterSection,
    pub stt: SttSection,
    pub chat: ChatSection,
    pub tts: TtsSection,
    pub session: SessionSection,
}

/// Audio capture configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AudioConfig {
    pub device: Option<String>,
    pub sample_rate: u32,
}

/// Voice activity detection configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct VadSection {
    pub threshold: f32,
}

/// Utterance segmentation configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SegmenterSection {
    pub entry_speech_frames: u32,
    pub exit_silence_frames: u32,
    pub min_utterance_ms: u32,
}

/// Transcription provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SttSection {
    pub endpoint: String,
    pub language: String,
    pub timeout_ms: u64,
}

/// Chat backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ChatSection {
    pub endpoint: String,
    pub design_id: String,
}

/// Speech synthesis configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TtsSection {
    pub endpoint: String,
    pub voice_id: String,
    pub speaking_rate: f64,
    pub cooldown_ms: u64,
}

/// Session behavior configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SessionSection {
    pub barge_in: BargeInPolicy,
    pub mute_input: bool,
    pub mute_output: bool,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            device: None,
            sample_rate: defaults::SAMPLE_RATE,
        }
    }
}

impl Default for VadSection {
    fn default() -> Self {
        Self {
            threshold: defaults::VAD_THRESHOLD,
        }
    }
}

impl Default for SegmenterSection {
    fn default() -> Self {
        Self {
            entry_speech_frames: defaults::ENTRY_SPEECH_FRAMES,
            exit_silence_frames: defaults::EXIT_SILENCE_FRAMES,
            min_utterance_ms: defaults::MIN_UTTERANCE_MS,
        }
    }
}

impl Default for SttSection {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            language: defaults::DEFAULT_LANGUAGE.to_string(),
            timeout_ms: defaults::STT_TIMEOUT_MS,
        }
    }
}

impl Default for ChatSection {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            design_id: String::new(),
        }
    }
}

impl Default for TtsSection {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            voice_id: "default".to_string(),
            speaking_rate: defaults::SPEAKING_RATE,
            cooldown_ms: defaults::TTS_COOLDOWN_MS,
        }
    }
}

impl Default for SessionSection {
    fn default() -> Self {
        Self {
            barge_in: BargeInPolicy::default(),
            mute_input: false,
            mute_output: false,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file contains invalid TOML.
    /// Missing fields use default values.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from a file or return defaults if it is
    /// missing. Invalid TOML is still an error.
    pub fn load_or_default(path: &Path) -> anyhow::Result<Self> {
        match Self::load(path) {
            Ok(config) => Ok(config),
            Err(e) => {
                if e.downcast_ref::<std::io::Error>()
                    .map(|io_err| io_err.kind() == std::io::ErrorKind::NotFound)
                    .unwrap_or(false)
                {
                    Ok(Self::default())
                } else {
                    Err(e)
                }
            }
        }
    }

    /// Apply environment variable overrides.
    ///
    /// Supported environment variables:
    /// - `VOXLOOP_STT_ENDPOINT` → stt.endpoint
    /// - `VOXLOOP_CHAT_ENDPOINT` → chat.endpoint
    /// - `VOXLOOP_TTS_ENDPOINT` → tts.endpoint
    /// - `VOXLOOP_LANGUAGE` → stt.language
    /// - `VOXLOOP_AUDIO_DEVICE` → audio.device
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(endpoint) = std::env::var("VOXLOOP_STT_ENDPOINT")
            && !endpoint.is_empty()
        {
            self.stt.endpoint = endpoint;
        }

        if let Ok(endpoint) = std::env::var("VOXLOOP_CHAT_ENDPOINT")
            && !endpoint.is_empty()
        {
            self.chat.endpoint = endpoint;
        }

        if let Ok(endpoint) = std::env::var("VOXLOOP_TTS_ENDPOINT")
            && !endpoint.is_empty()
        {
            self.tts.endpoint = endpoint;
        }

        if let Ok(language) = std::env::var("VOXLOOP_LANGUAGE")
            && !language.is_empty()
        {
            self.stt.language = language;
        }

        if let Ok(device) = std::env::var("VOXLOOP_AUDIO_DEVICE")
            && !device.is_empty()
        {
            self.audio.device = Some(device);
        }

        self
    }

    /// Build the session-facing view of this configuration.
    pub fn session_config(&self) -> crate::session::SessionConfig {
        use std::time::Duration;

        crate::session::SessionConfig {
            vad: crate::audio::vad::VadConfig {
                threshold: self.vad.threshold,
            },
            segmenter: crate::pipeline::segmenter::SegmenterConfig {
                entry_speech_frames: self.segmenter.entry_speech_frames,
                exit_silence_frames: self.segmenter.exit_silence_frames,
                min_utterance_ms: self.segmenter.min_utterance_ms,
                pre_speech_frames: defaults::PRE_SPEECH_FRAMES,
                sample_rate: self.audio.sample_rate,
            },
            voice: crate::tts::VoiceSettings {
                voice_id: self.tts.voice_id.clone(),
                language_code: self.stt.language.clone(),
                speaking_rate: self.tts.speaking_rate,
            },
            player: crate::tts::player::PlayerConfig {
                cooldown: Duration::from_millis(self.tts.cooldown_ms),
                sample_rate: self.audio.sample_rate,
            },
            barge_in: self.session.barge_in,
            mute_input: self.session.mute_input,
            mute_output: self.session.mute_output,
            show_levels: false,
        }
    }

    /// Get the default configuration file path
    /// (`~/.config/voxloop/config.toml` on Linux).
    #[cfg(feature = "cli")]
    pub fn default_path() -> std::path::PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| std::path::PathBuf::from("."))
            .join("voxloop")
            .join("config.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::Mutex;
    use tempfile::NamedTempFile;

    // Mutex to serialize tests that modify environment variables
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    // SAFETY: These helpers are only used in tests with ENV_LOCK held,
    // ensuring no concurrent access to environment variables.
    fn set_env(key: &str, value: &str) {
        unsafe { std::env::set_var(key, value) }
    }

    fn remove_env(key: &str) {
        unsafe { std::env::remove_var(key) }
    }

    fn clear_voxloop_env() {
        remove_env("VOXLOOP_STT_ENDPOINT");
        remove_env("VOXLOOP_CHAT_ENDPOINT");
        remove_env("VOXLOOP_TTS_ENDPOINT");
        remove_env("VOXLOOP_LANGUAGE");
        remove_env("VOXLOOP_AUDIO_DEVICE");
    }

    #[test]
    fn test_default_config_has_correct_values() {
        let config = Config::default();

        assert_eq!(config.audio.device, None);
        assert_eq!(config.audio.sample_rate, 16000);
        assert_eq!(config.vad.threshold, 0.02);
        assert_eq!(config.segmenter.entry_speech_frames, 30);
        assert_eq!(config.segmenter.exit_silence_frames, 30);
        assert_eq!(config.segmenter.min_utterance_ms, 300);
        assert_eq!(config.stt.language, "en-US");
        assert_eq!(config.stt.timeout_ms, 12_000);
        assert_eq!(config.tts.cooldown_ms, 2_000);
        assert_eq!(config.session.barge_in, BargeInPolicy::GateDuringPlayback);
        assert!(!config.session.mute_input);
    }

    #[test]
    fn test_load_from_toml_file() {
        let toml_content = r#"
            [audio]
            device = "pipewire"
            sample_rate = 48000

            [vad]
            threshold = 0.03

            [segmenter]
            entry_speech_frames = 20
            exit_silence_frames = 40
            min_utterance_ms = 250

            [stt]
            endpoint = "https://stt.example/v1/recognize"
            language = "de-DE"
            timeout_ms = 10000

            [chat]
            endpoint = "https://chat.example/v1/respond"
            design_id = "widget-7"

            [tts]
            endpoint = "https://tts.example/v1/speak"
            voice_id = "de-neural-2"
            speaking_rate = 1.2
            cooldown_ms = 1500

            [session]
            barge_in = "interrupt"
            mute_output = true
        "#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();

        let config = Config::load(temp_file.path()).unwrap();

        assert_eq!(config.audio.device, Some("pipewire".to_string()));
        assert_eq!(config.audio.sample_rate, 48000);
        assert_eq!(config.vad.threshold, 0.03);
        assert_eq!(config.segmenter.entry_speech_frames, 20);
        assert_eq!(config.stt.endpoint, "https://stt.example/v1/recognize");
        assert_eq!(config.stt.language, "de-DE");
        assert_eq!(config.chat.design_id, "widget-7");
        assert_eq!(config.tts.voice_id, "de-neural-2");
        assert_eq!(config.tts.cooldown_ms, 1500);
        assert_eq!(config.session.barge_in, BargeInPolicy::InterruptToSpeak);
        assert!(config.session.mute_output);
    }

    #[test]
    fn test_load_partial_config_uses_defaults() {
        let toml_content = r#"
            [stt]
            endpoint = "https://stt.example"
        "#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();

        let config = Config::load(temp_file.path()).unwrap();

        assert_eq!(config.stt.endpoint, "https://stt.example");
        assert_eq!(config.stt.language, "en-US");
        assert_eq!(config.audio.sample_rate, 16000);
        assert_eq!(config.vad.threshold, 0.02);
    }

    #[test]
    fn test_env_override_endpoints() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_voxloop_env();

        set_env("VOXLOOP_STT_ENDPOINT", "https://env-stt.example");
        set_env("VOXLOOP_LANGUAGE", "fr-FR");
        let config = Config::default().with_env_overrides();

        assert_eq!(config.stt.endpoint, "https://env-stt.example");
        assert_eq!(config.stt.language, "fr-FR");
        assert_eq!(config.chat.endpoint, ""); // not overridden

        clear_voxloop_env();
    }

    #[test]
    fn test_env_override_device() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_voxloop_env();

        set_env("VOXLOOP_AUDIO_DEVICE", "hw:1,0");
        let config = Config::default().with_env_overrides();

        assert_eq!(config.audio.device, Some("hw:1,0".to_string()));

        clear_voxloop_env();
    }

    #[test]
    fn test_env_override_empty_string_ignored() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_voxloop_env();

        set_env("VOXLOOP_LANGUAGE", "");
        let config = Config::default().with_env_overrides();

        assert_eq!(config.stt.language, "en-US");

        clear_voxloop_env();
    }

    #[test]
    fn test_invalid_toml_returns_error() {
        let invalid_toml = r#"
            [audio
            device = "broken
        "#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(invalid_toml.as_bytes()).unwrap();

        assert!(Config::load(temp_file.path()).is_err());
    }

    #[test]
    fn test_load_or_default_returns_default_for_missing_file() {
        let missing_path = Path::new("/tmp/nonexistent_voxloop_config_12345.toml");
        let config = Config::load_or_default(missing_path).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_or_default_errors_on_invalid_toml() {
        let invalid_toml = r#"
            [audio
            device = "broken
        "#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(invalid_toml.as_bytes()).unwrap();

        assert!(Config::load_or_default(temp_file.path()).is_err());
    }

    #[test]
    fn test_session_config_projection() {
        let mut config = Config::default();
        config.vad.threshold = 0.025;
        config.tts.cooldown_ms = 3000;
        config.stt.language = "es-ES".to_string();
        config.session.barge_in = BargeInPolicy::InterruptToSpeak;

        let session_config = config.session_config();
        assert_eq!(session_config.vad.threshold, 0.025);
        assert_eq!(
            session_config.player.cooldown,
            std::time::Duration::from_millis(3000)
        );
        assert_eq!(session_config.voice.language_code, "es-ES");
        assert_eq!(session_config.barge_in, BargeInPolicy::InterruptToSpeak);
    }

    #[cfg(feature = "cli")]
    #[test]
    fn test_default_path_is_xdg_compliant() {
        let path = Config::default_path();
        let path_str = path.to_string_lossy();
        assert!(path_str.contains("voxloop"));
        assert!(path_str.ends_with("config.toml"));
    }
}
