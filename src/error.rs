//! Error types for voxloop.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum VoxloopError {
    // Configuration errors
    #[error("Configuration file not found at {path}")]
    ConfigFileNotFound { path: String },

    #[error("Invalid configuration value for {key}: {message}")]
    ConfigInvalidValue { key: String, message: String },

    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    // Audio capture errors
    #[error("Microphone access denied: {message}")]
    PermissionDenied { message: String },

    #[error("Audio input device unavailable: {device}")]
    DeviceUnavailable { device: String },

    #[error("Audio capture failed: {message}")]
    AudioCapture { message: String },

    // Audio playback errors
    #[error("Audio playback failed: {message}")]
    Playback { message: String },

    // Transcription errors
    #[error("Transcription timed out after {timeout_ms}ms")]
    SttTimeout { timeout_ms: u64 },

    #[error("Transcription provider error: {message}")]
    SttProvider { message: String },

    // Chat backend errors
    #[error("Response backend error: {message}")]
    Response { message: String },

    // Speech synthesis errors
    #[error("Speech synthesis failed: {message}")]
    Tts { message: String },

    // General I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Generic error for cases not covered above
    #[error("{0}")]
    Other(String),
}

// Type alias for convenience
pub type Result<T> = std::result::Result<T, VoxloopError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_config_file_not_found_display() {
        let error = VoxloopError::ConfigFileNotFound {
            path: "/path/to/config.toml".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Configuration file not found at /path/to/config.toml"
        );
    }

    #[test]
    fn test_config_invalid_value_display() {
        let error = VoxloopError::ConfigInvalidValue {
            key: "vad.threshold".to_string(),
            message: "must be between 0.0 and 1.0".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Invalid configuration value for vad.threshold: must be between 0.0 and 1.0"
        );
    }

    #[test]
    fn test_permission_denied_display() {
        let error = VoxloopError::PermissionDenied {
            message: "user declined microphone access".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Microphone access denied: user declined microphone access"
        );
    }

    #[test]
    fn test_device_unavailable_display() {
        let error = VoxloopError::DeviceUnavailable {
            device: "default".to_string(),
        };
        assert_eq!(error.to_string(), "Audio input device unavailable: default");
    }

    #[test]
    fn test_audio_capture_display() {
        let error = VoxloopError::AudioCapture {
            message: "buffer overflow".to_string(),
        };
        assert_eq!(error.to_string(), "Audio capture failed: buffer overflow");
    }

    #[test]
    fn test_playback_display() {
        let error = VoxloopError::Playback {
            message: "no output device".to_string(),
        };
        assert_eq!(error.to_string(), "Audio playback failed: no output device");
    }

    #[test]
    fn test_stt_timeout_display() {
        let error = VoxloopError::SttTimeout { timeout_ms: 12000 };
        assert_eq!(error.to_string(), "Transcription timed out after 12000ms");
    }

    #[test]
    fn test_stt_provider_display() {
        let error = VoxloopError::SttProvider {
            message: "HTTP 503".to_string(),
        };
        assert_eq!(error.to_string(), "Transcription provider error: HTTP 503");
    }

    #[test]
    fn test_response_display() {
        let error = VoxloopError::Response {
            message: "connection refused".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Response backend error: connection refused"
        );
    }

    #[test]
    fn test_tts_display() {
        let error = VoxloopError::Tts {
            message: "voice not found".to_string(),
        };
        assert_eq!(error.to_string(), "Speech synthesis failed: voice not found");
    }

    #[test]
    fn test_other_display() {
        let error = VoxloopError::Other("unexpected error".to_string());
        assert_eq!(error.to_string(), "unexpected error");
    }

    #[test]
    fn test_from_io_error() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let error: VoxloopError = io_error.into();
        assert!(error.to_string().contains("file not found"));
    }

    #[test]
    fn test_from_toml_error() {
        let toml_str = "invalid = toml = syntax";
        let toml_error = toml::from_str::<toml::Value>(toml_str).unwrap_err();
        let error: VoxloopError = toml_error.into();
        assert!(error.to_string().contains("Configuration error"));
    }

    #[test]
    fn test_result_type_alias() {
        fn returns_result() -> Result<i32> {
            Ok(42)
        }
        assert_eq!(returns_result().unwrap(), 42);
    }

    #[test]
    fn test_error_is_send_and_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<VoxloopError>();
        assert_sync::<VoxloopError>();
    }
}
