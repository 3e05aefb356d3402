//! Conversation application entry point.
//!
//! Wires the real devices and HTTP providers into a session and prints
//! the conversation to the terminal until interrupted.

use crate::audio::capture::{CpalAudioSource, suppress_audio_warnings};
use crate::audio::playback::CpalAudioSink;
use crate::chat::HttpResponseClient;
use crate::cli::Cli;
use crate::config::Config;
use crate::error::{Result, VoxloopError};
use crate::session::{Session, SessionEvent, TurnState};
use crate::stt::HttpSttClient;
use crate::tts::HttpTtsClient;
use owo_colors::OwoColorize;
use std::sync::Arc;
use std::time::Duration;

/// Run the conversation loop: capture → transcribe → respond → speak.
pub async fn run_conversation(mut config: Config, cli: &Cli) -> Result<()> {
    // Suppress noisy JACK/ALSA warnings before audio init
    suppress_audio_warnings();

    // Apply CLI overrides
    if let Some(ref device) = cli.device {
        config.audio.device = Some(device.clone());
    }
    if let Some(threshold) = cli.threshold {
        config.vad.threshold = threshold;
    }
    if let Some(cooldown) = cli.cooldown {
        config.tts.cooldown_ms = cooldown.as_millis() as u64;
    }
    if let Some(barge_in) = cli.barge_in {
        config.session.barge_in = barge_in.into();
    }

    check_endpoints(&config)?;

    let mut session_config = config.session_config();
    session_config.show_levels = cli.meter;

    let source = CpalAudioSource::new(config.audio.device.as_deref())?;
    let stt = HttpSttClient::new(&config.stt.endpoint, &config.stt.language)
        .with_timeout(Duration::from_millis(config.stt.timeout_ms));
    let chat = HttpResponseClient::new(&config.chat.endpoint, &config.chat.design_id);
    let tts = HttpTtsClient::new(&config.tts.endpoint);

    let (mut session, mut events) = Session::start(
        Box::new(source),
        Box::new(CpalAudioSink::new()),
        Arc::new(stt),
        Arc::new(chat),
        Arc::new(tts),
        session_config,
    )?;

    if !cli.quiet {
        eprintln!("Listening. Speak, then pause; Ctrl-C to exit.");
    }

    loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                if signal.is_ok() && !cli.quiet {
                    eprintln!("\nStopping...");
                }
                break;
            }
            event = events.recv() => {
                let Some(event) = event else { break };
                if handle_event(event) && cli.once {
                    break;
                }
            }
        }
    }

    session.stop().await;
    Ok(())
}

/// Prints one event; returns true when a turn completed.
fn handle_event(event: SessionEvent) -> bool {
    match event {
        SessionEvent::Transcript { text, .. } => {
            if std::io::IsTerminal::is_terminal(&std::io::stdout()) {
                println!("{} {}", "you:".cyan().bold(), text);
            } else {
                println!("you: {text}");
            }
        }
        SessionEvent::Reply { text, .. } => {
            if std::io::IsTerminal::is_terminal(&std::io::stdout()) {
                println!("{} {}", "assistant:".green().bold(), text);
            } else {
                println!("assistant: {text}");
            }
        }
        SessionEvent::TurnFailed { message, .. } => {
            eprintln!("{} {}", "error:".red().bold(), message);
        }
        SessionEvent::StateChanged { state, .. } => {
            return state == TurnState::Done;
        }
        // Amplitude drives visual indicators in embedding UIs; the CLI
        // has the level meter instead.
        SessionEvent::Amplitude { .. } | SessionEvent::Stopped => {}
    }
    false
}

fn check_endpoints(config: &Config) -> Result<()> {
    if config.stt.endpoint.is_empty() {
        return Err(VoxloopError::ConfigInvalidValue {
            key: "stt.endpoint".to_string(),
            message: "transcription endpoint is required".to_string(),
        });
    }
    if config.chat.endpoint.is_empty() {
        return Err(VoxloopError::ConfigInvalidValue {
            key: "chat.endpoint".to_string(),
            message: "chat endpoint is required".to_string(),
        });
    }
    if config.tts.endpoint.is_empty() {
        return Err(VoxloopError::ConfigInvalidValue {
            key: "tts.endpoint".to_string(),
            message: "synthesis endpoint is required".to_string(),
        });
    }
    Ok(())
}
