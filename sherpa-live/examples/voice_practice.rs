//! Talk to Sherpa Tenzing from the terminal.
//!
//! Opens the default microphone and speakers, connects to Gemini Live and
//! prints the session status and microphone level until Ctrl+C.
//!
//! # Prerequisites
//!
//! - Set `GOOGLE_API_KEY` (or `GEMINI_API_KEY`).
//! - Run with: `cargo run -p sherpa-live --example voice_practice --features "gemini cpal"`
//! - Optional: `SHERPA_VOICE=Puck` to pick another prebuilt voice.

use sherpa_live::device::desktop::{CpalCapture, CpalRenderer};
use sherpa_live::gemini::GeminiLiveModel;
use sherpa_live::{LiveConfig, SessionController, SessionState};
use std::sync::Arc;
use tokio::signal;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    sherpa_telemetry::init_telemetry("voice-practice")?;

    let mut config = LiveConfig::default();
    if let Ok(voice) = std::env::var("SHERPA_VOICE") {
        config = config.with_voice(voice);
    }

    let model = Arc::new(GeminiLiveModel::from_env()?);
    let (controller, handle) = SessionController::new(
        config,
        model,
        Box::new(CpalCapture::new()),
        Box::new(CpalRenderer::new()),
    );
    let handle = handle.on_close(|| println!("Session closed, returning to the lobby"));

    let session = tokio::spawn(controller.run());

    // Print status changes and a coarse level meter
    let mut updates = handle.subscribe();
    let printer = tokio::spawn(async move {
        let mut last = SessionState::Connecting;
        while updates.changed().await.is_ok() {
            let snapshot = *updates.borrow_and_update();
            if snapshot.status != last {
                println!("Status: {}", snapshot.status);
                last = snapshot.status;
            }
            if snapshot.status == SessionState::Connected {
                let bars = (snapshot.volume * 40.0).round() as usize;
                print!("\r[{:<40}]", "#".repeat(bars.min(40)));
            }
            if snapshot.status == SessionState::Closed {
                break;
            }
        }
    });

    println!("Speak to Sherpa Tenzing. Press Ctrl+C to finish.");
    match signal::ctrl_c().await {
        Ok(()) => println!("\nShutting down..."),
        Err(err) => eprintln!("Unable to listen for shutdown signal: {}", err),
    }

    handle.close();
    let final_state = session.await?;
    printer.abort();
    println!("Final state: {}", final_state);
    Ok(())
}
