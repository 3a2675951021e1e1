use std::pin::pin;
use std::sync::Arc;

use anyhow::{Context, Result};
use bubble::headless::HeadlessPlatform;
use bubble::notify::NotificationLayer;
use bubble::permission::AlwaysGranted;
use bubble::protocol::{EventMessage, Request, error_response};
use bubble::{
    ConfigManager, DEFAULT_LOG_LEVEL, OverlayOptions, OverlayRuntime, PointerEvent, Screen,
    VERSION,
};
use futures_util::StreamExt;
use serde::Deserialize;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// One line of stdin: a bridge request, or pointer input for the bubble.
#[derive(Deserialize)]
#[serde(untagged)]
enum Input {
    Request(Request),
    Pointer(PointerEvent),
}

fn main() -> Result<()> {
    // Load config first, it decides whether warnings become notifications
    let config_manager = ConfigManager::new()?;
    let settings = config_manager.load()?;
    // save back the config to create the file if it doesn't exist
    config_manager.save(&settings)?;

    // stdout carries the protocol, so logs go to stderr
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_env("BUBBLE_LOG")
                .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_LEVEL)),
        )
        .finish()
        .with(settings.notify_errors.then(NotificationLayer::new))
        .init();

    info!(version = VERSION, config = ?config_manager.config_path(), "bubble starting");

    let screen = Screen::new(
        settings.screen.width,
        settings.screen.height,
        settings.screen.density,
    );
    let system_notifications = settings.system_notifications;
    let overlay = OverlayRuntime::start(
        move || Ok(HeadlessPlatform::new(screen).with_system_notifications(system_notifications)),
        Arc::new(AlwaysGranted),
        OverlayOptions {
            icon_dir: settings.icon_dir,
            default_config: settings.bubble,
        },
    )?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .enable_all()
        .build()?;
    let result = runtime.block_on(serve(&overlay));

    overlay.shutdown()?;
    info!("bubble stopped");
    result
}

/// Answer requests from stdin until it closes. Responses and bridge events
/// are written to stdout as one JSON value per line.
async fn serve(overlay: &OverlayRuntime) -> Result<()> {
    let (output, mut output_rx) = mpsc::unbounded_channel::<Value>();

    let writer = tokio::spawn(async move {
        let mut stdout = tokio::io::stdout();
        while let Some(value) = output_rx.recv().await {
            let mut line = value.to_string();
            line.push('\n');
            if let Err(e) = stdout.write_all(line.as_bytes()).await {
                error!("Failed to write to stdout: {}", e);
                break;
            }
            stdout.flush().await.ok();
        }
    });

    let bridge = overlay.bridge().clone();
    let events = futures_util::stream::select(
        bridge.on_click().into_stream(),
        bridge.on_closed().into_stream(),
    );
    let forwarder = tokio::spawn({
        let output = output.clone();
        async move {
            let mut events = pin!(events);
            while let Some(event) = events.next().await {
                match serde_json::to_value(EventMessage::from(event)) {
                    Ok(value) => {
                        output.send(value).ok();
                    }
                    Err(e) => warn!("Failed to serialize bridge event: {}", e),
                }
            }
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        // Requests are answered one at a time so they apply in the order sent
        match serde_json::from_str::<Input>(line) {
            Ok(Input::Request(request)) => {
                let response = match bridge.dispatch(request).await {
                    Ok(value) => value,
                    Err(e) => error_response(e),
                };
                output.send(response).ok();
            }
            Ok(Input::Pointer(event)) => overlay.input().pointer(event)?,
            Err(e) => {
                output.send(error_response(format!("invalid request: {e}"))).ok();
            }
        }
    }

    info!("stdin closed");
    bridge.hide().await;
    forwarder.abort();
    drop(output);
    writer.await.ok();
    Ok(())
}
