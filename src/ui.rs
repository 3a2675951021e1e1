//! The UI loop.
//!
//! A dedicated `bubble-ui` thread runs a current-thread runtime inside a
//! `LocalSet`. It owns the platform and the [`OverlayManager`]; every surface
//! mutation happens there. Other threads post [`UiEvent`]s through a
//! [`UiProxy`].

use std::rc::Rc;
use std::sync::Arc;
use std::thread::JoinHandle;

use anyhow::Context;
use bubble_gesture::PointerEvent;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::LocalSet;
use tracing::{debug, error, info};

use crate::event::UiEvent;
use crate::lifecycle::{OverlayEvents, OverlayManager, OverlayOptions, OverlayRegistry, Started};
use crate::surface::Platform;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("the overlay UI loop has stopped")]
pub struct UiClosed;

/// Sending half of the UI loop. Cheap to clone and usable from any thread.
#[derive(Debug, Clone)]
pub struct UiProxy {
    sender: mpsc::UnboundedSender<UiEvent>,
}

impl UiProxy {
    pub fn send(&self, event: UiEvent) -> Result<(), UiClosed> {
        self.sender.send(event).map_err(|_| UiClosed)
    }

    /// Forward pointer input from a platform backend.
    pub fn pointer(&self, event: PointerEvent) -> Result<(), UiClosed> {
        self.send(UiEvent::Pointer(event))
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

/// Start the UI loop. `make_platform` runs on the new thread, so the platform
/// itself never has to cross threads. Returns once the platform exists.
pub fn spawn<P, F>(
    make_platform: F,
    options: OverlayOptions,
    registry: Arc<OverlayRegistry>,
    events: OverlayEvents,
) -> anyhow::Result<(UiProxy, JoinHandle<()>)>
where
    P: Platform + 'static,
    F: FnOnce() -> anyhow::Result<P> + Send + 'static,
{
    let (sender, receiver) = mpsc::unbounded_channel();
    let (ready_tx, ready_rx) = std::sync::mpsc::sync_channel::<anyhow::Result<()>>(1);

    let thread = std::thread::Builder::new()
        .name("bubble-ui".to_string())
        .spawn(move || {
            let runtime = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(runtime) => runtime,
                Err(e) => {
                    ready_tx.send(Err(e.into())).ok();
                    return;
                }
            };
            let platform = match make_platform() {
                Ok(platform) => platform,
                Err(e) => {
                    ready_tx.send(Err(e)).ok();
                    return;
                }
            };
            ready_tx.send(Ok(())).ok();

            let screen = platform.screen();
            info!(
                width = screen.width,
                height = screen.height,
                density = screen.density,
                "overlay UI loop started"
            );
            let manager = OverlayManager::new(Rc::new(platform), options, registry, events);
            LocalSet::new().block_on(&runtime, run(manager, receiver));
            info!("overlay UI loop stopped");
        })
        .context("Failed to spawn the UI thread")?;

    match ready_rx.recv() {
        Ok(Ok(())) => Ok((UiProxy { sender }, thread)),
        Ok(Err(e)) => {
            thread.join().ok();
            Err(e.context("Failed to start the overlay UI loop"))
        }
        Err(_) => {
            error!("UI thread exited before reporting readiness");
            thread.join().ok();
            anyhow::bail!("the overlay UI loop exited during startup")
        }
    }
}

async fn run<P: Platform + 'static>(
    mut manager: OverlayManager<P>,
    mut events: mpsc::UnboundedReceiver<UiEvent>,
) {
    let (started_tx, mut started_rx) = mpsc::unbounded_channel::<Started>();

    loop {
        tokio::select! {
            biased;

            Some(started) = started_rx.recv() => manager.surfaces_ready(started),
            event = events.recv() => {
                let Some(event) = event else {
                    debug!("all UI proxies dropped");
                    break;
                };
                match event {
                    UiEvent::Show { config, reply } => {
                        if let Some(task) = manager.show(config, reply) {
                            let started = started_tx.clone();
                            tokio::task::spawn_local(async move {
                                started.send(task.run().await).ok();
                            });
                        }
                    }
                    UiEvent::Hide { reply } => manager.hide(reply),
                    UiEvent::SetState { state, reply } => {
                        manager.set_state(state);
                        if let Some(reply) = reply {
                            reply.send(()).ok();
                        }
                    }
                    UiEvent::Pointer(event) => manager.pointer(event),
                    UiEvent::Shutdown => break,
                }
            }
        }
    }

    manager.shutdown();
    // Starts that finished after the last event are stale now; this removes
    // their surfaces. Unfinished ones were cleaned up by the shutdown.
    while let Ok(started) = started_rx.try_recv() {
        manager.surfaces_ready(started);
    }
}
