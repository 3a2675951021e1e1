//! The host-facing command bridge.
//!
//! Every call is safe from any thread and at any time, including before the
//! first show. Commands are posted onto the UI loop in the order they are
//! issued; nothing here touches a surface.

use std::sync::Arc;
use std::thread::JoinHandle;

use bubble_core::{BubbleConfig, BubbleEvent, BubbleState, ParseStateError};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::oneshot;
use tracing::{debug, info};

use crate::event::UiEvent;
use crate::hub::Subscription;
use crate::lifecycle::{OverlayEvents, OverlayOptions, OverlayRegistry};
use crate::permission::PermissionProvider;
use crate::protocol::{PermissionResponse, Request, VisibilityResponse};
use crate::surface::{Platform, SurfaceError};
use crate::ui::{self, UiClosed, UiProxy};

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("overlay permission has not been granted")]
    PermissionDenied,
    #[error(transparent)]
    Surface(#[from] SurfaceError),
    #[error(transparent)]
    UiClosed(#[from] UiClosed),
    #[error("invalid request: {0}")]
    Protocol(String),
}

impl From<serde_json::Error> for BridgeError {
    fn from(e: serde_json::Error) -> Self {
        BridgeError::Protocol(e.to_string())
    }
}

#[derive(Clone)]
pub struct CommandBridge {
    ui: UiProxy,
    registry: Arc<OverlayRegistry>,
    permission: Arc<dyn PermissionProvider>,
    events: OverlayEvents,
}

impl CommandBridge {
    pub fn new(
        ui: UiProxy,
        registry: Arc<OverlayRegistry>,
        permission: Arc<dyn PermissionProvider>,
        events: OverlayEvents,
    ) -> Self {
        Self {
            ui,
            registry,
            permission,
            events,
        }
    }

    /// Bring the overlay up with `config`, or the configured default.
    /// Resolves once the overlay is running. A no-op while already running.
    pub async fn show(&self, config: Option<BubbleConfig>) -> Result<(), BridgeError> {
        if !self.permission.has_permission().await {
            info!("show rejected, overlay permission missing");
            return Err(BridgeError::PermissionDenied);
        }

        let (reply, receiver) = oneshot::channel();
        self.ui.send(UiEvent::Show { config, reply })?;
        receiver.await.map_err(|_| UiClosed)??;
        Ok(())
    }

    /// Tear the overlay down. Always succeeds; resolves after teardown.
    pub async fn hide(&self) {
        let (reply, receiver) = oneshot::channel();
        if self
            .ui
            .send(UiEvent::Hide { reply: Some(reply) })
            .is_err()
        {
            debug!("hide after the UI loop stopped");
            return;
        }
        receiver.await.ok();
    }

    /// Reads the shared registry directly; never waits on the UI loop.
    pub fn is_visible(&self) -> bool {
        self.registry.is_visible()
    }

    /// May wait indefinitely on the user.
    pub async fn request_permission(&self) -> bool {
        self.permission.request_permission().await
    }

    pub async fn has_permission(&self) -> bool {
        self.permission.has_permission().await
    }

    /// Apply `state`, or buffer it until the overlay is running.
    pub async fn set_state(&self, state: BubbleState) -> Result<(), BridgeError> {
        let (reply, receiver) = oneshot::channel();
        self.ui.send(UiEvent::SetState {
            state,
            reply: Some(reply),
        })?;
        receiver.await.map_err(|_| UiClosed)?;
        Ok(())
    }

    #[deprecated(note = "use `set_state`")]
    pub async fn set_recording(&self, recording: bool) -> Result<(), BridgeError> {
        let state = if recording {
            BubbleState::Recording
        } else {
            BubbleState::Idle
        };
        self.set_state(state).await
    }

    /// Taps on the bubble, as `bubble-click` events.
    pub fn on_click(&self) -> Subscription<BubbleEvent> {
        self.events.clicks.subscribe()
    }

    /// Dismissals through the close zone, as `bubble-closed` events.
    pub fn on_closed(&self) -> Subscription<BubbleEvent> {
        self.events.closed.subscribe()
    }

    /// Run one wire request. Responses are `null` or a small JSON object.
    pub async fn dispatch(&self, request: Request) -> Result<Value, BridgeError> {
        debug!(?request, "bridge request");
        let response = match request {
            Request::ShowBubble { options } => {
                self.show(options).await?;
                Value::Null
            }
            Request::HideBubble => {
                self.hide().await;
                Value::Null
            }
            Request::IsBubbleVisible => serde_json::to_value(VisibilityResponse {
                visible: self.is_visible(),
            })?,
            Request::RequestOverlayPermission => serde_json::to_value(PermissionResponse {
                granted: self.request_permission().await,
            })?,
            Request::HasOverlayPermission => serde_json::to_value(PermissionResponse {
                granted: self.has_permission().await,
            })?,
            Request::SetBubbleState { state } => {
                let state: BubbleState = state
                    .parse()
                    .map_err(|e: ParseStateError| BridgeError::Protocol(e.to_string()))?;
                self.set_state(state).await?;
                Value::Null
            }
            Request::SetRecording { recording } => {
                #[allow(deprecated)]
                self.set_recording(recording).await?;
                Value::Null
            }
        };
        Ok(response)
    }
}

/// The UI loop together with the bridge that drives it.
pub struct OverlayRuntime {
    bridge: CommandBridge,
    input: UiProxy,
    thread: Option<JoinHandle<()>>,
}

impl OverlayRuntime {
    pub fn start<P, F>(
        make_platform: F,
        permission: Arc<dyn PermissionProvider>,
        options: OverlayOptions,
    ) -> anyhow::Result<Self>
    where
        P: Platform + 'static,
        F: FnOnce() -> anyhow::Result<P> + Send + 'static,
    {
        let registry = Arc::new(OverlayRegistry::new());
        let events = OverlayEvents::default();
        let (proxy, thread) = ui::spawn(make_platform, options, registry.clone(), events.clone())?;
        Ok(Self {
            bridge: CommandBridge::new(proxy.clone(), registry, permission, events),
            input: proxy,
            thread: Some(thread),
        })
    }

    pub fn bridge(&self) -> &CommandBridge {
        &self.bridge
    }

    /// Where a platform backend feeds pointer input.
    pub fn input(&self) -> &UiProxy {
        &self.input
    }

    /// Tear the overlay down and wait for the UI loop to exit.
    pub fn shutdown(mut self) -> anyhow::Result<()> {
        self.input.send(UiEvent::Shutdown).ok();
        if let Some(thread) = self.thread.take() {
            thread
                .join()
                .map_err(|_| anyhow::anyhow!("the overlay UI thread panicked"))?;
        }
        Ok(())
    }
}

impl Drop for OverlayRuntime {
    fn drop(&mut self) {
        if self.thread.is_some() {
            self.input.send(UiEvent::Shutdown).ok();
        }
    }
}
