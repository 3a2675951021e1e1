//! Events for the overlay's UI loop.

use bubble_core::{BubbleConfig, BubbleState};
use bubble_gesture::PointerEvent;
use tokio::sync::oneshot;

use crate::surface::SurfaceError;

/// Everything that can be posted onto the UI loop from another context.
#[derive(Debug)]
pub enum UiEvent {
    /// Bring the overlay up. Replies once it is running or has failed.
    Show {
        config: Option<BubbleConfig>,
        reply: oneshot::Sender<Result<(), SurfaceError>>,
    },
    /// Tear the overlay down. Replies once teardown has finished.
    Hide { reply: Option<oneshot::Sender<()>> },
    /// Applied when running, buffered as pending otherwise.
    SetState {
        state: BubbleState,
        reply: Option<oneshot::Sender<()>>,
    },
    /// Pointer input on the bubble surface
    Pointer(PointerEvent),
    /// Tear down and stop the loop
    Shutdown,
}
