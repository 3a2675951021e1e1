//! Ownership of the overlay instance.
//!
//! The manager walks each instance through Stopped → Starting → Running →
//! Stopping → Stopped. It lives on the UI loop; the only thing it shares
//! with command delivery is the [`OverlayRegistry`].
//!
//! States set before an instance is running land in a single-slot
//! [`PendingState`] and are applied once, on entering Running.

use std::cell::RefCell;
use std::mem;
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use bubble_core::{BubbleConfig, BubbleEvent, BubbleState, LifecycleState};
use bubble_gesture::{
    CloseZoneFeedback, CloseZoneGeometry, GestureAction, GestureController, Point, PointerEvent,
    Screen,
};
use parking_lot::RwLock;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::hub::EventHub;
use crate::icon::{IconResolver, icon_size};
use crate::machine::BubbleStateMachine;
use crate::surface::{
    BubbleSurface, CloseZoneSurface, NewBubble, NewCloseZone, Platform, SurfaceError,
};

type ShowReply = oneshot::Sender<Result<(), SurfaceError>>;

/// A close zone created by a start that has no bubble yet. Shared between
/// the start task and the manager so a shutdown can remove it.
type ParkedCloseZone = Rc<RefCell<Option<Box<dyn CloseZoneSurface>>>>;

/// Fixed for the lifetime of the overlay runtime.
#[derive(Debug, Clone, Default)]
pub struct OverlayOptions {
    /// Directory searched for named icons
    pub icon_dir: Option<PathBuf>,
    /// Used when `Show` carries no config
    pub default_config: BubbleConfig,
}

/// Hubs for the events the overlay raises towards hosts.
#[derive(Clone, Default)]
pub struct OverlayEvents {
    pub clicks: EventHub<BubbleEvent>,
    pub closed: EventHub<BubbleEvent>,
}

#[derive(Debug)]
pub struct InstanceHandle {
    id: u64,
    lifecycle: AtomicU8,
}

impl InstanceHandle {
    fn new(id: u64) -> Self {
        Self {
            id,
            lifecycle: AtomicU8::new(LifecycleState::Stopped.as_u8()),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn lifecycle(&self) -> LifecycleState {
        LifecycleState::from_u8(self.lifecycle.load(Ordering::Acquire))
            .unwrap_or(LifecycleState::Stopped)
    }

    fn set_lifecycle(&self, state: LifecycleState) {
        self.lifecycle.store(state.as_u8(), Ordering::Release);
    }
}

/// The current overlay instance, if any. Written by the UI loop only;
/// read from anywhere.
#[derive(Debug, Default)]
pub struct OverlayRegistry {
    current: RwLock<Option<Arc<InstanceHandle>>>,
}

impl OverlayRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<Arc<InstanceHandle>> {
        self.current.read().clone()
    }

    pub fn lifecycle(&self) -> LifecycleState {
        self.current
            .read()
            .as_ref()
            .map_or(LifecycleState::Stopped, |handle| handle.lifecycle())
    }

    /// True strictly between entering Running and entering Stopping.
    pub fn is_visible(&self) -> bool {
        self.lifecycle() == LifecycleState::Running
    }

    fn register(&self, handle: Arc<InstanceHandle>) {
        let mut current = self.current.write();
        if let Some(stale) = current.replace(handle) {
            warn!(instance = stale.id(), "Replaced a stale overlay registration");
        }
    }

    fn clear(&self, id: u64) {
        let mut current = self.current.write();
        if current.as_ref().is_some_and(|handle| handle.id() == id) {
            *current = None;
        }
    }
}

/// At most one buffered state; the last write wins.
#[derive(Debug, Default)]
pub struct PendingState(Option<BubbleState>);

impl PendingState {
    /// Buffer `state`, returning the value it replaced.
    pub fn store(&mut self, state: BubbleState) -> Option<BubbleState> {
        self.0.replace(state)
    }

    pub fn take(&mut self) -> Option<BubbleState> {
        self.0.take()
    }

    pub fn peek(&self) -> Option<BubbleState> {
        self.0
    }

    pub fn clear(&mut self) {
        self.0 = None;
    }
}

pub struct Surfaces {
    bubble: Box<dyn BubbleSurface>,
    close_zone: Box<dyn CloseZoneSurface>,
}

impl Surfaces {
    /// Best effort: bubble first, then the close zone. Errors are logged.
    fn remove(self) {
        log_removal("bubble", self.bubble.remove());
        log_removal("close zone", self.close_zone.remove());
    }
}

fn log_removal(surface: &'static str, result: Result<(), SurfaceError>) {
    if let Err(e) = result {
        warn!(surface, error = %e, "Failed to remove overlay surface");
    }
}

/// Surface creation for one instance. Runs as its own task on the UI loop so
/// commands keep flowing while the platform works.
pub struct StartTask<P> {
    instance: u64,
    platform: Rc<P>,
    bubble: NewBubble,
    close_zone: NewCloseZone,
    parked: ParkedCloseZone,
}

/// Outcome of a [`StartTask`], fed back through
/// [`OverlayManager::surfaces_ready`].
pub struct Started {
    instance: u64,
    result: Result<Surfaces, SurfaceError>,
}

impl<P: Platform> StartTask<P> {
    pub async fn run(self) -> Started {
        let StartTask {
            instance,
            platform,
            bubble,
            close_zone,
            parked,
        } = self;
        let result = create_surfaces(&*platform, bubble, close_zone, &parked).await;
        Started { instance, result }
    }
}

async fn create_surfaces<P: Platform + ?Sized>(
    platform: &P,
    bubble: NewBubble,
    close_zone: NewCloseZone,
    parked: &RefCell<Option<Box<dyn CloseZoneSurface>>>,
) -> Result<Surfaces, SurfaceError> {
    let close_zone = platform.create_close_zone(close_zone).await?;
    *parked.borrow_mut() = Some(close_zone);
    let bubble = platform.create_bubble(bubble).await;
    // Empty when the instance was shut down while the bubble was created
    let close_zone = parked.borrow_mut().take();

    match (bubble, close_zone) {
        (Ok(bubble), Some(close_zone)) => Ok(Surfaces { bubble, close_zone }),
        (Ok(bubble), None) => {
            log_removal("bubble", bubble.remove());
            Err(SurfaceError::Create {
                surface: "close zone",
                reason: "removed before the bubble was created".to_string(),
            })
        }
        (Err(e), Some(close_zone)) => {
            log_removal("close zone", close_zone.remove());
            Err(e)
        }
        (Err(e), None) => Err(e),
    }
}

/// Pixel diameter of a bubble of `size` dp, capped to the screen's shorter
/// side.
fn bubble_diameter(screen: &Screen, size: f32) -> Result<f32, SurfaceError> {
    if !size.is_finite() || size <= 0.0 {
        return Err(SurfaceError::Create {
            surface: "bubble",
            reason: format!("invalid bubble size {size}"),
        });
    }
    Ok(screen.dp(size).min(screen.width.min(screen.height)))
}

enum Phase {
    Stopped,
    Starting(Starting),
    Running(Running),
}

struct Starting {
    handle: Arc<InstanceHandle>,
    parked: ParkedCloseZone,
    machine: BubbleStateMachine,
    gesture: GestureController,
    show_waiters: Vec<ShowReply>,
    hide_waiters: Vec<oneshot::Sender<()>>,
    hide_requested: bool,
}

struct Running {
    handle: Arc<InstanceHandle>,
    machine: BubbleStateMachine,
    gesture: GestureController,
    bubble: Box<dyn BubbleSurface>,
    close_zone: Box<dyn CloseZoneSurface>,
}

pub struct OverlayManager<P> {
    platform: Rc<P>,
    options: OverlayOptions,
    registry: Arc<OverlayRegistry>,
    events: OverlayEvents,
    lifecycle: LifecycleState,
    pending: PendingState,
    next_instance: u64,
    phase: Phase,
}

impl<P: Platform + 'static> OverlayManager<P> {
    pub fn new(
        platform: Rc<P>,
        options: OverlayOptions,
        registry: Arc<OverlayRegistry>,
        events: OverlayEvents,
    ) -> Self {
        Self {
            platform,
            options,
            registry,
            events,
            lifecycle: LifecycleState::Stopped,
            pending: PendingState::default(),
            next_instance: 0,
            phase: Phase::Stopped,
        }
    }

    pub fn lifecycle(&self) -> LifecycleState {
        self.lifecycle
    }

    pub fn pending(&self) -> Option<BubbleState> {
        self.pending.peek()
    }

    /// The bubble's state while running.
    pub fn current_state(&self) -> Option<BubbleState> {
        match &self.phase {
            Phase::Running(running) => Some(running.machine.current()),
            _ => None,
        }
    }

    /// Begin bringing the overlay up. Returns the surface creation task to
    /// run when a new instance was started.
    ///
    /// While running this is a no-op; while starting the caller joins the
    /// in-flight start.
    pub fn show(&mut self, config: Option<BubbleConfig>, reply: ShowReply) -> Option<StartTask<P>> {
        match &mut self.phase {
            Phase::Running(running) => {
                debug!(instance = running.handle.id(), "Overlay already running, show ignored");
                reply.send(Ok(())).ok();
                return None;
            }
            Phase::Starting(starting) => {
                starting.show_waiters.push(reply);
                return None;
            }
            Phase::Stopped => {}
        }

        let config = config.unwrap_or_else(|| self.options.default_config.clone());
        let screen = self.platform.screen();
        let size = match bubble_diameter(&screen, config.size) {
            Ok(size) => size,
            Err(e) => {
                warn!(size = config.size, "Refusing to show the overlay");
                reply.send(Err(e)).ok();
                return None;
            }
        };

        self.next_instance += 1;
        let handle = Arc::new(InstanceHandle::new(self.next_instance));
        self.registry.register(handle.clone());
        self.transition(&handle, LifecycleState::Starting);

        let geometry = CloseZoneGeometry::for_screen(&screen);
        let position = Point::new(config.start_x, config.start_y);
        let mut machine = BubbleStateMachine::new(
            config,
            icon_size(size),
            IconResolver::new(self.options.icon_dir.clone()),
        );
        let parked = ParkedCloseZone::default();

        let task = StartTask {
            instance: handle.id(),
            platform: Rc::clone(&self.platform),
            bubble: NewBubble {
                position,
                size,
                background: machine.colors().background,
                icon: machine.current_icon(),
            },
            close_zone: NewCloseZone { geometry },
            parked: Rc::clone(&parked),
        };

        self.phase = Phase::Starting(Starting {
            handle,
            parked,
            machine,
            gesture: GestureController::new(geometry, size),
            show_waiters: vec![reply],
            hide_waiters: Vec::new(),
            hide_requested: false,
        });
        Some(task)
    }

    /// Finish (or roll back) the start once the surfaces exist.
    pub fn surfaces_ready(&mut self, started: Started) {
        let starting = match mem::replace(&mut self.phase, Phase::Stopped) {
            Phase::Starting(starting) if starting.handle.id() == started.instance => starting,
            other => {
                self.phase = other;
                warn!(instance = started.instance, "Surfaces arrived for a stale overlay instance");
                if let Ok(surfaces) = started.result {
                    surfaces.remove();
                }
                return;
            }
        };

        let Starting {
            handle,
            mut machine,
            parked: _,
            gesture,
            show_waiters,
            hide_waiters,
            hide_requested,
        } = starting;

        let Surfaces {
            mut bubble,
            close_zone,
        } = match started.result {
            Ok(surfaces) => surfaces,
            Err(e) => {
                warn!(instance = handle.id(), error = %e, "Failed to create overlay surfaces");
                self.pending.clear();
                self.transition(&handle, LifecycleState::Stopped);
                self.registry.clear(handle.id());
                for waiter in show_waiters {
                    waiter.send(Err(e.clone())).ok();
                }
                for waiter in hide_waiters {
                    waiter.send(()).ok();
                }
                return;
            }
        };

        self.transition(&handle, LifecycleState::Running);
        let (title, body) = machine.current().notification();
        self.platform.post_notification(title, body);
        let target = self.pending.take().unwrap_or_default();
        machine.set_state(target, bubble.as_mut(), &*self.platform);

        self.phase = Phase::Running(Running {
            handle,
            machine,
            gesture,
            bubble,
            close_zone,
        });
        for waiter in show_waiters {
            waiter.send(Ok(())).ok();
        }

        if hide_requested {
            self.teardown();
            for waiter in hide_waiters {
                waiter.send(()).ok();
            }
        }
    }

    /// Tear the overlay down. Safe to call in any state and any number of
    /// times. While starting, teardown happens as soon as the start lands.
    pub fn hide(&mut self, reply: Option<oneshot::Sender<()>>) {
        if let Phase::Starting(starting) = &mut self.phase {
            debug!(instance = starting.handle.id(), "Hide requested while starting");
            starting.hide_requested = true;
            starting.hide_waiters.extend(reply);
            return;
        }

        if matches!(self.phase, Phase::Running(_)) {
            self.teardown();
        } else {
            debug!("Overlay not running, hide ignored");
        }
        if let Some(reply) = reply {
            reply.send(()).ok();
        }
    }

    pub fn set_state(&mut self, state: BubbleState) {
        if let Phase::Running(running) = &mut self.phase {
            running
                .machine
                .set_state(state, running.bubble.as_mut(), &*self.platform);
            return;
        }

        let replaced = self.pending.store(state);
        debug!(
            %state,
            ?replaced,
            lifecycle = %self.lifecycle,
            "Overlay not running, state buffered"
        );
    }

    pub fn pointer(&mut self, event: PointerEvent) {
        let Phase::Running(running) = &mut self.phase else {
            return;
        };

        let screen = self.platform.screen();
        let actions = running
            .gesture
            .handle(event, running.bubble.position(), screen.width);

        let mut close = false;
        for action in actions {
            let result = match action {
                GestureAction::ShowCloseZone => {
                    running.close_zone.set_feedback(CloseZoneFeedback::Shown)
                }
                GestureAction::HideCloseZone => {
                    running.close_zone.set_feedback(CloseZoneFeedback::Hidden)
                }
                GestureAction::SetNear(near) => running.close_zone.set_feedback(if near {
                    CloseZoneFeedback::Near
                } else {
                    CloseZoneFeedback::Shown
                }),
                GestureAction::MoveBubble(position) => running.bubble.set_position(position),
                GestureAction::SnapTo(target) => running.bubble.snap_to(target),
                GestureAction::Click => {
                    self.events.clicks.emit(BubbleEvent::click());
                    Ok(())
                }
                GestureAction::Close => {
                    close = true;
                    Ok(())
                }
            };
            if let Err(e) = result {
                warn!(error = %e, ?action, "Failed to apply gesture");
            }
        }

        if close {
            debug!(instance = running.handle.id(), "Bubble dropped on the close zone");
            self.events.closed.emit(BubbleEvent::closed());
            self.teardown();
        }
    }

    /// Stop whatever is up before the UI loop exits.
    pub fn shutdown(&mut self) {
        if matches!(self.phase, Phase::Running(_)) {
            self.teardown();
            return;
        }
        // An in-flight start dies with the loop. Its show callers see the
        // loop as closed; what it already created is removed here.
        if let Phase::Starting(starting) = mem::replace(&mut self.phase, Phase::Stopped) {
            let parked = starting.parked.borrow_mut().take();
            if let Some(close_zone) = parked {
                log_removal("close zone", close_zone.remove());
            }
            self.pending.clear();
            self.transition(&starting.handle, LifecycleState::Stopped);
            self.registry.clear(starting.handle.id());
            for waiter in starting.hide_waiters {
                waiter.send(()).ok();
            }
        }
    }

    fn teardown(&mut self) {
        let Phase::Running(running) = mem::replace(&mut self.phase, Phase::Stopped) else {
            return;
        };
        let Running {
            handle,
            bubble,
            close_zone,
            ..
        } = running;

        self.transition(&handle, LifecycleState::Stopping);
        self.pending.clear();
        Surfaces { bubble, close_zone }.remove();
        self.platform.dismiss_notification();
        self.transition(&handle, LifecycleState::Stopped);
        self.registry.clear(handle.id());
    }

    fn transition(&mut self, handle: &InstanceHandle, to: LifecycleState) {
        let from = self.lifecycle;
        debug_assert!(
            from.can_transition_to(to),
            "invalid overlay transition {from} -> {to}"
        );
        self.lifecycle = to;
        handle.set_lifecycle(to);
        info!(instance = handle.id(), %from, %to, "overlay lifecycle");
    }
}
