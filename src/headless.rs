//! An in-process [`Platform`] without a display.
//!
//! Surfaces are plain records in a shared [`HeadlessState`], which makes the
//! backend useful both for driving the overlay from a terminal and for
//! watching what the overlay did from another thread. Faults can be injected
//! through a [`HeadlessHandle`].

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use bubble_core::Rgba;
use bubble_gesture::{CloseZoneFeedback, CloseZoneGeometry, Point, Screen};
use parking_lot::Mutex;
use tokio::sync::Notify;
use tracing::debug;

use crate::icon::{Icon, IconSource};
use crate::notify::notify;
use crate::surface::{
    BubbleSurface, CloseZoneSurface, NewBubble, NewCloseZone, Platform, SurfaceError,
};

const BUBBLE: &str = "bubble";
const CLOSE_ZONE: &str = "close zone";

#[derive(Debug, Clone, PartialEq)]
pub struct BubbleRecord {
    pub position: Point,
    pub size: f32,
    pub background: Rgba,
    pub icon: IconSource,
    pub icon_tint: Rgba,
    /// Icon swaps after creation
    pub icon_updates: usize,
    pub snaps: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CloseZoneRecord {
    pub geometry: CloseZoneGeometry,
    pub feedback: CloseZoneFeedback,
    pub feedback_changes: usize,
}

/// Everything the headless backend currently shows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeadlessState {
    pub bubble: Option<BubbleRecord>,
    pub close_zone: Option<CloseZoneRecord>,
    pub notification: Option<(String, String)>,
    pub notifications_posted: usize,
    pub bubbles_created: usize,
    /// Surfaces in the order they were removed
    pub removals: Vec<&'static str>,
}

#[derive(Debug, Default)]
struct Faults {
    create: Option<&'static str>,
    remove: HashSet<&'static str>,
    icon_updates: bool,
}

#[derive(Debug, Default)]
struct Shared {
    state: Mutex<HeadlessState>,
    faults: Mutex<Faults>,
    start_gate: Mutex<Option<Arc<Notify>>>,
}

/// Observes and steers a [`HeadlessPlatform`] from any thread.
#[derive(Debug, Clone)]
pub struct HeadlessHandle {
    shared: Arc<Shared>,
}

impl HeadlessHandle {
    pub fn snapshot(&self) -> HeadlessState {
        self.shared.state.lock().clone()
    }

    /// Make creation of the named surface fail, `None` to stop failing.
    pub fn fail_creation(&self, surface: Option<&'static str>) {
        self.shared.faults.lock().create = surface;
    }

    pub fn fail_removal(&self, surface: &'static str) {
        self.shared.faults.lock().remove.insert(surface);
    }

    pub fn fail_icon_updates(&self, fail: bool) {
        self.shared.faults.lock().icon_updates = fail;
    }

    /// Park bubble creation until [`HeadlessHandle::release_start`].
    pub fn hold_starts(&self) {
        let mut gate = self.shared.start_gate.lock();
        if gate.is_none() {
            *gate = Some(Arc::new(Notify::new()));
        }
    }

    pub fn release_start(&self) {
        if let Some(gate) = self.shared.start_gate.lock().as_ref() {
            gate.notify_one();
        }
    }
}

#[derive(Debug, Clone)]
pub struct HeadlessPlatform {
    screen: Screen,
    system_notifications: bool,
    shared: Arc<Shared>,
}

impl HeadlessPlatform {
    pub fn new(screen: Screen) -> Self {
        Self {
            screen,
            system_notifications: false,
            shared: Arc::default(),
        }
    }

    /// Also show status notifications on the desktop.
    pub fn with_system_notifications(mut self, enabled: bool) -> Self {
        self.system_notifications = enabled;
        self
    }

    pub fn handle(&self) -> HeadlessHandle {
        HeadlessHandle {
            shared: self.shared.clone(),
        }
    }

    fn check_create(&self, surface: &'static str) -> Result<(), SurfaceError> {
        if self.shared.faults.lock().create == Some(surface) {
            return Err(SurfaceError::Create {
                surface,
                reason: "injected fault".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait(?Send)]
impl Platform for HeadlessPlatform {
    fn screen(&self) -> Screen {
        self.screen
    }

    async fn create_close_zone(
        &self,
        desc: NewCloseZone,
    ) -> Result<Box<dyn CloseZoneSurface>, SurfaceError> {
        self.check_create(CLOSE_ZONE)?;
        self.shared.state.lock().close_zone = Some(CloseZoneRecord {
            geometry: desc.geometry,
            feedback: CloseZoneFeedback::Hidden,
            feedback_changes: 0,
        });
        debug!(center = ?desc.geometry.center, radius = desc.geometry.radius, "close zone created");
        Ok(Box::new(HeadlessCloseZone {
            shared: self.shared.clone(),
        }))
    }

    async fn create_bubble(&self, desc: NewBubble) -> Result<Box<dyn BubbleSurface>, SurfaceError> {
        let gate = self.shared.start_gate.lock().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        self.check_create(BUBBLE)?;

        let mut state = self.shared.state.lock();
        state.bubbles_created += 1;
        state.bubble = Some(BubbleRecord {
            position: desc.position,
            size: desc.size,
            background: desc.background,
            icon: desc.icon.source().clone(),
            icon_tint: desc.icon.tint(),
            icon_updates: 0,
            snaps: 0,
        });
        debug!(position = ?desc.position, size = desc.size, "bubble created");
        Ok(Box::new(HeadlessBubble {
            position: desc.position,
            shared: self.shared.clone(),
        }))
    }

    fn post_notification(&self, title: &str, body: &str) {
        {
            let mut state = self.shared.state.lock();
            state.notification = Some((title.to_string(), body.to_string()));
            state.notifications_posted += 1;
        }
        if self.system_notifications {
            notify(title, body);
        }
    }

    fn dismiss_notification(&self) {
        self.shared.state.lock().notification = None;
    }
}

struct HeadlessBubble {
    position: Point,
    shared: Arc<Shared>,
}

impl HeadlessBubble {
    fn update(&self, f: impl FnOnce(&mut BubbleRecord)) -> Result<(), SurfaceError> {
        match self.shared.state.lock().bubble.as_mut() {
            Some(record) => {
                f(record);
                Ok(())
            }
            None => Err(SurfaceError::Update {
                surface: BUBBLE,
                reason: "surface is gone".to_string(),
            }),
        }
    }
}

impl BubbleSurface for HeadlessBubble {
    fn position(&self) -> Point {
        self.position
    }

    fn set_position(&mut self, position: Point) -> Result<(), SurfaceError> {
        self.position = position;
        self.update(|record| record.position = position)
    }

    fn snap_to(&mut self, target: Point) -> Result<(), SurfaceError> {
        self.position = target;
        self.update(|record| {
            record.position = target;
            record.snaps += 1;
        })
    }

    fn set_icon(&mut self, icon: &Icon) -> Result<(), SurfaceError> {
        if self.shared.faults.lock().icon_updates {
            return Err(SurfaceError::Update {
                surface: BUBBLE,
                reason: "injected fault".to_string(),
            });
        }
        self.update(|record| {
            record.icon = icon.source().clone();
            record.icon_tint = icon.tint();
            record.icon_updates += 1;
        })
    }

    fn remove(self: Box<Self>) -> Result<(), SurfaceError> {
        remove_surface(&self.shared, BUBBLE, |state| state.bubble = None)
    }
}

struct HeadlessCloseZone {
    shared: Arc<Shared>,
}

impl CloseZoneSurface for HeadlessCloseZone {
    fn set_feedback(&mut self, feedback: CloseZoneFeedback) -> Result<(), SurfaceError> {
        match self.shared.state.lock().close_zone.as_mut() {
            Some(record) => {
                record.feedback = feedback;
                record.feedback_changes += 1;
                Ok(())
            }
            None => Err(SurfaceError::Update {
                surface: CLOSE_ZONE,
                reason: "surface is gone".to_string(),
            }),
        }
    }

    fn remove(self: Box<Self>) -> Result<(), SurfaceError> {
        remove_surface(&self.shared, CLOSE_ZONE, |state| state.close_zone = None)
    }
}

fn remove_surface(
    shared: &Shared,
    surface: &'static str,
    clear: impl FnOnce(&mut HeadlessState),
) -> Result<(), SurfaceError> {
    if shared.faults.lock().remove.contains(surface) {
        return Err(SurfaceError::Remove {
            surface,
            reason: "injected fault".to_string(),
        });
    }
    let mut state = shared.state.lock();
    clear(&mut state);
    state.removals.push(surface);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::icon::IconResolver;

    fn desc() -> NewBubble {
        let config = bubble_core::BubbleConfig::default();
        let colors = config.colors().resolve();
        let state = bubble_core::BubbleState::Idle;
        NewBubble {
            position: Point::new(0.0, 100.0),
            size: 60.0,
            background: colors.background,
            icon: IconResolver::new(None).resolve(state, &config, colors.icon(state), 36),
        }
    }

    #[tokio::test]
    async fn test_bubble_record_tracks_surface() {
        let platform = HeadlessPlatform::new(Screen::new(1000.0, 2000.0, 1.0));
        let handle = platform.handle();

        let mut bubble = platform.create_bubble(desc()).await.unwrap();
        bubble.set_position(Point::new(5.0, 6.0)).unwrap();
        bubble.snap_to(Point::new(0.0, 6.0)).unwrap();

        let record = handle.snapshot().bubble.unwrap();
        assert_eq!(record.position, Point::new(0.0, 6.0));
        assert_eq!(record.snaps, 1);
        assert_eq!(record.background, Rgba::rgb(0x1C, 0x1C, 0x1C));
        assert_eq!(bubble.position(), Point::new(0.0, 6.0));

        bubble.remove().unwrap();
        let state = handle.snapshot();
        assert!(state.bubble.is_none());
        assert_eq!(state.removals, vec![BUBBLE]);
    }

    #[tokio::test]
    async fn test_injected_faults() {
        let platform = HeadlessPlatform::new(Screen::new(1000.0, 2000.0, 1.0));
        let handle = platform.handle();
        let geometry = CloseZoneGeometry::for_screen(&platform.screen());

        handle.fail_creation(Some(CLOSE_ZONE));
        assert!(matches!(
            platform.create_close_zone(NewCloseZone { geometry }).await,
            Err(SurfaceError::Create { .. })
        ));

        handle.fail_creation(None);
        handle.fail_removal(CLOSE_ZONE);
        let zone = platform
            .create_close_zone(NewCloseZone { geometry })
            .await
            .unwrap();
        assert!(matches!(zone.remove(), Err(SurfaceError::Remove { .. })));
        assert!(handle.snapshot().close_zone.is_some());
    }

    #[test]
    fn test_notifications_are_recorded() {
        let platform = HeadlessPlatform::new(Screen::new(1000.0, 2000.0, 1.0));
        platform.post_notification("a", "b");
        assert_eq!(
            platform.handle().snapshot().notification,
            Some(("a".to_string(), "b".to_string()))
        );
        platform.dismiss_notification();
        assert!(platform.handle().snapshot().notification.is_none());
    }
}
