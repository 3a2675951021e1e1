//! Idle / recording / processing state of a running bubble.

use bubble_core::{BubbleConfig, BubbleState, StateColors};
use tracing::{info, warn};

use crate::icon::{Icon, IconResolver};
use crate::surface::{BubbleSurface, Platform};

pub struct BubbleStateMachine {
    current: BubbleState,
    config: BubbleConfig,
    colors: StateColors,
    icon_size: u32,
    resolver: IconResolver,
}

impl BubbleStateMachine {
    /// A machine in [`BubbleState::Idle`]. The config's colors are parsed
    /// here, once per instance.
    pub fn new(config: BubbleConfig, icon_size: u32, resolver: IconResolver) -> Self {
        let colors = config.colors().resolve();
        Self {
            current: BubbleState::Idle,
            config,
            colors,
            icon_size,
            resolver,
        }
    }

    pub fn current(&self) -> BubbleState {
        self.current
    }

    pub fn config(&self) -> &BubbleConfig {
        &self.config
    }

    pub fn colors(&self) -> StateColors {
        self.colors
    }

    /// The icon for the current state, used when creating the bubble.
    pub fn current_icon(&mut self) -> Icon {
        let tint = self.colors.icon(self.current);
        self.resolver.resolve(self.current, &self.config, tint, self.icon_size)
    }

    /// Move to `new`, swapping the icon and the status notification.
    ///
    /// Returns false without touching the surface or the notification when
    /// already in `new`. A failed icon update is logged; the transition
    /// still happens.
    pub fn set_state<P: Platform + ?Sized>(
        &mut self,
        new: BubbleState,
        surface: &mut dyn BubbleSurface,
        platform: &P,
    ) -> bool {
        if new == self.current {
            return false;
        }

        let from = self.current;
        self.current = new;

        let icon = self.current_icon();
        if let Err(e) = surface.set_icon(&icon) {
            warn!(error = %e, state = %new, "Failed to apply bubble icon");
        }

        let (title, body) = new.notification();
        platform.post_notification(title, body);

        info!(%from, to = %new, icon = %icon.source(), "bubble state changed");
        true
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use bubble_core::{BubbleColors, Rgba};
    use bubble_gesture::{Point, Screen};
    use tracing::{Event, Level, Subscriber};
    use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

    use super::*;
    use crate::headless::HeadlessPlatform;
    use crate::icon::IconSource;
    use crate::surface::NewBubble;

    async fn bubble(
        platform: &HeadlessPlatform,
        machine: &mut BubbleStateMachine,
    ) -> Box<dyn BubbleSurface> {
        let desc = NewBubble {
            position: Point::new(0.0, 100.0),
            size: 60.0,
            background: machine.colors().background,
            icon: machine.current_icon(),
        };
        platform.create_bubble(desc).await.unwrap()
    }

    fn machine() -> BubbleStateMachine {
        BubbleStateMachine::new(BubbleConfig::default(), 36, IconResolver::new(None))
    }

    #[test]
    fn test_starts_idle() {
        assert_eq!(machine().current(), BubbleState::Idle);
    }

    #[tokio::test]
    async fn test_transition_updates_icon_and_notification() {
        let platform = HeadlessPlatform::new(Screen::new(1000.0, 2000.0, 1.0));
        let handle = platform.handle();
        let mut machine = machine();
        let mut surface = bubble(&platform, &mut machine).await;

        assert!(machine.set_state(BubbleState::Recording, surface.as_mut(), &platform));
        assert_eq!(machine.current(), BubbleState::Recording);

        let state = handle.snapshot();
        let record = state.bubble.unwrap();
        assert_eq!(record.icon_updates, 1);
        assert_eq!(record.icon, IconSource::Builtin);
        assert_eq!(record.icon_tint, Rgba::rgb(0xFF, 0x44, 0x44));
        assert_eq!(
            state.notification,
            Some(("Recording...".to_string(), "Tap bubble to stop".to_string()))
        );
        assert_eq!(state.notifications_posted, 1);
    }

    #[tokio::test]
    async fn test_same_state_is_a_no_op() {
        let platform = HeadlessPlatform::new(Screen::new(1000.0, 2000.0, 1.0));
        let handle = platform.handle();
        let mut machine = machine();
        let mut surface = bubble(&platform, &mut machine).await;

        assert!(!machine.set_state(BubbleState::Idle, surface.as_mut(), &platform));
        machine.set_state(BubbleState::Processing, surface.as_mut(), &platform);
        assert!(!machine.set_state(BubbleState::Processing, surface.as_mut(), &platform));

        let state = handle.snapshot();
        assert_eq!(state.bubble.unwrap().icon_updates, 1);
        assert_eq!(state.notifications_posted, 1);
    }

    #[tokio::test]
    async fn test_icon_failure_does_not_block_transition() {
        let platform = HeadlessPlatform::new(Screen::new(1000.0, 2000.0, 1.0));
        let handle = platform.handle();
        let mut machine = machine();
        let mut surface = bubble(&platform, &mut machine).await;
        handle.fail_icon_updates(true);

        assert!(machine.set_state(BubbleState::Recording, surface.as_mut(), &platform));
        assert_eq!(machine.current(), BubbleState::Recording);
        assert_eq!(handle.snapshot().notifications_posted, 1);
    }

    /// Counts warnings logged while installed.
    #[derive(Clone, Default)]
    struct Warnings(Arc<AtomicUsize>);

    impl Warnings {
        fn count(&self) -> usize {
            self.0.load(Ordering::SeqCst)
        }
    }

    impl<S: Subscriber> Layer<S> for Warnings {
        fn on_event(&self, event: &Event<'_>, _: Context<'_, S>) {
            if *event.metadata().level() == Level::WARN {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    #[tokio::test]
    async fn test_invalid_color_warns_once_per_instance() {
        let warnings = Warnings::default();
        let subscriber = tracing_subscriber::registry().with(warnings.clone());
        let _guard = tracing::subscriber::set_default(subscriber);

        let config = BubbleConfig {
            colors: Some(BubbleColors {
                recording: "#nothex".to_string(),
                ..Default::default()
            }),
            ..Default::default()
        };
        let platform = HeadlessPlatform::new(Screen::new(1000.0, 2000.0, 1.0));
        let handle = platform.handle();
        let mut machine = BubbleStateMachine::new(config, 36, IconResolver::new(None));
        assert_eq!(warnings.count(), 1);

        let mut surface = bubble(&platform, &mut machine).await;
        for state in [
            BubbleState::Recording,
            BubbleState::Idle,
            BubbleState::Recording,
            BubbleState::Processing,
            BubbleState::Recording,
        ] {
            machine.set_state(state, surface.as_mut(), &platform);
        }

        assert_eq!(warnings.count(), 1);
        let record = handle.snapshot().bubble.unwrap();
        assert_eq!(record.icon_updates, 5);
        assert_eq!(record.icon_tint, Rgba::rgb(0xFF, 0x44, 0x44));
    }
}
