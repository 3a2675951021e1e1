use std::sync::Arc;
use std::time::Duration;

use bubble::bridge::BridgeError;
use bubble::headless::{HeadlessHandle, HeadlessPlatform};
use bubble::permission::{AlwaysGranted, PermissionProvider, PermissionState, SharedPermission};
use bubble::{
    BubbleConfig, BubbleEvent, BubbleState, OverlayOptions, OverlayRuntime, PointerEvent, Screen,
};
use bubble_gesture::{CloseZoneFeedback, Point};
use tokio::time::{sleep, timeout};

const WAIT: Duration = Duration::from_secs(2);

fn start_with(permission: Arc<dyn PermissionProvider>) -> (OverlayRuntime, HeadlessHandle) {
    let platform = HeadlessPlatform::new(Screen::new(1000.0, 2000.0, 1.0));
    let headless = platform.handle();
    let overlay =
        OverlayRuntime::start(move || Ok(platform), permission, OverlayOptions::default())
            .unwrap();
    (overlay, headless)
}

fn start() -> (OverlayRuntime, HeadlessHandle) {
    start_with(Arc::new(AlwaysGranted))
}

/// Wait for something the UI loop does without replying.
async fn eventually(mut check: impl FnMut() -> bool) {
    timeout(WAIT, async {
        while !check() {
            sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition never held");
}

fn press(overlay: &OverlayRuntime, events: &[PointerEvent]) {
    for event in events {
        overlay.input().pointer(*event).unwrap();
    }
}

#[tokio::test]
async fn test_last_state_before_running_wins() {
    let (overlay, headless) = start();
    let bridge = overlay.bridge();
    headless.hold_starts();

    let (shown, ()) = tokio::join!(bridge.show(None), async {
        bridge.set_state(BubbleState::Recording).await.unwrap();
        bridge.set_state(BubbleState::Idle).await.unwrap();
        bridge.set_state(BubbleState::Processing).await.unwrap();
        assert!(!bridge.is_visible());
        headless.release_start();
    });
    shown.unwrap();

    let state = headless.snapshot();
    assert_eq!(state.bubble.unwrap().icon_updates, 1);
    assert_eq!(state.notifications_posted, 2);
    assert_eq!(
        state.notification,
        Some((
            "Processing...".to_string(),
            "Transcribing your voice".to_string()
        ))
    );
    overlay.shutdown().unwrap();
}

#[tokio::test]
async fn test_same_state_is_a_no_op() {
    let (overlay, headless) = start();
    let bridge = overlay.bridge();
    bridge.show(None).await.unwrap();

    bridge.set_state(BubbleState::Idle).await.unwrap();
    let state = headless.snapshot();
    assert_eq!(state.bubble.unwrap().icon_updates, 0);
    assert_eq!(state.notifications_posted, 1);

    bridge.set_state(BubbleState::Recording).await.unwrap();
    bridge.set_state(BubbleState::Recording).await.unwrap();
    let state = headless.snapshot();
    assert_eq!(state.bubble.unwrap().icon_updates, 1);
    assert_eq!(state.notifications_posted, 2);
    overlay.shutdown().unwrap();
}

#[tokio::test]
async fn test_visibility_follows_lifecycle() {
    let (overlay, headless) = start();
    let bridge = overlay.bridge();
    assert!(!bridge.is_visible());

    headless.hold_starts();
    let (shown, ()) = tokio::join!(bridge.show(None), async {
        bridge.set_state(BubbleState::Idle).await.unwrap();
        // starting, surfaces not there yet
        assert!(!bridge.is_visible());
        headless.release_start();
    });
    shown.unwrap();
    assert!(bridge.is_visible());

    bridge.hide().await;
    assert!(!bridge.is_visible());
    overlay.shutdown().unwrap();
}

#[tokio::test]
async fn test_hide_then_show_starts_fresh() {
    let (overlay, headless) = start();
    let bridge = overlay.bridge();

    bridge.show(None).await.unwrap();
    bridge.set_state(BubbleState::Processing).await.unwrap();
    bridge.hide().await;
    bridge.show(None).await.unwrap();

    let state = headless.snapshot();
    assert_eq!(state.bubbles_created, 2);
    assert_eq!(state.bubble.unwrap().icon_updates, 0);
    assert_eq!(
        state.notification,
        Some((
            "Floating Bubble".to_string(),
            "Tap the bubble to interact".to_string()
        ))
    );
    overlay.shutdown().unwrap();
}

#[tokio::test]
async fn test_show_uses_given_config() {
    let (overlay, headless) = start();
    let config = BubbleConfig {
        size: 48.0,
        start_x: 12.0,
        start_y: 340.0,
        ..BubbleConfig::default()
    };
    overlay.bridge().show(Some(config)).await.unwrap();
    // a second show while running changes nothing
    overlay.bridge().show(None).await.unwrap();

    let state = headless.snapshot();
    let bubble = state.bubble.unwrap();
    assert_eq!(bubble.size, 48.0);
    assert_eq!(bubble.position, Point::new(12.0, 340.0));
    assert_eq!(state.bubbles_created, 1);
    overlay.shutdown().unwrap();
}

#[tokio::test]
async fn test_teardown_never_fails() {
    let (overlay, headless) = start();
    let bridge = overlay.bridge();
    bridge.show(None).await.unwrap();

    headless.fail_removal("bubble");
    headless.fail_removal("close zone");
    bridge.hide().await;
    bridge.hide().await;
    assert!(!bridge.is_visible());

    bridge.show(None).await.unwrap();
    assert!(bridge.is_visible());
    assert_eq!(headless.snapshot().bubbles_created, 2);
    overlay.shutdown().unwrap();
}

#[tokio::test]
async fn test_hide_during_start_waits_for_it() {
    let (overlay, headless) = start();
    let bridge = overlay.bridge();
    headless.hold_starts();

    let (shown, (), ()) = tokio::join!(bridge.show(None), bridge.hide(), async {
        headless.release_start();
    });
    shown.unwrap();

    assert!(!bridge.is_visible());
    let state = headless.snapshot();
    assert!(state.bubble.is_none());
    assert!(state.close_zone.is_none());
    assert_eq!(state.removals, vec!["bubble", "close zone"]);
    overlay.shutdown().unwrap();
}

#[tokio::test]
async fn test_failed_start_is_reported() {
    let (overlay, headless) = start();
    let bridge = overlay.bridge();
    headless.fail_creation(Some("bubble"));

    let result = bridge.show(None).await;
    assert!(matches!(result, Err(BridgeError::Surface(_))));
    assert!(!bridge.is_visible());

    headless.fail_creation(None);
    bridge.show(None).await.unwrap();
    assert!(bridge.is_visible());
    overlay.shutdown().unwrap();
}

#[tokio::test]
async fn test_show_needs_permission() {
    let permission = SharedPermission::new(PermissionState::Undecided);
    let (overlay, _headless) = start_with(Arc::new(permission.clone()));
    let bridge = overlay.bridge();

    assert!(!bridge.has_permission().await);
    assert!(matches!(
        bridge.show(None).await,
        Err(BridgeError::PermissionDenied)
    ));

    let (granted, ()) = tokio::join!(bridge.request_permission(), async {
        sleep(Duration::from_millis(20)).await;
        permission.grant();
    });
    assert!(granted);
    bridge.show(None).await.unwrap();
    assert!(bridge.is_visible());
    overlay.shutdown().unwrap();
}

#[tokio::test]
async fn test_tap_reaches_every_subscriber() {
    let (overlay, headless) = start();
    let bridge = overlay.bridge();
    let mut first = bridge.on_click();
    let mut second = bridge.on_click();
    let dropped = bridge.on_click();
    dropped.unsubscribe();
    bridge.show(None).await.unwrap();

    press(
        &overlay,
        &[
            PointerEvent::Down { x: 30.0, y: 130.0 },
            PointerEvent::Move { x: 36.0, y: 122.0 },
            PointerEvent::Up { x: 36.0, y: 122.0 },
        ],
    );

    let click = timeout(WAIT, first.recv()).await.unwrap();
    assert_eq!(click, Some(BubbleEvent::click()));
    let click = timeout(WAIT, second.recv()).await.unwrap();
    assert_eq!(click, Some(BubbleEvent::click()));

    let bubble = headless.snapshot().bubble.unwrap();
    assert_eq!(bubble.snaps, 0);
    assert!(bridge.is_visible());
    overlay.shutdown().unwrap();
}

#[tokio::test]
async fn test_drag_snaps_to_edge() {
    let (overlay, headless) = start();
    overlay.bridge().show(None).await.unwrap();

    press(
        &overlay,
        &[
            PointerEvent::Down { x: 30.0, y: 130.0 },
            PointerEvent::Move { x: 400.0, y: 900.0 },
        ],
    );
    eventually(|| {
        headless
            .snapshot()
            .close_zone
            .is_some_and(|zone| zone.feedback == CloseZoneFeedback::Shown)
    })
    .await;

    press(&overlay, &[PointerEvent::Up { x: 400.0, y: 900.0 }]);
    eventually(|| headless.snapshot().bubble.is_some_and(|b| b.snaps == 1)).await;

    let state = headless.snapshot();
    // center x is 400, left of the middle
    assert_eq!(state.bubble.unwrap().position, Point::new(0.0, 870.0));
    assert_eq!(
        state.close_zone.unwrap().feedback,
        CloseZoneFeedback::Hidden
    );
    overlay.shutdown().unwrap();
}

#[tokio::test]
async fn test_drop_on_close_zone_dismisses() {
    let (overlay, headless) = start();
    let bridge = overlay.bridge();
    let mut closed = bridge.on_closed();
    let mut clicks = bridge.on_click();
    bridge.show(None).await.unwrap();
    bridge.set_state(BubbleState::Recording).await.unwrap();

    // the close zone's center is (500, 1912) on this screen
    press(
        &overlay,
        &[
            PointerEvent::Down { x: 30.0, y: 130.0 },
            PointerEvent::Move { x: 500.0, y: 1912.0 },
            PointerEvent::Up { x: 500.0, y: 1912.0 },
        ],
    );

    let event = timeout(WAIT, closed.recv()).await.unwrap();
    assert_eq!(event, Some(BubbleEvent::closed()));
    eventually(|| !bridge.is_visible()).await;
    assert_eq!(clicks.try_recv(), None);
    assert!(headless.snapshot().bubble.is_none());

    // a dismissed overlay buffers again
    bridge.set_state(BubbleState::Processing).await.unwrap();
    bridge.show(None).await.unwrap();
    let state = headless.snapshot();
    assert_eq!(state.bubble.unwrap().icon_updates, 1);
    assert_eq!(state.notification.unwrap().0, "Processing...");
    overlay.shutdown().unwrap();
}

#[tokio::test]
async fn test_shutdown_during_start_removes_surfaces() {
    let (overlay, headless) = start();
    let bridge = overlay.bridge().clone();
    headless.hold_starts();

    let shown = tokio::spawn(async move { bridge.show(None).await });
    eventually(|| headless.snapshot().close_zone.is_some()).await;
    overlay.shutdown().unwrap();

    let result = timeout(WAIT, shown).await.unwrap().unwrap();
    assert!(matches!(result, Err(BridgeError::UiClosed(_))));
    let state = headless.snapshot();
    assert!(state.close_zone.is_none());
    assert!(state.bubble.is_none());
    assert_eq!(state.removals, vec!["close zone"]);
}

#[tokio::test]
async fn test_host_size_is_bounded_by_the_screen() {
    let (overlay, headless) = start();
    let bridge = overlay.bridge();

    let config: BubbleConfig = serde_json::from_str(r#"{"size": 1000000}"#).unwrap();
    bridge.show(Some(config)).await.unwrap();
    assert_eq!(headless.snapshot().bubble.unwrap().size, 1000.0);
    bridge.hide().await;

    let config: BubbleConfig = serde_json::from_str(r#"{"size": -1}"#).unwrap();
    let result = bridge.show(Some(config)).await;
    assert!(matches!(result, Err(BridgeError::Surface(_))));
    assert!(!bridge.is_visible());
    assert_eq!(headless.snapshot().bubbles_created, 1);
    overlay.shutdown().unwrap();
}
