//! Desktop notifications, for the status text and for problems worth seeing.

use std::fmt::{self, Write as _};
use std::time::{Duration, Instant};

use notify_rust::Notification;
use parking_lot::Mutex;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber, error};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::Context;

use crate::{APP_NAME, APP_NAME_PRETTY};

/// The same message is not shown again within this window.
const REPEAT_WINDOW: Duration = Duration::from_secs(30);

/// Send a desktop notification with a summary and body.
pub fn notify(summary: &str, body: &str) {
    Notification::new()
        .appname(APP_NAME)
        .summary(&format!("{} - {}", APP_NAME_PRETTY, summary))
        .body(body)
        .show()
        .map_err(|e| error!("Failed to send notification: {}", e))
        .ok();
}

/// Collects the message and the fields that explain it, such as the failing
/// `surface` or `icon` and its `error`.
#[derive(Default)]
struct BodyVisitor {
    message: Option<String>,
    details: Vec<(&'static str, String)>,
}

impl BodyVisitor {
    fn record(&mut self, field: &Field, value: String) {
        match field.name() {
            "message" => self.message = Some(value),
            name @ ("error" | "surface" | "icon" | "slot") => self.details.push((name, value)),
            _ => {}
        }
    }

    fn body(self) -> Option<String> {
        let mut body = self.message?;
        for (name, value) in self.details {
            write!(body, "\n{name}: {value}").ok();
        }
        Some(body)
    }
}

impl Visit for BodyVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.record(field, value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.record(field, format!("{:?}", value));
    }
}

/// Tracing layer that turns warnings and errors into desktop notifications.
pub struct NotificationLayer {
    last: Mutex<Option<(String, Instant)>>,
}

impl Default for NotificationLayer {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationLayer {
    pub fn new() -> Self {
        Self {
            last: Mutex::new(None),
        }
    }

    /// False for a repeat of the last body inside [`REPEAT_WINDOW`].
    fn should_show(&self, body: &str, now: Instant) -> bool {
        let mut last = self.last.lock();
        if let Some((previous, at)) = last.as_ref() {
            if previous == body && now.duration_since(*at) < REPEAT_WINDOW {
                return false;
            }
        }
        *last = Some((body.to_string(), now));
        true
    }
}

fn summary_for(level: Level) -> Option<&'static str> {
    match level {
        Level::ERROR => Some("error"),
        Level::WARN => Some("warning"),
        _ => None,
    }
}

impl<S: Subscriber> Layer<S> for NotificationLayer {
    fn on_event(&self, event: &Event<'_>, _: Context<'_, S>) {
        // Notification failures log at error level themselves
        if event.metadata().target() == module_path!() {
            return;
        }
        let Some(summary) = summary_for(*event.metadata().level()) else {
            return;
        };

        let mut visitor = BodyVisitor::default();
        event.record(&mut visitor);
        if let Some(body) = visitor.body() {
            if self.should_show(&body, Instant::now()) {
                notify(summary, &body);
            }
        }
    }
}
