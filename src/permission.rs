//! The OS-level grant to draw above other applications.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::watch;
use tracing::info;

#[async_trait]
pub trait PermissionProvider: Send + Sync {
    async fn has_permission(&self) -> bool;

    /// Ask the user for the permission. May wait for as long as the user
    /// stays in the system settings; there is no timeout.
    async fn request_permission(&self) -> bool;
}

/// Desktops have no overlay permission to ask for.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysGranted;

#[async_trait]
impl PermissionProvider for AlwaysGranted {
    async fn has_permission(&self) -> bool {
        true
    }

    async fn request_permission(&self) -> bool {
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionState {
    Undecided,
    Granted,
    Denied,
}

/// A grant decided elsewhere, typically by a settings surface calling
/// [`SharedPermission::grant`] or [`SharedPermission::deny`]. Pending
/// requests wait for that decision.
#[derive(Debug, Clone)]
pub struct SharedPermission {
    state: Arc<watch::Sender<PermissionState>>,
}

impl Default for SharedPermission {
    fn default() -> Self {
        Self::new(PermissionState::Undecided)
    }
}

impl SharedPermission {
    pub fn new(initial: PermissionState) -> Self {
        let (sender, _) = watch::channel(initial);
        Self {
            state: Arc::new(sender),
        }
    }

    pub fn state(&self) -> PermissionState {
        *self.state.borrow()
    }

    pub fn grant(&self) {
        self.decide(PermissionState::Granted);
    }

    pub fn deny(&self) {
        self.decide(PermissionState::Denied);
    }

    pub fn revoke(&self) {
        self.decide(PermissionState::Undecided);
    }

    fn decide(&self, state: PermissionState) {
        let previous = self.state.send_replace(state);
        info!(?previous, current = ?state, "overlay permission changed");
    }
}

#[async_trait]
impl PermissionProvider for SharedPermission {
    async fn has_permission(&self) -> bool {
        self.state() == PermissionState::Granted
    }

    async fn request_permission(&self) -> bool {
        let mut receiver = self.state.subscribe();
        if *receiver.borrow_and_update() == PermissionState::Granted {
            return true;
        }
        // A previous denial does not answer a new request.
        loop {
            if receiver.changed().await.is_err() {
                return false;
            }
            match *receiver.borrow_and_update() {
                PermissionState::Granted => return true,
                PermissionState::Denied => return false,
                PermissionState::Undecided => continue,
            }
        }
    }
}
