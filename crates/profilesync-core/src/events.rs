//! Navigation events.
//!
//! Components that need the user moved somewhere (the request pipeline after
//! a 401, sign-in and sign-out) emit a `NavigationEvent` on the `EventBus`
//! instead of talking to a router. Whatever drives the UI subscribes and
//! performs the redirect.

use tokio::sync::broadcast;
use tracing::debug;

/// Events buffered per subscriber before the oldest are dropped
const CHANNEL_BUFFER_SIZE: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    /// Entry point for signed-out users
    Login,
    Register,
    /// Protected root (dashboard)
    Root,
    Profile,
}

impl Route {
    pub fn path(&self) -> &'static str {
        match self {
            Route::Login => "/login",
            Route::Register => "/register",
            Route::Root => "/",
            Route::Profile => "/profile",
        }
    }

    pub fn is_protected(&self) -> bool {
        matches!(self, Route::Root | Route::Profile)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavigationEvent {
    pub to: Route,
    /// Replace the current history entry instead of pushing a new one
    pub replace: bool,
}

impl NavigationEvent {
    pub fn replace(to: Route) -> Self {
        Self { to, replace: true }
    }

    pub fn push(to: Route) -> Self {
        Self { to, replace: false }
    }
}

/// Broadcasts navigation events. Cloning shares the channel.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<NavigationEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_BUFFER_SIZE);
        Self { tx }
    }

    /// Emit without waiting; an event with no subscribers is dropped.
    pub fn emit(&self, event: NavigationEvent) {
        debug!(to = event.to.path(), replace = event.replace, "Navigation requested");
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<NavigationEvent> {
        self.tx.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
