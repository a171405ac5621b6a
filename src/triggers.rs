// Refresh triggers: the external signals that cause cached poll state to be
// reloaded from the backend.
//
// Views subscribe to the hub on mount and unsubscribe by dropping the
// receiver on unmount, so a torn-down view can never be refreshed. The
// trigger set is deliberately decoupled from the refresh logic: every
// trigger funnels into the same orchestrator entry point.

use tokio::sync::broadcast;
use tracing::debug;

// ---------------------------------------------------------------------------
// Trigger kinds
// ---------------------------------------------------------------------------

/// Why a refresh was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshTrigger {
    /// A view was mounted (route entry).
    Mount,
    /// The user explicitly asked for a refresh.
    Manual,
    /// The application returned to the foreground.
    Foreground,
    /// Navigation returned to an already-visited route.
    RouteReturn,
    /// A poll was created elsewhere in the app.
    PollCreated,
}

// ---------------------------------------------------------------------------
// TriggerHub
// ---------------------------------------------------------------------------

/// Fan-out point for refresh triggers. Cheap to clone; each subscriber gets
/// every trigger emitted after it subscribed.
#[derive(Debug, Clone)]
pub struct TriggerHub {
    tx: broadcast::Sender<RefreshTrigger>,
}

impl TriggerHub {
    pub fn new() -> Self {
        // Triggers are tiny and bursty; a small buffer is plenty. A lagged
        // receiver missing a trigger only delays one refresh.
        let (tx, _) = broadcast::channel(16);
        TriggerHub { tx }
    }

    /// Register a listener. Dropping the returned receiver unsubscribes.
    pub fn subscribe(&self) -> broadcast::Receiver<RefreshTrigger> {
        self.tx.subscribe()
    }

    /// Emit a trigger to all current subscribers. A hub with no subscribers
    /// is fine; the trigger just goes nowhere.
    pub fn emit(&self, trigger: RefreshTrigger) {
        if self.tx.send(trigger).is_err() {
            debug!(?trigger, "refresh trigger emitted with no subscribers");
        }
    }

    /// One-shot "entity created" notification raised after a successful poll
    /// creation so the list view reloads.
    pub fn notify_poll_created(&self) {
        self.emit(RefreshTrigger::PollCreated);
    }
}

impl Default for TriggerHub {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// RouteTracker
// ---------------------------------------------------------------------------

/// Detects route changes by comparing the previous and current navigation
/// key. The orchestrator uses this to distinguish a fresh mount from staying
/// on the same route.
#[derive(Debug, Default)]
pub struct RouteTracker {
    current: Option<String>,
    visited: Vec<String>,
}

impl RouteTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a navigation to `key`. Returns the trigger the navigation
    /// amounts to: `Mount` for a first visit, `RouteReturn` when coming back
    /// to a previously visited route, and `None` when the key is unchanged.
    pub fn on_navigate(&mut self, key: &str) -> Option<RefreshTrigger> {
        if self.current.as_deref() == Some(key) {
            return None;
        }
        self.current = Some(key.to_string());
        if self.visited.iter().any(|k| k == key) {
            Some(RefreshTrigger::RouteReturn)
        } else {
            self.visited.push(key.to_string());
            Some(RefreshTrigger::Mount)
        }
    }

    pub fn current(&self) -> Option<&str> {
        self.current.as_deref()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
