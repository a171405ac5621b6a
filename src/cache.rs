// Generation-tagged refresh cache with stale-while-revalidate semantics.
//
// Each view owns one `RefreshCache` per remote resource. `begin()` hands out
// a generation number for the request about to be spawned; `complete()`
// applies the response only if that generation is still the latest, so
// out-of-order responses and responses that land after the view moved on are
// silently discarded. On failure the previously cached value stays in place;
// the error only blocks the view when there is no prior data to show.

use chrono::{DateTime, Utc};

use crate::api::ApiError;

// ---------------------------------------------------------------------------
// Load errors as surfaced to the UI
// ---------------------------------------------------------------------------

/// Coarse error classification the UI renders next to stale data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadErrorKind {
    /// The backend was unreachable or the request timed out.
    Network,
    /// The backend answered with a non-success status or an unreadable body.
    Server,
}

/// Error state attached to a cache after a failed refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadError {
    pub kind: LoadErrorKind,
    pub message: String,
}

impl From<&ApiError> for LoadError {
    fn from(err: &ApiError) -> Self {
        let kind = if err.is_network() {
            LoadErrorKind::Network
        } else {
            LoadErrorKind::Server
        };
        LoadError {
            kind,
            message: err.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// RefreshCache
// ---------------------------------------------------------------------------

/// Outcome of `complete()`: whether the response was applied or discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// The response matched the latest generation and updated the cache.
    Applied,
    /// The response was from a superseded request and was discarded.
    Stale,
}

/// Locally cached view of one remote resource.
#[derive(Debug)]
pub struct RefreshCache<T> {
    data: Option<T>,
    loading: bool,
    error: Option<LoadError>,
    /// Generation of the most recently issued request. Incremented by
    /// `begin()` and `reset()`; completions carrying an older generation
    /// are discarded.
    generation: u64,
    last_refreshed: Option<DateTime<Utc>>,
}

impl<T> Default for RefreshCache<T> {
    fn default() -> Self {
        RefreshCache {
            data: None,
            loading: false,
            error: None,
            generation: 0,
            last_refreshed: None,
        }
    }
}

impl<T> RefreshCache<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a refresh: flip to loading and return the generation the
    /// spawned request must echo back into `complete()`.
    pub fn begin(&mut self) -> u64 {
        self.generation += 1;
        self.loading = true;
        self.generation
    }

    /// Apply a completed request.
    ///
    /// Success replaces the cached value atomically and clears any error.
    /// Failure records the error but leaves previously cached data in place.
    /// A response from a superseded generation is discarded without touching
    /// any state, including the loading flag (a newer request is in flight).
    pub fn complete(&mut self, generation: u64, result: Result<T, ApiError>) -> Completion {
        if generation != self.generation {
            return Completion::Stale;
        }
        self.loading = false;
        match result {
            Ok(value) => {
                self.data = Some(value);
                self.error = None;
                self.last_refreshed = Some(Utc::now());
            }
            Err(err) => {
                self.error = Some(LoadError::from(&err));
            }
        }
        Completion::Applied
    }

    /// Discard everything, including any in-flight request. Used when the
    /// view navigates to a different resource: a response for the old
    /// resource must never be applied to the new one.
    pub fn reset(&mut self) {
        self.generation += 1;
        self.data = None;
        self.loading = false;
        self.error = None;
        self.last_refreshed = None;
    }

    /// Invalidate any in-flight request without dropping cached data. Used
    /// on unmount so a late response cannot resurrect the view's state.
    pub fn retire_inflight(&mut self) {
        self.generation += 1;
        self.loading = false;
    }

    pub fn data(&self) -> Option<&T> {
        self.data.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&LoadError> {
        self.error.as_ref()
    }

    /// A failure with nothing cached to fall back on: the view has nothing
    /// to render but the error.
    pub fn is_blocking_error(&self) -> bool {
        self.data.is_none() && self.error.is_some()
    }

    pub fn last_refreshed(&self) -> Option<DateTime<Utc>> {
        self.last_refreshed
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
