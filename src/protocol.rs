// Message types exchanged between the shell, the orchestrator, and spawned
// fetch tasks.

use crate::api::ApiError;
use crate::cache::LoadError;
use crate::model::{Poll, PollDraft, ResultSet};
use crate::results::ResultSource;

// ---------------------------------------------------------------------------
// Routes
// ---------------------------------------------------------------------------

/// The three screens of the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    List,
    Detail(u64),
    Results(u64),
}

impl Route {
    /// Navigation key for route-change detection, shaped like the original
    /// URL paths.
    pub fn key(&self) -> String {
        match self {
            Route::List => "/".to_string(),
            Route::Detail(id) => format!("/poll/{id}"),
            Route::Results(id) => format!("/poll/{id}/results"),
        }
    }

    /// The poll the route is scoped to, if any.
    pub fn poll_id(&self) -> Option<u64> {
        match self {
            Route::List => None,
            Route::Detail(id) | Route::Results(id) => Some(*id),
        }
    }
}

// ---------------------------------------------------------------------------
// UserCommand: shell -> orchestrator
// ---------------------------------------------------------------------------

/// Commands issued by the user through the front end.
#[derive(Debug, Clone)]
pub enum UserCommand {
    /// Navigate to the poll list.
    ShowList,
    /// Navigate to a poll's detail (voting) screen.
    OpenPoll(u64),
    /// Navigate to a poll's results screen.
    OpenResults(u64),
    /// Record an option choice for a poll.
    SelectOption { poll_id: u64, option_id: u64 },
    /// Submit the recorded choice for a poll.
    SubmitVote(u64),
    /// Create a new poll from unvalidated user input.
    CreatePoll(PollDraft),
    /// Explicit user-initiated refresh of the current screen.
    Refresh,
    /// The application returned to the foreground.
    Foreground,
    /// Shut down.
    Quit,
}

// ---------------------------------------------------------------------------
// FetchEvent: spawned tasks -> orchestrator
// ---------------------------------------------------------------------------

/// Completion of a spawned backend call. Load events carry the cache
/// generation assigned when the request was issued; the orchestrator
/// discards completions whose generation is no longer current.
#[derive(Debug)]
pub enum FetchEvent {
    ListLoaded {
        generation: u64,
        result: Result<Vec<Poll>, ApiError>,
    },
    PollLoaded {
        poll_id: u64,
        generation: u64,
        result: Result<Poll, ApiError>,
    },
    /// Results fetch outcome. `None` means the backend could not supply a
    /// usable set (endpoint missing or failing) and the fallback applies.
    ResultsLoaded {
        poll_id: u64,
        generation: u64,
        backend_results: Option<ResultSet>,
    },
    VoteFinished {
        poll_id: u64,
        result: Result<(), ApiError>,
    },
    CreateFinished {
        result: Result<Poll, ApiError>,
    },
}

// ---------------------------------------------------------------------------
// UiUpdate: orchestrator -> shell
// ---------------------------------------------------------------------------

/// Snapshot of the list screen.
#[derive(Debug, Clone)]
pub struct ListView {
    pub polls: Vec<Poll>,
    pub loading: bool,
    pub error: Option<LoadError>,
}

/// Snapshot of the detail (voting) screen.
#[derive(Debug, Clone)]
pub struct DetailView {
    pub poll: Option<Poll>,
    pub selection: Option<u64>,
    pub vote_in_flight: bool,
    pub loading: bool,
    pub error: Option<LoadError>,
}

/// Snapshot of the results screen. `source` tells the renderer whether the
/// counts are authoritative or a flagged placeholder.
#[derive(Debug, Clone)]
pub struct ResultsView {
    pub poll: Option<Poll>,
    pub results: Option<ResultSet>,
    pub source: ResultSource,
    pub loading: bool,
    pub error: Option<LoadError>,
}

/// State pushes from the orchestrator to the rendering layer.
#[derive(Debug, Clone)]
pub enum UiUpdate {
    List(Box<ListView>),
    Detail(Box<DetailView>),
    Results(Box<ResultsView>),
    /// The backend acknowledged a vote for this poll.
    VoteAccepted { poll_id: u64 },
    /// A vote did not go through; the selection is preserved for retry.
    VoteFailed { poll_id: u64, message: String },
    /// A poll was created; the list screen refreshes via the trigger hub.
    PollCreated(Poll),
    /// Poll creation was rejected, before or after the network call.
    CreateFailed { message: String },
}
