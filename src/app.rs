// Application state and orchestration logic.
//
// The central event loop that coordinates user commands from the shell,
// refresh triggers, and fetch completions from spawned backend calls. Owns
// every per-view cache and pushes snapshot updates to the rendering loop.
//
// All backend calls run in spawned tasks that report back over an mpsc
// channel as `FetchEvent`s tagged with the cache generation assigned at
// spawn time. No request is ever cancelled; completions from superseded
// requests (a newer refresh, or a route change that unmounted the view) are
// discarded by the generation guard.

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

use crate::api::PollBackend;
use crate::cache::{Completion, RefreshCache};
use crate::model::{Poll, PollDraft, ResultSet};
use crate::protocol::{
    DetailView, FetchEvent, ListView, ResultsView, Route, UiUpdate, UserCommand,
};
use crate::results::{self, PlaceholderMode, ResultSource};
use crate::triggers::{RefreshTrigger, RouteTracker, TriggerHub};
use crate::vote::VoteCoordinator;

// ---------------------------------------------------------------------------
// AppState
// ---------------------------------------------------------------------------

/// The complete client-side state: one cache per view, the vote coordinator,
/// and the navigation tracker. Owned exclusively by the event loop task.
pub struct AppState {
    backend: Arc<dyn PollBackend>,
    placeholder_mode: PlaceholderMode,
    triggers: TriggerHub,
    routes: RouteTracker,
    route: Route,
    /// Cached poll collection for the list view.
    list: RefreshCache<Vec<Poll>>,
    /// Cached single poll for the detail and results views.
    detail: RefreshCache<Poll>,
    /// Raw backend results for the results view. `Some(None)` in the cache
    /// means the fetch completed but the backend had no usable set, which is
    /// the fallback case.
    backend_results: RefreshCache<Option<ResultSet>>,
    votes: VoteCoordinator,
    /// Sender spawned fetch tasks use to report completions.
    fetch_tx: mpsc::Sender<FetchEvent>,
}

impl AppState {
    pub fn new(
        backend: Arc<dyn PollBackend>,
        placeholder_mode: PlaceholderMode,
        triggers: TriggerHub,
        fetch_tx: mpsc::Sender<FetchEvent>,
    ) -> Self {
        AppState {
            backend,
            placeholder_mode,
            triggers,
            routes: RouteTracker::new(),
            route: Route::List,
            list: RefreshCache::new(),
            detail: RefreshCache::new(),
            backend_results: RefreshCache::new(),
            votes: VoteCoordinator::new(),
            fetch_tx,
        }
    }

    pub fn route(&self) -> Route {
        self.route
    }

    // -- Navigation -----------------------------------------------------

    /// Switch to `route`, retiring in-flight requests for the view being
    /// left and refreshing the view being entered. A response for an
    /// unmounted view must never be applied, so the old route's caches bump
    /// their generation here.
    pub async fn navigate(&mut self, route: Route, ui_tx: &mpsc::Sender<UiUpdate>) {
        let Some(trigger) = self.routes.on_navigate(&route.key()) else {
            // Same route; nothing to unmount or refresh.
            return;
        };

        match self.route {
            Route::List => self.list.retire_inflight(),
            Route::Detail(_) => self.detail.retire_inflight(),
            Route::Results(_) => {
                self.detail.retire_inflight();
                self.backend_results.retire_inflight();
            }
        }

        // Crossing to a different poll invalidates the cached detail state;
        // two views of the same poll may keep it (stale-but-available).
        if route.poll_id() != self.route.poll_id() && route.poll_id().is_some() {
            self.detail.reset();
            self.backend_results.reset();
        }

        info!(?route, ?trigger, "navigating");
        self.route = route;
        self.refresh_current(trigger);
        self.push_current(ui_tx).await;
    }

    // -- Refresh --------------------------------------------------------

    /// Refresh whatever the current route shows. Every trigger funnels into
    /// this single entry point.
    pub fn refresh_current(&mut self, trigger: RefreshTrigger) {
        debug!(?trigger, route = ?self.route, "refresh");
        match self.route {
            Route::List => self.spawn_list_fetch(),
            Route::Detail(poll_id) => self.spawn_poll_fetch(poll_id),
            Route::Results(poll_id) => {
                self.spawn_poll_fetch(poll_id);
                self.spawn_results_fetch(poll_id);
            }
        }
    }

    fn spawn_list_fetch(&mut self) {
        let generation = self.list.begin();
        let backend = Arc::clone(&self.backend);
        let tx = self.fetch_tx.clone();
        tokio::spawn(async move {
            let result = backend.list_polls().await;
            let _ = tx.send(FetchEvent::ListLoaded { generation, result }).await;
        });
    }

    fn spawn_poll_fetch(&mut self, poll_id: u64) {
        let generation = self.detail.begin();
        let backend = Arc::clone(&self.backend);
        let tx = self.fetch_tx.clone();
        tokio::spawn(async move {
            let result = backend.get_poll(poll_id).await;
            let _ = tx
                .send(FetchEvent::PollLoaded {
                    poll_id,
                    generation,
                    result,
                })
                .await;
        });
    }

    fn spawn_results_fetch(&mut self, poll_id: u64) {
        let generation = self.backend_results.begin();
        let backend = Arc::clone(&self.backend);
        let tx = self.fetch_tx.clone();
        tokio::spawn(async move {
            // A failing or missing results endpoint is not an error state for
            // the view; it selects the flagged placeholder path instead.
            let backend_results = match backend.get_poll_results(poll_id).await {
                Ok(set) => Some(set),
                Err(err) => {
                    warn!(poll_id, %err, "results unavailable, falling back to placeholder");
                    None
                }
            };
            let _ = tx
                .send(FetchEvent::ResultsLoaded {
                    poll_id,
                    generation,
                    backend_results,
                })
                .await;
        });
    }

    // -- Trigger handling ------------------------------------------------

    /// Map an external trigger onto the currently mounted view.
    pub async fn handle_trigger(&mut self, trigger: RefreshTrigger, ui_tx: &mpsc::Sender<UiUpdate>) {
        match trigger {
            // Raised after a successful creation elsewhere in the app; only
            // a mounted list view cares.
            RefreshTrigger::PollCreated => {
                if self.route == Route::List {
                    self.refresh_current(trigger);
                    self.push_current(ui_tx).await;
                }
            }
            RefreshTrigger::Manual | RefreshTrigger::Foreground => {
                self.refresh_current(trigger);
                self.push_current(ui_tx).await;
            }
            // Mount and route-return arise from `navigate`, which already
            // refreshed; a hub emission of these still maps to a refresh.
            RefreshTrigger::Mount | RefreshTrigger::RouteReturn => {
                self.refresh_current(trigger);
                self.push_current(ui_tx).await;
            }
        }
    }

    // -- Command handling ------------------------------------------------

    pub async fn handle_command(&mut self, cmd: UserCommand, ui_tx: &mpsc::Sender<UiUpdate>) {
        match cmd {
            UserCommand::ShowList => self.navigate(Route::List, ui_tx).await,
            UserCommand::OpenPoll(id) => self.navigate(Route::Detail(id), ui_tx).await,
            UserCommand::OpenResults(id) => self.navigate(Route::Results(id), ui_tx).await,
            UserCommand::SelectOption { poll_id, option_id } => {
                self.select_option(poll_id, option_id, ui_tx).await;
            }
            UserCommand::SubmitVote(poll_id) => self.submit_vote(poll_id, ui_tx).await,
            UserCommand::CreatePoll(draft) => self.create_poll(draft, ui_tx).await,
            UserCommand::Refresh => self.triggers.emit(RefreshTrigger::Manual),
            UserCommand::Foreground => self.triggers.emit(RefreshTrigger::Foreground),
            UserCommand::Quit => {
                // Handled in the main loop.
            }
        }
    }

    /// Look up the loaded poll a vote operation refers to. The detail cache
    /// is authoritative; operating on a poll that isn't loaded is reported,
    /// not silently ignored.
    fn loaded_poll(&self, poll_id: u64) -> Option<&Poll> {
        self.detail.data().filter(|p| p.id == poll_id)
    }

    async fn select_option(&mut self, poll_id: u64, option_id: u64, ui_tx: &mpsc::Sender<UiUpdate>) {
        let Some(poll) = self.loaded_poll(poll_id) else {
            let _ = ui_tx
                .send(UiUpdate::VoteFailed {
                    poll_id,
                    message: format!("poll {poll_id} is not loaded"),
                })
                .await;
            return;
        };
        let poll = poll.clone();
        if let Err(err) = self.votes.select_option(&poll, option_id) {
            let _ = ui_tx
                .send(UiUpdate::VoteFailed {
                    poll_id,
                    message: err.to_string(),
                })
                .await;
            return;
        }
        self.push_current(ui_tx).await;
    }

    /// Validate and submit the recorded selection for `poll_id`. Validation
    /// failures surface before any network call is issued.
    async fn submit_vote(&mut self, poll_id: u64, ui_tx: &mpsc::Sender<UiUpdate>) {
        let Some(poll) = self.loaded_poll(poll_id).cloned() else {
            let _ = ui_tx
                .send(UiUpdate::VoteFailed {
                    poll_id,
                    message: format!("poll {poll_id} is not loaded"),
                })
                .await;
            return;
        };

        let option_id = match self.votes.begin_submit(&poll) {
            Ok(option_id) => option_id,
            Err(err) => {
                let _ = ui_tx
                    .send(UiUpdate::VoteFailed {
                        poll_id,
                        message: err.to_string(),
                    })
                    .await;
                return;
            }
        };

        info!(poll_id, option_id, "submitting vote");
        let backend = Arc::clone(&self.backend);
        let tx = self.fetch_tx.clone();
        tokio::spawn(async move {
            let result = backend.cast_vote(poll_id, option_id).await;
            let _ = tx.send(FetchEvent::VoteFinished { poll_id, result }).await;
        });

        // Reflect the in-flight flag immediately so the UI disables
        // re-submission for this poll.
        self.push_current(ui_tx).await;
    }

    async fn create_poll(&mut self, draft: PollDraft, ui_tx: &mpsc::Sender<UiUpdate>) {
        let request = match draft.validate() {
            Ok(request) => request,
            Err(err) => {
                // Rejected client-side; the backend is never contacted.
                let _ = ui_tx
                    .send(UiUpdate::CreateFailed {
                        message: err.to_string(),
                    })
                    .await;
                return;
            }
        };

        info!(question = %request.question, "creating poll");
        let backend = Arc::clone(&self.backend);
        let tx = self.fetch_tx.clone();
        tokio::spawn(async move {
            let result = backend.create_poll(&request).await;
            let _ = tx.send(FetchEvent::CreateFinished { result }).await;
        });
    }

    // -- Fetch completions -----------------------------------------------

    pub async fn handle_fetch(&mut self, event: FetchEvent, ui_tx: &mpsc::Sender<UiUpdate>) {
        match event {
            FetchEvent::ListLoaded { generation, result } => {
                if self.list.complete(generation, result) == Completion::Stale {
                    debug!("discarding stale poll list response");
                    return;
                }
                if self.list.error().is_none() {
                    // Per-poll selections don't survive a list reload.
                    self.votes.clear_selections();
                }
                if self.route == Route::List {
                    self.push_current(ui_tx).await;
                }
            }
            FetchEvent::PollLoaded {
                poll_id,
                generation,
                result,
            } => {
                if self.detail.complete(generation, result) == Completion::Stale {
                    debug!(poll_id, "discarding stale poll response");
                    return;
                }
                if let Some(poll) = self.detail.data() {
                    let poll = poll.clone();
                    if self.votes.reconcile(&poll) {
                        info!(poll_id, "stale selection dropped after refresh");
                    }
                }
                if self.route.poll_id() == Some(poll_id) {
                    self.push_current(ui_tx).await;
                }
            }
            FetchEvent::ResultsLoaded {
                poll_id,
                generation,
                backend_results,
            } => {
                if self.backend_results.complete(generation, Ok(backend_results))
                    == Completion::Stale
                {
                    debug!(poll_id, "discarding stale results response");
                    return;
                }
                if self.route == Route::Results(poll_id) {
                    self.push_current(ui_tx).await;
                }
            }
            FetchEvent::VoteFinished { poll_id, result } => {
                match result {
                    Ok(()) => {
                        self.votes.finish_submit(poll_id, true);
                        info!(poll_id, "vote acknowledged");
                        let _ = ui_tx.send(UiUpdate::VoteAccepted { poll_id }).await;
                    }
                    Err(err) => {
                        // Selection stays in place so the user can retry.
                        self.votes.finish_submit(poll_id, false);
                        warn!(poll_id, %err, "vote failed");
                        let _ = ui_tx
                            .send(UiUpdate::VoteFailed {
                                poll_id,
                                message: err.to_string(),
                            })
                            .await;
                    }
                }
                if self.route.poll_id() == Some(poll_id) {
                    self.push_current(ui_tx).await;
                }
            }
            FetchEvent::CreateFinished { result } => match result {
                Ok(poll) => {
                    info!(poll_id = poll.id, "poll created");
                    let _ = ui_tx.send(UiUpdate::PollCreated(poll)).await;
                    self.triggers.notify_poll_created();
                }
                Err(err) => {
                    warn!(%err, "poll creation failed");
                    let _ = ui_tx
                        .send(UiUpdate::CreateFailed {
                            message: err.to_string(),
                        })
                        .await;
                }
            },
        }
    }

    // -- Snapshots -------------------------------------------------------

    pub fn list_view(&self) -> ListView {
        ListView {
            polls: self.list.data().cloned().unwrap_or_default(),
            loading: self.list.is_loading(),
            error: self.list.error().cloned(),
        }
    }

    pub fn detail_view(&self, poll_id: u64) -> DetailView {
        DetailView {
            poll: self.loaded_poll(poll_id).cloned(),
            selection: self.votes.selection(poll_id),
            vote_in_flight: self.votes.is_in_flight(poll_id),
            loading: self.detail.is_loading(),
            error: self.detail.error().cloned(),
        }
    }

    pub fn results_view(&self, poll_id: u64) -> ResultsView {
        let poll = self.loaded_poll(poll_id).cloned();
        // Resolve only once both the poll and the results fetch landed; the
        // source flag records whether the counts are real.
        let resolved = match (&poll, self.backend_results.data()) {
            (Some(poll), Some(outcome)) => {
                Some(results::resolve(poll, outcome.clone(), self.placeholder_mode))
            }
            _ => None,
        };
        let (results, source) = match resolved {
            Some((set, source)) => (Some(set), source),
            None => (None, ResultSource::Placeholder),
        };
        ResultsView {
            poll,
            results,
            source,
            loading: self.detail.is_loading() || self.backend_results.is_loading(),
            error: self.detail.error().cloned(),
        }
    }

    /// Push a snapshot of the current route's view to the renderer.
    async fn push_current(&self, ui_tx: &mpsc::Sender<UiUpdate>) {
        let update = match self.route {
            Route::List => UiUpdate::List(Box::new(self.list_view())),
            Route::Detail(poll_id) => UiUpdate::Detail(Box::new(self.detail_view(poll_id))),
            Route::Results(poll_id) => UiUpdate::Results(Box::new(self.results_view(poll_id))),
        };
        let _ = ui_tx.send(update).await;
    }
}

// ---------------------------------------------------------------------------
// Main event loop
// ---------------------------------------------------------------------------

/// Run the orchestrator event loop.
///
/// Listens on three sources with `tokio::select!`:
/// 1. User commands from the shell
/// 2. Fetch completions from spawned backend calls
/// 3. Refresh triggers from the hub (foreground, manual, poll-created)
///
/// Starts by mounting the list route. Returns when the user quits or the
/// command channel closes.
pub async fn run(
    mut cmd_rx: mpsc::Receiver<UserCommand>,
    mut fetch_rx: mpsc::Receiver<FetchEvent>,
    mut trigger_rx: broadcast::Receiver<RefreshTrigger>,
    ui_tx: mpsc::Sender<UiUpdate>,
    mut state: AppState,
) -> anyhow::Result<()> {
    info!("orchestrator event loop started");

    // Initial mount of the list view.
    state.navigate(Route::List, &ui_tx).await;

    let mut triggers_open = true;

    loop {
        tokio::select! {
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(UserCommand::Quit) | None => {
                        info!("command channel done, shutting down");
                        break;
                    }
                    Some(cmd) => state.handle_command(cmd, &ui_tx).await,
                }
            }

            fetch = fetch_rx.recv() => {
                match fetch {
                    Some(event) => state.handle_fetch(event, &ui_tx).await,
                    None => {
                        info!("fetch channel closed, shutting down");
                        break;
                    }
                }
            }

            trigger = trigger_rx.recv(), if triggers_open => {
                match trigger {
                    Ok(trigger) => state.handle_trigger(trigger, &ui_tx).await,
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        // Coalesced triggers just mean one refresh covers them.
                        warn!(missed, "trigger receiver lagged, refreshing once");
                        state.handle_trigger(RefreshTrigger::Manual, &ui_tx).await;
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        info!("trigger hub closed");
                        triggers_open = false;
                    }
                }
            }
        }
    }

    info!("orchestrator event loop exiting");
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ApiError, PollBackend};
    use crate::model::{NewPollRequest, PollOption};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;

    // -----------------------------------------------------------------------
    // Mock backend
    // -----------------------------------------------------------------------

    #[derive(Default)]
    struct MockBackend {
        polls: Mutex<Vec<Poll>>,
        results: Mutex<HashMap<u64, ResultSet>>,
        fail_list: AtomicBool,
        fail_vote: AtomicBool,
        list_calls: AtomicUsize,
        vote_calls: AtomicUsize,
        create_calls: AtomicUsize,
    }

    impl MockBackend {
        fn with_polls(polls: Vec<Poll>) -> Arc<Self> {
            Arc::new(MockBackend {
                polls: Mutex::new(polls),
                ..MockBackend::default()
            })
        }
    }

    #[async_trait::async_trait]
    impl PollBackend for MockBackend {
        async fn list_polls(&self) -> Result<Vec<Poll>, ApiError> {
            self.list_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_list.load(Ordering::SeqCst) {
                return Err(ApiError::Server { status: 500 });
            }
            Ok(self.polls.lock().unwrap().clone())
        }

        async fn get_poll(&self, poll_id: u64) -> Result<Poll, ApiError> {
            self.polls
                .lock()
                .unwrap()
                .iter()
                .find(|p| p.id == poll_id)
                .cloned()
                .ok_or(ApiError::Server { status: 404 })
        }

        async fn get_poll_results(&self, poll_id: u64) -> Result<ResultSet, ApiError> {
            self.results
                .lock()
                .unwrap()
                .get(&poll_id)
                .cloned()
                .ok_or(ApiError::Server { status: 404 })
        }

        async fn cast_vote(&self, _poll_id: u64, _option_id: u64) -> Result<(), ApiError> {
            self.vote_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_vote.load(Ordering::SeqCst) {
                return Err(ApiError::Server { status: 500 });
            }
            Ok(())
        }

        async fn create_poll(&self, request: &NewPollRequest) -> Result<Poll, ApiError> {
            self.create_calls.fetch_add(1, Ordering::SeqCst);
            let mut polls = self.polls.lock().unwrap();
            let id = polls.iter().map(|p| p.id).max().unwrap_or(0) + 1;
            let poll = Poll {
                id,
                question: request.question.clone(),
                options: request
                    .options
                    .iter()
                    .enumerate()
                    .map(|(i, o)| PollOption {
                        id: id * 10 + i as u64,
                        value: o.value.clone(),
                    })
                    .collect(),
            };
            polls.push(poll.clone());
            Ok(poll)
        }
    }

    // -----------------------------------------------------------------------
    // Harness
    // -----------------------------------------------------------------------

    struct Harness {
        state: AppState,
        backend: Arc<MockBackend>,
        fetch_rx: mpsc::Receiver<FetchEvent>,
        ui_tx: mpsc::Sender<UiUpdate>,
        ui_rx: mpsc::Receiver<UiUpdate>,
    }

    fn harness(polls: Vec<Poll>) -> Harness {
        let backend = MockBackend::with_polls(polls);
        let (fetch_tx, fetch_rx) = mpsc::channel(32);
        let (ui_tx, ui_rx) = mpsc::channel(64);
        let state = AppState::new(
            Arc::clone(&backend) as Arc<dyn PollBackend>,
            PlaceholderMode::Zero,
            TriggerHub::new(),
            fetch_tx,
        );
        Harness {
            state,
            backend,
            fetch_rx,
            ui_tx,
            ui_rx,
        }
    }

    impl Harness {
        /// Wait for the next spawned fetch to complete and feed it back into
        /// the orchestrator, mirroring one turn of the event loop.
        async fn pump_fetch(&mut self) {
            let event = self.fetch_rx.recv().await.expect("a fetch should complete");
            let ui_tx = self.ui_tx.clone();
            self.state.handle_fetch(event, &ui_tx).await;
        }

        fn drain_ui(&mut self) -> Vec<UiUpdate> {
            let mut updates = Vec::new();
            while let Ok(update) = self.ui_rx.try_recv() {
                updates.push(update);
            }
            updates
        }
    }

    fn sample_poll() -> Poll {
        Poll {
            id: 1,
            question: "Pick one".into(),
            options: vec![
                PollOption {
                    id: 10,
                    value: "A".into(),
                },
                PollOption {
                    id: 11,
                    value: "B".into(),
                },
            ],
        }
    }

    // -----------------------------------------------------------------------
    // Scenarios
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn mount_loads_list() {
        let mut h = harness(vec![sample_poll()]);
        let ui_tx = h.ui_tx.clone();

        h.state.navigate(Route::List, &ui_tx).await;
        h.pump_fetch().await;

        let view = h.state.list_view();
        assert!(!view.loading);
        assert_eq!(view.polls.len(), 1);
        assert_eq!(h.backend.list_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn list_failure_keeps_cached_polls() {
        let mut h = harness(vec![sample_poll()]);
        let ui_tx = h.ui_tx.clone();

        h.state.navigate(Route::List, &ui_tx).await;
        h.pump_fetch().await;

        h.backend.fail_list.store(true, Ordering::SeqCst);
        h.state.refresh_current(RefreshTrigger::Manual);
        h.pump_fetch().await;

        let view = h.state.list_view();
        assert_eq!(view.polls.len(), 1, "stale list must stay visible");
        assert!(view.error.is_some());
    }

    #[tokio::test]
    async fn list_failure_with_no_data_is_blocking() {
        let mut h = harness(vec![]);
        h.backend.fail_list.store(true, Ordering::SeqCst);
        let ui_tx = h.ui_tx.clone();

        h.state.navigate(Route::List, &ui_tx).await;
        h.pump_fetch().await;

        let view = h.state.list_view();
        assert!(view.polls.is_empty());
        assert!(view.error.is_some());
    }

    #[tokio::test]
    async fn vote_happy_path_clears_selection() {
        let mut h = harness(vec![sample_poll()]);
        let ui_tx = h.ui_tx.clone();

        h.state.navigate(Route::Detail(1), &ui_tx).await;
        h.pump_fetch().await;

        h.state.select_option(1, 10, &ui_tx).await;
        h.state.submit_vote(1, &ui_tx).await;

        let view = h.state.detail_view(1);
        assert!(view.vote_in_flight);

        h.pump_fetch().await;

        let view = h.state.detail_view(1);
        assert_eq!(view.selection, None, "success clears the selection");
        assert!(!view.vote_in_flight);
        assert!(h
            .drain_ui()
            .iter()
            .any(|u| matches!(u, UiUpdate::VoteAccepted { poll_id: 1 })));
    }

    #[tokio::test]
    async fn vote_without_selection_never_hits_network() {
        let mut h = harness(vec![sample_poll()]);
        let ui_tx = h.ui_tx.clone();

        h.state.navigate(Route::Detail(1), &ui_tx).await;
        h.pump_fetch().await;

        h.state.submit_vote(1, &ui_tx).await;

        assert_eq!(h.backend.vote_calls.load(Ordering::SeqCst), 0);
        assert!(h
            .drain_ui()
            .iter()
            .any(|u| matches!(u, UiUpdate::VoteFailed { poll_id: 1, .. })));
    }

    #[tokio::test]
    async fn vote_failure_preserves_selection() {
        let mut h = harness(vec![sample_poll()]);
        h.backend.fail_vote.store(true, Ordering::SeqCst);
        let ui_tx = h.ui_tx.clone();

        h.state.navigate(Route::Detail(1), &ui_tx).await;
        h.pump_fetch().await;

        h.state.select_option(1, 10, &ui_tx).await;
        h.state.submit_vote(1, &ui_tx).await;
        h.pump_fetch().await;

        let view = h.state.detail_view(1);
        assert_eq!(view.selection, Some(10), "failed vote keeps the selection");
        assert!(!view.vote_in_flight);
    }

    #[tokio::test]
    async fn create_poll_validation_skips_backend() {
        let mut h = harness(vec![]);
        let ui_tx = h.ui_tx.clone();

        h.state
            .create_poll(
                PollDraft {
                    question: String::new(),
                    options: vec!["A".into(), "B".into()],
                },
                &ui_tx,
            )
            .await;
        h.state
            .create_poll(
                PollDraft {
                    question: "Q".into(),
                    options: vec!["X".into()],
                },
                &ui_tx,
            )
            .await;

        assert_eq!(h.backend.create_calls.load(Ordering::SeqCst), 0);
        let failures = h
            .drain_ui()
            .into_iter()
            .filter(|u| matches!(u, UiUpdate::CreateFailed { .. }))
            .count();
        assert_eq!(failures, 2);
    }

    #[tokio::test]
    async fn create_poll_success_raises_created_trigger() {
        let mut h = harness(vec![]);
        let mut trigger_rx = h.state.triggers.subscribe();
        let ui_tx = h.ui_tx.clone();

        h.state
            .create_poll(
                PollDraft {
                    question: "Q".into(),
                    options: vec!["A".into(), "B".into()],
                },
                &ui_tx,
            )
            .await;
        h.pump_fetch().await;

        assert_eq!(h.backend.create_calls.load(Ordering::SeqCst), 1);
        assert_eq!(trigger_rx.recv().await.unwrap(), RefreshTrigger::PollCreated);
        assert!(h
            .drain_ui()
            .iter()
            .any(|u| matches!(u, UiUpdate::PollCreated(_))));
    }

    #[tokio::test]
    async fn results_fallback_is_flagged_placeholder() {
        // Backend has the poll but no results endpoint for it.
        let mut h = harness(vec![sample_poll()]);
        let ui_tx = h.ui_tx.clone();

        h.state.navigate(Route::Results(1), &ui_tx).await;
        h.pump_fetch().await;
        h.pump_fetch().await;

        let view = h.state.results_view(1);
        let set = view.results.expect("a renderable set must exist");
        assert_eq!(view.source, ResultSource::Placeholder);
        assert!(set.is_consistent_with(view.poll.as_ref().unwrap()));
        assert_eq!(set.total_votes, 0);
    }

    #[tokio::test]
    async fn backend_results_pass_through_as_authoritative() {
        let h_poll = sample_poll();
        let mut h = harness(vec![h_poll.clone()]);
        let set = ResultSet {
            total_votes: 4,
            results: vec![
                crate::model::OptionCount {
                    option_id: 10,
                    option_value: "A".into(),
                    count: 1,
                },
                crate::model::OptionCount {
                    option_id: 11,
                    option_value: "B".into(),
                    count: 3,
                },
            ],
        };
        h.backend.results.lock().unwrap().insert(1, set.clone());
        let ui_tx = h.ui_tx.clone();

        h.state.navigate(Route::Results(1), &ui_tx).await;
        h.pump_fetch().await;
        h.pump_fetch().await;

        let view = h.state.results_view(1);
        assert_eq!(view.source, ResultSource::Backend);
        assert_eq!(view.results, Some(set));
    }

    #[tokio::test]
    async fn response_after_route_change_is_discarded() {
        let mut h = harness(vec![sample_poll()]);
        let ui_tx = h.ui_tx.clone();

        // Start loading the list, then navigate away before it resolves.
        h.state.navigate(Route::List, &ui_tx).await;
        h.state.navigate(Route::Detail(1), &ui_tx).await;

        // Both responses arrive; the list one targets an unmounted view.
        h.pump_fetch().await;
        h.pump_fetch().await;

        // Back on the list route: nothing was applied for the retired
        // request, so the list is empty and a fresh load starts.
        h.state.navigate(Route::List, &ui_tx).await;
        let view = h.state.list_view();
        assert!(view.polls.is_empty());
        assert!(view.loading);
    }

    #[tokio::test]
    async fn navigating_between_polls_resets_detail() {
        let mut second = sample_poll();
        second.id = 2;
        second.options = vec![PollOption {
            id: 20,
            value: "C".into(),
        }];
        let mut h = harness(vec![sample_poll(), second]);
        let ui_tx = h.ui_tx.clone();

        h.state.navigate(Route::Detail(1), &ui_tx).await;
        h.pump_fetch().await;
        assert_eq!(h.state.detail_view(1).poll.as_ref().unwrap().id, 1);

        h.state.navigate(Route::Detail(2), &ui_tx).await;
        // Before the fetch lands the old poll must not bleed through.
        assert!(h.state.detail_view(2).poll.is_none());

        h.pump_fetch().await;
        assert_eq!(h.state.detail_view(2).poll.as_ref().unwrap().id, 2);
    }

    #[tokio::test]
    async fn poll_created_trigger_refreshes_mounted_list_only() {
        let mut h = harness(vec![sample_poll()]);
        let ui_tx = h.ui_tx.clone();

        h.state.navigate(Route::Detail(1), &ui_tx).await;
        h.pump_fetch().await;
        let calls_before = h.backend.list_calls.load(Ordering::SeqCst);

        // Not on the list route: the trigger is ignored.
        h.state
            .handle_trigger(RefreshTrigger::PollCreated, &ui_tx)
            .await;
        assert_eq!(h.backend.list_calls.load(Ordering::SeqCst), calls_before);

        h.state.navigate(Route::List, &ui_tx).await;
        h.pump_fetch().await;
        let calls_before = h.backend.list_calls.load(Ordering::SeqCst);

        h.state
            .handle_trigger(RefreshTrigger::PollCreated, &ui_tx)
            .await;
        h.pump_fetch().await;
        assert_eq!(h.backend.list_calls.load(Ordering::SeqCst), calls_before + 1);
    }

    #[tokio::test]
    async fn list_reload_clears_selections() {
        let mut h = harness(vec![sample_poll()]);
        let ui_tx = h.ui_tx.clone();

        h.state.navigate(Route::Detail(1), &ui_tx).await;
        h.pump_fetch().await;
        h.state.select_option(1, 10, &ui_tx).await;
        assert_eq!(h.state.detail_view(1).selection, Some(10));

        h.state.navigate(Route::List, &ui_tx).await;
        h.pump_fetch().await;

        assert_eq!(h.state.detail_view(1).selection, None);
    }
}
