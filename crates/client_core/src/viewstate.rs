//! Lifecycle management for view-bound asynchronous operations.
//!
//! Every screen that issues a fetch owns one [`ViewController`] (or an
//! [`UploadController`] for multipart uploads). The controller keeps the
//! `{idle, loading, success, error}` state consistent no matter how often
//! the operation is re-triggered: each dispatch mints a [`RequestToken`]
//! and only the most recently issued token is allowed to publish its
//! settlement. Results from superseded requests are discarded silently —
//! the underlying request is abandoned, not aborted.
//!
//! Cross-view coordination ("refresh the list after an upload") goes
//! through [`RefreshSignal`], a payload-free pulse that decouples the
//! producer from the consumer.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::watch;

use crate::error::FetchError;

/// Opaque identifier minted per dispatched operation and compared at
/// settlement to detect staleness.
pub type RequestToken = u64;

/// What a view should currently render. Exactly one variant holds at any
/// time; only the owning controller transitions between them.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewState<T> {
    Idle,
    Loading,
    Success(T),
    Error(String),
}

impl<T> ViewState<T> {
    pub fn is_idle(&self) -> bool {
        matches!(self, ViewState::Idle)
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, ViewState::Loading)
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            ViewState::Success(data) => Some(data),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            ViewState::Error(reason) => Some(reason),
            _ => None,
        }
    }
}

struct ControllerShared<T> {
    latest: Mutex<RequestToken>,
    state: watch::Sender<ViewState<T>>,
}

/// Owner of one view's [`ViewState`]. Cheap to clone; clones share the
/// same state and token sequence.
pub struct ViewController<T> {
    shared: Arc<ControllerShared<T>>,
}

impl<T> Clone for ViewController<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: Clone + Send + Sync + 'static> ViewController<T> {
    pub fn new() -> Self {
        let (state, _) = watch::channel(ViewState::Idle);
        Self {
            shared: Arc::new(ControllerShared {
                latest: Mutex::new(0),
                state,
            }),
        }
    }

    /// Starts a new attempt: transitions to `Loading` and spawns the
    /// operation. Settlement is applied only if no newer attempt has been
    /// issued in the meantime ("last write wins by issuance order").
    pub fn run<F>(&self, operation: F)
    where
        F: Future<Output = Result<T, FetchError>> + Send + 'static,
    {
        let token = self.begin();
        let controller = self.clone();
        tokio::spawn(async move {
            let outcome = operation.await;
            if !controller.settle(token, outcome) {
                tracing::debug!(token, "discarding result of superseded request");
            }
        });
    }

    /// Forces the view back to `Idle` and renders any in-flight attempt
    /// inert: a settlement arriving after `reset` is discarded.
    pub fn reset(&self) {
        let mut latest = self.lock_latest();
        *latest += 1;
        self.shared.state.send_replace(ViewState::Idle);
    }

    /// Mints a token for a manually driven attempt and publishes
    /// `Loading`. Use [`run`](Self::run) unless the caller needs to await
    /// the operation itself.
    pub fn begin(&self) -> RequestToken {
        let mut latest = self.lock_latest();
        *latest += 1;
        let token = *latest;
        self.shared.state.send_replace(ViewState::Loading);
        token
    }

    /// Publishes the outcome of the attempt identified by `token`.
    /// Returns false (and changes nothing) when the token has been
    /// superseded by a newer attempt or a reset.
    pub fn settle(&self, token: RequestToken, outcome: Result<T, FetchError>) -> bool {
        let latest = self.lock_latest();
        if *latest != token {
            return false;
        }
        let next = match outcome {
            Ok(data) => ViewState::Success(data),
            Err(err) => ViewState::Error(err.to_string()),
        };
        self.shared.state.send_replace(next);
        true
    }

    pub fn is_current(&self, token: RequestToken) -> bool {
        *self.lock_latest() == token
    }

    pub fn subscribe(&self) -> watch::Receiver<ViewState<T>> {
        self.shared.state.subscribe()
    }

    pub fn current(&self) -> ViewState<T> {
        self.shared.state.borrow().clone()
    }

    fn lock_latest(&self) -> MutexGuard<'_, RequestToken> {
        self.shared
            .latest
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T: Clone + Send + Sync + 'static> Default for ViewController<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Knobs for the synthetic upload-progress approximation. The transport
/// does not expose byte-level progress, so the controller creeps toward
/// `cap` on a timer and snaps to 100 once the upload settles.
#[derive(Debug, Clone, Copy)]
pub struct UploadTuning {
    pub cap: u8,
    pub step: u8,
    pub tick: Duration,
    /// Pause between snapping to 100 and publishing the terminal state,
    /// so the bar is visibly full before the view switches.
    pub grace: Duration,
}

impl Default for UploadTuning {
    fn default() -> Self {
        Self {
            cap: 90,
            step: 5,
            tick: Duration::from_millis(200),
            grace: Duration::from_millis(250),
        }
    }
}

/// [`ViewController`] variant for uploads: adds a 0-100 progress value
/// that is monotonically non-decreasing within an attempt and reset to 0
/// at the start of each new attempt.
pub struct UploadController<T> {
    view: ViewController<T>,
    progress: watch::Sender<u8>,
    tuning: UploadTuning,
}

impl<T> Clone for UploadController<T> {
    fn clone(&self) -> Self {
        Self {
            view: self.view.clone(),
            progress: self.progress.clone(),
            tuning: self.tuning,
        }
    }
}

impl<T: Clone + Send + Sync + 'static> UploadController<T> {
    pub fn new() -> Self {
        Self::with_tuning(UploadTuning::default())
    }

    pub fn with_tuning(tuning: UploadTuning) -> Self {
        let (progress, _) = watch::channel(0);
        Self {
            view: ViewController::new(),
            progress,
            tuning,
        }
    }

    pub fn run<F>(&self, operation: F)
    where
        F: Future<Output = Result<T, FetchError>> + Send + 'static,
    {
        let token = self.view.begin();
        self.progress.send_replace(0);

        let view = self.view.clone();
        let progress = self.progress.clone();
        let tuning = self.tuning;
        tokio::spawn(async move {
            let mut operation = Box::pin(operation);
            let mut ticker = tokio::time::interval(tuning.tick);
            // The first interval tick completes immediately; skip it so
            // progress stays at 0 until one tick has actually elapsed.
            ticker.tick().await;

            let outcome = loop {
                tokio::select! {
                    outcome = &mut operation => break outcome,
                    _ = ticker.tick() => {
                        progress.send_if_modified(|value| {
                            if !view.is_current(token) || *value >= tuning.cap {
                                return false;
                            }
                            *value = value.saturating_add(tuning.step).min(tuning.cap);
                            true
                        });
                    }
                }
            };

            if !view.is_current(token) {
                tracing::debug!(token, "discarding result of superseded upload");
                return;
            }

            if outcome.is_ok() {
                progress.send_if_modified(|value| {
                    if view.is_current(token) {
                        *value = 100;
                        true
                    } else {
                        false
                    }
                });
                if !tuning.grace.is_zero() {
                    tokio::time::sleep(tuning.grace).await;
                }
            }

            if !view.settle(token, outcome) {
                tracing::debug!(token, "upload superseded during completion grace");
            }
        });
    }

    pub fn reset(&self) {
        self.view.reset();
    }

    pub fn progress(&self) -> watch::Receiver<u8> {
        self.progress.subscribe()
    }

    pub fn subscribe(&self) -> watch::Receiver<ViewState<T>> {
        self.view.subscribe()
    }

    pub fn current(&self) -> ViewState<T> {
        self.view.current()
    }
}

impl<T: Clone + Send + Sync + 'static> Default for UploadController<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Payload-free change pulse. A producer calls [`pulse`](Self::pulse)
/// when something changed (e.g. an upload finished); listeners re-issue
/// their own fetch in response. Producer and consumer never reference
/// each other directly.
#[derive(Clone)]
pub struct RefreshSignal {
    generation: watch::Sender<u64>,
}

impl RefreshSignal {
    pub fn new() -> Self {
        let (generation, _) = watch::channel(0);
        Self { generation }
    }

    pub fn pulse(&self) {
        self.generation.send_modify(|generation| *generation += 1);
    }

    pub fn generation(&self) -> u64 {
        *self.generation.borrow()
    }

    pub fn subscribe(&self) -> RefreshListener {
        RefreshListener {
            generation: self.generation.subscribe(),
        }
    }
}

impl Default for RefreshSignal {
    fn default() -> Self {
        Self::new()
    }
}

pub struct RefreshListener {
    generation: watch::Receiver<u64>,
}

impl RefreshListener {
    /// Waits for the next pulse. Returns false once every signal handle
    /// has been dropped, which listeners treat as shutdown.
    pub async fn changed(&mut self) -> bool {
        self.generation.changed().await.is_ok()
    }

    pub fn generation(&mut self) -> u64 {
        *self.generation.borrow_and_update()
    }
}
