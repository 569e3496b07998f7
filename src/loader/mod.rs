//! Cancellable asynchronous units of work
//!
//! A `Loader` wraps one `LoadRequest`. Calling `load()` hands the request to
//! an `Executor`; the worker runs it against the `DataService` and sends a
//! `LoaderMessage` back over a channel. The control thread drains that channel
//! and decides what to apply, so no viewer state is touched off-thread.
//!
//! Cancellation is cooperative: the worker checks the `CancelToken` before and
//! after running the request and sends nothing once it is set.

mod executor;
mod request;

pub use executor::{Executor, Job, ManualExecutor, RayonExecutor};
pub use request::{LoadKind, LoadOutcome, LoadRequest};

use crate::model::ObjectKey;
use crate::service::{DataService, ServiceError};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use tracing::trace;

/// Identity of one loader, unique per `LoaderContext`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LoaderId(pub u64);

impl fmt::Display for LoaderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "loader-{}", self.0)
    }
}

/// Shared cancellation flag between a loader and its worker
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Result delivered from a worker to the control thread
#[derive(Debug)]
pub struct LoaderMessage {
    pub id: LoaderId,
    pub kind: LoadKind,
    pub result: Result<LoadOutcome, ServiceError>,
}

/// Everything a loader needs, and nothing of the viewer model
#[derive(Clone)]
pub struct LoaderContext {
    service: Arc<dyn DataService>,
    executor: Arc<dyn Executor>,
    sender: Sender<LoaderMessage>,
    next_id: Arc<AtomicU64>,
}

impl LoaderContext {
    /// Create a context and the receiving end of its result channel
    #[must_use]
    pub fn new(
        service: Arc<dyn DataService>,
        executor: Arc<dyn Executor>,
    ) -> (Self, Receiver<LoaderMessage>) {
        let (sender, receiver) = mpsc::channel();
        let context = Self {
            service,
            executor,
            sender,
            next_id: Arc::new(AtomicU64::new(1)),
        };
        (context, receiver)
    }

    /// Create a loader for `request`; nothing runs until `Loader::load`
    #[must_use]
    pub fn loader(&self, request: LoadRequest) -> Loader {
        let id = LoaderId(self.next_id.fetch_add(1, Ordering::SeqCst));
        Loader {
            id,
            kind: request.kind(),
            subject: request.subject(),
            request: Some(request),
            token: CancelToken::new(),
            service: Arc::clone(&self.service),
            executor: Arc::clone(&self.executor),
            sender: self.sender.clone(),
        }
    }

    /// Sender for results, used to inject messages from outside a worker
    #[must_use]
    pub fn sender(&self) -> Sender<LoaderMessage> {
        self.sender.clone()
    }
}

impl fmt::Debug for LoaderContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoaderContext")
            .field("next_id", &self.next_id.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

/// One cancellable asynchronous operation
pub struct Loader {
    id: LoaderId,
    kind: LoadKind,
    subject: Option<ObjectKey>,
    request: Option<LoadRequest>,
    token: CancelToken,
    service: Arc<dyn DataService>,
    executor: Arc<dyn Executor>,
    sender: Sender<LoaderMessage>,
}

impl Loader {
    #[must_use]
    pub const fn id(&self) -> LoaderId {
        self.id
    }

    #[must_use]
    pub const fn kind(&self) -> LoadKind {
        self.kind
    }

    /// Object saved by this loader, for create, update and remove
    #[must_use]
    pub const fn subject(&self) -> Option<ObjectKey> {
        self.subject
    }

    /// Whether `load` has already handed the request to the executor
    #[must_use]
    pub const fn is_started(&self) -> bool {
        self.request.is_none()
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Start the work; later calls are no-ops and return false
    pub fn load(&mut self) -> bool {
        let Some(request) = self.request.take() else {
            return false;
        };

        let id = self.id;
        let kind = self.kind;
        let token = self.token.clone();
        let service = Arc::clone(&self.service);
        let sender = self.sender.clone();

        self.executor.spawn(Box::new(move || {
            if token.is_cancelled() {
                trace!(%id, %kind, "Loader cancelled before start");
                return;
            }
            let result = request.execute(service.as_ref());
            if token.is_cancelled() {
                trace!(%id, %kind, "Loader cancelled while running, result dropped");
                return;
            }
            // The receiver is gone once the viewer is dropped
            let _ = sender.send(LoaderMessage { id, kind, result });
        }));
        true
    }

    /// Request early termination; safe to call repeatedly and after completion
    pub fn cancel(&self) {
        self.token.cancel();
    }
}

impl fmt::Debug for Loader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Loader")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("started", &self.is_started())
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}
