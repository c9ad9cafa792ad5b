//! Fatal-error handling for a captured error stream.
//!
//! While an error stream is captured, fatal errors are written through the
//! capture as a record. Whether the error is then re-raised depends on who
//! else is observing fatal errors.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::capture::OnWrite;
use crate::logging::{diag_debug, CaptureContext};
use crate::sink::Sink;

use super::error::FatalError;
use super::observers::{observer_count, register_observer, remove_observer, rethrow, ObserverId};

/// What to do with a fatal error once its record is flushed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FatalAction {
    /// Nothing else could handle the error; restore default termination.
    Rethrow,
    /// Other observers exist or existed; leave the decision to them.
    Defer,
}

impl FatalAction {
    pub fn as_str(&self) -> &str {
        match self {
            FatalAction::Rethrow => "rethrow",
            FatalAction::Defer => "defer",
        }
    }
}

/// Decide the fate of a fatal error.
///
/// # Decision
/// 1. Another observer was registered when the capture started -> Defer
/// 2. Another observer is registered now -> Defer
/// 3. Otherwise this capture is all that stands between the error and the
///    default crash -> Rethrow
pub fn decide(had_prior: bool, observers_now: usize) -> FatalAction {
    if !had_prior && observers_now == 0 {
        FatalAction::Rethrow
    } else {
        FatalAction::Defer
    }
}

/// Prefix of the record written for a fatal error.
pub const FATAL_PREFIX: &str = "uncaught fatal error: ";

/// The fatal-error observer owned by one capture of an error stream.
///
/// Each fatal error is written through the capture as one record whose
/// message is `uncaught fatal error: <stack or message>\n` (see
/// [`FATAL_PREFIX`]). The coordinator then flushes the sink itself and
/// applies [`decide`] once the flush completes, so the outcome never depends
/// on the capture callback.
///
/// It stays registered as a one-shot observer, re-arming itself after every
/// deferred error, until the capture is restored.
pub struct FatalErrorCoordinator {
    had_prior: bool,
    on_write: OnWrite,
    sink: Arc<dyn Sink>,
    registration: Mutex<Option<ObserverId>>,
    active: AtomicBool,
    ctx: CaptureContext,
}

impl FatalErrorCoordinator {
    pub(crate) fn install(
        on_write: OnWrite,
        sink: Arc<dyn Sink>,
        ctx: CaptureContext,
    ) -> Arc<Self> {
        let coordinator = Arc::new(Self {
            had_prior: observer_count() > 0,
            on_write,
            sink,
            registration: Mutex::new(None),
            active: AtomicBool::new(true),
            ctx,
        });
        coordinator.arm();
        diag_debug!(
            coordinator.ctx,
            "FATAL_OBSERVER_INSTALLED",
            had_prior = coordinator.had_prior
        );
        coordinator
    }

    pub fn had_prior(&self) -> bool {
        self.had_prior
    }

    pub fn is_registered(&self) -> bool {
        self.registration.lock().is_some()
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Stop observing. No re-registration happens afterwards.
    pub(crate) fn uninstall(&self) {
        if !self.active.swap(false, Ordering::SeqCst) {
            return;
        }
        if let Some(id) = self.registration.lock().take() {
            remove_observer(id);
        }
        diag_debug!(self.ctx, "FATAL_OBSERVER_REMOVED");
    }

    fn arm(self: &Arc<Self>) {
        let weak = Arc::downgrade(self);
        let id = register_observer(
            true,
            Arc::new(move |err: &FatalError| {
                if let Some(coordinator) = weak.upgrade() {
                    coordinator.handle(err);
                }
            }),
        );
        *self.registration.lock() = Some(id);
    }

    fn handle(self: Arc<Self>, err: &FatalError) {
        // the one-shot registration was consumed by the dispatch
        self.registration.lock().take();

        let text = format!("{}{}\n", FATAL_PREFIX, err.render());
        (self.on_write)(text, None);

        let this = Arc::clone(&self);
        let err = err.clone();
        self.sink.flush(Box::new(move |_flushed| this.after_flush(err)));
    }

    fn after_flush(self: Arc<Self>, err: FatalError) {
        let observers = observer_count();
        let action = decide(self.had_prior, observers);
        diag_debug!(
            self.ctx,
            "FATAL_DECISION",
            action = action.as_str(),
            had_prior = self.had_prior,
            observers = observers
        );
        match action {
            FatalAction::Rethrow => rethrow(err),
            FatalAction::Defer => {
                if self.is_active() && !self.is_registered() {
                    self.arm();
                }
            }
        }
    }
}

impl Drop for FatalErrorCoordinator {
    fn drop(&mut self) {
        if let Some(id) = self.registration.get_mut().take() {
            remove_observer(id);
        }
    }
}
