//! Process-wide fatal-error observers.
//!
//! A fatal error is offered to every registered observer. With no observers
//! registered it is re-raised, which is the default "crash on unhandled
//! error" behavior.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::sync::Arc;

use lazy_static::lazy_static;
use parking_lot::Mutex;

use crate::logging::{diag_debug, diag_warn};

use super::error::FatalError;

/// Observers registered beyond this count trigger a leak warning.
pub const DEFAULT_MAX_OBSERVERS: usize = 10;

pub type FatalObserver = Arc<dyn Fn(&FatalError) + Send + Sync>;
pub type RethrowHook = Arc<dyn Fn(&FatalError) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

#[derive(Clone)]
struct Entry {
    id: ObserverId,
    once: bool,
    observer: FatalObserver,
}

/// Observers removed with [`take_observers`], to be put back later.
pub struct ObserverSet(Vec<Entry>);

impl ObserverSet {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for ObserverSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.0.iter().map(|e| (e.id, e.once)))
            .finish()
    }
}

struct Registry {
    entries: Vec<Entry>,
    next_id: u64,
    max_observers: usize,
    warned: bool,
}

impl Registry {
    fn add(&mut self, once: bool, observer: FatalObserver) -> ObserverId {
        let id = ObserverId(self.next_id);
        self.next_id += 1;
        self.entries.push(Entry { id, once, observer });
        id
    }

    /// True the first time the count goes past the limit.
    fn crossed_limit(&mut self) -> bool {
        if self.entries.len() <= self.max_observers {
            self.warned = false;
            return false;
        }
        !std::mem::replace(&mut self.warned, true)
    }
}

lazy_static! {
    static ref REGISTRY: Mutex<Registry> = Mutex::new(Registry {
        entries: Vec::new(),
        next_id: 1,
        max_observers: DEFAULT_MAX_OBSERVERS,
        warned: false,
    });
    static ref RETHROW_HOOK: Mutex<Option<RethrowHook>> = Mutex::new(None);
}

thread_local! {
    static DISPATCH_DEPTH: Cell<usize> = Cell::new(0);
    static PENDING_RETHROW: RefCell<Vec<FatalError>> = RefCell::new(Vec::new());
}

pub(crate) fn register_observer(once: bool, observer: FatalObserver) -> ObserverId {
    let (id, count, max, crossed) = {
        let mut registry = REGISTRY.lock();
        let id = registry.add(once, observer);
        let crossed = registry.crossed_limit();
        (id, registry.entries.len(), registry.max_observers, crossed)
    };
    if crossed {
        diag_warn!(
            "[fatal]",
            "FATAL_OBSERVER_LIMIT_EXCEEDED possible observer leak",
            count = count,
            max = max
        );
    }
    id
}

/// Observe every fatal error until removed.
pub fn on_fatal<F>(observer: F) -> ObserverId
where
    F: Fn(&FatalError) + Send + Sync + 'static,
{
    register_observer(false, Arc::new(observer))
}

/// Observe the next fatal error only.
pub fn once_fatal<F>(observer: F) -> ObserverId
where
    F: Fn(&FatalError) + Send + Sync + 'static,
{
    register_observer(true, Arc::new(observer))
}

/// Remove an observer. Returns false if it was not registered.
pub fn remove_observer(id: ObserverId) -> bool {
    let mut registry = REGISTRY.lock();
    let before = registry.entries.len();
    registry.entries.retain(|e| e.id != id);
    registry.entries.len() != before
}

pub fn is_registered(id: ObserverId) -> bool {
    REGISTRY.lock().entries.iter().any(|e| e.id == id)
}

pub fn observer_count() -> usize {
    REGISTRY.lock().entries.len()
}

pub fn set_max_observers(max: usize) {
    REGISTRY.lock().max_observers = max;
}

/// Remove every observer, keeping them for [`restore_observers`].
pub fn take_observers() -> ObserverSet {
    ObserverSet(std::mem::take(&mut REGISTRY.lock().entries))
}

/// Re-register observers previously taken, after any registered since.
pub fn restore_observers(set: ObserverSet) {
    REGISTRY.lock().entries.extend(set.0);
}

/// Offer a fatal error to the registered observers.
///
/// One-shot observers are all unregistered before any observer runs. A
/// [`rethrow`] requested by an observer is carried out once every observer
/// has seen the error. Returns false if nobody was registered, in which case
/// the error has been re-raised.
pub fn emit_fatal(err: FatalError) -> bool {
    let snapshot: Vec<FatalObserver> = {
        let mut registry = REGISTRY.lock();
        let snapshot = registry.entries.iter().map(|e| Arc::clone(&e.observer)).collect();
        registry.entries.retain(|e| !e.once);
        snapshot
    };

    if snapshot.is_empty() {
        diag_debug!("[fatal]", "FATAL_UNOBSERVED", message = err.message);
        rethrow(err);
        return false;
    }

    diag_debug!("[fatal]", "FATAL_DISPATCH", observers = snapshot.len());

    let pending = {
        let _dispatch = DispatchGuard::enter();
        for observer in &snapshot {
            observer(&err);
        }
        _dispatch.finish()
    };

    if let Some(err) = pending {
        invoke_rethrow(err);
    }
    true
}

/// Re-raise a fatal error.
///
/// During dispatch the re-raise is deferred until all observers have run.
/// Tests replace the default behavior with [`set_rethrow_hook`].
pub fn rethrow(err: FatalError) {
    let dispatching = DISPATCH_DEPTH.with(|d| d.get() > 0);
    if dispatching {
        PENDING_RETHROW.with(|p| p.borrow_mut().push(err));
        return;
    }
    invoke_rethrow(err);
}

fn invoke_rethrow(err: FatalError) {
    let hook = RETHROW_HOOK.lock().clone();
    match hook {
        Some(hook) => hook(&err),
        None => std::panic::resume_unwind(Box::new(err.render().to_string())),
    }
}

/// Replace the re-raise behavior.
pub fn set_rethrow_hook<F>(hook: F)
where
    F: Fn(&FatalError) + Send + Sync + 'static,
{
    *RETHROW_HOOK.lock() = Some(Arc::new(hook));
}

/// Go back to re-raising by unwinding.
pub fn clear_rethrow_hook() {
    *RETHROW_HOOK.lock() = None;
}

struct DispatchGuard {
    outermost: bool,
}

impl DispatchGuard {
    fn enter() -> Self {
        let depth = DISPATCH_DEPTH.with(|d| {
            let depth = d.get();
            d.set(depth + 1);
            depth
        });
        Self {
            outermost: depth == 0,
        }
    }

    /// The first rethrow requested during the outermost dispatch.
    fn finish(&self) -> Option<FatalError> {
        if !self.outermost {
            return None;
        }
        PENDING_RETHROW.with(|p| {
            let mut pending = p.borrow_mut();
            let first = if pending.is_empty() {
                None
            } else {
                Some(pending.remove(0))
            };
            pending.clear();
            first
        })
    }
}

impl Drop for DispatchGuard {
    fn drop(&mut self) {
        DISPATCH_DEPTH.with(|d| d.set(d.get().saturating_sub(1)));
        if self.outermost && std::thread::panicking() {
            PENDING_RETHROW.with(|p| p.borrow_mut().clear());
        }
    }
}
