//! Panics as fatal errors.
//!
//! A panic that escapes [`guard`] is emitted as a [`FatalError`]. With
//! [`install_panic_hook`] the error also carries the panic location and,
//! when backtraces are enabled, the backtrace.

use std::any::Any;
use std::backtrace::{Backtrace, BacktraceStatus};
use std::cell::{Cell, RefCell};
use std::panic::{self, AssertUnwindSafe, Location};
use std::sync::Once;

use super::coordinator::FATAL_PREFIX;
use super::error::FatalError;
use super::observers::{emit_fatal, observer_count};

thread_local! {
    static LAST_PANIC: RefCell<Option<String>> = RefCell::new(None);
    static GUARD_DEPTH: Cell<usize> = Cell::new(0);
}

static HOOK: Once = Once::new();

/// Chain a panic hook that records the panic stack for [`guard`].
///
/// While fatal observers are registered the previous hook (normally the
/// default "thread panicked" printout) is skipped:
/// - inside [`guard`] the panic is emitted as a fatal error instead
/// - anywhere else the report is written to [`crate::stream::stderr`], so a
///   captured stderr turns it into a record
///
/// If that write fails the previous hook runs after all. Installing twice is
/// a no-op.
pub fn install_panic_hook() {
    HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            let stack = panic_stack(info.payload(), info.location());

            if observer_count() == 0 {
                previous(info);
            } else if !is_guarded() && !report_unguarded(&stack) {
                previous(info);
            }

            LAST_PANIC.with(|last| *last.borrow_mut() = Some(stack));
        }));
    });
}

fn panic_stack(payload: &(dyn Any + Send), location: Option<&Location<'_>>) -> String {
    let mut stack = FatalError::from_panic(payload).message;
    if let Some(location) = location {
        stack.push_str(&format!(
            "\n    at {}:{}:{}",
            location.file(),
            location.line(),
            location.column()
        ));
    }
    let backtrace = Backtrace::capture();
    if backtrace.status() == BacktraceStatus::Captured {
        stack.push('\n');
        stack.push_str(&backtrace.to_string());
    }
    stack
}

/// Write an unguarded panic to the process error stream.
fn report_unguarded(stack: &str) -> bool {
    let thread = std::thread::current();
    let report = format!(
        "{}thread '{}' panicked: {}\n",
        FATAL_PREFIX,
        thread.name().unwrap_or("<unnamed>"),
        stack
    );
    crate::stream::stderr().write(report, None).is_ok()
}

fn is_guarded() -> bool {
    GUARD_DEPTH.with(|depth| depth.get() > 0)
}

fn take_last_panic() -> Option<String> {
    LAST_PANIC.with(|last| last.borrow_mut().take())
}

/// Marks the current thread as running inside [`guard`].
struct GuardScope;

impl GuardScope {
    fn enter() -> Self {
        GUARD_DEPTH.with(|depth| depth.set(depth.get() + 1));
        GuardScope
    }
}

impl Drop for GuardScope {
    fn drop(&mut self) {
        GUARD_DEPTH.with(|depth| depth.set(depth.get().saturating_sub(1)));
    }
}

/// Run `f`, turning an escaping panic into an emitted fatal error.
///
/// Returns `None` if `f` panicked and an observer took the error. With no
/// observers registered the panic is re-raised.
pub fn guard<F, R>(f: F) -> Option<R>
where
    F: FnOnce() -> R,
{
    // stale stack from a panic caught elsewhere
    take_last_panic();
    let outcome = {
        let _scope = GuardScope::enter();
        panic::catch_unwind(AssertUnwindSafe(f))
    };
    match outcome {
        Ok(value) => Some(value),
        Err(payload) => {
            let mut err = FatalError::from_panic(payload.as_ref());
            if let Some(stack) = take_last_panic() {
                err.stack = Some(stack);
            }
            emit_fatal(err);
            None
        }
    }
}
