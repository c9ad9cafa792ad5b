//! The capture entry point.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::error::StreamError;
use crate::fatal::FatalErrorCoordinator;
use crate::logging::{diag_debug, CaptureContext};
use crate::sink::WriteCallback;
use crate::stream::{Chunk, OutputStream, StreamId, StreamWrite};

/// Receives the text of every captured write, with the writer's callback.
pub type OnWrite = Arc<dyn Fn(String, Option<WriteCallback>) + Send + Sync>;

/// Called once when a capture ends, whoever ended it.
pub type ReleaseHook = Box<dyn FnOnce(StreamId) + Send>;

/// Write entry point installed on a captured stream.
///
/// Holds the entry point it replaced and puts it back on [`restore`].
///
/// [`restore`]: CaptureShim::restore
pub struct CaptureShim {
    this: Weak<CaptureShim>,
    stream: Weak<OutputStream>,
    ctx: CaptureContext,
    original: Arc<dyn StreamWrite>,
    on_write: OnWrite,
    restored: AtomicBool,
    coordinator: Mutex<Option<Arc<FatalErrorCoordinator>>>,
    release: Mutex<Option<ReleaseHook>>,
}

impl fmt::Debug for CaptureShim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CaptureShim")
            .field("stream", &self.ctx.stream)
            .field("stream_id", &self.ctx.stream_id)
            .field("restored", &self.is_restored())
            .field("observes_fatal", &self.observes_fatal())
            .finish()
    }
}

impl CaptureShim {
    pub(crate) fn new(
        stream: &Arc<OutputStream>,
        original: Arc<dyn StreamWrite>,
        on_write: OnWrite,
        this: Weak<CaptureShim>,
    ) -> Self {
        Self {
            this,
            stream: Arc::downgrade(stream),
            ctx: CaptureContext::new(stream),
            original,
            on_write,
            restored: AtomicBool::new(false),
            coordinator: Mutex::new(None),
            release: Mutex::new(None),
        }
    }

    /// A shared handle to this shim, while it is alive.
    pub fn handle(&self) -> Option<Arc<CaptureShim>> {
        self.this.upgrade()
    }

    pub fn stream_id(&self) -> StreamId {
        self.ctx.stream_id
    }

    /// The entry point this capture replaced.
    pub fn original(&self) -> &Arc<dyn StreamWrite> {
        &self.original
    }

    pub fn is_restored(&self) -> bool {
        self.restored.load(Ordering::SeqCst)
    }

    /// Whether this capture has a fatal-error observer attached.
    pub fn observes_fatal(&self) -> bool {
        self.coordinator.lock().is_some()
    }

    pub fn coordinator(&self) -> Option<Arc<FatalErrorCoordinator>> {
        self.coordinator.lock().clone()
    }

    pub(crate) fn attach_coordinator(&self, coordinator: Arc<FatalErrorCoordinator>) {
        *self.coordinator.lock() = Some(coordinator);
    }

    /// Run `hook` when this capture ends. Replaces any earlier hook.
    pub fn set_release_hook(&self, hook: ReleaseHook) {
        *self.release.lock() = Some(hook);
    }

    /// End the capture: put the original entry point back (if this shim is
    /// still installed), drop the fatal-error observer and run the release
    /// hook. Only the first call does anything.
    pub fn restore(&self) -> bool {
        if self.restored.swap(true, Ordering::SeqCst) {
            return false;
        }

        let reinstated = match self.stream.upgrade() {
            Some(stream) => stream.reinstate_if_current(self, Arc::clone(&self.original)),
            None => false,
        };

        let coordinator = self.coordinator.lock().take();
        if let Some(coordinator) = coordinator {
            coordinator.uninstall();
        }

        diag_debug!(self.ctx, "CAPTURE_RESTORED", reinstated = reinstated);

        let release = self.release.lock().take();
        if let Some(release) = release {
            release(self.ctx.stream_id);
        }
        true
    }
}

impl StreamWrite for CaptureShim {
    fn write(&self, chunk: Chunk, cb: Option<WriteCallback>) -> Result<(), StreamError> {
        // validated before anything is forwarded
        let text = chunk.into_text()?;
        (self.on_write)(text, cb);
        Ok(())
    }

    fn as_capture(&self) -> Option<&CaptureShim> {
        Some(self)
    }
}
