//! Leveled logger core.
//!
//! Messages pass a level check, then the filter chain, then go to every
//! registered writer. The facade in [`super::facade`] puts the record
//! formatter in the chain's terminal slot.

use std::io;
use std::sync::Arc;

use log::{Level, LevelFilter};
use parking_lot::{Mutex, RwLock};
use serde_json::Value;

use crate::sink::{Sink, WriteCallback};

/// Transforms a message before formatting. Returning `None` drops it.
pub type Filter = Arc<dyn Fn(Value, Level) -> Option<Value> + Send + Sync>;

/// Turns the final message into the line handed to the writers.
pub type Terminal = Arc<dyn Fn(&Value, Level) -> String + Send + Sync>;

/// Ordered message filters with a fixed last step.
#[derive(Clone, Default)]
pub struct FilterChain {
    filters: Vec<Filter>,
    terminal: Option<Terminal>,
}

impl FilterChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a filter. It runs after earlier filters and always before the
    /// terminal step.
    pub fn push(&mut self, filter: Filter) {
        self.filters.push(filter);
    }

    pub fn set_terminal(&mut self, terminal: Terminal) {
        self.terminal = Some(terminal);
    }

    pub fn has_terminal(&self) -> bool {
        self.terminal.is_some()
    }

    /// Number of steps, the terminal one included.
    pub fn len(&self) -> usize {
        self.filters.len() + usize::from(self.terminal.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Run the chain. Without a terminal step, strings pass through as-is
    /// and other values as compact JSON.
    pub fn apply(&self, message: Value, level: Level) -> Option<String> {
        let mut message = message;
        for filter in &self.filters {
            message = filter(message, level)?;
        }
        Some(match &self.terminal {
            Some(terminal) => terminal(&message, level),
            None => match message {
                Value::String(text) => text,
                other => other.to_string(),
            },
        })
    }
}

/// Level threshold, filter chain and writers.
pub struct LeveledLogger {
    level: RwLock<LevelFilter>,
    chain: RwLock<FilterChain>,
    writers: RwLock<Vec<Arc<dyn Sink>>>,
}

impl LeveledLogger {
    pub fn new(level: LevelFilter) -> Self {
        Self {
            level: RwLock::new(level),
            chain: RwLock::new(FilterChain::new()),
            writers: RwLock::new(Vec::new()),
        }
    }

    pub fn loglevel(&self) -> LevelFilter {
        *self.level.read()
    }

    pub fn set_loglevel(&self, level: LevelFilter) {
        *self.level.write() = level;
    }

    pub fn is_enabled(&self, level: Level) -> bool {
        level <= self.loglevel()
    }

    pub fn add_filter(&self, filter: Filter) {
        self.chain.write().push(filter);
    }

    pub fn set_terminal(&self, terminal: Terminal) {
        self.chain.write().set_terminal(terminal);
    }

    pub fn filter_count(&self) -> usize {
        self.chain.read().len()
    }

    pub fn add_writer(&self, writer: Arc<dyn Sink>) {
        self.writers.write().push(writer);
    }

    pub fn writer_count(&self) -> usize {
        self.writers.read().len()
    }

    /// Log regardless of the threshold, at the threshold's own level.
    pub fn log(&self, message: Value) {
        let level = self.loglevel().to_level().unwrap_or(Level::Info);
        self.emit(level, message);
    }

    pub fn log_at(&self, level: Level, message: Value) {
        if self.is_enabled(level) {
            self.emit(level, message);
        }
    }

    pub fn error(&self, message: Value) {
        self.log_at(Level::Error, message);
    }

    pub fn warn(&self, message: Value) {
        self.log_at(Level::Warn, message);
    }

    pub fn info(&self, message: Value) {
        self.log_at(Level::Info, message);
    }

    pub fn debug(&self, message: Value) {
        self.log_at(Level::Debug, message);
    }

    pub fn trace(&self, message: Value) {
        self.log_at(Level::Trace, message);
    }

    fn emit(&self, level: Level, message: Value) {
        // run filters and writers without holding the locks
        let chain = self.chain.read().clone();
        let Some(line) = chain.apply(message, level) else {
            return;
        };
        let writers = self.writers.read().clone();
        for writer in &writers {
            writer.write(&line, None);
        }
    }

    /// Flush every writer, then report the first error (if any) to `cb`.
    pub fn flush(&self, cb: WriteCallback) {
        let writers = self.writers.read().clone();
        if writers.is_empty() {
            cb(Ok(()));
            return;
        }

        let join = Arc::new(FlushJoin {
            state: Mutex::new((writers.len(), None, Some(cb))),
        });
        for writer in &writers {
            let join = Arc::clone(&join);
            writer.flush(Box::new(move |result| join.done(result)));
        }
    }
}

/// Waits for several flushes and then calls the caller's callback once.
struct FlushJoin {
    state: Mutex<(usize, Option<io::Error>, Option<WriteCallback>)>,
}

impl FlushJoin {
    fn done(&self, result: io::Result<()>) {
        let finished = {
            let mut state = self.state.lock();
            if let Err(e) = result {
                state.1.get_or_insert(e);
            }
            state.0 -= 1;
            if state.0 == 0 {
                state.2.take().map(|cb| (cb, state.1.take()))
            } else {
                None
            }
        };
        if let Some((cb, err)) = finished {
            cb(match err {
                Some(e) => Err(e),
                None => Ok(()),
            });
        }
    }
}
