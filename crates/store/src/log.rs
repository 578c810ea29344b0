#[cfg(any(test, feature = "test-util"))]
use std::cell::RefCell;

/// Diagnostic sink handed to the store at construction.
///
/// Fire-and-forget: implementations must not fail and return nothing.
pub trait Logger {
    fn log(&self, text: &str);
}

/// Forwards log lines to `tracing` at info level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn log(&self, text: &str) {
        tracing::info!(target: "parley_store", "{}", text);
    }
}

/// Keeps every line in memory, in order.
#[cfg(any(test, feature = "test-util"))]
#[derive(Debug, Default)]
pub struct RecordingLogger {
    lines: RefCell<Vec<String>>,
}

#[cfg(any(test, feature = "test-util"))]
impl RecordingLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.borrow().clone()
    }
}

#[cfg(any(test, feature = "test-util"))]
impl Logger for RecordingLogger {
    fn log(&self, text: &str) {
        self.lines.borrow_mut().push(text.to_string());
    }
}

impl<L: Logger + ?Sized> Logger for std::rc::Rc<L> {
    fn log(&self, text: &str) {
        (**self).log(text);
    }
}
