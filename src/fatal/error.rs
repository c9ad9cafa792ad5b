//! Fatal error values.

use std::any::Any;

use thiserror::Error;

/// An error that escaped all handling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct FatalError {
    pub message: String,
    pub stack: Option<String>,
}

impl FatalError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            stack: None,
        }
    }

    pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = Some(stack.into());
        self
    }

    /// The stack trace if there is one, else the message.
    pub fn render(&self) -> &str {
        self.stack.as_deref().unwrap_or(&self.message)
    }

    /// Build from a panic payload.
    pub fn from_panic(payload: &(dyn Any + Send)) -> Self {
        if let Some(err) = payload.downcast_ref::<FatalError>() {
            err.clone()
        } else if let Some(s) = payload.downcast_ref::<&'static str>() {
            Self::new(*s)
        } else if let Some(s) = payload.downcast_ref::<String>() {
            Self::new(s.clone())
        } else {
            Self::new("Box<dyn Any>")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_prefers_stack() {
        let err = FatalError::new("boom");
        assert_eq!(err.render(), "boom");
        let err = err.with_stack("boom\n    at main.rs:1:1");
        assert_eq!(err.render(), "boom\n    at main.rs:1:1");
        assert_eq!(err.to_string(), "boom");
    }

    #[test]
    fn test_from_panic_payloads() {
        let payload: Box<dyn Any + Send> = Box::new("static");
        assert_eq!(FatalError::from_panic(payload.as_ref()).message, "static");

        let payload: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(FatalError::from_panic(payload.as_ref()).message, "owned");

        let payload: Box<dyn Any + Send> = Box::new(42u8);
        assert_eq!(FatalError::from_panic(payload.as_ref()).message, "Box<dyn Any>");
    }
}
