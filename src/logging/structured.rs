//! Structured diagnostics utilities.
//!
//! Provides the stream context and macros the crate uses to report on its
//! own capture and fatal-error handling. Every message goes to the
//! [`INTERNAL_TARGET`] target, which an installed [`crate::Logger`] never
//! turns back into records.

use std::fmt;

use crate::stream::{OutputStream, StreamId};

/// `log` target for the crate's own diagnostics.
pub const INTERNAL_TARGET: &str = "kubelog::internal";

/// Diagnostics context for one stream.
#[derive(Debug, Clone)]
pub struct CaptureContext {
    pub stream: String,
    pub stream_id: StreamId,
    pub tag: Option<String>,
}

impl CaptureContext {
    pub fn new(stream: &OutputStream) -> Self {
        Self {
            stream: stream.name().to_string(),
            stream_id: stream.id(),
            tag: None,
        }
    }

    pub fn with_tag(&self, tag: &str) -> Self {
        Self {
            stream: self.stream.clone(),
            stream_id: self.stream_id,
            tag: Some(tag.to_string()),
        }
    }
}

impl fmt::Display for CaptureContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.tag {
            Some(tag) => write!(f, "[stream={}#{}] [type={}]", self.stream, self.stream_id, tag),
            None => write!(f, "[stream={}#{}]", self.stream, self.stream_id),
        }
    }
}

/// Render `key=value` pairs for a diagnostics line.
#[doc(hidden)]
pub fn render_fields(fields: &[(&str, &dyn fmt::Debug)]) -> String {
    let mut out = String::new();
    for (key, value) in fields {
        out.push(' ');
        out.push_str(key);
        out.push('=');
        out.push_str(&format!("{:?}", value));
    }
    out
}

/// Debug-level diagnostics line with context.
macro_rules! diag_debug {
    ($ctx:expr, $event:expr $(, $key:ident = $value:expr)* $(,)?) => {
        ::log::debug!(
            target: $crate::logging::INTERNAL_TARGET,
            "{} {}{}",
            $ctx,
            $event,
            $crate::logging::render_fields(&[$((stringify!($key), &$value as &dyn ::std::fmt::Debug)),*])
        )
    };
}

/// Warning-level diagnostics line with context.
macro_rules! diag_warn {
    ($ctx:expr, $event:expr $(, $key:ident = $value:expr)* $(,)?) => {
        ::log::warn!(
            target: $crate::logging::INTERNAL_TARGET,
            "{} {}{}",
            $ctx,
            $event,
            $crate::logging::render_fields(&[$((stringify!($key), &$value as &dyn ::std::fmt::Debug)),*])
        )
    };
}

pub(crate) use diag_debug;
pub(crate) use diag_warn;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::StreamKind;

    #[test]
    fn test_capture_context_display() {
        let (stream, _) = OutputStream::buffered("stderr", StreamKind::Error);
        let ctx = CaptureContext::new(&stream);
        assert_eq!(format!("{}", ctx), format!("[stream=stderr#{}]", stream.id()));

        let ctx_with_tag = ctx.with_tag("svc");
        assert_eq!(
            format!("{}", ctx_with_tag),
            format!("[stream=stderr#{}] [type=svc]", stream.id())
        );
    }

    #[test]
    fn test_render_fields() {
        assert_eq!(render_fields(&[]), "");
        assert_eq!(
            render_fields(&[("count", &3 as &dyn fmt::Debug), ("name", &"x")]),
            " count=3 name=\"x\""
        );
    }
}
