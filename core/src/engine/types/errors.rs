//! Error taxonomy
//!
//! Guest exceptions travel as [`ErrorInfo`] values identified by a code. The
//! engine recognises a handful of well-known codes (exhaustion, cancellation)
//! and otherwise propagates exceptions unchanged. Host-side invariant
//! failures are [`ProtocolViolation`]s and never reach guest code as
//! catchable exceptions.

use super::values::Val;
use serde::{Deserialize, Serialize};
use std::fmt;

/* ===================== Well-known exception codes ===================== */

/// Normal end of iteration; may carry the generator's return value
pub const STOP_ITERATION: &str = "StopIteration";
/// Cancellation injected by `close()`
pub const GENERATOR_EXIT: &str = "GeneratorExit";
/// A pause happened where the caller cannot suspend
pub const SUSPENSION_ERROR: &str = "SuspensionError";
/// The driver's resume budget ran out
pub const TIMEOUT_ERROR: &str = "TimeoutError";
pub const TYPE_ERROR: &str = "TypeError";
pub const ATTRIBUTE_ERROR: &str = "AttributeError";
pub const VALUE_ERROR: &str = "ValueError";

/* ===================== Guest exceptions ===================== */

/// Guest exception value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub code: String,
    pub message: String,
    /// Value carried by the exception (the return value for `StopIteration`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Box<Val>>,
}

impl ErrorInfo {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            value: None,
        }
    }

    /// Exhaustion signal, optionally carrying a terminal value
    pub fn stop_iteration(value: Option<Val>) -> Self {
        Self {
            code: STOP_ITERATION.to_string(),
            message: String::new(),
            value: value.map(Box::new),
        }
    }

    /// Cancellation signal used by `close()`
    pub fn generator_exit() -> Self {
        Self::new(GENERATOR_EXIT, "")
    }

    pub fn suspension_error(message: impl Into<String>) -> Self {
        Self::new(SUSPENSION_ERROR, message)
    }

    pub fn with_value(mut self, value: Val) -> Self {
        self.value = Some(Box::new(value));
        self
    }

    pub fn is(&self, code: &str) -> bool {
        self.code == code
    }

    pub fn is_exhaustion(&self) -> bool {
        self.is(STOP_ITERATION)
    }

    pub fn is_cancellation(&self) -> bool {
        self.is(GENERATOR_EXIT)
    }

    pub fn into_value(self) -> Option<Val> {
        self.value.map(|v| *v)
    }
}

impl fmt::Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            f.write_str(&self.code)
        } else {
            write!(f, "{}: {}", self.code, self.message)
        }
    }
}

impl std::error::Error for ErrorInfo {}

/* ===================== Host-side faults ===================== */

/// Invariant violated by the embedding or by guest code
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolViolation {
    /// A generator was resumed while it was already running
    #[error("already executing")]
    AlreadyExecuting,

    /// A generator yielded after `close()` injected cancellation
    #[error("generator ignored close")]
    IgnoredClose,

    /// A single-use suspension was resumed a second time
    #[error("suspension resumed more than once")]
    DoubleResume,

    /// A wrapping suspension found no child, or a child of another type
    #[error("suspension resumed with a missing or foreign child")]
    ForeignChild,
}

/// Failure of an engine operation
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Fault {
    /// Guest exception, propagated unchanged
    #[error("{0}")]
    Raise(#[from] ErrorInfo),

    #[error("protocol violation: {0}")]
    Protocol(#[from] ProtocolViolation),
}

impl Fault {
    pub fn raise(code: impl Into<String>, message: impl Into<String>) -> Self {
        Fault::Raise(ErrorInfo::new(code, message))
    }

    /// The guest exception, if this fault is one
    pub fn exception(&self) -> Option<&ErrorInfo> {
        match self {
            Fault::Raise(exc) => Some(exc),
            Fault::Protocol(_) => None,
        }
    }

    pub fn violation(&self) -> Option<&ProtocolViolation> {
        match self {
            Fault::Protocol(violation) => Some(violation),
            Fault::Raise(_) => None,
        }
    }
}
