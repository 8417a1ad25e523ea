//! Generator lifecycle state and step results

use crate::engine::suspension::SuspensionKind;
use crate::engine::types::{ErrorInfo, Val};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Generator execution state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GeneratorState {
    /// Created but never started (before first `next()`)
    #[default]
    Created,
    /// Currently executing; any inbound call is re-entrant
    Running,
    /// Paused at a yield or host pause
    Suspended,
    /// Returned, raised or closed; permanent
    Closed,
}

impl GeneratorState {
    /// Whether `next`/`send`/`throw` may resume the body
    pub fn is_resumable(self) -> bool {
        matches!(self, Self::Created | Self::Suspended)
    }

    pub fn is_finished(self) -> bool {
        matches!(self, Self::Closed)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Created => "GEN_CREATED",
            Self::Running => "GEN_RUNNING",
            Self::Suspended => "GEN_SUSPENDED",
            Self::Closed => "GEN_CLOSED",
        }
    }
}

impl fmt::Display for GeneratorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Result of one `next`/`send`/`throw`
#[derive(Debug, Clone, PartialEq)]
pub enum GenStep {
    /// The body yielded a value
    Yielded(Val),
    /// The body finished. `Some` carries the return value the first time;
    /// every later call on the closed generator reports `None`.
    Exhausted(Option<Val>),
    /// The body is waiting on a host operation or a time slice. The next
    /// `send` delivers the host's answer.
    Pending(SuspensionKind),
}

impl GenStep {
    pub fn yielded(&self) -> Option<&Val> {
        match self {
            Self::Yielded(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_exhausted(&self) -> bool {
        matches!(self, Self::Exhausted(_))
    }

    /// Iterator-protocol view: exhaustion becomes a `StopIteration` carrying
    /// the return value
    pub fn into_result(self) -> Result<Val, ErrorInfo> {
        match self {
            Self::Yielded(value) => Ok(value),
            Self::Exhausted(value) => Err(ErrorInfo::stop_iteration(value)),
            Self::Pending(kind) => Err(ErrorInfo::suspension_error(format!(
                "generator paused on '{}' where it cannot suspend",
                kind
            ))),
        }
    }
}
