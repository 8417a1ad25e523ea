//! Signals and loop control

use super::errors::ErrorInfo;
use super::values::Val;

/* ===================== Signals ===================== */

/// What a resumed computation observes at its pause point
///
/// Exactly one signal is delivered per resume. Compiled bodies match on it
/// (or call [`Resume::sent`](crate::engine::Resume::sent)) to decide whether
/// to continue with a value or raise.
#[derive(Debug, Clone, PartialEq)]
pub enum Signal {
    /// Continue with the sent value (`Val::Null` for plain `next()`)
    Send(Val),
    /// Raise the exception at the pause point
    Throw(ErrorInfo),
    /// Cancellation requested by `close()`
    Close(ErrorInfo),
}

impl Signal {
    pub fn is_close(&self) -> bool {
        matches!(self, Signal::Close(_))
    }
}

/* ===================== Payload ===================== */

/// Inbound channels of a suspension
///
/// The three channels are independent. When more than one is set, close
/// takes precedence over throw, and throw over send.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Payload {
    pub send_value: Val,
    pub pending_throw: Option<ErrorInfo>,
    pub pending_close: Option<ErrorInfo>,
}

impl Payload {
    /// Store a signal in its channel
    pub fn inject(&mut self, signal: Signal) {
        match signal {
            Signal::Send(value) => self.send_value = value,
            Signal::Throw(exc) => self.pending_throw = Some(exc),
            Signal::Close(exc) => self.pending_close = Some(exc),
        }
    }

    /// Drain all channels into the signal that wins
    pub fn take_signal(&mut self) -> Signal {
        let value = std::mem::take(&mut self.send_value);
        let thrown = self.pending_throw.take();
        if let Some(exc) = self.pending_close.take() {
            return Signal::Close(exc);
        }
        match thrown {
            Some(exc) => Signal::Throw(exc),
            None => Signal::Send(value),
        }
    }

    pub fn has_pending(&self) -> bool {
        self.pending_throw.is_some() || self.pending_close.is_some()
    }

    /// Reset the transient exception channels
    pub fn clear_signals(&mut self) {
        self.pending_throw = None;
        self.pending_close = None;
    }
}

/* ===================== Loop Control ===================== */

/// Result of one `iter_for` body invocation
#[derive(Debug, Clone, PartialEq)]
pub enum Flow {
    /// Move on to the next element
    Continue,
    /// Stop the loop; the loop evaluates to the carried value
    Break(Val),
}
