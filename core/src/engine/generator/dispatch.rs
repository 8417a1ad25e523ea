//! Delegation-aware stepping
//!
//! `yield from` chains are walked with an explicit stack instead of
//! recursion. The generators below the one being resumed are detached into a
//! vector, the signal is applied to the innermost frame, and the outcome
//! travels back up one frame at a time. Host stack depth stays constant
//! however deep the delegation goes.

use super::delegate::{Delegate, GuestIterator, IterStep};
use super::state::{GenStep, GeneratorState};
use super::Generator;
use crate::engine::suspension::{Outcome, SuspensionKind};
use crate::engine::types::errors::ATTRIBUTE_ERROR;
use crate::engine::types::{ErrorInfo, Fault, ProtocolViolation, Signal, Val};
use tracing::{debug, trace, warn};

/// What one frame did with the signal it was given
enum FrameOutcome {
    Yielded(Val),
    Pending(SuspensionKind),
    /// The frame started a `yield from`
    Delegate(Delegate),
    Returned(Val),
    Raised(ErrorInfo),
}

/// Apply `signal` to `top`, routing it to the innermost delegate first
///
/// `top` must already be marked `Running`; its own final state is set by
/// the caller. Every detached generator below it is either reattached
/// (`Suspended`) or finished (`Closed`) before this returns.
pub(super) fn dispatch(top: &Generator, signal: Signal) -> Result<GenStep, Fault> {
    let closing = signal.is_close();

    let mut levels = vec![top.clone()];
    let mut cursor = top.core.take_generator_delegate();
    while let Some(inner) = cursor {
        inner.core.state.set(GeneratorState::Running);
        cursor = inner.core.take_generator_delegate();
        levels.push(inner);
    }
    if levels.len() > 1 {
        trace!(depth = levels.len() - 1, "forwarding to innermost delegate");
    }

    let mut signal = signal;
    loop {
        let depth = levels.len() - 1;
        let outcome = match step_frame(&levels[depth], signal) {
            Ok(outcome) => outcome,
            Err(fault) => {
                abandon(&levels);
                return Err(fault);
            }
        };

        match outcome {
            FrameOutcome::Yielded(_) | FrameOutcome::Pending(_) if closing => {
                warn!(generator = %levels[depth].name(), "generator ignored close");
                abandon(&levels);
                return Err(ProtocolViolation::IgnoredClose.into());
            }
            FrameOutcome::Yielded(value) => {
                reattach(&levels);
                return Ok(GenStep::Yielded(value));
            }
            FrameOutcome::Pending(kind) => {
                reattach(&levels);
                return Ok(GenStep::Pending(kind));
            }
            FrameOutcome::Delegate(Delegate::Generator(inner)) => match inner.state() {
                GeneratorState::Running => {
                    abandon(&levels);
                    return Err(ProtocolViolation::AlreadyExecuting.into());
                }
                GeneratorState::Closed => {
                    // Exhausted target: the yield from evaluates to null at once
                    signal = Signal::Send(Val::Null);
                }
                _ => {
                    debug!(
                        generator = %levels[depth].name(),
                        delegate = %inner.name(),
                        "delegation started"
                    );
                    inner.core.state.set(GeneratorState::Running);
                    levels.push(inner);
                    signal = Signal::Send(Val::Null);
                }
            },
            FrameOutcome::Delegate(delegate) => {
                debug!(
                    generator = %levels[depth].name(),
                    delegate = %delegate.describe(),
                    "delegation started"
                );
                levels[depth].core.set_delegate(delegate);
                signal = Signal::Send(Val::Null);
            }
            FrameOutcome::Returned(value) => {
                if depth == 0 {
                    return Ok(GenStep::Exhausted(Some(value)));
                }
                if let Some(finished) = levels.pop() {
                    finished.core.finish(Some(value.clone()));
                }
                signal = if closing {
                    Signal::Close(ErrorInfo::generator_exit())
                } else {
                    Signal::Send(value)
                };
            }
            FrameOutcome::Raised(exc) => {
                if depth == 0 {
                    return Err(Fault::Raise(exc));
                }
                if let Some(finished) = levels.pop() {
                    finished.core.finish(None);
                }
                signal = if closing && exc.is_cancellation() {
                    Signal::Close(exc)
                } else {
                    Signal::Throw(exc)
                };
            }
        }
    }
}

/// Put the detached chain back: each level delegates to the next again
fn reattach(levels: &[Generator]) {
    for pair in levels.windows(2) {
        pair[1].core.state.set(GeneratorState::Suspended);
        pair[0].core.set_delegate(Delegate::Generator(pair[1].clone()));
    }
}

/// Close every detached level; the top is left to the caller
fn abandon(levels: &[Generator]) {
    for level in levels.iter().skip(1) {
        level.core.finish(None);
    }
}

/* ===================== Single frame ===================== */

fn step_frame(level: &Generator, signal: Signal) -> Result<FrameOutcome, Fault> {
    let signal = match level.core.take_iterator_delegate() {
        Some(mut iterator) => match forward(iterator.as_mut(), signal) {
            Forwarded::Yielded(value) => {
                level.core.set_delegate(Delegate::Iterator(iterator));
                return Ok(FrameOutcome::Yielded(value));
            }
            Forwarded::Finished(next) => {
                debug!(delegate = iterator.type_name(), "iterator delegate finished");
                next
            }
        },
        None => signal,
    };
    resume_root(level, signal)
}

/// Resume the frame's own suspension with `signal`
fn resume_root(level: &Generator, signal: Signal) -> Result<FrameOutcome, Fault> {
    let root = level.core.root.borrow_mut().take();
    let Some(mut root) = root else {
        return Ok(FrameOutcome::Returned(Val::Null));
    };

    root.payload_mut().clear_signals();
    root.payload_mut().inject(signal);

    // No borrow of the generator is held while the body runs
    match root.resume() {
        Ok(Outcome::Done(value)) => Ok(FrameOutcome::Returned(value)),
        Ok(Outcome::Suspend(mut next)) => {
            let delegate = next.take_delegate();
            let kind = next.kind().clone();
            *level.core.root.borrow_mut() = Some(next);
            Ok(match (delegate, kind) {
                (Some(delegate), _) => FrameOutcome::Delegate(delegate),
                (None, SuspensionKind::Yield(value)) => FrameOutcome::Yielded(value),
                (None, kind) => FrameOutcome::Pending(kind),
            })
        }
        Err(Fault::Raise(exc)) if exc.is_exhaustion() => {
            Ok(FrameOutcome::Returned(exc.into_value().unwrap_or_default()))
        }
        Err(Fault::Raise(exc)) => Ok(FrameOutcome::Raised(exc)),
        Err(fault) => Err(fault),
    }
}

/* ===================== Plain iterator delegates ===================== */

enum Forwarded {
    /// The iterator produced a value; delegation continues
    Yielded(Val),
    /// The iterator is done; deliver this signal to the delegating frame
    Finished(Signal),
}

fn forward(iterator: &mut dyn GuestIterator, signal: Signal) -> Forwarded {
    let type_name = iterator.type_name().to_string();
    let step = match signal {
        Signal::Send(value) if value.is_null() => iterator.next(),
        Signal::Send(value) => match iterator.as_sender() {
            Some(sender) => sender.send(value),
            None => {
                let exc = ErrorInfo::new(
                    ATTRIBUTE_ERROR,
                    format!("'{}' object has no attribute 'send'", type_name),
                );
                return Forwarded::Finished(close_then_throw(iterator, exc));
            }
        },
        Signal::Throw(exc) => match iterator.as_thrower() {
            Some(thrower) => thrower.throw(exc),
            None => return Forwarded::Finished(close_then_throw(iterator, exc)),
        },
        Signal::Close(exc) => {
            let next = match iterator.as_closer().map(|closer| closer.close()) {
                Some(Err(close_error)) => Signal::Throw(close_error),
                Some(Ok(())) | None => Signal::Close(exc),
            };
            return Forwarded::Finished(next);
        }
    };

    match step {
        Ok(IterStep::Yield(value)) => Forwarded::Yielded(value),
        Ok(IterStep::Done(value)) => Forwarded::Finished(Signal::Send(value.unwrap_or_default())),
        Err(exc) if exc.is_exhaustion() => {
            Forwarded::Finished(Signal::Send(exc.into_value().unwrap_or_default()))
        }
        Err(exc) => Forwarded::Finished(Signal::Throw(exc)),
    }
}

/// The iterator cannot take the signal: close it if it can be closed, then
/// raise `exc` (or the error from closing) in the delegating frame
fn close_then_throw(iterator: &mut dyn GuestIterator, exc: ErrorInfo) -> Signal {
    if let Some(closer) = iterator.as_closer() {
        if let Err(close_error) = closer.close() {
            return Signal::Throw(close_error);
        }
    }
    Signal::Throw(exc)
}
