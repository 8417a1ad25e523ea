//! Trampoline
//!
//! The "block until resolved" path. Used where a pause cannot be exposed to
//! the caller, e.g. top-level script execution. Never call it from inside a
//! generator body: it would resume the body's own yields instead of handing
//! them to the generator's consumer.
//!
//! ## Function Organization
//! 1. drive() - Top-level driver that resumes every pause
//! 2. Driver - Configurable driver (host handlers, resume budget, strict
//!    rejection of unanswered pauses)
//! 3. retry_optional() - For callers that cannot suspend at all

use super::generator::{GenStep, Generator};
use super::suspension::{Completion, Outcome, SuspensionKind};
use super::types::errors::TIMEOUT_ERROR;
use super::types::{ErrorInfo, Fault, Val};
use crate::config::EngineConfig;
use std::collections::HashMap;
use tracing::{debug, trace};

/* ===================== Public API ===================== */

/// Resume until a plain value results
///
/// Every pause met on the way is resumed with a null send. Only the
/// globally configured resume budget applies; use a [`Driver`] to answer
/// host requests or to reject pauses nobody handles.
pub fn drive<T: 'static>(completion: Completion<T>) -> Result<T, Fault> {
    Driver::new().strict(false).run(completion)
}

/// Resolve optional pauses in place; any other pause is an error
///
/// This is what a combinator does when told it may not suspend.
pub fn retry_optional<T: 'static>(completion: Completion<T>) -> Result<T, Fault> {
    let mut outcome = completion?;
    loop {
        match outcome {
            Outcome::Done(value) => return Ok(value),
            Outcome::Suspend(mut suspension) => {
                if !suspension.is_optional() {
                    return Err(Fault::Raise(ErrorInfo::suspension_error(
                        "cannot call a function that blocks or suspends here",
                    )));
                }
                outcome = suspension.resume()?;
            }
        }
    }
}

/* ===================== Driver ===================== */

/// Answer to a host request: the value to send, or the exception to throw
pub type HostHandler = Box<dyn FnMut(&Val) -> Result<Val, ErrorInfo>>;

enum Answer {
    Send(Val),
    Throw(ErrorInfo),
}

/// Trampoline with host handlers and a resume budget
pub struct Driver {
    handlers: HashMap<String, HostHandler>,
    max_resumes: usize,
    resumes: usize,
    /// Raise `SuspensionError` for non-optional pauses without a handler
    strict: bool,
}

impl Driver {
    /// Driver using the global engine configuration
    pub fn new() -> Self {
        Self::with_config(&crate::init::engine_config())
    }

    pub fn with_config(config: &EngineConfig) -> Self {
        Self {
            handlers: HashMap::new(),
            max_resumes: config.max_resumes,
            resumes: 0,
            strict: true,
        }
    }

    /// Register the handler for host requests named `op`
    pub fn handle<F>(mut self, op: impl Into<String>, handler: F) -> Self
    where
        F: FnMut(&Val) -> Result<Val, ErrorInfo> + 'static,
    {
        self.handlers.insert(op.into(), Box::new(handler));
        self
    }

    /// Cap the number of resumes (0 = unlimited)
    pub fn max_resumes(mut self, max_resumes: usize) -> Self {
        self.max_resumes = max_resumes;
        self
    }

    /// Whether unanswered non-optional pauses are errors (the default) or
    /// are resumed with a null send
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Resumes performed so far
    pub fn resumes(&self) -> usize {
        self.resumes
    }

    /// Resume until a plain value results
    pub fn run<T: 'static>(&mut self, completion: Completion<T>) -> Result<T, Fault> {
        let mut outcome = completion?;
        loop {
            match outcome {
                Outcome::Done(value) => {
                    debug!(resumes = self.resumes, "drive complete");
                    return Ok(value);
                }
                Outcome::Suspend(mut suspension) => {
                    self.charge()?;
                    if !suspension.is_optional() {
                        match self.answer(suspension.kind())? {
                            Some(Answer::Send(value)) => suspension.payload_mut().send_value = value,
                            Some(Answer::Throw(exc)) => {
                                suspension.payload_mut().pending_throw = Some(exc)
                            }
                            None => trace!(kind = %suspension.kind(), "resuming unanswered pause"),
                        }
                    }
                    outcome = suspension.resume()?;
                }
            }
        }
    }

    /// Advance a generator, fulfilling its host pauses until it yields or
    /// is exhausted
    pub fn pump(&mut self, generator: &Generator, value: Val) -> Result<GenStep, Fault> {
        let mut step = generator.send(value)?;
        loop {
            let kind = match step {
                GenStep::Pending(kind) => kind,
                other => return Ok(other),
            };
            self.charge()?;
            let answer = if kind == SuspensionKind::Tick {
                Answer::Send(Val::Null)
            } else {
                self.answer(&kind)?.unwrap_or(Answer::Send(Val::Null))
            };
            step = match answer {
                Answer::Send(value) => generator.send(value)?,
                Answer::Throw(exc) => generator.throw(exc)?,
            };
        }
    }

    fn charge(&mut self) -> Result<(), Fault> {
        self.resumes += 1;
        if self.max_resumes > 0 && self.resumes > self.max_resumes {
            debug!(max_resumes = self.max_resumes, "resume budget exhausted");
            return Err(Fault::raise(
                TIMEOUT_ERROR,
                format!("execution exceeded {} resumes", self.max_resumes),
            ));
        }
        Ok(())
    }

    /// Handler answer for a non-optional pause
    ///
    /// `None` means nobody answers it, which only a lenient driver accepts.
    fn answer(&mut self, kind: &SuspensionKind) -> Result<Option<Answer>, Fault> {
        let strict = self.strict;
        let handler = match kind {
            SuspensionKind::Host(request) => self
                .handlers
                .get_mut(&request.op)
                .map(|handler| (request, handler)),
            _ => None,
        };
        let Some((request, handler)) = handler else {
            if strict {
                return Err(Fault::Raise(ErrorInfo::suspension_error(format!(
                    "unhandled non-optional suspension of type '{}'",
                    kind
                ))));
            }
            return Ok(None);
        };
        trace!(op = %request.op, "dispatching host request");
        Ok(Some(match handler(&request.arg) {
            Ok(value) => Answer::Send(value),
            Err(exc) => Answer::Throw(exc),
        }))
    }
}

impl Default for Driver {
    fn default() -> Self {
        Self::new()
    }
}
