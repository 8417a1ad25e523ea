//! Suspension: one resumable pause point
//!
//! A suspension owns a single-use resume closure plus the payload that the
//! closure reads when it runs. Combinators that see a suspension coming out of
//! a step wrap it in a new suspension (`Suspension::wrap`) whose closure
//! resumes the child and then carries on with the rest of the pipeline. The
//! wrapper's payload is moved into the child right before the child resumes,
//! so signals always land on the innermost pause first.

use super::generator::Delegate;
use super::types::{Fault, Payload, ProtocolViolation, Signal, Val};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;
use tracing::trace;

/* ===================== Outcomes ===================== */

/// Terminal value or a pause
pub enum Outcome<T: 'static = Val> {
    Done(T),
    Suspend(Suspension<T>),
}

/// What every resumable step returns
pub type Completion<T = Val> = Result<Outcome<T>, Fault>;

/// Completion carrying a plain value
pub fn done<T: 'static>(value: T) -> Completion<T> {
    Ok(Outcome::Done(value))
}

/// Completion carrying a pause
pub fn suspend<T: 'static>(suspension: Suspension<T>) -> Completion<T> {
    Ok(Outcome::Suspend(suspension))
}

impl<T: 'static> Outcome<T> {
    pub fn is_suspended(&self) -> bool {
        matches!(self, Outcome::Suspend(_))
    }

    pub fn into_done(self) -> Option<T> {
        match self {
            Outcome::Done(value) => Some(value),
            Outcome::Suspend(_) => None,
        }
    }

    pub fn into_suspension(self) -> Option<Suspension<T>> {
        match self {
            Outcome::Suspend(suspension) => Some(suspension),
            Outcome::Done(_) => None,
        }
    }
}

impl<T: fmt::Debug + 'static> fmt::Debug for Outcome<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Done(value) => f.debug_tuple("Done").field(value).finish(),
            Outcome::Suspend(suspension) => f.debug_tuple("Suspend").field(suspension).finish(),
        }
    }
}

/* ===================== Kinds ===================== */

/// Host operation a suspension is waiting on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostRequest {
    pub op: String,
    pub arg: Val,
}

impl HostRequest {
    pub fn new(op: impl Into<String>, arg: Val) -> Self {
        Self { op: op.into(), arg }
    }
}

/// What a pause is waiting for
#[derive(Debug, Clone, PartialEq)]
pub enum SuspensionKind {
    /// Generator body that has not been entered yet
    Entry,
    /// Generator yield carrying the produced value
    Yield(Val),
    /// Start of `yield from`; the delegate travels with the suspension
    YieldFrom,
    /// Blocking-equivalent host operation
    Host(HostRequest),
    /// Cooperative time slice
    Tick,
}

impl SuspensionKind {
    pub fn name(&self) -> &'static str {
        match self {
            SuspensionKind::Entry => "entry",
            SuspensionKind::Yield(_) => "yield",
            SuspensionKind::YieldFrom => "yield-from",
            SuspensionKind::Host(_) => "host",
            SuspensionKind::Tick => "tick",
        }
    }
}

impl fmt::Display for SuspensionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SuspensionKind::Host(request) => write!(f, "host:{}", request.op),
            other => f.write_str(other.name()),
        }
    }
}

/* ===================== Resume ===================== */

/// Everything a resume closure receives: the drained payload and, for
/// wrappers, the child being awaited
pub struct Resume {
    payload: Payload,
    child: Option<Box<dyn Pause>>,
}

impl Resume {
    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Take the winning signal out of the payload
    pub fn signal(&mut self) -> Signal {
        self.payload.take_signal()
    }

    pub fn into_signal(mut self) -> Signal {
        self.payload.take_signal()
    }

    /// Value sent in, or the injected exception raised at this point
    ///
    /// This is what a compiled yield expression without a surrounding handler
    /// does with its resume.
    pub fn sent(self) -> Result<Val, Fault> {
        match self.into_signal() {
            Signal::Send(value) => Ok(value),
            Signal::Throw(exc) | Signal::Close(exc) => Err(Fault::Raise(exc)),
        }
    }

    fn split_child<U: 'static>(self) -> Result<(Payload, Suspension<U>), Fault> {
        let child = self.child.ok_or(ProtocolViolation::ForeignChild)?;
        let child = child
            .into_any()
            .downcast::<Suspension<U>>()
            .map_err(|_| ProtocolViolation::ForeignChild)?;
        Ok((self.payload, *child))
    }
}

/* ===================== Pause ===================== */

/// Type-erased view of a suspension, used for children of any result type
pub trait Pause {
    fn kind(&self) -> &SuspensionKind;
    fn is_optional(&self) -> bool;
    fn payload(&self) -> &Payload;
    fn payload_mut(&mut self) -> &mut Payload;
    fn child(&self) -> Option<&dyn Pause>;
    /// Remove the `yield from` target from the innermost pause
    fn take_delegate(&mut self) -> Option<Delegate>;
    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

/* ===================== Suspension ===================== */

type ResumeFn<T> = Box<dyn FnOnce(Resume) -> Completion<T>>;

/// Single-use pause token
pub struct Suspension<T: 'static = Val> {
    kind: SuspensionKind,
    optional: bool,
    payload: Payload,
    child: Option<Box<dyn Pause>>,
    delegate: Option<Delegate>,
    resume: Option<ResumeFn<T>>,
}

impl<T: 'static> Suspension<T> {
    /// Leaf suspension
    ///
    /// The closure runs at most once and reads any injected signal from the
    /// `Resume` it is handed.
    pub fn new<F>(kind: SuspensionKind, resume: F) -> Self
    where
        F: FnOnce(Resume) -> Completion<T> + 'static,
    {
        let optional = matches!(kind, SuspensionKind::Tick);
        trace!(kind = kind.name(), "suspension created");
        Self {
            kind,
            optional,
            payload: Payload::default(),
            child: None,
            delegate: None,
            resume: Some(Box::new(resume)),
        }
    }

    pub fn yield_value<F>(value: Val, resume: F) -> Self
    where
        F: FnOnce(Resume) -> Completion<T> + 'static,
    {
        Self::new(SuspensionKind::Yield(value), resume)
    }

    /// Start delegating to `target`; the closure runs once the delegate is
    /// exhausted (with its return value) or has raised (with the exception)
    pub fn yield_from<F>(target: Delegate, resume: F) -> Self
    where
        F: FnOnce(Resume) -> Completion<T> + 'static,
    {
        let mut suspension = Self::new(SuspensionKind::YieldFrom, resume);
        suspension.delegate = Some(target);
        suspension
    }

    pub fn host<F>(op: impl Into<String>, arg: Val, resume: F) -> Self
    where
        F: FnOnce(Resume) -> Completion<T> + 'static,
    {
        Self::new(SuspensionKind::Host(HostRequest::new(op, arg)), resume)
    }

    /// Optional pause that only hands control back to the host
    pub fn tick<F>(resume: F) -> Self
    where
        F: FnOnce(Resume) -> Completion<T> + 'static,
    {
        Self::new(SuspensionKind::Tick, resume)
    }

    pub fn with_optional(mut self, optional: bool) -> Self {
        self.optional = optional;
        self
    }

    /// Wrap a pending child
    ///
    /// `then` receives the child (already carrying this wrapper's payload)
    /// and is responsible for resuming it and continuing. The wrapper reports
    /// the child's kind and optionality.
    pub fn wrap<U, F>(child: Suspension<U>, then: F) -> Self
    where
        U: 'static,
        F: FnOnce(Suspension<U>) -> Completion<T> + 'static,
    {
        let kind = child.kind.clone();
        let optional = child.optional;
        Self {
            kind,
            optional,
            payload: Payload::default(),
            child: Some(Box::new(child)),
            delegate: None,
            resume: Some(Box::new(move |resume: Resume| {
                let (payload, mut child) = resume.split_child::<U>()?;
                child.payload = payload;
                then(child)
            })),
        }
    }

    /// Run the resume closure
    ///
    /// Drains the payload into the closure. A second call fails with
    /// `ProtocolViolation::DoubleResume`.
    pub fn resume(&mut self) -> Completion<T> {
        let resume = self.resume.take().ok_or(ProtocolViolation::DoubleResume)?;
        let payload = std::mem::take(&mut self.payload);
        let child = self.child.take();
        trace!(kind = self.kind.name(), "resuming suspension");
        resume(Resume { payload, child })
    }

    pub fn kind(&self) -> &SuspensionKind {
        &self.kind
    }

    pub fn is_optional(&self) -> bool {
        self.optional
    }

    /// Whether `resume` has already been invoked
    pub fn is_spent(&self) -> bool {
        self.resume.is_none()
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub fn payload_mut(&mut self) -> &mut Payload {
        &mut self.payload
    }

    pub fn child(&self) -> Option<&dyn Pause> {
        self.child.as_deref()
    }

    /// Number of wrappers between this suspension and the leaf pause
    pub fn depth(&self) -> usize {
        let mut depth = 0;
        let mut cursor = self.child();
        while let Some(child) = cursor {
            depth += 1;
            cursor = child.child();
        }
        depth
    }

    pub fn take_delegate(&mut self) -> Option<Delegate> {
        match self.delegate.take() {
            Some(delegate) => Some(delegate),
            None => self.child.as_mut()?.take_delegate(),
        }
    }
}

impl<T: 'static> Pause for Suspension<T> {
    fn kind(&self) -> &SuspensionKind {
        &self.kind
    }

    fn is_optional(&self) -> bool {
        self.optional
    }

    fn payload(&self) -> &Payload {
        &self.payload
    }

    fn payload_mut(&mut self) -> &mut Payload {
        &mut self.payload
    }

    fn child(&self) -> Option<&dyn Pause> {
        self.child.as_deref()
    }

    fn take_delegate(&mut self) -> Option<Delegate> {
        Suspension::take_delegate(self)
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

impl<T: 'static> fmt::Debug for Suspension<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Suspension")
            .field("kind", &self.kind)
            .field("optional", &self.optional)
            .field("payload", &self.payload)
            .field("depth", &self.depth())
            .field("spent", &self.is_spent())
            .finish()
    }
}
