//! Generator adapter
//!
//! Exposes a compiled generator body through the iterator protocol:
//! `next`, `send`, `throw` and `close`. The body is an ordinary
//! suspension-returning function; every `yield` it performs surfaces as a
//! `Yield` suspension, which the adapter stores and hands back to the
//! consumer as a [`GenStep::Yielded`].
//!
//! A [`Generator`] is a cheap clonable handle. Guest code may hold a handle
//! to the generator it is running inside; calling into it from there is
//! reported as `AlreadyExecuting` rather than corrupting state.

pub mod delegate;
mod dispatch;
pub mod state;

pub use delegate::{
    Closable, Delegate, DelegateInfo, GuestIterator, IterStep, ListIter, SendInto, ThrowInto,
};
pub use state::{GenStep, GeneratorState};

use super::suspension::{Completion, Resume, Suspension, SuspensionKind};
use super::types::errors::TYPE_ERROR;
use super::types::{ErrorInfo, Fault, ProtocolViolation, Signal, Val};
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;
use tracing::{debug, trace};

/// Shared generator state
///
/// No borrow of any cell is held while the body runs, so a body that calls
/// back into its own generator observes `Running` instead of a borrow panic.
struct GeneratorCore {
    name: String,
    state: Cell<GeneratorState>,
    /// Where the body resumes next; `None` once finished
    root: RefCell<Option<Suspension>>,
    /// Active `yield from` target
    delegate: RefCell<Option<Delegate>>,
    /// Last yielded value, then the return value once finished
    result: RefCell<Option<Val>>,
}

impl GeneratorCore {
    fn finish(&self, value: Option<Val>) {
        self.state.set(GeneratorState::Closed);
        self.root.borrow_mut().take();
        self.delegate.borrow_mut().take();
        *self.result.borrow_mut() = value;
    }

    fn set_delegate(&self, delegate: Delegate) {
        *self.delegate.borrow_mut() = Some(delegate);
    }

    fn take_generator_delegate(&self) -> Option<Generator> {
        let mut slot = self.delegate.borrow_mut();
        match slot.take() {
            Some(Delegate::Generator(generator)) => Some(generator),
            other => {
                *slot = other;
                None
            }
        }
    }

    fn take_iterator_delegate(&self) -> Option<Box<dyn GuestIterator>> {
        let mut slot = self.delegate.borrow_mut();
        match slot.take() {
            Some(Delegate::Iterator(iterator)) => Some(iterator),
            other => {
                *slot = other;
                None
            }
        }
    }

    /// Drop any exception left on the stored pause by an interrupted step
    fn clear_transient(&self) {
        if let Some(root) = self.root.borrow_mut().as_mut() {
            root.payload_mut().clear_signals();
        }
    }
}

/// Handle to a guest generator
#[derive(Clone)]
pub struct Generator {
    core: Rc<GeneratorCore>,
}

impl Generator {
    /// Wrap a generator body
    ///
    /// The body does not run until the first `next()`. Throwing into or
    /// closing a generator that never started raises at the entry point
    /// without entering the body.
    pub fn new<F>(name: impl Into<String>, body: F) -> Self
    where
        F: FnOnce() -> Completion + 'static,
    {
        let entry = Suspension::new(SuspensionKind::Entry, move |resume: Resume| {
            match resume.into_signal() {
                Signal::Send(_) => body(),
                Signal::Throw(exc) | Signal::Close(exc) => Err(Fault::Raise(exc)),
            }
        });
        let name = name.into();
        trace!(generator = %name, "generator created");
        Self {
            core: Rc::new(GeneratorCore {
                name,
                state: Cell::new(GeneratorState::Created),
                root: RefCell::new(Some(entry)),
                delegate: RefCell::new(None),
                result: RefCell::new(None),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.core.name
    }

    pub fn state(&self) -> GeneratorState {
        self.core.state.get()
    }

    pub fn is_running(&self) -> bool {
        self.state() == GeneratorState::Running
    }

    /// Current `yield from` target, if any
    pub fn delegate(&self) -> Option<DelegateInfo> {
        self.core.delegate.borrow().as_ref().map(Delegate::info)
    }

    /// Last yielded value, or the return value once the generator is closed
    pub fn result(&self) -> Option<Val> {
        self.core.result.borrow().clone()
    }

    /// Whether both handles refer to the same generator
    pub fn ptr_eq(&self, other: &Generator) -> bool {
        Rc::ptr_eq(&self.core, &other.core)
    }

    /* ===================== Protocol ===================== */

    pub fn next(&self) -> Result<GenStep, Fault> {
        self.send(Val::Null)
    }

    /// Resume with `value` as the result of the pending yield
    ///
    /// A closed generator reports `Exhausted(None)` on every call.
    pub fn send(&self, value: Val) -> Result<GenStep, Fault> {
        match self.state() {
            GeneratorState::Running => return Err(ProtocolViolation::AlreadyExecuting.into()),
            GeneratorState::Closed => return Ok(GenStep::Exhausted(None)),
            GeneratorState::Created if !value.is_null() => {
                return Err(Fault::raise(
                    TYPE_ERROR,
                    "can't send non-None value to a just-started generator",
                ));
            }
            _ => {}
        }
        self.run(Signal::Send(value))
    }

    /// Raise `exc` at the pause point (inside the innermost delegate first)
    pub fn throw(&self, exc: ErrorInfo) -> Result<GenStep, Fault> {
        match self.state() {
            GeneratorState::Running => return Err(ProtocolViolation::AlreadyExecuting.into()),
            GeneratorState::Closed => return Err(Fault::Raise(exc)),
            _ => {}
        }
        let result = self.run(Signal::Throw(exc));
        self.core.clear_transient();
        result
    }

    /// Cancel the generator
    ///
    /// Injects `GeneratorExit` so `finally`-style cleanup in the body runs.
    /// Closing twice is a no-op. A body that yields instead of finishing is
    /// closed anyway and reported as `IgnoredClose`.
    pub fn close(&self) -> Result<(), Fault> {
        match self.state() {
            GeneratorState::Closed => return Ok(()),
            GeneratorState::Running => return Err(ProtocolViolation::AlreadyExecuting.into()),
            GeneratorState::Created => {
                debug!(generator = %self.core.name, "closed before start");
                self.core.finish(Some(Val::Null));
                return Ok(());
            }
            GeneratorState::Suspended => {}
        }

        // A body that yields or pauses here comes back as IgnoredClose
        let result = self.run(Signal::Close(ErrorInfo::generator_exit()));
        self.core.clear_transient();
        match result {
            Ok(_) => Ok(()),
            Err(Fault::Raise(exc)) if exc.is_cancellation() => {
                *self.core.result.borrow_mut() = Some(Val::Null);
                Ok(())
            }
            Err(fault) => Err(fault),
        }
    }

    /// Iterate the yielded values
    ///
    /// Ticks are resumed in place. A host pause surfacing here cannot be
    /// answered, so it closes the generator and ends iteration with a
    /// `SuspensionError`.
    pub fn yields(&self) -> Yields<'_> {
        Yields { generator: self }
    }

    fn run(&self, signal: Signal) -> Result<GenStep, Fault> {
        let from = self.core.state.replace(GeneratorState::Running);
        trace!(generator = %self.core.name, from = %from, "resuming generator");

        let result = dispatch::dispatch(self, signal);
        match &result {
            Ok(GenStep::Yielded(value)) => {
                self.core.state.set(GeneratorState::Suspended);
                *self.core.result.borrow_mut() = Some(value.clone());
            }
            Ok(GenStep::Pending(kind)) => {
                trace!(generator = %self.core.name, kind = %kind, "generator waiting on host");
                self.core.state.set(GeneratorState::Suspended);
            }
            Ok(GenStep::Exhausted(value)) => {
                debug!(generator = %self.core.name, "generator returned");
                self.core.finish(value.clone());
            }
            Err(fault) => {
                debug!(generator = %self.core.name, error = %fault, "generator raised");
                self.core.finish(None);
            }
        }
        result
    }
}

impl fmt::Debug for Generator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Generator")
            .field("name", &self.core.name)
            .field("state", &self.state())
            .finish()
    }
}

/* ===================== Iteration ===================== */

/// Iterator over a generator's yielded values
pub struct Yields<'a> {
    generator: &'a Generator,
}

impl Iterator for Yields<'_> {
    type Item = Result<Val, Fault>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.generator.next() {
                Ok(GenStep::Yielded(value)) => return Some(Ok(value)),
                Ok(GenStep::Exhausted(_)) => return None,
                // Optional pause: resume in place
                Ok(GenStep::Pending(SuspensionKind::Tick)) => continue,
                Ok(GenStep::Pending(kind)) => {
                    let closed = self.generator.close();
                    let exc = ErrorInfo::suspension_error(format!(
                        "unhandled non-optional suspension of type '{}'",
                        kind
                    ));
                    return Some(closed.and(Err(Fault::Raise(exc))));
                }
                Err(fault) => return Some(Err(fault)),
            }
        }
    }
}
