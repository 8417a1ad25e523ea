//! Suspension-transparent pipeline builders
//!
//! Each combinator runs synchronously as long as nothing pauses. When a step
//! pauses, the rest of the pipeline is captured in a wrapping suspension that
//! re-enters exactly where it stopped.

use super::generator::{GenStep, Generator, GuestIterator, IterStep, ListIter};
use super::suspension::{done, suspend, Completion, Outcome, Suspension};
use super::trampoline::retry_optional;
use super::types::{ErrorInfo, Fault, Flow, Signal, Val};
use tracing::{debug, trace};

/* ===================== chain ===================== */

/// One pipeline step
pub type Step<T = Val> = Box<dyn FnOnce(T) -> Completion<T>>;

/// Box a closure as a pipeline step
pub fn step<T, F>(f: F) -> Step<T>
where
    T: 'static,
    F: FnOnce(T) -> Completion<T> + 'static,
{
    Box::new(f)
}

/// Feed `initial` through `steps` in order
///
/// No suspension is allocated unless `initial` or a step pauses. After a
/// pause, the step following the paused one receives the resolved value.
pub fn chain<T: 'static>(initial: Completion<T>, steps: Vec<Step<T>>) -> Completion<T> {
    continue_chain(initial?, steps.into_iter())
}

fn continue_chain<T: 'static>(
    mut current: Outcome<T>,
    mut steps: std::vec::IntoIter<Step<T>>,
) -> Completion<T> {
    loop {
        match current {
            Outcome::Done(value) => match steps.next() {
                Some(next) => current = next(value)?,
                None => return done(value),
            },
            Outcome::Suspend(pending) => {
                trace!(remaining = steps.len(), "chain paused");
                return Ok(Outcome::Suspend(Suspension::wrap(
                    pending,
                    move |mut child| {
                        let resolved = child.resume()?;
                        continue_chain(resolved, steps)
                    },
                )));
            }
        }
    }
}

/* ===================== iter_for ===================== */

/// Element source of an `iter_for` loop
///
/// Fetching an element may raise, or pause like any other step. A raised
/// `StopIteration` ends the loop the same way running out does.
pub enum Sequence {
    /// Infallible Rust iterator
    Values(Box<dyn Iterator<Item = Val>>),
    /// Guest iterator; its errors propagate out of the loop
    Guest(Box<dyn GuestIterator>),
    /// Generator, advanced with `next()`; its non-yield pauses become
    /// pauses of the loop
    Generator(Generator),
    /// Arbitrary fetch function returning `None` when exhausted
    Pull(Box<dyn FnMut() -> Completion<Option<Val>>>),
}

impl Sequence {
    pub fn values<I>(items: I) -> Self
    where
        I: IntoIterator<Item = Val>,
        I::IntoIter: 'static,
    {
        Sequence::Values(Box::new(items.into_iter()))
    }

    pub fn guest(iterator: impl GuestIterator + 'static) -> Self {
        Sequence::Guest(Box::new(iterator))
    }

    pub fn pull<F>(fetch: F) -> Self
    where
        F: FnMut() -> Completion<Option<Val>> + 'static,
    {
        Sequence::Pull(Box::new(fetch))
    }

    /// Next element, `None` once exhausted
    fn fetch(&mut self) -> Completion<Option<Val>> {
        let fetched = match self {
            Sequence::Values(items) => done(items.next()),
            Sequence::Guest(iterator) => match iterator.next() {
                Ok(IterStep::Yield(item)) => done(Some(item)),
                Ok(IterStep::Done(_)) => done(None),
                Err(exc) => Err(Fault::Raise(exc)),
            },
            Sequence::Generator(generator) => {
                let step = generator.next();
                generator_element(generator.clone(), step)
            }
            Sequence::Pull(fetch) => fetch(),
        };
        stop_ends_sequence(fetched)
    }
}

impl From<Vec<Val>> for Sequence {
    fn from(items: Vec<Val>) -> Self {
        Sequence::values(items)
    }
}

impl From<ListIter> for Sequence {
    fn from(iterator: ListIter) -> Self {
        Sequence::guest(iterator)
    }
}

impl From<Generator> for Sequence {
    fn from(generator: Generator) -> Self {
        Sequence::Generator(generator)
    }
}

/// Map one generator step onto an element fetch
fn generator_element(generator: Generator, step: Result<GenStep, Fault>) -> Completion<Option<Val>> {
    match step? {
        GenStep::Yielded(item) => done(Some(item)),
        GenStep::Exhausted(_) => done(None),
        GenStep::Pending(kind) => {
            trace!(generator = %generator.name(), kind = %kind, "element fetch paused");
            suspend(Suspension::new(kind, move |resume| {
                let step = match resume.into_signal() {
                    Signal::Send(value) => generator.send(value),
                    Signal::Throw(exc) => generator.throw(exc),
                    Signal::Close(exc) => {
                        generator.close()?;
                        Err(Fault::Raise(exc))
                    }
                };
                generator_element(generator, step)
            }))
        }
    }
}

fn stop_ends_sequence(fetched: Completion<Option<Val>>) -> Completion<Option<Val>> {
    match fetched {
        Err(Fault::Raise(exc)) if exc.is_exhaustion() => done(None),
        other => other,
    }
}

/// Run `body` once per element of `sequence`
///
/// The loop evaluates to the value of the first `Flow::Break`, or `Val::Null`
/// when the sequence runs out. When `can_suspend` is false, pauses coming
/// out of `body` or out of fetching an element must be optional and are
/// resumed in place.
pub fn iter_for<S, F>(sequence: S, body: F, can_suspend: bool) -> Completion
where
    S: Into<Sequence>,
    F: FnMut(Val) -> Completion<Flow> + 'static,
{
    let tick_interval = crate::init::engine_config().tick_interval;
    iter_for_with_ticks(sequence, body, can_suspend, tick_interval)
}

/// `iter_for` that offers a `Tick` pause after every `tick_interval` body
/// invocations (0 disables ticks, and so does `can_suspend == false`)
pub fn iter_for_with_ticks<S, F>(
    sequence: S,
    body: F,
    can_suspend: bool,
    tick_interval: usize,
) -> Completion
where
    S: Into<Sequence>,
    F: FnMut(Val) -> Completion<Flow> + 'static,
{
    IterLoop {
        items: sequence.into(),
        body,
        can_suspend,
        tick_interval,
        since_tick: 0,
    }
    .run(None)
}

/// Where a paused loop picks up again
enum Resumed {
    Fetch(Outcome<Option<Val>>),
    Body(Outcome<Flow>),
}

struct IterLoop<F> {
    items: Sequence,
    body: F,
    can_suspend: bool,
    tick_interval: usize,
    since_tick: usize,
}

impl<F> IterLoop<F>
where
    F: FnMut(Val) -> Completion<Flow> + 'static,
{
    /// Continue the loop from a resumed fetch or body, or from the top
    fn run(mut self, mut resumed: Option<Resumed>) -> Completion {
        loop {
            let outcome = match resumed.take() {
                Some(Resumed::Body(outcome)) => outcome,
                pending_fetch => {
                    let fetched = match pending_fetch {
                        Some(Resumed::Fetch(fetched)) => fetched,
                        _ => {
                            if self.tick_due() {
                                trace!("iter_for offering a tick");
                                return Ok(Outcome::Suspend(Suspension::tick(move |resume| {
                                    resume.sent()?;
                                    self.run(None)
                                })));
                            }
                            self.items.fetch()?
                        }
                    };
                    let item = match fetched {
                        Outcome::Done(Some(item)) => item,
                        Outcome::Done(None) => return done(Val::Null),
                        Outcome::Suspend(pending) if !self.can_suspend => {
                            match retry_optional(Ok(Outcome::Suspend(pending))) {
                                Ok(Some(item)) => item,
                                Ok(None) => return done(Val::Null),
                                Err(Fault::Raise(exc)) if exc.is_exhaustion() => {
                                    return done(Val::Null)
                                }
                                Err(fault) => return Err(fault),
                            }
                        }
                        Outcome::Suspend(pending) => {
                            return Ok(Outcome::Suspend(Suspension::wrap(
                                pending,
                                move |mut child| {
                                    let fetched = stop_ends_sequence(child.resume())?;
                                    self.run(Some(Resumed::Fetch(fetched)))
                                },
                            )));
                        }
                    };
                    self.since_tick += 1;
                    (self.body)(item)?
                }
            };

            match outcome {
                Outcome::Done(Flow::Continue) => {}
                Outcome::Done(Flow::Break(value)) => return done(value),
                Outcome::Suspend(pending) if !self.can_suspend => {
                    let flow = retry_optional(Ok(Outcome::Suspend(pending)))?;
                    resumed = Some(Resumed::Body(Outcome::Done(flow)));
                }
                Outcome::Suspend(pending) => {
                    return Ok(Outcome::Suspend(Suspension::wrap(
                        pending,
                        move |mut child| {
                            let outcome = child.resume()?;
                            self.run(Some(Resumed::Body(outcome)))
                        },
                    )));
                }
            }
        }
    }

    fn tick_due(&mut self) -> bool {
        if !self.can_suspend || self.tick_interval == 0 || self.since_tick < self.tick_interval {
            return false;
        }
        self.since_tick = 0;
        true
    }
}

/* ===================== try_catch ===================== */

/// Run `attempt`, handing any guest exception it raises to `catch`
///
/// Exceptions raised after any number of pauses are caught too. Protocol
/// violations pass through untouched.
pub fn try_catch<T, A, C>(attempt: A, catch: C) -> Completion<T>
where
    T: 'static,
    A: FnOnce() -> Completion<T>,
    C: FnOnce(ErrorInfo) -> Completion<T> + 'static,
{
    guard(attempt(), catch)
}

fn guard<T, C>(result: Completion<T>, catch: C) -> Completion<T>
where
    T: 'static,
    C: FnOnce(ErrorInfo) -> Completion<T> + 'static,
{
    match result {
        Ok(Outcome::Suspend(pending)) => Ok(Outcome::Suspend(Suspension::wrap(
            pending,
            move |mut child| guard(child.resume(), catch),
        ))),
        Ok(finished) => Ok(finished),
        Err(Fault::Raise(exc)) => {
            debug!(code = %exc.code, "try_catch caught exception");
            catch(exc)
        }
        Err(fault) => Err(fault),
    }
}
