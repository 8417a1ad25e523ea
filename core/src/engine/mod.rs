//! # Engine - Suspension-Driven Cooperative Execution
//!
//! Runtime support for compiled guest code that may pause at any call.
//!
//! ## Core Principles
//!
//! 1. **Completion values**: Every resumable step returns `Done(value)` or
//!    `Suspend(suspension)`; there is no host-level coroutine
//! 2. **Synchronous fast path**: No suspension is allocated unless something
//!    actually pauses
//! 3. **Nested re-entry**: A paused pipeline is a chain of wrapping
//!    suspensions; resuming the outermost one re-enters at the innermost pause
//! 4. **Signals on the payload**: Values, thrown exceptions and cancellation
//!    travel inward on the suspension payload
//!
//! ## Layout
//!
//! - `suspension` - The pause token and completion types
//! - `trampoline` - Blocking drivers (`drive`, `Driver`, `retry_optional`)
//! - `combinators` - `chain`, `iter_for`, `try_catch`
//! - `generator` - Iterator-protocol adapter with `yield from` delegation

pub mod combinators;
pub mod generator;
pub mod suspension;
pub mod trampoline;
pub mod types;

#[cfg(test)]
mod tests;

// Re-export commonly used items
pub use combinators::{chain, iter_for, iter_for_with_ticks, step, try_catch, Sequence, Step};
pub use generator::{
    Delegate, DelegateInfo, GenStep, Generator, GeneratorState, GuestIterator, IterStep,
    ListIter,
};
pub use suspension::{
    done, suspend, Completion, HostRequest, Outcome, Pause, Resume, Suspension, SuspensionKind,
};
pub use trampoline::{drive, retry_optional, Driver, HostHandler};
pub use types::{
    json_to_val, val_to_json, ErrorInfo, Fault, Flow, Payload, ProtocolViolation, Signal, Val,
};
