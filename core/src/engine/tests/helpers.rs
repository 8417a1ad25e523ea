//! Test helpers for engine tests
//!
//! Hand-compiled bodies and small recorders shared across the test files

use crate::engine::{done, suspend, Completion, Fault, Generator, Suspension, Val};
use std::cell::RefCell;
use std::rc::Rc;

/// Ordered record of what a body did
pub type Log = Rc<RefCell<Vec<String>>>;

pub fn new_log() -> Log {
    Rc::new(RefCell::new(Vec::new()))
}

pub fn record(log: &Log, entry: impl Into<String>) {
    log.borrow_mut().push(entry.into());
}

pub fn entries(log: &Log) -> Vec<String> {
    log.borrow().clone()
}

pub fn num(n: f64) -> Val {
    Val::Num(n)
}

/// Code of the guest exception carried by `fault`, if any
pub fn code_of(fault: &Fault) -> Option<&str> {
    fault.exception().map(|exc| exc.code.as_str())
}

/// Host request that resolves to whatever the driver sends back
pub fn host_value(op: &str, arg: Val) -> Completion {
    suspend(Suspension::host(op, arg, |resume| done(resume.sent()?)))
}

/// Generator yielding `values` in order, then returning `ret`
pub fn yield_all(name: &str, values: Vec<Val>, ret: Val) -> Generator {
    Generator::new(name, move || yield_rest(values.into_iter(), ret))
}

fn yield_rest(mut values: std::vec::IntoIter<Val>, ret: Val) -> Completion {
    match values.next() {
        None => done(ret),
        Some(value) => suspend(Suspension::yield_value(value, move |resume| {
            resume.sent()?;
            yield_rest(values, ret)
        })),
    }
}

/// Slot a body uses to reach its own generator handle
pub type SelfSlot = Rc<RefCell<Option<Generator>>>;

pub fn self_slot() -> SelfSlot {
    Rc::new(RefCell::new(None))
}

/// Handle stored in `slot`; panics when the test forgot to fill it
pub fn own_handle(slot: &SelfSlot) -> Generator {
    slot.borrow().clone().expect("self slot not filled")
}
