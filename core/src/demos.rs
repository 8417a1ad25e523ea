//! Bundled guest programs
//!
//! Hand-compiled generator bodies, written the way a compiler targeting the
//! engine would emit them: every yield or host call returns a suspension
//! whose closure holds the rest of the body. The CLI runs them by name.

use crate::engine::types::errors::TYPE_ERROR;
use crate::engine::{
    done, iter_for, suspend, Completion, Driver, ErrorInfo, Fault, Flow, Generator, Signal,
    Suspension, Val,
};

/// Demo names accepted by [`by_name`]
pub const NAMES: &[&str] = &[
    "countdown",
    "accumulator",
    "delegating",
    "echo",
    "stubborn",
    "fetch_pair",
];

/// Build a demo generator with its default arguments
pub fn by_name(name: &str) -> Option<Generator> {
    Some(match name {
        "countdown" => countdown(3),
        "accumulator" => accumulator(),
        "delegating" => delegating(countdown(2)),
        "echo" => echo_until_stop(vec![
            Val::from("tick"),
            Val::from("tock"),
            Val::from("stop"),
            Val::from("never"),
        ]),
        "stubborn" => stubborn(),
        "fetch_pair" => fetch_pair(),
        _ => return None,
    })
}

/// Driver that answers the demos' host requests
///
/// `fetch` resolves a string key to `"value-of-<key>"`.
pub fn demo_driver() -> Driver {
    Driver::new().handle("fetch", |arg| match arg {
        Val::Str(key) => Ok(Val::Str(format!("value-of-{}", key))),
        other => Err(ErrorInfo::new(
            TYPE_ERROR,
            format!("fetch key must be a string, not {}", other.type_name()),
        )),
    })
}

/* ===================== Programs ===================== */

/// Yields `n` down to 1, then returns `"liftoff"`
pub fn countdown(n: i64) -> Generator {
    Generator::new("countdown", move || count_from(n))
}

fn count_from(n: i64) -> Completion {
    if n <= 0 {
        return done(Val::from("liftoff"));
    }
    suspend(Suspension::yield_value(Val::from(n), move |resume| {
        resume.sent()?;
        count_from(n - 1)
    }))
}

/// Yields the running total; each sent number is added to it. Sending null
/// (or calling `next`) returns the total.
pub fn accumulator() -> Generator {
    Generator::new("accumulator", || accumulate(0.0))
}

fn accumulate(total: f64) -> Completion {
    suspend(Suspension::yield_value(Val::Num(total), move |resume| {
        match resume.sent()? {
            Val::Null => done(Val::Num(total)),
            Val::Num(n) => accumulate(total + n),
            other => Err(Fault::raise(
                TYPE_ERROR,
                format!("cannot add {} to a running total", other.type_name()),
            )),
        }
    }))
}

/// Yields `"start"`, then everything `inner` yields; returns
/// `["delegated", <inner's return value>]`
pub fn delegating(inner: Generator) -> Generator {
    Generator::new("delegating", move || {
        suspend(Suspension::yield_value(Val::from("start"), move |resume| {
            resume.sent()?;
            suspend(Suspension::yield_from(inner.into(), |resume| {
                let result = resume.sent()?;
                done(Val::List(vec![Val::from("delegated"), result]))
            }))
        }))
    })
}

/// Yields each item until it meets `"stop"`; returns `"stopped"`, or null
/// when the items run out
pub fn echo_until_stop(items: Vec<Val>) -> Generator {
    Generator::new("echo", move || {
        iter_for(
            items,
            |item| {
                if item == Val::from("stop") {
                    return done(Flow::Break(Val::from("stopped")));
                }
                suspend(Suspension::yield_value(item, |resume| {
                    resume.sent()?;
                    done(Flow::Continue)
                }))
            },
            true,
        )
    })
}

/// Swallows cancellation and yields again; closing it is an error
pub fn stubborn() -> Generator {
    Generator::new("stubborn", || {
        suspend(Suspension::yield_value(Val::from("first"), |resume| {
            match resume.into_signal() {
                Signal::Close(_) => suspend(Suspension::yield_value(Val::from("again"), |resume| {
                    done(resume.sent()?)
                })),
                Signal::Send(_) => done(Val::Null),
                Signal::Throw(exc) => Err(Fault::Raise(exc)),
            }
        }))
    })
}

/// Fetches `a` and `b` from the host, returns both answers
pub fn fetch_pair() -> Generator {
    Generator::new("fetch_pair", fetch_pair_body)
}

/// Body of [`fetch_pair`], usable directly with a `Driver`
pub fn fetch_pair_body() -> Completion {
    suspend(Suspension::host("fetch", Val::from("a"), |resume| {
        let first = resume.sent()?;
        suspend(Suspension::host("fetch", Val::from("b"), move |resume| {
            let second = resume.sent()?;
            done(Val::List(vec![first, second]))
        }))
    }))
}
