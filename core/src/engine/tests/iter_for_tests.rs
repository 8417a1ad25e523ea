//! Tests for iter_for
//!
//! Break values, pauses inside the body, can_suspend = false, ticks, and
//! element sources that raise or pause

use super::helpers::{code_of, entries, new_log, num, record, yield_all, Log};
use crate::engine::types::errors::SUSPENSION_ERROR;
use crate::engine::{
    done, drive, iter_for, iter_for_with_ticks, suspend, Completion, Driver, ErrorInfo, Fault,
    Flow, GenStep, Generator, GeneratorState, ListIter, Outcome, Sequence, Suspension,
    SuspensionKind, Val,
};
use std::cell::Cell;
use std::rc::Rc;

fn items(n: usize) -> Vec<Val> {
    (1..=n).map(|i| num(i as f64)).collect()
}

#[test]
fn test_iter_for_visits_every_item_and_returns_null() {
    let log = new_log();
    let seen = log.clone();
    let outcome = iter_for(
        items(3),
        move |item| {
            record(&seen, format!("{:?}", item));
            done(Flow::Continue)
        },
        true,
    )
    .unwrap();

    assert!(matches!(outcome, Outcome::Done(Val::Null)));
    assert_eq!(entries(&log), vec!["Num(1.0)", "Num(2.0)", "Num(3.0)"]);
}

#[test]
fn test_iter_for_empty_sequence() {
    let outcome = iter_for(Vec::<Val>::new(), |_| panic!("body must not run"), true).unwrap();
    assert!(matches!(outcome, Outcome::Done(Val::Null)));
}

#[test]
fn test_iter_for_break_value_is_loop_result() {
    let log = new_log();
    let seen = log.clone();
    let outcome = iter_for(
        items(5),
        move |item| {
            record(&seen, format!("{:?}", item));
            if item == num(2.0) {
                return done(Flow::Break(Val::from("found")));
            }
            done(Flow::Continue)
        },
        true,
    )
    .unwrap();

    assert!(matches!(outcome, Outcome::Done(Val::Str(ref s)) if s == "found"));
    assert_eq!(entries(&log).len(), 2);
}

#[test]
fn test_iter_for_body_pause_continues_with_next_item() {
    let log = new_log();
    let seen = log.clone();
    let completion = iter_for(
        items(3),
        move |item| {
            record(&seen, format!("start {:?}", item));
            if item != num(2.0) {
                return done(Flow::Continue);
            }
            let seen = seen.clone();
            suspend(Suspension::host("sleep", item, move |resume| {
                record(&seen, format!("woke with {:?}", resume.sent()?));
                done(Flow::Continue)
            }))
        },
        true,
    );

    let Ok(Outcome::Suspend(suspension)) = &completion else {
        panic!("expected the loop to pause");
    };
    assert_eq!(suspension.kind().name(), "host");
    assert_eq!(entries(&log), vec!["start Num(1.0)", "start Num(2.0)"]);

    let mut driver = Driver::new().handle("sleep", |_| Ok(Val::from("rested")));
    assert_eq!(driver.run(completion).unwrap(), Val::Null);
    assert_eq!(
        entries(&log),
        vec![
            "start Num(1.0)",
            "start Num(2.0)",
            "woke with Str(\"rested\")",
            "start Num(3.0)"
        ]
    );
}

#[test]
fn test_iter_for_break_after_pause() {
    let completion = iter_for(
        items(10),
        |item| {
            suspend(Suspension::host("check", item, |resume| {
                match resume.sent()? {
                    Val::Bool(true) => done(Flow::Break(Val::from("stopped"))),
                    _ => done(Flow::Continue),
                }
            }))
        },
        true,
    );

    let mut driver =
        Driver::new().handle("check", |item| Ok(Val::Bool(*item == num(4.0))));
    assert_eq!(driver.run(completion).unwrap(), Val::from("stopped"));
    assert_eq!(driver.resumes(), 4);
}

#[test]
fn test_iter_for_cannot_suspend_rejects_host_pause() {
    let err = iter_for(
        items(2),
        |item| {
            suspend(Suspension::host("sleep", item, |resume| {
                resume.sent()?;
                done(Flow::Continue)
            }))
        },
        false,
    )
    .unwrap_err();

    assert_eq!(code_of(&err), Some(SUSPENSION_ERROR));
    assert_eq!(
        err.exception().map(|exc| exc.message.as_str()),
        Some("cannot call a function that blocks or suspends here")
    );
}

#[test]
fn test_iter_for_cannot_suspend_resumes_optional_pause_in_place() {
    let log = new_log();
    let seen = log.clone();
    let outcome = iter_for(
        items(2),
        move |item| {
            let seen = seen.clone();
            suspend(Suspension::tick(move |_| {
                record(&seen, format!("ticked {:?}", item));
                done(Flow::Continue)
            }))
        },
        false,
    )
    .unwrap();

    assert!(matches!(outcome, Outcome::Done(Val::Null)));
    assert_eq!(entries(&log), vec!["ticked Num(1.0)", "ticked Num(2.0)"]);
}

#[test]
fn test_iter_for_offers_ticks_at_interval() {
    let completion = iter_for_with_ticks(items(5), |_| done(Flow::Continue), true, 2);

    let Ok(Outcome::Suspend(suspension)) = &completion else {
        panic!("expected a tick");
    };
    assert_eq!(suspension.kind(), &SuspensionKind::Tick);
    assert!(suspension.is_optional());

    // Ticks are optional, so a driver without handlers resumes them
    let mut driver = Driver::new();
    assert_eq!(driver.run(completion).unwrap(), Val::Null);
    assert_eq!(driver.resumes(), 2);
}

#[test]
fn test_iter_for_never_ticks_when_it_cannot_suspend() {
    let outcome = iter_for_with_ticks(items(5), |_| done(Flow::Continue), false, 1).unwrap();
    assert!(matches!(outcome, Outcome::Done(Val::Null)));
}

#[test]
fn test_iter_for_body_error_propagates() {
    let completion: Completion = iter_for(
        items(3),
        |item| {
            if item == num(3.0) {
                return Err(Fault::raise("ValueError", "bad item"));
            }
            done(Flow::Continue)
        },
        true,
    );

    assert_eq!(code_of(&completion.unwrap_err()), Some("ValueError"));
}

/// Counts up from 1 and raises `exc` when asked for element `fail_at`
fn failing_source(fail_at: usize, exc: ErrorInfo) -> Sequence {
    let mut fetched = 0;
    Sequence::pull(move || {
        fetched += 1;
        if fetched == fail_at {
            return Err(Fault::Raise(exc.clone()));
        }
        done(Some(num(fetched as f64)))
    })
}

fn collect_items(log: &Log) -> impl FnMut(Val) -> Completion<Flow> + 'static {
    let seen = log.clone();
    move |item| {
        record(&seen, format!("{:?}", item));
        done(Flow::Continue)
    }
}

#[test]
fn test_iter_for_sequence_raising_midway_propagates() {
    let log = new_log();
    let err = iter_for(
        failing_source(3, ErrorInfo::new("KeyError", "source broke")),
        collect_items(&log),
        true,
    )
    .unwrap_err();

    assert_eq!(code_of(&err), Some("KeyError"));
    assert_eq!(entries(&log), vec!["Num(1.0)", "Num(2.0)"]);
}

#[test]
fn test_iter_for_stop_iteration_from_source_ends_loop() {
    let log = new_log();
    let outcome = iter_for(
        failing_source(3, ErrorInfo::stop_iteration(None)),
        collect_items(&log),
        true,
    )
    .unwrap();

    assert!(matches!(outcome, Outcome::Done(Val::Null)));
    assert_eq!(entries(&log), vec!["Num(1.0)", "Num(2.0)"]);
}

#[test]
fn test_iter_for_over_guest_iterator() {
    let log = new_log();
    let outcome = iter_for(
        ListIter::new(vec![Val::from("a"), Val::from("b")]),
        collect_items(&log),
        true,
    )
    .unwrap();

    assert!(matches!(outcome, Outcome::Done(Val::Null)));
    assert_eq!(entries(&log), vec!["Str(\"a\")", "Str(\"b\")"]);
}

#[test]
fn test_iter_for_over_generator_ignores_return_value() {
    let log = new_log();
    let source = yield_all("source", vec![num(1.0), num(2.0)], Val::from("ignored"));
    let outcome = iter_for(source.clone(), collect_items(&log), true).unwrap();

    assert!(matches!(outcome, Outcome::Done(Val::Null)));
    assert_eq!(entries(&log), vec!["Num(1.0)", "Num(2.0)"]);
    assert_eq!(source.state(), GeneratorState::Closed);
}

#[test]
fn test_iter_for_generator_source_pause_becomes_loop_pause() {
    let source = Generator::new("fetching source", || {
        suspend(Suspension::host("fetch", Val::from("row"), |resume| {
            let row = resume.sent()?;
            suspend(Suspension::yield_value(row, |resume| done(resume.sent()?)))
        }))
    });
    let log = new_log();
    let completion = iter_for(source, collect_items(&log), true);

    let Ok(Outcome::Suspend(suspension)) = &completion else {
        panic!("fetching the first element should pause the loop");
    };
    assert_eq!(suspension.kind().to_string(), "host:fetch");

    let mut driver = Driver::new().handle("fetch", |_| Ok(Val::from("loaded row")));
    assert_eq!(driver.run(completion).unwrap(), Val::Null);
    assert_eq!(entries(&log), vec!["Str(\"loaded row\")"]);
}

#[test]
fn test_iter_for_cannot_suspend_rejects_pausing_source() {
    let source = Generator::new("blocking source", || {
        suspend(Suspension::host("fetch", Val::Null, |resume| done(resume.sent()?)))
    });
    let err = iter_for(source, |_| done(Flow::Continue), false).unwrap_err();
    assert_eq!(code_of(&err), Some(SUSPENSION_ERROR));
}

#[test]
fn test_iter_for_source_is_not_refetched_after_body_pause() {
    let fetches = Rc::new(Cell::new(0));
    let counter = fetches.clone();
    let source = Sequence::pull(move || {
        counter.set(counter.get() + 1);
        done(if counter.get() <= 2 { Some(num(counter.get() as f64)) } else { None })
    });
    let completion = iter_for(
        source,
        |item| suspend(Suspension::tick(move |_| done(Flow::Break(item)))),
        true,
    );

    assert_eq!(drive(completion).unwrap(), num(1.0));
    assert_eq!(fetches.get(), 1);
}

#[test]
fn test_ticking_loop_inside_generator_iterates_fully() {
    let gen = Generator::new("ticking", || {
        iter_for_with_ticks(
            items(3),
            |item| {
                suspend(Suspension::yield_value(item, |resume| {
                    resume.sent()?;
                    done(Flow::Continue)
                }))
            },
            true,
            1,
        )
    });

    assert_eq!(gen.next().unwrap(), GenStep::Yielded(num(1.0)));
    assert_eq!(gen.next().unwrap(), GenStep::Pending(SuspensionKind::Tick));
    assert_eq!(gen.next().unwrap(), GenStep::Yielded(num(2.0)));
}
