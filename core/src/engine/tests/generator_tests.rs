//! Tests for the generator adapter
//!
//! next/send/throw, state transitions, re-entrancy and iteration

use super::helpers::{code_of, entries, new_log, num, own_handle, record, self_slot, yield_all};
use crate::engine::types::errors::{STOP_ITERATION, SUSPENSION_ERROR, TYPE_ERROR};
use crate::engine::{
    done, iter_for_with_ticks, suspend, ErrorInfo, Fault, Flow, GenStep, Generator,
    GeneratorState, ProtocolViolation, Signal, Suspension, Val,
};
use std::cell::Cell;
use std::rc::Rc;

fn one_two_three() -> Generator {
    yield_all("one_two_three", vec![num(1.0), num(2.0)], num(3.0))
}

/// Yields "ready"; a thrown ValueError is caught and "caught <message>" is
/// yielded instead, anything else propagates
fn catcher() -> Generator {
    Generator::new("catcher", || {
        suspend(Suspension::yield_value(Val::from("ready"), |resume| {
            match resume.into_signal() {
                Signal::Throw(exc) if exc.is("ValueError") => suspend(Suspension::yield_value(
                    Val::Str(format!("caught {}", exc.message)),
                    |resume| done(resume.sent()?),
                )),
                Signal::Send(value) => done(value),
                Signal::Throw(exc) | Signal::Close(exc) => Err(Fault::Raise(exc)),
            }
        }))
    })
}

#[test]
fn test_yield_one_two_return_three() {
    let gen = one_two_three();
    assert_eq!(gen.state(), GeneratorState::Created);

    assert_eq!(gen.next().unwrap(), GenStep::Yielded(num(1.0)));
    assert_eq!(gen.state(), GeneratorState::Suspended);
    assert_eq!(gen.result(), Some(num(1.0)));

    assert_eq!(gen.next().unwrap(), GenStep::Yielded(num(2.0)));
    assert_eq!(gen.next().unwrap(), GenStep::Exhausted(Some(num(3.0))));
    assert_eq!(gen.state(), GeneratorState::Closed);
    assert_eq!(gen.result(), Some(num(3.0)));

    assert_eq!(gen.next().unwrap(), GenStep::Exhausted(None));
}

#[test]
fn test_body_does_not_run_until_first_next() {
    let runs = Rc::new(Cell::new(0));
    let counter = runs.clone();
    let gen = Generator::new("lazy", move || {
        counter.set(counter.get() + 1);
        done(Val::from("finished"))
    });

    assert_eq!(runs.get(), 0);
    assert_eq!(gen.next().unwrap(), GenStep::Exhausted(Some(Val::from("finished"))));
    assert_eq!(runs.get(), 1);

    // Exhausted generators report exhaustion without rerunning the body
    assert_eq!(gen.send(Val::Null).unwrap(), GenStep::Exhausted(None));
    assert_eq!(gen.send(num(4.0)).unwrap(), GenStep::Exhausted(None));
    assert_eq!(runs.get(), 1);
}

#[test]
fn test_send_delivers_value_to_yield_point() {
    let log = new_log();
    let seen = log.clone();
    let gen = Generator::new("echo", move || {
        suspend(Suspension::yield_value(Val::from("first"), move |resume| {
            let sent = resume.sent()?;
            record(&seen, format!("got {:?}", sent));
            done(sent)
        }))
    });

    assert_eq!(gen.next().unwrap(), GenStep::Yielded(Val::from("first")));
    assert_eq!(gen.send(num(42.0)).unwrap(), GenStep::Exhausted(Some(num(42.0))));
    assert_eq!(entries(&log), vec!["got Num(42.0)"]);
}

#[test]
fn test_non_null_send_to_fresh_generator_is_type_error() {
    let gen = one_two_three();
    let err = gen.send(num(1.0)).unwrap_err();

    assert_eq!(code_of(&err), Some(TYPE_ERROR));
    assert_eq!(
        err.exception().map(|exc| exc.message.as_str()),
        Some("can't send non-None value to a just-started generator")
    );
    // Still usable
    assert_eq!(gen.state(), GeneratorState::Created);
    assert_eq!(gen.next().unwrap(), GenStep::Yielded(num(1.0)));
}

#[test]
fn test_body_exception_closes_and_propagates() {
    let gen = Generator::new("faulty", || {
        suspend(Suspension::yield_value(num(1.0), |resume| {
            resume.sent()?;
            Err(Fault::raise("ValueError", "broken"))
        }))
    });

    gen.next().unwrap();
    let err = gen.next().unwrap_err();
    assert_eq!(code_of(&err), Some("ValueError"));
    assert_eq!(gen.state(), GeneratorState::Closed);
    assert_eq!(gen.next().unwrap(), GenStep::Exhausted(None));
}

#[test]
fn test_raised_stop_iteration_is_a_return() {
    let gen = Generator::new("early", || {
        Err(Fault::Raise(ErrorInfo::stop_iteration(Some(Val::from("early")))))
    });

    assert_eq!(gen.next().unwrap(), GenStep::Exhausted(Some(Val::from("early"))));
    assert_eq!(gen.state(), GeneratorState::Closed);
}

#[test]
fn test_exhausted_step_as_iterator_result() {
    let gen = one_two_three();
    gen.next().unwrap();
    gen.next().unwrap();

    let err = gen.next().unwrap().into_result().unwrap_err();
    assert!(err.is(STOP_ITERATION));
    assert_eq!(err.into_value(), Some(num(3.0)));
}

#[test]
fn test_throw_caught_by_body() {
    let gen = catcher();
    gen.next().unwrap();

    let step = gen.throw(ErrorInfo::new("ValueError", "oops")).unwrap();
    assert_eq!(step, GenStep::Yielded(Val::from("caught oops")));
    assert_eq!(gen.state(), GeneratorState::Suspended);

    // The thrown exception does not linger for the next resume
    assert_eq!(gen.send(num(5.0)).unwrap(), GenStep::Exhausted(Some(num(5.0))));
}

fn describe(signal: &Signal) -> String {
    match signal {
        Signal::Send(value) => format!("send {:?}", value),
        Signal::Throw(exc) => format!("throw {}", exc.code),
        Signal::Close(exc) => format!("close {}", exc.code),
    }
}

#[test]
fn test_caught_throw_is_not_redelivered_at_next_pause() {
    let log = new_log();
    let seen = log.clone();
    let gen = Generator::new("recovering", move || {
        suspend(Suspension::yield_value(Val::from("ready"), move |resume| {
            record(&seen, format!("first pause got {}", describe(&resume.into_signal())));
            suspend(Suspension::yield_value(Val::from("recovered"), move |resume| {
                record(&seen, format!("second pause got {}", describe(&resume.into_signal())));
                done(Val::from("finished"))
            }))
        }))
    });
    gen.next().unwrap();

    assert_eq!(
        gen.throw(ErrorInfo::new("ValueError", "once")).unwrap(),
        GenStep::Yielded(Val::from("recovered"))
    );
    assert_eq!(gen.next().unwrap(), GenStep::Exhausted(Some(Val::from("finished"))));
    assert_eq!(
        entries(&log),
        vec!["first pause got throw ValueError", "second pause got send Null"]
    );
}

#[test]
fn test_throw_uncaught_propagates_and_closes() {
    let gen = catcher();
    gen.next().unwrap();

    let err = gen.throw(ErrorInfo::new("KeyError", "k")).unwrap_err();
    assert_eq!(code_of(&err), Some("KeyError"));
    assert_eq!(gen.state(), GeneratorState::Closed);
}

#[test]
fn test_throw_into_fresh_generator_raises_without_running_body() {
    let runs = Rc::new(Cell::new(0));
    let counter = runs.clone();
    let gen = Generator::new("fresh", move || {
        counter.set(counter.get() + 1);
        done(Val::Null)
    });

    let err = gen.throw(ErrorInfo::new("ValueError", "early")).unwrap_err();
    assert_eq!(code_of(&err), Some("ValueError"));
    assert_eq!(gen.state(), GeneratorState::Closed);
    assert_eq!(runs.get(), 0);
}

#[test]
fn test_throw_into_closed_generator_raises_it() {
    let gen = one_two_three();
    gen.close().unwrap();

    let err = gen.throw(ErrorInfo::new("ValueError", "late")).unwrap_err();
    assert_eq!(code_of(&err), Some("ValueError"));
}

#[test]
fn test_reentrant_send_is_already_executing() {
    let slot = self_slot();
    let inner_slot = slot.clone();
    let gen = Generator::new("reentrant", move || {
        let me = own_handle(&inner_slot);
        let observed = match me.next() {
            Err(Fault::Protocol(violation)) => violation.to_string(),
            other => format!("unexpected {:?}", other),
        };
        let running = me.is_running();
        suspend(Suspension::yield_value(
            Val::List(vec![Val::Str(observed), Val::Bool(running)]),
            |resume| done(resume.sent()?),
        ))
    });
    *slot.borrow_mut() = Some(gen.clone());

    assert_eq!(
        gen.next().unwrap(),
        GenStep::Yielded(Val::List(vec![Val::from("already executing"), Val::Bool(true)]))
    );
    // The failed inner call did not disturb the outer one
    assert_eq!(gen.state(), GeneratorState::Suspended);
}

#[test]
fn test_reentrant_violation_propagates_when_unhandled() {
    let slot = self_slot();
    let inner_slot = slot.clone();
    let gen = Generator::new("reentrant", move || {
        own_handle(&inner_slot).send(Val::Null)?;
        done(Val::Null)
    });
    *slot.borrow_mut() = Some(gen.clone());

    let err = gen.next().unwrap_err();
    assert_eq!(err.violation(), Some(&ProtocolViolation::AlreadyExecuting));
    assert_eq!(gen.state(), GeneratorState::Closed);
}

#[test]
fn test_yields_iterates_values() {
    let values: Vec<Val> = one_two_three().yields().collect::<Result<_, _>>().unwrap();
    assert_eq!(values, vec![num(1.0), num(2.0)]);
}

#[test]
fn test_yields_resumes_ticks_in_place() {
    let gen = Generator::new("ticking", || {
        iter_for_with_ticks(
            vec![num(1.0), num(2.0), num(3.0)],
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

    let values: Vec<Val> = gen.yields().collect::<Result<_, _>>().unwrap();
    assert_eq!(values, vec![num(1.0), num(2.0), num(3.0)]);
    assert_eq!(gen.state(), GeneratorState::Closed);
}

#[test]
fn test_yields_reports_host_pause_as_suspension_error() {
    let gen = Generator::new("blocking", || {
        suspend(Suspension::yield_value(num(1.0), |resume| {
            resume.sent()?;
            suspend(Suspension::host("sleep", Val::Null, |resume| done(resume.sent()?)))
        }))
    });

    let mut yields = gen.yields();
    assert_eq!(yields.next().unwrap().unwrap(), num(1.0));
    let err = yields.next().unwrap().unwrap_err();
    assert_eq!(code_of(&err), Some(SUSPENSION_ERROR));
    assert!(yields.next().is_none());
    assert_eq!(gen.state(), GeneratorState::Closed);
}

#[test]
fn test_handles_share_state() {
    let gen = one_two_three();
    let other = gen.clone();

    gen.next().unwrap();
    assert!(other.ptr_eq(&gen));
    assert_eq!(other.state(), GeneratorState::Suspended);
    assert_eq!(other.next().unwrap(), GenStep::Yielded(num(2.0)));
    assert_eq!(other.name(), "one_two_three");
    assert!(format!("{:?}", gen).contains("Suspended"));
}
