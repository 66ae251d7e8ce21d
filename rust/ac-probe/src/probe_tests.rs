use ac_core::{ObservationKeys, RawAction};

use crate::{
    ActuationProbe, FakeInterface, FakeResponse, InitialState, Observation, ProbeError, ProbePhase,
};

fn pose_action() -> RawAction {
    RawAction::new(vec![0.01, 0.02, 0.03, 0.1, 0.2, 0.3, -1.0])
}

fn fake() -> FakeInterface {
    FakeInterface::new(ObservationKeys::default(), [0.40, 0.00, 0.95])
}

fn probe() -> ActuationProbe {
    ActuationProbe::new(ObservationKeys::default()).with_action_dim(7)
}

#[test]
fn probe_steps_exactly_once_and_closes() {
    let mut iface = fake();
    let rec = probe()
        .probe(&mut iface, &pose_action(), &InitialState::Reset)
        .unwrap();

    let calls = iface.calls();
    assert_eq!(calls.reset, 1);
    assert_eq!(calls.set_state, 0);
    assert_eq!(calls.step, 1);
    assert_eq!(calls.close, 1);

    assert_eq!(rec.pre.eef_pos(), &[0.40, 0.00, 0.95]);
    let d = rec.delta().unwrap();
    assert!((d.eef_pos[0] - 0.01).abs() < 1e-12);
    assert!((d.eef_pos[1] - 0.02).abs() < 1e-12);
    assert!((d.eef_pos[2] - 0.03).abs() < 1e-12);
    assert_eq!(rec.action, pose_action());
}

#[test]
fn initial_state_is_applied_after_reset() {
    let mut iface = fake();
    probe()
        .probe(
            &mut iface,
            &pose_action(),
            &InitialState::State(vec![0.0, 1.0, 2.0]),
        )
        .unwrap();
    let calls = iface.calls();
    assert_eq!((calls.reset, calls.set_state, calls.step), (1, 1, 1));
    assert_eq!(iface.last_state(), Some(&[0.0, 1.0, 2.0][..]));
}

#[test]
fn failing_step_is_reported_once_and_still_released() {
    let mut iface = fake().failing_on(ProbePhase::Step);
    let err = probe()
        .probe(&mut iface, &pose_action(), &InitialState::Reset)
        .unwrap_err();

    assert!(matches!(
        err,
        ProbeError::Execution {
            phase: ProbePhase::Step,
            ..
        }
    ));
    assert!(err.to_string().contains("during step"));
    let calls = iface.calls();
    assert_eq!(calls.step, 1, "a failed step must not be retried");
    assert_eq!(calls.close, 1);
}

#[test]
fn failing_reset_never_steps_but_releases() {
    let mut iface = fake().failing_on(ProbePhase::Reset);
    let err = probe()
        .probe(&mut iface, &pose_action(), &InitialState::Reset)
        .unwrap_err();
    assert_eq!(err.phase(), Some(ProbePhase::Reset));
    assert_eq!(iface.calls().step, 0);
    assert_eq!(iface.calls().close, 1);
}

#[test]
fn failing_set_state_releases() {
    let mut iface = fake().failing_on(ProbePhase::SetState);
    let err = probe()
        .probe(&mut iface, &pose_action(), &InitialState::State(vec![1.0]))
        .unwrap_err();
    assert_eq!(err.phase(), Some(ProbePhase::SetState));
    assert_eq!(iface.calls().step, 0);
    assert_eq!(iface.calls().close, 1);
}

#[test]
fn close_failure_keeps_the_completed_record() {
    let mut iface = fake().failing_on(ProbePhase::Close);
    let err = probe()
        .probe(&mut iface, &pose_action(), &InitialState::Reset)
        .unwrap_err();
    match err {
        ProbeError::Release { record, .. } => {
            assert_eq!(record.pre.eef_pos(), &[0.40, 0.00, 0.95]);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(iface.calls().step, 1);
    assert_eq!(iface.calls().close, 1);
}

#[test]
fn wrong_action_length_is_rejected_before_any_step() {
    let mut iface = fake();
    let err = probe()
        .probe(&mut iface, &RawAction::new(vec![0.0; 8]), &InitialState::Reset)
        .unwrap_err();
    assert!(matches!(
        err,
        ProbeError::ActionDimension {
            expected: 7,
            actual: 8
        }
    ));
    assert_eq!(iface.calls().reset, 0);
    assert_eq!(iface.calls().step, 0);
    assert_eq!(iface.calls().close, 1);
}

#[test]
fn unusable_post_observation_is_reported_with_phase() {
    let broken = Observation::new().with("robot0_eef_pos", vec![0.4, 0.0, 0.95]);
    let mut iface = fake().with_response(FakeResponse::Fixed(broken));
    let err = probe()
        .probe(&mut iface, &pose_action(), &InitialState::Reset)
        .unwrap_err();
    assert!(matches!(
        err,
        ProbeError::Observation {
            phase: ProbePhase::Step,
            ..
        }
    ));
    assert_eq!(iface.calls().close, 1);
}

#[test]
fn owned_interface_is_consumed_and_closed() {
    // Passing by value: the guard owns the handle for the whole probe.
    let rec = probe()
        .probe(fake(), &pose_action(), &InitialState::Reset)
        .unwrap();
    assert!(!rec.done);
}

#[test]
fn panicking_interface_is_still_closed() {
    use std::cell::Cell;
    use std::rc::Rc;

    struct Panics {
        closed: Rc<Cell<u32>>,
    }

    impl crate::ActuationInterface for Panics {
        type Error = crate::FakeError;
        fn reset(&mut self) -> Result<Observation, Self::Error> {
            panic!("simulator crashed");
        }
        fn set_state(&mut self, _: &[f64]) -> Result<Observation, Self::Error> {
            unreachable!()
        }
        fn step(&mut self, _: &RawAction) -> Result<crate::StepOutcome, Self::Error> {
            unreachable!()
        }
        fn close(&mut self) -> Result<(), Self::Error> {
            self.closed.set(self.closed.get() + 1);
            Ok(())
        }
    }

    let closed = Rc::new(Cell::new(0));
    let iface = Panics {
        closed: closed.clone(),
    };
    let r = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        let _ = probe().probe(iface, &pose_action(), &InitialState::Reset);
    }));
    assert!(r.is_err());
    assert_eq!(closed.get(), 1);
}
