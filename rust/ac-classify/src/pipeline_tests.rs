use ac_core::{Config, ControllerMode, NormalizedAction, ObservationKeys};
use ac_norm::StatisticsModel;
use ac_probe::{FakeInterface, FakeResponse, InitialState, ProbeError, ProbePhase};

use crate::{check_contract, ContractChecker, ContractError, Semantics, Verdict};

fn pose_action_stats() -> StatisticsModel {
    StatisticsModel::new(
        "actions",
        vec![0.027, 0.089, -0.100, 0.006, 0.004, -0.005, -0.083],
        vec![0.331, 0.372, 0.452, 0.039, 0.063, 0.077, 0.996],
        vec![-0.747, -0.796, -0.938, -0.112, -0.160, -0.209, -1.0],
        vec![0.937, 0.859, 0.937, 0.138, 0.177, 0.196, 1.0],
        0.0,
    )
    .unwrap()
}

fn fake() -> FakeInterface {
    FakeInterface::new(ObservationKeys::default(), [0.40, 0.00, 0.95])
}

#[test]
fn incremental_interface_passes_the_contract() {
    let mut iface = fake().with_response(FakeResponse::Increment { gain: 1.0 });
    let action = NormalizedAction::new(vec![0.0; 7]);
    let checker = ContractChecker::from_config(&Config::default(), pose_action_stats()).unwrap();
    let report = checker
        .check(&mut iface, &action, &InitialState::Reset)
        .unwrap();

    assert_eq!(report.verdict.verdict, Verdict::DeltaPose);
    assert_eq!(report.raw.as_slice()[0], 0.027);
    assert_eq!(iface.calls().step, 1);
    assert_eq!(iface.calls().close, 1);
}

#[test]
fn target_tracking_interface_is_flagged() {
    let action = NormalizedAction::new(vec![0.5, 1.0, -1.5, 0.1, 0.2, -0.3, 0.8]);
    let iface = fake().with_response(FakeResponse::TrackTarget { fraction: 0.005 });
    let report = check_contract(
        &Config::default(),
        pose_action_stats(),
        iface,
        &action,
        &InitialState::Reset,
    )
    .unwrap();

    assert!((report.raw.as_slice()[0] - 0.1925005).abs() < 1e-6);
    assert_eq!(report.verdict.verdict, Verdict::Inconsistent);
    assert_eq!(report.verdict.detected, Some(Semantics::AbsolutePose));
    assert_eq!(report.record.action, report.raw);
}

#[test]
fn stats_must_match_the_controller_dimensionality() {
    let mut cfg = Config::default();
    cfg.controller.mode = Some(ControllerMode::OscPosition);
    let err = ContractChecker::from_config(&cfg, pose_action_stats()).unwrap_err();
    match err {
        ContractError::StatsDimension {
            signal,
            expected,
            actual,
        } => {
            assert_eq!(signal, "actions");
            assert_eq!((expected, actual), (4, 7));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn wrong_normalized_length_fails_before_the_interface_is_touched() {
    let mut iface = fake();
    let checker = ContractChecker::from_config(&Config::default(), pose_action_stats()).unwrap();
    let err = checker
        .check(
            &mut iface,
            &NormalizedAction::new(vec![0.0; 8]),
            &InitialState::Reset,
        )
        .unwrap_err();
    assert!(matches!(err, ContractError::Normalize(_)));
    assert_eq!(iface.calls().reset, 0);
}

#[test]
fn probe_failures_propagate() {
    let mut iface = fake().failing_on(ProbePhase::Step);
    let checker = ContractChecker::from_config(&Config::default(), pose_action_stats()).unwrap();
    let err = checker
        .check(
            &mut iface,
            &NormalizedAction::new(vec![0.0; 7]),
            &InitialState::Reset,
        )
        .unwrap_err();
    assert!(matches!(
        err,
        ContractError::Probe(ProbeError::Execution {
            phase: ProbePhase::Step,
            ..
        })
    ));
    assert_eq!(iface.calls().close, 1);
}

#[test]
fn invalid_config_is_rejected() {
    let mut cfg = Config::default();
    cfg.normalization.epsilon = 0.0;
    let err = ContractChecker::from_config(&cfg, pose_action_stats()).unwrap_err();
    assert!(matches!(err, ContractError::Config(_)));
}
