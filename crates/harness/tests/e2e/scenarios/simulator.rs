//! Simulator lookup and in-container control.

use std::sync::Arc;

use crate::helpers::doubles::*;

use forwarder_harness::{HarnessError, SimulatorControl, SimulatorSettings};

#[tokio::test]
async fn test_e2e_missing_simulator_fails_lookup_without_exec() {
    // The environment is up but the simulator container is not among
    // the running containers; the failure must name the marker and no
    // command may be issued anywhere.
    let runtime = Arc::new(ScriptedRuntime::with_containers(vec![broker_container()]));
    let control = SimulatorControl::new(Arc::clone(&runtime), &SimulatorSettings::default());

    let err = control.change_value("SIM:VALUE1", "14").await.unwrap_err();

    match err {
        HarnessError::SimulatorNotFound { marker } => assert_eq!(marker, "_ioc_"),
        other => panic!("expected SimulatorNotFound, got {other}"),
    }
    assert_eq!(runtime.exec_count(), 0);
}

#[tokio::test]
async fn test_e2e_control_command_failure_names_container() {
    let runtime = Arc::new(
        ScriptedRuntime::with_containers(vec![simulator_container()]).with_exec_exit_code(2),
    );
    let control = SimulatorControl::new(Arc::clone(&runtime), &SimulatorSettings::default());

    let err = control.change_value("SIM:VALUE1", "bogus").await.unwrap_err();

    match err {
        HarnessError::ControlCommandFailed { container, .. } => {
            assert_eq!(container, "systemtest_ioc_1");
        }
        other => panic!("expected ControlCommandFailed, got {other}"),
    }
}

#[tokio::test]
async fn test_e2e_control_command_shape_is_utility_name_value() {
    let runtime = Arc::new(ScriptedRuntime::with_containers(vec![simulator_container()]));
    let control = SimulatorControl::new(Arc::clone(&runtime), &SimulatorSettings::default());

    control.change_value("SIM:VALUE1", "42").await.unwrap();

    let exec_log = runtime.exec_log.lock().unwrap();
    assert_eq!(
        exec_log[0].1,
        vec!["caput".to_owned(), "SIM:VALUE1".to_owned(), "42".to_owned()]
    );
}
