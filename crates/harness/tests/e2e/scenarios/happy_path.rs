//! Build -> up -> probe -> change value -> consume frame -> teardown.
//!
//! The full lifecycle with every dependency cooperating: the broker is
//! ready on the first probe, the simulator container is running, and a
//! well-formed frame arrives for validation.

use std::sync::Arc;
use std::time::Duration;

use crate::helpers::doubles::*;
use crate::helpers::frames::*;

use forwarder_harness::{
    HarnessError, SimulatorControl, SimulatorSettings, TestLifecycleManager, Value,
    poll_for_valid_message,
};

#[tokio::test]
async fn test_e2e_full_flow_changes_value_and_validates_frame() {
    let env = ScriptedEnvironment::new();
    let (env_handle, logged) = (env.clone(), env.logged_services.clone());

    let runtime = Arc::new(ScriptedRuntime::with_containers(vec![
        broker_container(),
        simulator_container(),
    ]));
    let control = SimulatorControl::new(Arc::clone(&runtime), &SimulatorSettings::default());

    let stream = QueueStream::new();
    stream.push_payload(double_frame("SIM:VALUE1", 14.0));

    let manager =
        TestLifecycleManager::new(ScriptedBuilder::ok(), env, ScriptedProbeWriter::ready_immediately());
    let frame = manager
        .run(async move {
            control.change_value("SIM:VALUE1", "14").await?;
            poll_for_valid_message(&stream, Duration::from_secs(1)).await
        })
        .await
        .expect("full flow should succeed");

    assert_eq!(frame.source_name, "SIM:VALUE1");
    assert_eq!(frame.value, Value::Double(14.0));

    assert_eq!(env_handle.up_count(), 1);
    assert_eq!(env_handle.down_count(), 1);
    assert_eq!(logged.lock().unwrap().as_slice(), ["forwarder"]);

    let exec_log = runtime.exec_log.lock().unwrap();
    assert_eq!(exec_log.len(), 1);
    assert_eq!(exec_log[0].0, "deadbeef1234");
    assert!(exec_log[0].2, "control command must run privileged");
}

#[tokio::test]
async fn test_e2e_probe_retries_until_broker_ready() {
    let env = ScriptedEnvironment::new();
    let env_handle = env.clone();
    let writer = ScriptedProbeWriter::ready_on(4);

    let probe = forwarder_harness::ReadinessProbe::new(10, Duration::from_millis(5)).unwrap();
    let manager = TestLifecycleManager::new(ScriptedBuilder::ok(), env, writer).with_probe(probe);

    manager
        .run(async { Ok::<(), HarnessError>(()) })
        .await
        .expect("broker becomes ready within bounds");

    assert_eq!(env_handle.down_count(), 1);
}

#[tokio::test]
async fn test_e2e_int_frames_validate_too() {
    let stream = QueueStream::new();
    stream.push_payload(int_frame("SIM:COUNTER", -7));

    let frame = poll_for_valid_message(&stream, Duration::from_secs(1))
        .await
        .unwrap();

    assert_eq!(frame.source_name, "SIM:COUNTER");
    assert_eq!(frame.value, Value::Int(-7));
}
