//! Broker never becomes ready -> bounded probing, shutdown, no body.
//!
//! The probe must stop after its attempt bound, shut the environment
//! down exactly once, and fail the run before any test body executes.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::helpers::doubles::*;

use forwarder_harness::{HarnessError, ReadinessProbe, TestLifecycleManager};

#[tokio::test]
async fn test_e2e_probe_exhaustion_aborts_before_body() {
    let env = ScriptedEnvironment::new();
    let env_handle = env.clone();
    let writer = ScriptedProbeWriter::never_ready();

    let body_ran = Arc::new(AtomicBool::new(false));
    let body_flag = Arc::clone(&body_ran);

    let probe = ReadinessProbe::new(3, Duration::from_millis(5)).unwrap();
    let manager = TestLifecycleManager::new(ScriptedBuilder::ok(), env, writer).with_probe(probe);

    let err = manager
        .run(async move {
            body_flag.store(true, Ordering::SeqCst);
            Ok::<(), HarnessError>(())
        })
        .await
        .unwrap_err();

    assert!(matches!(err, HarnessError::BrokerNotReady { attempts: 3 }));
    assert!(!body_ran.load(Ordering::SeqCst), "body must never run");
    assert_eq!(env_handle.down_count(), 1, "exactly one shutdown");
    assert_eq!(
        err.to_string(),
        "broker was not ready after 3 probe attempts, aborting tests"
    );
}

#[tokio::test]
async fn test_e2e_probe_attempts_are_bounded() {
    let env = ScriptedEnvironment::new();
    let writer = Arc::new(ScriptedProbeWriter::never_ready());

    let probe = ReadinessProbe::new(10, Duration::from_millis(1)).unwrap();
    let err = probe.wait_until_ready(writer.as_ref(), &env).await.unwrap_err();

    assert!(matches!(err, HarnessError::BrokerNotReady { attempts: 10 }));
    assert_eq!(writer.attempt_count(), 10);
}
