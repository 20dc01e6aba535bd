//! Teardown guarantees: exactly once, on every exit path.

use std::time::Duration;

use crate::helpers::doubles::*;

use forwarder_harness::{HarnessError, TestLifecycleManager};

#[tokio::test]
async fn test_e2e_failing_body_still_dumps_logs_and_shuts_down() {
    let env = ScriptedEnvironment::new();
    let (env_handle, logged) = (env.clone(), env.logged_services.clone());

    let manager = TestLifecycleManager::new(
        ScriptedBuilder::ok(),
        env,
        ScriptedProbeWriter::ready_immediately(),
    );
    let err = manager
        .run(async {
            Err::<(), _>(HarnessError::TestBody("value never arrived".to_owned()))
        })
        .await
        .unwrap_err();

    assert!(matches!(err, HarnessError::TestBody(_)));
    assert_eq!(env_handle.down_count(), 1);
    assert_eq!(logged.lock().unwrap().as_slice(), ["forwarder"]);
}

#[tokio::test]
async fn test_e2e_panicking_body_shuts_down_then_resumes_panic() {
    let env = ScriptedEnvironment::new();
    let env_handle = env.clone();

    let manager = TestLifecycleManager::new(
        ScriptedBuilder::ok(),
        env,
        ScriptedProbeWriter::ready_immediately(),
    );
    let run = tokio::spawn(async move {
        manager
            .run(async {
                panic!("assertion inside the body");
                #[allow(unreachable_code)]
                Ok::<(), HarnessError>(())
            })
            .await
    });

    let join_error = run.await.unwrap_err();
    assert!(join_error.is_panic(), "the panic must reach the caller");
    assert_eq!(env_handle.down_count(), 1, "shutdown happens before the panic resumes");
}

#[tokio::test]
async fn test_e2e_build_failure_shuts_down_and_skips_start() {
    let env = ScriptedEnvironment::new();
    let env_handle = env.clone();

    let manager = TestLifecycleManager::new(
        ScriptedBuilder::failing(),
        env,
        ScriptedProbeWriter::ready_immediately(),
    );
    let err = manager
        .run(async { Ok::<(), HarnessError>(()) })
        .await
        .unwrap_err();

    assert!(matches!(err, HarnessError::ImageBuild { .. }));
    assert_eq!(env_handle.up_count(), 0);
    assert_eq!(env_handle.down_count(), 1);
}

#[tokio::test]
async fn test_e2e_start_failure_shuts_down_once() {
    let env = ScriptedEnvironment::failing_up();
    let env_handle = env.clone();

    let manager = TestLifecycleManager::new(
        ScriptedBuilder::ok(),
        env,
        ScriptedProbeWriter::ready_immediately(),
    );
    let err = manager
        .run(async { Ok::<(), HarnessError>(()) })
        .await
        .unwrap_err();

    assert!(matches!(err, HarnessError::Compose { op: "up", .. }));
    assert_eq!(env_handle.down_count(), 1);
}

#[tokio::test]
async fn test_e2e_custom_log_service_and_timeout_flow_through() {
    let env = ScriptedEnvironment::new();
    let logged = env.logged_services.clone();

    let manager = TestLifecycleManager::new(
        ScriptedBuilder::ok(),
        env,
        ScriptedProbeWriter::ready_immediately(),
    )
    .with_log_service("file-writer")
    .with_teardown_timeout(Duration::from_secs(5));

    manager.run(async { Ok::<(), HarnessError>(()) }).await.unwrap();

    assert_eq!(logged.lock().unwrap().as_slice(), ["file-writer"]);
}
