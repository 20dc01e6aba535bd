//! Scripted implementations of the harness seams.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use forwarder_harness::{
    ConsumedRecord, ContainerInfo, DeliveryReport, DockerClient, Environment, ExecOutput,
    HarnessError, ImageBuild, ProbeWriter, RecordStream,
};

/// Environment that records every call and can fail on demand.
#[derive(Clone, Default)]
pub struct ScriptedEnvironment {
    pub ups: Arc<AtomicU32>,
    pub downs: Arc<AtomicU32>,
    pub logged_services: Arc<Mutex<Vec<String>>>,
    pub fail_up: bool,
}

impl ScriptedEnvironment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_up() -> Self {
        Self {
            fail_up: true,
            ..Self::default()
        }
    }

    pub fn up_count(&self) -> u32 {
        self.ups.load(Ordering::SeqCst)
    }

    pub fn down_count(&self) -> u32 {
        self.downs.load(Ordering::SeqCst)
    }
}

impl Environment for ScriptedEnvironment {
    async fn up(&self) -> Result<(), HarnessError> {
        self.ups.fetch_add(1, Ordering::SeqCst);
        if self.fail_up {
            return Err(HarnessError::Compose {
                op: "up",
                reason: "scripted start failure".to_owned(),
            });
        }
        Ok(())
    }

    async fn logs(&self, service: &str) -> Result<(), HarnessError> {
        self.logged_services.lock().unwrap().push(service.to_owned());
        Ok(())
    }

    async fn down(&self, _timeout: Option<Duration>) -> Result<(), HarnessError> {
        self.downs.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Image build that always succeeds (or always fails).
#[derive(Clone, Copy)]
pub struct ScriptedBuilder {
    pub fail: bool,
}

impl ScriptedBuilder {
    pub fn ok() -> Self {
        Self { fail: false }
    }

    pub fn failing() -> Self {
        Self { fail: true }
    }
}

impl ImageBuild for ScriptedBuilder {
    async fn build(&self) -> Result<(), HarnessError> {
        if self.fail {
            Err(HarnessError::ImageBuild {
                reason: "scripted build failure".to_owned(),
            })
        } else {
            Ok(())
        }
    }
}

/// Probe writer that succeeds on a chosen attempt, or never.
pub struct ScriptedProbeWriter {
    ready_on_attempt: Option<u32>,
    attempts: AtomicU32,
}

impl ScriptedProbeWriter {
    pub fn ready_immediately() -> Self {
        Self::ready_on(1)
    }

    pub fn ready_on(attempt: u32) -> Self {
        Self {
            ready_on_attempt: Some(attempt),
            attempts: AtomicU32::new(0),
        }
    }

    pub fn never_ready() -> Self {
        Self {
            ready_on_attempt: None,
            attempts: AtomicU32::new(0),
        }
    }

    pub fn attempt_count(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl ProbeWriter for ScriptedProbeWriter {
    async fn write_probe(
        &self,
        _wait: Duration,
    ) -> Result<Option<DeliveryReport>, HarnessError> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        match self.ready_on_attempt {
            Some(ready) if attempt >= ready => Ok(Some(DeliveryReport::delivered())),
            _ => Ok(None),
        }
    }
}

/// Record stream backed by a queue of scripted records.
#[derive(Clone, Default)]
pub struct QueueStream {
    records: Arc<Mutex<VecDeque<ConsumedRecord>>>,
}

impl QueueStream {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_payload(&self, payload: Vec<u8>) {
        self.records
            .lock()
            .unwrap()
            .push_back(ConsumedRecord::with_payload(payload));
    }

    pub fn push_error(&self, error: &str) {
        self.records
            .lock()
            .unwrap()
            .push_back(ConsumedRecord::with_error(error));
    }
}

impl RecordStream for QueueStream {
    async fn poll_record(
        &self,
        _timeout: Duration,
    ) -> Result<Option<ConsumedRecord>, HarnessError> {
        Ok(self.records.lock().unwrap().pop_front())
    }
}

/// Container runtime with a fixed container list and scripted exec results.
#[derive(Default)]
pub struct ScriptedRuntime {
    pub containers: Vec<ContainerInfo>,
    pub exec_exit_code: Option<i64>,
    pub exec_log: Mutex<Vec<(String, Vec<String>, bool)>>,
}

impl ScriptedRuntime {
    pub fn with_containers(containers: Vec<ContainerInfo>) -> Self {
        Self {
            containers,
            exec_exit_code: Some(0),
            exec_log: Mutex::new(Vec::new()),
        }
    }

    pub fn with_exec_exit_code(mut self, code: i64) -> Self {
        self.exec_exit_code = Some(code);
        self
    }

    pub fn exec_count(&self) -> usize {
        self.exec_log.lock().unwrap().len()
    }
}

impl DockerClient for ScriptedRuntime {
    async fn list_containers(&self) -> Result<Vec<ContainerInfo>, HarnessError> {
        Ok(self.containers.clone())
    }

    async fn exec_command(
        &self,
        container_id: &str,
        cmd: &[String],
        privileged: bool,
    ) -> Result<ExecOutput, HarnessError> {
        self.exec_log
            .lock()
            .unwrap()
            .push((container_id.to_owned(), cmd.to_vec(), privileged));
        Ok(ExecOutput {
            exit_code: self.exec_exit_code,
            output: String::new(),
        })
    }

    async fn ping(&self) -> Result<(), HarnessError> {
        Ok(())
    }
}

/// A running container named so the simulator lookup matches it.
pub fn simulator_container() -> ContainerInfo {
    ContainerInfo {
        id: "deadbeef1234".to_owned(),
        name: "systemtest_ioc_1".to_owned(),
        image: "epics-ioc:latest".to_owned(),
        status: "running".to_owned(),
    }
}

/// A running container that the simulator lookup must skip.
pub fn broker_container() -> ContainerInfo {
    ContainerInfo {
        id: "cafebabe5678".to_owned(),
        name: "systemtest_kafka_1".to_owned(),
        image: "kafka:latest".to_owned(),
        status: "running".to_owned(),
    }
}
