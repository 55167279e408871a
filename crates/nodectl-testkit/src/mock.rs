use derive_more::{Deref, DerefMut};
use nodectl::{
    BackendError, CommandOptions, CommandOutput, NodeBackend, NodeControl, ScheduleContext,
};
use serde_json::{Map, Value, json};
use std::{
    collections::{BTreeSet, VecDeque},
    net::{IpAddr, Ipv4Addr},
    path::{Path, PathBuf},
    sync::{Mutex, PoisonError},
};

///
/// BackendStep
/// Discriminant of a backend call, used for ordering checks and failure injection.
///

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum BackendStep {
    StopRunner,
    StartRunner,
    UploadRunner,
    UpdateLanguageRuntime,
    RunCommand,
    MakeSnapshot,
    RestoreSnapshot,
    ListSnapshots,
    DeleteSnapshot,
    UploadFile,
    DownloadFile,
    Init,
    MakeRunnerHomeDir,
    UploadRunnerConfig,
    InitLanguageRuntime,
    PostToRunner,
    GetValidators,
}

///
/// BackendCall
/// One recorded call, including the schedule context it was given.
///

#[derive(Clone, Debug, PartialEq)]
pub enum BackendCall {
    StopRunner,
    StartRunner,
    UploadRunner,
    UpdateLanguageRuntime,
    RunCommand {
        schedule: Option<ScheduleContext>,
        cmd: String,
        opts: CommandOptions,
    },
    MakeSnapshot(String),
    RestoreSnapshot(String),
    ListSnapshots,
    DeleteSnapshot(String),
    UploadFile {
        src: PathBuf,
        dst: PathBuf,
    },
    DownloadFile {
        src: PathBuf,
        dst: PathBuf,
    },
    Init,
    MakeRunnerHomeDir {
        wipe: bool,
    },
    UploadRunnerConfig(Value),
    InitLanguageRuntime,
    PostToRunner {
        schedule: Option<ScheduleContext>,
        body: Value,
    },
    GetValidators,
}

impl BackendCall {
    #[must_use]
    pub const fn step(&self) -> BackendStep {
        match self {
            Self::StopRunner => BackendStep::StopRunner,
            Self::StartRunner => BackendStep::StartRunner,
            Self::UploadRunner => BackendStep::UploadRunner,
            Self::UpdateLanguageRuntime => BackendStep::UpdateLanguageRuntime,
            Self::RunCommand { .. } => BackendStep::RunCommand,
            Self::MakeSnapshot(_) => BackendStep::MakeSnapshot,
            Self::RestoreSnapshot(_) => BackendStep::RestoreSnapshot,
            Self::ListSnapshots => BackendStep::ListSnapshots,
            Self::DeleteSnapshot(_) => BackendStep::DeleteSnapshot,
            Self::UploadFile { .. } => BackendStep::UploadFile,
            Self::DownloadFile { .. } => BackendStep::DownloadFile,
            Self::Init => BackendStep::Init,
            Self::MakeRunnerHomeDir { .. } => BackendStep::MakeRunnerHomeDir,
            Self::UploadRunnerConfig(_) => BackendStep::UploadRunnerConfig,
            Self::InitLanguageRuntime => BackendStep::InitLanguageRuntime,
            Self::PostToRunner { .. } => BackendStep::PostToRunner,
            Self::GetValidators => BackendStep::GetValidators,
        }
    }

    /// The schedule a mutating call was given; `None` for other calls.
    #[must_use]
    pub const fn schedule(&self) -> Option<&ScheduleContext> {
        match self {
            Self::RunCommand { schedule, .. } | Self::PostToRunner { schedule, .. } => {
                schedule.as_ref()
            }
            _ => None,
        }
    }
}

///
/// MockNodeBuilder
///

pub struct MockNodeBuilder {
    name: String,
    ip: IpAddr,
    runner_port: u16,
    runner_responses: VecDeque<Result<Value, BackendError>>,
    validators_responses: VecDeque<Result<Value, BackendError>>,
    new_test_params: Map<String, Value>,
    snapshots: Vec<String>,
    failing: BTreeSet<BackendStep>,
}

impl MockNodeBuilder {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ip: IpAddr::V4(Ipv4Addr::LOCALHOST),
            runner_port: 3000,
            runner_responses: VecDeque::new(),
            validators_responses: VecDeque::new(),
            new_test_params: Map::new(),
            snapshots: Vec::new(),
            failing: BTreeSet::new(),
        }
    }

    #[must_use]
    pub const fn with_ip(mut self, ip: IpAddr) -> Self {
        self.ip = ip;
        self
    }

    #[must_use]
    pub const fn with_runner_port(mut self, port: u16) -> Self {
        self.runner_port = port;
        self
    }

    /// Queue the next raw runner response body.
    #[must_use]
    pub fn with_runner_response(mut self, body: Value) -> Self {
        self.runner_responses.push_back(Ok(body));
        self
    }

    /// Queue a transport-level failure for the next runner post.
    #[must_use]
    pub fn with_runner_failure(mut self, err: BackendError) -> Self {
        self.runner_responses.push_back(Err(err));
        self
    }

    /// Queue the next validators probe outcome.
    #[must_use]
    pub fn with_validators(mut self, outcome: Result<Value, BackendError>) -> Self {
        self.validators_responses.push_back(outcome);
        self
    }

    #[must_use]
    pub fn with_new_test_params(mut self, params: Map<String, Value>) -> Self {
        self.new_test_params = params;
        self
    }

    #[must_use]
    pub fn with_snapshots<I, S>(mut self, snapshots: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.snapshots = snapshots.into_iter().map(Into::into).collect();
        self
    }

    /// Make every call of `step` fail with `BackendError::Other`.
    #[must_use]
    pub fn failing_on(mut self, step: BackendStep) -> Self {
        self.failing.insert(step);
        self
    }

    #[must_use]
    pub fn build(self) -> MockNode {
        MockNode {
            name: self.name,
            ip: self.ip,
            runner_port: self.runner_port,
            new_test_params: self.new_test_params,
            failing: self.failing,
            state: Mutex::new(MockState {
                calls: Vec::new(),
                runner_responses: self.runner_responses,
                validators_responses: self.validators_responses,
                snapshots: self.snapshots,
            }),
        }
    }
}

///
/// MockNode
///
/// In-memory [`NodeBackend`] that records every call. Runner posts answer
/// from the scripted queue, then `{"result": null}`; validators probes answer
/// from their queue, then `{"result": {}}`.
///

#[derive(Debug)]
pub struct MockNode {
    name: String,
    ip: IpAddr,
    runner_port: u16,
    new_test_params: Map<String, Value>,
    failing: BTreeSet<BackendStep>,
    state: Mutex<MockState>,
}

#[derive(Debug)]
struct MockState {
    calls: Vec<BackendCall>,
    runner_responses: VecDeque<Result<Value, BackendError>>,
    validators_responses: VecDeque<Result<Value, BackendError>>,
    snapshots: Vec<String>,
}

impl MockNode {
    #[must_use]
    pub fn control(&self) -> NodeControl<'_> {
        NodeControl::new(self)
    }

    #[must_use]
    pub fn calls(&self) -> Vec<BackendCall> {
        self.with_state(|s| s.calls.clone())
    }

    #[must_use]
    pub fn steps(&self) -> Vec<BackendStep> {
        self.with_state(|s| s.calls.iter().map(BackendCall::step).collect())
    }

    /// Bodies posted to the runner, oldest first.
    #[must_use]
    pub fn runner_bodies(&self) -> Vec<Value> {
        self.with_state(|s| {
            s.calls
                .iter()
                .filter_map(|call| match call {
                    BackendCall::PostToRunner { body, .. } => Some(body.clone()),
                    _ => None,
                })
                .collect()
        })
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut MockState) -> R) -> R {
        let mut guard = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }

    fn record(&self, call: BackendCall) -> Result<(), BackendError> {
        let step = call.step();
        self.with_state(|s| s.calls.push(call));

        if self.failing.contains(&step) {
            return Err(BackendError::other(format!(
                "{}: injected failure in {step:?}",
                self.name
            )));
        }

        Ok(())
    }
}

impl NodeBackend for MockNode {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn ip_address(&self) -> IpAddr {
        self.ip
    }

    fn runner_port(&self) -> u16 {
        self.runner_port
    }

    fn stop_runner(&self) -> Result<(), BackendError> {
        self.record(BackendCall::StopRunner)
    }

    fn start_runner(&self) -> Result<(), BackendError> {
        self.record(BackendCall::StartRunner)
    }

    fn upload_runner(&self) -> Result<(), BackendError> {
        self.record(BackendCall::UploadRunner)
    }

    fn update_language_runtime(&self) -> Result<(), BackendError> {
        self.record(BackendCall::UpdateLanguageRuntime)
    }

    fn run_command(
        &self,
        schedule: Option<&ScheduleContext>,
        cmd: &str,
        opts: CommandOptions,
    ) -> Result<CommandOutput, BackendError> {
        self.record(BackendCall::RunCommand {
            schedule: schedule.cloned(),
            cmd: cmd.to_string(),
            opts,
        })?;

        Ok(CommandOutput::default())
    }

    fn make_snapshot(&self, snapshot_id: &str) -> Result<(), BackendError> {
        self.record(BackendCall::MakeSnapshot(snapshot_id.to_string()))?;
        self.with_state(|s| s.snapshots.push(snapshot_id.to_string()));

        Ok(())
    }

    fn restore_snapshot(&self, snapshot_id: &str) -> Result<(), BackendError> {
        self.record(BackendCall::RestoreSnapshot(snapshot_id.to_string()))
    }

    fn list_snapshots(&self) -> Result<Vec<String>, BackendError> {
        self.record(BackendCall::ListSnapshots)?;

        Ok(self.with_state(|s| s.snapshots.clone()))
    }

    fn delete_snapshot(&self, snapshot_id: &str) -> Result<(), BackendError> {
        self.record(BackendCall::DeleteSnapshot(snapshot_id.to_string()))?;
        self.with_state(|s| s.snapshots.retain(|id| id != snapshot_id));

        Ok(())
    }

    fn upload_file(&self, src: &Path, dst: &Path) -> Result<(), BackendError> {
        self.record(BackendCall::UploadFile {
            src: src.to_path_buf(),
            dst: dst.to_path_buf(),
        })
    }

    fn download_file(&self, src: &Path, dst: &Path) -> Result<(), BackendError> {
        self.record(BackendCall::DownloadFile {
            src: src.to_path_buf(),
            dst: dst.to_path_buf(),
        })
    }

    fn init(&self) -> Result<(), BackendError> {
        self.record(BackendCall::Init)
    }

    fn make_runner_home_dir(&self, wipe: bool) -> Result<(), BackendError> {
        self.record(BackendCall::MakeRunnerHomeDir { wipe })
    }

    fn upload_runner_config(&self, config: &Value) -> Result<(), BackendError> {
        self.record(BackendCall::UploadRunnerConfig(config.clone()))
    }

    fn init_language_runtime(&self) -> Result<(), BackendError> {
        self.record(BackendCall::InitLanguageRuntime)
    }

    fn post_to_runner(
        &self,
        schedule: Option<&ScheduleContext>,
        body: &Value,
    ) -> Result<Value, BackendError> {
        self.record(BackendCall::PostToRunner {
            schedule: schedule.cloned(),
            body: body.clone(),
        })?;

        self.with_state(|s| s.runner_responses.pop_front())
            .unwrap_or_else(|| Ok(json!({ "result": null })))
    }

    fn new_test_params(&self) -> Map<String, Value> {
        self.new_test_params.clone()
    }

    fn get_validators(&self) -> Result<Value, BackendError> {
        self.record(BackendCall::GetValidators)?;

        self.with_state(|s| s.validators_responses.pop_front())
            .unwrap_or_else(|| Ok(json!({ "result": {} })))
    }
}

///
/// MockFleet
/// Owns the mock nodes a test drives through a `Fleet`.
///

#[derive(Debug, Deref, DerefMut)]
pub struct MockFleet(Vec<MockNode>);

impl MockFleet {
    #[must_use]
    pub const fn new(nodes: Vec<MockNode>) -> Self {
        Self(nodes)
    }

    #[must_use]
    pub fn controls(&self) -> Vec<NodeControl<'_>> {
        self.0.iter().map(MockNode::control).collect()
    }
}
