use crate::{ThisError, schedule::ScheduleContext};
use derive_more::Display;
use serde_json::{Map, Value};
use std::{net::IpAddr, path::Path};

///
/// TransportFault
/// Coarse classification of a failed runner/service exchange.
///

#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
pub enum TransportFault {
    /// The peer actively refused the connection.
    ConnectionRefused,
    /// The connection could not be established (DNS, unreachable, reset during connect).
    Connect,
    Timeout,
    Other,
}

impl TransportFault {
    /// True for the two fault kinds that mean "service not up yet".
    #[must_use]
    pub const fn is_not_ready(self) -> bool {
        matches!(self, Self::ConnectionRefused | Self::Connect)
    }
}

///
/// BackendError
/// Errors raised by a concrete node implementation.
///

#[derive(Debug, ThisError)]
pub enum BackendError {
    #[error("transport fault ({kind}): {message}")]
    Transport {
        kind: TransportFault,
        message: String,
    },

    #[error("command `{cmd}` failed with status {status}: {stderr}")]
    Command {
        cmd: String,
        status: i32,
        stderr: String,
    },

    #[error("{0}")]
    Other(String),
}

impl BackendError {
    pub fn transport(kind: TransportFault, message: impl Into<String>) -> Self {
        Self::Transport {
            kind,
            message: message.into(),
        }
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }

    #[must_use]
    pub const fn transport_fault(&self) -> Option<TransportFault> {
        match self {
            Self::Transport { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

///
/// CommandOptions
/// Failure handling flags passed through to `run_command`.
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct CommandOptions {
    /// Surface a non-zero exit status as `BackendError::Command`.
    pub raise_on_fail: bool,
    /// Stop a multi-host command at the first failing host and return its output.
    pub return_on_fail: bool,
}

impl CommandOptions {
    #[must_use]
    pub const fn raising() -> Self {
        Self {
            raise_on_fail: true,
            return_on_fail: false,
        }
    }
}

///
/// CommandOutput
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct CommandOutput {
    pub status: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    #[must_use]
    pub const fn success(&self) -> bool {
        self.status == 0
    }
}

///
/// NodeBackend
///
/// The concrete local-or-remote implementation behind a [`NodeControl`].
///
/// Only `run_command` and `post_to_runner` receive the schedule context; the
/// backend alone decides whether a present context defers the side effect.
/// `get_validators` talks to the node's main service, not the runner, and
/// must report connection failures as `BackendError::Transport`.
///
/// [`NodeControl`]: crate::NodeControl
///

pub trait NodeBackend: Send + Sync {
    fn name(&self) -> String;
    fn ip_address(&self) -> IpAddr;
    fn runner_port(&self) -> u16;

    // runner lifecycle
    fn stop_runner(&self) -> Result<(), BackendError>;
    fn start_runner(&self) -> Result<(), BackendError>;
    fn upload_runner(&self) -> Result<(), BackendError>;
    fn update_language_runtime(&self) -> Result<(), BackendError>;

    fn run_command(
        &self,
        schedule: Option<&ScheduleContext>,
        cmd: &str,
        opts: CommandOptions,
    ) -> Result<CommandOutput, BackendError>;

    // snapshots
    fn make_snapshot(&self, snapshot_id: &str) -> Result<(), BackendError>;
    fn restore_snapshot(&self, snapshot_id: &str) -> Result<(), BackendError>;
    fn list_snapshots(&self) -> Result<Vec<String>, BackendError>;
    fn delete_snapshot(&self, snapshot_id: &str) -> Result<(), BackendError>;

    // files
    fn upload_file(&self, src: &Path, dst: &Path) -> Result<(), BackendError>;
    fn download_file(&self, src: &Path, dst: &Path) -> Result<(), BackendError>;

    // setup
    fn init(&self) -> Result<(), BackendError>;
    fn make_runner_home_dir(&self, wipe: bool) -> Result<(), BackendError>;
    fn upload_runner_config(&self, config: &Value) -> Result<(), BackendError>;
    fn init_language_runtime(&self) -> Result<(), BackendError>;

    // rpc
    fn post_to_runner(
        &self,
        schedule: Option<&ScheduleContext>,
        body: &Value,
    ) -> Result<Value, BackendError>;
    fn new_test_params(&self) -> Map<String, Value>;
    fn get_validators(&self) -> Result<Value, BackendError>;
}

///
/// TESTS
///
