use crate::{ThisError, backend::BackendError, config::ConfigError, log, rpc::RpcError};
use derive_more::Display;
use serde_json::Value;
use std::time::Duration;

///
/// Severity
///
/// `Fatal` marks a broken harness (the runner rejected a call, or a service
/// answered in an unexpected shape). Hosts decide how to terminate.
///

#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
pub enum Severity {
    Recoverable,
    Fatal,
}

///
/// NodeControlError
///

#[derive(Debug, ThisError)]
pub enum NodeControlError {
    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Rpc(#[from] RpcError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("bad response trying to send {method} JSON RPC to node runner on {node}:\n{response}")]
    RpcRejected {
        method: String,
        node: String,
        response: Value,
    },

    #[error("node {node} answered the readiness probe without a result: {response}")]
    ReadinessShape { node: String, response: Value },

    #[error("node {node} was not up after {}s", .waited.as_secs())]
    ReadinessTimedOut { node: String, waited: Duration },

    #[error("wait for node {node} was cancelled")]
    Cancelled { node: String },
}

impl NodeControlError {
    #[must_use]
    pub const fn severity(&self) -> Severity {
        match self {
            Self::RpcRejected { .. } | Self::ReadinessShape { .. } => Severity::Fatal,
            _ => Severity::Recoverable,
        }
    }

    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self.severity(), Severity::Fatal)
    }

    /// Log the error and terminate the process with status 1.
    pub fn exit(self) -> ! {
        log!(Error, "{}", self);
        std::process::exit(1)
    }
}

///
/// TESTS
///
