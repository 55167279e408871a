//! Control plane for a fleet of test nodes driven through their runner process.
//!
//! A [`NodeControl`] wraps one [`NodeBackend`] (local process or remote machine)
//! and exposes a single API for shell commands, file transfer, snapshots and
//! JSON-RPC calls to the node runner, regardless of where the node lives.
//!
//! ## Layering
//!
//! - `backend` is the seam to the concrete node implementations.
//! - `schedule` holds the deferred-execution context forwarded to the backend.
//! - `rpc` owns the runner JSON-RPC envelope and parameter shapes.
//! - `readiness` implements the polling loop used after (re)starts.
//! - `control` is the facade tying these together; `fleet` fans it out.
//!
//! The default flow is: caller → control → (schedule context) → backend.

pub mod backend;
pub mod config;
pub mod control;
pub mod error;
pub mod fleet;
pub mod log;
pub mod readiness;
pub mod rpc;
pub mod schedule;

pub use {
    backend::{BackendError, CommandOptions, CommandOutput, NodeBackend, TransportFault},
    control::NodeControl,
    error::{NodeControlError, Severity},
    fleet::Fleet,
    readiness::{CancelToken, ReadinessPolicy},
    rpc::{RpcParams, RpcRequest, RpcResponse},
    schedule::{ScheduleContext, ScheduleWhen},
};

pub(crate) use thiserror::Error as ThisError;

///
/// Crate Version
///

pub const CRATE_NAME: &str = env!("CARGO_PKG_NAME");
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
