use crate::{
    backend::{BackendError, CommandOptions, CommandOutput, NodeBackend},
    config::Config,
    error::NodeControlError,
    log,
    log::Topic,
    readiness::{self, CancelToken, ReadinessPolicy},
    rpc::{
        RpcError, RpcParams, RpcRequest, RpcResponse, methods,
        params::{self, AddEnv, MakeBackup, NetworkInit, Reset, Start, UpdateBinaries, UpdateConfig},
    },
    schedule::ScheduleContext,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::{fmt, net::IpAddr, path::Path};

///
/// NodeControl
///
/// Backend-agnostic handle for one node. Mutating operations forward the
/// attached [`ScheduleContext`] (if any) to the backend, which decides
/// whether to defer them; read-only queries always run immediately.
///
/// A handle is cheap to clone and is meant to be owned by one caller at a
/// time. Attaching a new schedule before the previous batch was flushed is a
/// caller error and is not detected here.
///

#[derive(Clone)]
pub struct NodeControl<'a> {
    node: &'a dyn NodeBackend,
    can_validate: bool,
    want_state_dump: bool,
    want_runner: bool,
    schedule: Option<&'a ScheduleContext>,
}

impl fmt::Debug for NodeControl<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeControl")
            .field("node", &self.node.name())
            .field("can_validate", &self.can_validate)
            .field("want_state_dump", &self.want_state_dump)
            .field("want_runner", &self.want_runner)
            .field("schedule", &self.schedule)
            .finish()
    }
}

impl<'a> NodeControl<'a> {
    #[must_use]
    pub fn new(node: &'a dyn NodeBackend) -> Self {
        Self::with_capabilities(node, true, false)
    }

    #[must_use]
    pub fn with_capabilities(
        node: &'a dyn NodeBackend,
        can_validate: bool,
        want_state_dump: bool,
    ) -> Self {
        Self {
            node,
            can_validate,
            want_state_dump,
            want_runner: true,
            schedule: None,
        }
    }

    // -------------------------------------------------------------------------
    // Execution mode
    // -------------------------------------------------------------------------

    /// Return a handle that schedules mutating commands into `schedule`, or
    /// executes them immediately when `None`.
    #[must_use]
    pub fn with_schedule(mut self, schedule: Option<&'a ScheduleContext>) -> Self {
        self.set_schedule(schedule);
        self
    }

    pub fn set_schedule(&mut self, schedule: Option<&'a ScheduleContext>) {
        if let Some(ctx) = schedule {
            log!(Topic::Schedule, Debug, "{}: attaching {}", self.node.name(), ctx);
        }
        self.schedule = schedule;
    }

    #[must_use]
    pub const fn schedule(&self) -> Option<&'a ScheduleContext> {
        self.schedule
    }

    // -------------------------------------------------------------------------
    // Flags
    // -------------------------------------------------------------------------

    #[must_use]
    pub const fn can_validate(&self) -> bool {
        self.can_validate
    }

    #[must_use]
    pub const fn want_state_dump(&self) -> bool {
        self.want_state_dump
    }

    #[must_use]
    pub const fn want_runner(&self) -> bool {
        self.want_runner
    }

    pub const fn set_want_runner(&mut self, want_runner: bool) {
        self.want_runner = want_runner;
    }

    // -------------------------------------------------------------------------
    // Read-only queries (never scheduled)
    // -------------------------------------------------------------------------

    #[must_use]
    pub fn name(&self) -> String {
        self.node.name()
    }

    #[must_use]
    pub fn ip_address(&self) -> IpAddr {
        self.node.ip_address()
    }

    #[must_use]
    pub fn runner_port(&self) -> u16 {
        self.node.runner_port()
    }

    // -------------------------------------------------------------------------
    // Backend delegation
    // -------------------------------------------------------------------------

    pub fn stop_runner(&self) -> Result<(), BackendError> {
        self.node.stop_runner()
    }

    pub fn start_runner(&self) -> Result<(), BackendError> {
        self.node.start_runner()
    }

    /// Upload the runner program and refresh its language runtime.
    pub fn upload_runner(&self) -> Result<(), BackendError> {
        self.node.upload_runner()?;
        self.node.update_language_runtime()
    }

    pub fn run_command(
        &self,
        cmd: &str,
        opts: CommandOptions,
    ) -> Result<CommandOutput, BackendError> {
        log!(Topic::Command, Debug, "{}: run `{}`", self.node.name(), cmd);
        self.node.run_command(self.schedule, cmd, opts)
    }

    pub fn make_snapshot(&self, snapshot_id: &str) -> Result<(), BackendError> {
        log!(Topic::Snapshot, Debug, "{}: make snapshot {}", self.node.name(), snapshot_id);
        self.node.make_snapshot(snapshot_id)
    }

    pub fn restore_snapshot(&self, snapshot_id: &str) -> Result<(), BackendError> {
        log!(Topic::Snapshot, Debug, "{}: restore snapshot {}", self.node.name(), snapshot_id);
        self.node.restore_snapshot(snapshot_id)
    }

    pub fn list_snapshots(&self) -> Result<Vec<String>, BackendError> {
        self.node.list_snapshots()
    }

    pub fn delete_snapshot(&self, snapshot_id: &str) -> Result<(), BackendError> {
        self.node.delete_snapshot(snapshot_id)
    }

    pub fn upload_file(&self, src: &Path, dst: &Path) -> Result<(), BackendError> {
        self.node.upload_file(src, dst)
    }

    pub fn download_file(&self, src: &Path, dst: &Path) -> Result<(), BackendError> {
        self.node.download_file(src, dst)
    }

    /// Install the runner from scratch and start it.
    ///
    /// Steps run strictly in order and the first failure is returned as-is;
    /// later steps are not attempted.
    pub fn init_runner(&self, config: &Value, wipe_home: bool) -> Result<(), BackendError> {
        let node = self.node;
        log!(Topic::Runner, Info, "{}: initializing runner", node.name());

        node.stop_runner()?;
        node.init()?;
        node.make_runner_home_dir(wipe_home)?;
        node.upload_runner()?;
        node.upload_runner_config(config)?;
        node.init_language_runtime()?;
        node.start_runner()
    }

    // -------------------------------------------------------------------------
    // Readiness
    // -------------------------------------------------------------------------

    /// Block until the node's main service answers the validators query.
    ///
    /// Uses the configured policy, which retries forever unless a timeout is
    /// configured.
    pub fn wait_node_up(&self) -> Result<(), NodeControlError> {
        let policy = ReadinessPolicy::from_config(&Config::get().readiness);

        self.wait_node_up_with(&policy, &CancelToken::never())
    }

    pub fn wait_node_up_with(
        &self,
        policy: &ReadinessPolicy,
        cancel: &CancelToken,
    ) -> Result<(), NodeControlError> {
        readiness::wait_until_ready(&self.node.name(), policy, cancel, || {
            self.node.get_validators()
        })
    }

    // -------------------------------------------------------------------------
    // Runner JSON-RPC
    // -------------------------------------------------------------------------

    /// Post a runner request and return the raw response without inspecting `error`.
    pub fn call_unchecked(
        &self,
        method: &str,
        params: Option<RpcParams>,
    ) -> Result<Value, NodeControlError> {
        let body = RpcRequest::new(method, params.unwrap_or_default()).to_value()?;

        Ok(self.node.post_to_runner(self.schedule, &body)?)
    }

    /// Post a runner request and return its `result`.
    ///
    /// A non-null `error`, or a body that is not a JSON object, is returned
    /// as the fatal `RpcRejected`.
    pub fn call_checked(
        &self,
        method: &str,
        params: Option<RpcParams>,
    ) -> Result<Option<Value>, NodeControlError> {
        log!(Topic::Rpc, Debug, "run `call_checked` {} with {:?}", method, params);

        let response = self.call_unchecked(method, params)?;

        match RpcResponse::from_value(&response).map(RpcResponse::into_result) {
            Some(Ok(result)) => Ok(result),
            _ => Err(NodeControlError::RpcRejected {
                method: method.to_string(),
                node: self.node.name(),
                response,
            }),
        }
    }

    /// Like [`call_checked`](Self::call_checked), decoding the result into `T`.
    /// A missing result decodes from `null`.
    pub fn call_checked_as<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Option<RpcParams>,
    ) -> Result<T, NodeControlError> {
        let result = self.call_checked(method, params)?.unwrap_or(Value::Null);

        serde_json::from_value(result).map_err(|source| {
            RpcError::Decode {
                method: method.to_string(),
                source,
            }
            .into()
        })
    }

    pub fn runner_start(
        &self,
        batch_interval_millis: Option<u64>,
    ) -> Result<Option<Value>, NodeControlError> {
        let params = match batch_interval_millis {
            Some(batch_interval_millis) => params::named(
                methods::START,
                &Start {
                    batch_interval_millis,
                },
            )?,
            None => RpcParams::empty(),
        };

        self.call_checked(methods::START, Some(params))
    }

    pub fn runner_stop(&self) -> Result<Option<Value>, NodeControlError> {
        self.call_checked(methods::STOP, None)
    }

    pub fn runner_new_test(&self) -> Result<Option<Value>, NodeControlError> {
        let params = RpcParams::Named(self.node.new_test_params());

        self.call_checked(methods::NEW_TEST, Some(params))
    }

    pub fn runner_network_init(
        &self,
        init: &NetworkInit,
    ) -> Result<Option<Value>, NodeControlError> {
        let params = params::named(methods::NETWORK_INIT, init)?;

        self.call_checked(methods::NETWORK_INIT, Some(params))
    }

    pub fn runner_ready(&self) -> Result<Option<Value>, NodeControlError> {
        self.call_checked(methods::READY, None)
    }

    /// Unchecked: older runners do not implement `version`, and callers
    /// interpret that error themselves.
    pub fn runner_version(&self) -> Result<Value, NodeControlError> {
        self.call_unchecked(methods::VERSION, None)
    }

    pub fn runner_make_backup(
        &self,
        backup_id: &str,
        description: Option<&str>,
    ) -> Result<Option<Value>, NodeControlError> {
        let params = params::named(
            methods::MAKE_BACKUP,
            &MakeBackup {
                backup_id,
                description,
            },
        )?;

        self.call_checked(methods::MAKE_BACKUP, Some(params))
    }

    pub fn runner_ls_backups(&self) -> Result<Option<Value>, NodeControlError> {
        self.call_checked(methods::LS_BACKUPS, None)
    }

    pub fn runner_reset(&self, backup_id: Option<&str>) -> Result<Option<Value>, NodeControlError> {
        let params = params::named(methods::RESET, &Reset { backup_id })?;

        self.call_checked(methods::RESET, Some(params))
    }

    pub fn runner_update_binaries(
        &self,
        update: &UpdateBinaries,
    ) -> Result<Option<Value>, NodeControlError> {
        let params = params::named(methods::UPDATE_BINARIES, update)?;

        self.call_checked(methods::UPDATE_BINARIES, Some(params))
    }

    pub fn runner_update_config(
        &self,
        key_value: &Value,
    ) -> Result<Option<Value>, NodeControlError> {
        let params = params::named(methods::UPDATE_CONFIG, &UpdateConfig { key_value })?;

        self.call_checked(methods::UPDATE_CONFIG, Some(params))
    }

    pub fn runner_add_env(&self, key_values: &Value) -> Result<Option<Value>, NodeControlError> {
        let params = params::named(methods::ADD_ENV, &AddEnv { key_values })?;

        self.call_checked(methods::ADD_ENV, Some(params))
    }

    pub fn runner_clear_env(&self) -> Result<Option<Value>, NodeControlError> {
        self.call_checked(methods::CLEAR_ENV, None)
    }
}
