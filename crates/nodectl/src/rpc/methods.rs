//!
//! Runner JSON-RPC method names.
//!

pub const START: &str = "start";
pub const STOP: &str = "stop";
pub const NEW_TEST: &str = "new_test";
pub const NETWORK_INIT: &str = "network_init";
pub const READY: &str = "ready";
pub const VERSION: &str = "version";
pub const MAKE_BACKUP: &str = "make_backup";
pub const LS_BACKUPS: &str = "ls_backups";
pub const RESET: &str = "reset";
pub const UPDATE_BINARIES: &str = "update_binaries";
pub const UPDATE_CONFIG: &str = "update_config";
pub const ADD_ENV: &str = "add_env";
pub const CLEAR_ENV: &str = "clear_env";
