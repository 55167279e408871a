use crate::rpc::{RpcError, RpcParams};
use serde::Serialize;
use serde_json::Value;

///
/// NetworkInit
/// Parameters of the `network_init` runner call.
///

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct NetworkInit {
    pub validators: Value,
    pub boot_nodes: String,
    pub state_source: String,
    pub patches_path: Option<String>,
    pub epoch_length: u64,
    pub num_seats: u64,
    pub new_chain_id: String,
    pub protocol_version: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub genesis_time: Option<String>,
}

///
/// UpdateBinaries
/// Parameters of the `update_binaries` runner call; unset fields are sent as `null`.
///

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct UpdateBinaries {
    pub neard_binary_url: Option<String>,
    pub epoch_height: Option<u64>,
    pub binary_idx: Option<u32>,
}

#[derive(Serialize)]
pub(crate) struct Start {
    pub batch_interval_millis: u64,
}

#[derive(Serialize)]
pub(crate) struct MakeBackup<'a> {
    pub backup_id: &'a str,
    pub description: Option<&'a str>,
}

#[derive(Serialize)]
pub(crate) struct Reset<'a> {
    pub backup_id: Option<&'a str>,
}

#[derive(Serialize)]
pub(crate) struct UpdateConfig<'a> {
    pub key_value: &'a Value,
}

#[derive(Serialize)]
pub(crate) struct AddEnv<'a> {
    pub key_values: &'a Value,
}

/// Serialize a parameter struct into named params.
pub(crate) fn named<T: Serialize>(method: &str, params: &T) -> Result<RpcParams, RpcError> {
    let encode_err = |source: serde_json::Error| RpcError::Encode {
        method: method.to_string(),
        source,
    };

    match serde_json::to_value(params).map_err(encode_err)? {
        Value::Object(map) => Ok(RpcParams::Named(map)),
        _ => Err(encode_err(serde::ser::Error::custom(
            "named params must serialize to an object",
        ))),
    }
}

///
/// TESTS
///
