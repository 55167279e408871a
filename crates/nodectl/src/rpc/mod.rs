pub mod methods;
pub mod params;

pub use params::{NetworkInit, UpdateBinaries};

use crate::ThisError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Fixed `id` sent with every runner request. One request is in flight per
/// call, so the id is never used for correlation.
pub const REQUEST_ID: &str = "dontcare";

pub const JSONRPC_VERSION: &str = "2.0";

///
/// RpcError
///

#[derive(Debug, ThisError)]
pub enum RpcError {
    #[error("failed to encode '{method}' request: {source}")]
    Encode {
        method: String,
        source: serde_json::Error,
    },

    #[error("failed to decode '{method}' result: {source}")]
    Decode {
        method: String,
        source: serde_json::Error,
    },
}

///
/// RpcParams
/// Positional or named parameters of a runner request.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RpcParams {
    Positional(Vec<Value>),
    Named(Map<String, Value>),
}

impl RpcParams {
    #[must_use]
    pub const fn empty() -> Self {
        Self::Positional(Vec::new())
    }
}

impl Default for RpcParams {
    fn default() -> Self {
        Self::empty()
    }
}

impl From<Vec<Value>> for RpcParams {
    fn from(values: Vec<Value>) -> Self {
        Self::Positional(values)
    }
}

impl From<Map<String, Value>> for RpcParams {
    fn from(map: Map<String, Value>) -> Self {
        Self::Named(map)
    }
}

///
/// RpcRequest
/// The JSON-RPC envelope posted to the runner.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct RpcRequest {
    pub method: String,
    pub params: RpcParams,
    pub id: String,
    pub jsonrpc: String,
}

impl RpcRequest {
    pub fn new(method: impl Into<String>, params: RpcParams) -> Self {
        Self {
            method: method.into(),
            params,
            id: REQUEST_ID.to_string(),
            jsonrpc: JSONRPC_VERSION.to_string(),
        }
    }

    pub fn to_value(&self) -> Result<Value, RpcError> {
        serde_json::to_value(self).map_err(|source| RpcError::Encode {
            method: self.method.clone(),
            source,
        })
    }
}

///
/// RpcResponse
///
/// Read-only view over a decoded runner response. A `null` member is treated
/// the same as a missing one; a body that is not a JSON object has no view.
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct RpcResponse {
    pub result: Option<Value>,
    pub error: Option<Value>,
}

impl RpcResponse {
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        let member = |key: &str| object.get(key).filter(|v| !v.is_null()).cloned();

        Some(Self {
            result: member("result"),
            error: member("error"),
        })
    }

    /// Split into the result on success, or the error payload.
    pub fn into_result(self) -> Result<Option<Value>, Value> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.result),
        }
    }
}

///
/// TESTS
///
