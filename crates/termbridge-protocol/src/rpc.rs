//! JSON-RPC 2.0 framing used by stream transports.

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::error::EngineError;
use crate::events::EngineNotification;

const JSONRPC_VERSION: &str = "2.0";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcRequest {
    pub jsonrpc: String,
    pub id: u64,
    pub method: String,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub params: Value,
}

impl RpcRequest {
    pub fn new(id: u64, method: impl Into<String>, params: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            method: method.into(),
            params,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i32,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcResponse {
    pub jsonrpc: String,
    pub id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

impl RpcResponse {
    pub fn success(id: u64, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn error(id: u64, code: i32, message: &str) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: None,
            error: Some(RpcError {
                code,
                message: message.to_string(),
            }),
        }
    }

    /// A missing `result` on success means the call returned nothing.
    pub fn into_result(self) -> Result<Value, EngineError> {
        match self.error {
            Some(error) => Err(EngineError::Rpc {
                code: error.code,
                message: error.message,
            }),
            None => Ok(self.result.unwrap_or(Value::Null)),
        }
    }
}

/// Any frame an engine may send: a response or a notification.
#[derive(Debug, Clone, Deserialize)]
pub struct IncomingFrame {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub params: Option<Value>,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<RpcError>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Incoming {
    Response(RpcResponse),
    Notification(EngineNotification),
}

impl IncomingFrame {
    /// Classifies the frame. `event_method` is the fully qualified
    /// notification method name, e.g. `"termbridge.event"`.
    pub fn classify(self, event_method: &str) -> Result<Incoming, EngineError> {
        match (self.id, self.method) {
            (Some(id), None) => Ok(Incoming::Response(RpcResponse {
                jsonrpc: JSONRPC_VERSION.to_string(),
                id,
                result: self.result,
                error: self.error,
            })),
            (None, Some(method)) if method == event_method => {
                let params = self.params.ok_or_else(|| {
                    EngineError::InvalidResponse("event notification without params".to_string())
                })?;
                Ok(Incoming::Notification(serde_json::from_value(params)?))
            }
            (None, Some(method)) => Err(EngineError::InvalidResponse(format!(
                "unexpected notification method: {method}"
            ))),
            (Some(id), Some(method)) => Err(EngineError::InvalidResponse(format!(
                "engine sent request {id} ({method}); engines may only respond or notify"
            ))),
            (None, None) => Err(EngineError::InvalidResponse(
                "frame has neither id nor method".to_string(),
            )),
        }
    }
}
