//! Engine port and bundled engines.

pub mod stream;
pub mod stub;

use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use termbridge_protocol::EngineError;
use termbridge_protocol::Method;
use tracing::trace;

use crate::error::BridgeError;

/// A remote terminal engine.
///
/// `method` is fully qualified (`"<namespace>.<name>"`); `params` is a JSON
/// array whose first element is the terminal id. A command with no result
/// answers `Value::Null`. There is no implicit timeout: callers wanting one
/// wrap the call themselves.
#[async_trait]
pub trait TerminalEngine: Send + Sync {
    async fn invoke(&self, method: &str, params: Value) -> Result<Value, EngineError>;
}

pub type EngineHandle = Arc<dyn TerminalEngine>;

#[async_trait]
impl<T: TerminalEngine + ?Sized> TerminalEngine for Arc<T> {
    async fn invoke(&self, method: &str, params: Value) -> Result<Value, EngineError> {
        (**self).invoke(method, params).await
    }
}

/// Typed calls against an engine under one namespace.
#[derive(Clone)]
pub(crate) struct EngineClient {
    engine: EngineHandle,
    namespace: Arc<str>,
}

impl EngineClient {
    pub(crate) fn new(engine: EngineHandle, namespace: &str) -> Self {
        Self {
            engine,
            namespace: Arc::from(namespace),
        }
    }

    async fn invoke(&self, method: Method, args: impl Serialize) -> Result<Value, BridgeError> {
        let name = method.qualified(&self.namespace);
        let params = serde_json::to_value(args).map_err(EngineError::from)?;
        trace!(method = %name, "Engine call");
        Ok(self.engine.invoke(&name, params).await?)
    }

    pub(crate) async fn call<T: DeserializeOwned>(
        &self,
        method: Method,
        args: impl Serialize,
    ) -> Result<T, BridgeError> {
        let value = self.invoke(method, args).await?;
        serde_json::from_value(value).map_err(|e| BridgeError::InvalidResult {
            method: method.qualified(&self.namespace),
            reason: e.to_string(),
        })
    }

    /// Any result the engine returns is ignored.
    pub(crate) async fn command(
        &self,
        method: Method,
        args: impl Serialize,
    ) -> Result<(), BridgeError> {
        self.invoke(method, args).await.map(drop)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    struct Recorder {
        calls: Mutex<Vec<(String, Value)>>,
        reply: Value,
    }

    #[async_trait]
    impl TerminalEngine for Recorder {
        async fn invoke(&self, method: &str, params: Value) -> Result<Value, EngineError> {
            self.calls.lock().unwrap().push((method.to_string(), params));
            Ok(self.reply.clone())
        }
    }

    fn client(reply: Value) -> (EngineClient, Arc<Recorder>) {
        let recorder = Arc::new(Recorder {
            calls: Mutex::new(Vec::new()),
            reply,
        });
        let engine: EngineHandle = recorder.clone();
        (EngineClient::new(engine, "webterm"), recorder)
    }

    #[tokio::test]
    async fn test_tuple_args_become_positional_params() {
        let (client, recorder) = client(Value::Null);
        client.command(Method::Resize, ("t1", 80, 24)).await.unwrap();

        let calls = recorder.calls.lock().unwrap();
        assert_eq!(calls[0].0, "webterm.resize");
        assert_eq!(calls[0].1, json!(["t1", 80, 24]));
    }

    #[tokio::test]
    async fn test_single_id_is_still_an_array() {
        let (client, recorder) = client(json!(24));
        let rows: u16 = client.call(Method::GetRows, ("t1",)).await.unwrap();
        assert_eq!(rows, 24);
        assert_eq!(recorder.calls.lock().unwrap()[0].1, json!(["t1"]));
    }

    #[tokio::test]
    async fn test_mistyped_result_is_invalid_result() {
        let (client, _) = client(json!("twenty"));
        let err = client
            .call::<u16>(Method::GetRows, ("t1",))
            .await
            .unwrap_err();
        assert!(
            matches!(err, BridgeError::InvalidResult { ref method, .. } if method == "webterm.getRows")
        );
    }
}
