#![allow(dead_code)]

use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use termbridge::BridgeConfig;
use termbridge::Dispatch;
use termbridge::EngineNotification;
use termbridge::HostElement;
use termbridge::StubEngine;
use termbridge::Terminal;
use termbridge::TerminalBridge;
use termbridge::TerminalOptions;
use tokio::sync::mpsc;

pub const TEST_HOST_ID: &str = "host-test-1";

/// A bridge over a [`StubEngine`] whose events are dispatched by hand, so
/// tests decide exactly when listeners run.
pub struct TestHarness {
    pub bridge: TerminalBridge,
    pub stub: StubEngine,
    pub events: mpsc::Receiver<EngineNotification>,
    pub host: HostElement,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: BridgeConfig) -> Self {
        let (stub, events) = StubEngine::with_events(256);
        let bridge = TerminalBridge::new(stub.clone(), config);
        Self {
            bridge,
            stub,
            events,
            host: HostElement::with_id(TEST_HOST_ID),
        }
    }

    pub async fn create(&self, id: &str) -> Terminal {
        self.bridge
            .create(Some(id), TerminalOptions::default(), &self.host)
            .await
            .expect("create terminal")
    }

    /// Dispatches everything the stub has emitted so far.
    pub fn pump(&mut self) -> Vec<Dispatch> {
        let mut outcomes = Vec::new();
        while let Ok(notification) = self.events.try_recv() {
            outcomes.push(self.bridge.dispatch(notification));
        }
        outcomes
    }
}

pub fn test_config() -> BridgeConfig {
    BridgeConfig::default()
        .with_namespace("termbridge")
        .with_max_terminals(16)
        .with_dispose_timeout(Duration::from_millis(200))
}

/// Shared log that listeners append to.
#[derive(Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn count(&self) -> usize {
        self.0.lock().unwrap().len()
    }
}
