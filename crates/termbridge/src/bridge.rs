use std::sync::Arc;

use termbridge_protocol::EngineNotification;
use termbridge_protocol::Method;
use termbridge_protocol::TerminalOptions;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::config::BridgeConfig;
use crate::engine::EngineClient;
use crate::engine::EngineHandle;
use crate::engine::TerminalEngine;
use crate::error::BridgeError;
use crate::host::HostElement;
use crate::listeners::TerminalEvents;
use crate::registry::Dispatch;
use crate::registry::TerminalEntry;
use crate::registry::TerminalRegistry;
use crate::terminal::Terminal;
use crate::Result;

/// Entry point: owns the terminal registry and the engine connection.
///
/// Cheap to clone; clones share both.
#[derive(Clone)]
pub struct TerminalBridge {
    registry: Arc<TerminalRegistry>,
    client: EngineClient,
    config: Arc<BridgeConfig>,
}

impl TerminalBridge {
    pub fn new(engine: impl TerminalEngine + 'static, config: BridgeConfig) -> Self {
        Self::from_handle(Arc::new(engine), config)
    }

    pub fn from_handle(engine: EngineHandle, config: BridgeConfig) -> Self {
        Self {
            registry: Arc::new(TerminalRegistry::new(config.max_terminals())),
            client: EngineClient::new(engine, config.namespace()),
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Starts a terminal hosted by `host`, for callers that need listeners
    /// installed before the engine can report anything.
    pub fn builder(&self, host: &HostElement) -> TerminalBuilder {
        TerminalBuilder {
            bridge: self.clone(),
            host: host.clone(),
            id: None,
            options: TerminalOptions::default(),
            events: TerminalEvents::new(),
        }
    }

    /// Creates a terminal without listeners. A missing or blank `id` takes the
    /// host's id.
    pub async fn create(
        &self,
        id: Option<&str>,
        options: TerminalOptions,
        host: &HostElement,
    ) -> Result<Terminal> {
        let mut builder = self.builder(host).options(options);
        if let Some(id) = id {
            builder = builder.id(id);
        }
        builder.create().await
    }

    /// Live handle for `id`.
    pub fn terminal(&self, id: &str) -> Result<Terminal> {
        let entry = self
            .registry
            .get(id)
            .filter(|entry| entry.is_live())
            .ok_or_else(|| BridgeError::TerminalNotFound(id.to_string()))?;
        Ok(self.handle(entry))
    }

    /// Ids of registered terminals, sorted.
    pub fn ids(&self) -> Vec<String> {
        self.registry.ids()
    }

    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Routes one engine notification to its terminal's listener. The
    /// listener runs on the calling task.
    pub fn dispatch(&self, notification: EngineNotification) -> Dispatch {
        self.registry.dispatch(notification)
    }

    /// Drains `events` into [`TerminalBridge::dispatch`] until the channel
    /// closes.
    pub fn spawn_event_pump(&self, mut events: mpsc::Receiver<EngineNotification>) -> JoinHandle<()> {
        let bridge = self.clone();
        tokio::spawn(async move {
            while let Some(notification) = events.recv().await {
                bridge.dispatch(notification);
            }
            debug!("Event stream closed");
        })
    }

    fn handle(&self, entry: Arc<TerminalEntry>) -> Terminal {
        Terminal::new(
            entry,
            Arc::clone(&self.registry),
            self.client.clone(),
            self.config.dispose_timeout(),
        )
    }
}

/// Collects the id, options and listeners for a new terminal.
pub struct TerminalBuilder {
    bridge: TerminalBridge,
    host: HostElement,
    id: Option<String>,
    options: TerminalOptions,
    events: TerminalEvents,
}

impl TerminalBuilder {
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn options(mut self, options: TerminalOptions) -> Self {
        self.options = options;
        self
    }

    /// Installs listeners. Slots set here replace those set by earlier calls.
    pub fn events(mut self, events: TerminalEvents) -> Self {
        self.events.merge(events);
        self
    }

    /// Registers the terminal locally, then with the engine.
    ///
    /// Events the engine reports before it acknowledges registration are held
    /// and delivered after the first-render listener. If the returned future is
    /// dropped before the engine answers, the local entry is rolled back.
    pub async fn create(self) -> Result<Terminal> {
        let TerminalBuilder {
            bridge,
            host,
            id,
            options,
            events,
        } = self;
        let id = host.resolve_terminal_id(id.as_deref());

        let entry = Arc::new(TerminalEntry::new(
            id.clone(),
            options,
            events,
            bridge.config.event_queue_capacity(),
        ));
        bridge.registry.register(Arc::clone(&entry))?;
        let pending = PendingRegistration {
            registry: &bridge.registry,
            entry: &entry,
            armed: true,
        };

        let registered = bridge
            .client
            .command(
                Method::RegisterTerminal,
                (&id, host.element_ref(), entry.options()),
            )
            .await;

        if let Err(err) = registered {
            warn!(terminal_id = %id, error = %err, "Engine rejected terminal registration");
            return Err(err);
        }

        pending.complete();
        info!(terminal_id = %id, element_id = %host.id(), "Terminal registered");
        entry.go_live();
        Ok(bridge.handle(entry))
    }
}

/// Undoes a local registration unless the engine acknowledged it.
struct PendingRegistration<'a> {
    registry: &'a TerminalRegistry,
    entry: &'a Arc<TerminalEntry>,
    armed: bool,
}

impl PendingRegistration<'_> {
    fn complete(mut self) {
        self.armed = false;
    }
}

impl Drop for PendingRegistration<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.entry.mark_disposed();
            self.registry.remove(self.entry);
            debug!(terminal_id = %self.entry.id(), "Rolled back unfinished registration");
        }
    }
}
