#![deny(clippy::all)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

//! Asynchronous, id-keyed control of terminal emulator instances that live in
//! a remote engine (typically xterm.js in a browser).
//!
//! A [`TerminalBridge`] owns a registry of live [`Terminal`] handles and an
//! engine port. Calls on a handle become engine commands addressed by the
//! terminal id; engine notifications are routed back to the listener slots of
//! the handle registered under that id.
//!
//! ```ignore
//! use termbridge::{BridgeConfig, HostElement, StubEngine, TerminalBridge, TerminalEvents};
//!
//! let bridge = TerminalBridge::new(StubEngine::new(), BridgeConfig::default());
//! let terminal = bridge
//!     .builder(&HostElement::new())
//!     .events(TerminalEvents::new().on_data(|data| println!("input: {data:?}")))
//!     .create()
//!     .await?;
//! terminal.write_line("hello").await?;
//! terminal.dispose().await?;
//! ```

mod bridge;
mod config;
mod engine;
mod error;
mod host;
mod listeners;
mod registry;
mod terminal;

pub use bridge::TerminalBridge;
pub use bridge::TerminalBuilder;
pub use config::BridgeConfig;
pub use engine::stream::StreamEngine;
pub use engine::stub::StubEngine;
pub use engine::EngineHandle;
pub use engine::TerminalEngine;
pub use error::BridgeError;
pub use host::HostElement;
pub use listeners::TerminalEvents;
pub use registry::Dispatch;
pub use terminal::Terminal;

pub use termbridge_common::telemetry;
pub use termbridge_protocol as protocol;
pub use termbridge_protocol::{
    BufferPoint, EngineError, EngineEvent, EngineNotification, EventKind, KeyEvent,
    KeyboardEvent, Method, RenderEvent, ResizeEvent, SelectionPosition, TerminalOptions, Theme,
    WritePayload,
};

pub type Result<T> = std::result::Result<T, BridgeError>;
