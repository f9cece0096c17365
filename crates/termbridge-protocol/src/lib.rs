#![deny(clippy::all)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

//! Values exchanged between the terminal bridge and a terminal engine.

mod error;
mod events;
mod method;
mod options;
mod rpc;
mod types;

pub use termbridge_common::error_codes;

pub use error::EngineError;
pub use events::EngineEvent;
pub use events::EngineNotification;
pub use events::EventKind;
pub use method::Method;
pub use method::EVENT_METHOD;
pub use options::CursorInactiveStyle;
pub use options::CursorStyle;
pub use options::FastScrollModifier;
pub use options::LogLevel;
pub use options::TerminalOptions;
pub use options::Theme;
pub use rpc::Incoming;
pub use rpc::IncomingFrame;
pub use rpc::RpcError;
pub use rpc::RpcRequest;
pub use rpc::RpcResponse;
pub use types::BufferPoint;
pub use types::ElementRef;
pub use types::KeyEvent;
pub use types::KeyboardEvent;
pub use types::RenderEvent;
pub use types::ResizeEvent;
pub use types::SelectionPosition;
pub use types::WritePayload;

pub type Result<T> = std::result::Result<T, EngineError>;
