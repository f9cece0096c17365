use serde::Deserialize;
use serde::Serialize;

use crate::types::KeyEvent;
use crate::types::RenderEvent;
use crate::types::ResizeEvent;

/// An event reported by the engine for one terminal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "payload", rename_all = "camelCase")]
pub enum EngineEvent {
    /// Non UTF-8 data (some mouse reports); forward to the pty as binary.
    Binary(String),
    CursorMove,
    /// Typed or pasted input; forward to the pty.
    Data(String),
    Key(KeyEvent),
    LineFeed,
    /// New viewport position.
    Scroll(i32),
    SelectionChange,
    Render(RenderEvent),
    Resize(ResizeEvent),
    /// OSC 0 / OSC 2 title.
    TitleChange(String),
    Bell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    FirstRender,
    Binary,
    CursorMove,
    Data,
    Key,
    LineFeed,
    Scroll,
    SelectionChange,
    Render,
    Resize,
    TitleChange,
    Bell,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::FirstRender => "firstRender",
            EventKind::Binary => "binary",
            EventKind::CursorMove => "cursorMove",
            EventKind::Data => "data",
            EventKind::Key => "key",
            EventKind::LineFeed => "lineFeed",
            EventKind::Scroll => "scroll",
            EventKind::SelectionChange => "selectionChange",
            EventKind::Render => "render",
            EventKind::Resize => "resize",
            EventKind::TitleChange => "titleChange",
            EventKind::Bell => "bell",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl EngineEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            EngineEvent::Binary(_) => EventKind::Binary,
            EngineEvent::CursorMove => EventKind::CursorMove,
            EngineEvent::Data(_) => EventKind::Data,
            EngineEvent::Key(_) => EventKind::Key,
            EngineEvent::LineFeed => EventKind::LineFeed,
            EngineEvent::Scroll(_) => EventKind::Scroll,
            EngineEvent::SelectionChange => EventKind::SelectionChange,
            EngineEvent::Render(_) => EventKind::Render,
            EngineEvent::Resize(_) => EventKind::Resize,
            EngineEvent::TitleChange(_) => EventKind::TitleChange,
            EngineEvent::Bell => EventKind::Bell,
        }
    }
}

/// An engine event addressed to a terminal id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineNotification {
    #[serde(rename = "terminalId")]
    pub terminal_id: String,
    #[serde(flatten)]
    pub event: EngineEvent,
}

impl EngineNotification {
    pub fn new(terminal_id: impl Into<String>, event: EngineEvent) -> Self {
        Self {
            terminal_id: terminal_id.into(),
            event,
        }
    }
}
