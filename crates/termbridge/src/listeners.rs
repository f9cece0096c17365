//! Per-terminal listener slots.

use std::fmt;
use std::sync::Arc;

use termbridge_protocol::EngineEvent;
use termbridge_protocol::EventKind;
use termbridge_protocol::KeyEvent;
use termbridge_protocol::RenderEvent;
use termbridge_protocol::ResizeEvent;

type Signal = Arc<dyn Fn() + Send + Sync>;
type Callback<T> = Arc<dyn Fn(T) + Send + Sync>;

/// A listener bound to its payload, ready to run outside any lock.
pub(crate) type Delivery = Box<dyn FnOnce() + Send>;

/// One listener slot per event kind. Setting a slot replaces its listener.
#[derive(Clone, Default)]
pub struct TerminalEvents {
    first_render: Option<Signal>,
    binary: Option<Callback<String>>,
    cursor_move: Option<Signal>,
    data: Option<Callback<String>>,
    key: Option<Callback<KeyEvent>>,
    line_feed: Option<Signal>,
    scroll: Option<Callback<i32>>,
    selection_change: Option<Signal>,
    render: Option<Callback<RenderEvent>>,
    resize: Option<Callback<ResizeEvent>>,
    title_change: Option<Callback<String>>,
    bell: Option<Signal>,
}

impl TerminalEvents {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fires once, after the engine has acknowledged registration.
    pub fn on_first_render(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.first_render = Some(Arc::new(f));
        self
    }

    /// Non UTF-8 input (some mouse reports). Forward it to the pty as binary.
    pub fn on_binary(mut self, f: impl Fn(String) + Send + Sync + 'static) -> Self {
        self.binary = Some(Arc::new(f));
        self
    }

    pub fn on_cursor_move(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.cursor_move = Some(Arc::new(f));
        self
    }

    /// Typed or pasted input. In a typical setup this goes to the pty.
    pub fn on_data(mut self, f: impl Fn(String) + Send + Sync + 'static) -> Self {
        self.data = Some(Arc::new(f));
        self
    }

    pub fn on_key(mut self, f: impl Fn(KeyEvent) + Send + Sync + 'static) -> Self {
        self.key = Some(Arc::new(f));
        self
    }

    pub fn on_line_feed(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.line_feed = Some(Arc::new(f));
        self
    }

    /// Receives the new viewport position.
    pub fn on_scroll(mut self, f: impl Fn(i32) + Send + Sync + 'static) -> Self {
        self.scroll = Some(Arc::new(f));
        self
    }

    pub fn on_selection_change(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.selection_change = Some(Arc::new(f));
        self
    }

    pub fn on_render(mut self, f: impl Fn(RenderEvent) + Send + Sync + 'static) -> Self {
        self.render = Some(Arc::new(f));
        self
    }

    pub fn on_resize(mut self, f: impl Fn(ResizeEvent) + Send + Sync + 'static) -> Self {
        self.resize = Some(Arc::new(f));
        self
    }

    pub fn on_title_change(mut self, f: impl Fn(String) + Send + Sync + 'static) -> Self {
        self.title_change = Some(Arc::new(f));
        self
    }

    pub fn on_bell(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.bell = Some(Arc::new(f));
        self
    }

    pub fn has_listener(&self, kind: EventKind) -> bool {
        match kind {
            EventKind::FirstRender => self.first_render.is_some(),
            EventKind::Binary => self.binary.is_some(),
            EventKind::CursorMove => self.cursor_move.is_some(),
            EventKind::Data => self.data.is_some(),
            EventKind::Key => self.key.is_some(),
            EventKind::LineFeed => self.line_feed.is_some(),
            EventKind::Scroll => self.scroll.is_some(),
            EventKind::SelectionChange => self.selection_change.is_some(),
            EventKind::Render => self.render.is_some(),
            EventKind::Resize => self.resize.is_some(),
            EventKind::TitleChange => self.title_change.is_some(),
            EventKind::Bell => self.bell.is_some(),
        }
    }

    pub(crate) fn clear(&mut self, kind: EventKind) {
        match kind {
            EventKind::FirstRender => self.first_render = None,
            EventKind::Binary => self.binary = None,
            EventKind::CursorMove => self.cursor_move = None,
            EventKind::Data => self.data = None,
            EventKind::Key => self.key = None,
            EventKind::LineFeed => self.line_feed = None,
            EventKind::Scroll => self.scroll = None,
            EventKind::SelectionChange => self.selection_change = None,
            EventKind::Render => self.render = None,
            EventKind::Resize => self.resize = None,
            EventKind::TitleChange => self.title_change = None,
            EventKind::Bell => self.bell = None,
        }
    }

    /// Copies every slot set in `other` into `self`.
    pub(crate) fn merge(&mut self, other: TerminalEvents) {
        macro_rules! take_slots {
            ($($slot:ident),*) => {
                $(if other.$slot.is_some() { self.$slot = other.$slot; })*
            };
        }
        take_slots!(
            first_render,
            binary,
            cursor_move,
            data,
            key,
            line_feed,
            scroll,
            selection_change,
            render,
            resize,
            title_change,
            bell
        );
    }

    pub(crate) fn first_render_delivery(&self) -> Option<Delivery> {
        let listener = self.first_render.clone()?;
        Some(Box::new(move || listener()))
    }

    /// Binds `event` to its listener, or `None` if the slot is empty.
    pub(crate) fn delivery(&self, event: EngineEvent) -> Option<Delivery> {
        match event {
            EngineEvent::Binary(data) => bind(&self.binary, data),
            EngineEvent::CursorMove => signal(&self.cursor_move),
            EngineEvent::Data(data) => bind(&self.data, data),
            EngineEvent::Key(key) => bind(&self.key, key),
            EngineEvent::LineFeed => signal(&self.line_feed),
            EngineEvent::Scroll(position) => bind(&self.scroll, position),
            EngineEvent::SelectionChange => signal(&self.selection_change),
            EngineEvent::Render(range) => bind(&self.render, range),
            EngineEvent::Resize(size) => bind(&self.resize, size),
            EngineEvent::TitleChange(title) => bind(&self.title_change, title),
            EngineEvent::Bell => signal(&self.bell),
        }
    }
}

fn signal(slot: &Option<Signal>) -> Option<Delivery> {
    let listener = slot.clone()?;
    Some(Box::new(move || listener()))
}

fn bind<T: Send + 'static>(slot: &Option<Callback<T>>, payload: T) -> Option<Delivery> {
    let listener = slot.clone()?;
    Some(Box::new(move || listener(payload)))
}

impl fmt::Debug for TerminalEvents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const KINDS: [EventKind; 12] = [
            EventKind::FirstRender,
            EventKind::Binary,
            EventKind::CursorMove,
            EventKind::Data,
            EventKind::Key,
            EventKind::LineFeed,
            EventKind::Scroll,
            EventKind::SelectionChange,
            EventKind::Render,
            EventKind::Resize,
            EventKind::TitleChange,
            EventKind::Bell,
        ];
        let set: Vec<&str> = KINDS
            .iter()
            .filter(|kind| self.has_listener(**kind))
            .map(EventKind::as_str)
            .collect();
        f.debug_struct("TerminalEvents").field("listeners", &set).finish()
    }
}
