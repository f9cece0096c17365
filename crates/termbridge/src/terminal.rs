use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use termbridge_protocol::EventKind;
use termbridge_protocol::KeyEvent;
use termbridge_protocol::Method;
use termbridge_protocol::RenderEvent;
use termbridge_protocol::ResizeEvent;
use termbridge_protocol::SelectionPosition;
use termbridge_protocol::TerminalOptions;
use termbridge_protocol::WritePayload;
use tracing::debug;
use tracing::warn;

use crate::engine::EngineClient;
use crate::error::BridgeError;
use crate::listeners::TerminalEvents;
use crate::registry::TerminalEntry;
use crate::registry::TerminalRegistry;
use crate::Result;

/// Handle to one registered terminal.
///
/// Clones share the same registration. Once any clone disposes the terminal,
/// every operation on every clone fails with [`BridgeError::TerminalNotFound`].
#[derive(Clone)]
pub struct Terminal {
    entry: Arc<TerminalEntry>,
    registry: Arc<TerminalRegistry>,
    client: EngineClient,
    dispose_timeout: Duration,
}

impl Terminal {
    pub(crate) fn new(
        entry: Arc<TerminalEntry>,
        registry: Arc<TerminalRegistry>,
        client: EngineClient,
        dispose_timeout: Duration,
    ) -> Self {
        Self {
            entry,
            registry,
            client,
            dispose_timeout,
        }
    }

    pub fn id(&self) -> &str {
        self.entry.id()
    }

    /// Options the terminal was created with.
    pub fn options(&self) -> &TerminalOptions {
        self.entry.options()
    }

    pub fn is_disposed(&self) -> bool {
        self.entry.is_disposed()
    }

    /// Installs every listener set in `events`, replacing those slots.
    pub fn set_events(&self, events: TerminalEvents) {
        self.entry.update_events(|current| current.merge(events));
    }

    pub fn has_listener(&self, kind: EventKind) -> bool {
        self.entry.has_listener(kind)
    }

    pub fn clear_listener(&self, kind: EventKind) {
        self.entry.update_events(|current| current.clear(kind));
    }

    pub fn on_binary(&self, f: impl Fn(String) + Send + Sync + 'static) {
        self.set_events(TerminalEvents::new().on_binary(f));
    }

    pub fn on_cursor_move(&self, f: impl Fn() + Send + Sync + 'static) {
        self.set_events(TerminalEvents::new().on_cursor_move(f));
    }

    pub fn on_data(&self, f: impl Fn(String) + Send + Sync + 'static) {
        self.set_events(TerminalEvents::new().on_data(f));
    }

    pub fn on_key(&self, f: impl Fn(KeyEvent) + Send + Sync + 'static) {
        self.set_events(TerminalEvents::new().on_key(f));
    }

    pub fn on_line_feed(&self, f: impl Fn() + Send + Sync + 'static) {
        self.set_events(TerminalEvents::new().on_line_feed(f));
    }

    pub fn on_scroll(&self, f: impl Fn(i32) + Send + Sync + 'static) {
        self.set_events(TerminalEvents::new().on_scroll(f));
    }

    pub fn on_selection_change(&self, f: impl Fn() + Send + Sync + 'static) {
        self.set_events(TerminalEvents::new().on_selection_change(f));
    }

    pub fn on_render(&self, f: impl Fn(RenderEvent) + Send + Sync + 'static) {
        self.set_events(TerminalEvents::new().on_render(f));
    }

    pub fn on_resize(&self, f: impl Fn(ResizeEvent) + Send + Sync + 'static) {
        self.set_events(TerminalEvents::new().on_resize(f));
    }

    pub fn on_title_change(&self, f: impl Fn(String) + Send + Sync + 'static) {
        self.set_events(TerminalEvents::new().on_title_change(f));
    }

    pub fn on_bell(&self, f: impl Fn() + Send + Sync + 'static) {
        self.set_events(TerminalEvents::new().on_bell(f));
    }

    fn ensure_live(&self) -> Result<&str> {
        if self.entry.is_disposed() || !self.registry.contains(&self.entry) {
            return Err(BridgeError::TerminalNotFound(self.id().to_string()));
        }
        Ok(self.id())
    }

    pub async fn get_rows(&self) -> Result<u16> {
        let id = self.ensure_live()?;
        self.client.call(Method::GetRows, (id,)).await
    }

    pub async fn get_columns(&self) -> Result<u16> {
        let id = self.ensure_live()?;
        self.client.call(Method::GetCols, (id,)).await
    }

    pub async fn has_selection(&self) -> Result<bool> {
        let id = self.ensure_live()?;
        self.client.call(Method::HasSelection, (id,)).await
    }

    /// Selected text, empty when nothing is selected.
    pub async fn get_selection(&self) -> Result<String> {
        let id = self.ensure_live()?;
        let text: Option<String> = self.client.call(Method::GetSelection, (id,)).await?;
        Ok(text.unwrap_or_default())
    }

    pub async fn get_selection_position(&self) -> Result<Option<SelectionPosition>> {
        let id = self.ensure_live()?;
        self.client.call(Method::GetSelectionPosition, (id,)).await
    }

    pub async fn focus(&self) -> Result<()> {
        let id = self.ensure_live()?;
        self.client.command(Method::Focus, (id,)).await
    }

    pub async fn blur(&self) -> Result<()> {
        let id = self.ensure_live()?;
        self.client.command(Method::Blur, (id,)).await
    }

    pub async fn resize(&self, columns: u16, rows: u16) -> Result<()> {
        let id = self.ensure_live()?;
        if columns == 0 || rows == 0 {
            debug!(terminal_id = %id, columns, rows, "Forwarding resize with a zero dimension");
        }
        self.client.command(Method::Resize, (id, columns, rows)).await
    }

    pub async fn clear_selection(&self) -> Result<()> {
        let id = self.ensure_live()?;
        self.client.command(Method::ClearSelection, (id,)).await
    }

    /// Selects `length` cells starting at (`column`, `row`), wrapping across rows.
    pub async fn select(&self, column: u16, row: u32, length: u32) -> Result<()> {
        let id = self.ensure_live()?;
        self.client
            .command(Method::Select, (id, column, row, length))
            .await
    }

    pub async fn select_all(&self) -> Result<()> {
        let id = self.ensure_live()?;
        self.client.command(Method::SelectAll, (id,)).await
    }

    /// Selects whole lines `start..=end`.
    pub async fn select_lines(&self, start: u32, end: u32) -> Result<()> {
        let id = self.ensure_live()?;
        if start > end {
            debug!(terminal_id = %id, start, end, "Forwarding reversed line selection");
        }
        self.client.command(Method::SelectLines, (id, start, end)).await
    }

    /// Negative amounts scroll up.
    pub async fn scroll_lines(&self, amount: i32) -> Result<()> {
        let id = self.ensure_live()?;
        self.client.command(Method::ScrollLines, (id, amount)).await
    }

    pub async fn scroll_pages(&self, count: i32) -> Result<()> {
        let id = self.ensure_live()?;
        self.client.command(Method::ScrollPages, (id, count)).await
    }

    pub async fn scroll_to_top(&self) -> Result<()> {
        let id = self.ensure_live()?;
        self.client.command(Method::ScrollToTop, (id,)).await
    }

    pub async fn scroll_to_bottom(&self) -> Result<()> {
        let id = self.ensure_live()?;
        self.client.command(Method::ScrollToBottom, (id,)).await
    }

    pub async fn scroll_to_line(&self, line: u32) -> Result<()> {
        let id = self.ensure_live()?;
        self.client.command(Method::ScrollToLine, (id, line)).await
    }

    /// Clears the buffer, keeping the prompt line.
    pub async fn clear(&self) -> Result<()> {
        let id = self.ensure_live()?;
        self.client.command(Method::Clear, (id,)).await
    }

    pub async fn write(&self, data: impl Into<WritePayload>) -> Result<()> {
        let id = self.ensure_live()?;
        let data = data.into();
        self.client.command(Method::Write, (id, &data)).await
    }

    /// Writes `data` followed by a line break.
    pub async fn write_line(&self, data: impl Into<WritePayload>) -> Result<()> {
        let id = self.ensure_live()?;
        let data = data.into();
        self.client.command(Method::Writeln, (id, &data)).await
    }

    /// Sends `text` as pasted input. The engine reports it through `on_data`.
    pub async fn paste(&self, text: &str) -> Result<()> {
        let id = self.ensure_live()?;
        self.client.command(Method::Paste, (id, text)).await
    }

    /// Redraws viewport rows `start..=end`.
    pub async fn refresh(&self, start: u16, end: u16) -> Result<()> {
        let id = self.ensure_live()?;
        if start > end {
            debug!(terminal_id = %id, start, end, "Forwarding reversed refresh range");
        }
        self.client.command(Method::Refresh, (id, start, end)).await
    }

    /// Full reset (RIS).
    pub async fn reset(&self) -> Result<()> {
        let id = self.ensure_live()?;
        self.client.command(Method::Reset, (id,)).await
    }

    /// Unregisters the terminal, then tears down its engine instance.
    ///
    /// Only the first call on any clone reaches the engine; later calls return
    /// `Ok(())`. The local registration is gone even when teardown fails.
    pub async fn dispose(&self) -> Result<()> {
        if !self.entry.mark_disposed() {
            return Ok(());
        }
        self.registry.remove(&self.entry);
        debug!(terminal_id = %self.id(), "Terminal unregistered");

        let teardown = self.client.command(Method::DisposeTerminal, (self.id(),));
        match tokio::time::timeout(self.dispose_timeout, teardown).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(err)) => {
                warn!(terminal_id = %self.id(), error = %err, "Engine teardown failed");
                Err(err)
            }
            Err(_) => {
                warn!(
                    terminal_id = %self.id(),
                    timeout_ms = self.dispose_timeout.as_millis() as u64,
                    "Engine teardown timed out"
                );
                Err(BridgeError::TeardownTimedOut {
                    id: self.id().to_string(),
                    after: self.dispose_timeout,
                })
            }
        }
    }
}

impl fmt::Debug for Terminal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Terminal")
            .field("id", &self.id())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}
