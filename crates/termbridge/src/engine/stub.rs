//! In-process engine that models just enough terminal state to exercise the
//! bridge: viewport size, a plain-text line buffer, selection and viewport
//! position. It records every call and reports the events a real engine would
//! emit for the state changes it models.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::json;
use serde_json::Value;
use termbridge_common::error_codes;
use termbridge_common::mutex_lock_or_recover;
use termbridge_protocol::BufferPoint;
use termbridge_protocol::EngineError;
use termbridge_protocol::EngineEvent;
use termbridge_protocol::EngineNotification;
use termbridge_protocol::Method;
use termbridge_protocol::RenderEvent;
use termbridge_protocol::ResizeEvent;
use termbridge_protocol::SelectionPosition;
use termbridge_protocol::TerminalOptions;
use termbridge_protocol::WritePayload;
use tokio::sync::mpsc;

use super::TerminalEngine;
use crate::config::DEFAULT_NAMESPACE;

const DEFAULT_COLS: u16 = 80;
const DEFAULT_ROWS: u16 = 24;

type CallRecord = Vec<(String, Value)>;

struct StubTerminal {
    element_id: String,
    cols: u16,
    rows: u16,
    lines: Vec<String>,
    selection: Option<SelectionPosition>,
    viewport_y: u32,
    focused: bool,
}

impl StubTerminal {
    fn new(element_id: String, options: &TerminalOptions) -> Self {
        Self {
            element_id,
            cols: options.cols.unwrap_or(DEFAULT_COLS),
            rows: options.rows.unwrap_or(DEFAULT_ROWS),
            lines: vec![String::new()],
            selection: None,
            viewport_y: 0,
            focused: false,
        }
    }

    fn last_line(&self) -> u32 {
        self.lines.len().saturating_sub(1) as u32
    }

    /// Highest viewport position: the buffer's first row when it fits the viewport.
    fn base_y(&self) -> u32 {
        (self.lines.len() as u32).saturating_sub(u32::from(self.rows))
    }

    /// Appends text, returning (line feeds, bells) seen.
    fn feed(&mut self, text: &str) -> (usize, usize) {
        let (mut line_feeds, mut bells) = (0, 0);
        for ch in text.chars() {
            match ch {
                '\n' => {
                    self.lines.push(String::new());
                    line_feeds += 1;
                }
                '\u{7}' => bells += 1,
                c if c.is_control() => {}
                c => {
                    if let Some(line) = self.lines.last_mut() {
                        line.push(c);
                    }
                }
            }
        }
        self.viewport_y = self.base_y();
        (line_feeds, bells)
    }

    fn selected_text(&self) -> String {
        let Some(selection) = self.selection else {
            return String::new();
        };
        let mut out = Vec::new();
        let last = self.last_line();
        for row in selection.rows().take_while(|row| *row <= last) {
            let line = self.lines.get(row as usize).map(String::as_str).unwrap_or("");
            let from = if row == selection.start.row {
                selection.start.column as usize
            } else {
                0
            };
            let to = if row == selection.end.row {
                selection.end.column as usize
            } else {
                usize::MAX
            };
            let text: String = line
                .chars()
                .skip(from)
                .take(to.saturating_sub(from))
                .collect();
            out.push(text);
        }
        out.join("\n")
    }
}

#[derive(Default)]
struct StubState {
    terminals: HashMap<String, StubTerminal>,
    calls: CallRecord,
    failures: HashMap<Method, (i32, String)>,
    hung: Vec<Method>,
}

/// A scriptable in-process engine for tests and examples.
///
/// # Example
///
/// ```ignore
/// let (stub, events) = StubEngine::with_events(64);
/// let bridge = TerminalBridge::new(stub.clone(), BridgeConfig::default());
/// bridge.spawn_event_pump(events);
/// ```
#[derive(Clone)]
pub struct StubEngine {
    namespace: Arc<str>,
    state: Arc<Mutex<StubState>>,
    events: Option<mpsc::Sender<EngineNotification>>,
}

impl Default for StubEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl StubEngine {
    /// A stub answering under the default namespace, without an event channel.
    pub fn new() -> Self {
        Self {
            namespace: Arc::from(DEFAULT_NAMESPACE),
            state: Arc::new(Mutex::new(StubState::default())),
            events: None,
        }
    }

    /// A stub that reports events through the returned receiver.
    pub fn with_events(capacity: usize) -> (Self, mpsc::Receiver<EngineNotification>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let mut stub = Self::new();
        stub.events = Some(tx);
        (stub, rx)
    }

    pub fn with_namespace(mut self, namespace: &str) -> Self {
        self.namespace = Arc::from(namespace);
        self
    }

    /// Makes every later call to `method` fail with the given RPC error.
    pub fn fail_method(&self, method: Method, code: i32, message: &str) {
        self.lock()
            .failures
            .insert(method, (code, message.to_string()));
    }

    /// Makes every later call to `method` never answer.
    pub fn hang_method(&self, method: Method) {
        self.lock().hung.push(method);
    }

    /// Clears any failure or hang scripted for `method`.
    pub fn release_method(&self, method: Method) {
        let mut state = self.lock();
        state.failures.remove(&method);
        state.hung.retain(|hung| *hung != method);
    }

    /// Pushes an event as if the engine had raised it. Returns false when the
    /// stub has no event channel or the channel is full.
    pub fn emit(&self, terminal_id: &str, event: EngineEvent) -> bool {
        match &self.events {
            Some(tx) => tx
                .try_send(EngineNotification::new(terminal_id, event))
                .is_ok(),
            None => false,
        }
    }

    /// Every call received, as `(qualified method, params)`.
    pub fn calls(&self) -> CallRecord {
        self.lock().calls.clone()
    }

    pub fn call_count(&self, method: Method) -> usize {
        let name = method.qualified(&self.namespace);
        self.lock().calls.iter().filter(|(m, _)| *m == name).count()
    }

    pub fn params_for(&self, method: Method) -> Vec<Value> {
        let name = method.qualified(&self.namespace);
        self.lock()
            .calls
            .iter()
            .filter(|(m, _)| *m == name)
            .map(|(_, p)| p.clone())
            .collect()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    pub fn is_registered(&self, terminal_id: &str) -> bool {
        self.lock().terminals.contains_key(terminal_id)
    }

    pub fn terminal_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.lock().terminals.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn element_id(&self, terminal_id: &str) -> Option<String> {
        self.lock()
            .terminals
            .get(terminal_id)
            .map(|t| t.element_id.clone())
    }

    /// Buffer contents, one entry per line.
    pub fn lines(&self, terminal_id: &str) -> Vec<String> {
        self.lock()
            .terminals
            .get(terminal_id)
            .map(|t| t.lines.clone())
            .unwrap_or_default()
    }

    pub fn is_focused(&self, terminal_id: &str) -> bool {
        self.lock()
            .terminals
            .get(terminal_id)
            .is_some_and(|t| t.focused)
    }

    pub fn viewport_y(&self, terminal_id: &str) -> Option<u32> {
        self.lock().terminals.get(terminal_id).map(|t| t.viewport_y)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, StubState> {
        mutex_lock_or_recover(&self.state)
    }

    fn emit_all(&self, terminal_id: &str, events: Vec<EngineEvent>) {
        for event in events {
            self.emit(terminal_id, event);
        }
    }

    fn handle(&self, method: Method, params: &Value) -> Result<(Value, Vec<EngineEvent>), EngineError> {
        let id = terminal_id(params)?;
        let mut state = self.lock();

        if method == Method::RegisterTerminal {
            if state.terminals.contains_key(&id) {
                return Err(EngineError::rpc(
                    error_codes::TERMINAL_EXISTS,
                    format!("Terminal already exists: {id}"),
                ));
            }
            let element_id = params
                .get(1)
                .and_then(|e| e.get("elementId"))
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            let options: TerminalOptions = arg(params, 2, method)?;
            state
                .terminals
                .insert(id, StubTerminal::new(element_id, &options));
            return Ok((Value::Null, Vec::new()));
        }

        if method == Method::DisposeTerminal {
            return match state.terminals.remove(&id) {
                Some(_) => Ok((Value::Null, Vec::new())),
                None => Err(not_found(&id)),
            };
        }

        let term = state.terminals.get_mut(&id).ok_or_else(|| not_found(&id))?;
        let mut events = Vec::new();

        let result = match method {
            Method::GetRows => json!(term.rows),
            Method::GetCols => json!(term.cols),
            Method::Focus => {
                term.focused = true;
                Value::Null
            }
            Method::Blur => {
                term.focused = false;
                Value::Null
            }
            Method::Resize => {
                let cols: u16 = arg(params, 1, method)?;
                let rows: u16 = arg(params, 2, method)?;
                if cols == 0 || rows == 0 {
                    return Err(EngineError::rpc(
                        error_codes::INVALID_PARAMS,
                        format!("Invalid size {cols}x{rows}"),
                    ));
                }
                if (cols, rows) != (term.cols, term.rows) {
                    term.cols = cols;
                    term.rows = rows;
                    events.push(EngineEvent::Resize(ResizeEvent { cols, rows }));
                }
                Value::Null
            }
            Method::HasSelection => json!(term.selection.is_some()),
            Method::GetSelection => json!(term.selected_text()),
            Method::GetSelectionPosition => serde_json::to_value(term.selection)?,
            Method::ClearSelection => {
                if term.selection.take().is_some() {
                    events.push(EngineEvent::SelectionChange);
                }
                Value::Null
            }
            Method::Select => {
                let column: u32 = arg(params, 1, method)?;
                let row: u32 = arg(params, 2, method)?;
                let length: u32 = arg(params, 3, method)?;
                let cols = u64::from(term.cols.max(1));
                let end = (u64::from(row) * cols + u64::from(column)) + u64::from(length);
                let end_row = u32::try_from(end / cols).unwrap_or(u32::MAX);
                term.selection = Some(SelectionPosition {
                    start: BufferPoint::new(column, row),
                    end: BufferPoint::new((end % cols) as u32, end_row),
                });
                events.push(EngineEvent::SelectionChange);
                Value::Null
            }
            Method::SelectAll => {
                term.selection = Some(SelectionPosition {
                    start: BufferPoint::new(0, 0),
                    end: BufferPoint::new(u32::from(term.cols), term.last_line()),
                });
                events.push(EngineEvent::SelectionChange);
                Value::Null
            }
            Method::SelectLines => {
                let start: u32 = arg(params, 1, method)?;
                let end: u32 = arg(params, 2, method)?;
                let (start, end) = (start.min(end), start.max(end));
                term.selection = Some(SelectionPosition {
                    start: BufferPoint::new(0, start),
                    end: BufferPoint::new(u32::from(term.cols), end),
                });
                events.push(EngineEvent::SelectionChange);
                Value::Null
            }
            Method::ScrollLines => {
                let amount: i64 = arg(params, 1, method)?;
                let target = i64::from(term.viewport_y).saturating_add(amount);
                scroll_to(term, target, &mut events);
                Value::Null
            }
            Method::ScrollPages => {
                let pages: i64 = arg(params, 1, method)?;
                let target = i64::from(term.viewport_y)
                    .saturating_add(pages.saturating_mul(i64::from(term.rows)));
                scroll_to(term, target, &mut events);
                Value::Null
            }
            Method::ScrollToTop => {
                scroll_to(term, 0, &mut events);
                Value::Null
            }
            Method::ScrollToBottom => {
                let bottom = i64::from(term.base_y());
                scroll_to(term, bottom, &mut events);
                Value::Null
            }
            Method::ScrollToLine => {
                let line: i64 = arg(params, 1, method)?;
                scroll_to(term, line, &mut events);
                Value::Null
            }
            Method::Clear => {
                let prompt = term.lines.pop().unwrap_or_default();
                term.lines = vec![prompt];
                term.viewport_y = 0;
                term.selection = None;
                Value::Null
            }
            Method::Write | Method::Writeln => {
                let payload: WritePayload = arg(params, 1, method)?;
                let mut text = String::from_utf8_lossy(payload.as_bytes()).into_owned();
                if method == Method::Writeln {
                    text.push_str("\r\n");
                }
                let (line_feeds, bells) = term.feed(&text);
                events.extend(std::iter::repeat(EngineEvent::LineFeed).take(line_feeds));
                events.extend(std::iter::repeat(EngineEvent::Bell).take(bells));
                Value::Null
            }
            Method::Paste => {
                let text: String = arg(params, 1, method)?;
                events.push(EngineEvent::Data(prepare_paste(&text)));
                Value::Null
            }
            Method::Refresh => {
                let start: u16 = arg(params, 1, method)?;
                let end: u16 = arg(params, 2, method)?;
                let end = end.min(term.rows.saturating_sub(1));
                if start <= end {
                    events.push(EngineEvent::Render(RenderEvent { start, end }));
                }
                Value::Null
            }
            Method::Reset => {
                term.lines = vec![String::new()];
                term.selection = None;
                term.viewport_y = 0;
                Value::Null
            }
            Method::RegisterTerminal | Method::DisposeTerminal => Value::Null,
        };

        Ok((result, events))
    }
}

#[async_trait]
impl TerminalEngine for StubEngine {
    async fn invoke(&self, method: &str, params: Value) -> Result<Value, EngineError> {
        let (parsed, hung) = {
            let mut state = self.lock();
            state.calls.push((method.to_string(), params.clone()));

            let Some(parsed) = Method::from_qualified(&self.namespace, method) else {
                return Err(EngineError::rpc(
                    error_codes::METHOD_NOT_FOUND,
                    format!("Method not found: {method}"),
                ));
            };
            if let Some((code, message)) = state.failures.get(&parsed) {
                return Err(EngineError::rpc(*code, message.clone()));
            }
            (parsed, state.hung.contains(&parsed))
        };

        if hung {
            return std::future::pending().await;
        }

        let (result, events) = self.handle(parsed, &params)?;
        if let Some(id) = params.get(0).and_then(Value::as_str) {
            self.emit_all(id, events);
        }
        Ok(result)
    }
}

fn scroll_to(term: &mut StubTerminal, target: i64, events: &mut Vec<EngineEvent>) {
    let clamped = target.clamp(0, i64::from(term.base_y())) as u32;
    if clamped != term.viewport_y {
        term.viewport_y = clamped;
        events.push(EngineEvent::Scroll(clamped as i32));
    }
}

/// Line endings become carriage returns, as a terminal expects from a paste.
fn prepare_paste(text: &str) -> String {
    text.replace("\r\n", "\r").replace('\n', "\r")
}

fn terminal_id(params: &Value) -> Result<String, EngineError> {
    params
        .get(0)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| {
            EngineError::rpc(error_codes::INVALID_PARAMS, "Missing terminal id parameter")
        })
}

fn arg<T: DeserializeOwned>(params: &Value, index: usize, method: Method) -> Result<T, EngineError> {
    let value = params.get(index).cloned().unwrap_or(Value::Null);
    serde_json::from_value(value).map_err(|e| {
        EngineError::rpc(
            error_codes::INVALID_PARAMS,
            format!("Invalid parameter {index} for {method}: {e}"),
        )
    })
}

fn not_found(id: &str) -> EngineError {
    EngineError::rpc(
        error_codes::TERMINAL_NOT_FOUND,
        format!("Terminal not found: {id}"),
    )
}
