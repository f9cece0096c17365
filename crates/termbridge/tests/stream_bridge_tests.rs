//! Stream engine end-to-end tests
//!
//! Runs the bridge over newline-delimited JSON-RPC on an in-memory duplex
//! pipe, with a scripted peer standing in for the browser-side engine.

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use std::time::Duration;

use common::{test_config, Journal};
use serde_json::{json, Value};
use termbridge::protocol::error_codes;
use termbridge::{
    BridgeError, EngineError, HostElement, StreamEngine, TerminalBridge, TerminalEvents,
    TerminalOptions,
};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream};
use tokio::sync::mpsc;

/// Answers every request: `getRows` with 24, `getCols` with 80, anything on
/// terminal "broken" with an engine error, everything else with null. After
/// acknowledging a registration it reports a title change for that terminal.
async fn run_peer(stream: DuplexStream, requests: mpsc::UnboundedSender<(String, Value)>) {
    let (read, mut write) = tokio::io::split(stream);
    let mut lines = BufReader::new(read).lines();

    while let Ok(Some(line)) = lines.next_line().await {
        let frame: Value = serde_json::from_str(&line).unwrap();
        let id = frame["id"].clone();
        let method = frame["method"].as_str().unwrap().to_string();
        let params = frame["params"].clone();
        let _ = requests.send((method.clone(), params.clone()));

        let reply = if params[0] == json!("broken") {
            json!({
                "jsonrpc": "2.0",
                "id": id,
                "error": { "code": error_codes::ENGINE_ERROR, "message": "xterm threw" }
            })
        } else {
            let result = match method.as_str() {
                "termbridge.getRows" => json!(24),
                "termbridge.getCols" => json!(80),
                _ => Value::Null,
            };
            json!({ "jsonrpc": "2.0", "id": id, "result": result })
        };
        let mut out = serde_json::to_vec(&reply).unwrap();
        out.push(b'\n');
        if write.write_all(&out).await.is_err() {
            return;
        }

        if method == "termbridge.registerTerminal" && params[0] != json!("broken") {
            let event = json!({
                "jsonrpc": "2.0",
                "method": "termbridge.event",
                "params": { "terminalId": params[0], "event": "titleChange", "payload": "vim" }
            });
            let mut out = serde_json::to_vec(&event).unwrap();
            out.push(b'\n');
            let _ = write.write_all(&out).await;
        }
    }
}

struct Session {
    bridge: TerminalBridge,
    requests: mpsc::UnboundedReceiver<(String, Value)>,
    peer: tokio::task::JoinHandle<()>,
}

fn session() -> Session {
    let (ours, theirs) = tokio::io::duplex(64 * 1024);
    let (tx, requests) = mpsc::unbounded_channel();
    let peer = tokio::spawn(run_peer(theirs, tx));

    let config = test_config();
    let (read, write) = tokio::io::split(ours);
    let (engine, events) = StreamEngine::connect(read, write, &config);
    let bridge = TerminalBridge::new(engine, config);
    bridge.spawn_event_pump(events);
    Session {
        bridge,
        requests,
        peer,
    }
}

#[tokio::test]
async fn test_commands_travel_as_positional_rpc() {
    let mut session = session();
    let host = HostElement::with_id("xterm-host");
    let terminal = session
        .bridge
        .create(None, TerminalOptions::new().with_size(80, 24), &host)
        .await
        .unwrap();

    assert_eq!(terminal.get_rows().await.unwrap(), 24);
    assert_eq!(terminal.get_columns().await.unwrap(), 80);
    terminal.scroll_lines(-3).await.unwrap();
    terminal.dispose().await.unwrap();

    let mut seen = Vec::new();
    while let Ok(request) = session.requests.try_recv() {
        seen.push(request);
    }
    assert_eq!(
        seen[0],
        (
            "termbridge.registerTerminal".to_string(),
            json!(["xterm-host", { "elementId": "xterm-host" }, { "cols": 80, "rows": 24 }])
        )
    );
    assert_eq!(seen[1].0, "termbridge.getRows");
    assert_eq!(seen[3], ("termbridge.scrollLines".to_string(), json!(["xterm-host", -3])));
    assert_eq!(
        seen[4],
        ("termbridge.disposeTerminal".to_string(), json!(["xterm-host"]))
    );
}

#[tokio::test]
async fn test_notification_reaches_listener_after_first_render() {
    let session = session();
    let order = Journal::default();
    let (first, title) = (order.clone(), order.clone());
    let (done_tx, mut done_rx) = mpsc::unbounded_channel();

    session
        .bridge
        .builder(&HostElement::new())
        .id("shell")
        .events(
            TerminalEvents::new()
                .on_first_render(move || first.push("first-render"))
                .on_title_change(move |t| {
                    title.push(format!("title:{t}"));
                    let _ = done_tx.send(());
                }),
        )
        .create()
        .await
        .unwrap();

    tokio::time::timeout(Duration::from_secs(2), done_rx.recv())
        .await
        .expect("title change delivered")
        .unwrap();
    assert_eq!(order.entries(), vec!["first-render", "title:vim"]);
}

#[tokio::test]
async fn test_engine_error_rolls_back_creation() {
    let session = session();
    let err = session
        .bridge
        .create(Some("broken"), TerminalOptions::default(), &HostElement::new())
        .await
        .unwrap_err();

    assert!(
        matches!(err, BridgeError::Engine(EngineError::Rpc { code, ref message }) if code == error_codes::ENGINE_ERROR && message == "xterm threw")
    );
    assert!(session.bridge.is_empty());
}

#[tokio::test]
async fn test_lost_engine_fails_calls() {
    let session = session();
    let terminal = session
        .bridge
        .create(Some("shell"), TerminalOptions::default(), &HostElement::new())
        .await
        .unwrap();

    session.peer.abort();
    let _ = session.peer.await;

    let err = terminal.focus().await.unwrap_err();
    assert!(matches!(
        err,
        BridgeError::Engine(EngineError::Disconnected | EngineError::Io(_))
    ));
    assert_eq!(err.code(), error_codes::ENGINE_DISCONNECTED);
    assert!(err.is_retryable());
}
