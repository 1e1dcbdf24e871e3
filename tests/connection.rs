//! End-to-end tests against a scripted renderer on a real WebSocket.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

use cef_probe::{Connection, DirectorySink, Domain, Error, ResourceFetcher, ScriptCatalog};

// ============================================================================
// Scripted Renderer
// ============================================================================

/// Frames the renderer sends in answer to `request`.
///
/// Like Chromium, a request whose `id` is not a 32-bit signed integer gets an
/// error reply without an `id`.
fn respond(request: &Value) -> Vec<String> {
    let id = &request["id"];
    if id.as_i64().and_then(|n| i32::try_from(n).ok()).is_none() {
        return vec![
            json!({ "error": { "code": -32600, "message": "Message must have integer 'id' property" } })
                .to_string(),
        ];
    }
    let ack = json!({ "id": id, "result": {} }).to_string();

    match request["method"].as_str().unwrap_or_default() {
        "Debugger.enable" => vec![
            json!({ "method": "Debugger.scriptParsed", "params": { "scriptId": "11", "url": "https://app.local/js/main.js" } }).to_string(),
            json!({ "method": "Debugger.scriptParsed", "params": { "scriptId": "12", "url": "" } }).to_string(),
            json!({ "method": "Debugger.scriptParsed", "params": { "scriptId": "13", "url": "webpack:///src/App.tsx" } }).to_string(),
            ack,
        ],
        "Debugger.getScriptSource" => {
            let source = match request["params"]["scriptId"].as_str() {
                Some("11") => "console.log('main')",
                Some("13") => "export const App = 1;",
                _ => "",
            };
            vec![
                json!({ "method": "Console.messageAdded", "params": { "message": { "text": "noise" } } }).to_string(),
                json!({ "id": id, "result": { "scriptSource": source } }).to_string(),
            ]
        }
        "Runtime.evaluate" => vec![],
        _ => vec![ack],
    }
}

/// Serves one client and returns its control address.
async fn spawn_renderer() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.expect("accept");
        let mut socket = accept_async(stream).await.expect("handshake");

        while let Some(Ok(message)) = socket.next().await {
            let Message::Text(text) = message else {
                continue;
            };
            let request: Value = serde_json::from_str(text.as_str()).expect("request json");
            for frame in respond(&request) {
                if socket.send(Message::Text(frame.into())).await.is_err() {
                    return;
                }
            }
        }
    });

    format!("ws://{addr}/devtools/page/TEST")
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_dump_scripts_end_to_end() {
    let address = spawn_renderer().await;
    let mut connection = Connection::connect(&address).await.expect("connect");

    let catalog = ScriptCatalog::collect(
        &mut connection,
        Duration::from_millis(300),
        Duration::from_millis(50),
    )
    .await
    .expect("collect");
    assert_eq!(catalog.len(), 2);

    let dir = tempfile::tempdir().expect("tempdir");
    let mut sink = DirectorySink::new(dir.path());
    let report = ResourceFetcher::new(Duration::from_secs(2))
        .fetch_all(&mut connection, &catalog, &mut sink)
        .await;

    assert!(report.is_complete());
    assert_eq!(report.saved, 2);

    let main = std::fs::read_to_string(dir.path().join("https/app.local/js/main.js")).expect("main");
    assert_eq!(main, "console.log('main')");

    let app = std::fs::read_to_string(dir.path().join("webpack/src/App.tsx")).expect("app");
    assert_eq!(app, "export const App = 1;");

    connection.close().await;
    connection.close().await;
    assert!(connection.is_closed());
}

#[tokio::test]
async fn test_timeout_leaves_connection_usable() {
    let address = spawn_renderer().await;
    let mut connection = Connection::connect(&address).await.expect("connect");

    let err = connection
        .send_and_await(
            cef_probe::Command::Runtime(cef_probe::protocol::RuntimeCommand::Evaluate {
                expression: "1".to_string(),
                return_by_value: None,
                user_gesture: None,
                await_promise: None,
            }),
            Duration::from_millis(100),
        )
        .await
        .expect_err("silent renderer");
    assert!(err.is_timeout());

    connection.enable(Domain::Page).await.expect("still usable");
    connection.close().await;
}

#[tokio::test]
async fn test_reserved_ids_on_the_wire() {
    let address = spawn_renderer().await;
    let mut connection = Connection::connect(&address).await.expect("connect");

    let source = ResourceFetcher::new(Duration::from_secs(2))
        .fetch(&mut connection, &"11".into())
        .await
        .expect("source");
    assert_eq!(source, "console.log('main')");
    assert_eq!(connection.queued_events(), 1);

    connection.close().await;
}

#[tokio::test]
async fn test_large_numeric_script_id_is_fetched() {
    let address = spawn_renderer().await;
    let mut connection = Connection::connect(&address).await.expect("connect");

    let source = ResourceFetcher::new(Duration::from_secs(2))
        .fetch(&mut connection, &"9999999999".into())
        .await
        .expect("counter id fallback");
    assert_eq!(source, "");

    connection.close().await;
}

#[tokio::test]
async fn test_connect_to_closed_port_fails() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().expect("addr").port();
    drop(listener);

    let err = Connection::connect(&format!("ws://127.0.0.1:{port}/devtools/page/X"))
        .await
        .err()
        .expect("refused");
    assert!(matches!(err, Error::Connection { .. }));
    assert!(err.is_connection_error());
}
