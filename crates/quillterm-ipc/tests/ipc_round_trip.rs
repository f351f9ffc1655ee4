#![cfg(unix)]

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::json;
use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;

use quillterm_core::{Config, ControlState};
use quillterm_ipc::{IpcClient, IpcServer, RpcDispatcher, RpcHandler};

fn start_server(dir: &TempDir) -> (IpcServer, std::path::PathBuf) {
    let socket = dir.path().join("control.sock");
    let state = Arc::new(ControlState::new(&Config::default()));
    let dispatcher = Arc::new(RpcDispatcher::new(state));
    let handler: RpcHandler = Arc::new(move |request| dispatcher.handle(request));
    let server = IpcServer::start(&socket, handler).expect("server should start");
    // Give the listener thread a moment to bind.
    let deadline = Instant::now() + Duration::from_secs(5);
    while !socket.exists() {
        assert!(Instant::now() < deadline, "socket never appeared");
        std::thread::sleep(Duration::from_millis(10));
    }
    (server, socket)
}

#[tokio::test(flavor = "current_thread")]
async fn background_lifecycle_over_the_socket() {
    let dir = TempDir::new().unwrap();
    let (_server, socket) = start_server(&dir);
    let client = IpcClient::new(&socket).with_timeout(Duration::from_secs(10));

    let started = client
        .call("background.start", json!({ "command": "echo over-ipc" }))
        .await
        .unwrap();
    let id = started["id"].as_u64().unwrap();

    let deadline = Instant::now() + Duration::from_secs(10);
    loop {
        let status = client
            .call("background.status", json!({ "id": id }))
            .await
            .unwrap();
        if status["state"] == "completed" {
            assert_eq!(status["exit_code"], 0);
            break;
        }
        assert!(Instant::now() < deadline, "process never completed");
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    let output = client
        .call("background.output", json!({ "id": id }))
        .await
        .unwrap();
    assert_eq!(output["lines"], json!(["over-ipc"]));

    let cleared = client.call("background.clear", json!({})).await.unwrap();
    assert_eq!(cleared["cleared"], 1);
}

#[tokio::test(flavor = "current_thread")]
async fn rpc_errors_come_back_as_error_responses() {
    let dir = TempDir::new().unwrap();
    let (_server, socket) = start_server(&dir);
    let client = IpcClient::new(&socket).with_timeout(Duration::from_secs(10));

    let err = client
        .call("background.status", json!({ "id": 424242 }))
        .await
        .expect_err("unknown id should error");
    assert!(err.to_string().contains("not_found"));

    let err = client
        .call("no.such.method", json!({}))
        .await
        .expect_err("unknown method should error");
    assert!(err.to_string().contains("method_not_found"));
}

#[tokio::test(flavor = "current_thread")]
async fn malformed_frames_keep_the_connection_alive() {
    let dir = TempDir::new().unwrap();
    let (_server, socket) = start_server(&dir);

    let stream = UnixStream::connect(&socket).await.unwrap();
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);

    // Not JSON at all: protocol error with empty id.
    write_half.write_all(b"this is not json\n").await.unwrap();
    let mut line = String::new();
    reader.read_line(&mut line).await.unwrap();
    let response: serde_json::Value = serde_json::from_str(line.trim()).unwrap();
    assert_eq!(response["error"]["code"], "protocol_error");
    assert_eq!(response["id"], "");

    // A JSON object missing `method`: id is salvaged for correlation.
    line.clear();
    write_half
        .write_all(b"{\"id\":\"abc\",\"params\":{}}\n")
        .await
        .unwrap();
    reader.read_line(&mut line).await.unwrap();
    let response: serde_json::Value = serde_json::from_str(line.trim()).unwrap();
    assert_eq!(response["error"]["code"], "protocol_error");
    assert_eq!(response["id"], "abc");

    // The same connection still serves well-formed requests.
    line.clear();
    write_half
        .write_all(b"{\"id\":\"ok-1\",\"method\":\"background.list\",\"params\":{}}\n")
        .await
        .unwrap();
    reader.read_line(&mut line).await.unwrap();
    let response: serde_json::Value = serde_json::from_str(line.trim()).unwrap();
    assert_eq!(response["id"], "ok-1");
    assert_eq!(response["result"]["processes"], json!([]));
}

#[tokio::test(flavor = "current_thread")]
async fn multiple_requests_on_one_connection_echo_ids() {
    let dir = TempDir::new().unwrap();
    let (_server, socket) = start_server(&dir);

    let stream = UnixStream::connect(&socket).await.unwrap();
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);

    for n in 0..5 {
        let frame = format!(
            "{{\"id\":\"req-{n}\",\"method\":\"system.get_status\",\"params\":{{}}}}\n"
        );
        write_half.write_all(frame.as_bytes()).await.unwrap();
        let mut line = String::new();
        reader.read_line(&mut line).await.unwrap();
        let response: serde_json::Value = serde_json::from_str(line.trim()).unwrap();
        assert_eq!(response["id"], format!("req-{n}"));
        assert!(response["result"]["message"].is_string());
    }
}
