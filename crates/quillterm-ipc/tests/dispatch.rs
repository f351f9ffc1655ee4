#![cfg(unix)]

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::{json, Value};

use quillterm_core::{Config, ControlState};
use quillterm_ipc::{ApiRequest, RpcDispatcher};

fn dispatcher() -> RpcDispatcher {
    RpcDispatcher::new(Arc::new(ControlState::new(&Config::default())))
}

fn request(method: &str, params: Value) -> ApiRequest {
    ApiRequest {
        id: "t1".to_string(),
        method: method.to_string(),
        params,
    }
}

fn call(dispatcher: &RpcDispatcher, method: &str, params: Value) -> Value {
    let response = dispatcher.handle(request(method, params));
    assert_eq!(response.id, "t1");
    assert!(
        response.error.is_none(),
        "unexpected error: {:?}",
        response.error
    );
    response.result.expect("result must be present")
}

fn call_err(dispatcher: &RpcDispatcher, method: &str, params: Value) -> String {
    let response = dispatcher.handle(request(method, params));
    assert_eq!(response.id, "t1");
    assert!(response.result.is_none());
    response.error.expect("error must be present").code
}

fn wait_for_state(dispatcher: &RpcDispatcher, id: u64, expected: &str) -> Value {
    let deadline = Instant::now() + Duration::from_secs(10);
    loop {
        let status = call(dispatcher, "background.status", json!({ "id": id }));
        if status["state"] == expected {
            return status;
        }
        assert!(
            Instant::now() < deadline,
            "process {id} never reached {expected}, last: {status}"
        );
        std::thread::sleep(Duration::from_millis(20));
    }
}

#[test]
fn unknown_method_is_reported() {
    let d = dispatcher();
    assert_eq!(
        call_err(&d, "background.destroy_all", json!({})),
        "method_not_found"
    );
}

#[test]
fn missing_required_params_are_invalid() {
    let d = dispatcher();
    assert_eq!(call_err(&d, "background.status", json!({})), "invalid_params");
    assert_eq!(call_err(&d, "background.start", json!({})), "invalid_params");
    assert_eq!(
        call_err(&d, "background.kill", json!({ "id": "nine" })),
        "invalid_params"
    );
}

#[test]
fn unknown_process_ids_are_not_found() {
    let d = dispatcher();
    for method in ["background.status", "background.output", "background.kill"] {
        assert_eq!(call_err(&d, method, json!({ "id": 12345 })), "not_found");
    }
}

#[test]
fn echo_scenario_start_status_output_clear() {
    let d = dispatcher();

    let empty = call(&d, "background.list", json!({}));
    assert_eq!(empty["processes"], json!([]));

    let started = call(&d, "background.start", json!({ "command": "echo hi" }));
    let id = started["id"].as_u64().expect("id must be numeric");

    let status = wait_for_state(&d, id, "completed");
    assert_eq!(status["exit_code"], 0);
    assert_eq!(status["command"], "echo hi");

    let output = call(&d, "background.output", json!({ "id": id }));
    assert_eq!(output["lines"], json!(["hi"]));
    // Repeated reads are stable.
    assert_eq!(
        call(&d, "background.output", json!({ "id": id }))["lines"],
        json!(["hi"])
    );

    let cleared = call(&d, "background.clear", json!({}));
    assert_eq!(cleared["cleared"], 1);
    let listed = call(&d, "background.list", json!({}));
    assert_eq!(listed["processes"], json!([]));
}

#[test]
fn kill_scenario_is_idempotent() {
    let d = dispatcher();
    let started = call(&d, "background.start", json!({ "command": "sleep 30" }));
    let id = started["id"].as_u64().unwrap();

    let status = call(&d, "background.status", json!({ "id": id }));
    assert_eq!(status["state"], "running");

    let killed = call(&d, "background.kill", json!({ "id": id }));
    assert_eq!(killed["success"], true);
    let again = call(&d, "background.kill", json!({ "id": id }));
    assert_eq!(again["success"], true);

    let status = call(&d, "background.status", json!({ "id": id }));
    assert_eq!(status["state"], "killed");

    let cleared = call(&d, "background.clear", json!({}));
    assert_eq!(cleared["cleared"], 1);
}

#[test]
fn empty_command_is_a_spawn_error() {
    let d = dispatcher();
    assert_eq!(
        call_err(&d, "background.start", json!({ "command": "  " })),
        "spawn_error"
    );
}

#[test]
fn clear_spares_running_entries() {
    let d = dispatcher();
    let done = call(&d, "background.start", json!({ "command": "true" }))["id"]
        .as_u64()
        .unwrap();
    let running = call(&d, "background.start", json!({ "command": "sleep 30" }))["id"]
        .as_u64()
        .unwrap();
    wait_for_state(&d, done, "completed");

    let cleared = call(&d, "background.clear", json!({}));
    assert_eq!(cleared["cleared"], 1);

    let listed = call(&d, "background.list", json!({}));
    let processes = listed["processes"].as_array().unwrap();
    assert_eq!(processes.len(), 1);
    assert_eq!(processes[0]["id"], running);
    assert_eq!(listed["running_count"], 1);

    call(&d, "background.kill", json!({ "id": running }));
}

#[test]
fn companion_surface_round_trips() {
    let d = dispatcher();

    call(&d, "terminal.send_keys", json!({ "keys": "ls\n" }));
    let size = call(&d, "terminal.get_size", json!({}));
    assert_eq!(size["cols"], 80);
    assert_eq!(size["rows"], 24);

    let buffer = call(&d, "terminal.read_buffer", json!({}));
    assert_eq!(buffer["lines"], json!([]));

    let layout = call(&d, "layout.get_state", json!({}));
    assert_eq!(layout["focused"], "terminal");

    let tabs = call(&d, "tabs.list", json!({}));
    assert_eq!(tabs["tabs"][0]["active"], true);

    call(&d, "system.set_status", json!({ "message": "busy" }));
    let status = call(&d, "system.get_status", json!({}));
    assert_eq!(status["message"], "busy");

    let version = call(&d, "system.get_version", json!({}));
    assert!(version["version"].is_string());

    let theme = call(&d, "theme.get", json!({}));
    assert_eq!(theme["name"], "default-dark");
    let set = call(&d, "theme.set", json!({ "name": "snazzy" }));
    assert_eq!(set["success"], true);
    let themes = call(&d, "theme.list", json!({}));
    assert_eq!(themes["current"], "snazzy");
    assert_eq!(
        call_err(&d, "theme.set", json!({ "name": "bogus" })),
        "invalid_params"
    );
}

#[test]
fn status_is_side_effect_free() {
    let d = dispatcher();
    let id = call(&d, "background.start", json!({ "command": "true" }))["id"]
        .as_u64()
        .unwrap();
    // Repeated status polling must not change anything; the watcher alone
    // performs the transition, which status eventually observes.
    wait_for_state(&d, id, "completed");
    let first = call(&d, "background.status", json!({ "id": id }));
    let second = call(&d, "background.status", json!({ "id": id }));
    assert_eq!(first, second);
}
