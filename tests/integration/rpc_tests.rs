//! JSON-RPC and HTTP form transports against the real command registry.

use std::sync::{Arc, Mutex};

use consolefw::adapters::config_store::ConfigStore;
use consolefw::adapters::nvs::NvsAdapter;
use consolefw::app::ports::KeyValueConfig;
use consolefw::config::ConsoleConfig;
use consolefw::console::commands::register_builtins;
use consolefw::console::history::History;
use consolefw::console::{CommandExecutor, CommandRegistry};
use consolefw::rpc::form::handle_form;
use consolefw::rpc::jsonrpc::handle_rpc;
use serde_json::{Value, json};

struct Device {
    executor: CommandExecutor<CommandRegistry>,
    config: Arc<Mutex<ConfigStore>>,
}

fn device() -> Device {
    let cfg = ConsoleConfig::default();
    let config = Arc::new(Mutex::new(ConfigStore::new()));
    let storage = Arc::new(Mutex::new(NvsAdapter::new().unwrap()));
    let history = Arc::new(History::new(cfg.history_len as usize));
    let mut registry = CommandRegistry::from_config(&cfg);
    register_builtins(&mut registry, &config, &storage, &history).unwrap();
    Device {
        executor: CommandExecutor::new(registry, history, &cfg),
        config,
    }
}

fn rpc(dev: &Device, req: &str) -> Option<Value> {
    handle_rpc(req.as_bytes(), &dev.executor).map(|text| serde_json::from_str(&text).unwrap())
}

#[test]
fn notification_runs_but_is_silent() {
    let dev = device();
    assert_eq!(rpc(&dev, r#"{"method":"version"}"#), None);
    assert_eq!(dev.executor.history().entries(), ["version"]);
}

#[test]
fn request_with_id_gets_captured_text() {
    let dev = device();
    let resp = rpc(&dev, r#"{"method":"version","id":1}"#).unwrap();
    assert_eq!(
        resp,
        json!({"jsonrpc":"2.0","id":1,"result":format!("consolefw {}", env!("CARGO_PKG_VERSION"))})
    );
}

#[test]
fn params_become_arguments() {
    let dev = device();
    let resp = rpc(&dev, r#"{"method":"echo","params":["a","b"],"id":"x"}"#).unwrap();
    assert_eq!(resp["result"], "a b");
    assert_eq!(resp["id"], "x");
}

#[test]
fn params_with_spaces_reach_set_as_one_value() {
    let dev = device();
    let resp = rpc(
        &dev,
        r#"{"method":"set","params":["net.ap.ssid","Shop Floor"],"id":2}"#,
    )
    .unwrap();
    assert!(resp["result"].as_str().unwrap().ends_with("done"));
    assert_eq!(
        dev.config.lock().unwrap().get("net.ap.ssid"),
        Some("Shop Floor")
    );
}

#[test]
fn command_failures_are_results_not_errors() {
    let dev = device();
    let resp = rpc(&dev, r#"{"method":"nosuch","id":3}"#).unwrap();
    assert_eq!(resp["result"], "Unrecognized command");
    assert!(resp.get("error").is_none());

    let resp = rpc(&dev, r#"{"method":"get","params":["bad.key"],"id":4}"#).unwrap();
    assert_eq!(resp["result"], "Unknown key `bad.key`");
}

#[test]
fn silent_success_is_empty_string() {
    let dev = device();
    // Bare `echo` prints only a newline.
    let resp = rpc(&dev, r#"{"method":"echo","id":5}"#).unwrap();
    assert_eq!(resp["result"], "");
}

#[test]
fn protocol_errors_use_null_id() {
    let dev = device();
    let resp = rpc(&dev, "{nope").unwrap();
    assert_eq!(
        resp,
        json!({"jsonrpc":"2.0","id":null,"error":{"code":-32700,"message":"Parse Error"}})
    );

    let resp = rpc(&dev, r#"{"params":[],"id":9}"#).unwrap();
    assert_eq!(resp["error"]["code"], -32600);
    assert_eq!(resp["id"], Value::Null);

    let resp = rpc(&dev, r#"{"method":"echo","params":{"a":1},"id":9}"#).unwrap();
    assert_eq!(resp["error"]["code"], -32600);
    assert!(dev.executor.history().is_empty());
}

#[test]
fn form_and_rpc_share_one_executor() {
    let dev = device();
    let reply = handle_form("exec=set+app.dns.host+printer", &dev.executor);
    assert_eq!(reply.status, 200);
    assert_eq!(reply.content_type, "text/plain");

    let resp = rpc(&dev, r#"{"method":"get","params":["app.dns.host"],"id":1}"#).unwrap();
    assert_eq!(resp["result"], "printer");
    assert_eq!(
        dev.executor.history().entries(),
        ["set app.dns.host printer", "get app.dns.host"]
    );
}

#[test]
fn form_without_exec_is_bad_request() {
    let dev = device();
    let reply = handle_form("gcode=G28", &dev.executor);
    assert_eq!(reply.status, 400);
    assert_eq!(reply.body, "Invalid parameter");
    assert_eq!(handle_form("exec=%zz", &dev.executor).status, 400);
}
