#![allow(dead_code)]

use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

use serde_json::{json, Value};

/// Drives the sidecar binary over its stdin/stdout line protocol.
/// Notification lines (an `event` key, no `id`) are collected as they
/// arrive so tests can assert on broadcasts.
pub struct Sidecar {
    child: Child,
    stdin: ChildStdin,
    reader: BufReader<ChildStdout>,
    pub notifications: Vec<Value>,
    next_id: u32,
}

impl Sidecar {
    pub fn start(workspace: &std::path::Path) -> Sidecar {
        let mut child = Command::new(env!("CARGO_BIN_EXE_schoold"))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .expect("spawn sidecar");
        let stdin = child.stdin.take().expect("stdin");
        let stdout = child.stdout.take().expect("stdout");
        let mut sidecar = Sidecar {
            child,
            stdin,
            reader: BufReader::new(stdout),
            notifications: Vec::new(),
            next_id: 0,
        };
        let resp = sidecar.call(
            "workspace.select",
            json!({ "path": workspace.to_string_lossy() }),
        );
        assert_eq!(resp["ok"], json!(true), "workspace.select failed: {resp}");
        sidecar
    }

    /// Sends one request and reads lines until its response comes back,
    /// stashing any notification lines seen on the way.
    pub fn call(&mut self, method: &str, params: Value) -> Value {
        self.next_id += 1;
        let id = format!("r{}", self.next_id);
        let req = json!({ "id": id, "method": method, "params": params });
        writeln!(self.stdin, "{}", req).expect("write request");
        self.stdin.flush().expect("flush request");

        loop {
            let mut line = String::new();
            let n = self.reader.read_line(&mut line).expect("read response");
            assert!(n > 0, "sidecar closed stdout while waiting for {method}");
            let msg: Value = serde_json::from_str(line.trim()).expect("response json");
            if msg.get("event").is_some() {
                self.notifications.push(msg);
                continue;
            }
            assert_eq!(msg["id"], json!(id), "out-of-order response: {msg}");
            return msg;
        }
    }

    /// Calls and asserts success, returning just the result payload.
    pub fn ok(&mut self, method: &str, params: Value) -> Value {
        let resp = self.call(method, params);
        assert_eq!(resp["ok"], json!(true), "{method} failed: {resp}");
        resp["result"].clone()
    }

    /// Calls and asserts failure, returning the error code.
    pub fn expect_err(&mut self, method: &str, params: Value) -> String {
        let resp = self.call(method, params);
        assert_eq!(resp["ok"], json!(false), "{method} unexpectedly ok: {resp}");
        resp["error"]["code"]
            .as_str()
            .expect("error code")
            .to_string()
    }

    pub fn notifications_for(&self, event: &str) -> Vec<&Value> {
        self.notifications
            .iter()
            .filter(|n| n["event"] == json!(event))
            .collect()
    }
}

impl Drop for Sidecar {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}
