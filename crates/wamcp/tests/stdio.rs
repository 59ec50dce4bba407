// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end tests driving the `wamcp` binary over stdin/stdout.

use std::io::Write;
use std::process::{Command, Stdio};

use serde_json::{json, Value};

/// Run the server with `lines` on stdin, returning stdout parsed per line.
fn session(lines: &[Value], extra_args: &[&str]) -> anyhow::Result<Vec<Value>> {
    let state = tempfile::tempdir()?;
    let mut child = Command::new(env!("CARGO_BIN_EXE_wamcp"))
        .args(extra_args)
        .env_clear()
        .env("PATH", std::env::var("PATH").unwrap_or_default())
        .env("WAMCP_STATE_DIR", state.path())
        .env("WAMCP_LOG_LEVEL", "warn")
        .current_dir(state.path())
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;

    {
        let mut stdin = child.stdin.take().ok_or_else(|| anyhow::anyhow!("no stdin"))?;
        for line in lines {
            writeln!(stdin, "{line}")?;
        }
    }

    let output = child.wait_with_output()?;
    anyhow::ensure!(output.status.success(), "exit {:?}: {}", output.status, String::from_utf8_lossy(&output.stderr));
    String::from_utf8(output.stdout)?
        .lines()
        .map(|l| serde_json::from_str(l).map_err(anyhow::Error::from))
        .collect()
}

#[test]
fn handshake_list_and_call_without_token() -> anyhow::Result<()> {
    let responses = session(
        &[
            json!({ "jsonrpc": "2.0", "id": 1, "method": "initialize", "params": { "protocolVersion": "2024-11-05" } }),
            json!({ "jsonrpc": "2.0", "method": "notifications/initialized" }),
            json!({ "jsonrpc": "2.0", "id": 2, "method": "tools/list" }),
            json!({
                "jsonrpc": "2.0",
                "id": 3,
                "method": "tools/call",
                "params": { "name": "WHATSAPP_SEND_MESSAGE", "arguments": { "to_number": "15551234567", "text": "hi" } },
            }),
        ],
        &[],
    )?;
    assert_eq!(responses.len(), 3);

    assert_eq!(responses[0]["id"], 1);
    assert_eq!(responses[0]["result"]["serverInfo"]["name"], "whatsapp-mcp-server");

    let tools = responses[1]["result"]["tools"].as_array().cloned().unwrap_or_default();
    assert_eq!(tools.len(), 19);
    assert!(tools.iter().any(|t| t["name"] == "WHATSAPP_UPLOAD_MEDIA"));

    assert_eq!(responses[2]["id"], 3);
    assert_eq!(responses[2]["result"]["isError"], true);
    let text = responses[2]["result"]["content"][0]["text"].as_str().unwrap_or_default();
    let envelope: Value = serde_json::from_str(text)?;
    assert_eq!(envelope["successful"], false);
    assert!(envelope["error"].as_str().unwrap_or_default().contains("wamcp auth login"));
    Ok(())
}

#[test]
fn serve_subcommand_answers_ping() -> anyhow::Result<()> {
    let responses = session(&[json!({ "jsonrpc": "2.0", "id": "p", "method": "ping" })], &["serve"])?;
    assert_eq!(responses, vec![json!({ "jsonrpc": "2.0", "id": "p", "result": {} })]);
    Ok(())
}

#[test]
fn auth_set_token_then_status() -> anyhow::Result<()> {
    let state = tempfile::tempdir()?;
    let cache = state.path().join("cache.json");
    let run = |args: &[&str]| -> anyhow::Result<i32> {
        let status = Command::new(env!("CARGO_BIN_EXE_wamcp"))
            .args(args)
            .env_clear()
            .env("WHATSAPP_TOKEN_CACHE", &cache)
            .current_dir(state.path())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()?;
        status.code().ok_or_else(|| anyhow::anyhow!("killed by signal"))
    };

    assert_eq!(run(&["auth", "status"])?, 1);
    assert_eq!(run(&["auth", "set-token", "EAAG123"])?, 0);
    assert!(cache.exists());
    assert_eq!(run(&["auth", "status"])?, 0);
    assert_eq!(run(&["auth", "logout"])?, 0);
    assert!(!cache.exists());
    Ok(())
}
