#![allow(dead_code)]

use async_trait::async_trait;
use deskpilot_core::model::{CompletionRequest, CompletionResponse, ModelClient, ModelError};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

/// Minimal MCP server over stdio. Request ids are taken from each line;
/// `NS:Hang` is never answered.
pub const FAKE_SERVER: &str = r#"#!/bin/sh
reply_id() {
    printf '%s' "$1" | sed -n 's/.*"id":"\(req-[0-9]*\)".*/\1/p'
}

while IFS= read -r line; do
    id=$(reply_id "$line")
    case "$line" in
        *'"method":"initialize"'*)
            printf '{"jsonrpc":"2.0","id":"%s","result":{"protocolVersion":"2025-06-18","capabilities":{"tools":{}},"serverInfo":{"name":"fake","version":"0.1"},"instructions":"Take a snapshot before clicking."}}\n' "$id"
            ;;
        *'"method":"tools/list"'*)
            printf '{"jsonrpc":"2.0","id":"%s","result":{"tools":[{"name":"NS:Click","description":"Click at a position","inputSchema":{"type":"object","properties":{"loc":{"type":"array"}}}},{"name":"NS:Type"},{"name":"NS:Hang"}]}}\n' "$id"
            ;;
        *'NS:Hang'*)
            ;;
        *'NS:Type'*)
            printf '{"jsonrpc":"2.0","id":"%s","result":{"isError":true,"content":[{"type":"text","text":"Access denied: window is elevated"}]}}\n' "$id"
            ;;
        *'"method":"tools/call"'*)
            printf '{"jsonrpc":"2.0","id":"%s","result":{"content":[{"type":"text","text":"clicked"}]}}\n' "$id"
            ;;
    esac
done
"#;

/// Writes the fake server into `dir` and marks it executable.
pub fn install_fake_server(dir: &Path) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join("fake-mcp.sh");
    std::fs::write(&path, FAKE_SERVER).expect("write fake server");
    let mut permissions = std::fs::metadata(&path).expect("metadata").permissions();
    permissions.set_mode(0o755);
    std::fs::set_permissions(&path, permissions).expect("chmod fake server");
    path
}

/// Model that replays a fixed list of responses and records each request.
pub struct ScriptedModel {
    responses: Mutex<VecDeque<CompletionResponse>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedModel {
    pub fn new(responses: Vec<CompletionResponse>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub async fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().await.clone()
    }
}

#[async_trait]
impl ModelClient for ScriptedModel {
    fn id(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, ModelError> {
        self.requests.lock().await.push(request);
        self.responses
            .lock()
            .await
            .pop_front()
            .ok_or_else(|| ModelError::invalid_response("scripted", "script exhausted"))
    }
}
