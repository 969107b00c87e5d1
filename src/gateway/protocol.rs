use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;

use super::server::AppState;
use crate::facts::Utterance;

#[derive(Deserialize)]
struct RpcRequest {
    id: String,
    method: String,
    #[serde(default)]
    params: serde_json::Value,
}

#[derive(Serialize)]
struct RpcResponse {
    id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl RpcResponse {
    fn ok(id: String, result: serde_json::Value) -> String {
        Self::encode(Self {
            id,
            result: Some(result),
            error: None,
        })
    }

    fn err(id: String, error: String) -> String {
        Self::encode(Self {
            id,
            result: None,
            error: Some(error),
        })
    }

    fn encode(self) -> String {
        serde_json::to_string(&self).unwrap_or_default()
    }
}

/// Handle an incoming JSON-RPC-style frame and return the response frame.
pub async fn handle_rpc(msg: &str, state: &Arc<AppState>) -> String {
    let req: RpcRequest = match serde_json::from_str(msg) {
        Ok(r) => r,
        Err(e) => {
            warn!("malformed rpc: {e}");
            return RpcResponse::err("0".into(), format!("parse error: {e}"));
        }
    };

    match req.method.as_str() {
        "ping" => RpcResponse::ok(req.id, serde_json::json!("pong")),

        "status" => RpcResponse::ok(
            req.id,
            serde_json::json!({
                "version": env!("CARGO_PKG_VERSION"),
                "nickname": state.engine.classifier().nickname(),
                "require_nickname": state.engine.classifier().require_nickname(),
                "facts_backend": state.config.store.backend.as_str(),
            }),
        ),

        "chat.send" => {
            let utterance: Utterance = match serde_json::from_value(req.params) {
                Ok(u) => u,
                Err(e) => {
                    return RpcResponse::err(req.id, format!("invalid chat.send params: {e}"));
                }
            };

            match state.engine.handle(&utterance).await {
                Ok(reply) => RpcResponse::ok(req.id, serde_json::json!({ "reply": reply })),
                Err(e) => {
                    warn!(nick = %utterance.nick, "fact store error: {e}");
                    RpcResponse::err(req.id, format!("store error: {e}"))
                }
            }
        }

        _ => RpcResponse::err(req.id, format!("unknown method: {}", req.method)),
    }
}
