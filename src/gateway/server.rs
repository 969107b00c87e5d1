use axum::{
    Json, Router,
    extract::State,
    extract::ws::{Message, WebSocket, WebSocketUpgrade},
    http::{HeaderMap, StatusCode, header},
    response::IntoResponse,
    routing::{get, post},
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use super::auth;
use crate::config::FactbotConfig;
use crate::facts::{FactEngine, Utterance};

pub struct AppState {
    pub token: Option<String>,
    pub engine: Arc<FactEngine>,
    pub config: FactbotConfig,
}

#[derive(Serialize)]
struct MessageReply {
    reply: Option<String>,
}

pub async fn run(config: FactbotConfig, token: Option<String>) -> anyhow::Result<()> {
    let is_loopback = config.gateway.bind == "127.0.0.1" || config.gateway.bind == "::1";

    if !is_loopback && token.is_none() {
        anyhow::bail!(
            "Auth token required when binding to non-loopback address. \
             Set --token or FACTBOT_TOKEN env var."
        );
    }

    let engine = crate::facts::engine::from_config(&config).await?;
    info!(
        backend = config.store.backend.as_str(),
        nickname = %config.gateway.nickname,
        require_nickname = config.facts.require_nickname,
        "fact engine ready"
    );

    let addr = format!("{}:{}", config.gateway.bind, config.gateway.port);

    let state = Arc::new(AppState {
        token,
        engine: Arc::new(engine),
        config,
    });

    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("factbot gateway listening on {addr}");
    if is_loopback {
        info!("bound to loopback, local access only");
    } else {
        warn!("bound to {addr}, ensure auth token is set");
    }

    axum::serve(listener, app(state)).await?;
    Ok(())
}

/// Routes served by the gateway.
pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .route("/health", get(health))
        .route("/message", post(message_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

/// Run one chat line through the engine and answer with its reply, if any.
async fn message_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(utterance): Json<Utterance>,
) -> impl IntoResponse {
    let authorization = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());
    if !auth::verify_bearer(authorization, &state.token) {
        return (StatusCode::UNAUTHORIZED, "invalid or missing token").into_response();
    }

    match state.engine.handle(&utterance).await {
        Ok(reply) => Json(MessageReply { reply }).into_response(),
        Err(e) => {
            warn!(nick = %utterance.nick, channel = %utterance.channel, "fact store error: {e}");
            (StatusCode::INTERNAL_SERVER_ERROR, format!("store error: {e}")).into_response()
        }
    }
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_connection(socket, state))
}

async fn handle_connection(mut socket: WebSocket, state: Arc<AppState>) {
    if state.token.is_some() {
        // First message must be auth when token auth is enabled.
        let authed = match socket.recv().await {
            Some(Ok(Message::Text(msg))) => auth::verify_connect(msg.as_str(), &state.token),
            _ => false,
        };

        if !authed {
            let _ = socket
                .send(Message::Text(
                    r#"{"error":"auth_failed","code":4001}"#.into(),
                ))
                .await;
            let _ = socket.send(Message::Close(None)).await;
            return;
        }
    }

    let hello = serde_json::json!({ "ok": true, "version": env!("CARGO_PKG_VERSION") });
    let _ = socket.send(Message::Text(hello.to_string().into())).await;

    info!("client connected");

    // Lines from one connection are handled in order.
    while let Some(Ok(msg)) = socket.recv().await {
        match msg {
            Message::Text(text) => {
                let resp = super::protocol::handle_rpc(text.as_str(), &state).await;
                if socket.send(Message::Text(resp.into())).await.is_err() {
                    break;
                }
            }
            Message::Close(_) => break,
            _ => {}
        }
    }

    info!("client disconnected");
}
