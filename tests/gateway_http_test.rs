use factbot::config::FactbotConfig;
use tokio::time::{Duration, sleep};

fn free_port() -> u16 {
    std::net::TcpListener::bind("127.0.0.1:0")
        .expect("bind ephemeral")
        .local_addr()
        .expect("local addr")
        .port()
}

fn loopback_config(port: u16) -> FactbotConfig {
    let mut config = FactbotConfig::default();
    config.gateway.bind = "127.0.0.1".to_string();
    config.gateway.port = port;
    config
}

async fn wait_for_health(port: u16) {
    let client = reqwest::Client::new();
    let url = format!("http://127.0.0.1:{port}/health");

    for _ in 0..80 {
        if let Ok(resp) = client.get(&url).send().await {
            if resp.status().is_success() {
                return;
            }
        }
        sleep(Duration::from_millis(50)).await;
    }

    panic!("gateway did not become healthy at {url}");
}

async fn post_line(
    client: &reqwest::Client,
    port: u16,
    token: Option<&str>,
    nick: &str,
    content: &str,
) -> reqwest::Response {
    let mut request = client
        .post(format!("http://127.0.0.1:{port}/message"))
        .json(&serde_json::json!({ "nick": nick, "channel": "#bots", "content": content }));
    if let Some(token) = token {
        request = request.bearer_auth(token);
    }
    request.send().await.expect("message response")
}

#[tokio::test]
async fn run_rejects_non_loopback_without_token() {
    let mut config = FactbotConfig::default();
    config.gateway.bind = "0.0.0.0".to_string();
    config.gateway.port = free_port();

    let err = factbot::gateway::run(config, None)
        .await
        .expect_err("non-loopback run without token must fail");
    assert!(err.to_string().contains("Auth token required"));
}

#[tokio::test]
async fn health_endpoint_returns_ok() {
    let port = free_port();
    let config = loopback_config(port);
    let gateway = tokio::spawn(async move {
        let _ = factbot::gateway::run(config, None).await;
    });

    wait_for_health(port).await;

    let response = reqwest::get(format!("http://127.0.0.1:{port}/health"))
        .await
        .expect("health response");
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    assert_eq!(response.text().await.expect("health body"), "ok");

    gateway.abort();
    let _ = gateway.await;
}

#[tokio::test]
async fn message_endpoint_remembers_and_answers() {
    let port = free_port();
    let config = loopback_config(port);
    let gateway = tokio::spawn(async move {
        let _ = factbot::gateway::run(config, None).await;
    });

    wait_for_health(port).await;
    let client = reqwest::Client::new();

    let stored = post_line(&client, port, None, "sduncan", "foo is bar").await;
    assert_eq!(stored.status(), reqwest::StatusCode::OK);
    let body: serde_json::Value = stored.json().await.expect("json body");
    assert!(body["reply"].is_null());

    let answered = post_line(&client, port, None, "alex", "foo?").await;
    let body: serde_json::Value = answered.json().await.expect("json body");
    let reply = body["reply"].as_str().expect("reply text");
    assert!(reply.starts_with("foo is bar (sduncan on "), "{reply}");

    let malformed = post_line(&client, port, None, "alex", "!replace foo").await;
    let body: serde_json::Value = malformed.json().await.expect("json body");
    assert_eq!(body["reply"], "No definition supplied.");

    gateway.abort();
    let _ = gateway.await;
}

#[tokio::test]
async fn message_endpoint_checks_bearer_token() {
    let port = free_port();
    let config = loopback_config(port);
    let gateway = tokio::spawn(async move {
        let _ = factbot::gateway::run(config, Some("s3cret".into())).await;
    });

    wait_for_health(port).await;
    let client = reqwest::Client::new();

    let denied = post_line(&client, port, None, "alex", "foo?").await;
    assert_eq!(denied.status(), reqwest::StatusCode::UNAUTHORIZED);

    let wrong = post_line(&client, port, Some("nope"), "alex", "foo?").await;
    assert_eq!(wrong.status(), reqwest::StatusCode::UNAUTHORIZED);

    let allowed = post_line(&client, port, Some("s3cret"), "alex", "foo?").await;
    assert_eq!(allowed.status(), reqwest::StatusCode::OK);

    gateway.abort();
    let _ = gateway.await;
}
