//! End-to-end reset runs against a stubbed Bot API and PostgREST server.

use std::sync::{Arc, Mutex};

use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

use siteops::error::display_chain;
use siteops::flow::exit_code;
use siteops::{
    ApiError, BotApiClient, Convergence, ConvergencePolicy, FlowError, MemorySink,
    PostgrestClient, ReconcileError, ResetFlow, Secret, TableName, WebhookConfig,
};

const TOKEN: &str = "123456:test-token";
const WEBHOOK_URL: &str = "https://example.org/webhook";
const SECRET: &str = "s3cr3t-32chars-minimum";

/// Bot API stand-in that remembers the installed URL.
#[derive(Clone, Default)]
struct EchoBot {
    url: Arc<Mutex<String>>,
    last_set: Arc<Mutex<Option<Value>>>,
}

struct GetInfo(EchoBot);
struct Delete(EchoBot);
struct Set(EchoBot);

impl Respond for GetInfo {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        let url = self.0.url.lock().unwrap().clone();
        ResponseTemplate::new(200).set_body_json(json!({
            "ok": true,
            "result": { "url": url, "pending_update_count": 0, "has_custom_certificate": false }
        }))
    }
}

impl Respond for Delete {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        self.0.url.lock().unwrap().clear();
        ResponseTemplate::new(200).set_body_json(json!({
            "ok": true,
            "result": true,
            "description": "Webhook was deleted"
        }))
    }
}

impl Respond for Set {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let body: Value = serde_json::from_slice(&request.body).unwrap();
        *self.0.url.lock().unwrap() = body["url"].as_str().unwrap().to_string();
        *self.0.last_set.lock().unwrap() = Some(body);
        ResponseTemplate::new(200).set_body_json(json!({
            "ok": true,
            "result": true,
            "description": "Webhook was set"
        }))
    }
}

async fn mount_echo_bot(server: &MockServer, bot: &EchoBot) {
    Mock::given(method("GET"))
        .and(path_regex(r"/getWebhookInfo$"))
        .respond_with(GetInfo(bot.clone()))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path_regex(r"/deleteWebhook$"))
        .respond_with(Delete(bot.clone()))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path_regex(r"/setWebhook$"))
        .respond_with(Set(bot.clone()))
        .mount(server)
        .await;
}

async fn mount_empty_table(server: &MockServer, table: &str) {
    let table_path = format!("/rest/v1/{table}");
    Mock::given(method("DELETE"))
        .and(path(table_path.as_str()))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(table_path.as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
        .expect(1)
        .mount(server)
        .await;
}

fn desired() -> WebhookConfig {
    WebhookConfig::new(WEBHOOK_URL, Secret::new(SECRET))
        .unwrap()
        .with_max_connections(40)
        .unwrap()
        .with_drop_pending_updates(true)
}

#[tokio::test]
async fn test_reset_drains_then_installs_and_verifies() {
    let server = MockServer::start().await;
    let bot = EchoBot::default();
    *bot.url.lock().unwrap() = "https://old.example.org/hook".to_string();
    mount_echo_bot(&server, &bot).await;
    mount_empty_table(&server, "telegram_jobs").await;
    mount_empty_table(&server, "telegram_submissions").await;

    let api = BotApiClient::with_base_url(Secret::new(TOKEN), server.uri()).unwrap();
    let store = PostgrestClient::new(&server.uri(), Secret::new("service-key"), "id").unwrap();
    let sink = MemorySink::new();

    let summary = ResetFlow::new(&api, &sink)
        .with_store(&store)
        .with_policy(ConvergencePolicy::immediate(3))
        .run(&desired(), &TableName::defaults())
        .await
        .unwrap();

    let result = summary.reconciliation.clone().unwrap();
    assert!(result.deleted);
    assert!(result.set);
    assert!(result.verified);
    assert_eq!(result.final_url, WEBHOOK_URL);
    assert_eq!(result.convergence, Convergence::Converged);
    assert_eq!(
        result.initial_state.unwrap().current_url,
        "https://old.example.org/hook"
    );

    assert_eq!(summary.drain.len(), 2);
    assert!(summary.drain.iter().all(|r| r.existed && r.verified_empty));
    assert!(summary.is_clean());
    assert_eq!(exit_code::<_, FlowError>(&Ok(summary)), 0);

    let sent = bot.last_set.lock().unwrap().clone().unwrap();
    assert_eq!(sent["url"], WEBHOOK_URL);
    assert_eq!(sent["secret_token"], SECRET);
    assert_eq!(sent["max_connections"], 40);
    assert_eq!(sent["drop_pending_updates"], true);
    assert_eq!(sent["allowed_updates"], json!(["message", "callback_query"]));

    // Drain requests all arrive before the webhook is removed.
    let requests = server.received_requests().await.unwrap();
    let first_delete_webhook = requests
        .iter()
        .position(|r| r.url.path().ends_with("/deleteWebhook"))
        .unwrap();
    let last_store_call = requests
        .iter()
        .rposition(|r| r.url.path().starts_with("/rest/v1/"))
        .unwrap();
    assert!(last_store_call < first_delete_webhook);

    assert!(sink.contains("Webhook verified"));
    // The bot token travels only in the request path.
    assert!(!sink.contains("test-token"));
}

#[tokio::test]
async fn test_rejected_install_is_fatal() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path_regex(r"/getWebhookInfo$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ok": true,
            "result": { "url": "", "pending_update_count": 0 }
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path_regex(r"/deleteWebhook$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true, "result": true })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path_regex(r"/setWebhook$"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "ok": false,
            "error_code": 400,
            "description": "Bad Request: bad webhook: HTTPS url must be provided for webhook"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let api = BotApiClient::with_base_url(Secret::new(TOKEN), server.uri()).unwrap();
    let sink = MemorySink::new();

    let result = ResetFlow::new(&api, &sink)
        .with_policy(ConvergencePolicy::immediate(2))
        .run(&desired(), &[])
        .await;

    let err = result.as_ref().unwrap_err();
    assert!(matches!(err, FlowError::Reconcile(_)));
    assert!(err.to_string().contains("HTTPS url must be provided"));
    assert_eq!(exit_code(&result), 1);

    // Inspect plus one settle poll; nothing after the failed install.
    assert_eq!(info_calls(&server).await, 2);
}

#[tokio::test]
async fn test_unobserved_install_warns_unless_strict() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path_regex(r"/getWebhookInfo$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ok": true,
            "result": { "url": "https://stale.example.org/hook", "pending_update_count": 3 }
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path_regex(r"/(deleteWebhook|setWebhook)$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true, "result": true })))
        .mount(&server)
        .await;

    let api = BotApiClient::with_base_url(Secret::new(TOKEN), server.uri()).unwrap();
    let sink = MemorySink::new();

    let summary = ResetFlow::new(&api, &sink)
        .with_policy(ConvergencePolicy::immediate(2))
        .run(&desired(), &[])
        .await
        .unwrap();
    let result = summary.reconciliation.as_ref().unwrap();
    assert!(result.set);
    assert!(!result.verified);
    assert_eq!(result.convergence, Convergence::ConvergedWithWarning);
    assert_eq!(result.final_url, "https://stale.example.org/hook");
    assert!(!summary.is_clean());
    assert!(sink.contains("Webhook URL mismatch"));

    let strict = ResetFlow::new(&api, &sink)
        .with_policy(ConvergencePolicy::immediate(2))
        .strict_verify(true)
        .run(&desired(), &[])
        .await;
    assert!(matches!(strict, Err(FlowError::NotVerified { .. })));
    assert_eq!(exit_code(&strict), 1);
}

async fn info_calls(server: &MockServer) -> usize {
    server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| r.url.path().ends_with("/getWebhookInfo"))
        .count()
}

#[tokio::test]
async fn test_gateway_error_on_install_is_fatal() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path_regex(r"/getWebhookInfo$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ok": true,
            "result": { "url": "", "pending_update_count": 0 }
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path_regex(r"/deleteWebhook$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true, "result": true })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path_regex(r"/setWebhook$"))
        .respond_with(ResponseTemplate::new(502).set_body_string("Bad Gateway"))
        .expect(1)
        .mount(&server)
        .await;

    let api = BotApiClient::with_base_url(Secret::new(TOKEN), server.uri()).unwrap();
    let sink = MemorySink::new();

    let result = ResetFlow::new(&api, &sink)
        .with_policy(ConvergencePolicy::immediate(2))
        .run(&desired(), &[])
        .await;

    assert!(matches!(
        result,
        Err(FlowError::Reconcile(ReconcileError::InstallFailed(
            ApiError::Http { status: 502, .. }
        )))
    ));
    assert_eq!(exit_code(&result), 1);
    // Inspect plus the post-delete poll; no verification after the failure.
    assert_eq!(info_calls(&server).await, 2);
}

#[tokio::test]
async fn test_transport_errors_do_not_expose_bot_token() {
    // Nothing listens on a port that was just released.
    let port = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();
    let api = BotApiClient::with_base_url(
        Secret::new("123456:SUPERSECRETTOKEN"),
        format!("http://127.0.0.1:{port}"),
    )
    .unwrap();
    let sink = MemorySink::new();

    let err = ResetFlow::new(&api, &sink)
        .with_policy(ConvergencePolicy::immediate(1))
        .run(&desired(), &[])
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        FlowError::Reconcile(ReconcileError::InstallFailed(ApiError::Transport(_)))
    ));
    assert!(sink.contains("Failed to get webhook info"));
    assert!(sink.contains("Failed to delete webhook"));
    assert!(sink.contains("Failed to set webhook"));
    assert!(!sink.contains("SUPERSECRETTOKEN"));
    assert!(!err.to_string().contains("SUPERSECRETTOKEN"));
    assert!(!display_chain(&err).contains("SUPERSECRETTOKEN"));
}
