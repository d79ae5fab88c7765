//! Tests for the GitHub App entity.

use std::sync::Arc;

use serde_json::json;
use wiremock::matchers::{header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::*;
use crate::config::GitHubAppConfig;
use crate::error::ApiError;
use crate::test_support::{ping_payload, test_event, test_private_key};

fn app_config() -> GitHubAppConfig {
    GitHubAppConfig {
        app_id: Some(42),
        private_key: Some(test_private_key()),
        webhook_secret: None,
    }
}

fn github_app(server: Option<&MockServer>) -> GitHubApp {
    let app = GitHubApp::new(
        &app_config(),
        "testbot/1.0 (+https://example.org)",
        reqwest::Client::new(),
        Vec::new(),
    )
    .expect("valid app config");

    match server {
        Some(server) => app.with_base_url(server.uri()),
        None => app,
    }
}

fn installation_body(id: u64) -> serde_json::Value {
    json!({
        "id": id,
        "app_id": 42,
        "account": {"login": "octo-org"},
        "events": ["issues"],
        "permissions": {"checks": "write"},
        "repository_selection": "selected",
        "target_id": 99,
        "target_type": "User",
        "access_tokens_url": format!("https://api.github.com/app/installations/{id}/access_tokens"),
        "html_url": "https://github.com/settings/installations/1",
        "repositories_url": "https://api.github.com/installation/repositories",
        "created_at": "2019-06-12T08:14:30Z",
        "updated_at": "2019-06-12T08:14:30Z",
        "single_file_name": null,
    })
}

#[test]
fn test_new_requires_app_id_and_key() {
    let missing_id = GitHubAppConfig {
        app_id: None,
        private_key: Some(test_private_key()),
        webhook_secret: None,
    };
    assert!(GitHubApp::new(&missing_id, "ua", reqwest::Client::new(), Vec::new()).is_err());

    let missing_key = GitHubAppConfig {
        app_id: Some(42),
        private_key: None,
        webhook_secret: None,
    };
    assert!(GitHubApp::new(&missing_key, "ua", reqwest::Client::new(), Vec::new()).is_err());
}

#[test]
fn test_jwt_is_minted_from_the_private_key() {
    let app = github_app(None);
    let token = app.jwt().unwrap();
    assert_eq!(token.scheme(), "Bearer");
    // Encoded JWTs are three dot-separated segments.
    assert_eq!(token.reveal().split('.').count(), 3);
}

#[test]
fn test_is_not_an_action() {
    assert!(!github_app(None).is_action());
}

#[tokio::test]
async fn test_get_installation_by_id() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/app/installations/7"))
        .and(header_exists("authorization"))
        .respond_with(ResponseTemplate::new(200).set_body_json(installation_body(7)))
        .expect(1)
        .mount(&server)
        .await;

    let app = github_app(Some(&server));
    let installation = app.get_installation_by_id(7).await.unwrap();
    assert_eq!(installation.id(), 7);
    assert_eq!(installation.metadata().app_id, 42);
}

#[tokio::test]
async fn test_get_installation_reads_the_event_payload() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/app/installations/12345"))
        .respond_with(ResponseTemplate::new(200).set_body_json(installation_body(12345)))
        .expect(1)
        .mount(&server)
        .await;

    let app = github_app(Some(&server));
    let event = test_event("issues", json!({"installation": {"id": 12345}}));
    let installation = app.get_installation(&event).await.unwrap();
    assert_eq!(installation.id(), 12345);
}

#[tokio::test]
async fn test_get_installation_without_reference_is_a_lookup_miss() {
    let app = github_app(None);
    let event = test_event("ping", ping_payload());
    let api_error = app.get_installation(&event).await.unwrap_err();
    assert!(matches!(api_error, ApiError::MissingInstallation));
}

#[tokio::test]
async fn test_get_installations_pages_through_the_listing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/app/installations"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([installation_body(1), installation_body(2)])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let app = github_app(Some(&server));
    let installations = app.get_installations().await.unwrap();
    assert_eq!(installations.len(), 2);
    assert_eq!(installations[0].id(), 1);
    assert_eq!(installations[1].id(), 2);
}

#[tokio::test]
async fn test_log_installs_list_swallows_transport_errors() {
    // Nothing is listening on this port; enumeration fails, startup is
    // expected to proceed regardless.
    let app = github_app(None).with_base_url("http://127.0.0.1:9");
    app.log_installs_list().await;
}

#[tokio::test]
async fn test_dispatch_event_reaches_bound_routers() {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use crate::error::HandlerError;
    use crate::routing::{ConcurrentRouter, EventHandler, EventRouter};
    use crate::runtime::RuntimeContext;

    struct Counting {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl EventHandler for Counting {
        async fn handle(
            &self,
            _event: &crate::events::WebhookEvent,
            _ctx: &RuntimeContext,
        ) -> Result<(), HandlerError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    let calls = Arc::new(AtomicUsize::new(0));
    let router = Arc::new(ConcurrentRouter::new());
    router.routes().register(
        "ping",
        Arc::new(Counting {
            calls: Arc::clone(&calls),
        }),
    );

    let routers: Vec<Arc<dyn EventRouter>> = vec![router];
    let app = GitHubApp::new(&app_config(), "ua/1 (+x)", reqwest::Client::new(), routers).unwrap();

    let event = test_event("ping", ping_payload());
    app.dispatch_event(&event, &RuntimeContext::new())
        .await
        .unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}
