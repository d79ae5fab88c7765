//! Tests for the installation entity and its token refresh protocol.

use std::sync::Arc;

use chrono::{Duration, Utc};
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::*;
use crate::auth::{GitHubToken, StaticTokenSource};
use crate::client::RawGitHubClient;

fn installation_metadata(server_uri: &str) -> Installation {
    serde_json::from_value(json!({
        "id": 7,
        "app_id": 42,
        "account": {"login": "octo-org", "id": 99},
        "events": ["issues", "check_run"],
        "permissions": {"checks": "write", "contents": "read"},
        "repository_selection": "all",
        "target_id": 99,
        "target_type": "Organization",
        "access_tokens_url": format!("{server_uri}/app/installations/7/access_tokens"),
        "html_url": "https://github.com/organizations/octo-org/settings/installations/7",
        "repositories_url": "https://api.github.com/installation/repositories",
        "created_at": "2019-06-12T08:14:30Z",
        "updated_at": "2019-06-12T08:14:30Z",
        "single_file_name": null,
    }))
    .expect("valid installation metadata")
}

fn app_client(server: &MockServer) -> RawGitHubClient {
    let source = StaticTokenSource::new(GitHubToken::jwt("app.jwt.token"));
    RawGitHubClient::new(reqwest::Client::new(), Arc::new(source), "testbot/1.0 (+x)")
        .with_base_url(server.uri())
}

fn installation(server: &MockServer) -> Arc<AppInstallation> {
    Arc::new(AppInstallation::new(
        installation_metadata(&server.uri()),
        app_client(server),
        reqwest::Client::new(),
        "testbot/1.0 (+x)",
    ))
}

fn token_response(token: &str, expires_in: Duration) -> ResponseTemplate {
    ResponseTemplate::new(201).set_body_json(json!({
        "token": token,
        "expires_at": (Utc::now() + expires_in).to_rfc3339(),
        "permissions": {"checks": "write"},
        "repository_selection": "all",
    }))
}

#[test]
fn test_metadata_deserializes() {
    let metadata = installation_metadata("https://api.github.com");
    assert_eq!(metadata.id, 7);
    assert_eq!(metadata.repository_selection, RepositorySelection::All);
    assert_eq!(metadata.target_type, TargetType::Organization);
    assert!(metadata.single_file_name.is_none());
    assert!(metadata.suspended_at.is_none());
}

#[test]
fn test_access_token_expiry() {
    let live: InstallationAccessToken = serde_json::from_value(json!({
        "token": "v1.live",
        "expires_at": (Utc::now() + Duration::hours(1)).to_rfc3339(),
    }))
    .unwrap();
    assert!(!live.expired());

    let stale: InstallationAccessToken = serde_json::from_value(json!({
        "token": "v1.stale",
        "expires_at": (Utc::now() - Duration::minutes(1)).to_rfc3339(),
    }))
    .unwrap();
    assert!(stale.expired());
}

#[tokio::test]
async fn test_token_is_fetched_with_the_app_jwt_and_preview_media() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/app/installations/7/access_tokens"))
        .and(header("authorization", "Bearer app.jwt.token"))
        .and(header(
            "accept",
            "application/vnd.github.machine-man-preview+json",
        ))
        .respond_with(token_response("v1.fresh", Duration::hours(1)))
        .expect(1)
        .mount(&server)
        .await;

    let installation = installation(&server);
    let token = installation.access_token().await.unwrap();
    assert_eq!(token, GitHubToken::oauth("v1.fresh"));
}

#[tokio::test]
async fn test_valid_cached_token_is_reused() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/app/installations/7/access_tokens"))
        .respond_with(token_response("v1.cached", Duration::hours(1)))
        .expect(1)
        .mount(&server)
        .await;

    let installation = installation(&server);
    let first = installation.access_token().await.unwrap();
    let second = installation.access_token().await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_expired_token_triggers_a_refresh() {
    let server = MockServer::start().await;
    // Every response expires immediately, so every call refreshes.
    Mock::given(method("POST"))
        .and(path("/app/installations/7/access_tokens"))
        .respond_with(token_response("v1.shortlived", Duration::seconds(-1)))
        .expect(2)
        .mount(&server)
        .await;

    let installation = installation(&server);
    installation.access_token().await.unwrap();
    installation.access_token().await.unwrap();
}

#[tokio::test]
async fn test_api_client_resolves_the_token_per_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/app/installations/7/access_tokens"))
        .respond_with(token_response("v1.resolved", Duration::hours(1)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/octo-org/widgets"))
        .and(header("authorization", "token v1.resolved"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 1})))
        .expect(1)
        .mount(&server)
        .await;

    let installation = installation(&server);
    let api = installation.api_client().with_base_url(server.uri());
    api.getitem("/repos/octo-org/widgets", None).await.unwrap();
}

#[tokio::test]
async fn test_refresh_failure_surfaces_as_api_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/app/installations/7/access_tokens"))
        .respond_with(ResponseTemplate::new(401).set_body_string("Bad credentials"))
        .mount(&server)
        .await;

    let installation = installation(&server);
    let api_error = installation.access_token().await.unwrap_err();
    assert!(matches!(
        api_error,
        crate::error::ApiError::HttpError { status: 401, .. }
    ));
}
