//! Tests for the token types.

use super::*;

#[tokio::test]
async fn test_jwt_uses_bearer_scheme() {
    let token = GitHubToken::jwt("header.payload.signature");
    assert_eq!(token.scheme(), "Bearer");
    assert_eq!(
        token.authorization_value(),
        "Bearer header.payload.signature"
    );
}

#[tokio::test]
async fn test_oauth_uses_token_scheme() {
    let token = GitHubToken::oauth("v1.1f699f1069f60xxx");
    assert_eq!(token.scheme(), "token");
    assert_eq!(token.authorization_value(), "token v1.1f699f1069f60xxx");
}

#[tokio::test]
async fn test_workflow_token_uses_token_scheme() {
    let token = GitHubToken::workflow_oauth("ghs_runnerinjected");
    assert_eq!(token.scheme(), "token");
    assert_eq!(token.authorization_value(), "token ghs_runnerinjected");
}

#[test]
fn test_workflow_token_debug_uses_the_strong_placeholder() {
    let token = GitHubToken::workflow_oauth("ghs_runnerinjected");
    let rendered = format!("{token:?}");
    assert!(rendered.contains("<SUPER_SECRET>"), "got: {rendered}");
    assert!(!rendered.contains("ghs_runnerinjected"), "got: {rendered}");
}

#[test]
fn test_display_exposes_the_raw_value() {
    let token = GitHubToken::oauth("v1.abc");
    assert_eq!(token.to_string(), "v1.abc");
}

#[test]
fn test_debug_redacts_the_value() {
    let token = GitHubToken::oauth("v1.abc");
    let rendered = format!("{token:?}");
    assert!(rendered.contains("<SECRET>"), "got: {rendered}");
    assert!(!rendered.contains("v1.abc"), "got: {rendered}");
}

#[tokio::test]
async fn test_static_source_returns_its_token() {
    let source = StaticTokenSource::new(GitHubToken::oauth("fixed"));
    let token = source.current_token().await.unwrap();
    assert_eq!(token, GitHubToken::oauth("fixed"));
}
