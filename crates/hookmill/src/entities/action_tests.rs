//! Tests for the GitHub Action entity.

use serde_json::json;

use super::*;
use crate::config::ActionConfig;
use crate::error::ConfigError;
use crate::secrets::SuperSecretString;

fn action_config(event_path: std::path::PathBuf) -> ActionConfig {
    ActionConfig {
        workflow: Some("Test Workflow".to_owned()),
        action: Some("Test Action".to_owned()),
        actor: Some("octocat".to_owned()),
        repository: Some("octo-org/widgets".to_owned()),
        event_name: Some("check_run".to_owned()),
        event_path: Some(event_path),
        workspace: Some("/github/workspace".to_owned()),
        sha: Some("e6d4abcb8a6cd989d41ee".to_owned()),
        git_ref: Some("refs/heads/main".to_owned()),
        token: Some(SuperSecretString::new("ghs_workflowtoken")),
    }
}

fn write_event_file(contents: &str) -> (tempfile::TempDir, std::path::PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let event_path = dir.path().join("event.json");
    std::fs::write(&event_path, contents).unwrap();
    (dir, event_path)
}

#[test]
fn test_new_requires_runner_injected_values() {
    let mut config = action_config("/github/workflow/event.json".into());
    config.token = None;
    let rejected = GitHubAction::new(&config, "ua/1 (+x)", reqwest::Client::new(), Vec::new());
    assert!(matches!(
        rejected,
        Err(ConfigError::MissingVar {
            name: "GITHUB_TOKEN"
        })
    ));

    let mut config = action_config("/github/workflow/event.json".into());
    config.event_name = None;
    assert!(GitHubAction::new(&config, "ua/1 (+x)", reqwest::Client::new(), Vec::new()).is_err());
}

#[test]
fn test_token_is_a_workflow_oauth_token() {
    let (_dir, event_path) = write_event_file("{}");
    let action = GitHubAction::new(
        &action_config(event_path),
        "ua/1 (+x)",
        reqwest::Client::new(),
        Vec::new(),
    )
    .unwrap();

    let token = action.token();
    assert_eq!(token.scheme(), "token");
    assert_eq!(token.authorization_value(), "token ghs_workflowtoken");

    // The runner-injected token keeps the stronger secret class all the
    // way into its diagnostics.
    let rendered = format!("{token:?}");
    assert!(rendered.contains("<SUPER_SECRET>"), "got: {rendered}");
    assert!(!rendered.contains("ghs_workflowtoken"), "got: {rendered}");
}

#[test]
fn test_event_reads_the_workflow_file() {
    let (_dir, event_path) = write_event_file(r#"{"action":"created"}"#);
    let action = GitHubAction::new(
        &action_config(event_path),
        "ua/1 (+x)",
        reqwest::Client::new(),
        Vec::new(),
    )
    .unwrap();

    let event = action.event().unwrap();
    assert_eq!(event.name(), "check_run");
    assert_eq!(event.payload()["action"], json!("created"));
}

#[tokio::test]
async fn test_is_an_action_and_never_has_an_installation() {
    let (_dir, event_path) = write_event_file("{}");
    let action = GitHubAction::new(
        &action_config(event_path),
        "ua/1 (+x)",
        reqwest::Client::new(),
        Vec::new(),
    )
    .unwrap();

    assert!(action.is_action());

    let event = crate::test_support::test_event("check_run", json!({}));
    assert!(matches!(
        action.get_installation(&event).await,
        Err(crate::error::ApiError::MissingInstallation)
    ));
}

#[test]
fn test_api_client_is_initialized() {
    let (_dir, event_path) = write_event_file("{}");
    let action = GitHubAction::new(
        &action_config(event_path),
        "ua/1 (+x)",
        reqwest::Client::new(),
        Vec::new(),
    )
    .unwrap();

    assert!(action.api_client().is_initialized());
}
