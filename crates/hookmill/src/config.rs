//! Resolved process configuration.
//!
//! All configuration comes from environment variables (a `.env` file may
//! have been loaded into the environment beforehand by the binary).
//! Parsing happens once at startup; everything downstream works with the
//! resolved [`BotConfig`] values. Validation failures abort startup.

use std::path::PathBuf;

use serde::Deserialize;

use crate::auth::PrivateKey;
use crate::error::ConfigError;
use crate::secrets::{SecretString, SuperSecretString};

/// How the process was asked to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Long-running webhook server authenticating as a GitHub App.
    App,
    /// One-shot event processor inside a GitHub Action workflow.
    Action,
}

/// Deployment environment flavor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvFlavor {
    Dev,
    Prod,
}

/// GitHub App credentials and webhook secret.
#[derive(Debug)]
pub struct GitHubAppConfig {
    /// Numeric App id; present in app mode.
    pub app_id: Option<u64>,
    /// The App's RSA private key; present in app mode.
    pub private_key: Option<PrivateKey>,
    /// HMAC secret enabling signed webhook mode.
    pub webhook_secret: Option<SecretString>,
}

/// Workflow-run inputs injected by the GitHub Actions runtime.
#[derive(Debug, Default)]
pub struct ActionConfig {
    pub workflow: Option<String>,
    pub action: Option<String>,
    pub actor: Option<String>,
    pub repository: Option<String>,
    pub event_name: Option<String>,
    pub event_path: Option<PathBuf>,
    pub workspace: Option<String>,
    pub sha: Option<String>,
    pub git_ref: Option<String>,
    /// Workflow access token; redacted hard in any diagnostics.
    pub token: Option<SuperSecretString>,
}

/// Web server bind settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_owned(),
            port: 8080,
        }
    }
}

/// Runtime behavior switches.
#[derive(Debug)]
pub struct RuntimeConfig {
    /// Verbose diagnostics.
    pub debug: bool,
    /// Deployment flavor.
    pub env: EnvFlavor,
    /// Resolved run mode (`auto` has already been detected away).
    pub mode: RunMode,
    /// Embedded into the API user agent.
    pub app_name: Option<String>,
    pub app_version: Option<String>,
    pub app_url: Option<String>,
    /// Crash sink endpoint; reporting is disabled when absent.
    pub sentry_dsn: Option<String>,
}

impl RuntimeConfig {
    /// The `User-Agent` value used when hitting the GitHub API.
    pub fn user_agent(&self) -> String {
        format!(
            "{}/{} (+{})",
            self.app_name.as_deref().unwrap_or(env!("CARGO_PKG_NAME")),
            self.app_version
                .as_deref()
                .unwrap_or(env!("CARGO_PKG_VERSION")),
            self.app_url
                .as_deref()
                .unwrap_or(env!("CARGO_PKG_REPOSITORY")),
        )
    }
}

/// The complete resolved configuration.
#[derive(Debug)]
pub struct BotConfig {
    pub github: GitHubAppConfig,
    pub action: ActionConfig,
    pub server: ServerConfig,
    pub runtime: RuntimeConfig,
}

// Raw environment shapes; resolved into the typed config after
// validation.

#[derive(Debug, Deserialize)]
struct GitHubEnv {
    app_identifier: Option<String>,
    private_key: Option<String>,
    private_key_fingerprint: Option<String>,
    webhook_secret: Option<String>,
    workflow: Option<String>,
    action: Option<String>,
    actor: Option<String>,
    repository: Option<String>,
    event_name: Option<String>,
    event_path: Option<PathBuf>,
    workspace: Option<String>,
    sha: Option<String>,
    #[serde(rename = "ref")]
    git_ref: Option<String>,
    token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AppMetaEnv {
    app_mode: Option<String>,
    app_name: Option<String>,
    app_version: Option<String>,
    app_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProcessEnv {
    host: Option<String>,
    port: Option<u16>,
    debug: Option<String>,
    env: Option<String>,
    sentry_dsn: Option<String>,
}

impl BotConfig {
    /// Load and validate configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let github: GitHubEnv = envy::prefixed("GITHUB_").from_env()?;
        let meta: AppMetaEnv = envy::prefixed("OCTOMACHINERY_").from_env()?;
        let process: ProcessEnv = envy::from_env()?;
        Self::resolve(github, meta, process)
    }

    /// Load configuration from an explicit variable list (tests).
    pub fn from_vars(
        vars: impl IntoIterator<Item = (String, String)> + Clone,
    ) -> Result<Self, ConfigError> {
        let github: GitHubEnv = envy::prefixed("GITHUB_").from_iter(vars.clone())?;
        let meta: AppMetaEnv = envy::prefixed("OCTOMACHINERY_").from_iter(vars.clone())?;
        let process: ProcessEnv = envy::from_iter(vars)?;
        Self::resolve(github, meta, process)
    }

    fn resolve(
        github: GitHubEnv,
        meta: AppMetaEnv,
        process: ProcessEnv,
    ) -> Result<Self, ConfigError> {
        let mode = resolve_mode(meta.app_mode.as_deref(), &github)?;
        let env = resolve_env_flavor(process.env.as_deref())?;

        let app_id = match &github.app_identifier {
            Some(raw) => Some(raw.parse::<u64>().map_err(|_| ConfigError::InvalidValue {
                name: "GITHUB_APP_IDENTIFIER",
                message: format!("must be a numeric App id, got {raw:?}"),
            })?),
            None => None,
        };

        let private_key = match &github.private_key {
            // Multi-line PEM values usually arrive with escaped newlines.
            Some(raw) => Some(PrivateKey::from_pem(raw.replace("\\n", "\n").as_bytes())?),
            None => None,
        };

        if mode == RunMode::App {
            if app_id.is_none() {
                return Err(ConfigError::MissingVar {
                    name: "GITHUB_APP_IDENTIFIER",
                });
            }
            if private_key.is_none() {
                return Err(ConfigError::MissingVar {
                    name: "GITHUB_PRIVATE_KEY",
                });
            }
        }

        if let (Some(key), Some(pinned)) = (&private_key, &github.private_key_fingerprint) {
            if !key.matches_fingerprint(pinned) {
                return Err(ConfigError::FingerprintMismatch {
                    pinned: pinned.clone(),
                    computed: key.fingerprint().to_owned(),
                });
            }
        }

        Ok(Self {
            github: GitHubAppConfig {
                app_id,
                private_key,
                webhook_secret: github.webhook_secret.map(SecretString::new),
            },
            action: ActionConfig {
                workflow: github.workflow,
                action: github.action,
                actor: github.actor,
                repository: github.repository,
                event_name: github.event_name,
                event_path: github.event_path,
                workspace: github.workspace,
                sha: github.sha,
                git_ref: github.git_ref,
                token: github.token.map(SuperSecretString::new),
            },
            server: ServerConfig {
                host: process.host.unwrap_or_else(|| "0.0.0.0".to_owned()),
                port: process.port.unwrap_or(8080),
            },
            runtime: RuntimeConfig {
                debug: process.debug.as_deref().map(truthy).unwrap_or(false),
                env,
                mode,
                app_name: meta.app_name,
                app_version: meta.app_version,
                app_url: meta.app_url,
                sentry_dsn: process.sentry_dsn,
            },
        })
    }
}

fn resolve_mode(raw: Option<&str>, github: &GitHubEnv) -> Result<RunMode, ConfigError> {
    match raw.unwrap_or("auto") {
        "app" => Ok(RunMode::App),
        "action" => Ok(RunMode::Action),
        "auto" => Ok(detect_env_mode(github)),
        other => Err(ConfigError::InvalidValue {
            name: "OCTOMACHINERY_APP_MODE",
            message: format!("must be one of 'app', 'action', 'auto', got {other:?}"),
        }),
    }
}

/// Figure out whether we are inside a GitHub Action environment.
///
/// All of the workflow-run variables must be present; a partial set means
/// something else is going on and the server mode is the safer default.
fn detect_env_mode(github: &GitHubEnv) -> RunMode {
    let all_present = github.workflow.is_some()
        && github.action.is_some()
        && github.actor.is_some()
        && github.repository.is_some()
        && github.event_name.is_some()
        && github.event_path.is_some()
        && github.workspace.is_some()
        && github.sha.is_some()
        && github.git_ref.is_some()
        && github.token.is_some();

    if all_present {
        RunMode::Action
    } else {
        RunMode::App
    }
}

fn resolve_env_flavor(raw: Option<&str>) -> Result<EnvFlavor, ConfigError> {
    match raw.unwrap_or("prod") {
        "dev" => Ok(EnvFlavor::Dev),
        "prod" => Ok(EnvFlavor::Prod),
        other => Err(ConfigError::InvalidValue {
            name: "ENV",
            message: format!("must be 'dev' or 'prod', got {other:?}"),
        }),
    }
}

fn truthy(raw: &str) -> bool {
    matches!(
        raw.to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
