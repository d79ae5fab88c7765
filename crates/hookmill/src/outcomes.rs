//! Processing outcomes for the GitHub Action runtime.
//!
//! Handlers running under a workflow signal their result by returning one
//! of these outcomes; the Action runner translates them into process exit
//! codes. GitHub's runner treats `0` as success and `78` as the
//! conventional neutral ("skipped / not applicable") status, so those two
//! codes are reserved and may not be used for failures.

use std::fmt;

use tracing::info;

/// Exit code reserved for the successful outcome.
pub const EXIT_SUCCESS: i32 = 0;

/// Exit code reserved for the neutral outcome.
pub const EXIT_NEUTRAL: i32 = 78;

/// A GitHub Action processing outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    /// The event was processed successfully.
    Success { message: String },

    /// Processing was skipped or not applicable.
    Neutral { message: String },

    /// Processing failed with a caller-chosen exit code.
    Failure { message: String, exit_code: i32 },
}

impl ActionOutcome {
    /// Successful outcome with the given message.
    pub fn success(message: impl Into<String>) -> Self {
        Self::Success {
            message: message.into(),
        }
    }

    /// Neutral outcome with the given message.
    pub fn neutral(message: impl Into<String>) -> Self {
        Self::Neutral {
            message: message.into(),
        }
    }

    /// Failure outcome with the default exit code of `1`.
    pub fn failure(message: impl Into<String>) -> Self {
        Self::Failure {
            message: message.into(),
            exit_code: 1,
        }
    }

    /// Failure outcome with a caller-chosen exit code.
    ///
    /// The codes `0` and `78` identify the success and neutral outcomes
    /// and are rejected here; use [`ActionOutcome::success`] or
    /// [`ActionOutcome::neutral`] instead.
    pub fn failure_with_code(
        message: impl Into<String>,
        exit_code: i32,
    ) -> Result<Self, IllegalFailureCode> {
        match exit_code {
            EXIT_SUCCESS => Err(IllegalFailureCode {
                exit_code,
                reserved_for: "ActionOutcome::Success",
            }),
            EXIT_NEUTRAL => Err(IllegalFailureCode {
                exit_code,
                reserved_for: "ActionOutcome::Neutral",
            }),
            _ => Ok(Self::Failure {
                message: message.into(),
                exit_code,
            }),
        }
    }

    /// The message attached to this outcome.
    pub fn message(&self) -> &str {
        match self {
            Self::Success { message } | Self::Neutral { message } => message,
            Self::Failure { message, .. } => message,
        }
    }

    /// The process exit code this outcome maps to.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Success { .. } => EXIT_SUCCESS,
            Self::Neutral { .. } => EXIT_NEUTRAL,
            Self::Failure { exit_code, .. } => *exit_code,
        }
    }

    /// Log the outcome and return the exit code to terminate with.
    pub fn into_exit_code(self) -> i32 {
        info!(
            outcome = %self,
            "Terminating the GitHub Action processing"
        );
        self.exit_code()
    }
}

impl fmt::Display for ActionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success { message } => write!(f, "success: {message}"),
            Self::Neutral { message } => write!(f, "neutral: {message}"),
            Self::Failure { message, exit_code } => {
                write!(f, "failure (exit code {exit_code}): {message}")
            }
        }
    }
}

/// Rejected attempt to build a failure outcome with a reserved exit code.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("exit code {exit_code} is reserved for {reserved_for} and cannot signal a failure")]
pub struct IllegalFailureCode {
    /// The rejected code.
    pub exit_code: i32,
    /// The outcome variant this code belongs to.
    pub reserved_for: &'static str,
}

#[cfg(test)]
#[path = "outcomes_tests.rs"]
mod tests;
