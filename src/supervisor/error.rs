//! Supervisor error taxonomy. None of these escape [`Supervisor::run`].
//! `MissingOptionalTool` and `ChildTermination` are only logged; the rest end
//! the run.
//!
//! [`Supervisor::run`]: super::Supervisor::run

use std::io;

use crate::config::Role;

use super::state_machine::TransitionError;

#[derive(thiserror::Error, Debug)]
pub enum SupervisorError {
    #[error("'{tool}' is not installed (get it from {hint})")]
    MissingMandatoryTool { tool: String, hint: String },

    #[error("{role}: '{tool}' is not installed")]
    MissingOptionalTool { role: Role, tool: String },

    #[error("failed to start {role}: {source}")]
    Spawn {
        role: Role,
        #[source]
        source: io::Error,
    },

    #[error("failed to stop {role}: {reason}")]
    ChildTermination { role: Role, reason: String },

    #[error(transparent)]
    InvalidTransition(#[from] TransitionError),
}

impl SupervisorError {
    /// Machine readable error code
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::MissingMandatoryTool { .. } => "MISSING_MANDATORY_TOOL",
            Self::MissingOptionalTool { .. } => "MISSING_OPTIONAL_TOOL",
            Self::Spawn { .. } => "SPAWN_FAILED",
            Self::ChildTermination { .. } => "CHILD_TERMINATION_FAILED",
            Self::InvalidTransition(_) => "INVALID_TRANSITION",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_and_messages() {
        let missing = SupervisorError::MissingMandatoryTool {
            tool: "node".into(),
            hint: "https://nodejs.org/".into(),
        };
        assert_eq!(missing.error_code(), "MISSING_MANDATORY_TOOL");
        assert!(missing.to_string().contains("https://nodejs.org/"));

        let optional = SupervisorError::MissingOptionalTool {
            role: Role::Tunnel,
            tool: "ngrok".into(),
        };
        assert_eq!(optional.error_code(), "MISSING_OPTIONAL_TOOL");
        assert_eq!(optional.to_string(), "Tunnel: 'ngrok' is not installed");

        let stop = SupervisorError::ChildTermination {
            role: Role::Frontend,
            reason: "timed out".into(),
        };
        assert_eq!(stop.error_code(), "CHILD_TERMINATION_FAILED");
        assert_eq!(stop.to_string(), "failed to stop Frontend: timed out");
    }

    #[test]
    fn test_spawn_error_keeps_source() {
        let err = SupervisorError::Spawn {
            role: Role::Backend,
            source: io::Error::new(io::ErrorKind::NotFound, "npx"),
        };
        assert!(std::error::Error::source(&err).is_some());
        assert_eq!(err.error_code(), "SPAWN_FAILED");
    }
}
