//! Error types for the tbench harness.

use crate::types::ComponentPath;
use thiserror::Error;

/// Errors that stop a verification run.
///
/// Scoreboard mismatches are deliberately absent: they are verdicts, not
/// errors, and never interrupt the pipeline.
#[derive(Debug, Error)]
pub enum HarnessError {
    /// A component could not be built or connected (missing boundary
    /// handle, unconnected port, invalid width...). Fatal, never retried.
    #[error("Configuration error in {component}: {reason}")]
    Configuration {
        component: ComponentPath,
        reason: String,
    },

    /// A component broke a handoff or sampling contract. Always a defect.
    #[error("Protocol violation in {component}: {reason}")]
    ProtocolViolation {
        component: ComponentPath,
        reason: String,
    },

    /// Illegal lifecycle transition.
    #[error("Phase error in {component}: cannot go from {from} to {to}")]
    Phase {
        component: ComponentPath,
        from: String,
        to: String,
    },

    /// A perpetual stage (driver, monitor) stopped on its own.
    #[error("Stage {component} aborted: {reason}")]
    StageAborted {
        component: ComponentPath,
        reason: String,
    },

    /// Reading a config file or writing an export failed.
    #[error("I/O error: {0}")]
    Io(String),
}

impl HarnessError {
    /// Creates a configuration error.
    pub fn configuration(component: &ComponentPath, reason: impl Into<String>) -> Self {
        Self::Configuration {
            component: component.clone(),
            reason: reason.into(),
        }
    }

    /// Creates a protocol violation.
    pub fn protocol(component: &ComponentPath, reason: impl Into<String>) -> Self {
        Self::ProtocolViolation {
            component: component.clone(),
            reason: reason.into(),
        }
    }

    /// Creates a stage-aborted error.
    pub fn aborted(component: &ComponentPath, reason: impl std::fmt::Display) -> Self {
        Self::StageAborted {
            component: component.clone(),
            reason: reason.to_string(),
        }
    }

    /// Returns the offending component, if the error names one.
    pub fn component(&self) -> Option<&ComponentPath> {
        match self {
            Self::Configuration { component, .. }
            | Self::ProtocolViolation { component, .. }
            | Self::Phase { component, .. }
            | Self::StageAborted { component, .. } => Some(component),
            Self::Io(_) => None,
        }
    }
}

impl From<std::io::Error> for HarnessError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_names_component() {
        let path = ComponentPath::root("test").child("env").child("agent").child("driver");
        let err = HarnessError::configuration(&path, "no drive port");

        assert_eq!(err.component(), Some(&path));
        assert_eq!(
            err.to_string(),
            "Configuration error in test.env.agent.driver: no drive port"
        );
    }

    #[test]
    fn test_io_error_has_no_component() {
        let err: HarnessError = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert!(err.component().is_none());
    }
}
