//! Component lifecycle: phases and the capability traits components
//! implement for them.

use async_trait::async_trait;
use serde::Serialize;
use tbench_env::{ComponentPath, HarnessError};

/// Lifecycle phase of a test. Strictly sequential, no skipping, no re-entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Phase {
    Unbuilt,
    Built,
    Connected,
    Running,
    Done,
}

impl Phase {
    /// Returns the only phase reachable from this one.
    pub fn next(&self) -> Option<Phase> {
        match self {
            Phase::Unbuilt => Some(Phase::Built),
            Phase::Built => Some(Phase::Connected),
            Phase::Connected => Some(Phase::Running),
            Phase::Running => Some(Phase::Done),
            Phase::Done => None,
        }
    }

    /// Returns the phase name.
    pub fn name(&self) -> &'static str {
        match self {
            Phase::Unbuilt => "unbuilt",
            Phase::Built => "built",
            Phase::Connected => "connected",
            Phase::Running => "running",
            Phase::Done => "done",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Enforces the phase state machine for one component.
#[derive(Debug)]
pub struct PhaseTracker {
    path: ComponentPath,
    current: Phase,
}

impl PhaseTracker {
    /// Creates a tracker in the `Unbuilt` phase.
    pub fn new(path: ComponentPath) -> Self {
        Self {
            path,
            current: Phase::Unbuilt,
        }
    }

    /// Returns the current phase.
    pub fn current(&self) -> Phase {
        self.current
    }

    /// Moves to `to`, which must be the immediate successor.
    pub fn advance(&mut self, to: Phase) -> Result<(), HarnessError> {
        if self.current.next() != Some(to) {
            return Err(HarnessError::Phase {
                component: self.path.clone(),
                from: self.current.to_string(),
                to: to.to_string(),
            });
        }
        self.current = to;
        Ok(())
    }

    /// Fails unless the current phase is `expected`.
    pub fn expect(&self, expected: Phase) -> Result<(), HarnessError> {
        if self.current != expected {
            return Err(HarnessError::Phase {
                component: self.path.clone(),
                from: self.current.to_string(),
                to: expected.next().unwrap_or(expected).to_string(),
            });
        }
        Ok(())
    }
}

/// A component constructed during the build phase.
///
/// Dependencies (boundary ports, context, reference model) are injected
/// through `Deps` by the parent; nothing is looked up by name.
pub trait Buildable: Sized {
    /// Everything the component needs from its parent.
    type Deps;

    /// Constructs the component (and its children).
    fn build(path: ComponentPath, deps: Self::Deps) -> Result<Self, HarnessError>;
}

/// A component that wires its children during the connect phase.
///
/// Implementations connect their children first and only then their own
/// links, so completion propagates bottom-up.
pub trait Connectable {
    fn connect(&mut self) -> Result<(), HarnessError>;
}

/// A stage that runs concurrently during the run phase.
#[async_trait]
pub trait Runnable: Send + Sized + 'static {
    /// Value produced when the stage finishes on its own.
    type Output: Send + 'static;

    /// Returns the stage's component path.
    fn path(&self) -> &ComponentPath;

    /// Runs the stage to completion (or forever, for perpetual stages).
    async fn run(self) -> Result<Self::Output, HarnessError>;
}
