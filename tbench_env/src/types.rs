//! Common types for the tbench environment abstraction.

use serde::{Deserialize, Serialize};

/// Hierarchical name of a testbench component, e.g. `test.env.agent.driver`.
///
/// Components receive their path from their parent at build time. It is
/// only used for identification in logs and errors; nothing is ever looked
/// up by name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ComponentPath(Vec<String>);

impl ComponentPath {
    /// Creates a top-level path.
    pub fn root(name: impl Into<String>) -> Self {
        Self(vec![name.into()])
    }

    /// Creates the path of a child component.
    pub fn child(&self, name: impl Into<String>) -> Self {
        let mut segments = self.0.clone();
        segments.push(name.into());
        Self(segments)
    }

    /// Returns the leaf name.
    pub fn name(&self) -> &str {
        self.0.last().map(String::as_str).unwrap_or("")
    }

    /// Returns the nesting depth (root = 1).
    pub fn depth(&self) -> usize {
        self.0.len()
    }
}

impl std::fmt::Display for ComponentPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.join("."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_child_paths() {
        let root = ComponentPath::root("test");
        let driver = root.child("env").child("agent").child("driver");

        assert_eq!(driver.to_string(), "test.env.agent.driver");
        assert_eq!(driver.name(), "driver");
        assert_eq!(driver.depth(), 4);
        assert_eq!(root.depth(), 1);
    }
}
