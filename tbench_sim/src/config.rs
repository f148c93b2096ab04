//! Harness configuration.

use crate::generator::DEFAULT_ITERATIONS;
use crate::transaction::{Constraints, OperandRange, Width};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tbench_env::{ComponentPath, HarnessError};

/// Stages a transaction crosses after its handoff completes (drive settle,
/// then sample). The default drain delay covers both.
pub const PIPELINE_DEPTH: u32 = 2;

/// Optional operand ranges; missing ranges mean "full width".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstraintConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub a: Option<OperandRange>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub b: Option<OperandRange>,
}

/// Configuration for a verification run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Master seed for determinism
    pub seed: u64,

    /// Operand width W in bits
    pub width: u32,

    /// Number of random transactions
    pub iterations: usize,

    /// Boundary settle latency in nanoseconds (one time unit)
    pub settle_delay_ns: u64,

    /// Wind-down after the last handoff; defaults to settle × pipeline depth
    pub drain_delay_ns: Option<u64>,

    /// Randomization constraints
    pub constraints: ConstraintConfig,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            width: 4,
            iterations: DEFAULT_ITERATIONS,
            settle_delay_ns: 1_000,
            drain_delay_ns: None,
            constraints: ConstraintConfig::default(),
        }
    }
}

impl HarnessConfig {
    /// Loads a configuration from a JSON file. Missing fields take defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, HarnessError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&text)
    }

    /// Parses a configuration from JSON text.
    pub fn from_json(text: &str) -> Result<Self, HarnessError> {
        serde_json::from_str(text).map_err(|e| {
            HarnessError::configuration(&ComponentPath::root("config"), e.to_string())
        })
    }

    /// Returns the validated operand width.
    pub fn width(&self, component: &ComponentPath) -> Result<Width, HarnessError> {
        Width::new(self.width).map_err(|reason| HarnessError::configuration(component, reason))
    }

    /// Returns the validated constraints, filling unset ranges with the full width.
    pub fn constraints(&self, component: &ComponentPath) -> Result<Constraints, HarnessError> {
        let width = self.width(component)?;
        let full = Constraints::full(width);
        let constraints = Constraints {
            a: self.constraints.a.unwrap_or(full.a),
            b: self.constraints.b.unwrap_or(full.b),
        };

        constraints
            .check(width)
            .map_err(|reason| HarnessError::configuration(component, reason))?;
        Ok(constraints)
    }

    /// Checks every field; the first problem wins.
    pub fn validate(&self, component: &ComponentPath) -> Result<(), HarnessError> {
        self.constraints(component)?;
        if self.settle_delay_ns == 0 {
            return Err(HarnessError::configuration(
                component,
                "settle delay must be at least 1ns",
            ));
        }
        Ok(())
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_nanos(self.settle_delay_ns)
    }

    pub fn drain_delay(&self) -> Duration {
        match self.drain_delay_ns {
            Some(ns) => Duration::from_nanos(ns),
            None => self.settle_delay() * PIPELINE_DEPTH,
        }
    }
}
