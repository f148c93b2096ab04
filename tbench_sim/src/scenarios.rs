//! Named verification scenarios.

use thiserror::Error;

/// Scenario identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioId {
    /// TB-001: a=5, b=3 must read back 8
    Smoke,

    /// TB-002: both operands at their maximum, exercising the carry-out
    MaxOperands,

    /// TB-003: constrained-random run against a correct adder
    Random,

    /// TB-004: zero iterations; only the drain delay elapses
    Empty,

    /// TB-005: output tied low, every verdict must fail
    StuckOutput,

    /// TB-006: carry-out not wired, every carrying sum must fail
    CarryDrop,
}

/// Unknown scenario name.
#[derive(Debug, Error)]
#[error("Unknown scenario: {0}")]
pub struct UnknownScenario(pub String);

impl ScenarioId {
    /// Returns a list of all scenarios.
    pub fn all() -> Vec<ScenarioId> {
        vec![
            ScenarioId::Smoke,
            ScenarioId::MaxOperands,
            ScenarioId::Random,
            ScenarioId::Empty,
            ScenarioId::StuckOutput,
            ScenarioId::CarryDrop,
        ]
    }

    /// Returns the scenario name.
    pub fn name(&self) -> &'static str {
        match self {
            ScenarioId::Smoke => "smoke",
            ScenarioId::MaxOperands => "max_operands",
            ScenarioId::Random => "random",
            ScenarioId::Empty => "empty",
            ScenarioId::StuckOutput => "stuck_output",
            ScenarioId::CarryDrop => "carry_drop",
        }
    }

    /// Returns a description of the scenario.
    pub fn description(&self) -> &'static str {
        match self {
            ScenarioId::Smoke => "Directed 5 + 3, expect y=8 and a PASS verdict",
            ScenarioId::MaxOperands => "Directed max + max, expect the carry-out bit set",
            ScenarioId::Random => "Constrained-random operands against the ripple adder",
            ScenarioId::Empty => "No stimulus, run completes after the drain delay",
            ScenarioId::StuckOutput => "DUT output stuck at zero, every nonzero sum fails",
            ScenarioId::CarryDrop => "DUT drops the carry-out, every overflowing sum fails",
        }
    }

    /// Returns true if the scenario injects a DUT fault, so a correct
    /// harness must report mismatches.
    pub fn expects_failures(&self) -> bool {
        matches!(self, ScenarioId::StuckOutput | ScenarioId::CarryDrop)
    }
}

impl std::fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for ScenarioId {
    type Err = UnknownScenario;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "smoke" | "tb-001" => Ok(ScenarioId::Smoke),
            "max_operands" | "maxoperands" | "max" | "tb-002" => Ok(ScenarioId::MaxOperands),
            "random" | "tb-003" => Ok(ScenarioId::Random),
            "empty" | "tb-004" => Ok(ScenarioId::Empty),
            "stuck_output" | "stuckoutput" | "stuck" | "tb-005" => Ok(ScenarioId::StuckOutput),
            "carry_drop" | "carrydrop" | "tb-006" => Ok(ScenarioId::CarryDrop),
            _ => Err(UnknownScenario(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_roundtrip() {
        for id in ScenarioId::all() {
            assert_eq!(id.name().parse::<ScenarioId>().unwrap(), id);
            assert!(!id.description().is_empty());
        }
    }

    #[test]
    fn test_aliases() {
        assert_eq!("TB-005".parse::<ScenarioId>().unwrap(), ScenarioId::StuckOutput);
        assert_eq!("max".parse::<ScenarioId>().unwrap(), ScenarioId::MaxOperands);
    }

    #[test]
    fn test_unknown_scenario() {
        let err = "warp_drive".parse::<ScenarioId>().unwrap_err();
        assert_eq!(err.to_string(), "Unknown scenario: warp_drive");
    }

    #[test]
    fn test_fault_scenarios() {
        let faulty: Vec<_> = ScenarioId::all()
            .into_iter()
            .filter(ScenarioId::expects_failures)
            .collect();
        assert_eq!(faulty, vec![ScenarioId::StuckOutput, ScenarioId::CarryDrop]);
    }
}
