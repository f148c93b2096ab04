//! Scenario runner - sets up and executes verification scenarios.

use crate::config::HarnessConfig;
use crate::context::SimContext;
use crate::controller::{RunReport, TestController};
use crate::dut::{CarryDropAdder, Dut, RippleAdder, StuckAtZero};
use crate::generator::Stimulus;
use crate::scenarios::ScenarioId;
use crate::timeline::TimelineEvent;
use crate::transaction::{OperandRange, Width};
use std::sync::Arc;
use tbench_env::{ComponentPath, HarnessContext, HarnessError, TokioContext};
use tracing::{debug, info};

/// Results from running a scenario.
#[derive(Debug, Clone)]
pub struct ScenarioResult {
    /// Scenario that was run
    pub scenario: ScenarioId,

    /// Seed used
    pub seed: u64,

    /// Whether the harness reported what the scenario expects
    pub as_expected: bool,

    /// Failure message if any
    pub failure_reason: Option<String>,

    /// The test controller's report
    pub report: RunReport,

    /// Stage events, for export
    pub timeline: Vec<TimelineEvent>,

    /// Stage events past the timeline limit
    pub timeline_dropped: u64,
}

/// Runs scenarios against a base configuration.
pub struct ScenarioRunner {
    config: HarnessConfig,

    /// Use the wall clock instead of the virtual clock
    realtime: bool,
}

impl ScenarioRunner {
    /// Creates a new scenario runner.
    pub fn new(config: HarnessConfig) -> Self {
        Self {
            config,
            realtime: false,
        }
    }

    /// Selects the wall-clock context.
    pub fn with_realtime(mut self, realtime: bool) -> Self {
        self.realtime = realtime;
        self
    }

    /// Overrides the seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.config.seed = seed;
        self
    }

    /// Runs a scenario and returns the result.
    ///
    /// # Errors
    /// Configuration errors and protocol violations. Mismatches are part
    /// of the result, not errors.
    pub async fn run(&self, scenario: ScenarioId) -> Result<ScenarioResult, HarnessError> {
        info!("Starting scenario: {} (seed={})", scenario.name(), self.config.seed);
        debug!("  {}", scenario.description());

        if self.realtime {
            self.run_with(scenario, TokioContext::shared(self.config.seed)).await
        } else {
            self.run_with(scenario, SimContext::shared(self.config.seed)).await
        }
    }

    async fn run_with<Ctx: HarnessContext>(
        &self,
        scenario: ScenarioId,
        ctx: Arc<Ctx>,
    ) -> Result<ScenarioResult, HarnessError> {
        let path = ComponentPath::root(scenario.name());
        let width = self.config.width(&path)?;
        let (config, dut, stimulus) = self.setup(scenario, width);

        let test = TestController::new(scenario.name(), ctx, config, dut)?;
        let test = match stimulus {
            Some(stimulus) => test.with_stimulus(stimulus),
            None => test,
        };
        let timeline = test.timeline();
        let report = test.execute().await?;

        let failure_reason = judge(scenario, &report);
        Ok(ScenarioResult {
            scenario,
            seed: self.config.seed,
            as_expected: failure_reason.is_none(),
            failure_reason,
            report,
            timeline: timeline.events(),
            timeline_dropped: timeline.dropped(),
        })
    }

    /// Picks the DUT, stimulus and constraints for a scenario.
    fn setup(
        &self,
        scenario: ScenarioId,
        width: Width,
    ) -> (HarnessConfig, Box<dyn Dut>, Option<Stimulus>) {
        let mut config = self.config.clone();
        let max = width.max_operand();

        match scenario {
            ScenarioId::Smoke => {
                // 5 + 3 only fits from W=3 up; scale down for narrower boundaries
                let pair = (5.min(max), 3.min(max));
                (config, Box::new(RippleAdder::new(width)), Some(Stimulus::Directed(vec![pair])))
            }
            ScenarioId::MaxOperands => (
                config,
                Box::new(RippleAdder::new(width)),
                Some(Stimulus::Directed(vec![(max, max)])),
            ),
            ScenarioId::Random => (config, Box::new(RippleAdder::new(width)), None),
            ScenarioId::Empty => {
                config.iterations = 0;
                (config, Box::new(RippleAdder::new(width)), None)
            }
            ScenarioId::StuckOutput => {
                // Keep every sum nonzero so every verdict must fail
                config.constraints.a = Some(OperandRange::new(1, max));
                (config, Box::new(StuckAtZero), None)
            }
            ScenarioId::CarryDrop => {
                // Upper half only: every sum carries out
                let half = 1u64 << (width.bits() - 1);
                config.constraints.a = Some(OperandRange::new(half, max));
                config.constraints.b = Some(OperandRange::new(half, max));
                (config, Box::new(CarryDropAdder::new(width)), None)
            }
        }
    }
}

/// Returns why a report does not match the scenario's expectation.
fn judge(scenario: ScenarioId, report: &RunReport) -> Option<String> {
    if !report.is_complete() {
        return Some(format!(
            "{} of {} transactions scored",
            report.verdicts, report.generated
        ));
    }

    if scenario.expects_failures() {
        if report.failures != report.generated {
            return Some(format!(
                "fault went unnoticed: {} of {} verdicts failed",
                report.failures, report.generated
            ));
        }
        return None;
    }

    if report.failures > 0 {
        return Some(format!(
            "{} mismatch(es) against the reference model",
            report.failures
        ));
    }
    None
}
