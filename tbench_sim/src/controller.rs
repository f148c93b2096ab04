//! Test controller: owns the environment and the generator and runs the
//! build → connect → run lifecycle.

use crate::config::HarnessConfig;
use crate::coverage::CoverageReport;
use crate::dut::Dut;
use crate::env::{Environment, EnvironmentDeps};
use crate::generator::{Generator, GeneratorDeps, Stimulus};
use crate::interface::VirtualInterface;
use crate::objection::Objection;
use crate::phase::{Buildable, Connectable, Phase, PhaseTracker, Runnable};
use crate::reference::{AdderModel, ReferenceModel};
use crate::scoreboard::Mismatch;
use crate::timeline::Timeline;
use crate::transaction::Width;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tbench_env::{ComponentPath, HarnessContext, HarnessError};
use tokio::task::{JoinError, JoinHandle};
use tracing::{error, info, warn};
use uuid::Uuid;

/// End-of-run summary, for people and for automation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// Unique id of this run
    pub run_id: Uuid,

    /// Test name (root component)
    pub test: String,

    /// DUT behind the boundary
    pub dut: String,

    /// Reference model the scoreboard used
    pub reference: String,

    pub seed: u64,
    pub width: u32,

    /// Transactions handed off by the generator
    pub generated: u64,

    /// Cycles driven onto the boundary
    pub driven: u64,

    /// Cycles sampled by the monitor
    pub sampled: u64,

    /// Scoreboard verdicts
    pub verdicts: u64,

    /// Passing verdicts
    pub passes: u64,

    /// Failing verdicts
    pub failures: u64,

    /// First recorded mismatches
    pub mismatches: Vec<Mismatch>,

    pub coverage: CoverageReport,

    /// Harness time at the end of the run (ns)
    pub elapsed_ns: u64,

    /// No mismatches and one verdict per generated transaction
    pub passed: bool,
}

impl RunReport {
    /// Returns true if every generated transaction received a verdict.
    pub fn is_complete(&self) -> bool {
        self.verdicts == self.generated
    }
}

/// Owns the component tree and drives its lifecycle.
///
/// ```text
/// Unbuilt --build--> Built --connect--> Connected --run--> Running --> Done
/// ```
pub struct TestController<Ctx: HarnessContext> {
    path: ComponentPath,
    ctx: Arc<Ctx>,
    config: HarnessConfig,
    width: Width,
    phase: PhaseTracker,
    interface: Arc<VirtualInterface>,
    model: Arc<dyn ReferenceModel>,
    stimulus: Stimulus,
    timeline: Arc<Timeline>,
    objection: Objection,
    env: Option<Environment<Ctx>>,
    generator: Option<Generator<Ctx>>,
}

impl<Ctx: HarnessContext> TestController<Ctx> {
    /// Creates a test around `dut`. The boundary is created here and
    /// injected into the environment at build time.
    ///
    /// Defaults: adder reference model, `config.iterations` random
    /// transactions.
    ///
    /// All randomness comes from `ctx`, so the context's seed is the one
    /// the run uses and reports. `config.seed` is what callers build the
    /// context from; a mismatch is logged.
    pub fn new(
        name: &str,
        ctx: Arc<Ctx>,
        config: HarnessConfig,
        dut: Box<dyn Dut>,
    ) -> Result<Self, HarnessError> {
        let path = ComponentPath::root(name);
        config.validate(&path)?;
        let width = config.width(&path)?;
        if config.seed != ctx.seed() {
            warn!(
                component = %path,
                config_seed = config.seed,
                context_seed = ctx.seed(),
                "config seed ignored, running with the context seed"
            );
        }

        let interface = VirtualInterface::shared(path.child("vif"), width, dut);
        let timeline = {
            let ctx = Arc::clone(&ctx);
            Arc::new(Timeline::with_clock(move || ctx.now()))
        };

        Ok(Self {
            phase: PhaseTracker::new(path.clone()),
            objection: Objection::new(path.child("objection")),
            stimulus: Stimulus::Random {
                count: config.iterations,
            },
            model: Arc::new(AdderModel::new(width)),
            path,
            ctx,
            config,
            width,
            interface,
            timeline,
            env: None,
            generator: None,
        })
    }

    /// Replaces the reference model.
    pub fn with_reference(mut self, model: Arc<dyn ReferenceModel>) -> Self {
        self.model = model;
        self
    }

    /// Replaces the stimulus.
    pub fn with_stimulus(mut self, stimulus: Stimulus) -> Self {
        self.stimulus = stimulus;
        self
    }

    pub fn phase(&self) -> Phase {
        self.phase.current()
    }

    pub fn timeline(&self) -> Arc<Timeline> {
        Arc::clone(&self.timeline)
    }

    pub fn objection(&self) -> &Objection {
        &self.objection
    }

    /// Build phase: environment (and its agent, driver, monitor,
    /// scoreboard), then the generator.
    pub fn build(&mut self) -> Result<(), HarnessError> {
        self.phase.expect(Phase::Unbuilt)?;

        let env = Environment::build(
            self.path.child("env"),
            EnvironmentDeps {
                ctx: Arc::clone(&self.ctx),
                interface: Arc::clone(&self.interface),
                model: Arc::clone(&self.model),
                settle_delay: self.config.settle_delay(),
                timeline: Arc::clone(&self.timeline),
            },
        )?;

        let generator = Generator::build(
            self.path.child("generator"),
            GeneratorDeps {
                ctx: Arc::clone(&self.ctx),
                stimulus: self.stimulus.clone(),
                width: self.width,
                constraints: self.config.constraints(&self.path)?,
                sequencer: env.agent().sequencer(),
                timeline: Arc::clone(&self.timeline),
            },
        )?;

        self.env = Some(env);
        self.generator = Some(generator);
        self.phase.advance(Phase::Built)?;
        info!(component = %self.path, "build phase complete");
        Ok(())
    }

    /// Run phase. Returns once the objection is cleared and every stage
    /// task has been torn down.
    pub async fn run(&mut self) -> Result<RunReport, HarnessError> {
        self.phase.advance(Phase::Running)?;

        let (driver, monitor) = self.env_mut()?.agent_mut().take_stages()?;
        let generator = self.generator.take().ok_or_else(|| {
            HarnessError::configuration(&self.path, "generator missing after build")
        })?;

        info!(
            component = %self.path,
            seed = self.ctx.seed(),
            planned = generator.planned(),
            "run phase started"
        );
        self.objection.raise(1);

        let driver_path = driver.path().clone();
        let monitor_path = monitor.path().clone();
        let generator_path = generator.path().clone();
        let sequencer_path = self.env_mut()?.agent().sequencer().path().clone();

        let mut driver_task = self.ctx.spawn("driver", driver.run());
        let mut monitor_task = self.ctx.spawn("monitor", monitor.run());
        let mut stimulus_task = self.ctx.spawn("generator", {
            let ctx = Arc::clone(&self.ctx);
            let objection = self.objection.clone();
            let drain = self.config.drain_delay();
            let mut probe = self.interface.probe();

            async move {
                let issued = generator.run().await?;

                // Let the last transaction reach the scoreboard
                ctx.sleep(drain).await;
                probe.wait_idle().await;

                objection.drop_objection(1)?;
                Ok::<u64, HarnessError>(issued)
            }
        });

        let mut issued = None;
        let outcome = loop {
            tokio::select! {
                biased;

                joined = &mut driver_task => {
                    break Err(stage_ended(joined, &driver_path));
                }
                joined = &mut monitor_task => {
                    break Err(stage_ended(joined, &monitor_path));
                }
                joined = &mut stimulus_task, if issued.is_none() => {
                    match flatten(joined, &generator_path) {
                        Ok(count) => issued = Some(count),
                        // The sequencer only fails once the driver has let go of
                        // its port, so the driver's own exit is the cause
                        Err(e) if e.component() == Some(&sequencer_path) => {
                            break Err(stage_ended((&mut driver_task).await, &driver_path));
                        }
                        Err(e) => break Err(e),
                    }
                }
                _ = self.objection.wait_cleared(), if issued.is_some() => {
                    break issued.ok_or_else(|| {
                        HarnessError::aborted(&self.path, "objection cleared early")
                    });
                }
            }
        };

        // Perpetual stages never stop on their own
        teardown(&driver_task, &monitor_task, &stimulus_task);

        let issued = match outcome {
            Ok(issued) => issued,
            Err(e) => {
                error!(component = %self.path, error = %e, "run aborted");
                return Err(e);
            }
        };

        let report = self.report(issued)?;
        self.phase.advance(Phase::Done)?;
        log_summary(&self.path, &report);
        Ok(report)
    }

    /// Runs all three phases.
    pub async fn execute(mut self) -> Result<RunReport, HarnessError> {
        self.build()?;
        self.connect()?;
        self.run().await
    }

    fn env_mut(&mut self) -> Result<&mut Environment<Ctx>, HarnessError> {
        let path = &self.path;
        self.env
            .as_mut()
            .ok_or_else(|| HarnessError::configuration(path, "environment not built"))
    }

    fn report(&self, issued: u64) -> Result<RunReport, HarnessError> {
        let env = self
            .env
            .as_ref()
            .ok_or_else(|| HarnessError::configuration(&self.path, "environment not built"))?;

        let score = env.scoreboard().report();
        let probe = self.interface.probe();

        let mut report = RunReport {
            run_id: Uuid::new_v4(),
            test: self.path.to_string(),
            dut: self.interface.dut_name(),
            reference: env.scoreboard().model_name().to_string(),
            seed: self.ctx.seed(),
            width: self.width.bits(),
            generated: issued,
            driven: probe.cycles_driven(),
            sampled: probe.cycles_sampled(),
            verdicts: score.checked,
            passes: score.passed,
            failures: score.failed,
            mismatches: score.mismatches,
            coverage: env.coverage().report(),
            elapsed_ns: self.ctx.now().as_nanos() as u64,
            passed: false,
        };
        report.passed = report.failures == 0 && report.is_complete();
        Ok(report)
    }
}

impl<Ctx: HarnessContext> Connectable for TestController<Ctx> {
    fn connect(&mut self) -> Result<(), HarnessError> {
        self.phase.expect(Phase::Built)?;
        self.env_mut()?.connect()?;
        self.phase.advance(Phase::Connected)?;
        info!(component = %self.path, "connect phase complete");
        Ok(())
    }
}

fn flatten<T>(
    joined: Result<Result<T, HarnessError>, JoinError>,
    path: &ComponentPath,
) -> Result<T, HarnessError> {
    joined.map_err(|e| HarnessError::aborted(path, e))?
}

/// Maps the end of a perpetual stage to the error that ends the run.
fn stage_ended(
    joined: Result<Result<(), HarnessError>, JoinError>,
    path: &ComponentPath,
) -> HarnessError {
    match flatten(joined, path) {
        Ok(()) => HarnessError::aborted(path, "stopped before the run phase ended"),
        Err(e) => e,
    }
}

fn teardown<A, B, C>(driver: &JoinHandle<A>, monitor: &JoinHandle<B>, stimulus: &JoinHandle<C>) {
    driver.abort();
    monitor.abort();
    stimulus.abort();
}

fn log_summary(path: &ComponentPath, report: &RunReport) {
    if report.passed {
        info!(
            component = %path,
            verdicts = report.verdicts,
            failures = report.failures,
            "TEST PASSED: {}/{} transactions matched",
            report.passes,
            report.generated
        );
        return;
    }

    if !report.is_complete() {
        warn!(
            component = %path,
            generated = report.generated,
            verdicts = report.verdicts,
            "not every transaction was scored"
        );
    }
    error!(
        component = %path,
        verdicts = report.verdicts,
        failures = report.failures,
        "TEST FAILED: {} mismatch(es) in {} transactions",
        report.failures,
        report.generated
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::SimContext;
    use crate::dut::{CarryDropAdder, RippleAdder, StuckAtZero};
    use crate::timeline::Stage;
    use std::time::Duration;
    use tbench_env::TokioContext;

    /// Panics on every evaluation.
    struct Exploding;

    impl Dut for Exploding {
        fn name(&self) -> &str {
            "exploding"
        }

        fn evaluate(&mut self, _a: u64, _b: u64) -> u64 {
            panic!("evaluate blew up");
        }
    }

    fn seeded(seed: u64, iterations: usize) -> HarnessConfig {
        HarnessConfig {
            seed,
            iterations,
            ..Default::default()
        }
    }

    fn config(iterations: usize) -> HarnessConfig {
        HarnessConfig {
            iterations,
            ..Default::default()
        }
    }

    fn adder() -> Box<dyn Dut> {
        Box::new(RippleAdder::new(Width::default()))
    }

    #[tokio::test]
    async fn test_random_run_passes() {
        let test =
            TestController::new("adder_test", SimContext::shared(42), config(10), adder()).unwrap();
        let report = test.execute().await.unwrap();

        assert!(report.passed);
        assert_eq!(report.generated, 10);
        assert_eq!(report.driven, 10);
        assert_eq!(report.sampled, 10);
        assert_eq!(report.verdicts, 10);
        assert_eq!(report.failures, 0);
        assert_eq!(report.dut, "ripple_adder");
        assert_eq!(report.reference, "adder");
    }

    #[tokio::test]
    async fn test_scenario_five_plus_three() {
        let test = TestController::new("smoke", SimContext::shared(1), config(0), adder())
            .unwrap()
            .with_stimulus(Stimulus::Directed(vec![(5, 3)]));
        let report = test.execute().await.unwrap();

        assert!(report.passed);
        assert_eq!(report.verdicts, 1);
        assert_eq!(report.coverage.samples, 1);
    }

    #[tokio::test]
    async fn test_scenario_max_operands_exercise_carry() {
        let test = TestController::new("max", SimContext::shared(1), config(0), adder())
            .unwrap()
            .with_stimulus(Stimulus::Directed(vec![(15, 15)]));
        let report = test.execute().await.unwrap();

        assert!(report.passed);
        assert_eq!(report.coverage.carry_out, 1);
    }

    #[tokio::test]
    async fn test_scenario_stuck_output_fails_but_completes() {
        let dut = Box::new(StuckAtZero);
        let test = TestController::new("stuck", SimContext::shared(3), config(0), dut)
            .unwrap()
            .with_stimulus(Stimulus::Directed(vec![(5, 3), (0, 0), (15, 15)]));
        let report = test.execute().await.unwrap();

        assert!(!report.passed);
        assert!(report.is_complete());
        assert_eq!(report.failures, 2);
        assert_eq!(report.passes, 1);
        assert_eq!(report.mismatches[0].expected, 8);
        assert_eq!(report.mismatches[0].actual, Some(0));
    }

    #[tokio::test]
    async fn test_scenario_zero_iterations() {
        let ctx = SimContext::shared(9);
        let test = TestController::new("empty", ctx.clone(), config(0), adder()).unwrap();
        let report = test.execute().await.unwrap();

        assert!(report.passed);
        assert_eq!(report.verdicts, 0);
        // Only the drain delay elapsed
        assert_eq!(ctx.time_ns(), 2_000);
    }

    #[tokio::test]
    async fn test_every_transaction_is_ordered() {
        let mut test =
            TestController::new("order", SimContext::shared(5), config(20), adder()).unwrap();
        let timeline = test.timeline();

        test.build().unwrap();
        test.connect().unwrap();
        let report = test.run().await.unwrap();
        assert_eq!(test.phase(), Phase::Done);
        assert_eq!(test.objection().count(), 0);

        assert_eq!(report.verdicts, 20);
        assert_eq!(timeline.count(Stage::Verdict), 20);
        for id in 0..20 {
            assert!(timeline.is_ordered(id), "transaction {id} out of order");
        }
    }

    #[tokio::test]
    async fn test_phases_cannot_be_skipped() {
        let mut test =
            TestController::new("phases", SimContext::shared(0), config(1), adder()).unwrap();
        assert_eq!(test.phase(), Phase::Unbuilt);

        assert!(matches!(test.connect(), Err(HarnessError::Phase { .. })));
        assert!(matches!(test.run().await, Err(HarnessError::Phase { .. })));

        test.build().unwrap();
        assert!(test.build().is_err());
        assert!(test.run().await.is_err());

        test.connect().unwrap();
        assert_eq!(test.phase(), Phase::Connected);
    }

    #[tokio::test]
    async fn test_custom_reference_model() {
        // Checking an adder against XOR: only carry-free pairs pass
        let test = TestController::new("xor", SimContext::shared(0), config(0), adder())
            .unwrap()
            .with_reference(Arc::new(|a: u64, b: u64| a ^ b))
            .with_stimulus(Stimulus::Directed(vec![(1, 2), (1, 1)]));
        let report = test.execute().await.unwrap();

        assert_eq!(report.passes, 1);
        assert_eq!(report.failures, 1);
        assert_eq!(report.reference, "custom");
    }

    #[tokio::test]
    async fn test_carry_drop_detected() {
        let test = TestController::new(
            "carry",
            SimContext::shared(0),
            config(0),
            Box::new(CarryDropAdder::new(Width::default())),
        )
        .unwrap()
        .with_stimulus(Stimulus::Directed(vec![(8, 8), (1, 2)]));
        let report = test.execute().await.unwrap();

        assert_eq!(report.failures, 1);
        assert_eq!(report.mismatches[0].a, 8);
    }

    #[tokio::test]
    async fn test_invalid_config_is_rejected_before_build() {
        let bad = HarnessConfig {
            width: 40,
            ..Default::default()
        };
        let err = TestController::new("bad", SimContext::shared(0), bad, adder())
            .err()
            .unwrap();
        assert!(matches!(err, HarnessError::Configuration { .. }));
    }

    #[tokio::test]
    async fn test_directed_pair_wider_than_boundary_fails_build() {
        let mut test = TestController::new("wide", SimContext::shared(0), config(0), adder())
            .unwrap()
            .with_stimulus(Stimulus::Directed(vec![(99, 0)]));
        let err = test.build().unwrap_err();
        assert_eq!(err.component().map(|p| p.name()), Some("generator"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wall_clock_context_run() {
        let ctx = TokioContext::shared(42);
        let test = TestController::new("tokio", ctx, config(5), adder()).unwrap();
        let report = test.execute().await.unwrap();

        assert!(report.passed);
        assert_eq!(report.verdicts, 5);
        assert!(report.elapsed_ns >= 5 * 1_000);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_multi_thread_runtime_run() {
        let test = TestController::new("mt", SimContext::shared(11), config(50), adder()).unwrap();
        let report = test.execute().await.unwrap();

        assert!(report.passed);
        assert_eq!(report.verdicts, 50);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_driver_failure_stops_the_run_and_names_the_driver() {
        for seed in 0..40 {
            let ctx = SimContext::shared(seed);
            let mut test =
                TestController::new("faulty", ctx, seeded(seed, 3), Box::new(Exploding)).unwrap();
            test.build().unwrap();
            test.connect().unwrap();

            let err = tokio::time::timeout(Duration::from_secs(10), test.run())
                .await
                .expect("run hung after the driver failed")
                .unwrap_err();

            assert!(matches!(err, HarnessError::StageAborted { .. }), "seed {seed}: {err}");
            assert_eq!(err.component().map(|p| p.name()), Some("driver"), "seed {seed}: {err}");
            assert_eq!(test.phase(), Phase::Running);
            assert_eq!(test.objection().count(), 1);
        }
    }

    #[tokio::test]
    async fn test_monitor_failure_stops_the_run_and_names_the_monitor() {
        let test = TestController::new("faulty", SimContext::shared(4), seeded(4, 3), adder())
            .unwrap()
            .with_reference(Arc::new(|_a: u64, _b: u64| -> u64 {
                panic!("reference model blew up")
            }));

        let err = tokio::time::timeout(Duration::from_secs(10), test.execute())
            .await
            .expect("run hung after the monitor failed")
            .unwrap_err();

        assert!(matches!(err, HarnessError::StageAborted { .. }));
        assert_eq!(err.component().map(|p| p.name()), Some("monitor"));
    }

    #[tokio::test]
    async fn test_report_carries_the_context_seed() {
        let test = TestController::new("seeds", SimContext::shared(99), seeded(1, 2), adder())
            .unwrap();
        let report = test.execute().await.unwrap();

        assert!(report.passed);
        assert_eq!(report.seed, 99);
    }
}
