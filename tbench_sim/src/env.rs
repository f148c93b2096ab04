//! Environment: the agent plus everything that listens to it.

use crate::agent::{Agent, AgentDeps};
use crate::coverage::CoverageCollector;
use crate::interface::VirtualInterface;
use crate::phase::{Buildable, Connectable};
use crate::reference::ReferenceModel;
use crate::scoreboard::{Scoreboard, ScoreboardDeps};
use crate::timeline::Timeline;
use std::sync::Arc;
use std::time::Duration;
use tbench_env::{ComponentPath, HarnessContext, HarnessError};
use tracing::debug;

/// Dependencies injected by the test controller.
pub struct EnvironmentDeps<Ctx: HarnessContext> {
    pub ctx: Arc<Ctx>,
    pub interface: Arc<VirtualInterface>,
    pub model: Arc<dyn ReferenceModel>,
    pub settle_delay: Duration,
    pub timeline: Arc<Timeline>,
}

pub struct Environment<Ctx: HarnessContext> {
    path: ComponentPath,
    agent: Agent<Ctx>,
    scoreboard: Arc<Scoreboard>,
    coverage: Arc<CoverageCollector>,
}

impl<Ctx: HarnessContext> Buildable for Environment<Ctx> {
    type Deps = EnvironmentDeps<Ctx>;

    fn build(path: ComponentPath, deps: Self::Deps) -> Result<Self, HarnessError> {
        let width = deps.interface.width();

        let agent = Agent::build(
            path.child("agent"),
            AgentDeps {
                ctx: deps.ctx,
                interface: deps.interface,
                settle_delay: deps.settle_delay,
                timeline: Arc::clone(&deps.timeline),
            },
        )?;

        let scoreboard = Scoreboard::build(
            path.child("scoreboard"),
            ScoreboardDeps {
                model: deps.model,
                timeline: deps.timeline,
            },
        )?;

        debug!(component = %path, "built");
        Ok(Self {
            path,
            agent,
            scoreboard: Arc::new(scoreboard),
            coverage: Arc::new(CoverageCollector::new(width)),
        })
    }
}

impl<Ctx: HarnessContext> Connectable for Environment<Ctx> {
    fn connect(&mut self) -> Result<(), HarnessError> {
        self.agent.connect()?;

        // Scoreboard first: verdicts are logged before coverage is sampled
        self.agent.subscribe(self.scoreboard.clone())?;
        self.agent.subscribe(self.coverage.clone())?;

        debug!(component = %self.path, "connected");
        Ok(())
    }
}

impl<Ctx: HarnessContext> Environment<Ctx> {
    pub fn agent(&self) -> &Agent<Ctx> {
        &self.agent
    }

    pub fn agent_mut(&mut self) -> &mut Agent<Ctx> {
        &mut self.agent
    }

    pub fn scoreboard(&self) -> &Arc<Scoreboard> {
        &self.scoreboard
    }

    pub fn coverage(&self) -> &Arc<CoverageCollector> {
        &self.coverage
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::SimContext;
    use crate::dut::RippleAdder;
    use crate::reference::AdderModel;
    use crate::transaction::Width;

    #[test]
    fn test_environment_build_and_connect() {
        let width = Width::new(4).unwrap();
        let dut = Box::new(RippleAdder::new(width));
        let vif = VirtualInterface::shared(ComponentPath::root("vif"), width, dut);

        let mut env = Environment::build(
            ComponentPath::root("test").child("env"),
            EnvironmentDeps {
                ctx: SimContext::shared(7),
                interface: vif,
                model: Arc::new(AdderModel::new(width)),
                settle_delay: Duration::from_nanos(1_000),
                timeline: Arc::new(Timeline::default()),
            },
        )
        .unwrap();

        env.connect().unwrap();
        assert_eq!(env.agent().path().to_string(), "test.env.agent");

        let (driver, monitor) = env.agent_mut().take_stages().unwrap();
        assert!(driver.is_connected());
        assert_eq!(monitor.analysis_port().subscriber_count(), 2);
        assert_eq!(env.scoreboard().report().checked, 0);
    }
}
