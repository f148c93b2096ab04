//! Agent: one driver, one monitor and the sequencer feeding the driver.

use crate::analysis::Subscriber;
use crate::driver::{Driver, DriverDeps};
use crate::interface::VirtualInterface;
use crate::monitor::{Monitor, MonitorDeps};
use crate::phase::{Buildable, Connectable};
use crate::sequencer::{sequencer, SeqItemPort, SequencerHandle};
use crate::timeline::Timeline;
use std::sync::Arc;
use std::time::Duration;
use tbench_env::{ComponentPath, HarnessContext, HarnessError};
use tracing::debug;

/// Dependencies injected by the environment.
pub struct AgentDeps<Ctx: HarnessContext> {
    pub ctx: Arc<Ctx>,
    pub interface: Arc<VirtualInterface>,
    pub settle_delay: Duration,
    pub timeline: Arc<Timeline>,
}

/// Reusable driver + monitor + sequencer bundle for one boundary.
pub struct Agent<Ctx: HarnessContext> {
    path: ComponentPath,
    sequencer: SequencerHandle,

    /// Consumer half, moved into the driver at connect time
    seq_item_port: Option<SeqItemPort>,

    /// Stages, moved out when the run phase starts
    driver: Option<Driver<Ctx>>,
    monitor: Option<Monitor<Ctx>>,
}

impl<Ctx: HarnessContext> Buildable for Agent<Ctx> {
    type Deps = AgentDeps<Ctx>;

    fn build(path: ComponentPath, deps: Self::Deps) -> Result<Self, HarnessError> {
        let (handle, port) = sequencer(path.child("sequencer"));

        let driver = Driver::build(
            path.child("driver"),
            DriverDeps {
                ctx: Arc::clone(&deps.ctx),
                interface: Arc::clone(&deps.interface),
                settle_delay: deps.settle_delay,
                timeline: Arc::clone(&deps.timeline),
            },
        )?;

        let monitor = Monitor::build(
            path.child("monitor"),
            MonitorDeps {
                ctx: deps.ctx,
                interface: deps.interface,
                timeline: deps.timeline,
            },
        )?;

        debug!(component = %path, "built");
        Ok(Self {
            path,
            sequencer: handle,
            seq_item_port: Some(port),
            driver: Some(driver),
            monitor: Some(monitor),
        })
    }
}

impl<Ctx: HarnessContext> Connectable for Agent<Ctx> {
    fn connect(&mut self) -> Result<(), HarnessError> {
        let port = self
            .seq_item_port
            .take()
            .ok_or_else(|| HarnessError::configuration(&self.path, "agent connected twice"))?;

        self.driver
            .as_mut()
            .ok_or_else(|| HarnessError::configuration(&self.path, "driver already started"))?
            .connect_port(port)?;

        debug!(component = %self.path, "connected");
        Ok(())
    }
}

impl<Ctx: HarnessContext> Agent<Ctx> {
    /// Producer-facing handle of the sequencer, for the generator.
    pub fn sequencer(&self) -> SequencerHandle {
        self.sequencer.clone()
    }

    /// Subscribes to the monitor's analysis port.
    pub fn subscribe(&mut self, subscriber: Arc<dyn Subscriber>) -> Result<(), HarnessError> {
        self.monitor
            .as_mut()
            .ok_or_else(|| HarnessError::configuration(&self.path, "monitor already started"))?
            .subscribe(subscriber);
        Ok(())
    }

    /// Moves the driver and monitor out for the run phase.
    pub fn take_stages(&mut self) -> Result<(Driver<Ctx>, Monitor<Ctx>), HarnessError> {
        match (self.driver.take(), self.monitor.take()) {
            (Some(driver), Some(monitor)) => Ok((driver, monitor)),
            _ => Err(HarnessError::configuration(
                &self.path,
                "stages already started",
            )),
        }
    }

    pub fn path(&self) -> &ComponentPath {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::SimContext;
    use crate::dut::RippleAdder;
    use crate::transaction::Width;

    fn build_agent(vif: &Arc<VirtualInterface>) -> Result<Agent<SimContext>, HarnessError> {
        Agent::build(
            ComponentPath::root("env").child("agent"),
            AgentDeps {
                ctx: SimContext::shared(1),
                interface: Arc::clone(vif),
                settle_delay: Duration::from_nanos(1_000),
                timeline: Arc::new(Timeline::default()),
            },
        )
    }

    fn interface() -> Arc<VirtualInterface> {
        let width = Width::new(4).unwrap();
        let dut = Box::new(RippleAdder::new(width));
        VirtualInterface::shared(ComponentPath::root("vif"), width, dut)
    }

    #[test]
    fn test_connect_wires_driver() {
        let vif = interface();
        let mut agent = build_agent(&vif).unwrap();
        agent.connect().unwrap();

        let (driver, _monitor) = agent.take_stages().unwrap();
        assert!(driver.is_connected());
    }

    #[test]
    fn test_connect_twice_is_rejected() {
        let vif = interface();
        let mut agent = build_agent(&vif).unwrap();
        agent.connect().unwrap();
        assert!(agent.connect().is_err());
    }

    #[test]
    fn test_two_agents_on_one_boundary_fail_to_build() {
        let vif = interface();
        let _first = build_agent(&vif).unwrap();
        let err = build_agent(&vif).err().unwrap();

        assert!(matches!(err, HarnessError::Configuration { .. }));
        assert_eq!(err.component().map(|p| p.name()), Some("driver"));
    }

    #[test]
    fn test_stages_taken_once() {
        let vif = interface();
        let mut agent = build_agent(&vif).unwrap();
        assert!(agent.take_stages().is_ok());
        assert!(agent.take_stages().is_err());
        assert!(agent.subscribe(Arc::new(|_: &crate::transaction::Transaction| {})).is_err());
    }
}
