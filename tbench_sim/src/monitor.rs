//! Monitor: samples the boundary after every settled cycle and publishes
//! what it saw.

use crate::analysis::{AnalysisPort, Subscriber};
use crate::interface::{SamplePort, VirtualInterface};
use crate::phase::{Buildable, Runnable};
use crate::timeline::{Stage, Timeline};
use crate::transaction::Transaction;
use async_trait::async_trait;
use std::sync::Arc;
use tbench_env::{ComponentPath, HarnessContext, HarnessError};
use tracing::info;

/// Dependencies injected by the agent.
pub struct MonitorDeps<Ctx: HarnessContext> {
    pub ctx: Arc<Ctx>,
    pub interface: Arc<VirtualInterface>,
    pub timeline: Arc<Timeline>,
}

/// Passive observer of the boundary. Perpetual; torn down by the test
/// controller.
pub struct Monitor<Ctx: HarnessContext> {
    path: ComponentPath,
    ctx: Arc<Ctx>,
    port: SamplePort,
    analysis_port: AnalysisPort,
    timeline: Arc<Timeline>,
}

impl<Ctx: HarnessContext> Buildable for Monitor<Ctx> {
    type Deps = MonitorDeps<Ctx>;

    fn build(path: ComponentPath, deps: Self::Deps) -> Result<Self, HarnessError> {
        let port = deps.interface.claim_sample_port(&path)?;
        let analysis_port = AnalysisPort::new(path.child("ap"));

        Ok(Self {
            path,
            ctx: deps.ctx,
            port,
            analysis_port,
            timeline: deps.timeline,
        })
    }
}

impl<Ctx: HarnessContext> Monitor<Ctx> {
    /// Registers an observer of sampled transactions.
    pub fn subscribe(&mut self, subscriber: Arc<dyn Subscriber>) {
        self.analysis_port.subscribe(subscriber);
    }

    /// Returns the publication point.
    pub fn analysis_port(&self) -> &AnalysisPort {
        &self.analysis_port
    }
}

#[async_trait]
impl<Ctx: HarnessContext> Runnable for Monitor<Ctx> {
    type Output = ();

    fn path(&self) -> &ComponentPath {
        &self.path
    }

    async fn run(mut self) -> Result<(), HarnessError> {
        loop {
            let cycle = self.port.wait_settled().await?;
            let sample = self.port.sample()?;
            let txn = Transaction::observed(sample.tag, sample.a, sample.b, sample.y);
            self.timeline.record(Stage::Sample, txn.id);

            info!(
                component = %self.path,
                cycle,
                t_ns = self.ctx.now().as_nanos() as u64,
                "sample {}",
                txn
            );

            // Subscribers finish before the next cycle may be driven
            self.analysis_port.publish(&txn);
            self.port.acknowledge();
        }
    }
}
