//! Driver: pulls transactions from the sequencer and applies them to the
//! boundary.

use crate::interface::{DrivePort, VirtualInterface};
use crate::phase::{Buildable, Runnable};
use crate::sequencer::SeqItemPort;
use crate::timeline::{Stage, Timeline};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tbench_env::{ComponentPath, HarnessContext, HarnessError};
use tracing::info;

/// Dependencies injected by the agent.
pub struct DriverDeps<Ctx: HarnessContext> {
    pub ctx: Arc<Ctx>,
    pub interface: Arc<VirtualInterface>,
    pub settle_delay: Duration,
    pub timeline: Arc<Timeline>,
}

/// Applies each transaction's operands, waits out the settle latency and
/// acknowledges it. Perpetual; torn down by the test controller.
pub struct Driver<Ctx: HarnessContext> {
    path: ComponentPath,
    ctx: Arc<Ctx>,
    port: DrivePort,
    seq_item_port: Option<SeqItemPort>,
    settle_delay: Duration,
    timeline: Arc<Timeline>,
}

impl<Ctx: HarnessContext> Buildable for Driver<Ctx> {
    type Deps = DriverDeps<Ctx>;

    /// Claims the boundary's drive port; a second driver on the same
    /// interface fails here, at build time.
    fn build(path: ComponentPath, deps: Self::Deps) -> Result<Self, HarnessError> {
        let port = deps.interface.claim_drive_port(&path)?;

        Ok(Self {
            path,
            ctx: deps.ctx,
            port,
            seq_item_port: None,
            settle_delay: deps.settle_delay,
            timeline: deps.timeline,
        })
    }
}

impl<Ctx: HarnessContext> Driver<Ctx> {
    /// Connects the consumer half of the sequencer.
    pub fn connect_port(&mut self, port: SeqItemPort) -> Result<(), HarnessError> {
        if self.seq_item_port.is_some() {
            return Err(HarnessError::configuration(
                &self.path,
                "sequencer port connected twice",
            ));
        }
        self.seq_item_port = Some(port);
        Ok(())
    }

    /// Returns true once the sequencer port is connected.
    pub fn is_connected(&self) -> bool {
        self.seq_item_port.is_some()
    }
}

#[async_trait]
impl<Ctx: HarnessContext> Runnable for Driver<Ctx> {
    type Output = ();

    fn path(&self) -> &ComponentPath {
        &self.path
    }

    async fn run(mut self) -> Result<(), HarnessError> {
        let mut seq = self.seq_item_port.take().ok_or_else(|| {
            HarnessError::configuration(&self.path, "sequencer port not connected")
        })?;

        while let Some(txn) = seq.take().await? {
            let cycle = self.port.drive(txn.id, txn.a, txn.b).await?;
            self.timeline.record(Stage::Drive, txn.id);

            self.ctx.sleep(self.settle_delay).await;
            self.port.settle()?;

            info!(
                component = %self.path,
                cycle,
                t_ns = self.ctx.now().as_nanos() as u64,
                "drive {}",
                txn
            );
            seq.done()?;
        }

        Ok(())
    }
}
