//! The boundary between the harness and the unit under test.
//!
//! A [`VirtualInterface`] wraps a [`Dut`] and exposes two ports:
//!
//! - [`DrivePort`], claimed once by the driver: sets `a`, `b`, then settles `y`
//! - [`SamplePort`], claimed once by the monitor: reads `a`, `b`, `y`
//!
//! Each driven cycle goes through `drive → settle → sample → acknowledge`.
//! A new drive waits until the previous cycle has been sampled, so the
//! monitor can never miss a cycle or see a half-updated output.

use crate::dut::Dut;
use crate::transaction::Width;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tbench_env::{ComponentPath, HarnessError};
use tokio::sync::watch;

/// Signal values on the boundary.
struct Signals {
    dut: Box<dyn Dut>,

    /// Input `a`
    a: u64,

    /// Input `b`
    b: u64,

    /// Output `y`; `None` between a drive and its settle
    y: Option<u64>,

    /// Transaction id carried alongside the inputs
    tag: u64,

    /// Number of cycles driven so far
    driven: u64,
}

struct Bus {
    path: ComponentPath,
    width: Width,
    signals: Mutex<Signals>,

    /// Number of cycles whose output has settled
    settled: watch::Sender<u64>,

    /// Number of cycles the monitor has sampled and acknowledged
    sampled: watch::Sender<u64>,
}

impl Bus {
    fn signals(&self) -> MutexGuard<'_, Signals> {
        self.signals.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// One sampled cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sample {
    /// Cycle index (0-based)
    pub cycle: u64,

    /// Transaction id driven in this cycle
    pub tag: u64,

    pub a: u64,
    pub b: u64,
    pub y: u64,
}

/// Handle to a DUT boundary. Ports are handed out at most once each.
pub struct VirtualInterface {
    bus: Arc<Bus>,
    drive_claimed: AtomicBool,
    sample_claimed: AtomicBool,
}

impl VirtualInterface {
    /// Wraps `dut` behind a boundary with `width`-bit operands.
    pub fn new(path: ComponentPath, width: Width, dut: Box<dyn Dut>) -> Self {
        let (settled, _) = watch::channel(0);
        let (sampled, _) = watch::channel(0);

        Self {
            bus: Arc::new(Bus {
                path,
                width,
                signals: Mutex::new(Signals {
                    dut,
                    a: 0,
                    b: 0,
                    y: None,
                    tag: 0,
                    driven: 0,
                }),
                settled,
                sampled,
            }),
            drive_claimed: AtomicBool::new(false),
            sample_claimed: AtomicBool::new(false),
        }
    }

    /// Creates an Arc-wrapped interface for injection into an environment.
    pub fn shared(path: ComponentPath, width: Width, dut: Box<dyn Dut>) -> Arc<Self> {
        Arc::new(Self::new(path, width, dut))
    }

    /// Claims the write side of the boundary.
    ///
    /// # Errors
    /// `Configuration` (naming `claimant`) if the port was already claimed.
    pub fn claim_drive_port(&self, claimant: &ComponentPath) -> Result<DrivePort, HarnessError> {
        if self.drive_claimed.swap(true, Ordering::SeqCst) {
            return Err(HarnessError::configuration(
                claimant,
                format!("drive port of {} is already claimed", self.bus.path),
            ));
        }

        Ok(DrivePort {
            bus: Arc::clone(&self.bus),
            sampled: self.bus.sampled.subscribe(),
        })
    }

    /// Claims the read side of the boundary.
    ///
    /// # Errors
    /// `Configuration` (naming `claimant`) if the port was already claimed.
    pub fn claim_sample_port(&self, claimant: &ComponentPath) -> Result<SamplePort, HarnessError> {
        if self.sample_claimed.swap(true, Ordering::SeqCst) {
            return Err(HarnessError::configuration(
                claimant,
                format!("sample port of {} is already claimed", self.bus.path),
            ));
        }

        Ok(SamplePort {
            bus: Arc::clone(&self.bus),
            settled: self.bus.settled.subscribe(),
            next_cycle: 0,
        })
    }

    /// Returns a read-only progress probe for the test controller.
    pub fn probe(&self) -> BusProbe {
        BusProbe {
            bus: Arc::clone(&self.bus),
            sampled: self.bus.sampled.subscribe(),
        }
    }

    /// Returns the operand width.
    pub fn width(&self) -> Width {
        self.bus.width
    }

    /// Returns the name of the DUT behind the boundary.
    pub fn dut_name(&self) -> String {
        self.bus.signals().dut.name().to_string()
    }

    /// Returns the boundary's component path.
    pub fn path(&self) -> &ComponentPath {
        &self.bus.path
    }
}

/// Write side of the boundary, owned by the driver.
pub struct DrivePort {
    bus: Arc<Bus>,
    sampled: watch::Receiver<u64>,
}

impl DrivePort {
    /// Applies `a`, `b` for transaction `tag` and returns the cycle index.
    ///
    /// Waits until the previous cycle has been sampled.
    ///
    /// # Errors
    /// `ProtocolViolation` if an operand does not fit the boundary width or
    /// the previous cycle was never settled.
    pub async fn drive(&mut self, tag: u64, a: u64, b: u64) -> Result<u64, HarnessError> {
        let width = self.bus.width;
        if !width.contains(a) || !width.contains(b) {
            return Err(HarnessError::protocol(
                &self.bus.path,
                format!("operands a={a} b={b} do not fit {width} inputs"),
            ));
        }

        let driven = self.bus.signals().driven;
        self.sampled
            .wait_for(|sampled| *sampled >= driven)
            .await
            .map_err(|_| HarnessError::aborted(&self.bus.path, "boundary closed"))?;

        let mut signals = self.bus.signals();
        if driven > 0 && signals.y.is_none() {
            return Err(HarnessError::protocol(
                &self.bus.path,
                format!("cycle {} driven again before it settled", driven - 1),
            ));
        }

        signals.a = a;
        signals.b = b;
        signals.tag = tag;
        signals.y = None;
        signals.driven += 1;
        Ok(driven)
    }

    /// Lets the output follow the inputs of the last drive.
    ///
    /// Called by the driver once the settle latency has elapsed.
    ///
    /// # Errors
    /// `ProtocolViolation` if there is no unsettled drive.
    pub fn settle(&mut self) -> Result<(), HarnessError> {
        let mut signals = self.bus.signals();
        if signals.driven == 0 || signals.y.is_some() {
            return Err(HarnessError::protocol(
                &self.bus.path,
                "settle() without a pending drive",
            ));
        }

        let (a, b) = (signals.a, signals.b);
        let y = signals.dut.evaluate(a, b) & self.bus.width.result_mask();
        signals.y = Some(y);

        let driven = signals.driven;
        drop(signals);

        self.bus.settled.send_replace(driven);
        Ok(())
    }
}

/// Read side of the boundary, owned by the monitor.
pub struct SamplePort {
    bus: Arc<Bus>,
    settled: watch::Receiver<u64>,

    /// Next cycle to sample
    next_cycle: u64,
}

impl SamplePort {
    /// Waits until the next cycle has settled and returns its index.
    pub async fn wait_settled(&mut self) -> Result<u64, HarnessError> {
        let cycle = self.next_cycle;
        self.settled
            .wait_for(|settled| *settled > cycle)
            .await
            .map_err(|_| HarnessError::aborted(&self.bus.path, "boundary closed"))?;
        Ok(cycle)
    }

    /// Reads the boundary.
    ///
    /// # Errors
    /// `ProtocolViolation` if the output is mid-transition.
    pub fn sample(&self) -> Result<Sample, HarnessError> {
        let signals = self.bus.signals();
        let y = signals.y.ok_or_else(|| {
            HarnessError::protocol(
                &self.bus.path,
                format!("cycle {} sampled before its output settled", self.next_cycle),
            )
        })?;

        Ok(Sample {
            cycle: self.next_cycle,
            tag: signals.tag,
            a: signals.a,
            b: signals.b,
            y,
        })
    }

    /// Marks the current cycle as consumed, allowing the next drive.
    pub fn acknowledge(&mut self) {
        self.next_cycle += 1;
        self.bus.sampled.send_replace(self.next_cycle);
    }
}

/// Read-only view of boundary progress.
pub struct BusProbe {
    bus: Arc<Bus>,
    sampled: watch::Receiver<u64>,
}

impl BusProbe {
    /// Number of cycles driven.
    pub fn cycles_driven(&self) -> u64 {
        self.bus.signals().driven
    }

    /// Number of cycles sampled and acknowledged.
    pub fn cycles_sampled(&self) -> u64 {
        *self.sampled.borrow()
    }

    /// Waits until every driven cycle has been sampled.
    pub async fn wait_idle(&mut self) {
        let driven = self.cycles_driven();
        let _ = self.sampled.wait_for(|sampled| *sampled >= driven).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dut::{RippleAdder, StuckAtZero};

    fn adder_if() -> VirtualInterface {
        let width = Width::new(4).unwrap();
        VirtualInterface::new(
            ComponentPath::root("top").child("adder_if"),
            width,
            Box::new(RippleAdder::new(width)),
        )
    }

    fn claimant() -> ComponentPath {
        ComponentPath::root("test").child("driver")
    }

    #[tokio::test]
    async fn test_drive_settle_sample_cycle() {
        let vif = adder_if();
        let mut drive = vif.claim_drive_port(&claimant()).unwrap();
        let mut sample = vif.claim_sample_port(&claimant()).unwrap();

        assert_eq!(drive.drive(7, 5, 3).await.unwrap(), 0);
        drive.settle().unwrap();

        assert_eq!(sample.wait_settled().await.unwrap(), 0);
        let s = sample.sample().unwrap();
        assert_eq!(
            s,
            Sample {
                cycle: 0,
                tag: 7,
                a: 5,
                b: 3,
                y: 8
            }
        );
        sample.acknowledge();
        assert_eq!(vif.probe().cycles_sampled(), 1);
    }

    #[tokio::test]
    async fn test_sampling_unsettled_output_is_a_violation() {
        let vif = adder_if();
        let mut drive = vif.claim_drive_port(&claimant()).unwrap();
        let sample = vif.claim_sample_port(&claimant()).unwrap();

        drive.drive(0, 1, 1).await.unwrap();
        let err = sample.sample().unwrap_err();
        assert!(matches!(err, HarnessError::ProtocolViolation { .. }));
    }

    #[tokio::test]
    async fn test_next_drive_waits_for_sample() {
        let vif = adder_if();
        let mut drive = vif.claim_drive_port(&claimant()).unwrap();
        let mut sample = vif.claim_sample_port(&claimant()).unwrap();

        drive.drive(0, 1, 2).await.unwrap();
        drive.settle().unwrap();

        let second = tokio::spawn(async move {
            let cycle = drive.drive(1, 3, 4).await.unwrap();
            (cycle, drive)
        });
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        assert!(!second.is_finished(), "drive overtook an unsampled cycle");

        sample.wait_settled().await.unwrap();
        assert_eq!(sample.sample().unwrap().y, 3);
        sample.acknowledge();

        let (cycle, _drive) = second.await.unwrap();
        assert_eq!(cycle, 1);
    }

    #[test]
    fn test_ports_are_claimed_once() {
        let vif = adder_if();
        assert!(vif.claim_drive_port(&claimant()).is_ok());
        assert!(vif.claim_sample_port(&claimant()).is_ok());

        let err = vif.claim_drive_port(&claimant()).err().unwrap();
        assert!(matches!(err, HarnessError::Configuration { .. }));
        assert_eq!(err.component(), Some(&claimant()));

        assert!(vif.claim_sample_port(&claimant()).is_err());
    }

    #[tokio::test]
    async fn test_out_of_range_operand_is_rejected() {
        let vif = adder_if();
        let mut drive = vif.claim_drive_port(&claimant()).unwrap();
        assert!(drive.drive(0, 16, 0).await.is_err());
    }

    #[tokio::test]
    async fn test_settle_without_drive_is_a_violation() {
        let vif = adder_if();
        let mut drive = vif.claim_drive_port(&claimant()).unwrap();
        assert!(drive.settle().is_err());
    }

    #[tokio::test]
    async fn test_output_masked_to_result_width() {
        struct Wide;
        impl Dut for Wide {
            fn name(&self) -> &str {
                "wide"
            }
            fn evaluate(&mut self, _a: u64, _b: u64) -> u64 {
                u64::MAX
            }
        }

        let width = Width::new(4).unwrap();
        let vif = VirtualInterface::new(ComponentPath::root("w"), width, Box::new(Wide));
        assert_eq!(vif.dut_name(), "wide");

        let mut drive = vif.claim_drive_port(&claimant()).unwrap();
        let sample = vif.claim_sample_port(&claimant()).unwrap();
        drive.drive(0, 0, 0).await.unwrap();
        drive.settle().unwrap();
        assert_eq!(sample.sample().unwrap().y, 31);
    }

    #[tokio::test]
    async fn test_stuck_output_is_still_sampled() {
        let width = Width::new(4).unwrap();
        let vif = VirtualInterface::new(ComponentPath::root("s"), width, Box::new(StuckAtZero));
        let mut drive = vif.claim_drive_port(&claimant()).unwrap();
        let mut sample = vif.claim_sample_port(&claimant()).unwrap();

        drive.drive(0, 9, 9).await.unwrap();
        drive.settle().unwrap();
        sample.wait_settled().await.unwrap();
        assert_eq!(sample.sample().unwrap().y, 0);
    }
}
