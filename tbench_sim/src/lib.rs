//! Constrained-Random Verification Harness
//!
//! This crate drives a device under test (DUT) with generated stimulus,
//! observes what it produces, and scores each observation against a
//! reference model. Components are assembled in a fixed tree and move
//! through build, connect and run phases under a single test controller.
//!
//! # Core Principle: One Transaction In Flight
//!
//! Every boundary cycle goes through drive, settle, sample and
//! acknowledge. A drive waits until the previous cycle was sampled, so
//! the monitor never misses a value and never scores one twice.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                        TestController                         │
//! │  ┌─────────────────────────────────────────────────────────┐  │
//! │  │                      Environment                        │  │
//! │  │  ┌───────────────────────────────────────┐              │  │
//! │  │  │                Agent                  │              │  │
//! │  │  │  Sequencer ──put/take/done──► Driver  │              │  │
//! │  │  │      ▲                          │     │              │  │
//! │  │  │      │                          ▼     │              │  │
//! │  │  │  Generator              VirtualInterface ──► DUT     │  │
//! │  │  │                                 │     │              │  │
//! │  │  │                                 ▼     │              │  │
//! │  │  │                              Monitor ─┼─► ap         │  │
//! │  │  └───────────────────────────────────────┘   │          │  │
//! │  │                        ┌────────────────────┤          │  │
//! │  │                        ▼                    ▼          │  │
//! │  │                   Scoreboard         CoverageCollector │  │
//! │  └─────────────────────────────────────────────────────────┘  │
//! │  Objection: raised before stimulus, dropped after drain       │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use tbench_sim::{HarnessConfig, RippleAdder, SimContext, TestController, Width};
//!
//! let config = HarnessConfig::default();
//! let dut = Box::new(RippleAdder::new(Width::default()));
//! let test = TestController::new("adder_test", SimContext::shared(42), config, dut)?;
//! let report = test.execute().await?;
//! assert!(report.passed);
//! ```

mod context;
pub mod transaction;
pub mod sequencer;
pub mod objection;
pub mod phase;
pub mod dut;
pub mod reference;
pub mod interface;
pub mod analysis;
pub mod timeline;
pub mod scoreboard;
pub mod coverage;
pub mod generator;
pub mod driver;
pub mod monitor;
pub mod agent;
pub mod env;
pub mod config;
pub mod controller;
pub mod scenarios;
mod runner;
mod exporter;

pub use context::SimContext;
pub use transaction::{Constraints, OperandRange, Transaction, Width};
pub use dut::{CarryDropAdder, Dut, RippleAdder, StuckAtZero};
pub use reference::{AdderModel, ReferenceModel};
pub use scoreboard::{Mismatch, Scoreboard, ScoreboardReport, Verdict};
pub use coverage::{CoverageCollector, CoverageReport};
pub use generator::Stimulus;
pub use config::HarnessConfig;
pub use controller::{RunReport, TestController};
pub use runner::{ScenarioRunner, ScenarioResult};
pub use exporter::RunExport;
