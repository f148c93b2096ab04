//! tbench Environment Abstraction Layer
//!
//! This crate provides the abstraction that lets the verification pipeline
//! run against either a **wall clock** (tokio) or a **virtual clock**
//! (deterministic simulation) without the components knowing which.
//!
//! # Core Concept
//!
//! Every source of non-determinism a testbench component touches is routed
//! through [`HarnessContext`]:
//! - Time (`now()`, `sleep()`)
//! - Concurrency (`spawn()`)
//! - Randomness (`rng_stream()`)
//!
//! All random streams derive from a single 64-bit seed, so a failing
//! regression is reproducible from its seed number.
//!
//! # Example
//!
//! ```ignore
//! use tbench_env::HarnessContext;
//!
//! async fn settle<Ctx: HarnessContext>(ctx: &Ctx, latency: Duration) {
//!     let before = ctx.now();
//!     ctx.sleep(latency).await;
//!     assert!(ctx.now() >= before + latency);
//! }
//! ```

mod context;
mod error;
mod tokio_impl;
mod types;

pub use context::{derive_stream_seed, HarnessContext};
pub use error::HarnessError;
pub use tokio_impl::TokioContext;
pub use types::ComponentPath;
