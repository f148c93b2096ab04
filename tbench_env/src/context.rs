//! Core environment context trait for testbench components.

use async_trait::async_trait;
use rand_chacha::ChaCha8Rng;
use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;

/// The central interface for environment interaction.
///
/// This trait abstracts time, task spawning and randomness so that the
/// same generator/driver/monitor code runs in both wall-clock and
/// virtual-clock environments.
///
/// # Implementations
///
/// - **Wall clock**: `TokioContext` - wraps `tokio::time`
/// - **Virtual clock**: `SimContext` (in `tbench_sim`) - manually advanced time
///
/// # Determinism
///
/// Randomness is only ever handed out as seeded [`ChaCha8Rng`] streams, so
/// two runs with the same seed draw the same stimulus.
#[async_trait]
pub trait HarnessContext: Send + Sync + 'static {
    /// Returns the current monotonic time since context creation.
    ///
    /// In simulation, this is the virtual clock time.
    fn now(&self) -> Duration;

    /// Suspends execution for the given duration.
    ///
    /// In production: wraps `tokio::time::sleep`
    /// In simulation: advances virtual time and yields to the scheduler
    async fn sleep(&self, duration: Duration);

    /// Spawns a concurrent task and returns its handle.
    ///
    /// The handle is what the test controller uses to tear perpetual
    /// stages (driver, monitor) down at the end of the run phase.
    fn spawn<F>(&self, name: &str, future: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static;

    /// Returns an independent, reproducible RNG stream.
    ///
    /// The implementation combines the master seed with `stream` so that
    /// each consumer (generator, fault injector, ...) gets its own sequence
    /// and adding a consumer never perturbs the others.
    ///
    /// # Arguments
    /// * `stream` - A value to combine with the master seed
    fn rng_stream(&self, stream: u64) -> ChaCha8Rng;

    /// Returns the context's master seed (for logging/reproduction).
    fn seed(&self) -> u64;
}

/// Mixes a master seed with a stream index.
///
/// Shared by every context implementation so that a seed reproduces the
/// same stimulus regardless of which clock the run used.
pub fn derive_stream_seed(seed: u64, stream: u64) -> u64 {
    seed.wrapping_mul(0x517cc1b727220a95) ^ stream.wrapping_mul(0x9e3779b97f4a7c15)
}
