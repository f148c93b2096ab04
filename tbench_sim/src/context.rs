//! Simulation context implementing HarnessContext for deterministic runs.

use async_trait::async_trait;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tbench_env::{derive_stream_seed, HarnessContext};
use tokio::task::JoinHandle;

/// Simulation context backed by a virtual clock and seeded RNG streams.
///
/// This implements `HarnessContext` using:
/// - A virtual clock that only moves when a component sleeps
/// - Seeded ChaCha8 streams for stimulus randomization
///
/// Stage ordering never depends on the clock (the boundary hands cycles
/// over explicitly), so virtual sleeps can return immediately and a full
/// regression runs in microseconds of wall time.
pub struct SimContext {
    /// Master seed for this simulation
    seed: u64,

    /// Current virtual time (nanoseconds since simulation start)
    virtual_time_ns: Arc<AtomicU64>,
}

impl SimContext {
    /// Creates a new SimContext with the given seed.
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            virtual_time_ns: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Creates an Arc-wrapped context for sharing.
    pub fn shared(seed: u64) -> Arc<Self> {
        Arc::new(Self::new(seed))
    }

    /// Advances virtual time by the given duration.
    pub fn advance_time(&self, duration: Duration) {
        self.virtual_time_ns
            .fetch_add(duration.as_nanos() as u64, Ordering::SeqCst);
    }

    /// Returns the current virtual time in nanoseconds.
    pub fn time_ns(&self) -> u64 {
        self.virtual_time_ns.load(Ordering::SeqCst)
    }
}

impl Clone for SimContext {
    fn clone(&self) -> Self {
        Self {
            seed: self.seed,
            virtual_time_ns: Arc::clone(&self.virtual_time_ns),
        }
    }
}

#[async_trait]
impl HarnessContext for SimContext {
    fn now(&self) -> Duration {
        Duration::from_nanos(self.time_ns())
    }

    async fn sleep(&self, duration: Duration) {
        self.advance_time(duration);
        // Let the other stages observe the new time before we continue
        tokio::task::yield_now().await;
    }

    fn spawn<F>(&self, _name: &str, future: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        tokio::spawn(future)
    }

    fn rng_stream(&self, stream: u64) -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(derive_stream_seed(self.seed, stream))
    }

    fn seed(&self) -> u64 {
        self.seed
    }
}
