//! Wall-clock implementation of HarnessContext using Tokio.

use crate::context::derive_stream_seed;
use crate::HarnessContext;
use async_trait::async_trait;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::future::Future;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{Duration, Instant};

/// Context backed by the Tokio timer.
///
/// Time comes from `tokio::time`, so under a paused test runtime it
/// auto-advances and remains deterministic. Without an explicit seed, the
/// master seed is drawn from OS entropy.
pub struct TokioContext {
    /// Start time for monotonic duration calculations
    start: Instant,

    /// Master seed
    seed: u64,
}

impl TokioContext {
    /// Creates a new TokioContext with a random master seed.
    pub fn new() -> Self {
        Self::with_seed(rand::random())
    }

    /// Creates a TokioContext with a fixed master seed.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            start: Instant::now(),
            seed,
        }
    }

    /// Creates an Arc-wrapped context for sharing across tasks.
    pub fn shared(seed: u64) -> Arc<Self> {
        Arc::new(Self::with_seed(seed))
    }
}

impl Default for TokioContext {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HarnessContext for TokioContext {
    fn now(&self) -> Duration {
        self.start.elapsed()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
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
