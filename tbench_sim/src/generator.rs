//! Stimulus generator.

use crate::phase::{Buildable, Runnable};
use crate::sequencer::SequencerHandle;
use crate::timeline::{Stage, Timeline};
use crate::transaction::{Constraints, Transaction, Width};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tbench_env::{ComponentPath, HarnessContext, HarnessError};
use tracing::{debug, info};

/// RNG stream reserved for stimulus randomization.
pub const GENERATOR_STREAM: u64 = 1;

/// Default number of random transactions.
pub const DEFAULT_ITERATIONS: usize = 10;

/// What the generator produces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stimulus {
    /// `count` constrained-random transactions
    Random { count: usize },

    /// Exactly these operand pairs, in order
    Directed(Vec<(u64, u64)>),
}

impl Stimulus {
    /// Number of transactions this stimulus produces.
    pub fn len(&self) -> usize {
        match self {
            Stimulus::Random { count } => *count,
            Stimulus::Directed(pairs) => pairs.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for Stimulus {
    fn default() -> Self {
        Stimulus::Random {
            count: DEFAULT_ITERATIONS,
        }
    }
}

/// Dependencies injected by the test controller.
pub struct GeneratorDeps<Ctx: HarnessContext> {
    pub ctx: Arc<Ctx>,
    pub stimulus: Stimulus,
    pub width: Width,
    pub constraints: Constraints,
    pub sequencer: SequencerHandle,
    pub timeline: Arc<Timeline>,
}

/// Produces the stimulus sequence and hands it to the driver one at a time.
pub struct Generator<Ctx: HarnessContext> {
    path: ComponentPath,
    ctx: Arc<Ctx>,
    stimulus: Stimulus,
    constraints: Constraints,
    sequencer: SequencerHandle,
    timeline: Arc<Timeline>,
}

impl<Ctx: HarnessContext> Buildable for Generator<Ctx> {
    type Deps = GeneratorDeps<Ctx>;

    fn build(path: ComponentPath, deps: Self::Deps) -> Result<Self, HarnessError> {
        deps.constraints
            .check(deps.width)
            .map_err(|reason| HarnessError::configuration(&path, reason))?;

        if let Stimulus::Directed(pairs) = &deps.stimulus {
            if let Some((a, b)) = pairs
                .iter()
                .find(|(a, b)| !deps.width.contains(*a) || !deps.width.contains(*b))
            {
                return Err(HarnessError::configuration(
                    &path,
                    format!("directed pair a={a} b={b} does not fit {} operands", deps.width),
                ));
            }
        }

        Ok(Self {
            path,
            ctx: deps.ctx,
            stimulus: deps.stimulus,
            constraints: deps.constraints,
            sequencer: deps.sequencer,
            timeline: deps.timeline,
        })
    }
}

impl<Ctx: HarnessContext> Generator<Ctx> {
    /// Number of transactions the generator will issue.
    pub fn planned(&self) -> usize {
        self.stimulus.len()
    }

    async fn issue(&self, txn: Transaction) -> Result<(), HarnessError> {
        info!(component = %self.path, "generate {}", txn);
        self.timeline.record(Stage::Generate, txn.id);
        self.sequencer.put(txn).await
    }
}

#[async_trait]
impl<Ctx: HarnessContext> Runnable for Generator<Ctx> {
    /// Number of transactions handed off.
    type Output = u64;

    fn path(&self) -> &ComponentPath {
        &self.path
    }

    async fn run(self) -> Result<u64, HarnessError> {
        let mut issued = 0u64;

        match &self.stimulus {
            Stimulus::Random { count } => {
                let mut rng = self.ctx.rng_stream(GENERATOR_STREAM);
                for id in 0..*count as u64 {
                    let txn = Transaction::randomize(id, &mut rng, &self.constraints);
                    self.issue(txn).await?;
                    issued += 1;
                }
            }
            Stimulus::Directed(pairs) => {
                for (id, (a, b)) in pairs.iter().enumerate() {
                    self.issue(Transaction::stimulus(id as u64, *a, *b)).await?;
                    issued += 1;
                }
            }
        }

        debug!(component = %self.path, issued, "stimulus complete");
        Ok(issued)
    }
}
