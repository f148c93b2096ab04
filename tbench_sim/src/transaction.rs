//! The data record moving through the pipeline, plus its randomization
//! constraints.

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Largest supported operand width. `y` is one bit wider and must fit a `u64`
/// with room to spare for the ripple-carry model.
pub const MAX_WIDTH: u32 = 32;

/// Operand width W in bits. Results are W+1 bits wide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Width(u32);

impl Width {
    /// Creates a width, rejecting 0 and anything above [`MAX_WIDTH`].
    pub fn new(bits: u32) -> Result<Self, String> {
        if bits == 0 || bits > MAX_WIDTH {
            return Err(format!("operand width must be in 1..={MAX_WIDTH}, got {bits}"));
        }
        Ok(Self(bits))
    }

    /// Returns the number of operand bits.
    pub fn bits(&self) -> u32 {
        self.0
    }

    /// Largest operand value, `2^W - 1`.
    pub fn max_operand(&self) -> u64 {
        (1u64 << self.0) - 1
    }

    /// Mask for a W+1 bit result.
    pub fn result_mask(&self) -> u64 {
        (1u64 << (self.0 + 1)) - 1
    }

    /// Returns true if `value` fits in W bits.
    pub fn contains(&self, value: u64) -> bool {
        value <= self.max_operand()
    }
}

impl Default for Width {
    fn default() -> Self {
        Self(4)
    }
}

impl std::fmt::Display for Width {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-bit", self.0)
    }
}

/// One unit of stimulus/response.
///
/// Generator-created transactions carry only `a, b`; monitor-created ones
/// also carry the sampled `y`. Neither stage ever fills `y` on a
/// transaction it did not create.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Sequence number assigned by the generator and carried across the boundary
    pub id: u64,

    /// First operand (W bits)
    pub a: u64,

    /// Second operand (W bits)
    pub b: u64,

    /// Observed result (W+1 bits), only present on monitor transactions
    pub y: Option<u64>,
}

impl Transaction {
    /// Creates a stimulus transaction.
    pub fn stimulus(id: u64, a: u64, b: u64) -> Self {
        Self { id, a, b, y: None }
    }

    /// Creates an observed transaction.
    pub fn observed(id: u64, a: u64, b: u64, y: u64) -> Self {
        Self {
            id,
            a,
            b,
            y: Some(y),
        }
    }

    /// Draws a fresh stimulus transaction within `constraints`.
    pub fn randomize<R: Rng>(id: u64, rng: &mut R, constraints: &Constraints) -> Self {
        Self::stimulus(id, constraints.a.sample(rng), constraints.b.sample(rng))
    }

    /// Returns true if this transaction carries a sampled result.
    pub fn is_observed(&self) -> bool {
        self.y.is_some()
    }
}

impl std::fmt::Display for Transaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.y {
            Some(y) => write!(f, "#{} a={} b={} y={}", self.id, self.a, self.b, y),
            None => write!(f, "#{} a={} b={}", self.id, self.a, self.b),
        }
    }
}

/// Inclusive value range for one operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperandRange {
    /// Smallest value (inclusive)
    pub min: u64,

    /// Largest value (inclusive)
    pub max: u64,
}

impl OperandRange {
    /// Creates a range.
    pub fn new(min: u64, max: u64) -> Self {
        Self { min, max }
    }

    /// The unconstrained range for `width`.
    pub fn full(width: Width) -> Self {
        Self::new(0, width.max_operand())
    }

    /// Draws a value uniformly from the range.
    pub fn sample<R: Rng>(&self, rng: &mut R) -> u64 {
        rng.gen_range(self.min..=self.max)
    }

    /// Returns true if `value` lies in the range.
    pub fn contains(&self, value: u64) -> bool {
        (self.min..=self.max).contains(&value)
    }

    fn check(&self, operand: &str, width: Width) -> Result<(), String> {
        if self.min > self.max {
            return Err(format!(
                "empty range for {operand}: min {} > max {}",
                self.min, self.max
            ));
        }
        if !width.contains(self.max) {
            return Err(format!(
                "range for {operand} exceeds {width} operands: max {} > {}",
                self.max,
                width.max_operand()
            ));
        }
        Ok(())
    }
}

/// Randomization constraints for a stimulus transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Constraints {
    /// Range for `a`
    pub a: OperandRange,

    /// Range for `b`
    pub b: OperandRange,
}

impl Constraints {
    /// Unconstrained operands for `width`.
    pub fn full(width: Width) -> Self {
        Self {
            a: OperandRange::full(width),
            b: OperandRange::full(width),
        }
    }

    /// Checks that both ranges are non-empty and fit in `width`.
    pub fn check(&self, width: Width) -> Result<(), String> {
        self.a.check("a", width)?;
        self.b.check("b", width)
    }

    /// Returns true if the pair satisfies the constraints.
    pub fn admits(&self, a: u64, b: u64) -> bool {
        self.a.contains(a) && self.b.contains(b)
    }
}
