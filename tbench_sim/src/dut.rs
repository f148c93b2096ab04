//! Units under test.
//!
//! The harness only ever sees a DUT through [`Dut::evaluate`]; everything
//! here is a stand-in for real hardware behind the boundary.

use crate::transaction::Width;

/// A combinational unit with two W-bit inputs and one W+1-bit output.
pub trait Dut: Send + 'static {
    /// Returns the DUT name (for logs and reports).
    fn name(&self) -> &str;

    /// Computes the output for the given inputs.
    fn evaluate(&mut self, a: u64, b: u64) -> u64;
}

/// Bit-serial ripple-carry adder, the reference design under test.
#[derive(Debug, Clone)]
pub struct RippleAdder {
    width: Width,
}

impl RippleAdder {
    pub fn new(width: Width) -> Self {
        Self { width }
    }
}

impl Dut for RippleAdder {
    fn name(&self) -> &str {
        "ripple_adder"
    }

    fn evaluate(&mut self, a: u64, b: u64) -> u64 {
        let mut sum = 0u64;
        let mut carry = 0u64;

        for bit in 0..self.width.bits() {
            let x = (a >> bit) & 1;
            let y = (b >> bit) & 1;
            sum |= (x ^ y ^ carry) << bit;
            carry = (x & y) | (carry & (x ^ y));
        }

        sum | (carry << self.width.bits())
    }
}

/// Output tied low: a misconfigured boundary.
#[derive(Debug, Clone, Default)]
pub struct StuckAtZero;

impl Dut for StuckAtZero {
    fn name(&self) -> &str {
        "stuck_at_zero"
    }

    fn evaluate(&mut self, _a: u64, _b: u64) -> u64 {
        0
    }
}

/// Adder whose carry-out is not wired to the output.
#[derive(Debug, Clone)]
pub struct CarryDropAdder {
    inner: RippleAdder,
}

impl CarryDropAdder {
    pub fn new(width: Width) -> Self {
        Self {
            inner: RippleAdder::new(width),
        }
    }
}

impl Dut for CarryDropAdder {
    fn name(&self) -> &str {
        "carry_drop_adder"
    }

    fn evaluate(&mut self, a: u64, b: u64) -> u64 {
        self.inner.evaluate(a, b) & self.inner.width.max_operand()
    }
}
