//! Pluggable reference models for the scoreboard.

use crate::transaction::Width;

/// The function under verification, as the scoreboard predicts it.
///
/// Implementations must be pure: the same inputs always yield the same
/// prediction. Closures `Fn(u64, u64) -> u64` implement this trait.
pub trait ReferenceModel: Send + Sync {
    /// Returns the model name.
    fn name(&self) -> &str {
        "custom"
    }

    /// Predicts `y` for inputs `a`, `b`.
    fn predict(&self, a: u64, b: u64) -> u64;
}

impl<F> ReferenceModel for F
where
    F: Fn(u64, u64) -> u64 + Send + Sync,
{
    fn predict(&self, a: u64, b: u64) -> u64 {
        self(a, b)
    }
}

/// Addition with a W+1 bit result, keeping the carry-out.
#[derive(Debug, Clone, Copy)]
pub struct AdderModel {
    width: Width,
}

impl AdderModel {
    pub fn new(width: Width) -> Self {
        Self { width }
    }
}

impl ReferenceModel for AdderModel {
    fn name(&self) -> &str {
        "adder"
    }

    fn predict(&self, a: u64, b: u64) -> u64 {
        a.wrapping_add(b) & self.width.result_mask()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_adder_model_carry_out() {
        let model = AdderModel::new(Width::new(4).unwrap());
        assert_eq!(model.predict(5, 3), 8);
        assert_eq!(model.predict(15, 15), 30);
        assert_eq!(model.name(), "adder");
    }

    #[test]
    fn test_closure_model() {
        let model = |a: u64, b: u64| a ^ b;
        assert_eq!(model.predict(0b1100, 0b1010), 0b0110);
        assert_eq!(ReferenceModel::name(&model), "custom");
    }

    proptest! {
        #[test]
        fn prop_adder_model_is_idempotent(bits in 1u32..=32, a in any::<u32>(), b in any::<u32>()) {
            let width = Width::new(bits).unwrap();
            let (a, b) = (a as u64 & width.max_operand(), b as u64 & width.max_operand());
            let model = AdderModel::new(width);

            prop_assert_eq!(model.predict(a, b), model.predict(a, b));
            prop_assert_eq!(model.predict(a, b), a + b);
        }
    }
}
