//! Run-completion token.
//!
//! The run phase ends when every raised objection has been dropped, not
//! after a fixed amount of time, so stimulus sequences of any length
//! terminate deterministically.

use std::sync::Arc;
use tbench_env::{ComponentPath, HarnessError};
use tokio::sync::watch;

/// Shared objection counter. Clones observe and modify the same count.
#[derive(Debug, Clone)]
pub struct Objection {
    path: ComponentPath,
    count: Arc<watch::Sender<usize>>,
}

impl Objection {
    /// Creates a counter with no objections raised.
    pub fn new(path: ComponentPath) -> Self {
        let (count, _) = watch::channel(0);
        Self {
            path,
            count: Arc::new(count),
        }
    }

    /// Raises `n` objections.
    pub fn raise(&self, n: usize) {
        self.count.send_modify(|count| *count += n);
    }

    /// Drops `n` objections.
    ///
    /// # Errors
    /// `ProtocolViolation` if fewer than `n` objections are held. The count
    /// is left untouched in that case.
    pub fn drop_objection(&self, n: usize) -> Result<(), HarnessError> {
        let mut underflow = None;
        self.count.send_if_modified(|count| {
            if *count < n {
                underflow = Some(*count);
                false
            } else {
                *count -= n;
                true
            }
        });

        match underflow {
            Some(held) => Err(HarnessError::protocol(
                &self.path,
                format!("dropped {n} objection(s) while only {held} held"),
            )),
            None => Ok(()),
        }
    }

    /// Returns the number of outstanding objections.
    pub fn count(&self) -> usize {
        *self.count.borrow()
    }

    /// Waits until no objection is outstanding.
    pub async fn wait_cleared(&self) {
        let mut rx = self.count.subscribe();
        // The sender lives as long as `self`, so the wait cannot fail
        let _ = rx.wait_for(|count| *count == 0).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn objection() -> Objection {
        Objection::new(ComponentPath::root("test").child("objection"))
    }

    #[test]
    fn test_raise_and_drop() {
        let obj = objection();
        obj.raise(2);
        assert_eq!(obj.count(), 2);

        obj.drop_objection(1).unwrap();
        assert_eq!(obj.count(), 1);

        obj.drop_objection(1).unwrap();
        assert_eq!(obj.count(), 0);
    }

    #[test]
    fn test_underflow_is_a_violation() {
        let obj = objection();
        obj.raise(1);

        let err = obj.drop_objection(2).unwrap_err();
        assert!(matches!(err, HarnessError::ProtocolViolation { .. }));
        assert_eq!(obj.count(), 1);
    }

    #[tokio::test]
    async fn test_wait_cleared_blocks_while_held() {
        let obj = objection();
        obj.raise(1);

        let waiter = {
            let obj = obj.clone();
            tokio::spawn(async move { obj.wait_cleared().await })
        };

        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        assert!(!waiter.is_finished());

        obj.drop_objection(1).unwrap();
        waiter.await.unwrap();
    }
}
