//! Depth-1 handoff channel between the generator and the driver.
//!
//! ```text
//! Generator                 Sequencer                  Driver
//!   |-- put(txn) ------------->|                          |
//!   |   (blocked)              |<------------- take() ----|
//!   |                          |-- txn ------------------>|
//!   |                          |                          |-- drive / settle
//!   |                          |<------------- done() ----|
//!   |<-- put returns ----------|                          |
//! ```
//!
//! `put` returns only once its item has been taken *and* acknowledged, so
//! the generator can never race ahead of the driver.

use crate::transaction::Transaction;
use std::sync::Arc;
use tbench_env::{ComponentPath, HarnessError};
use tokio::sync::{mpsc, oneshot, Mutex};

/// An item in flight, with the acknowledgement its producer waits on.
#[derive(Debug)]
struct Handoff {
    txn: Transaction,
    ack: oneshot::Sender<()>,
}

/// Creates the producer and consumer halves of a handoff channel.
pub fn sequencer(path: ComponentPath) -> (SequencerHandle, SeqItemPort) {
    let (tx, rx) = mpsc::channel(1);

    let handle = SequencerHandle {
        path: path.clone(),
        tx,
        put_lock: Arc::new(Mutex::new(())),
    };

    let port = SeqItemPort {
        path,
        rx,
        pending: None,
        completed: 0,
    };

    (handle, port)
}

/// Producer-facing half, used by the generator. Cheap to clone.
#[derive(Debug, Clone)]
pub struct SequencerHandle {
    path: ComponentPath,
    tx: mpsc::Sender<Handoff>,

    /// Held from store to acknowledgement so that cloned producers
    /// serialize behind each other
    put_lock: Arc<Mutex<()>>,
}

impl SequencerHandle {
    /// Hands `txn` to the consumer and waits until it has been acknowledged.
    ///
    /// # Errors
    /// * `StageAborted` - the consumer half is gone
    /// * `ProtocolViolation` - the consumer dropped the item without `done()`
    pub async fn put(&self, txn: Transaction) -> Result<(), HarnessError> {
        let _guard = self.put_lock.lock().await;

        let (ack, acked) = oneshot::channel();
        self.tx
            .send(Handoff { txn, ack })
            .await
            .map_err(|_| HarnessError::aborted(&self.path, "consumer closed before put"))?;

        acked.await.map_err(|_| {
            HarnessError::protocol(
                &self.path,
                format!("transaction #{} was taken but never acknowledged", txn.id),
            )
        })
    }

    /// Returns the channel's component path.
    pub fn path(&self) -> &ComponentPath {
        &self.path
    }
}

/// Consumer-facing half, owned by the driver.
#[derive(Debug)]
pub struct SeqItemPort {
    path: ComponentPath,
    rx: mpsc::Receiver<Handoff>,

    /// Acknowledgement for the item currently being processed
    pending: Option<oneshot::Sender<()>>,

    /// Number of acknowledged items
    completed: u64,
}

impl SeqItemPort {
    /// Waits for the next item.
    ///
    /// # Returns
    /// * `Ok(Some(txn))` - an item was handed over
    /// * `Ok(None)` - every producer handle has been dropped
    ///
    /// # Errors
    /// `ProtocolViolation` if the previous item was not acknowledged.
    pub async fn take(&mut self) -> Result<Option<Transaction>, HarnessError> {
        if self.pending.is_some() {
            return Err(HarnessError::protocol(
                &self.path,
                "take() called while the previous item is still unacknowledged",
            ));
        }

        match self.rx.recv().await {
            Some(Handoff { txn, ack }) => {
                self.pending = Some(ack);
                Ok(Some(txn))
            }
            None => Ok(None),
        }
    }

    /// Acknowledges the most recently taken item, releasing its producer.
    ///
    /// # Errors
    /// `ProtocolViolation` if there is no taken, unacknowledged item.
    pub fn done(&mut self) -> Result<(), HarnessError> {
        let ack = self.pending.take().ok_or_else(|| {
            HarnessError::protocol(&self.path, "done() called without a prior take()")
        })?;

        // A producer that gave up waiting is not our concern
        let _ = ack.send(());
        self.completed += 1;
        Ok(())
    }

    /// Returns true if an item has been taken but not acknowledged.
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Returns the number of acknowledged items.
    pub fn completed(&self) -> u64 {
        self.completed
    }
}
