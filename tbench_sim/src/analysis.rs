//! Publish/subscribe broadcast from the monitor to its observers.

use crate::transaction::Transaction;
use std::sync::Arc;
use tbench_env::ComponentPath;

/// Receives every transaction the monitor publishes.
///
/// `write` runs synchronously inside `publish`, before the monitor moves on
/// to its next sampling cycle. It must not block.
pub trait Subscriber: Send + Sync {
    fn write(&self, txn: &Transaction);
}

impl<F> Subscriber for F
where
    F: Fn(&Transaction) + Send + Sync,
{
    fn write(&self, txn: &Transaction) {
        self(txn)
    }
}

/// Ordered list of subscribers.
pub struct AnalysisPort {
    path: ComponentPath,
    subscribers: Vec<Arc<dyn Subscriber>>,
}

impl AnalysisPort {
    pub fn new(path: ComponentPath) -> Self {
        Self {
            path,
            subscribers: Vec::new(),
        }
    }

    /// Registers a subscriber. Delivery follows registration order.
    pub fn subscribe(&mut self, subscriber: Arc<dyn Subscriber>) {
        self.subscribers.push(subscriber);
    }

    /// Delivers `txn` to every subscriber, in order.
    pub fn publish(&self, txn: &Transaction) {
        for subscriber in &self.subscribers {
            subscriber.write(txn);
        }
    }

    /// Returns the number of subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    pub fn path(&self) -> &ComponentPath {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_publish_in_registration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut port = AnalysisPort::new(ComponentPath::root("mon").child("ap"));

        for tag in ["first", "second", "third"] {
            let log = Arc::clone(&log);
            port.subscribe(Arc::new(move |txn: &Transaction| {
                log.lock().unwrap().push((tag, txn.id));
            }));
        }

        port.publish(&Transaction::observed(4, 1, 2, 3));
        port.publish(&Transaction::observed(5, 1, 2, 3));

        assert_eq!(port.subscriber_count(), 3);
        assert_eq!(
            *log.lock().unwrap(),
            vec![
                ("first", 4),
                ("second", 4),
                ("third", 4),
                ("first", 5),
                ("second", 5),
                ("third", 5)
            ]
        );
    }

    #[test]
    fn test_publish_without_subscribers() {
        let port = AnalysisPort::new(ComponentPath::root("mon"));
        port.publish(&Transaction::observed(0, 0, 0, 0));
        assert_eq!(port.subscriber_count(), 0);
    }
}
