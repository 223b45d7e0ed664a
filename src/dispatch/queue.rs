//! Dispatch queue
//!
//! Bounded in-memory queue between the submission/recovery paths and the
//! worker pool. Enqueueing never blocks: when the queue is full the item is
//! dropped with a warning and the recovery scanner picks the row up on a
//! later tick.

use metrics::counter;
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, warn};

use crate::models::message_transaction;

/// Bounded multi-producer queue drained by the worker pool
#[derive(Clone)]
pub struct DispatchQueue {
    tx: mpsc::Sender<message_transaction::Model>,
    rx: Arc<Mutex<mpsc::Receiver<message_transaction::Model>>>,
    capacity: usize,
}

impl DispatchQueue {
    pub fn new(capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity);
        Self {
            tx,
            rx: Arc::new(Mutex::new(rx)),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Offers a transaction to the worker pool without blocking.
    ///
    /// Returns false when the queue is full or closed; the row stays in the
    /// store for the scanner to recover.
    pub fn enqueue(&self, transaction: message_transaction::Model) -> bool {
        let transaction_id = transaction.id;
        match self.tx.try_send(transaction) {
            Ok(()) => {
                debug!(transaction_id, "Message transaction queued");
                true
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                counter!("dispatch_queue_dropped_total").increment(1);
                warn!(transaction_id, "Dispatch queue full, dropping enqueue");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                warn!(
                    transaction_id,
                    "Dispatch queue closed, dropping enqueue"
                );
                false
            }
        }
    }

    /// Receives the next transaction; `None` once the queue is closed and
    /// drained.
    pub async fn recv(&self) -> Option<message_transaction::Model> {
        let mut rx = self.rx.lock().await;
        rx.recv().await
    }

    /// Stops the queue from accepting new items. Items already queued are
    /// still handed to workers.
    pub async fn close(&self) {
        let mut rx = self.rx.lock().await;
        rx.close();
    }
}
