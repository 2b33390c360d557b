//! Fire-and-forget cart persistence.

use common::IdentityId;
use tokio::sync::{mpsc, oneshot};

use crate::item::CartItem;
use crate::store::CartStore;

enum Job {
    Save {
        identity: IdentityId,
        items: Vec<CartItem>,
    },
    Flush(oneshot::Sender<()>),
}

/// Writes carts to a [`CartStore`] from a background task.
///
/// Writes are applied one at a time in the order they were queued, so a
/// later cart state never gets overwritten by an earlier one. Failures are
/// logged and counted, never returned: the in-memory cart stays the source
/// of truth for the session.
#[derive(Debug, Clone)]
pub struct CartPersister {
    tx: mpsc::UnboundedSender<Job>,
}

impl CartPersister {
    /// Spawns the writer task on the current tokio runtime.
    pub fn spawn<S>(store: S) -> Self
    where
        S: CartStore + 'static,
    {
        let (tx, mut rx) = mpsc::unbounded_channel::<Job>();

        tokio::spawn(async move {
            while let Some(job) = rx.recv().await {
                match job {
                    Job::Save { identity, items } => {
                        if let Err(e) = store.save(&identity, &items).await {
                            metrics::counter!("cart_persist_failures_total").increment(1);
                            tracing::warn!(%identity, error = %e, "Cart persistence failed");
                        }
                    }
                    Job::Flush(done) => {
                        let _ = done.send(());
                    }
                }
            }
            tracing::debug!("Cart persister stopped");
        });

        Self { tx }
    }

    /// Queues a write of `items` as the stored cart of `identity`.
    pub fn persist(&self, identity: IdentityId, items: Vec<CartItem>) {
        if self.tx.send(Job::Save { identity, items }).is_err() {
            metrics::counter!("cart_persist_failures_total").increment(1);
            tracing::warn!("Cart persister is gone, dropping write");
        }
    }

    /// Waits until every write queued before this call has been attempted.
    pub async fn flush(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        if self.tx.send(Job::Flush(done_tx)).is_ok() {
            let _ = done_rx.await;
        }
    }
}
