//! Background promotion of overflow items back into the hand-off path.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tracing::{debug, warn};

use crate::error::Error;
use crate::item::{Item, Tag};
use crate::store::Store;

/// Long-lived task bridging the store's overflow tier back to consumers.
///
/// Each round picks the earliest overflow item, flips its tag back to the
/// default tier in the store, and hands it off on the feed channel. The
/// hand-off send blocks until a consumer is ready, so the promoter moves one
/// item per ready consumer and never drains overflow into memory.
pub(super) struct Promoter {
    store: Arc<dyn Store>,
    feed: mpsc::Sender<Item>,
    idle_delay: Duration,
    shutdown: watch::Receiver<bool>,
}

impl Promoter {
    pub(super) fn new(
        store: Arc<dyn Store>,
        feed: mpsc::Sender<Item>,
        idle_delay: Duration,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            store,
            feed,
            idle_delay,
            shutdown,
        }
    }

    /// Runs until shutdown is observed at a suspension point (idle sleep,
    /// store call, or hand-off send).
    ///
    /// Store failures are logged and retried after `idle_delay`; the
    /// retag order guarantees a failure mid-promotion redelivers the item
    /// rather than losing it.
    pub(super) async fn run(mut self) {
        debug!("overflow promoter started");
        loop {
            if *self.shutdown.borrow() {
                break;
            }
            match self.store.pick_overflow().await {
                Ok(item) => {
                    if !self.promote(item).await {
                        break;
                    }
                },
                Err(Error::NoOverflowItems) => {
                    if !self.idle().await {
                        break;
                    }
                },
                Err(err) => {
                    warn!(error = %err, "overflow pick failed, retrying");
                    if !self.idle().await {
                        break;
                    }
                },
            }
        }
        debug!("overflow promoter stopped");
    }

    /// Retag one picked item and hand it off. Returns `false` once shutdown
    /// interrupts the hand-off.
    async fn promote(&mut self, item: Item) -> bool {
        let promoted = match self.store.retag(item.id, Tag::Overflow, Tag::Default).await {
            Ok(promoted) => promoted,
            Err(Error::NoOverflowItems) => {
                // A non-blocking dequeue claimed the item between pick and
                // retag; nothing to hand off.
                return true;
            },
            Err(err) => {
                warn!(id = %item.id, error = %err, "retag failed, retrying");
                return self.idle().await;
            },
        };

        debug!(id = %promoted.id, "promoted overflow item");
        tokio::select! {
            sent = self.feed.send(promoted) => sent.is_ok(),
            _ = self.shutdown.changed() => false,
        }
    }

    async fn idle(&mut self) -> bool {
        tokio::select! {
            () = tokio::time::sleep(self.idle_delay) => true,
            _ = self.shutdown.changed() => false,
        }
    }
}
