//! The queue engine: bounded hand-off channel, fast-path enqueue/dequeue,
//! explicit acknowledgement, and lifecycle.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::promoter::Promoter;
use crate::config::QueueConfig;
use crate::error::{Error, Result};
use crate::item::{Item, Tag};
use crate::store::Store;

/// Receive ends of the two ready sources, locked together so concurrent
/// consumers serialize on the union-select.
struct Channels {
    default_rx: mpsc::Receiver<Item>,
    feed_rx: mpsc::Receiver<Item>,
}

struct QueueInner {
    store: Arc<dyn Store>,
    config: QueueConfig,
    default_tx: mpsc::Sender<Item>,
    /// Taken by `init` when the promoter is spawned; once the promoter stops,
    /// dropping its sender closes the feed.
    feed_tx: parking_lot::Mutex<Option<mpsc::Sender<Item>>>,
    channels: tokio::sync::Mutex<Channels>,
    shutdown_tx: watch::Sender<bool>,
    promoter: parking_lot::Mutex<Option<JoinHandle<()>>>,
    initialized: AtomicBool,
    closed: AtomicBool,
}

/// Durable bounded-buffer queue with disk spillover.
///
/// The fast path is an in-memory bounded channel; every item is also
/// persisted to the [`Store`], so unacknowledged work survives restarts and
/// bursts beyond the channel capacity spill to the store's overflow tier. A
/// background promoter moves spilled items back into the hand-off path as
/// consumers free capacity.
///
/// Delivery is at-least-once: a consumer that crashes between
/// [`dequeue`](Queue::dequeue) and [`ack`](Queue::ack) sees the item again
/// after restart. Ordering is best-effort; no total order is promised across
/// the channel and the promotion feed.
///
/// `Queue` is `Clone` and safe for concurrent producers and consumers.
#[derive(Clone)]
pub struct Queue {
    inner: Arc<QueueInner>,
}

impl Queue {
    /// Create a queue over `store`. No store I/O happens until
    /// [`init`](Queue::init).
    pub fn new(store: Arc<dyn Store>, config: QueueConfig) -> Self {
        // A zero-capacity config still gets a channel; enqueue just never
        // uses it, so every item takes the overflow path.
        let (default_tx, default_rx) = mpsc::channel(config.capacity.max(1));
        // Capacity 1 is the closest tokio gets to a rendezvous hand-off: the
        // promoter runs at most one promotion ahead of consumers.
        let (feed_tx, feed_rx) = mpsc::channel(1);
        let (shutdown_tx, _) = watch::channel(false);

        Self {
            inner: Arc::new(QueueInner {
                store,
                config,
                default_tx,
                feed_tx: parking_lot::Mutex::new(Some(feed_tx)),
                channels: tokio::sync::Mutex::new(Channels {
                    default_rx,
                    feed_rx,
                }),
                shutdown_tx,
                promoter: parking_lot::Mutex::new(None),
                initialized: AtomicBool::new(false),
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// Initialize the store, replay persisted default-tier items into the
    /// channel, and start the overflow promoter.
    ///
    /// Must be called once before any enqueue or dequeue. Recovery is bounded
    /// by `min(recovery_limit, capacity)` so the channel cannot be overfilled
    /// by replay.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AlreadyInitialized`] on a second call, and any store
    /// failure verbatim; on failure the promoter is not started and the
    /// queue must not be used.
    pub async fn init(&self) -> Result<()> {
        self.ensure_open()?;
        if self.inner.initialized.swap(true, Ordering::SeqCst) {
            return Err(Error::AlreadyInitialized);
        }

        self.inner.store.init().await?;

        let limit = self.inner.config.effective_recovery_limit();
        let mut recovered = 0usize;
        if limit > 0 {
            for item in self.inner.store.get_default(limit).await? {
                if self.inner.default_tx.try_send(item).is_err() {
                    warn!("channel filled before recovery finished");
                    break;
                }
                recovered += 1;
            }
        }

        let feed_tx = self.inner.feed_tx.lock().take();
        if let Some(feed_tx) = feed_tx {
            let promoter = Promoter::new(
                Arc::clone(&self.inner.store),
                feed_tx,
                self.inner.config.promoter_idle_delay,
                self.inner.shutdown_tx.subscribe(),
            );
            *self.inner.promoter.lock() = Some(tokio::spawn(promoter.run()));
        }

        info!(recovered, "queue initialized");
        Ok(())
    }

    /// Enqueue a payload, returning its generated id.
    ///
    /// Never blocks on channel pressure: if the channel has room the item
    /// takes the fast path, otherwise it is tagged for the overflow tier
    /// before persistence. Either way the call costs exactly one store
    /// round-trip.
    ///
    /// # Errors
    ///
    /// Returns the store's error if persistence fails. When the channel send
    /// already succeeded, the in-memory copy may still reach a consumer even
    /// though the put failed; acking that id is then a no-op. Callers that
    /// saw the error should retry, accepting a possible duplicate.
    pub async fn enqueue(&self, payload: &[u8]) -> Result<Uuid> {
        self.ensure_open()?;

        let mut item = Item::new(payload.to_vec());
        let handed_off = self.inner.config.capacity > 0
            && self.inner.default_tx.try_send(item.clone()).is_ok();
        if !handed_off {
            item.tag = Tag::Overflow;
        }

        self.inner.store.put(&item).await?;
        Ok(item.id)
    }

    /// Wait for the next ready item.
    ///
    /// Reads from the logical union of the hand-off channel and the
    /// promoter feed; ties are resolved non-deterministically. The returned
    /// item always reports [`Tag::Default`] regardless of origin.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Closed`] once the queue shuts down, including for
    /// callers already blocked in `dequeue`.
    pub async fn dequeue(&self) -> Result<Item> {
        // Subscribe before the closed check: `close` flips the flag first and
        // signals second, so a subscriber that saw the queue open here is
        // guaranteed to observe the signal.
        let mut shutdown = self.inner.shutdown_tx.subscribe();
        self.ensure_open()?;

        let mut channels = self.inner.channels.lock().await;
        let channels = &mut *channels;

        tokio::select! {
            Some(item) = channels.default_rx.recv() => Ok(deliver(item)),
            Some(item) = channels.feed_rx.recv() => Ok(deliver(item)),
            _ = shutdown.changed() => Err(Error::Closed),
            else => Err(Error::Closed),
        }
    }

    /// Take the next ready item without waiting.
    ///
    /// Drains the channels first, then attempts a synchronous pick-and-retag
    /// on the overflow tier, bypassing the promoter. This races with the
    /// promoter by design and may spuriously report [`Error::NoItems`] while
    /// an item is mid-promotion.
    ///
    /// # Errors
    ///
    /// [`Error::NoItems`] when nothing is ready, [`Error::Closed`] after
    /// shutdown, or a store failure.
    pub async fn try_dequeue(&self) -> Result<Item> {
        self.ensure_open()?;

        {
            let mut channels = self.inner.channels.lock().await;
            if let Ok(item) = channels.default_rx.try_recv() {
                return Ok(deliver(item));
            }
            if let Ok(item) = channels.feed_rx.try_recv() {
                return Ok(deliver(item));
            }
        }

        let picked = match self.inner.store.pick_overflow().await {
            Ok(picked) => picked,
            Err(Error::NoOverflowItems) => return Err(Error::NoItems),
            Err(err) => return Err(err),
        };
        match self
            .inner
            .store
            .retag(picked.id, Tag::Overflow, Tag::Default)
            .await
        {
            Ok(item) => Ok(deliver(item)),
            // The promoter claimed it first; it will arrive on the feed.
            Err(Error::NoOverflowItems) => Err(Error::NoItems),
            Err(err) => Err(err),
        }
    }

    /// Acknowledge a processed item, removing it from the store.
    ///
    /// Idempotent: acking an unknown or already-acked id succeeds.
    ///
    /// # Errors
    ///
    /// Returns a store failure or [`Error::Closed`] after shutdown.
    pub async fn ack(&self, id: Uuid) -> Result<()> {
        self.ensure_open()?;
        let removed = self.inner.store.delete(id).await?;
        if !removed {
            debug!(%id, "ack for unknown id");
        }
        Ok(())
    }

    /// Total number of unacknowledged items in the store, across both tiers.
    ///
    /// # Errors
    ///
    /// Returns a store failure or [`Error::Closed`] after shutdown.
    pub async fn size(&self) -> Result<usize> {
        self.ensure_open()?;
        self.inner.store.size().await
    }

    /// Shut the queue down.
    ///
    /// Signals the promoter and waits for it to stop at its next suspension
    /// point, then wakes every blocked `dequeue` with [`Error::Closed`].
    /// In-flight channel items are not drained; they remain persisted and are
    /// replayed on the next start. Idempotent.
    pub async fn close(&self) -> Result<()> {
        if self.inner.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        let _ = self.inner.shutdown_tx.send(true);

        let handle = self.inner.promoter.lock().take();
        if let Some(handle) = handle {
            if let Err(err) = handle.await {
                warn!(error = %err, "promoter task did not stop cleanly");
            }
        }

        debug!("queue closed");
        Ok(())
    }

    fn ensure_open(&self) -> Result<()> {
        if self.inner.closed.load(Ordering::SeqCst) {
            return Err(Error::Closed);
        }
        Ok(())
    }
}

/// Items leave the engine on the default tier, whatever path they took.
fn deliver(mut item: Item) -> Item {
    item.tag = Tag::Default;
    item
}
