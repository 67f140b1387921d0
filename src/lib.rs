//! # spillway
//!
//! A durable bounded-buffer queue with disk spillover.
//!
//! The primary path is an in-memory bounded hand-off channel; a persistent
//! store mirrors every item, survives restarts, and absorbs bursts that
//! exceed the channel capacity. Consumers acknowledge processing explicitly,
//! and unacknowledged work is replayed after a restart.
//!
//! The delivery contract is **at-least-once**: a consumer that crashes
//! between [`Queue::dequeue`] and [`Queue::ack`] will see the item again.
//! Ordering is best-effort FIFO within a tier; no total order is promised
//! across the fast path and the overflow tier.
//!
//! # Architecture
//!
//! - [`Queue`] - the engine: non-blocking enqueue, blocking dequeue over the
//!   union of the hand-off channel and the promotion feed, explicit ack.
//! - [`Store`] - abstract two-tier persistence, with [`RedbStore`] (embedded,
//!   durable) and [`MemoryStore`] (tests, development) adapters built in.
//! - The overflow promoter - a background task started by [`Queue::init`]
//!   that retags spilled items and hands them to waiting consumers, one per
//!   ready consumer.
//!
//! ```text
//! producer -> enqueue -+-> (channel has room) -> channel -> dequeue -> consumer
//!                      `-> (channel full)     -> store[overflow]
//!                                                    |
//!                                       promoter <---' (retag -> feed -> dequeue)
//!
//! restart: store[default] -> channel   (recovery)
//! ack:     store delete by id
//! ```
//!
//! See [`queue`] for usage examples.

pub mod config;
pub mod error;
pub mod item;
pub mod queue;
pub mod store;

pub use config::QueueConfig;
pub use error::{Error, Result};
pub use item::{Item, Tag};
pub use queue::Queue;
pub use store::{MemoryStore, RedbStore, Store};
