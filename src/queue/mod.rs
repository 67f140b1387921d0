//! Durable bounded-buffer queue with disk spillover.
//!
//! Producers enqueue onto an in-memory bounded channel backed by a
//! persistent [`Store`](crate::store::Store); bursts beyond the channel
//! capacity spill to the store's overflow tier, and a background promoter
//! feeds them back to consumers as capacity frees up. Consumers acknowledge
//! processed items explicitly; anything unacknowledged is replayed after a
//! restart.
//!
//! # Examples
//!
//! ## Enqueue, dequeue, acknowledge
//!
//! ```rust
//! use std::sync::Arc;
//! use spillway::{MemoryStore, Queue, QueueConfig};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> spillway::Result<()> {
//! let queue = Queue::new(Arc::new(MemoryStore::new()), QueueConfig::default());
//! queue.init().await?;
//!
//! let id = queue.enqueue(b"job").await?;
//! let item = queue.dequeue().await?;
//! assert_eq!(item.id, id);
//! assert_eq!(item.payload, b"job");
//!
//! queue.ack(item.id).await?;
//! assert_eq!(queue.size().await?, 0);
//! queue.close().await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Spillover and promotion
//!
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use spillway::{MemoryStore, Queue, QueueConfig};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> spillway::Result<()> {
//! let config = QueueConfig {
//!     capacity: 0, // every enqueue spills to the store
//!     promoter_idle_delay: Duration::from_millis(10),
//!     recovery_limit: None,
//! };
//! let queue = Queue::new(Arc::new(MemoryStore::new()), config);
//! queue.init().await?;
//!
//! queue.enqueue(b"burst").await?;
//!
//! // The promoter moves spilled items back to waiting consumers.
//! let item = queue.dequeue().await?;
//! assert_eq!(item.payload, b"burst");
//! queue.close().await?;
//! # Ok(())
//! # }
//! ```

mod engine;
mod promoter;

pub use engine::Queue;
