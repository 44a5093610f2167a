//! Queue membership storage for the killers and victims queues

pub mod store;

pub use store::{InMemoryQueueStore, QueueStore};
