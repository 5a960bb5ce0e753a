//! Bounded in-memory event queue store.

mod queues;

pub use queues::EventQueueStore;
