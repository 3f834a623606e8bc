//! # Skimmer Workers
//!
//! Two independently sized worker pools consume bounded job queues so
//! expensive browser-bound jobs can never starve cheap HTTP ones.
//! Submission blocks when a queue is full; that is the service's
//! backpressure. Every accepted job gets exactly one message on its
//! single-shot result channel, failure included.

pub mod job;
pub mod pool;

pub use job::{Job, JobProcessor};
pub use pool::{PoolStats, WorkerPool};
