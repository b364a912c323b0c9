//! Synchronization primitives shared by the ingest and render workers.
//!
//! - [`worker`] - cancellable worker threads.
//! - [`frame_channel`] - the unbounded FIFO between ingest and render.

pub mod frame_channel;
pub mod worker;

pub use frame_channel::FrameChannel;
pub use worker::{CancellableWorker, StopSignal, Tickable, Wake, WorkerError, WorkerState};
