//! Socket layer: the non-blocking ingestion listener and the blocking
//! producer-side client.

pub mod client;
pub mod listener;

pub use client::{ACK, ClientError, FrameClient};
pub use listener::FrameListener;
