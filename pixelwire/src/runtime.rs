//! Long-lived workers and their composition.
//!
//! - [`ingest`]: TCP frame ingestion into a [`FrameSink`](crate::FrameSink).
//! - [`render`]: frame encoding and hardware hand-off.
//! - [`pipeline`]: both of the above joined by a
//!   [`FrameChannel`](crate::sync::FrameChannel).

pub mod ingest;
pub mod pipeline;
pub mod render;

pub use ingest::{FrameIngestServer, IngestError};
pub use pipeline::{Pipeline, PipelineError};
pub use render::{LedRenderer, RenderError};
