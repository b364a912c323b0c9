//! The complete server: ingest, channel and renderer.
//!
//! Startup order is renderer first, so nothing the server accepts can sit
//! in the channel without a consumer. Shutdown runs the other way: stop
//! ingestion, stop rendering, then blank the strip from the calling thread.

use std::net::SocketAddr;
use std::sync::Arc;

use thiserror::Error;

use crate::config::{Config, ConfigError};
use crate::strip::Backend;
use crate::sync::FrameChannel;
use crate::sync::worker::{FatalHandler, terminate_process};
use crate::trace::{debug, error, info};

use super::ingest::{FrameIngestServer, IngestError};
use super::render::{LedRenderer, RenderError};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Ingest(#[from] IngestError),
    #[error(transparent)]
    Render(#[from] RenderError),
}

/// A running frame server.
pub struct Pipeline<B: Backend> {
    channel: Arc<FrameChannel>,
    server: FrameIngestServer<FrameChannel>,
    renderer: LedRenderer<B>,
    local_addr: SocketAddr,
}

impl<B: Backend> Pipeline<B> {
    /// Validates `config`, then starts the renderer and the ingest server.
    /// Fatal worker errors terminate the process.
    ///
    /// # Errors
    ///
    /// Returns configuration, backend initialization and socket setup
    /// errors. Nothing is left running on error.
    pub fn spawn(config: &Config, backend: B) -> Result<Self, PipelineError> {
        Self::spawn_with_fatal_handler(config, backend, terminate_process())
    }

    /// Like [`Pipeline::spawn`], with fatal worker errors sent to `handler`.
    pub fn spawn_with_fatal_handler(
        config: &Config,
        backend: B,
        handler: FatalHandler,
    ) -> Result<Self, PipelineError> {
        config.validate()?;
        info!(
            addr = %config.server.socket_addr(),
            leds = config.strip.led_count,
            order = %config.strip.color_order,
            render_core = ?config.render_core,
            "pipeline starting"
        );

        let channel = Arc::new(FrameChannel::new());

        let mut renderer = LedRenderer::new(&config.strip, Arc::clone(&channel), backend)
            .map_err(|e| {
                error!(error = %e, "failed to initialize backend");
                e
            })?
            .pinned_to(config.render_core)
            .with_fatal_handler(Arc::clone(&handler));
        renderer.run();

        let mut server = FrameIngestServer::new(
            config.server.clone(),
            config.strip.frame_len(),
            Arc::clone(&channel),
        )
        .with_fatal_handler(handler);
        let local_addr = server.run().map_err(|e| {
            error!(error = %e, "failed to start frame ingest");
            e
        })?;

        info!(addr = %local_addr, "pipeline ready");
        Ok(Self {
            channel,
            server,
            renderer,
            local_addr,
        })
    }

    /// Address producers connect to.
    #[must_use]
    pub const fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// The channel between ingest and renderer.
    #[must_use]
    pub const fn channel(&self) -> &Arc<FrameChannel> {
        &self.channel
    }

    /// Stops ingestion, lets the renderer finish its current frame, stops
    /// it, and turns the strip off.
    ///
    /// Frames still queued at this point are discarded.
    ///
    /// # Errors
    ///
    /// Returns the backend error if the final clear fails.
    pub fn shutdown(mut self) -> Result<(), PipelineError> {
        info!("pipeline shutting down");
        self.server.stop();
        self.renderer.stop();

        let _discarded = std::iter::from_fn(|| self.channel.try_pop()).count();
        debug!(frames = _discarded, "discarded queued frames");

        self.renderer.clear()?;
        info!("pipeline stopped");
        Ok(())
    }
}
