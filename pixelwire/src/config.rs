//! Configuration for the pixel server.
//!
//! Everything has a default, so an empty TOML file is a valid config:
//!
//! ```toml
//! render_core = 3
//!
//! [server]
//! listen_addr = "0.0.0.0"
//! port = 7689
//!
//! [strip]
//! led_count = 500
//! color_order = "grb"
//! ```

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::strip::ColorOrder;
use crate::strip::layout::{COLORS_PER_LED, DEFAULT_RESET_US, TransferLayout};

/// Default TCP port for frame ingestion.
pub const DEFAULT_PORT: u16 = 7689;

/// Error loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Complete configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub strip: StripConfig,
    /// CPU core for the render thread. Unpinned if absent.
    pub render_core: Option<usize>,
}

impl Config {
    /// Loads and validates a TOML config file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, and the
    /// errors of [`Config::from_toml`] otherwise.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml(&text)
    }

    /// Parses and validates TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed TOML or unknown values,
    /// and [`ConfigError::Invalid`] if validation fails.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the values a running pipeline depends on.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first bad value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.strip.validate()
    }
}

/// Ingestion socket settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: IpAddr,
    pub port: u16,
    /// Pending-connection queue length passed to `listen(2)`.
    pub backlog: i32,
}

impl ServerConfig {
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.listen_addr, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            backlog: 10,
        }
    }
}

/// LED strip settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StripConfig {
    pub led_count: usize,
    /// GPIO pin carrying the data signal.
    pub gpio: u8,
    /// DMA channel used by the backend.
    pub dma: u8,
    /// Strip bit rate in Hz.
    pub frequency: u32,
    pub color_order: ColorOrder,
    /// Minimum low time that latches a frame, in microseconds. Check the
    /// strip's datasheet; newer WS2812B parts need 280.
    pub reset_us: u32,
}

impl StripConfig {
    /// Bytes per frame on the wire.
    #[must_use]
    pub const fn frame_len(&self) -> usize {
        self.led_count * COLORS_PER_LED
    }

    #[must_use]
    pub fn layout(&self) -> TransferLayout {
        TransferLayout::new(self.led_count, self.frequency, self.reset_us)
    }

    /// Requires a non-zero LED count, frequency and reset time.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first bad value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.led_count == 0 {
            return Err(ConfigError::Invalid("led_count must be at least 1".into()));
        }
        if self.frequency == 0 {
            return Err(ConfigError::Invalid("frequency must be non-zero".into()));
        }
        if self.reset_us == 0 {
            return Err(ConfigError::Invalid("reset_us must be non-zero".into()));
        }
        Ok(())
    }
}

impl Default for StripConfig {
    fn default() -> Self {
        Self {
            led_count: 1000,
            gpio: 18,
            dma: 10,
            frequency: 800_000,
            color_order: ColorOrder::Rgb,
            reset_us: DEFAULT_RESET_US,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_deployment() {
        let config = Config::default();
        assert_eq!(
            config.server.socket_addr(),
            "0.0.0.0:7689".parse::<SocketAddr>().unwrap()
        );
        assert_eq!(config.strip.led_count, 1000);
        assert_eq!(config.strip.frame_len(), 3000);
        assert_eq!(config.strip.frequency, 800_000);
        assert_eq!(config.render_core, None);
        config.validate().unwrap();
    }

    #[test]
    fn empty_toml_is_default() {
        assert_eq!(Config::from_toml("").unwrap(), Config::default());
    }

    #[test]
    fn partial_toml_overrides_fields() {
        let config = Config::from_toml(
            r#"
            render_core = 2

            [server]
            listen_addr = "127.0.0.1"
            port = 9000

            [strip]
            led_count = 150
            color_order = "grb"
            "#,
        )
        .unwrap();

        assert_eq!(config.server.socket_addr(), "127.0.0.1:9000".parse().unwrap());
        assert_eq!(config.server.backlog, 10);
        assert_eq!(config.strip.led_count, 150);
        assert_eq!(config.strip.color_order, ColorOrder::Grb);
        assert_eq!(config.strip.gpio, 18);
        assert_eq!(config.render_core, Some(2));
    }

    #[test]
    fn zero_leds_is_invalid() {
        let err = Config::from_toml("[strip]\nled_count = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn validate_names_the_first_bad_value() {
        let mut config = Config::default();
        config.strip.frequency = 0;
        config.strip.reset_us = 0;
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
        assert!(err.to_string().contains("frequency"), "{err}");

        config.strip.frequency = 800_000;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("reset_us"), "{err}");
    }

    #[test]
    fn unknown_colour_order_fails_to_parse() {
        let err = Config::from_toml("[strip]\ncolor_order = \"rgbw\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = Config::load("/nonexistent/pixelwire.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
