//! Pixel server daemon.
//!
//! Listens for a frame producer and renders its frames onto the strip.
//!
//! # Usage
//!
//! ```sh
//! pixel-server --config /etc/pixelwire.toml --leds 300 --order grb
//! ```

use std::net::IpAddr;
use std::time::Duration;

use pixelwire::config::ConfigError;
use pixelwire::runtime::{Pipeline, PipelineError};
use pixelwire::strip::{ColorOrder, SimulatedBackend};
use pixelwire::{Config, init_tracing};

#[derive(Debug, thiserror::Error)]
enum ServerError {
    #[error("{0}")]
    Usage(String),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

fn main() {
    init_tracing();
    if let Err(e) = run() {
        eprintln!("pixel-server: {e}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), ServerError> {
    let args: Vec<String> = std::env::args().collect();
    let config = parse_args(&args)?;

    eprintln!(
        "pixel-server: {} LEDs ({}) at {} Hz, listening on {}",
        config.strip.led_count,
        config.strip.color_order,
        config.strip.frequency,
        config.server.socket_addr()
    );

    let pipeline = Pipeline::spawn(&config, SimulatedBackend::new())?;
    eprintln!("pixel-server: ready on {}", pipeline.local_addr());

    // No signal handling yet: SIGINT/SIGTERM end the process directly.
    loop {
        std::thread::sleep(Duration::from_secs(3600));
    }
}

fn value<'a>(args: &'a [String], i: usize, flag: &str) -> Result<&'a str, ServerError> {
    args.get(i)
        .map(String::as_str)
        .ok_or_else(|| ServerError::Usage(format!("missing value for {flag}")))
}

fn invalid(flag: &str, err: impl std::fmt::Display) -> ServerError {
    ServerError::Usage(format!("invalid value for {flag}: {err}"))
}

/// Parses command line arguments into a [`Config`]. Flags override the
/// config file regardless of their position.
fn parse_args(args: &[String]) -> Result<Config, ServerError> {
    let mut config_path: Option<&str> = None;
    let mut listen: Option<IpAddr> = None;
    let mut port: Option<u16> = None;
    let mut leds: Option<usize> = None;
    let mut order: Option<ColorOrder> = None;
    let mut frequency: Option<u32> = None;

    let mut i = 1;
    while i < args.len() {
        let flag = args[i].as_str();
        match flag {
            "--config" | "-c" => {
                i += 1;
                config_path = Some(value(args, i, flag)?);
            }
            "--listen" | "-l" => {
                i += 1;
                listen = Some(value(args, i, flag)?.parse().map_err(|e| invalid(flag, e))?);
            }
            "--port" | "-p" => {
                i += 1;
                port = Some(value(args, i, flag)?.parse().map_err(|e| invalid(flag, e))?);
            }
            "--leds" | "-n" => {
                i += 1;
                leds = Some(value(args, i, flag)?.parse().map_err(|e| invalid(flag, e))?);
            }
            "--order" | "-o" => {
                i += 1;
                order = Some(value(args, i, flag)?.parse().map_err(|e| invalid(flag, e))?);
            }
            "--frequency" | "-f" => {
                i += 1;
                frequency = Some(value(args, i, flag)?.parse().map_err(|e| invalid(flag, e))?);
            }
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            arg => return Err(ServerError::Usage(format!("unknown argument: {arg}"))),
        }
        i += 1;
    }

    let mut config = match config_path {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Some(listen) = listen {
        config.server.listen_addr = listen;
    }
    if let Some(port) = port {
        config.server.port = port;
    }
    if let Some(leds) = leds {
        config.strip.led_count = leds;
    }
    if let Some(order) = order {
        config.strip.color_order = order;
    }
    if let Some(frequency) = frequency {
        config.strip.frequency = frequency;
    }
    config.validate()?;
    Ok(config)
}

fn print_usage() {
    eprintln!(
        r#"pixel-server - stream TCP frames onto an LED strip

USAGE:
    pixel-server [OPTIONS]

OPTIONS:
    -c, --config <FILE>      TOML config file
    -l, --listen <IP>        Listen address (default: 0.0.0.0)
    -p, --port <PORT>        Listen port (default: 7689)
    -n, --leds <COUNT>       Number of LEDs (default: 1000)
    -o, --order <ORDER>      Colour order: rgb, rbg, grb, gbr, brg, bgr (default: rgb)
    -f, --frequency <HZ>     Strip bit rate (default: 800000)
    -h, --help               Print this help message

ENVIRONMENT:
    RUST_LOG                 Log filter (default: pixelwire=info)

PROTOCOL:
    Send 3 x LEDs bytes of RGB per frame; the server answers each frame
    with the 4 bytes "true". One client at a time.
"#
    );
}
