//! Sends frames to a pixel server: one solid colour, or a paced effect stream.
//!
//! ```sh
//! pixel-send --addr 192.168.1.20:7689 --leds 1000 --color ff8000
//! pixel-send --off
//! pixel-send --fps 30 --effect chase --color 00ff40 --duration 20 --fade-in 2 --fade-out 2
//! pixel-send --effect rainbow,wave,chase --transition 5
//! ```
//!
//! Passing `--fps` or `--effect` selects streaming. More than one effect name
//! plays them as a playlist that switches at random every 30 s to 5 min.

use std::time::Duration;

use pixelwire::animate::{EFFECT_NAMES, Effect, Pacing, Playlist, by_name};
use pixelwire::config::DEFAULT_PORT;
use pixelwire::net::{ClientError, FrameClient};

const DEFAULT_LEDS: usize = 1000;
const DEFAULT_FPS: u32 = 30;
const DEFAULT_EFFECT: &str = "rainbow";
const USAGE: &str = "usage: pixel-send [--addr HOST:PORT] [--leds N] [--color RRGGBB | --on | --off]
                  [--fps N] [--effect NAME[,NAME...]] [--duration S]
                  [--fade-in S] [--fade-out S] [--transition S]";

#[derive(Debug, thiserror::Error)]
enum SendError {
    #[error("{0}")]
    Usage(String),
    #[error(transparent)]
    Client(#[from] ClientError),
}

#[derive(Default)]
struct StreamArgs {
    fps: Option<u32>,
    effects: Option<Vec<String>>,
    duration: Option<Duration>,
    fade_in: Duration,
    fade_out: Duration,
    transition: Option<Duration>,
}

impl StreamArgs {
    fn requested(&self) -> bool {
        self.fps.is_some() || self.effects.is_some()
    }

    fn pacing(&self) -> Pacing {
        let pacing = Pacing::new(self.fps.unwrap_or(DEFAULT_FPS))
            .fade_in(self.fade_in)
            .fade_out(self.fade_out);
        match self.duration {
            Some(duration) => pacing.duration(duration),
            None => pacing,
        }
    }

    fn effect(&self, rgb: [u8; 3]) -> Result<Box<dyn Effect>, SendError> {
        let names = self
            .effects
            .clone()
            .unwrap_or_else(|| vec![DEFAULT_EFFECT.to_owned()]);
        let mut effects = names
            .iter()
            .map(|name| {
                by_name(name, rgb).ok_or_else(|| {
                    SendError::Usage(format!(
                        "unknown effect: {name} (expected one of {})",
                        EFFECT_NAMES.join(", ")
                    ))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        if effects.len() == 1 {
            return Ok(effects.remove(0));
        }
        let mut playlist = Playlist::new(effects);
        if let Some(transition) = self.transition {
            playlist = playlist.with_transition(transition);
        }
        Ok(Box::new(playlist))
    }
}

struct Args {
    addr: String,
    leds: usize,
    rgb: [u8; 3],
    stream: StreamArgs,
}

fn main() {
    if let Err(e) = run() {
        eprintln!("pixel-send: {e}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), SendError> {
    let args: Vec<String> = std::env::args().collect();
    let args = parse_args(&args)?;

    let mut client = FrameClient::connect(args.addr.as_str(), args.leds)?;
    if args.stream.requested() {
        pixelwire::init_tracing();
        let mut effect = args.stream.effect(args.rgb)?;
        let pacing = args.stream.pacing();
        let sent = client.stream(effect.as_mut(), &pacing)?;
        eprintln!("pixel-send: streamed {sent} frames of {}", effect.name());
        return Ok(());
    }

    client.send_solid(args.rgb)?;
    eprintln!(
        "pixel-send: {} LEDs set to #{:02x}{:02x}{:02x}",
        args.leds, args.rgb[0], args.rgb[1], args.rgb[2]
    );
    Ok(())
}

/// Parses `rrggbb`, with or without a leading `#`.
fn parse_color(text: &str) -> Result<[u8; 3], SendError> {
    let hex = text.strip_prefix('#').unwrap_or(text);
    let packed = (hex.len() == 6)
        .then(|| u32::from_str_radix(hex, 16).ok())
        .flatten()
        .ok_or_else(|| SendError::Usage(format!("invalid colour: {text}")))?;
    let [_, r, g, b] = packed.to_be_bytes();
    Ok([r, g, b])
}

/// Parses a non-negative number of seconds, fractions allowed.
fn parse_seconds(flag: &str, text: &str) -> Result<Duration, SendError> {
    text.parse::<f64>()
        .ok()
        .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
        .ok_or_else(|| SendError::Usage(format!("invalid value for {flag}: {text}")))
}

fn parse_number<T: std::str::FromStr>(flag: &str, text: &str) -> Result<T, SendError>
where
    T::Err: std::fmt::Display,
{
    text.parse()
        .map_err(|e| SendError::Usage(format!("invalid value for {flag}: {e}")))
}

fn parse_args(args: &[String]) -> Result<Args, SendError> {
    let mut parsed = Args {
        addr: format!("127.0.0.1:{DEFAULT_PORT}"),
        leds: DEFAULT_LEDS,
        rgb: [255, 255, 255],
        stream: StreamArgs::default(),
    };

    let mut i = 1;
    while i < args.len() {
        let flag = args[i].as_str();
        let mut next = || {
            i += 1;
            args.get(i)
                .ok_or_else(|| SendError::Usage(format!("missing value for {flag}")))
        };
        match flag {
            "--addr" | "-a" => parsed.addr = next()?.clone(),
            "--leds" | "-n" => parsed.leds = parse_number(flag, next()?)?,
            "--color" | "-c" => parsed.rgb = parse_color(next()?)?,
            "--on" => parsed.rgb = [255, 255, 255],
            "--off" => parsed.rgb = [0, 0, 0],
            "--fps" => {
                let fps: u32 = parse_number(flag, next()?)?;
                if fps == 0 {
                    return Err(SendError::Usage("--fps must be at least 1".into()));
                }
                parsed.stream.fps = Some(fps);
            }
            "--effect" | "-e" => {
                let names = next()?.split(',').map(str::to_owned).collect();
                parsed.stream.effects = Some(names);
            }
            "--duration" | "-d" => parsed.stream.duration = Some(parse_seconds(flag, next()?)?),
            "--fade-in" => parsed.stream.fade_in = parse_seconds(flag, next()?)?,
            "--fade-out" => parsed.stream.fade_out = parse_seconds(flag, next()?)?,
            "--transition" => parsed.stream.transition = Some(parse_seconds(flag, next()?)?),
            "--help" | "-h" => {
                eprintln!("{USAGE}");
                eprintln!("effects: {}", EFFECT_NAMES.join(", "));
                std::process::exit(0);
            }
            arg => return Err(SendError::Usage(format!("unknown argument: {arg}"))),
        }
        i += 1;
    }
    Ok(parsed)
}
