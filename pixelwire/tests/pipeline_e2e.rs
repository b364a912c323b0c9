//! End to end: producer → ingest → channel → renderer → backend, with the
//! waveform decoded back to colour bytes.

use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use pixelwire::Config;
use pixelwire::config::StripConfig;
use pixelwire::net::FrameClient;
use pixelwire::runtime::Pipeline;
use pixelwire::strip::encoder::decode_channel;
use pixelwire::strip::{Backend, ColorOrder, TransferBuffer};
use pixelwire::sync::WorkerError;

const TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, thiserror::Error)]
#[error("mock backend not initialized")]
struct NotInitialized;

/// Records every transfer it is handed.
#[derive(Clone, Default)]
struct RecordingBackend {
    transfers: Arc<Mutex<Vec<TransferBuffer>>>,
    in_flight: bool,
    initialized: bool,
}

impl RecordingBackend {
    fn count(&self) -> usize {
        self.transfers.lock().unwrap().len()
    }

    fn decoded(&self, index: usize, bytes: usize) -> Vec<u8> {
        decode_channel(&self.transfers.lock().unwrap()[index], bytes)
    }

    fn wait_for(&self, count: usize) {
        let deadline = Instant::now() + TIMEOUT;
        while self.count() < count {
            assert!(Instant::now() < deadline, "timed out waiting for {count} transfers");
            thread::sleep(Duration::from_millis(2));
        }
    }
}

impl Backend for RecordingBackend {
    type Error = NotInitialized;

    fn initialize(&mut self, _strip: &StripConfig) -> Result<(), NotInitialized> {
        self.initialized = true;
        Ok(())
    }

    fn submit(&mut self, buffer: &TransferBuffer) -> Result<(), NotInitialized> {
        if !self.initialized {
            return Err(NotInitialized);
        }
        assert!(!self.in_flight, "submit while a transfer is in flight");
        self.in_flight = true;
        self.transfers.lock().unwrap().push(buffer.clone());
        Ok(())
    }

    fn wait(&mut self) -> Result<(), NotInitialized> {
        self.in_flight = false;
        Ok(())
    }
}

fn config(leds: usize, order: ColorOrder) -> Config {
    let mut config = Config::default();
    config.server.listen_addr = "127.0.0.1".parse().unwrap();
    config.server.port = 0;
    config.strip.led_count = leds;
    config.strip.color_order = order;
    config
}

fn spawn(config: &Config, backend: RecordingBackend) -> Pipeline<RecordingBackend> {
    pixelwire::init_tracing();
    let on_fatal = Arc::new(|name: &str, err: &WorkerError| panic!("{name}: {err}"));
    Pipeline::spawn_with_fatal_handler(config, backend, on_fatal).unwrap()
}

fn gradient(leds: usize, seed: u8) -> Vec<u8> {
    (0..leds * 3)
        .map(|i| (i as u8).wrapping_mul(31).wrapping_add(seed))
        .collect()
}

#[test]
fn frames_round_trip_through_the_waveform() {
    let leds = 10;
    let backend = RecordingBackend::default();
    let pipeline = spawn(&config(leds, ColorOrder::Rgb), backend.clone());

    let mut client = FrameClient::connect(pipeline.local_addr(), leds).unwrap();
    client.set_ack_timeout(Some(TIMEOUT)).unwrap();
    let frames: Vec<Vec<u8>> = (0..5).map(|seed| gradient(leds, seed)).collect();
    for frame in &frames {
        client.send_frame(frame).unwrap();
    }
    backend.wait_for(frames.len());
    // Nothing beyond the sent frames is rendered while the client stays.
    thread::sleep(Duration::from_millis(50));
    assert_eq!(backend.count(), frames.len());

    for (i, frame) in frames.iter().enumerate() {
        let decoded = backend.decoded(i, frame.len());
        assert!(decoded.iter().any(|&b| b != 0), "transfer {i} is a clear");
        assert_eq!(decoded, *frame);
    }

    drop(client);
    pipeline.shutdown().unwrap();
}

#[test]
fn colour_order_reorders_wire_bytes() {
    let backend = RecordingBackend::default();
    let pipeline = spawn(&config(2, ColorOrder::Bgr), backend.clone());

    let mut client = FrameClient::connect(pipeline.local_addr(), 2).unwrap();
    client.set_ack_timeout(Some(TIMEOUT)).unwrap();
    client.send_frame(&[1, 2, 3, 4, 5, 6]).unwrap();
    backend.wait_for(1);

    assert_eq!(backend.decoded(0, 6), [3, 2, 1, 6, 5, 4]);
    drop(client);
    pipeline.shutdown().unwrap();
}

#[test]
fn disconnect_blanks_the_strip() {
    // 3 LEDs leave a partially filled symbol group.
    let leds = 3;
    let backend = RecordingBackend::default();
    let pipeline = spawn(&config(leds, ColorOrder::Grb), backend.clone());

    let mut client = FrameClient::connect(pipeline.local_addr(), leds).unwrap();
    client.set_ack_timeout(Some(TIMEOUT)).unwrap();
    client.send_solid([0xff, 0x80, 0x01]).unwrap();
    drop(client);
    backend.wait_for(2);

    assert_eq!(backend.decoded(0, 9), [0x80, 0xff, 0x01].repeat(3));
    assert_eq!(backend.decoded(1, 9), [0; 9]);
    pipeline.shutdown().unwrap();
}

#[test]
fn shutdown_leaves_strip_dark() {
    let leds = 6;
    let backend = RecordingBackend::default();
    let pipeline = spawn(&config(leds, ColorOrder::Rgb), backend.clone());

    let mut client = FrameClient::connect(pipeline.local_addr(), leds).unwrap();
    client.set_ack_timeout(Some(TIMEOUT)).unwrap();
    client.send_solid([10, 20, 30]).unwrap();
    backend.wait_for(1);

    pipeline.shutdown().unwrap();
    let last = backend.count() - 1;
    assert_eq!(backend.decoded(last, leds * 3), vec![0; leds * 3]);
}

#[test]
fn backend_sees_full_sized_buffers() {
    let leds = 1000;
    let backend = RecordingBackend::default();
    let pipeline = spawn(&config(leds, ColorOrder::Rgb), backend.clone());

    let mut client = FrameClient::connect(pipeline.local_addr(), leds).unwrap();
    client.set_ack_timeout(Some(TIMEOUT)).unwrap();
    client.send_solid([1, 2, 3]).unwrap();
    backend.wait_for(1);

    assert_eq!(backend.transfers.lock().unwrap()[0].len(), 18048);
    drop(client);
    pipeline.shutdown().unwrap();
}
