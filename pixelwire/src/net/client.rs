//! Blocking producer for the frame protocol.

use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::thread;
use std::time::Duration;

use minstant::Instant;
use thiserror::Error;

use crate::animate::{Effect, Pacing, scale};
use crate::strip::layout::COLORS_PER_LED;
use crate::trace::{debug, info};

/// Acknowledgment written by the server after every complete frame.
pub const ACK: &[u8; 4] = b"true";

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("frame is {actual} bytes, server expects {expected}")]
    FrameLength { expected: usize, actual: usize },
    #[error("unexpected acknowledgment {0:?}")]
    BadAck([u8; 4]),
}

/// Sends fixed-size frames and waits for each acknowledgment.
///
/// The protocol is lockstep: [`FrameClient::send_frame`] returns only after
/// the server has queued the frame.
pub struct FrameClient {
    stream: TcpStream,
    frame_len: usize,
}

impl FrameClient {
    /// Connects to a server driving `led_count` LEDs.
    pub fn connect(addr: impl ToSocketAddrs, led_count: usize) -> Result<Self, ClientError> {
        let stream = TcpStream::connect(addr)?;
        stream.set_nodelay(true)?;
        Ok(Self {
            stream,
            frame_len: led_count * COLORS_PER_LED,
        })
    }

    /// Bytes per frame.
    #[must_use]
    pub const fn frame_len(&self) -> usize {
        self.frame_len
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.stream.local_addr()
    }

    /// Bounds how long [`FrameClient::send_frame`] waits for the ack.
    pub fn set_ack_timeout(&self, timeout: Option<Duration>) -> io::Result<()> {
        self.stream.set_read_timeout(timeout)
    }

    /// Writes one frame and blocks for its acknowledgment.
    ///
    /// # Errors
    ///
    /// Rejects frames of the wrong length without sending anything.
    pub fn send_frame(&mut self, frame: &[u8]) -> Result<(), ClientError> {
        if frame.len() != self.frame_len {
            return Err(ClientError::FrameLength {
                expected: self.frame_len,
                actual: frame.len(),
            });
        }
        self.stream.write_all(frame)?;

        let mut ack = [0u8; 4];
        self.stream.read_exact(&mut ack)?;
        if &ack != ACK {
            return Err(ClientError::BadAck(ack));
        }
        Ok(())
    }

    /// Sends every LED the same colour.
    pub fn send_solid(&mut self, rgb: [u8; 3]) -> Result<(), ClientError> {
        let frame = rgb.repeat(self.frame_len / COLORS_PER_LED);
        self.send_frame(&frame)
    }

    /// Drives `effect` at the pacing's frame rate, sending each frame it
    /// renders, and returns the number of frames sent.
    ///
    /// The effect is advanced by exactly one period per frame. Frames are
    /// released on a fixed schedule; when a send overruns its slot the
    /// schedule restarts from now instead of bursting to catch up. Every frame
    /// is scaled by [`Pacing::envelope`]. An open-ended pacing only returns on
    /// error.
    ///
    /// # Errors
    ///
    /// Stops at the first frame the server fails to acknowledge.
    pub fn stream(&mut self, effect: &mut dyn Effect, pacing: &Pacing) -> Result<u64, ClientError> {
        let period = pacing.period();
        let mut frame = vec![0u8; self.frame_len];
        let mut sent = 0u64;
        info!(
            effect = effect.name(),
            fps = pacing.fps(),
            frames = ?pacing.total_frames(),
            "streaming"
        );

        let mut deadline = Instant::now();
        while pacing.total_frames().is_none_or(|total| sent < total) {
            effect.animate(period, &mut frame);
            sent += 1;
            scale(&mut frame, pacing.envelope(sent));
            self.send_frame(&frame)?;

            deadline += period;
            let now = Instant::now();
            if deadline > now {
                thread::sleep(deadline - now);
            } else {
                debug!(
                    frame = sent,
                    behind_us = (now - deadline).as_micros() as u64,
                    "frame overran its slot"
                );
                deadline = now;
            }
        }

        debug!(frames = sent, "stream finished");
        Ok(sent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;
    use std::thread;

    #[test]
    fn wrong_length_is_rejected_before_sending() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let mut client = FrameClient::connect(listener.local_addr().unwrap(), 2).unwrap();
        assert_eq!(client.frame_len(), 6);

        let err = client.send_frame(&[0; 5]).unwrap_err();
        assert!(matches!(
            err,
            ClientError::FrameLength {
                expected: 6,
                actual: 5
            }
        ));
    }

    #[test]
    fn send_frame_waits_for_ack() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let server = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut frame = [0u8; 6];
            stream.read_exact(&mut frame).unwrap();
            stream.write_all(ACK).unwrap();
            frame
        });

        let mut client = FrameClient::connect(addr, 2).unwrap();
        client.send_solid([1, 2, 3]).unwrap();
        assert_eq!(server.join().unwrap(), [1, 2, 3, 1, 2, 3]);
    }

    #[test]
    fn stream_stops_when_server_goes_away() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let server = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut frame = [0u8; 3];
            stream.read_exact(&mut frame).unwrap();
            stream.write_all(ACK).unwrap();
            frame
        });

        let mut client = FrameClient::connect(addr, 1).unwrap();
        client.set_ack_timeout(Some(Duration::from_secs(5))).unwrap();
        let mut effect = crate::animate::Solid::new([4, 5, 6]);
        let err = client
            .stream(&mut effect, &Pacing::new(100).frames(5))
            .unwrap_err();
        assert!(matches!(err, ClientError::Io(_)));
        assert_eq!(server.join().unwrap(), [4, 5, 6]);
    }

    #[test]
    fn wrong_ack_is_an_error() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let server = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut frame = [0u8; 3];
            stream.read_exact(&mut frame).unwrap();
            stream.write_all(b"nope").unwrap();
        });

        let mut client = FrameClient::connect(addr, 1).unwrap();
        let err = client.send_frame(&[9, 9, 9]).unwrap_err();
        assert!(matches!(err, ClientError::BadAck(ack) if &ack == b"nope"));
        server.join().unwrap();
    }
}
