//! Unbounded frame queue between the ingest and render workers.
//!
//! Push never blocks; pop blocks until a frame is available. Frames are
//! delivered in push order with no loss or duplication. There is no
//! backpressure: if rendering falls behind ingestion the queue grows, and
//! [`FrameChannel::len`] is the hook for watching that happen.
//!
//! # Example
//!
//! ```
//! use pixelwire::Frame;
//! use pixelwire::sync::FrameChannel;
//!
//! let channel = FrameChannel::new();
//! channel.push(Frame::pixels(vec![255, 0, 0]));
//! channel.push(Frame::Clear);
//!
//! assert_eq!(channel.pop(), Frame::pixels(vec![255, 0, 0]));
//! assert_eq!(channel.pop(), Frame::Clear);
//! ```

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

use crate::frame::{Frame, FrameSink};
use crate::sync::worker::{StopSignal, Wake};

/// Thread-safe FIFO of frames.
#[derive(Debug, Default)]
pub struct FrameChannel {
    frames: Mutex<VecDeque<Frame>>,
    ready: Condvar,
}

impl FrameChannel {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a frame and wakes one waiting consumer.
    pub fn push(&self, frame: Frame) {
        self.lock().push_back(frame);
        self.ready.notify_one();
    }

    /// Blocks until a frame is available, then removes and returns it.
    pub fn pop(&self) -> Frame {
        let mut frames = self.lock();
        loop {
            if let Some(frame) = frames.pop_front() {
                return frame;
            }
            frames = self
                .ready
                .wait(frames)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Blocks until a frame is available or `stop` is raised.
    ///
    /// Queued frames win over a pending stop. Returns `None` only when the
    /// queue is empty and `stop` is raised. The waiter is woken through this
    /// channel's [`Wake`] impl.
    pub fn pop_or_stop(&self, stop: &StopSignal) -> Option<Frame> {
        let mut frames = self.lock();
        loop {
            if let Some(frame) = frames.pop_front() {
                return Some(frame);
            }
            if stop.is_raised() {
                return None;
            }
            frames = self
                .ready
                .wait(frames)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Removes the head frame without blocking.
    #[must_use]
    pub fn try_pop(&self) -> Option<Frame> {
        self.lock().pop_front()
    }

    /// Number of queued frames.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    // A panic while holding the lock cannot leave the deque half-updated.
    fn lock(&self) -> MutexGuard<'_, VecDeque<Frame>> {
        self.frames.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl FrameSink for FrameChannel {
    fn submit(&self, frame: Frame) {
        self.push(frame);
    }
}

impl Wake for FrameChannel {
    fn wake(&self) {
        // Taking the lock orders this notify after any in-progress check of
        // the stop flag, so the wake-up cannot slip in before the wait.
        let _frames = self.lock();
        self.ready.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::{Duration, Instant};

    fn frame(tag: u8) -> Frame {
        Frame::pixels(vec![tag, tag.wrapping_add(1), tag.wrapping_add(2)])
    }

    #[test]
    fn test_fifo_order() {
        let channel = FrameChannel::new();
        for i in 0..10 {
            channel.push(frame(i));
        }
        assert_eq!(channel.len(), 10);
        for i in 0..10 {
            assert_eq!(channel.pop(), frame(i));
        }
        assert!(channel.is_empty());
    }

    #[test]
    fn test_try_pop_empty() {
        let channel = FrameChannel::new();
        assert_eq!(channel.try_pop(), None);
        channel.push(Frame::Clear);
        assert_eq!(channel.try_pop(), Some(Frame::Clear));
        assert_eq!(channel.try_pop(), None);
    }

    #[test]
    fn test_pop_blocks_until_push() {
        let channel = Arc::new(FrameChannel::new());
        let producer = Arc::clone(&channel);

        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            producer.push(frame(7));
        });

        let started = Instant::now();
        assert_eq!(channel.pop(), frame(7));
        assert!(started.elapsed() >= Duration::from_millis(10));
        handle.join().unwrap();
    }

    #[test]
    fn test_pop_or_stop_prefers_queued_frames() {
        let channel = FrameChannel::new();
        let stop = StopSignal::new();
        channel.push(frame(1));
        stop.raise();

        assert_eq!(channel.pop_or_stop(&stop), Some(frame(1)));
        assert_eq!(channel.pop_or_stop(&stop), None);
    }

    #[test]
    fn test_wake_interrupts_pop_or_stop() {
        let channel = Arc::new(FrameChannel::new());
        let stop = StopSignal::new();
        let (consumer, consumer_stop) = (Arc::clone(&channel), stop.clone());

        let handle = thread::spawn(move || consumer.pop_or_stop(&consumer_stop));

        thread::sleep(Duration::from_millis(20));
        let started = Instant::now();
        stop.raise();
        channel.wake();

        assert_eq!(handle.join().unwrap(), None);
        assert!(started.elapsed() < Duration::from_millis(500));
    }

    #[test]
    fn test_sink_submit_pushes() {
        let channel = Arc::new(FrameChannel::new());
        let sink: Arc<dyn FrameSink> = Arc::clone(&channel) as Arc<dyn FrameSink>;
        sink.submit(frame(3));
        assert_eq!(channel.pop(), frame(3));
    }

    #[test]
    fn test_concurrent_push_pop() {
        let channel = Arc::new(FrameChannel::new());
        let producer = Arc::clone(&channel);
        let count = 2000u32;

        let handle = thread::spawn(move || {
            for i in 0..count {
                producer.push(Frame::pixels(i.to_le_bytes().to_vec()));
                if i % 64 == 0 {
                    thread::yield_now();
                }
            }
        });

        for i in 0..count {
            assert_eq!(channel.pop().as_bytes(), &i.to_le_bytes());
        }
        handle.join().unwrap();
        assert!(channel.is_empty());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_concurrent_consumer_sees_pushes_in_order(
            frames in prop::collection::vec(prop::collection::vec(any::<u8>(), 0..16), 0..64),
            pauses in prop::collection::vec(0u64..50, 0..64),
        ) {
            let channel = Arc::new(FrameChannel::new());
            let producer = Arc::clone(&channel);
            let sent: Vec<Frame> = frames.into_iter().map(Frame::pixels).collect();
            let expected = sent.clone();

            let handle = thread::spawn(move || {
                for (i, frame) in sent.into_iter().enumerate() {
                    producer.push(frame);
                    if let Some(&us) = pauses.get(i) {
                        thread::sleep(Duration::from_micros(us));
                    }
                }
            });

            let received: Vec<Frame> = (0..expected.len()).map(|_| channel.pop()).collect();
            handle.join().unwrap();

            prop_assert_eq!(received, expected);
            prop_assert!(channel.is_empty());
        }
    }
}
