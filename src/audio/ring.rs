use std::{
    io::{Read, Seek},
    sync::Arc,
    time::Duration,
};

use parking_lot::Mutex;
use ringbuf::{HeapConsumer, HeapProducer, HeapRb};
use songbird::input::{reader::MediaSource, Codec, Container, Input, Reader};
use tracing::warn;

use super::{BYTES_PER_SECOND, FRAME_BYTES};

type AudioProducer = Arc<Mutex<HeapProducer<u8>>>;
type AudioConsumer = Arc<Mutex<HeapConsumer<u8>>>;

/// How much transformed audio the ring can hold before writes are dropped
const RING_CAPACITY: usize = BYTES_PER_SECOND * 30;

/// Absorbs transformed audio pushed asynchronously by every speaker and is
/// drained one frame per tick by the playback side. Underruns resolve to
/// silence instead of blocking so the output clock is never stalled.
pub struct PlaybackBuffer {
    producer: AudioProducer,
    consumer: AudioConsumer,
}

impl PlaybackBuffer {
    pub fn new() -> Self {
        let (producer, consumer) = HeapRb::new(RING_CAPACITY).split();

        Self {
            producer: Mutex::new(producer).into(),
            consumer: Mutex::new(consumer).into(),
        }
    }

    /// Appends transformed audio to the tail. Safe to call from any number
    /// of writer threads; no ordering is promised between them.
    pub fn push(&self, bytes: &[u8]) {
        let written = self.producer.lock().push_slice(bytes);

        if written < bytes.len() {
            warn!(
                dropped = bytes.len() - written,
                "playback buffer overflow"
            );
        }
    }

    /// Removes and returns exactly one frame, or returns one frame of
    /// silence without touching the buffer when not enough is queued.
    pub fn read_frame(&self) -> Vec<u8> {
        let mut frame = vec![0; FRAME_BYTES];
        pop_frame(&mut self.consumer.lock(), &mut frame);
        frame
    }

    pub fn clear(&self) {
        self.consumer.lock().clear();
    }

    /// Currently queued audio expressed as playback time
    pub fn buffered_duration(&self) -> Duration {
        let buffered = self.consumer.lock().len();
        Duration::from_secs_f64(buffered as f64 / BYTES_PER_SECOND as f64)
    }

    pub fn stream(&self) -> AudioStream {
        AudioStream(self.consumer.clone())
    }
}

impl Default for PlaybackBuffer {
    fn default() -> Self {
        Self::new()
    }
}

fn pop_frame(consumer: &mut HeapConsumer<u8>, frame: &mut [u8]) {
    if consumer.len() >= FRAME_BYTES {
        consumer.pop_slice(frame);
    } else {
        frame.fill(0);
    }
}

/// Reader handed to the voice driver for playback
#[derive(Clone)]
pub struct AudioStream(AudioConsumer);

impl AudioStream {
    pub fn into_input(self) -> Input {
        // Clear the stream to minimize latency
        self.0.lock().clear();

        Input::new(
            true,
            Reader::Extension(Box::new(self)),
            Codec::Pcm,
            Container::Raw,
            None,
        )
    }
}

impl Read for AudioStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let mut consumer = self.0.lock();
        let safe_length = buf.len() / FRAME_BYTES * FRAME_BYTES;

        if safe_length == 0 {
            // Sub-frame reads would break alignment, serve silence instead
            buf.fill(0);
            return Ok(buf.len());
        }

        for frame in buf[..safe_length].chunks_exact_mut(FRAME_BYTES) {
            pop_frame(&mut consumer, frame);
        }

        Ok(safe_length)
    }
}

impl Seek for AudioStream {
    fn seek(&mut self, _: std::io::SeekFrom) -> std::io::Result<u64> {
        unreachable!()
    }
}

impl MediaSource for AudioStream {
    fn byte_len(&self) -> Option<u64> {
        None
    }

    fn is_seekable(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_buffer_reads_silence() {
        let buffer = PlaybackBuffer::new();

        let frame = buffer.read_frame();
        assert_eq!(frame.len(), FRAME_BYTES);
        assert!(frame.iter().all(|b| *b == 0));
        assert_eq!(buffer.buffered_duration(), Duration::ZERO);
    }

    #[test]
    fn two_frames_then_silence() {
        let buffer = PlaybackBuffer::new();
        buffer.push(&vec![7; FRAME_BYTES * 2]);

        assert_eq!(buffer.read_frame(), vec![7; FRAME_BYTES]);
        assert_eq!(buffer.read_frame(), vec![7; FRAME_BYTES]);
        assert_eq!(buffer.buffered_duration(), Duration::ZERO);

        assert_eq!(buffer.read_frame(), vec![0; FRAME_BYTES]);
    }

    #[test]
    fn partial_frame_is_not_drained() {
        let buffer = PlaybackBuffer::new();
        buffer.push(&vec![9; FRAME_BYTES - 1]);

        assert_eq!(buffer.read_frame(), vec![0; FRAME_BYTES]);
        assert_eq!(
            buffer.buffered_duration(),
            Duration::from_secs_f64((FRAME_BYTES - 1) as f64 / BYTES_PER_SECOND as f64)
        );
    }

    #[test]
    fn reads_preserve_push_order() {
        let buffer = PlaybackBuffer::new();
        buffer.push(&vec![1; FRAME_BYTES]);
        buffer.push(&vec![2; FRAME_BYTES]);

        assert_eq!(buffer.read_frame(), vec![1; FRAME_BYTES]);
        assert_eq!(buffer.read_frame(), vec![2; FRAME_BYTES]);
    }

    #[test]
    fn clear_discards_everything() {
        let buffer = PlaybackBuffer::new();
        buffer.push(&vec![5; FRAME_BYTES * 3]);
        buffer.clear();

        assert_eq!(buffer.buffered_duration(), Duration::ZERO);
        assert_eq!(buffer.read_frame(), vec![0; FRAME_BYTES]);
    }

    #[test]
    fn stream_serves_whole_frames_and_pads_the_rest() {
        let buffer = PlaybackBuffer::new();
        buffer.push(&vec![3; FRAME_BYTES]);

        let mut stream = buffer.stream();
        let mut out = vec![1; FRAME_BYTES * 2];
        let read = stream.read(&mut out).unwrap();

        assert_eq!(read, FRAME_BYTES * 2);
        assert_eq!(&out[..FRAME_BYTES], &vec![3; FRAME_BYTES][..]);
        assert!(out[FRAME_BYTES..].iter().all(|b| *b == 0));
    }
}
