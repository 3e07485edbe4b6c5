use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tracing::debug;

use super::{AudioStream, PitchControl, PlaybackBuffer, TransformEngine, WINDOW_BYTES};

/// Everything one voice connection owns: the mode controller, the
/// per-speaker accumulators and the shared playback ring.
///
/// Speakers produce independently and are spliced sequentially into the
/// ring; their waveforms are not mixed.
pub struct AudioSession {
    control: PitchControl,
    engine: TransformEngine,
    playback: PlaybackBuffer,

    /// Unprocessed audio per speaker (RTP SSRC), in arrival order
    speakers: Mutex<HashMap<u32, Vec<u8>>>,

    playback_started: AtomicBool,
    closed: AtomicBool,
}

impl AudioSession {
    pub fn new() -> Self {
        Self {
            control: PitchControl::new(),
            engine: TransformEngine::new(),
            playback: PlaybackBuffer::new(),
            speakers: Default::default(),
            playback_started: AtomicBool::new(false),
            closed: AtomicBool::new(false),
        }
    }

    pub fn control(&self) -> &PitchControl {
        &self.control
    }

    pub fn playback(&self) -> &PlaybackBuffer {
        &self.playback
    }

    pub fn stream(&self) -> AudioStream {
        self.playback.stream()
    }

    pub fn engine_name(&self) -> &'static str {
        self.engine.backend_name()
    }

    /// Buffers one incoming frame and dispatches every full window through
    /// the transform engine into the playback ring. Anything smaller than a
    /// window stays buffered for the next call.
    ///
    /// Returns true exactly once per session, on the first accepted frame,
    /// which is the caller's cue to start playback.
    pub fn ingest(&self, ssrc: u32, pcm: &[i16]) -> bool {
        if self.closed.load(Ordering::Acquire) {
            return false;
        }

        let bytes: Vec<u8> = pcm.iter().flat_map(|s| s.to_le_bytes()).collect();

        // Full windows are taken out under the lock and transformed outside
        // it, so a slow shift on one speaker cannot stall another
        let windows = {
            let mut speakers = self.speakers.lock();
            let buffer = speakers.entry(ssrc).or_default();
            buffer.extend_from_slice(&bytes);

            let mut windows = Vec::new();

            while buffer.len() >= WINDOW_BYTES {
                let remainder = buffer.split_off(WINDOW_BYTES);
                windows.push(std::mem::replace(buffer, remainder));
            }

            windows
        };

        let semitones = self.control.semitones();

        for window in windows {
            let transformed = self.engine.transform(&window, semitones);

            // Teardown may have raced the transform; drop the output
            // instead of pushing into a cleared ring
            if self.closed.load(Ordering::Acquire) {
                return false;
            }

            self.playback.push(&transformed);
        }

        !self.playback_started.swap(true, Ordering::AcqRel)
    }

    /// Drops a speaker's pending audio, e.g. when they disconnect
    pub fn remove_speaker(&self, ssrc: u32) {
        if self.speakers.lock().remove(&ssrc).is_some() {
            debug!(ssrc, "dropped speaker buffer");
        }
    }

    /// Stops accepting audio and discards everything buffered
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.speakers.lock().clear();
        self.playback.clear();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    #[cfg(test)]
    fn speaker_buffered(&self, ssrc: u32) -> usize {
        self.speakers.lock().get(&ssrc).map_or(0, Vec::len)
    }
}

impl Default for AudioSession {
    fn default() -> Self {
        Self::new()
    }
}
