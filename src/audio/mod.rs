pub mod modes;
pub mod resample;
pub mod ring;
pub mod session;
pub mod transform;

#[cfg(feature = "vocoder")]
pub mod vocoder;

#[cfg(feature = "voiche")]
pub mod voiche_shift;

pub use modes::{GenderDirection, PitchControl, PitchMode};
pub use ring::{AudioStream, PlaybackBuffer};
pub use session::AudioSession;
pub use transform::TransformEngine;

pub type Sample = f32;

/// Discord voice transport format: 48 kHz, stereo, 16-bit signed LE, 20 ms frames
pub const SAMPLE_RATE: usize = 48_000;
pub const CHANNELS: usize = 2;
pub const SAMPLE_IN_BYTES: usize = 2;

pub const FRAME_SAMPLES: usize = SAMPLE_RATE / 50;
pub const FRAME_BYTES: usize = FRAME_SAMPLES * CHANNELS * SAMPLE_IN_BYTES;

/// Frames accumulated per pitch-shift invocation (200 ms).
/// Shorter windows noticeably degrade phase vocoder quality.
pub const WINDOW_FRAMES: usize = 10;
pub const WINDOW_BYTES: usize = FRAME_BYTES * WINDOW_FRAMES;

pub const BYTES_PER_SECOND: usize = SAMPLE_RATE * CHANNELS * SAMPLE_IN_BYTES;

/// Interleaved i16 little-endian bytes to normalized floats
pub fn samples_from_bytes(bytes: &[u8]) -> Vec<Sample> {
    bytes
        .chunks_exact(SAMPLE_IN_BYTES)
        .map(|b| i16::from_le_bytes([b[0], b[1]]) as Sample / 32768.)
        .collect()
}

/// Normalized floats back to interleaved i16 little-endian bytes, saturating
pub fn bytes_from_samples(samples: &[Sample]) -> Vec<u8> {
    samples
        .iter()
        .map(|s| (s * 32768.).clamp(i16::MIN as Sample, i16::MAX as Sample) as i16)
        .flat_map(|s| s.to_le_bytes())
        .collect()
}

/// Average interleaved channels down to mono
pub fn downmix(interleaved: &[Sample], channels: usize) -> Vec<Sample> {
    if channels <= 1 {
        return interleaved.to_vec();
    }

    interleaved
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<Sample>() / channels as Sample)
        .collect()
}

/// Duplicate mono samples across the requested channel count
pub fn upmix(mono: &[Sample], channels: usize) -> Vec<Sample> {
    mono.iter()
        .flat_map(|s| std::iter::repeat(*s).take(channels))
        .collect()
}
