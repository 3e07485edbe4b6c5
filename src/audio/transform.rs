use thiserror::Error;
use tracing::{error, info};

use super::resample::LinearResampler;
use super::{bytes_from_samples, downmix, samples_from_bytes, upmix, Sample, CHANNELS};

#[cfg(feature = "vocoder")]
use super::vocoder::PhaseVocoder;

#[cfg(feature = "voiche")]
use super::voiche_shift::VoicheShifter;

/// A pitch shift backend operating on mono samples.
/// Output length is allowed to drift, the engine forces it back.
pub trait PitchShift: Send + Sync {
    fn name(&self) -> &'static str;

    fn shift(&self, mono: &[Sample], semitones: Sample) -> Result<Vec<Sample>, TransformError>;
}

#[derive(Error, Debug)]
pub enum TransformError {
    #[error("window of {0} samples is too short to shift")]
    WindowTooShort(usize),

    #[error("backend failure: {0}")]
    Backend(String),
}

/// Stateless (PCM window, semitones) -> PCM window transformation.
///
/// The backend is picked once at construction from a ranked list of what
/// this build carries. The resampler tier is always present, so there is
/// always something to select.
pub struct TransformEngine {
    backend: Box<dyn PitchShift>,
}

impl TransformEngine {
    pub fn new() -> Self {
        let mut backends = ranked_backends();
        let backend = backends.remove(0);

        info!(engine = backend.name(), "pitch shift engine selected");
        Self { backend }
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Transforms one interleaved stereo PCM window. Output always has the
    /// same byte length as the input; on backend failure the window passes
    /// through untransformed so the stream never gaps.
    pub fn transform(&self, pcm: &[u8], semitones: Sample) -> Vec<u8> {
        if semitones == 0. {
            return pcm.to_vec();
        }

        let interleaved = samples_from_bytes(pcm);
        let mono = downmix(&interleaved, CHANNELS);

        let shifted = match self.backend.shift(&mono, semitones) {
            Ok(shifted) => fit_length(shifted, mono.len()),
            Err(err) => {
                error!(
                    engine = self.backend.name(),
                    %err,
                    "pitch shift failed, passing window through"
                );
                return pcm.to_vec();
            }
        };

        bytes_from_samples(&upmix(&shifted, CHANNELS))
    }
}

impl Default for TransformEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Backends in preference order for this build
fn ranked_backends() -> Vec<Box<dyn PitchShift>> {
    let mut backends: Vec<Box<dyn PitchShift>> = Vec::new();

    #[cfg(feature = "voiche")]
    backends.push(Box::new(VoicheShifter::new()));

    #[cfg(feature = "vocoder")]
    backends.push(Box::new(PhaseVocoder::new()));

    backends.push(Box::new(LinearResampler));
    backends
}

/// Force `samples` to exactly `len` samples, truncating long output and
/// periodically repeating short output
pub fn fit_length(mut samples: Vec<Sample>, len: usize) -> Vec<Sample> {
    if samples.is_empty() {
        return vec![0.; len];
    }

    if samples.len() >= len {
        samples.truncate(len);
        return samples;
    }

    let mut tiled = Vec::with_capacity(len);

    while tiled.len() < len {
        let take = (len - tiled.len()).min(samples.len());
        tiled.extend_from_slice(&samples[..take]);
    }

    tiled
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{FRAME_BYTES, SAMPLE_RATE, WINDOW_BYTES};

    fn tone_window(frequency: f32, bytes: usize) -> Vec<u8> {
        let samples: Vec<Sample> = (0..bytes / 4)
            .map(|i| {
                let t = i as f32 / SAMPLE_RATE as f32;
                (t * frequency * std::f32::consts::TAU).sin() * 0.5
            })
            .collect();

        bytes_from_samples(&upmix(&samples, CHANNELS))
    }

    struct FailingShift;

    impl PitchShift for FailingShift {
        fn name(&self) -> &'static str {
            "failing"
        }

        fn shift(&self, _: &[Sample], _: Sample) -> Result<Vec<Sample>, TransformError> {
            Err(TransformError::Backend("unavailable".to_string()))
        }
    }

    #[test]
    fn zero_shift_is_identity() {
        let engine = TransformEngine::new();
        let window = tone_window(440., WINDOW_BYTES);

        assert_eq!(engine.transform(&window, 0.), window);
    }

    #[test]
    fn output_length_matches_input_for_both_directions() {
        let engine = TransformEngine::new();
        let window = tone_window(440., WINDOW_BYTES);

        for semitones in [-10., -6., 3.5, 6., 10.] {
            assert_eq!(engine.transform(&window, semitones).len(), window.len());
        }
    }

    #[test]
    fn every_backend_preserves_length() {
        let mono: Vec<Sample> = tone_window(440., WINDOW_BYTES)
            .chunks_exact(4)
            .map(|b| i16::from_le_bytes([b[0], b[1]]) as Sample / 32768.)
            .collect();

        for backend in ranked_backends() {
            for semitones in [-10., 6.] {
                let shifted = backend
                    .shift(&mono, semitones)
                    .unwrap_or_else(|_| panic!("{} failed", backend.name()));

                assert_eq!(fit_length(shifted, mono.len()).len(), mono.len());
            }
        }
    }

    #[test]
    fn backend_ranking_is_deterministic() {
        let first: Vec<_> = ranked_backends().iter().map(|b| b.name()).collect();
        let second: Vec<_> = ranked_backends().iter().map(|b| b.name()).collect();

        assert_eq!(first, second);
        assert_eq!(TransformEngine::new().backend_name(), first[0]);
    }

    #[test]
    fn resampler_tier_is_always_present() {
        let backends = ranked_backends();
        assert_eq!(backends.last().unwrap().name(), "resample");
    }

    #[test]
    fn backend_failure_passes_window_through() {
        let engine = TransformEngine {
            backend: Box::new(FailingShift),
        };
        let window = tone_window(440., FRAME_BYTES);

        assert_eq!(engine.transform(&window, 6.), window);
    }

    #[test]
    fn transformed_channels_are_identical() {
        let engine = TransformEngine::new();

        // Distinct left and right so the downmix actually has to average
        let interleaved: Vec<Sample> = (0..WINDOW_BYTES / 4)
            .flat_map(|i| {
                let t = i as f32 / SAMPLE_RATE as f32;
                let s = (t * 440. * std::f32::consts::TAU).sin();
                [s * 0.8, s * 0.2]
            })
            .collect();

        let out = engine.transform(&bytes_from_samples(&interleaved), 6.);
        let samples = samples_from_bytes(&out);

        for pair in samples.chunks_exact(2) {
            assert_eq!(pair[0], pair[1]);
        }
    }

    #[test]
    fn fit_length_truncates_and_tiles() {
        assert_eq!(fit_length(vec![1., 2., 3., 4.], 2), vec![1., 2.]);
        assert_eq!(fit_length(vec![1., 2.], 5), vec![1., 2., 1., 2., 1.]);
        assert_eq!(fit_length(vec![], 3), vec![0., 0., 0.]);
    }
}
