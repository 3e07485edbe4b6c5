use voiche::{pitch_shift, transform::transform, windows::hann_window};

use super::transform::{PitchShift, TransformError};
use super::Sample;

/// Highest quality tier, backed by the voiche phase vocoder library.
/// Compiled in with the `voiche` cargo feature.
pub struct VoicheShifter {
    window_size: usize,
    slide_size: usize,
}

impl VoicheShifter {
    pub fn new() -> Self {
        let window_size = 1024;

        Self {
            window_size,
            slide_size: window_size / 4,
        }
    }
}

impl PitchShift for VoicheShifter {
    fn name(&self) -> &'static str {
        "voiche"
    }

    fn shift(&self, mono: &[Sample], semitones: Sample) -> Result<Vec<Sample>, TransformError> {
        if mono.len() < self.window_size {
            return Err(TransformError::WindowTooShort(mono.len()));
        }

        let window = hann_window(self.window_size);

        // voiche expresses pitch in octaves
        let processor =
            pitch_shift::transform_processor(self.window_size, self.slide_size, semitones / 12.);

        Ok(transform(self.slide_size, window, processor, mono))
    }
}

impl Default for VoicheShifter {
    fn default() -> Self {
        Self::new()
    }
}
