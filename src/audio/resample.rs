use super::transform::{PitchShift, TransformError};
use super::Sample;

/// Lowest quality tier: play the window back at a different rate.
///
/// Resampling to `len / 2^(st/12)` samples and then letting the caller
/// truncate or tile back to the original length shifts the pitch at the
/// cost of periodic repetition artifacts when shifting up. It needs no
/// dependencies, so it is always available.
pub struct LinearResampler;

impl PitchShift for LinearResampler {
    fn name(&self) -> &'static str {
        "resample"
    }

    fn shift(&self, mono: &[Sample], semitones: Sample) -> Result<Vec<Sample>, TransformError> {
        if mono.is_empty() {
            return Err(TransformError::WindowTooShort(0));
        }

        let factor = 2f32.powf(semitones / 12.);
        let new_len = ((mono.len() as f32 / factor).round() as usize).max(1);

        Ok(resample_linear(mono, new_len))
    }
}

/// Linear interpolation resample to exactly `new_len` samples
pub fn resample_linear(samples: &[Sample], new_len: usize) -> Vec<Sample> {
    if samples.len() == new_len {
        return samples.to_vec();
    }

    let step = (samples.len() - 1) as f64 / (new_len.max(2) - 1) as f64;

    (0..new_len)
        .map(|i| {
            let position = i as f64 * step;
            let index = position as usize;
            let fraction = (position - index as f64) as Sample;

            let a = samples[index];
            let b = samples[(index + 1).min(samples.len() - 1)];

            a + (b - a) * fraction
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shift_up_shortens_the_window() {
        let mono = vec![0.; 1000];
        let shifted = LinearResampler.shift(&mono, 12.).unwrap();

        assert_eq!(shifted.len(), 500);
    }

    #[test]
    fn shift_down_lengthens_the_window() {
        let mono = vec![0.; 1000];
        let shifted = LinearResampler.shift(&mono, -12.).unwrap();

        assert_eq!(shifted.len(), 2000);
    }

    #[test]
    fn empty_window_is_rejected() {
        assert!(LinearResampler.shift(&[], 6.).is_err());
    }

    #[test]
    fn resample_interpolates_between_samples() {
        let out = resample_linear(&[0., 1.], 3);

        assert_eq!(out.len(), 3);
        assert!((out[1] - 0.5).abs() < 1e-6);
        assert_eq!(out[0], 0.);
        assert_eq!(out[2], 1.);
    }

    #[test]
    fn resample_to_same_length_is_identity() {
        let input = vec![0.1, -0.2, 0.3];
        assert_eq!(resample_linear(&input, 3), input);
    }
}
