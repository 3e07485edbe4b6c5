use rustfft::{num_complex::Complex32, FftPlanner};

use super::resample::resample_linear;
use super::transform::{PitchShift, TransformError};
use super::Sample;

/// Spectral phase vocoder tier.
///
/// Time-stretches the window by `2^(st/12)` with phase-coherent
/// overlap-add, then resamples back to the original sample count. The two
/// steps cancel in duration and compose into a pitch shift.
pub struct PhaseVocoder {
    fft_len: usize,
    hop: usize,
}

impl PhaseVocoder {
    pub fn new() -> Self {
        Self {
            fft_len: 2048,
            hop: 512,
        }
    }

    fn stretch(&self, input: &[Sample], rate: f32) -> Vec<Sample> {
        let n = self.fft_len;
        let hop = self.hop;

        // Analysis positions advance slower than the synthesis hop when
        // stretching, faster when compressing
        let step = hop as f32 / rate;

        let mut positions = Vec::new();
        let mut position = 0f32;

        while position as usize + n <= input.len() {
            positions.push(position as usize);
            position += step;
        }

        let window = hann(n);
        let mut planner = FftPlanner::new();
        let forward = planner.plan_fft_forward(n);
        let inverse = planner.plan_fft_inverse(n);

        let out_len = (positions.len() - 1) * hop + n;
        let mut output = vec![0f32; out_len];
        let mut norm = vec![0f32; out_len];

        let mut prev_phase = vec![0f32; n];
        let mut phase_acc = vec![0f32; n];

        for (frame_index, &start) in positions.iter().enumerate() {
            let mut buf: Vec<Complex32> = input[start..start + n]
                .iter()
                .zip(&window)
                .map(|(s, w)| Complex32::new(s * w, 0.))
                .collect();

            forward.process(&mut buf);

            for (k, bin) in buf.iter_mut().enumerate() {
                let magnitude = bin.norm();
                let phase = bin.arg();

                let expected = std::f32::consts::TAU * k as f32 * step / n as f32;
                let deviation = wrap_phase(phase - prev_phase[k] - expected);
                prev_phase[k] = phase;

                // Rescale the true per-step advance to the synthesis hop
                let advance = (expected + deviation) * (hop as f32 / step);
                phase_acc[k] = wrap_phase(phase_acc[k] + advance);

                *bin = Complex32::from_polar(magnitude, phase_acc[k]);
            }

            inverse.process(&mut buf);

            let offset = frame_index * hop;
            for i in 0..n {
                output[offset + i] += buf[i].re / n as f32 * window[i];
                norm[offset + i] += window[i] * window[i];
            }
        }

        for (sample, weight) in output.iter_mut().zip(&norm) {
            if *weight > 1e-6 {
                *sample /= *weight;
            }
        }

        output
    }
}

impl PitchShift for PhaseVocoder {
    fn name(&self) -> &'static str {
        "vocoder"
    }

    fn shift(&self, mono: &[Sample], semitones: Sample) -> Result<Vec<Sample>, TransformError> {
        if mono.len() < self.fft_len {
            return Err(TransformError::WindowTooShort(mono.len()));
        }

        let rate = 2f32.powf(semitones / 12.);
        let stretched = self.stretch(mono, rate);

        // Resampling by exactly 1/rate keeps the pitch ratio true. Window
        // edges make this land slightly short of the input length, the
        // engine tiles the difference back.
        let restored = ((stretched.len() as f32 / rate).round() as usize).max(1);

        Ok(resample_linear(&stretched, restored))
    }
}

impl Default for PhaseVocoder {
    fn default() -> Self {
        Self::new()
    }
}

fn hann(len: usize) -> Vec<f32> {
    (0..len)
        .map(|i| {
            let x = std::f32::consts::TAU * i as f32 / len as f32;
            0.5 * (1. - x.cos())
        })
        .collect()
}

fn wrap_phase(phase: f32) -> f32 {
    use std::f32::consts::{PI, TAU};
    (phase + PI).rem_euclid(TAU) - PI
}
