use rodio::Source;
use std::f32::consts::PI;
use std::time::Duration;

const SAMPLE_RATE: u32 = 44100;
const AMPLITUDE: f32 = 0.2;

/// Finite mono sine tone. Amplitude 0.0 doubles as a gap between beeps so a
/// whole pattern can be queued on one sink.
pub struct ChimeTone {
    frequency: f32,
    amplitude: f32,
    total_samples: usize,
    num_sample: usize,
}

impl ChimeTone {
    pub fn beep(frequency: f32, duration_ms: u64) -> Self {
        Self::with_amplitude(frequency, duration_ms, AMPLITUDE)
    }

    pub fn gap(duration_ms: u64) -> Self {
        Self::with_amplitude(440.0, duration_ms, 0.0)
    }

    fn with_amplitude(frequency: f32, duration_ms: u64, amplitude: f32) -> Self {
        Self {
            frequency,
            amplitude,
            total_samples: (SAMPLE_RATE as u64 * duration_ms / 1000) as usize,
            num_sample: 0,
        }
    }

    pub fn duration_ms(&self) -> u64 {
        self.total_samples as u64 * 1000 / SAMPLE_RATE as u64
    }
}

impl Iterator for ChimeTone {
    type Item = f32;

    fn next(&mut self) -> Option<Self::Item> {
        if self.num_sample >= self.total_samples {
            return None;
        }
        let t = self.num_sample as f32 / SAMPLE_RATE as f32;
        self.num_sample += 1;

        // Short linear fade at both ends to avoid clicks.
        let fade_samples = (SAMPLE_RATE / 100) as usize;
        let envelope = if self.num_sample < fade_samples {
            self.num_sample as f32 / fade_samples as f32
        } else if self.total_samples - self.num_sample < fade_samples {
            (self.total_samples - self.num_sample) as f32 / fade_samples as f32
        } else {
            1.0
        };

        Some((2.0 * PI * self.frequency * t).sin() * self.amplitude * envelope)
    }
}

impl Source for ChimeTone {
    fn current_frame_len(&self) -> Option<usize> {
        Some(self.total_samples.saturating_sub(self.num_sample))
    }

    fn channels(&self) -> u16 {
        1
    }

    fn sample_rate(&self) -> u32 {
        SAMPLE_RATE
    }

    fn total_duration(&self) -> Option<Duration> {
        Some(Duration::from_millis(self.duration_ms()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tone_is_finite_and_bounded() {
        let samples: Vec<f32> = ChimeTone::beep(660.0, 100).collect();
        assert_eq!(samples.len(), 4410);
        assert!(samples.iter().all(|s| s.abs() <= AMPLITUDE + f32::EPSILON));
    }

    #[test]
    fn gap_is_silent() {
        assert!(ChimeTone::gap(50).all(|s| s == 0.0));
    }
}
