//! Phrase detection
//!
//! Splits a microphone stream into a single spoken phrase using RMS energy.
//! The detector first samples ambient noise to pick a speech threshold, then
//! waits for speech onset (bounded by the listen timeout), then accumulates
//! audio until a trailing pause or the phrase limit.

use std::time::Duration;

use crate::config::ListenConfig;

/// Speech threshold relative to measured ambient energy
const DYNAMIC_ENERGY_RATIO: f32 = 1.5;

/// Where the detector is in the listen cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhraseState {
    /// Measuring ambient noise
    Calibrating,
    /// Waiting for speech to start
    Waiting,
    /// Speech in progress, accumulating
    Speaking,
    /// A phrase is ready to take
    Complete,
    /// No speech before the listen timeout
    TimedOut,
}

impl PhraseState {
    /// Whether no further audio will be accepted
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Complete | Self::TimedOut)
    }
}

/// Detects one phrase in a stream of mono samples
#[derive(Debug)]
pub struct PhraseDetector {
    state: PhraseState,
    threshold: f32,
    min_energy: f32,
    calibration_samples: usize,
    timeout_samples: usize,
    limit_samples: usize,
    pause_samples: usize,
    ambient_sum_squares: f64,
    ambient_count: usize,
    waited: usize,
    silence: usize,
    buffer: Vec<f32>,
}

impl PhraseDetector {
    /// Create a detector for audio at `sample_rate`
    #[must_use]
    pub fn new(config: ListenConfig, sample_rate: u32) -> Self {
        let to_samples = |d: Duration| {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let n = (d.as_secs_f64() * f64::from(sample_rate)).round() as usize;
            n
        };

        let calibration_samples = to_samples(config.calibration);
        let state = if calibration_samples == 0 {
            PhraseState::Waiting
        } else {
            PhraseState::Calibrating
        };

        Self {
            state,
            threshold: config.min_energy,
            min_energy: config.min_energy,
            calibration_samples,
            timeout_samples: to_samples(config.timeout),
            limit_samples: to_samples(config.phrase_limit).max(1),
            pause_samples: to_samples(config.pause),
            ambient_sum_squares: 0.0,
            ambient_count: 0,
            waited: 0,
            silence: 0,
            buffer: Vec::new(),
        }
    }

    /// Feed a chunk of samples and return the resulting state
    pub fn process(&mut self, samples: &[f32]) -> PhraseState {
        if samples.is_empty() || self.state.is_terminal() {
            return self.state;
        }

        match self.state {
            PhraseState::Calibrating => self.calibrate(samples),
            PhraseState::Waiting => {
                let energy = calculate_energy(samples);
                if energy > self.threshold {
                    tracing::debug!(energy, threshold = self.threshold, "speech started");
                    self.state = PhraseState::Speaking;
                    self.buffer.clear();
                    self.silence = 0;
                    self.accumulate(samples, true);
                } else {
                    self.waited += samples.len();
                    if self.waited >= self.timeout_samples {
                        tracing::debug!(waited = self.waited, "listen timeout");
                        self.state = PhraseState::TimedOut;
                    }
                }
            }
            PhraseState::Speaking => {
                let is_speech = calculate_energy(samples) > self.threshold;
                self.accumulate(samples, is_speech);
            }
            PhraseState::Complete | PhraseState::TimedOut => {}
        }

        self.state
    }

    fn calibrate(&mut self, samples: &[f32]) {
        let needed = self.calibration_samples - self.ambient_count;
        let (ambient, rest) = samples.split_at(needed.min(samples.len()));

        self.ambient_sum_squares += ambient
            .iter()
            .map(|&s| f64::from(s) * f64::from(s))
            .sum::<f64>();
        self.ambient_count += ambient.len();

        if self.ambient_count >= self.calibration_samples {
            #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
            let ambient_rms = (self.ambient_sum_squares / self.ambient_count as f64).sqrt() as f32;
            self.threshold = (ambient_rms * DYNAMIC_ENERGY_RATIO).max(self.min_energy);
            self.state = PhraseState::Waiting;
            tracing::debug!(
                ambient_rms,
                threshold = self.threshold,
                "calibrated for ambient noise"
            );

            if !rest.is_empty() {
                self.process(rest);
            }
        }
    }

    fn accumulate(&mut self, samples: &[f32], is_speech: bool) {
        let room = self.limit_samples.saturating_sub(self.buffer.len());
        self.buffer
            .extend_from_slice(&samples[..samples.len().min(room)]);

        if is_speech {
            self.silence = 0;
        } else {
            self.silence += samples.len();
        }

        if self.buffer.len() >= self.limit_samples {
            tracing::debug!(samples = self.buffer.len(), "phrase limit reached");
            self.state = PhraseState::Complete;
        } else if self.silence >= self.pause_samples && self.pause_samples > 0 {
            tracing::debug!(samples = self.buffer.len(), "phrase complete");
            self.state = PhraseState::Complete;
        }
    }

    #[must_use]
    pub const fn state(&self) -> PhraseState {
        self.state
    }

    /// Energy above which a chunk counts as speech
    #[must_use]
    pub const fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Audio accumulated so far
    #[must_use]
    pub fn phrase(&self) -> &[f32] {
        &self.buffer
    }

    /// Take the accumulated audio, leaving the buffer empty
    pub fn take_phrase(&mut self) -> Vec<f32> {
        std::mem::take(&mut self.buffer)
    }
}

/// Calculate RMS energy of audio samples
#[must_use]
pub fn calculate_energy(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }

    let sum_squares: f32 = samples.iter().map(|s| s * s).sum();
    #[allow(clippy::cast_precision_loss)]
    let mean = sum_squares / samples.len() as f32;
    mean.sqrt()
}

#[cfg(test)]
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss
)]
mod tests {
    use super::*;

    const RATE: u32 = 16_000;

    fn config() -> ListenConfig {
        ListenConfig {
            calibration: Duration::from_millis(200),
            timeout: Duration::from_secs(1),
            phrase_limit: Duration::from_secs(2),
            pause: Duration::from_millis(500),
            min_energy: 0.01,
        }
    }

    fn tone(secs: f32, amplitude: f32) -> Vec<f32> {
        let n = (RATE as f32 * secs) as usize;
        (0..n)
            .map(|i| {
                let t = i as f32 / RATE as f32;
                amplitude * (2.0 * std::f32::consts::PI * 440.0 * t).sin()
            })
            .collect()
    }

    fn silence(secs: f32) -> Vec<f32> {
        let n = (RATE as f32 * secs) as usize;
        vec![0.0; n]
    }

    #[test]
    fn test_calibration_then_waiting() {
        let mut detector = PhraseDetector::new(config(), RATE);
        assert_eq!(detector.state(), PhraseState::Calibrating);

        assert_eq!(detector.process(&silence(0.1)), PhraseState::Calibrating);
        assert_eq!(detector.process(&silence(0.1)), PhraseState::Waiting);
        assert!((detector.threshold() - 0.01).abs() < f32::EPSILON);
    }

    #[test]
    fn test_noisy_room_raises_threshold() {
        let mut detector = PhraseDetector::new(config(), RATE);
        detector.process(&tone(0.2, 0.1));

        assert_eq!(detector.state(), PhraseState::Waiting);
        // RMS of a 0.1 sine is ~0.0707
        assert!(detector.threshold() > 0.1);
    }

    #[test]
    fn test_silence_times_out() {
        let mut detector = PhraseDetector::new(config(), RATE);
        detector.process(&silence(0.2));

        assert_eq!(detector.process(&silence(0.5)), PhraseState::Waiting);
        assert_eq!(detector.process(&silence(0.5)), PhraseState::TimedOut);
        assert!(detector.phrase().is_empty());
    }

    #[test]
    fn test_phrase_ends_on_pause() {
        let mut detector = PhraseDetector::new(config(), RATE);
        detector.process(&silence(0.2));

        assert_eq!(detector.process(&tone(0.5, 0.3)), PhraseState::Speaking);
        assert_eq!(detector.process(&silence(0.3)), PhraseState::Speaking);
        assert_eq!(detector.process(&silence(0.3)), PhraseState::Complete);

        let phrase = detector.take_phrase();
        assert_eq!(phrase.len(), tone(0.5, 0.3).len() + 2 * silence(0.3).len());
        assert!(detector.phrase().is_empty());
    }

    #[test]
    fn test_phrase_limit_truncates() {
        let mut detector = PhraseDetector::new(config(), RATE);
        detector.process(&silence(0.2));

        detector.process(&tone(1.5, 0.3));
        assert_eq!(detector.process(&tone(1.5, 0.3)), PhraseState::Complete);
        assert_eq!(detector.phrase().len(), 2 * RATE as usize);
    }

    #[test]
    fn test_calibration_remainder_is_processed() {
        let mut detector = PhraseDetector::new(config(), RATE);
        let mut chunk = silence(0.2);
        chunk.extend(tone(0.1, 0.3));

        assert_eq!(detector.process(&chunk), PhraseState::Speaking);
        assert_eq!(detector.phrase().len(), tone(0.1, 0.3).len());
    }

    #[test]
    fn test_terminal_state_ignores_audio() {
        let mut detector = PhraseDetector::new(config(), RATE);
        detector.process(&silence(0.2));
        detector.process(&silence(1.0));
        assert_eq!(detector.state(), PhraseState::TimedOut);
        assert!(detector.state().is_terminal());

        assert_eq!(detector.process(&tone(0.5, 0.3)), PhraseState::TimedOut);
        assert!(detector.phrase().is_empty());
    }

    #[test]
    fn test_zero_calibration_starts_waiting() {
        let cfg = ListenConfig {
            calibration: Duration::ZERO,
            ..config()
        };
        let detector = PhraseDetector::new(cfg, RATE);
        assert_eq!(detector.state(), PhraseState::Waiting);
    }

    #[test]
    fn test_energy() {
        assert!(calculate_energy(&[]).abs() < f32::EPSILON);
        assert!((calculate_energy(&[0.5, -0.5]) - 0.5).abs() < 1e-6);
    }
}
