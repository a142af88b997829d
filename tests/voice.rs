//! Voice pipeline integration tests
//!
//! Tests voice components without requiring audio hardware

use std::io::Cursor;
use std::time::Duration;

use parley::config::ListenConfig;
use parley::voice::{
    PhraseDetector, PhraseState, SAMPLE_RATE, decode_mp3, resample_mono, samples_to_wav,
    split_for_google,
};

/// Generate sine wave audio samples
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
fn generate_sine_samples(frequency: f32, duration_secs: f32, amplitude: f32) -> Vec<f32> {
    let num_samples = (SAMPLE_RATE as f32 * duration_secs) as usize;
    (0..num_samples)
        .map(|i| {
            let t = i as f32 / SAMPLE_RATE as f32;
            amplitude * (2.0 * std::f32::consts::PI * frequency * t).sin()
        })
        .collect()
}

/// Generate silence
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
fn generate_silence(duration_secs: f32) -> Vec<f32> {
    let num_samples = (SAMPLE_RATE as f32 * duration_secs) as usize;
    vec![0.0; num_samples]
}

/// Feed `samples` in 50 ms chunks, as the capture loop does
fn feed(detector: &mut PhraseDetector, samples: &[f32]) -> PhraseState {
    let chunk = (SAMPLE_RATE / 20) as usize;
    let mut state = detector.state();
    for piece in samples.chunks(chunk) {
        state = detector.process(piece);
    }
    state
}

#[test]
fn test_default_listen_window() {
    let listen = ListenConfig::default();
    assert_eq!(listen.timeout, Duration::from_secs(5));
    assert_eq!(listen.phrase_limit, Duration::from_secs(10));
    assert_eq!(listen.calibration, Duration::from_secs(1));
}

#[test]
fn test_spoken_phrase_is_captured() {
    let mut detector = PhraseDetector::new(ListenConfig::default(), SAMPLE_RATE);

    assert_eq!(feed(&mut detector, &generate_silence(1.0)), PhraseState::Waiting);
    assert_eq!(feed(&mut detector, &generate_silence(2.0)), PhraseState::Waiting);

    let speech = generate_sine_samples(220.0, 1.5, 0.4);
    assert_eq!(feed(&mut detector, &speech), PhraseState::Speaking);
    assert_eq!(feed(&mut detector, &generate_silence(1.0)), PhraseState::Complete);

    let phrase = detector.take_phrase();
    assert!(phrase.len() >= speech.len());
    assert!(phrase.len() < speech.len() + generate_silence(1.0).len());
}

#[test]
fn test_silence_times_out_after_listen_window() {
    let mut detector = PhraseDetector::new(ListenConfig::default(), SAMPLE_RATE);

    feed(&mut detector, &generate_silence(1.0));
    assert_eq!(feed(&mut detector, &generate_silence(4.9)), PhraseState::Waiting);
    assert_eq!(feed(&mut detector, &generate_silence(0.2)), PhraseState::TimedOut);
}

#[test]
fn test_long_speech_is_cut_at_phrase_limit() {
    let mut detector = PhraseDetector::new(ListenConfig::default(), SAMPLE_RATE);
    feed(&mut detector, &generate_silence(1.0));

    let state = feed(&mut detector, &generate_sine_samples(220.0, 12.0, 0.4));

    assert_eq!(state, PhraseState::Complete);
    assert_eq!(detector.phrase().len(), SAMPLE_RATE as usize * 10);
}

#[test]
fn test_samples_to_wav() {
    let samples = generate_sine_samples(440.0, 0.1, 0.5);
    let wav_data = samples_to_wav(&samples, SAMPLE_RATE).unwrap();

    // Check WAV header magic
    assert_eq!(&wav_data[0..4], b"RIFF");
    assert_eq!(&wav_data[8..12], b"WAVE");

    // WAV should have reasonable size
    assert!(wav_data.len() > 44); // WAV header is 44 bytes
}

#[test]
fn test_wav_clamps_out_of_range_samples() {
    let samples: Vec<f32> = vec![0.0, 0.5, -0.5, 1.5, -1.5];
    let wav_data = samples_to_wav(&samples, SAMPLE_RATE).unwrap();

    let mut reader = hound::WavReader::new(Cursor::new(wav_data)).unwrap();
    let spec = reader.spec();
    assert_eq!(spec.sample_rate, SAMPLE_RATE);
    assert_eq!(spec.channels, 1);

    let read: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
    assert_eq!(read.len(), samples.len());
    assert_eq!(read[3], i16::MAX);
    assert_eq!(read[4], i16::MIN);
}

#[test]
fn test_google_chunks_fit_limit() {
    let reply = "The sun is a star at the center of our solar system. \
                 It gives us light and warmth, and plants use its energy to grow food for almost every living thing.";

    let chunks = split_for_google(reply, 100);

    assert!(chunks.len() > 1);
    assert!(chunks.iter().all(|c| c.chars().count() <= 100));
    assert_eq!(chunks.join(" "), reply.split_whitespace().collect::<Vec<_>>().join(" "));
}

#[test]
fn test_resample_tts_rate_to_playback_rate() {
    let samples = vec![0.25; 22_050];
    let out = resample_mono(&samples, 22_050, 24_000).unwrap();
    assert!(out.len().abs_diff(24_000) < 100);
}

#[test]
fn test_decode_rejects_non_mp3() {
    assert!(decode_mp3(b"<html>rate limited</html>").is_err());
}
