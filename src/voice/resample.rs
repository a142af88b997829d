//! Mono sample-rate conversion for synthesized speech

use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};

use crate::{Error, Result};

/// Frames fed to the resampler per call
const CHUNK_FRAMES: usize = 1024;

/// Resample mono `samples` from `from_rate` to `to_rate`
///
/// # Errors
///
/// Returns error if either rate is zero or resampling fails
pub fn resample_mono(samples: &[f32], from_rate: u32, to_rate: u32) -> Result<Vec<f32>> {
    if from_rate == 0 || to_rate == 0 {
        return Err(Error::Audio("sample rates must be greater than 0".to_string()));
    }
    if from_rate == to_rate || samples.is_empty() {
        return Ok(samples.to_vec());
    }

    let ratio = f64::from(to_rate) / f64::from(from_rate);
    let params = SincInterpolationParameters {
        sinc_len: 128,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 128,
        window: WindowFunction::BlackmanHarris2,
    };

    let mut resampler = SincFixedIn::<f32>::new(ratio, 1.0, params, CHUNK_FRAMES, 1)
        .map_err(|e| Error::Audio(format!("failed to create resampler: {e}")))?;

    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    let expected = (samples.len() as f64 * ratio).ceil() as usize;
    let mut output = Vec::with_capacity(expected + CHUNK_FRAMES);

    for chunk in samples.chunks(CHUNK_FRAMES) {
        // SincFixedIn wants exactly CHUNK_FRAMES per call; pad the tail with silence
        let mut input = chunk.to_vec();
        input.resize(CHUNK_FRAMES, 0.0);

        let out = resampler
            .process(&[input], None)
            .map_err(|e| Error::Audio(format!("resampling failed: {e}")))?;
        if let Some(channel) = out.into_iter().next() {
            output.extend(channel);
        }
    }

    output.truncate(expected);
    tracing::trace!(
        from_rate,
        to_rate,
        input = samples.len(),
        output = output.len(),
        "resampled"
    );
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_rate_is_identity() {
        let samples = vec![0.1, -0.2, 0.3];
        assert_eq!(resample_mono(&samples, 24_000, 24_000).unwrap(), samples);
    }

    #[test]
    fn test_zero_rate_is_error() {
        assert!(resample_mono(&[0.0], 0, 24_000).is_err());
    }

    #[test]
    fn test_upsample_length() {
        let samples = vec![0.0; 22_050];
        let out = resample_mono(&samples, 22_050, 24_000).unwrap();
        assert!(out.len() <= 24_000);
        assert!(out.len() > 23_000);
    }
}
