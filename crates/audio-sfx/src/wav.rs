//! WAV file I/O and sample-level utilities.

use std::path::Path;

use dialog_core::SfxError;
use hound::{SampleFormat, WavSpec, WavWriter};

/// Edge fade applied to every processed sound effect.
pub const FADE_MS: f32 = 30.0;

/// Write mono samples as 16-bit PCM.
pub fn write_wav_samples(
    path: impl AsRef<Path>,
    samples: &[f32],
    sample_rate: u32,
) -> Result<(), hound::Error> {
    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut writer = WavWriter::create(path.as_ref(), spec)?;
    for &sample in samples {
        writer.write_sample((sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)?;
    }
    writer.finalize()
}

/// Read a WAV file, averaging all channels down to mono.
///
/// Returns `(samples, sample_rate)`.
pub fn read_wav_mono(path: impl AsRef<Path>) -> Result<(Vec<f32>, u32), SfxError> {
    let path = path.as_ref();
    let decode_err = |e: hound::Error| SfxError::Decode {
        path: path.to_path_buf(),
        message: e.to_string(),
    };

    let mut reader = hound::WavReader::open(path).map_err(decode_err)?;
    let spec = reader.spec();

    let interleaved: Vec<f32> = match spec.sample_format {
        SampleFormat::Int => {
            let max_val = (1_i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / max_val))
                .collect::<Result<_, _>>()
                .map_err(decode_err)?
        }
        SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<Result<_, _>>()
            .map_err(decode_err)?,
    };

    Ok((downmix(&interleaved, spec.channels), spec.sample_rate))
}

/// Average interleaved frames to one channel.
pub fn downmix(interleaved: &[f32], channels: u16) -> Vec<f32> {
    let channels = usize::from(channels.max(1));
    if channels == 1 {
        return interleaved.to_vec();
    }

    interleaved
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}

/// Root mean square of the samples.
pub fn calculate_rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_sq: f64 = samples.iter().map(|&s| f64::from(s) * f64::from(s)).sum();
    (sum_sq / samples.len() as f64).sqrt() as f32
}

/// Loudness in dBFS, or `None` for silence.
pub fn rms_dbfs(samples: &[f32]) -> Option<f32> {
    let rms = calculate_rms(samples);
    (rms > 0.0).then(|| 20.0 * rms.log10())
}

/// Scale samples by a gain in decibels.
pub fn apply_gain_db(samples: &mut [f32], gain_db: f32) {
    let factor = 10f32.powf(gain_db / 20.0);
    for s in samples.iter_mut() {
        *s *= factor;
    }
}

/// Fade length in samples, at least one.
pub fn fade_len(fade_ms: f32, sample_rate: u32) -> usize {
    ((sample_rate as f32 * fade_ms / 1000.0) as usize).max(1)
}

/// Linear ramp from 0 to 1 over `len` samples, endpoints included.
fn ramp(len: usize) -> impl DoubleEndedIterator<Item = f32> {
    let step = if len > 1 { 1.0 / (len - 1) as f32 } else { 0.0 };
    (0..len).map(move |i| i as f32 * step)
}

/// Linear fade-in and fade-out of `fade_ms` each. Clips shorter than one
/// fade are left untouched.
pub fn apply_edge_fades(samples: &mut [f32], fade_ms: f32, sample_rate: u32) {
    let len = fade_len(fade_ms, sample_rate);
    if samples.len() < len {
        return;
    }

    for (s, g) in samples[..len].iter_mut().zip(ramp(len)) {
        *s *= g;
    }

    let start = samples.len() - len;
    for (s, g) in samples[start..].iter_mut().zip(ramp(len).rev()) {
        *s *= g;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_downmix() {
        assert_eq!(downmix(&[1.0, 0.0, 0.5, 0.5], 2), vec![0.5, 0.5]);
        assert_eq!(downmix(&[0.3, 0.1], 1), vec![0.3, 0.1]);
    }

    #[test]
    fn test_rms_dbfs() {
        assert_eq!(rms_dbfs(&[]), None);
        assert_eq!(rms_dbfs(&[0.0; 16]), None);

        let full = rms_dbfs(&[1.0, -1.0, 1.0, -1.0]).unwrap();
        assert!(full.abs() < 1e-4);

        let half = rms_dbfs(&[0.5; 8]).unwrap();
        assert!((half - (-6.0206)).abs() < 1e-3);
    }

    #[test]
    fn test_apply_gain_db() {
        let mut samples = vec![0.5, -0.25];
        apply_gain_db(&mut samples, 6.0206);
        assert!((samples[0] - 1.0).abs() < 1e-3);
        assert!((samples[1] + 0.5).abs() < 1e-3);
    }

    #[test]
    fn test_edge_fades() {
        // 1000 Hz, 30 ms -> 30 samples
        let mut samples = vec![1.0; 100];
        apply_edge_fades(&mut samples, FADE_MS, 1000);

        assert_eq!(samples[0], 0.0);
        assert!((samples[29] - 1.0).abs() < 1e-6);
        assert!((samples[15] - 15.0 / 29.0).abs() < 1e-6);
        assert_eq!(samples[50], 1.0);
        assert!((samples[70] - 1.0).abs() < 1e-6);
        assert_eq!(samples[99], 0.0);
    }

    #[test]
    fn test_short_clip_not_faded() {
        let mut samples = vec![1.0; 10];
        apply_edge_fades(&mut samples, FADE_MS, 1000);
        assert!(samples.iter().all(|&s| s == 1.0));
    }

    #[test]
    fn test_wav_roundtrip_stereo_to_mono() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stereo.wav");

        let spec = WavSpec {
            channels: 2,
            sample_rate: 8000,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut writer = WavWriter::create(&path, spec).unwrap();
        for _ in 0..10 {
            writer.write_sample(i16::MAX).unwrap();
            writer.write_sample(0_i16).unwrap();
        }
        writer.finalize().unwrap();

        let (samples, sr) = read_wav_mono(&path).unwrap();
        assert_eq!(sr, 8000);
        assert_eq!(samples.len(), 10);
        assert!(samples.iter().all(|&s| (s - 0.5).abs() < 1e-3));
    }

    #[test]
    fn test_write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mono.wav");
        write_wav_samples(&path, &[0.0, 0.5, -0.5, 2.0], 24000).unwrap();

        let (samples, sr) = read_wav_mono(&path).unwrap();
        assert_eq!(sr, 24000);
        assert_eq!(samples.len(), 4);
        assert!((samples[1] - 0.5).abs() < 1e-3);
        assert!((samples[3] - 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_read_garbage_is_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.wav");
        std::fs::write(&path, b"not a wav file").unwrap();
        assert!(matches!(read_wav_mono(&path), Err(SfxError::Decode { .. })));
    }
}
