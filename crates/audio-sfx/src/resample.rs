//! Duration-preserving sample-rate conversion.

use dialog_core::SfxError;
use rubato::{FftFixedIn, Resampler};

const CHUNK_SIZE: usize = 1024;
const SUB_CHUNKS: usize = 2;

/// Length of `len` samples at `from` Hz once converted to `to` Hz.
pub fn target_len(len: usize, from: u32, to: u32) -> usize {
    let duration = len as f64 / f64::from(from);
    ((duration * f64::from(to)).round() as usize).max(1)
}

/// Resample mono audio from `from` Hz to `to` Hz.
///
/// The output has exactly [`target_len`] samples: the resampler's delay is
/// trimmed and the tail flushed.
pub fn resample(samples: &[f32], from: u32, to: u32) -> Result<Vec<f32>, SfxError> {
    if from == to || samples.is_empty() {
        return Ok(samples.to_vec());
    }

    let mut resampler =
        FftFixedIn::<f32>::new(from as usize, to as usize, CHUNK_SIZE, SUB_CHUNKS, 1)
            .map_err(resample_err)?;

    let delay = resampler.output_delay();
    let wanted = target_len(samples.len(), from, to);
    let mut out = Vec::with_capacity(wanted + delay);

    let mut pos = 0;
    while samples.len() - pos >= resampler.input_frames_next() {
        let n = resampler.input_frames_next();
        let chunk = resampler
            .process(&[&samples[pos..pos + n]], None)
            .map_err(resample_err)?;
        out.extend_from_slice(&chunk[0]);
        pos += n;
    }

    if pos < samples.len() {
        let tail: &[&[f32]] = &[&samples[pos..]];
        let chunk = resampler
            .process_partial(Some(tail), None)
            .map_err(resample_err)?;
        out.extend_from_slice(&chunk[0]);
    }

    // Drain the delay line.
    while out.len() < wanted + delay {
        let chunk = resampler
            .process_partial(None::<&[&[f32]]>, None)
            .map_err(resample_err)?;
        if chunk[0].is_empty() {
            break;
        }
        out.extend_from_slice(&chunk[0]);
    }

    let mut out: Vec<f32> = out.into_iter().skip(delay).take(wanted).collect();
    out.resize(wanted, 0.0);
    Ok(out)
}

fn resample_err(e: impl std::fmt::Display) -> SfxError {
    SfxError::Resample(e.to_string())
}
