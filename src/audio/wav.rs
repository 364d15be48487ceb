use std::io::{Cursor, Read};
use std::path::Path;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use tracing::debug;

use crate::error::{RedubError, Result};

use super::AudioClip;

/// Write a clip as mono 16-bit PCM.
pub fn write_wav(path: &Path, clip: &AudioClip) -> Result<()> {
    let spec = WavSpec {
        channels: 1,
        sample_rate: clip.sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut writer = WavWriter::create(path, spec)?;
    for sample in &clip.samples {
        let value = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
        writer.write_sample(value)?;
    }
    writer.finalize()?;

    debug!(
        "Wrote {:.1}s of audio to {}",
        clip.duration().as_secs_f64(),
        path.display()
    );
    Ok(())
}

/// Read a WAV file, down-mixing to mono.
pub fn read_wav(path: &Path) -> Result<AudioClip> {
    if !path.exists() {
        return Err(RedubError::FileNotFound(path.display().to_string()));
    }
    let reader = WavReader::open(path)?;
    from_reader(reader)
}

/// Decode WAV bytes held in memory, down-mixing to mono.
pub fn decode_wav(bytes: &[u8]) -> Result<AudioClip> {
    from_reader(WavReader::new(Cursor::new(bytes))?)
}

fn from_reader<R: Read>(reader: WavReader<R>) -> Result<AudioClip> {
    let spec = reader.spec();
    let channels = spec.channels.max(1) as usize;

    let interleaved: Vec<f32> = match spec.sample_format {
        SampleFormat::Int => {
            let scale = (1i64 << (spec.bits_per_sample.saturating_sub(1))) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<std::result::Result<_, _>>()?
        }
        SampleFormat::Float => reader
            .into_samples::<f32>()
            .collect::<std::result::Result<_, _>>()?,
    };

    let samples = interleaved
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect();

    Ok(AudioClip::new(samples, spec.sample_rate))
}
