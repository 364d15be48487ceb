pub mod ffmpeg;
pub mod wav;

pub use ffmpeg::{check_ffmpeg, extract_audio, has_audio_stream, is_video_file, replace_audio};
pub use wav::{decode_wav, read_wav, write_wav};

use crate::error::Result;
use std::path::Path;
use std::time::Duration;

/// Number of samples covering `duration` at `sample_rate`.
pub fn samples_for(duration: Duration, sample_rate: u32) -> usize {
    (duration.as_micros() * sample_rate as u128 / 1_000_000) as usize
}

/// Mono audio with samples in [-1.0, 1.0].
#[derive(Debug, Clone, PartialEq)]
pub struct AudioClip {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl AudioClip {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    pub fn silent(duration: Duration, sample_rate: u32) -> Self {
        Self::new(vec![0.0; samples_for(duration, sample_rate)], sample_rate)
    }

    /// Decode raw little-endian 16-bit mono PCM. A trailing odd byte is
    /// ignored.
    pub fn from_pcm16_le(bytes: &[u8], sample_rate: u32) -> Self {
        let samples = bytes
            .chunks_exact(2)
            .map(|pair| i16::from_le_bytes([pair[0], pair[1]]) as f32 / i16::MAX as f32)
            .collect();
        Self::new(samples, sample_rate)
    }

    /// Decode an in-memory WAV file, down-mixing to mono.
    pub fn from_wav_bytes(bytes: &[u8]) -> Result<Self> {
        decode_wav(bytes)
    }

    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.samples.len() as f64 / self.sample_rate as f64)
    }

    pub fn is_silent(&self) -> bool {
        self.samples.iter().all(|s| *s == 0.0)
    }

    /// Linear-interpolation resample.
    pub fn resampled(&self, sample_rate: u32) -> Self {
        if sample_rate == self.sample_rate || self.samples.is_empty() || self.sample_rate == 0 {
            return Self::new(self.samples.clone(), sample_rate);
        }

        let len = self.samples.len();
        let new_len = (len as u64 * sample_rate as u64 / self.sample_rate as u64) as usize;
        let step = self.sample_rate as f64 / sample_rate as f64;

        let samples = (0..new_len)
            .map(|i| {
                let pos = i as f64 * step;
                let i0 = (pos.floor() as usize).min(len - 1);
                let i1 = (i0 + 1).min(len - 1);
                let frac = (pos - i0 as f64) as f32;
                self.samples[i0] * (1.0 - frac) + self.samples[i1] * frac
            })
            .collect();

        Self::new(samples, sample_rate)
    }
}

/// Fixed-length output buffer that synthesized clips are mixed into.
///
/// The length never changes after creation: audio overlaid past the end is
/// dropped.
#[derive(Debug, Clone)]
pub struct Timeline {
    samples: Vec<f32>,
    sample_rate: u32,
}

impl Timeline {
    pub fn silent(duration: Duration, sample_rate: u32) -> Self {
        Self {
            samples: vec![0.0; samples_for(duration, sample_rate)],
            sample_rate,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.samples.len() as f64 / self.sample_rate.max(1) as f64)
    }

    /// Mix `clip` in starting at `at`, adding to what is already there and
    /// clamping to [-1.0, 1.0].
    pub fn overlay(&mut self, clip: &AudioClip, at: Duration) {
        let resampled;
        let clip = if clip.sample_rate == self.sample_rate {
            clip
        } else {
            resampled = clip.resampled(self.sample_rate);
            &resampled
        };

        let offset = samples_for(at, self.sample_rate);
        if offset >= self.samples.len() {
            return;
        }

        for (dst, src) in self.samples[offset..].iter_mut().zip(&clip.samples) {
            *dst = (*dst + src).clamp(-1.0, 1.0);
        }
    }

    /// Whether every sample in `[start, end)` is zero.
    pub fn is_silent_between(&self, start: Duration, end: Duration) -> bool {
        let from = samples_for(start, self.sample_rate).min(self.samples.len());
        let to = samples_for(end, self.sample_rate).min(self.samples.len());
        self.samples[from..to.max(from)].iter().all(|s| *s == 0.0)
    }

    pub fn into_clip(self) -> AudioClip {
        AudioClip::new(self.samples, self.sample_rate)
    }

    /// Export as 16-bit mono WAV. Consumes the timeline.
    pub fn write_wav(self, path: &Path) -> Result<()> {
        write_wav(path, &self.into_clip())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_samples_for() {
        assert_eq!(samples_for(Duration::from_secs(1), 24_000), 24_000);
        assert_eq!(samples_for(Duration::from_millis(1500), 16_000), 24_000);
        assert_eq!(samples_for(Duration::ZERO, 16_000), 0);
    }

    #[test]
    fn test_silent_clip() {
        let clip = AudioClip::silent(Duration::from_millis(500), 16_000);
        assert_eq!(clip.samples.len(), 8000);
        assert_eq!(clip.duration(), Duration::from_millis(500));
        assert!(clip.is_silent());
    }

    #[test]
    fn test_from_pcm16_le() {
        let bytes = [0x00, 0x00, 0xff, 0x7f, 0x01, 0x80, 0x07];
        let clip = AudioClip::from_pcm16_le(&bytes, 22_050);
        assert_eq!(clip.samples.len(), 3);
        assert_eq!(clip.samples[0], 0.0);
        assert_eq!(clip.samples[1], 1.0);
        assert_eq!(clip.samples[2], -1.0);
    }

    #[test]
    fn test_resample_halves_length() {
        let clip = AudioClip::new(vec![0.0, 0.5, 1.0, 0.5], 16_000);
        let down = clip.resampled(8_000);
        assert_eq!(down.samples, vec![0.0, 1.0]);
        assert_eq!(down.sample_rate, 8_000);

        let up = clip.resampled(32_000);
        assert_eq!(up.samples.len(), 8);
        assert_eq!(up.samples[1], 0.25);
    }

    #[test]
    fn test_overlay_mixes_and_clamps() {
        let mut timeline = Timeline::silent(Duration::from_secs(1), 1000);
        let clip = AudioClip::new(vec![0.6; 100], 1000);

        timeline.overlay(&clip, Duration::from_millis(200));
        timeline.overlay(&clip, Duration::from_millis(250));

        assert!(timeline.is_silent_between(Duration::ZERO, Duration::from_millis(200)));
        assert_eq!(timeline.samples()[220], 0.6);
        assert_eq!(timeline.samples()[260], 1.0);
        assert!(timeline.is_silent_between(Duration::from_millis(350), Duration::from_secs(1)));
    }

    #[test]
    fn test_overlay_truncated_at_end() {
        let mut timeline = Timeline::silent(Duration::from_millis(100), 1000);
        let clip = AudioClip::new(vec![0.5; 100], 1000);

        timeline.overlay(&clip, Duration::from_millis(50));
        timeline.overlay(&clip, Duration::from_secs(5));

        assert_eq!(timeline.samples().len(), 100);
        assert_eq!(timeline.samples()[99], 0.5);
    }

    #[test]
    fn test_overlay_resamples_clip() {
        let mut timeline = Timeline::silent(Duration::from_secs(1), 1000);
        let clip = AudioClip::new(vec![0.5; 200], 2000);

        timeline.overlay(&clip, Duration::ZERO);

        assert_eq!(timeline.samples()[99], 0.5);
        assert_eq!(timeline.samples()[100], 0.0);
    }
}
