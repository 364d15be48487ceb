use std::path::Path;
use std::process::Command;

use serde::Deserialize;
use tracing::{debug, info};

use crate::error::{RedubError, Result};

const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mkv", "mov", "avi", "webm", "m4v", "flv", "wmv"];

/// Check if FFmpeg is installed and accessible.
pub fn check_ffmpeg() -> Result<()> {
    let output = Command::new("ffmpeg")
        .arg("-version")
        .output()
        .map_err(|e| {
            RedubError::Audio(format!(
                "FFmpeg not found. Please install FFmpeg and ensure it's in your PATH. Error: {e}"
            ))
        })?;

    if !output.status.success() {
        return Err(RedubError::Audio("FFmpeg check failed".to_string()));
    }

    debug!("FFmpeg is available");
    Ok(())
}

/// Judge by extension whether the input carries a video track worth keeping.
pub fn is_video_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| VIDEO_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
}

/// Whether the media file has at least one audio stream.
pub fn has_audio_stream(input: &Path) -> Result<bool> {
    let output = Command::new("ffprobe")
        .args(["-v", "quiet", "-print_format", "json", "-show_streams"])
        .arg(input)
        .output()
        .map_err(|e| RedubError::Audio(format!("Failed to run FFprobe: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(RedubError::Audio(format!("FFprobe failed: {stderr}")));
    }

    let probe: ProbeOutput = serde_json::from_slice(&output.stdout)?;
    Ok(probe
        .streams
        .iter()
        .any(|s| s.codec_type.as_deref() == Some("audio")))
}

/// Extract mono 16 kHz 16-bit PCM, small enough to upload for transcription.
pub fn extract_audio(input: &Path, output: &Path) -> Result<()> {
    check_ffmpeg()?;

    if !input.exists() {
        return Err(RedubError::FileNotFound(input.display().to_string()));
    }

    info!("Extracting audio from {}", input.display());

    let status = Command::new("ffmpeg")
        .args(["-y", "-i"])
        .arg(input)
        .args(["-vn", "-acodec", "pcm_s16le", "-ar", "16000", "-ac", "1"])
        .arg(output)
        .status()
        .map_err(|e| RedubError::Audio(format!("Failed to run FFmpeg: {e}")))?;

    if !status.success() {
        return Err(RedubError::Audio("FFmpeg audio extraction failed".to_string()));
    }

    if !output.exists() {
        return Err(RedubError::Audio("Output file was not created".to_string()));
    }

    debug!("Audio extracted to {}", output.display());
    Ok(())
}

/// Mux `audio` into `video`, keeping the video stream as is and dropping its
/// original audio.
pub fn replace_audio(video: &Path, audio: &Path, output: &Path) -> Result<()> {
    check_ffmpeg()?;

    for input in [video, audio] {
        if !input.exists() {
            return Err(RedubError::FileNotFound(input.display().to_string()));
        }
    }

    info!("Replacing audio track of {}", video.display());

    let status = Command::new("ffmpeg")
        .args(replace_audio_args(video, audio, output))
        .status()
        .map_err(|e| RedubError::Audio(format!("Failed to run FFmpeg: {e}")))?;

    if !status.success() {
        return Err(RedubError::Audio("FFmpeg audio replacement failed".to_string()));
    }

    info!("Dubbed video written to {}", output.display());
    Ok(())
}

fn replace_audio_args(video: &Path, audio: &Path, output: &Path) -> Vec<std::ffi::OsString> {
    let mut args: Vec<std::ffi::OsString> = Vec::new();
    args.push("-y".into());
    args.push("-i".into());
    args.push(video.into());
    args.push("-i".into());
    args.push(audio.into());
    for arg in ["-map", "0:v", "-map", "1:a", "-c:v", "copy", "-shortest"] {
        args.push(arg.into());
    }
    args.push(output.into());
    args
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_video_file() {
        assert!(is_video_file(Path::new("talk.mp4")));
        assert!(is_video_file(Path::new("TALK.MKV")));
        assert!(!is_video_file(Path::new("talk.wav")));
        assert!(!is_video_file(Path::new("talk")));
    }

    #[test]
    fn test_replace_audio_args() {
        let args = replace_audio_args(
            Path::new("in.mp4"),
            Path::new("dub.wav"),
            Path::new("out.mp4"),
        );
        let args: Vec<String> = args
            .into_iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();

        assert_eq!(
            args,
            vec![
                "-y", "-i", "in.mp4", "-i", "dub.wav", "-map", "0:v", "-map", "1:a", "-c:v",
                "copy", "-shortest", "out.mp4"
            ]
        );
    }

    #[test]
    fn test_probe_output_parsing() {
        let json = r#"{"streams": [{"codec_type": "video"}, {"codec_type": "audio"}]}"#;
        let probe: ProbeOutput = serde_json::from_str(json).unwrap();
        assert!(probe
            .streams
            .iter()
            .any(|s| s.codec_type.as_deref() == Some("audio")));
    }

    #[test]
    fn test_extract_missing_input() {
        let dir = tempfile::tempdir().unwrap();
        let result = extract_audio(&dir.path().join("missing.mp4"), &dir.path().join("out.wav"));
        assert!(result.is_err());
    }
}
