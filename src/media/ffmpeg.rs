use std::path::Path;
use std::process::{Command, Output};

use crate::config::MediaConfig;
use crate::error::{AppError, AppResult};

/// Thin wrapper over the `ffprobe` / `ffmpeg` binaries used to read the
/// source video.
#[derive(Debug, Clone)]
pub struct MediaTool {
    ffmpeg: String,
    ffprobe: String,
}

impl MediaTool {
    pub fn new(config: &MediaConfig) -> Self {
        Self {
            ffmpeg: config.ffmpeg_binary.clone(),
            ffprobe: config.ffprobe_binary.clone(),
        }
    }

    pub fn probe_duration_sec(&self, video: &Path) -> AppResult<f64> {
        let output = run(
            &self.ffprobe,
            Command::new(&self.ffprobe)
                .args([
                    "-v",
                    "error",
                    "-show_entries",
                    "format=duration",
                    "-of",
                    "default=noprint_wrappers=1:nokey=1",
                ])
                .arg(video),
        )?;
        parse_duration(&String::from_utf8_lossy(&output.stdout))
    }

    /// Single JPEG still at `at_sec`, encoded with ffmpeg's `-q:v` scale.
    pub fn extract_frame_jpeg(&self, video: &Path, at_sec: f64, quality: u8) -> AppResult<Vec<u8>> {
        let output = run(
            &self.ffmpeg,
            Command::new(&self.ffmpeg)
                .args(["-v", "error", "-ss", &format_seek(at_sec), "-i"])
                .arg(video)
                .args([
                    "-frames:v",
                    "1",
                    "-q:v",
                    &quality.to_string(),
                    "-f",
                    "image2pipe",
                    "-vcodec",
                    "mjpeg",
                    "-",
                ]),
        )?;
        if output.stdout.is_empty() {
            return Err(AppError::Media(format!(
                "no frame decoded at {at_sec:.3}s from {}",
                video.display()
            )));
        }
        Ok(output.stdout)
    }

    /// Re-encodes `[start_sec, start_sec + length_sec)` into `destination`
    /// at `fps` frames per second without audio.
    pub fn extract_clip(
        &self,
        video: &Path,
        start_sec: f64,
        length_sec: f64,
        fps: f64,
        destination: &Path,
    ) -> AppResult<()> {
        run(
            &self.ffmpeg,
            Command::new(&self.ffmpeg)
                .args([
                    "-v",
                    "error",
                    "-y",
                    "-ss",
                    &format_seek(start_sec),
                    "-t",
                    &format_seek(length_sec),
                    "-i",
                ])
                .arg(video)
                .args([
                    "-an",
                    "-r",
                    &format!("{fps:.3}"),
                    "-c:v",
                    "libx264",
                    "-preset",
                    "ultrafast",
                    "-pix_fmt",
                    "yuv420p",
                    "-f",
                    "mp4",
                ])
                .arg(destination),
        )?;
        Ok(())
    }
}

fn run(binary: &str, command: &mut Command) -> AppResult<Output> {
    let output = command.output().map_err(|error| {
        if error.kind() == std::io::ErrorKind::NotFound {
            AppError::BinaryMissing {
                binary: binary.to_owned(),
            }
        } else {
            AppError::Media(format!("failed to launch {binary}: {error}"))
        }
    })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(AppError::Media(format!(
            "{binary} exited with {}: {}",
            output.status,
            stderr.trim()
        )));
    }
    Ok(output)
}

fn format_seek(seconds: f64) -> String {
    format!("{:.3}", seconds.max(0.0))
}

pub(crate) fn parse_duration(raw: &str) -> AppResult<f64> {
    let trimmed = raw.trim();
    let duration = trimmed
        .lines()
        .next()
        .unwrap_or_default()
        .trim()
        .parse::<f64>()
        .map_err(|_| AppError::Media(format!("unparseable duration `{trimmed}`")))?;

    if !duration.is_finite() || duration <= 0.0 {
        return Err(AppError::Media(format!(
            "video reports non-positive duration `{trimmed}`"
        )));
    }
    Ok(duration)
}
