//! ffmpeg helpers for splitting long recordings before upload.

use crate::error::{Result, VidqaError};
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use tokio::process::Command;
use tracing::{debug, info, instrument, warn};

/// Run a tool to completion, mapping a missing binary to `ToolNotFound`.
async fn run(tool: &str, command: &mut Command) -> Result<Output> {
    command
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                VidqaError::ToolNotFound(tool.to_string())
            } else {
                VidqaError::ToolFailed(format!("{}: {}", tool, e))
            }
        })
}

/// Cut `source` into segments of at most `segment_seconds`.
///
/// Returns `(segment_path, offset_seconds)` pairs in playback order. Audio
/// short enough to fit in one segment is returned as-is.
#[instrument(skip_all, fields(source = %source.display()))]
pub async fn split_audio(
    source: &Path,
    output_dir: &Path,
    segment_seconds: u32,
) -> Result<Vec<(PathBuf, f64)>> {
    std::fs::create_dir_all(output_dir)?;

    let total = probe_duration(source).await?;
    let segment_len = f64::from(segment_seconds.max(1));
    info!("Total audio duration: {:.1}s", total);

    if total <= segment_len {
        return Ok(vec![(source.to_path_buf(), 0.0)]);
    }

    let base_name = source
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("audio");

    let mut segments = Vec::new();
    let mut offset = 0.0;

    while offset < total {
        let path = output_dir.join(format!("{}_{:04}.mp3", base_name, segments.len()));
        extract_segment(source, &path, offset, segment_len.min(total - offset)).await?;
        debug!("Created segment at offset {:.1}s", offset);
        segments.push((path, offset));
        offset += segment_len;
    }

    info!("Created {} audio segments", segments.len());
    Ok(segments)
}

async fn extract_segment(source: &Path, dest: &Path, start: f64, length: f64) -> Result<()> {
    let window = |cmd: &mut Command| {
        cmd.arg("-ss").arg(format!("{:.3}", start))
            .arg("-i").arg(source)
            .arg("-t").arg(format!("{:.3}", length));
    };

    let mut copy = Command::new("ffmpeg");
    window(&mut copy);
    copy.args(["-c", "copy", "-y", "-loglevel", "error"]).arg(dest);

    if let Ok(out) = run("ffmpeg", &mut copy).await {
        if out.status.success() && dest.exists() {
            return Ok(());
        }
    }

    warn!("Stream copy failed, re-encoding segment");

    let mut encode = Command::new("ffmpeg");
    window(&mut encode);
    encode
        .args(["-codec:a", "libmp3lame", "-qscale:a", "2", "-y", "-loglevel", "error"])
        .arg(dest);

    let out = run("ffmpeg", &mut encode).await?;
    if !out.status.success() {
        return Err(VidqaError::ToolFailed(format!(
            "ffmpeg segment extraction failed: {}",
            String::from_utf8_lossy(&out.stderr).trim()
        )));
    }
    Ok(())
}

/// Duration of an audio file in seconds, via ffprobe.
pub async fn probe_duration(path: &Path) -> Result<f64> {
    let out = run(
        "ffprobe",
        Command::new("ffprobe")
            .args(["-v", "quiet", "-print_format", "json", "-show_format"])
            .arg(path),
    )
    .await?;

    if !out.status.success() {
        return Err(VidqaError::ToolFailed(format!(
            "ffprobe could not read {}",
            path.display()
        )));
    }

    parse_duration(&String::from_utf8_lossy(&out.stdout))
}

fn parse_duration(json: &str) -> Result<f64> {
    let parsed: serde_json::Value = serde_json::from_str(json)?;
    parsed["format"]["duration"]
        .as_str()
        .and_then(|s| s.parse::<f64>().ok())
        .ok_or_else(|| VidqaError::ToolFailed("Could not determine audio duration".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration() {
        let json = r#"{"format": {"filename": "a.mp3", "duration": "754.123000"}}"#;
        assert!((parse_duration(json).unwrap() - 754.123).abs() < 1e-6);

        assert!(parse_duration(r#"{"format": {}}"#).is_err());
        assert!(matches!(parse_duration("garbage"), Err(VidqaError::Json(_))));
    }
}
