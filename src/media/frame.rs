use anyhow::{bail, Context, Result};
use std::path::Path;
use std::process::Command;

fn extract_command(ffmpeg: &Path, video: &Path, dest: &Path) -> Command {
    let mut cmd = Command::new(ffmpeg);
    cmd.arg("-v")
        .arg("error")
        .arg("-y")
        .arg("-i")
        .arg(video)
        .arg("-frames:v")
        .arg("1")
        .arg(dest);
    cmd
}

/// Writes the first video frame of `video` to `dest` with ffmpeg.
pub fn extract_first_frame(ffmpeg: &Path, video: &Path, dest: &Path) -> Result<()> {
    if !video.exists() {
        bail!("No such file {}", video.display());
    }

    let output = extract_command(ffmpeg, video, dest)
        .output()
        .with_context(|| format!("Failed to run {}", ffmpeg.display()))?;

    if !output.status.success() {
        bail!(
            "ffmpeg could not extract a frame from {}: {}",
            video.display(),
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }
    if !dest.is_file() {
        bail!("ffmpeg produced no frame for {}", video.display());
    }

    Ok(())
}
