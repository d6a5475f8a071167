use anyhow::{anyhow, Context, Result};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};
use tempfile::NamedTempFile;

use super::engine::OcrEngine;
use super::geometry::CroppedRegion;
use super::setup::{find_tessdata_dir, find_tesseract_executable};

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Tesseract run as a subprocess with a character whitelist.
pub struct TesseractEngine {
    name: String,
    executable: PathBuf,
    tessdata: Option<PathBuf>,
    language: String,
    whitelist: String,
    psm: u8,
    timeout: Duration,
}

impl TesseractEngine {
    pub fn new(
        name: &str,
        executable: Option<&Path>,
        tessdata: Option<&Path>,
        language: &str,
        whitelist: &str,
        psm: u8,
        timeout_secs: u64,
    ) -> Result<Self> {
        Ok(Self {
            name: name.to_string(),
            executable: find_tesseract_executable(executable)?,
            tessdata: find_tessdata_dir(tessdata, language)?,
            language: language.to_string(),
            whitelist: whitelist.to_string(),
            psm,
            timeout: Duration::from_secs(timeout_secs.max(1)),
        })
    }

    fn command(&self, input: &Path) -> Command {
        let mut cmd = Command::new(&self.executable);
        cmd.arg(input).arg("stdout");
        if let Some(dir) = &self.tessdata {
            cmd.arg("--tessdata-dir").arg(dir);
        }
        cmd.arg("-l")
            .arg(&self.language)
            .arg("--psm")
            .arg(self.psm.to_string())
            .arg("-c")
            .arg(format!("tessedit_char_whitelist={}", self.whitelist));
        cmd
    }
}

impl OcrEngine for TesseractEngine {
    fn name(&self) -> &str {
        &self.name
    }

    fn recognize(&self, region: &CroppedRegion) -> Result<String> {
        // Save crop to temporary file
        let temp_input = NamedTempFile::with_suffix(".png")?;
        std::fs::write(temp_input.path(), &region.png)?;

        let mut child = self
            .command(temp_input.path())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("Failed to start {}", self.executable.display()))?;

        let status = wait_with_timeout(&mut child, self.timeout)?;

        let mut stdout = String::new();
        if let Some(mut out) = child.stdout.take() {
            out.read_to_string(&mut stdout)?;
        }

        if !status.success() {
            let mut stderr = String::new();
            if let Some(mut err) = child.stderr.take() {
                let _ = err.read_to_string(&mut stderr);
            }
            return Err(anyhow!("Tesseract failed: {}", stderr.trim()));
        }

        Ok(stdout)
    }
}

/// Waits for the child, killing it once `timeout` has passed.
fn wait_with_timeout(child: &mut Child, timeout: Duration) -> Result<ExitStatus> {
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(status);
        }
        if Instant::now() >= deadline {
            let _ = child.kill();
            let _ = child.wait();
            return Err(anyhow!("Timed out after {:?}", timeout));
        }
        std::thread::sleep(POLL_INTERVAL);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> TesseractEngine {
        TesseractEngine {
            name: "tesseract".to_string(),
            executable: PathBuf::from("tesseract"),
            tessdata: Some(PathBuf::from("/data/tessdata")),
            language: "eng".to_string(),
            whitelist: "-0123456789".to_string(),
            psm: 7,
            timeout: Duration::from_secs(5),
        }
    }

    #[test]
    fn test_command_arguments() {
        let cmd = engine().command(Path::new("crop.png"));
        let args: Vec<String> = cmd
            .get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            args,
            [
                "crop.png",
                "stdout",
                "--tessdata-dir",
                "/data/tessdata",
                "-l",
                "eng",
                "--psm",
                "7",
                "-c",
                "tessedit_char_whitelist=-0123456789",
            ]
        );
    }

    #[test]
    fn test_command_without_tessdata() {
        let mut e = engine();
        e.tessdata = None;
        let cmd = e.command(Path::new("crop.png"));
        assert!(!cmd.get_args().any(|a| a == "--tessdata-dir"));
    }

    #[cfg(unix)]
    #[test]
    fn test_wait_kills_hung_process() {
        let mut child = Command::new("sleep").arg("5").spawn().unwrap();
        let started = Instant::now();
        let result = wait_with_timeout(&mut child, Duration::from_millis(100));
        assert!(result.is_err());
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[cfg(unix)]
    #[test]
    fn test_wait_returns_status() {
        let mut child = Command::new("true").spawn().unwrap();
        let status = wait_with_timeout(&mut child, Duration::from_secs(5)).unwrap();
        assert!(status.success());
    }
}
