use anyhow::{anyhow, Result};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::info;

use crate::config::{AppConfig, EngineConfig};
use crate::paths;

const TESSDATA_REPO: &str = "https://github.com/tesseract-ocr/tessdata/raw/main";

const COMMON_EXECUTABLES: &[&str] = &[
    "/opt/homebrew/bin/tesseract",
    "/usr/local/bin/tesseract",
    "/usr/bin/tesseract",
    r"C:\Program Files\Tesseract-OCR\tesseract.exe",
    r"C:\Program Files (x86)\Tesseract-OCR\tesseract.exe",
];

const COMMON_TESSDATA: &[&str] = &[
    "/opt/homebrew/share/tessdata",
    "/usr/local/share/tessdata",
    "/usr/share/tesseract-ocr/5/tessdata",
    "/usr/share/tesseract-ocr/4.00/tessdata",
    "/usr/share/tessdata",
    r"C:\Program Files\Tesseract-OCR\tessdata",
    r"C:\Program Files (x86)\Tesseract-OCR\tessdata",
];

fn traineddata_name(language: &str) -> String {
    format!("{}.traineddata", language)
}

/// Finds the Tesseract executable: configured path, then PATH, then common
/// install locations.
pub fn find_tesseract_executable(configured: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = configured {
        if path.exists() {
            return Ok(path.to_path_buf());
        }
        return Err(anyhow!("Configured Tesseract not found: {}", path.display()));
    }

    if let Ok(output) = Command::new("tesseract").arg("--version").output() {
        if output.status.success() {
            return Ok(PathBuf::from("tesseract"));
        }
    }

    for path in COMMON_EXECUTABLES {
        let p = PathBuf::from(path);
        if p.exists() {
            return Ok(p);
        }
    }

    Err(anyhow!("Tesseract not found. Please install Tesseract-OCR."))
}

/// Finds a tessdata directory holding `<language>.traineddata`.
///
/// Returns `Ok(None)` when nothing is configured and tesseract should use its
/// built-in default.
pub fn find_tessdata_dir(configured: Option<&Path>, language: &str) -> Result<Option<PathBuf>> {
    let file = traineddata_name(language);

    if let Some(dir) = configured {
        if dir.join(&file).exists() {
            return Ok(Some(dir.to_path_buf()));
        }
        return Err(anyhow!(
            "{} not found in configured tessdata dir {}",
            file,
            dir.display()
        ));
    }

    let local = paths::get_tessdata_dir();
    if local.join(&file).exists() {
        return Ok(Some(local));
    }

    if let Ok(prefix) = std::env::var("TESSDATA_PREFIX") {
        let p = PathBuf::from(&prefix);
        if p.join(&file).exists() {
            return Ok(Some(p));
        }
        let p = p.join("tessdata");
        if p.join(&file).exists() {
            return Ok(Some(p));
        }
    }

    for path in COMMON_TESSDATA {
        let p = PathBuf::from(path);
        if p.join(&file).exists() {
            return Ok(Some(p));
        }
    }

    Ok(None)
}

/// Downloads `<language>.traineddata` into the local tessdata directory.
pub fn download_tessdata(language: &str) -> Result<PathBuf> {
    let tessdata_dir = paths::get_tessdata_dir();
    fs::create_dir_all(&tessdata_dir)?;

    let file = traineddata_name(language);
    let url = format!("{}/{}", TESSDATA_REPO, file);
    let dest = tessdata_dir.join(&file);

    info!("Downloading {}...", url);

    let client = reqwest::blocking::Client::builder()
        .timeout(std::time::Duration::from_secs(300))
        .build()?;

    let response = client
        .get(&url)
        .header("User-Agent", "dashcam-stamp")
        .send()?;

    if !response.status().is_success() {
        return Err(anyhow!(
            "Failed to download {}: HTTP {}",
            file,
            response.status()
        ));
    }

    let bytes = response.bytes()?;
    let mut out = fs::File::create(&dest)?;
    out.write_all(&bytes)?;

    info!("Downloaded {} ({} bytes)", file, bytes.len());

    Ok(dest)
}

/// One prerequisite of one engine.
#[derive(Debug, Clone)]
pub struct Prerequisite {
    pub engine: String,
    pub item: String,
    pub status: Result<PathBuf, String>,
}

fn file_status(path: &Path) -> Result<PathBuf, String> {
    if path.is_file() {
        Ok(path.to_path_buf())
    } else {
        Err(format!("missing: {}", path.display()))
    }
}

/// Checks what every configured engine needs, downloading tessdata when
/// `download` is set and it cannot be found.
pub fn check_prerequisites(config: &AppConfig, download: bool) -> Vec<Prerequisite> {
    let mut report = Vec::new();

    for engine in &config.engines {
        let name = engine.name().to_string();
        match engine {
            EngineConfig::SceneText { model, dictionary, .. } => {
                report.push(Prerequisite {
                    engine: name.clone(),
                    item: "model".to_string(),
                    status: file_status(model),
                });
                report.push(Prerequisite {
                    engine: name,
                    item: "dictionary".to_string(),
                    status: file_status(dictionary),
                });
            }
            EngineConfig::Classifier { model, charset, .. } => {
                report.push(Prerequisite {
                    engine: name.clone(),
                    item: "model".to_string(),
                    status: file_status(model),
                });
                report.push(Prerequisite {
                    engine: name,
                    item: "charset".to_string(),
                    status: file_status(charset),
                });
            }
            EngineConfig::Tesseract {
                executable,
                tessdata,
                language,
                ..
            } => {
                report.push(Prerequisite {
                    engine: name.clone(),
                    item: "executable".to_string(),
                    status: find_tesseract_executable(executable.as_deref())
                        .map_err(|e| e.to_string()),
                });

                let data = match find_tessdata_dir(tessdata.as_deref(), language) {
                    Ok(Some(dir)) => Ok(dir),
                    Ok(None) if download => {
                        download_tessdata(language).map_err(|e| format!("{:#}", e))
                    }
                    Ok(None) => Err(format!(
                        "{} not found (run setup without --no-download)",
                        traineddata_name(language)
                    )),
                    Err(e) => Err(e.to_string()),
                };
                report.push(Prerequisite {
                    engine: name,
                    item: "tessdata".to_string(),
                    status: data,
                });
            }
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_configured_executable_must_exist() {
        let err = find_tesseract_executable(Some(Path::new("/nonexistent/tesseract"))).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_configured_tessdata_dir() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("eng.traineddata"), b"stub").unwrap();

        let found = find_tessdata_dir(Some(dir.path()), "eng").unwrap();
        assert_eq!(found, Some(dir.path().to_path_buf()));

        assert!(find_tessdata_dir(Some(dir.path()), "deu").is_err());
    }

    #[test]
    fn test_prerequisites_report_missing_models() {
        let config = AppConfig {
            engines: vec![EngineConfig::Classifier {
                name: "classifier".to_string(),
                model: "/nonexistent/common.onnx".into(),
                charset: "/nonexistent/charset.json".into(),
            }],
            ..AppConfig::default()
        };

        let report = check_prerequisites(&config, false);
        assert_eq!(report.len(), 2);
        assert!(report.iter().all(|p| p.status.is_err()));
        assert_eq!(report[0].item, "model");
    }
}
