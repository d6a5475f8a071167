use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use super::{MediaFile, MediaKind};
use crate::config::MediaConfig;

const PICTURE_EXTENSIONS: &[&str] = &["JPG", "JPEG", "PNG"];
const VIDEO_EXTENSIONS: &[&str] = &["MP4"];

/// Decides whether a file name is unprocessed media. Names already carrying
/// the output prefix were handled by an earlier run.
pub fn classify(file_name: &str, config: &MediaConfig) -> Option<MediaKind> {
    let ext = Path::new(file_name)
        .extension()?
        .to_str()?
        .to_ascii_uppercase();

    let ext = ext.as_str();

    if PICTURE_EXTENSIONS.contains(&ext) && !file_name.starts_with(&config.picture_prefix) {
        Some(MediaKind::Picture)
    } else if VIDEO_EXTENSIONS.contains(&ext) && !file_name.starts_with(&config.video_prefix) {
        Some(MediaKind::Video)
    } else {
        None
    }
}

/// Lists the media in `folder` (non-recursive), sorted by file name.
pub fn discover(folder: &Path, config: &MediaConfig) -> Result<Vec<MediaFile>> {
    let entries = fs::read_dir(folder)
        .with_context(|| format!("Failed to read media folder {}", folder.display()))?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if let Some(kind) = classify(&name, config) {
            files.push(MediaFile {
                path: entry.path(),
                kind,
            });
        }
    }

    files.sort_by(|a, b| a.path.file_name().cmp(&b.path.file_name()));
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_classify() {
        let config = MediaConfig::default();
        assert_eq!(classify("20240901_0001.jpg", &config), Some(MediaKind::Picture));
        assert_eq!(classify("shot.JPEG", &config), Some(MediaKind::Picture));
        assert_eq!(classify("shot.png", &config), Some(MediaKind::Picture));
        assert_eq!(classify("clip.MP4", &config), Some(MediaKind::Video));
        assert_eq!(classify("IMG_HM_2024-09-01.jpg", &config), None);
        assert_eq!(classify("V_HM_2024-09-01.mp4", &config), None);
        assert_eq!(classify("notes.txt", &config), None);
        assert_eq!(classify("README", &config), None);
    }

    #[test]
    fn test_video_prefix_does_not_hide_pictures() {
        let config = MediaConfig::default();
        assert_eq!(classify("V_HM_shot.jpg", &config), Some(MediaKind::Picture));
    }

    #[test]
    fn test_discover_sorted_and_filtered() {
        let dir = tempdir().unwrap();
        for name in ["b.jpg", "a.mp4", "IMG_HM_2024-01-01.jpg", "c.txt"] {
            fs::write(dir.path().join(name), b"x").unwrap();
        }
        fs::create_dir(dir.path().join("sub.jpg")).unwrap();

        let files = discover(dir.path(), &MediaConfig::default()).unwrap();
        let names: Vec<String> = files.iter().map(|f| f.file_name()).collect();
        assert_eq!(names, ["a.mp4", "b.jpg"]);
        assert_eq!(files[0].kind, MediaKind::Video);
    }

    #[test]
    fn test_discover_missing_folder() {
        assert!(discover(Path::new("/nonexistent/media"), &MediaConfig::default()).is_err());
    }
}
