//! Media-folder side of the tool: finding files, pulling video frames,
//! stamping dates and renaming.

pub mod discover;
pub mod frame;
pub mod processor;
pub mod rename;
pub mod timestamp;

use std::path::PathBuf;

pub use discover::discover;
pub use processor::{process_folder, BatchSummary};
pub use timestamp::set_media_time;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Picture,
    Video,
}

/// A file waiting to be dated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaFile {
    pub path: PathBuf,
    pub kind: MediaKind,
}

impl MediaFile {
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}
