//! Capture-time writes: EXIF dates inside JPEGs and filesystem times.

use anyhow::{anyhow, bail, Context, Result};
use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use exif::experimental::Writer;
use exif::{Field, In, Tag, Value};
use img_parts::jpeg::Jpeg;
use img_parts::{Bytes, ImageEXIF};
use std::fs::{self, File, FileTimes};
use std::io::Cursor;
use std::path::Path;
use std::time::SystemTime;
use tracing::{info, warn};

const DATE_TAGS: [Tag; 3] = [Tag::DateTime, Tag::DateTimeOriginal, Tag::DateTimeDigitized];

/// The watermark only carries a day, so every file is stamped at local noon.
pub fn capture_time(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::from_hms_opt(12, 0, 0).unwrap_or_default())
}

/// EXIF `YYYY:MM:DD HH:MM:SS` form.
pub fn exif_datetime(date: NaiveDate) -> String {
    capture_time(date).format("%Y:%m:%d %H:%M:%S").to_string()
}

fn is_jpeg(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| matches!(e.to_ascii_uppercase().as_str(), "JPG" | "JPEG"))
        .unwrap_or(false)
}

/// JPEG data referenced by `ifd`, such as the IFD1 thumbnail.
fn embedded_jpeg(exif: &exif::Exif, ifd: In) -> Option<&[u8]> {
    let offset = exif.get_field(Tag::JPEGInterchangeFormat, ifd)?.value.get_uint(0)? as usize;
    let len = exif.get_field(Tag::JPEGInterchangeFormatLength, ifd)?.value.get_uint(0)? as usize;
    exif.buf().get(offset..offset.checked_add(len)?)
}

/// Rewrites DateTime, DateTimeOriginal and DateTimeDigitized in a JPEG,
/// keeping every other field that can be re-encoded along with the
/// thumbnail.
pub fn write_exif_dates(path: &Path, date: NaiveDate) -> Result<()> {
    let data = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let mut jpeg = Jpeg::from_bytes(Bytes::from(data))
        .map_err(|e| anyhow!("Not a JPEG file {}: {}", path.display(), e))?;

    let existing = match jpeg.exif() {
        Some(raw) => Some(
            exif::Reader::new()
                .read_raw(raw.to_vec())
                .context("Failed to parse existing EXIF")?,
        ),
        None => None,
    };

    let stamp = exif_datetime(date).into_bytes();
    let new_fields: Vec<Field> = DATE_TAGS
        .iter()
        .map(|&tag| Field {
            tag,
            ifd_num: In::PRIMARY,
            value: Value::Ascii(vec![stamp.clone()]),
        })
        .collect();

    let mut writer = Writer::new();
    if let Some(exif) = &existing {
        for field in exif.fields() {
            let replaced = field.ifd_num == In::PRIMARY && DATE_TAGS.contains(&field.tag);
            // Unknown types carry no data to write back
            if !replaced && !matches!(field.value, Value::Unknown(..)) {
                writer.push_field(field);
            }
        }
        if let Some(thumbnail) = embedded_jpeg(exif, In::THUMBNAIL) {
            writer.set_jpeg(thumbnail, In::THUMBNAIL);
        }
    }
    for field in &new_fields {
        writer.push_field(field);
    }

    let little_endian = existing.as_ref().map(|e| e.little_endian()).unwrap_or(false);
    let mut buf = Cursor::new(Vec::new());
    writer
        .write(&mut buf, little_endian)
        .context("Failed to encode EXIF")?;

    jpeg.set_exif(Some(Bytes::from(buf.into_inner())));

    let mut out = Vec::new();
    jpeg.encoder()
        .write_to(&mut out)
        .context("Failed to encode JPEG")?;
    fs::write(path, out).with_context(|| format!("Failed to write {}", path.display()))?;

    Ok(())
}

/// Opens a handle that may change timestamps without write access to the
/// contents, so read-only files can still be stamped.
#[cfg(windows)]
fn open_for_times(path: &Path) -> std::io::Result<File> {
    use std::os::windows::fs::OpenOptionsExt;
    const FILE_WRITE_ATTRIBUTES: u32 = 0x0100;
    File::options()
        .access_mode(FILE_WRITE_ATTRIBUTES)
        .open(path)
}

#[cfg(not(windows))]
fn open_for_times(path: &Path) -> std::io::Result<File> {
    File::open(path)
}

/// Sets access and modification times to local noon of `date`.
pub fn set_file_times(path: &Path, date: NaiveDate) -> Result<()> {
    let local = Local
        .from_local_datetime(&capture_time(date))
        .earliest()
        .ok_or_else(|| anyhow!("{} does not exist in local time", capture_time(date)))?;
    let time = SystemTime::from(local);

    let file = open_for_times(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    file.set_times(FileTimes::new().set_accessed(time).set_modified(time))
        .with_context(|| format!("Failed to set times on {}", path.display()))?;

    Ok(())
}

/// Which of the two writes went through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaTimeUpdate {
    pub exif: bool,
    pub file_times: bool,
}

impl MediaTimeUpdate {
    /// Either write counts as success.
    pub fn succeeded(&self) -> bool {
        self.exif || self.file_times
    }
}

/// Stamps `date` onto a media file. EXIF is only attempted for JPEGs.
/// Failures are logged, not returned.
pub fn set_media_time(path: &Path, date: NaiveDate) -> MediaTimeUpdate {
    let mut update = MediaTimeUpdate {
        exif: false,
        file_times: false,
    };

    if is_jpeg(path) {
        match write_exif_dates(path, date) {
            Ok(()) => {
                update.exif = true;
                info!("Updated EXIF dates for {}", path.display());
            }
            Err(e) => warn!("Failed to update EXIF data for {}: {:#}", path.display(), e),
        }
    }

    match set_file_times(path, date) {
        Ok(()) => update.file_times = true,
        Err(e) => warn!("Failed to update file timestamp for {}: {:#}", path.display(), e),
    }

    update
}

/// Parses a manually supplied `YYYY-MM-DD` date, rejecting future dates and
/// anything before 2000-01-01.
pub fn parse_manual_date(text: &str, today: NaiveDate) -> Result<NaiveDate> {
    let date = NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d")
        .with_context(|| format!("Invalid date '{}', expected YYYY-MM-DD", text.trim()))?;
    let earliest = NaiveDate::from_ymd_opt(2000, 1, 1).unwrap_or(NaiveDate::MIN);

    if date > today {
        bail!("{} is in the future", date);
    }
    if date < earliest {
        bail!("{} is before {}", date, earliest);
    }
    Ok(date)
}
