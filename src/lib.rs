//! Dash-cam screenshot dating.
//!
//! Reads the date burned into the corner of dash-cam pictures and video
//! frames with several OCR engines, settles on one date by majority, then
//! stamps it into the file's EXIF data and timestamps and renames the file.

pub mod cli;
pub mod config;
pub mod logging;
pub mod media;
pub mod ocr;
pub mod paths;
