//! Zip packaging of batch results.

use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::error::BatchError;
use crate::operation::OperationResult;

/// MIME type of batch archives.
pub const ARCHIVE_MIME: &str = "application/zip";

/// Packs `items` into a zip archive, one entry per item, in order.
///
/// Entry names are used as given; callers make them unique first.
pub fn build_archive(items: &[OperationResult]) -> Result<Vec<u8>, BatchError> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for item in items {
        writer.start_file(item.filename.as_str(), options)?;
        writer.write_all(&item.bytes)?;
    }

    Ok(writer.finish()?.into_inner())
}
