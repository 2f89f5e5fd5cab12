//! Picture-comment encoding for formats without native attached pictures.
//!
//! Vorbis-comment players read cover art from a `METADATA_BLOCK_PICTURE` tag
//! whose value is a base64 encoded FLAC picture block:
//!
//! ```text
//! u32 picture type (3 = front cover)
//! u32 mime length, mime bytes
//! u32 description length (0)
//! u32 width, u32 height, u32 depth, u32 colour count (all 0)
//! u32 data length, data bytes
//! ```
//!
//! All integers are big-endian.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use thiserror::Error;

/// Tag key carrying the encoded block.
pub const PICTURE_TAG: &str = "METADATA_BLOCK_PICTURE";

/// Picture type for "Cover (front)".
pub const FRONT_COVER: u32 = 3;

const JPEG_MAGIC: &[u8] = &[0xFF, 0xD8, 0xFF];
const PNG_MAGIC: &[u8] = &[0x89, 0x50, 0x4E, 0x47];

/// Errors from decoding a picture block.
#[derive(Debug, Error)]
pub enum PictureError {
    #[error("Picture block is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Picture block truncated at offset {offset}")]
    Truncated { offset: usize },

    #[error("Picture block MIME type is not UTF-8")]
    InvalidMime,
}

/// Sniffs an image MIME type from magic bytes.
///
/// Unknown data is labelled `image/jpeg`; it is still embedded.
pub fn detect_image_mime(bytes: &[u8]) -> &'static str {
    if bytes.starts_with(PNG_MAGIC) {
        return "image/png";
    }
    if !bytes.starts_with(JPEG_MAGIC) {
        tracing::debug!("Unrecognised image signature, labelling as JPEG");
    }
    "image/jpeg"
}

/// File extension matching [`detect_image_mime`].
pub fn image_extension(mime: &str) -> &'static str {
    match mime {
        "image/png" => "png",
        _ => "jpg",
    }
}

/// Serializes a front-cover picture block and base64 encodes it.
pub fn build_picture_block(image: &[u8], mime: &str) -> String {
    let mime = mime.as_bytes();
    let mut block = Vec::with_capacity(32 + mime.len() + image.len());

    block.extend_from_slice(&FRONT_COVER.to_be_bytes());
    block.extend_from_slice(&(mime.len() as u32).to_be_bytes());
    block.extend_from_slice(mime);
    // description length, width, height, depth, colour count
    for _ in 0..5 {
        block.extend_from_slice(&0u32.to_be_bytes());
    }
    block.extend_from_slice(&(image.len() as u32).to_be_bytes());
    block.extend_from_slice(image);

    STANDARD.encode(block)
}

/// Formats the engine metadata argument value for an image.
pub fn picture_tag_value(image: &[u8]) -> String {
    format!(
        "{}={}",
        PICTURE_TAG,
        build_picture_block(image, detect_image_mime(image))
    )
}

/// Decoded picture block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PictureBlock {
    pub picture_type: u32,
    pub mime: String,
    pub description: String,
    pub width: u32,
    pub height: u32,
    pub depth: u32,
    pub color_count: u32,
    pub data: Vec<u8>,
}

/// Decodes a base64 picture block.
pub fn parse_picture_block(encoded: &str) -> Result<PictureBlock, PictureError> {
    let raw = STANDARD.decode(encoded.trim())?;
    let mut reader = BlockReader { raw: &raw, pos: 0 };

    let picture_type = reader.u32()?;
    let mime_len = reader.u32()? as usize;
    let mime = String::from_utf8(reader.bytes(mime_len)?.to_vec())
        .map_err(|_| PictureError::InvalidMime)?;
    let description_len = reader.u32()? as usize;
    let description = String::from_utf8_lossy(reader.bytes(description_len)?).into_owned();
    let width = reader.u32()?;
    let height = reader.u32()?;
    let depth = reader.u32()?;
    let color_count = reader.u32()?;
    let data_len = reader.u32()? as usize;
    let data = reader.bytes(data_len)?.to_vec();

    Ok(PictureBlock {
        picture_type,
        mime,
        description,
        width,
        height,
        depth,
        color_count,
        data,
    })
}

struct BlockReader<'a> {
    raw: &'a [u8],
    pos: usize,
}

impl<'a> BlockReader<'a> {
    fn bytes(&mut self, len: usize) -> Result<&'a [u8], PictureError> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|end| *end <= self.raw.len())
            .ok_or(PictureError::Truncated { offset: self.pos })?;
        let slice = &self.raw[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn u32(&mut self) -> Result<u32, PictureError> {
        let bytes = self.bytes(4)?;
        Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }
}
