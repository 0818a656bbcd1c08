//! Decoders for raw clipboard buffers.
//!
//! Every function works on bytes already copied out of the clipboard; none
//! of this runs inside the clipboard critical section.

use std::io::Cursor;
use std::path::PathBuf;

use image::ImageFormat;

use super::DecodeError;

/// Byte length of the DROPFILES header preceding the file list.
const DROPFILES_HEADER_LEN: usize = 20;

/// Byte length of a BITMAPINFOHEADER.
const BITMAPINFOHEADER_LEN: usize = 40;

/// Byte length of the BITMAPFILEHEADER prepended when wrapping a DIB.
const BITMAPFILEHEADER_LEN: usize = 14;

/// Decode a CF_UNICODETEXT buffer: UTF-16LE code units up to the first NUL.
/// The OS-reported buffer size may exceed the logical string, so trailing
/// bytes past the terminator are ignored.
pub fn decode_unicode_text(bytes: &[u8]) -> Result<String, DecodeError> {
    let mut units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect();
    if let Some(nul) = units.iter().position(|&u| u == 0) {
        units.truncate(nul);
    }
    String::from_utf16(&units).map_err(|_| DecodeError::InvalidUtf16)
}

/// Decode a CF_TEXT buffer: single-byte text up to the first NUL, read
/// lossily as UTF-8 (the exact ANSI codepage is not recoverable from the
/// buffer alone).
pub fn decode_ansi_text(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

/// Parse a CF_HDROP buffer: a DROPFILES header followed by a double-NUL
/// terminated list of paths, wide or ANSI depending on the `fWide` flag.
pub fn parse_drop_list(bytes: &[u8]) -> Result<Vec<PathBuf>, DecodeError> {
    if bytes.len() < DROPFILES_HEADER_LEN {
        return Err(DecodeError::Truncated(bytes.len()));
    }

    let list_offset = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize;
    let wide = u32::from_le_bytes([bytes[16], bytes[17], bytes[18], bytes[19]]) != 0;

    if list_offset < DROPFILES_HEADER_LEN || list_offset > bytes.len() {
        return Err(DecodeError::MalformedDropList("file list offset out of range"));
    }

    let list = &bytes[list_offset..];
    if wide {
        parse_wide_path_list(list)
    } else {
        parse_ansi_path_list(list)
    }
}

fn parse_wide_path_list(list: &[u8]) -> Result<Vec<PathBuf>, DecodeError> {
    let mut paths = Vec::new();
    let mut current: Vec<u16> = Vec::new();

    for pair in list.chunks_exact(2) {
        let unit = u16::from_le_bytes([pair[0], pair[1]]);
        if unit != 0 {
            current.push(unit);
            continue;
        }
        if current.is_empty() {
            // Second consecutive NUL terminates the whole list.
            return Ok(paths);
        }
        let path = String::from_utf16(&current).map_err(|_| DecodeError::InvalidUtf16)?;
        paths.push(PathBuf::from(path));
        current.clear();
    }

    // A trailing path without its NUL means the buffer was cut short;
    // truncated input aborts rather than capturing a partial path.
    if !current.is_empty() {
        return Err(DecodeError::MalformedDropList("unterminated path list"));
    }
    Ok(paths)
}

fn parse_ansi_path_list(list: &[u8]) -> Result<Vec<PathBuf>, DecodeError> {
    let mut paths = Vec::new();
    let mut start = 0usize;

    for (i, &byte) in list.iter().enumerate() {
        if byte != 0 {
            continue;
        }
        if i == start {
            return Ok(paths);
        }
        paths.push(PathBuf::from(
            String::from_utf8_lossy(&list[start..i]).into_owned(),
        ));
        start = i + 1;
    }

    if start < list.len() {
        return Err(DecodeError::MalformedDropList("unterminated path list"));
    }
    Ok(paths)
}

/// A decoded image: canonical PNG bytes plus pixel dimensions.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pub png: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Decode CF_DIB bytes (BITMAPINFOHEADER + optional palette + pixels) and
/// re-encode to canonical PNG. Both DIB buffers and normalized bitmap
/// handles flow through here, so equal pixels always produce equal PNG
/// bytes and therefore equal fingerprints.
pub fn decode_dib(bytes: &[u8]) -> Result<DecodedImage, DecodeError> {
    let bmp = wrap_dib_in_bmp(bytes)?;

    let decoded = image::load_from_memory_with_format(&bmp, ImageFormat::Bmp)
        .map_err(|err| DecodeError::Bitmap(err.to_string()))?;
    let (width, height) = (decoded.width(), decoded.height());

    let canonical = image::DynamicImage::ImageRgba8(decoded.to_rgba8());
    let mut png = Vec::new();
    canonical
        .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
        .map_err(|err| DecodeError::Bitmap(err.to_string()))?;

    Ok(DecodedImage { png, width, height })
}

/// Prepend the BITMAPFILEHEADER a BMP decoder expects in front of raw DIB
/// bytes. The pixel data offset accounts for the info header, the color
/// palette, and BI_BITFIELDS masks.
fn wrap_dib_in_bmp(dib: &[u8]) -> Result<Vec<u8>, DecodeError> {
    if dib.len() < BITMAPINFOHEADER_LEN {
        return Err(DecodeError::Truncated(dib.len()));
    }

    let header_size = u32::from_le_bytes([dib[0], dib[1], dib[2], dib[3]]);
    if (header_size as usize) < BITMAPINFOHEADER_LEN || header_size as usize > dib.len() {
        return Err(DecodeError::Bitmap(format!(
            "invalid BITMAPINFOHEADER size {header_size}"
        )));
    }

    let bit_count = u16::from_le_bytes([dib[14], dib[15]]) as u32;
    let compression = u32::from_le_bytes([dib[16], dib[17], dib[18], dib[19]]);
    let colors_used = u32::from_le_bytes([dib[32], dib[33], dib[34], dib[35]]);

    let palette_entries = if colors_used != 0 {
        colors_used
    } else if bit_count <= 8 {
        1u32 << bit_count
    } else {
        0
    };
    // BI_BITFIELDS masks follow a 40-byte header as three extra DWORDs.
    let mask_len: u32 = if compression == 3 && header_size == BITMAPINFOHEADER_LEN as u32 {
        12
    } else {
        0
    };

    let pixel_offset = BITMAPFILEHEADER_LEN as u32 + header_size + mask_len + palette_entries * 4;

    let mut bmp = Vec::with_capacity(BITMAPFILEHEADER_LEN + dib.len());
    bmp.extend_from_slice(b"BM");
    bmp.extend_from_slice(&((BITMAPFILEHEADER_LEN + dib.len()) as u32).to_le_bytes());
    bmp.extend_from_slice(&[0u8; 4]); // reserved
    bmp.extend_from_slice(&pixel_offset.to_le_bytes());
    bmp.extend_from_slice(dib);
    Ok(bmp)
}
