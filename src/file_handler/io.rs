//! File reading with encoding detection
//!
//! Source files handed to the code viewer may carry a UTF-8 BOM or be UTF-16.
//! They are decoded to a `String` here; whether the result is viewable is
//! decided afterwards by [`super::viewer`].

use crate::error::{FileError, FileResult};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Largest file read into memory at all (16 MiB)
pub const MAX_READ_SIZE: u64 = 16 * 1024 * 1024;

/// Detected encoding of a file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FileEncoding {
    /// UTF-8 without BOM
    #[default]
    Utf8,
    /// UTF-8 with BOM
    Utf8Bom,
    /// UTF-16 Little Endian with BOM
    Utf16Le,
    /// UTF-16 Big Endian with BOM
    Utf16Be,
    /// Not valid UTF-8 (lossy conversion used)
    Unknown,
}

/// Result of reading a file
#[derive(Debug, Clone)]
pub struct FileReadResult {
    /// The file content as a string
    pub content: String,
    /// Detected encoding
    pub encoding: FileEncoding,
    /// Size on disk in bytes
    pub size_bytes: u64,
    /// Whether lossy conversion was used
    pub lossy: bool,
}

/// Detect file encoding from raw bytes
fn detect_encoding(bytes: &[u8]) -> FileEncoding {
    if bytes.starts_with(&[0xEF, 0xBB, 0xBF]) {
        return FileEncoding::Utf8Bom;
    }
    if bytes.starts_with(&[0xFF, 0xFE]) {
        return FileEncoding::Utf16Le;
    }
    if bytes.starts_with(&[0xFE, 0xFF]) {
        return FileEncoding::Utf16Be;
    }

    if std::str::from_utf8(bytes).is_ok() {
        FileEncoding::Utf8
    } else {
        FileEncoding::Unknown
    }
}

/// Decode bytes to string based on detected encoding
fn decode_content(bytes: &[u8], encoding: FileEncoding) -> (String, bool) {
    match encoding {
        FileEncoding::Utf8 => decode_utf8(bytes),
        FileEncoding::Utf8Bom => decode_utf8(&bytes[3..]),
        FileEncoding::Utf16Le => decode_utf16(&bytes[2..], u16::from_le_bytes),
        FileEncoding::Utf16Be => decode_utf16(&bytes[2..], u16::from_be_bytes),
        FileEncoding::Unknown => (String::from_utf8_lossy(bytes).into_owned(), true),
    }
}

fn decode_utf8(bytes: &[u8]) -> (String, bool) {
    match std::str::from_utf8(bytes) {
        Ok(s) => (s.to_string(), false),
        Err(_) => (String::from_utf8_lossy(bytes).into_owned(), true),
    }
}

fn decode_utf16(bytes: &[u8], to_unit: fn([u8; 2]) -> u16) -> (String, bool) {
    // A trailing odd byte cannot form a code unit
    let mut lossy = bytes.len() % 2 != 0;
    let units = bytes.chunks_exact(2).map(|chunk| to_unit([chunk[0], chunk[1]]));

    let result: String = char::decode_utf16(units)
        .map(|r| {
            r.unwrap_or_else(|_| {
                lossy = true;
                char::REPLACEMENT_CHARACTER
            })
        })
        .collect();

    (result, lossy)
}

fn io_error(path: PathBuf, e: std::io::Error) -> FileError {
    match e.kind() {
        ErrorKind::NotFound => FileError::NotFound(path),
        ErrorKind::PermissionDenied => FileError::PermissionDenied { path },
        _ => FileError::ReadError { path, source: e },
    }
}

/// Read a file with encoding detection
pub async fn read_file(path: impl AsRef<Path>) -> FileResult<FileReadResult> {
    let path = path.as_ref();
    let path_buf = path.to_path_buf();

    let metadata = tokio::fs::metadata(path)
        .await
        .map_err(|e| io_error(path_buf.clone(), e))?;

    if !metadata.is_file() {
        return Err(FileError::NotAFile { path: path_buf });
    }

    let size_bytes = metadata.len();
    if size_bytes > MAX_READ_SIZE {
        return Err(FileError::FileTooLarge {
            path: path_buf,
            size: size_bytes,
            max_size: MAX_READ_SIZE,
        });
    }

    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| io_error(path_buf.clone(), e))?;

    let encoding = detect_encoding(&bytes);
    let (content, lossy) = decode_content(&bytes, encoding);
    if lossy {
        log::debug!("Lossy decode of {} ({:?})", path.display(), encoding);
    }

    Ok(FileReadResult {
        content,
        encoding,
        size_bytes,
        lossy,
    })
}
