//! Error types shared by the record codec, the writer protocol, and all
//! four converter front ends.

use std::path::Path;

use thiserror::Error;

/// Errors produced while converting an input into a ZIP archive.
///
/// Every variant that concerns a particular input carries that input's
/// display name, so the message identifies the offending file without any
/// surrounding context.
#[derive(Debug, Error)]
pub enum Error {
    /// The input path does not exist.
    #[error("file not found: {0}")]
    NotFound(String),

    /// The input's structure is broken (bad PDF anchors, empty entry
    /// name, unreadable RAR data, and so on).
    #[error("{what}: {name}")]
    Malformed { what: &'static str, name: String },

    /// A recognized but unsupported feature (encryption, data
    /// descriptors, 64-bit sizes, unknown charsets).
    #[error("{what}: {name}")]
    Unsupported { what: &'static str, name: String },

    /// A size, offset, or count does not fit its declared field width.
    /// Never silently truncated.
    #[error("{what}: {name}")]
    Overflow { what: &'static str, name: String },

    /// The optional RAR decoder library (or one of its required symbols)
    /// could not be resolved.
    #[error("libunrar not found")]
    DecoderUnavailable,

    /// An underlying read, write, or seek failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for conversion operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Display name used in error messages and progress output: the final
/// path component, falling back to the whole path.
pub fn display_name(path: &Path) -> String {
    match path.file_name() {
        Some(name) => name.to_string_lossy().into_owned(),
        None => path.display().to_string(),
    }
}

/// Narrow a size, offset, or count to a 32-bit header field, refusing
/// values that do not fit.
pub fn fit_u32(value: u64, what: &'static str, name: &str) -> Result<u32> {
    u32::try_from(value).map_err(|_| Error::Overflow { what, name: name.to_string() })
}
