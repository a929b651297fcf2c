//! Sequential entry naming.
//!
//! Rename mode (and the PDF extractor, which assigns names from
//! nothing) labels entries `001`, `002`, … with a canonicalized
//! extension carried over from the original name.

/// Canonicalize an extension: JPEG spelling variants collapse to
/// `.jpg`, the short TIFF suffix to `.tiff`; anything else (including
/// suffixes of two characters or fewer) passes through unchanged.
pub fn canonical_extension(extension: &str) -> &str {
    if extension.len() <= 2 {
        return extension;
    }
    match extension {
        ".jfi" | ".jfif" | ".jif" | ".jpe" | ".jpeg" => ".jpg",
        ".tif" => ".tiff",
        _ => extension,
    }
}

/// Build the sequential entry name: a zero-padded 3-digit ordinal plus
/// the canonicalized extension.
pub fn sequential_name(number: usize, extension: &str) -> String {
    format!("{:03}{}", number, canonical_extension(extension))
}

/// The final dot-suffix of a name, empty when there is none.
pub fn extension_of(name: &str) -> &str {
    match name.rfind('.') {
        Some(pos) => &name[pos..],
        None => "",
    }
}
