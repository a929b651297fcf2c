//! # anyzip
//!
//! A converter that turns directories, PDF documents, RAR archives and
//! existing ZIP archives into well-formed, stored-only ZIP archives.
//!
//! ## Features
//!
//! - Pack a directory tree into a ZIP next to it, in natural sort order
//! - Extract embedded JPEG streams from a PDF into a ZIP
//! - Repack a RAR archive as ZIP via a dynamically bound libunrar
//! - Rewrite a ZIP in place: inflate deflated entries, re-sort, and
//!   transcode entry names between character sets
//!
//! All output entries are stored uncompressed with the CRC computed
//! while streaming, so archives open everywhere and entries can be
//! memory-mapped directly.
//!
//! ## Example
//!
//! ```no_run
//! use std::path::Path;
//! use anyzip::{dir_to_zip, Options};
//!
//! fn main() -> anyzip::Result<()> {
//!     let opts = Options { quiet: true, ..Options::default() };
//!     // Writes photos.zip next to the directory.
//!     dir_to_zip(Path::new("photos"), &opts)
//! }
//! ```

pub mod charset;
pub mod cli;
pub mod convert;
pub mod dostime;
pub mod error;
pub mod natcmp;
pub mod options;
pub mod progress;
pub mod rename;
pub mod trash;
pub mod zip;

pub use charset::Charsets;
pub use cli::Cli;
pub use convert::{dir_to_zip, pdf_to_zip, rar_to_zip, zip_to_zip};
pub use error::{display_name, Error, Result};
pub use options::Options;
pub use zip::ZipWriter;
