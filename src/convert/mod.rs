//! The four converter front ends.
//!
//! Each front end enumerates candidate entries from its own source
//! kind, normalizes them to local-header metadata plus a byte stream,
//! and appends them through the shared
//! [`ZipWriter`](crate::zip::ZipWriter) protocol:
//!
//! - [`dir`]: recursive filesystem walk → `<dir>.zip`
//! - [`pdf`]: embedded JPEG extraction from a PDF → `<stem>.zip`
//! - [`rar`]: the optional libunrar decoder → `<stem>.zip`
//! - [`zip`]: rewrite of an existing ZIP to stored form, in place

pub mod dir;
pub mod pdf;
pub mod rar;
pub mod zip;

pub use dir::dir_to_zip;
pub use pdf::pdf_to_zip;
pub use rar::rar_to_zip;
pub use zip::zip_to_zip;
