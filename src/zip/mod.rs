//! ZIP container codec and the streaming archive-build protocol.
//!
//! ## Archive layout
//!
//! A ZIP file is a sequence of (local file header + payload) pairs,
//! followed by a contiguous central directory mirroring every header,
//! followed by a single end-of-central-directory footer locating the
//! directory. All fields are little-endian; this implementation writes
//! the classic 32-bit layout only (no ZIP64, no spanning).
//!
//! ## Module layout
//!
//! - [`records`]: binary encode/decode of the three record kinds, with
//!   charset-aware name transcoding and field-width validation
//! - [`writer`]: the streaming append protocol — provisional header,
//!   CRC-32 accumulated while the payload streams, seek-back patch,
//!   buffered central directory, footer
//!
//! Output is always stored (method 0); deflate appears only on the read
//! side, where the rewriter inflates it back to stored form.

pub mod records;
pub mod writer;

pub use records::{CentralFileHeader, CompressionMethod, EndOfCentralDirectory, LocalFileHeader};
pub use writer::{EntryWriter, ZipWriter};
