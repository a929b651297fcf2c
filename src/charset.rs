//! Charset negotiation for filename and comment fields.
//!
//! A record's text fields are stored either as UTF-8 (when the UTF-8
//! general-purpose flag is set) or in an unspecified legacy codepage.
//! The converter is configured with a `(source, target)` pair: names are
//! decoded from the archive's stated charset and re-encoded to the
//! target on write. There is no process-wide charset state; the pair is
//! threaded through every encode/decode call.

use std::borrow::Cow;

use encoding_rs::{Encoding, SHIFT_JIS, UTF_8};

use crate::error::{Error, Result};
use crate::zip::records::FLAG_UTF8;

/// The `(source, target)` codepage pair.
#[derive(Clone, Copy, Debug)]
pub struct Charsets {
    pub source: &'static Encoding,
    pub target: &'static Encoding,
}

impl Default for Charsets {
    /// The historical default: read Shift_JIS names, write UTF-8.
    fn default() -> Self {
        Self { source: SHIFT_JIS, target: UTF_8 }
    }
}

impl Charsets {
    /// Parse an `IN,OUT` specification; a bare `IN` means both sides.
    pub fn parse(spec: &str) -> Result<Self> {
        let (source, target) = match spec.split_once(',') {
            Some((source, target)) => (source, target),
            None => (spec, spec),
        };
        Ok(Self { source: lookup(source)?, target: lookup(target)? })
    }

    /// Whether encoded names carry the UTF-8 flag.
    pub fn target_is_utf8(&self) -> bool {
        self.target == UTF_8
    }

    /// Decode a raw name or comment, honoring the record's UTF-8 flag.
    /// Undecodable sequences become replacement characters.
    pub fn decode_name(&self, bytes: &[u8], flags: u16) -> String {
        let encoding = if flags & FLAG_UTF8 != 0 { UTF_8 } else { self.source };
        encoding.decode(bytes).0.into_owned()
    }

    /// Encode a name or comment to the target codepage. Characters the
    /// target cannot represent are an error, never replaced.
    pub fn encode_name(&self, text: &str) -> Result<Vec<u8>> {
        if self.target_is_utf8() {
            return Ok(text.as_bytes().to_vec());
        }
        let (bytes, _, had_errors) = self.target.encode(text);
        if had_errors {
            return Err(Error::Unsupported {
                what: "unencodable file name",
                name: text.to_string(),
            });
        }
        Ok(match bytes {
            Cow::Borrowed(b) => b.to_vec(),
            Cow::Owned(b) => b,
        })
    }
}

fn lookup(label: &str) -> Result<&'static Encoding> {
    let label = label.trim();
    // "cp932" predates the WHATWG label set but is the name this tool
    // has always accepted for Windows Shift_JIS.
    if label.eq_ignore_ascii_case("cp932") || label == "932" {
        return Ok(SHIFT_JIS);
    }
    Encoding::for_label(label.as_bytes()).ok_or(Error::Unsupported {
        what: "unsupported charset",
        name: label.to_string(),
    })
}
