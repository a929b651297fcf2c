//! Binary encode/decode of the three ZIP record kinds.
//!
//! Decoding treats a signature mismatch as "no more records of this
//! kind" (`Ok(None)`) so scan loops can walk a file front to back; a
//! structurally broken record inside a matching signature is an error.
//! Encoding validates every variable-length field against its declared
//! 16-bit width — overflow is fatal, never truncated.
//!
//! Names and comments are transcoded through the configured
//! [`Charsets`] pair: decoded from UTF-8 when the record's UTF-8 flag is
//! set (else from the source codepage), and re-encoded to the target
//! codepage on write, with the written flags word carrying the UTF-8 bit
//! exactly when the target encoding is UTF-8.

use std::io::{self, Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::charset::Charsets;
use crate::error::{Error, Result};

/// Local file header signature (`PK\x03\x04`).
pub const LOCAL_FILE_HEADER_SIGNATURE: [u8; 4] = *b"PK\x03\x04";
/// Central directory file header signature (`PK\x01\x02`).
pub const CENTRAL_FILE_HEADER_SIGNATURE: [u8; 4] = *b"PK\x01\x02";
/// End of central directory signature (`PK\x05\x06`).
pub const END_OF_CENTRAL_DIRECTORY_SIGNATURE: [u8; 4] = *b"PK\x05\x06";

/// General-purpose flag bits.
pub const FLAG_ENCRYPTED: u16 = 1 << 0;
pub const FLAG_DATA_DESCRIPTOR: u16 = 1 << 3;
pub const FLAG_UTF8: u16 = 1 << 11;

/// `version_needed_to_extract` values.
pub const VERSION_DEFAULT: u16 = 10;
pub const VERSION_DEFLATE: u16 = 20;

/// `version_made_by` platform codes (high byte).
pub const MADE_BY_MSDOS: u16 = 0 << 8;
pub const MADE_BY_WINDOWS: u16 = 10 << 8;

/// MS-DOS directory bit in the external file attributes.
pub const MSDOS_ATTRIBUTE_DIRECTORY: u32 = 0x10;

/// ZIP compression methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionMethod {
    Stored,
    Deflate,
    Unknown(u16),
}

impl CompressionMethod {
    pub fn from_u16(value: u16) -> Self {
        match value {
            0 => CompressionMethod::Stored,
            8 => CompressionMethod::Deflate,
            _ => CompressionMethod::Unknown(value),
        }
    }

    pub fn as_u16(&self) -> u16 {
        match self {
            CompressionMethod::Stored => 0,
            CompressionMethod::Deflate => 8,
            CompressionMethod::Unknown(v) => *v,
        }
    }
}

/// Local file header: the wire record preceding each entry's payload.
///
/// `file_name` holds the fully decoded in-memory text; the on-disk name
/// bytes are produced at write time from the target charset. Name and
/// extra-field lengths are derived, not stored.
#[derive(Debug, Clone)]
pub struct LocalFileHeader {
    pub version_needed: u16,
    pub flags: u16,
    pub compression_method: CompressionMethod,
    pub last_mod_time: u16,
    pub last_mod_date: u16,
    pub crc32: u32,
    pub compressed_size: u32,
    pub uncompressed_size: u32,
    pub file_name: String,
    pub extra_field: Vec<u8>,
}

impl Default for LocalFileHeader {
    fn default() -> Self {
        Self {
            version_needed: VERSION_DEFAULT,
            flags: 0,
            compression_method: CompressionMethod::Stored,
            last_mod_time: 0,
            last_mod_date: 0,
            crc32: 0,
            compressed_size: 0,
            uncompressed_size: 0,
            file_name: String::new(),
            extra_field: Vec::new(),
        }
    }
}

/// Central directory record: one per entry, mirroring its local header
/// plus the local header's offset and on-disk attributes.
#[derive(Debug, Clone, Default)]
pub struct CentralFileHeader {
    pub version_made_by: u16,
    pub version_needed: u16,
    pub flags: u16,
    pub compression_method: u16,
    pub last_mod_time: u16,
    pub last_mod_date: u16,
    pub crc32: u32,
    pub compressed_size: u32,
    pub uncompressed_size: u32,
    pub disk_number_start: u16,
    pub internal_attributes: u16,
    pub external_attributes: u32,
    pub local_header_offset: u32,
    pub file_name: String,
    pub extra_field: Vec<u8>,
    pub file_comment: String,
}

/// End of central directory: the single footer locating and sizing the
/// directory. Counts must exactly match what was written.
#[derive(Debug, Clone, Default)]
pub struct EndOfCentralDirectory {
    pub disk_number: u16,
    pub disk_with_directory: u16,
    pub disk_entries: u16,
    pub total_entries: u16,
    pub directory_size: u32,
    pub directory_offset: u32,
    pub comment: Vec<u8>,
}

/// Read a 4-byte signature, mapping clean or truncated EOF to `None`.
fn read_signature<R: Read>(reader: &mut R) -> io::Result<Option<[u8; 4]>> {
    let mut signature = [0u8; 4];
    match reader.read_exact(&mut signature) {
        Ok(()) => Ok(Some(signature)),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(None),
        Err(e) => Err(e),
    }
}

fn read_bytes<R: Read>(reader: &mut R, len: usize) -> io::Result<Vec<u8>> {
    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf)?;
    Ok(buf)
}

fn encoded_name_field(charsets: &Charsets, text: &str, what: &'static str) -> Result<Vec<u8>> {
    let bytes = charsets.encode_name(text)?;
    if bytes.len() > u16::MAX as usize {
        return Err(Error::Overflow { what, name: text.to_string() });
    }
    Ok(bytes)
}

fn output_flags(flags: u16, charsets: &Charsets) -> u16 {
    let utf8 = if charsets.target_is_utf8() { FLAG_UTF8 } else { 0 };
    (flags & !FLAG_UTF8) | utf8
}

/// Decode the local file header at the current position.
///
/// Returns `Ok(None)` when the signature does not match (the scan has
/// run past the last entry) or the stream ends at the signature. A
/// matching record with a zero-length name is malformed.
pub fn read_local_header<R: Read>(
    reader: &mut R,
    charsets: &Charsets,
    source_name: &str,
) -> Result<Option<LocalFileHeader>> {
    match read_signature(reader)? {
        Some(LOCAL_FILE_HEADER_SIGNATURE) => {}
        _ => return Ok(None),
    }

    let version_needed = reader.read_u16::<LittleEndian>()?;
    let flags = reader.read_u16::<LittleEndian>()?;
    let compression_method = reader.read_u16::<LittleEndian>()?;
    let last_mod_time = reader.read_u16::<LittleEndian>()?;
    let last_mod_date = reader.read_u16::<LittleEndian>()?;
    let crc32 = reader.read_u32::<LittleEndian>()?;
    let compressed_size = reader.read_u32::<LittleEndian>()?;
    let uncompressed_size = reader.read_u32::<LittleEndian>()?;
    let file_name_length = reader.read_u16::<LittleEndian>()?;
    let extra_field_length = reader.read_u16::<LittleEndian>()?;

    if file_name_length == 0 {
        return Err(Error::Malformed { what: "empty file name", name: source_name.to_string() });
    }
    let name_bytes = read_bytes(reader, file_name_length as usize)?;
    let extra_field = read_bytes(reader, extra_field_length as usize)?;

    Ok(Some(LocalFileHeader {
        version_needed,
        flags,
        compression_method: CompressionMethod::from_u16(compression_method),
        last_mod_time,
        last_mod_date,
        crc32,
        compressed_size,
        uncompressed_size,
        file_name: charsets.decode_name(&name_bytes, flags),
        extra_field,
    }))
}

/// Encode a local file header. The name is transcoded to the target
/// charset and the UTF-8 flag bit rewritten to match; writing the same
/// header twice produces byte-identical lengths.
pub fn write_local_header<W: Write>(
    writer: &mut W,
    header: &LocalFileHeader,
    charsets: &Charsets,
) -> Result<()> {
    let name = encoded_name_field(charsets, &header.file_name, "too long file name")?;
    if header.extra_field.len() > u16::MAX as usize {
        return Err(Error::Overflow {
            what: "invalid extra field",
            name: header.file_name.clone(),
        });
    }

    writer.write_all(&LOCAL_FILE_HEADER_SIGNATURE)?;
    writer.write_u16::<LittleEndian>(header.version_needed)?;
    writer.write_u16::<LittleEndian>(output_flags(header.flags, charsets))?;
    writer.write_u16::<LittleEndian>(header.compression_method.as_u16())?;
    writer.write_u16::<LittleEndian>(header.last_mod_time)?;
    writer.write_u16::<LittleEndian>(header.last_mod_date)?;
    writer.write_u32::<LittleEndian>(header.crc32)?;
    writer.write_u32::<LittleEndian>(header.compressed_size)?;
    writer.write_u32::<LittleEndian>(header.uncompressed_size)?;
    writer.write_u16::<LittleEndian>(name.len() as u16)?;
    writer.write_u16::<LittleEndian>(header.extra_field.len() as u16)?;
    writer.write_all(&name)?;
    writer.write_all(&header.extra_field)?;
    Ok(())
}

/// Decode a central directory record, `Ok(None)` on signature mismatch
/// (the directory has ended) or EOF.
pub fn read_central_header<R: Read>(
    reader: &mut R,
    charsets: &Charsets,
    source_name: &str,
) -> Result<Option<CentralFileHeader>> {
    match read_signature(reader)? {
        Some(CENTRAL_FILE_HEADER_SIGNATURE) => {}
        _ => return Ok(None),
    }

    let version_made_by = reader.read_u16::<LittleEndian>()?;
    let version_needed = reader.read_u16::<LittleEndian>()?;
    let flags = reader.read_u16::<LittleEndian>()?;
    let compression_method = reader.read_u16::<LittleEndian>()?;
    let last_mod_time = reader.read_u16::<LittleEndian>()?;
    let last_mod_date = reader.read_u16::<LittleEndian>()?;
    let crc32 = reader.read_u32::<LittleEndian>()?;
    let compressed_size = reader.read_u32::<LittleEndian>()?;
    let uncompressed_size = reader.read_u32::<LittleEndian>()?;
    let file_name_length = reader.read_u16::<LittleEndian>()?;
    let extra_field_length = reader.read_u16::<LittleEndian>()?;
    let file_comment_length = reader.read_u16::<LittleEndian>()?;
    let disk_number_start = reader.read_u16::<LittleEndian>()?;
    let internal_attributes = reader.read_u16::<LittleEndian>()?;
    let external_attributes = reader.read_u32::<LittleEndian>()?;
    let local_header_offset = reader.read_u32::<LittleEndian>()?;

    if file_name_length == 0 {
        return Err(Error::Malformed { what: "empty file name", name: source_name.to_string() });
    }
    let name_bytes = read_bytes(reader, file_name_length as usize)?;
    let extra_field = read_bytes(reader, extra_field_length as usize)?;
    let comment_bytes = read_bytes(reader, file_comment_length as usize)?;

    Ok(Some(CentralFileHeader {
        version_made_by,
        version_needed,
        flags,
        compression_method,
        last_mod_time,
        last_mod_date,
        crc32,
        compressed_size,
        uncompressed_size,
        disk_number_start,
        internal_attributes,
        external_attributes,
        local_header_offset,
        file_name: charsets.decode_name(&name_bytes, flags),
        extra_field,
        file_comment: charsets.decode_name(&comment_bytes, flags),
    }))
}

/// Encode a central directory record.
pub fn write_central_header<W: Write>(
    writer: &mut W,
    record: &CentralFileHeader,
    charsets: &Charsets,
) -> Result<()> {
    let name = encoded_name_field(charsets, &record.file_name, "too long file name")?;
    if record.extra_field.len() > u16::MAX as usize {
        return Err(Error::Overflow {
            what: "invalid extra field",
            name: record.file_name.clone(),
        });
    }
    let comment = encoded_name_field(charsets, &record.file_comment, "too long file comment")?;

    writer.write_all(&CENTRAL_FILE_HEADER_SIGNATURE)?;
    writer.write_u16::<LittleEndian>(record.version_made_by)?;
    writer.write_u16::<LittleEndian>(record.version_needed)?;
    writer.write_u16::<LittleEndian>(output_flags(record.flags, charsets))?;
    writer.write_u16::<LittleEndian>(record.compression_method)?;
    writer.write_u16::<LittleEndian>(record.last_mod_time)?;
    writer.write_u16::<LittleEndian>(record.last_mod_date)?;
    writer.write_u32::<LittleEndian>(record.crc32)?;
    writer.write_u32::<LittleEndian>(record.compressed_size)?;
    writer.write_u32::<LittleEndian>(record.uncompressed_size)?;
    writer.write_u16::<LittleEndian>(name.len() as u16)?;
    writer.write_u16::<LittleEndian>(record.extra_field.len() as u16)?;
    writer.write_u16::<LittleEndian>(comment.len() as u16)?;
    writer.write_u16::<LittleEndian>(record.disk_number_start)?;
    writer.write_u16::<LittleEndian>(record.internal_attributes)?;
    writer.write_u32::<LittleEndian>(record.external_attributes)?;
    writer.write_u32::<LittleEndian>(record.local_header_offset)?;
    writer.write_all(&name)?;
    writer.write_all(&record.extra_field)?;
    writer.write_all(&comment)?;
    Ok(())
}

/// Decode the end-of-central-directory record at the current position.
/// `Ok(None)` means the bytes are not an archive trailer.
pub fn read_end_of_central_directory<R: Read>(
    reader: &mut R,
) -> Result<Option<EndOfCentralDirectory>> {
    match read_signature(reader)? {
        Some(END_OF_CENTRAL_DIRECTORY_SIGNATURE) => {}
        _ => return Ok(None),
    }

    let disk_number = reader.read_u16::<LittleEndian>()?;
    let disk_with_directory = reader.read_u16::<LittleEndian>()?;
    let disk_entries = reader.read_u16::<LittleEndian>()?;
    let total_entries = reader.read_u16::<LittleEndian>()?;
    let directory_size = reader.read_u32::<LittleEndian>()?;
    let directory_offset = reader.read_u32::<LittleEndian>()?;
    let comment_length = reader.read_u16::<LittleEndian>()?;
    let comment = read_bytes(reader, comment_length as usize)?;

    Ok(Some(EndOfCentralDirectory {
        disk_number,
        disk_with_directory,
        disk_entries,
        total_entries,
        directory_size,
        directory_offset,
        comment,
    }))
}

/// Encode the end-of-central-directory record. The comment is raw bytes,
/// never transcoded.
pub fn write_end_of_central_directory<W: Write>(
    writer: &mut W,
    footer: &EndOfCentralDirectory,
    source_name: &str,
) -> Result<()> {
    if footer.comment.len() > u16::MAX as usize {
        return Err(Error::Overflow {
            what: "too long zip file comment",
            name: source_name.to_string(),
        });
    }

    writer.write_all(&END_OF_CENTRAL_DIRECTORY_SIGNATURE)?;
    writer.write_u16::<LittleEndian>(footer.disk_number)?;
    writer.write_u16::<LittleEndian>(footer.disk_with_directory)?;
    writer.write_u16::<LittleEndian>(footer.disk_entries)?;
    writer.write_u16::<LittleEndian>(footer.total_entries)?;
    writer.write_u32::<LittleEndian>(footer.directory_size)?;
    writer.write_u32::<LittleEndian>(footer.directory_offset)?;
    writer.write_u16::<LittleEndian>(footer.comment.len() as u16)?;
    writer.write_all(&footer.comment)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::charset::Charsets;
    use std::io::Cursor;

    #[test]
    fn local_header_round_trip_utf8_target() {
        let charsets = Charsets::default();
        let header = LocalFileHeader {
            version_needed: VERSION_DEFAULT,
            last_mod_time: 0x6B22,
            last_mod_date: 0x50B1,
            crc32: 0xDEADBEEF,
            compressed_size: 42,
            uncompressed_size: 42,
            file_name: "画像/001.jpg".to_string(),
            extra_field: vec![1, 2, 3],
            ..Default::default()
        };

        let mut buf = Vec::new();
        write_local_header(&mut buf, &header, &charsets).unwrap();

        let decoded = read_local_header(&mut Cursor::new(&buf), &charsets, "test")
            .unwrap()
            .unwrap();
        assert_eq!(decoded.file_name, header.file_name);
        assert_ne!(decoded.flags & FLAG_UTF8, 0);
        assert_eq!(decoded.crc32, header.crc32);
        assert_eq!(decoded.compressed_size, 42);
        assert_eq!(decoded.extra_field, vec![1, 2, 3]);
        assert_eq!(decoded.compression_method, CompressionMethod::Stored);
    }

    #[test]
    fn local_header_round_trip_legacy_target() {
        // Write with a Shift_JIS target, read back with Shift_JIS source.
        let write_charsets = Charsets::parse("utf8,cp932").unwrap();
        let read_charsets = Charsets::parse("cp932,utf8").unwrap();
        let header = LocalFileHeader {
            file_name: "テスト.txt".to_string(),
            ..Default::default()
        };

        let mut buf = Vec::new();
        write_local_header(&mut buf, &header, &write_charsets).unwrap();

        let decoded = read_local_header(&mut Cursor::new(&buf), &read_charsets, "test")
            .unwrap()
            .unwrap();
        assert_eq!(decoded.flags & FLAG_UTF8, 0);
        assert_eq!(decoded.file_name, "テスト.txt");
    }

    #[test]
    fn signature_mismatch_means_no_more_entries() {
        let charsets = Charsets::default();
        let mut cursor = Cursor::new(&b"PK\x01\x02xxxxxxxx"[..]);
        assert!(read_local_header(&mut cursor, &charsets, "test").unwrap().is_none());

        let mut empty = Cursor::new(&b""[..]);
        assert!(read_local_header(&mut empty, &charsets, "test").unwrap().is_none());
    }

    #[test]
    fn zero_length_name_is_malformed() {
        let charsets = Charsets::default();
        let mut buf = Vec::new();
        write_local_header(
            &mut buf,
            &LocalFileHeader { file_name: "x".to_string(), ..Default::default() },
            &charsets,
        )
        .unwrap();
        buf[26] = 0; // file_name_length
        buf[27] = 0;
        assert!(matches!(
            read_local_header(&mut Cursor::new(&buf), &charsets, "test"),
            Err(Error::Malformed { what: "empty file name", .. })
        ));
    }

    #[test]
    fn central_header_round_trip() {
        let charsets = Charsets::default();
        let record = CentralFileHeader {
            version_made_by: VERSION_DEFAULT | MADE_BY_MSDOS,
            version_needed: VERSION_DEFAULT,
            crc32: 0x12345678,
            compressed_size: 10,
            uncompressed_size: 10,
            external_attributes: MSDOS_ATTRIBUTE_DIRECTORY,
            local_header_offset: 0x80,
            file_name: "dir/".to_string(),
            ..Default::default()
        };

        let mut buf = Vec::new();
        write_central_header(&mut buf, &record, &charsets).unwrap();

        let decoded = read_central_header(&mut Cursor::new(&buf), &charsets, "test")
            .unwrap()
            .unwrap();
        assert_eq!(decoded.file_name, "dir/");
        assert_eq!(decoded.external_attributes, MSDOS_ATTRIBUTE_DIRECTORY);
        assert_eq!(decoded.local_header_offset, 0x80);
    }

    #[test]
    fn end_of_central_directory_round_trip() {
        let footer = EndOfCentralDirectory {
            total_entries: 3,
            disk_entries: 3,
            directory_size: 150,
            directory_offset: 4096,
            ..Default::default()
        };

        let mut buf = Vec::new();
        write_end_of_central_directory(&mut buf, &footer, "test").unwrap();
        assert_eq!(buf.len(), 22);

        let decoded = read_end_of_central_directory(&mut Cursor::new(&buf)).unwrap().unwrap();
        assert_eq!(decoded.total_entries, 3);
        assert_eq!(decoded.directory_size, 150);
        assert_eq!(decoded.directory_offset, 4096);

        let mut not_zip = Cursor::new(&b"this is not a zip trailer"[..]);
        assert!(read_end_of_central_directory(&mut not_zip).unwrap().is_none());
    }
}
