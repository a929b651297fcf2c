//! Streaming archive-build protocol.
//!
//! Every producer appends entries the same way: record the current
//! position, write a provisional local header, stream the payload while
//! a CRC-32 accumulator sees every byte, then seek back and rewrite the
//! header in place with the final CRC and sizes before returning to the
//! end of the payload. The payload itself is written exactly once; only
//! the header is rewritten, and both writes have identical byte length.
//!
//! Once all entries are appended, [`ZipWriter::finish`] writes the
//! buffered central directory in append order and the footer, validating
//! every 16/32-bit field along the way. Any failure aborts the archive;
//! whatever was already written stays on disk for the caller to clean
//! up (the rewriter uses a temp-file + rename pattern for this reason).

use std::io::{self, Seek, SeekFrom, Write};

use crate::charset::Charsets;
use crate::error::{fit_u32, Error, Result};

use super::records::{
    self, CentralFileHeader, EndOfCentralDirectory, LocalFileHeader, MADE_BY_MSDOS,
};

/// Writes one ZIP archive to a seekable sink.
pub struct ZipWriter<W: Write + Seek> {
    out: W,
    charsets: Charsets,
    source_name: String,
    records: Vec<CentralFileHeader>,
}

impl<W: Write + Seek> ZipWriter<W> {
    /// `source_name` identifies the input being converted in error
    /// messages.
    pub fn new(out: W, charsets: Charsets, source_name: impl Into<String>) -> Self {
        Self { out, charsets, source_name: source_name.into(), records: Vec::new() }
    }

    /// Entries appended so far.
    pub fn entry_count(&self) -> usize {
        self.records.len()
    }

    /// Start one entry: validate the 32-bit offset capacity, write the
    /// provisional header, and hand back the payload sink. The returned
    /// [`EntryWriter`] must be [`finish`](EntryWriter::finish)ed before
    /// the next entry begins.
    pub fn begin_entry(
        &mut self,
        header: LocalFileHeader,
        external_attributes: u32,
    ) -> Result<EntryWriter<'_, W>> {
        let offset = self.out.stream_position()?;
        let offset = fit_u32(offset, "large file not supported", &self.source_name)?;

        records::write_local_header(&mut self.out, &header, &self.charsets)?;

        Ok(EntryWriter {
            writer: self,
            header,
            external_attributes,
            offset,
            hasher: crc32fast::Hasher::new(),
            written: 0,
        })
    }

    /// Write the central directory and footer, flush, and hand back the
    /// sink (so callers can close it before renaming or touching
    /// timestamps).
    pub fn finish(mut self) -> Result<W> {
        let directory_offset = self.out.stream_position()?;
        let directory_offset =
            fit_u32(directory_offset, "large file not supported", &self.source_name)?;

        for record in &self.records {
            records::write_central_header(&mut self.out, record, &self.charsets)?;
        }

        let directory_end = self.out.stream_position()?;
        let directory_size = fit_u32(
            directory_end - u64::from(directory_offset),
            "large file not supported",
            &self.source_name,
        )?;

        // The 16-bit count capacity was enforced as entries were
        // appended.
        let total_entries = self.records.len() as u16;
        let footer = EndOfCentralDirectory {
            disk_entries: total_entries,
            total_entries,
            directory_size,
            directory_offset,
            ..Default::default()
        };
        records::write_end_of_central_directory(&mut self.out, &footer, &self.source_name)?;

        self.out.flush()?;
        Ok(self.out)
    }
}

/// Payload sink for one in-flight entry.
///
/// Implements [`io::Write`]; every chunk goes straight to the output
/// while the CRC-32 accumulator and byte count track it. Dropping an
/// `EntryWriter` without calling [`finish`](Self::finish) leaves the
/// provisional header (CRC and sizes unpatched) in the output — callers
/// abort the whole archive on error, so no cleanup happens here.
pub struct EntryWriter<'a, W: Write + Seek> {
    writer: &'a mut ZipWriter<W>,
    header: LocalFileHeader,
    external_attributes: u32,
    offset: u32,
    hasher: crc32fast::Hasher,
    written: u64,
}

impl<W: Write + Seek> io::Write for EntryWriter<'_, W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.writer.out.write(buf)?;
        self.hasher.update(&buf[..n]);
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.out.flush()
    }
}

impl<W: Write + Seek> EntryWriter<'_, W> {
    /// Seal the entry: patch the local header in place with the final
    /// CRC-32 and sizes, and append the mirroring central directory
    /// record.
    pub fn finish(self) -> Result<()> {
        let EntryWriter { writer, mut header, external_attributes, offset, hasher, written } =
            self;

        header.crc32 = hasher.finalize();
        let size = fit_u32(written, "large file not supported", &writer.source_name)?;
        header.compressed_size = size;
        header.uncompressed_size = size;

        let next_offset = writer.out.stream_position()?;
        writer.out.seek(SeekFrom::Start(u64::from(offset)))?;
        records::write_local_header(&mut writer.out, &header, &writer.charsets)?;
        writer.out.seek(SeekFrom::Start(next_offset))?;

        writer.records.push(CentralFileHeader {
            version_made_by: header.version_needed | MADE_BY_MSDOS,
            version_needed: header.version_needed,
            flags: header.flags,
            compression_method: header.compression_method.as_u16(),
            last_mod_time: header.last_mod_time,
            last_mod_date: header.last_mod_date,
            crc32: header.crc32,
            compressed_size: header.compressed_size,
            uncompressed_size: header.uncompressed_size,
            external_attributes,
            local_header_offset: offset,
            file_name: header.file_name,
            extra_field: header.extra_field,
            ..Default::default()
        });
        if writer.records.len() > u16::MAX as usize {
            return Err(Error::Overflow {
                what: "too many entries",
                name: writer.source_name.clone(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::charset::Charsets;
    use crate::zip::records::{
        read_central_header, read_end_of_central_directory, read_local_header, CompressionMethod,
    };
    use std::io::{Cursor, Read, Seek, SeekFrom, Write};

    fn write_archive(payloads: &[(&str, &[u8])]) -> Vec<u8> {
        let mut writer =
            ZipWriter::new(Cursor::new(Vec::new()), Charsets::default(), "test");
        for (name, bytes) in payloads {
            let header = LocalFileHeader {
                file_name: name.to_string(),
                compressed_size: bytes.len() as u32,
                uncompressed_size: bytes.len() as u32,
                ..Default::default()
            };
            let mut entry = writer.begin_entry(header, 0).unwrap();
            entry.write_all(bytes).unwrap();
            entry.finish().unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn empty_archive_is_a_bare_footer() {
        let bytes = write_archive(&[]);
        assert_eq!(bytes.len(), 22);

        let footer =
            read_end_of_central_directory(&mut Cursor::new(&bytes)).unwrap().unwrap();
        assert_eq!(footer.total_entries, 0);
        assert_eq!(footer.directory_size, 0);
        assert_eq!(footer.directory_offset, 0);
    }

    #[test]
    fn written_entries_round_trip() {
        let charsets = Charsets::default();
        let payloads: &[(&str, &[u8])] =
            &[("a.txt", b"hello"), ("b/b.bin", b""), ("c.dat", b"payload bytes")];
        let bytes = write_archive(payloads);
        let mut cursor = Cursor::new(&bytes);

        // Walk the local headers and payloads front to back.
        for (name, data) in payloads {
            let header = read_local_header(&mut cursor, &charsets, "test").unwrap().unwrap();
            assert_eq!(header.file_name, *name);
            assert_eq!(header.compression_method, CompressionMethod::Stored);
            assert_eq!(header.uncompressed_size as usize, data.len());
            assert_eq!(header.crc32, crc32fast::hash(data));

            let mut payload = vec![0u8; data.len()];
            cursor.read_exact(&mut payload).unwrap();
            assert_eq!(&payload, data);
        }
        let directory_offset = cursor.position();

        // The central directory mirrors every header, in append order.
        for (name, data) in payloads {
            let record = read_central_header(&mut cursor, &charsets, "test").unwrap().unwrap();
            assert_eq!(record.file_name, *name);
            assert_eq!(record.crc32, crc32fast::hash(data));
            assert_eq!(record.uncompressed_size as usize, data.len());
        }
        let directory_size = cursor.position() - directory_offset;

        let footer = read_end_of_central_directory(&mut cursor).unwrap().unwrap();
        assert_eq!(footer.total_entries as usize, payloads.len());
        assert_eq!(u64::from(footer.directory_size), directory_size);
        assert_eq!(u64::from(footer.directory_offset), directory_offset);
        assert_eq!(cursor.position() as usize, bytes.len());
    }

    #[test]
    fn central_record_offsets_locate_their_headers() {
        let charsets = Charsets::default();
        let bytes = write_archive(&[("one", b"1"), ("two", b"22")]);
        let mut cursor = Cursor::new(&bytes);

        let footer = {
            cursor.seek(SeekFrom::Start(bytes.len() as u64 - 22)).unwrap();
            read_end_of_central_directory(&mut cursor).unwrap().unwrap()
        };
        cursor.seek(SeekFrom::Start(u64::from(footer.directory_offset))).unwrap();

        for _ in 0..footer.total_entries {
            let record = read_central_header(&mut cursor, &charsets, "test").unwrap().unwrap();
            let next = cursor.position();

            cursor.seek(SeekFrom::Start(u64::from(record.local_header_offset))).unwrap();
            let header = read_local_header(&mut cursor, &charsets, "test").unwrap().unwrap();
            assert_eq!(header.file_name, record.file_name);
            assert_eq!(header.crc32, record.crc32);

            cursor.seek(SeekFrom::Start(next)).unwrap();
        }
    }
}
