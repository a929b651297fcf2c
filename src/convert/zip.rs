//! ZIP → ZIP rewriting.
//!
//! Reads an existing archive front to back, inflates any deflated
//! payloads, and writes a fresh stored-only archive next to it. The
//! original is moved to the trash (or renamed with a `~` suffix) and
//! the rewrite takes its place, keeping the original's modification
//! time. Entries are re-sorted into natural order, names transcoded
//! between the configured charsets, and directory attributes carried
//! over from the central directory when the recording system used
//! MS-DOS style attributes.

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::Path;

use filetime::FileTime;
use flate2::read::DeflateDecoder;

use crate::error::{display_name, Error, Result};
use crate::natcmp::natural_casecmp;
use crate::options::Options;
use crate::progress::Progress;
use crate::rename::{extension_of, sequential_name};
use crate::trash;
use crate::zip::records::{
    self, CompressionMethod, LocalFileHeader, FLAG_DATA_DESCRIPTOR, FLAG_ENCRYPTED, MADE_BY_MSDOS,
    MADE_BY_WINDOWS, MSDOS_ATTRIBUTE_DIRECTORY,
};
use crate::zip::ZipWriter;

/// One source entry: its decoded local header, the payload offset, and
/// the external attributes recovered from the central directory.
struct SourceEntry {
    header: LocalFileHeader,
    attributes: u32,
    offset: u64,
}

pub fn zip_to_zip(path: &Path, opts: &Options) -> Result<()> {
    let filename = display_name(path);
    let metadata = fs::metadata(path)?;
    let filesize = metadata.len();
    let mtime = metadata.modified()?;
    let progress = Progress::new(opts.quiet);

    let mut input = BufReader::new(File::open(path)?);
    let mut entries = scan(&mut input, filesize, opts, &filename, &progress)?;
    progress.end_count();
    if entries.is_empty() {
        return Ok(());
    }

    read_attributes(&mut input, &mut entries, opts, &filename)?;

    entries.retain(|entry| !opts.is_excluded(&entry.header.file_name));
    entries.sort_by(|a, b| natural_casecmp(&a.header.file_name, &b.header.file_name));
    if opts.rename {
        entries.retain(|entry| entry.attributes & MSDOS_ATTRIBUTE_DIRECTORY == 0);
        for (index, entry) in entries.iter_mut().enumerate() {
            let extension = extension_of(&entry.header.file_name).to_string();
            entry.header.file_name = sequential_name(1 + index, &extension);
        }
    }

    let tmp_path = path.with_extension("tmp");
    let out = BufWriter::new(File::create(&tmp_path)?);
    let mut writer = ZipWriter::new(out, opts.charsets, filename.clone());

    for entry in &entries {
        input.seek(SeekFrom::Start(entry.offset))?;
        copy_entry(&mut input, &mut writer, entry, &filename)?;
        progress.count(writer.entry_count(), "written");
    }
    progress.end_count();

    drop(writer.finish()?);
    drop(input);
    progress.note("footer written");

    trash::trash(path)?;
    progress.note("trashed");
    fs::rename(&tmp_path, path)?;
    progress.note("renamed");

    filetime::set_file_mtime(path, FileTime::from_system_time(mtime))?;
    Ok(())
}

/// Walk the local headers from the front of the file, recording each
/// payload offset. Stops cleanly at the first non-local signature or at
/// a header whose payload would run past the end of the file.
fn scan(
    input: &mut (impl Read + Seek),
    filesize: u64,
    opts: &Options,
    source_name: &str,
    progress: &Progress,
) -> Result<Vec<SourceEntry>> {
    let mut entries = Vec::new();
    while let Some(header) = records::read_local_header(input, &opts.charsets, source_name)? {
        if header.flags & FLAG_ENCRYPTED != 0 {
            return Err(Error::Unsupported {
                what: "encryption not supported",
                name: source_name.to_string(),
            });
        }
        if header.flags & FLAG_DATA_DESCRIPTOR != 0 {
            return Err(Error::Unsupported {
                what: "data descriptor not supported",
                name: source_name.to_string(),
            });
        }

        let offset = input.stream_position()?;
        if offset + header.compressed_size as u64 > filesize {
            break;
        }
        input.seek(SeekFrom::Current(header.compressed_size as i64))?;

        entries.push(SourceEntry { header, attributes: 0, offset });
        if entries.len() > u16::MAX as usize {
            return Err(Error::Overflow {
                what: "too many entries",
                name: source_name.to_string(),
            });
        }
        progress.count(entries.len(), "read");
    }
    Ok(entries)
}

/// Pick up external attributes from the central directory, which starts
/// right after the last payload. Only MS-DOS style attribute encodings
/// are trusted; anything else stays zero.
fn read_attributes(
    input: &mut (impl Read + Seek),
    entries: &mut [SourceEntry],
    opts: &Options,
    source_name: &str,
) -> Result<()> {
    let last = match entries.last() {
        Some(entry) => entry,
        None => return Ok(()),
    };
    input.seek(SeekFrom::Start(last.offset + last.header.compressed_size as u64))?;

    for entry in entries.iter_mut() {
        let record = match records::read_central_header(input, &opts.charsets, source_name)? {
            Some(record) => record,
            None => break,
        };
        let made_by = record.version_made_by & 0xff00;
        if made_by == MADE_BY_MSDOS || made_by == MADE_BY_WINDOWS {
            entry.attributes = record.external_attributes;
        }
    }
    Ok(())
}

/// Re-emit one entry as stored, inflating the payload if it was
/// deflated.
fn copy_entry<W: Write + Seek>(
    input: &mut (impl Read + Seek),
    writer: &mut ZipWriter<W>,
    entry: &SourceEntry,
    source_name: &str,
) -> Result<()> {
    let mut header = entry.header.clone();
    match header.compression_method {
        CompressionMethod::Stored => {
            let mut out = writer.begin_entry(header, entry.attributes)?;
            io::copy(&mut input.take(entry.header.compressed_size as u64), &mut out)?;
            out.finish()
        }
        CompressionMethod::Deflate => {
            let mut data = vec![0u8; header.uncompressed_size as usize];
            let mut decoder = DeflateDecoder::new(input.take(entry.header.compressed_size as u64));
            decoder.read_exact(&mut data).map_err(|_| Error::Malformed {
                what: "failed to read",
                name: source_name.to_string(),
            })?;

            header.compression_method = CompressionMethod::Stored;
            header.compressed_size = header.uncompressed_size;
            let mut out = writer.begin_entry(header, entry.attributes)?;
            out.write_all(&data)?;
            out.finish()
        }
        CompressionMethod::Unknown(_) => Err(Error::Unsupported {
            what: "compression not supported",
            name: source_name.to_string(),
        }),
    }
}
