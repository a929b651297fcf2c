//! PDF → ZIP conversion.
//!
//! Extracts embedded JPEG image streams without a general PDF parser.
//! The document structure is tail-anchored: the last `%%EOF` marker,
//! the nearest preceding `startxref` pointing at a classic (non-stream)
//! cross-reference table, the `xref` keyword, the subsection header and
//! its fixed-count entries, terminated by the `trailer` keyword. In-use
//! objects are ordered by file offset to compute byte spans, then by
//! object number for deterministic output naming. A span is emitted
//! only when its dictionary text names the `/DCTDecode` (JPEG) filter;
//! other stream filters are skipped entirely.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::ops::Range;
use std::path::Path;

use filetime::FileTime;

use crate::dostime;
use crate::error::{display_name, Error, Result};
use crate::options::Options;
use crate::progress::Progress;
use crate::rename::sequential_name;
use crate::zip::records::LocalFileHeader;
use crate::zip::ZipWriter;

/// First four bytes of a PDF document (`%PDF`).
pub const PDF_SIGNATURE: [u8; 4] = *b"%PDF";

pub fn pdf_to_zip(path: &Path, opts: &Options) -> Result<()> {
    let filename = display_name(path);
    let mtime = fs::metadata(path)?.modified()?;
    let progress = Progress::new(opts.quiet);

    let pdf = fs::read(path)?;
    let streams = image_streams(&pdf, &filename)?;
    progress.count(streams.len(), "found");
    progress.end_count();

    let zip_path = path.with_extension("zip");
    let out = BufWriter::new(File::create(&zip_path)?);
    let mut writer = ZipWriter::new(out, opts.charsets, filename.clone());
    let (last_mod_date, last_mod_time) = dostime::to_dos_date_time(mtime);

    for (index, span) in streams.iter().enumerate() {
        let data = &pdf[span.clone()];
        if data.len() > u32::MAX as usize {
            return Err(Error::Overflow {
                what: "large file not supported",
                name: filename.clone(),
            });
        }

        let header = LocalFileHeader {
            last_mod_time,
            last_mod_date,
            crc32: crc32fast::hash(data),
            compressed_size: data.len() as u32,
            uncompressed_size: data.len() as u32,
            file_name: sequential_name(1 + index, ".jpg"),
            ..Default::default()
        };
        let mut entry = writer.begin_entry(header, 0)?;
        entry.write_all(data)?;
        entry.finish()?;

        progress.count(writer.entry_count(), "written");
    }
    progress.end_count();

    drop(writer.finish()?);
    progress.note("footer written");

    filetime::set_file_mtime(&zip_path, FileTime::from_system_time(mtime))?;
    Ok(())
}

struct IndirectObject {
    number: usize,
    span: Range<usize>,
}

/// Locate every JPEG stream span in the document, ordered by object
/// number.
fn image_streams(pdf: &[u8], source_name: &str) -> Result<Vec<Range<usize>>> {
    let malformed = |what| Error::Malformed { what, name: source_name.to_string() };

    let eof = rfind(pdf, b"%%EOF").ok_or_else(|| malformed("%%EOF not found"))?;
    let startxref =
        rfind(&pdf[..eof], b"startxref").ok_or_else(|| malformed("startxref not found"))?;
    let xref = tokens(&pdf[startxref + 9..eof])
        .next()
        .and_then(parse_usize)
        .ok_or_else(|| malformed("invalid startxref"))?;
    if xref == 0 || pdf.len() < xref + 4 || &pdf[xref..xref + 4] != b"xref" {
        return Err(malformed("invalid startxref"));
    }
    let trailer = find(&pdf[xref + 4..], b"trailer")
        .map(|i| xref + 4 + i)
        .ok_or_else(|| malformed("trailer not found"))?;

    // Subsection header, then `count` (offset, generation, flag)
    // triples; free entries are discarded.
    let mut table = tokens(&pdf[xref + 4..trailer]);
    let first_number =
        table.next().and_then(parse_usize).ok_or_else(|| malformed("invalid xref table"))?;
    let count =
        table.next().and_then(parse_usize).ok_or_else(|| malformed("invalid xref table"))?;

    let mut objects = Vec::new();
    for i in 0..count {
        let offset =
            table.next().and_then(parse_usize).ok_or_else(|| malformed("invalid xref table"))?;
        let _generation =
            table.next().and_then(parse_usize).ok_or_else(|| malformed("invalid xref table"))?;
        let flag = table.next().ok_or_else(|| malformed("invalid xref table"))?;
        if flag == b"f" {
            continue;
        }
        objects.push(IndirectObject { number: first_number + i, span: offset..0 });
    }
    if objects.is_empty() {
        return Err(malformed("no object found"));
    }

    // Each object runs to the next object's offset; the last one runs
    // to the xref table anchor.
    objects.sort_by_key(|object| object.span.start);
    for i in 1..objects.len() {
        objects[i - 1].span.end = objects[i].span.start;
    }
    if let Some(last) = objects.last_mut() {
        last.span.end = startxref;
    }
    objects.sort_by_key(|object| object.number);

    let mut streams = Vec::new();
    for object in &objects {
        if object.span.end > pdf.len() || object.span.start > object.span.end {
            return Err(malformed("invalid xref table"));
        }
        let body = &pdf[object.span.clone()];

        let Some(keyword) = find(body, b"stream") else {
            continue;
        };
        // One line terminator follows the keyword (CRLF or LF).
        let mut start = keyword + 6;
        if body.get(start) == Some(&b'\r') {
            start += 1;
        }
        if body.get(start) == Some(&b'\n') {
            start += 1;
        }
        let Some(end_keyword) = rfind(body, b"endstream") else {
            continue;
        };
        if end_keyword <= start {
            continue;
        }
        let mut end = end_keyword;
        while end > start && is_line_terminator(body[end - 1]) {
            end -= 1;
        }

        // The dictionary text preceding the payload decides the filter.
        let dictionary = &body[..keyword];
        if find(dictionary, b"/DCTDecode").is_some() {
            streams.push(object.span.start + start..object.span.start + end);
        }
    }
    Ok(streams)
}

fn is_line_terminator(byte: u8) -> bool {
    byte == b'\r' || byte == b'\n'
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|window| window == needle)
}

fn rfind(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).rposition(|window| window == needle)
}

fn tokens(data: &[u8]) -> impl Iterator<Item = &[u8]> {
    data.split(|byte| byte.is_ascii_whitespace()).filter(|token| !token.is_empty())
}

fn parse_usize(token: &[u8]) -> Option<usize> {
    std::str::from_utf8(token).ok()?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Assemble a consistent single-revision PDF from object bodies.
    fn build_pdf(objects: &[&[u8]]) -> Vec<u8> {
        let mut pdf = b"%PDF-1.4\n".to_vec();
        let mut offsets = Vec::new();
        for body in objects {
            offsets.push(pdf.len());
            pdf.extend_from_slice(body);
        }
        let xref = pdf.len();
        pdf.extend_from_slice(format!("xref\n0 {}\n", 1 + objects.len()).as_bytes());
        pdf.extend_from_slice(b"0000000000 65535 f \n");
        for offset in &offsets {
            pdf.extend_from_slice(format!("{offset:010} 00000 n \n").as_bytes());
        }
        pdf.extend_from_slice(b"trailer\n<< /Size 2 >>\n");
        pdf.extend_from_slice(format!("startxref\n{xref}\n%%EOF\n").as_bytes());
        pdf
    }

    #[test]
    fn finds_a_dct_stream_trimmed_of_framing() {
        let pdf = build_pdf(&[
            b"1 0 obj\n<< /Filter /DCTDecode /Length 9 >>\nstream\r\nJPEG BODY\r\nendstream\nendobj\n",
        ]);
        let streams = image_streams(&pdf, "test.pdf").unwrap();
        assert_eq!(streams.len(), 1);
        assert_eq!(&pdf[streams[0].clone()], b"JPEG BODY");
    }

    #[test]
    fn non_jpeg_streams_and_plain_objects_are_skipped() {
        let pdf = build_pdf(&[
            b"1 0 obj\n<< /Type /Catalog >>\nendobj\n",
            b"2 0 obj\n<< /Filter /FlateDecode /Length 4 >>\nstream\nzzzz\nendstream\nendobj\n",
            b"3 0 obj\n<< /Filter /DCTDecode /Length 3 >>\nstream\nJPG\nendstream\nendobj\n",
        ]);
        let streams = image_streams(&pdf, "test.pdf").unwrap();
        assert_eq!(streams.len(), 1);
        assert_eq!(&pdf[streams[0].clone()], b"JPG");
    }

    #[test]
    fn free_entries_are_discarded() {
        // Only the free object-zero entry: nothing in use.
        let mut pdf = b"%PDF-1.4\n".to_vec();
        let xref = pdf.len();
        pdf.extend_from_slice(b"xref\n0 1\n0000000000 65535 f \n");
        pdf.extend_from_slice(b"trailer\n<< /Size 1 >>\n");
        pdf.extend_from_slice(format!("startxref\n{xref}\n%%EOF\n").as_bytes());

        assert!(matches!(
            image_streams(&pdf, "test.pdf"),
            Err(Error::Malformed { what: "no object found", .. })
        ));
    }

    #[test]
    fn missing_anchors_are_malformed() {
        assert!(matches!(
            image_streams(b"not a pdf at all", "x"),
            Err(Error::Malformed { what: "%%EOF not found", .. })
        ));
        assert!(matches!(
            image_streams(b"%PDF-1.4\n%%EOF\n", "x"),
            Err(Error::Malformed { what: "startxref not found", .. })
        ));
        assert!(matches!(
            image_streams(b"%PDF-1.4\nstartxref\n0\n%%EOF\n", "x"),
            Err(Error::Malformed { what: "invalid startxref", .. })
        ));
    }
}
