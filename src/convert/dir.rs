//! Directory → ZIP conversion.
//!
//! Recursively collects regular files under the root (directories are
//! never emitted as entries), sorts them with the case-insensitive
//! natural order, and stores each one uncompressed. Relative entry
//! names use forward slashes regardless of the host separator. The
//! output archive lands beside the input as `<dir>.zip` and inherits
//! the directory's modification time.

use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};

use filetime::FileTime;

use crate::dostime;
use crate::error::{display_name, Error, Result};
use crate::natcmp::natural_casecmp;
use crate::options::Options;
use crate::progress::Progress;
use crate::zip::records::LocalFileHeader;
use crate::zip::ZipWriter;

pub fn dir_to_zip(path: &Path, opts: &Options) -> Result<()> {
    let dirname = display_name(path);
    let dir_mtime = fs::metadata(path)?.modified()?;
    let progress = Progress::new(opts.quiet);

    let mut files = Vec::new();
    enumerate_files(path, &mut files)?;
    files.sort_by(|a, b| natural_casecmp(&a.to_string_lossy(), &b.to_string_lossy()));

    let zip_path = sibling_zip_path(path);
    let out = BufWriter::new(File::create(&zip_path)?);
    let mut writer = ZipWriter::new(out, opts.charsets, dirname.clone());

    for file in &files {
        let relative_name = relative_entry_name(file, path);
        if opts.is_excluded(&relative_name) {
            continue;
        }

        let metadata = fs::metadata(file)?;
        let size = metadata.len();
        if size > u64::from(u32::MAX) {
            return Err(Error::Overflow {
                what: "large file not supported",
                name: display_name(file),
            });
        }
        let (last_mod_date, last_mod_time) = dostime::to_dos_date_time(metadata.modified()?);

        let header = LocalFileHeader {
            last_mod_time,
            last_mod_date,
            compressed_size: size as u32,
            uncompressed_size: size as u32,
            file_name: relative_name,
            ..Default::default()
        };
        let mut entry = writer.begin_entry(header, 0)?;
        io::copy(&mut File::open(file)?, &mut entry)?;
        entry.finish()?;

        progress.count(writer.entry_count(), "written");
    }
    progress.end_count();

    drop(writer.finish()?);
    progress.note("footer written");

    filetime::set_file_mtime(&zip_path, FileTime::from_system_time(dir_mtime))?;
    Ok(())
}

/// Depth-first walk collecting regular files only.
fn enumerate_files(dir: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            enumerate_files(&entry.path(), files)?;
        } else if file_type.is_file() {
            files.push(entry.path());
        }
    }
    Ok(())
}

/// `<parent>/<dirname>.zip` — the extension is appended, not replaced,
/// so `photos.2024` becomes `photos.2024.zip`.
fn sibling_zip_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.file_name().unwrap_or(path.as_os_str()));
    name.push(".zip");
    match path.parent() {
        Some(parent) => parent.join(&name),
        None => name.into(),
    }
}

fn relative_entry_name(file: &Path, root: &Path) -> String {
    let relative = file.strip_prefix(root).unwrap_or(file);
    let name = relative.to_string_lossy();
    if std::path::MAIN_SEPARATOR == '\\' {
        name.replace('\\', "/")
    } else {
        name.into_owned()
    }
}
