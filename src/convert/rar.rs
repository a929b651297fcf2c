//! RAR → ZIP conversion via a dynamically bound `libunrar`.
//!
//! The decoder library is optional at run time: it is resolved with
//! [`libloading`] when a RAR input is first seen, and its absence is a
//! clean [`Error::DecoderUnavailable`] rather than a link-time
//! requirement. Entry payloads are received through the unrar data
//! callback and streamed straight into the archive writer; nothing is
//! extracted to disk.

use std::ffi::{c_char, c_int, c_uint, c_void, CStr, CString};
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::ptr;
use std::slice;

use filetime::FileTime;
use libloading::Library;

use crate::error::{display_name, Error, Result};
use crate::options::Options;
use crate::progress::Progress;
use crate::zip::records::LocalFileHeader;
use crate::zip::ZipWriter;

/// First four bytes of a RAR archive (`Rar!`).
pub const RAR_SIGNATURE: [u8; 4] = *b"Rar!";

const ERAR_SUCCESS: c_int = 0;

const RAR_OM_EXTRACT: c_uint = 1;

const RAR_SKIP: c_int = 0;
const RAR_TEST: c_int = 1;

const UCM_PROCESSDATA: c_uint = 1;

const RHDF_ENCRYPTED: c_uint = 0x04;
const RHDF_DIRECTORY: c_uint = 0x20;

#[cfg(windows)]
type WideChar = u16;
#[cfg(not(windows))]
type WideChar = u32;

type Handle = *mut c_void;

type Callback = unsafe extern "system" fn(msg: c_uint, user_data: isize, p1: isize, p2: isize) -> c_int;

/// Mirrors `RAROpenArchiveDataEx` from unrar's dll.hpp (byte-packed,
/// classic pointer-width-independent tail).
#[repr(C, packed)]
struct OpenArchiveData {
    arc_name: *const c_char,
    arc_name_w: *const WideChar,
    open_mode: c_uint,
    open_result: c_uint,
    comment_buffer: *mut c_char,
    comment_buffer_size: c_uint,
    comment_size: c_uint,
    comment_state: c_uint,
    flags: c_uint,
    callback: Option<Callback>,
    user_data: isize,
    reserved: [c_uint; 28],
}

/// Mirrors `RARHeaderDataEx` from unrar's dll.hpp. `RARReadHeaderEx`
/// clears the reserved tail to the library's own declared size, so the
/// tail must be full-sized or the call scribbles past the struct.
#[repr(C, packed)]
struct HeaderData {
    arc_name: [c_char; 1024],
    arc_name_w: [WideChar; 1024],
    file_name: [c_char; 1024],
    file_name_w: [WideChar; 1024],
    flags: c_uint,
    pack_size: c_uint,
    pack_size_high: c_uint,
    unp_size: c_uint,
    unp_size_high: c_uint,
    host_os: c_uint,
    file_crc: c_uint,
    file_time: c_uint,
    unp_ver: c_uint,
    method: c_uint,
    file_attr: c_uint,
    comment_buffer: *mut c_char,
    comment_buffer_size: c_uint,
    comment_size: c_uint,
    comment_state: c_uint,
    dict_size: c_uint,
    hash_type: c_uint,
    hash: [u8; 32],
    redir_type: c_uint,
    redir_name: *mut WideChar,
    redir_name_size: c_uint,
    dir_target: c_uint,
    mtime_low: c_uint,
    mtime_high: c_uint,
    ctime_low: c_uint,
    ctime_high: c_uint,
    atime_low: c_uint,
    atime_high: c_uint,
    reserved: [c_uint; 988],
}

impl HeaderData {
    fn zeroed() -> Self {
        // Every field is plain data or a nullable pointer.
        unsafe { std::mem::zeroed() }
    }
}

#[cfg(windows)]
const LIBRARY_NAMES: &[&str] = &["unrar64.dll", "unrar.dll"];
#[cfg(target_os = "macos")]
const LIBRARY_NAMES: &[&str] = &["libunrar.dylib"];
#[cfg(not(any(windows, target_os = "macos")))]
const LIBRARY_NAMES: &[&str] = &["libunrar.so", "libunrar.so.6", "libunrar.so.5"];

/// Resolved libunrar entry points.
pub struct Unrar {
    _lib: Library,
    open_archive: unsafe extern "system" fn(data: *mut OpenArchiveData) -> Handle,
    close_archive: unsafe extern "system" fn(handle: Handle) -> c_int,
    read_header: unsafe extern "system" fn(handle: Handle, header: *mut HeaderData) -> c_int,
    process_file:
        unsafe extern "system" fn(handle: Handle, operation: c_int, dest_path: *const c_char, dest_name: *const c_char) -> c_int,
    set_callback: unsafe extern "system" fn(handle: Handle, callback: Option<Callback>, user_data: isize),
}

impl Unrar {
    /// Bind the decoder library, trying each well-known name.
    pub fn load() -> Result<Self> {
        for name in LIBRARY_NAMES {
            // Loading a shared library runs its initializers.
            if let Some(unrar) = unsafe { Library::new(name).ok().and_then(|lib| Self::bind(lib)) } {
                return Ok(unrar);
            }
        }
        Err(Error::DecoderUnavailable)
    }

    unsafe fn bind(lib: Library) -> Option<Self> {
        Some(Self {
            open_archive: *lib.get(b"RAROpenArchiveEx\0").ok()?,
            close_archive: *lib.get(b"RARCloseArchive\0").ok()?,
            read_header: *lib.get(b"RARReadHeaderEx\0").ok()?,
            process_file: *lib.get(b"RARProcessFile\0").ok()?,
            set_callback: *lib.get(b"RARSetCallback\0").ok()?,
            _lib: lib,
        })
    }

    pub fn is_available() -> bool {
        Self::load().is_ok()
    }
}

/// Open archive handle, closed on drop.
struct Archive<'a> {
    unrar: &'a Unrar,
    handle: Handle,
}

impl Archive<'_> {
    fn open<'a>(unrar: &'a Unrar, path: &Path, source_name: &str) -> Result<Archive<'a>> {
        let arc_name = CString::new(path.to_string_lossy().as_bytes())
            .map_err(|_| Error::NotFound(source_name.to_string()))?;
        let mut data = OpenArchiveData {
            arc_name: arc_name.as_ptr(),
            arc_name_w: ptr::null(),
            open_mode: RAR_OM_EXTRACT,
            open_result: 0,
            comment_buffer: ptr::null_mut(),
            comment_buffer_size: 0,
            comment_size: 0,
            comment_state: 0,
            flags: 0,
            callback: None,
            user_data: 0,
            reserved: [0; 28],
        };
        let handle = unsafe { (unrar.open_archive)(&mut data) };
        let open_result = data.open_result;
        if handle.is_null() || open_result != ERAR_SUCCESS as c_uint {
            return Err(Error::Malformed {
                what: "failed to open",
                name: source_name.to_string(),
            });
        }
        Ok(Archive { unrar, handle })
    }
}

impl Drop for Archive<'_> {
    fn drop(&mut self) {
        unsafe { (self.unrar.close_archive)(self.handle) };
    }
}

/// Receives decoded payload bytes from the unrar callback.
struct DataSink<'a> {
    entry: &'a mut dyn Write,
    error: Option<io::Error>,
}

unsafe extern "system" fn process_data(msg: c_uint, user_data: isize, p1: isize, p2: isize) -> c_int {
    // Anything else (volume change, password request) cannot be
    // satisfied here; abort the operation rather than let the decoder
    // continue on garbage.
    if msg != UCM_PROCESSDATA {
        return -1;
    }
    let sink = &mut *(user_data as *mut DataSink<'_>);
    let data = slice::from_raw_parts(p1 as *const u8, p2 as usize);
    match sink.entry.write_all(data) {
        Ok(()) => 1,
        Err(err) => {
            sink.error = Some(err);
            -1
        }
    }
}

pub fn rar_to_zip(path: &Path, opts: &Options) -> Result<()> {
    let filename = display_name(path);
    let mtime = fs::metadata(path)?.modified()?;
    let progress = Progress::new(opts.quiet);

    let unrar = Unrar::load()?;
    let archive = Archive::open(&unrar, path, &filename)?;

    let zip_path = path.with_extension("zip");
    let out = BufWriter::new(File::create(&zip_path)?);
    let mut writer = ZipWriter::new(out, opts.charsets, filename.clone());

    let mut header = HeaderData::zeroed();
    while unsafe { (unrar.read_header)(archive.handle, &mut header) } == ERAR_SUCCESS {
        let flags = header.flags;
        if flags & RHDF_ENCRYPTED != 0 {
            return Err(Error::Unsupported {
                what: "encryption not supported",
                name: filename.clone(),
            });
        }

        // addr_of: no reference into a packed struct.
        let raw_name = unsafe { CStr::from_ptr(ptr::addr_of!(header.file_name).cast()) };
        let file_name = raw_name.to_string_lossy().replace('\\', "/");

        if flags & RHDF_DIRECTORY != 0 || opts.is_excluded(&file_name) {
            // Still decodes solid-archive state for later entries.
            skip_entry(&unrar, &archive, &filename)?;
            continue;
        }

        let unp_size_high = header.unp_size_high;
        if unp_size_high != 0 {
            return Err(Error::Unsupported {
                what: "large file not supported",
                name: filename.clone(),
            });
        }
        let unp_size = header.unp_size;
        let file_time = header.file_time;

        let local = LocalFileHeader {
            last_mod_time: file_time as u16,
            last_mod_date: (file_time >> 16) as u16,
            compressed_size: unp_size,
            uncompressed_size: unp_size,
            file_name,
            ..Default::default()
        };
        let mut entry = writer.begin_entry(local, 0)?;

        let mut sink = DataSink { entry: &mut entry, error: None };
        unsafe {
            (unrar.set_callback)(archive.handle, Some(process_data), &mut sink as *mut _ as isize);
        }
        let status = unsafe {
            (unrar.process_file)(archive.handle, RAR_TEST, ptr::null(), ptr::null())
        };
        unsafe { (unrar.set_callback)(archive.handle, None, 0) };
        if let Some(err) = sink.error {
            return Err(err.into());
        }
        if status != ERAR_SUCCESS {
            return Err(Error::Malformed {
                what: "failed to read",
                name: filename.clone(),
            });
        }
        entry.finish()?;

        progress.count(writer.entry_count(), "written");
    }
    progress.end_count();

    drop(archive);
    drop(writer.finish()?);
    progress.note("footer written");

    filetime::set_file_mtime(&zip_path, FileTime::from_system_time(mtime))?;
    Ok(())
}

fn skip_entry(unrar: &Unrar, archive: &Archive<'_>, source_name: &str) -> Result<()> {
    let status =
        unsafe { (unrar.process_file)(archive.handle, RAR_SKIP, ptr::null(), ptr::null()) };
    if status != ERAR_SUCCESS {
        return Err(Error::Malformed {
            what: "failed to read",
            name: source_name.to_string(),
        });
    }
    Ok(())
}
