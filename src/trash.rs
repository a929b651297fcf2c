//! Move a file out of the way before its replacement is renamed in.
//!
//! On Linux the file goes to the desktop trash through a dynamically
//! bound `libgio-2.0` when one is present — the library is optional, so
//! its absence silently falls through. Everywhere else, and whenever no
//! trash facility exists, the file is renamed beside itself with a `~`
//! suffix as a recoverable backup.

use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::Path;

/// Trash `path`, or fall back to renaming it to `<name>~`.
pub fn trash(path: &Path) -> io::Result<()> {
    #[cfg(target_os = "linux")]
    if gio::trash(path)? {
        return Ok(());
    }
    backup_rename(path)
}

fn backup_rename(path: &Path) -> io::Result<()> {
    let mut backup_name = OsString::from(path.file_name().unwrap_or(path.as_os_str()));
    backup_name.push("~");
    let backup_path = match path.parent() {
        Some(parent) => parent.join(&backup_name),
        None => backup_name.into(),
    };
    fs::rename(path, backup_path)
}

#[cfg(target_os = "linux")]
mod gio {
    //! Minimal binding to `g_file_trash`.

    use std::ffi::{c_char, c_int, c_void, CStr, CString};
    use std::io;
    use std::os::unix::ffi::OsStrExt;
    use std::path::Path;
    use std::ptr;

    use libloading::Library;

    #[repr(C)]
    struct GError {
        domain: u32,
        code: c_int,
        message: *mut c_char,
    }

    struct Gio {
        _lib: Library,
        g_error_free: unsafe extern "C" fn(*mut GError),
        g_object_unref: unsafe extern "C" fn(*mut c_void),
        g_file_new_for_path: unsafe extern "C" fn(*const c_char) -> *mut c_void,
        g_file_trash:
            unsafe extern "C" fn(*mut c_void, *mut c_void, *mut *mut GError) -> c_int,
    }

    impl Gio {
        fn load() -> Option<Self> {
            unsafe {
                let lib = ["libgio-2.0.so.0", "libgio-2.0.so"]
                    .iter()
                    .find_map(|name| Library::new(name).ok())?;
                let g_error_free = *lib.get(b"g_error_free\0").ok()?;
                let g_object_unref = *lib.get(b"g_object_unref\0").ok()?;
                let g_file_new_for_path = *lib.get(b"g_file_new_for_path\0").ok()?;
                let g_file_trash = *lib.get(b"g_file_trash\0").ok()?;
                Some(Self {
                    _lib: lib,
                    g_error_free,
                    g_object_unref,
                    g_file_new_for_path,
                    g_file_trash,
                })
            }
        }
    }

    /// `Ok(true)` when GIO was present and the trash succeeded;
    /// `Ok(false)` when no GIO is available (caller falls back); `Err`
    /// when GIO was present but refused.
    pub fn trash(path: &Path) -> io::Result<bool> {
        let Some(gio) = Gio::load() else {
            return Ok(false);
        };
        let c_path = CString::new(path.as_os_str().as_bytes())
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "path contains NUL"))?;

        unsafe {
            let file = (gio.g_file_new_for_path)(c_path.as_ptr());
            let mut error: *mut GError = ptr::null_mut();
            let ok = (gio.g_file_trash)(file, ptr::null_mut(), &mut error);
            (gio.g_object_unref)(file);

            if ok != 0 {
                return Ok(true);
            }
            let result = if error.is_null() {
                Err(io::Error::other("g_file_trash failed"))
            } else {
                let message = CStr::from_ptr((*error).message).to_string_lossy().into_owned();
                (gio.g_error_free)(error);
                Err(io::Error::other(message))
            };
            result
        }
    }
}
