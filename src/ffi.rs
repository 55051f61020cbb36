//! C-ABI Foreign Function Interface for pptslim.
//!
//! # Memory Management
//!
//! Buffers returned by `pptslim_optimize_bytes` must be freed with
//! `pptslim_free_bytes`, passing the length reported with them. Strings
//! must be freed with `pptslim_free_string`.
//!
//! # Error Handling
//!
//! Functions that can fail return a null pointer on error. Use
//! `pptslim_last_error` to retrieve the error message.
//!
//! # Options
//!
//! Options are passed as a JSON object with camelCase keys, for example
//! `{"removeHiddenSlides":true,"compressImages":{"quality":0.6}}`. A null
//! pointer selects the defaults.
//!
//! # Example (C)
//!
//! ```c
//! size_t out_len = 0;
//! uint8_t* out = pptslim_optimize_bytes(data, len, "{\"removeUnusedMedia\":true}", &out_len);
//! if (!out) {
//!     fprintf(stderr, "Error: %s\n", pptslim_last_error());
//!     return 1;
//! }
//! fwrite(out, 1, out_len, file);
//! pptslim_free_bytes(out, out_len);
//! ```

use std::cell::RefCell;
use std::ffi::{c_char, CStr, CString};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::ptr;

use crate::options::OptimizeOptions;

// Thread-local storage for the last error message.
thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

fn set_last_error(msg: &str) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

fn clear_last_error() {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = None;
    });
}

/// Run `f`, recording its error or panic as the last error.
fn guarded<T>(f: impl FnOnce() -> Result<T, String>) -> Option<T> {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(value)) => Some(value),
        Ok(Err(e)) => {
            set_last_error(&e);
            None
        }
        Err(_) => {
            set_last_error("panic occurred during optimization");
            None
        }
    }
}

unsafe fn options_from(json: *const c_char) -> Result<OptimizeOptions, String> {
    if json.is_null() {
        return Ok(OptimizeOptions::default());
    }
    let text = CStr::from_ptr(json).to_str().map_err(|e| e.to_string())?;
    OptimizeOptions::from_json(text).map_err(|e| e.to_string())
}

unsafe fn str_from<'a>(s: *const c_char, what: &str) -> Result<&'a str, String> {
    if s.is_null() {
        return Err(format!("{what} is null"));
    }
    CStr::from_ptr(s).to_str().map_err(|e| e.to_string())
}

/// Get the version of the library.
///
/// # Safety
///
/// Returns a static string that must not be freed.
#[no_mangle]
pub extern "C" fn pptslim_version() -> *const c_char {
    concat!(env!("CARGO_PKG_VERSION"), "\0").as_ptr() as *const c_char
}

/// Get the last error message.
///
/// # Safety
///
/// Returns a pointer to a thread-local error string. The pointer is valid until
/// the next call to any pptslim function on the same thread.
#[no_mangle]
pub extern "C" fn pptslim_last_error() -> *const c_char {
    LAST_ERROR.with(|e| {
        e.borrow()
            .as_ref()
            .map(|s| s.as_ptr())
            .unwrap_or(ptr::null())
    })
}

/// Optimize a package held in memory.
///
/// # Safety
///
/// - `data` must point to at least `len` readable bytes.
/// - `options_json` must be null or a valid null-terminated UTF-8 string.
/// - `out_len` must be a valid pointer; it receives the output length.
/// - Returns null on error. Use `pptslim_last_error` to get the error message.
/// - The returned buffer must be freed with `pptslim_free_bytes`.
#[no_mangle]
pub unsafe extern "C" fn pptslim_optimize_bytes(
    data: *const u8,
    len: usize,
    options_json: *const c_char,
    out_len: *mut usize,
) -> *mut u8 {
    clear_last_error();

    if data.is_null() || out_len.is_null() {
        set_last_error("data or out_len is null");
        return ptr::null_mut();
    }

    let result = guarded(|| {
        let options = options_from(options_json)?;
        let bytes = std::slice::from_raw_parts(data, len);
        crate::optimize_bytes(bytes, &options)
            .map(|optimized| optimized.data.into_boxed_slice())
            .map_err(|e| e.to_string())
    });

    match result {
        Some(buffer) => {
            *out_len = buffer.len();
            Box::into_raw(buffer) as *mut u8
        }
        None => {
            *out_len = 0;
            ptr::null_mut()
        }
    }
}

/// Free a buffer returned by `pptslim_optimize_bytes`.
///
/// # Safety
///
/// - `data` must be a pointer returned by `pptslim_optimize_bytes`, or null.
/// - `len` must be the length reported with it.
#[no_mangle]
pub unsafe extern "C" fn pptslim_free_bytes(data: *mut u8, len: usize) {
    if !data.is_null() {
        let _ = Box::from_raw(ptr::slice_from_raw_parts_mut(data, len));
    }
}

/// Optimize `input` into `output`, returning the report as JSON.
///
/// # Safety
///
/// - `input` and `output` must be valid null-terminated UTF-8 strings.
/// - `options_json` must be null or a valid null-terminated UTF-8 string.
/// - Returns null on error. Use `pptslim_last_error` to get the error message.
/// - The returned string must be freed with `pptslim_free_string`.
#[no_mangle]
pub unsafe extern "C" fn pptslim_optimize_file(
    input: *const c_char,
    output: *const c_char,
    options_json: *const c_char,
) -> *mut c_char {
    clear_last_error();

    let result = guarded(|| {
        let input = str_from(input, "input path")?;
        let output = str_from(output, "output path")?;
        let options = options_from(options_json)?;
        let report = crate::optimize_file(input, output, &options).map_err(|e| e.to_string())?;
        let json = serde_json::to_string(&report).map_err(|e| e.to_string())?;
        CString::new(json).map_err(|e| e.to_string())
    });

    result.map(CString::into_raw).unwrap_or(ptr::null_mut())
}

/// Free a string allocated by this library.
///
/// # Safety
///
/// - `s` must be a pointer returned by a pptslim function, or null.
/// - After calling this function, the pointer is invalid and must not be used.
#[no_mangle]
pub unsafe extern "C" fn pptslim_free_string(s: *mut c_char) {
    if !s.is_null() {
        let _ = CString::from_raw(s);
    }
}
