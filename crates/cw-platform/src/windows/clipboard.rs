//! Win32 clipboard session.
//!
//! The clipboard is a systemwide mutually-exclusive resource: `OpenClipboard`
//! to `CloseClipboard` is the critical section, and every shared buffer is
//! read under a paired `GlobalLock`/`GlobalUnlock`. Both disciplines are
//! expressed as RAII guards so no exit path can leak the lock.

use std::slice;

use winapi::ctypes::c_void;
use winapi::shared::minwindef::UINT;
use winapi::shared::windef::{HBITMAP, HWND};
use winapi::um::winbase::{GlobalLock, GlobalSize, GlobalUnlock};
use winapi::um::wingdi::{GetDIBits, GetObjectW, BITMAP, BITMAPINFO, BI_RGB, DIB_RGB_COLORS};
use winapi::um::winnt::HANDLE;
use winapi::um::winuser::{
    CloseClipboard, GetClipboardData, GetDC, IsClipboardFormatAvailable, OpenClipboard, ReleaseDC,
    CF_BITMAP, CF_DIB, CF_HDROP, CF_TEXT, CF_UNICODETEXT,
};

use crate::engine::ClipboardAccess;
use crate::extract::{ClipFormat, ExtractError, FormatSession};

fn format_code(format: ClipFormat) -> UINT {
    match format {
        ClipFormat::FileDrop => CF_HDROP,
        ClipFormat::UnicodeText => CF_UNICODETEXT,
        ClipFormat::AnsiText => CF_TEXT,
        ClipFormat::Dib => CF_DIB,
        ClipFormat::BitmapHandle => CF_BITMAP,
    }
}

/// Exclusive clipboard ownership for reading; closed on drop.
struct ClipboardGuard(());

impl ClipboardGuard {
    fn open(owner: HWND) -> Result<Self, ExtractError> {
        // Failure means another process holds the clipboard right now.
        if unsafe { OpenClipboard(owner) } == 0 {
            return Err(ExtractError::Contention);
        }
        Ok(Self(()))
    }
}

impl Drop for ClipboardGuard {
    fn drop(&mut self) {
        unsafe {
            CloseClipboard();
        }
    }
}

/// Stable pointer into a locked global memory block; unlocked on drop.
struct GlobalLockGuard {
    handle: HANDLE,
    ptr: *const u8,
    len: usize,
}

impl GlobalLockGuard {
    /// Lock `handle`; `None` when the lock fails or the block is empty
    /// (zero-length means "format absent", not empty content).
    fn lock(handle: HANDLE) -> Option<Self> {
        let ptr = unsafe { GlobalLock(handle) } as *const u8;
        if ptr.is_null() {
            return None;
        }
        let len = unsafe { GlobalSize(handle) };
        if len == 0 {
            unsafe { GlobalUnlock(handle) };
            return None;
        }
        Some(Self { handle, ptr, len })
    }

    fn as_slice(&self) -> &[u8] {
        unsafe { slice::from_raw_parts(self.ptr, self.len) }
    }
}

impl Drop for GlobalLockGuard {
    fn drop(&mut self) {
        unsafe {
            GlobalUnlock(self.handle);
        }
    }
}

/// Session provider bound to the listener's message-sink window.
pub struct Win32Clipboard {
    owner: HWND,
}

impl Win32Clipboard {
    pub fn new(owner: HWND) -> Self {
        Self { owner }
    }
}

impl ClipboardAccess for Win32Clipboard {
    fn open(&mut self) -> Result<Box<dyn FormatSession + '_>, ExtractError> {
        let guard = ClipboardGuard::open(self.owner)?;
        Ok(Box::new(Win32Session { _guard: guard }))
    }
}

/// One open clipboard critical section.
struct Win32Session {
    _guard: ClipboardGuard,
}

impl FormatSession for Win32Session {
    fn is_available(&self, format: ClipFormat) -> bool {
        unsafe { IsClipboardFormatAvailable(format_code(format)) != 0 }
    }

    fn read(&self, format: ClipFormat) -> Result<Option<Vec<u8>>, ExtractError> {
        match format {
            // CF_BITMAP hands out a GDI handle, not global memory; convert
            // it to DIB-shaped bytes so one decoder serves both formats.
            ClipFormat::BitmapHandle => read_bitmap_as_dib(),
            _ => read_global(format_code(format)),
        }
    }
}

/// Copy out exactly `GlobalSize` bytes from a global-memory format.
fn read_global(code: UINT) -> Result<Option<Vec<u8>>, ExtractError> {
    let handle = unsafe { GetClipboardData(code) };
    if handle.is_null() {
        return Ok(None);
    }
    Ok(GlobalLockGuard::lock(handle).map(|guard| guard.as_slice().to_vec()))
}

/// Byte length of a 32-bpp pixel buffer for the given dimensions, or
/// `None` when the product does not fit in `usize`. The multiplication
/// must not wrap: an undersized allocation here would let `GetDIBits`
/// write past the end of the buffer.
fn dib_buffer_len(width: u32, height: u32) -> Option<usize> {
    (width as usize)
        .checked_mul(height as usize)?
        .checked_mul(4)
}

/// Render a CF_BITMAP handle into 32-bpp top-down DIB bytes via GetDIBits.
fn read_bitmap_as_dib() -> Result<Option<Vec<u8>>, ExtractError> {
    unsafe {
        let hbitmap = GetClipboardData(CF_BITMAP) as HBITMAP;
        if hbitmap.is_null() {
            return Ok(None);
        }

        let mut bitmap: BITMAP = std::mem::zeroed();
        let copied = GetObjectW(
            hbitmap as *mut c_void,
            std::mem::size_of::<BITMAP>() as i32,
            &mut bitmap as *mut BITMAP as *mut c_void,
        );
        if copied == 0 || bitmap.bmWidth <= 0 || bitmap.bmHeight <= 0 {
            return Err(ExtractError::Os("GetObjectW on clipboard bitmap failed".into()));
        }

        let width = bitmap.bmWidth as u32;
        let height = bitmap.bmHeight as u32;
        let len = dib_buffer_len(width, height).ok_or_else(|| {
            ExtractError::Os(format!(
                "clipboard bitmap dimensions {width}x{height} overflow the pixel buffer"
            ))
        })?;
        let mut pixels = vec![0u8; len];

        let mut info: BITMAPINFO = std::mem::zeroed();
        info.bmiHeader.biSize = std::mem::size_of_val(&info.bmiHeader) as u32;
        info.bmiHeader.biWidth = bitmap.bmWidth;
        info.bmiHeader.biHeight = -bitmap.bmHeight; // top-down
        info.bmiHeader.biPlanes = 1;
        info.bmiHeader.biBitCount = 32;
        info.bmiHeader.biCompression = BI_RGB;

        let screen_dc = GetDC(std::ptr::null_mut());
        let lines = GetDIBits(
            screen_dc,
            hbitmap,
            0,
            height,
            pixels.as_mut_ptr() as *mut c_void,
            &mut info,
            DIB_RGB_COLORS,
        );
        ReleaseDC(std::ptr::null_mut(), screen_dc);

        if lines == 0 {
            return Err(ExtractError::Os("GetDIBits on clipboard bitmap failed".into()));
        }

        // Serialize BITMAPINFOHEADER + pixels; the header GetDIBits filled
        // in already describes the buffer we produced.
        let header = &info.bmiHeader;
        let mut dib = Vec::with_capacity(40 + pixels.len());
        dib.extend_from_slice(&header.biSize.to_le_bytes());
        dib.extend_from_slice(&header.biWidth.to_le_bytes());
        dib.extend_from_slice(&header.biHeight.to_le_bytes());
        dib.extend_from_slice(&header.biPlanes.to_le_bytes());
        dib.extend_from_slice(&header.biBitCount.to_le_bytes());
        dib.extend_from_slice(&header.biCompression.to_le_bytes());
        dib.extend_from_slice(&header.biSizeImage.to_le_bytes());
        dib.extend_from_slice(&header.biXPelsPerMeter.to_le_bytes());
        dib.extend_from_slice(&header.biYPelsPerMeter.to_le_bytes());
        dib.extend_from_slice(&header.biClrUsed.to_le_bytes());
        dib.extend_from_slice(&header.biClrImportant.to_le_bytes());
        dib.extend_from_slice(&pixels);
        Ok(Some(dib))
    }
}
