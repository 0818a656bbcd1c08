//! Windows clipboard change listener.
//!
//! A dedicated thread owns the entire lifecycle: it creates a hidden
//! message-only window, registers it for clipboard-change notifications,
//! and pumps messages until asked to stop. All extraction and
//! fingerprinting happens inline on that thread; there is no other writer
//! to the listener state.
//!
//! Registration prefers the modern `AddClipboardFormatListener` API
//! (`WM_CLIPBOARDUPDATE`). If that fails on an older OS the listener
//! splices itself into the legacy viewer chain (`SetClipboardViewer`),
//! where it must forward `WM_DRAWCLIPBOARD` to the next viewer and keep
//! the chain intact on `WM_CHANGECBCHAIN` — a dropped forward breaks every
//! application downstream.

use std::ptr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc as std_mpsc;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use thiserror::Error;
use winapi::shared::minwindef::{LPARAM, LRESULT, UINT, WPARAM};
use winapi::shared::windef::HWND;
use winapi::um::combaseapi::{CoInitializeEx, CoUninitialize};
use winapi::um::errhandlingapi::GetLastError;
use winapi::um::libloaderapi::GetModuleHandleW;
use winapi::um::objbase::COINIT_APARTMENTTHREADED;
use winapi::um::winuser::{
    AddClipboardFormatListener, ChangeClipboardChain, CreateWindowExW, DefWindowProcW,
    DispatchMessageW, GetMessageW, GetWindowLongPtrW, PostMessageW, PostQuitMessage,
    RegisterClassW, RemoveClipboardFormatListener, SendMessageW, SetClipboardViewer,
    SetWindowLongPtrW, TranslateMessage, GWLP_USERDATA, HWND_MESSAGE, MSG, WM_CHANGECBCHAIN,
    WM_CLIPBOARDUPDATE, WM_CLOSE, WM_DESTROY, WM_DRAWCLIPBOARD, WM_NCDESTROY, WNDCLASSW,
};

use cw_core::MonitorConfig;

use super::clipboard::Win32Clipboard;
use crate::engine::{CaptureEngine, ChangeSender};

const WINDOW_CLASS: &str = "ClipwatchMessageWindow";
const ERROR_CLASS_ALREADY_EXISTS: u32 = 1410;

#[derive(Debug, Error)]
pub enum ListenerError {
    /// The message-sink window could not be created at all; the only fatal
    /// startup condition.
    #[error("failed to create message-sink window: {0}")]
    WindowCreation(String),

    #[error("failed to spawn listener thread: {0}")]
    Thread(String),
}

/// Per-window state, owned by the listener thread. The box lives behind
/// `GWLP_USERDATA` from window creation until `WM_NCDESTROY`.
struct ListenerState {
    engine: CaptureEngine<Win32Clipboard>,
    /// Next viewer in the legacy chain; null when the modern listener API
    /// is in use.
    next_viewer: HWND,
    legacy_chain: bool,
    running: Arc<AtomicBool>,
}

impl ListenerState {
    fn on_clipboard_changed(&mut self) {
        // Notifications are only processed in the Running state; a stop
        // request in flight must not trigger another extraction.
        if self.running.load(Ordering::SeqCst) {
            self.engine.handle_notification();
        }
    }
}

/// Handle to the running listener. `stop` is idempotent and safe to call
/// from any thread; dropping the handle stops the listener as well.
pub struct ClipboardListener {
    hwnd: isize,
    running: Arc<AtomicBool>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl ClipboardListener {
    /// Spawn the listener thread and block until the message loop is
    /// running (or window creation failed). Calling `start` twice on two
    /// handles is not supported.
    pub fn start(config: MonitorConfig, tx: ChangeSender) -> Result<Self, ListenerError> {
        let running = Arc::new(AtomicBool::new(true));
        let (ready_tx, ready_rx) = std_mpsc::channel();

        let thread_running = Arc::clone(&running);
        let handle = std::thread::Builder::new()
            .name("clipwatch-listener".into())
            .spawn(move || run_message_loop(config, tx, thread_running, ready_tx))
            .map_err(|err| ListenerError::Thread(err.to_string()))?;

        match ready_rx.recv() {
            Ok(Ok(hwnd)) => Ok(Self {
                hwnd,
                running,
                thread: Mutex::new(Some(handle)),
            }),
            Ok(Err(err)) => {
                let _ = handle.join();
                Err(err)
            }
            Err(_) => {
                let _ = handle.join();
                Err(ListenerError::WindowCreation(
                    "listener thread exited before the loop started".into(),
                ))
            }
        }
    }

    /// Ask the message loop to exit and join the thread. Safe to call from
    /// a different thread than `start`; a second call is a no-op.
    pub fn stop(&self) {
        if self.running.swap(false, Ordering::SeqCst) {
            unsafe {
                PostMessageW(self.hwnd as HWND, WM_CLOSE, 0, 0);
            }
        }
        if let Ok(mut guard) = self.thread.lock() {
            if let Some(handle) = guard.take() {
                let _ = handle.join();
            }
        }
    }
}

impl Drop for ClipboardListener {
    fn drop(&mut self) {
        self.stop();
    }
}

fn wide(text: &str) -> Vec<u16> {
    text.encode_utf16().chain(std::iter::once(0)).collect()
}

fn run_message_loop(
    config: MonitorConfig,
    tx: ChangeSender,
    running: Arc<AtomicBool>,
    ready_tx: std_mpsc::Sender<Result<isize, ListenerError>>,
) {
    unsafe {
        // Clipboard access requires a single-threaded-apartment thread.
        let com = CoInitializeEx(ptr::null_mut(), COINIT_APARTMENTTHREADED);

        let hwnd = match create_message_window() {
            Ok(hwnd) => hwnd,
            Err(err) => {
                let _ = ready_tx.send(Err(err));
                if com >= 0 {
                    CoUninitialize();
                }
                return;
            }
        };

        let mut next_viewer: HWND = ptr::null_mut();
        let mut legacy_chain = false;
        if AddClipboardFormatListener(hwnd) == 0 {
            log::warn!("modern clipboard listener unavailable, falling back to viewer chain");
            next_viewer = SetClipboardViewer(hwnd);
            legacy_chain = true;
        }

        let state = Box::new(ListenerState {
            engine: CaptureEngine::new(Win32Clipboard::new(hwnd), config, tx),
            next_viewer,
            legacy_chain,
            running,
        });
        SetWindowLongPtrW(hwnd, GWLP_USERDATA, Box::into_raw(state) as isize);

        let _ = ready_tx.send(Ok(hwnd as isize));
        log::info!("clipboard listener running");

        let mut msg: MSG = std::mem::zeroed();
        while GetMessageW(&mut msg, ptr::null_mut(), 0, 0) > 0 {
            TranslateMessage(&msg);
            DispatchMessageW(&msg);
        }

        if com >= 0 {
            CoUninitialize();
        }
        log::info!("clipboard listener stopped");
    }
}

unsafe fn create_message_window() -> Result<HWND, ListenerError> {
    let instance = GetModuleHandleW(ptr::null());
    let class_name = wide(WINDOW_CLASS);

    let mut class: WNDCLASSW = std::mem::zeroed();
    class.lpfnWndProc = Some(wnd_proc);
    class.hInstance = instance;
    class.lpszClassName = class_name.as_ptr();

    if RegisterClassW(&class) == 0 && GetLastError() != ERROR_CLASS_ALREADY_EXISTS {
        return Err(ListenerError::WindowCreation(format!(
            "RegisterClassW failed (error {})",
            GetLastError()
        )));
    }

    let title = wide("clipwatch");
    let hwnd = CreateWindowExW(
        0,
        class_name.as_ptr(),
        title.as_ptr(),
        0,
        0,
        0,
        0,
        0,
        HWND_MESSAGE, // message-only window, never visible
        ptr::null_mut(),
        instance,
        ptr::null_mut(),
    );

    if hwnd.is_null() {
        return Err(ListenerError::WindowCreation(format!(
            "CreateWindowExW failed (error {})",
            GetLastError()
        )));
    }
    Ok(hwnd)
}

/// Reaction to a WM_CHANGECBCHAIN message: when our direct successor
/// leaves the chain we adopt its successor, otherwise the message is
/// relayed downstream untouched.
enum ChainUpdate {
    Adopt(HWND),
    Forward,
}

fn chain_update(next_viewer: HWND, leaving: HWND, successor: HWND) -> ChainUpdate {
    if leaving == next_viewer {
        ChainUpdate::Adopt(successor)
    } else {
        ChainUpdate::Forward
    }
}

unsafe extern "system" fn wnd_proc(
    hwnd: HWND,
    msg: UINT,
    wparam: WPARAM,
    lparam: LPARAM,
) -> LRESULT {
    let state_ptr = GetWindowLongPtrW(hwnd, GWLP_USERDATA) as *mut ListenerState;

    match msg {
        WM_CLIPBOARDUPDATE => {
            if let Some(state) = state_ptr.as_mut() {
                state.on_clipboard_changed();
            }
            0
        }
        WM_DRAWCLIPBOARD => {
            if let Some(state) = state_ptr.as_mut() {
                state.on_clipboard_changed();
                // Always relay to the next viewer; the chain only works if
                // every member forwards.
                if !state.next_viewer.is_null() {
                    SendMessageW(state.next_viewer, msg, wparam, lparam);
                }
            }
            0
        }
        WM_CHANGECBCHAIN => {
            if let Some(state) = state_ptr.as_mut() {
                match chain_update(state.next_viewer, wparam as HWND, lparam as HWND) {
                    ChainUpdate::Adopt(successor) => state.next_viewer = successor,
                    ChainUpdate::Forward => {
                        if !state.next_viewer.is_null() {
                            SendMessageW(state.next_viewer, msg, wparam, lparam);
                        }
                    }
                }
            }
            0
        }
        WM_DESTROY => {
            if let Some(state) = state_ptr.as_mut() {
                if state.legacy_chain {
                    // Splice ourselves out so downstream viewers stay linked.
                    ChangeClipboardChain(hwnd, state.next_viewer);
                } else {
                    RemoveClipboardFormatListener(hwnd);
                }
            }
            PostQuitMessage(0);
            0
        }
        WM_NCDESTROY => {
            let ptr = SetWindowLongPtrW(hwnd, GWLP_USERDATA, 0) as *mut ListenerState;
            if !ptr.is_null() {
                drop(Box::from_raw(ptr));
            }
            DefWindowProcW(hwnd, msg, wparam, lparam)
        }
        _ => DefWindowProcW(hwnd, msg, wparam, lparam),
    }
}
