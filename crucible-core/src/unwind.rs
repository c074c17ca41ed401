//! Catching panics from properties without printing them.
//!
//! A process-wide panic hook is installed once. While a thread is inside
//! `catch_silent` the hook records the panic's message and location instead
//! of printing; everywhere else it defers to the previously installed hook.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Once;

/// Message and location of a caught panic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanicInfo {
    pub message: String,
    pub file: String,
    pub line: u32,
}

thread_local! {
    static SILENT_DEPTH: Cell<usize> = const { Cell::new(0) };
    static LAST_PANIC: RefCell<Option<PanicInfo>> = const { RefCell::new(None) };
}

fn install_hook() {
    static HOOK: Once = Once::new();
    HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            if SILENT_DEPTH.with(Cell::get) == 0 {
                previous(info);
                return;
            }
            let (file, line) = info
                .location()
                .map(|l| (l.file().to_string(), l.line()))
                .unwrap_or_else(|| ("<unknown>".to_string(), 0));
            let caught = PanicInfo {
                message: payload_message(info.payload()),
                file,
                line,
            };
            LAST_PANIC.with(|slot| *slot.borrow_mut() = Some(caught));
        }));
    });
}

fn payload_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "<non-string panic payload>".to_string()
    }
}

/// Run `f`, turning a panic into `Err` with its message and location.
pub fn catch_silent<R, F>(f: F) -> Result<R, PanicInfo>
where
    F: FnOnce() -> R,
{
    install_hook();
    LAST_PANIC.with(|slot| slot.borrow_mut().take());
    SILENT_DEPTH.with(|depth| depth.set(depth.get() + 1));
    let result = panic::catch_unwind(AssertUnwindSafe(f));
    SILENT_DEPTH.with(|depth| depth.set(depth.get() - 1));

    result.map_err(|payload| {
        LAST_PANIC
            .with(|slot| slot.borrow_mut().take())
            .unwrap_or_else(|| PanicInfo {
                message: payload_message(payload.as_ref()),
                file: "<unknown>".to_string(),
                line: 0,
            })
    })
}
