//! Polling console over the 16550 UART on COM1.
//!
//! Narrowed from the teacher's multi-arch `console` module (which picked
//! between a PL011 and a 16550 writer behind `cfg(target_arch)` and fed a
//! secondary GPU-terminal output) down to this kernel's single UART target:
//! one `IrqSafeLock<SerialPort>`, the same `print!`/`println!` macro shape.

use core::fmt::{self, Write};

use crate::serial::{SerialPort, COM1};
use crate::IrqSafeLock;

pub static WRITER: IrqSafeLock<SerialPort> = IrqSafeLock::new(SerialPort::new(COM1));

/// Program the UART. Must run once before any `print!`/`println!` call.
pub fn init() {
    WRITER.lock().init();
}

/// Non-blocking poll for one input byte.
pub fn read_byte() -> Option<u8> {
    WRITER.lock().read_byte()
}

#[doc(hidden)]
pub fn _print(args: fmt::Arguments) {
    let _ = WRITER.lock().write_fmt(args);
}

#[macro_export]
macro_rules! print {
    ($($arg:tt)*) => ($crate::console::_print(format_args!($($arg)*)));
}

#[macro_export]
macro_rules! println {
    () => ($crate::print!("\n"));
    ($($arg:tt)*) => ($crate::print!("{}\n", format_args!($($arg)*)));
}
