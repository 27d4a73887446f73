//! `PlatformPort` wiring for the freestanding kernel: the serial console,
//! the shared RAM disk, and the cooperative scheduler stand in for the
//! host harness's stdio/file/process primitives.
//!
//! The disk is a single static behind an `IrqSafeLock` rather than a field
//! on `KernelPlatform` itself, since §5 documents the block device as
//! shared across every runtime instance — each cooperative thread gets its
//! own `KernelPlatform` value, but they all read and write the same image.

use los_hal::{console, IrqSafeLock};
use los_scheme::platform::PlatformPort;

use crate::ramdisk::RamDisk;

static DISK: IrqSafeLock<RamDisk> = IrqSafeLock::new(RamDisk::empty());

/// Stage the bootstrap program into the shared disk image. Called once
/// from `kmain`, before anything evaluates against it.
pub fn load_boot_program(program: &[u8]) {
    DISK.lock().load_program(program);
}

/// Stage a raw, already-§6-shaped disk image (e.g. one pointed to by
/// `BootInfo`) instead of a single program.
///
/// # Safety
/// See [`crate::ramdisk::RamDisk::load_raw`].
pub unsafe fn load_raw_disk(base: *const u8, len: usize) {
    unsafe { DISK.lock().load_raw(base, len) };
}

/// Copy the §6 length-prefixed bootstrap program out of the shared disk
/// and into `buf`. Returns the number of bytes copied, or 0 if the disk
/// holds no well-formed program (truncated into `buf.len()` if needed).
pub fn copy_boot_program(buf: &mut [u8]) -> usize {
    let disk = DISK.lock();
    match disk.program_bytes() {
        Some(bytes) => {
            let n = bytes.len().min(buf.len());
            buf[..n].copy_from_slice(&bytes[..n]);
            n
        }
        None => 0,
    }
}

#[derive(Default)]
pub struct KernelPlatform;

impl KernelPlatform {
    pub const fn new() -> Self {
        Self
    }
}

impl PlatformPort for KernelPlatform {
    fn putc(&mut self, ch: u8) {
        console::_print(format_args!("{}", ch as char));
    }

    fn panic(&mut self, msg: &str) -> ! {
        los_hal::println!("scheme panic: {msg}");
        loop {
            los_hal::cpu::halt();
        }
    }

    fn read_char(&mut self) -> u8 {
        loop {
            if let Some(byte) = console::read_byte() {
                return byte;
            }
            los_scheduler::yield_now();
        }
    }

    fn read_byte(&mut self, offset: i64) -> i32 {
        DISK.lock().read_byte(offset)
    }

    fn disk_size(&mut self) -> i64 {
        DISK.lock().size()
    }

    fn write_bytes(&mut self, offset: i64, data: &[u8]) -> i64 {
        DISK.lock().write_bytes(offset, data)
    }

    fn foreign_call(&mut self, name: &str, args: &[i32]) -> i32 {
        match name {
            "putc" => {
                if let Some(&byte) = args.first() {
                    self.putc(byte as u8);
                    0
                } else {
                    -1
                }
            }
            "yield" => {
                los_scheduler::yield_now();
                0
            }
            "sleep" => {
                let ticks = args.first().copied().unwrap_or(0).max(0) as u32;
                los_scheduler::sleep(ticks);
                0
            }
            "shutdown" => crate::acpi_shutdown(),
            _ => -1,
        }
    }

    fn spawn_thread(&mut self, code: &str) -> i32 {
        crate::threads::spawn(code)
    }
}
