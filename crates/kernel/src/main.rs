#![no_std]
#![no_main]

//! Freestanding i386 kernel binary: a minimal entry sequence, an embedded
//! cooperative scheduler, and a Scheme runtime per thread.
//!
//! Grounded on the retrieved `kernel.c`'s `kmain()`: no multiboot header,
//! no paging, no GDT/IDT construction beyond the single timer gate the PIT
//! needs — this binary assumes it is already handed 32-bit protected mode
//! with a flat stack, exactly as the original does, and its first job is
//! to stand up just enough HAL state to run the Scheme demo and then halt.

mod bootinfo;
mod idt;
mod logger;
mod platform;
mod ramdisk;
mod threads;

use los_scheme::Runtime;
use platform::KernelPlatform;

/// Matches the retrieved `kernel.c`'s hard-coded demo program, run when no
/// boot-info ramdisk is supplied.
const DEFAULT_PROGRAM: &str = "(begin\n\
  (define (fact n) (if (< n 2) 1 (* n (fact (- n 1)))))\n\
  (display (fact 5))\n\
  (newline))\n";

/// Longest bootstrap program `kmain` will read back off the disk image.
const MAX_BOOT_PROGRAM_LEN: usize = 4096;

#[unsafe(no_mangle)]
pub extern "C" fn _start() -> ! {
    kmain()
}

fn kmain() -> ! {
    los_hal::console::init();
    logger::init(log::LevelFilter::Trace);
    log::info!("SlopOS kernel starting");

    los_hal::pic::remap();
    los_hal::pit::Pit::init(100).expect("100 Hz is well within the PIT's representable divisor range");
    idt::init();
    los_scheduler::init();

    stage_boot_program();

    // SAFETY: `_start` is only ever reached once, at boot, before any
    // interrupt is unmasked.
    unsafe { enable_interrupts() };

    let mut program_buf = [0u8; MAX_BOOT_PROGRAM_LEN];
    let len = platform::copy_boot_program(&mut program_buf);
    let program = if len == 0 {
        DEFAULT_PROGRAM
    } else {
        core::str::from_utf8(&program_buf[..len]).unwrap_or(DEFAULT_PROGRAM)
    };

    let mut rt: Runtime<KernelPlatform> = Runtime::new(KernelPlatform::new());
    rt.eval_string(program);

    log::info!("boot thread finished, halting");
    loop {
        los_hal::cpu::halt();
    }
}

/// Reads the `BootInfo` boot-info block and, if it names a nonempty
/// ramdisk, stages that raw image; otherwise stages the built-in demo so
/// the shared disk always has *something* well-formed behind it.
fn stage_boot_program() {
    // SAFETY: runs once, at boot, before any other code reads the boot-info
    // page or the shared disk.
    let info = unsafe { bootinfo::read() };
    if info.ramdisk_size > 0 {
        log::info!(
            "staging ramdisk from boot info: base={:#x} size={}",
            info.ramdisk_base,
            info.ramdisk_size
        );
        unsafe {
            platform::load_raw_disk(info.ramdisk_base as *const u8, info.ramdisk_size as usize);
        }
    } else {
        log::info!("no ramdisk in boot info, staging built-in factorial demo");
        platform::load_boot_program(DEFAULT_PROGRAM.as_bytes());
    }
}

/// Unmask interrupts at the CPU. Not part of `los_hal::interrupts` because
/// that module's `disable`/`restore` pair is scoped to `IrqSafeLock`'s
/// save-and-restore discipline; this is the one unconditional enable the
/// whole boot sequence ever does.
unsafe fn enable_interrupts() {
    unsafe {
        core::arch::asm!("sti", options(nomem, nostack));
    }
}

/// QEMU's ACPI power-off ports. Grounded on the retrieved `kernel.c`'s
/// `acpi_shutdown()`.
pub(crate) fn acpi_shutdown() -> i32 {
    unsafe {
        core::arch::asm!("out dx, ax", in("dx") 0x604u16, in("ax") 0x2000u16, options(nomem, nostack));
        core::arch::asm!("out dx, ax", in("dx") 0xB004u16, in("ax") 0x2000u16, options(nomem, nostack));
    }
    0
}

#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    los_hal::println!("KERNEL PANIC: {info}");
    loop {
        los_hal::cpu::halt();
    }
}
