//! Minimal i386 Interrupt Descriptor Table: a single gate, for the PIT's
//! IRQ0 once [`los_hal::pic::remap`] has moved it to vector 32. Nothing
//! else is installed — this kernel never handles a CPU exception, and an
//! unhandled one reaching an empty gate triple-faults, which is an
//! accepted Non-goal rather than a bug to route around.
//!
//! Grounded on the retrieved `idt.c`'s `idt_entry`/`idt_ptr` layout and
//! `idt_init()`/`idt_set_gate()` sequence, in the shape of the teacher's
//! own (long-mode) `crates/hal/src/x86_64/cpu/idt.rs`: a packed gate
//! struct, a 256-entry table behind a `Mutex`, and an `init()` that builds
//! one gate and loads it with `lidt`. The teacher's gate is 16 bytes
//! (64-bit offset split across three fields, plus an IST byte); i386 gates
//! are 8 bytes with a two-way offset split and no IST.

use core::mem::size_of;
use los_utils::Mutex;

/// Vector the timer gate is installed at, matching the PIC remap's
/// master-PIC offset (IRQ0 -> 0x20).
pub const TIMER_VECTOR: u8 = 32;

const KERNEL_CODE_SELECTOR: u16 = 0x08;
const INTERRUPT_GATE_PRESENT_RING0: u8 = 0x8E;

#[derive(Clone, Copy)]
#[repr(C, packed)]
struct IdtEntry {
    offset_low: u16,
    selector: u16,
    zero: u8,
    type_attr: u8,
    offset_high: u16,
}

impl IdtEntry {
    const fn missing() -> Self {
        Self {
            offset_low: 0,
            selector: 0,
            zero: 0,
            type_attr: 0,
            offset_high: 0,
        }
    }

    fn set(&mut self, handler: u32, selector: u16, type_attr: u8) {
        self.offset_low = handler as u16;
        self.selector = selector;
        self.zero = 0;
        self.type_attr = type_attr;
        self.offset_high = (handler >> 16) as u16;
    }
}

#[repr(C, align(8))]
struct Idt([IdtEntry; 256]);

impl Idt {
    const fn new() -> Self {
        Self([IdtEntry::missing(); 256])
    }
}

static IDT: Mutex<Idt> = Mutex::new(Idt::new());

#[repr(C, packed)]
struct IdtPointer {
    limit: u16,
    base: u32,
}

/// Build the timer gate and load the table. Must run after
/// [`los_hal::pic::remap`] so vector 32 really is IRQ0, and before
/// interrupts are ever enabled.
pub fn init() {
    let mut idt = IDT.lock();
    idt.0[TIMER_VECTOR as usize].set(
        timer_isr as usize as u32,
        KERNEL_CODE_SELECTOR,
        INTERRUPT_GATE_PRESENT_RING0,
    );

    let ptr = IdtPointer {
        limit: (size_of::<Idt>() - 1) as u16,
        base: &idt.0 as *const _ as u32,
    };
    unsafe { lidt(&ptr) };
}

unsafe fn lidt(ptr: &IdtPointer) {
    unsafe {
        core::arch::asm!("lidt [{0}]", in(reg) ptr, options(nostack, preserves_flags));
    }
}

unsafe extern "C" {
    fn timer_isr();
}

// IRQ0 lands here once remapped to vector 32. `pusha`/`popa` save and
// restore the full general-purpose register file around the tick, cheaper
// than naming each register `context_switch` doesn't already account for;
// `iretd` (not `ret`) is what actually returns from an interrupt gate.
core::arch::global_asm!(
    ".global timer_isr",
    "timer_isr:",
    "pusha",
    "call timer_isr_body",
    "popa",
    "iretd",
);

#[unsafe(no_mangle)]
extern "C" fn timer_isr_body() {
    los_scheduler::tick();
}
