//! The cooperative context switch itself.
//!
//! Grounded on the retrieved `thread.c`'s callee-saved set for i386 cdecl
//! (`ebp, ebx, esi, edi`) and on the teacher's aarch64 `cpu_switch_to`/
//! `task_entry_trampoline` idiom: a hand-written `global_asm!` routine, an
//! `unsafe extern "C"` forward declaration, and a small Rust trampoline that
//! runs after the very first switch into a freshly spawned thread.
//!
//! `context_switch(old_esp: *mut usize, new_esp: usize)` pushes the four
//! callee-saved registers onto the running thread's own stack, stashes the
//! resulting `esp` through `old_esp`, loads `esp` from `new_esp`, then pops
//! the same four registers back off — of whichever stack `esp` now points
//! into — and returns. [`crate::thread::ThreadTable::spawn`] primes a new
//! thread's stack with exactly this layout (return address, then four
//! zeroed slots) so the first switch into it pops a well-formed frame and
//! falls straight into [`trampoline`].

use core::arch::global_asm;

unsafe extern "C" {
    /// # Safety
    /// `old_esp` must point at a valid, exclusively-owned `usize` slot to
    /// receive the outgoing stack pointer; `new_esp` must be a stack pointer
    /// previously saved by this same routine, or one freshly primed by
    /// [`crate::thread::ThreadTable::spawn`].
    pub(crate) fn context_switch(old_esp: *mut usize, new_esp: usize);
}

global_asm!(
    ".global context_switch",
    "context_switch:",
    "push ebp",
    "push ebx",
    "push esi",
    "push edi",
    "mov eax, [esp + 20]", // old_esp (return addr + 4 pushes = 20 bytes in)
    "mov [eax], esp",
    "mov eax, [esp + 24]", // new_esp
    "mov esp, eax",
    "pop edi",
    "pop esi",
    "pop ebx",
    "pop ebp",
    "ret",
);

/// Entry point every freshly spawned thread's primed stack returns into.
/// Looks up the now-current thread's entry function and argument, runs it,
/// and exits the thread if it returns.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn trampoline() -> ! {
    crate::run_current_thread()
}
