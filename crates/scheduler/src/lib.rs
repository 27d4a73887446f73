#![cfg_attr(not(feature = "std"), no_std)]

//! Cooperative, non-preemptive round-robin scheduler over a fixed table of
//! kernel threads.
//!
//! Every Scheme runtime instance runs on its own thread here; threads share
//! no mutable state of their own (each owns its cell heap, arenas, and
//! environment independently) and interact only through [`los_hal`]'s
//! console and block-device surfaces, serialized by the fact that only one
//! thread ever runs at a time. The only asynchronous actor is the timer
//! ISR, whose entire job is [`tick`] followed by a PIC end-of-interrupt.
//!
//! Suspension only happens at three points: an explicit [`yield_now`], a
//! [`sleep`], or a thread returning from its entry function (which calls
//! [`exit`] on its behalf). Between those points all scheduler and
//! evaluator state is untouched, so nothing outside this crate needs to
//! reason about reentrancy.

mod context;
mod thread;

pub use thread::{ThreadFn, ThreadState, MAX_THREADS, STACK_SIZE};

use los_hal::IrqSafeLock;
use thread::ThreadTable;

static SCHEDULER: IrqSafeLock<ThreadTable> = IrqSafeLock::new(ThreadTable::new());

/// Reset the thread table. Thread 0 (the boot thread, already running on
/// whatever stack got it here) becomes RUNNABLE with no saved state. Must
/// run once before any other entry point in this crate.
pub fn init() {
    SCHEDULER.lock().init();
}

/// Hand `entry`/`arg` to a free slot and mark it RUNNABLE. Returns the new
/// thread's id, or -1 if the table is full.
pub fn spawn(entry: ThreadFn, arg: usize) -> i32 {
    let id = SCHEDULER.lock().spawn(entry, arg, context::trampoline as usize);
    if id >= 0 {
        log::trace!("scheduler: spawned thread {id}");
    } else {
        log::debug!("scheduler: spawn failed, thread table full");
    }
    id
}

/// Round-robin search from `current + 1` for a RUNNABLE thread; switches to
/// it, or returns immediately if none but the caller itself qualifies.
pub fn yield_now() {
    let switch = SCHEDULER.lock().prepare_switch();
    // SAFETY: both pointers come from the live, single-owner thread table;
    // the lock above is dropped before the switch so the next thread to run
    // can acquire it again without deadlocking against itself.
    if let Some((old_esp, new_esp)) = switch {
        unsafe { context::context_switch(old_esp, new_esp) };
    }
}

/// Mark the current thread SLEEPING for `ticks` timer ticks, then yield.
pub fn sleep(ticks: u32) {
    SCHEDULER.lock().mark_sleeping(ticks);
    yield_now();
}

/// Timer ISR hook: decrement every sleeping thread's countdown, waking
/// those that reach zero, then acknowledge the interrupt on the PIC. Never
/// touches the Scheme heap or any environment — the ISR only ever runs
/// between suspension points, so this is the one piece of scheduler state
/// genuinely written from an asynchronous context.
pub fn tick() {
    SCHEDULER.lock().tick();
    los_hal::pic::send_eoi();
}

/// Number of non-UNUSED threads, excluding the boot thread.
pub fn active_count() -> usize {
    SCHEDULER.lock().active_count()
}

/// Terminate the current thread. Never returns: either a switch to another
/// runnable thread succeeds, or (only the boot thread can reach this with
/// nothing else runnable) the call spins forever on the now-abandoned stack.
pub fn exit() -> ! {
    let switch = {
        let mut table = SCHEDULER.lock();
        table.mark_current_unused();
        table.prepare_switch()
    };
    if let Some((old_esp, new_esp)) = switch {
        // SAFETY: see `yield_now`; this thread's own `esp` slot is never
        // read again once its slot is UNUSED, so overwriting it here is fine.
        unsafe { context::context_switch(old_esp, new_esp) };
    }
    loop {
        core::hint::spin_loop();
    }
}

/// Run the now-current thread's entry function, then exit it. Called only
/// from [`context::trampoline`], itself only reached via the very first
/// `context_switch` into a freshly spawned thread.
fn run_current_thread() -> ! {
    let (entry, arg) = SCHEDULER.lock().current_entry();
    if let Some(f) = entry {
        f(arg);
    }
    exit()
}

#[cfg(all(test, feature = "std"))]
mod tests {
    use super::*;
    use core::sync::atomic::{AtomicUsize, Ordering};

    static CALLS: AtomicUsize = AtomicUsize::new(0);

    extern "C" fn bump(_arg: usize) {
        CALLS.fetch_add(1, Ordering::SeqCst);
    }

    #[test]
    fn spawn_reports_handle_and_active_count() {
        init();
        let before = active_count();
        let id = spawn(bump, 0);
        assert!(id >= 0);
        assert_eq!(active_count(), before + 1);
    }
}
