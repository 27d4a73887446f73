//! Backing store for `spawn-thread`.
//!
//! The Scheme primitive hands the host a borrowed source string that only
//! lives as long as the spawning thread's own Scheme heap keeps it alive;
//! this kernel has no allocator to copy it onto, so it copies the bytes
//! into one of a fixed pool of program buffers instead, then hands the new
//! scheduler thread the buffer's index as its `arg`. Each pool slot also
//! backs one spawned thread's own runtime instance, smaller than the boot
//! thread's (these are meant for small cooperative workers, not another
//! full interpreter).

use core::ptr::addr_of_mut;
use core::sync::atomic::{AtomicBool, Ordering};

use los_hal::IrqSafeLock;
use los_scheduler::MAX_THREADS;
use los_scheme::Runtime;

use crate::platform::KernelPlatform;

/// Longest program `spawn-thread` can hand off.
const MAX_PROGRAM_LEN: usize = 2048;

const SPAWNED_HEAP_CELLS: usize = 512;
const SPAWNED_ROOTS: usize = 64;
const SPAWNED_SYMBUF: usize = 2048;
const SPAWNED_STRBUF: usize = 2048;

type SpawnedRuntime =
    Runtime<KernelPlatform, SPAWNED_HEAP_CELLS, SPAWNED_ROOTS, SPAWNED_SYMBUF, SPAWNED_STRBUF>;

struct ProgramSlot {
    bytes: [u8; MAX_PROGRAM_LEN],
    len: usize,
}

impl ProgramSlot {
    const fn empty() -> Self {
        Self {
            bytes: [0; MAX_PROGRAM_LEN],
            len: 0,
        }
    }
}

static BUSY: [AtomicBool; MAX_THREADS] = [const { AtomicBool::new(false) }; MAX_THREADS];
static PROGRAMS: [IrqSafeLock<ProgramSlot>; MAX_THREADS] =
    [const { IrqSafeLock::new(ProgramSlot::empty()) }; MAX_THREADS];

/// One runtime per pool slot. Touched only through a raw pointer from
/// within [`thread_entry`]; see the safety note there for why that's sound.
static mut RUNTIMES: [Option<SpawnedRuntime>; MAX_THREADS] =
    [None, None, None, None, None, None, None, None];

/// Claim a free pool slot, copy `code`'s bytes into it, and ask the
/// scheduler for a thread to run it. Returns the new thread's id, or -1 if
/// `code` is too long, no pool slot is free, or the thread table is full.
pub fn spawn(code: &str) -> i32 {
    if code.len() > MAX_PROGRAM_LEN {
        return -1;
    }

    for index in 0..MAX_THREADS {
        if BUSY[index]
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            {
                let mut slot = PROGRAMS[index].lock();
                slot.bytes[..code.len()].copy_from_slice(code.as_bytes());
                slot.len = code.len();
            }

            let id = los_scheduler::spawn(thread_entry, index);
            if id < 0 {
                BUSY[index].store(false, Ordering::Release);
            }
            return id;
        }
    }
    -1
}

extern "C" fn thread_entry(slot_index: usize) {
    let (len, bytes) = {
        let slot = PROGRAMS[slot_index].lock();
        (slot.len, slot.bytes)
    };

    // SAFETY: `BUSY[slot_index]` stays `true` for this whole call (cleared
    // only below, just before returning), and `spawn` never hands the same
    // index to a second thread while it's held. Cooperative scheduling
    // means at most one thread body ever executes at a time, so this is
    // the only code touching `RUNTIMES[slot_index]` for the duration.
    let rt_slot = unsafe { &mut *addr_of_mut!(RUNTIMES[slot_index]) };
    *rt_slot = Some(Runtime::new(KernelPlatform::new()));

    let program = core::str::from_utf8(&bytes[..len]).unwrap_or("");
    rt_slot
        .as_mut()
        .expect("just constructed above")
        .eval_string(program);

    *rt_slot = None;
    BUSY[slot_index].store(false, Ordering::Release);
}
