//! Fixed thread table: one slot per cooperative thread, its saved stack
//! pointer, and its private stack storage.
//!
//! Slot 0 is the boot thread: it never gets a stack of its own here (it is
//! already running on whatever stack the kernel booted on) and is always
//! RUNNABLE once [`ThreadTable::init`] has run.

/// Capacity of the thread table. spec.md requires M >= 2; 8 mirrors the
/// retrieved `thread.c`'s `MAX_THREADS`.
pub const MAX_THREADS: usize = 8;

/// Bytes of private stack given to each spawned thread (slot 0 excluded).
pub const STACK_SIZE: usize = 4096;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ThreadState {
    Unused,
    Runnable,
    Sleeping,
}

/// Entry point for a spawned thread. Receives the `arg` passed to `spawn`.
pub type ThreadFn = extern "C" fn(usize);

#[derive(Clone, Copy)]
struct Slot {
    esp: usize,
    state: ThreadState,
    sleep_ticks: u32,
    entry: Option<ThreadFn>,
    arg: usize,
}

impl Slot {
    const fn empty() -> Self {
        Self {
            esp: 0,
            state: ThreadState::Unused,
            sleep_ticks: 0,
            entry: None,
            arg: 0,
        }
    }
}

pub(crate) struct ThreadTable {
    slots: [Slot; MAX_THREADS],
    stacks: [[u8; STACK_SIZE]; MAX_THREADS],
    current: usize,
}

impl ThreadTable {
    pub const fn new() -> Self {
        Self {
            slots: [Slot::empty(); MAX_THREADS],
            stacks: [[0u8; STACK_SIZE]; MAX_THREADS],
            current: 0,
        }
    }

    pub fn init(&mut self) {
        for slot in &mut self.slots {
            *slot = Slot::empty();
        }
        self.slots[0].state = ThreadState::Runnable;
        self.current = 0;
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn current_entry(&self) -> (Option<ThreadFn>, usize) {
        let slot = &self.slots[self.current];
        (slot.entry, slot.arg)
    }

    /// Prime a fresh stack frame for slot `i` so the first `context_switch`
    /// into it pops a well-formed callee-saved frame and lands in
    /// `trampoline`. Mirrors `thread_spawn`'s push order exactly: return
    /// address, then zeroed ebp/ebx/esi/edi — the same order
    /// `context_switch` saves them in, so the two are interchangeable.
    pub fn spawn(&mut self, entry: ThreadFn, arg: usize, trampoline: usize) -> i32 {
        for i in 1..MAX_THREADS {
            if self.slots[i].state == ThreadState::Unused {
                // SAFETY: `stack_top` starts one-past-the-end of slot i's own
                // stack array and only ever moves backward within it before
                // any word is written.
                let stack_top = unsafe { self.stacks[i].as_mut_ptr().add(STACK_SIZE) } as *mut usize;
                let word = |offset: isize| unsafe { stack_top.offset(offset) };
                unsafe {
                    *word(-1) = trampoline; // return address
                    *word(-2) = 0; // ebp
                    *word(-3) = 0; // ebx
                    *word(-4) = 0; // esi
                    *word(-5) = 0; // edi
                }
                self.slots[i] = Slot {
                    esp: word(-5) as usize,
                    state: ThreadState::Runnable,
                    sleep_ticks: 0,
                    entry: Some(entry),
                    arg,
                };
                return i as i32;
            }
        }
        -1
    }

    /// Round-robin search from `current + 1`, matching the retrieved
    /// `thread.c`'s `schedule_next`.
    fn next_runnable(&self) -> Option<usize> {
        let mut next = self.current;
        for _ in 0..MAX_THREADS {
            next = (next + 1) % MAX_THREADS;
            if self.slots[next].state == ThreadState::Runnable {
                return Some(next);
            }
        }
        None
    }

    /// Pick the next runnable thread and mark it current. Returns the raw
    /// (old_esp slot, new esp value) pair to hand to `context_switch`, or
    /// `None` when there is nothing to switch to (no other runnable thread,
    /// or the current thread is still the only runnable one).
    pub fn prepare_switch(&mut self) -> Option<(*mut usize, usize)> {
        let next = self.next_runnable()?;
        if next == self.current {
            return None;
        }
        let prev = self.current;
        self.current = next;
        let old_esp_ptr = core::ptr::addr_of_mut!(self.slots[prev].esp);
        let new_esp = self.slots[next].esp;
        Some((old_esp_ptr, new_esp))
    }

    pub fn mark_sleeping(&mut self, ticks: u32) {
        let slot = &mut self.slots[self.current];
        slot.sleep_ticks = ticks;
        slot.state = ThreadState::Sleeping;
    }

    pub fn mark_current_unused(&mut self) {
        self.slots[self.current].state = ThreadState::Unused;
    }

    /// Called from the timer ISR: decrement every sleeping thread's
    /// countdown, waking those that reach zero.
    pub fn tick(&mut self) {
        for slot in &mut self.slots {
            if slot.state == ThreadState::Sleeping && slot.sleep_ticks > 0 {
                slot.sleep_ticks -= 1;
                if slot.sleep_ticks == 0 {
                    slot.state = ThreadState::Runnable;
                }
            }
        }
    }

    /// Non-UNUSED threads excluding the boot thread (slot 0).
    pub fn active_count(&self) -> usize {
        self.slots[1..]
            .iter()
            .filter(|slot| slot.state != ThreadState::Unused)
            .count()
    }
}

#[cfg(all(test, feature = "std"))]
mod tests {
    use super::*;

    extern "C" fn noop(_arg: usize) {}

    #[test]
    fn init_leaves_only_boot_thread_runnable() {
        let mut table = ThreadTable::new();
        table.init();
        assert_eq!(table.current_index(), 0);
        assert_eq!(table.active_count(), 0);
    }

    #[test]
    fn spawn_fills_first_free_slot_and_reports_active_count() {
        let mut table = ThreadTable::new();
        table.init();
        let a = table.spawn(noop, 1, 0x1000);
        let b = table.spawn(noop, 2, 0x1000);
        assert_eq!(a, 1);
        assert_eq!(b, 2);
        assert_eq!(table.active_count(), 2);
    }

    #[test]
    fn spawn_returns_negative_one_when_table_is_full() {
        let mut table = ThreadTable::new();
        table.init();
        for _ in 1..MAX_THREADS {
            assert!(table.spawn(noop, 0, 0x1000) >= 0);
        }
        assert_eq!(table.spawn(noop, 0, 0x1000), -1);
    }

    #[test]
    fn round_robin_visits_every_runnable_thread_before_repeating() {
        let mut table = ThreadTable::new();
        table.init();
        table.spawn(noop, 0, 0x1000);
        table.spawn(noop, 0, 0x1000);

        let mut seen = [0usize; 3];
        for slot in &mut seen {
            let (_, new_esp) = table.prepare_switch().expect("another runnable thread");
            *slot = table.current_index();
            let _ = new_esp;
        }
        assert_eq!(seen, [1, 2, 0]);
    }

    #[test]
    fn yield_with_no_other_runnable_thread_is_a_no_op() {
        let mut table = ThreadTable::new();
        table.init();
        assert!(table.prepare_switch().is_none());
        assert_eq!(table.current_index(), 0);
    }

    #[test]
    fn sleeping_thread_wakes_after_its_tick_countdown_reaches_zero() {
        let mut table = ThreadTable::new();
        table.init();
        table.mark_current_unused(); // park the boot thread so it never wins the race
        table.spawn(noop, 0, 0x1000); // slot 1
        table.spawn(noop, 0, 0x1000); // slot 2
        table.prepare_switch(); // -> thread 1
        assert_eq!(table.current_index(), 1);

        table.mark_sleeping(2);
        table.prepare_switch(); // thread 1 asleep, thread 2 picks up
        assert_eq!(table.current_index(), 2);

        table.tick();
        assert_eq!(table.current_index(), 2); // still asleep after one tick
        table.tick();
        let next = table.prepare_switch();
        assert!(next.is_some());
        assert_eq!(table.current_index(), 1, "thread 1 should be runnable again once its countdown elapsed");
    }

    #[test]
    fn exiting_a_thread_frees_its_slot_for_reuse() {
        let mut table = ThreadTable::new();
        table.init();
        table.spawn(noop, 0, 0x1000);
        table.prepare_switch(); // move onto thread 1
        table.mark_current_unused();
        assert_eq!(table.active_count(), 0);
        assert_eq!(table.spawn(noop, 0, 0x1000), 1);
    }
}
