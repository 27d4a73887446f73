#![cfg_attr(not(feature = "std"), no_std)]

//! Hardware-abstraction layer for the i386 target this kernel boots on:
//! a 16550 UART, the 8253/8254 PIT, the 8259 PIC, and the handful of
//! CPU instructions needed to mask interrupts around a critical section.
//!
//! Every module that issues raw port I/O is split into a `real_impl`
//! (inline `asm!`) and a `mock_impl` (records operations for host-side
//! tests), selected by the `std` feature, so the drivers get real unit
//! test coverage without booting real hardware.

pub mod console;
pub mod cpu;
pub mod interrupts;
pub mod pic;
pub mod pit;
pub mod serial;

use core::mem::ManuallyDrop;
use los_utils::{Mutex, MutexGuard};

/// IRQ-safe lock that disables interrupts while held.
/// Behaviors: [L1]-[L4] interrupt-safe locking
pub struct IrqSafeLock<T> {
    inner: Mutex<T>,
}

impl<T> IrqSafeLock<T> {
    pub const fn new(data: T) -> Self {
        Self {
            inner: Mutex::new(data),
        }
    }

    /// [L1] Disables interrupts before acquiring, [L4] data accessible through guard
    pub fn lock(&self) -> IrqSafeLockGuard<'_, T> {
        let state = interrupts::disable(); // [L1] disable before acquire
        let guard = self.inner.lock();
        IrqSafeLockGuard {
            guard: ManuallyDrop::new(guard), // [L4] data access
            state,
        }
    }

    /// Try to acquire the lock without blocking. Disables interrupts before
    /// attempting to acquire; restores them immediately on failure.
    pub fn try_lock(&self) -> Option<IrqSafeLockGuard<'_, T>> {
        let state = interrupts::disable();
        if let Some(guard) = self.inner.try_lock() {
            Some(IrqSafeLockGuard {
                guard: ManuallyDrop::new(guard),
                state,
            })
        } else {
            interrupts::restore(state);
            None
        }
    }
}

pub struct IrqSafeLockGuard<'a, T> {
    guard: ManuallyDrop<MutexGuard<'a, T>>,
    state: bool,
}

impl<T> core::ops::Deref for IrqSafeLockGuard<'_, T> {
    type Target = T;
    fn deref(&self) -> &T {
        &self.guard
    }
}

impl<T> core::ops::DerefMut for IrqSafeLockGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.guard
    }
}

impl<T> Drop for IrqSafeLockGuard<'_, T> {
    /// [L2] Restores interrupts after releasing
    fn drop(&mut self) {
        // SAFETY: guard is only dropped once, here in Drop, before restoring interrupts
        unsafe { ManuallyDrop::drop(&mut self.guard) };
        interrupts::restore(self.state); // [L2] restore on drop
    }
}

#[cfg(all(test, feature = "std"))]
mod tests {
    use super::*;

    /// Tests: [L1] disable before acquire, [L2] restore after release, [L4] data access
    #[test]
    fn test_irq_safe_lock_behavior() {
        let lock = IrqSafeLock::new(10);

        assert!(interrupts::is_enabled());

        {
            let mut guard = lock.lock(); // [L1] disables interrupts
            assert_eq!(*guard, 10); // [L4] read access
            *guard = 20; // [L4] write access

            assert!(!interrupts::is_enabled());
        } // [L2] restore on drop

        assert!(interrupts::is_enabled());
        assert_eq!(*lock.lock(), 20);
    }

    /// Tests: [L3] nested locks work correctly
    #[test]
    fn test_irq_safe_lock_nested() {
        let lock1 = IrqSafeLock::new(1);
        let lock2 = IrqSafeLock::new(2);

        assert!(interrupts::is_enabled());
        {
            let _g1 = lock1.lock(); // [L3] first lock
            assert!(!interrupts::is_enabled());
            {
                let _g2 = lock2.lock(); // [L3] nested lock
                assert!(!interrupts::is_enabled());
            }
            assert!(!interrupts::is_enabled()); // [L3] still disabled after inner drop
        }
        assert!(interrupts::is_enabled());
    }
}
