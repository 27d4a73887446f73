//! Fixed-capacity cell pool with a free-list allocator and a tracing
//! mark-and-sweep collector.
//!
//! Grounded on the allocation discipline spec.md calls "the primary
//! invariant that shapes the evaluator": any live cell an operation still
//! needs across a subsequent allocation must be pinned on the root stack
//! first. [`RootGuard`] makes that discipline structurally hard to miss by
//! popping itself on drop, the same shape as `hal`'s `IrqSafeLockGuard`
//! restoring interrupts on drop.

use crate::cell::{Cell, CellData, CellRef};

/// Minimum root-stack depth spec.md requires ("depth is bounded (≥256)").
pub const MIN_ROOT_STACK_DEPTH: usize = 256;

/// Fixed-capacity pool of `N` cells (including the 3 reserved singleton
/// slots) with a free-list threaded through [`CellData::Free`] and a
/// bounded root stack of depth `R`.
pub struct CellHeap<const N: usize, const R: usize = MIN_ROOT_STACK_DEPTH> {
    slots: [Cell; N],
    free_head: Option<CellRef>,
    root_stack: [CellRef; R],
    root_top: usize,
}

impl<const N: usize, const R: usize> CellHeap<N, R> {
    /// Builds a fresh heap: singleton slots populated, every remaining slot
    /// threaded onto the free list from high index to low (so the first
    /// `alloc()` returns the lowest free index, matching the source's
    /// ascending free-list construction).
    #[must_use]
    pub fn new() -> Self {
        assert!(N > CellRef::FIRST_HEAP_INDEX as usize, "heap too small");
        assert!(R >= MIN_ROOT_STACK_DEPTH, "root stack too shallow");

        let mut slots = [Cell::free(None); N];
        slots[CellRef::NIL.index()] = Cell {
            data: CellData::Nil,
            mark: false,
        };
        slots[CellRef::TRUE.index()] = Cell {
            data: CellData::Bool(true),
            mark: false,
        };
        slots[CellRef::FALSE.index()] = Cell {
            data: CellData::Bool(false),
            mark: false,
        };

        let mut free_head: Option<CellRef> = None;
        for idx in (CellRef::FIRST_HEAP_INDEX as usize..N).rev() {
            slots[idx] = Cell::free(free_head);
            free_head = Some(CellRef(idx as u32));
        }

        Self {
            slots,
            free_head,
            root_stack: [CellRef::NIL; R],
            root_top: 0,
        }
    }

    /// Total capacity, singleton slots included.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        N
    }

    #[must_use]
    pub fn get(&self, r: CellRef) -> &CellData {
        &self.slots[r.index()].data
    }

    pub fn set(&mut self, r: CellRef, data: CellData) {
        self.slots[r.index()].data = data;
    }

    /// Pop `n` cells pinned by a prior call to `push_root` (or `push_roots`).
    ///
    /// # Panics
    /// Panics on underflow: popping more than was pushed is a programmer
    /// error in the evaluator/reader/primitive that owns the matching push.
    pub fn pop_roots(&mut self, n: usize) {
        assert!(n <= self.root_top, "root stack underflow");
        self.root_top -= n;
    }

    /// Push one cell onto the root stack.
    ///
    /// # Panics
    /// Panics on overflow; callers past the bounded depth have a bug, not a
    /// recoverable condition (matches spec.md: "Underflow or overflow is a
    /// panic").
    pub fn push_root(&mut self, cell: CellRef) {
        assert!(self.root_top < R, "root stack overflow");
        self.root_stack[self.root_top] = cell;
        self.root_top += 1;
    }

    /// RAII wrapper around `push_root`/`pop_roots(1)` for the common case of
    /// pinning one intermediate across a scope (Design Notes: "wrap roots in
    /// a scope-guard that pushes on construction and pops on drop").
    pub fn with_root(&mut self, cell: CellRef) -> RootGuard<'_, N, R> {
        self.push_root(cell);
        RootGuard { heap: self }
    }

    /// Attempt to allocate without triggering a collection. `None` means the
    /// free list is exhausted; the caller decides whether to collect and
    /// retry or treat it as fatal.
    pub fn try_alloc(&mut self, data: CellData) -> Option<CellRef> {
        let idx = self.free_head?;
        let next = match self.slots[idx.index()].data {
            CellData::Free { next } => next,
            _ => None, // defensive: free_head always points at a Free cell
        };
        self.free_head = next;
        self.slots[idx.index()] = Cell { data, mark: false };
        Some(idx)
    }

    /// Mark-and-sweep collection. `extra_roots` carries whatever the caller
    /// holds outside the root stack proper: the global environment, the
    /// current (innermost) environment, and the interned-symbol list.
    pub fn collect(&mut self, extra_roots: &[CellRef]) {
        for i in 0..self.root_top {
            self.mark(self.root_stack[i]);
        }
        for &r in extra_roots {
            self.mark(r);
        }

        self.free_head = None;
        for idx in (CellRef::FIRST_HEAP_INDEX as usize..N).rev() {
            let slot = &mut self.slots[idx];
            if slot.mark {
                slot.mark = false;
            } else {
                *slot = Cell::free(self.free_head);
                self.free_head = Some(CellRef(idx as u32));
            }
        }
    }

    fn mark(&mut self, r: CellRef) {
        if r.is_singleton() {
            return;
        }
        let slot = &mut self.slots[r.index()];
        if slot.mark {
            return;
        }
        slot.mark = true;
        match slot.data {
            CellData::Pair { car, cdr } => {
                self.mark(car);
                self.mark(cdr);
            }
            CellData::Closure { params, body, env } => {
                self.mark(params);
                self.mark(body);
                self.mark(env);
            }
            _ => {}
        }
    }

    /// Number of cells currently on the free list. Test-only visibility
    /// (exercising the invariant in §8 directly needs this).
    #[cfg(test)]
    pub(crate) fn free_count(&self) -> usize {
        let mut count = 0;
        let mut cur = self.free_head;
        while let Some(r) = cur {
            count += 1;
            cur = match self.slots[r.index()].data {
                CellData::Free { next } => next,
                _ => None,
            };
        }
        count
    }
}

impl<const N: usize, const R: usize> Default for CellHeap<N, R> {
    fn default() -> Self {
        Self::new()
    }
}

/// Scope guard returned by [`CellHeap::with_root`]; pops its one root on drop.
pub struct RootGuard<'a, const N: usize, const R: usize> {
    heap: &'a mut CellHeap<N, R>,
}

impl<const N: usize, const R: usize> core::ops::Drop for RootGuard<'_, N, R> {
    fn drop(&mut self) {
        self.heap.pop_roots(1);
    }
}

impl<const N: usize, const R: usize> core::ops::Deref for RootGuard<'_, N, R> {
    type Target = CellHeap<N, R>;
    fn deref(&self) -> &Self::Target {
        self.heap
    }
}

impl<const N: usize, const R: usize> core::ops::DerefMut for RootGuard<'_, N, R> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.heap
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn singletons_are_reserved_and_distinct() {
        let heap: CellHeap<64> = CellHeap::new();
        assert!(matches!(heap.get(CellRef::NIL), CellData::Nil));
        assert!(matches!(heap.get(CellRef::TRUE), CellData::Bool(true)));
        assert!(matches!(heap.get(CellRef::FALSE), CellData::Bool(false)));
    }

    #[test]
    fn alloc_returns_distinct_cells_until_exhausted() {
        let mut heap: CellHeap<8> = CellHeap::new();
        // capacity 8, 3 reserved -> 5 allocatable
        let mut seen = [CellRef::NIL; 5];
        for (i, slot) in seen.iter_mut().enumerate() {
            *slot = heap
                .try_alloc(CellData::Int(i as i32))
                .expect("should have room");
        }
        assert!(heap.try_alloc(CellData::Int(99)).is_none());
        // all distinct
        for i in 0..seen.len() {
            for j in 0..seen.len() {
                if i != j {
                    assert_ne!(seen[i], seen[j]);
                }
            }
        }
    }

    #[test]
    fn collect_reclaims_unreachable_cells() {
        let mut heap: CellHeap<16> = CellHeap::new();
        let a = heap.try_alloc(CellData::Int(1)).unwrap();
        let _b = heap.try_alloc(CellData::Int(2)).unwrap();
        let before = heap.free_count();
        // only `a` is rooted; `_b` is garbage.
        heap.collect(&[a]);
        assert!(matches!(heap.get(a), CellData::Int(1)));
        assert_eq!(heap.free_count(), before + 1);
        // the freed slot should be available again
        let reused = heap.try_alloc(CellData::Int(3)).unwrap();
        assert!(matches!(heap.get(reused), CellData::Int(3)));
    }

    #[test]
    fn collect_traces_pairs_and_closures() {
        let mut heap: CellHeap<16> = CellHeap::new();
        let inner = heap.try_alloc(CellData::Int(42)).unwrap();
        let pair = heap
            .try_alloc(CellData::Pair {
                car: inner,
                cdr: CellRef::NIL,
            })
            .unwrap();
        heap.collect(&[pair]);
        assert!(matches!(heap.get(inner), CellData::Int(42)));
    }

    #[test]
    fn root_stack_guard_pins_across_collect() {
        let mut heap: CellHeap<16> = CellHeap::new();
        let kept = heap.try_alloc(CellData::Int(7)).unwrap();
        {
            let mut guard = heap.with_root(kept);
            let _garbage = guard.try_alloc(CellData::Int(999)).unwrap();
            guard.collect(&[]);
            assert!(matches!(guard.get(kept), CellData::Int(7)));
        }
    }

    #[test]
    #[should_panic(expected = "root stack overflow")]
    fn root_stack_overflow_panics() {
        let mut heap: CellHeap<512, 256> = CellHeap::new();
        for _ in 0..257 {
            heap.push_root(CellRef::NIL);
        }
    }

    #[test]
    #[should_panic(expected = "root stack underflow")]
    fn root_stack_underflow_panics() {
        let mut heap: CellHeap<64> = CellHeap::new();
        heap.pop_roots(1);
    }
}
