//! Environment representation and lookup.
//!
//! An environment is a pair `(frame . parent)`. A frame is itself a list of
//! `(symbol . value)` bindings, newest first. `define` always mutates the
//! head frame in place — closures and nested scopes that already hold a
//! `CellRef` to this environment see the new binding immediately, which is
//! exactly what makes internal definitions and top-level redefinition work.

use crate::cell::CellData;
use crate::platform::PlatformPort;
use crate::{CellRef, Runtime};

impl<P: PlatformPort, const HEAP: usize, const ROOTS: usize, const SYMBUF: usize, const STRBUF: usize>
    Runtime<P, HEAP, ROOTS, SYMBUF, STRBUF>
{
    /// Build a fresh environment extending `parent` with an empty frame.
    pub fn new_env(&mut self, parent: CellRef) -> CellRef {
        self.cons(CellRef::NIL, parent)
    }

    /// Prepend `(sym . val)` onto `env`'s head frame, mutating `env` in
    /// place so every existing reference observes the new binding.
    pub fn define(&mut self, env: CellRef, sym: CellRef, val: CellRef) {
        self.heap.push_root(env);
        self.heap.push_root(sym);
        self.heap.push_root(val);
        let binding = self.cons(sym, val);
        self.heap.push_root(binding);
        let old_frame = match *self.heap.get(env) {
            CellData::Pair { car, .. } => car,
            _ => self.platform.panic("malformed environment"),
        };
        let parent = match *self.heap.get(env) {
            CellData::Pair { cdr, .. } => cdr,
            _ => self.platform.panic("malformed environment"),
        };
        self.heap.push_root(old_frame);
        let new_frame = self.cons(binding, old_frame);
        self.heap.set(env, CellData::Pair { car: new_frame, cdr: parent });
        self.heap.pop_roots(5);
    }

    /// Walk `env`'s frame chain outward, returning the value bound to `sym`
    /// in the innermost frame that binds it.
    ///
    /// # Panics
    /// Panics through `PlatformPort::panic` if `sym` is unbound anywhere in
    /// the chain (spec.md: referencing an unbound symbol is fatal).
    pub fn lookup(&mut self, env: CellRef, sym: CellRef) -> CellRef {
        let mut cur_env = env;
        loop {
            let (frame, parent) = match *self.heap.get(cur_env) {
                CellData::Pair { car, cdr } => (car, cdr),
                _ => self.platform.panic("malformed environment"),
            };
            let mut binding = frame;
            loop {
                match *self.heap.get(binding) {
                    CellData::Nil => break,
                    CellData::Pair { car, cdr } => {
                        if let CellData::Pair { car: bound_sym, cdr: bound_val } = *self.heap.get(car) {
                            if bound_sym == sym {
                                return bound_val;
                            }
                        }
                        binding = cdr;
                    }
                    _ => self.platform.panic("malformed frame"),
                }
            }
            if parent == CellRef::NIL {
                self.platform.panic("unbound symbol");
            }
            cur_env = parent;
        }
    }

    /// Mutate the nearest existing binding for `sym` in place.
    ///
    /// # Panics
    /// Panics through `PlatformPort::panic` if `sym` is unbound anywhere in
    /// the chain (spec.md: `set!` on an unbound symbol is fatal).
    pub fn set_bang(&mut self, env: CellRef, sym: CellRef, val: CellRef) {
        let mut cur_env = env;
        loop {
            let (frame, parent) = match *self.heap.get(cur_env) {
                CellData::Pair { car, cdr } => (car, cdr),
                _ => self.platform.panic("malformed environment"),
            };
            let mut binding = frame;
            loop {
                match *self.heap.get(binding) {
                    CellData::Nil => break,
                    CellData::Pair { car, cdr } => {
                        if let CellData::Pair { car: bound_sym, .. } = *self.heap.get(car) {
                            if bound_sym == sym {
                                self.heap.set(car, CellData::Pair { car: bound_sym, cdr: val });
                                return;
                            }
                        }
                        binding = cdr;
                    }
                    _ => self.platform.panic("malformed frame"),
                }
            }
            if parent == CellRef::NIL {
                self.platform.panic("unbound symbol");
            }
            cur_env = parent;
        }
    }
}
