#![no_std]

//! A self-contained Scheme-dialect runtime: reader, evaluator, cell heap
//! with tracing garbage collection, symbol interning, string arena,
//! environment chain, closures, and a sandboxed foreign-call surface.
//!
//! The runtime knows nothing about the machine it runs on; every side
//! effect goes through [`platform::PlatformPort`]. A cooperative scheduler
//! (see the sibling `los_scheduler` crate) is the only thing that decides
//! when one runtime instance's evaluation is paused in favor of another's.

pub mod arena;
pub mod cell;
pub mod env;
pub mod eval;
pub mod heap;
pub mod platform;
pub mod primitives;
pub mod reader;
pub mod symtab;

use arena::Arena;
use cell::{CellData, CellRef};
use heap::CellHeap;
use platform::PlatformPort;

/// Default cell-heap capacity, matching the retrieved original
/// implementation's `static Cell heap[4096]` sizing.
pub const DEFAULT_HEAP_CELLS: usize = 4096;
/// Default root-stack depth; spec.md requires at least 256.
pub const DEFAULT_ROOT_DEPTH: usize = 256;
/// Default symbol-arena capacity, matching the retrieved original's
/// `static char sym_buf[8192]`.
pub const DEFAULT_SYMBOL_ARENA: usize = 8192;
/// Default string-arena capacity, matching the host harness's `str_buf`.
pub const DEFAULT_STRING_ARENA: usize = 8192;

/// A single Scheme runtime instance: its own heap, arenas, environment and
/// platform. Two runtime instances share no mutable state; cooperative
/// threads each own one.
pub struct Runtime<
    P: PlatformPort,
    const HEAP: usize = DEFAULT_HEAP_CELLS,
    const ROOTS: usize = DEFAULT_ROOT_DEPTH,
    const SYMBUF: usize = DEFAULT_SYMBOL_ARENA,
    const STRBUF: usize = DEFAULT_STRING_ARENA,
> {
    pub(crate) heap: CellHeap<HEAP, ROOTS>,
    pub(crate) symbols: Arena<SYMBUF>,
    pub(crate) strings: Arena<STRBUF>,
    /// Head of the cons-list of interned SYMBOL cells; NIL when empty.
    pub(crate) interned: CellRef,
    pub(crate) global_env: CellRef,
    pub platform: P,
}

impl<P: PlatformPort, const HEAP: usize, const ROOTS: usize, const SYMBUF: usize, const STRBUF: usize>
    Runtime<P, HEAP, ROOTS, SYMBUF, STRBUF>
{
    /// Construct a runtime with an empty global environment and every
    /// primitive in [`primitives`] bound.
    pub fn new(platform: P) -> Self {
        let mut rt = Self {
            heap: CellHeap::new(),
            symbols: Arena::new(),
            strings: Arena::new(),
            interned: CellRef::NIL,
            global_env: CellRef::NIL,
            platform,
        };
        // global env = (frame=NIL . parent=NIL)
        rt.global_env = rt.alloc(CellData::Pair {
            car: CellRef::NIL,
            cdr: CellRef::NIL,
        });
        primitives::bind_all(&mut rt);
        log::trace!("scheme runtime initialized: {HEAP} cells, {SYMBUF}B symbol arena, {STRBUF}B string arena");
        rt
    }

    #[must_use]
    pub fn global_env(&self) -> CellRef {
        self.global_env
    }

    /// Allocate a cell, collecting first if the free list is exhausted.
    /// Diverges through `PlatformPort::panic` if the heap is still full
    /// after a collection — spec.md's "out of memory" fatal error.
    pub fn alloc(&mut self, data: CellData) -> CellRef {
        if let Some(r) = self.heap.try_alloc(data) {
            return r;
        }
        self.heap.collect(&[self.global_env, self.interned]);
        match self.heap.try_alloc(data) {
            Some(r) => r,
            None => self.platform.panic("out of memory"),
        }
    }

    #[must_use]
    pub fn get(&self, r: CellRef) -> &CellData {
        self.heap.get(r)
    }

    pub fn cons(&mut self, car: CellRef, cdr: CellRef) -> CellRef {
        self.heap.push_root(car);
        self.heap.push_root(cdr);
        let r = self.alloc(CellData::Pair { car, cdr });
        self.heap.pop_roots(2);
        r
    }

    #[must_use]
    pub fn make_int(&mut self, v: i32) -> CellRef {
        self.alloc(CellData::Int(v))
    }

    #[must_use]
    pub fn make_char(&mut self, c: u8) -> CellRef {
        self.alloc(CellData::Char(c))
    }

    #[must_use]
    pub const fn bool_cell(v: bool) -> CellRef {
        if v {
            CellRef::TRUE
        } else {
            CellRef::FALSE
        }
    }

    /// Is `r` anything other than the singleton `#f`? (spec.md: "only the
    /// singleton false counts as false in conditionals.")
    #[must_use]
    pub fn is_truthy(&self, r: CellRef) -> bool {
        r != CellRef::FALSE
    }

    /// Copy a string's bytes into the string arena and return a STRING cell.
    pub fn make_string(&mut self, bytes: &[u8]) -> CellRef {
        let offset = match self.strings.alloc(bytes) {
            Some(o) => o,
            None => self.platform.panic("string buffer full"),
        };
        self.alloc(CellData::Str {
            offset,
            len: bytes.len() as u32,
        })
    }

    #[must_use]
    pub fn string_bytes(&self, r: CellRef) -> &[u8] {
        match *self.get(r) {
            CellData::Str { offset, len } => self.strings.get(offset, len),
            _ => &[],
        }
    }

    #[must_use]
    pub fn symbol_bytes(&self, r: CellRef) -> &[u8] {
        match *self.get(r) {
            CellData::Symbol { offset, len } => self.symbols.get(offset, len),
            _ => &[],
        }
    }

    /// Parse every top-level form in `src` and evaluate each in the global
    /// environment in order. Returns the number of forms evaluated
    /// (`eval-string`'s contract).
    pub fn eval_string(&mut self, src: &str) -> i32 {
        let env = self.global_env;
        self.eval_forms(src, env)
    }

    pub(crate) fn eval_forms(&mut self, src: &str, env: CellRef) -> i32 {
        let mut reader = reader::Reader::new(src.as_bytes());
        let mut count = 0i32;
        while let Some(expr) = self.read_expr(&mut reader) {
            self.heap.push_root(expr);
            let _ = self.eval(expr, env);
            self.heap.pop_roots(1);
            count += 1;
        }
        count
    }

    /// Output a byte through the platform.
    pub fn putc(&mut self, c: u8) {
        self.platform.putc(c);
    }

    pub fn display(&mut self, r: CellRef) {
        write_display(self, r);
    }
}

/// `display`'s rendering of a cell to the console, shared by the `display`
/// primitive and any future pretty-printer.
fn write_display<P: PlatformPort, const HEAP: usize, const ROOTS: usize, const SYMBUF: usize, const STRBUF: usize>(
    rt: &mut Runtime<P, HEAP, ROOTS, SYMBUF, STRBUF>,
    r: CellRef,
) {
    match *rt.get(r) {
        CellData::Nil => write_str(rt, "()"),
        CellData::Bool(true) => write_str(rt, "#t"),
        CellData::Bool(false) => write_str(rt, "#f"),
        CellData::Int(v) => write_int(rt, v),
        CellData::Char(c) => rt.putc(c),
        CellData::Str { offset, len } => {
            let mut buf = [0u8; 256];
            let n = (len as usize).min(buf.len());
            buf[..n].copy_from_slice(&rt.strings.get(offset, n as u32)[..n]);
            for &b in &buf[..n] {
                rt.putc(b);
            }
        }
        CellData::Symbol { .. } => {
            let mut buf = [0u8; 256];
            let bytes = rt.symbol_bytes(r);
            let n = bytes.len().min(buf.len());
            buf[..n].copy_from_slice(&bytes[..n]);
            for &b in &buf[..n] {
                rt.putc(b);
            }
        }
        CellData::Pair { car, cdr } => {
            write_str(rt, "(");
            write_display(rt, car);
            write_display_tail(rt, cdr);
            write_str(rt, ")");
        }
        CellData::Primitive(_) => write_str(rt, "#<primitive>"),
        CellData::Closure { .. } => write_str(rt, "#<closure>"),
        CellData::Free { .. } => write_str(rt, "#<free-cell>"),
    }
}

fn write_display_tail<P: PlatformPort, const HEAP: usize, const ROOTS: usize, const SYMBUF: usize, const STRBUF: usize>(
    rt: &mut Runtime<P, HEAP, ROOTS, SYMBUF, STRBUF>,
    r: CellRef,
) {
    match *rt.get(r) {
        CellData::Nil => {}
        CellData::Pair { car, cdr } => {
            write_str(rt, " ");
            write_display(rt, car);
            write_display_tail(rt, cdr);
        }
        _ => {
            write_str(rt, " . ");
            write_display(rt, r);
        }
    }
}

fn write_str<P: PlatformPort, const HEAP: usize, const ROOTS: usize, const SYMBUF: usize, const STRBUF: usize>(
    rt: &mut Runtime<P, HEAP, ROOTS, SYMBUF, STRBUF>,
    s: &str,
) {
    for b in s.bytes() {
        rt.putc(b);
    }
}

fn write_int<P: PlatformPort, const HEAP: usize, const ROOTS: usize, const SYMBUF: usize, const STRBUF: usize>(
    rt: &mut Runtime<P, HEAP, ROOTS, SYMBUF, STRBUF>,
    value: i32,
) {
    let mut buf = [0u8; 11];
    let mut i = buf.len();
    let negative = value < 0;
    // i32::MIN negation overflows; widen to i64 for the digit loop.
    let mut v: i64 = i64::from(value).abs();
    if v == 0 {
        rt.putc(b'0');
        return;
    }
    while v > 0 {
        i -= 1;
        buf[i] = b'0' + (v % 10) as u8;
        v /= 10;
    }
    if negative {
        rt.putc(b'-');
    }
    for &b in &buf[i..] {
        rt.putc(b);
    }
}

#[cfg(test)]
mod tests {
    use crate::platform::mock::MockPlatform;
    use crate::Runtime;

    fn new_rt(disk: &mut [u8]) -> Runtime<MockPlatform<'_>> {
        Runtime::new(MockPlatform::new(b"", disk))
    }

    #[test]
    fn displays_sum_of_two_integers() {
        let mut disk = [0u8; 16];
        let mut rt = new_rt(&mut disk);
        rt.eval_string("(display (+ 1 2))");
        assert_eq!(rt.platform.output(), b"3");
    }

    #[test]
    fn factorial_via_recursive_named_function() {
        let mut disk = [0u8; 16];
        let mut rt = new_rt(&mut disk);
        rt.eval_string(
            "(define (fact n) (if (< n 2) 1 (* n (fact (- n 1))))) (display (fact 5))",
        );
        assert_eq!(rt.platform.output(), b"120");
    }

    #[test]
    fn displays_string_literal() {
        let mut disk = [0u8; 16];
        let mut rt = new_rt(&mut disk);
        rt.eval_string("(display \"hi\")");
        assert_eq!(rt.platform.output(), b"hi");
    }

    #[test]
    fn string_ref_yields_a_character() {
        let mut disk = [0u8; 16];
        let mut rt = new_rt(&mut disk);
        rt.eval_string("(display (string-ref \"abc\" 1))");
        assert_eq!(rt.platform.output(), b"b");
    }

    #[test]
    fn lambda_closes_over_its_defining_environment() {
        let mut disk = [0u8; 16];
        let mut rt = new_rt(&mut disk);
        rt.eval_string(
            "(define (make-adder n) (lambda (x) (+ x n))) (define add5 (make-adder 5)) (display (add5 10))",
        );
        assert_eq!(rt.platform.output(), b"15");
    }

    #[test]
    fn set_bang_mutates_enclosing_binding() {
        let mut disk = [0u8; 16];
        let mut rt = new_rt(&mut disk);
        rt.eval_string("(define x 1) (set! x 2) (display x)");
        assert_eq!(rt.platform.output(), b"2");
    }

    #[test]
    fn quote_prevents_evaluation() {
        let mut disk = [0u8; 16];
        let mut rt = new_rt(&mut disk);
        // `undefined-symbol` is never bound; if `quote` evaluated its
        // argument this would panic on an unbound-symbol lookup instead.
        rt.eval_string("(display (pair? '(undefined-symbol)))");
        assert_eq!(rt.platform.output(), b"#t");
    }

    #[test]
    fn eval_string_runs_in_the_global_environment() {
        let mut disk = [0u8; 16];
        let mut rt = new_rt(&mut disk);
        rt.eval_string("(define y 41) (eval-string \"(define z (+ y 1))\") (display z)");
        assert_eq!(rt.platform.output(), b"42");
    }

    #[test]
    #[should_panic(expected = "unbound symbol")]
    fn eval_scoped_does_not_leak_into_global_environment() {
        let mut disk = [0u8; 16];
        let mut rt = new_rt(&mut disk);
        // `leaked` is only defined inside eval-scoped's fresh environment;
        // referencing it from the global scope afterward must be fatal.
        rt.eval_string("(eval-scoped '() \"(define leaked 1)\") (display leaked)");
    }

    #[test]
    fn garbage_collection_reclaims_unreachable_intermediate_pairs() {
        let mut disk = [0u8; 16];
        let mut rt = new_rt(&mut disk);
        // Each iteration allocates a discarded pair plus call-frame
        // bookkeeping; with the default 4096-cell heap this churns through
        // many times that many cells across the whole loop, so it can only
        // run to completion if collection is reclaiming the garbage.
        rt.eval_string(
            "(define (loop n) (if (< n 1) 0 (begin (cons n n) (loop (- n 1))))) (display (loop 3000))",
        );
        assert_eq!(rt.platform.output(), b"0");
    }

    #[test]
    fn disk_roundtrip_through_primitives() {
        let mut disk = [0u8; 16];
        let mut rt = new_rt(&mut disk);
        rt.eval_string("(disk-write-bytes 0 (list-alloc 3)) (display (disk-read-byte 1))");
        assert_eq!(rt.platform.output(), b"1");
    }
}
