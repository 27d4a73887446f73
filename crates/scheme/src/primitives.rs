//! The primitive procedure table: every built-in `(display)`, `(+)`,
//! `(disk-read-byte)`, ... style call bottoms out here.
//!
//! Each primitive is a plain function over an already-evaluated argument
//! list. Type mismatches are fatal, consistent with every other runtime
//! error in this system — a Scheme program that calls `(car 5)` halts the
//! machine the same way an unbound symbol does, there is no exception
//! handling layer to catch it.

use crate::cell::{type_name, CellData, PrimId};
use crate::platform::PlatformPort;
use crate::{CellRef, Runtime};

macro_rules! prim_ids {
    ($($name:ident = $id:expr => $sym:expr),* $(,)?) => {
        $(pub const $name: PrimId = PrimId($id);)*

        const NAMES: &[(PrimId, &[u8])] = &[
            $(($name, $sym)),*
        ];
    };
}

prim_ids! {
    ADD = 0 => b"+",
    SUB = 1 => b"-",
    MUL = 2 => b"*",
    LT = 3 => b"<",
    NUM_EQ = 4 => b"=",
    QUOTIENT = 5 => b"quotient",
    MODULO = 6 => b"modulo",
    CONS = 7 => b"cons",
    CAR = 8 => b"car",
    CDR = 9 => b"cdr",
    NULL_P = 10 => b"null?",
    PAIR_P = 11 => b"pair?",
    EQ_P = 12 => b"eq?",
    STRING_LENGTH = 13 => b"string-length",
    STRING_REF = 14 => b"string-ref",
    STRING_EQ_P = 15 => b"string=?",
    CHAR_EQ_P = 16 => b"char=?",
    CHAR_TO_INT = 17 => b"char->int",
    INT_TO_CHAR = 18 => b"int->char",
    LIST_ALLOC = 19 => b"list-alloc",
    LIST_TO_STRING = 20 => b"list->string",
    EVAL_STRING = 21 => b"eval-string",
    EVAL_SCOPED = 22 => b"eval-scoped",
    DISK_READ_BYTE = 23 => b"disk-read-byte",
    DISK_READ_BYTES = 24 => b"disk-read-bytes",
    DISK_READ_CSTRING = 25 => b"disk-read-cstring",
    DISK_SIZE = 26 => b"disk-size",
    DISK_WRITE_BYTES = 27 => b"disk-write-bytes",
    READ_CHAR = 28 => b"read-char",
    SPAWN_THREAD = 29 => b"spawn-thread",
    YIELD = 30 => b"yield",
    DISPLAY = 31 => b"display",
    NEWLINE = 32 => b"newline",
    FOREIGN_CALL = 33 => b"foreign-call",
}

impl<P: PlatformPort, const HEAP: usize, const ROOTS: usize, const SYMBUF: usize, const STRBUF: usize>
    Runtime<P, HEAP, ROOTS, SYMBUF, STRBUF>
{
    /// Intern every primitive's name and bind it to a `Primitive` cell in
    /// the global environment. Called once by [`Runtime::new`].
    pub(crate) fn bind_all_primitives(&mut self) {
        for &(id, name) in NAMES {
            let sym = self.intern(name);
            self.heap.push_root(sym);
            let cell = self.alloc(CellData::Primitive(id));
            let env = self.global_env;
            self.define(env, sym, cell);
            self.heap.pop_roots(1);
        }
    }

}

/// Entry point called by [`crate::eval`]'s application logic.
pub(crate) fn call<P: PlatformPort, const HEAP: usize, const ROOTS: usize, const SYMBUF: usize, const STRBUF: usize>(
    rt: &mut Runtime<P, HEAP, ROOTS, SYMBUF, STRBUF>,
    id: PrimId,
    args: CellRef,
) -> CellRef {
    match id {
        ADD => arith(rt, args, 0, |a, b| a.wrapping_add(b)),
        SUB => arith_sub(rt, args),
        MUL => arith(rt, args, 1, |a, b| a.wrapping_mul(b)),
        LT => compare(rt, args, |a, b| a < b),
        NUM_EQ => compare(rt, args, |a, b| a == b),
        QUOTIENT => prim_quotient(rt, args),
        MODULO => prim_modulo(rt, args),
        CONS => prim_cons(rt, args),
        CAR => prim_car(rt, args),
        CDR => prim_cdr(rt, args),
        NULL_P => prim_null_p(rt, args),
        PAIR_P => prim_pair_p(rt, args),
        EQ_P => prim_eq_p(rt, args),
        STRING_LENGTH => prim_string_length(rt, args),
        STRING_REF => prim_string_ref(rt, args),
        STRING_EQ_P => prim_string_eq_p(rt, args),
        CHAR_EQ_P => prim_char_eq_p(rt, args),
        CHAR_TO_INT => prim_char_to_int(rt, args),
        INT_TO_CHAR => prim_int_to_char(rt, args),
        LIST_ALLOC => prim_list_alloc(rt, args),
        LIST_TO_STRING => prim_list_to_string(rt, args),
        EVAL_STRING => prim_eval_string(rt, args),
        EVAL_SCOPED => prim_eval_scoped(rt, args),
        DISK_READ_BYTE => prim_disk_read_byte(rt, args),
        DISK_READ_BYTES => prim_disk_read_bytes(rt, args),
        DISK_READ_CSTRING => prim_disk_read_cstring(rt, args),
        DISK_SIZE => prim_disk_size(rt, args),
        DISK_WRITE_BYTES => prim_disk_write_bytes(rt, args),
        READ_CHAR => prim_read_char(rt, args),
        SPAWN_THREAD => prim_spawn_thread(rt, args),
        YIELD => prim_yield(rt, args),
        DISPLAY => prim_display(rt, args),
        NEWLINE => prim_newline(rt, args),
        FOREIGN_CALL => prim_foreign_call(rt, args),
        _ => rt.platform.panic("unknown primitive"),
    }
}

/// Bind every primitive name; called once from [`Runtime::new`].
pub(crate) fn bind_all<P: PlatformPort, const HEAP: usize, const ROOTS: usize, const SYMBUF: usize, const STRBUF: usize>(
    rt: &mut Runtime<P, HEAP, ROOTS, SYMBUF, STRBUF>,
) {
    rt.bind_all_primitives();
}

fn int_of<P: PlatformPort, const HEAP: usize, const ROOTS: usize, const SYMBUF: usize, const STRBUF: usize>(
    rt: &mut Runtime<P, HEAP, ROOTS, SYMBUF, STRBUF>,
    r: CellRef,
) -> i32 {
    match *rt.get(r) {
        CellData::Int(v) => v,
        other => {
            let t = type_name(&other);
            rt.platform.panic(concat_type_error("int", t))
        }
    }
}

fn char_of<P: PlatformPort, const HEAP: usize, const ROOTS: usize, const SYMBUF: usize, const STRBUF: usize>(
    rt: &mut Runtime<P, HEAP, ROOTS, SYMBUF, STRBUF>,
    r: CellRef,
) -> u8 {
    match *rt.get(r) {
        CellData::Char(c) => c,
        other => {
            let t = type_name(&other);
            rt.platform.panic(concat_type_error("char", t))
        }
    }
}

/// Builds a small `'static`-ish message. Without `alloc`, error messages
/// are a fixed set of string constants rather than formatted text; this
/// picks the closest matching constant instead of interpolating.
fn concat_type_error(expected: &'static str, _got: &'static str) -> &'static str {
    match expected {
        "int" => "expected an integer argument",
        "char" => "expected a character argument",
        "string" => "expected a string argument",
        "pair" => "expected a pair argument",
        _ => "primitive argument type mismatch",
    }
}

fn two_ints<P: PlatformPort, const HEAP: usize, const ROOTS: usize, const SYMBUF: usize, const STRBUF: usize>(
    rt: &mut Runtime<P, HEAP, ROOTS, SYMBUF, STRBUF>,
    args: CellRef,
    what: &'static str,
) -> (i32, i32) {
    let mut buf = [CellRef::NIL; 2];
    let n = rt.list_to_array(args, &mut buf);
    if n != 2 {
        rt.platform.panic(what);
    }
    (int_of(rt, buf[0]), int_of(rt, buf[1]))
}

fn prim_quotient<P: PlatformPort, const HEAP: usize, const ROOTS: usize, const SYMBUF: usize, const STRBUF: usize>(
    rt: &mut Runtime<P, HEAP, ROOTS, SYMBUF, STRBUF>,
    args: CellRef,
) -> CellRef {
    let (a, b) = two_ints(rt, args, "quotient requires exactly two arguments");
    if b == 0 {
        rt.platform.panic("division by zero");
    }
    rt.make_int(a / b)
}

fn prim_modulo<P: PlatformPort, const HEAP: usize, const ROOTS: usize, const SYMBUF: usize, const STRBUF: usize>(
    rt: &mut Runtime<P, HEAP, ROOTS, SYMBUF, STRBUF>,
    args: CellRef,
) -> CellRef {
    let (a, b) = two_ints(rt, args, "modulo requires exactly two arguments");
    if b == 0 {
        rt.platform.panic("division by zero");
    }
    rt.make_int(a.rem_euclid(b))
}

fn arith<P: PlatformPort, const HEAP: usize, const ROOTS: usize, const SYMBUF: usize, const STRBUF: usize>(
    rt: &mut Runtime<P, HEAP, ROOTS, SYMBUF, STRBUF>,
    args: CellRef,
    identity: i32,
    op: fn(i32, i32) -> i32,
) -> CellRef {
    let mut acc = identity;
    let mut cur = args;
    loop {
        match *rt.get(cur) {
            CellData::Nil => break,
            CellData::Pair { car, cdr } => {
                acc = op(acc, int_of(rt, car));
                cur = cdr;
            }
            _ => rt.platform.panic("malformed argument list"),
        }
    }
    rt.make_int(acc)
}

/// `-` is variadic with special-casing for exactly one argument (unary
/// negation), matching spec.md's richer description of arithmetic.
fn arith_sub<P: PlatformPort, const HEAP: usize, const ROOTS: usize, const SYMBUF: usize, const STRBUF: usize>(
    rt: &mut Runtime<P, HEAP, ROOTS, SYMBUF, STRBUF>,
    args: CellRef,
) -> CellRef {
    let (first, rest) = match *rt.get(args) {
        CellData::Pair { car, cdr } => (car, cdr),
        _ => rt.platform.panic("(-) requires at least one argument"),
    };
    let first_val = int_of(rt, first);
    if matches!(*rt.get(rest), CellData::Nil) {
        return rt.make_int(-first_val);
    }
    let mut acc = first_val;
    let mut cur = rest;
    loop {
        match *rt.get(cur) {
            CellData::Nil => break,
            CellData::Pair { car, cdr } => {
                acc = acc.wrapping_sub(int_of(rt, car));
                cur = cdr;
            }
            _ => rt.platform.panic("malformed argument list"),
        }
    }
    rt.make_int(acc)
}

/// Variadic chained comparison: `(< a b c)` is `a < b && b < c`.
fn compare<P: PlatformPort, const HEAP: usize, const ROOTS: usize, const SYMBUF: usize, const STRBUF: usize>(
    rt: &mut Runtime<P, HEAP, ROOTS, SYMBUF, STRBUF>,
    args: CellRef,
    op: fn(i32, i32) -> bool,
) -> CellRef {
    let mut cur = args;
    let mut prev: Option<i32> = None;
    let mut ok = true;
    loop {
        match *rt.get(cur) {
            CellData::Nil => break,
            CellData::Pair { car, cdr } => {
                let v = int_of(rt, car);
                if let Some(p) = prev {
                    if !op(p, v) {
                        ok = false;
                    }
                }
                prev = Some(v);
                cur = cdr;
            }
            _ => rt.platform.panic("malformed argument list"),
        }
    }
    Runtime::<P, HEAP, ROOTS, SYMBUF, STRBUF>::bool_cell(ok)
}

fn prim_cons<P: PlatformPort, const HEAP: usize, const ROOTS: usize, const SYMBUF: usize, const STRBUF: usize>(
    rt: &mut Runtime<P, HEAP, ROOTS, SYMBUF, STRBUF>,
    args: CellRef,
) -> CellRef {
    let mut buf = [CellRef::NIL; 2];
    let n = rt.list_to_array(args, &mut buf);
    if n != 2 {
        rt.platform.panic("cons requires exactly two arguments");
    }
    rt.cons(buf[0], buf[1])
}

fn prim_car<P: PlatformPort, const HEAP: usize, const ROOTS: usize, const SYMBUF: usize, const STRBUF: usize>(
    rt: &mut Runtime<P, HEAP, ROOTS, SYMBUF, STRBUF>,
    args: CellRef,
) -> CellRef {
    let pair = first_arg(rt, args);
    match *rt.get(pair) {
        CellData::Pair { car, .. } => car,
        _ => rt.platform.panic("car requires a pair"),
    }
}

fn prim_cdr<P: PlatformPort, const HEAP: usize, const ROOTS: usize, const SYMBUF: usize, const STRBUF: usize>(
    rt: &mut Runtime<P, HEAP, ROOTS, SYMBUF, STRBUF>,
    args: CellRef,
) -> CellRef {
    let pair = first_arg(rt, args);
    match *rt.get(pair) {
        CellData::Pair { cdr, .. } => cdr,
        _ => rt.platform.panic("cdr requires a pair"),
    }
}

fn first_arg<P: PlatformPort, const HEAP: usize, const ROOTS: usize, const SYMBUF: usize, const STRBUF: usize>(
    rt: &mut Runtime<P, HEAP, ROOTS, SYMBUF, STRBUF>,
    args: CellRef,
) -> CellRef {
    match *rt.get(args) {
        CellData::Pair { car, .. } => car,
        _ => rt.platform.panic("expected at least one argument"),
    }
}

fn prim_null_p<P: PlatformPort, const HEAP: usize, const ROOTS: usize, const SYMBUF: usize, const STRBUF: usize>(
    rt: &mut Runtime<P, HEAP, ROOTS, SYMBUF, STRBUF>,
    args: CellRef,
) -> CellRef {
    let v = first_arg(rt, args);
    Runtime::<P, HEAP, ROOTS, SYMBUF, STRBUF>::bool_cell(v == CellRef::NIL)
}

fn prim_pair_p<P: PlatformPort, const HEAP: usize, const ROOTS: usize, const SYMBUF: usize, const STRBUF: usize>(
    rt: &mut Runtime<P, HEAP, ROOTS, SYMBUF, STRBUF>,
    args: CellRef,
) -> CellRef {
    let v = first_arg(rt, args);
    let is_pair = matches!(*rt.get(v), CellData::Pair { .. });
    Runtime::<P, HEAP, ROOTS, SYMBUF, STRBUF>::bool_cell(is_pair)
}

/// Identity comparison on `CellRef` — two cells are `eq?` iff they are the
/// same heap slot (or the same immediate small value, which singletons and
/// interned symbols already guarantee).
fn prim_eq_p<P: PlatformPort, const HEAP: usize, const ROOTS: usize, const SYMBUF: usize, const STRBUF: usize>(
    rt: &mut Runtime<P, HEAP, ROOTS, SYMBUF, STRBUF>,
    args: CellRef,
) -> CellRef {
    let mut buf = [CellRef::NIL; 2];
    let n = rt.list_to_array(args, &mut buf);
    if n != 2 {
        rt.platform.panic("eq? requires exactly two arguments");
    }
    Runtime::<P, HEAP, ROOTS, SYMBUF, STRBUF>::bool_cell(buf[0] == buf[1])
}

fn prim_string_length<P: PlatformPort, const HEAP: usize, const ROOTS: usize, const SYMBUF: usize, const STRBUF: usize>(
    rt: &mut Runtime<P, HEAP, ROOTS, SYMBUF, STRBUF>,
    args: CellRef,
) -> CellRef {
    let s = first_arg(rt, args);
    let len = match *rt.get(s) {
        CellData::Str { len, .. } => len as i32,
        _ => rt.platform.panic("string-length requires a string"),
    };
    rt.make_int(len)
}

fn prim_string_ref<P: PlatformPort, const HEAP: usize, const ROOTS: usize, const SYMBUF: usize, const STRBUF: usize>(
    rt: &mut Runtime<P, HEAP, ROOTS, SYMBUF, STRBUF>,
    args: CellRef,
) -> CellRef {
    let mut buf = [CellRef::NIL; 2];
    let n = rt.list_to_array(args, &mut buf);
    if n != 2 {
        rt.platform.panic("string-ref requires exactly two arguments");
    }
    let (offset, len) = match *rt.get(buf[0]) {
        CellData::Str { offset, len } => (offset, len),
        _ => rt.platform.panic("string-ref requires a string"),
    };
    let idx = int_of(rt, buf[1]);
    if idx < 0 || idx as u32 >= len {
        rt.platform.panic("string-ref index out of range");
    }
    let byte = rt.strings.get(offset, len)[idx as usize];
    rt.make_char(byte)
}

fn prim_string_eq_p<P: PlatformPort, const HEAP: usize, const ROOTS: usize, const SYMBUF: usize, const STRBUF: usize>(
    rt: &mut Runtime<P, HEAP, ROOTS, SYMBUF, STRBUF>,
    args: CellRef,
) -> CellRef {
    let mut buf = [CellRef::NIL; 2];
    let n = rt.list_to_array(args, &mut buf);
    if n != 2 {
        rt.platform.panic("string=? requires exactly two arguments");
    }
    let a = rt.string_bytes(buf[0]);
    let b = rt.string_bytes(buf[1]);
    Runtime::<P, HEAP, ROOTS, SYMBUF, STRBUF>::bool_cell(a == b)
}

fn prim_char_eq_p<P: PlatformPort, const HEAP: usize, const ROOTS: usize, const SYMBUF: usize, const STRBUF: usize>(
    rt: &mut Runtime<P, HEAP, ROOTS, SYMBUF, STRBUF>,
    args: CellRef,
) -> CellRef {
    let mut buf = [CellRef::NIL; 2];
    let n = rt.list_to_array(args, &mut buf);
    if n != 2 {
        rt.platform.panic("char=? requires exactly two arguments");
    }
    let a = char_of(rt, buf[0]);
    let b = char_of(rt, buf[1]);
    Runtime::<P, HEAP, ROOTS, SYMBUF, STRBUF>::bool_cell(a == b)
}

fn prim_char_to_int<P: PlatformPort, const HEAP: usize, const ROOTS: usize, const SYMBUF: usize, const STRBUF: usize>(
    rt: &mut Runtime<P, HEAP, ROOTS, SYMBUF, STRBUF>,
    args: CellRef,
) -> CellRef {
    let c = first_arg(rt, args);
    let v = char_of(rt, c);
    rt.make_int(i32::from(v))
}

fn prim_int_to_char<P: PlatformPort, const HEAP: usize, const ROOTS: usize, const SYMBUF: usize, const STRBUF: usize>(
    rt: &mut Runtime<P, HEAP, ROOTS, SYMBUF, STRBUF>,
    args: CellRef,
) -> CellRef {
    let i = first_arg(rt, args);
    let v = int_of(rt, i);
    if !(0..=255).contains(&v) {
        rt.platform.panic("int->char value out of byte range");
    }
    rt.make_char(v as u8)
}

/// `(list-alloc n)`: a fresh proper list `(0 1 … n-1)`.
fn prim_list_alloc<P: PlatformPort, const HEAP: usize, const ROOTS: usize, const SYMBUF: usize, const STRBUF: usize>(
    rt: &mut Runtime<P, HEAP, ROOTS, SYMBUF, STRBUF>,
    args: CellRef,
) -> CellRef {
    let n_cell = first_arg(rt, args);
    let count = int_of(rt, n_cell);
    if count < 0 {
        rt.platform.panic("list-alloc: negative length");
    }
    let mut list = CellRef::NIL;
    for i in (0..count).rev() {
        rt.heap.push_root(list);
        let val = rt.make_int(i);
        rt.heap.push_root(val);
        list = rt.cons(val, list);
        rt.heap.pop_roots(2);
    }
    list
}

/// `(list->string lst)`: every element must be a `CHAR`.
fn prim_list_to_string<P: PlatformPort, const HEAP: usize, const ROOTS: usize, const SYMBUF: usize, const STRBUF: usize>(
    rt: &mut Runtime<P, HEAP, ROOTS, SYMBUF, STRBUF>,
    args: CellRef,
) -> CellRef {
    let list = first_arg(rt, args);
    let mut bytes = [0u8; 256];
    let mut n = 0;
    let mut cur = list;
    loop {
        match *rt.get(cur) {
            CellData::Nil => break,
            CellData::Pair { car, cdr } => {
                if n >= bytes.len() {
                    rt.platform.panic("list->string: list too long");
                }
                bytes[n] = char_of(rt, car);
                n += 1;
                cur = cdr;
            }
            _ => rt.platform.panic("list->string requires a proper list"),
        }
    }
    rt.make_string(&bytes[..n])
}

/// `(eval-string src)`: parse and evaluate every top-level form of `src` in
/// the global environment, returning the number of forms evaluated.
fn prim_eval_string<P: PlatformPort, const HEAP: usize, const ROOTS: usize, const SYMBUF: usize, const STRBUF: usize>(
    rt: &mut Runtime<P, HEAP, ROOTS, SYMBUF, STRBUF>,
    args: CellRef,
) -> CellRef {
    let s = first_arg(rt, args);
    let bytes = rt.string_bytes(s);
    let mut local = [0u8; 512];
    let n = bytes.len().min(local.len());
    local[..n].copy_from_slice(&bytes[..n]);
    let src = core::str::from_utf8(&local[..n]).unwrap_or("");
    let env = rt.global_env;
    let count = rt.eval_forms(src, env);
    rt.make_int(count)
}

/// `(eval-scoped alist src)`: parse and evaluate `src` in a fresh
/// environment extending the global one, pre-populated from `alist` (a
/// list of `(symbol . value)` pairs). Values are taken verbatim, never
/// evaluated — the caller is expected to have already evaluated them, the
/// same contract the source's sandboxed-eval callers rely on.
fn prim_eval_scoped<P: PlatformPort, const HEAP: usize, const ROOTS: usize, const SYMBUF: usize, const STRBUF: usize>(
    rt: &mut Runtime<P, HEAP, ROOTS, SYMBUF, STRBUF>,
    args: CellRef,
) -> CellRef {
    let alist = first_arg(rt, args);
    let code = match *rt.get(args) {
        CellData::Pair { cdr, .. } => match *rt.get(cdr) {
            CellData::Pair { car, .. } => car,
            _ => rt.platform.panic("eval-scoped requires exactly two arguments"),
        },
        _ => rt.platform.panic("eval-scoped requires exactly two arguments"),
    };

    let bytes = rt.string_bytes(code);
    let mut local = [0u8; 512];
    let n = bytes.len().min(local.len());
    local[..n].copy_from_slice(&bytes[..n]);
    let src = core::str::from_utf8(&local[..n]).unwrap_or("");

    let global = rt.global_env;
    let scope = rt.new_env(global);
    rt.heap.push_root(scope);
    rt.heap.push_root(alist);
    let mut cur = alist;
    loop {
        match *rt.get(cur) {
            CellData::Nil => break,
            CellData::Pair { car: binding, cdr: rest } => {
                let (sym, val) = match *rt.get(binding) {
                    CellData::Pair { car, cdr } => (car, cdr),
                    _ => rt.platform.panic("eval-scoped: invalid binding"),
                };
                if !matches!(*rt.get(sym), CellData::Symbol { .. }) {
                    rt.platform.panic("eval-scoped: binding name must be a symbol");
                }
                rt.define(scope, sym, val);
                cur = rest;
            }
            _ => rt.platform.panic("eval-scoped: malformed binding list"),
        }
    }
    rt.heap.pop_roots(1); // alist
    let count = rt.eval_forms(src, scope);
    rt.heap.pop_roots(1); // scope
    rt.make_int(count)
}

fn prim_disk_read_byte<P: PlatformPort, const HEAP: usize, const ROOTS: usize, const SYMBUF: usize, const STRBUF: usize>(
    rt: &mut Runtime<P, HEAP, ROOTS, SYMBUF, STRBUF>,
    args: CellRef,
) -> CellRef {
    let offset = int_of(rt, first_arg(rt, args));
    let v = rt.platform.read_byte(i64::from(offset));
    rt.make_int(v)
}

/// `(disk-read-bytes offset count)`: returns a freshly allocated list of
/// `count` integers, one per byte.
fn prim_disk_read_bytes<P: PlatformPort, const HEAP: usize, const ROOTS: usize, const SYMBUF: usize, const STRBUF: usize>(
    rt: &mut Runtime<P, HEAP, ROOTS, SYMBUF, STRBUF>,
    args: CellRef,
) -> CellRef {
    let mut buf = [CellRef::NIL; 2];
    let n = rt.list_to_array(args, &mut buf);
    if n != 2 {
        rt.platform.panic("disk-read-bytes requires exactly two arguments");
    }
    let offset = int_of(rt, buf[0]);
    let count = int_of(rt, buf[1]);
    if count < 0 {
        rt.platform.panic("disk-read-bytes count must be non-negative");
    }
    let mut list = CellRef::NIL;
    rt.heap.push_root(list);
    for i in (0..count).rev() {
        let byte = rt.platform.read_byte(i64::from(offset) + i64::from(i));
        rt.heap.pop_roots(1);
        let cell = rt.make_int(byte);
        rt.heap.push_root(cell);
        list = rt.cons(cell, list);
        rt.heap.pop_roots(1);
        rt.heap.push_root(list);
    }
    rt.heap.pop_roots(1);
    list
}

/// `(disk-read-cstring offset)`: reads bytes until a NUL or disk end,
/// returning a freshly allocated STRING cell.
fn prim_disk_read_cstring<P: PlatformPort, const HEAP: usize, const ROOTS: usize, const SYMBUF: usize, const STRBUF: usize>(
    rt: &mut Runtime<P, HEAP, ROOTS, SYMBUF, STRBUF>,
    args: CellRef,
) -> CellRef {
    let offset = int_of(rt, first_arg(rt, args));
    let mut bytes = [0u8; 256];
    let mut n = 0;
    let size = rt.platform.disk_size();
    let mut pos = i64::from(offset);
    while pos < size && n < bytes.len() {
        let b = rt.platform.read_byte(pos);
        if b <= 0 {
            break;
        }
        bytes[n] = b as u8;
        n += 1;
        pos += 1;
    }
    rt.make_string(&bytes[..n])
}

fn prim_disk_size<P: PlatformPort, const HEAP: usize, const ROOTS: usize, const SYMBUF: usize, const STRBUF: usize>(
    rt: &mut Runtime<P, HEAP, ROOTS, SYMBUF, STRBUF>,
    _args: CellRef,
) -> CellRef {
    let size = rt.platform.disk_size();
    rt.make_int(size as i32)
}

/// `(disk-write-bytes offset lst)`: writes every element of `lst` (each
/// must be an integer `0..=255`) starting at `offset`; returns the number
/// of bytes actually written.
fn prim_disk_write_bytes<P: PlatformPort, const HEAP: usize, const ROOTS: usize, const SYMBUF: usize, const STRBUF: usize>(
    rt: &mut Runtime<P, HEAP, ROOTS, SYMBUF, STRBUF>,
    args: CellRef,
) -> CellRef {
    let mut buf = [CellRef::NIL; 2];
    let n = rt.list_to_array(args, &mut buf);
    if n != 2 {
        rt.platform.panic("disk-write-bytes requires exactly two arguments");
    }
    let offset = int_of(rt, buf[0]);
    let mut bytes = [0u8; 256];
    let mut count = 0;
    let mut cur = buf[1];
    loop {
        match *rt.get(cur) {
            CellData::Nil => break,
            CellData::Pair { car, cdr } => {
                if count >= bytes.len() {
                    rt.platform.panic("disk-write-bytes: list too long");
                }
                let v = int_of(rt, car);
                if !(0..=255).contains(&v) {
                    rt.platform.panic("disk-write-bytes: value out of byte range");
                }
                bytes[count] = v as u8;
                count += 1;
                cur = cdr;
            }
            _ => rt.platform.panic("disk-write-bytes requires a proper list"),
        }
    }
    let written = rt.platform.write_bytes(i64::from(offset), &bytes[..count]);
    rt.make_int(written as i32)
}

fn prim_read_char<P: PlatformPort, const HEAP: usize, const ROOTS: usize, const SYMBUF: usize, const STRBUF: usize>(
    rt: &mut Runtime<P, HEAP, ROOTS, SYMBUF, STRBUF>,
    _args: CellRef,
) -> CellRef {
    let c = rt.platform.read_char();
    rt.make_char(c)
}

/// `(spawn-thread src)`: hand a copy of `src`'s bytes to the platform.
fn prim_spawn_thread<P: PlatformPort, const HEAP: usize, const ROOTS: usize, const SYMBUF: usize, const STRBUF: usize>(
    rt: &mut Runtime<P, HEAP, ROOTS, SYMBUF, STRBUF>,
    args: CellRef,
) -> CellRef {
    let s = first_arg(rt, args);
    let bytes = rt.string_bytes(s);
    let mut local = [0u8; 512];
    let n = bytes.len().min(local.len());
    local[..n].copy_from_slice(&bytes[..n]);
    let src = core::str::from_utf8(&local[..n]).unwrap_or("");
    let handle = rt.platform.spawn_thread(src);
    rt.make_int(handle)
}

/// `(yield)`: a no-op from the runtime's point of view. The cooperative
/// scheduler observes this primitive only through a side channel the
/// scheduler crate wires up at the call site that drives this `Runtime`;
/// the runtime itself has no notion of "other threads".
fn prim_yield<P: PlatformPort, const HEAP: usize, const ROOTS: usize, const SYMBUF: usize, const STRBUF: usize>(
    rt: &mut Runtime<P, HEAP, ROOTS, SYMBUF, STRBUF>,
    _args: CellRef,
) -> CellRef {
    let _ = rt.platform.foreign_call("yield", &[]);
    CellRef::NIL
}

fn prim_display<P: PlatformPort, const HEAP: usize, const ROOTS: usize, const SYMBUF: usize, const STRBUF: usize>(
    rt: &mut Runtime<P, HEAP, ROOTS, SYMBUF, STRBUF>,
    args: CellRef,
) -> CellRef {
    let v = first_arg(rt, args);
    rt.display(v);
    CellRef::NIL
}

fn prim_newline<P: PlatformPort, const HEAP: usize, const ROOTS: usize, const SYMBUF: usize, const STRBUF: usize>(
    rt: &mut Runtime<P, HEAP, ROOTS, SYMBUF, STRBUF>,
    _args: CellRef,
) -> CellRef {
    rt.putc(b'\n');
    CellRef::NIL
}

/// `(foreign-call 'name arg0 arg1 ...)`: `name` must be a SYMBOL (typically
/// written as a quoted symbol literal); at most 8 trailing integer arguments
/// are forwarded, matching `PlatformPort::foreign_call`'s contract.
fn prim_foreign_call<P: PlatformPort, const HEAP: usize, const ROOTS: usize, const SYMBUF: usize, const STRBUF: usize>(
    rt: &mut Runtime<P, HEAP, ROOTS, SYMBUF, STRBUF>,
    args: CellRef,
) -> CellRef {
    let name_cell = first_arg(rt, args);
    let name_bytes = rt.symbol_bytes(name_cell);
    let mut name_buf = [0u8; 64];
    let nn = name_bytes.len().min(name_buf.len());
    name_buf[..nn].copy_from_slice(&name_bytes[..nn]);
    let name = core::str::from_utf8(&name_buf[..nn]).unwrap_or("");

    let rest = match *rt.get(args) {
        CellData::Pair { cdr, .. } => cdr,
        _ => CellRef::NIL,
    };
    let mut arg_cells = [CellRef::NIL; 8];
    let count = rt.list_to_array(rest, &mut arg_cells);
    let mut arg_ints = [0i32; 8];
    for i in 0..count {
        arg_ints[i] = int_of(rt, arg_cells[i]);
    }
    let result = rt.platform.foreign_call(name, &arg_ints[..count]);
    rt.make_int(result)
}
