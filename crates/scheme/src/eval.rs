//! The recursive evaluator: self-evaluating literals, symbol lookup, special
//! forms, and application.
//!
//! Every recursive `eval` call roots its `env` parameter for the duration
//! of the call. Nested evaluations push their own environments in turn, so
//! the heap's root stack ends up mirroring the Rust call stack exactly —
//! that mirroring *is* "the active environment stack" [`crate::heap::CellHeap::collect`]
//! treats as a root source; no separate bookkeeping is needed for it.

use crate::cell::{CellData, PrimId};
use crate::platform::PlatformPort;
use crate::{CellRef, Runtime};

impl<P: PlatformPort, const HEAP: usize, const ROOTS: usize, const SYMBUF: usize, const STRBUF: usize>
    Runtime<P, HEAP, ROOTS, SYMBUF, STRBUF>
{
    pub fn eval(&mut self, expr: CellRef, env: CellRef) -> CellRef {
        self.heap.push_root(env);
        let result = self.eval_inner(expr, env);
        self.heap.pop_roots(1);
        result
    }

    fn eval_inner(&mut self, expr: CellRef, env: CellRef) -> CellRef {
        match *self.get(expr) {
            // self-evaluating
            CellData::Nil
            | CellData::Bool(_)
            | CellData::Int(_)
            | CellData::Char(_)
            | CellData::Str { .. }
            | CellData::Primitive(_)
            | CellData::Closure { .. } => expr,

            CellData::Symbol { .. } => self.lookup(env, expr),

            CellData::Pair { car, cdr } => {
                if let CellData::Symbol { .. } = *self.get(car) {
                    if let Some(result) = self.try_special_form(car, cdr, env) {
                        return result;
                    }
                }
                self.eval_application(car, cdr, env)
            }

            CellData::Free { .. } => self.platform.panic("attempted to evaluate a free cell"),
        }
    }

    /// Dispatches special forms by the literal spelling of the operator
    /// symbol. Returns `None` when `car` names no special form, so the
    /// caller falls through to ordinary application.
    fn try_special_form(&mut self, car: CellRef, cdr: CellRef, env: CellRef) -> Option<CellRef> {
        let name_len = match *self.get(car) {
            CellData::Symbol { len, .. } => len,
            _ => return None,
        };
        // Compare against a small fixed set of known spellings; copy into a
        // stack buffer first since `symbol_bytes` borrows `self` and every
        // arm below needs `&mut self`.
        let mut buf = [0u8; 16];
        let n = (name_len as usize).min(buf.len());
        buf[..n].copy_from_slice(&self.symbol_bytes(car)[..n]);
        let name = &buf[..n];

        match name {
            b"quote" => Some(self.nth(cdr, 0)),
            b"if" => Some(self.eval_if(cdr, env)),
            b"begin" => Some(self.eval_begin(cdr, env)),
            b"define" => Some(self.eval_define(cdr, env)),
            b"set!" => Some(self.eval_set_bang(cdr, env)),
            b"lambda" => Some(self.eval_lambda(cdr, env)),
            _ => None,
        }
    }

    fn nth(&mut self, list: CellRef, index: usize) -> CellRef {
        let mut cur = list;
        for _ in 0..index {
            cur = match *self.get(cur) {
                CellData::Pair { cdr, .. } => cdr,
                _ => self.platform.panic("malformed special form"),
            };
        }
        match *self.get(cur) {
            CellData::Pair { car, .. } => car,
            _ => self.platform.panic("malformed special form"),
        }
    }

    fn eval_if(&mut self, cdr: CellRef, env: CellRef) -> CellRef {
        let test = self.nth(cdr, 0);
        self.heap.push_root(cdr);
        self.heap.push_root(env);
        let test_val = self.eval(test, env);
        let result = if self.is_truthy(test_val) {
            let then_branch = self.nth(cdr, 1);
            self.eval(then_branch, env)
        } else {
            match *self.get(cdr) {
                CellData::Pair { cdr: rest1, .. } => match *self.get(rest1) {
                    CellData::Pair { cdr: rest2, .. } => match *self.get(rest2) {
                        CellData::Pair { car: else_branch, .. } => self.eval(else_branch, env),
                        _ => CellRef::NIL,
                    },
                    _ => CellRef::NIL,
                },
                _ => CellRef::NIL,
            }
        };
        self.heap.pop_roots(2);
        result
    }

    fn eval_begin(&mut self, mut cdr: CellRef, env: CellRef) -> CellRef {
        self.heap.push_root(env);
        let mut result = CellRef::NIL;
        loop {
            match *self.get(cdr) {
                CellData::Nil => break,
                CellData::Pair { car, cdr: rest } => {
                    result = self.eval(car, env);
                    cdr = rest;
                }
                _ => self.platform.panic("malformed begin body"),
            }
        }
        self.heap.pop_roots(1);
        result
    }

    /// Handles both `(define name value)` and the shorthand
    /// `(define (name . params) . body)`.
    fn eval_define(&mut self, cdr: CellRef, env: CellRef) -> CellRef {
        let target = self.nth(cdr, 0);
        if let CellData::Pair { car: name, cdr: params } = *self.get(target) {
            // shorthand: (define (f x y) body...) => (define f (lambda (x y) body...))
            self.heap.push_root(name);
            self.heap.push_root(params);
            self.heap.push_root(env);
            let body = match *self.get(cdr) {
                CellData::Pair { cdr: rest, .. } => rest,
                _ => self.platform.panic("malformed define"),
            };
            self.heap.push_root(body);
            let closure = self.alloc(CellData::Closure { params, body, env });
            self.define(env, name, closure);
            self.heap.pop_roots(4);
            name
        } else {
            let name = target;
            self.heap.push_root(name);
            self.heap.push_root(env);
            let value_expr = self.nth(cdr, 1);
            let value = self.eval(value_expr, env);
            self.heap.push_root(value);
            self.define(env, name, value);
            self.heap.pop_roots(3);
            name
        }
    }

    fn eval_set_bang(&mut self, cdr: CellRef, env: CellRef) -> CellRef {
        let name = self.nth(cdr, 0);
        self.heap.push_root(name);
        self.heap.push_root(env);
        let value_expr = self.nth(cdr, 1);
        let value = self.eval(value_expr, env);
        self.set_bang(env, name, value);
        self.heap.pop_roots(2);
        value
    }

    fn eval_lambda(&mut self, cdr: CellRef, env: CellRef) -> CellRef {
        let params = self.nth(cdr, 0);
        self.heap.push_root(params);
        self.heap.push_root(env);
        let body = match *self.get(cdr) {
            CellData::Pair { cdr: rest, .. } => rest,
            _ => self.platform.panic("malformed lambda"),
        };
        let closure = self.alloc(CellData::Closure { params, body, env });
        self.heap.pop_roots(2);
        closure
    }

    /// Evaluate the operator, then each operand left to right into a fresh
    /// proper list, then dispatch to a primitive or a closure.
    fn eval_application(&mut self, op_expr: CellRef, args_expr: CellRef, env: CellRef) -> CellRef {
        self.heap.push_root(args_expr);
        self.heap.push_root(env);
        let op = self.eval(op_expr, env);
        self.heap.push_root(op);
        let args = self.eval_list(args_expr, env);
        self.heap.push_root(args);

        let result = match *self.get(op) {
            CellData::Primitive(id) => self.apply_primitive(id, args),
            CellData::Closure { params, body, env: closure_env } => {
                self.heap.push_root(params);
                self.heap.push_root(body);
                self.heap.push_root(closure_env);
                let call_env = self.new_env(closure_env);
                self.heap.push_root(call_env);
                self.bind_params(params, args, call_env);
                let r = self.eval_begin(body, call_env);
                self.heap.pop_roots(4);
                r
            }
            _ => self.platform.panic("attempted to call a non-procedure"),
        };
        self.heap.pop_roots(4);
        result
    }

    fn eval_list(&mut self, exprs: CellRef, env: CellRef) -> CellRef {
        self.heap.push_root(exprs);
        self.heap.push_root(env);
        let result = match *self.get(exprs) {
            CellData::Nil => CellRef::NIL,
            CellData::Pair { car, cdr } => {
                self.heap.push_root(cdr);
                let head = self.eval(car, env);
                self.heap.push_root(head);
                let tail = self.eval_list(cdr, env);
                self.heap.push_root(tail);
                let r = self.cons(head, tail);
                self.heap.pop_roots(3);
                r
            }
            _ => self.platform.panic("malformed argument list"),
        };
        self.heap.pop_roots(2);
        result
    }

    /// Zip `params` against `args`, binding the shorter length (spec.md:
    /// "extra arguments or extra parameters are silently ignored").
    fn bind_params(&mut self, mut params: CellRef, mut args: CellRef, call_env: CellRef) {
        self.heap.push_root(call_env);
        loop {
            let (param, rest_params) = match *self.get(params) {
                CellData::Pair { car, cdr } => (car, cdr),
                _ => break,
            };
            let (arg, rest_args) = match *self.get(args) {
                CellData::Pair { car, cdr } => (car, cdr),
                _ => break,
            };
            self.define(call_env, param, arg);
            params = rest_params;
            args = rest_args;
        }
        self.heap.pop_roots(1);
    }

    /// Dispatch a primitive call by id; argument type errors panic with the
    /// offending cell's type name, per spec.md's uniform error policy.
    fn apply_primitive(&mut self, id: PrimId, args: CellRef) -> CellRef {
        crate::primitives::call(self, id, args)
    }

    /// Copy a proper Scheme list's elements into `out` in order, returning
    /// how many were copied. Stops early (without panicking) if the list is
    /// longer than `out`; callers that care about arity check the count.
    /// Used by primitives that need random access to their arguments.
    pub(crate) fn list_to_array(&self, mut list: CellRef, out: &mut [CellRef]) -> usize {
        let mut n = 0;
        while n < out.len() {
            match *self.get(list) {
                CellData::Pair { car, cdr } => {
                    out[n] = car;
                    n += 1;
                    list = cdr;
                }
                _ => break,
            }
        }
        n
    }
}
