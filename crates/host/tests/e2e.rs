//! Host-side integration fixture: drives the `scheme` crate's public API
//! directly against the concrete end-to-end scenarios, through the mock
//! `PlatformPort` rather than the `slop-scheme` binary itself.

use los_scheme::platform::mock::MockPlatform;
use los_scheme::Runtime;

fn run(src: &str) -> String {
    let mut disk = [0u8; 64];
    let platform = MockPlatform::new(&[], &mut disk);
    let mut rt: Runtime<MockPlatform> = Runtime::new(platform);
    rt.eval_string(src);
    String::from_utf8_lossy(rt.platform.output()).into_owned()
}

#[test]
fn addition_prints_its_sum() {
    assert_eq!(run("(display (+ 1 2))"), "3");
}

#[test]
fn recursive_factorial_of_five_is_120() {
    let src = "(begin (define (f n) (if (< n 2) 1 (* n (f (- n 1))))) (display (f 5)))";
    assert_eq!(run(src), "120");
}

#[test]
fn string_literal_then_newline() {
    assert_eq!(run("(display \"abc\") (newline)"), "abc\n");
}

#[test]
fn string_ref_prints_the_indexed_character() {
    assert_eq!(run("(display (string-ref \"xyz\" 1))"), "y");
}

#[test]
fn foreign_call_resolves_a_quoted_symbol_name() {
    // `'yield`/`'shutdown` evaluate to symbols, not strings; `foreign-call`
    // must read the name via the symbol accessor or these silently resolve
    // to an empty name and fall through to -1 on every platform.
    assert_eq!(run("(display (foreign-call 'yield))"), "0");
    assert_eq!(run("(display (foreign-call 'shutdown))"), "0");
}

#[test]
fn closures_capture_their_binding_by_reference() {
    // `let` has no desugaring in this evaluator; an immediately-applied
    // lambda gives the same captured-binding shape §8's property #6 asks for.
    let src = "(define c ((lambda (x) (lambda () (set! x (+ x 1)) x)) 0)) \
               (display (c)) (display (c)) (display (c))";
    assert_eq!(run(src), "123");
}
