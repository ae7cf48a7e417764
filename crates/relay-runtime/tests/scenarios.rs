//! End-to-end scenario tests covering closures, channels, recursion and
//! escape analysis.
//!
//! Each program runs through the full pipeline (lexer → parser → scanner →
//! analyzer → typechecker → compiler → vm) with its `sprint`/`iprint`/
//! `fprint` output captured in-process via `vm::BufferOutput` rather than
//! the real stdout, so these can assert on exact printed output without
//! spawning the CLI binary.

use relay_runtime::bytecode::Opcode;
use relay_runtime::runtime::{compile, run_with_output, Config};
use relay_runtime::vm::BufferOutput;
use rstest::rstest;
use std::sync::Arc;

fn run_and_capture(src: &str) -> String {
    let output = Arc::new(BufferOutput::new());
    let result = run_with_output(src, &Config::default(), output.clone());
    assert!(result.is_ok(), "program failed: {:?}", result.err());
    output.contents()
}

#[test]
fn if_else_selects_the_right_branch() {
    let src = r#"
        func main() {
            var x int
            var y int = 10
            if (y > 2) { x = 1 } else { x = 2 }
            iprint(x)
        }
    "#;
    assert_eq!(run_and_capture(src), "1");
}

#[test]
fn escaped_counter_increments_across_calls() {
    // `counter` is bound in `makeCounter`, captured by the returned
    // literal, so the analyzer must promote it to escaped; three calls to
    // the returned closure must each see the previous call's increment.
    let src = r#"
        func makeCounter() func() {
            var counter int = 0
            var f func() = func() {
                counter = counter + 1
                iprint(counter)
                sprint("\n")
            }
            return f
        }

        func main() {
            var c func() = makeCounter()
            c()
            c()
            c()
        }
    "#;
    assert_eq!(run_and_capture(src), "1\n2\n3\n");
}

#[test]
fn channel_ping_pong_between_goroutines() {
    let src = r#"
        func worker(ch chan int) {
            ch <- 42
        }

        func main() {
            var ch chan int = make(chan int, 1)
            go worker(ch)
            var v int = <- ch
            iprint(v)
        }
    "#;
    assert_eq!(run_and_capture(src), "42");
}

#[test]
fn producer_consumer_preserves_order() {
    let src = r#"
        func produce(ch chan int) {
            var i int = 1
            for i <= 10 {
                ch <- i
                i = i + 1
            }
        }

        func consume(ch chan int, done chan int) {
            var i int = 0
            for i < 10 {
                var v int = <- ch
                iprint(v)
                sprint(",")
                i = i + 1
            }
            done <- 1
        }

        func main() {
            var ch chan int = make(chan int, 2)
            var done chan int = make(chan int, 1)
            go produce(ch)
            go consume(ch, done)
            var finished int = <- done
            iprint(finished)
        }
    "#;
    assert_eq!(run_and_capture(src), "1,2,3,4,5,6,7,8,9,10,1");
}

#[test]
fn recursive_factorial() {
    let src = r#"
        func fact(n int) int {
            if (n <= 1) {
                return 1
            } else {
                return n * fact(n - 1)
            }
        }

        func main() {
            iprint(fact(6))
        }
    "#;
    assert_eq!(run_and_capture(src), "720");
}

#[rstest]
#[case::escaped_capture_of_loop_local(
    r#"
        func main() {
            var n int = 0
            var escaping func() int = func() int { return n }
            n = n + 1
            var bound int = 5
            var f func() int = func() int { return bound + 1 }
            iprint(escaping())
            sprint(",")
            iprint(f())
        }
    "#,
    "1,6"
)]
fn escaped_and_bound_captures_both_execute_correctly(#[case] src: &str, #[case] expected: &str) {
    assert_eq!(run_and_capture(src), expected);
}

#[test]
fn channel_capacity_bounds_in_flight_items() {
    // At every observable moment the number of in-flight items on a
    // capacity-c channel stays within 0..=c; a capacity-3 channel holding
    // exactly 3 sends must still accept them without blocking the sender.
    let src = r#"
        func main() {
            var ch chan int = make(chan int, 3)
            ch <- 1
            ch <- 2
            ch <- 3
            iprint(<- ch)
            iprint(<- ch)
            iprint(<- ch)
        }
    "#;
    assert_eq!(run_and_capture(src), "123");
}

#[test]
fn no_escaped_variables_means_no_heap_allocation() {
    // With no escaped variables, no function's code allocates a cell box,
    // and every local is a plain `load`/`store`.
    let src = "func main() { var x int = 1; var y int = 2; x = x + y }";
    let (functions, _, _) = compile(src, &Config::default()).unwrap();
    let main_fn = functions.iter().find(|f| f.name.as_deref() == Some("main")).unwrap();
    assert!(
        !main_fn.code.iter().any(|i| i.opcode == Opcode::New),
        "no escaped variables means no heap allocation"
    );
}

#[test]
fn closure_allocation_writes_capc_plus_one_words() {
    // A function literal with `capc=k` writes exactly `k+1` words into its
    // closure (function index, then k captures) before leaving the closure
    // address on the stack.
    let src = r#"
        func outer() func() int {
            var a int = 1
            var b int = 2
            var f func() int = func() int { return a + b }
            return f
        }
    "#;
    let (functions, types, _) = compile(src, &Config::default()).unwrap();
    let outer_fn = functions.iter().find(|f| f.name.as_deref() == Some("outer")).unwrap();
    let closure_type = (0..types.len() as u32)
        .map(relay_runtime::types::TypeIndex)
        .find(|&idx| types.name(idx).starts_with("closure<"))
        .expect("the literal's Closure type must have been interned");
    let new_at = outer_fn
        .code
        .iter()
        .position(|i| i.opcode == Opcode::New && i.payload == closure_type.0 as u64)
        .expect("outer must emit `new_` for the closure literal");
    // Everything after the closure's `new_` is its own materialisation
    // sequence (the literal is the last thing outer builds before
    // returning `f`): 1 word for the function index, plus one per capture.
    let wstore_after = outer_fn.code[new_at..]
        .iter()
        .filter(|i| i.opcode == Opcode::WStore)
        .count();
    assert_eq!(wstore_after, 1 + 2, "capc=2 closure writes capc+1 words");
}

#[test]
fn division_by_zero_is_a_fatal_arithmetic_error() {
    let src = "func main() { var z int = 0; iprint(1 / z) }";
    let output = Arc::new(BufferOutput::new());
    let result = run_with_output(src, &Config::default(), output);
    assert!(result.is_err());
}
