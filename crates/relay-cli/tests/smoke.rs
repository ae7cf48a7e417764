//! CLI smoke tests: spawn the real `relay` binary against a temp source
//! file and assert on stdout/stderr and exit status rather than calling
//! library code directly.

use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;
use tempfile::NamedTempFile;

fn source_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{contents}").unwrap();
    file
}

#[test]
fn runs_a_program_and_prints_its_output() {
    let file = source_file("func main() { iprint(1 + 2) }");

    Command::cargo_bin("relay")
        .unwrap()
        .arg(file.path())
        .assert()
        .success()
        .stdout(predicate::eq("3"));
}

#[test]
fn exits_nonzero_on_a_missing_source_file() {
    Command::cargo_bin("relay")
        .unwrap()
        .arg("/no/such/file.relay")
        .assert()
        .failure()
        .stderr(predicate::str::contains("couldn't read"));
}

#[test]
fn exits_nonzero_and_reports_a_type_error() {
    let file = source_file("func main() { var x int = true }");

    Command::cargo_bin("relay")
        .unwrap()
        .arg(file.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("RL00"));
}

#[test]
fn exits_nonzero_when_main_is_missing() {
    let file = source_file("func helper() { }");

    Command::cargo_bin("relay")
        .unwrap()
        .arg(file.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("main"));
}

#[test]
fn heap_size_override_is_accepted() {
    let file = source_file("func main() { iprint(41 + 1) }");

    Command::cargo_bin("relay")
        .unwrap()
        .arg(file.path())
        .arg("--heap-size")
        .arg("1048576")
        .assert()
        .success()
        .stdout(predicate::eq("42"));
}

#[test]
fn runs_a_goroutine_and_channel_program() {
    let file = source_file(
        r#"
        func worker(ch chan int) {
            ch <- 7
        }

        func main() {
            var ch chan int = make(chan int, 1)
            go worker(ch)
            var v int = <- ch
            iprint(v)
        }
        "#,
    );

    Command::cargo_bin("relay")
        .unwrap()
        .arg(file.path())
        .assert()
        .success()
        .stdout(predicate::eq("7"));
}
