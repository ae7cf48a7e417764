//! Program output sink
//!
//! The `sprint`/`iprint`/`fprint` natives write straight to the process's
//! real stdout; this trait exists purely so tests can capture that output
//! in-process instead of spawning a subprocess for every scenario.
//! Production code always runs with [`StdoutOutput`].

use std::sync::Mutex;

/// Where the `sprint`/`iprint`/`fprint` natives write their bytes.
pub trait Output: Send + Sync {
    fn write(&self, bytes: &[u8]);
}

/// The real process stdout, flushed after every write so output interleaves
/// correctly with concurrently printing goroutines.
pub struct StdoutOutput;

impl Output for StdoutOutput {
    fn write(&self, bytes: &[u8]) {
        use std::io::Write;
        let mut out = std::io::stdout().lock();
        let _ = out.write_all(bytes);
        let _ = out.flush();
    }
}

/// An in-memory sink, for tests that assert on a program's printed output
/// without spawning the CLI binary.
#[derive(Default)]
pub struct BufferOutput {
    buf: Mutex<Vec<u8>>,
}

impl BufferOutput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot everything written so far as a (lossily-decoded) string.
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.buf.lock().unwrap()).into_owned()
    }
}

impl Output for BufferOutput {
    fn write(&self, bytes: &[u8]) {
        self.buf.lock().unwrap().extend_from_slice(bytes);
    }
}
