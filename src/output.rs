// ABOUTME: Output sink for command results and diagnostics.
// ABOUTME: Writes to stdout/stderr, or records lines in order for inspection.

use parking_lot::Mutex;
use std::io::Write;
use std::sync::Arc;

/// Which stream a line went to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stream {
    Stdout,
    Stderr,
}

/// Lines recorded by a capturing [`Output`], in the order they were written.
#[derive(Debug, Clone, Default)]
pub struct Captured(Arc<Mutex<Vec<(Stream, String)>>>);

impl Captured {
    pub fn lines(&self) -> Vec<(Stream, String)> {
        self.0.lock().clone()
    }

    pub fn stdout(&self) -> Vec<String> {
        self.filtered(Stream::Stdout)
    }

    pub fn stderr(&self) -> Vec<String> {
        self.filtered(Stream::Stderr)
    }

    fn filtered(&self, stream: Stream) -> Vec<String> {
        self.0
            .lock()
            .iter()
            .filter(|(s, _)| *s == stream)
            .map(|(_, line)| line.clone())
            .collect()
    }
}

#[derive(Debug, Clone)]
enum Sink {
    Terminal,
    Capture(Captured),
}

/// Handles CLI output for commands.
#[derive(Debug, Clone)]
pub struct Output {
    sink: Sink,
}

impl Output {
    /// Output to the process's stdout and stderr.
    pub fn terminal() -> Self {
        Self {
            sink: Sink::Terminal,
        }
    }

    /// Output recorded in memory.
    pub fn capture() -> (Self, Captured) {
        let captured = Captured::default();
        (
            Self {
                sink: Sink::Capture(captured.clone()),
            },
            captured,
        )
    }

    /// Print a result line (an id, an exit code, a table row) on stdout.
    pub fn line(&self, message: &str) {
        self.write(Stream::Stdout, message);
    }

    /// Print a diagnostic line on stderr.
    pub fn diagnostic(&self, message: &str) {
        self.write(Stream::Stderr, message);
    }

    /// Print a fatal error on stderr.
    pub fn error(&self, message: &str) {
        self.write(Stream::Stderr, &format!("Error: {message}"));
    }

    fn write(&self, stream: Stream, message: &str) {
        match &self.sink {
            Sink::Terminal => {
                // Write failures (closed pipe) are not worth aborting a batch over.
                let _ = match stream {
                    Stream::Stdout => writeln!(std::io::stdout().lock(), "{message}"),
                    Stream::Stderr => writeln!(std::io::stderr().lock(), "{message}"),
                };
            }
            Sink::Capture(captured) => {
                captured.0.lock().push((stream, message.to_string()));
            }
        }
    }
}
