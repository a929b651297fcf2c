//! Console progress reporting.
//!
//! Purely observational: the converters call in after each entry with a
//! running count, and print short notes at milestones. Everything is
//! suppressed in quiet mode; no output ever affects control flow.

use std::io::{self, Write};

/// Progress sink for one conversion.
#[derive(Clone, Copy, Debug)]
pub struct Progress {
    quiet: bool,
}

impl Progress {
    pub fn new(quiet: bool) -> Self {
        Self { quiet }
    }

    /// Overwrite the in-place counter line: `   007 entries written`.
    pub fn count(&self, entries: usize, verb: &str) {
        if !self.quiet {
            print!("\r   {entries:03} entries {verb}");
            let _ = io::stdout().flush();
        }
    }

    /// Terminate the counter line.
    pub fn end_count(&self) {
        if !self.quiet {
            println!();
        }
    }

    /// Print a milestone note, e.g. `   footer written`.
    pub fn note(&self, message: &str) {
        if !self.quiet {
            println!("   {message}");
        }
    }
}
