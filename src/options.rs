//! Conversion options threaded through every front end.

use crate::charset::Charsets;
use crate::cli::Cli;
use crate::error::Result;

/// The configuration surface the converters consume. Built once from
/// the CLI and passed by reference; no global state.
#[derive(Clone, Debug, Default)]
pub struct Options {
    /// Suppress progress output.
    pub quiet: bool,
    /// Source/target codepages for entry names.
    pub charsets: Charsets,
    /// Entry names (or `*`-prefixed suffixes) to drop.
    pub excludes: Vec<String>,
    /// Relabel surviving entries with sequential numbers.
    pub rename: bool,
}

impl Options {
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        Ok(Self {
            quiet: cli.quiet,
            charsets: Charsets::parse(&cli.charset)?,
            excludes: cli.excludes.clone(),
            rename: cli.rename,
        })
    }

    /// Whether an entry name matches any exclude pattern: an exact
    /// match, or a suffix match when the pattern starts with `*`.
    pub fn is_excluded(&self, name: &str) -> bool {
        self.excludes.iter().any(|pattern| match pattern.strip_prefix('*') {
            Some(suffix) => name.ends_with(suffix),
            None => name == pattern,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exclude_patterns_match_exactly_or_by_suffix() {
        let opts = Options {
            excludes: vec!["*.tmp".to_string(), "Thumbs.db".to_string()],
            ..Default::default()
        };
        assert!(opts.is_excluded("cache.tmp"));
        assert!(opts.is_excluded("sub/dir/x.tmp"));
        assert!(opts.is_excluded("Thumbs.db"));
        assert!(!opts.is_excluded("sub/Thumbs.db"));
        assert!(!opts.is_excluded("x.tmp.bak"));
        assert!(!opts.is_excluded("notes.txt"));
    }
}
