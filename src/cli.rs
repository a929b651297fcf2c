use std::path::PathBuf;

use clap::Parser;

use crate::convert::rar::Unrar;

#[derive(Parser, Debug)]
#[command(name = "anyzip")]
#[command(version)]
#[command(about = "Convert directories, PDF images, RAR and ZIP archives into stored ZIP archives", long_about = None)]
#[command(after_help = "Examples:\n  \
  anyzip photos/                 pack the photos directory into photos.zip\n  \
  anyzip -x '*.tmp' scans.zip    rewrite scans.zip as stored, dropping *.tmp entries\n  \
  anyzip -n -O cp932,utf8 a.zip  renumber entries and convert names to UTF-8\n  \
  anyzip album.pdf               extract embedded JPEGs into album.zip")]
pub struct Cli {
    /// Inputs to convert (directory, .pdf, .rar, or .zip)
    #[arg(value_name = "PATH", required = true)]
    pub inputs: Vec<PathBuf>,

    /// Quiet mode
    #[arg(short, long)]
    pub quiet: bool,

    /// Character encodings for entry names
    #[arg(short = 'O', long = "charset", value_name = "IN,OUT", default_value = "cp932,utf8")]
    pub charset: String,

    /// Exclude entries matching the given patterns
    #[arg(short = 'x', long = "exclude", value_name = "PATTERN")]
    pub excludes: Vec<String>,

    /// Rename entries to sequential numbers
    #[arg(short = 'n', long)]
    pub rename: bool,
}

impl Cli {
    /// The input kinds this build can actually convert; RAR appears
    /// only when the optional decoder library resolves.
    pub fn supported_patterns() -> &'static str {
        if Unrar::is_available() {
            "directory|*.pdf|*.rar|*.zip"
        } else {
            "directory|*.pdf|*.zip"
        }
    }
}
