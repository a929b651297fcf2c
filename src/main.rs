//! Main entry point for the anyzip CLI application.
//!
//! Dispatches each input to the matching converter by inspecting it:
//! directories become archives of their files, and files are classified
//! by their first four bytes (PDF, RAR or ZIP). Inputs are processed
//! independently; a failure on one is reported and the rest continue.

use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::process::ExitCode;

use clap::Parser;

use anyzip::convert::pdf::PDF_SIGNATURE;
use anyzip::convert::rar::RAR_SIGNATURE;
use anyzip::zip::records::LOCAL_FILE_HEADER_SIGNATURE;
use anyzip::{convert, display_name, Cli, Error, Options, Result};

fn main() -> ExitCode {
    let cli = Cli::parse();
    let opts = match Options::from_cli(&cli) {
        Ok(opts) => opts,
        Err(err) => {
            eprintln!("Error: {err}");
            return ExitCode::from(2);
        }
    };

    let mut failed = false;
    for (number, input) in cli.inputs.iter().enumerate() {
        if !opts.quiet {
            println!("{}. {}", 1 + number, display_name(input));
        }
        if let Err(err) = convert_input(input, &opts) {
            eprintln!("Error: {err}");
            if matches!(err, Error::Unsupported { what: "unknown file type", .. }) {
                eprintln!("Supported inputs: {}", Cli::supported_patterns());
            }
            failed = true;
        }
    }

    if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

/// Classify one input and run its converter.
fn convert_input(path: &Path, opts: &Options) -> Result<()> {
    if !path.exists() {
        return Err(Error::NotFound(display_name(path)));
    }
    if path.is_dir() {
        return convert::dir_to_zip(path, opts);
    }

    let mut signature = [0u8; 4];
    match File::open(path)?.read_exact(&mut signature) {
        Ok(()) => {}
        // Too short to carry any signature.
        Err(err) if err.kind() == std::io::ErrorKind::UnexpectedEof => {
            return Err(Error::Unsupported {
                what: "unknown file type",
                name: display_name(path),
            });
        }
        Err(err) => return Err(err.into()),
    }

    match signature {
        PDF_SIGNATURE => convert::pdf_to_zip(path, opts),
        RAR_SIGNATURE => convert::rar_to_zip(path, opts),
        LOCAL_FILE_HEADER_SIGNATURE => convert::zip_to_zip(path, opts),
        _ => Err(Error::Unsupported {
            what: "unknown file type",
            name: display_name(path),
        }),
    }
}
