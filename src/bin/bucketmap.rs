//! Command-file driver.
//!
//! Reads a command file (default `commands.txt`), dispatches one worker
//! per command line, and writes the audit log and final report to an
//! output file (default `output.txt`). Both paths can be overridden:
//! `bucketmap [commands-file] [output-file]`.

use std::io::BufWriter;
use std::path::PathBuf;
use std::process::ExitCode;

use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let mut args = std::env::args().skip(1);
    let input = PathBuf::from(args.next().unwrap_or_else(|| "commands.txt".to_string()));
    let output_path = PathBuf::from(args.next().unwrap_or_else(|| "output.txt".to_string()));

    let output = match std::fs::File::create(&output_path) {
        Ok(f) => BufWriter::new(f),
        Err(e) => {
            eprintln!("bucketmap: cannot create {}: {}", output_path.display(), e);
            return ExitCode::FAILURE;
        }
    };

    match bucketmap::run_file(&input, output) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("bucketmap: {}: {}", input.display(), e);
            ExitCode::FAILURE
        }
    }
}
