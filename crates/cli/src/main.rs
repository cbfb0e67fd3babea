#![deny(unsafe_code)]

//! # Overview
//!
//! `facq` is the command-line front-end over `facq-persist`: `run` loads and
//! executes a saved `.stream` file until Ctrl-C or completion, `verify`
//! checks a data file's integrity trailer, and `dump` renders one to a
//! tab-separated text table.
//!
//! # Design
//!
//! [`run_with`] takes its arguments and output handles as parameters rather
//! than reading `std::env`/`std::io` directly, so the CLI's behavior can be
//! exercised in tests without touching the real process environment.

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use facq_pipeline::MessageKind;

#[derive(Parser)]
#[command(name = "facq", about = "Run, verify, and inspect facq data acquisition streams")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Loads a saved stream and runs it until it finishes or Ctrl-C is pressed.
    Run {
        /// Path to a `.stream` file written by `Stream::save`.
        stream_file: PathBuf,
    },
    /// Checks a data file's integrity trailer.
    Verify {
        /// Path to a binary sample file.
        data_file: PathBuf,
    },
    /// Renders a data file as a tab-separated text table.
    Dump {
        /// Path to a binary sample file.
        data_file: PathBuf,
    },
}

fn main() -> ExitCode {
    facq_logging::init();
    let mut stdout = io::stdout().lock();
    let mut stderr = io::stderr().lock();
    run_with(std::env::args_os(), &mut stdout, &mut stderr)
}

fn run_with<I, Out, Err>(args: I, stdout: &mut Out, stderr: &mut Err) -> ExitCode
where
    I: IntoIterator,
    I::Item: Into<std::ffi::OsString> + Clone,
    Out: Write,
    Err: Write,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(err) => {
            use clap::error::ErrorKind;
            let to_stdout = matches!(
                err.kind(),
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion
            );
            if to_stdout {
                let _ = write!(stdout, "{err}");
                return ExitCode::SUCCESS;
            }
            let _ = write!(stderr, "{err}");
            return ExitCode::from(2);
        }
    };

    match cli.command {
        Command::Run { stream_file } => run_stream(&stream_file, stdout, stderr),
        Command::Verify { data_file } => verify_file(&data_file, stdout, stderr),
        Command::Dump { data_file } => dump_file(&data_file, stdout, stderr),
    }
}

fn run_stream<Out: Write, Err: Write>(path: &Path, stdout: &mut Out, stderr: &mut Err) -> ExitCode {
    let catalog = facq_persist::Catalog::default();
    let mut stream = match facq_persist::Stream::load(path, &catalog) {
        Ok(stream) => stream,
        Err(err) => {
            let _ = writeln!(stderr, "facq: failed to load {}: {err}", path.display());
            return ExitCode::FAILURE;
        }
    };

    if let Err(err) = stream.start() {
        let _ = writeln!(stderr, "facq: failed to start stream '{}': {err}", stream.name());
        return ExitCode::FAILURE;
    }
    let _ = writeln!(stdout, "facq: stream '{}' running; press Ctrl-C to stop", stream.name());

    let interrupted = Arc::new(AtomicBool::new(false));
    {
        let interrupted = Arc::clone(&interrupted);
        let _ = ctrlc::set_handler(move || interrupted.store(true, Ordering::SeqCst));
    }

    let mut failed = false;
    loop {
        if interrupted.load(Ordering::SeqCst) {
            let _ = writeln!(stdout, "facq: interrupted, stopping stream '{}'", stream.name());
            break;
        }
        let mut done = false;
        stream.monitor().drain_with(|message| match message.kind {
            MessageKind::Stop => done = true,
            MessageKind::Error => {
                let _ = writeln!(stderr, "facq: {}", message.tag);
                failed = true;
                done = true;
            }
        });
        if done {
            break;
        }
        std::thread::sleep(Duration::from_millis(200));
    }

    if let Err(err) = stream.stop() {
        let _ = writeln!(stderr, "facq: error stopping stream '{}': {err}", stream.name());
        return ExitCode::FAILURE;
    }
    if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn verify_file<Out: Write, Err: Write>(path: &Path, stdout: &mut Out, stderr: &mut Err) -> ExitCode {
    match facq_file::FileReader::verify(path) {
        Ok(()) => {
            let _ = writeln!(stdout, "OK");
            ExitCode::SUCCESS
        }
        Err(err) => {
            let _ = writeln!(stderr, "FAIL: {err}");
            ExitCode::FAILURE
        }
    }
}

fn dump_file<Out: Write, Err: Write>(path: &Path, stdout: &mut Out, stderr: &mut Err) -> ExitCode {
    let mut reader = match facq_file::FileReader::open(path) {
        Ok(reader) => reader,
        Err(err) => {
            let _ = writeln!(stderr, "facq: failed to open {}: {err}", path.display());
            return ExitCode::FAILURE;
        }
    };
    if let Err(err) = reader.read_header() {
        let _ = writeln!(stderr, "facq: failed to read header of {}: {err}", path.display());
        return ExitCode::FAILURE;
    }
    match reader.to_human(stdout) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let _ = writeln!(stderr, "facq: {err}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn help_flag_reports_success_and_writes_to_stdout() {
        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        let exit = run_with(["facq", "--help"], &mut stdout, &mut stderr);
        assert_eq!(exit, ExitCode::SUCCESS);
        assert!(!stdout.is_empty());
        assert!(stderr.is_empty());
    }

    #[test]
    fn missing_subcommand_is_a_usage_error() {
        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        let exit = run_with(["facq"], &mut stdout, &mut stderr);
        assert_eq!(exit, ExitCode::from(2));
        assert!(!stderr.is_empty());
    }

    #[test]
    fn verify_reports_ok_for_a_well_formed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.dat");

        let catalog = facq_persist::Catalog::default();
        let mut params = facq_persist::ParamMap::new();
        params.insert("function".into(), "sine".into());
        params.insert("amplitude".into(), "1".into());
        params.insert("wave-period".into(), "1".into());
        params.insert("period".into(), "0.001".into());
        params.insert("n-channels".into(), "1".into());
        let source = catalog
            .construct("software", facq_persist::ItemKind::Source, &params)
            .unwrap();
        let facq_persist::CatalogItem::Source(source) = source else {
            unreachable!()
        };

        let mut stream = facq_persist::Stream::new("demo");
        stream.set_source("software", params, source).unwrap();
        stream
            .set_sink(
                "file",
                facq_persist::ParamMap::new(),
                Box::new(facq_file::FileSink::new(&path)),
            )
            .unwrap();
        stream.start().unwrap();
        std::thread::sleep(Duration::from_millis(30));
        stream.stop().unwrap();

        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        let exit = run_with(["facq", "verify", path.to_str().unwrap()], &mut stdout, &mut stderr);
        assert_eq!(exit, ExitCode::SUCCESS);
        assert_eq!(String::from_utf8(stdout).unwrap(), "OK\n");
    }

    #[test]
    fn verify_reports_fail_for_a_missing_file() {
        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        let exit = run_with(["facq", "verify", "/nonexistent/path.dat"], &mut stdout, &mut stderr);
        assert_eq!(exit, ExitCode::FAILURE);
        assert!(!stderr.is_empty());
        assert!(stdout.is_empty());
    }
}
