//! Execution tracer CLI.
//!
//! Provides the `steptrace` binary:
//!
//! - `trace` runs a program file and prints its Trace as JSON.
//! - `worker` reads one JSON trace request from stdin and answers on stdout.
//!   The HTTP server spawns one worker per request so that a runaway program
//!   can be killed without taking the server down.

use std::fs;
use std::io::{self, Read, Write};
use std::process;

use clap::{Parser, Subcommand};

use steptrace_tracer::{Trace, TraceOutcome, TraceRequest, Tracer};

/// Line-by-line execution tracer.
#[derive(Parser)]
#[command(name = "steptrace", about = "Line-by-line execution tracer")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Trace a program and print the result as JSON.
    Trace {
        /// Program file, or `-` for stdin.
        path: String,

        /// A JSON value returned by the program's `input()`; repeatable.
        #[arg(short, long = "input")]
        inputs: Vec<String>,

        /// Language of the program.
        #[arg(short, long, default_value = "python")]
        language: String,

        /// Pretty-print the Trace.
        #[arg(long)]
        pretty: bool,

        /// Print the program's final module bindings to stderr.
        #[arg(long)]
        final_state: bool,

        /// Print what the program printed to stderr.
        #[arg(long)]
        show_output: bool,
    },

    /// Answer one trace request read from stdin.
    Worker,
}

fn main() {
    tracing_subscriber::fmt().with_writer(io::stderr).init();

    let cli = Cli::parse();

    let exit_code = match cli.command {
        Commands::Trace {
            path,
            inputs,
            language,
            pretty,
            final_state,
            show_output,
        } => run_trace(&path, &inputs, &language, pretty, final_state, show_output),
        Commands::Worker => run_worker(),
    };
    process::exit(exit_code);
}

/// Execute the trace subcommand.
///
/// Returns exit code: 0 = a trace was produced (even one ending in a fault),
/// 1 = the program could not start, 3 = I/O or argument error.
fn run_trace(
    path: &str,
    raw_inputs: &[String],
    language: &str,
    pretty: bool,
    final_state: bool,
    show_output: bool,
) -> i32 {
    let source = match read_source(path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: failed to read '{}': {}", path, e);
            return 3;
        }
    };

    let mut inputs = Vec::with_capacity(raw_inputs.len());
    for raw in raw_inputs {
        match serde_json::from_str(raw) {
            Ok(value) => inputs.push(value),
            Err(e) => {
                eprintln!("Error: input '{}' is not valid JSON: {}", raw, e);
                return 3;
            }
        }
    }

    let outcome = if steptrace_tracer::is_supported(language) {
        Tracer::default().trace(&source, &inputs)
    } else {
        TraceOutcome {
            trace: steptrace_tracer::trace_for_language(language, &source, &inputs),
            output: String::new(),
            final_locals: None,
        }
    };

    if let Err(e) = print_trace(&outcome.trace, pretty) {
        eprintln!("I/O error: {}", e);
        return 3;
    }
    if show_output && !outcome.output.is_empty() {
        eprint!("{}", outcome.output);
    }
    if final_state {
        if let Some(locals) = &outcome.final_locals {
            eprintln!("{}", serde_json::Value::Object(locals.clone()));
        }
    }

    match outcome.trace.error() {
        Some(error) => {
            eprintln!("Error: {}", error);
            1
        }
        None => 0,
    }
}

/// Execute the worker subcommand.
///
/// Always answers with exactly one JSON document; a malformed request is
/// answered with `{"error": ...}`.
fn run_worker() -> i32 {
    let mut raw = String::new();
    if let Err(e) = io::stdin().read_to_string(&mut raw) {
        eprintln!("I/O error: {}", e);
        return 3;
    }
    let trace = match serde_json::from_str::<TraceRequest>(&raw) {
        Ok(request) => request.run(),
        Err(e) => Trace::failed(format!("invalid trace request: {}", e)),
    };
    match print_trace(&trace, false) {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("I/O error: {}", e);
            3
        }
    }
}

fn read_source(path: &str) -> io::Result<String> {
    if path == "-" {
        let mut source = String::new();
        io::stdin().read_to_string(&mut source)?;
        Ok(source)
    } else {
        fs::read_to_string(path)
    }
}

fn print_trace(trace: &Trace, pretty: bool) -> io::Result<()> {
    let json = if pretty {
        serde_json::to_string_pretty(trace)
    } else {
        serde_json::to_string(trace)
    }
    .map_err(io::Error::other)?;
    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{}", json)?;
    stdout.flush()
}
