//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::candle_config_adapter::CandleConfigAdapter;
use crate::adapters::spot_indicator_adapter::SpotIndicatorAdapter;
use crate::adapters::stream_action_adapter::StreamActionAdapter;
use crate::domain::candle::Candle;
use crate::domain::compiler::compile_program;
use crate::domain::error::TradeLangError;
use crate::domain::parser::parse_program;
use crate::domain::runner::run_source;
use crate::ports::context_port::ContextPort;

#[derive(Parser, Debug)]
#[command(name = "tradelang", about = "Trading rule language compiler and VM")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a rule program against a candle
    Run {
        program: PathBuf,
        /// INI file with a [candle] section; a built-in sample candle is
        /// used when omitted
        #[arg(short, long)]
        context: Option<PathBuf>,
    },
    /// Parse and compile a rule program without executing it
    Check { program: PathBuf },
    /// Show version information
    Info,
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Run { program, context } => run_program(&program, context.as_deref()),
        Command::Check { program } => run_check(&program),
        Command::Info => run_info(),
    }
}

fn fail(err: &TradeLangError) -> ExitCode {
    eprintln!("{err}");
    ExitCode::from(err)
}

fn run_program(program_path: &Path, context_path: Option<&Path>) -> ExitCode {
    let source = match fs::read_to_string(program_path) {
        Ok(s) => s,
        Err(e) => return fail(&TradeLangError::Io(e)),
    };

    let candle = match context_path {
        Some(path) => {
            let loaded = CandleConfigAdapter::from_file(path)
                .and_then(|adapter| adapter.load_candle());
            match loaded {
                Ok(c) => c,
                Err(e) => return fail(&e),
            }
        }
        None => sample_candle(),
    };

    let mut sink = StreamActionAdapter::new(io::stdout().lock());
    if let Err(e) = run_source(&source, candle, &SpotIndicatorAdapter, &mut sink) {
        return fail(&e);
    }
    ExitCode::SUCCESS
}

fn run_check(program_path: &Path) -> ExitCode {
    let source = match fs::read_to_string(program_path) {
        Ok(s) => s,
        Err(e) => return fail(&TradeLangError::Io(e)),
    };

    let result = parse_program(&source)
        .map_err(TradeLangError::from)
        .and_then(|program| {
            compile_program(&program)?;
            Ok(program)
        });

    match result {
        Ok(program) => {
            eprintln!(
                "program ok: symbol {}, {} rule(s)",
                program.symbol,
                program.rules.len()
            );
            ExitCode::SUCCESS
        }
        Err(e) => fail(&e),
    }
}

fn run_info() -> ExitCode {
    eprintln!("tradelang {}", env!("CARGO_PKG_VERSION"));
    eprintln!("Trading rule language compiler and virtual machine");
    ExitCode::SUCCESS
}

/// The built-in candle used by `run` when no context file is given.
pub fn sample_candle() -> Candle {
    Candle {
        open: 100.0,
        high: 110.0,
        low: 95.0,
        close: 108.0,
        volume: 1_000_000.0,
        date: 20_251_117,
        time: 940,
        hour: 9,
        minute: 40,
        weekday: 1,
    }
}
