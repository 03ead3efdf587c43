//! # Uguisu
//!
//! This binary is the reference interpreter for Uguisu. It combines the scanner, parser,
//! analyzer, and evaluator into a single application.

mod cli;

use cli::*;

use std::error::Error;
use std::fs;
use std::process::ExitCode;

use log::{error, info};
use uguisu::evaluator::HostOptions;
use uguisu::scanner::Scanner;
use uguisu::UguisuError;

fn main() -> ExitCode {
    let args = Cli::init();

    simple_logger::init_with_level((&args.verbosity).into()).unwrap();

    match args.command {
        Commands::Run(run_args) => run(run_args),
    }
}

fn run(args: RunArgs) -> ExitCode {
    let file = match fs::canonicalize(&args.file) {
        Ok(file) => file,
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let source = match fs::read_to_string(&file) {
        Ok(source) => source,
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let filename = file.to_string_lossy().into_owned();
    info!("running {filename}");

    if args.dump_tokens {
        return match dump_tokens(&source) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                error!("{e}");
                ExitCode::FAILURE
            }
        };
    }

    if args.dump_ast {
        return match dump_ast(&source, &filename) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                error!("{e}");
                ExitCode::FAILURE
            }
        };
    }

    let options = HostOptions::with_stdout(|s| print!("{s}"));

    match uguisu::run(&source, &filename, &options) {
        Ok(_) => ExitCode::SUCCESS,
        Err(UguisuError::Parse(e)) => {
            error!("{e}");
            ExitCode::FAILURE
        }
        Err(UguisuError::Analysis(diagnostics)) => {
            for d in diagnostics {
                error!("{d}");
            }
            ExitCode::FAILURE
        }
        Err(UguisuError::Runtime(e)) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn dump_tokens(source: &str) -> Result<(), Box<dyn Error>> {
    let mut scanner = Scanner::new(source)?;
    let mut tokens = Vec::new();
    loop {
        let token = scanner.token().clone();
        let is_eof = matches!(token, uguisu::scanner::Token::Eof { .. });
        tokens.push(token);
        if is_eof {
            break;
        }
        scanner.advance()?;
    }
    println!("{}", serde_json::to_string_pretty(&tokens)?);
    Ok(())
}

fn dump_ast(source: &str, filename: &str) -> Result<(), Box<dyn Error>> {
    let file = uguisu::parser::parse(source, filename)?;
    println!("{}", serde_json::to_string_pretty(&file)?);
    Ok(())
}
