//! CB compiler front end
//!
//! Usage: cbc [OPTIONS] <input>

use anyhow::{Result, anyhow};
use cb_compiler::common::DiagnosticStyle;
use cb_compiler::parser::InfixMode;
use cb_compiler::{CompileError, Compiler, CompilerConfig};
use clap::{Parser as ClapParser, ValueEnum};
use log::{LevelFilter, info};
use std::path::PathBuf;
use std::process;

/// How chains of infix operators are grouped
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Default)]
enum Infix {
    /// Two-operator lookahead: `a * b + c * d` is `((a * b) + c) * d`
    #[default]
    Lookahead,
    /// Conventional precedence: `a * b + c * d` is `(a * b) + (c * d)`
    Precedence,
}

#[derive(ClapParser, Debug)]
#[command(name = "cbc")]
#[command(version)]
#[command(about = "Parser and semantic checker for the CB language", long_about = None)]
struct Args {
    /// Entry source file (.cb)
    #[arg(required = true)]
    input: PathBuf,

    /// Stop after this many errors
    #[arg(long, default_value_t = cb_compiler::common::DEFAULT_MAX_ERRORS)]
    max_errors: usize,

    /// Do not print diagnostics
    #[arg(short, long)]
    quiet: bool,

    /// Print diagnostics with source snippets
    #[arg(long)]
    pretty: bool,

    /// Infix grouping rule
    #[arg(long, value_enum, default_value = "lookahead")]
    infix: Infix,

    /// Name of the entry point function
    #[arg(long, default_value = "main")]
    entry: String,

    /// Dump tokens (for debugging)
    #[arg(long)]
    dump_tokens: bool,

    /// Dump the resolved AST (for debugging)
    #[arg(long)]
    dump_ast: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let args = Args::parse();

    env_logger::Builder::from_default_env()
        .filter_level(if args.verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Warn
        })
        .init();

    if let Err(e) = run(&args) {
        eprintln!("error: {:#}", e);
        process::exit(1);
    }
}

fn run(args: &Args) -> Result<()> {
    let config = CompilerConfig {
        max_errors: args.max_errors,
        logging_enabled: !args.quiet,
        style: if args.pretty {
            DiagnosticStyle::Pretty
        } else {
            DiagnosticStyle::Plain
        },
        infix: match args.infix {
            Infix::Lookahead => InfixMode::TwoTokenLookahead,
            Infix::Precedence => InfixMode::PrecedenceClimbing,
        },
        entry_point: args.entry.clone(),
        dump_tokens: args.dump_tokens,
        dump_ast: args.dump_ast,
        verbose: args.verbose,
    };

    info!("compiling {}", args.input.display());
    // `CompileError` holds `Rc` positions, so it cannot become an `anyhow::Error`
    let input = Compiler::new(config)
        .compile_file(&args.input)
        .map_err(|err| match err {
            // Diagnostics were printed as they were reported
            err @ (CompileError::Failed { .. } | CompileError::ErrorLimit { .. }) => {
                anyhow!("{}", err)
            }
            other => anyhow!("failed to compile {}: {}", args.input.display(), other),
        })?;

    info!(
        "{} resolved: {} functions reachable from \"{}\"",
        args.input.display(),
        input.functions.len(),
        args.entry
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_failure_is_reported_with_context() {
        let args = Args::parse_from(["cbc", "--quiet", "does/not/exist.cb"]);
        let err = run(&args).unwrap_err();
        assert!(err.to_string().starts_with("failed to compile does/not/exist.cb"));
    }
}
