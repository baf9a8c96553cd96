//! Command-line driver for the interpreter.
//!
//! Consults the given source files in order, then runs the goal given
//! with `--goal` (printing the bindings of each solution) or executes
//! any `:- initialization`-style directives the files contained.
//!
//! Exit status: 0 on a clean finish or `halt(0)`, the halt code on
//! `halt/1`, 1 on an unhandled error, 2 on a syntax error during
//! consult.

use anyhow::Context;
use clap::Parser as ClapParser;
use horn_engine::{EngineError, Interpreter};
use std::fs;
use std::process::ExitCode;

#[derive(ClapParser, Debug)]
#[command(name = "horn", version, about = "An embeddable Prolog interpreter", long_about = None)]
struct Args {
    /// Source files consulted in order.
    files: Vec<String>,

    /// A goal to run after consulting; its solutions are printed.
    #[arg(short, long)]
    goal: Option<String>,

    /// Print at most this many solutions (0 means all).
    #[arg(short = 'n', long, default_value_t = 1)]
    solutions: usize,
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();
    ExitCode::from(run(args) as u8)
}

fn run(args: Args) -> i32 {
    let mut horn = match Interpreter::try_new() {
        Ok(horn) => horn,
        Err(e) => {
            eprintln!("horn: {e}");
            return 1;
        }
    };

    for path in &args.files {
        let source = match fs::read_to_string(path).with_context(|| format!("reading {path}")) {
            Ok(source) => source,
            Err(e) => {
                eprintln!("horn: {e:#}");
                return 1;
            }
        };
        match horn.consult(&source) {
            Ok(()) => {}
            Err(e @ (EngineError::Syntax { .. } | EngineError::Insufficient)) => {
                eprintln!("horn: {path}: {e}");
                return 2;
            }
            Err(e) => {
                eprintln!("horn: {path}: {e}");
                return e.exit_code();
            }
        }
    }

    let Some(goal) = args.goal else {
        return 0;
    };

    let mut solutions = match horn.query(&goal) {
        Ok(solutions) => solutions,
        Err(e @ (EngineError::Syntax { .. } | EngineError::Insufficient)) => {
            eprintln!("horn: {e}");
            return 2;
        }
        Err(e) => {
            eprintln!("horn: {e}");
            return e.exit_code();
        }
    };

    let mut found = 0usize;
    loop {
        match solutions.next() {
            Ok(true) => {
                found += 1;
                let vars = solutions
                    .vars()
                    .iter()
                    .map(|v| v.to_string())
                    .collect::<Vec<_>>();
                if vars.is_empty() {
                    println!("true.");
                } else {
                    let bindings: Vec<String> = vars
                        .iter()
                        .filter_map(|name| {
                            solutions.show(name).map(|value| format!("{name} = {value}"))
                        })
                        .collect();
                    println!("{}.", bindings.join(", "));
                }
                if args.solutions != 0 && found >= args.solutions {
                    return 0;
                }
            }
            Ok(false) => {
                if found == 0 {
                    println!("false.");
                }
                return 0;
            }
            Err(e) => {
                eprintln!("horn: {e}");
                return e.exit_code();
            }
        }
    }
}
