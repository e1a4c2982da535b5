//! File execution and the interactive REPL (spec §6).
//!
//! Both backends persist state across REPL lines: the tree-walking
//! interpreter keeps one `Environment` alive for the whole session, the
//! VM backend keeps the `SymbolTable`, constant pool, and globals array
//! alive the same way, mirroring the reference REPL's session state.

use std::io::{self, BufRead, Write};

use monke_compiler::{Compiler, SymbolTable};
use monke_eval::eval_program;
use monke_obj::{Environment, Value};
use monke_par::Parser;
use monke_vm::Vm;

use crate::cli::Mode;
use crate::error::DriverError;

const PROMPT: &str = "monke >> ";

pub fn run_file(source: &str, mode: Mode) -> anyhow::Result<()> {
    let mut session = Session::new(mode);
    match session.eval(source) {
        Outcome::Value(value) => {
            println!("{}", value.inspect());
            Ok(())
        }
        Outcome::ParseErrors(errors) => {
            print_parse_errors(&errors);
            anyhow::bail!("parsing failed")
        }
        Outcome::CompileErrors(errors) => {
            for err in &errors {
                eprintln!("compile error: {err}");
            }
            anyhow::bail!("compilation failed")
        }
        Outcome::VmError(err) => anyhow::bail!("vm error: {err}"),
    }
}

pub fn run_repl(mode: Mode) -> anyhow::Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut session = Session::new(mode);

    loop {
        print!("{PROMPT}");
        stdout.flush().map_err(DriverError::ReadStdin)?;

        let mut line = String::new();
        let bytes_read = stdin
            .lock()
            .read_line(&mut line)
            .map_err(DriverError::ReadStdin)?;
        if bytes_read == 0 {
            break; // EOF
        }

        match line.trim_end() {
            "exit" => break,
            "clear" => {
                print!("\x1B[2J\x1B[1;1H");
                continue;
            }
            "" => continue,
            _ => {}
        }

        match session.eval(&line) {
            Outcome::Value(value) => match mode {
                Mode::Interp => println!("[Output] {}", value.inspect()),
                Mode::Vm => println!("[Output]: {}", value.inspect()),
            },
            Outcome::ParseErrors(errors) => print_parse_errors(&errors),
            Outcome::CompileErrors(errors) => {
                for err in &errors {
                    println!("compile error: {err}");
                }
            }
            Outcome::VmError(err) => println!("vm error: {err}"),
        }
    }

    Ok(())
}

fn print_parse_errors(errors: &[monke_par::ParseError]) {
    println!("Oops! Parsing Error!:");
    for err in errors {
        println!("\t{err}");
    }
}

enum Outcome {
    Value(Value),
    ParseErrors(Vec<monke_par::ParseError>),
    CompileErrors(Vec<monke_compiler::CompileError>),
    VmError(monke_vm::VmError),
}

/// Backend state that survives across REPL lines, per spec's carried-state
/// supplement (SPEC_FULL.md §6).
enum Session {
    Interp { env: Environment },
    Vm { state: Option<(Vec<Value>, SymbolTable)>, globals: Vec<Value> },
}

impl Session {
    fn new(mode: Mode) -> Self {
        match mode {
            Mode::Interp => Session::Interp {
                env: Environment::new(),
            },
            Mode::Vm => Session::Vm {
                state: None,
                globals: Vec::new(),
            },
        }
    }

    fn eval(&mut self, source: &str) -> Outcome {
        let mut parser = Parser::new(source);
        let program = parser.parse_program();
        if !parser.errors().is_empty() {
            return Outcome::ParseErrors(parser.errors().to_vec());
        }

        match self {
            Session::Interp { env } => Outcome::Value(eval_program(&program, env)),
            Session::Vm { state, globals } => {
                let mut compiler = match state.take() {
                    Some((constants, symbol_table)) => {
                        Compiler::new_with_state(constants, symbol_table)
                    }
                    None => Compiler::new(),
                };
                compiler.compile_program(&program);
                if !compiler.errors().is_empty() {
                    return Outcome::CompileErrors(compiler.errors().to_vec());
                }

                let (bytecode, symbol_table) = compiler.into_parts();
                let constants = bytecode.constants.clone();

                let mut vm = if globals.is_empty() {
                    Vm::new(bytecode)
                } else {
                    Vm::with_globals(bytecode, std::mem::take(globals))
                };
                if let Err(err) = vm.run() {
                    return Outcome::VmError(err);
                }
                let result = vm.last_popped().clone();
                *globals = vm.into_globals();
                *state = Some((constants, symbol_table));
                Outcome::Value(result)
            }
        }
    }
}
