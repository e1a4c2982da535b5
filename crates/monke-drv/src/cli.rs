use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Monke — a tree-walking evaluator and an equivalent bytecode compiler
/// and stack VM for a small dynamically-typed expression language.
#[derive(Parser, Debug)]
#[command(name = "monke")]
#[command(author = "Monke Team")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Run Monke programs or start the REPL", long_about = None)]
pub struct Cli {
    /// Source file to run. Omit to start the interactive REPL.
    pub file: Option<PathBuf>,

    /// Evaluation backend: tree-walking interpreter or bytecode compiler + VM.
    #[arg(long, value_enum, default_value = "interp")]
    pub mode: Mode,

    /// Enable verbose (debug-level) logging.
    #[arg(short, long, global = true, env = "MONKE_VERBOSE")]
    pub verbose: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Interp,
    Vm,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_interp_mode_with_no_file() {
        let cli = Cli::parse_from(["monke"]);
        assert_eq!(cli.file, None);
        assert_eq!(cli.mode, Mode::Interp);
    }

    #[test]
    fn accepts_a_file_and_vm_mode() {
        let cli = Cli::parse_from(["monke", "program.monke", "--mode", "vm"]);
        assert_eq!(cli.file, Some(PathBuf::from("program.monke")));
        assert_eq!(cli.mode, Mode::Vm);
    }

    #[test]
    fn accepts_the_verbose_flag() {
        let cli = Cli::parse_from(["monke", "--verbose"]);
        assert!(cli.verbose);
    }
}
