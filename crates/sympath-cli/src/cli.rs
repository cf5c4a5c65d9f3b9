//! CLI argument definitions: top-level `Cli` struct and `Commands` enum.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

pub(crate) const CLI_LONG_ABOUT: &str =
    "Symbolic path explorer for a small Python-like language.\n\n\
    Every feasible path through the entry function is solved for concrete\n\
    inputs, and every assert that can fail gets one counterexample.\n\n\
    Typical use:\n  \
    1. sympath check program.py\n  \
    2. sympath eval program.py\n  \
    3. sympath run program.py";

#[derive(Parser)]
#[command(name = "sympath")]
#[command(about = "Symbolic path explorer for a small Python-like language")]
#[command(long_about = CLI_LONG_ABOUT)]
#[command(version)]
pub(crate) struct Cli {
    #[command(flatten)]
    pub(crate) global: GlobalArgs,

    #[command(subcommand)]
    pub(crate) command: Commands,
}

/// Flags shared by every subcommand.
#[derive(Args, Debug, Clone)]
pub(crate) struct GlobalArgs {
    /// Solver backend: z3 | cvc5
    #[arg(long, global = true, default_value = "z3")]
    pub(crate) solver: String,

    /// Per-query solver timeout in seconds (0 disables)
    #[arg(long, global = true, default_value_t = 30)]
    pub(crate) timeout: u64,

    /// Path to the cvc5 executable (default: `cvc5` on PATH)
    #[arg(long, global = true)]
    pub(crate) cvc5_path: Option<PathBuf>,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Explore every path of the entry function
    Eval {
        /// Path to the program file
        file: PathBuf,

        /// Entry function
        #[arg(long, default_value = "main")]
        entry: String,

        /// Output format: text | json
        #[arg(long, default_value = "text")]
        format: String,

        /// Keep the false branch of an `if` without `else` even when the
        /// body can fall through
        #[arg(long, default_value_t = false)]
        keep_else: bool,
    },

    /// Run the entry function once with every input set to 0
    Run {
        /// Path to the program file
        file: PathBuf,

        /// Entry function
        #[arg(long, default_value = "main")]
        entry: String,
    },

    /// Parse and validate everything reachable from the entry function
    Check {
        /// Path to the program file
        file: PathBuf,

        /// Entry function
        #[arg(long, default_value = "main")]
        entry: String,

        /// Output format: text | json
        #[arg(long, default_value = "text")]
        format: String,
    },
}
