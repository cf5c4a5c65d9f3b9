#![doc = include_str!("../README.md")]

mod cli;
mod commands;

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
use commands::CommandStatus;

fn dispatch(cli: Cli) -> miette::Result<CommandStatus> {
    let Cli { global, command } = cli;
    match command {
        Commands::Eval {
            file,
            entry,
            format,
            keep_else,
        } => commands::eval::run_eval_command(&global, file, entry, format, keep_else),
        Commands::Run { file, entry } => commands::run::run_run_command(file, entry),
        Commands::Check {
            file,
            entry,
            format,
        } => commands::check::run_check_command(file, entry, format),
    }
}

fn main() -> ExitCode {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match dispatch(cli) {
        Ok(status) => status.exit_code(),
        Err(report) => {
            eprintln!("{report:?}");
            ExitCode::from(2)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_are_accepted_after_the_subcommand() {
        let cli = Cli::try_parse_from([
            "sympath", "eval", "p.py", "--solver", "cvc5", "--timeout", "5", "--keep-else",
        ])
        .unwrap();
        assert_eq!(cli.global.solver, "cvc5");
        assert_eq!(cli.global.timeout, 5);
        assert!(matches!(cli.command, Commands::Eval { keep_else: true, .. }));
    }

    #[test]
    fn eval_flags_build_explore_options() {
        use sympath_engine::options::{ElseFallthrough, SolverChoice};

        let cli = Cli::try_parse_from([
            "sympath", "--cvc5-path", "/opt/cvc5", "eval", "p.py", "--entry", "go",
        ])
        .unwrap();
        let options = commands::helpers::explore_options(&cli.global, "go", false).unwrap();
        assert_eq!(options.solver, SolverChoice::Z3);
        assert_eq!(options.entry, "go");
        assert_eq!(options.timeout_secs, 30);
        assert_eq!(options.else_fallthrough, ElseFallthrough::Drop);
        assert_eq!(options.cvc5_command.as_deref(), Some("/opt/cvc5"));
    }
}
