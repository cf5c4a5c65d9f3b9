pub(crate) mod check;
pub(crate) mod eval;
pub(crate) mod helpers;
pub(crate) mod run;

use std::process::ExitCode;

/// How a successful command run should end the process.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum CommandStatus {
    Success,
    /// Exploration finished but disagrees with the program's oracle.
    OracleMismatch,
}

impl CommandStatus {
    pub(crate) fn exit_code(self) -> ExitCode {
        match self {
            CommandStatus::Success => ExitCode::SUCCESS,
            CommandStatus::OracleMismatch => ExitCode::from(1),
        }
    }
}
