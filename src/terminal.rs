use std::io::{self, IsTerminal};

/// Terminal capabilities used to pick output and log formats.
pub trait TerminalClient {
    /// Whether standard output is attached to a terminal.
    fn stdout_is_terminal(&self) -> bool;
    /// Whether standard error is attached to a terminal.
    fn stderr_is_terminal(&self) -> bool;
}

/// Terminal client backed by the process's real standard streams.
pub(crate) struct SystemTerminalClient;

impl TerminalClient for SystemTerminalClient {
    fn stdout_is_terminal(&self) -> bool {
        io::stdout().is_terminal()
    }

    fn stderr_is_terminal(&self) -> bool {
        io::stderr().is_terminal()
    }
}
