//! Low-level writing logic for output routing

use super::config::OutputMode;
use std::io::{self, Write};

/// Write output based on the current mode and output type
pub fn write_output(
    mode: OutputMode,
    is_display: bool,
    args: std::fmt::Arguments,
) -> io::Result<()> {
    match (mode, is_display) {
        (OutputMode::Cli, true) => {
            let mut stdout = io::stdout().lock();
            stdout.write_fmt(args)?;
            stdout.flush()
        }
        // Logs, and everything in report mode, go to stderr
        _ => {
            let mut stderr = io::stderr().lock();
            stderr.write_fmt(args)?;
            stderr.flush()
        }
    }
}

/// Write output with newline based on the current mode and output type
pub fn writeln_output(
    mode: OutputMode,
    is_display: bool,
    args: std::fmt::Arguments,
) -> io::Result<()> {
    write_output(mode, is_display, format_args!("{args}\n"))
}
