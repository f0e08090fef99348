//! Child process configuration for sandboxed runs.
//!
//! On Windows, console applications spawn with a visible command prompt window
//! by default; sandboxed children are started without one.

use std::process::Stdio;
use tokio::process::Command;

/// Windows creation flag to prevent console window creation
#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x08000000;

/// Extension trait applying the sandbox's process settings to a command.
pub trait SandboxedCommand {
    /// Null stdin, piped stdout/stderr, killed if the handle is dropped,
    /// no console window on Windows.
    fn sandboxed(&mut self) -> &mut Self;
}

impl SandboxedCommand for Command {
    fn sandboxed(&mut self) -> &mut Self {
        self.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        hide_console_window(self)
    }
}

#[cfg(windows)]
fn hide_console_window(command: &mut Command) -> &mut Command {
    command.creation_flags(CREATE_NO_WINDOW)
}

#[cfg(not(windows))]
fn hide_console_window(command: &mut Command) -> &mut Command {
    command
}

/// Interpreter used when none is configured.
pub fn default_python_command() -> &'static str {
    if cfg!(windows) {
        "python"
    } else {
        "python3"
    }
}
