use std::io;
use std::path::PathBuf;

/// Failures inside the executor before a classification exists.
///
/// These never escape `execute`; they become `LaunchFailed`.
#[derive(Debug, thiserror::Error)]
pub enum SandboxError {
    #[error("failed to create scratch file in {dir}: {source}")]
    ScratchFile {
        dir: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write source to scratch file: {0}")]
    WriteSource(#[source] io::Error),

    #[error("failed to spawn '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to wait on child process: {0}")]
    Wait(#[source] io::Error),
}
