use std::process::ExitStatus;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PromptError {
    #[error("Exporter {0:?} was added more than once")]
    DuplicateExporter(String),

    #[error("No such exporter {0:?}")]
    ExporterNotFound(String),

    #[error("Failed to start {command:?}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Process {command:?} finished with non-zero exit code: {status}")]
    NonZeroExit { command: String, status: ExitStatus },

    #[error("Failed to read {stream} of {command:?}: {source}")]
    Capture {
        command: String,
        stream: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("Capture of {stream} for {command:?} did not complete")]
    CaptureIncomplete {
        command: String,
        stream: &'static str,
    },

    #[error("Process {command:?} did not finish within {after:?}")]
    ProbeTimeout { command: String, after: Duration },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PromptError>;
