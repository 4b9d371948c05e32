use std::fmt;
use std::io;
use std::path::Path;

#[derive(Debug)]
pub struct CliError {
    pub msg: String,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.msg.fmt(f)
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

/// Format a user friendly I/O error message with suggestions.
pub fn format_io_error(operation: &str, path: &Path, err: &io::Error) -> String {
    use io::ErrorKind::*;
    let suggestion = match err.kind() {
        NotFound => "Check that the file exists and the path is correct.",
        PermissionDenied => "Check permissions or run as a different user.",
        UnexpectedEof => "File appears truncated or corrupted.",
        WriteZero => "Disk may be full. Free up space and try again.",
        Other if err.raw_os_error() == Some(28) => "Disk may be full. Free up space and try again.",
        _ => "Check permissions or free up disk space.",
    };
    format!(
        "Error {} '{}': {}. {}",
        operation,
        path.display(),
        err,
        suggestion
    )
}

/// Convert an I/O error into a CLI error with context.
pub fn io_cli_error(operation: &str, path: &Path, err: io::Error) -> CliError {
    CliError {
        msg: format_io_error(operation, path, &err),
        source: Some(Box::new(err)),
    }
}

/// Simple CLI error from string.
pub fn simple_cli_error(msg: &str) -> CliError {
    CliError {
        msg: msg.to_string(),
        source: None,
    }
}

/// Convert a vault library error into a CLI error with a hint. I/O
/// failures keep their operation and path and gain a suggestion.
pub fn vault_cli_error(context: &str, err: crate::VaultError) -> CliError {
    match err {
        crate::VaultError::Io {
            operation,
            path,
            source,
        } => io_cli_error(operation, &path, source),
        err => CliError {
            msg: format!("{}: {}", context, cli_hint(&err)),
            source: Some(Box::new(err)),
        },
    }
}

/// Return an actionable hint for a vault error variant.
pub fn cli_hint(err: &crate::VaultError) -> String {
    use crate::VaultError::*;
    match err {
        Config(msg) => format!("{msg}. Invalid configuration."),
        SizeMismatch(msg) => {
            format!("{msg}. The file was not produced by the builder or is truncated.")
        }
        Io {
            operation,
            path,
            source,
        } => format_io_error(operation, path, source),
        Internal(msg) => format!("{msg}. This is a bug."),
    }
}
