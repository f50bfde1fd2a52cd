use std::fmt;
use std::path::PathBuf;

/// Represents any failure that can occur at the index's I/O boundaries.
///
/// Parsing itself never fails; malformed lines are classified as plain code
/// and unresolved includes become diagnostics on the file's table.
#[derive(Debug)]
pub enum AsmError {
    Io(std::io::Error),
    Config {
        path: PathBuf,
        message: String,
    },
}

impl From<std::io::Error> for AsmError {
    fn from(err: std::io::Error) -> Self {
        AsmError::Io(err)
    }
}

impl fmt::Display for AsmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AsmError::Io(err) => write!(f, "I/O error: {err}"),
            AsmError::Config { path, message } => {
                write!(f, "configuration error in '{}': {message}", path.display())
            }
        }
    }
}

impl std::error::Error for AsmError {}
