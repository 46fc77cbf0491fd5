use std::{error, fmt, io, path::PathBuf};

/// The crate's result type.
pub type Result<T> = std::result::Result<T, Error>;

/// All errors that can occur while building, training or running a network.
#[derive(Debug)]
pub enum Error {
    /// Invalid topology or training settings, caught before any work is done.
    Configuration(String),
    /// A vector's length does not match the layer it is fed to.
    ShapeMismatch { expected: usize, got: usize },
    /// A saved model could not be read back into the current topology.
    PersistenceLoad { path: PathBuf, reason: String },
    /// Writing a model file failed.
    PersistenceSave { path: PathBuf, source: io::Error },
    /// Training hit its epoch cap without meeting every tolerance.
    MaxEpochsExceeded { epochs: usize },
    /// Training was cancelled from another thread.
    Cancelled { epochs: usize },
    /// A configuration file could not be parsed.
    Config(serde_json::Error),
    /// An underlying I/O error not covered by the above variants.
    Io(io::Error),
}

impl Error {
    pub(crate) fn load<P: Into<PathBuf>, S: ToString>(path: P, reason: S) -> Self {
        Error::PersistenceLoad {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn save<P: Into<PathBuf>>(path: P, source: io::Error) -> Self {
        Error::PersistenceSave {
            path: path.into(),
            source,
        }
    }

    /// Returns `Ok` when `got` equals `expected`, a `ShapeMismatch` otherwise.
    pub(crate) fn check_len(expected: usize, got: usize) -> Result<()> {
        if expected == got {
            Ok(())
        } else {
            Err(Error::ShapeMismatch { expected, got })
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Configuration(msg) => write!(f, "invalid configuration: {msg}"),
            Error::ShapeMismatch { expected, got } => {
                write!(f, "shape mismatch: expected {expected} values, got {got}")
            }
            Error::PersistenceLoad { path, reason } => {
                write!(f, "unable to load model from {}: {reason}", path.display())
            }
            Error::PersistenceSave { path, source } => {
                write!(f, "unable to save model to {}: {source}", path.display())
            }
            Error::MaxEpochsExceeded { epochs } => {
                write!(f, "training did not converge within {epochs} epochs")
            }
            Error::Cancelled { epochs } => write!(f, "training cancelled after {epochs} epochs"),
            Error::Config(e) => write!(f, "malformed configuration file: {e}"),
            Error::Io(e) => write!(f, "io error: {e}"),
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Error::PersistenceSave { source, .. } => Some(source),
            Error::Config(e) => Some(e),
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Config(e)
    }
}
