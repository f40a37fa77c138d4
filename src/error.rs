use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Input, target or topology widths disagree.
    DimensionMismatch(String),
    /// Any error surfaced while the training loop was running.
    Training(Box<Error>),
    /// The run was interrupted before processing `example` of `epoch`.
    Cancelled { epoch: usize, example: usize },
    InvalidConfig(String),
    InvalidData(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn training(source: Error) -> Self {
        match source {
            // Already wrapped, or not a failure of the loop itself.
            e @ (Error::Training(_) | Error::Cancelled { .. }) => e,
            e => Error::Training(Box::new(e)),
        }
    }

    /// Returns the innermost error, looking through `Training`.
    pub fn root_cause(&self) -> &Error {
        match self {
            Error::Training(inner) => inner.root_cause(),
            e => e,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::DimensionMismatch(msg) => write!(f, "dimension mismatch: {msg}"),
            Error::Training(inner) => write!(f, "training failed: {inner}"),
            Error::Cancelled { epoch, example } => {
                write!(f, "training cancelled at epoch {epoch}, example {example}")
            }
            Error::InvalidConfig(msg) => write!(f, "invalid config: {msg}"),
            Error::InvalidData(msg) => write!(f, "invalid data: {msg}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Training(inner) => Some(inner.as_ref()),
            _ => None,
        }
    }
}
