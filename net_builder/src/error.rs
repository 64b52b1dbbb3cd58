use std::{error::Error, fmt, io};

/// The net builder's result type.
pub type Result<T> = std::result::Result<T, BuilderErr>;

/// All errors that can occur while assembling or handing off a network.
#[derive(Debug)]
pub enum BuilderErr {
    /// `get_net` was called before any layer was added.
    EmptyNet,
    /// A layer carries an out of range hyperparameter.
    InvalidLayer {
        index: usize,
        layer: &'static str,
        msg: String,
    },
    /// Two adjacent layers cannot be wired together.
    InvalidTopology { index: usize, msg: String },
    /// A net level hyperparameter has the wrong type or range.
    InvalidParam { name: String, msg: String },
    /// The network description could not be encoded or decoded.
    Json(serde_json::Error),
    /// Reading or writing a network description failed.
    Io(io::Error),
}

impl fmt::Display for BuilderErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyNet => write!(f, "the network has no layers"),
            Self::InvalidLayer { index, layer, msg } => {
                write!(f, "layer {index} ({layer}): {msg}")
            }
            Self::InvalidTopology { index, msg } => write!(f, "layer {index}: {msg}"),
            Self::InvalidParam { name, msg } => write!(f, "param '{name}': {msg}"),
            Self::Json(e) => write!(f, "json error: {e}"),
            Self::Io(e) => write!(f, "io error: {e}"),
        }
    }
}

impl Error for BuilderErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Json(e) => Some(e),
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for BuilderErr {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<serde_json::Error> for BuilderErr {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e)
    }
}
