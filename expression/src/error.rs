use std::{error::Error, fmt, io};

/// The expression server's result type.
pub type Result<T> = std::result::Result<T, ExpressionErr>;

/// Failures of the web front-end and its collaborators.
#[derive(Debug)]
pub enum ExpressionErr {
    Io(io::Error),
    /// An environment variable holds an unusable value.
    Config { var: &'static str, msg: String },
    /// The client sent something that is not a well formed HTTP request.
    BadRequest(String),
    /// The request head or body exceeds what the server accepts.
    PayloadTooLarge { limit: usize },
    /// Only plain `http://` URLs can be fetched.
    UnsupportedScheme(String),
    /// The remote image could not be fetched.
    Fetch { url: String, msg: String },
    /// The external classifier failed.
    Classifier(String),
    /// The classifier returned a class with no emotion attached.
    UnknownClass(usize),
    Json(serde_json::Error),
}

impl fmt::Display for ExpressionErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "io error: {e}"),
            Self::Config { var, msg } => write!(f, "invalid {var}: {msg}"),
            Self::BadRequest(msg) => write!(f, "bad request: {msg}"),
            Self::PayloadTooLarge { limit } => {
                write!(f, "payload too large, limit is {limit} bytes")
            }
            Self::UnsupportedScheme(scheme) => write!(f, "unsupported url scheme '{scheme}'"),
            Self::Fetch { url, msg } => write!(f, "fetching {url} failed: {msg}"),
            Self::Classifier(msg) => write!(f, "classifier error: {msg}"),
            Self::UnknownClass(class) => write!(f, "classifier returned unknown class {class}"),
            Self::Json(e) => write!(f, "json error: {e}"),
        }
    }
}

impl Error for ExpressionErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for ExpressionErr {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for ExpressionErr {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

/// Boundary conversion for the binary.
impl From<ExpressionErr> for io::Error {
    fn from(value: ExpressionErr) -> Self {
        match value {
            ExpressionErr::Io(e) => e,
            other => io::Error::new(io::ErrorKind::InvalidData, other),
        }
    }
}
