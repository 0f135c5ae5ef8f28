use std::{error, fmt, io};

#[derive(Debug)]
pub enum Error {
    NotAuthenticated,
    AuthError,
    InvalidInput(&'static str),
    ConfigError(String),
    Rejected(String),
    NetworkError(Box<dyn error::Error + Send>),
    ParseError(Box<dyn error::Error + Send>),
    IoError(io::Error),
}

impl Error {
    /// True for failures to reach the remote, including explicit rejections.
    pub fn is_network(&self) -> bool {
        matches!(self, Self::NetworkError(_) | Self::Rejected(_))
    }
}

impl error::Error for Error {}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotAuthenticated => write!(f, "Session is not authenticated"),
            Self::AuthError => write!(f, "Authentication failed"),
            Self::InvalidInput(what) => write!(f, "Invalid input: {what}"),
            Self::ConfigError(msg) => write!(f, "Configuration error: {msg}"),
            Self::Rejected(msg) if msg.is_empty() => write!(f, "Remote store rejected the request"),
            Self::Rejected(msg) => write!(f, "Remote store rejected the request: {msg}"),
            Self::NetworkError(err) | Self::ParseError(err) => err.fmt(f),
            Self::IoError(err) => err.fmt(f),
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Error {
        Error::IoError(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Error {
        Error::ParseError(Box::new(err))
    }
}

impl From<ureq::Error> for Error {
    fn from(err: ureq::Error) -> Error {
        match err {
            ureq::Error::Json(err) => Error::ParseError(Box::new(err)),
            err => Error::NetworkError(Box::new(err)),
        }
    }
}

impl From<tempfile::PersistError> for Error {
    fn from(err: tempfile::PersistError) -> Error {
        Error::IoError(err.error)
    }
}
