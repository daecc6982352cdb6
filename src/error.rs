use std::fmt::Display;

use reqwest::StatusCode;

/// Failure of a single seed's pipeline. Never fatal to the run.
#[derive(Debug)]
pub enum Error {
    Internal(String),
    Reqwest(reqwest::Error),
    Io(std::io::Error),
    RequestReturnedError(StatusCode),
    NoSummaryLink { page: String },
    InvalidUrl { url: String, source: url::ParseError },
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Internal(msg) => write!(f, "internal error: {}", msg),
            Self::Reqwest(err) => write!(f, "reqwest error: {}", err),
            Self::Io(err) => write!(f, "io error: {}", err),
            Self::RequestReturnedError(status) => write!(f, "the request returned '{}'", status),
            Self::NoSummaryLink { page } => write!(f, "no summary link found on '{}'", page),
            Self::InvalidUrl { url, .. } => write!(f, "invalid url '{}'", url),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Internal(_) | Self::RequestReturnedError(_) | Self::NoSummaryLink { .. } => None,
            Self::Reqwest(err) => Some(err),
            Self::Io(err) => Some(err),
            Self::InvalidUrl { source, .. } => Some(source),
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Self::Reqwest(err)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}
