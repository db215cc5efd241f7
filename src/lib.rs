pub mod app;
pub mod cli;
pub mod config;
pub mod display;
pub mod host;
pub mod pipeline;
pub mod poller;
pub mod settings;

pub use pipeline::errors::FetchFailureKind;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid arguments: {0}")]
    InvalidArgs(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("parse error: {0}")]
    Parse(String),
    #[error("config error: {0}")]
    Config(String),
    #[error("event loop error: {0}")]
    EventLoop(String),
    #[error("pipeline fetch failed ({kind}): {message}")]
    Fetch {
        kind: FetchFailureKind,
        message: String,
    },
}

impl From<serde_json::Error> for Error {
    fn from(value: serde_json::Error) -> Self {
        Error::Parse(value.to_string())
    }
}

impl Error {
    pub fn fetch(kind: FetchFailureKind, message: impl Into<String>) -> Self {
        Error::Fetch {
            kind,
            message: message.into(),
        }
    }
}
