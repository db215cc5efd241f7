use crate::Error;
use serde::Serialize;
use std::fmt;
use std::io::ErrorKind;

/// High-level reason a pipeline status fetch failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchFailureKind {
    Auth,
    NotFound,
    Network,
    Timeout,
    Malformed,
    Launch,
    Unknown,
}

impl FetchFailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FetchFailureKind::Auth => "auth",
            FetchFailureKind::NotFound => "not_found",
            FetchFailureKind::Network => "network",
            FetchFailureKind::Timeout => "timeout",
            FetchFailureKind::Malformed => "malformed",
            FetchFailureKind::Launch => "launch",
            FetchFailureKind::Unknown => "unknown",
        }
    }
}

impl fmt::Display for FetchFailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify a crate-level error into a fetch failure reason.
pub fn classify_error(err: &Error) -> FetchFailureKind {
    match err {
        Error::Fetch { kind, .. } => *kind,
        Error::Io(io_err) => classify_io_error(io_err),
        Error::Parse(_) => FetchFailureKind::Malformed,
        Error::InvalidArgs(_) | Error::Config(_) | Error::EventLoop(_) => {
            FetchFailureKind::Unknown
        }
    }
}

/// Classify an io error raised while launching or talking to the client.
pub fn classify_io_error(err: &std::io::Error) -> FetchFailureKind {
    match err.kind() {
        ErrorKind::NotFound | ErrorKind::PermissionDenied => FetchFailureKind::Launch,
        ErrorKind::TimedOut | ErrorKind::WouldBlock => FetchFailureKind::Timeout,
        ErrorKind::ConnectionRefused
        | ErrorKind::ConnectionReset
        | ErrorKind::ConnectionAborted
        | ErrorKind::BrokenPipe => FetchFailureKind::Network,
        ErrorKind::InvalidData => FetchFailureKind::Malformed,
        _ => FetchFailureKind::Unknown,
    }
}

/// Classify the stderr text of a failed `aws` invocation.
pub fn classify_cli_stderr(stderr: &str) -> FetchFailureKind {
    const AUTH_MARKERS: [&str; 6] = [
        "UnrecognizedClientException",
        "InvalidSignatureException",
        "AccessDenied",
        "ExpiredToken",
        "InvalidClientTokenId",
        "Unable to locate credentials",
    ];
    const NETWORK_MARKERS: [&str; 4] = [
        "Could not connect to the endpoint URL",
        "EndpointConnectionError",
        "Connection was closed",
        "Name or service not known",
    ];

    if AUTH_MARKERS.iter().any(|m| stderr.contains(m)) {
        FetchFailureKind::Auth
    } else if stderr.contains("PipelineNotFoundException") {
        FetchFailureKind::NotFound
    } else if NETWORK_MARKERS.iter().any(|m| stderr.contains(m)) {
        FetchFailureKind::Network
    } else if stderr.contains("Read timeout") || stderr.contains("timed out") {
        FetchFailureKind::Timeout
    } else {
        FetchFailureKind::Unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_missing_binary_as_launch() {
        let err = std::io::Error::new(ErrorKind::NotFound, "no aws");
        assert_eq!(classify_io_error(&err), FetchFailureKind::Launch);
    }

    #[test]
    fn classify_timeout_and_reset() {
        let timeout = std::io::Error::new(ErrorKind::TimedOut, "timeout");
        assert_eq!(classify_io_error(&timeout), FetchFailureKind::Timeout);
        let reset = std::io::Error::new(ErrorKind::ConnectionReset, "reset");
        assert_eq!(classify_io_error(&reset), FetchFailureKind::Network);
    }

    #[test]
    fn classify_cli_messages() {
        assert_eq!(
            classify_cli_stderr(
                "An error occurred (UnrecognizedClientException) when calling the GetPipelineState operation"
            ),
            FetchFailureKind::Auth
        );
        assert_eq!(
            classify_cli_stderr(
                "An error occurred (PipelineNotFoundException) when calling the GetPipelineState operation"
            ),
            FetchFailureKind::NotFound
        );
        assert_eq!(
            classify_cli_stderr("Could not connect to the endpoint URL: \"https://...\""),
            FetchFailureKind::Network
        );
        assert_eq!(classify_cli_stderr("boom"), FetchFailureKind::Unknown);
    }

    #[test]
    fn classify_crate_errors() {
        let err = Error::fetch(FetchFailureKind::NotFound, "gone");
        assert_eq!(classify_error(&err), FetchFailureKind::NotFound);
        let parse = Error::Parse("oops".into());
        assert_eq!(classify_error(&parse), FetchFailureKind::Malformed);
    }
}
