//! Error handling for username checking.
//!
//! Two layers live here. [`UsernameCheckError`] covers failures outside a
//! probe (loading the site list, reading config files, building the HTTP
//! client). [`ProbeFailure`] is the taxonomy of things that can go wrong
//! inside a single probe; it never escapes the probe, it only ever becomes
//! the diagnostic on a [`Verdict`](crate::Verdict).

use thiserror::Error;

/// Main error type for operations around a scan.
#[derive(Debug, Clone, Error)]
pub enum UsernameCheckError {
    /// Site list or config file could not be found or read
    #[error("File error at '{path}': {message}")]
    FileError { path: String, message: String },

    /// Site list or config file is not valid JSON/TOML
    #[error("Parse error: {message}")]
    ParseError { message: String },

    /// A site descriptor violates its invariants
    #[error("Invalid site '{site}': {reason}")]
    InvalidSite { site: String, reason: String },

    /// Configuration errors (invalid settings, etc.)
    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    /// HTTP client could not be constructed
    #[error("Network error: {message}")]
    NetworkError { message: String },

    /// Generic internal errors that don't fit other categories
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl UsernameCheckError {
    /// Create a new file error.
    pub fn file_error<P: Into<String>, M: Into<String>>(path: P, message: M) -> Self {
        Self::FileError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a new parse error.
    pub fn parse<M: Into<String>>(message: M) -> Self {
        Self::ParseError {
            message: message.into(),
        }
    }

    /// Create a new invalid site error.
    pub fn invalid_site<S: Into<String>, R: Into<String>>(site: S, reason: R) -> Self {
        Self::InvalidSite {
            site: site.into(),
            reason: reason.into(),
        }
    }

    /// Create a new configuration error.
    pub fn config<M: Into<String>>(message: M) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    /// Create a new network error.
    pub fn network<M: Into<String>>(message: M) -> Self {
        Self::NetworkError {
            message: message.into(),
        }
    }

    /// Create a new internal error.
    pub fn internal<M: Into<String>>(message: M) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for UsernameCheckError {
    fn from(err: std::io::Error) -> Self {
        Self::internal(format!("I/O error: {}", err))
    }
}

impl From<serde_json::Error> for UsernameCheckError {
    fn from(err: serde_json::Error) -> Self {
        Self::parse(format!("JSON parsing failed: {}", err))
    }
}

impl From<toml::de::Error> for UsernameCheckError {
    fn from(err: toml::de::Error) -> Self {
        Self::parse(format!("TOML parsing failed: {}", err))
    }
}

/// Everything that can stop a single probe from producing a classified response.
///
/// The `Display` output is the exact diagnostic stored on the verdict.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProbeFailure {
    /// The request did not finish within the configured timeout
    #[error("Timeout")]
    Timeout,

    /// No connection could be established
    #[error("Connection failed")]
    ConnectionFailure,

    /// TLS negotiation failed or the URL scheme is not supported
    #[error("SSL/TLS error")]
    ProtocolFailure,

    /// The template did not resolve to a usable absolute URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// The scan was cancelled before this probe finished
    #[error("Cancelled")]
    Cancelled,

    /// Anything else
    #[error("{0}")]
    Other(String),
}

impl ProbeFailure {
    /// Classify a reqwest error into the probe taxonomy.
    ///
    /// TLS problems surface from reqwest as connect errors, so the source
    /// chain is inspected before falling back to the connect flag.
    pub fn from_reqwest(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            return Self::Timeout;
        }
        if is_tls_error(err) {
            return Self::ProtocolFailure;
        }
        if err.is_connect() {
            return Self::ConnectionFailure;
        }
        if err.is_builder() {
            return Self::ProtocolFailure;
        }
        Self::Other(err.to_string())
    }
}

// The top-level reqwest message embeds the URL, so only the sources are inspected.
fn is_tls_error(err: &(dyn std::error::Error + 'static)) -> bool {
    let mut current = err.source();
    while let Some(e) = current {
        if is_tls_cause(e) {
            return true;
        }
        current = e.source();
    }
    false
}

fn is_tls_cause(err: &(dyn std::error::Error + 'static)) -> bool {
    if err.downcast_ref::<rustls::Error>().is_some() {
        return true;
    }

    // tokio-rustls reports handshake failures as an io::Error wrapping the
    // rustls error, and io::Error::source skips the wrapped value.
    if let Some(inner) = err
        .downcast_ref::<std::io::Error>()
        .and_then(std::io::Error::get_ref)
    {
        if inner.downcast_ref::<rustls::Error>().is_some() {
            return true;
        }
    }

    let msg = err.to_string().to_lowercase();
    msg.contains("tls")
        || msg.contains("ssl")
        || msg.contains("certificate")
        || msg.contains("handshake")
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Stand-in for reqwest's connect error wrapping an I/O cause.
    #[derive(Debug)]
    struct Outer(std::io::Error);

    impl std::fmt::Display for Outer {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "error trying to connect")
        }
    }

    impl std::error::Error for Outer {
        fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
            Some(&self.0)
        }
    }

    #[test]
    fn test_probe_failure_diagnostics() {
        assert_eq!(ProbeFailure::Timeout.to_string(), "Timeout");
        assert_eq!(
            ProbeFailure::ConnectionFailure.to_string(),
            "Connection failed"
        );
        assert_eq!(ProbeFailure::ProtocolFailure.to_string(), "SSL/TLS error");
        assert_eq!(ProbeFailure::Cancelled.to_string(), "Cancelled");
        assert_eq!(
            ProbeFailure::InvalidUrl("relative URL without a base".into()).to_string(),
            "Invalid URL: relative URL without a base"
        );
        assert_eq!(ProbeFailure::Other("boom".into()).to_string(), "boom");
    }

    #[test]
    fn test_error_display() {
        let err = UsernameCheckError::file_error("sites.json", "not found");
        assert_eq!(err.to_string(), "File error at 'sites.json': not found");

        let err = UsernameCheckError::invalid_site("GitHub", "missing placeholder");
        assert_eq!(err.to_string(), "Invalid site 'GitHub': missing placeholder");
    }

    #[test]
    fn test_from_serde_json_error() {
        let err: UsernameCheckError = serde_json::from_str::<serde_json::Value>("{")
            .unwrap_err()
            .into();
        assert!(matches!(err, UsernameCheckError::ParseError { .. }));
    }

    #[test]
    fn test_tls_detection_walks_source_chain() {
        let tls = Outer(std::io::Error::other("invalid peer certificate: UnknownIssuer"));
        assert!(is_tls_error(&tls));

        let refused = Outer(std::io::Error::other("Connection refused (os error 111)"));
        assert!(!is_tls_error(&refused));
    }

    #[test]
    fn test_tls_detection_finds_wrapped_rustls_error() {
        // No keyword in the message: only the type identifies it as TLS
        let rustls_err = rustls::Error::General("received corrupt message".into());
        assert!(!rustls_err.to_string().to_lowercase().contains("tls"));

        let wrapped = Outer(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            rustls_err,
        ));
        assert!(is_tls_error(&wrapped));
    }
}
