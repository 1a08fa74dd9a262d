//! Backend error types.

use thiserror::Error;

/// Errors raised while retrieving or interpreting a document.
#[derive(Error, Debug)]
pub enum BackendError {
    /// The HTTP request could not be completed.
    #[error("failed to fetch {url}: {source}")]
    Http {
        /// The requested URL.
        url: String,
        /// The underlying client error.
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with a non-success status.
    #[error("failed to fetch {url}: HTTP {status}")]
    Status {
        /// The requested URL.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// A JSON API response could not be parsed.
    #[error("invalid JSON from {url}: {source}")]
    Json {
        /// The requested URL.
        url: String,
        /// The underlying parse error.
        #[source]
        source: serde_json::Error,
    },

    /// A request URL could not be built.
    #[error("invalid URL {url}: {reason}")]
    InvalidUrl {
        /// The offending URL.
        url: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The document does not exist.
    #[error("{what} not found")]
    NotFound {
        /// Description of the missing document.
        what: String,
    },

    /// No revision of an Internet-Draft could be located.
    #[error("could not find any version of {name}")]
    NoVersion {
        /// The unversioned draft name.
        name: String,
    },

    /// Both the text and HTML renditions failed.
    #[error("text error: {text}; HTML error: {html}")]
    Renditions {
        /// Failure fetching the plain-text rendition.
        text: Box<BackendError>,
        /// Failure fetching the HTML rendition.
        html: Box<BackendError>,
    },
}

impl BackendError {
    /// Returns `true` if the error means the document does not exist.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::NotFound { .. } | Self::Status { status: 404, .. } | Self::NoVersion { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_error_display() {
        let err = BackendError::Status {
            url: "https://example.org/rfc1.txt".to_string(),
            status: 404,
        };
        assert_eq!(
            err.to_string(),
            "failed to fetch https://example.org/rfc1.txt: HTTP 404"
        );
        assert!(err.is_not_found());
    }

    #[test]
    fn renditions_error_names_both_failures() {
        let err = BackendError::Renditions {
            text: Box::new(BackendError::Status {
                url: "t".to_string(),
                status: 500,
            }),
            html: Box::new(BackendError::NotFound {
                what: "h".to_string(),
            }),
        };
        let msg = err.to_string();
        assert!(msg.contains("HTTP 500"));
        assert!(msg.contains("h not found"));
        assert!(!err.is_not_found());
    }
}
