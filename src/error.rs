use std::fmt::{self, Debug, Display, Formatter};
use std::time::Duration;

use derive_more::Display;

pub(crate) type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A set of errors that can occur while talking to the portal, streaming its
/// login page and relaying telemetry.
#[derive(Display)]
#[non_exhaustive]
pub enum Error {
    /// The transport couldn't deliver the request or receive a response head.
    #[display(fmt = "transport failed: {}", _0)]
    TransportFailed(BoxError),

    /// The transport gave up after its per-request timeout.
    #[display(fmt = "request timed out after {:?}", limit)]
    Timeout { limit: Duration },

    /// The server answered with a status outside the `2xx` range.
    #[display(fmt = "unexpected status {} from {}", status, url)]
    UnexpectedStatus { url: String, status: http::StatusCode },

    /// Reading the response body failed midway.
    #[display(fmt = "stream read failed: {}", _0)]
    StreamReadFailed(BoxError),

    /// The portal page ended before all four login form fields were found.
    #[display(fmt = "response ended before the login form was fully parsed")]
    IncompleteForm,

    /// A single line of the portal page exceeded the configured maximum length.
    #[display(fmt = "line exceeded the maximum length limit: {} bytes", limit)]
    LineTooLong { limit: usize },

    /// The telemetry document exceeded the configured maximum size.
    #[display(fmt = "payload exceeded the maximum size limit: {} bytes", limit)]
    PayloadTooLarge { limit: usize },

    /// A configured URL couldn't be turned into a request target.
    #[display(fmt = "invalid url {:?}: {}", url, cause)]
    InvalidUrl { url: String, cause: BoxError },

    /// A configured value couldn't be used as a header value.
    #[display(fmt = "invalid value for header {}: {}", name, cause)]
    InvalidHeaderValue { name: String, cause: BoxError },

    /// Failed to read the configuration file.
    #[display(fmt = "failed to read configuration: {}", _0)]
    ReadConfig(std::io::Error),

    /// Failed to decode the configuration file as `JSON`.
    #[cfg(feature = "json")]
    #[display(fmt = "failed to decode configuration as JSON: {}", _0)]
    DecodeJson(serde_json::Error),
}

impl Debug for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(self, f)
    }
}

impl std::error::Error for Error {}

impl PartialEq for Error {
    fn eq(&self, other: &Self) -> bool {
        self.to_string().eq(&other.to_string())
    }
}

impl Eq for Error {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = Error::UnexpectedStatus {
            url: "http://portal.local/login".to_owned(),
            status: http::StatusCode::INTERNAL_SERVER_ERROR,
        };
        assert_eq!(
            err.to_string(),
            "unexpected status 500 Internal Server Error from http://portal.local/login"
        );

        assert_eq!(
            Error::LineTooLong { limit: 16 }.to_string(),
            "line exceeded the maximum length limit: 16 bytes"
        );
        assert_eq!(Error::IncompleteForm, Error::IncompleteForm);
        assert_ne!(Error::IncompleteForm, Error::PayloadTooLarge { limit: 1 });
    }
}
