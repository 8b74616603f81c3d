//! Unified error type.

use std::fmt;

use http::StatusCode;

/// Boxed source error carried by codec failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The error type returned by conneg's fallible operations.
///
/// Nothing in this crate logs or retries: every failure comes back to the
/// caller, who picks the status code and the message the client sees.
/// [`Error::status`] offers the conventional mapping.
#[derive(Debug)]
pub enum Error {
    /// The plain-text codec was handed a value it cannot render as text.
    UnsupportedKind(&'static str),
    /// No codec is registered for this media type.
    UnsupportedMediaType(String),
    /// The body was present but malformed for the chosen codec.
    DecodeFailure(BoxError),
    /// The value could not be serialized by the chosen codec.
    MarshalFailure(BoxError),
    /// A socket-level failure: binding a port or accepting a connection.
    Io(std::io::Error),
}

impl Error {
    /// The HTTP status a handler would normally answer with for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Self::DecodeFailure(_)        => StatusCode::BAD_REQUEST,
            Self::UnsupportedKind(_)
            | Self::MarshalFailure(_)
            | Self::Io(_)                 => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub(crate) fn decode<E: Into<BoxError>>(e: E) -> Self {
        Self::DecodeFailure(e.into())
    }

    pub(crate) fn marshal<E: Into<BoxError>>(e: E) -> Self {
        Self::MarshalFailure(e.into())
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedKind(kind) => write!(f, "unsupported kind: cannot render {kind} as text"),
            Self::UnsupportedMediaType(mt) => write!(f, "unsupported media type: {mt}"),
            Self::DecodeFailure(e) => write!(f, "decode failure: {e}"),
            Self::MarshalFailure(e) => write!(f, "marshal failure: {e}"),
            Self::Io(e) => write!(f, "io: {e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::DecodeFailure(e) | Self::MarshalFailure(e) => Some(e.as_ref()),
            Self::Io(e) => Some(e),
            Self::UnsupportedKind(_) | Self::UnsupportedMediaType(_) => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert_eq!(Error::UnsupportedMediaType("a/b".into()).status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert_eq!(Error::decode("bad").status(), StatusCode::BAD_REQUEST);
        assert_eq!(Error::UnsupportedKind("map").status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn display_names_the_media_type() {
        let e = Error::UnsupportedMediaType("application/xml".into());
        assert_eq!(e.to_string(), "unsupported media type: application/xml");
    }

    #[test]
    fn source_is_exposed() {
        use std::error::Error as _;
        let e = Error::marshal("boom");
        assert_eq!(e.source().map(|s| s.to_string()).as_deref(), Some("boom"));
        assert!(Error::UnsupportedKind("null").source().is_none());
    }
}
