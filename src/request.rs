//! Incoming HTTP request type.

use std::borrow::Cow;

use bytes::Bytes;
use http::header::{ACCEPT, CONTENT_TYPE};
use http::request::Parts;
use http::{HeaderMap, Method, Uri};

/// An incoming HTTP request with its body already buffered.
///
/// The server collects the body before the handler runs, so decoding is a
/// plain synchronous call on bytes that are already in memory.
pub struct Request {
    parts: Parts,
    body: Bytes,
}

impl Request {
    pub fn new(parts: Parts, body: Bytes) -> Self {
        Self { parts, body }
    }

    pub fn method(&self) -> &Method { &self.parts.method }
    pub fn uri(&self) -> &Uri { &self.parts.uri }
    pub fn path(&self) -> &str { self.parts.uri.path() }
    pub fn headers(&self) -> &HeaderMap { &self.parts.headers }
    pub fn body(&self) -> &[u8] { &self.body }

    /// Header lookup. Names are case-insensitive; values that are not
    /// visible ASCII read as absent.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.parts.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// The `Accept` header, or `""` when the client sent none.
    ///
    /// Repeated `Accept` lines are one list (RFC 9110 §5.3), so they are
    /// joined with commas. Lines that are not visible ASCII are skipped.
    pub fn accept(&self) -> Cow<'_, str> {
        let mut lines = self.parts.headers.get_all(ACCEPT).iter().filter_map(|v| v.to_str().ok());
        let Some(first) = lines.next() else {
            return Cow::Borrowed("");
        };
        match lines.next() {
            None => Cow::Borrowed(first),
            Some(second) => {
                let mut joined = format!("{first},{second}");
                for line in lines {
                    joined.push(',');
                    joined.push_str(line);
                }
                Cow::Owned(joined)
            }
        }
    }

    /// `None` when absent, and also when the value is not visible ASCII;
    /// [`Negotiator::decode`](crate::Negotiator::decode) tells those apart.
    pub fn content_type(&self) -> Option<&str> {
        self.parts.headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok())
    }
}

impl From<http::Request<Bytes>> for Request {
    fn from(req: http::Request<Bytes>) -> Self {
        let (parts, body) = req.into_parts();
        Self { parts, body }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_lookup_ignores_case() {
        let req = Request::from(
            http::Request::builder()
                .uri("/repositories?regex=x")
                .header("Content-Type", "application/json")
                .body(Bytes::from_static(b"{}"))
                .unwrap(),
        );
        assert_eq!(req.header("content-type"), Some("application/json"));
        assert_eq!(req.content_type(), Some("application/json"));
        assert_eq!(req.path(), "/repositories");
        assert_eq!(req.body(), b"{}");
        assert_eq!(req.accept(), "");
    }

    #[test]
    fn repeated_accept_lines_are_joined() {
        let req = Request::from(
            http::Request::builder()
                .header("accept", "text/html")
                .header("accept", "text/yaml;q=0.5")
                .header("accept", "application/json")
                .body(Bytes::new())
                .unwrap(),
        );
        assert_eq!(req.accept(), "text/html,text/yaml;q=0.5,application/json");

        let single = Request::from(http::Request::builder().header("accept", "text/yaml").body(Bytes::new()).unwrap());
        assert!(matches!(single.accept(), Cow::Borrowed("text/yaml")));
    }
}
