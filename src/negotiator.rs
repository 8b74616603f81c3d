//! Content negotiation: pick a response encoding from `Accept`, decode
//! request bodies by `Content-Type`.
//!
//! A [`Negotiator`] is built once, before the server starts, and is read-only
//! afterwards. Share it between handlers with an `Arc`; no locking is needed.
//!
//! ```rust
//! use conneg::{Codec, Negotiator};
//!
//! let negotiator = Negotiator::builder("application/json")
//!     .with_defaults()
//!     .codec("application/vnd.repo+json", Codec::json())
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(negotiator.negotiate("").as_str(), "application/json");
//! assert_eq!(negotiator.negotiate("text/html;q=0.8, text/yaml").as_str(), "text/yaml");
//! ```

use std::collections::HashMap;
use std::fmt;

use http::StatusCode;
use http::header::CONTENT_TYPE;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, trace};

use crate::codec::{Codec, Textual};
use crate::error::Error;
use crate::media::{self, MediaType};
use crate::request::Request;
use crate::response::Response;

/// Chooses response encodings and decodes request bodies.
#[derive(Debug)]
pub struct Negotiator {
    default: MediaType,
    codecs: HashMap<MediaType, Codec>,
}

impl Negotiator {
    /// Starts a registry whose fallback encoding is `default_encoding`.
    pub fn builder(default_encoding: &str) -> NegotiatorBuilder {
        NegotiatorBuilder::new(default_encoding)
    }

    pub fn default_encoding(&self) -> &MediaType { &self.default }

    pub fn codec(&self, media_type: &str) -> Option<&Codec> {
        self.codecs.get(&MediaType::parse(media_type))
    }

    /// Picks the media type for a response.
    ///
    /// Always returns a registered type: the highest-weighted `Accept` entry
    /// that has a codec, or the default encoding when the header is empty,
    /// is only `*/*`, or names nothing registered. Wildcard ranges such as
    /// `audio/*` are never expanded.
    pub fn negotiate(&self, accept: &str) -> &MediaType {
        if media::is_wildcard_only(accept) {
            return &self.default;
        }
        let chosen = media::parse_accept(accept)
            .into_iter()
            .find_map(|entry| self.codecs.get_key_value(&entry.media_type).map(|(k, _)| k));
        match chosen {
            Some(mt) => {
                trace!(accept, chosen = %mt, "negotiated");
                mt
            }
            None => {
                debug!(accept, default = %self.default, "no acceptable codec, using default");
                &self.default
            }
        }
    }

    /// Serializes `value` in the negotiated encoding.
    ///
    /// On success the response carries `status`, a `content-type` naming the
    /// chosen media type, and the encoded body. On failure nothing has been
    /// written; the caller decides what to send instead.
    ///
    /// ```rust
    /// use conneg::{Negotiator, Request};
    /// use http::StatusCode;
    ///
    /// let req = Request::from(http::Request::new(bytes::Bytes::new()));
    /// let res = Negotiator::default().encode(&req, &["hello", "world"], StatusCode::OK).unwrap();
    /// assert_eq!(res.content_type(), Some("application/json"));
    /// assert_eq!(res.body(), br#"["hello","world"]"#);
    /// ```
    pub fn encode<T>(&self, req: &Request, value: &T, status: StatusCode) -> Result<Response, Error>
    where
        T: Serialize + ?Sized,
    {
        let media_type = self.negotiate(&req.accept());
        let body = self.lookup(media_type)?.marshal(value)?;
        Ok(Response::builder().status(status).body(media_type.as_str(), body))
    }

    /// Deserializes the request body according to its `Content-Type`.
    ///
    /// A request without `Content-Type` is read as the default encoding.
    /// Parameters such as `charset` are ignored for codec lookup. A header
    /// that is present but not visible ASCII names no codec and is rejected.
    pub fn decode<T: DeserializeOwned>(&self, req: &Request) -> Result<T, Error> {
        let media_type = match req.headers().get(CONTENT_TYPE) {
            Some(ct) => match ct.to_str() {
                Ok(ct) => MediaType::parse(ct),
                Err(_) => {
                    return Err(Error::UnsupportedMediaType(String::from_utf8_lossy(ct.as_bytes()).into_owned()));
                }
            },
            None => self.default.clone(),
        };
        self.lookup(&media_type)?.unmarshal(req.body())
    }

    /// Builds an error response in whatever format the client accepts.
    ///
    /// The body is `{"status": "<reason>", "message": "<err>"}`. When the
    /// negotiated type cannot carry a structured value (plain text), the
    /// message alone is sent as `text/plain`.
    pub fn error_response(&self, req: &Request, status: StatusCode, err: &dyn fmt::Display) -> Response {
        let body = ErrorBody {
            status: status.canonical_reason().unwrap_or_default(),
            message: Textual(err),
        };
        self.encode(req, &body, status).unwrap_or_else(|_| {
            Response::builder().status(status).body("text/plain; charset=utf-8", err.to_string())
        })
    }

    fn lookup(&self, media_type: &MediaType) -> Result<&Codec, Error> {
        self.codecs
            .get(media_type)
            .ok_or_else(|| Error::UnsupportedMediaType(media_type.to_string()))
    }
}

/// JSON default encoding with the JSON, YAML and plain-text codecs.
impl Default for Negotiator {
    fn default() -> Self {
        Self { default: MediaType::parse(MediaType::JSON), codecs: default_codecs() }
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    status: &'static str,
    message: Textual<&'a dyn fmt::Display>,
}

fn default_codecs() -> HashMap<MediaType, Codec> {
    let yaml = Codec::yaml();
    HashMap::from([
        (MediaType::parse(MediaType::JSON), Codec::json()),
        (MediaType::parse(MediaType::YAML), yaml.clone()),
        (MediaType::parse(MediaType::X_YAML), yaml),
        (MediaType::parse(MediaType::TEXT), Codec::text()),
    ])
}

// ── NegotiatorBuilder ─────────────────────────────────────────────────────────

/// Registration phase of a [`Negotiator`].
///
/// Keys are normalized like header values, and a later registration for the
/// same media type replaces the earlier one.
pub struct NegotiatorBuilder {
    default: MediaType,
    codecs: HashMap<MediaType, Codec>,
}

impl NegotiatorBuilder {
    pub fn new(default_encoding: &str) -> Self {
        Self { default: MediaType::parse(default_encoding), codecs: HashMap::new() }
    }

    /// Registers the JSON, YAML and plain-text codecs.
    pub fn with_defaults(mut self) -> Self {
        self.codecs.extend(default_codecs());
        self
    }

    pub fn codec(mut self, media_type: &str, codec: Codec) -> Self {
        self.codecs.insert(MediaType::parse(media_type), codec);
        self
    }

    /// Freezes the registry.
    ///
    /// Fails with [`Error::UnsupportedMediaType`] if the default encoding has
    /// no codec, since every negotiation must be able to fall back to it.
    pub fn build(self) -> Result<Negotiator, Error> {
        if !self.codecs.contains_key(&self.default) {
            return Err(Error::UnsupportedMediaType(self.default.to_string()));
        }
        Ok(Negotiator { default: self.default, codecs: self.codecs })
    }
}
