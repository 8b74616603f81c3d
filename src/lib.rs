//! # conneg
//!
//! HTTP content negotiation for hyper services.
//!
//! A [`Negotiator`] reads a request's `Accept` header, picks the best
//! registered encoding and serializes a value into a [`Response`] with the
//! matching `content-type`. In the other direction it decodes request bodies
//! by their `Content-Type`. JSON, YAML and plain text are registered out of
//! the box; anything else is a [`Codec`] away.
//!
//! ## What it decides
//!
//! - Empty `Accept` or a bare `*/*` → the default encoding.
//! - Otherwise entries are ranked by `q` (stable for ties) and the first one
//!   with a registered codec wins.
//! - Nothing registered matches → the default encoding, never a `406`.
//! - Missing `Content-Type` on a body → decoded as the default encoding.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use conneg::{Error, Negotiator, Request, Response, Server};
//! use http::StatusCode;
//!
//! #[tokio::main]
//! async fn main() {
//!     let negotiator = Arc::new(Negotiator::default());
//!
//!     Server::bind("0.0.0.0:3000")
//!         .serve(move |req: Request| {
//!             let negotiator = Arc::clone(&negotiator);
//!             async move { echo(&negotiator, req) }
//!         })
//!         .await
//!         .unwrap();
//! }
//!
//! fn echo(negotiator: &Negotiator, req: Request) -> Result<Response, Error> {
//!     let names: Vec<String> = negotiator.decode(&req)?;
//!     negotiator.encode(&req, &names, StatusCode::OK)
//! }
//! ```

mod codec;
mod error;
mod handler;
mod negotiator;
mod request;
mod response;
mod server;

pub mod media;

pub use codec::{Codec, Textual, text_marshal, text_unmarshal};
pub use error::{BoxError, Error};
pub use handler::Handler;
pub use media::{AcceptEntry, MediaType};
pub use negotiator::{Negotiator, NegotiatorBuilder};
pub use request::Request;
pub use response::{IntoResponse, Response, ResponseBuilder};
pub use server::{Server, serve_with_shutdown};
