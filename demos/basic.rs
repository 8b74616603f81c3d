//! Minimal conneg demo: one endpoint that decodes a repository and echoes it
//! back in whatever format the client asks for.
//!
//! Run with:
//!   RUST_LOG=debug cargo run --example basic
//!
//! Try:
//!   curl -X POST http://localhost:3000/repositories \
//!        -H 'content-type: application/json' \
//!        -d '{"name":"stable","url":"gs://kubernetes-charts"}'
//!   curl -X POST http://localhost:3000/repositories \
//!        -H 'content-type: text/yaml' -H 'accept: text/yaml' \
//!        --data-binary $'name: stable\nurl: gs://kubernetes-charts\n'
//!   curl -X POST http://localhost:3000/repositories -H 'content-type: application/xml' -d '<x/>'

use std::sync::Arc;

use conneg::{Negotiator, Request, Response, Server, Textual};
use http::StatusCode;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize)]
struct Repo {
    name: String,
    url: String,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let addr = std::env::var("CONNEG_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_owned());
    let negotiator = Arc::new(Negotiator::default());

    Server::bind(&addr)
        .serve(move |req: Request| {
            let negotiator = Arc::clone(&negotiator);
            async move { add_repo(&negotiator, req) }
        })
        .await
        .expect("server error");
}

// POST /repositories
//
// Decode failures become a negotiated error body; encode failures (e.g. a
// struct requested as text/plain) fall back to the message itself.
fn add_repo(negotiator: &Negotiator, req: Request) -> Response {
    let repo: Repo = match negotiator.decode(&req) {
        Ok(repo) => repo,
        Err(e) => return negotiator.error_response(&req, e.status(), &e),
    };

    match negotiator.encode(&req, &repo, StatusCode::CREATED) {
        Ok(res) => res,
        Err(_) => negotiator
            .encode(&req, &Textual(format!("added {}", repo.name)), StatusCode::CREATED)
            .unwrap_or_else(|e| negotiator.error_response(&req, e.status(), &e)),
    }
}
