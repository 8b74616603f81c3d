//! HTTP server and graceful shutdown.
//!
//! The server runs a single [`Handler`] for every request; there is no
//! routing layer. Request bodies are buffered in full before the handler is
//! called, so [`Negotiator::decode`](crate::Negotiator::decode) never touches
//! the socket.
//!
//! On SIGTERM or Ctrl-C the accept loop stops and in-flight connections are
//! drained before [`Server::serve`] returns.

use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;

use bytes::Bytes;
use http::StatusCode;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

use crate::error::Error;
use crate::handler::{BoxedHandler, Handler};
use crate::request::Request;
use crate::response::Response;

/// The HTTP server.
pub struct Server {
    addr: SocketAddr,
}

impl Server {
    /// Configures the server to bind to `addr` when [`serve`](Server::serve)
    /// is called.
    ///
    /// # Panics
    ///
    /// Panics if `addr` is not a valid `host:port` string.
    pub fn bind(addr: &str) -> Self {
        let addr: SocketAddr = addr.parse().expect("invalid socket address");
        Self { addr }
    }

    /// Binds, then serves `handler` until SIGTERM or Ctrl-C.
    pub async fn serve(self, handler: impl Handler) -> Result<(), Error> {
        let listener = TcpListener::bind(self.addr).await?;
        serve_with_shutdown(listener, handler, shutdown_signal()).await
    }
}

/// Serves `handler` on an already bound listener until `signal` resolves,
/// then waits for in-flight connections to finish.
pub async fn serve_with_shutdown<S>(listener: TcpListener, handler: impl Handler, signal: S) -> Result<(), Error>
where
    S: Future<Output = ()>,
{
    let handler = handler.into_boxed_handler();
    info!(addr = %listener.local_addr()?, "conneg listening");

    // JoinSet tracks every spawned connection task so shutdown can wait for
    // all of them to finish.
    let mut tasks = tokio::task::JoinSet::new();

    // The signal future is polled repeatedly across loop iterations, so it
    // must stay put in memory after the first poll. `tokio::pin!` pins it on
    // the stack.
    tokio::pin!(signal);

    loop {
        tokio::select! {
            // Arms are checked top to bottom instead of at random, so a
            // pending shutdown wins over connections still queued in accept.
            biased;

            () = &mut signal => {
                info!(in_flight = tasks.len(), "shutdown signal received, draining connections");
                break;
            }

            res = listener.accept() => {
                let (stream, remote_addr) = match res {
                    Ok(v) => v,
                    Err(e) => {
                        error!("accept error: {e}");
                        continue;
                    }
                };

                let handler = BoxedHandler::clone(&handler);
                // Adapts tokio's AsyncRead/AsyncWrite to hyper's IO traits.
                let io = TokioIo::new(stream);

                tasks.spawn(async move {
                    // Called once per request on the connection, not once
                    // per connection; each call takes its own handler clone.
                    let svc = service_fn(move |req| dispatch(BoxedHandler::clone(&handler), req, remote_addr));

                    // `auto::Builder` serves HTTP/1.1 or HTTP/2, whichever
                    // the client speaks.
                    if let Err(e) = ConnBuilder::new(TokioExecutor::new())
                        .serve_connection(io, svc)
                        .await
                    {
                        error!(peer = %remote_addr, "connection error: {e}");
                    }
                });
            }

            // Reap finished connection tasks so the JoinSet does not grow
            // without bound on a long-running server.
            Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
        }
    }

    // Drain: every in-flight connection finishes before we return.
    while tasks.join_next().await.is_some() {}

    info!("conneg stopped");
    Ok(())
}

/// Buffers the body, then runs the handler. A body that cannot be read is
/// answered with `400` once; the read is not retried.
///
/// The error type is [`Infallible`]: every failure becomes a response here,
/// so hyper never sees a service error.
async fn dispatch(
    handler: BoxedHandler,
    req: hyper::Request<Incoming>,
    remote_addr: SocketAddr,
) -> Result<http::Response<Full<Bytes>>, Infallible> {
    let (parts, body) = req.into_parts();
    let body = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            warn!(peer = %remote_addr, "failed to read request body: {e}");
            return Ok(Response::status(StatusCode::BAD_REQUEST).into_inner());
        }
    };

    let method = parts.method.clone();
    let path = parts.uri.path().to_owned();
    let response = handler.call(Request::new(parts, body)).await;
    debug!(%method, path, status = response.status_code().as_u16(), "request handled");

    Ok(response.into_inner())
}

/// Resolves on SIGTERM (Unix) or Ctrl-C.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let sigterm = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    // A future that never resolves: without Unix signals only Ctrl-C counts.
    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c   => {}
        () = sigterm  => {}
    }
}
