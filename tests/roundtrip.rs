//! End-to-end: a negotiating handler served over a real socket.

use std::net::SocketAddr;
use std::sync::Arc;

use conneg::{Error, Negotiator, Request, Response};
use http::StatusCode;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

#[derive(Debug, Deserialize, Serialize, PartialEq)]
struct EncDec {
    #[serde(rename = "Name")]
    name: String,
}

struct Reply {
    status: u16,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
}

impl Reply {
    fn header(&self, name: &str) -> Option<&str> {
        self.headers.iter().find(|(k, _)| k.eq_ignore_ascii_case(name)).map(|(_, v)| v.as_str())
    }
}

fn echo(negotiator: &Negotiator, req: Request) -> Result<Response, Error> {
    let out: EncDec = negotiator.decode(&req)?;
    negotiator.encode(&req, &out, StatusCode::OK)
}

async fn start() -> (SocketAddr, oneshot::Sender<()>, JoinHandle<Result<(), Error>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = oneshot::channel::<()>();
    let negotiator = Arc::new(Negotiator::default());

    let server = tokio::spawn(conneg::serve_with_shutdown(
        listener,
        move |req: Request| {
            let negotiator = Arc::clone(&negotiator);
            async move { echo(&negotiator, req) }
        },
        async move {
            let _ = rx.await;
        },
    ));
    (addr, tx, server)
}

async fn send(addr: SocketAddr, headers: &[(&str, &str)], body: &[u8]) -> Reply {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let mut head = format!("POST /repositories HTTP/1.1\r\nhost: localhost\r\nconnection: close\r\ncontent-length: {}\r\n", body.len());
    for (name, value) in headers {
        head.push_str(&format!("{name}: {value}\r\n"));
    }
    head.push_str("\r\n");
    stream.write_all(head.as_bytes()).await.unwrap();
    stream.write_all(body).await.unwrap();

    let mut raw = Vec::new();
    stream.read_to_end(&mut raw).await.unwrap();

    let split = raw.windows(4).position(|w| w == b"\r\n\r\n").expect("no header terminator");
    let head = String::from_utf8(raw[..split].to_vec()).unwrap();
    let mut lines = head.split("\r\n");
    let status = lines.next().unwrap().split(' ').nth(1).unwrap().parse().unwrap();
    let headers = lines
        .filter_map(|l| l.split_once(':'))
        .map(|(k, v)| (k.trim().to_owned(), v.trim().to_owned()))
        .collect();
    Reply { status, headers, body: raw[split + 4..].to_vec() }
}

#[tokio::test]
async fn json_in_json_out() {
    let (addr, stop, server) = start().await;

    let body = serde_json::to_vec(&EncDec { name: "Foo".into() }).unwrap();
    let reply = send(addr, &[("content-type", "application/json")], &body).await;

    assert_eq!(reply.status, 200);
    assert_eq!(reply.header("content-type"), Some("application/json"));
    let out: EncDec = serde_json::from_slice(&reply.body).unwrap();
    assert_eq!(out.name, "Foo");

    stop.send(()).unwrap();
    server.await.unwrap().unwrap();
}

#[tokio::test]
async fn yaml_requested_by_accept() {
    let (addr, stop, server) = start().await;

    let reply = send(
        addr,
        &[("content-type", "application/json"), ("accept", "text/html; q=0.8, text/yaml,application/json")],
        br#"{"Name":"Foo"}"#,
    )
    .await;

    assert_eq!(reply.status, 200);
    assert_eq!(reply.header("content-type"), Some("text/yaml"));
    assert_eq!(reply.body, b"Name: Foo\n");

    stop.send(()).unwrap();
    server.await.unwrap().unwrap();
}

#[tokio::test]
async fn unknown_content_type_is_rejected() {
    let (addr, stop, server) = start().await;

    let reply = send(addr, &[("content-type", "application/xml")], b"<Name>Foo</Name>").await;

    assert_eq!(reply.status, 415);
    assert_eq!(reply.body, b"unsupported media type: application/xml");

    stop.send(()).unwrap();
    server.await.unwrap().unwrap();
}

#[tokio::test]
async fn malformed_body_is_a_bad_request() {
    let (addr, stop, server) = start().await;

    let reply = send(addr, &[("content-type", "application/json")], br#"{"Name":"#).await;
    assert_eq!(reply.status, 400);

    stop.send(()).unwrap();
    server.await.unwrap().unwrap();
}
