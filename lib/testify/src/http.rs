use std::convert::Infallible;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;

use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::header::CONTENT_TYPE;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;

/// Start a HTTP/1 server on a free local port, every request is answered
/// by `handler`. The server lives until the runtime shuts down.
pub async fn serve<F>(handler: F) -> SocketAddr
where
    F: Fn(&Request<Incoming>) -> Response<Full<Bytes>> + Send + Sync + 'static,
{
    let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0))
        .await
        .expect("bind http listener");
    let addr = listener.local_addr().expect("local address of listener");
    let handler = Arc::new(handler);

    tokio::spawn(async move {
        loop {
            let Ok((conn, _peer)) = listener.accept().await else {
                break;
            };

            let handler = Arc::clone(&handler);
            tokio::spawn(async move {
                let service = service_fn(move |req: Request<Incoming>| {
                    let resp = (*handler)(&req);
                    async move { Ok::<_, Infallible>(resp) }
                });

                // clients hanging up early are fine
                let _ = http1::Builder::new()
                    .serve_connection(TokioIo::new(conn), service)
                    .await;
            });
        }
    });

    addr
}

/// Start a server which accepts connections but never answers.
pub async fn serve_nothing() -> SocketAddr {
    let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0))
        .await
        .expect("bind tcp listener");
    let addr = listener.local_addr().expect("local address of listener");

    tokio::spawn(async move {
        let mut conns = vec![];
        while let Ok((conn, _peer)) = listener.accept().await {
            conns.push(conn);
        }
    });

    addr
}

/// HTTP status code 200 with `Content-Type: application/json`
pub fn json(body: impl Into<Bytes>) -> Response<Full<Bytes>> {
    with_content_type("application/json", body)
}

pub fn with_content_type(content_type: &str, body: impl Into<Bytes>) -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, content_type)
        .body(Full::new(body.into()))
        .expect("build response")
}

/// HTTP status code 200 without a `Content-Type` header
pub fn plain(body: impl Into<Bytes>) -> Response<Full<Bytes>> {
    Response::new(Full::new(body.into()))
}
