//! In-process HTTPS server for integration tests.
//!
//! A hyper HTTP/1 server behind a rustls acceptor presenting the fixture
//! certificate for `localhost` (signed by `fixtures/ca.pem`). Every request
//! it reads is recorded and answered according to a fixed [`Reply`].

#![allow(dead_code)]

use std::convert::Infallible;
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use futures::stream::{self, StreamExt};
use http_body_util::combinators::BoxBody;
use http_body_util::{BodyExt, Full, StreamBody};
use hyper::body::{Frame, Incoming};
use hyper::header::{HeaderValue, CONTENT_LENGTH, CONTENT_TYPE};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use release_client::{ApiAuthority, Authority, TrustStore, UploadAuthority};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_rustls::rustls;
use tokio_rustls::TlsAcceptor;

pub const CA_PEM: &[u8] = include_bytes!("../fixtures/ca.pem");
pub const OTHER_CA_PEM: &[u8] = include_bytes!("../fixtures/other-ca.pem");
const SERVER_CERT_PEM: &[u8] = include_bytes!("../fixtures/server.pem");
const SERVER_KEY_PEM: &[u8] = include_bytes!("../fixtures/server.key.pem");

type ReplyBody = BoxBody<Bytes, std::io::Error>;

pub fn trust_store() -> TrustStore {
    TrustStore::from_pem(CA_PEM).expect("fixture CA parses")
}

pub fn untrusted_store() -> TrustStore {
    TrustStore::from_pem(OTHER_CA_PEM).expect("fixture CA parses")
}

/// How the server answers once it has read a request.
#[derive(Debug, Clone)]
pub enum Reply {
    /// Complete response.
    Respond {
        status: u16,
        headers: Vec<(String, String)>,
        body: Bytes,
    },
    /// Read the request, never answer.
    StallAfterRequest,
    /// Read only the request head, never read the body or answer.
    StallBeforeBody,
    /// Send the head and part of the body, then hang.
    StallMidBody {
        status: u16,
        declared_length: usize,
        partial: Bytes,
    },
    /// Send the head and part of the body, then drop the connection.
    CloseMidBody {
        status: u16,
        declared_length: usize,
        partial: Bytes,
    },
}

impl Reply {
    pub fn json(status: u16, body: &str) -> Self {
        Self::Respond {
            status,
            headers: vec![("content-type".to_string(), "application/json".to_string())],
            body: Bytes::copy_from_slice(body.as_bytes()),
        }
    }

    pub fn bytes(status: u16, body: &[u8]) -> Self {
        Self::Respond {
            status,
            headers: Vec::new(),
            body: Bytes::copy_from_slice(body),
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        if let Self::Respond { headers, .. } = &mut self {
            headers.push((name.to_string(), value.to_string()));
        }
        self
    }
}

/// A request as the server read it.
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub method: String,
    /// Path and query exactly as sent on the request line.
    pub target: String,
    /// Names lower-cased.
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl CapturedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

pub struct FakeServer {
    port: u16,
    requests: Arc<Mutex<Vec<CapturedRequest>>>,
    accept_loop: JoinHandle<()>,
}

impl FakeServer {
    pub async fn start(reply: Reply) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let port = listener.local_addr().expect("local addr").port();
        let acceptor = TlsAcceptor::from(server_config());
        let requests = Arc::new(Mutex::new(Vec::new()));
        let reply = Arc::new(reply);

        let captured = requests.clone();
        let accept_loop = tokio::spawn(async move {
            loop {
                let Ok((tcp, _)) = listener.accept().await else {
                    return;
                };
                let acceptor = acceptor.clone();
                let captured = captured.clone();
                let reply = reply.clone();
                tokio::spawn(async move {
                    // Handshake failures are expected in trust tests.
                    let Ok(tls) = acceptor.accept(tcp).await else {
                        return;
                    };
                    let service = service_fn(move |request| {
                        handle(request, reply.clone(), captured.clone())
                    });
                    let _ = http1::Builder::new()
                        .serve_connection(TokioIo::new(tls), service)
                        .await;
                });
            }
        });

        Self {
            port,
            requests,
            accept_loop,
        }
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn authority(&self) -> Authority {
        Authority::with_port("localhost", self.port).expect("valid authority")
    }

    pub fn api_authority(&self) -> ApiAuthority {
        ApiAuthority(self.authority())
    }

    pub fn upload_authority(&self) -> UploadAuthority {
        UploadAuthority(self.authority())
    }

    /// `https://localhost:<port>` followed by `path_and_query`.
    pub fn url(&self, path_and_query: &str) -> String {
        format!("https://localhost:{}{}", self.port, path_and_query)
    }

    pub fn requests(&self) -> Vec<CapturedRequest> {
        self.requests.lock().expect("requests lock").clone()
    }
}

impl Drop for FakeServer {
    fn drop(&mut self) {
        self.accept_loop.abort();
    }
}

/// A port with a listener that never accepts: TCP connects, TLS never
/// starts.
pub async fn silent_listener() -> (TcpListener, u16) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let port = listener.local_addr().expect("local addr").port();
    (listener, port)
}

/// A port nothing listens on.
pub async fn closed_port() -> u16 {
    let (listener, port) = silent_listener().await;
    drop(listener);
    port
}

fn server_config() -> Arc<rustls::ServerConfig> {
    let certs = rustls_pemfile::certs(&mut &SERVER_CERT_PEM[..])
        .collect::<Result<Vec<_>, _>>()
        .expect("server certificate");
    let key = rustls_pemfile::private_key(&mut &SERVER_KEY_PEM[..])
        .expect("server key")
        .expect("server key present");

    let config = rustls::ServerConfig::builder_with_provider(Arc::new(
        rustls::crypto::ring::default_provider(),
    ))
    .with_safe_default_protocol_versions()
    .expect("protocol versions")
    .with_no_client_auth()
    .with_single_cert(certs, key)
    .expect("server config");

    Arc::new(config)
}

async fn handle(
    request: Request<Incoming>,
    reply: Arc<Reply>,
    captured: Arc<Mutex<Vec<CapturedRequest>>>,
) -> Result<Response<ReplyBody>, Infallible> {
    // Left unpolled for `StallBeforeBody`, so hyper stops reading the socket.
    let (parts, incoming) = request.into_parts();
    let body = match reply.as_ref() {
        Reply::StallBeforeBody => Bytes::new(),
        _ => match incoming.collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(_) => return Ok(status_only(StatusCode::BAD_REQUEST)),
        },
    };

    captured
        .lock()
        .expect("requests lock")
        .push(CapturedRequest {
            method: parts.method.to_string(),
            target: parts
                .uri
                .path_and_query()
                .map(|pq| pq.as_str().to_string())
                .unwrap_or_default(),
            headers: parts
                .headers
                .iter()
                .map(|(name, value)| {
                    (
                        name.as_str().to_string(),
                        String::from_utf8_lossy(value.as_bytes()).into_owned(),
                    )
                })
                .collect(),
            body: body.to_vec(),
        });

    let response = match reply.as_ref() {
        Reply::Respond {
            status,
            headers,
            body,
        } => {
            let mut response = Response::new(full(body.clone()));
            *response.status_mut() = status_code(*status);
            for (name, value) in headers {
                response.headers_mut().insert(
                    hyper::header::HeaderName::from_bytes(name.as_bytes()).expect("header name"),
                    HeaderValue::from_str(value).expect("header value"),
                );
            }
            response
        }
        Reply::StallAfterRequest | Reply::StallBeforeBody => {
            std::future::pending::<Response<ReplyBody>>().await
        }
        Reply::StallMidBody {
            status,
            declared_length,
            partial,
        } => {
            let first = Ok::<_, std::io::Error>(Frame::data(partial.clone()));
            let frames = stream::once(std::future::ready(first)).chain(stream::pending());
            partial_response(*status, *declared_length, BodyExt::boxed(StreamBody::new(frames)))
        }
        Reply::CloseMidBody {
            status,
            declared_length,
            partial,
        } => {
            // A body error makes hyper abandon the connection mid-message.
            let frames = stream::iter([
                Ok(Frame::data(partial.clone())),
                Err(std::io::Error::other("connection dropped")),
            ]);
            partial_response(*status, *declared_length, BodyExt::boxed(StreamBody::new(frames)))
        }
    };

    Ok(response)
}

fn partial_response(status: u16, declared_length: usize, body: ReplyBody) -> Response<ReplyBody> {
    let mut response = Response::new(body);
    *response.status_mut() = status_code(status);
    response
        .headers_mut()
        .insert(CONTENT_LENGTH, HeaderValue::from(declared_length));
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}

fn full(body: Bytes) -> ReplyBody {
    Full::new(body).map_err(|never| match never {}).boxed()
}

fn status_only(status: StatusCode) -> Response<ReplyBody> {
    let mut response = Response::new(full(Bytes::new()));
    *response.status_mut() = status;
    response
}

fn status_code(status: u16) -> StatusCode {
    StatusCode::from_u16(status).expect("valid status code")
}
