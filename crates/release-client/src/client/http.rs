//! HTTP layer: one attempt per call, timeout race, failure classification,
//! audit.
//!
//! This is the ONLY place that talks to reqwest or looks at status codes.
//! client/mod.rs and client/privileged.rs only describe requests.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;

use bytes::Bytes;
use futures::future::BoxFuture;
use futures::StreamExt;
use reqwest::header::{
    HeaderMap, HeaderName, HeaderValue, ACCEPT, CONTENT_LENGTH, CONTENT_TYPE, USER_AGENT,
};
use reqwest::{Method, StatusCode};
use tokio::fs::File;
use tokio::sync::watch;
use tokio_util::io::ReaderStream;
use tracing::{debug, warn};
use url::Url;

use crate::audit::{AuditEvent, Auditor};
use crate::config::Timeouts;
use crate::error::ReleaseResult;
use crate::outcome::{Failure, InterpretError, Outcome, TimeoutPhase, TransportError};
use crate::trust::TrustStore;
use crate::types::ResponseHeaders;

const USER_AGENT_VALUE: &str = concat!("release-client/", env!("CARGO_PKG_VERSION"));
const GITHUB_API_VERSION_HEADER: &str = "x-github-api-version";
const GITHUB_API_VERSION: &str = "2022-11-28";
const GITHUB_MEDIA_TYPE: &str = "application/vnd.github+json";

/// Where the request body comes from.
#[derive(Debug)]
pub(crate) enum RequestBody {
    Empty,
    Json(serde_json::Value),
    /// Opened inside the attempt; the handle lives only as long as the body.
    File {
        path: PathBuf,
        media_type: &'static str,
    },
}

/// Description of a single exchange.
#[derive(Debug)]
pub(crate) struct Exchange {
    pub method: Method,
    pub uri: Url,
    pub headers: HeaderMap,
    pub body: RequestBody,
    pub expected: StatusCode,
}

impl Exchange {
    pub(crate) fn new(method: Method, uri: Url, expected: StatusCode) -> Self {
        Self {
            method,
            uri,
            headers: HeaderMap::new(),
            body: RequestBody::Empty,
            expected,
        }
    }

    pub(crate) fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub(crate) fn body(mut self, body: RequestBody) -> Self {
        self.body = body;
        self
    }
}

/// A complete HTTP response.
#[derive(Debug)]
struct RawResponse {
    status: u16,
    headers: ResponseHeaders,
    body: Bytes,
}

/// An attempt that produced no complete response, tagged with the phase
/// that ended it.
#[derive(Debug)]
enum AttemptFailure {
    Submitting(TransportError),
    Connect(TransportError),
    FirstByte(TransportError),
    EndToEnd(TransportError),
}

impl AttemptFailure {
    fn from_send(err: reqwest::Error) -> Self {
        if err.is_connect() && err.is_timeout() {
            Self::Connect(err.into())
        } else {
            Self::Submitting(err.into())
        }
    }

    fn cause(&self) -> &TransportError {
        match self {
            Self::Submitting(cause)
            | Self::Connect(cause)
            | Self::FirstByte(cause)
            | Self::EndToEnd(cause) => cause,
        }
    }

    fn into_failure(self, uri: Url, timeouts: &Timeouts) -> Failure {
        match self {
            Self::Submitting(source) => Failure::RequestSubmitting { uri, source },
            Self::Connect(source) => Failure::ConnectTimeout {
                uri,
                connect_timeout: timeouts.connect,
                source,
            },
            Self::FirstByte(source) => Failure::FirstByteTimeout {
                uri,
                first_byte_timeout: timeouts.first_byte,
                source,
            },
            Self::EndToEnd(source) => Failure::EndToEndTimeout {
                uri,
                end_to_end_timeout: timeouts.end_to_end,
                source,
            },
        }
    }
}

/// HTTP backend shared by every operation of a client.
///
/// Each attempt runs on its own reqwest client so that the connection it
/// opens can be observed; the TLS configuration and default headers are
/// built once.
#[derive(Clone)]
pub(crate) struct HttpBackend {
    tls: Arc<rustls::ClientConfig>,
    default_headers: HeaderMap,
    timeouts: Timeouts,
    auditor: Arc<dyn Auditor>,
}

impl fmt::Debug for HttpBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpBackend")
            .field("timeouts", &self.timeouts)
            .finish_non_exhaustive()
    }
}

impl HttpBackend {
    pub(crate) fn new(
        trust_store: &TrustStore,
        timeouts: Timeouts,
        auditor: Arc<dyn Auditor>,
    ) -> ReleaseResult<Self> {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));
        default_headers.insert(ACCEPT, HeaderValue::from_static(GITHUB_MEDIA_TYPE));
        default_headers.insert(
            HeaderName::from_static(GITHUB_API_VERSION_HEADER),
            HeaderValue::from_static(GITHUB_API_VERSION),
        );

        let backend = Self {
            tls: Arc::new(trust_store.client_config()?),
            default_headers,
            timeouts,
            auditor,
        };
        // Surface builder errors at construction rather than on first use.
        let (connected, _) = watch::channel(false);
        backend.client(Arc::new(connected))?;

        Ok(backend)
    }

    /// A client whose connector flags `connected` once TCP and TLS are up.
    fn client(
        &self,
        connected: Arc<watch::Sender<bool>>,
    ) -> Result<reqwest::Client, reqwest::Error> {
        reqwest::Client::builder()
            .use_preconfigured_tls(self.tls.as_ref().clone())
            .https_only(true)
            .connect_timeout(self.timeouts.connect)
            .connector_layer(SignalConnectedLayer { connected })
            .pool_max_idle_per_host(0)
            .redirect(reqwest::redirect::Policy::none())
            .default_headers(self.default_headers.clone())
            .build()
    }

    pub(crate) fn timeouts(&self) -> &Timeouts {
        &self.timeouts
    }

    /// Perform one exchange, record exactly one audit event, and interpret
    /// the response.
    pub(crate) async fn execute<T>(
        &self,
        exchange: Exchange,
        interpret: impl FnOnce(&[u8]) -> Result<T, InterpretError>,
    ) -> Outcome<T> {
        let uri = exchange.uri.clone();
        let expected = exchange.expected;
        let started = Instant::now();

        debug!(uri = %uri, method = %exchange.method, "sending request");

        let response = match self.attempt(exchange).await {
            Ok(response) => response,
            Err(failure) => {
                warn!(
                    uri = %uri,
                    error = %failure.cause(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "request did not complete"
                );
                self.auditor.record(AuditEvent::RequestFailed {
                    uri: uri.clone(),
                    cause: failure.cause().clone(),
                });
                return Err(failure.into_failure(uri, &self.timeouts));
            }
        };

        // Interpreters see the raw bytes; audit and failures get lossy text.
        let body_text = String::from_utf8_lossy(&response.body).into_owned();
        debug!(
            uri = %uri,
            status = response.status,
            body_len = response.body.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "request completed"
        );
        self.auditor.record(AuditEvent::RequestCompleted {
            uri: uri.clone(),
            status: response.status,
            headers: response.headers.clone(),
            body: body_text.clone(),
        });

        if response.status != expected.as_u16() {
            return Err(Failure::InvalidResponseCode {
                uri,
                expected: expected.as_u16(),
                actual: response.status,
                headers: response.headers,
                body: body_text,
            });
        }

        interpret(&response.body[..]).map_err(|source| Failure::ResponseHandling {
            uri,
            status: response.status,
            headers: response.headers,
            body: body_text,
            source,
        })
    }

    /// Race the exchange against the first-byte and end-to-end deadlines.
    /// The connect deadline is enforced by the reqwest connector.
    async fn attempt(&self, exchange: Exchange) -> Result<RawResponse, AttemptFailure> {
        let end_to_end = self.timeouts.end_to_end;

        tokio::select! {
            result = self.round_trip(exchange) => result,
            () = tokio::time::sleep(end_to_end) => Err(AttemptFailure::EndToEnd(
                TransportError::elapsed(TimeoutPhase::EndToEnd, end_to_end),
            )),
        }
    }

    async fn round_trip(&self, exchange: Exchange) -> Result<RawResponse, AttemptFailure> {
        let first_byte = self.timeouts.first_byte;
        let (connected_tx, mut connected_rx) = watch::channel(false);
        let client = self
            .client(Arc::new(connected_tx))
            .map_err(|e| AttemptFailure::Submitting(e.into()))?;

        let request = client
            .request(exchange.method, exchange.uri)
            .headers(exchange.headers);

        let (request, mut body_sent_rx) = match exchange.body {
            RequestBody::Empty => (request, None),
            RequestBody::Json(document) => (
                request
                    .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
                    .body(document.to_string()),
                None,
            ),
            RequestBody::File { path, media_type } => {
                let file = File::open(&path)
                    .await
                    .map_err(|e| AttemptFailure::Submitting(e.into()))?;
                let length = file
                    .metadata()
                    .await
                    .map_err(|e| AttemptFailure::Submitting(e.into()))?
                    .len();
                let (body_sent_tx, body_sent_rx) = watch::channel(false);

                let request = request
                    .header(CONTENT_TYPE, HeaderValue::from_static(media_type))
                    .header(CONTENT_LENGTH, HeaderValue::from(length))
                    .body(tracked_file_body(file, length, body_sent_tx));
                (request, Some(body_sent_rx))
            }
        };

        // Armed once the connection is up and, for streamed bodies, the last
        // byte has been handed to the transport. A dropped sender means the
        // send itself is failing, so the deadline never arms.
        let first_byte_deadline = async move {
            if connected_rx.wait_for(|connected| *connected).await.is_err() {
                std::future::pending::<()>().await;
            }
            if let Some(body_sent_rx) = body_sent_rx.as_mut() {
                if body_sent_rx.wait_for(|sent| *sent).await.is_err() {
                    std::future::pending::<()>().await;
                }
            }
            tokio::time::sleep(first_byte).await;
        };

        let response = tokio::select! {
            result = request.send() => result.map_err(AttemptFailure::from_send)?,
            () = first_byte_deadline => {
                return Err(AttemptFailure::FirstByte(TransportError::elapsed(
                    TimeoutPhase::FirstByte,
                    first_byte,
                )));
            }
        };

        let status = response.status().as_u16();
        let headers = ResponseHeaders::from_header_map(response.headers());
        let body = response
            .bytes()
            .await
            .map_err(|e| AttemptFailure::Submitting(e.into()))?;

        Ok(RawResponse {
            status,
            headers,
            body,
        })
    }
}

/// Stream a file as the request body, flagging `sent` once its last byte
/// has been handed to the transport.
fn tracked_file_body(file: File, length: u64, sent: watch::Sender<bool>) -> reqwest::Body {
    if length == 0 {
        sent.send_replace(true);
    }

    let mut remaining = length;
    let stream = ReaderStream::new(file).map(move |chunk| {
        if let Ok(bytes) = &chunk {
            remaining = remaining.saturating_sub(bytes.len() as u64);
            if remaining == 0 {
                sent.send_replace(true);
            }
        }
        chunk
    });

    reqwest::Body::wrap_stream(stream)
}

/// Connector layer that reports when a connection has been established.
#[derive(Clone)]
struct SignalConnectedLayer {
    connected: Arc<watch::Sender<bool>>,
}

impl<S> tower::Layer<S> for SignalConnectedLayer {
    type Service = SignalConnected<S>;

    fn layer(&self, inner: S) -> Self::Service {
        SignalConnected {
            inner,
            connected: self.connected.clone(),
        }
    }
}

#[derive(Clone)]
struct SignalConnected<S> {
    inner: S,
    connected: Arc<watch::Sender<bool>>,
}

impl<S, R> tower::Service<R> for SignalConnected<S>
where
    S: tower::Service<R>,
    S::Response: Send + 'static,
    S::Error: Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<S::Response, S::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, target: R) -> Self::Future {
        let connected = self.connected.clone();
        let connecting = self.inner.call(target);
        Box::pin(async move {
            let connection = connecting.await?;
            connected.send_replace(true);
            Ok(connection)
        })
    }
}
