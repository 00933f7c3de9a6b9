use std::time::Duration;

use bytes::Bytes;
use futures_util::stream;
use http::{Method, Request, Response};
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use tokio::time::{self, Instant};

use crate::constants;
use crate::helpers;
use crate::transport::{ByteStream, Transport};

/// A plain-HTTP [`Transport`] built on `hyper`.
///
/// Every request, body included, must finish within the configured timeout.
/// Redirects are followed for `GET` requests only, up to a fixed depth; any
/// other method gets the `3xx` response back as is.
///
/// There is no TLS support: requests to `https://` URLs fail with
/// [`Error::TransportFailed`](crate::Error::TransportFailed).
///
/// # Optional
///
/// This requires the optional `client` feature to be enabled.
#[derive(Debug, Clone)]
pub struct HyperTransport {
    client: Client<HttpConnector, Full<Bytes>>,
    timeout: Duration,
}

impl HyperTransport {
    pub fn new(timeout: Duration) -> HyperTransport {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(timeout));

        HyperTransport {
            client: Client::builder(TokioExecutor::new()).build(connector),
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn execute(&self, request: Request<Bytes>) -> crate::Result<Response<ByteStream>> {
        let deadline = Instant::now() + self.timeout;
        let (parts, body) = request.into_parts();
        let mut uri = parts.uri.clone();
        let mut redirects = 0;

        loop {
            let mut outgoing = Request::new(Full::new(body.clone()));
            *outgoing.method_mut() = parts.method.clone();
            *outgoing.uri_mut() = uri.clone();
            *outgoing.headers_mut() = parts.headers.clone();

            let response = match time::timeout_at(deadline, self.client.request(outgoing)).await {
                Ok(Ok(response)) => response,
                Ok(Err(err)) => return Err(crate::Error::TransportFailed(err.into())),
                Err(_) => return Err(crate::Error::Timeout { limit: self.timeout }),
            };

            if parts.method == Method::GET
                && response.status().is_redirection()
                && redirects < constants::MAX_REDIRECTS
            {
                if let Some(next) = helpers::redirect_target(&uri, response.headers()) {
                    log::debug!("[HTTP] {} redirected to {}", uri, next);
                    uri = next;
                    redirects += 1;
                    continue;
                }
            }

            let timeout = self.timeout;
            return Ok(response.map(|body| body_stream(body, deadline, timeout)));
        }
    }
}

impl Transport for HyperTransport {
    async fn send(&self, request: Request<Bytes>) -> crate::Result<Response<ByteStream>> {
        self.execute(request).await
    }
}

fn body_stream(body: Incoming, deadline: Instant, limit: Duration) -> ByteStream {
    let chunks = stream::unfold(Some(body), move |body| async move {
        let mut body = body?;

        loop {
            match time::timeout_at(deadline, body.frame()).await {
                Err(_) => return Some((Err(crate::Error::Timeout { limit }), None)),
                Ok(None) => return None,
                Ok(Some(Err(err))) => return Some((Err(crate::Error::StreamReadFailed(err.into())), None)),
                Ok(Some(Ok(frame))) => {
                    if let Ok(data) = frame.into_data() {
                        return Some((Ok(data), Some(body)));
                    }
                }
            }
        }
    });

    Box::pin(chunks)
}
