use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;
use futures_util::stream::Stream;
use http::{Request, Response};

/// A response body delivered as a stream of byte chunks.
///
/// Dropping it abandons the rest of the response.
pub type ByteStream = Pin<Box<dyn Stream<Item = crate::Result<Bytes>> + Send + 'static>>;

/// The HTTP client the session talks through.
///
/// Implementations own connection setup, TLS, redirects and timeouts. A
/// timeout or a connection failure is reported as an `Err`; any status code
/// the server actually sent is returned as an `Ok` response, and the session
/// decides what counts as success.
pub trait Transport {
    /// Whether the network link is up. The session leaves its initial state
    /// only once this returns `true`.
    fn is_link_up(&self) -> bool {
        true
    }

    /// Sends a request and resolves once the response head has arrived. The
    /// body is streamed afterwards.
    fn send(&self, request: Request<Bytes>) -> impl Future<Output = crate::Result<Response<ByteStream>>> + Send;
}
