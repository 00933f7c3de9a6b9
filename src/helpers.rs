use bytes::{Bytes, BytesMut};
use encoding_rs::{Encoding, UTF_8};
use futures_util::stream::StreamExt;
use http::header::{self, HeaderMap, HeaderName, HeaderValue};
use http::{Method, Request, Response, Uri};

use crate::transport::ByteStream;

pub(crate) fn parse_url(url: &str) -> crate::Result<Uri> {
    url.parse::<Uri>().map_err(|err| crate::Error::InvalidUrl {
        url: url.to_owned(),
        cause: err.into(),
    })
}

pub(crate) fn header_value(name: &HeaderName, value: &str) -> crate::Result<HeaderValue> {
    HeaderValue::from_str(value).map_err(|err| crate::Error::InvalidHeaderValue {
        name: name.as_str().to_owned(),
        cause: err.into(),
    })
}

pub(crate) fn get_request(url: &str) -> crate::Result<Request<Bytes>> {
    let mut request = Request::new(Bytes::new());
    *request.method_mut() = Method::GET;
    *request.uri_mut() = parse_url(url)?;
    Ok(request)
}

pub(crate) fn post_request(url: &str, content_type: &mime::Mime, body: Bytes) -> crate::Result<Request<Bytes>> {
    let mut request = Request::new(body);
    *request.method_mut() = Method::POST;
    *request.uri_mut() = parse_url(url)?;
    request
        .headers_mut()
        .insert(header::CONTENT_TYPE, header_value(&header::CONTENT_TYPE, content_type.as_ref())?);
    Ok(request)
}

/// Fails with [`Error::UnexpectedStatus`](crate::Error::UnexpectedStatus) unless the status is `2xx`.
pub(crate) fn ensure_success<B>(url: &str, response: Response<B>) -> crate::Result<Response<B>> {
    if response.status().is_success() {
        Ok(response)
    } else {
        Err(crate::Error::UnexpectedStatus {
            url: url.to_owned(),
            status: response.status(),
        })
    }
}

/// The charset announced in `Content-Type`, UTF-8 when absent or unknown.
pub(crate) fn response_encoding(headers: &HeaderMap) -> &'static Encoding {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|val| val.to_str().ok())
        .and_then(|val| val.parse::<mime::Mime>().ok())
        .and_then(|mime| {
            mime.get_param(mime::CHARSET)
                .and_then(|charset| Encoding::for_label(charset.as_str().as_bytes()))
        })
        .unwrap_or(UTF_8)
}

/// Reads a whole body into memory, failing once it grows past `limit` bytes.
pub(crate) async fn collect_body(mut body: ByteStream, limit: usize) -> crate::Result<Bytes> {
    let mut buf = BytesMut::new();

    while let Some(chunk) = body.next().await {
        let chunk = chunk?;
        if buf.len() + chunk.len() > limit {
            return Err(crate::Error::PayloadTooLarge { limit });
        }
        buf.extend_from_slice(&chunk);
    }

    Ok(buf.freeze())
}

/// Resolves a `Location` header against the URI that produced it.
#[cfg(feature = "client")]
pub(crate) fn redirect_target(base: &Uri, headers: &HeaderMap) -> Option<Uri> {
    let location = headers.get(header::LOCATION)?.to_str().ok()?;

    if location.starts_with('/') {
        let mut parts = base.clone().into_parts();
        parts.path_and_query = Some(location.parse().ok()?);
        return Uri::from_parts(parts).ok();
    }

    location.parse::<Uri>().ok().filter(|uri| uri.scheme().is_some())
}
