#![cfg(feature = "client")]

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use captive_relay::{Config, Error, HyperTransport, Session, SessionState, StepOutcome, Transport};
use futures_util::StreamExt;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::header::{CONTENT_TYPE, LOCATION};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;

const PAGE: &str = concat!(
    "<html><body>\n",
    "<form method=\"POST\" action=\"/en/connecttoweb\">\n",
    "<input type=\"hidden\" name=\"_token\" value=\"t0k3n\">\n",
    "<input type=\"hidden\" name=\"_ceid\" value=\"42\">\n",
    "<input type=\"checkbox\" name=\"checkit\" value=\"1\">\n",
    "<input type=\"hidden\" name=\"form_type\" value=\"login\">\n",
    "</form>\n",
    "</body></html>\n",
);

type Recorded = Arc<Mutex<Vec<(Method, String, Bytes)>>>;

async fn handle(req: Request<Incoming>, recorded: Recorded) -> Result<Response<Full<Bytes>>, Infallible> {
    let (parts, body) = req.into_parts();
    let body = body.collect().await.map(|b| b.to_bytes()).unwrap_or_default();
    let target = parts.uri.path_and_query().map(|p| p.to_string()).unwrap_or_default();
    recorded.lock().unwrap().push((parts.method.clone(), target.clone(), body));

    let reply = |status: StatusCode, body: &'static str| {
        Response::builder()
            .status(status)
            .header(CONTENT_TYPE, "text/html; charset=utf-8")
            .body(Full::from(body))
            .unwrap()
    };

    let response = match (parts.method.as_str(), target.as_str()) {
        ("GET", "/en/connecttoweb") => Response::builder()
            .status(StatusCode::FOUND)
            .header(LOCATION, "/en/connecttoweb?lang=en")
            .body(Full::new(Bytes::new()))
            .unwrap(),
        (_, "/moved") => Response::builder()
            .status(StatusCode::FOUND)
            .header(LOCATION, "/en/connecttoweb?lang=en")
            .body(Full::new(Bytes::new()))
            .unwrap(),
        ("GET", "/en/connecttoweb?lang=en") => reply(StatusCode::OK, PAGE),
        ("POST", "/en/connecttoweb") => reply(StatusCode::OK, "welcome"),
        ("GET", "/combined.json") => reply(StatusCode::OK, "{\"speed\":120}"),
        ("POST", "/ingest") => match parts.headers.get("x-api-key") {
            Some(key) if key == "secret" => reply(StatusCode::NO_CONTENT, ""),
            _ => reply(StatusCode::UNAUTHORIZED, "bad key"),
        },
        ("GET", "/slow") => {
            tokio::time::sleep(Duration::from_secs(2)).await;
            reply(StatusCode::OK, "late")
        }
        _ => reply(StatusCode::NOT_FOUND, "not found"),
    };

    Ok(response)
}

async fn serve() -> (SocketAddr, Recorded) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let recorded = Recorded::default();

    let shared = Arc::clone(&recorded);
    tokio::spawn(async move {
        loop {
            let (stream, _) = listener.accept().await.unwrap();
            let io = TokioIo::new(stream);
            let recorded = Arc::clone(&shared);

            tokio::spawn(async move {
                let service = service_fn(move |req| handle(req, Arc::clone(&recorded)));
                let _ = http1::Builder::new().serve_connection(io, service).await;
            });
        }
    });

    (addr, recorded)
}

#[tokio::test]
async fn test_session_against_live_portal() {
    let (addr, recorded) = serve().await;
    let config = Config::new(
        format!("http://{}/en/connecttoweb", addr),
        format!("http://{}/combined.json", addr),
        format!("http://{}/ingest", addr),
        "secret",
    )
    .form_action("action=\"/en/connecttoweb\"");

    let mut session = Session::new(HyperTransport::new(Duration::from_secs(5)), config);

    assert_eq!(session.step().await, StepOutcome::LinkEstablished);
    assert_eq!(session.step().await, StepOutcome::FormParsed);
    assert_eq!(session.form().token.as_deref(), Some("t0k3n"));
    assert_eq!(session.form().ceid.as_deref(), Some("42"));

    assert_eq!(session.step().await, StepOutcome::LoginAccepted);
    assert_eq!(session.step().await, StepOutcome::TelemetryRelayed);
    assert_eq!(session.state(), SessionState::EndpointReached);

    let recorded = recorded.lock().unwrap();
    let summary: Vec<_> = recorded.iter().map(|(m, t, _)| (m.as_str(), t.as_str())).collect();
    assert_eq!(
        summary,
        vec![
            ("GET", "/en/connecttoweb"),
            ("GET", "/en/connecttoweb?lang=en"),
            ("POST", "/en/connecttoweb"),
            ("GET", "/combined.json"),
            ("POST", "/ingest"),
        ]
    );
    assert_eq!(recorded[2].2, Bytes::from_static(b"_token=t0k3n&_ceid=42&checkit=1&form_type=login"));
    assert_eq!(recorded[4].2, Bytes::from_static(b"{\"speed\":120}"));
}

#[tokio::test]
async fn test_redirects_are_followed_for_get_only() {
    let (addr, recorded) = serve().await;
    let transport = HyperTransport::new(Duration::from_secs(5));

    let request = Request::post(format!("http://{}/moved", addr))
        .body(Bytes::from_static(b"a=1"))
        .unwrap();
    let response = transport.send(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::FOUND);

    let request = Request::get(format!("http://{}/moved", addr))
        .body(Bytes::new())
        .unwrap();
    let mut body = transport.send(request).await.unwrap().into_body();

    let mut page = Vec::new();
    while let Some(chunk) = body.next().await {
        page.extend_from_slice(&chunk.unwrap());
    }
    assert_eq!(page, PAGE.as_bytes());
    assert_eq!(recorded.lock().unwrap().len(), 3);
}

#[tokio::test]
async fn test_slow_server_times_out() {
    let (addr, _) = serve().await;
    let transport = HyperTransport::new(Duration::from_millis(100));

    let request = Request::get(format!("http://{}/slow", addr)).body(Bytes::new()).unwrap();
    let err = transport.send(request).await.err().unwrap();
    assert_eq!(err, Error::Timeout { limit: Duration::from_millis(100) });
}

#[tokio::test]
async fn test_https_is_not_supported() {
    let transport = HyperTransport::new(Duration::from_secs(1));
    let request = Request::get("https://portal.local/en/connecttoweb").body(Bytes::new()).unwrap();

    assert!(matches!(transport.send(request).await, Err(Error::TransportFailed(_))));
}

#[tokio::test]
async fn test_unreachable_host_fails() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let transport = HyperTransport::new(Duration::from_secs(1));
    let request = Request::get(format!("http://{}/", addr)).body(Bytes::new()).unwrap();

    assert!(matches!(transport.send(request).await, Err(Error::TransportFailed(_))));
}
