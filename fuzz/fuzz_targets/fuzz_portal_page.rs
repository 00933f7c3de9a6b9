#![no_main]

use captive_relay::bytes::Bytes;
use captive_relay::http::{Request, Response};
use captive_relay::{ByteStream, Config, Session, SessionState, Transport};
use futures_util::stream::once;
use libfuzzer_sys::fuzz_target;
use tokio::runtime;

struct Page(Bytes);

impl Transport for Page {
    async fn send(&self, _request: Request<Bytes>) -> captive_relay::Result<Response<ByteStream>> {
        let data = self.0.clone();
        let body: ByteStream = Box::pin(once(async move { Ok(data) }));
        Ok(Response::new(body))
    }
}

fuzz_target!(|data: &[u8]| {
    let config = Config::new(
        "http://portal.local/login",
        "http://portal.local/telemetry.json",
        "http://collector.local/ingest",
        "key",
    );
    let mut session = Session::new(Page(Bytes::copy_from_slice(data)), config);

    let rt = runtime::Builder::new_current_thread().enable_time().build().expect("runtime");
    rt.block_on(async {
        for _ in 0..3 {
            session.step().await;
        }
    });

    assert!(matches!(
        session.state(),
        SessionState::Connected | SessionState::RequestParsed | SessionState::PostSucceeded | SessionState::EndpointReached
    ));
});
