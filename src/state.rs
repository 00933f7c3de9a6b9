use tokio::time::Instant;

use crate::buffer::LineRingBuffer;
use crate::extractor::FormFieldExtractor;
use crate::retry::RetryScheduler;

/// Where the session currently is in the portal login and relay cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// Waiting for the network link.
    Init,
    /// Link is up, a portal fetch is due (or waiting on a retry deadline).
    Connected,
    /// The portal page is being streamed.
    RequestMade,
    /// All four form fields were extracted, the login POST is due.
    RequestParsed,
    /// The portal accepted the login.
    PostSucceeded,
    /// Telemetry has reached the endpoint at least once.
    EndpointReached,
}

/// Progress of the form extractor through the expected document shape.
///
/// Variants are declared in document order, so `Ord` follows the order in
/// which the extractor visits them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ParserState {
    Init,
    SearchStringFound,
    TokenFieldFound,
    TokenValueFound,
    CeidFieldFound,
    CeidValueFound,
    CheckitFieldFound,
    CheckitValueFound,
    FormtypeFieldFound,
    FormtypeValueFound,
    Done,
}

impl ParserState {
    /// The state one step further along the document. `Done` stays `Done`.
    pub(crate) fn advance(self) -> ParserState {
        match self {
            ParserState::Init => ParserState::SearchStringFound,
            ParserState::SearchStringFound => ParserState::TokenFieldFound,
            ParserState::TokenFieldFound => ParserState::TokenValueFound,
            ParserState::TokenValueFound => ParserState::CeidFieldFound,
            ParserState::CeidFieldFound => ParserState::CeidValueFound,
            ParserState::CeidValueFound => ParserState::CheckitFieldFound,
            ParserState::CheckitFieldFound => ParserState::CheckitValueFound,
            ParserState::CheckitValueFound => ParserState::FormtypeFieldFound,
            ParserState::FormtypeFieldFound => ParserState::FormtypeValueFound,
            ParserState::FormtypeValueFound | ParserState::Done => ParserState::Done,
        }
    }
}

/// Everything the control loop mutates. Owned by [`Session`](crate::Session)
/// and lent to each component's step function.
#[derive(Debug)]
pub(crate) struct SessionContext {
    pub(crate) state: SessionState,
    pub(crate) lines: LineRingBuffer,
    pub(crate) extractor: FormFieldExtractor,
    pub(crate) retry: RetryScheduler,
    pub(crate) last_telemetry_fetch: Option<Instant>,
}

impl SessionContext {
    pub(crate) fn new(lines: LineRingBuffer, extractor: FormFieldExtractor) -> SessionContext {
        SessionContext {
            state: SessionState::Init,
            lines,
            extractor,
            retry: RetryScheduler::new(),
            last_telemetry_fetch: None,
        }
    }

    /// Clears everything a fetch cycle accumulates.
    pub(crate) fn begin_fetch(&mut self) {
        self.lines.reset();
        self.extractor.reset();
    }

    /// Fires the retry deadline if it has passed. Returns whether it fired.
    pub(crate) fn poll_retry(&mut self, now: Instant) -> bool {
        if !self.retry.poll(now) {
            return false;
        }

        self.extractor.reset();
        self.state = SessionState::Connected;
        true
    }
}
