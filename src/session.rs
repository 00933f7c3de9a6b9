use std::fmt::{self, Debug, Formatter};

use bytes::Bytes;
use futures_util::stream::StreamExt;
use http::header;
use tokio::time::{self, Instant};

use crate::buffer::LineRingBuffer;
use crate::config::Config;
use crate::constants;
use crate::extractor::FormFieldExtractor;
use crate::form::FormInformation;
use crate::helpers;
use crate::state::{ParserState, SessionContext, SessionState};
use crate::transport::Transport;

type Observer = Box<dyn FnMut(SessionState, SessionState) + Send>;

/// What a single [`Session::step`] did.
#[derive(Debug, PartialEq, Eq)]
pub enum StepOutcome {
    /// Nothing was due.
    Idle,
    /// The link came up and the session moved to `Connected`.
    LinkEstablished,
    /// A retry deadline fired and the session was reset to `Connected`.
    RetryFired,
    /// The login form was extracted from the portal page.
    FormParsed,
    /// Fetching or parsing the portal page failed; a retry is scheduled.
    FetchFailed(crate::Error),
    /// The portal accepted the login.
    LoginAccepted,
    /// The login POST failed. It is sent again on the next step.
    LoginRejected(crate::Error),
    /// `RequestParsed` was reached without all four form values.
    FormIncomplete,
    /// Telemetry was fetched and delivered to the endpoint.
    TelemetryRelayed,
    /// Fetching or delivering telemetry failed. Retried on the next interval.
    TelemetryFailed(crate::Error),
}

/// Drives the captive portal login and the telemetry relay.
///
/// The session is a single-threaded state machine. Each call to
/// [`step`](Session::step) looks at the current [`SessionState`], performs at
/// most one round of network work and returns. [`run`](Session::run) calls it
/// forever at a fixed cadence.
///
/// ```text
/// Init ──link up──▶ Connected ──GET portal──▶ RequestMade ──form found──▶ RequestParsed
///                      ▲                           │                            │
///                      └──── retry deadline ◀──────┘ (failure)          POST login (2xx)
///                                                                               ▼
///                     EndpointReached ◀──relay telemetry (2xx)── PostSucceeded
/// ```
///
/// # Examples
///
/// ```no_run
/// use captive_relay::{Config, HyperTransport, Session};
///
/// # async fn run() {
/// let config = Config::new(
///     "http://portal.local/en/connecttoweb",
///     "http://portal.local/assets/media/fis/combined.json",
///     "http://collector.local/ingest",
///     "secret",
/// );
/// let transport = HyperTransport::new(config.transport_timeout);
///
/// Session::new(transport, config).run().await;
/// # }
/// ```
pub struct Session<T> {
    transport: T,
    config: Config,
    ctx: SessionContext,
    observer: Option<Observer>,
}

impl<T: Transport> Session<T> {
    pub fn new(transport: T, config: Config) -> Session<T> {
        let lines = LineRingBuffer::new(config.line_capacity, config.max_line_length, config.line_overflow);
        let extractor = FormFieldExtractor::new(config.form_action_marker());

        Session {
            transport,
            config,
            ctx: SessionContext::new(lines, extractor),
            observer: None,
        }
    }

    /// Registers a callback invoked with `(from, to)` on every state change.
    pub fn with_observer<F>(mut self, observer: F) -> Session<T>
    where
        F: FnMut(SessionState, SessionState) + Send + 'static,
    {
        self.observer = Some(Box::new(observer));
        self
    }

    pub fn state(&self) -> SessionState {
        self.ctx.state
    }

    pub fn parser_state(&self) -> ParserState {
        self.ctx.extractor.state()
    }

    pub fn form(&self) -> &FormInformation {
        self.ctx.extractor.form()
    }

    /// The most recent lines of the last portal page.
    pub fn lines(&self) -> &LineRingBuffer {
        &self.ctx.lines
    }

    pub fn retry_deadline(&self) -> Option<Instant> {
        self.ctx.retry.deadline()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Runs the control loop forever, pausing `idle_delay` between steps.
    pub async fn run(mut self) {
        log::info!("starting session against {}", self.config.portal_url);

        loop {
            self.step().await;
            time::sleep(self.config.idle_delay).await;
        }
    }

    /// Runs one iteration of the control loop.
    pub async fn step(&mut self) -> StepOutcome {
        let before = self.ctx.state;
        if self.ctx.poll_retry(Instant::now()) {
            log::info!("retry deadline reached, restarting portal fetch");
            self.notify(before, self.ctx.state);
            return StepOutcome::RetryFired;
        }

        match self.ctx.state {
            SessionState::Init => {
                if self.transport.is_link_up() {
                    log::info!("network link established");
                    self.transition(SessionState::Connected);
                    StepOutcome::LinkEstablished
                } else {
                    StepOutcome::Idle
                }
            }
            SessionState::Connected => {
                if self.ctx.retry.is_pending() {
                    StepOutcome::Idle
                } else {
                    self.fetch_portal().await
                }
            }
            SessionState::RequestMade => {
                let err = crate::Error::IncompleteForm;
                log::warn!("previous portal fetch was interrupted");
                self.fail_fetch(err)
            }
            SessionState::RequestParsed => self.submit_login().await,
            SessionState::PostSucceeded | SessionState::EndpointReached => self.relay_telemetry().await,
        }
    }

    async fn fetch_portal(&mut self) -> StepOutcome {
        self.ctx.begin_fetch();
        self.transition(SessionState::RequestMade);

        log::info!("[HTTP] GET {}", self.config.portal_url);
        match self.read_portal_form().await {
            Ok(()) => {
                self.transition(SessionState::RequestParsed);
                StepOutcome::FormParsed
            }
            Err(err) => self.fail_fetch(err),
        }
    }

    async fn read_portal_form(&mut self) -> crate::Result<()> {
        let url = self.config.portal_url.as_str();
        let request = helpers::get_request(url)?;
        let response = helpers::ensure_success(url, self.transport.send(request).await?)?;
        log::debug!("[HTTP] GET {} code: {}", url, response.status());

        let SessionContext { lines, extractor, .. } = &mut self.ctx;
        extractor.set_encoding(helpers::response_encoding(response.headers()));

        let mut body = response.into_body();
        while let Some(chunk) = body.next().await {
            let chunk = chunk?;

            if lines.feed(&chunk, |line| extractor.process_line(line))?.is_break() {
                // Dropping `body` abandons the rest of the page.
                return Ok(());
            }
        }

        Err(crate::Error::IncompleteForm)
    }

    fn fail_fetch(&mut self, err: crate::Error) -> StepOutcome {
        log::warn!(
            "portal fetch failed: {} (parser reached {:?}), retrying in {:?}",
            err,
            self.ctx.extractor.state(),
            self.config.retry_delay
        );
        for line in self.ctx.lines.iter() {
            log::debug!("  | {}", String::from_utf8_lossy(line).trim_end());
        }

        self.ctx.retry.schedule_after(Instant::now(), self.config.retry_delay);
        self.transition(SessionState::Connected);
        StepOutcome::FetchFailed(err)
    }

    async fn submit_login(&mut self) -> StepOutcome {
        let body = match self.ctx.extractor.form().to_urlencoded() {
            Some(body) => body,
            None => {
                log::error!("form information incomplete, cannot send login request");
                return StepOutcome::FormIncomplete;
            }
        };

        log::debug!("login data: {}", body);
        match self.post_login(body).await {
            Ok(()) => {
                log::info!("portal accepted the login");
                self.transition(SessionState::PostSucceeded);
                StepOutcome::LoginAccepted
            }
            Err(err) => {
                log::warn!("login request failed: {}", err);
                StepOutcome::LoginRejected(err)
            }
        }
    }

    async fn post_login(&self, body: String) -> crate::Result<()> {
        let url = self.config.portal_url.as_str();
        let request = helpers::post_request(url, &mime::APPLICATION_WWW_FORM_URLENCODED, Bytes::from(body))?;

        let response = helpers::ensure_success(url, self.transport.send(request).await?)?;
        log::debug!("[HTTP] POST {} code: {}", url, response.status());
        Ok(())
    }

    async fn relay_telemetry(&mut self) -> StepOutcome {
        let now = Instant::now();
        if let Some(last) = self.ctx.last_telemetry_fetch {
            if now.saturating_duration_since(last) < self.config.fetch_interval {
                return StepOutcome::Idle;
            }
        }
        self.ctx.last_telemetry_fetch = Some(now);

        match self.fetch_and_forward().await {
            Ok(()) => {
                if self.ctx.state != SessionState::EndpointReached {
                    log::info!("telemetry reached {}", self.config.endpoint_url);
                }
                self.transition(SessionState::EndpointReached);
                StepOutcome::TelemetryRelayed
            }
            Err(err) => {
                log::warn!("telemetry relay failed: {}", err);
                StepOutcome::TelemetryFailed(err)
            }
        }
    }

    async fn fetch_and_forward(&self) -> crate::Result<()> {
        let source = self.config.telemetry_url.as_str();
        log::debug!("[HTTP] GET {}", source);

        let response = helpers::ensure_success(source, self.transport.send(helpers::get_request(source)?).await?)?;
        let payload = helpers::collect_body(response.into_body(), self.config.max_payload_size).await?;
        log::debug!("telemetry payload: {} bytes", payload.len());

        let target = self.config.endpoint_url.as_str();
        let api_key_header = header::HeaderName::from_static(constants::API_KEY_HEADER);
        let mut request = helpers::post_request(target, &mime::APPLICATION_JSON, payload)?;
        request.headers_mut().insert(
            api_key_header.clone(),
            helpers::header_value(&api_key_header, &self.config.api_key)?,
        );

        let response = helpers::ensure_success(target, self.transport.send(request).await?)?;
        log::debug!("[HTTP] POST {} code: {}", target, response.status());
        Ok(())
    }

    fn transition(&mut self, to: SessionState) {
        let from = self.ctx.state;
        if from == to {
            return;
        }

        self.ctx.state = to;
        self.notify(from, to);
    }

    /// Reports a state change that already happened inside the context.
    fn notify(&mut self, from: SessionState, to: SessionState) {
        if from == to {
            return;
        }

        log::debug!("session state {:?} -> {:?}", from, to);
        if let Some(observer) = self.observer.as_mut() {
            observer(from, to);
        }
    }
}

impl<T: Debug> Debug for Session<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("transport", &self.transport)
            .field("config", &self.config)
            .field("ctx", &self.ctx)
            .finish_non_exhaustive()
    }
}
