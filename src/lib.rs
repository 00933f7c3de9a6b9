//! A streaming captive portal login client and telemetry relay.
//!
//! The portal serves an HTML page carrying a login form with four hidden
//! inputs. [`Session`] streams that page through a [`LineRingBuffer`] into a
//! [`FormFieldExtractor`], which picks the values out line by line without
//! ever holding the whole document. The values are posted back to the portal,
//! and once logged in the session periodically fetches a JSON telemetry
//! document and relays it to a configured endpoint.
//!
//! Network I/O goes through the [`Transport`] trait. With the `client`
//! feature (enabled by default), [`HyperTransport`] provides a plain-HTTP
//! implementation.
//!
//! # Examples
//!
//! ```
//! use captive_relay::{FormFieldExtractor, LineOverflow, LineRingBuffer, ParserState};
//!
//! let page = "<form action=\"http://portal.local/login\">\n\
//!             <input name=\"_token\" value=\"abc\">\n\
//!             <input name=\"_ceid\" value=\"1\">\n\
//!             <input name=\"checkit\" value=\"1\">\n\
//!             <input name=\"form_type\" value=\"login\">\n";
//!
//! let mut lines = LineRingBuffer::new(10, 4096, LineOverflow::Truncate);
//! let mut extractor = FormFieldExtractor::new("action=\"http://portal.local/login\"");
//!
//! // Chunks may split lines anywhere.
//! for chunk in page.as_bytes().chunks(7) {
//!     if lines.feed(chunk, |line| extractor.process_line(line)).unwrap().is_break() {
//!         break;
//!     }
//! }
//!
//! assert_eq!(extractor.state(), ParserState::Done);
//! assert_eq!(
//!     extractor.form().to_urlencoded().as_deref(),
//!     Some("_token=abc&_ceid=1&checkit=1&form_type=login")
//! );
//! ```

pub use buffer::LineRingBuffer;
#[cfg(feature = "client")]
pub use client::HyperTransport;
pub use config::{Config, LineOverflow, NetworkCredentials};
pub use error::Error;
pub use extractor::FormFieldExtractor;
pub use form::{FormField, FormInformation};
pub use retry::RetryScheduler;
pub use session::{Session, StepOutcome};
pub use state::{ParserState, SessionState};
pub use transport::{ByteStream, Transport};

pub use bytes;
pub use http;

mod buffer;
#[cfg(feature = "client")]
mod client;
mod config;
mod constants;
mod error;
mod extractor;
mod form;
mod helpers;
mod retry;
mod session;
mod state;
mod transport;

/// A Result type often returned from methods that can have `captive-relay` errors.
pub type Result<T> = std::result::Result<T, Error>;
