use std::borrow::Cow;
use std::ops::ControlFlow;

use encoding_rs::{Encoding, UTF_8};
use memchr::memmem::Finder;

use crate::constants;
use crate::form::{FormField, FormInformation};
use crate::state::ParserState;

/// What the extractor looks for on a line while in a given state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Expect {
    /// A literal marker, indexed into the extractor's marker table.
    Marker(usize),
    /// A `value="..."` attribute holding the given field.
    Value(FormField),
    Nothing,
}

impl Expect {
    fn of(state: ParserState) -> Expect {
        match state {
            ParserState::Init => Expect::Marker(0),
            ParserState::SearchStringFound => Expect::Marker(1),
            ParserState::TokenFieldFound => Expect::Value(FormField::Token),
            ParserState::TokenValueFound => Expect::Marker(2),
            ParserState::CeidFieldFound => Expect::Value(FormField::Ceid),
            ParserState::CeidValueFound => Expect::Marker(3),
            ParserState::CheckitFieldFound => Expect::Value(FormField::Checkit),
            ParserState::CheckitValueFound => Expect::Marker(4),
            ParserState::FormtypeFieldFound => Expect::Value(FormField::FormType),
            ParserState::FormtypeValueFound | ParserState::Done => Expect::Nothing,
        }
    }
}

/// Pulls the four login form values out of the portal page, one line at a time.
///
/// The page is expected to contain, in this order: the form's `action="..."`
/// attribute, then for each of `_token`, `_ceid`, `checkit` and `form_type` a
/// `name="..."` attribute followed by a `value="..."` attribute. Marker and
/// value may share a line or sit on different lines.
///
/// This is literal substring matching, not HTML parsing:
///
/// - A value runs from `value="` to the next `"` on the same line. There is
///   no escape handling, no nested quotes and no entity decoding.
/// - A value whose closing quote is missing is cut at the end of the line and
///   accepted as is.
/// - Only the first occurrence of each marker counts and the extractor never
///   goes back to an earlier one.
#[derive(Debug)]
pub struct FormFieldExtractor {
    state: ParserState,
    form: FormInformation,
    markers: [Finder<'static>; 5],
    value_prefix: Finder<'static>,
    encoding: &'static Encoding,
}

impl FormFieldExtractor {
    /// Creates an extractor whose form starts at the given literal, usually
    /// `action="<portal-url>"`.
    pub fn new<M: AsRef<[u8]>>(form_action: M) -> FormFieldExtractor {
        FormFieldExtractor {
            state: ParserState::Init,
            form: FormInformation::default(),
            markers: [
                Finder::new(form_action.as_ref()).into_owned(),
                Finder::new(constants::TOKEN_FIELD_ID).into_owned(),
                Finder::new(constants::CEID_FIELD_ID).into_owned(),
                Finder::new(constants::CHECKIT_FIELD_ID).into_owned(),
                Finder::new(constants::FORMTYPE_FIELD_ID).into_owned(),
            ],
            value_prefix: Finder::new(constants::VALUE_FIELD_BEGINNING).into_owned(),
            encoding: UTF_8,
        }
    }

    pub fn state(&self) -> ParserState {
        self.state
    }

    pub fn form(&self) -> &FormInformation {
        &self.form
    }

    pub fn is_done(&self) -> bool {
        self.state == ParserState::Done
    }

    /// Sets the charset used to turn value bytes into text. Defaults to UTF-8.
    pub fn set_encoding(&mut self, encoding: &'static Encoding) {
        self.encoding = encoding;
    }

    /// Back to `Init` with no values, ready for a new fetch cycle.
    pub fn reset(&mut self) {
        self.state = ParserState::Init;
        self.form.clear();
        self.encoding = UTF_8;
    }

    /// Processes one completed line, terminator included.
    ///
    /// Returns `Break` once all four values are known, after which the rest
    /// of the document can be discarded.
    pub fn process_line(&mut self, line: &[u8]) -> ControlFlow<()> {
        loop {
            let previous = self.state;
            self.evaluate(line);

            if self.state == previous {
                break;
            }
        }

        if self.form.is_complete() && self.state != ParserState::Done {
            self.state = ParserState::Done;
            log::info!(
                "form parsing done: _token={:?} _ceid={:?} checkit={:?} form_type={:?}",
                self.form.token,
                self.form.ceid,
                self.form.checkit,
                self.form.form_type
            );
        }

        if self.is_done() {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    }

    fn evaluate(&mut self, line: &[u8]) {
        match Expect::of(self.state) {
            Expect::Marker(idx) => {
                if self.markers[idx].find(line).is_some() {
                    self.state = self.state.advance();
                    log::debug!(
                        "{:?} on line: {}",
                        self.state,
                        String::from_utf8_lossy(line_content(line))
                    );
                }
            }
            Expect::Value(field) => {
                let content = line_content(line);

                if let Some(pos) = self.value_prefix.find(content) {
                    let raw = scan_value(&content[pos + constants::VALUE_FIELD_BEGINNING.len()..]);
                    let value = self.decode(raw);
                    log::debug!("found value for {}: {}", field.name(), value);

                    self.form.set(field, value);
                    self.state = self.state.advance();
                }
            }
            Expect::Nothing => {}
        }
    }

    fn decode(&self, raw: &[u8]) -> String {
        match self.encoding.decode_without_bom_handling(raw).0 {
            Cow::Owned(s) => s,
            Cow::Borrowed(s) => String::from(s),
        }
    }
}

/// The line without its `\n` or `\r\n` terminator.
fn line_content(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(&[constants::LF]).unwrap_or(line);
    line.strip_suffix(&[constants::CR]).unwrap_or(line)
}

/// Everything up to the closing quote, or the whole rest when there is none.
fn scan_value(rest: &[u8]) -> &[u8] {
    match memchr::memchr(constants::QUOTE, rest) {
        Some(end) => &rest[..end],
        None => rest,
    }
}
