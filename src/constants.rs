use std::time::Duration;

pub(crate) const DEFAULT_FETCH_INTERVAL: Duration = Duration::from_secs(10);
pub(crate) const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(5);
pub(crate) const DEFAULT_TRANSPORT_TIMEOUT: Duration = Duration::from_secs(10);
pub(crate) const DEFAULT_IDLE_DELAY: Duration = Duration::from_millis(10);
pub(crate) const DEFAULT_LINE_CAPACITY: usize = 10;
pub(crate) const DEFAULT_MAX_LINE_LENGTH: usize = 16 * 1024;
pub(crate) const DEFAULT_MAX_PAYLOAD_SIZE: usize = 256 * 1024;

#[cfg(feature = "client")]
pub(crate) const MAX_REDIRECTS: usize = 5;

pub(crate) const LF: u8 = b'\n';
pub(crate) const CR: u8 = b'\r';
pub(crate) const QUOTE: u8 = b'"';

pub(crate) const TOKEN_FIELD_ID: &str = "name=\"_token\"";
pub(crate) const CEID_FIELD_ID: &str = "name=\"_ceid\"";
pub(crate) const CHECKIT_FIELD_ID: &str = "name=\"checkit\"";
pub(crate) const FORMTYPE_FIELD_ID: &str = "name=\"form_type\"";
pub(crate) const VALUE_FIELD_BEGINNING: &str = "value=\"";

pub(crate) const API_KEY_HEADER: &str = "x-api-key";

/// The literal that opens the login form: `action="<portal-url>"`.
pub(crate) fn form_action_marker(portal_url: &str) -> String {
    format!("action=\"{}\"", portal_url)
}
