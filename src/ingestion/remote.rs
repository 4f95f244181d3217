//! Remote delimited-text sources.

use std::io;
use std::time::Duration;

use reqwest::blocking::{Client, Response};
use tracing::{debug, info};

use crate::error::{IngestionError, IngestionResult};

/// Default timeout for a remote fetch, connection through last byte.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Issue a GET for `url` and return the response once its status is known to be a success.
///
/// The body is left unread so it can be streamed straight into the parser.
pub fn fetch(url: &str, timeout: Duration) -> IngestionResult<Response> {
    let client = Client::builder().timeout(timeout).build()?;
    debug!(url, ?timeout, "fetching remote source");
    let resp = client.get(url).send()?.error_for_status()?;
    info!(
        url,
        status = %resp.status(),
        content_length = ?resp.content_length(),
        "remote source responded"
    );
    Ok(resp)
}

/// Recover the transport failure behind an error raised while the parser read the body.
///
/// The blocking body surfaces connection drops and timeouts as `io::Error`s wrapping a
/// `reqwest::Error`; those become [`IngestionError::Transport`]. Anything else passes through.
pub fn body_failure(err: IngestionError) -> IngestionError {
    match err {
        IngestionError::Io(e) if wraps_transport(&e) => unwrap_transport(e),
        IngestionError::Csv(e) if matches!(e.kind(), csv::ErrorKind::Io(io) if wraps_transport(io)) => {
            match e.into_kind() {
                csv::ErrorKind::Io(io) => unwrap_transport(io),
                kind => IngestionError::Io(io::Error::other(format!("{kind:?}"))),
            }
        }
        other => other,
    }
}

fn wraps_transport(e: &io::Error) -> bool {
    e.get_ref().is_some_and(|inner| inner.is::<reqwest::Error>())
}

fn unwrap_transport(e: io::Error) -> IngestionError {
    let kind = e.kind();
    match e.into_inner().map(|inner| inner.downcast::<reqwest::Error>()) {
        Some(Ok(transport)) => IngestionError::Transport(*transport),
        Some(Err(inner)) => IngestionError::Io(io::Error::new(kind, inner)),
        None => IngestionError::Io(kind.into()),
    }
}
