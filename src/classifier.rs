//! Maps raw data-source failures onto [`ResolutionError`] and decides which
//! of them are worth another attempt.

use std::error::Error as StdError;
use std::io;

use crate::error::{FetchError, ResolutionError};

const PREMATURE_CLOSE: &str = "prematurely closed";
const CONNECTION_RESET: &str = "Connection reset";

/// Transient failures: timeouts, failed connects, socket timeouts, and
/// connections closed or reset under us. The whole `source()` chain is searched.
pub fn is_retryable(failure: &FetchError) -> bool {
    if let FetchError::Status { code, .. } = failure {
        if *code >= 500 {
            return true;
        }
    }
    chain(failure).any(|err| {
        is_timeout(err) || is_connect(err) || is_reset(err) || message_contains(err, &[PREMATURE_CLOSE])
    })
}

/// User-facing classification of a failure that will not be retried any further.
pub fn classify(failure: &FetchError) -> ResolutionError {
    match failure {
        FetchError::Status { code, reason, .. } => ResolutionError::UpstreamUnavailable(format!(
            "error querying the time API, code {code}, message {reason}"
        )),
        FetchError::Malformed(detail) => ResolutionError::UpstreamMalformed(detail.clone()),
        _ if chain(failure).any(is_timeout) => ResolutionError::Timeout(
            "timed out while trying to connect to the time server".into(),
        ),
        _ if chain(failure).any(is_connect) => ResolutionError::UpstreamUnavailable(
            "could not connect to the time server; check network connectivity".into(),
        ),
        _ if chain(failure).any(|err| message_contains(err, &[PREMATURE_CLOSE])) => {
            ResolutionError::UpstreamUnavailable(
                "connection to the time server closed unexpectedly; please retry".into(),
            )
        }
        _ if chain(failure).any(is_reset) => ResolutionError::UpstreamUnavailable(
            "connection to the time server was reset; please retry".into(),
        ),
        other => ResolutionError::UpstreamUnavailable(format!(
            "unexpected error while fetching the time: {other}"
        )),
    }
}

fn chain(failure: &FetchError) -> impl Iterator<Item = &(dyn StdError + 'static)> {
    // transparent variants forward source() past the wrapped error, so start from it
    let root: &(dyn StdError + 'static) = match failure {
        FetchError::Http(err) => err,
        FetchError::Io(err) => err,
        other => other,
    };
    std::iter::successors(Some(root), |&err| err.source())
}

fn is_timeout(err: &(dyn StdError + 'static)) -> bool {
    if let Some(fetch) = err.downcast_ref::<FetchError>() {
        return matches!(fetch, FetchError::Timeout(_));
    }
    if let Some(http) = err.downcast_ref::<reqwest::Error>() {
        return http.is_timeout();
    }
    if let Some(io) = err.downcast_ref::<io::Error>() {
        return matches!(io.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock);
    }
    false
}

fn is_connect(err: &(dyn StdError + 'static)) -> bool {
    if let Some(http) = err.downcast_ref::<reqwest::Error>() {
        return http.is_connect();
    }
    if let Some(io) = err.downcast_ref::<io::Error>() {
        return matches!(
            io.kind(),
            io::ErrorKind::ConnectionRefused
                | io::ErrorKind::NotConnected
                | io::ErrorKind::AddrNotAvailable
                | io::ErrorKind::HostUnreachable
                | io::ErrorKind::NetworkUnreachable
        );
    }
    false
}

fn is_reset(err: &(dyn StdError + 'static)) -> bool {
    if let Some(io) = err.downcast_ref::<io::Error>() {
        if io.kind() == io::ErrorKind::ConnectionReset {
            return true;
        }
    }
    message_contains(err, &[CONNECTION_RESET])
}

fn message_contains(err: &(dyn StdError + 'static), needles: &[&str]) -> bool {
    let message = err.to_string();
    needles.iter().any(|needle| message.contains(needle))
}
