//! Per-call cancellation context: deadline parsing and disconnect detection.

use core::time::Duration;
use pcbook_tonic_core::{pcbook::CancellationMonitor, types::GRPC_TIMEOUT_HEADER};
use std::time::Instant;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tonic::Request;

/// Parses a `grpc-timeout` header value: at most eight ASCII digits followed
/// by one of `H`, `M`, `S`, `m`, `u` or `n`.
pub fn parse_grpc_timeout(value: &str) -> Option<Duration> {
    if !value.is_ascii() {
        return None;
    }
    let (digits, unit) = value.split_at(value.len().checked_sub(1)?);
    if digits.is_empty() || digits.len() > 8 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let amount: u64 = digits.parse().ok()?;

    match unit {
        "H" => Some(Duration::from_secs(amount * 60 * 60)),
        "M" => Some(Duration::from_secs(amount * 60)),
        "S" => Some(Duration::from_secs(amount)),
        "m" => Some(Duration::from_millis(amount)),
        "u" => Some(Duration::from_micros(amount)),
        "n" => Some(Duration::from_nanos(amount)),
        _ => None,
    }
}

/// The instant by which the caller expects an answer, if it sent a valid
/// `grpc-timeout`.
pub fn call_deadline<T>(req: &Request<T>) -> Option<Instant> {
    let raw = req.metadata().get(GRPC_TIMEOUT_HEADER)?.to_str().ok()?;
    let timeout = parse_grpc_timeout(raw)?;
    Instant::now().checked_add(timeout)
}

pub fn call_monitor<T>(req: &Request<T>, token: CancellationToken) -> CancellationMonitor {
    CancellationMonitor::new(token, call_deadline(req))
}

/// Cancels `token` once the receiving half of `tx` is dropped, i.e. the client
/// stopped reading the response stream.
///
/// The watcher holds a sender clone until `token` is cancelled, so the call's
/// worker must cancel `token` when it finishes (see
/// [`CancellationToken::drop_guard`]) or the response stream never ends.
pub fn cancel_on_close<T>(tx: &mpsc::Sender<T>, token: CancellationToken)
where
    T: Send + 'static,
{
    let tx = tx.clone();
    tokio::spawn(async move {
        tokio::select! {
            () = tx.closed() => token.cancel(),
            () = token.cancelled() => {}
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use tonic::metadata::MetadataValue;

    #[test]
    fn parses_every_unit() {
        assert_eq!(parse_grpc_timeout("2H"), Some(Duration::from_secs(7200)));
        assert_eq!(parse_grpc_timeout("3M"), Some(Duration::from_secs(180)));
        assert_eq!(parse_grpc_timeout("5S"), Some(Duration::from_secs(5)));
        assert_eq!(parse_grpc_timeout("250m"), Some(Duration::from_millis(250)));
        assert_eq!(parse_grpc_timeout("7u"), Some(Duration::from_micros(7)));
        assert_eq!(parse_grpc_timeout("99999999n"), Some(Duration::from_nanos(99_999_999)));
    }

    #[test]
    fn rejects_malformed_values() {
        for raw in ["", "S", "10", "10s", "123456789S", "-1S", "1.5S", "ñ"] {
            assert_eq!(parse_grpc_timeout(raw), None, "{raw:?}");
        }
    }

    #[test]
    fn deadline_comes_from_request_metadata() {
        let mut req = Request::new(());
        assert!(call_deadline(&req).is_none());

        req.metadata_mut()
            .insert(GRPC_TIMEOUT_HEADER, MetadataValue::from_static("10S"));
        let deadline = call_deadline(&req).unwrap();
        let remaining = deadline.saturating_duration_since(Instant::now());
        assert!(remaining > Duration::from_secs(9));
        assert!(remaining <= Duration::from_secs(10));
    }

    #[tokio::test]
    async fn closing_the_receiver_cancels_the_token() {
        let (tx, rx) = mpsc::channel::<u8>(1);
        let token = CancellationToken::new();
        cancel_on_close(&tx, token.clone());

        drop(rx);
        tokio::time::timeout(Duration::from_secs(1), token.cancelled())
            .await
            .unwrap();
    }
}
