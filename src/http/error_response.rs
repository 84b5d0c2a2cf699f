//! Synthetic responses for replays that never got a real answer.
//!
//! The status codes follow the 52x edge-error numbering popularized by CDNs,
//! so a failed replay still looks like an HTTP response to every consumer.

use bytes::Bytes;
use chrono::Utc;

const TEMPLATE: &[u8] = b"HTTP/1.1 202 Accepted\r\nDate: Mon, 17 Aug 2015 14:10:11 GMT\r\nContent-Length: 0\r\nContent-Type: text/plain; charset=utf-8\r\n\r\n";

const STATUS_RANGE: std::ops::Range<usize> = 9..12;
const DATE_RANGE: std::ops::Range<usize> = 29..58;

/// Status codes placed into a synthetic response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyntheticStatus {
    /// 520: the target returned something unusable.
    Unknown,
    /// 521: the target refused or dropped the connection.
    ConnectionError,
    /// 522: the connect attempt timed out.
    ConnectionTimeout,
    /// 523: the target address could not be resolved or reached.
    Unreachable,
    /// 524: a write or read timed out.
    Timeout,
}

impl SyntheticStatus {
    pub fn code(self) -> &'static str {
        match self {
            SyntheticStatus::Unknown => "520",
            SyntheticStatus::ConnectionError => "521",
            SyntheticStatus::ConnectionTimeout => "522",
            SyntheticStatus::Unreachable => "523",
            SyntheticStatus::Timeout => "524",
        }
    }
}

/// Build a minimal response carrying `status` and the current date.
pub fn error_response(status: SyntheticStatus) -> Bytes {
    let mut payload = TEMPLATE.to_vec();
    let date = Utc::now().format("%a, %d %b %Y %H:%M:%S GMT").to_string();

    // RFC 1123 dates are fixed width; anything else would shift the headers.
    if date.len() == DATE_RANGE.len() {
        payload[DATE_RANGE].copy_from_slice(date.as_bytes());
    }
    payload[STATUS_RANGE].copy_from_slice(status.code().as_bytes());
    metrics::counter!("replay_synthetic_responses_total", "code" => status.code()).increment(1);

    Bytes::from(payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::proto;

    #[test]
    fn template_offsets_line_up() {
        assert_eq!(&TEMPLATE[STATUS_RANGE], b"202");
        assert_eq!(&TEMPLATE[DATE_RANGE], b"Mon, 17 Aug 2015 14:10:11 GMT");
    }

    #[test]
    fn patches_status_and_date() {
        let resp = error_response(SyntheticStatus::ConnectionError);
        assert!(resp.starts_with(b"HTTP/1.1 521 Accepted\r\nDate: "));
        assert_eq!(resp.len(), TEMPLATE.len());
        assert_ne!(&resp[DATE_RANGE], b"Mon, 17 Aug 2015 14:10:11 GMT");
        assert_eq!(proto::header(&resp, "Content-Length"), Some(&b"0"[..]));
        assert_eq!(proto::response_framing(&resp, false), proto::Framing::Complete);
    }

    #[test]
    fn every_code_is_three_digits() {
        for status in [
            SyntheticStatus::Unknown,
            SyntheticStatus::ConnectionError,
            SyntheticStatus::ConnectionTimeout,
            SyntheticStatus::Unreachable,
            SyntheticStatus::Timeout,
        ] {
            let resp = error_response(status);
            assert_eq!(proto::status(&resp), Some(status.code().as_bytes()));
        }
    }
}
