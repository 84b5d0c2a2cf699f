//! Correlation IDs and capture timestamps.

use chrono::Utc;
use uuid::Uuid;

/// Generate a fresh correlation ID: 32 lowercase hex characters, never containing spaces.
pub fn new_request_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Nanoseconds since the Unix epoch.
pub fn now_nanos() -> i64 {
    let now = Utc::now();
    now.timestamp_nanos_opt()
        .unwrap_or_else(|| now.timestamp_micros().saturating_mul(1_000))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_ids_are_fixed_format_and_unique() {
        let a = new_request_id();
        let b = new_request_id();
        assert_eq!(a.len(), 32);
        assert!(a.bytes().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn timestamps_advance() {
        let t1 = now_nanos();
        let t2 = now_nanos();
        assert!(t1 > 0);
        assert!(t2 >= t1);
    }
}
