//! # Time Utilities
//!
//! Cache bookkeeping works in Unix epoch milliseconds.

use chrono::Utc;

/// Current time as Unix epoch milliseconds.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_now_millis_is_current() {
        let before = Utc::now().timestamp_millis();
        let now = now_millis();
        assert!(now >= before);
        assert!(now - before < 1_000);
    }
}
