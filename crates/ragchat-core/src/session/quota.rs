//! Free query allowance and the email gate that lifts it.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Questions allowed before an email address is required.
pub const QUOTA_THRESHOLD: u32 = 3;

static EMAIL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("valid email regex")
});

/// Returns true if `email` looks like `local@domain.tld`.
pub fn is_valid_email(email: &str) -> bool {
    EMAIL_PATTERN.is_match(email)
}

/// Snapshot of the quota for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaStatus {
    pub used: u32,
    pub limit: u32,
    pub unlocked: bool,
}

impl QuotaStatus {
    pub fn new(used: u32, unlocked: bool) -> Self {
        Self {
            used,
            limit: QUOTA_THRESHOLD,
            unlocked,
        }
    }

    pub fn remaining(&self) -> u32 {
        self.limit.saturating_sub(self.used)
    }

    /// True when new questions must wait for an email address.
    pub fn is_blocked(&self) -> bool {
        !self.unlocked && self.used >= self.limit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_emails() {
        assert!(is_valid_email("a@b.co"));
        assert!(is_valid_email("first.last+tag@mail.example.org"));
    }

    #[test]
    fn test_invalid_emails() {
        assert!(!is_valid_email("not-an-email"));
        assert!(!is_valid_email("a@b.c"));
        assert!(!is_valid_email("@b.co"));
        assert!(!is_valid_email("a@b.co "));
        assert!(!is_valid_email(""));
    }

    #[test]
    fn test_quota_status() {
        let status = QuotaStatus::new(2, false);
        assert_eq!(status.remaining(), 1);
        assert!(!status.is_blocked());

        let status = QuotaStatus::new(3, false);
        assert_eq!(status.remaining(), 0);
        assert!(status.is_blocked());

        let status = QuotaStatus::new(10, true);
        assert_eq!(status.remaining(), 0);
        assert!(!status.is_blocked());
    }
}
