//! Stateless per-row features.
//!
//! Each function reads one [`EditRecord`] and never fails: malformed or
//! missing input degrades to the documented default.

use std::net::IpAddr;

use tracing::debug;

use crate::{EditRecord, text::tokenizer};

const SECONDS_PER_DAY: i64 = 86_400;

/// Age reported when the registration time is missing or not epoch seconds.
pub const DEFAULT_ACCOUNT_AGE: i64 = 1;

/// Whole days between registration and this edit, floored.
///
/// Registration times that are absent, longer than ten digits, or not an
/// integer belong to anonymous or malformed accounts and yield
/// [`DEFAULT_ACCOUNT_AGE`]. A negative age is returned as is.
#[must_use]
pub fn account_age(record: &EditRecord) -> i64 {
    let Some(registered) = record
        .user_reg_time
        .as_ref()
        .and_then(|raw| raw.epoch_seconds())
    else {
        return DEFAULT_ACCOUNT_AGE;
    };

    let age = record
        .current_timestamp
        .saturating_sub(registered)
        .div_euclid(SECONDS_PER_DAY);
    if age < 0 {
        debug!(
            user = %record.user,
            registered,
            edited = record.current_timestamp,
            age,
            "Edit predates account registration"
        );
    }
    age
}

/// The editor is an IPv4 or IPv6 literal, i.e. not logged in.
#[must_use]
pub fn is_anonymous(record: &EditRecord) -> bool {
    record.user.parse::<IpAddr>().is_ok()
}

/// The edit summary is absent. An empty but present summary does not count.
#[must_use]
pub fn comment_empty(record: &EditRecord) -> bool {
    record.comment.is_none()
}

/// Normalized token counts of the added and deleted text.
#[must_use]
pub fn word_count(record: &EditRecord) -> (usize, usize) {
    (
        tokenizer::tokens(record.added_text()).len(),
        tokenizer::tokens(record.deleted_text()).len(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RawTimestamp;

    fn registered(reg: impl Into<RawTimestamp>, now: i64) -> EditRecord {
        EditRecord {
            user_reg_time: Some(reg.into()),
            current_timestamp: now,
            ..EditRecord::default()
        }
    }

    fn user(name: &str) -> EditRecord {
        EditRecord {
            user: name.to_owned(),
            ..EditRecord::default()
        }
    }

    #[test]
    fn test_account_age_exact_day() {
        assert_eq!(account_age(&registered(1_000_000_000_i64, 1_000_086_400)), 1);
    }

    #[test]
    fn test_account_age_floors_partial_days() {
        assert_eq!(account_age(&registered(1_000_000_000_i64, 1_000_086_399)), 0);
        assert_eq!(account_age(&registered(1_000_000_000_i64, 1_000_000_000 + 10 * 86_400 + 5)), 10);
    }

    #[test]
    fn test_account_age_malformed_registration() {
        assert_eq!(account_age(&registered("20010909014640", 1_000_086_400)), 1);
        assert_eq!(account_age(&registered("anonymous", 1_000_086_400)), 1);
        assert_eq!(account_age(&EditRecord::default()), DEFAULT_ACCOUNT_AGE);
    }

    #[test]
    fn test_account_age_negative_passes_through() {
        assert_eq!(account_age(&registered(1_000_086_400_i64, 1_000_000_000)), -1);
    }

    #[test]
    fn test_is_anonymous() {
        assert!(is_anonymous(&user("192.168.1.1")));
        assert!(is_anonymous(&user("::1")));
        assert!(is_anonymous(&user("2001:db8::ff00:42:8329")));
        assert!(!is_anonymous(&user("Jimbo42")));
        assert!(!is_anonymous(&user("999.1.1.1")));
        assert!(!is_anonymous(&user("")));
    }

    #[test]
    fn test_comment_empty() {
        let mut record = EditRecord::default();
        assert!(comment_empty(&record));
        record.comment = Some(String::new());
        assert!(!comment_empty(&record));
        record.comment = Some("rv vandalism".to_owned());
        assert!(!comment_empty(&record));
    }

    #[test]
    fn test_word_count() {
        let record = EditRecord::from_diff("Hello, hello world!", "");
        assert_eq!(word_count(&record), (3, 0));
        assert_eq!(word_count(&EditRecord::default()), (0, 0));
    }
}
