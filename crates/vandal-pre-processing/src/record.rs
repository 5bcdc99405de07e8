use std::{borrow::Cow, collections::BTreeMap};

use serde::{Deserialize, Serialize};

/// Sentinel the diff collector writes when a revision diff could not be retrieved.
pub const BAD_REQUEST: &str = "BAD REQUEST";

/// Longest decimal string that can still be a plausible epoch-seconds value.
const MAX_EPOCH_DIGITS: usize = 10;

/// A registration time exactly as it appeared in the source table.
///
/// Registered users carry epoch seconds; anonymous users carry a sentinel that
/// is usually a longer, non-epoch value. Both integer and string encodings are
/// accepted so the raw form survives untouched into the output table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawTimestamp {
    Number(serde_json::Number),
    Text(String),
}

impl RawTimestamp {
    #[must_use]
    pub fn as_decimal_str(&self) -> Cow<'_, str> {
        match self {
            Self::Number(n) => Cow::Owned(n.to_string()),
            Self::Text(s) => Cow::Borrowed(s),
        }
    }

    /// Epoch seconds, or `None` when the value is too long or not an integer.
    #[must_use]
    pub fn epoch_seconds(&self) -> Option<i64> {
        let raw = self.as_decimal_str();
        if raw.len() > MAX_EPOCH_DIGITS {
            return None;
        }
        raw.parse::<i64>().ok()
    }
}

impl From<i64> for RawTimestamp {
    fn from(value: i64) -> Self {
        Self::Number(value.into())
    }
}

impl From<&str> for RawTimestamp {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

/// One observed modification to a page.
///
/// Columns the feature pipeline does not read (revision counts, contributor
/// counts, ...) are kept in `extra` and written back out unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EditRecord {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub user_reg_time: Option<RawTimestamp>,
    #[serde(default)]
    pub current_timestamp: i64,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub added_lines: Option<String>,
    #[serde(default)]
    pub deleted_lines: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub isvandalism: Option<bool>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl EditRecord {
    /// A record carrying only diff text, mostly useful for scoring.
    #[must_use]
    pub fn from_diff(added: impl Into<String>, deleted: impl Into<String>) -> Self {
        Self {
            added_lines: Some(added.into()),
            deleted_lines: Some(deleted.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_label(mut self, isvandalism: bool) -> Self {
        self.isvandalism = Some(isvandalism);
        self
    }

    #[must_use]
    pub fn added_text(&self) -> Option<&str> {
        self.added_lines.as_deref()
    }

    #[must_use]
    pub fn deleted_text(&self) -> Option<&str> {
        self.deleted_lines.as_deref()
    }

    /// Whether either side of the diff is the [`BAD_REQUEST`] sentinel.
    #[must_use]
    pub fn is_bad_request(&self) -> bool {
        self.added_text() == Some(BAD_REQUEST) || self.deleted_text() == Some(BAD_REQUEST)
    }
}
