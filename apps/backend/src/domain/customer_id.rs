//! Customer ids: `ZEN` + `yyMMddHHmm` (UTC) + 5-digit daily sequence.

use std::fmt;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::errors::{ConflictKind, DomainError};

pub const PREFIX: &str = "ZEN";
pub const MAX_DAILY_SEQUENCE: u64 = 99_999;
const STAMP_LEN: usize = 10;
const SEQ_LEN: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CustomerId(String);

impl CustomerId {
    /// Build the id for `seq` allocated at `now`. Sequences start at 1.
    pub fn allocate(now: OffsetDateTime, seq: u64) -> Result<Self, DomainError> {
        if seq == 0 || seq > MAX_DAILY_SEQUENCE {
            return Err(DomainError::conflict(
                ConflictKind::CustomerId,
                format!("daily customer id sequence out of range: {seq}"),
            ));
        }
        let now = now.to_offset(time::UtcOffset::UTC);
        Ok(Self(format!(
            "{PREFIX}{}{:02}{:02}{seq:05}",
            day_key(now),
            now.hour(),
            now.minute()
        )))
    }

    /// Accept only well-formed ids; anything else is a validation error.
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        let digits = raw.strip_prefix(PREFIX);
        let ok = digits.is_some_and(|d| {
            d.len() == STAMP_LEN + SEQ_LEN && d.bytes().all(|b| b.is_ascii_digit())
        });
        if ok {
            Ok(Self(raw.to_string()))
        } else {
            Err(DomainError::validation(format!("malformed customer id '{raw}'")))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The `yyMMdd` part, shared by every id allocated that UTC day.
    #[cfg(test)]
    pub(crate) fn day(&self) -> &str {
        &self.0[PREFIX.len()..PREFIX.len() + 6]
    }

    #[cfg(test)]
    pub(crate) fn sequence(&self) -> u64 {
        self.0[PREFIX.len() + STAMP_LEN..].parse().unwrap_or(0)
    }
}

impl TryFrom<String> for CustomerId {
    type Error = DomainError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        Self::parse(&raw)
    }
}

impl From<CustomerId> for String {
    fn from(id: CustomerId) -> Self {
        id.0
    }
}

impl fmt::Display for CustomerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// `yyMMdd` for the UTC day containing `now`; the key of the daily sequence.
pub fn day_key(now: OffsetDateTime) -> String {
    let now = now.to_offset(time::UtcOffset::UTC);
    format!(
        "{:02}{:02}{:02}",
        now.year().rem_euclid(100),
        u8::from(now.month()),
        now.day()
    )
}
