//! Six-digit numeric one-time codes.

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

pub const CODE_LEN: usize = 6;
const CODE_SPACE: u32 = 1_000_000;

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OneTimeCode(String);

impl OneTimeCode {
    /// Uniform over `000000..=999999`.
    pub fn generate() -> Self {
        Self::from_number(rand::rng().random_range(0..CODE_SPACE))
    }

    fn from_number(n: u32) -> Self {
        Self(format!("{n:0width$}", width = CODE_LEN))
    }

    /// Shape check only; says nothing about whether the code was issued.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        (raw.len() == CODE_LEN && raw.bytes().all(|b| b.is_ascii_digit()))
            .then(|| Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// Codes are credentials; keep them out of Debug output.
impl fmt::Debug for OneTimeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("OneTimeCode(******)")
    }
}
