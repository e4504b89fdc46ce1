use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Widest code the request models accept.
pub const MAX_CODE_DIGITS: usize = 16;

/// Fixed-width decimal code, zero padded. Two codes are equal only when
/// their rendered digits are, so `007` and `07` never match.
///
/// Digits come from a non-cryptographic draw; this is a human-typed
/// one-time code, not a secret token.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct VerificationCode(String);

impl VerificationCode {
    pub fn generate(width: usize) -> Self {
        let mut rng = rand::thread_rng();
        let digits = (0..width).map(|_| char::from(b'0' + rng.gen_range(0..10u8))).collect();
        VerificationCode(digits)
    }

    /// Renders `value` at `width`. `None` when it needs more digits.
    #[cfg(test)]
    pub fn from_value(value: u64, width: usize) -> Option<Self> {
        let digits = format!("{value:0width$}");
        (digits.len() == width).then_some(VerificationCode(digits))
    }

    pub fn parse(input: &str, width: usize) -> Option<Self> {
        let input = input.trim();
        if input.len() != width || !input.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        Some(VerificationCode(input.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VerificationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
