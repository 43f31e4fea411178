//! Storage operator (miner actor) identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::TerminatorError;

/// Validated actor address such as `f01234`.
///
/// Accepts mainnet (`f`) and testnet (`t`) prefixes with protocols 0-4.
/// No ownership or authority checks are made; the chain lookup decides
/// whether the actor actually exists.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OperatorId(String);

impl OperatorId {
    pub fn parse(raw: &str) -> Result<Self, TerminatorError> {
        let raw = raw.trim();
        let mut chars = raw.chars();

        match chars.next() {
            Some('f') | Some('t') => {}
            _ => return Err(invalid(raw, "network prefix must be 'f' or 't'")),
        }

        let protocol = chars
            .next()
            .and_then(|c| c.to_digit(10))
            .filter(|p| *p <= 4)
            .ok_or_else(|| invalid(raw, "unknown address protocol"))?;

        let payload = chars.as_str();
        if payload.is_empty() {
            return Err(invalid(raw, "empty payload"));
        }
        if protocol == 0 && !payload.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid(raw, "ID address payload must be numeric"));
        }
        if protocol != 0 && !payload.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(invalid(raw, "payload must be base32"));
        }

        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// ID-form address (`f0…` / `t0…`)
    pub fn is_id_address(&self) -> bool {
        self.0.as_bytes().get(1) == Some(&b'0')
    }
}

fn invalid(raw: &str, reason: &str) -> TerminatorError {
    TerminatorError::invalid_input(format!("invalid miner address {:?}: {}", raw, reason))
}

impl fmt::Display for OperatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for OperatorId {
    type Err = TerminatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for OperatorId {
    type Error = TerminatorError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<OperatorId> for String {
    fn from(id: OperatorId) -> Self {
        id.0
    }
}
