//! Identities and amounts.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};

use crate::constants::UNIT;

/// Value in minimal units.
pub type Amount = u128;

/// Leaderboard slot id, also the id of the slot's ownership token.
pub type SlotId = usize;

/// 20-byte participant / instance identity.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Address([u8; 20]);

impl Address {
    pub const ZERO: Address = Address([0u8; 20]);

    pub const fn new(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }

    /// Deterministic identity: last 20 bytes of `sha256(domain || base || nonce_be)`.
    pub fn derive(domain: &str, base: &Address, nonce: u64) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(domain.as_bytes());
        hasher.update(base.0);
        hasher.update(nonce.to_be_bytes());
        let digest = hasher.finalize();
        let mut out = [0u8; 20];
        out.copy_from_slice(&digest[12..32]);
        Self(out)
    }

    /// Identity for a human-readable label (tests, demo sessions).
    pub fn from_label(label: &str) -> Self {
        Self::derive(label, &Address::ZERO, 0)
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_hex())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid address: {0}")]
pub struct ParseAddressError(pub String);

impl FromStr for Address {
    type Err = ParseAddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(raw).map_err(|e| ParseAddressError(format!("{}: {}", s, e)))?;
        if bytes.len() != 20 {
            return Err(ParseAddressError(format!("{}: expected 20 bytes", s)));
        }
        let mut out = [0u8; 20];
        out.copy_from_slice(&bytes);
        Ok(Self(out))
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Whole units to minimal units, saturating.
pub fn units(whole: u128) -> Amount {
    whole.saturating_mul(UNIT)
}

/// Thousandths of a unit to minimal units, saturating.
pub fn milli(thousandths: u128) -> Amount {
    thousandths.saturating_mul(UNIT / 1_000)
}

/// Parse a decimal amount such as `"0.99"` or `"12"` into minimal units.
pub fn parse_units(s: &str) -> Option<Amount> {
    let s = s.trim();
    let (whole, frac) = match s.split_once('.') {
        Some((w, f)) => (w, f),
        None => (s, ""),
    };
    if whole.is_empty() && frac.is_empty() {
        return None;
    }
    if frac.len() > 18 || !frac.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let whole: u128 = if whole.is_empty() { 0 } else { whole.parse().ok()? };
    let mut frac_units: u128 = 0;
    if !frac.is_empty() {
        let padded = format!("{:0<18}", frac);
        frac_units = padded.parse().ok()?;
    }
    whole.checked_mul(UNIT)?.checked_add(frac_units)
}

/// Serde adapter: u128 amounts travel as decimal strings.
///
/// JSON numbers are not safe past `u64::MAX`; balances routinely exceed it.
pub mod amount_str {
    use super::Amount;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Amount, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Str(String),
        Num(u64),
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Amount, D::Error> {
        match Raw::deserialize(deserializer)? {
            Raw::Num(n) => Ok(n as Amount),
            Raw::Str(s) => s
                .trim()
                .parse::<Amount>()
                .map_err(|e| serde::de::Error::custom(format!("amount {:?}: {}", s, e))),
        }
    }
}
