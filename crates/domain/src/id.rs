//! Domain identifiers and the normalized form callers use to reference them.

use std::fmt;
use std::str::FromStr;

/// Canonical 128-bit identifier of a hypervisor domain.
///
/// Displays in the hyphenated UUID form
/// (`aabbccdd-0011-2233-4455-66778899aabb`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DomainUuid(uuid::Uuid);

impl DomainUuid {
    /// Wrap the 16 raw bytes sent over the wire by the hypervisor.
    #[must_use]
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(uuid::Uuid::from_bytes(bytes))
    }

    /// Wrap an existing UUID.
    #[must_use]
    pub fn from_uuid(uuid: uuid::Uuid) -> Self {
        Self(uuid)
    }

    /// Raw big-endian bytes, as encoded on the wire.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }

    /// Render as 32 lowercase hexadecimal digits, without hyphens.
    #[must_use]
    pub fn to_hex(self) -> String {
        self.0.simple().to_string()
    }
}

impl fmt::Display for DomainUuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.hyphenated().fmt(f)
    }
}

impl FromStr for DomainUuid {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        uuid::Uuid::parse_str(s).map(Self)
    }
}

/// A caller-supplied identifier, normalized for comparison.
///
/// Hyphens are stripped and hexadecimal digits lowercased, so
/// `AABBCCDD-0011-...` and `aabbccdd0011...` address the same domain.
/// Nothing else is validated: a malformed query simply matches nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentifierQuery(String);

impl IdentifierQuery {
    /// Normalize a raw identifier taken from a request path.
    #[must_use]
    pub fn new(raw: &str) -> Self {
        Self(
            raw.chars()
                .filter(|c| *c != '-')
                .map(|c| c.to_ascii_lowercase())
                .collect(),
        )
    }

    /// The normalized digits.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether `uuid` is the domain this query refers to.
    #[must_use]
    pub fn matches(&self, uuid: DomainUuid) -> bool {
        uuid.to_hex() == self.0
    }
}
