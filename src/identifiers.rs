//! Identifier types and validated value objects for the review domain

use crate::errors::{DomainError, DomainResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Review request ID - identifies one request to review a preprint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Create a new random request ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create from a UUID
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Get the underlying UUID
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<RequestId> for Uuid {
    fn from(id: RequestId) -> Self {
        id.0
    }
}

impl From<&RequestId> for Uuid {
    fn from(id: &RequestId) -> Self {
        id.0
    }
}

/// Review ID - identifies one review of a preprint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct ReviewId(Uuid);

impl ReviewId {
    /// Create a new random review ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create from a UUID
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Get the underlying UUID
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ReviewId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ReviewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<ReviewId> for Uuid {
    fn from(id: ReviewId) -> Self {
        id.0
    }
}

impl From<&ReviewId> for Uuid {
    fn from(id: &ReviewId) -> Self {
        id.0
    }
}

/// A digital object identifier, for preprints under review and for
/// published reviews
///
/// DOIs are case-insensitive; values are normalized to lowercase on parse
/// so that two renderings of the same DOI compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct Doi(String);

impl Doi {
    /// Parse and validate a DOI in the `10.<registrant>/<suffix>` shape
    pub fn parse(value: &str) -> DomainResult<Self> {
        let invalid = || DomainError::InvalidIdentifier {
            kind: "DOI".to_string(),
            value: value.to_string(),
        };

        let rest = value.strip_prefix("10.").ok_or_else(invalid)?;
        let (registrant, suffix) = rest.split_once('/').ok_or_else(invalid)?;

        if registrant.len() < 4 || !registrant.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        if suffix.is_empty() {
            return Err(invalid());
        }

        Ok(Self(value.to_lowercase()))
    }

    /// Get the DOI as a string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Doi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// ORCID iD of a researcher
///
/// Sixteen digits in four hyphenated groups; the last character is the
/// ISO 7064 11-2 checksum and may be `X`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct OrcidId(String);

impl OrcidId {
    /// Parse and validate an ORCID iD, including its checksum
    pub fn parse(value: &str) -> DomainResult<Self> {
        let invalid = || DomainError::InvalidIdentifier {
            kind: "ORCID iD".to_string(),
            value: value.to_string(),
        };

        let groups: Vec<&str> = value.split('-').collect();
        if groups.len() != 4 || groups.iter().any(|g| g.len() != 4) {
            return Err(invalid());
        }

        let chars: Vec<char> = groups.concat().chars().collect();
        let (base, check) = chars.split_at(15);

        let mut digits = Vec::with_capacity(15);
        for c in base {
            digits.push(c.to_digit(10).ok_or_else(invalid)?);
        }

        let expected = Self::checksum(&digits);
        match check {
            [c] if *c == expected => Ok(Self(value.to_string())),
            _ => Err(invalid()),
        }
    }

    /// Get the ORCID iD as a string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    // ISO 7064 11-2 check character over the first fifteen digits
    fn checksum(digits: &[u32]) -> char {
        let mut total = 0u32;
        for d in digits {
            total = (total + d) * 2;
        }
        match (12 - total % 11) % 11 {
            10 => 'X',
            n => char::from_digit(n, 10).unwrap_or('0'),
        }
    }
}

impl fmt::Display for OrcidId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
