//! Permission string value object.

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::DomainError;

/// A permission token, e.g. `"chat.color"` or `"*"`.
///
/// Permissions are case-insensitive by value: the constructor normalizes to
/// ASCII lowercase, so uniqueness in sets and equality checks need no further
/// folding. Dot-delimited segments support trailing-wildcard matching
/// (`"a.b.*"`), which is the resolver's concern, not this type's.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct PermissionString(String);

impl PermissionString {
    /// Validate and normalize a raw permission token.
    ///
    /// Rejects empty/blank input; never clamps.
    pub fn new(raw: impl AsRef<str>) -> Result<Self, DomainError> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            return Err(DomainError::validation("permission must not be empty"));
        }
        Ok(Self(trimmed.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_wildcard(&self) -> bool {
        self.0 == "*"
    }
}

impl core::fmt::Display for PermissionString {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl core::str::FromStr for PermissionString {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

// Deserialization routes through the validating constructor so no unchecked
// value can enter the domain from a config file or wire payload.
impl<'de> Deserialize<'de> for PermissionString {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        PermissionString::new(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_to_lowercase() {
        let p = PermissionString::new("Chat.COLOR").unwrap();
        assert_eq!(p.as_str(), "chat.color");
    }

    #[test]
    fn trims_surrounding_whitespace() {
        let p = PermissionString::new("  fly.use ").unwrap();
        assert_eq!(p.as_str(), "fly.use");
    }

    #[test]
    fn rejects_empty_and_blank() {
        assert!(PermissionString::new("").is_err());
        assert!(PermissionString::new("   ").is_err());
    }

    #[test]
    fn wildcard_detection() {
        assert!(PermissionString::new("*").unwrap().is_wildcard());
        assert!(!PermissionString::new("a.*").unwrap().is_wildcard());
    }

    #[test]
    fn case_insensitive_uniqueness_in_sets() {
        let mut set = std::collections::BTreeSet::new();
        set.insert(PermissionString::new("Fly.Use").unwrap());
        set.insert(PermissionString::new("fly.use").unwrap());
        assert_eq!(set.len(), 1);
    }
}
