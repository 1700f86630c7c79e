//! Group data model and its validated value objects.

use std::collections::BTreeSet;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::DomainError;
use crate::id::GroupId;
use crate::permission::PermissionString;

/// Name of the distinguished fallback group.
///
/// The default group is created at bootstrap if absent and can never be
/// deleted or renamed through ordinary mutation paths.
pub const DEFAULT_GROUP_NAME: &str = "default";

const MAX_NAME_CHARS: usize = 14;
const MAX_PREFIX_CHARS: usize = 16;
const MAX_PRIORITY: u8 = 99;

/// Unique group name, at most 14 characters, no embedded whitespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct GroupName(String);

impl GroupName {
    pub fn new(raw: impl AsRef<str>) -> Result<Self, DomainError> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            return Err(DomainError::validation("group name must not be empty"));
        }
        if trimmed.chars().count() > MAX_NAME_CHARS {
            return Err(DomainError::validation(format!(
                "group name must be at most {MAX_NAME_CHARS} characters"
            )));
        }
        if trimmed.chars().any(char::is_whitespace) {
            return Err(DomainError::validation(
                "group name must not contain whitespace",
            ));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_default(&self) -> bool {
        self.0 == DEFAULT_GROUP_NAME
    }

    /// The default group's name. Infallible by construction.
    pub fn default_group() -> Self {
        Self(DEFAULT_GROUP_NAME.to_string())
    }
}

impl core::fmt::Display for GroupName {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl core::str::FromStr for GroupName {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl<'de> Deserialize<'de> for GroupName {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        GroupName::new(&raw).map_err(serde::de::Error::custom)
    }
}

/// Display prefix shown in front of a member's name, at most 16 characters.
/// May contain color-escape markers (e.g. `"&6"`); rendering is a collaborator
/// concern.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct GroupPrefix(String);

impl GroupPrefix {
    pub fn new(raw: impl Into<String>) -> Result<Self, DomainError> {
        let value = raw.into();
        if value.chars().count() > MAX_PREFIX_CHARS {
            return Err(DomainError::validation(format!(
                "group prefix must be at most {MAX_PREFIX_CHARS} characters"
            )));
        }
        Ok(Self(value))
    }

    pub fn empty() -> Self {
        Self(String::new())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for GroupPrefix {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for GroupPrefix {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        GroupPrefix::new(raw).map_err(serde::de::Error::custom)
    }
}

/// Sort priority in `0..=99`; lower sorts (and displays) first. Exact
/// ordering semantics are owned by rendering collaborators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct GroupPriority(u8);

impl GroupPriority {
    pub fn new(value: u8) -> Result<Self, DomainError> {
        if value > MAX_PRIORITY {
            return Err(DomainError::validation(format!(
                "group priority must be in 0..={MAX_PRIORITY}"
            )));
        }
        Ok(Self(value))
    }

    pub fn value(&self) -> u8 {
        self.0
    }
}

impl Default for GroupPriority {
    /// New groups sort last until an operator assigns a priority.
    fn default() -> Self {
        Self(MAX_PRIORITY)
    }
}

impl core::fmt::Display for GroupPriority {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl<'de> Deserialize<'de> for GroupPriority {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = u8::deserialize(deserializer)?;
        GroupPriority::new(raw).map_err(serde::de::Error::custom)
    }
}

/// A named bundle of permissions with a priority and display prefix.
///
/// The permission set is flattened: it is exactly what the resolver consults,
/// with nothing unioned in at query time. Any inheritance a deployment wants
/// is applied by the mutation path that populates the set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    pub name: GroupName,
    pub priority: GroupPriority,
    pub prefix: GroupPrefix,
    pub permissions: BTreeSet<PermissionString>,
}

impl Group {
    /// Create a group with default priority, empty prefix, and no permissions.
    pub fn new(id: GroupId, name: GroupName) -> Self {
        Self {
            id,
            name,
            priority: GroupPriority::default(),
            prefix: GroupPrefix::empty(),
            permissions: BTreeSet::new(),
        }
    }

    pub fn is_default(&self) -> bool {
        self.name.is_default()
    }

    pub fn has_permission(&self, permission: &PermissionString) -> bool {
        self.permissions.contains(permission)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_length_limit_enforced() {
        assert!(GroupName::new("exactlyfourteen").is_err()); // 15 chars
        assert!(GroupName::new("fourteencharsx").is_ok()); // 14 chars
    }

    #[test]
    fn name_rejects_empty_and_whitespace() {
        assert!(GroupName::new("").is_err());
        assert!(GroupName::new("  ").is_err());
        assert!(GroupName::new("two words").is_err());
    }

    #[test]
    fn default_group_name_is_recognized() {
        assert!(GroupName::new("default").unwrap().is_default());
        assert!(!GroupName::new("vip").unwrap().is_default());
        assert!(GroupName::default_group().is_default());
    }

    #[test]
    fn prefix_length_limit_enforced() {
        assert!(GroupPrefix::new("&6[Administrator]").is_err()); // 17 chars
        assert!(GroupPrefix::new("&6[Admin]").is_ok());
        assert!(GroupPrefix::new("").is_ok());
    }

    #[test]
    fn priority_range_enforced() {
        assert!(GroupPriority::new(0).is_ok());
        assert!(GroupPriority::new(99).is_ok());
        assert!(GroupPriority::new(100).is_err());
        assert_eq!(GroupPriority::default().value(), 99);
    }

    #[test]
    fn lower_priority_sorts_first() {
        let admin = GroupPriority::new(0).unwrap();
        let member = GroupPriority::new(50).unwrap();
        assert!(admin < member);
    }

    #[test]
    fn new_group_is_empty() {
        let g = Group::new(GroupId::new(), GroupName::new("vip").unwrap());
        assert!(g.permissions.is_empty());
        assert_eq!(g.prefix.as_str(), "");
        assert_eq!(g.priority.value(), 99);
    }
}
