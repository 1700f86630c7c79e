//! Principal data model and membership expiry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::DomainError;
use crate::id::{GroupId, PrincipalId};

/// Wire value meaning "membership never expires".
pub const PERMANENT_WIRE_VALUE: i64 = -1;

/// When a principal's group membership lapses.
///
/// Interoperates with the store as a single signed epoch-millisecond column:
/// any value `<= 0` means permanent, a positive value is an absolute
/// deadline. Once the deadline passes, the membership reverts to the default
/// group; the expiry monitor is the mechanism that applies the transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MembershipExpiry {
    Permanent,
    Until(DateTime<Utc>),
}

impl MembershipExpiry {
    /// Convert from the wire representation.
    ///
    /// Values `<= 0` are permanent. Positive values must be representable
    /// timestamps; out-of-range input is rejected, not clamped.
    pub fn from_epoch_millis(millis: i64) -> Result<Self, DomainError> {
        if millis <= 0 {
            return Ok(Self::Permanent);
        }
        DateTime::from_timestamp_millis(millis)
            .map(Self::Until)
            .ok_or_else(|| {
                DomainError::validation(format!("membership deadline out of range: {millis}"))
            })
    }

    pub fn as_epoch_millis(&self) -> i64 {
        match self {
            Self::Permanent => PERMANENT_WIRE_VALUE,
            Self::Until(deadline) => deadline.timestamp_millis(),
        }
    }

    /// Whether the membership has lapsed as of `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self {
            Self::Permanent => false,
            Self::Until(deadline) => now >= *deadline,
        }
    }

    pub fn is_permanent(&self) -> bool {
        matches!(self, Self::Permanent)
    }
}

impl Default for MembershipExpiry {
    fn default() -> Self {
        Self::Permanent
    }
}

impl Serialize for MembershipExpiry {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_i64(self.as_epoch_millis())
    }
}

impl<'de> Deserialize<'de> for MembershipExpiry {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = i64::deserialize(deserializer)?;
        MembershipExpiry::from_epoch_millis(millis).map_err(serde::de::Error::custom)
    }
}

/// The identity permission checks are evaluated against.
///
/// A principal always references exactly one group; absent an explicit
/// assignment it belongs to the default group, permanently.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: PrincipalId,
    pub name: String,
    pub group_id: GroupId,
    pub expiry: MembershipExpiry,
}

impl Principal {
    pub fn new(id: PrincipalId, name: impl Into<String>, group_id: GroupId) -> Self {
        Self {
            id,
            name: name.into(),
            group_id,
            expiry: MembershipExpiry::Permanent,
        }
    }

    pub fn is_membership_expired(&self, now: DateTime<Utc>) -> bool {
        self.expiry.is_expired(now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn negative_and_zero_millis_are_permanent() {
        assert_eq!(
            MembershipExpiry::from_epoch_millis(-1).unwrap(),
            MembershipExpiry::Permanent
        );
        assert_eq!(
            MembershipExpiry::from_epoch_millis(0).unwrap(),
            MembershipExpiry::Permanent
        );
    }

    #[test]
    fn wire_round_trip() {
        let now = Utc::now();
        let expiry = MembershipExpiry::Until(
            DateTime::from_timestamp_millis(now.timestamp_millis()).unwrap(),
        );
        let restored = MembershipExpiry::from_epoch_millis(expiry.as_epoch_millis()).unwrap();
        assert_eq!(restored, expiry);

        assert_eq!(MembershipExpiry::Permanent.as_epoch_millis(), -1);
    }

    #[test]
    fn permanent_never_expires() {
        assert!(!MembershipExpiry::Permanent.is_expired(Utc::now()));
    }

    #[test]
    fn deadline_in_past_is_expired() {
        let now = Utc::now();
        let expiry = MembershipExpiry::Until(now - Duration::milliseconds(1));
        assert!(expiry.is_expired(now));
    }

    #[test]
    fn deadline_boundary_counts_as_expired() {
        let now = Utc::now();
        assert!(MembershipExpiry::Until(now).is_expired(now));
    }

    #[test]
    fn future_deadline_not_expired() {
        let now = Utc::now();
        let expiry = MembershipExpiry::Until(now + Duration::minutes(5));
        assert!(!expiry.is_expired(now));
    }
}
