//! Time-scoped tribe membership.
//!
//! A character's affiliation at time `T` is the membership with
//! `joined_at <= T` and `left_at` either open or strictly after `T`.
//! The store is expected to hold at most one such row per character.

/// One membership interval of a character in a tribe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Membership {
    pub tribe_name: String,
    pub joined_at: i64,
    pub left_at: Option<i64>,
}

impl Membership {
    pub fn new(tribe_name: impl Into<String>, joined_at: i64, left_at: Option<i64>) -> Self {
        Self {
            tribe_name: tribe_name.into(),
            joined_at,
            left_at,
        }
    }

    /// Whether the membership was valid at `at`.
    pub fn is_active_at(&self, at: i64) -> bool {
        self.joined_at <= at && self.left_at.map_or(true, |left| left > at)
    }
}

/// The membership valid at `at`, if any.
///
/// Overlapping rows break the store invariant; the latest join wins so the
/// answer stays deterministic.
pub fn affiliation_at(memberships: &[Membership], at: i64) -> Option<&Membership> {
    memberships
        .iter()
        .filter(|m| m.is_active_at(at))
        .max_by_key(|m| m.joined_at)
}
