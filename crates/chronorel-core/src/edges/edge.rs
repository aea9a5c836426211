//! Membership edge row type.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::EntityId;

/// One continuous membership interval linking an owner to a member.
///
/// Interval semantics are closed-open: the member is covered at `time_from`
/// and no longer covered at `time_to`. A `None` `time_from` means "member
/// since before recorded history"; a `None` `time_to` means the edge is open
/// and the member is current.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipEdge {
    /// Owning entity identifier.
    pub owner_id: EntityId,
    /// Association field name on the owner.
    pub field_name: String,
    /// Member entity identifier.
    pub member_id: EntityId,
    /// Start of the interval; `None` = before recorded history.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_from: Option<DateTime<Utc>>,
    /// End of the interval; `None` = still a member.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_to: Option<DateTime<Utc>>,
}

impl MembershipEdge {
    /// Whether the edge represents current membership.
    pub fn is_open(&self) -> bool {
        self.time_to.is_none()
    }

    /// Whether the interval covers instant `t` under `[time_from, time_to)`
    /// semantics.
    pub fn covers(&self, t: DateTime<Utc>) -> bool {
        let after_start = match self.time_from {
            Some(from) => from <= t,
            None => true,
        };
        let before_end = match self.time_to {
            Some(to) => to > t,
            None => true,
        };
        after_start && before_end
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn edge(from: Option<DateTime<Utc>>, to: Option<DateTime<Utc>>) -> MembershipEdge {
        MembershipEdge {
            owner_id: 1,
            field_name: "members".to_string(),
            member_id: 2,
            time_from: from,
            time_to: to,
        }
    }

    #[test]
    fn test_open_edge_covers_everything_after_start() {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let e = edge(Some(t0), None);
        assert!(e.is_open());
        assert!(e.covers(t0));
        assert!(e.covers(t0 + chrono::Duration::days(365)));
        assert!(!e.covers(t0 - chrono::Duration::microseconds(1)));
    }

    #[test]
    fn test_closed_open_boundary() {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let t1 = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();
        let e = edge(Some(t0), Some(t1));
        // covered at its own start instant, not at its end instant
        assert!(e.covers(t0));
        assert!(!e.covers(t1));
    }

    #[test]
    fn test_edge_since_before_history() {
        let t1 = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();
        let e = edge(None, Some(t1));
        assert!(e.covers(t1 - chrono::Duration::days(10000)));
        assert!(!e.covers(t1));
    }
}
