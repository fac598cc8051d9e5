use chrono::{DateTime, Utc};
use syncer_core::{MembershipRecord, PersonId};

/// 人员在 `now` 时刻的有效成员关系（按列表顺序取第一条）
pub fn active_membership(
    memberships: &[MembershipRecord],
    person_id: PersonId,
    now: DateTime<Utc>,
) -> Option<&MembershipRecord> {
    memberships
        .iter()
        .find(|membership| membership.person_id == person_id && membership.is_active_at(now))
}

/// 人员是否至少有一条在 `[entry, exit)` 内的成员关系
///
/// 列表中没有该人员时视为无效。
pub fn is_active(memberships: &[MembershipRecord], person_id: PersonId, now: DateTime<Utc>) -> bool {
    active_membership(memberships, person_id, now).is_some()
}
