use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{GroupId, PersonId};

/// 分组成员关系记录
///
/// 成员关系在 `[entry_date, exit_date)` 半开区间内有效，`exit_date` 为空表示长期有效。
/// `attributes` 保存数据源附带的自定义字段（例如用户名）。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MembershipRecord {
    pub id: i64,
    pub group_id: GroupId,
    pub person_id: PersonId,
    pub entry_date: DateTime<Utc>,
    pub exit_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub attributes: serde_json::Map<String, serde_json::Value>,
}

impl MembershipRecord {
    /// 判断成员关系在指定时刻是否有效
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.entry_date <= now && self.exit_date.map_or(true, |exit| now < exit)
    }

    /// 读取字符串类型的自定义字段
    pub fn attribute_str(&self, key: &str) -> Option<&str> {
        self.attributes
            .get(key)
            .and_then(|value| value.as_str())
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }
}
