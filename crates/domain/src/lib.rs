//! 同步任务共用的领域规则
//!
//! - [`selector`]：把人员范围声明展开为带来源的人员集合
//! - [`membership`]：成员关系有效期判断
//! - [`contact_fields`]：联系方式选择与电话号码规范化
//! - [`deviation`]：单次运行的偏差记录
//! - [`integrity`]：人员数据的格式检查

pub mod contact_fields;
pub mod deviation;
pub mod integrity;
pub mod membership;
pub mod selector;

pub use contact_fields::{
    home_phone, normalize_phone_number, personal_phone_numbers, resolve_phone_numbers,
    select_contact, PhoneNumbers,
};
pub use deviation::{render_report, DeviationLog};
pub use integrity::{contains_whitespace, has_surrounding_whitespace, is_valid_email};
pub use membership::{active_membership, is_active};
pub use selector::{accumulate, Population, PopulationRule, RuleId, RuleSource, Selector};
