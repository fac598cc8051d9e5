use syncer_core::{ContactInformation, ContactMedium};
use tracing::debug;

/// 只保留 ASCII 数字和 `.`
pub fn normalize_phone_number(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect()
}

/// 选取指定媒介（及类型）中 `order` 最小且未标记保密的记录
///
/// `order` 相同时取列表中靠前的一条。
pub fn select_contact<'a>(
    infos: &'a [ContactInformation],
    medium: ContactMedium,
    kind: Option<&str>,
) -> Option<&'a ContactInformation> {
    infos
        .iter()
        .filter(|info| info.medium == medium && !info.secret)
        .filter(|info| kind.map_or(true, |kind| info.kind == kind))
        .min_by_key(|info| info.order)
}

/// 地址上的座机号码，作为家庭电话
pub fn home_phone(address_infos: &[ContactInformation]) -> Option<String> {
    select_contact(address_infos, ContactMedium::Telephone, None)
        .map(|info| normalize_phone_number(&info.content))
        .filter(|number| !number.is_empty())
}

/// 人员名下的座机和手机号码，按 `order` 排序
pub fn personal_phone_numbers(person_infos: &[ContactInformation]) -> Vec<String> {
    let mut phones: Vec<&ContactInformation> = person_infos
        .iter()
        .filter(|info| info.is_phone() && !info.secret)
        .collect();
    phones.sort_by_key(|info| info.order);

    phones
        .into_iter()
        .map(|info| normalize_phone_number(&info.content))
        .filter(|number| !number.is_empty())
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PhoneNumbers {
    pub home: Option<String>,
    pub personal: Vec<String>,
}

impl PhoneNumbers {
    pub fn has_personal(&self) -> bool {
        !self.personal.is_empty()
    }
}

/// 家庭电话优先；个人号码中与之相同的第一条会被移除，且只移除一次
pub fn resolve_phone_numbers(
    address_infos: &[ContactInformation],
    person_infos: &[ContactInformation],
) -> PhoneNumbers {
    let home = home_phone(address_infos);
    let mut personal = personal_phone_numbers(person_infos);

    if let Some(home) = &home {
        if let Some(position) = personal.iter().position(|number| number == home) {
            debug!("忽略与家庭电话重复的个人号码 {}", home);
            personal.remove(position);
        }
    }

    PhoneNumbers { home, personal }
}
