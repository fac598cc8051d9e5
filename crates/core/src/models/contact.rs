use serde::{Deserialize, Serialize};

use super::{AddressId, PersonId};

/// 联系方式的媒介类型
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContactMedium {
    Email,
    Telephone,
    Mobile,
    Fax,
    #[serde(other)]
    Other,
}

/// 联系方式记录，挂在人员或地址下
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactInformation {
    pub id: i64,
    /// 同类记录的优先级，数值越小越优先
    #[serde(default)]
    pub order: i32,
    pub medium: ContactMedium,
    /// 例如 "work"、"private"
    #[serde(rename = "type", default)]
    pub kind: String,
    pub content: String,
    #[serde(default)]
    pub secret: bool,
    #[serde(default)]
    pub person_id: Option<PersonId>,
    #[serde(default)]
    pub address_id: Option<AddressId>,
}

impl ContactInformation {
    pub fn is_phone(&self) -> bool {
        matches!(self.medium, ContactMedium::Telephone | ContactMedium::Mobile)
    }
}
