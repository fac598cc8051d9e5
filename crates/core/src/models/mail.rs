use serde::{Deserialize, Serialize};

use super::PersonId;

/// 待写入邮件系统联系人文件夹的联系人
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailContact {
    pub person_id: PersonId,
    pub given_name: String,
    pub surname: String,
    pub display_name: String,
    pub private_email: Option<String>,
    pub work_email: Option<String>,
    pub home_phone: Option<String>,
    pub mobile_phone: Option<String>,
    pub street: Option<String>,
    pub zip: Option<String>,
    pub city: Option<String>,
}

/// 联系人组中的一个地址
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MailGroupMember {
    pub display_name: String,
    pub address: String,
}
