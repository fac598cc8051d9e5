use serde::{Deserialize, Serialize};

/// 电话系统中的联系人标签，用于标记由同步任务管理的联系人
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactTag {
    pub id: String,
    pub alias: String,
}

/// 待写入电话系统的联系人
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhoneBookContact {
    pub first_name: String,
    pub last_name: String,
    pub home_phone: Option<String>,
    pub phone_numbers: Vec<String>,
}
