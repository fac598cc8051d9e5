use serde::{Deserialize, Serialize};

use super::PersonId;

/// userAccountControl: ACCOUNTDISABLE
pub const UAC_ACCOUNT_DISABLE: u32 = 0x0002;
/// userAccountControl: NORMAL_ACCOUNT
pub const UAC_NORMAL_ACCOUNT: u32 = 0x0200;

/// 目录服务中的用户条目
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DirectoryUser {
    pub dn: String,
    pub cn: String,
    pub sam_account_name: Option<String>,
    pub employee_id: Option<PersonId>,
    pub mail: Option<String>,
    pub user_principal_name: Option<String>,
    pub given_name: Option<String>,
    pub surname: Option<String>,
    pub title: Option<String>,
    pub office: Option<String>,
    pub description: Option<String>,
    pub user_account_control: u32,
    /// pwdLastSet，0 表示下次登录必须修改密码
    pub pwd_last_set: Option<i64>,
}

impl DirectoryUser {
    pub fn is_disabled(&self) -> bool {
        self.user_account_control & UAC_ACCOUNT_DISABLE != 0
    }

    pub fn must_change_password(&self) -> bool {
        self.pwd_last_set == Some(0)
    }

    pub fn username(&self) -> &str {
        self.sam_account_name.as_deref().unwrap_or_default()
    }
}

/// 可增量同步的用户属性
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UserField {
    Mail,
    UserPrincipalName,
    GivenName,
    Surname,
    Title,
    Office,
    Description,
}

impl UserField {
    /// 对应的 LDAP 属性名
    pub fn ldap_name(&self) -> &'static str {
        match self {
            UserField::Mail => "mail",
            UserField::UserPrincipalName => "userPrincipalName",
            UserField::GivenName => "givenName",
            UserField::Surname => "sn",
            UserField::Title => "title",
            UserField::Office => "physicalDeliveryOfficeName",
            UserField::Description => "description",
        }
    }
}

/// 期望的用户属性，由数据源推导
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAttributes {
    pub mail: String,
    /// 仅在以邮箱作为 UPN 时设置
    pub user_principal_name: Option<String>,
    pub given_name: String,
    pub surname: String,
    pub title: String,
    pub office: String,
    pub description: String,
}

impl UserAttributes {
    /// 与现有条目比较，只返回发生变化的字段
    pub fn diff(&self, user: &DirectoryUser) -> UserDelta {
        let mut delta = UserDelta::default();
        delta.push_if_changed(UserField::Mail, &self.mail, user.mail.as_deref());
        if let Some(upn) = &self.user_principal_name {
            delta.push_if_changed(
                UserField::UserPrincipalName,
                upn,
                user.user_principal_name.as_deref(),
            );
        }
        delta.push_if_changed(UserField::GivenName, &self.given_name, user.given_name.as_deref());
        delta.push_if_changed(UserField::Surname, &self.surname, user.surname.as_deref());
        delta.push_if_changed(UserField::Title, &self.title, user.title.as_deref());
        delta.push_if_changed(UserField::Office, &self.office, user.office.as_deref());
        delta.push_if_changed(
            UserField::Description,
            &self.description,
            user.description.as_deref(),
        );
        delta
    }
}

/// 待更新的属性集合
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UserDelta {
    pub changes: Vec<(UserField, String)>,
}

impl UserDelta {
    /// 空字符串与属性缺失视为相同
    fn push_if_changed(&mut self, field: UserField, desired: &str, current: Option<&str>) {
        if current.unwrap_or_default() != desired {
            self.changes.push((field, desired.to_string()));
        }
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn get(&self, field: UserField) -> Option<&str> {
        self.changes
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, value)| value.as_str())
    }
}

/// 新建用户所需的全部信息
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewDirectoryUser {
    pub container_dn: String,
    pub employee_id: PersonId,
    pub username: String,
    pub initial_password: String,
    pub attributes: UserAttributes,
}

impl NewDirectoryUser {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.attributes.given_name, self.attributes.surname)
    }
}
