//! 各类同步任务的专属配置
//!
//! 这些结构对应任务文档中除 `type`/`cron`/`runAtStartup`/`name` 以外的字段，
//! 由对应任务的工厂函数解析。

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::validation::{ConfigValidator, ValidationUtils};
use crate::ConfigError;

/// 邮件联系人组取用的邮箱类型
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmailType {
    #[default]
    Private,
    Work,
}

impl EmailType {
    /// 联系方式记录中的 `type` 值
    pub fn as_str(&self) -> &'static str {
        match self {
            EmailType::Private => "private",
            EmailType::Work => "work",
        }
    }
}

/// 单条人员来源规则
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleEntry {
    pub id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_type: Option<EmailType>,
}

impl RuleEntry {
    pub fn new(id: i64) -> Self {
        Self {
            id,
            email_type: None,
        }
    }
}

/// 任务的人员范围声明，按 persons → groups → correspondenceGroups 的顺序展开
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PopulationRules {
    #[serde(default)]
    pub persons: Vec<RuleEntry>,
    #[serde(default)]
    pub groups: Vec<RuleEntry>,
    #[serde(default)]
    pub correspondence_groups: Vec<RuleEntry>,
}

impl PopulationRules {
    pub fn is_empty(&self) -> bool {
        self.persons.is_empty() && self.groups.is_empty() && self.correspondence_groups.is_empty()
    }

    fn entries(&self) -> impl Iterator<Item = &RuleEntry> {
        self.persons
            .iter()
            .chain(self.groups.iter())
            .chain(self.correspondence_groups.iter())
    }

    fn validate_ids(&self, context: &str) -> crate::ConfigResult<()> {
        if let Some(entry) = self.entries().find(|entry| entry.id <= 0) {
            return Err(ConfigError::Validation(format!(
                "{context} 中的ID必须为正数: {}",
                entry.id
            )));
        }
        Ok(())
    }
}

/// 目录服务用户映射
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserMapper {
    pub name: String,
    #[serde(flatten)]
    pub population: PopulationRules,
    /// 新用户所在的容器
    #[serde(rename = "targetDN", alias = "targetDn")]
    pub target_dn: String,
    #[serde(default)]
    pub target_groups: Vec<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub office: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectorySyncSettings {
    pub user_mappers: Vec<UserMapper>,
}

impl ConfigValidator for DirectorySyncSettings {
    fn validate(&self) -> crate::ConfigResult<()> {
        if self.user_mappers.is_empty() {
            return Err(ConfigError::Validation(
                "userMappers 不能为空".to_string(),
            ));
        }
        for mapper in &self.user_mappers {
            ValidationUtils::validate_not_empty(&mapper.name, "userMappers.name")?;
            ValidationUtils::validate_dn(&mapper.target_dn, "userMappers.targetDN")?;
            for group in &mapper.target_groups {
                ValidationUtils::validate_dn(group, "userMappers.targetGroups")?;
            }
            mapper.population.validate_ids(&mapper.name)?;
        }
        Ok(())
    }
}

/// 邮件联系人组
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactGroup {
    pub name: String,
    #[serde(flatten)]
    pub population: PopulationRules,
    /// 显示名 → 邮箱地址
    #[serde(default)]
    pub extra_addresses: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MailContactsSettings {
    pub groups: Vec<ContactGroup>,
}

impl ConfigValidator for MailContactsSettings {
    fn validate(&self) -> crate::ConfigResult<()> {
        if self.groups.is_empty() {
            return Err(ConfigError::Validation("groups 不能为空".to_string()));
        }
        for group in &self.groups {
            ValidationUtils::validate_not_empty(&group.name, "groups.name")?;
            group.population.validate_ids(&group.name)?;
            for (display_name, address) in &group.extra_addresses {
                ValidationUtils::validate_not_empty(display_name, "groups.extraAddresses")?;
                if !address.contains('@') {
                    return Err(ConfigError::Validation(format!(
                        "{} 的附加地址无效: {address}",
                        group.name
                    )));
                }
            }
        }
        Ok(())
    }
}

/// 电话通讯录同步
///
/// 未声明人员范围时同步数据源中的全部在籍人员。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhoneBookSettings {
    pub tag_alias: String,
    #[serde(flatten)]
    pub population: PopulationRules,
}

impl ConfigValidator for PhoneBookSettings {
    fn validate(&self) -> crate::ConfigResult<()> {
        ValidationUtils::validate_not_empty(&self.tag_alias, "tagAlias")?;
        self.population.validate_ids("phone book")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_mapper_from_json() {
        let json = r#"{
            "userMappers": [{
                "name": "Kollegium",
                "groups": [{ "id": 12 }],
                "persons": [{ "id": 7 }],
                "targetDN": "ou=Staff,dc=school,dc=example",
                "targetGroups": ["cn=Lehrer,ou=Groups,dc=school,dc=example"],
                "title": "Lehrer"
            }]
        }"#;

        let settings: DirectorySyncSettings = serde_json::from_str(json).unwrap();
        let mapper = &settings.user_mappers[0];
        assert_eq!(mapper.population.groups, vec![RuleEntry::new(12)]);
        assert_eq!(mapper.population.persons, vec![RuleEntry::new(7)]);
        assert!(mapper.population.correspondence_groups.is_empty());
        assert_eq!(mapper.office, "");
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_contact_group_email_type() {
        let json = r#"{
            "groups": [{
                "name": "Eltern 3. Klasse",
                "correspondenceGroups": [{ "id": 31, "emailType": "private" }],
                "groups": [{ "id": 30, "emailType": "work" }],
                "extraAddresses": { "Sekretariat": "office@school.example" }
            }]
        }"#;

        let settings: MailContactsSettings = serde_json::from_str(json).unwrap();
        let group = &settings.groups[0];
        assert_eq!(
            group.population.correspondence_groups[0].email_type,
            Some(EmailType::Private)
        );
        assert_eq!(group.population.groups[0].email_type, Some(EmailType::Work));
        assert_eq!(group.extra_addresses["Sekretariat"], "office@school.example");
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_invalid_settings_rejected() {
        let empty = DirectorySyncSettings {
            user_mappers: Vec::new(),
        };
        assert!(empty.validate().is_err());

        let bad_address: MailContactsSettings = serde_json::from_str(
            r#"{ "groups": [{ "name": "A", "extraAddresses": { "X": "nope" } }] }"#,
        )
        .unwrap();
        assert!(bad_address.validate().is_err());

        let bad_id: PhoneBookSettings =
            serde_json::from_str(r#"{ "tagAlias": "procurat", "persons": [{ "id": 0 }] }"#)
                .unwrap();
        assert!(bad_id.validate().is_err());
    }
}
