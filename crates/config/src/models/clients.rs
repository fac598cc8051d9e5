use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::validation::{ConfigValidator, ValidationUtils};

/// 学校管理系统 REST 接口
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcuratConfig {
    pub url: String,
    pub api_key: String,
    pub root_group_id: i64,
    #[serde(default = "default_procurat_timeout_seconds")]
    pub request_timeout_seconds: u64,
}

fn default_procurat_timeout_seconds() -> u64 {
    300
}

impl ConfigValidator for ProcuratConfig {
    fn validate(&self) -> crate::ConfigResult<()> {
        ValidationUtils::validate_url(&self.url, "procurat.url")?;
        ValidationUtils::validate_not_empty(&self.api_key, "procurat.api_key")?;
        ValidationUtils::validate_timeout_seconds(
            self.request_timeout_seconds,
            "procurat.request_timeout_seconds",
        )?;
        if self.root_group_id <= 0 {
            return Err(crate::ConfigError::Validation(
                "procurat.root_group_id 必须为正数".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActiveDirectoryConfig {
    pub url: String,
    pub bind_dn: String,
    pub password: String,
    /// 用户搜索基准
    pub user_base_dn: String,
    /// 根组成员关系中保存用户名的自定义字段
    pub username_attribute: String,
    /// 同时把邮箱写入 userPrincipalName
    #[serde(default)]
    pub mail_as_upn: bool,
    /// `{id}` 会被替换为人员 ID
    #[serde(default = "default_initial_password_template")]
    pub initial_password_template: String,
    /// 跳过 TLS 证书校验，仅用于自签名的域控制器
    #[serde(default)]
    pub accept_invalid_certs: bool,
    #[serde(default = "default_ldap_timeout_seconds")]
    pub timeout_seconds: u64,
}

fn default_initial_password_template() -> String {
    "Start{id}#{id}".to_string()
}

fn default_ldap_timeout_seconds() -> u64 {
    30
}

impl ActiveDirectoryConfig {
    pub fn initial_password(&self, person_id: i64) -> String {
        self.initial_password_template
            .replace("{id}", &person_id.to_string())
    }
}

impl ConfigValidator for ActiveDirectoryConfig {
    fn validate(&self) -> crate::ConfigResult<()> {
        ValidationUtils::validate_url(&self.url, "active_directory.url")?;
        ValidationUtils::validate_dn(&self.bind_dn, "active_directory.bind_dn")?;
        ValidationUtils::validate_not_empty(&self.password, "active_directory.password")?;
        ValidationUtils::validate_dn(&self.user_base_dn, "active_directory.user_base_dn")?;
        ValidationUtils::validate_not_empty(
            &self.username_attribute,
            "active_directory.username_attribute",
        )?;
        ValidationUtils::validate_not_empty(
            &self.initial_password_template,
            "active_directory.initial_password_template",
        )?;
        ValidationUtils::validate_timeout_seconds(
            self.timeout_seconds,
            "active_directory.timeout_seconds",
        )?;
        Ok(())
    }
}

/// 电话系统 REST 接口
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StarfaceConfig {
    pub url: String,
    pub user_id: String,
    pub password: String,
    #[serde(default = "default_starface_timeout_seconds")]
    pub request_timeout_seconds: u64,
}

fn default_starface_timeout_seconds() -> u64 {
    60
}

impl ConfigValidator for StarfaceConfig {
    fn validate(&self) -> crate::ConfigResult<()> {
        ValidationUtils::validate_url(&self.url, "starface.url")?;
        ValidationUtils::validate_not_empty(&self.user_id, "starface.user_id")?;
        ValidationUtils::validate_not_empty(&self.password, "starface.password")?;
        ValidationUtils::validate_timeout_seconds(
            self.request_timeout_seconds,
            "starface.request_timeout_seconds",
        )?;
        Ok(())
    }
}

/// Exchange Web Services，使用 OAuth 客户端凭据
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EwsConfig {
    pub tenant_id: String,
    pub client_id: String,
    pub client_secret: String,
    pub contact_folder_id: String,
    /// 模拟登录的邮箱账户
    pub impersonated_user_id: String,
    #[serde(default = "default_ews_url")]
    pub url: String,
    #[serde(default = "default_authority")]
    pub authority: String,
    #[serde(default = "default_ews_timeout_seconds")]
    pub request_timeout_seconds: u64,
}

fn default_ews_url() -> String {
    "https://outlook.office365.com/EWS/Exchange.asmx".to_string()
}

fn default_authority() -> String {
    "https://login.microsoftonline.com".to_string()
}

fn default_ews_timeout_seconds() -> u64 {
    120
}

impl ConfigValidator for EwsConfig {
    fn validate(&self) -> crate::ConfigResult<()> {
        ValidationUtils::validate_not_empty(&self.tenant_id, "ews.tenant_id")?;
        ValidationUtils::validate_not_empty(&self.client_id, "ews.client_id")?;
        ValidationUtils::validate_not_empty(&self.client_secret, "ews.client_secret")?;
        ValidationUtils::validate_not_empty(&self.contact_folder_id, "ews.contact_folder_id")?;
        ValidationUtils::validate_not_empty(
            &self.impersonated_user_id,
            "ews.impersonated_user_id",
        )?;
        ValidationUtils::validate_url(&self.url, "ews.url")?;
        ValidationUtils::validate_url(&self.authority, "ews.authority")?;
        ValidationUtils::validate_timeout_seconds(
            self.request_timeout_seconds,
            "ews.request_timeout_seconds",
        )?;
        Ok(())
    }
}

/// 运行结果通知渠道，日志渠道始终启用
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportingConfig {
    #[serde(default)]
    pub webhook_url: Option<String>,
    #[serde(default)]
    pub webhook_headers: HashMap<String, String>,
}

impl ConfigValidator for ReportingConfig {
    fn validate(&self) -> crate::ConfigResult<()> {
        if let Some(url) = &self.webhook_url {
            ValidationUtils::validate_url(url, "reporting.webhook_url")?;
        }
        for name in self.webhook_headers.keys() {
            ValidationUtils::validate_not_empty(name, "reporting.webhook_headers")?;
        }
        Ok(())
    }
}
