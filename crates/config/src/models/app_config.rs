use anyhow::{Context, Result};
use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::Path;

use super::{
    clients::{ActiveDirectoryConfig, EwsConfig, ProcuratConfig, ReportingConfig, StarfaceConfig},
    scheduler::SchedulerConfig,
};
use crate::validation::ConfigValidator;

const DEFAULT_CONFIG_PATHS: [&str; 3] = [
    "config/syncer.toml",
    "syncer.toml",
    "/etc/syncer/config.toml",
];

/// 应用配置
///
/// 数据源 (`procurat`) 必须配置；其余外部系统按需配置，
/// 依赖未配置系统的任务会在启动时被排除。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    pub procurat: ProcuratConfig,
    #[serde(default)]
    pub active_directory: Option<ActiveDirectoryConfig>,
    #[serde(default)]
    pub starface: Option<StarfaceConfig>,
    #[serde(default)]
    pub ews: Option<EwsConfig>,
    #[serde(default)]
    pub reporting: ReportingConfig,
}

impl AppConfig {
    /// 加载顺序：默认值 → TOML 文件 → `SYNCER_` 前缀的环境变量
    /// （例如 `SYNCER_PROCURAT__API_KEY`）
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut builder = ConfigBuilder::builder()
            .set_default("scheduler.tick_interval_seconds", 1)?
            .set_default("scheduler.tasks_dir", "tasks")?
            .set_default("scheduler.use_local_time", true)?
            .set_default("scheduler.shutdown_timeout_seconds", 30)?
            .set_default("procurat.request_timeout_seconds", 300)?;

        if let Some(path) = config_path {
            if Path::new(path).exists() {
                builder = builder.add_source(File::new(path, FileFormat::Toml));
            } else {
                return Err(anyhow::anyhow!("配置文件不存在: {}", path));
            }
        } else if let Some(path) = DEFAULT_CONFIG_PATHS
            .iter()
            .find(|path| Path::new(path).exists())
        {
            builder = builder.add_source(File::new(path, FileFormat::Toml));
        } else {
            tracing::warn!("未找到配置文件，仅使用默认值和环境变量");
        }

        builder = builder.add_source(
            Environment::with_prefix("SYNCER")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: AppConfig = builder
            .build()
            .context("构建配置失败")?
            .try_deserialize()
            .context("反序列化配置失败")?;

        config.validate()?;

        Ok(config)
    }

    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(toml_str).context("解析TOML配置失败")?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("序列化配置为TOML失败")
    }
}

impl ConfigValidator for AppConfig {
    fn validate(&self) -> crate::ConfigResult<()> {
        self.scheduler.validate()?;
        self.procurat.validate()?;
        if let Some(active_directory) = &self.active_directory {
            active_directory.validate()?;
        }
        if let Some(starface) = &self.starface {
            starface.validate()?;
        }
        if let Some(ews) = &self.ews {
            ews.validate()?;
        }
        self.reporting.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const MINIMAL: &str = r#"
[procurat]
url = "https://procurat.school.example/api"
api_key = "secret"
root_group_id = 1
"#;

    const FULL: &str = r#"
[scheduler]
tasks_dir = "/etc/syncer/tasks"
use_local_time = false

[procurat]
url = "https://procurat.school.example/api"
api_key = "secret"
root_group_id = 1
request_timeout_seconds = 120

[active_directory]
url = "ldaps://dc01.school.example:636"
bind_dn = "cn=syncer,ou=Service,dc=school,dc=example"
password = "bind-password"
user_base_dn = "ou=Users,dc=school,dc=example"
username_attribute = "username"
mail_as_upn = true

[starface]
url = "https://pbx.school.example"
user_id = "0001"
password = "pbx-password"

[ews]
tenant_id = "tenant"
client_id = "client"
client_secret = "client-secret"
contact_folder_id = "AAMkAD"
impersonated_user_id = "contacts@school.example"

[reporting]
webhook_url = "https://hooks.school.example/syncer"
webhook_headers = { Authorization = "Bearer token" }
"#;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = AppConfig::from_toml(MINIMAL).unwrap();
        assert_eq!(config.scheduler.tick_interval_seconds, 1);
        assert_eq!(config.scheduler.tasks_dir, "tasks");
        assert!(config.scheduler.use_local_time);
        assert_eq!(config.procurat.request_timeout_seconds, 300);
        assert!(config.active_directory.is_none());
        assert!(config.starface.is_none());
        assert!(config.ews.is_none());
        assert!(config.reporting.webhook_url.is_none());
    }

    #[test]
    fn test_full_config() {
        let config = AppConfig::from_toml(FULL).unwrap();
        let active_directory = config.active_directory.as_ref().unwrap();
        assert!(active_directory.mail_as_upn);
        assert_eq!(active_directory.initial_password(42), "Start42#42");
        assert!(!config.scheduler.use_local_time);

        let ews = config.ews.as_ref().unwrap();
        assert_eq!(ews.url, "https://outlook.office365.com/EWS/Exchange.asmx");
        assert_eq!(
            config.reporting.webhook_headers.get("Authorization").map(String::as_str),
            Some("Bearer token")
        );
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let broken = MINIMAL.replace("https://procurat.school.example/api", "procurat");
        assert!(AppConfig::from_toml(&broken).is_err());

        let missing_key = MINIMAL.replace("api_key = \"secret\"", "api_key = \"\"");
        assert!(AppConfig::from_toml(&missing_key).is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(FULL.as_bytes()).unwrap();

        let path = file.path().to_str().unwrap().to_string();
        let config = AppConfig::load(Some(&path)).unwrap();
        assert_eq!(config.scheduler.tasks_dir, "/etc/syncer/tasks");
        assert_eq!(config.procurat.request_timeout_seconds, 120);
        assert!(config.starface.is_some());
    }

    #[test]
    fn test_load_missing_file() {
        let result = AppConfig::load(Some("/nonexistent/syncer.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_toml_roundtrip() {
        let config = AppConfig::from_toml(FULL).unwrap();
        let serialized = config.to_toml().unwrap();
        let parsed = AppConfig::from_toml(&serialized).unwrap();
        assert_eq!(parsed.procurat.url, config.procurat.url);
    }
}
