pub mod models;
pub mod tasks;
pub mod validation;

pub use models::{
    ActiveDirectoryConfig, AppConfig, ContactGroup, DirectorySyncSettings, EmailType, EwsConfig,
    MailContactsSettings, PhoneBookSettings, PopulationRules, ProcuratConfig, ReportingConfig,
    RuleEntry, SchedulerConfig, StarfaceConfig, UserMapper,
};
pub use tasks::{load_task_documents, TaskDocument};
pub use validation::{ConfigValidator, ValidationUtils};

/// 配置模块的统一Result类型
pub type ConfigResult<T> = Result<T, ConfigError>;

/// 配置错误
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("配置错误: {0}")]
    Configuration(String),

    #[error("配置校验失败: {0}")]
    Validation(String),

    #[error("文件错误: {0}")]
    File(String),

    #[error("解析错误: {0}")]
    Parse(String),
}

impl From<anyhow::Error> for ConfigError {
    fn from(err: anyhow::Error) -> Self {
        ConfigError::Configuration(err.to_string())
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::Parse(err.to_string())
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::Parse(err.to_string())
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::File(err.to_string())
    }
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        match err {
            config::ConfigError::NotFound(key) => {
                ConfigError::Configuration(format!("缺少配置项: {key}"))
            }
            other => ConfigError::Parse(other.to_string()),
        }
    }
}
