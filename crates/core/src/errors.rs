use thiserror::Error;

/// 同步系统错误类型定义
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("外部系统不可用: {collaborator} - {message}")]
    CollaboratorUnavailable {
        collaborator: String,
        message: String,
    },

    #[error("配置错误: {0}")]
    Configuration(String),

    #[error("人员不存在: {id}")]
    PersonNotFound { id: i64 },

    #[error("无效的CRON表达式: {expr} - {message}")]
    InvalidCron { expr: String, message: String },

    #[error("任务已在运行: {task}")]
    AlreadyRunning { task: String },

    #[error("未知的任务类型: {0}")]
    UnknownTaskType(String),

    #[error("无效的任务参数: {0}")]
    InvalidTaskParams(String),

    #[error("数据错误: {0}")]
    InvalidData(String),

    #[error("序列化错误: {0}")]
    Serialization(String),

    #[error("内部错误: {0}")]
    Internal(String),
}

/// 统一的Result类型
pub type SyncResult<T> = std::result::Result<T, SyncError>;

impl SyncError {
    pub fn unavailable<C: Into<String>, M: Into<String>>(collaborator: C, message: M) -> Self {
        Self::CollaboratorUnavailable {
            collaborator: collaborator.into(),
            message: message.into(),
        }
    }

    pub fn config_error<S: Into<String>>(msg: S) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn invalid_params<S: Into<String>>(msg: S) -> Self {
        Self::InvalidTaskParams(msg.into())
    }

    pub fn invalid_data<S: Into<String>>(msg: S) -> Self {
        Self::InvalidData(msg.into())
    }

    pub fn person_not_found(id: i64) -> Self {
        Self::PersonNotFound { id }
    }

    /// 中止本次运行的错误：数据源不可达、任务配置错误、规则引用的人员不存在
    pub fn is_fatal_to_run(&self) -> bool {
        matches!(
            self,
            SyncError::CollaboratorUnavailable { .. }
                | SyncError::Configuration(_)
                | SyncError::PersonNotFound { .. }
        )
    }

    /// 导致任务在启动时被排除调度的错误
    pub fn is_fatal_to_process(&self) -> bool {
        matches!(
            self,
            SyncError::InvalidCron { .. }
                | SyncError::UnknownTaskType(_)
                | SyncError::InvalidTaskParams(_)
        )
    }

    pub fn is_contract_violation(&self) -> bool {
        matches!(self, SyncError::AlreadyRunning { .. })
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        SyncError::Serialization(err.to_string())
    }
}

impl From<reqwest::Error> for SyncError {
    fn from(err: reqwest::Error) -> Self {
        let collaborator = err
            .url()
            .and_then(|url| url.host_str().map(str::to_string))
            .unwrap_or_else(|| "http".to_string());
        SyncError::CollaboratorUnavailable {
            collaborator,
            message: err.to_string(),
        }
    }
}

impl From<ldap3::LdapError> for SyncError {
    fn from(err: ldap3::LdapError) -> Self {
        SyncError::unavailable("ldap", err.to_string())
    }
}

impl From<anyhow::Error> for SyncError {
    fn from(err: anyhow::Error) -> Self {
        SyncError::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        assert!(SyncError::unavailable("procurat", "timeout").is_fatal_to_run());
        assert!(SyncError::person_not_found(7).is_fatal_to_run());
        assert!(SyncError::config_error("missing tag").is_fatal_to_run());
        assert!(!SyncError::invalid_data("no email").is_fatal_to_run());

        let cron = SyncError::InvalidCron {
            expr: "x".to_string(),
            message: "bad".to_string(),
        };
        assert!(cron.is_fatal_to_process());
        assert!(!cron.is_fatal_to_run());

        let running = SyncError::AlreadyRunning {
            task: "phone-book".to_string(),
        };
        assert!(running.is_contract_violation());
        assert!(!running.is_fatal_to_process());
    }

    #[test]
    fn test_error_display() {
        let err = SyncError::unavailable("starface", "HTTP 502");
        assert_eq!(err.to_string(), "外部系统不可用: starface - HTTP 502");
        assert_eq!(SyncError::person_not_found(12).to_string(), "人员不存在: 12");
    }
}
