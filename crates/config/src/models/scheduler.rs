use serde::{Deserialize, Serialize};

use crate::validation::{ConfigValidator, ValidationUtils};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// 固定为 1 秒，保留配置项只为测试时可调
    #[serde(default = "default_tick_interval_seconds")]
    pub tick_interval_seconds: u64,
    /// 每个任务一个 JSON 文件
    #[serde(default = "default_tasks_dir")]
    pub tasks_dir: String,
    /// 按本地时区计算 CRON，否则按 UTC
    #[serde(default = "default_use_local_time")]
    pub use_local_time: bool,
    #[serde(default = "default_shutdown_timeout_seconds")]
    pub shutdown_timeout_seconds: u64,
}

fn default_tick_interval_seconds() -> u64 {
    1
}

fn default_tasks_dir() -> String {
    "tasks".to_string()
}

fn default_use_local_time() -> bool {
    true
}

fn default_shutdown_timeout_seconds() -> u64 {
    30
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_interval_seconds: default_tick_interval_seconds(),
            tasks_dir: default_tasks_dir(),
            use_local_time: default_use_local_time(),
            shutdown_timeout_seconds: default_shutdown_timeout_seconds(),
        }
    }
}

impl ConfigValidator for SchedulerConfig {
    fn validate(&self) -> crate::ConfigResult<()> {
        if self.tick_interval_seconds != 1 {
            tracing::warn!(
                "scheduler.tick_interval_seconds = {}，CRON 的秒级对齐可能丢失",
                self.tick_interval_seconds
            );
        }
        ValidationUtils::validate_timeout_seconds(
            self.tick_interval_seconds,
            "scheduler.tick_interval_seconds",
        )?;
        ValidationUtils::validate_not_empty(&self.tasks_dir, "scheduler.tasks_dir")?;
        ValidationUtils::validate_timeout_seconds(
            self.shutdown_timeout_seconds,
            "scheduler.shutdown_timeout_seconds",
        )?;
        Ok(())
    }
}
