use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};

/// 一次运行中记录的非致命数据问题
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deviation {
    pub recorded_at: DateTime<Utc>,
    pub message: String,
}

impl Deviation {
    pub fn new(recorded_at: DateTime<Utc>, message: impl Into<String>) -> Self {
        Self {
            recorded_at,
            message: message.into(),
        }
    }

    /// 报告中的单行格式: `#<序号> (<dd-MM-yyyy HH:mm:ss>): <内容>`
    pub fn format_line(&self, position: usize) -> String {
        format!(
            "#{} ({}): {}",
            position,
            self.recorded_at
                .with_timezone(&Local)
                .format("%d-%m-%Y %H:%M:%S"),
            self.message
        )
    }
}
