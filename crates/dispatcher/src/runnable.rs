use async_trait::async_trait;
use chrono::{DateTime, Utc};
use syncer_core::SyncResult;
use syncer_domain::DeviationLog;

/// 同步任务的执行体
///
/// 单个人员的数据问题通过 [`JobContext::record_deviation`] 记录后继续处理；
/// 只有使整次运行失效的问题（数据源不可达、配置错误等）才返回错误。
#[async_trait]
pub trait Runnable: Send + Sync {
    /// 任务类型标签
    fn task_type(&self) -> &str;

    async fn run(&self, ctx: &mut JobContext) -> SyncResult<()>;
}

/// 单次运行的上下文
#[derive(Debug)]
pub struct JobContext {
    task_name: String,
    started_at: DateTime<Utc>,
    deviations: DeviationLog,
}

impl JobContext {
    pub fn new(task_name: impl Into<String>, started_at: DateTime<Utc>) -> Self {
        Self {
            task_name: task_name.into(),
            started_at,
            deviations: DeviationLog::new(),
        }
    }

    pub fn task_name(&self) -> &str {
        &self.task_name
    }

    /// 本次运行的开始时间，成员关系有效期按此时刻判断
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn record_deviation(&mut self, message: impl Into<String>) {
        self.deviations.record(message);
    }

    pub fn deviations(&self) -> &DeviationLog {
        &self.deviations
    }

    pub(crate) fn deviations_mut(&mut self) -> &mut DeviationLog {
        &mut self.deviations
    }
}
