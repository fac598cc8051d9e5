use async_trait::async_trait;

use crate::models::Deviation;
use crate::{SyncError, SyncResult};

/// 运行结果通知
///
/// 每次运行最多各调用一次。
#[async_trait]
pub trait Reporter: Send + Sync {
    async fn send_deviation_report(&self, task_name: &str, deviations: &[Deviation]) -> SyncResult<()>;

    async fn send_failure_report(&self, task_name: &str, error: &SyncError) -> SyncResult<()>;
}
