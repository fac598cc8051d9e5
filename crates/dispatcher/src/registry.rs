//! 任务类型注册表
//!
//! 任务文档中的 `type` 标签映射到工厂函数，启动时一次性完成全部实例化。
//! 无法识别的标签或无效的任务配置只会排除对应任务。

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use tracing::{error, info};

use syncer_config::{ConfigValidator, TaskDocument};
use syncer_core::{SyncError, SyncResult};

use crate::runnable::Runnable;

pub type TaskFactory = Box<dyn Fn(&TaskDocument) -> SyncResult<Box<dyn Runnable>> + Send + Sync>;

/// 待注册到调度器的任务
pub struct TaskDefinition {
    pub name: String,
    pub cron: String,
    pub run_at_startup: bool,
    pub job: Box<dyn Runnable>,
}

impl std::fmt::Debug for TaskDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskDefinition")
            .field("name", &self.name)
            .field("cron", &self.cron)
            .field("run_at_startup", &self.run_at_startup)
            .field("task_type", &self.job.task_type())
            .finish()
    }
}

#[derive(Default)]
pub struct TaskRegistry {
    factories: BTreeMap<String, TaskFactory>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 重复注册同一标签时后者覆盖前者
    pub fn register<F>(&mut self, task_type: impl Into<String>, factory: F)
    where
        F: Fn(&TaskDocument) -> SyncResult<Box<dyn Runnable>> + Send + Sync + 'static,
    {
        let task_type = task_type.into();
        info!("注册任务类型: {}", task_type);
        self.factories.insert(task_type, Box::new(factory));
    }

    pub fn contains(&self, task_type: &str) -> bool {
        self.factories.contains_key(task_type)
    }

    pub fn task_types(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }

    pub fn build(&self, document: &TaskDocument) -> SyncResult<TaskDefinition> {
        let factory = self
            .factories
            .get(&document.task_type)
            .ok_or_else(|| SyncError::UnknownTaskType(document.task_type.clone()))?;

        let job = factory(document)?;
        Ok(TaskDefinition {
            name: document.display_name(),
            cron: document.cron.clone(),
            run_at_startup: document.run_at_startup,
            job,
        })
    }

    /// 实例化全部任务文档，失败的记录错误后跳过
    pub fn build_all(&self, documents: &[TaskDocument]) -> Vec<TaskDefinition> {
        documents
            .iter()
            .filter_map(|document| match self.build(document) {
                Ok(definition) => Some(definition),
                Err(e) => {
                    error!("任务 {} 无法实例化，已禁用: {}", document.display_name(), e);
                    None
                }
            })
            .collect()
    }
}

/// 解析并校验任务专属配置
pub fn parse_settings<T>(document: &TaskDocument) -> SyncResult<T>
where
    T: DeserializeOwned + ConfigValidator,
{
    let settings: T = document
        .settings()
        .map_err(|e| SyncError::invalid_params(e.to_string()))?;
    settings.validate().map_err(|e| {
        SyncError::invalid_params(format!("任务 {}: {e}", document.display_name()))
    })?;
    Ok(settings)
}
