//! 任务调度
//!
//! - [`cron_utils`]：CRON表达式解析
//! - [`runnable`]：任务执行体接口
//! - [`scheduled_task`]：运行互斥、下次执行时间、偏差汇总与通知
//! - [`scheduler`]：单计时器调度循环
//! - [`registry`]：任务类型标签到工厂函数的映射

pub mod cron_utils;
pub mod registry;
pub mod runnable;
pub mod scheduled_task;
pub mod scheduler;

pub use cron_utils::CronSchedule;
pub use registry::{parse_settings, TaskDefinition, TaskFactory, TaskRegistry};
pub use runnable::{JobContext, Runnable};
pub use scheduled_task::{RunOutcome, ScheduledTask, TaskRuntimeState};
pub use scheduler::TaskScheduler;
