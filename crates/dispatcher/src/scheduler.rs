use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, TimeDelta, Utc};
use tokio::sync::broadcast;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use syncer_core::{Reporter, SyncResult};

use crate::cron_utils::CronSchedule;
use crate::registry::TaskDefinition;
use crate::scheduled_task::ScheduledTask;

/// 单计时器任务调度器
///
/// 每个 tick 按注册顺序依次检查任务，到期的任务在当前循环中直接 await 执行，
/// 因此同一时刻最多只有一个任务在运行。
pub struct TaskScheduler {
    tasks: Vec<ScheduledTask>,
    reporter: Arc<dyn Reporter>,
    tick_interval: Duration,
    use_local_time: bool,
}

impl TaskScheduler {
    pub fn new(reporter: Arc<dyn Reporter>, tick_interval: Duration, use_local_time: bool) -> Self {
        Self {
            tasks: Vec::new(),
            reporter,
            tick_interval,
            use_local_time,
        }
    }

    /// 注册任务并按 `now` 计算首次执行时间
    ///
    /// CRON表达式无效时记录错误并拒绝注册，其余任务不受影响。
    pub fn register(&mut self, definition: TaskDefinition, now: DateTime<Utc>) -> SyncResult<()> {
        let schedule = match CronSchedule::with_local_time(&definition.cron, self.use_local_time) {
            Ok(schedule) => schedule,
            Err(e) => {
                error!("任务 {} 无法调度，已排除: {}", definition.name, e);
                return Err(e);
            }
        };

        let task = ScheduledTask::new(
            definition.name,
            schedule,
            definition.run_at_startup,
            definition.job,
            Arc::clone(&self.reporter),
            now,
        );

        info!(
            "注册任务 {} (类型: {}, CRON: '{}', 下次执行: {})",
            task.name(),
            task.task_type(),
            task.cron_expression(),
            task.next_run()
                .map(|next_run| next_run.to_rfc3339())
                .unwrap_or_else(|| "无".to_string())
        );
        self.tasks.push(task);
        Ok(())
    }

    /// 批量注册，返回成功注册的数量
    pub fn register_all(&mut self, definitions: Vec<TaskDefinition>, now: DateTime<Utc>) -> usize {
        definitions
            .into_iter()
            .map(|definition| self.register(definition, now))
            .filter(Result::is_ok)
            .count()
    }

    pub fn tasks(&self) -> &[ScheduledTask] {
        &self.tasks
    }

    pub fn task(&self, name: &str) -> Option<&ScheduledTask> {
        self.tasks.iter().find(|task| task.name() == name)
    }

    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    /// 启动后立即执行标记了 `runAtStartup` 的任务，不考虑CRON对齐
    pub async fn run_startup_tasks(&self, now: DateTime<Utc>) -> usize {
        let started = Instant::now();
        let mut count = 0;
        for task in self.tasks.iter().filter(|task| task.run_at_startup()) {
            info!("启动时执行任务 {}", task.name());
            self.fire(task, offset(now, started)).await;
            count += 1;
        }
        count
    }

    /// 执行所有到期任务，返回触发数量
    pub async fn tick_at(&self, now: DateTime<Utc>) -> usize {
        let started = Instant::now();
        let mut fired = 0;
        for task in &self.tasks {
            // 前面的任务可能耗时较长，按实际经过的时间推进
            let at = offset(now, started);
            if task.is_due(at) {
                self.fire(task, at).await;
                fired += 1;
            }
        }
        fired
    }

    async fn fire(&self, task: &ScheduledTask, at: DateTime<Utc>) {
        match task.run_task(at).await {
            Ok(outcome) if outcome.is_success() => {
                debug!(
                    "任务 {} 成功，偏差 {} 条",
                    task.name(),
                    outcome.deviation_count
                );
            }
            Ok(outcome) => {
                debug!(
                    "任务 {} 失败，偏差 {} 条",
                    task.name(),
                    outcome.deviation_count
                );
            }
            Err(e) => error!("任务 {} 未能启动: {}", task.name(), e),
        }
    }

    /// 运行调度循环直到收到关闭信号
    ///
    /// 正在执行的任务会先执行完毕再退出。
    pub async fn run(&self, mut shutdown_rx: broadcast::Receiver<()>) {
        if self.tasks.is_empty() {
            warn!("没有已注册的任务");
        }

        self.run_startup_tasks(Utc::now()).await;

        let mut interval = tokio::time::interval(self.tick_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!("调度器已启动，共 {} 个任务", self.tasks.len());
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    self.tick_at(Utc::now()).await;
                }
                _ = shutdown_rx.recv() => {
                    info!("调度器循环收到关闭信号");
                    break;
                }
            }
        }
    }
}

fn offset(now: DateTime<Utc>, started: Instant) -> DateTime<Utc> {
    now + TimeDelta::from_std(started.elapsed()).unwrap_or(TimeDelta::zero())
}
