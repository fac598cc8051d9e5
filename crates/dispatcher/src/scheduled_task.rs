//! 任务运行包装
//!
//! [`ScheduledTask`] 为任意 [`Runnable`] 提供运行互斥、下次执行时间维护、
//! 偏差汇总和结果通知，任务本身只关心同步逻辑。

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use chrono::{DateTime, SubsecRound, TimeDelta, Utc};
use tracing::{error, info, info_span, warn, Instrument};

use syncer_core::{Reporter, SyncError, SyncResult};
use syncer_domain::render_report;

use crate::cron_utils::CronSchedule;
use crate::runnable::{JobContext, Runnable};

/// 任务运行状态
#[derive(Debug, Default)]
pub struct TaskRuntimeState {
    running: AtomicBool,
    next_run: Mutex<Option<DateTime<Utc>>>,
}

impl TaskRuntimeState {
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn next_run(&self) -> Option<DateTime<Utc>> {
        *self.next_run.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_next_run(&self, next_run: Option<DateTime<Utc>>) {
        *self.next_run.lock().unwrap_or_else(PoisonError::into_inner) = next_run;
    }

    /// Idle → Running，已在运行时返回 [`SyncError::AlreadyRunning`]
    fn begin(&self, task_name: &str) -> SyncResult<RunGuard<'_>> {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| SyncError::AlreadyRunning {
                task: task_name.to_string(),
            })?;
        Ok(RunGuard { state: self })
    }
}

/// 释放时回到 Idle，任务体出错或 panic 时同样生效
struct RunGuard<'a> {
    state: &'a TaskRuntimeState,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.state.running.store(false, Ordering::Release);
    }
}

/// 一次运行的结果
#[derive(Debug)]
pub struct RunOutcome {
    pub deviation_count: usize,
    pub error: Option<SyncError>,
    pub elapsed_ms: u128,
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

pub struct ScheduledTask {
    name: String,
    schedule: CronSchedule,
    run_at_startup: bool,
    job: Box<dyn Runnable>,
    reporter: Arc<dyn Reporter>,
    state: TaskRuntimeState,
}

impl ScheduledTask {
    /// 创建任务并按 `now` 计算首次执行时间
    pub fn new(
        name: impl Into<String>,
        schedule: CronSchedule,
        run_at_startup: bool,
        job: Box<dyn Runnable>,
        reporter: Arc<dyn Reporter>,
        now: DateTime<Utc>,
    ) -> Self {
        let task = Self {
            name: name.into(),
            schedule,
            run_at_startup,
            job,
            reporter,
            state: TaskRuntimeState::default(),
        };
        task.refresh_next_run(now);
        task
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn task_type(&self) -> &str {
        self.job.task_type()
    }

    pub fn run_at_startup(&self) -> bool {
        self.run_at_startup
    }

    pub fn cron_expression(&self) -> &str {
        self.schedule.expression()
    }

    pub fn is_running(&self) -> bool {
        self.state.is_running()
    }

    pub fn next_run(&self) -> Option<DateTime<Utc>> {
        self.state.next_run()
    }

    /// 下次执行时间（截断到秒）不晚于 `now`（截断到秒）时应触发
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.next_run()
            .is_some_and(|next_run| next_run.trunc_subsecs(0) <= now.trunc_subsecs(0))
    }

    fn refresh_next_run(&self, from: DateTime<Utc>) {
        let next_run = self.schedule.next_execution_time(from);
        if next_run.is_none() {
            warn!(
                "任务 {} 的CRON表达式 '{}' 没有后续执行时间",
                self.name,
                self.schedule.expression()
            );
        }
        self.state.set_next_run(next_run);
    }

    /// 执行一次任务
    ///
    /// 任务已在运行时立即返回 [`SyncError::AlreadyRunning`]，不会启动第二次执行。
    /// 任务体的错误不会向外传播，而是体现在 [`RunOutcome::error`] 中并发送失败通知。
    pub async fn run_task(&self, now: DateTime<Utc>) -> SyncResult<RunOutcome> {
        let _guard = self.state.begin(&self.name)?;

        let span = info_span!("task_run", task = %self.name, task_type = %self.job.task_type());
        self.execute(now).instrument(span).await
    }

    async fn execute(&self, now: DateTime<Utc>) -> SyncResult<RunOutcome> {
        info!("开始执行任务 {}", self.name);
        self.refresh_next_run(now);

        let started = Instant::now();
        let mut ctx = JobContext::new(&self.name, now);
        let result = self.job.run(&mut ctx).await;

        if let Err(e) = &result {
            error!("任务 {} 执行失败: {}", self.name, e);
            if let Err(report_error) = self.reporter.send_failure_report(&self.name, e).await {
                error!("发送任务 {} 的失败通知失败: {}", self.name, report_error);
            }
        }

        let elapsed = started.elapsed();
        let finished_at = now + TimeDelta::from_std(elapsed).unwrap_or(TimeDelta::zero());
        self.refresh_next_run(finished_at);

        let elapsed_ms = elapsed.as_millis();
        info!(
            "任务 {} 执行完成，耗时 {}ms（下次执行: {}）",
            self.name,
            elapsed_ms,
            self.next_run()
                .map(|next_run| next_run.to_rfc3339())
                .unwrap_or_else(|| "无".to_string())
        );

        let deviations = ctx.deviations_mut().drain();
        if !deviations.is_empty() {
            info!("任务 {} 记录了 {} 条偏差", self.name, deviations.len());
            for line in render_report(&deviations).lines() {
                info!("{}", line);
            }
            if let Err(e) = self
                .reporter
                .send_deviation_report(&self.name, &deviations)
                .await
            {
                error!("发送任务 {} 的偏差报告失败: {}", self.name, e);
            }
        }

        Ok(RunOutcome {
            deviation_count: deviations.len(),
            error: result.err(),
            elapsed_ms,
        })
    }
}

impl std::fmt::Debug for ScheduledTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScheduledTask")
            .field("name", &self.name)
            .field("task_type", &self.job.task_type())
            .field("cron", &self.schedule.expression())
            .field("run_at_startup", &self.run_at_startup)
            .field("state", &self.state)
            .finish()
    }
}
