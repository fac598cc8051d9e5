use chrono::{DateTime, Local, Utc};
use cron::Schedule;
use std::str::FromStr;
use tracing::debug;

use syncer_core::{SyncError, SyncResult};

/// CRON表达式解析和调度工具
///
/// 接受 `cron` crate 的 6/7 段格式（含秒），也接受 5 段 UNIX 格式。
/// 5 段格式会补上秒字段 `0`，星期字段按 UNIX 约定（0 或 7 为周日）转换。
/// 5 段格式同时限定日期和星期时按 UNIX 语义取并集：拆成两个计划，取较早的触发时间。
#[derive(Debug, Clone)]
pub struct CronSchedule {
    expression: String,
    schedules: Vec<Schedule>,
    use_local_time: bool,
}

impl CronSchedule {
    /// 按 UTC 计算触发时间
    pub fn new(cron_expr: &str) -> SyncResult<Self> {
        Self::with_local_time(cron_expr, false)
    }

    /// `use_local_time` 为 true 时按本地时区计算触发时间
    pub fn with_local_time(cron_expr: &str, use_local_time: bool) -> SyncResult<Self> {
        let schedules = expand_expression(cron_expr)
            .iter()
            .map(|normalized| {
                if normalized != cron_expr.trim() {
                    debug!("CRON表达式 '{}' 规范化为 '{}'", cron_expr, normalized);
                }
                Schedule::from_str(normalized).map_err(|e| SyncError::InvalidCron {
                    expr: cron_expr.to_string(),
                    message: e.to_string(),
                })
            })
            .collect::<SyncResult<Vec<_>>>()?;

        Ok(Self {
            expression: cron_expr.trim().to_string(),
            schedules,
            use_local_time,
        })
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// 获取 `from` 之后（不含）的下一次执行时间
    pub fn next_execution_time(&self, from: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.upcoming_times(from, 1).into_iter().next()
    }

    /// 获取从指定时间开始的多个执行时间
    pub fn upcoming_times(&self, from: DateTime<Utc>, count: usize) -> Vec<DateTime<Utc>> {
        let mut times: Vec<DateTime<Utc>> = self
            .schedules
            .iter()
            .flat_map(|schedule| self.schedule_times(schedule, from, count))
            .collect();
        times.sort();
        times.dedup();
        times.truncate(count);
        times
    }

    fn schedule_times(
        &self,
        schedule: &Schedule,
        from: DateTime<Utc>,
        count: usize,
    ) -> Vec<DateTime<Utc>> {
        if self.use_local_time {
            schedule
                .after(&from.with_timezone(&Local))
                .take(count)
                .map(|time| time.with_timezone(&Utc))
                .collect()
        } else {
            schedule.after(&from).take(count).collect()
        }
    }
}

/// 5 段表达式补秒字段并转换星期编号，其余原样返回
pub fn normalize_expression(cron_expr: &str) -> String {
    let fields: Vec<&str> = cron_expr.split_whitespace().collect();
    if fields.len() != 5 {
        return cron_expr.trim().to_string();
    }

    format!(
        "0 {} {} {} {} {}",
        fields[0],
        fields[1],
        fields[2],
        fields[3],
        unix_weekdays_to_cron(fields[4])
    )
}

/// 规范化后的全部计划表达式
///
/// 5 段表达式的日期和星期字段都不以 `*` 开头时，拆成只限定日期和只限定星期的两个表达式。
pub fn expand_expression(cron_expr: &str) -> Vec<String> {
    let fields: Vec<&str> = cron_expr.split_whitespace().collect();
    let restricted = |field: &str| !field.starts_with('*') && field != "?";

    match fields.as_slice() {
        [minute, hour, day_of_month, month, day_of_week]
            if restricted(day_of_month) && restricted(day_of_week) =>
        {
            vec![
                normalize_expression(&format!("{minute} {hour} {day_of_month} {month} *")),
                normalize_expression(&format!("{minute} {hour} * {month} {day_of_week}")),
            ]
        }
        _ => vec![normalize_expression(cron_expr)],
    }
}

/// UNIX 星期编号 0-7（0 和 7 都是周日）转为 `cron` crate 的 1-7（1 为周日）
///
/// 数字区间展开成明确的日期列表，`7` 落在区间末尾时不会丢失周日。
fn unix_weekdays_to_cron(field: &str) -> String {
    field
        .split(',')
        .map(|item| {
            let (base, step) = match item.split_once('/') {
                Some((base, step)) => (base, Some(step)),
                None => (item, None),
            };

            let day = |value: &str| value.parse::<u8>().ok().filter(|day| *day <= 7);
            match base.split_once('-') {
                Some((start, end)) => {
                    let step = match step {
                        Some(step) => step.parse::<usize>().ok().filter(|step| *step > 0),
                        None => Some(1),
                    };
                    match (day(start), day(end), step) {
                        (Some(start), Some(end), Some(step)) if start <= end => {
                            let mut days: Vec<u8> = (start..=end)
                                .step_by(step)
                                .map(|day| day % 7 + 1)
                                .collect();
                            days.sort_unstable();
                            days.dedup();
                            days.iter()
                                .map(|day| day.to_string())
                                .collect::<Vec<_>>()
                                .join(",")
                        }
                        _ => item.to_string(),
                    }
                }
                None => {
                    let converted = match day(base) {
                        Some(day) => (day % 7 + 1).to_string(),
                        None => base.to_string(),
                    };
                    match step {
                        Some(step) => format!("{converted}/{step}"),
                        None => converted,
                    }
                }
            }
        })
        .collect::<Vec<_>>()
        .join(",")
}
