use chrono::{DateTime, Utc};
use syncer_core::Deviation;
use tracing::warn;

/// 单次运行的偏差记录
///
/// 运行开始时清空，结束时整体取出并上报。
#[derive(Debug, Default)]
pub struct DeviationLog {
    entries: Vec<Deviation>,
}

impl DeviationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, message: impl Into<String>) {
        self.record_at(Utc::now(), message);
    }

    pub fn record_at(&mut self, recorded_at: DateTime<Utc>, message: impl Into<String>) {
        let deviation = Deviation::new(recorded_at, message);
        warn!("记录偏差: {}", deviation.message);
        self.entries.push(deviation);
    }

    pub fn entries(&self) -> &[Deviation] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// 取出全部记录，日志随之清空
    pub fn drain(&mut self) -> Vec<Deviation> {
        std::mem::take(&mut self.entries)
    }
}

/// 报告正文，每条一行，从 1 开始编号
pub fn render_report(deviations: &[Deviation]) -> String {
    deviations
        .iter()
        .enumerate()
        .map(|(index, deviation)| deviation.format_line(index + 1))
        .collect::<Vec<_>>()
        .join("\n")
}
