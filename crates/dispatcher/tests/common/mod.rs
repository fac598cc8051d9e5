#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use syncer_core::{SyncError, SyncResult};
use syncer_dispatcher::{JobContext, Runnable};
use tokio::sync::Notify;

/// Job whose behaviour is fixed up front; every run appends its label to `calls`
pub struct ScriptedJob {
    pub label: String,
    pub calls: Arc<Mutex<Vec<String>>>,
    pub deviations: Vec<String>,
    pub fail: bool,
    pub gate: Option<Arc<Notify>>,
}

impl ScriptedJob {
    pub fn new(label: &str, calls: Arc<Mutex<Vec<String>>>) -> Self {
        Self {
            label: label.to_string(),
            calls,
            deviations: Vec::new(),
            fail: false,
            gate: None,
        }
    }

    pub fn with_deviations(mut self, deviations: &[&str]) -> Self {
        self.deviations = deviations.iter().map(|d| d.to_string()).collect();
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    /// Blocks inside `run` until the gate is notified
    pub fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }
}

#[async_trait]
impl Runnable for ScriptedJob {
    fn task_type(&self) -> &str {
        "scripted"
    }

    async fn run(&self, ctx: &mut JobContext) -> SyncResult<()> {
        assert!(ctx.deviations().is_empty(), "deviation log must start empty");
        self.calls.lock().unwrap().push(self.label.clone());

        if let Some(gate) = &self.gate {
            gate.notified().await;
        }

        for deviation in &self.deviations {
            ctx.record_deviation(deviation.clone());
        }

        if self.fail {
            return Err(SyncError::unavailable("procurat", "connection refused"));
        }
        Ok(())
    }
}

pub fn calls() -> Arc<Mutex<Vec<String>>> {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn at(hour: u32, minute: u32, second: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, hour, minute, second).unwrap()
}
