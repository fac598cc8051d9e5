//! 偏差报告与失败报告的发送渠道

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Client;
use serde::Serialize;
use syncer_config::ReportingConfig;
use syncer_core::{Deviation, Reporter, SyncError, SyncResult};
use syncer_domain::render_report;
use tracing::{error, warn};

use crate::http::{build_client, ensure_success};

const WEBHOOK_COLLABORATOR: &str = "webhook";
const WEBHOOK_TIMEOUT_SECONDS: u64 = 30;

fn host_name() -> String {
    hostname::get()
        .unwrap_or_else(|_| "unknown".into())
        .to_string_lossy()
        .to_string()
}

/// 将报告写入日志
#[derive(Debug, Default)]
pub struct LogReporter;

#[async_trait]
impl Reporter for LogReporter {
    async fn send_deviation_report(&self, task_name: &str, deviations: &[Deviation]) -> SyncResult<()> {
        warn!(
            "任务 '{}' 记录了 {} 条偏差:\n{}",
            task_name,
            deviations.len(),
            render_report(deviations)
        );
        Ok(())
    }

    async fn send_failure_report(&self, task_name: &str, error: &SyncError) -> SyncResult<()> {
        error!("任务 '{}' 执行失败: {}", task_name, error);
        Ok(())
    }
}

#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum WebhookPayload<'a> {
    Deviations {
        task: &'a str,
        host: String,
        report: String,
        deviations: &'a [Deviation],
    },
    Failure {
        task: &'a str,
        host: String,
        error: String,
    },
}

/// 以 JSON 形式 POST 到配置的地址
pub struct WebhookReporter {
    url: String,
    http_client: Client,
}

impl WebhookReporter {
    pub fn new(url: &str, headers: &HashMap<String, String>) -> SyncResult<Self> {
        let mut header_map = HeaderMap::new();
        for (name, value) in headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| SyncError::config_error(format!("无效的请求头名称 '{name}': {e}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| SyncError::config_error(format!("无效的请求头 '{name}': {e}")))?;
            header_map.insert(name, value);
        }

        Ok(Self {
            url: url.to_string(),
            http_client: build_client(WEBHOOK_COLLABORATOR, WEBHOOK_TIMEOUT_SECONDS, header_map)?,
        })
    }

    async fn post(&self, payload: &WebhookPayload<'_>) -> SyncResult<()> {
        let response = self.http_client.post(&self.url).json(payload).send().await?;
        ensure_success(WEBHOOK_COLLABORATOR, response).await?;
        Ok(())
    }
}

#[async_trait]
impl Reporter for WebhookReporter {
    async fn send_deviation_report(&self, task_name: &str, deviations: &[Deviation]) -> SyncResult<()> {
        self.post(&WebhookPayload::Deviations {
            task: task_name,
            host: host_name(),
            report: render_report(deviations),
            deviations,
        })
        .await
    }

    async fn send_failure_report(&self, task_name: &str, error: &SyncError) -> SyncResult<()> {
        self.post(&WebhookPayload::Failure {
            task: task_name,
            host: host_name(),
            error: error.to_string(),
        })
        .await
    }
}

/// 依次发送到全部渠道，单个渠道失败只记录日志
pub struct CompositeReporter {
    reporters: Vec<Arc<dyn Reporter>>,
}

impl CompositeReporter {
    pub fn new(reporters: Vec<Arc<dyn Reporter>>) -> Self {
        Self { reporters }
    }

    /// 日志渠道总是启用，配置了地址时追加 webhook
    pub fn from_config(config: &ReportingConfig) -> SyncResult<Self> {
        let mut reporters: Vec<Arc<dyn Reporter>> = vec![Arc::new(LogReporter)];
        if let Some(url) = &config.webhook_url {
            reporters.push(Arc::new(WebhookReporter::new(url, &config.webhook_headers)?));
        }
        Ok(Self::new(reporters))
    }

    pub fn len(&self) -> usize {
        self.reporters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reporters.is_empty()
    }
}

#[async_trait]
impl Reporter for CompositeReporter {
    async fn send_deviation_report(&self, task_name: &str, deviations: &[Deviation]) -> SyncResult<()> {
        for reporter in &self.reporters {
            if let Err(e) = reporter.send_deviation_report(task_name, deviations).await {
                error!("发送任务 '{}' 的偏差报告失败: {}", task_name, e);
            }
        }
        Ok(())
    }

    async fn send_failure_report(&self, task_name: &str, error: &SyncError) -> SyncResult<()> {
        for reporter in &self.reporters {
            if let Err(e) = reporter.send_failure_report(task_name, error).await {
                error!("发送任务 '{}' 的失败报告失败: {}", task_name, e);
            }
        }
        Ok(())
    }
}
