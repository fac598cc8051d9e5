//! 任务文档加载
//!
//! 任务目录下每个 `*.json` 文件描述一个任务：
//!
//! ```json
//! { "type": "active-directory", "cron": "0 3 * * *", "runAtStartup": false, "userMappers": [] }
//! ```
//!
//! 这里只解析公共字段，其余字段原样保留在 `settings` 中，交给任务工厂解析。

use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::{ConfigError, ConfigResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDocument {
    /// 任务类型标签
    #[serde(rename = "type")]
    pub task_type: String,
    /// 兼容旧文档中的 `interval` 字段名
    #[serde(alias = "interval")]
    pub cron: String,
    #[serde(default)]
    pub run_at_startup: bool,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(flatten)]
    pub settings: serde_json::Map<String, serde_json::Value>,
    /// 来源文件，仅用于日志
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

impl TaskDocument {
    pub fn from_json(json: &str) -> ConfigResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// 任务名称，缺省时使用文件名，再退回到类型标签
    pub fn display_name(&self) -> String {
        if let Some(name) = &self.name {
            return name.clone();
        }
        self.source
            .as_deref()
            .and_then(Path::file_stem)
            .and_then(|stem| stem.to_str())
            .map(str::to_string)
            .unwrap_or_else(|| self.task_type.clone())
    }

    /// 把任务专属字段解析为具体配置类型
    pub fn settings<T: DeserializeOwned>(&self) -> ConfigResult<T> {
        serde_json::from_value(serde_json::Value::Object(self.settings.clone())).map_err(|e| {
            ConfigError::Parse(format!("任务 {} 的配置无效: {e}", self.display_name()))
        })
    }
}

/// 按文件名顺序读取目录下的全部任务文档
///
/// 无法解析的文件记录错误后跳过，不影响其他任务。
pub fn load_task_documents(dir: impl AsRef<Path>) -> ConfigResult<Vec<TaskDocument>> {
    let dir = dir.as_ref();
    if !dir.is_dir() {
        return Err(ConfigError::File(format!(
            "任务目录不存在: {}",
            dir.display()
        )));
    }

    let mut paths: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|entry| entry.path()))
        .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
        .collect();
    paths.sort();

    let mut documents = Vec::with_capacity(paths.len());
    for path in paths {
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) => {
                error!("读取任务文件失败 {}: {}", path.display(), e);
                continue;
            }
        };

        match TaskDocument::from_json(&content) {
            Ok(mut document) => {
                debug!("加载任务文件 {} (类型: {})", path.display(), document.task_type);
                document.source = Some(path);
                documents.push(document);
            }
            Err(e) => error!("任务文件格式错误，已跳过 {}: {}", path.display(), e),
        }
    }

    if documents.is_empty() {
        warn!("任务目录 {} 中没有可用的任务", dir.display());
    }

    Ok(documents)
}
