use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use syncer_config::{load_task_documents, AppConfig};
use syncer_core::Reporter;
use syncer_dispatcher::{TaskRegistry, TaskScheduler};
use syncer_infrastructure::{
    CompositeReporter, EwsMailContacts, LdapDirectory, ProcuratClient, StarfaceClient,
};
use syncer_jobs::{register_builtin_jobs, Collaborators, DirectoryOptions};
use tokio::sync::broadcast;
use tracing::{info, warn};

/// 根据配置创建外部系统客户端，未配置的系统不创建
pub fn build_collaborators(config: &AppConfig) -> Result<Collaborators> {
    let source = ProcuratClient::new(&config.procurat).context("创建数据源客户端失败")?;
    let mut collaborators = Collaborators::new(Arc::new(source));

    if let Some(active_directory) = &config.active_directory {
        let options = DirectoryOptions::from(active_directory);
        collaborators.directory = Some((
            Arc::new(LdapDirectory::new(active_directory.clone())),
            options,
        ));
    }

    if let Some(starface) = &config.starface {
        let client = StarfaceClient::new(starface).context("创建电话系统客户端失败")?;
        collaborators.phone_book = Some(Arc::new(client));
    }

    if let Some(ews) = &config.ews {
        let client = EwsMailContacts::new(ews).context("创建邮件系统客户端失败")?;
        collaborators.mail_contacts = Some(Arc::new(client));
    }

    Ok(collaborators)
}

/// 主应用程序
pub struct Application {
    scheduler: TaskScheduler,
}

impl Application {
    pub fn new(config: AppConfig, tasks_dir: Option<PathBuf>) -> Result<Self> {
        let collaborators = build_collaborators(&config)?;
        let reporter =
            CompositeReporter::from_config(&config.reporting).context("创建报告渠道失败")?;
        Self::with_collaborators(&config, tasks_dir, collaborators, Arc::new(reporter))
    }

    /// 加载任务目录并注册全部可实例化的任务
    pub fn with_collaborators(
        config: &AppConfig,
        tasks_dir: Option<PathBuf>,
        collaborators: Collaborators,
        reporter: Arc<dyn Reporter>,
    ) -> Result<Self> {
        let tasks_dir = tasks_dir.unwrap_or_else(|| PathBuf::from(&config.scheduler.tasks_dir));
        info!("从 {} 加载任务", tasks_dir.display());

        let documents = load_task_documents(&tasks_dir)
            .with_context(|| format!("加载任务目录失败: {}", tasks_dir.display()))?;

        let mut registry = TaskRegistry::new();
        register_builtin_jobs(&mut registry, collaborators);
        let definitions = registry.build_all(&documents);

        let mut scheduler = TaskScheduler::new(
            reporter,
            Duration::from_secs(config.scheduler.tick_interval_seconds),
            config.scheduler.use_local_time,
        );
        let registered = scheduler.register_all(definitions, Utc::now());
        if registered < documents.len() {
            warn!(
                "{} 个任务文件中有 {} 个未能注册",
                documents.len(),
                documents.len() - registered
            );
        }
        info!("已注册 {} 个任务", registered);

        Ok(Self { scheduler })
    }

    pub fn scheduler(&self) -> &TaskScheduler {
        &self.scheduler
    }

    /// 运行到收到关闭信号为止
    pub async fn run(&self, shutdown_rx: broadcast::Receiver<()>) {
        self.scheduler.run(shutdown_rx).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use syncer_testing_utils::{MockPhoneBook, MockReporter, MockSourceDirectory};
    use tempfile::TempDir;

    const CONFIG: &str = r#"
[procurat]
url = "https://procurat.schule.de/api"
api_key = "secret"
root_group_id = 1
"#;

    fn write_task(dir: &TempDir, file: &str, content: &str) {
        fs::write(dir.path().join(file), content).unwrap();
    }

    #[test]
    fn test_registers_only_tasks_with_collaborators() {
        let config = AppConfig::from_toml(CONFIG).unwrap();
        let dir = TempDir::new().unwrap();
        write_task(
            &dir,
            "01-integrity.json",
            r#"{ "type": "integrity", "cron": "0 0 3 * * *" }"#,
        );
        write_task(
            &dir,
            "02-starface.json",
            r#"{ "type": "starface", "cron": "0 */15 * * * *", "tagAlias": "Eltern" }"#,
        );
        write_task(
            &dir,
            "03-ews.json",
            r#"{ "type": "ews", "cron": "0 0 4 * * *", "groups": [] }"#,
        );
        write_task(&dir, "04-broken.json", "{ not json");

        let mut collaborators = Collaborators::new(Arc::new(MockSourceDirectory::new(1)));
        collaborators.phone_book = Some(Arc::new(MockPhoneBook::with_tag("tag-1", "Eltern")));

        let app = Application::with_collaborators(
            &config,
            Some(dir.path().to_path_buf()),
            collaborators,
            Arc::new(MockReporter::new()),
        )
        .unwrap();

        let names: Vec<&str> = app
            .scheduler()
            .tasks()
            .iter()
            .map(|task| task.task_type())
            .collect();
        assert_eq!(names, vec!["integrity", "starface"]);
    }

    #[test]
    fn test_missing_tasks_dir_is_error() {
        let config = AppConfig::from_toml(CONFIG).unwrap();
        let collaborators = Collaborators::new(Arc::new(MockSourceDirectory::new(1)));

        let result = Application::with_collaborators(
            &config,
            Some(PathBuf::from("/nonexistent/syncer/tasks")),
            collaborators,
            Arc::new(MockReporter::new()),
        );

        assert!(result.is_err());
    }

    #[test]
    fn test_build_collaborators_skips_unconfigured_systems() {
        let config = AppConfig::from_toml(CONFIG).unwrap();

        let collaborators = build_collaborators(&config).unwrap();

        assert!(collaborators.directory.is_none());
        assert!(collaborators.phone_book.is_none());
        assert!(collaborators.mail_contacts.is_none());
    }
}
