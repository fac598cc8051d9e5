//! 内置同步任务
//!
//! | 标签 | 任务 | 目标系统 |
//! |---|---|---|
//! | `active-directory` | [`DirectorySyncJob`] | 目录服务，增量同步 |
//! | `starface` | [`PhoneBookSyncJob`] | 电话系统通讯录，删除后重建 |
//! | `ews` | [`MailContactsSyncJob`] | 邮件联系人文件夹，删除后重建 |
//! | `integrity` | [`IntegrityJob`] | 只读检查数据源 |

use std::sync::Arc;

use syncer_config::{
    DirectorySyncSettings, MailContactsSettings, PhoneBookSettings, TaskDocument,
};
use syncer_core::{DirectoryService, MailContacts, PhoneBook, SourceDirectory, SyncError};
use syncer_dispatcher::{parse_settings, Runnable, TaskRegistry};

pub mod directory_sync;
pub mod integrity;
pub mod mail_contacts_sync;
pub mod phone_book_sync;
mod population;

pub use directory_sync::{DirectoryOptions, DirectorySyncJob};
pub use integrity::IntegrityJob;
pub use mail_contacts_sync::MailContactsSyncJob;
pub use phone_book_sync::PhoneBookSyncJob;

pub const DIRECTORY_SYNC: &str = "active-directory";
pub const PHONE_BOOK_SYNC: &str = "starface";
pub const MAIL_CONTACTS_SYNC: &str = "ews";
pub const INTEGRITY_CHECK: &str = "integrity";

/// 任务可用的外部系统，未配置的为 `None`
#[derive(Clone)]
pub struct Collaborators {
    pub source: Arc<dyn SourceDirectory>,
    pub directory: Option<(Arc<dyn DirectoryService>, DirectoryOptions)>,
    pub phone_book: Option<Arc<dyn PhoneBook>>,
    pub mail_contacts: Option<Arc<dyn MailContacts>>,
}

impl Collaborators {
    pub fn new(source: Arc<dyn SourceDirectory>) -> Self {
        Self {
            source,
            directory: None,
            phone_book: None,
            mail_contacts: None,
        }
    }
}

fn missing(section: &str) -> SyncError {
    SyncError::config_error(format!("任务依赖的 {section} 未配置"))
}

/// 注册全部内置任务类型
pub fn register_builtin_jobs(registry: &mut TaskRegistry, collaborators: Collaborators) {
    let c = collaborators.clone();
    registry.register(DIRECTORY_SYNC, move |document: &TaskDocument| {
        let settings: DirectorySyncSettings = parse_settings(document)?;
        let (directory, options) = c.directory.clone().ok_or_else(|| missing("active_directory"))?;
        Ok(Box::new(DirectorySyncJob::new(
            settings,
            options,
            Arc::clone(&c.source),
            directory,
        )) as Box<dyn Runnable>)
    });

    let c = collaborators.clone();
    registry.register(PHONE_BOOK_SYNC, move |document: &TaskDocument| {
        let settings: PhoneBookSettings = parse_settings(document)?;
        let phone_book = c.phone_book.clone().ok_or_else(|| missing("starface"))?;
        Ok(Box::new(PhoneBookSyncJob::new(settings, Arc::clone(&c.source), phone_book))
            as Box<dyn Runnable>)
    });

    let c = collaborators.clone();
    registry.register(MAIL_CONTACTS_SYNC, move |document: &TaskDocument| {
        let settings: MailContactsSettings = parse_settings(document)?;
        let mail_contacts = c.mail_contacts.clone().ok_or_else(|| missing("ews"))?;
        Ok(Box::new(MailContactsSyncJob::new(
            settings,
            Arc::clone(&c.source),
            mail_contacts,
        )) as Box<dyn Runnable>)
    });

    let c = collaborators;
    registry.register(INTEGRITY_CHECK, move |_document: &TaskDocument| {
        Ok(Box::new(IntegrityJob::new(Arc::clone(&c.source))) as Box<dyn Runnable>)
    });
}
