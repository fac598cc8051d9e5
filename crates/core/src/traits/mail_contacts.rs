use async_trait::async_trait;

use crate::models::{MailContact, MailGroupMember};
use crate::SyncResult;

/// 邮件系统联系人文件夹
#[async_trait]
pub trait MailContacts: Send + Sync {
    /// 清空联系人文件夹，返回删除数量
    async fn delete_all_contacts(&self) -> SyncResult<usize>;

    async fn create_contact(&self, contact: &MailContact) -> SyncResult<()>;

    async fn create_contact_group(&self, name: &str, members: &[MailGroupMember]) -> SyncResult<()>;
}
