use async_trait::async_trait;

use crate::models::{ContactTag, PhoneBookContact};
use crate::SyncResult;

/// 电话系统通讯录
#[async_trait]
pub trait PhoneBook: Send + Sync {
    async fn find_tag_by_alias(&self, alias: &str) -> SyncResult<Option<ContactTag>>;

    /// 删除带有该标签的全部联系人，返回删除数量
    async fn delete_all_contacts_for_tag(&self, tag: &ContactTag) -> SyncResult<usize>;

    async fn create_contact(&self, tag: &ContactTag, contact: &PhoneBookContact) -> SyncResult<()>;
}
