use async_trait::async_trait;

use crate::models::{DirectoryUser, NewDirectoryUser, PersonId, UserDelta};
use crate::SyncResult;

/// 目录服务（LDAP / Active Directory）
#[async_trait]
pub trait DirectoryService: Send + Sync {
    /// 按 employeeID 查找用户
    async fn find_user(&self, employee_id: PersonId) -> SyncResult<Option<DirectoryUser>>;

    /// 用户基准 DN 下的全部用户
    async fn list_users(&self) -> SyncResult<Vec<DirectoryUser>>;

    /// 创建用户并返回新条目，账户须在下次登录时修改密码
    async fn create_user(&self, user: &NewDirectoryUser) -> SyncResult<DirectoryUser>;

    async fn update_user(&self, user: &DirectoryUser, delta: &UserDelta) -> SyncResult<()>;

    async fn disable_user(&self, user: &DirectoryUser) -> SyncResult<()>;

    async fn is_group_member(&self, user: &DirectoryUser, group_dn: &str) -> SyncResult<bool>;

    async fn add_to_group(&self, user: &DirectoryUser, group_dn: &str) -> SyncResult<()>;
}
