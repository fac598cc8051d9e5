use async_trait::async_trait;

use crate::models::{Address, AddressId, ContactInformation, GroupId, MembershipRecord, Person, PersonId};
use crate::SyncResult;

/// 权威数据源（学校管理系统）
#[async_trait]
pub trait SourceDirectory: Send + Sync {
    /// 某个组的全部成员关系，不做有效期过滤
    async fn list_group_members(&self, group_id: GroupId) -> SyncResult<Vec<MembershipRecord>>;

    /// 某人的联系人（监护人、紧急联系人）
    async fn list_correspondents(&self, person_id: PersonId) -> SyncResult<Vec<PersonId>>;

    async fn get_person(&self, person_id: PersonId) -> SyncResult<Option<Person>>;

    async fn list_persons(&self) -> SyncResult<Vec<Person>>;

    async fn list_contact_info_by_person(
        &self,
        person_id: PersonId,
    ) -> SyncResult<Vec<ContactInformation>>;

    async fn list_contact_info_by_address(
        &self,
        address_id: AddressId,
    ) -> SyncResult<Vec<ContactInformation>>;

    async fn get_address(&self, address_id: AddressId) -> SyncResult<Option<Address>>;

    /// 根组 ID，用于判断人员是否在籍
    fn root_group_id(&self) -> GroupId;
}
