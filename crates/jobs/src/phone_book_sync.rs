//! 电话系统通讯录同步
//!
//! 电话系统没有按键更新的接口，所以每次运行先删除标签下的全部联系人再重建。
//! 联系人在删除之前就已全部解析完成，数据源出错时通讯录保持不变。

use std::sync::Arc;

use async_trait::async_trait;
use syncer_config::PhoneBookSettings;
use syncer_core::{
    ContactTag, Person, PhoneBook, PhoneBookContact, SourceDirectory, SyncError, SyncResult,
};
use syncer_dispatcher::{JobContext, Runnable};
use syncer_domain::{accumulate, is_active, resolve_phone_numbers, RuleId};
use tracing::{debug, info};

use crate::population::rules_from_config;
use crate::PHONE_BOOK_SYNC;

pub struct PhoneBookSyncJob {
    settings: PhoneBookSettings,
    source: Arc<dyn SourceDirectory>,
    phone_book: Arc<dyn PhoneBook>,
}

impl PhoneBookSyncJob {
    pub fn new(
        settings: PhoneBookSettings,
        source: Arc<dyn SourceDirectory>,
        phone_book: Arc<dyn PhoneBook>,
    ) -> Self {
        Self {
            settings,
            source,
            phone_book,
        }
    }

    async fn find_tag(&self) -> SyncResult<ContactTag> {
        self.phone_book
            .find_tag_by_alias(&self.settings.tag_alias)
            .await?
            .ok_or_else(|| {
                SyncError::config_error(format!(
                    "电话系统中不存在标签 '{}'",
                    self.settings.tag_alias
                ))
            })
    }

    /// 未声明人员范围时取数据源中的全部人员
    async fn candidates(&self) -> SyncResult<Vec<Person>> {
        if self.settings.population.is_empty() {
            return self.source.list_persons().await;
        }

        let rules = rules_from_config(&self.settings.population, |_| RuleId::new(PHONE_BOOK_SYNC));
        let population = accumulate(&rules, self.source.as_ref()).await?;
        let mut persons = Vec::with_capacity(population.distinct_person_count());
        for person_id in population.person_ids() {
            let person = self
                .source
                .get_person(person_id)
                .await?
                .ok_or_else(|| SyncError::person_not_found(person_id))?;
            persons.push(person);
        }
        Ok(persons)
    }

    async fn build_contact(
        &self,
        ctx: &mut JobContext,
        person: &Person,
    ) -> SyncResult<Option<PhoneBookContact>> {
        let address_infos = match person.address_id {
            Some(address_id) => self.source.list_contact_info_by_address(address_id).await?,
            None => Vec::new(),
        };
        let person_infos = self.source.list_contact_info_by_person(person.id).await?;
        let numbers = resolve_phone_numbers(&address_infos, &person_infos);

        if !numbers.has_personal() {
            debug!("{} (ID: {}) 没有个人电话号码，跳过", person.full_name(), person.id);
            return Ok(None);
        }

        if person.first_name.is_none() && person.last_name.is_none() {
            ctx.record_deviation(format!("人员 {} 没有姓名，未写入通讯录", person.id));
            return Ok(None);
        }

        Ok(Some(PhoneBookContact {
            first_name: person.first_name().to_string(),
            last_name: person.last_name().to_string(),
            home_phone: numbers.home,
            phone_numbers: numbers.personal,
        }))
    }
}

#[async_trait]
impl Runnable for PhoneBookSyncJob {
    fn task_type(&self) -> &str {
        PHONE_BOOK_SYNC
    }

    async fn run(&self, ctx: &mut JobContext) -> SyncResult<()> {
        let tag = self.find_tag().await?;
        let root_memberships = self
            .source
            .list_group_members(self.source.root_group_id())
            .await?;
        let now = ctx.started_at();

        let mut contacts = Vec::new();
        for person in self.candidates().await? {
            if !is_active(&root_memberships, person.id, now) {
                continue;
            }
            if let Some(contact) = self.build_contact(ctx, &person).await? {
                contacts.push(contact);
            }
        }

        let deleted = self.phone_book.delete_all_contacts_for_tag(&tag).await?;
        info!("已删除标签 {} 下的 {} 个联系人", tag.alias, deleted);

        for contact in &contacts {
            self.phone_book.create_contact(&tag, contact).await?;
        }
        info!("已创建 {} 个联系人", contacts.len());
        Ok(())
    }
}
