//! 邮件联系人同步
//!
//! 每次运行删除联系人文件夹中的全部条目，再按联系人组重建。
//! 每个人员只创建一个联系人，在各组之间共享。

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use syncer_config::{ContactGroup, EmailType, MailContactsSettings};
use syncer_core::{
    ContactMedium, MailContact, MailContacts, MailGroupMember, PersonId, SourceDirectory,
    SyncError, SyncResult,
};
use syncer_dispatcher::{JobContext, Runnable};
use syncer_domain::{
    accumulate, home_phone, normalize_phone_number, select_contact, Population, RuleId,
};
use tracing::{debug, info};

use crate::population::rules_from_config;
use crate::MAIL_CONTACTS_SYNC;

pub struct MailContactsSyncJob {
    settings: MailContactsSettings,
    source: Arc<dyn SourceDirectory>,
    mail_contacts: Arc<dyn MailContacts>,
}

/// 规则标识即邮箱类型
fn email_type_of(rule: &RuleId) -> EmailType {
    if rule.as_str() == EmailType::Work.as_str() {
        EmailType::Work
    } else {
        EmailType::Private
    }
}

impl MailContactsSyncJob {
    pub fn new(
        settings: MailContactsSettings,
        source: Arc<dyn SourceDirectory>,
        mail_contacts: Arc<dyn MailContacts>,
    ) -> Self {
        Self {
            settings,
            source,
            mail_contacts,
        }
    }

    async fn resolve_groups(&self) -> SyncResult<Vec<(&ContactGroup, Population)>> {
        let mut groups = Vec::with_capacity(self.settings.groups.len());
        for group in &self.settings.groups {
            let rules = rules_from_config(&group.population, |entry| {
                RuleId::new(entry.email_type.unwrap_or_default().as_str())
            });
            let population = accumulate(&rules, self.source.as_ref()).await?;
            debug!("联系人组 {} 包含 {} 条选择", group.name, population.len());
            groups.push((group, population));
        }
        Ok(groups)
    }

    async fn build_contact(&self, person_id: PersonId) -> SyncResult<MailContact> {
        let person = self
            .source
            .get_person(person_id)
            .await?
            .ok_or_else(|| SyncError::person_not_found(person_id))?;
        let person_infos = self.source.list_contact_info_by_person(person_id).await?;

        let (address_infos, address) = match person.address_id {
            Some(address_id) => (
                self.source.list_contact_info_by_address(address_id).await?,
                self.source.get_address(address_id).await?,
            ),
            None => (Vec::new(), None),
        };

        let email = |kind: EmailType| {
            select_contact(&person_infos, ContactMedium::Email, Some(kind.as_str()))
                .map(|info| info.content.trim().to_string())
        };
        let mobile_phone = select_contact(&person_infos, ContactMedium::Mobile, None)
            .map(|info| normalize_phone_number(&info.content))
            .filter(|number| !number.is_empty());

        Ok(MailContact {
            person_id,
            given_name: person.first_name().to_string(),
            surname: person.last_name().to_string(),
            display_name: format!("{} {}", person.last_name(), person.first_name()),
            private_email: email(EmailType::Private),
            work_email: email(EmailType::Work),
            home_phone: home_phone(&address_infos),
            mobile_phone,
            street: address.as_ref().and_then(|a| a.street.clone()),
            zip: address.as_ref().and_then(|a| a.zip.clone()),
            city: address.as_ref().and_then(|a| a.city.clone()),
        })
    }
}

#[async_trait]
impl Runnable for MailContactsSyncJob {
    fn task_type(&self) -> &str {
        MAIL_CONTACTS_SYNC
    }

    async fn run(&self, ctx: &mut JobContext) -> SyncResult<()> {
        let groups = self.resolve_groups().await?;

        let mut contacts: HashMap<PersonId, MailContact> = HashMap::new();
        let mut creation_order: Vec<PersonId> = Vec::new();
        let mut group_members: Vec<(String, Vec<MailGroupMember>)> = Vec::new();

        for (group, population) in &groups {
            let mut members = Vec::new();
            let mut addresses = HashSet::new();

            for selector in population {
                let person_id = selector.person_id;
                if !contacts.contains_key(&person_id) {
                    let contact = self.build_contact(person_id).await?;
                    contacts.insert(person_id, contact);
                    creation_order.push(person_id);
                }
                let Some(contact) = contacts.get(&person_id) else {
                    continue;
                };

                let email_type = email_type_of(&selector.rule);
                let address = match email_type {
                    EmailType::Private => contact.private_email.as_ref(),
                    EmailType::Work => contact.work_email.as_ref(),
                };
                match address {
                    Some(address) => {
                        if addresses.insert(address.clone()) {
                            members.push(MailGroupMember {
                                display_name: contact.display_name.clone(),
                                address: address.clone(),
                            });
                        }
                    }
                    None => ctx.record_deviation(format!(
                        "{} (ID: {person_id}) 在联系人组 '{}' 中缺少 {} 邮箱",
                        contact.display_name,
                        group.name,
                        email_type.as_str()
                    )),
                }
            }

            for (display_name, address) in &group.extra_addresses {
                if addresses.insert(address.clone()) {
                    members.push(MailGroupMember {
                        display_name: display_name.clone(),
                        address: address.clone(),
                    });
                }
            }
            group_members.push((group.name.clone(), members));
        }

        let deleted = self.mail_contacts.delete_all_contacts().await?;
        info!("已删除 {} 个邮件联系人", deleted);

        for person_id in &creation_order {
            if let Some(contact) = contacts.get(person_id) {
                self.mail_contacts.create_contact(contact).await?;
            }
        }
        for (name, members) in &group_members {
            self.mail_contacts.create_contact_group(name, members).await?;
            debug!("已创建联系人组 {} ({} 个成员)", name, members.len());
        }

        info!(
            "邮件联系人同步完成: {} 个联系人，{} 个联系人组",
            creation_order.len(),
            group_members.len()
        );
        Ok(())
    }
}
