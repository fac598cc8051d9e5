//! 目录服务用户同步
//!
//! 增量同步：按 employeeID 查找现有用户，只写入变化的属性；不存在时创建。
//! 不再在籍的人员对应的用户会被禁用，而不是删除。

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use syncer_config::{ActiveDirectoryConfig, DirectorySyncSettings, UserMapper};
use syncer_core::{
    ContactMedium, DirectoryService, DirectoryUser, MembershipRecord, NewDirectoryUser, PersonId,
    SourceDirectory, SyncError, SyncResult, UserAttributes,
};
use syncer_dispatcher::{JobContext, Runnable};
use syncer_domain::{accumulate, active_membership, is_active, select_contact, Population, RuleId};
use tracing::{debug, info, warn};

use crate::population::rules_from_config;
use crate::DIRECTORY_SYNC;

/// 与具体任务无关的目录服务选项
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryOptions {
    /// 根组成员关系中存放用户名的属性键
    pub username_attribute: String,
    pub mail_as_upn: bool,
    /// `{id}` 会被替换为人员ID
    pub initial_password_template: String,
}

impl DirectoryOptions {
    pub fn initial_password(&self, person_id: PersonId) -> String {
        self.initial_password_template
            .replace("{id}", &person_id.to_string())
    }
}

impl From<&ActiveDirectoryConfig> for DirectoryOptions {
    fn from(config: &ActiveDirectoryConfig) -> Self {
        Self {
            username_attribute: config.username_attribute.clone(),
            mail_as_upn: config.mail_as_upn,
            initial_password_template: config.initial_password_template.clone(),
        }
    }
}

pub struct DirectorySyncJob {
    settings: DirectorySyncSettings,
    options: DirectoryOptions,
    source: Arc<dyn SourceDirectory>,
    directory: Arc<dyn DirectoryService>,
}

impl DirectorySyncJob {
    pub fn new(
        settings: DirectorySyncSettings,
        options: DirectoryOptions,
        source: Arc<dyn SourceDirectory>,
        directory: Arc<dyn DirectoryService>,
    ) -> Self {
        Self {
            settings,
            options,
            source,
            directory,
        }
    }

    async fn resolve_populations(&self) -> SyncResult<Vec<(&UserMapper, Population)>> {
        let mut populations = Vec::with_capacity(self.settings.user_mappers.len());
        for mapper in &self.settings.user_mappers {
            let rules = rules_from_config(&mapper.population, |_| RuleId::new(&mapper.name));
            let population = accumulate(&rules, self.source.as_ref()).await?;
            populations.push((mapper, population));
        }
        Ok(populations)
    }

    /// 创建或更新单个人员对应的用户，返回处理后的用户（若存在）
    async fn sync_person(
        &self,
        ctx: &mut JobContext,
        mapper: &UserMapper,
        root_memberships: &[MembershipRecord],
        person_id: PersonId,
    ) -> SyncResult<Option<DirectoryUser>> {
        let person = self
            .source
            .get_person(person_id)
            .await?
            .ok_or_else(|| SyncError::person_not_found(person_id))?;
        let name = person.full_name();
        let existing = match self.directory.find_user(person_id).await {
            Ok(user) => user,
            Err(e) if !e.is_fatal_to_run() => {
                ctx.record_deviation(format!("无法查找用户 {name} (ID: {person_id}): {e}"));
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        if active_membership(root_memberships, person_id, ctx.started_at()).is_none() {
            ctx.record_deviation(format!(
                "{name} (ID: {person_id}) 不在根组中或已离开，跳过创建和更新"
            ));
            return Ok(existing);
        }

        let Some(username) = self.username(ctx, root_memberships, person_id, &name) else {
            ctx.record_deviation(format!(
                "{name} (ID: {person_id}) 的成员关系中没有属性 '{}'",
                self.options.username_attribute
            ));
            return Ok(existing);
        };

        let infos = self.source.list_contact_info_by_person(person_id).await?;
        let Some(mail) = select_contact(&infos, ContactMedium::Email, Some("work"))
            .map(|info| info.content.trim().to_string())
        else {
            ctx.record_deviation(format!(
                "{name} (用户名: {username} | ID: {person_id}) 没有可用的工作邮箱"
            ));
            return Ok(existing);
        };

        let attributes = UserAttributes {
            user_principal_name: self.options.mail_as_upn.then(|| mail.clone()),
            mail,
            given_name: person.first_name().to_string(),
            surname: person.last_name().to_string(),
            title: mapper.title.clone(),
            office: mapper.office.clone(),
            description: mapper.description.clone(),
        };

        match existing {
            None => {
                let new_user = NewDirectoryUser {
                    container_dn: mapper.target_dn.clone(),
                    employee_id: person_id,
                    username: username.clone(),
                    initial_password: self.options.initial_password(person_id),
                    attributes,
                };
                match self.directory.create_user(&new_user).await {
                    Ok(user) => {
                        info!("已创建用户 {} ({})", user.dn, username);
                        Ok(Some(user))
                    }
                    Err(e) => {
                        warn!("创建用户 {} 失败: {}", username, e);
                        ctx.record_deviation(format!(
                            "无法创建用户 {name} (用户名: {username} | ID: {person_id}): {e}"
                        ));
                        Ok(None)
                    }
                }
            }
            Some(user) => {
                if user.is_disabled() {
                    ctx.record_deviation(format!(
                        "正在更新已禁用的用户 {name} (用户名: {username} | ID: {person_id})"
                    ));
                }

                let delta = attributes.diff(&user);
                if delta.is_empty() {
                    debug!("用户 {} 无变化", user.dn);
                    return Ok(Some(user));
                }

                match self.directory.update_user(&user, &delta).await {
                    Ok(()) => {
                        info!("已更新用户 {} 的 {} 个属性", user.dn, delta.len());
                        Ok(self.directory.find_user(person_id).await?.or(Some(user)))
                    }
                    Err(e) => {
                        warn!("更新用户 {} 失败: {}", user.dn, e);
                        ctx.record_deviation(format!(
                            "无法更新用户 {name} (用户名: {username} | ID: {person_id}): {e}"
                        ));
                        Ok(Some(user))
                    }
                }
            }
        }
    }

    /// 在籍成员关系中的用户名；多条成员关系给出不同用户名时取第一条并记录偏差
    fn username(
        &self,
        ctx: &mut JobContext,
        root_memberships: &[MembershipRecord],
        person_id: PersonId,
        name: &str,
    ) -> Option<String> {
        let now = ctx.started_at();
        let mut usernames: Vec<&str> = Vec::new();
        for membership in root_memberships
            .iter()
            .filter(|m| m.person_id == person_id && m.is_active_at(now))
        {
            if let Some(username) = membership.attribute_str(&self.options.username_attribute) {
                if !usernames.contains(&username) {
                    usernames.push(username);
                }
            }
        }

        if usernames.len() > 1 {
            ctx.record_deviation(format!(
                "{name} (ID: {person_id}) 有多个用户名 {:?}，使用 '{}'",
                usernames, usernames[0]
            ));
        }
        usernames.first().map(|username| username.to_string())
    }

    async fn add_to_target_groups(
        &self,
        ctx: &mut JobContext,
        mapper: &UserMapper,
        user: &DirectoryUser,
    ) -> SyncResult<()> {
        for group in &mapper.target_groups {
            if self.directory.is_group_member(user, group).await? {
                continue;
            }
            match self.directory.add_to_group(user, group).await {
                Ok(()) => info!("已将 {} 加入组 {}", user.dn, group),
                Err(e) => ctx.record_deviation(format!(
                    "无法将用户 {} 加入组 {group}: {e}",
                    user.username()
                )),
            }
        }
        Ok(())
    }

    /// 禁用不再在籍人员的用户，并提示仍未修改初始密码的用户
    async fn review_existing_users(
        &self,
        ctx: &mut JobContext,
        root_memberships: &[MembershipRecord],
    ) -> SyncResult<usize> {
        let now = ctx.started_at();
        let mut disabled = 0;

        for user in self.directory.list_users().await? {
            if user.is_disabled() {
                continue;
            }
            let Some(employee_id) = user.employee_id else {
                continue;
            };

            if !is_active(root_memberships, employee_id, now) {
                match self.directory.disable_user(&user).await {
                    Ok(()) => {
                        info!("已禁用用户 {} (ID: {})", user.dn, employee_id);
                        disabled += 1;
                    }
                    Err(e) => ctx.record_deviation(format!(
                        "无法禁用用户 {} (ID: {employee_id}): {e}",
                        user.username()
                    )),
                }
                continue;
            }

            if user.must_change_password() {
                ctx.record_deviation(format!(
                    "{} (用户名: {} | ID: {employee_id}) 尚未修改初始密码",
                    user.cn,
                    user.username()
                ));
            }
        }
        Ok(disabled)
    }
}

#[async_trait]
impl Runnable for DirectorySyncJob {
    fn task_type(&self) -> &str {
        DIRECTORY_SYNC
    }

    async fn run(&self, ctx: &mut JobContext) -> SyncResult<()> {
        let root_memberships = self
            .source
            .list_group_members(self.source.root_group_id())
            .await?;
        let populations = self.resolve_populations().await?;
        let total: HashSet<PersonId> = populations
            .iter()
            .flat_map(|(_, population)| population.person_ids())
            .collect();
        info!(
            "{} 个映射共涉及 {} 名人员",
            populations.len(),
            total.len()
        );

        let mut processed: HashMap<PersonId, Option<DirectoryUser>> = HashMap::new();
        for (mapper, population) in &populations {
            debug!("处理映射 {} ({} 人)", mapper.name, population.distinct_person_count());
            for person_id in population.person_ids() {
                let user = match processed.get(&person_id) {
                    Some(user) => user.clone(),
                    None => {
                        let user = self
                            .sync_person(ctx, mapper, &root_memberships, person_id)
                            .await?;
                        processed.insert(person_id, user.clone());
                        user
                    }
                };

                if let Some(user) = user {
                    self.add_to_target_groups(ctx, mapper, &user).await?;
                }
            }
        }

        let disabled = self.review_existing_users(ctx, &root_memberships).await?;
        info!(
            "目录同步完成: 处理 {} 名人员，禁用 {} 个用户",
            processed.len(),
            disabled
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_password_template() {
        let options = DirectoryOptions {
            username_attribute: "username".to_string(),
            mail_as_upn: true,
            initial_password_template: "Start{id}#{id}".to_string(),
        };
        assert_eq!(options.initial_password(42), "Start42#42");
    }
}
