//! Active Directory 客户端
//!
//! 连接在首次使用时建立并复用，任何操作失败后丢弃，下次调用重新连接。
//! 设置初始密码需要 LDAPS 连接。

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use async_trait::async_trait;
use ldap3::adapters::{Adapter, EntriesOnly, PagedResults};
use ldap3::{dn_escape, ldap_escape, Ldap, LdapConnAsync, LdapConnSettings, Mod, Scope, SearchEntry};
use syncer_config::ActiveDirectoryConfig;
use syncer_core::models::directory::{UAC_ACCOUNT_DISABLE, UAC_NORMAL_ACCOUNT};
use syncer_core::{
    DirectoryService, DirectoryUser, NewDirectoryUser, PersonId, SyncError, SyncResult, UserDelta,
};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

const COLLABORATOR: &str = "ldap";
const PAGE_SIZE: i32 = 500;
const USER_FILTER: &str = "(&(objectCategory=person)(objectClass=user))";
const USER_ATTRIBUTES: [&str; 13] = [
    "cn",
    "sAMAccountName",
    "employeeID",
    "mail",
    "userPrincipalName",
    "givenName",
    "sn",
    "title",
    "physicalDeliveryOfficeName",
    "description",
    "userAccountControl",
    "pwdLastSet",
    "distinguishedName",
];

/// unicodePwd 要求带双引号的 UTF-16LE 编码
pub fn encode_unicode_password(password: &str) -> Vec<u8> {
    format!("\"{password}\"")
        .encode_utf16()
        .flat_map(u16::to_le_bytes)
        .collect()
}

fn attribute<'a>(attrs: &'a HashMap<String, Vec<String>>, name: &str) -> Option<&'a str> {
    attrs
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .and_then(|(_, values)| values.first())
        .map(String::as_str)
}

fn user_from_entry(entry: SearchEntry) -> DirectoryUser {
    let attrs = &entry.attrs;
    let text = |name: &str| attribute(attrs, name).map(str::to_string);

    DirectoryUser {
        dn: entry.dn.clone(),
        cn: attribute(attrs, "cn").unwrap_or_default().to_string(),
        sam_account_name: text("sAMAccountName"),
        employee_id: attribute(attrs, "employeeID").and_then(|id| id.trim().parse().ok()),
        mail: text("mail"),
        user_principal_name: text("userPrincipalName"),
        given_name: text("givenName"),
        surname: text("sn"),
        title: text("title"),
        office: text("physicalDeliveryOfficeName"),
        description: text("description"),
        user_account_control: attribute(attrs, "userAccountControl")
            .and_then(|uac| uac.parse().ok())
            .unwrap_or_default(),
        pwd_last_set: attribute(attrs, "pwdLastSet").and_then(|value| value.parse().ok()),
    }
}

fn single(value: &str) -> HashSet<Vec<u8>> {
    HashSet::from([value.as_bytes().to_vec()])
}

/// `cn=<全名>,<容器DN>`，全名按 DN 规则转义
fn new_user_dn(user: &NewDirectoryUser) -> String {
    format!("cn={},{}", dn_escape(user.full_name()), user.container_dn)
}

/// 新用户条目的全部属性，空值不写入
fn new_user_attributes(user: &NewDirectoryUser) -> Vec<(Vec<u8>, HashSet<Vec<u8>>)> {
    let full_name = user.full_name();
    let uac = UAC_NORMAL_ACCOUNT.to_string();
    let employee_id = user.employee_id.to_string();
    let attributes = &user.attributes;

    let mut values: Vec<(&str, &str)> = vec![
        ("cn", full_name.as_str()),
        ("displayName", full_name.as_str()),
        ("givenName", attributes.given_name.as_str()),
        ("sn", attributes.surname.as_str()),
        ("mail", attributes.mail.as_str()),
        ("sAMAccountName", user.username.as_str()),
        ("employeeID", employee_id.as_str()),
        ("title", attributes.title.as_str()),
        ("physicalDeliveryOfficeName", attributes.office.as_str()),
        ("description", attributes.description.as_str()),
        ("userAccountControl", uac.as_str()),
        ("pwdLastSet", "0"),
    ];
    if let Some(upn) = &attributes.user_principal_name {
        values.push(("userPrincipalName", upn.as_str()));
    }

    let mut entry: Vec<(Vec<u8>, HashSet<Vec<u8>>)> = vec![(
        b"objectClass".to_vec(),
        ["top", "person", "organizationalPerson", "user"]
            .iter()
            .map(|class| class.as_bytes().to_vec())
            .collect(),
    )];
    entry.extend(
        values
            .into_iter()
            .filter(|(_, value)| !value.is_empty())
            .map(|(name, value)| (name.as_bytes().to_vec(), single(value))),
    );
    entry.push((
        b"unicodePwd".to_vec(),
        HashSet::from([encode_unicode_password(&user.initial_password)]),
    ));
    entry
}

/// 空值表示删除该属性
fn delta_mods(delta: &UserDelta) -> Vec<Mod<Vec<u8>>> {
    delta
        .changes
        .iter()
        .map(|(field, value)| {
            let values = if value.is_empty() {
                HashSet::new()
            } else {
                single(value)
            };
            Mod::Replace(field.ldap_name().as_bytes().to_vec(), values)
        })
        .collect()
}

pub struct LdapDirectory {
    config: ActiveDirectoryConfig,
    connection: Mutex<Option<Ldap>>,
}

impl LdapDirectory {
    pub fn new(config: ActiveDirectoryConfig) -> Self {
        Self {
            config,
            connection: Mutex::new(None),
        }
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(self.config.timeout_seconds)
    }

    async fn connect(&self) -> SyncResult<Ldap> {
        debug!("连接目录服务 {}", self.config.url);
        let settings = LdapConnSettings::new()
            .set_conn_timeout(self.timeout())
            .set_no_tls_verify(self.config.accept_invalid_certs);
        let (conn, mut ldap) = LdapConnAsync::with_settings(settings, &self.config.url).await?;

        tokio::spawn(async move {
            if let Err(e) = conn.drive().await {
                warn!("LDAP连接中断: {}", e);
            }
        });

        ldap.with_timeout(self.timeout())
            .simple_bind(&self.config.bind_dn, &self.config.password)
            .await?
            .success()?;
        info!("已连接目录服务 {}", self.config.url);
        Ok(ldap)
    }

    async fn ldap(&self) -> SyncResult<Ldap> {
        let mut guard = self.connection.lock().await;
        if let Some(ldap) = guard.as_ref() {
            return Ok(ldap.clone());
        }
        let ldap = self.connect().await?;
        *guard = Some(ldap.clone());
        Ok(ldap)
    }

    /// 失败时丢弃缓存的连接
    async fn checked<T>(&self, result: SyncResult<T>) -> SyncResult<T> {
        if result.is_err() {
            self.connection.lock().await.take();
        }
        result
    }

    async fn search_users(&self, filter: &str) -> SyncResult<Vec<DirectoryUser>> {
        let mut ldap = self.ldap().await?;
        let adapters: Vec<Box<dyn Adapter<_, _>>> = vec![
            Box::new(EntriesOnly::new()),
            Box::new(PagedResults::new(PAGE_SIZE)),
        ];
        let mut search = ldap
            .with_timeout(self.timeout())
            .streaming_search_with(
                adapters,
                &self.config.user_base_dn,
                Scope::Subtree,
                filter,
                USER_ATTRIBUTES.to_vec(),
            )
            .await?;

        let mut users = Vec::new();
        while let Some(entry) = search.next().await? {
            users.push(user_from_entry(SearchEntry::construct(entry)));
        }
        search.finish().await.success()?;
        Ok(users)
    }

    async fn modify(&self, dn: &str, mods: Vec<Mod<Vec<u8>>>) -> SyncResult<()> {
        let mut ldap = self.ldap().await?;
        ldap.with_timeout(self.timeout())
            .modify(dn, mods)
            .await?
            .success()?;
        Ok(())
    }

    async fn find_user_inner(&self, employee_id: PersonId) -> SyncResult<Option<DirectoryUser>> {
        let filter = format!(
            "(&{USER_FILTER}(employeeID={}))",
            ldap_escape(&employee_id.to_string())
        );
        let mut users = self.search_users(&filter).await?;
        if users.len() > 1 {
            return Err(SyncError::invalid_data(format!(
                "employeeID {employee_id} 对应多个用户"
            )));
        }
        Ok(users.pop())
    }

    async fn create_user_inner(&self, user: &NewDirectoryUser) -> SyncResult<DirectoryUser> {
        let dn = new_user_dn(user);
        let mut ldap = self.ldap().await?;
        ldap.with_timeout(self.timeout())
            .add(&dn, new_user_attributes(user))
            .await?
            .success()?;
        info!("已创建用户 '{}'", dn);

        let created = self.find_user_inner(user.employee_id).await?;
        created.ok_or_else(|| {
            SyncError::unavailable(COLLABORATOR, format!("创建后找不到用户 '{dn}'"))
        })
    }

    async fn is_group_member_inner(&self, user: &DirectoryUser, group_dn: &str) -> SyncResult<bool> {
        let filter = format!("(member={})", ldap_escape(&user.dn));
        let mut ldap = self.ldap().await?;
        let (entries, _) = ldap
            .with_timeout(self.timeout())
            .search(group_dn, Scope::Base, &filter, vec!["dn"])
            .await?
            .success()?;
        Ok(!entries.is_empty())
    }
}

#[async_trait]
impl DirectoryService for LdapDirectory {
    async fn find_user(&self, employee_id: PersonId) -> SyncResult<Option<DirectoryUser>> {
        let result = self.find_user_inner(employee_id).await;
        self.checked(result).await
    }

    async fn list_users(&self) -> SyncResult<Vec<DirectoryUser>> {
        let result = self.search_users(USER_FILTER).await;
        self.checked(result).await
    }

    async fn create_user(&self, user: &NewDirectoryUser) -> SyncResult<DirectoryUser> {
        let result = self.create_user_inner(user).await;
        self.checked(result).await
    }

    async fn update_user(&self, user: &DirectoryUser, delta: &UserDelta) -> SyncResult<()> {
        if delta.is_empty() {
            return Ok(());
        }
        let result = self.modify(&user.dn, delta_mods(delta)).await;
        self.checked(result).await?;
        info!(
            "已更新用户 '{}' 的 {} 个属性 (用户名: {})",
            user.cn,
            delta.len(),
            user.username()
        );
        Ok(())
    }

    async fn disable_user(&self, user: &DirectoryUser) -> SyncResult<()> {
        let uac = (user.user_account_control | UAC_ACCOUNT_DISABLE).to_string();
        let mods = vec![Mod::Replace(b"userAccountControl".to_vec(), single(&uac))];
        let result = self.modify(&user.dn, mods).await;
        self.checked(result).await
    }

    async fn is_group_member(&self, user: &DirectoryUser, group_dn: &str) -> SyncResult<bool> {
        let result = self.is_group_member_inner(user, group_dn).await;
        self.checked(result).await
    }

    async fn add_to_group(&self, user: &DirectoryUser, group_dn: &str) -> SyncResult<()> {
        let mods = vec![Mod::Add(b"member".to_vec(), single(&user.dn))];
        let result = self.modify(group_dn, mods).await;
        self.checked(result).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use syncer_core::{UserAttributes, UserField};

    fn new_user() -> NewDirectoryUser {
        NewDirectoryUser {
            container_dn: "ou=Staff,dc=schule,dc=de".to_string(),
            employee_id: 42,
            username: "aberg".to_string(),
            initial_password: "Start42#42".to_string(),
            attributes: UserAttributes {
                mail: "anna.berg@schule.de".to_string(),
                user_principal_name: Some("anna.berg@schule.de".to_string()),
                given_name: "Anna".to_string(),
                surname: "Berg".to_string(),
                title: "Lehrkraft".to_string(),
                office: String::new(),
                description: String::new(),
            },
        }
    }

    fn values_of<'a>(
        entry: &'a [(Vec<u8>, HashSet<Vec<u8>>)],
        name: &str,
    ) -> Option<&'a HashSet<Vec<u8>>> {
        entry
            .iter()
            .find(|(key, _)| key.as_slice() == name.as_bytes())
            .map(|(_, values)| values)
    }

    #[test]
    fn test_encode_unicode_password() {
        assert_eq!(
            encode_unicode_password("ab"),
            vec![b'"', 0, b'a', 0, b'b', 0, b'"', 0]
        );
    }

    #[test]
    fn test_new_user_dn_escapes_full_name() {
        let mut user = new_user();
        assert_eq!(new_user_dn(&user), "cn=Anna Berg,ou=Staff,dc=schule,dc=de");

        user.attributes.surname = "Berg, Dr.".to_string();
        assert_eq!(new_user_dn(&user), "cn=Anna Berg\\2c Dr.,ou=Staff,dc=schule,dc=de");
    }

    #[test]
    fn test_new_user_attributes() {
        let entry = new_user_attributes(&new_user());

        assert_eq!(values_of(&entry, "objectClass").unwrap().len(), 4);
        assert_eq!(values_of(&entry, "cn"), Some(&single("Anna Berg")));
        assert_eq!(values_of(&entry, "employeeID"), Some(&single("42")));
        assert_eq!(values_of(&entry, "userAccountControl"), Some(&single("512")));
        assert_eq!(values_of(&entry, "pwdLastSet"), Some(&single("0")));
        assert_eq!(
            values_of(&entry, "userPrincipalName"),
            Some(&single("anna.berg@schule.de"))
        );
        assert!(values_of(&entry, "physicalDeliveryOfficeName").is_none());
        assert!(values_of(&entry, "unicodePwd").is_some());
    }

    #[test]
    fn test_delta_mods_clear_empty_values() {
        let delta = UserDelta {
            changes: vec![
                (UserField::Surname, "Berg".to_string()),
                (UserField::Description, String::new()),
            ],
        };
        let mods = delta_mods(&delta);

        assert_eq!(mods.len(), 2);
        match &mods[1] {
            Mod::Replace(name, values) => {
                assert_eq!(name.as_slice(), b"description");
                assert!(values.is_empty());
            }
            _ => panic!("expected a replace modification"),
        }
    }

    #[test]
    fn test_user_from_entry() {
        let mut attrs = HashMap::new();
        attrs.insert("cn".to_string(), vec!["Anna Berg".to_string()]);
        attrs.insert("sAMAccountName".to_string(), vec!["aberg".to_string()]);
        attrs.insert("employeeID".to_string(), vec!["42".to_string()]);
        attrs.insert("userAccountControl".to_string(), vec!["514".to_string()]);
        attrs.insert("pwdLastSet".to_string(), vec!["0".to_string()]);
        let entry = SearchEntry {
            dn: "cn=Anna Berg,ou=Staff,dc=schule,dc=de".to_string(),
            attrs,
            bin_attrs: HashMap::new(),
        };

        let user = user_from_entry(entry);
        assert_eq!(user.employee_id, Some(42));
        assert_eq!(user.username(), "aberg");
        assert!(user.is_disabled());
        assert!(user.must_change_password());
        assert_eq!(user.mail, None);
    }
}
