//! 电话系统 REST 客户端

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha512};
use syncer_config::StarfaceConfig;
use syncer_core::{ContactTag, PhoneBook, PhoneBookContact, SyncError, SyncResult};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::http::{build_client, ensure_success, read_json};

const COLLABORATOR: &str = "starface";

/// 电话系统每个联系人最多显示 4 个号码
pub const MAX_NUMBERS_PER_CONTACT: usize = 4;

/// 令牌官方有效期为 4 小时，提前重新登录
const TOKEN_MAX_AGE: Duration = Duration::from_secs(3 * 60 * 60);

const PAGE_SIZE: u32 = 40;

/// `用户ID:sha512(用户ID + nonce + sha512(密码))`
pub fn login_secret(user_id: &str, nonce: &str, password: &str) -> String {
    let hashed_password = hex::encode(Sha512::digest(password.as_bytes()));
    let digest = Sha512::digest(format!("{user_id}{nonce}{hashed_password}").as_bytes());
    format!("{user_id}:{}", hex::encode(digest))
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginDto {
    #[serde(default)]
    login_type: Option<String>,
    #[serde(default)]
    nonce: Option<String>,
    #[serde(default)]
    secret: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenDto {
    token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TagDto {
    id: String,
    alias: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchMetadata {
    total_pages: u32,
}

#[derive(Debug, Deserialize)]
struct ContactIdDto {
    id: String,
}

#[derive(Debug, Deserialize)]
struct SearchResultDto {
    metadata: SearchMetadata,
    #[serde(default)]
    contacts: Vec<ContactIdDto>,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
struct ContactAttribute {
    display_key: &'static str,
    name: String,
    value: String,
    i18n_display_name: &'static str,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
struct ContactBlock {
    name: &'static str,
    resource_key: &'static str,
    attributes: Vec<ContactAttribute>,
}

#[derive(Debug, Serialize)]
struct TagRef<'a> {
    id: &'a str,
    alias: &'a str,
}

#[derive(Debug, Serialize)]
struct ContactPayload<'a> {
    tags: Vec<TagRef<'a>>,
    blocks: Vec<ContactBlock>,
}

fn contact_payload<'a>(tag: &'a ContactTag, contact: &PhoneBookContact) -> ContactPayload<'a> {
    let contact_block = ContactBlock {
        name: "contact",
        resource_key: "de.vertico.starface.addressbook.block.label_contact",
        attributes: vec![
            ContactAttribute {
                display_key: "NAME",
                name: "firstname".to_string(),
                value: contact.first_name.clone(),
                i18n_display_name: "de.vertico.starface.addressbook.line.label_firstname",
            },
            ContactAttribute {
                display_key: "SURNAME",
                name: "familyname".to_string(),
                value: contact.last_name.clone(),
                i18n_display_name: "de.vertico.starface.addressbook.line.label_lastname",
            },
        ],
    };

    let mut telephone_attributes = Vec::new();
    if let Some(home_phone) = &contact.home_phone {
        telephone_attributes.push(ContactAttribute {
            display_key: "PRIVATE_PHONE_NUMBER",
            name: "homephone".to_string(),
            value: home_phone.clone(),
            i18n_display_name: "de.vertico.starface.addressbook.line.label_privatetelephonenumber",
        });
    }
    for (index, number) in contact
        .phone_numbers
        .iter()
        .take(MAX_NUMBERS_PER_CONTACT)
        .enumerate()
    {
        let name = if index == 0 {
            "phone".to_string()
        } else {
            format!("phone{}", index + 1)
        };
        telephone_attributes.push(ContactAttribute {
            display_key: "PHONE_NUMBER",
            name,
            value: number.clone(),
            i18n_display_name: "de.vertico.starface.addressbook.line.label_telephonenumber",
        });
    }

    ContactPayload {
        tags: vec![TagRef {
            id: &tag.id,
            alias: &tag.alias,
        }],
        blocks: vec![
            contact_block,
            ContactBlock {
                name: "telephone",
                resource_key: "de.vertico.starface.addressbook.block.label_telephone",
                attributes: telephone_attributes,
            },
        ],
    }
}

pub struct StarfaceClient {
    base_url: String,
    user_id: String,
    password: String,
    http_client: Client,
    token: Mutex<Option<(String, Instant)>>,
}

impl StarfaceClient {
    pub fn new(config: &StarfaceConfig) -> SyncResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert("X-Version", HeaderValue::from_static("2"));

        Ok(Self {
            base_url: config.url.trim_end_matches('/').to_string(),
            user_id: config.user_id.clone(),
            password: config.password.clone(),
            http_client: build_client(COLLABORATOR, config.request_timeout_seconds, headers)?,
            token: Mutex::new(None),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn login(&self) -> SyncResult<String> {
        let response = self.http_client.get(self.url("login")).send().await?;
        let mut login: LoginDto = read_json(COLLABORATOR, response).await?;
        let nonce = login
            .nonce
            .take()
            .filter(|nonce| !nonce.is_empty())
            .ok_or_else(|| SyncError::unavailable(COLLABORATOR, "登录响应中缺少 nonce"))?;
        login.secret = Some(login_secret(&self.user_id, &nonce, &self.password));
        login.nonce = Some(nonce);

        let response = self
            .http_client
            .post(self.url("login"))
            .json(&login)
            .send()
            .await?;
        let token: TokenDto = read_json(COLLABORATOR, response).await?;
        let token = token
            .token
            .ok_or_else(|| SyncError::unavailable(COLLABORATOR, "登录响应中缺少令牌"))?;

        info!("已登录电话系统: {}", self.user_id);
        Ok(token)
    }

    /// 令牌过期前复用
    async fn token(&self) -> SyncResult<String> {
        let mut guard = self.token.lock().await;
        if let Some((token, issued_at)) = guard.as_ref() {
            if issued_at.elapsed() < TOKEN_MAX_AGE {
                return Ok(token.clone());
            }
        }
        let token = self.login().await?;
        *guard = Some((token.clone(), Instant::now()));
        Ok(token)
    }

    async fn authorized(&self, request: RequestBuilder) -> SyncResult<RequestBuilder> {
        Ok(request.header("authToken", self.token().await?))
    }

    async fn search_contacts(&self, tag_id: &str, page: u32) -> SyncResult<SearchResultDto> {
        let request = self.http_client.get(self.url("contacts")).query(&[
            ("tags", tag_id.to_string()),
            ("page", page.to_string()),
            ("pagesize", PAGE_SIZE.to_string()),
        ]);
        let response = self.authorized(request).await?.send().await?;
        read_json(COLLABORATOR, response).await
    }
}

#[async_trait]
impl PhoneBook for StarfaceClient {
    async fn find_tag_by_alias(&self, alias: &str) -> SyncResult<Option<ContactTag>> {
        let request = self.http_client.get(self.url("contacts/tags"));
        let response = self.authorized(request).await?.send().await?;
        let tags: Vec<TagDto> = read_json(COLLABORATOR, response).await?;
        Ok(tags
            .into_iter()
            .find(|tag| tag.alias == alias)
            .map(|tag| ContactTag {
                id: tag.id,
                alias: tag.alias,
            }))
    }

    async fn delete_all_contacts_for_tag(&self, tag: &ContactTag) -> SyncResult<usize> {
        let metadata = self.search_contacts(&tag.id, 0).await?.metadata;

        // 从最后一页向前删除，避免翻页偏移
        let mut deleted = 0;
        for page in (0..=metadata.total_pages).rev() {
            let result = self.search_contacts(&tag.id, page).await?;
            for contact in result.contacts {
                let request = self
                    .http_client
                    .delete(self.url(&format!("contacts/{}", contact.id)));
                let response = self.authorized(request).await?.send().await?;
                ensure_success(COLLABORATOR, response).await?;
                deleted += 1;
            }
        }

        debug!("已删除标签 '{}' 的 {} 个联系人", tag.alias, deleted);
        Ok(deleted)
    }

    async fn create_contact(&self, tag: &ContactTag, contact: &PhoneBookContact) -> SyncResult<()> {
        if contact.phone_numbers.len() > MAX_NUMBERS_PER_CONTACT {
            warn!(
                "联系人 {} {} 有 {} 个号码，仅保留前 {} 个",
                contact.first_name,
                contact.last_name,
                contact.phone_numbers.len(),
                MAX_NUMBERS_PER_CONTACT
            );
        }

        let payload = contact_payload(tag, contact);
        let request = self.http_client.post(self.url("contacts")).json(&payload);
        let response = self.authorized(request).await?.send().await?;
        ensure_success(COLLABORATOR, response).await?;
        Ok(())
    }
}
