//! Exchange Web Services 联系人文件夹客户端
//!
//! 通过 OAuth 客户端凭据获取令牌，以模拟登录的邮箱账户发送 SOAP 请求。

use std::fmt::Write as _;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use quick_xml::escape::escape;
use quick_xml::events::Event;
use quick_xml::reader::Reader;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::Client;
use serde::Deserialize;
use syncer_config::EwsConfig;
use syncer_core::{MailContact, MailContacts, MailGroupMember, SyncError, SyncResult};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::http::{build_client, read_json};

const COLLABORATOR: &str = "ews";
const SCOPE: &str = "https://outlook.office365.com/.default";
const SERVER_VERSION: &str = "Exchange2010_SP2";

/// 联系人上记录人员 ID 的扩展属性
const PERSON_ID_PROPERTY_SET: &str = "757f160d-68cf-4dbb-8c5f-feab33b86145";
const PERSON_ID_PROPERTY_NAME: &str = "ProcuratId";

/// 令牌到期前提前刷新
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    3600
}

/// SOAP 响应中与同步相关的部分
#[derive(Debug, Default, PartialEq)]
struct ResponseSummary {
    errors: Vec<String>,
    total_items: Option<usize>,
}

fn envelope(impersonated_user: &str, body: &str) -> String {
    format!(
        concat!(
            r#"<?xml version="1.0" encoding="utf-8"?>"#,
            r#"<soap:Envelope xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/" "#,
            r#"xmlns:t="http://schemas.microsoft.com/exchange/services/2006/types" "#,
            r#"xmlns:m="http://schemas.microsoft.com/exchange/services/2006/messages">"#,
            r#"<soap:Header>"#,
            r#"<t:RequestServerVersion Version="{version}"/>"#,
            r#"<t:ExchangeImpersonation><t:ConnectingSID>"#,
            r#"<t:SmtpAddress>{user}</t:SmtpAddress>"#,
            r#"</t:ConnectingSID></t:ExchangeImpersonation>"#,
            r#"</soap:Header>"#,
            r#"<soap:Body>{body}</soap:Body>"#,
            r#"</soap:Envelope>"#
        ),
        version = SERVER_VERSION,
        user = escape(impersonated_user),
        body = body,
    )
}

fn folder_id(folder: &str) -> String {
    format!(r#"<t:FolderId Id="{}"/>"#, escape(folder))
}

fn count_items_body(folder: &str) -> String {
    format!(
        concat!(
            r#"<m:FindItem Traversal="Shallow">"#,
            r#"<m:ItemShape><t:BaseShape>IdOnly</t:BaseShape></m:ItemShape>"#,
            r#"<m:IndexedPageItemView MaxEntriesReturned="1" Offset="0" BasePoint="Beginning"/>"#,
            r#"<m:ParentFolderIds>{}</m:ParentFolderIds>"#,
            r#"</m:FindItem>"#
        ),
        folder_id(folder)
    )
}

fn empty_folder_body(folder: &str) -> String {
    format!(
        concat!(
            r#"<m:EmptyFolder DeleteType="HardDelete" DeleteSubFolders="false">"#,
            r#"<m:FolderIds>{}</m:FolderIds>"#,
            r#"</m:EmptyFolder>"#
        ),
        folder_id(folder)
    )
}

fn element(xml: &mut String, name: &str, value: &str) {
    let _ = write!(xml, "<t:{name}>{}</t:{name}>", escape(value));
}

fn create_items_body(folder: &str, items: &str) -> String {
    format!(
        concat!(
            r#"<m:CreateItem>"#,
            r#"<m:SavedItemFolderId>{}</m:SavedItemFolderId>"#,
            r#"<m:Items>{}</m:Items>"#,
            r#"</m:CreateItem>"#
        ),
        folder_id(folder),
        items
    )
}

/// 元素顺序须符合 EWS 架构: 扩展属性在前，姓氏在最后
fn contact_item(contact: &MailContact) -> String {
    let mut xml = String::from("<t:Contact>");
    let _ = write!(
        xml,
        concat!(
            r#"<t:ExtendedProperty>"#,
            r#"<t:ExtendedFieldURI PropertySetId="{}" PropertyName="{}" PropertyType="Integer"/>"#,
            r#"<t:Value>{}</t:Value>"#,
            r#"</t:ExtendedProperty>"#
        ),
        PERSON_ID_PROPERTY_SET,
        PERSON_ID_PROPERTY_NAME,
        contact.person_id
    );
    element(&mut xml, "DisplayName", &contact.display_name);
    element(&mut xml, "GivenName", &contact.given_name);

    let emails: Vec<(&str, &str)> = [
        ("EmailAddress1", contact.private_email.as_deref()),
        ("EmailAddress2", contact.work_email.as_deref()),
    ]
    .into_iter()
    .filter_map(|(key, value)| value.map(|value| (key, value)))
    .collect();
    if !emails.is_empty() {
        xml.push_str("<t:EmailAddresses>");
        for (key, address) in emails {
            let _ = write!(
                xml,
                r#"<t:Entry Key="{key}" Name="{}">{}</t:Entry>"#,
                escape(contact.display_name.as_str()),
                escape(address)
            );
        }
        xml.push_str("</t:EmailAddresses>");
    }

    xml.push_str(r#"<t:PhysicalAddresses><t:Entry Key="Home">"#);
    if let Some(street) = &contact.street {
        element(&mut xml, "Street", street);
    }
    if let Some(city) = &contact.city {
        element(&mut xml, "City", city);
    }
    if let Some(zip) = &contact.zip {
        element(&mut xml, "PostalCode", zip);
    }
    xml.push_str("</t:Entry></t:PhysicalAddresses>");

    let phones: Vec<(&str, &str)> = [
        ("HomePhone", contact.home_phone.as_deref()),
        ("MobilePhone", contact.mobile_phone.as_deref()),
    ]
    .into_iter()
    .filter_map(|(key, value)| value.map(|value| (key, value)))
    .collect();
    if !phones.is_empty() {
        xml.push_str("<t:PhoneNumbers>");
        for (key, number) in phones {
            let _ = write!(xml, r#"<t:Entry Key="{key}">{}</t:Entry>"#, escape(number));
        }
        xml.push_str("</t:PhoneNumbers>");
    }

    element(&mut xml, "PostalAddressIndex", "Home");
    element(&mut xml, "Surname", &contact.surname);
    xml.push_str("</t:Contact>");
    xml
}

/// 联系人组成员均为一次性地址
fn distribution_list_item(name: &str, members: &[MailGroupMember]) -> String {
    let mut xml = String::from("<t:DistributionList>");
    element(&mut xml, "DisplayName", name);
    if !members.is_empty() {
        xml.push_str("<t:Members>");
        for member in members {
            xml.push_str("<t:Member><t:Mailbox>");
            element(&mut xml, "Name", &member.display_name);
            element(&mut xml, "EmailAddress", &member.address);
            element(&mut xml, "RoutingType", "SMTP");
            element(&mut xml, "MailboxType", "OneOff");
            xml.push_str("</t:Mailbox></t:Member>");
        }
        xml.push_str("</t:Members>");
    }
    xml.push_str("</t:DistributionList>");
    xml
}

fn parse_response(xml: &str) -> SyncResult<ResponseSummary> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut summary = ResponseSummary::default();
    let mut buf = Vec::new();
    let mut in_error = false;
    let mut error_code: Option<String> = None;
    let mut error_text: Option<String> = None;
    let mut capture: Option<String> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => {
                let local = String::from_utf8_lossy(e.local_name().into_inner()).to_string();
                if local.ends_with("ResponseMessage") {
                    in_error = e.attributes().flatten().any(|attr| {
                        attr.key.local_name().as_ref() == b"ResponseClass"
                            && attr.value.as_ref() == b"Error"
                    });
                    error_code = None;
                    error_text = None;
                } else if local == "RootFolder" {
                    for attr in e.attributes().flatten() {
                        if attr.key.local_name().as_ref() == b"TotalItemsInView" {
                            let value = String::from_utf8_lossy(&attr.value).to_string();
                            summary.total_items = value.parse().ok();
                        }
                    }
                } else if local == "MessageText" || local == "ResponseCode" || local == "faultstring"
                {
                    capture = Some(local);
                }
            }
            Ok(Event::Text(ref e)) => {
                if let Some(field) = capture.take() {
                    let text = e.unescape().unwrap_or_default().to_string();
                    match field.as_str() {
                        "faultstring" => summary.errors.push(text),
                        "MessageText" if in_error => error_text = Some(text),
                        "ResponseCode" if in_error => error_code = Some(text),
                        _ => {}
                    }
                }
            }
            Ok(Event::End(ref e)) => {
                let local = String::from_utf8_lossy(e.local_name().into_inner()).to_string();
                if local.ends_with("ResponseMessage") && in_error {
                    let message = match (error_code.take(), error_text.take()) {
                        (Some(code), Some(text)) => format!("{code}: {text}"),
                        (None, Some(text)) => text,
                        (Some(code), None) => code,
                        (None, None) => "未知错误".to_string(),
                    };
                    summary.errors.push(message);
                    in_error = false;
                }
                capture = None;
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(SyncError::unavailable(
                    COLLABORATOR,
                    format!("无法解析 SOAP 响应: {e}"),
                ))
            }
            _ => {}
        }
        buf.clear();
    }

    Ok(summary)
}

pub struct EwsMailContacts {
    config: EwsConfig,
    http_client: Client,
    token: Mutex<Option<(String, Instant)>>,
}

impl EwsMailContacts {
    pub fn new(config: &EwsConfig) -> SyncResult<Self> {
        Ok(Self {
            config: config.clone(),
            http_client: build_client(COLLABORATOR, config.request_timeout_seconds, HeaderMap::new())?,
            token: Mutex::new(None),
        })
    }

    async fn access_token(&self) -> SyncResult<String> {
        let mut guard = self.token.lock().await;
        if let Some((token, expires_at)) = guard.as_ref() {
            if Instant::now() < *expires_at {
                return Ok(token.clone());
            }
        }

        let url = format!(
            "{}/{}/oauth2/v2.0/token",
            self.config.authority.trim_end_matches('/'),
            self.config.tenant_id
        );
        let response = self
            .http_client
            .post(url)
            .form(&[
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("scope", SCOPE),
                ("grant_type", "client_credentials"),
            ])
            .send()
            .await?;
        let token: TokenResponse = read_json(COLLABORATOR, response).await?;

        let lifetime = Duration::from_secs(token.expires_in).saturating_sub(TOKEN_EXPIRY_MARGIN);
        *guard = Some((token.access_token.clone(), Instant::now() + lifetime));
        debug!("已获取邮件系统访问令牌");
        Ok(token.access_token)
    }

    async fn call(&self, body: String) -> SyncResult<ResponseSummary> {
        let token = self.access_token().await?;
        let response = self
            .http_client
            .post(&self.config.url)
            .bearer_auth(token)
            .header(
                CONTENT_TYPE,
                HeaderValue::from_static("text/xml; charset=utf-8"),
            )
            .body(envelope(&self.config.impersonated_user_id, &body))
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        let summary = parse_response(&text)?;
        if !summary.errors.is_empty() {
            return Err(SyncError::unavailable(COLLABORATOR, summary.errors.join("; ")));
        }
        if !status.is_success() {
            return Err(SyncError::unavailable(
                COLLABORATOR,
                format!("HTTP {status}: {text}"),
            ));
        }
        Ok(summary)
    }
}

#[async_trait]
impl MailContacts for EwsMailContacts {
    async fn delete_all_contacts(&self) -> SyncResult<usize> {
        let folder = &self.config.contact_folder_id;
        let count = self
            .call(count_items_body(folder))
            .await?
            .total_items
            .unwrap_or_default();
        self.call(empty_folder_body(folder)).await?;
        info!("已清空联系人文件夹，删除 {} 个条目", count);
        Ok(count)
    }

    async fn create_contact(&self, contact: &MailContact) -> SyncResult<()> {
        let body = create_items_body(&self.config.contact_folder_id, &contact_item(contact));
        self.call(body).await?;
        debug!("已创建联系人 {}", contact.display_name);
        Ok(())
    }

    async fn create_contact_group(&self, name: &str, members: &[MailGroupMember]) -> SyncResult<()> {
        let body = create_items_body(
            &self.config.contact_folder_id,
            &distribution_list_item(name, members),
        );
        self.call(body).await?;
        info!("已创建联系人组 {}，共 {} 个地址", name, members.len());
        Ok(())
    }
}
