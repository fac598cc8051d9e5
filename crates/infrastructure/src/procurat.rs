//! 学校管理系统 REST 客户端

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use syncer_config::ProcuratConfig;
use syncer_core::{
    Address, AddressId, ContactInformation, GroupId, MembershipRecord, Person, PersonId,
    SourceDirectory, SyncError, SyncResult,
};
use tracing::debug;

use crate::http::{build_client, read_json};

const COLLABORATOR: &str = "procurat";

/// 解析 `yyyy-MM-dd'T'HH:mm:ssX` 格式的时间，无时区时按 UTC 处理
pub fn parse_procurat_date(value: &str) -> SyncResult<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Ok(parsed.with_timezone(&Utc));
    }
    if let Ok(parsed) = DateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%#z") {
        return Ok(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S")
        .map(|naive| naive.and_utc())
        .map_err(|e| SyncError::invalid_data(format!("无效的日期 '{value}': {e}")))
}

/// 0 表示未设置
fn non_zero(id: i64) -> Option<i64> {
    (id != 0).then_some(id)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PersonDto {
    id: PersonId,
    first_name: Option<String>,
    last_name: Option<String>,
    #[serde(default)]
    address_id: i64,
    #[serde(default)]
    family_id: i64,
}

impl From<PersonDto> for Person {
    fn from(dto: PersonDto) -> Self {
        Person {
            id: dto.id,
            first_name: dto.first_name,
            last_name: dto.last_name,
            address_id: non_zero(dto.address_id),
            family_id: non_zero(dto.family_id),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MembershipDto {
    id: i64,
    group_id: GroupId,
    person_id: PersonId,
    entry_date: String,
    exit_date: Option<String>,
    #[serde(default)]
    json_data: Option<serde_json::Map<String, serde_json::Value>>,
}

impl TryFrom<MembershipDto> for MembershipRecord {
    type Error = SyncError;

    fn try_from(dto: MembershipDto) -> SyncResult<Self> {
        Ok(MembershipRecord {
            id: dto.id,
            group_id: dto.group_id,
            person_id: dto.person_id,
            entry_date: parse_procurat_date(&dto.entry_date)?,
            exit_date: dto
                .exit_date
                .as_deref()
                .map(parse_procurat_date)
                .transpose()?,
            attributes: dto.json_data.unwrap_or_default(),
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ContactInformationDto {
    id: i64,
    #[serde(default)]
    order: i32,
    #[serde(rename = "type", default)]
    kind: Option<String>,
    medium: serde_json::Value,
    content: Option<String>,
    #[serde(default)]
    secret: bool,
    #[serde(default)]
    person_id: i64,
    #[serde(default)]
    address_id: i64,
}

impl From<ContactInformationDto> for ContactInformation {
    fn from(dto: ContactInformationDto) -> Self {
        let medium = serde_json::from_value(dto.medium)
            .unwrap_or(syncer_core::ContactMedium::Other);
        ContactInformation {
            id: dto.id,
            order: dto.order,
            medium,
            kind: dto.kind.unwrap_or_default(),
            content: dto.content.unwrap_or_default(),
            secret: dto.secret,
            person_id: non_zero(dto.person_id),
            address_id: non_zero(dto.address_id),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddressDto {
    id: AddressId,
    street: Option<String>,
    zip: Option<String>,
    city: Option<String>,
}

impl From<AddressDto> for Address {
    fn from(dto: AddressDto) -> Self {
        Address {
            id: dto.id,
            street: dto.street,
            zip: dto.zip,
            city: dto.city,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommunicationDto {
    contact_person_id: PersonId,
}

pub struct ProcuratClient {
    base_url: String,
    root_group_id: GroupId,
    http_client: Client,
}

impl ProcuratClient {
    pub fn new(config: &ProcuratConfig) -> SyncResult<Self> {
        let mut headers = HeaderMap::new();
        let api_key = HeaderValue::from_str(&config.api_key)
            .map_err(|e| SyncError::config_error(format!("无效的 procurat.api_key: {e}")))?;
        headers.insert("X-API-KEY", api_key);

        Ok(Self {
            base_url: config.url.trim_end_matches('/').to_string(),
            root_group_id: config.root_group_id,
            http_client: build_client(COLLABORATOR, config.request_timeout_seconds, headers)?,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> SyncResult<T> {
        debug!("GET {}", path);
        let response = self.http_client.get(self.url(path)).send().await?;
        read_json(COLLABORATOR, response).await
    }

    /// 404 视为不存在
    async fn get_optional<T: DeserializeOwned>(&self, path: &str) -> SyncResult<Option<T>> {
        debug!("GET {}", path);
        let response = self.http_client.get(self.url(path)).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        read_json(COLLABORATOR, response).await.map(Some)
    }
}

#[async_trait]
impl SourceDirectory for ProcuratClient {
    async fn list_group_members(&self, group_id: GroupId) -> SyncResult<Vec<MembershipRecord>> {
        let memberships: Vec<MembershipDto> =
            self.get(&format!("groups/{group_id}/members")).await?;
        memberships.into_iter().map(MembershipRecord::try_from).collect()
    }

    async fn list_correspondents(&self, person_id: PersonId) -> SyncResult<Vec<PersonId>> {
        let communications: Vec<CommunicationDto> = self
            .get(&format!("communication/person/{person_id}/contacts"))
            .await?;
        Ok(communications
            .into_iter()
            .map(|communication| communication.contact_person_id)
            .collect())
    }

    async fn get_person(&self, person_id: PersonId) -> SyncResult<Option<Person>> {
        let person: Option<PersonDto> = self.get_optional(&format!("persons/{person_id}")).await?;
        Ok(person.map(Person::from))
    }

    async fn list_persons(&self) -> SyncResult<Vec<Person>> {
        let persons: Vec<PersonDto> = self.get("persons").await?;
        Ok(persons.into_iter().map(Person::from).collect())
    }

    async fn list_contact_info_by_person(
        &self,
        person_id: PersonId,
    ) -> SyncResult<Vec<ContactInformation>> {
        let infos: Vec<ContactInformationDto> = self
            .get(&format!("contactinformation/person/{person_id}"))
            .await?;
        Ok(infos.into_iter().map(ContactInformation::from).collect())
    }

    async fn list_contact_info_by_address(
        &self,
        address_id: AddressId,
    ) -> SyncResult<Vec<ContactInformation>> {
        let infos: Vec<ContactInformationDto> = self
            .get(&format!("contactinformation/address/{address_id}"))
            .await?;
        Ok(infos.into_iter().map(ContactInformation::from).collect())
    }

    async fn get_address(&self, address_id: AddressId) -> SyncResult<Option<Address>> {
        let address: Option<AddressDto> =
            self.get_optional(&format!("addresses/{address_id}")).await?;
        Ok(address.map(Address::from))
    }

    fn root_group_id(&self) -> GroupId {
        self.root_group_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use syncer_core::ContactMedium;

    #[test]
    fn test_parse_procurat_date_variants() {
        let expected = Utc.with_ymd_and_hms(2020, 8, 1, 0, 0, 0).unwrap();
        assert_eq!(parse_procurat_date("2020-08-01T00:00:00Z").unwrap(), expected);
        assert_eq!(parse_procurat_date("2020-08-01T02:00:00+02").unwrap(), expected);
        assert_eq!(parse_procurat_date("2020-08-01T02:00:00+02:00").unwrap(), expected);
        assert_eq!(parse_procurat_date("2020-08-01T00:00:00").unwrap(), expected);
        assert!(parse_procurat_date("01.08.2020").is_err());
    }

    #[test]
    fn test_membership_from_wire() {
        let json = r#"{
            "id": 3, "groupId": 1, "personId": 42,
            "entryDate": "2019-09-01T00:00:00Z", "exitDate": null,
            "jsonData": { "username": "aberg" }, "grade": "5"
        }"#;
        let dto: MembershipDto = serde_json::from_str(json).unwrap();
        let record = MembershipRecord::try_from(dto).unwrap();

        assert_eq!(record.person_id, 42);
        assert!(record.exit_date.is_none());
        assert_eq!(record.attribute_str("username"), Some("aberg"));
    }

    #[test]
    fn test_person_zero_ids_become_none() {
        let json = r#"{ "id": 7, "firstName": "Anna", "lastName": "Berg", "addressId": 0, "familyId": 12 }"#;
        let person = Person::from(serde_json::from_str::<PersonDto>(json).unwrap());

        assert_eq!(person.address_id, None);
        assert_eq!(person.family_id, Some(12));
    }

    #[test]
    fn test_contact_information_unknown_medium() {
        let json = r#"{ "id": 1, "order": 2, "type": "work", "medium": "pager", "content": "123", "personId": 7, "addressId": 0 }"#;
        let info = ContactInformation::from(serde_json::from_str::<ContactInformationDto>(json).unwrap());

        assert_eq!(info.medium, ContactMedium::Other);
        assert_eq!(info.kind, "work");
        assert_eq!(info.person_id, Some(7));
        assert_eq!(info.address_id, None);
    }
}
