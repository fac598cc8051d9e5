//! Test data builders for source-system records

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Utc};
use syncer_core::{
    AddressId, ContactInformation, ContactMedium, GroupId, MembershipRecord, Person, PersonId,
};

use crate::helpers::utc_date;

static NEXT_RECORD_ID: AtomicI64 = AtomicI64::new(1);

fn next_record_id() -> i64 {
    NEXT_RECORD_ID.fetch_add(1, Ordering::Relaxed)
}

/// Builder for [`Person`] records
pub struct PersonBuilder {
    person: Person,
}

impl PersonBuilder {
    pub fn new(id: PersonId) -> Self {
        Self {
            person: Person {
                id,
                first_name: Some(format!("First{id}")),
                last_name: Some(format!("Last{id}")),
                address_id: None,
                family_id: None,
            },
        }
    }

    pub fn name(mut self, first_name: &str, last_name: &str) -> Self {
        self.person.first_name = Some(first_name.to_string());
        self.person.last_name = Some(last_name.to_string());
        self
    }

    pub fn address(mut self, address_id: AddressId) -> Self {
        self.person.address_id = Some(address_id);
        self
    }

    pub fn build(self) -> Person {
        self.person
    }
}

/// Builder for [`MembershipRecord`]s; open-ended from 2000-01-01 by default
pub struct MembershipBuilder {
    record: MembershipRecord,
}

impl MembershipBuilder {
    pub fn new(group_id: GroupId, person_id: PersonId) -> Self {
        Self {
            record: MembershipRecord {
                id: next_record_id(),
                group_id,
                person_id,
                entry_date: utc_date(2000, 1, 1),
                exit_date: None,
                attributes: serde_json::Map::new(),
            },
        }
    }

    pub fn entry(mut self, entry_date: DateTime<Utc>) -> Self {
        self.record.entry_date = entry_date;
        self
    }

    pub fn exit(mut self, exit_date: DateTime<Utc>) -> Self {
        self.record.exit_date = Some(exit_date);
        self
    }

    pub fn attribute(mut self, key: &str, value: &str) -> Self {
        self.record
            .attributes
            .insert(key.to_string(), serde_json::Value::String(value.to_string()));
        self
    }

    pub fn build(self) -> MembershipRecord {
        self.record
    }
}

/// Builder for [`ContactInformation`]; order 1, not secret, no type by default
pub struct ContactInfoBuilder {
    info: ContactInformation,
}

impl ContactInfoBuilder {
    pub fn new(medium: ContactMedium, content: &str) -> Self {
        Self {
            info: ContactInformation {
                id: next_record_id(),
                order: 1,
                medium,
                kind: String::new(),
                content: content.to_string(),
                secret: false,
                person_id: None,
                address_id: None,
            },
        }
    }

    pub fn email(content: &str) -> Self {
        Self::new(ContactMedium::Email, content)
    }

    pub fn telephone(content: &str) -> Self {
        Self::new(ContactMedium::Telephone, content)
    }

    pub fn mobile(content: &str) -> Self {
        Self::new(ContactMedium::Mobile, content)
    }

    pub fn kind(mut self, kind: &str) -> Self {
        self.info.kind = kind.to_string();
        self
    }

    pub fn order(mut self, order: i32) -> Self {
        self.info.order = order;
        self
    }

    pub fn secret(mut self) -> Self {
        self.info.secret = true;
        self
    }

    pub fn person(mut self, person_id: PersonId) -> Self {
        self.info.person_id = Some(person_id);
        self
    }

    pub fn address(mut self, address_id: AddressId) -> Self {
        self.info.address_id = Some(address_id);
        self
    }

    pub fn build(self) -> ContactInformation {
        self.info
    }
}
