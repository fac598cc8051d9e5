//! In-memory implementations of the collaborator traits
//!
//! Every mock is `Clone` and shares its state through `Arc<Mutex<..>>`, so a
//! test can hand one clone to the code under test and inspect another.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use syncer_core::models::directory::{UAC_ACCOUNT_DISABLE, UAC_NORMAL_ACCOUNT};
use syncer_core::{
    Address, AddressId, ContactInformation, ContactTag, Deviation, DirectoryService,
    DirectoryUser, GroupId, MailContact, MailContacts, MailGroupMember, MembershipRecord,
    NewDirectoryUser, Person, PersonId, PhoneBook, PhoneBookContact, Reporter, SourceDirectory,
    SyncError, SyncResult, UserDelta, UserField,
};

#[derive(Debug, Default)]
struct SourceState {
    persons: BTreeMap<PersonId, Person>,
    memberships: Vec<MembershipRecord>,
    correspondents: HashMap<PersonId, Vec<PersonId>>,
    person_contacts: HashMap<PersonId, Vec<ContactInformation>>,
    address_contacts: HashMap<AddressId, Vec<ContactInformation>>,
    addresses: HashMap<AddressId, Address>,
    unavailable: bool,
    group_lookups: usize,
}

/// Mock of the authoritative record system
#[derive(Debug, Clone)]
pub struct MockSourceDirectory {
    root_group_id: GroupId,
    state: Arc<Mutex<SourceState>>,
}

impl MockSourceDirectory {
    pub fn new(root_group_id: GroupId) -> Self {
        Self {
            root_group_id,
            state: Arc::new(Mutex::new(SourceState::default())),
        }
    }

    pub fn add_person(&self, person: Person) {
        self.state.lock().unwrap().persons.insert(person.id, person);
    }

    pub fn remove_person(&self, person_id: PersonId) {
        self.state.lock().unwrap().persons.remove(&person_id);
    }

    pub fn add_membership(&self, membership: MembershipRecord) {
        self.state.lock().unwrap().memberships.push(membership);
    }

    pub fn set_correspondents(&self, person_id: PersonId, correspondents: Vec<PersonId>) {
        self.state
            .lock()
            .unwrap()
            .correspondents
            .insert(person_id, correspondents);
    }

    pub fn add_person_contact(&self, person_id: PersonId, info: ContactInformation) {
        self.state
            .lock()
            .unwrap()
            .person_contacts
            .entry(person_id)
            .or_default()
            .push(info);
    }

    pub fn add_address_contact(&self, address_id: AddressId, info: ContactInformation) {
        self.state
            .lock()
            .unwrap()
            .address_contacts
            .entry(address_id)
            .or_default()
            .push(info);
    }

    pub fn add_address(&self, address: Address) {
        self.state.lock().unwrap().addresses.insert(address.id, address);
    }

    /// Makes every subsequent call fail as if the system were unreachable
    pub fn set_unavailable(&self, unavailable: bool) {
        self.state.lock().unwrap().unavailable = unavailable;
    }

    pub fn group_lookups(&self) -> usize {
        self.state.lock().unwrap().group_lookups
    }

    fn check_available(&self) -> SyncResult<()> {
        if self.state.lock().unwrap().unavailable {
            return Err(SyncError::unavailable("procurat", "connection refused"));
        }
        Ok(())
    }
}

#[async_trait]
impl SourceDirectory for MockSourceDirectory {
    async fn list_group_members(&self, group_id: GroupId) -> SyncResult<Vec<MembershipRecord>> {
        self.check_available()?;
        let mut state = self.state.lock().unwrap();
        state.group_lookups += 1;
        Ok(state
            .memberships
            .iter()
            .filter(|membership| membership.group_id == group_id)
            .cloned()
            .collect())
    }

    async fn list_correspondents(&self, person_id: PersonId) -> SyncResult<Vec<PersonId>> {
        self.check_available()?;
        let state = self.state.lock().unwrap();
        Ok(state
            .correspondents
            .get(&person_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn get_person(&self, person_id: PersonId) -> SyncResult<Option<Person>> {
        self.check_available()?;
        Ok(self.state.lock().unwrap().persons.get(&person_id).cloned())
    }

    async fn list_persons(&self) -> SyncResult<Vec<Person>> {
        self.check_available()?;
        Ok(self.state.lock().unwrap().persons.values().cloned().collect())
    }

    async fn list_contact_info_by_person(
        &self,
        person_id: PersonId,
    ) -> SyncResult<Vec<ContactInformation>> {
        self.check_available()?;
        let state = self.state.lock().unwrap();
        Ok(state
            .person_contacts
            .get(&person_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn list_contact_info_by_address(
        &self,
        address_id: AddressId,
    ) -> SyncResult<Vec<ContactInformation>> {
        self.check_available()?;
        let state = self.state.lock().unwrap();
        Ok(state
            .address_contacts
            .get(&address_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn get_address(&self, address_id: AddressId) -> SyncResult<Option<Address>> {
        self.check_available()?;
        Ok(self.state.lock().unwrap().addresses.get(&address_id).cloned())
    }

    fn root_group_id(&self) -> GroupId {
        self.root_group_id
    }
}

#[derive(Debug, Default)]
struct DirectoryState {
    users: Vec<DirectoryUser>,
    groups: HashMap<String, HashSet<String>>,
    operations: Vec<String>,
    failing_creates: HashSet<PersonId>,
}

/// Mock directory service keyed by DN
#[derive(Debug, Clone, Default)]
pub struct MockDirectoryService {
    state: Arc<Mutex<DirectoryState>>,
}

impl MockDirectoryService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_user(&self, user: DirectoryUser) {
        self.state.lock().unwrap().users.push(user);
    }

    pub fn add_group_member(&self, group_dn: &str, user_dn: &str) {
        self.state
            .lock()
            .unwrap()
            .groups
            .entry(group_dn.to_string())
            .or_default()
            .insert(user_dn.to_string());
    }

    /// `create_user` for this employee id fails with an LDAP error
    pub fn fail_create_for(&self, employee_id: PersonId) {
        self.state.lock().unwrap().failing_creates.insert(employee_id);
    }

    pub fn users(&self) -> Vec<DirectoryUser> {
        self.state.lock().unwrap().users.clone()
    }

    pub fn user_by_employee_id(&self, employee_id: PersonId) -> Option<DirectoryUser> {
        self.state
            .lock()
            .unwrap()
            .users
            .iter()
            .find(|user| user.employee_id == Some(employee_id))
            .cloned()
    }

    pub fn group_members(&self, group_dn: &str) -> HashSet<String> {
        self.state
            .lock()
            .unwrap()
            .groups
            .get(group_dn)
            .cloned()
            .unwrap_or_default()
    }

    /// Mutating calls in invocation order, e.g. `"update cn=A B,ou=Staff"`
    pub fn operations(&self) -> Vec<String> {
        self.state.lock().unwrap().operations.clone()
    }
}

fn apply_delta(user: &mut DirectoryUser, delta: &UserDelta) {
    for (field, value) in &delta.changes {
        let value = Some(value.clone());
        match field {
            UserField::Mail => user.mail = value,
            UserField::UserPrincipalName => user.user_principal_name = value,
            UserField::GivenName => user.given_name = value,
            UserField::Surname => user.surname = value,
            UserField::Title => user.title = value,
            UserField::Office => user.office = value,
            UserField::Description => user.description = value,
        }
    }
}

#[async_trait]
impl DirectoryService for MockDirectoryService {
    async fn find_user(&self, employee_id: PersonId) -> SyncResult<Option<DirectoryUser>> {
        Ok(self.user_by_employee_id(employee_id))
    }

    async fn list_users(&self) -> SyncResult<Vec<DirectoryUser>> {
        Ok(self.users())
    }

    async fn create_user(&self, user: &NewDirectoryUser) -> SyncResult<DirectoryUser> {
        let mut state = self.state.lock().unwrap();
        if state.failing_creates.contains(&user.employee_id) {
            return Err(SyncError::unavailable("ldap", "constraint violation"));
        }

        let created = DirectoryUser {
            dn: format!("cn={},{}", user.full_name(), user.container_dn),
            cn: user.full_name(),
            sam_account_name: Some(user.username.clone()),
            employee_id: Some(user.employee_id),
            mail: Some(user.attributes.mail.clone()),
            user_principal_name: user.attributes.user_principal_name.clone(),
            given_name: Some(user.attributes.given_name.clone()),
            surname: Some(user.attributes.surname.clone()),
            title: Some(user.attributes.title.clone()),
            office: Some(user.attributes.office.clone()),
            description: Some(user.attributes.description.clone()),
            user_account_control: UAC_NORMAL_ACCOUNT,
            pwd_last_set: Some(0),
        };
        state.operations.push(format!("create {}", created.dn));
        state.users.push(created.clone());
        Ok(created)
    }

    async fn update_user(&self, user: &DirectoryUser, delta: &UserDelta) -> SyncResult<()> {
        let mut state = self.state.lock().unwrap();
        state.operations.push(format!("update {}", user.dn));
        if let Some(stored) = state.users.iter_mut().find(|stored| stored.dn == user.dn) {
            apply_delta(stored, delta);
        }
        Ok(())
    }

    async fn disable_user(&self, user: &DirectoryUser) -> SyncResult<()> {
        let mut state = self.state.lock().unwrap();
        state.operations.push(format!("disable {}", user.dn));
        if let Some(stored) = state.users.iter_mut().find(|stored| stored.dn == user.dn) {
            stored.user_account_control |= UAC_ACCOUNT_DISABLE;
        }
        Ok(())
    }

    async fn is_group_member(&self, user: &DirectoryUser, group_dn: &str) -> SyncResult<bool> {
        let state = self.state.lock().unwrap();
        Ok(state
            .groups
            .get(group_dn)
            .is_some_and(|members| members.contains(&user.dn)))
    }

    async fn add_to_group(&self, user: &DirectoryUser, group_dn: &str) -> SyncResult<()> {
        let mut state = self.state.lock().unwrap();
        state
            .operations
            .push(format!("add_to_group {} {}", user.dn, group_dn));
        state
            .groups
            .entry(group_dn.to_string())
            .or_default()
            .insert(user.dn.clone());
        Ok(())
    }
}

#[derive(Debug, Default)]
struct PhoneBookState {
    tags: Vec<ContactTag>,
    contacts: Vec<(String, PhoneBookContact)>,
    fail_creates: bool,
}

/// Mock phone system address book
#[derive(Debug, Clone, Default)]
pub struct MockPhoneBook {
    state: Arc<Mutex<PhoneBookState>>,
}

impl MockPhoneBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tag(id: &str, alias: &str) -> Self {
        let book = Self::new();
        book.state.lock().unwrap().tags.push(ContactTag {
            id: id.to_string(),
            alias: alias.to_string(),
        });
        book
    }

    /// Contacts not owned by any sync job
    pub fn add_contact(&self, tag_id: &str, contact: PhoneBookContact) {
        self.state
            .lock()
            .unwrap()
            .contacts
            .push((tag_id.to_string(), contact));
    }

    pub fn set_fail_creates(&self, fail: bool) {
        self.state.lock().unwrap().fail_creates = fail;
    }

    pub fn contacts_for_tag(&self, tag_id: &str) -> Vec<PhoneBookContact> {
        self.state
            .lock()
            .unwrap()
            .contacts
            .iter()
            .filter(|(tag, _)| tag == tag_id)
            .map(|(_, contact)| contact.clone())
            .collect()
    }

    pub fn contact_count(&self) -> usize {
        self.state.lock().unwrap().contacts.len()
    }
}

#[async_trait]
impl PhoneBook for MockPhoneBook {
    async fn find_tag_by_alias(&self, alias: &str) -> SyncResult<Option<ContactTag>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .tags
            .iter()
            .find(|tag| tag.alias == alias)
            .cloned())
    }

    async fn delete_all_contacts_for_tag(&self, tag: &ContactTag) -> SyncResult<usize> {
        let mut state = self.state.lock().unwrap();
        let before = state.contacts.len();
        state.contacts.retain(|(tag_id, _)| tag_id != &tag.id);
        Ok(before - state.contacts.len())
    }

    async fn create_contact(&self, tag: &ContactTag, contact: &PhoneBookContact) -> SyncResult<()> {
        let mut state = self.state.lock().unwrap();
        if state.fail_creates {
            return Err(SyncError::unavailable("starface", "503 Service Unavailable"));
        }
        state.contacts.push((tag.id.clone(), contact.clone()));
        Ok(())
    }
}

#[derive(Debug, Default)]
struct MailState {
    contacts: Vec<MailContact>,
    groups: Vec<(String, Vec<MailGroupMember>)>,
}

/// Mock mail contact folder
#[derive(Debug, Clone, Default)]
pub struct MockMailContacts {
    state: Arc<Mutex<MailState>>,
}

impl MockMailContacts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contacts(&self) -> Vec<MailContact> {
        self.state.lock().unwrap().contacts.clone()
    }

    pub fn groups(&self) -> Vec<(String, Vec<MailGroupMember>)> {
        self.state.lock().unwrap().groups.clone()
    }
}

#[async_trait]
impl MailContacts for MockMailContacts {
    async fn delete_all_contacts(&self) -> SyncResult<usize> {
        let mut state = self.state.lock().unwrap();
        let deleted = state.contacts.len() + state.groups.len();
        state.contacts.clear();
        state.groups.clear();
        Ok(deleted)
    }

    async fn create_contact(&self, contact: &MailContact) -> SyncResult<()> {
        self.state.lock().unwrap().contacts.push(contact.clone());
        Ok(())
    }

    async fn create_contact_group(&self, name: &str, members: &[MailGroupMember]) -> SyncResult<()> {
        self.state
            .lock()
            .unwrap()
            .groups
            .push((name.to_string(), members.to_vec()));
        Ok(())
    }
}

#[derive(Debug, Default)]
struct ReporterState {
    deviation_reports: Vec<(String, Vec<Deviation>)>,
    failure_reports: Vec<(String, String)>,
}

/// Records every report it receives
#[derive(Debug, Clone, Default)]
pub struct MockReporter {
    state: Arc<Mutex<ReporterState>>,
}

impl MockReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn deviation_reports(&self) -> Vec<(String, Vec<Deviation>)> {
        self.state.lock().unwrap().deviation_reports.clone()
    }

    /// `(task name, rendered error)` pairs
    pub fn failure_reports(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().failure_reports.clone()
    }
}

#[async_trait]
impl Reporter for MockReporter {
    async fn send_deviation_report(&self, task_name: &str, deviations: &[Deviation]) -> SyncResult<()> {
        self.state
            .lock()
            .unwrap()
            .deviation_reports
            .push((task_name.to_string(), deviations.to_vec()));
        Ok(())
    }

    async fn send_failure_report(&self, task_name: &str, error: &SyncError) -> SyncResult<()> {
        self.state
            .lock()
            .unwrap()
            .failure_reports
            .push((task_name.to_string(), error.to_string()));
        Ok(())
    }
}
