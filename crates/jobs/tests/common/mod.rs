#![allow(dead_code)]

use syncer_config::{PopulationRules, RuleEntry};
use syncer_core::{Deviation, PersonId};
use syncer_dispatcher::JobContext;
use syncer_testing_utils::{
    reference_now, ContactInfoBuilder, MembershipBuilder, MockSourceDirectory, PersonBuilder,
};

pub const ROOT_GROUP: i64 = 1;
pub const STAFF_GROUP: i64 = 20;
pub const CLASS_GROUP: i64 = 30;

pub fn context(task_name: &str) -> JobContext {
    JobContext::new(task_name, reference_now())
}

pub fn messages(ctx: &JobContext) -> Vec<String> {
    ctx.deviations()
        .entries()
        .iter()
        .map(|deviation: &Deviation| deviation.message.clone())
        .collect()
}

pub fn groups(ids: &[i64]) -> PopulationRules {
    PopulationRules {
        groups: ids.iter().copied().map(RuleEntry::new).collect(),
        ..PopulationRules::default()
    }
}

/// 在根组中登记一名带用户名的在籍人员
pub fn enrol(
    source: &MockSourceDirectory,
    id: PersonId,
    first: &str,
    last: &str,
    username: &str,
) {
    source.add_person(PersonBuilder::new(id).name(first, last).build());
    source.add_membership(
        MembershipBuilder::new(ROOT_GROUP, id)
            .attribute("username", username)
            .build(),
    );
}

pub fn add_work_email(source: &MockSourceDirectory, id: PersonId, address: &str) {
    source.add_person_contact(
        id,
        ContactInfoBuilder::email(address).kind("work").person(id).build(),
    );
}

pub fn add_private_email(source: &MockSourceDirectory, id: PersonId, address: &str) {
    source.add_person_contact(
        id,
        ContactInfoBuilder::email(address)
            .kind("private")
            .person(id)
            .build(),
    );
}
