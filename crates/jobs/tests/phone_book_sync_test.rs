mod common;

use std::sync::Arc;

use common::*;
use syncer_config::{PhoneBookSettings, PopulationRules};
use syncer_core::{PhoneBookContact, SyncError};
use syncer_dispatcher::Runnable;
use syncer_jobs::PhoneBookSyncJob;
use syncer_testing_utils::{
    utc_date, ContactInfoBuilder, MembershipBuilder, MockPhoneBook, MockSourceDirectory,
    PersonBuilder,
};

const TAG_ID: &str = "tag-1";
const TAG_ALIAS: &str = "Eltern";

fn source() -> MockSourceDirectory {
    let source = MockSourceDirectory::new(ROOT_GROUP);

    // Anna: 家庭电话与一个个人号码重复
    source.add_person(PersonBuilder::new(10).name("Anna", "Berg").address(100).build());
    source.add_membership(MembershipBuilder::new(ROOT_GROUP, 10).build());
    source.add_membership(MembershipBuilder::new(CLASS_GROUP, 10).build());
    source.add_address_contact(100, ContactInfoBuilder::telephone("0821 / 123-45").build());
    source.add_person_contact(
        10,
        ContactInfoBuilder::mobile("+49 170 1234567").order(1).build(),
    );
    source.add_person_contact(10, ContactInfoBuilder::telephone("082112345").order(2).build());

    // 没有个人号码的学生
    source.add_person(PersonBuilder::new(11).name("Ben", "Berg").address(100).build());
    source.add_membership(MembershipBuilder::new(ROOT_GROUP, 11).build());

    // 已离开
    source.add_person(PersonBuilder::new(12).name("Carl", "Dorn").build());
    source.add_membership(
        MembershipBuilder::new(ROOT_GROUP, 12)
            .exit(utc_date(2023, 7, 31))
            .build(),
    );
    source.add_person_contact(12, ContactInfoBuilder::mobile("0171 555").build());

    // 不在 CLASS_GROUP 中
    source.add_person(PersonBuilder::new(13).name("Dora", "Eck").build());
    source.add_membership(MembershipBuilder::new(ROOT_GROUP, 13).build());
    source.add_person_contact(13, ContactInfoBuilder::mobile("0172 777").build());

    source
}

fn phone_book() -> MockPhoneBook {
    let book = MockPhoneBook::with_tag(TAG_ID, TAG_ALIAS);
    book.add_contact(
        TAG_ID,
        PhoneBookContact {
            first_name: "Alt".to_string(),
            last_name: "Eintrag".to_string(),
            home_phone: None,
            phone_numbers: vec!["0821999".to_string()],
        },
    );
    book.add_contact(
        "tag-2",
        PhoneBookContact {
            first_name: "Haus".to_string(),
            last_name: "Meister".to_string(),
            home_phone: None,
            phone_numbers: vec!["0821111".to_string()],
        },
    );
    book
}

fn job(
    population: PopulationRules,
    source: &MockSourceDirectory,
    book: &MockPhoneBook,
) -> PhoneBookSyncJob {
    PhoneBookSyncJob::new(
        PhoneBookSettings {
            tag_alias: TAG_ALIAS.to_string(),
            population,
        },
        Arc::new(source.clone()),
        Arc::new(book.clone()),
    )
}

fn anna() -> PhoneBookContact {
    PhoneBookContact {
        first_name: "Anna".to_string(),
        last_name: "Berg".to_string(),
        home_phone: Some("082112345".to_string()),
        phone_numbers: vec!["491701234567".to_string()],
    }
}

#[tokio::test]
async fn test_recreates_contacts_of_active_persons_with_phones() {
    let source = source();
    let book = phone_book();
    let mut ctx = context("starface");

    job(PopulationRules::default(), &source, &book)
        .run(&mut ctx)
        .await
        .unwrap();

    let contacts = book.contacts_for_tag(TAG_ID);
    assert_eq!(contacts.len(), 2);
    assert_eq!(contacts[0], anna());
    assert_eq!(contacts[1].last_name, "Eck");
    assert_eq!(book.contacts_for_tag("tag-2").len(), 1);
    assert!(ctx.deviations().is_empty());
}

#[tokio::test]
async fn test_population_rules_restrict_candidates() {
    let source = source();
    let book = phone_book();

    job(groups(&[CLASS_GROUP]), &source, &book)
        .run(&mut context("starface"))
        .await
        .unwrap();

    assert_eq!(book.contacts_for_tag(TAG_ID), vec![anna()]);
}

#[tokio::test]
async fn test_two_runs_yield_identical_phone_book() {
    let source = source();
    let book = phone_book();
    let job = job(PopulationRules::default(), &source, &book);

    job.run(&mut context("starface")).await.unwrap();
    let first = book.contacts_for_tag(TAG_ID);
    job.run(&mut context("starface")).await.unwrap();

    assert_eq!(book.contacts_for_tag(TAG_ID), first);
    assert_eq!(book.contact_count(), 3);
}

#[tokio::test]
async fn test_unknown_tag_is_configuration_error() {
    let source = source();
    let book = MockPhoneBook::with_tag(TAG_ID, "Kollegium");

    let err = job(PopulationRules::default(), &source, &book)
        .run(&mut context("starface"))
        .await
        .unwrap_err();

    assert!(matches!(err, SyncError::Configuration(_)));
}

#[tokio::test]
async fn test_unreachable_source_leaves_phone_book_untouched() {
    let source = source();
    source.set_unavailable(true);
    let book = phone_book();

    let err = job(PopulationRules::default(), &source, &book)
        .run(&mut context("starface"))
        .await
        .unwrap_err();

    assert!(err.is_fatal_to_run());
    assert_eq!(book.contact_count(), 2);
}

#[tokio::test]
async fn test_failed_recreate_surfaces_error() {
    let source = source();
    let book = phone_book();
    book.set_fail_creates(true);

    let err = job(PopulationRules::default(), &source, &book)
        .run(&mut context("starface"))
        .await
        .unwrap_err();

    assert!(matches!(err, SyncError::CollaboratorUnavailable { .. }));
    assert!(book.contacts_for_tag(TAG_ID).is_empty());
}
