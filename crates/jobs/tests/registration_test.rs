use std::sync::Arc;

use serde_json::json;
use syncer_config::TaskDocument;
use syncer_core::SyncError;
use syncer_dispatcher::TaskRegistry;
use syncer_jobs::{
    register_builtin_jobs, Collaborators, DirectoryOptions, DIRECTORY_SYNC, INTEGRITY_CHECK,
    MAIL_CONTACTS_SYNC, PHONE_BOOK_SYNC,
};
use syncer_testing_utils::{MockDirectoryService, MockPhoneBook, MockSourceDirectory};

fn document(value: serde_json::Value) -> TaskDocument {
    TaskDocument::from_json(&value.to_string()).unwrap()
}

fn registry(collaborators: Collaborators) -> TaskRegistry {
    let mut registry = TaskRegistry::new();
    register_builtin_jobs(&mut registry, collaborators);
    registry
}

#[test]
fn test_all_builtin_types_are_registered() {
    let registry = registry(Collaborators::new(Arc::new(MockSourceDirectory::new(1))));

    for tag in [DIRECTORY_SYNC, PHONE_BOOK_SYNC, MAIL_CONTACTS_SYNC, INTEGRITY_CHECK] {
        assert!(registry.contains(tag), "{tag} not registered");
    }
}

#[test]
fn test_builds_job_with_configured_collaborator() {
    let mut collaborators = Collaborators::new(Arc::new(MockSourceDirectory::new(1)));
    collaborators.phone_book = Some(Arc::new(MockPhoneBook::new()));
    collaborators.directory = Some((
        Arc::new(MockDirectoryService::new()),
        DirectoryOptions {
            username_attribute: "username".to_string(),
            mail_as_upn: false,
            initial_password_template: "Start{id}#{id}".to_string(),
        },
    ));
    let registry = registry(collaborators);

    let phone_book = registry
        .build(&document(json!({
            "type": "starface",
            "cron": "0 0 3 * * *",
            "tagAlias": "Eltern"
        })))
        .unwrap();
    assert_eq!(phone_book.job.task_type(), PHONE_BOOK_SYNC);

    let directory = registry
        .build(&document(json!({
            "type": "active-directory",
            "cron": "0 30 2 * * *",
            "userMappers": [{
                "name": "Kollegium",
                "groups": [{ "id": 20 }],
                "targetDN": "ou=Staff,dc=schule,dc=de"
            }]
        })))
        .unwrap();
    assert_eq!(directory.job.task_type(), DIRECTORY_SYNC);
}

#[test]
fn test_missing_collaborator_is_configuration_error() {
    let registry = registry(Collaborators::new(Arc::new(MockSourceDirectory::new(1))));

    let err = registry
        .build(&document(json!({
            "type": "ews",
            "cron": "0 0 4 * * *",
            "groups": [{ "name": "Kollegium", "groups": [{ "id": 20, "emailType": "work" }] }]
        })))
        .unwrap_err();

    assert!(matches!(err, SyncError::Configuration(_)));
}

#[test]
fn test_invalid_settings_are_rejected() {
    let mut collaborators = Collaborators::new(Arc::new(MockSourceDirectory::new(1)));
    collaborators.phone_book = Some(Arc::new(MockPhoneBook::new()));
    let registry = registry(collaborators);

    let err = registry
        .build(&document(json!({
            "type": "starface",
            "cron": "0 0 3 * * *",
            "tagAlias": ""
        })))
        .unwrap_err();

    assert!(matches!(err, SyncError::InvalidTaskParams(_)));
}
