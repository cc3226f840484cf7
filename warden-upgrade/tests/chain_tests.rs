//! End-to-end tests of the upgrade chain over raw documents

use anyhow::Result;
use serde_json::json;
use warden_core::model::{MODEL_VERSION, RoleKey};
use warden_core::validation::Validator;
use warden_core::Error;
use warden_upgrade::{ConfigurationUpgrader, DataUpgrader, Upgrader, UpgraderRegistry};

fn document_2_0_4() -> Vec<u8> {
    json!({
        "version": "2.0.4",
        "users": [
            {"id": "admin", "name": "Administrator", "email": "admin@example.com", "status": "active"},
            {"id": "anonymous", "status": "disabled"}
        ],
        "roles": [
            {"id": "admin", "name": "Admin", "readOnly": true, "roles": ["deployer"], "privileges": ["1"]},
            {"id": "deployer", "name": "Deployer", "roles": ["viewer"], "privileges": ["2"]},
            {"id": "viewer", "name": "Viewer", "privileges": ["3"]}
        ],
        "privileges": [
            {"id": "1", "name": "Delete", "type": "method", "properties": [{"key": "method", "value": "delete"}]},
            {"id": "2", "name": "Create", "type": "method", "properties": [
                {"key": "method", "value": "create"},
                {"key": "permission", "value": "artifact"}
            ]},
            {"id": "3", "name": "Read", "type": "method", "properties": [{"key": "method", "value": "read"}]}
        ],
        "userRoleMappings": [
            {"userId": "admin", "source": "default", "roles": ["admin"]},
            {"userId": "jdoe", "source": "ldap", "roles": ["viewer"]}
        ]
    })
    .to_string()
    .into_bytes()
}

#[test]
fn test_upgrade_from_2_0_4_reaches_current_version() -> Result<()> {
    let registry = UpgraderRegistry::standard();
    let configuration = ConfigurationUpgrader::new(&registry).load_old_configuration(&document_2_0_4())?;

    assert_eq!(configuration.version, MODEL_VERSION);
    assert_eq!(configuration.roles.len(), 3);
    assert!(configuration.roles[0].roles.contains(&RoleKey::local("deployer")));
    assert!(configuration.roles[1].roles.contains(&RoleKey::local("viewer")));
    assert!(configuration.user_role_mappings[1].roles.contains(&RoleKey::local("viewer")));
    assert!(configuration.users.iter().all(|u| u.source == "default"));

    let methods: Vec<Option<&str>> = configuration
        .privileges
        .iter()
        .map(|p| p.property("method"))
        .collect();
    assert_eq!(methods, vec![Some("delete,read"), Some("create,read"), Some("read")]);
    Ok(())
}

#[test]
fn test_upgraded_document_is_valid() -> Result<()> {
    let registry = UpgraderRegistry::standard();
    let configuration = ConfigurationUpgrader::new(&registry).load_old_configuration(&document_2_0_4())?;

    let response = Validator::new().validate_model(&configuration);
    assert!(response.is_valid(), "{}", response);
    Ok(())
}

#[test]
fn test_upgrade_from_2_3_0() -> Result<()> {
    let document = json!({
        "version": "2.3.0",
        "users": [{"id": "admin"}],
        "roles": [{"key": {"id": "admin", "source": "default"}, "name": "Admin", "privileges": ["1"]}],
        "privileges": [
            {"id": "1", "name": "Update", "type": "method", "properties": [{"key": "method", "value": "update"}]}
        ],
        "userRoleMappings": [
            {"userId": "admin", "source": "default", "roles": [{"id": "admin", "source": "default"}]}
        ]
    });

    let registry = UpgraderRegistry::standard();
    let configuration =
        ConfigurationUpgrader::new(&registry).load_old_configuration(document.to_string().as_bytes())?;

    assert!(configuration.is_current());
    assert_eq!(configuration.privileges[0].property("method"), Some("update,read"));
    Ok(())
}

#[test]
fn test_missing_intermediate_step_names_original_version() {
    let registry = UpgraderRegistry::new().with_upgrader(Upgrader::From2_0_4);
    let error = ConfigurationUpgrader::new(&registry)
        .load_old_configuration(&document_2_0_4())
        .unwrap_err();

    match error {
        Error::UnsupportedSchemaVersion(version) => assert_eq!(version, "2.0.4"),
        other => panic!("unexpected error: {}", other),
    }
}

#[test]
fn test_data_upgrader_is_optional() -> Result<()> {
    let registry = UpgraderRegistry::new()
        .with_upgrader(Upgrader::From2_0_4)
        .with_upgrader(Upgrader::From2_3_0);
    let configuration = ConfigurationUpgrader::new(&registry).load_old_configuration(&document_2_0_4())?;

    assert_eq!(configuration.privileges[0].property("method"), Some("delete"));
    Ok(())
}

#[test]
fn test_data_upgrader_runs_after_its_version_step() -> Result<()> {
    // Registered under 2.0.4 it would see a 2.3.0 document, which it cannot migrate.
    let registry = UpgraderRegistry::standard()
        .with_data_upgrader("2.0.4", DataUpgrader::privilege_inheritance());
    let error = ConfigurationUpgrader::new(&registry)
        .load_old_configuration(&document_2_0_4())
        .unwrap_err();

    assert!(matches!(error, Error::ConfigurationCorrupted(_)));
    Ok(())
}

#[test]
fn test_unreadable_legacy_document_is_corrupted() {
    let registry = UpgraderRegistry::standard();
    let error = ConfigurationUpgrader::new(&registry)
        .load_old_configuration(br#"{"version": "2.0.4", "roles": "not a list"}"#)
        .unwrap_err();

    assert!(matches!(error, Error::ConfigurationCorrupted(_)));
}
