//! CRUD behaviour of the authorization manager

mod common;

use anyhow::Result;
use common::{CapturedLogs, memory_manager, seeded_manager};
use serde_json::json;
use std::sync::Arc;
use warden::prelude::*;

/// Manager over a document holding role `x`, privilege `p`, and a role with
/// a blank source that references both. The store keeps such a record when it
/// is loaded but refuses to write it back.
fn manager_with_unwritable_reference() -> Result<(AuthorizationManager, Arc<MemoryConfigurationSource>)> {
    common::init_tracing();
    let document = json!({
        "version": MODEL_VERSION,
        "privileges": [
            {"id": "p", "name": "P", "type": "method", "properties": {"method": "read"}}
        ],
        "roles": [
            {"key": {"id": "x", "source": "default"}, "name": "X"},
            {"key": {"id": "legacy", "source": ""}, "name": "Legacy",
             "roles": [{"id": "x", "source": "default"}], "privileges": ["p"]},
            {"key": {"id": "holder", "source": "default"}, "name": "Holder",
             "roles": [{"id": "x", "source": "default"}], "privileges": ["p"]}
        ]
    });
    let source = Arc::new(MemoryConfigurationSource::from_bytes(document.to_string()));
    let manager = AuthorizationManager::builder()
        .with_shared_source(source.clone())
        .build()?;
    manager.load()?;
    Ok((manager, source))
}

#[test]
fn test_created_privilege_inherits_read() -> Result<()> {
    let (manager, _) = memory_manager()?;

    let privilege = manager.create_privilege(Privilege::method("1001", "Create", "create"))?;

    assert_eq!(privilege.property("method"), Some("create,read"));
    assert_eq!(
        manager.get_privilege("1001")?.property("method"),
        Some("create,read")
    );
    Ok(())
}

#[test]
fn test_created_entity_is_listed_once() -> Result<()> {
    let (manager, _) = seeded_manager()?;

    let role = manager.get_role(&RoleKey::local("viewer"))?;
    assert_eq!(role.name, "Viewer");

    let listed = manager
        .list_roles()?
        .into_iter()
        .filter(|r| r.key == RoleKey::local("viewer"))
        .count();
    assert_eq!(listed, 1);
    Ok(())
}

#[test]
fn test_role_with_missing_contained_role_is_rejected() -> Result<()> {
    let (manager, source) = memory_manager()?;

    let error = manager
        .create_role(Role::new(RoleKey::local("role1"), "Role 1").with_role(RoleKey::local("role2")))
        .unwrap_err();

    let response = error
        .validation_response()
        .ok_or_else(|| anyhow::anyhow!("expected a validation error, got {}", error))?;
    assert!(response.errors.iter().any(|e| e.message.contains("role2")));
    assert!(manager.list_roles()?.is_empty());
    assert_eq!(source.store_count(), 0);
    Ok(())
}

#[test]
fn test_unchanged_update_is_idempotent() -> Result<()> {
    let (manager, _) = seeded_manager()?;
    let before = manager.configuration()?;

    let role = manager.get_role(&RoleKey::local("editor"))?;
    manager.update_role(role)?;
    let privilege = manager.get_privilege("read")?;
    manager.update_privilege(privilege)?;
    let user = manager.get_security_user("jdoe")?;
    let (user, roles) = user.into_parts();
    manager.update_user(user, roles)?;

    assert_eq!(manager.configuration()?, before);
    Ok(())
}

#[test]
fn test_deleting_missing_entities_is_not_found() -> Result<()> {
    let (manager, source) = seeded_manager()?;
    let before = manager.configuration()?;
    let stores = source.store_count();

    assert!(manager.delete_user("nobody").unwrap_err().is_not_found());
    assert!(manager.delete_role(&RoleKey::local("nobody")).unwrap_err().is_not_found());
    assert!(manager.delete_privilege("nobody").unwrap_err().is_not_found());
    assert!(manager
        .delete_user_role_mapping("nobody", "default")
        .unwrap_err()
        .is_not_found());
    assert!(manager.delete_role_mapping("ldap", "nobody").unwrap_err().is_not_found());

    assert_eq!(manager.configuration()?, before);
    assert_eq!(source.store_count(), stores);
    Ok(())
}

#[test]
fn test_updating_missing_entities_is_not_found() -> Result<()> {
    let (manager, _) = seeded_manager()?;

    assert!(manager.update_user(User::local("nobody"), []).unwrap_err().is_not_found());
    assert!(manager
        .update_role(Role::new(RoleKey::local("nobody"), "Nobody"))
        .unwrap_err()
        .is_not_found());
    assert!(manager
        .update_privilege(Privilege::method("nobody", "Nobody", "read"))
        .unwrap_err()
        .is_not_found());
    assert!(manager
        .update_role_mapping(RoleMapping::new("ldap", "nobody", []))
        .unwrap_err()
        .is_not_found());
    Ok(())
}

#[test]
fn test_read_only_role_cannot_change() -> Result<()> {
    let (manager, _) = seeded_manager()?;
    let admin = manager.get_role(&RoleKey::local("admin"))?;

    let update = manager.update_role(admin.clone().with_privilege("read")).unwrap_err();
    assert!(matches!(update, Error::Validation(_)));

    let delete = manager.delete_role(&admin.key).unwrap_err();
    assert!(matches!(delete, Error::Validation(_)));

    assert_eq!(manager.get_role(&admin.key)?, admin);
    Ok(())
}

#[test]
fn test_read_only_privilege_cannot_be_deleted() -> Result<()> {
    let (manager, _) = memory_manager()?;
    manager.create_privilege(Privilege::method("system", "System", "read").read_only())?;

    assert!(matches!(
        manager.delete_privilege("system").unwrap_err(),
        Error::Validation(_)
    ));
    assert!(manager.get_privilege("system").is_ok());
    Ok(())
}

#[test]
fn test_create_user_replaces_leftover_mapping() -> Result<()> {
    let (manager, _) = seeded_manager()?;
    manager.create_user_role_mapping(UserRoleMapping::new(
        "jsmith",
        "ldap",
        [RoleKey::local("viewer")],
    ))?;

    manager.create_user(User::new("JSmith", "ldap"), [RoleKey::local("editor")])?;

    let mapping = manager.get_user_role_mapping("jsmith", "ldap")?;
    assert_eq!(mapping.user_id, "JSmith");
    assert_eq!(
        mapping.roles.iter().collect::<Vec<_>>(),
        vec![&RoleKey::local("editor")]
    );
    assert_eq!(manager.list_user_role_mappings()?.len(), 2);
    Ok(())
}

#[test]
fn test_deleting_user_removes_its_mapping() -> Result<()> {
    let (manager, _) = seeded_manager()?;

    manager.delete_user("jdoe")?;

    assert!(manager.get_user("jdoe").unwrap_err().is_not_found());
    assert!(manager
        .get_user_role_mapping("jdoe", "default")
        .unwrap_err()
        .is_not_found());
    Ok(())
}

#[test]
fn test_user_ids_are_global() -> Result<()> {
    let (manager, _) = seeded_manager()?;

    let error = manager
        .create_user(User::new("jdoe", "ldap"), [])
        .unwrap_err();
    assert!(matches!(error, Error::Validation(_)));
    Ok(())
}

#[test]
fn test_duplicate_email_follows_policy() -> Result<()> {
    let (manager, _) = seeded_manager()?;
    let duplicate = User::local("jsmith").with_email("JDOE@example.com");

    assert!(manager.create_user(duplicate.clone(), []).is_err());

    let lenient = AuthorizationManager::builder()
        .with_settings(WardenSettings::development())
        .with_source(MemoryConfigurationSource::from_configuration(&manager.configuration()?)?)
        .build()?;
    assert!(lenient.create_user(duplicate, []).is_ok());
    Ok(())
}

#[test]
fn test_user_role_mapping_lookup_ignores_case() -> Result<()> {
    let (manager, _) = seeded_manager()?;

    let upper = manager.get_user_role_mapping("JDOE", "default")?;
    let lower = manager.get_user_role_mapping("jdoe", "default")?;
    assert_eq!(upper, lower);

    let error = manager
        .create_user_role_mapping(UserRoleMapping::new("JDoe", "default", []))
        .unwrap_err();
    assert!(matches!(error, Error::Validation(_)));
    Ok(())
}

#[test]
fn test_local_mapping_requires_existing_user() -> Result<()> {
    let (manager, _) = seeded_manager()?;

    assert!(manager
        .create_user_role_mapping(UserRoleMapping::new("ghost", "default", []))
        .is_err());

    let external = manager.create_user_role_mapping(UserRoleMapping::new(
        "ghost",
        "ldap",
        [RoleKey::local("viewer")],
    ))?;
    assert_eq!(manager.get_user_role_mapping("Ghost", "ldap")?, external);
    Ok(())
}

#[test]
fn test_deleting_privilege_cascades_to_roles() -> Result<()> {
    let (manager, _) = seeded_manager()?;

    manager.delete_privilege("read")?;

    let viewer = manager.get_role(&RoleKey::local("viewer"))?;
    assert!(viewer.privileges.is_empty());
    Ok(())
}

#[test]
fn test_deleting_role_cascades_everywhere() -> Result<()> {
    let (manager, _) = seeded_manager()?;
    manager.create_role_mapping(RoleMapping::new(
        "ldap",
        "developers",
        [RoleKey::local("viewer"), RoleKey::local("editor")],
    ))?;

    manager.delete_role(&RoleKey::local("editor"))?;

    let admin = manager.get_role(&RoleKey::local("admin"))?;
    assert!(admin.roles.is_empty());
    assert!(manager.get_user_role_mapping("jdoe", "default")?.roles.is_empty());
    let mapping = manager.get_role_mapping("ldap", "developers")?;
    assert_eq!(
        mapping.roles.iter().collect::<Vec<_>>(),
        vec![&RoleKey::local("viewer")]
    );
    Ok(())
}

#[test]
fn test_cascade_can_be_disabled() -> Result<()> {
    let settings = WardenSettings {
        cascade_on_delete: false,
        persistence_enabled: false,
        ..WardenSettings::default()
    };
    let manager = AuthorizationManager::builder()
        .with_settings(settings)
        .with_source(MemoryConfigurationSource::new())
        .build()?;
    manager.create_privilege(Privilege::method("read", "Read", "read"))?;
    manager.create_role(Role::new(RoleKey::local("viewer"), "Viewer").with_privilege("read"))?;

    manager.delete_privilege("read")?;

    assert!(manager
        .get_role(&RoleKey::local("viewer"))?
        .privileges
        .contains("read"));
    Ok(())
}

#[test]
fn test_containment_cycle_is_rejected() -> Result<()> {
    let (manager, _) = seeded_manager()?;

    let viewer = manager
        .get_role(&RoleKey::local("viewer"))?
        .with_role(RoleKey::local("editor"));
    let error = manager.update_role(viewer).unwrap_err();

    let response = error
        .validation_response()
        .ok_or_else(|| anyhow::anyhow!("expected a validation error"))?;
    assert_eq!(
        response
            .errors
            .iter()
            .filter(|e| e.message.contains("cycle"))
            .count(),
        2
    );
    assert!(manager.get_role(&RoleKey::local("viewer"))?.roles.is_empty());
    Ok(())
}

#[test]
fn test_role_name_defaults_to_id() -> Result<()> {
    let (manager, _) = memory_manager()?;

    let role = manager.create_role(Role::new(RoleKey::local("auditor"), ""))?;

    assert_eq!(role.name, "auditor");
    assert_eq!(manager.get_role(&role.key)?.name, "auditor");
    Ok(())
}

#[test]
fn test_persistence_failure_keeps_in_memory_change() -> Result<()> {
    let (manager, source) = memory_manager()?;
    source.fail_stores(true);

    let error = manager
        .create_privilege(Privilege::method("p", "P", "read"))
        .unwrap_err();

    assert!(matches!(error, Error::Persistence(_)));
    assert!(error.is_recoverable());
    assert!(manager.get_privilege("p").is_ok());
    Ok(())
}

#[test]
fn test_security_model_round_trip() -> Result<()> {
    let (manager, _) = seeded_manager()?;

    let roles = manager.list_security_roles()?;
    assert_eq!(roles.len(), 3);

    let mut copy = roles
        .into_iter()
        .find(|r| r.role_id == "editor")
        .ok_or_else(|| anyhow::anyhow!("editor missing"))?;
    copy.role_id = "editor2".to_string();
    copy.name = "Editor 2".to_string();
    let stored = manager.add_security_role(copy)?;
    assert!(stored.privileges.contains("write"));

    let privileges = manager.list_security_privileges()?;
    assert!(privileges.iter().any(|p| p.id == "write"));
    Ok(())
}

#[tokio::test]
async fn test_listeners_are_notified() -> Result<()> {
    let (manager, _) = memory_manager()?;
    let mut events = manager.subscribe();

    manager.create_privilege(Privilege::method("p", "P", "read"))?;
    assert!(manager.create_role(Role::new(RoleKey::local("r"), "R").with_privilege("missing")).is_err());
    manager.clear_cache();

    assert_eq!(
        events.recv().await?,
        AuthorizationEvent::ConfigurationChanged {
            kind: EntityKind::Privilege,
            change: ChangeKind::Created,
            id: "p".to_string(),
        }
    );
    assert_eq!(events.recv().await?, AuthorizationEvent::CacheCleared);
    Ok(())
}

#[test]
fn test_role_cascade_skips_unwritable_reference() -> Result<()> {
    let (manager, source) = manager_with_unwritable_reference()?;
    let mut events = manager.subscribe();
    let x = RoleKey::local("x");

    let (result, logs) = CapturedLogs::capture(|| manager.delete_role(&x));
    result?;

    assert!(manager.get_role(&x).unwrap_err().is_not_found());
    assert!(manager.get_role(&RoleKey::local("holder"))?.roles.is_empty());
    assert!(manager
        .get_role(&RoleKey::new("legacy", ""))?
        .roles
        .contains(&x));
    assert!(logs.contents().contains("Could not remove deleted role from role"));

    assert_eq!(source.store_count(), 1);
    let stored = source.stored_configuration()?;
    assert!(stored.roles.iter().all(|role| role.key != x));

    assert_eq!(
        events.try_recv()?,
        AuthorizationEvent::ConfigurationChanged {
            kind: EntityKind::Role,
            change: ChangeKind::Deleted,
            id: "default:x".to_string(),
        }
    );
    assert!(events.try_recv().is_err());
    Ok(())
}

#[test]
fn test_privilege_cascade_skips_unwritable_reference() -> Result<()> {
    let (manager, source) = manager_with_unwritable_reference()?;

    let (result, logs) = CapturedLogs::capture(|| manager.delete_privilege("p"));
    result?;

    assert!(manager.get_privilege("p").unwrap_err().is_not_found());
    assert!(manager.get_role(&RoleKey::local("holder"))?.privileges.is_empty());
    assert!(logs.contents().contains("Could not remove deleted privilege from role"));
    assert!(source.stored_configuration()?.privileges.is_empty());
    Ok(())
}

#[test]
fn test_rejected_create_keeps_leftover_mapping() -> Result<()> {
    let (manager, source) = seeded_manager()?;
    manager.create_user_role_mapping(UserRoleMapping::new(
        "jsmith",
        "ldap",
        [RoleKey::local("viewer")],
    ))?;
    let before = manager.configuration()?;
    let stores = source.store_count();

    let duplicate_email = User::new("jsmith", "ldap").with_email("jdoe@example.com");
    assert!(manager
        .create_user(duplicate_email, [RoleKey::local("editor")])
        .is_err());

    assert_eq!(manager.configuration()?, before);
    assert_eq!(source.store_count(), stores);
    Ok(())
}
