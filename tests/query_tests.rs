//! Role trees, effective privileges, external roles and user search

mod common;

use anyhow::Result;
use common::seeded_manager;
use warden::prelude::*;

#[test]
fn test_role_tree_expands_contained_roles() -> Result<()> {
    let (manager, _) = seeded_manager()?;

    let tree = manager.role_tree("jdoe", DEFAULT_SOURCE)?;

    assert_eq!(tree.len(), 1);
    let editor = &tree[0];
    assert_eq!(editor.key, RoleKey::local("editor"));
    assert_eq!(editor.privileges, vec!["write".to_string()]);
    assert_eq!(editor.children.len(), 1);
    assert_eq!(editor.children[0].key, RoleKey::local("viewer"));
    assert_eq!(
        editor.keys(),
        vec![&RoleKey::local("editor"), &RoleKey::local("viewer")]
    );
    Ok(())
}

#[test]
fn test_role_tree_of_unmapped_user_is_empty() -> Result<()> {
    let (manager, _) = seeded_manager()?;

    assert!(manager.role_tree("jdoe", "ldap")?.is_empty());
    assert!(manager.role_tree("nobody", DEFAULT_SOURCE)?.is_empty());
    Ok(())
}

#[test]
fn test_role_tree_survives_cycles_in_loaded_data() -> Result<()> {
    common::init_tracing();
    let mut configuration = Configuration::new();
    configuration.roles = vec![
        Role::new(RoleKey::local("a"), "A").with_role(RoleKey::local("b")),
        Role::new(RoleKey::local("b"), "B")
            .with_role(RoleKey::local("a"))
            .with_privilege("p"),
    ];
    configuration.users.push(User::local("u"));
    configuration
        .user_role_mappings
        .push(UserRoleMapping::new("u", DEFAULT_SOURCE, [RoleKey::local("a")]));

    let manager = AuthorizationManager::builder()
        .with_settings(WardenSettings::development())
        .with_source(MemoryConfigurationSource::from_configuration(&configuration)?)
        .build()?;

    let tree = manager.role_tree("u", DEFAULT_SOURCE)?;
    assert_eq!(
        tree[0].keys(),
        vec![&RoleKey::local("a"), &RoleKey::local("b")]
    );
    assert_eq!(
        manager.effective_privileges("u", DEFAULT_SOURCE)?.into_iter().collect::<Vec<_>>(),
        vec!["p".to_string()]
    );
    Ok(())
}

#[test]
fn test_effective_privileges_follow_containment() -> Result<()> {
    let (manager, _) = seeded_manager()?;

    let privileges = manager.effective_privileges("JDOE", DEFAULT_SOURCE)?;
    assert_eq!(
        privileges.into_iter().collect::<Vec<_>>(),
        vec!["write".to_string(), "read".to_string()]
    );

    let admin = manager.privileges_for_roles([RoleKey::local("admin")])?;
    assert_eq!(admin.len(), 2);
    assert!(manager.privileges_for_roles([RoleKey::local("gone")])?.is_empty());
    Ok(())
}

#[test]
fn test_external_roles_resolve_ignoring_case() -> Result<()> {
    let (manager, _) = seeded_manager()?;
    manager.create_role_mapping(RoleMapping::new(
        "ldap",
        "Developers",
        [RoleKey::local("editor")],
    ))?;
    manager.create_role_mapping(RoleMapping::new(
        "ldap",
        "Auditors",
        [RoleKey::local("viewer"), RoleKey::local("editor")],
    ))?;

    let resolved = manager.resolve_external_roles("ldap", &["developers", "AUDITORS", "unknown"])?;
    assert_eq!(
        resolved.iter().collect::<Vec<_>>(),
        vec![&RoleKey::local("editor"), &RoleKey::local("viewer")]
    );

    assert!(manager.resolve_external_roles("crowd", &["developers"])?.is_empty());
    Ok(())
}

#[test]
fn test_search_users() -> Result<()> {
    let (manager, _) = seeded_manager()?;
    manager.create_user(
        User::local("jsmith").with_email("jsmith@example.com"),
        [RoleKey::local("viewer")],
    )?;
    manager.create_user(User::local("admin"), [RoleKey::local("admin")])?;

    let ids = |criteria: UserSearchCriteria| -> Result<Vec<String>> {
        Ok(manager
            .search_users(&criteria)?
            .into_iter()
            .map(|u| u.id)
            .collect())
    };

    assert_eq!(ids(UserSearchCriteria::new())?.len(), 3);
    assert_eq!(ids(UserSearchCriteria::new().with_user_id("J"))?, vec!["jdoe", "jsmith"]);
    assert_eq!(
        ids(UserSearchCriteria::new().with_email("JSMITH@example.com"))?,
        vec!["jsmith"]
    );
    assert_eq!(
        ids(UserSearchCriteria::new()
            .with_role(RoleKey::local("viewer"))
            .with_role(RoleKey::local("admin")))?,
        vec!["jsmith", "admin"]
    );
    assert!(ids(UserSearchCriteria::new().with_source("ldap"))?.is_empty());
    Ok(())
}
