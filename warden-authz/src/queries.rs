//! Read-only questions about principals: role trees, effective privileges,
//! external role resolution and user search

use crate::manager::AuthorizationManager;
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use tracing::{debug, warn};
use warden_core::Result;
use warden_core::model::{RoleKey, User};
use warden_core::store::ConfigStore;

/// A role with its privileges and the roles it contains, expanded
/// recursively
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleTreeNode {
    pub key: RoleKey,
    pub name: String,
    pub privileges: Vec<String>,
    pub children: Vec<RoleTreeNode>,
}

impl RoleTreeNode {
    /// Every role key in this subtree, depth first
    pub fn keys(&self) -> Vec<&RoleKey> {
        let mut keys = vec![&self.key];
        for child in &self.children {
            keys.extend(child.keys());
        }
        keys
    }
}

/// Filter for [`AuthorizationManager::search_users`].
///
/// Every criterion that is set must match; an empty criteria matches all
/// users.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSearchCriteria {
    /// Case-insensitive prefix of the user id
    pub user_id: Option<String>,
    /// Exact source
    pub source: Option<String>,
    /// Case-insensitive email
    pub email: Option<String>,
    /// The user must hold at least one of these roles in its own source
    pub one_of_roles: BTreeSet<RoleKey>,
}

impl UserSearchCriteria {
    /// Criteria matching every user
    pub fn new() -> Self {
        Self::default()
    }

    /// Match user ids starting with `prefix`
    pub fn with_user_id(mut self, prefix: impl Into<String>) -> Self {
        self.user_id = Some(prefix.into());
        self
    }

    /// Match users of `source`
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Match users with `email`
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Match users holding `role`; may be given several times
    pub fn with_role(mut self, role: RoleKey) -> Self {
        self.one_of_roles.insert(role);
        self
    }

    fn matches(&self, user: &User, store: &ConfigStore) -> bool {
        if let Some(prefix) = &self.user_id {
            if !user.id.to_lowercase().starts_with(&prefix.to_lowercase()) {
                return false;
            }
        }

        if let Some(source) = &self.source {
            if &user.source != source {
                return false;
            }
        }

        if let Some(email) = &self.email {
            let same = user
                .email
                .as_deref()
                .is_some_and(|own| own.eq_ignore_ascii_case(email));
            if !same {
                return false;
            }
        }

        if !self.one_of_roles.is_empty() {
            let held = store
                .user_role_mapping(&user.id, &user.source)
                .is_some_and(|m| m.roles.iter().any(|r| self.one_of_roles.contains(r)));
            if !held {
                return false;
            }
        }

        true
    }
}

impl AuthorizationManager {
    /// Roles assigned to a user in a source, each expanded into the tree of
    /// roles it contains.
    ///
    /// A user without a mapping has no roles. Roles that no longer exist are
    /// skipped; a role already on the current path is not expanded again.
    pub fn role_tree(&self, user_id: &str, source: &str) -> Result<Vec<RoleTreeNode>> {
        self.read(|store| {
            let Some(mapping) = store.user_role_mapping(user_id, source) else {
                debug!(user = %user_id, source = %source, "No role mapping for user");
                return Vec::new();
            };

            let mut path = Vec::new();
            mapping
                .roles
                .iter()
                .filter_map(|key| expand(store, key, &mut path))
                .collect()
        })
    }

    /// Ids of every privilege granted to a user in a source, directly or
    /// through contained roles
    pub fn effective_privileges(&self, user_id: &str, source: &str) -> Result<IndexSet<String>> {
        self.read(|store| {
            let roles: Vec<RoleKey> = store
                .user_role_mapping(user_id, source)
                .map(|m| m.roles.iter().cloned().collect())
                .unwrap_or_default();
            collect_privileges(store, roles)
        })
    }

    /// Ids of every privilege granted by the given roles, directly or through
    /// contained roles
    pub fn privileges_for_roles(
        &self,
        roles: impl IntoIterator<Item = RoleKey>,
    ) -> Result<IndexSet<String>> {
        self.read(|store| collect_privileges(store, roles))
    }

    /// Internal roles bound to external roles of a source.
    ///
    /// External role ids are matched ignoring case; ids without a mapping are
    /// skipped.
    pub fn resolve_external_roles<S: AsRef<str>>(
        &self,
        source: &str,
        external_role_ids: &[S],
    ) -> Result<IndexSet<RoleKey>> {
        self.read(|store| {
            let mut resolved = IndexSet::new();
            for external in external_role_ids {
                match store.role_mapping(source, external.as_ref()) {
                    Some(mapping) => resolved.extend(mapping.roles.iter().cloned()),
                    None => {
                        debug!(source = %source, external = %external.as_ref(), "External role is not mapped")
                    }
                }
            }
            resolved
        })
    }

    /// Users matching the criteria, in store order
    pub fn search_users(&self, criteria: &UserSearchCriteria) -> Result<Vec<User>> {
        self.read(|store| {
            store
                .users()
                .filter(|user| criteria.matches(user, store))
                .cloned()
                .collect()
        })
    }
}

fn expand(store: &ConfigStore, key: &RoleKey, path: &mut Vec<RoleKey>) -> Option<RoleTreeNode> {
    let Some(role) = store.role(key) else {
        debug!(role = %key, "Skipping unknown role");
        return None;
    };

    if path.contains(key) {
        warn!(role = %key, "Role containment cycle, not expanding again");
        return None;
    }

    path.push(key.clone());
    let children = role
        .roles
        .iter()
        .filter_map(|child| expand(store, child, path))
        .collect();
    path.pop();

    Some(RoleTreeNode {
        key: role.key.clone(),
        name: role.name.clone(),
        privileges: role.privileges.iter().cloned().collect(),
        children,
    })
}

fn collect_privileges(
    store: &ConfigStore,
    roles: impl IntoIterator<Item = RoleKey>,
) -> IndexSet<String> {
    let mut privileges = IndexSet::new();
    let mut visited: HashSet<RoleKey> = HashSet::new();
    let mut pending: Vec<RoleKey> = roles.into_iter().collect();
    pending.reverse();

    while let Some(key) = pending.pop() {
        if !visited.insert(key.clone()) {
            continue;
        }
        let Some(role) = store.role(&key) else {
            debug!(role = %key, "Skipping unknown role");
            continue;
        };

        privileges.extend(role.privileges.iter().cloned());
        pending.extend(role.roles.iter().rev().cloned());
    }

    privileges
}

#[cfg(test)]
mod tests {
    use super::*;
    use warden_core::model::UserRoleMapping;

    fn store() -> ConfigStore {
        let mut store = ConfigStore::new();
        store
            .add_user(User::local("Alice").with_email("alice@example.com"))
            .unwrap();
        store.add_user(User::new("bob", "ldap")).unwrap();
        store
            .add_user_role_mapping(UserRoleMapping::new("alice", "default", [RoleKey::local("r")]))
            .unwrap();
        store
    }

    #[test]
    fn test_empty_criteria_matches_everyone() {
        let store = store();
        let criteria = UserSearchCriteria::new();
        assert!(store.users().all(|u| criteria.matches(u, &store)));
    }

    #[test]
    fn test_criteria_are_combined() {
        let store = store();
        let alice = store.user("Alice").unwrap();

        let criteria = UserSearchCriteria::new()
            .with_user_id("al")
            .with_email("ALICE@example.com")
            .with_role(RoleKey::local("r"));
        assert!(criteria.matches(alice, &store));

        let criteria = criteria.with_source("ldap");
        assert!(!criteria.matches(alice, &store));
    }

    #[test]
    fn test_role_criterion_uses_own_source() {
        let store = store();
        let bob = store.user("bob").unwrap();
        let criteria = UserSearchCriteria::new().with_role(RoleKey::local("r"));
        assert!(!criteria.matches(bob, &store));
    }
}
