//! Read-only identity snapshot used by the validator

use crate::model::*;
use crate::store::ConfigStore;
use indexmap::IndexSet;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

/// Snapshot of the identities and role graph a candidate entity is checked
/// against.
///
/// A context is usually built from the store with
/// [`ValidationContext::from_store`], but it can also be assembled by hand
/// (for example to validate a role graph that has not been stored yet).
/// When several entities are created in one batch, callers record each
/// admitted entity with the `record_*` methods so later candidates see it.
#[derive(Debug, Clone, Default)]
pub struct ValidationContext {
    /// Ids of existing users
    pub existing_user_ids: HashSet<String>,
    /// Email of each existing user, by user id
    pub existing_email_map: HashMap<String, String>,
    /// Ids of existing roles, grouped by source
    pub existing_role_ids: BTreeMap<String, BTreeSet<String>>,
    /// Contained roles of each existing role
    pub role_containment_map: HashMap<RoleKey, Vec<RoleKey>>,
    /// Name of each existing role
    pub existing_role_name_map: HashMap<RoleKey, String>,
    /// Ids of existing privileges
    pub existing_privilege_ids: HashSet<String>,
    /// Assigned roles of each user role mapping
    pub existing_user_role_map: HashMap<MappingKey, Vec<RoleKey>>,
}

impl ValidationContext {
    /// Create an empty context
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot the identities currently held by the store
    pub fn from_store(store: &ConfigStore) -> Self {
        Self::from_parts(
            store.users(),
            store.roles(),
            store.privileges(),
            store.user_role_mappings(),
        )
    }

    /// Snapshot the identities of a detached configuration document
    pub fn from_configuration(configuration: &Configuration) -> Self {
        Self::from_parts(
            &configuration.users,
            &configuration.roles,
            &configuration.privileges,
            &configuration.user_role_mappings,
        )
    }

    fn from_parts<'a>(
        users: impl IntoIterator<Item = &'a User>,
        roles: impl IntoIterator<Item = &'a Role>,
        privileges: impl IntoIterator<Item = &'a Privilege>,
        user_role_mappings: impl IntoIterator<Item = &'a UserRoleMapping>,
    ) -> Self {
        let mut context = Self::new();

        for user in users {
            context.record_user(user);
        }

        for role in roles {
            context.record_role(role);
        }

        for privilege in privileges {
            context.record_privilege_id(&privilege.id);
        }

        for mapping in user_role_mappings {
            context.record_user_roles(mapping);
        }

        context
    }

    /// Record an admitted user
    pub fn record_user(&mut self, user: &User) {
        self.existing_user_ids.insert(user.id.clone());
        if let Some(email) = &user.email {
            self.existing_email_map
                .insert(user.id.clone(), email.clone());
        }
    }

    /// Record an admitted role, including its containment edges and name
    pub fn record_role(&mut self, role: &Role) {
        self.add_existing_role_id(&role.key);
        self.role_containment_map
            .insert(role.key.clone(), role.roles.iter().cloned().collect());
        self.existing_role_name_map
            .insert(role.key.clone(), role.name.clone());
    }

    /// Record the assigned roles of a user role mapping
    pub fn record_user_roles(&mut self, mapping: &UserRoleMapping) {
        self.existing_user_role_map
            .insert(mapping.key(), mapping.roles.iter().cloned().collect());
    }

    /// Record only the identity of a role
    pub fn add_existing_role_id(&mut self, key: &RoleKey) {
        self.existing_role_ids
            .entry(key.source.clone())
            .or_default()
            .insert(key.id.clone());
    }

    /// Record an admitted privilege id
    pub fn record_privilege_id(&mut self, id: &str) {
        self.existing_privilege_ids.insert(id.to_string());
    }

    /// Whether a role with the given key exists
    pub fn role_exists(&self, key: &RoleKey) -> bool {
        self.existing_role_ids
            .get(&key.source)
            .is_some_and(|ids| ids.contains(&key.id))
    }

    /// Whether a user with the given id exists
    pub fn user_exists(&self, id: &str) -> bool {
        self.existing_user_ids.contains(id)
    }

    /// Whether a user id exists, ignoring case
    pub fn user_exists_ignore_case(&self, id: &str) -> bool {
        self.user_exists(id)
            || self
                .existing_user_ids
                .iter()
                .any(|existing| existing.eq_ignore_ascii_case(id))
    }

    /// Roles already mapped to a user in a source, ignoring user id case
    pub fn user_roles(&self, user_id: &str, source: &str) -> Option<&[RoleKey]> {
        self.existing_user_role_map
            .get(&MappingKey::new(user_id, source))
            .map(Vec::as_slice)
    }

    /// Whether a privilege with the given id exists
    pub fn privilege_exists(&self, id: &str) -> bool {
        self.existing_privilege_ids.contains(id)
    }

    /// Containment graph with the edges of `key` replaced by `contained`
    pub(crate) fn containment_with(
        &self,
        key: &RoleKey,
        contained: &IndexSet<RoleKey>,
    ) -> HashMap<RoleKey, Vec<RoleKey>> {
        let mut graph = self.role_containment_map.clone();
        graph.insert(key.clone(), contained.iter().cloned().collect());
        graph
    }
}
