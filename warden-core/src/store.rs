//! Indexed in-memory configuration store
//!
//! `ConfigStore` owns the live RBAC graph. Every entity class is held in an
//! insertion-ordered map keyed by its natural identity, so the canonical list
//! and its lookup index can never drift apart: each add or remove updates both
//! in one step, and only the bulk `replace_all_*` operations rebuild an index
//! from scratch. Removal shifts later entries down to keep document order, so
//! it costs O(n) in the size of the collection.
//!
//! The store never validates. Callers run the [`crate::validation::Validator`]
//! first; the store only rejects records whose identity is empty.

use crate::model::*;
use crate::{Error, Result};
use indexmap::IndexMap;
use tracing::{debug, warn};

/// Live, indexed RBAC configuration.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    version: String,
    users: IndexMap<String, User>,
    roles: IndexMap<RoleKey, Role>,
    privileges: IndexMap<String, Privilege>,
    user_role_mappings: IndexMap<MappingKey, UserRoleMapping>,
    role_mappings: IndexMap<MappingKey, RoleMapping>,
}

impl ConfigStore {
    /// Create an empty store at the current model version
    pub fn new() -> Self {
        Self {
            version: MODEL_VERSION.to_string(),
            users: IndexMap::new(),
            roles: IndexMap::new(),
            privileges: IndexMap::new(),
            user_role_mappings: IndexMap::new(),
            role_mappings: IndexMap::new(),
        }
    }

    /// Build a store from a detached configuration document
    pub fn from_configuration(configuration: Configuration) -> Self {
        let mut store = Self::new();
        store.version = configuration.version;
        store.replace_all_users(configuration.users);
        store.replace_all_roles(configuration.roles);
        store.replace_all_privileges(configuration.privileges);
        store.replace_all_user_role_mappings(configuration.user_role_mappings);
        store.replace_all_role_mappings(configuration.role_mappings);
        store
    }

    /// Detach a snapshot of the whole configuration, in store order
    pub fn to_configuration(&self) -> Configuration {
        Configuration {
            version: self.version.clone(),
            users: self.users.values().cloned().collect(),
            roles: self.roles.values().cloned().collect(),
            privileges: self.privileges.values().cloned().collect(),
            user_role_mappings: self.user_role_mappings.values().cloned().collect(),
            role_mappings: self.role_mappings.values().cloned().collect(),
        }
    }

    /// Model version of the loaded configuration
    pub fn version(&self) -> &str {
        &self.version
    }

    // Users

    /// All users in store order
    pub fn users(&self) -> impl ExactSizeIterator<Item = &User> + '_ {
        self.users.values()
    }

    /// Look up a user by id
    pub fn user(&self, id: &str) -> Option<&User> {
        self.users.get(id)
    }

    /// Add a user, replacing any user with the same id in place
    pub fn add_user(&mut self, user: User) -> Result<Option<User>> {
        require_identity("user id", &user.id)?;
        Ok(self.users.insert(user.id.clone(), user))
    }

    /// Remove a user by id
    pub fn remove_user(&mut self, id: &str) -> Option<User> {
        self.users.shift_remove(id)
    }

    /// Replace every user and rebuild the index
    pub fn replace_all_users(&mut self, users: impl IntoIterator<Item = User>) {
        self.users = rebuild("user", users, |u| u.id.clone());
    }

    // Roles

    /// All roles in store order
    pub fn roles(&self) -> impl ExactSizeIterator<Item = &Role> + '_ {
        self.roles.values()
    }

    /// Look up a role by key
    pub fn role(&self, key: &RoleKey) -> Option<&Role> {
        self.roles.get(key)
    }

    /// Whether a role with the given key exists
    pub fn contains_role(&self, key: &RoleKey) -> bool {
        self.roles.contains_key(key)
    }

    /// Add a role, replacing any role with the same key in place
    pub fn add_role(&mut self, role: Role) -> Result<Option<Role>> {
        require_identity("role id", &role.key.id)?;
        require_identity("role source", &role.key.source)?;
        Ok(self.roles.insert(role.key.clone(), role))
    }

    /// Remove a role by key
    pub fn remove_role(&mut self, key: &RoleKey) -> Option<Role> {
        self.roles.shift_remove(key)
    }

    /// Replace every role and rebuild the index
    pub fn replace_all_roles(&mut self, roles: impl IntoIterator<Item = Role>) {
        self.roles = rebuild("role", roles, |r| r.key.clone());
    }

    // Privileges

    /// All privileges in store order
    pub fn privileges(&self) -> impl ExactSizeIterator<Item = &Privilege> + '_ {
        self.privileges.values()
    }

    /// Look up a privilege by id
    pub fn privilege(&self, id: &str) -> Option<&Privilege> {
        self.privileges.get(id)
    }

    /// Add a privilege, replacing any privilege with the same id in place
    pub fn add_privilege(&mut self, privilege: Privilege) -> Result<Option<Privilege>> {
        require_identity("privilege id", &privilege.id)?;
        Ok(self.privileges.insert(privilege.id.clone(), privilege))
    }

    /// Remove a privilege by id
    pub fn remove_privilege(&mut self, id: &str) -> Option<Privilege> {
        self.privileges.shift_remove(id)
    }

    /// Replace every privilege and rebuild the index
    pub fn replace_all_privileges(&mut self, privileges: impl IntoIterator<Item = Privilege>) {
        self.privileges = rebuild("privilege", privileges, |p| p.id.clone());
    }

    // User role mappings

    /// All user role mappings in store order
    pub fn user_role_mappings(&self) -> impl ExactSizeIterator<Item = &UserRoleMapping> + '_ {
        self.user_role_mappings.values()
    }

    /// Look up the mapping of a user; the user id is matched case-insensitively
    pub fn user_role_mapping(&self, user_id: &str, source: &str) -> Option<&UserRoleMapping> {
        self.user_role_mappings
            .get(&MappingKey::new(user_id, source))
    }

    /// Add a mapping, replacing any mapping with the same key in place
    pub fn add_user_role_mapping(
        &mut self,
        mapping: UserRoleMapping,
    ) -> Result<Option<UserRoleMapping>> {
        require_identity("user id", &mapping.user_id)?;
        require_identity("source", &mapping.source)?;
        Ok(self.user_role_mappings.insert(mapping.key(), mapping))
    }

    /// Remove the mapping of a user
    pub fn remove_user_role_mapping(
        &mut self,
        user_id: &str,
        source: &str,
    ) -> Option<UserRoleMapping> {
        self.user_role_mappings
            .shift_remove(&MappingKey::new(user_id, source))
    }

    /// Replace every user role mapping and rebuild the index
    pub fn replace_all_user_role_mappings(
        &mut self,
        mappings: impl IntoIterator<Item = UserRoleMapping>,
    ) {
        self.user_role_mappings = rebuild("user role mapping", mappings, UserRoleMapping::key);
    }

    // External role mappings

    /// All external role mappings in store order
    pub fn role_mappings(&self) -> impl ExactSizeIterator<Item = &RoleMapping> + '_ {
        self.role_mappings.values()
    }

    /// Look up an external role mapping; the role id is matched case-insensitively
    pub fn role_mapping(&self, source: &str, role_id: &str) -> Option<&RoleMapping> {
        self.role_mappings.get(&MappingKey::new(role_id, source))
    }

    /// Add an external role mapping, replacing any mapping with the same key in place
    pub fn add_role_mapping(&mut self, mapping: RoleMapping) -> Result<Option<RoleMapping>> {
        require_identity("role id", &mapping.role_id)?;
        require_identity("source", &mapping.source)?;
        Ok(self.role_mappings.insert(mapping.key(), mapping))
    }

    /// Remove an external role mapping
    pub fn remove_role_mapping(&mut self, source: &str, role_id: &str) -> Option<RoleMapping> {
        self.role_mappings
            .shift_remove(&MappingKey::new(role_id, source))
    }

    /// Replace every external role mapping and rebuild the index
    pub fn replace_all_role_mappings(&mut self, mappings: impl IntoIterator<Item = RoleMapping>) {
        self.role_mappings = rebuild("role mapping", mappings, RoleMapping::key);
    }
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Configuration> for ConfigStore {
    fn from(configuration: Configuration) -> Self {
        Self::from_configuration(configuration)
    }
}

fn require_identity(what: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::invalid(what, format!("Cannot store a record without a {}", what)));
    }
    Ok(())
}

fn rebuild<K, V, F>(kind: &str, items: impl IntoIterator<Item = V>, key_of: F) -> IndexMap<K, V>
where
    K: std::hash::Hash + Eq + std::fmt::Display,
    F: Fn(&V) -> K,
{
    let mut index = IndexMap::new();
    for item in items {
        let key = key_of(&item);
        if index.contains_key(&key) {
            // later record wins, position of the first is kept
            warn!(kind = kind, key = %key, "Duplicate identity while rebuilding index");
        }
        index.insert(key, item);
    }
    debug!(kind = kind, count = index.len(), "Rebuilt index");
    index
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_store() -> ConfigStore {
        let mut store = ConfigStore::new();
        store.add_user(User::local("admin")).unwrap();
        store.add_user(User::local("deployer")).unwrap();
        store
            .add_privilege(Privilege::method("p1", "Read all", "read"))
            .unwrap();
        store
            .add_role(Role::new(RoleKey::local("admin"), "Admin").with_privilege("p1"))
            .unwrap();
        store
            .add_user_role_mapping(UserRoleMapping::new(
                "Admin",
                "default",
                [RoleKey::local("admin")],
            ))
            .unwrap();
        store
    }

    #[test]
    fn test_lookup_after_add() {
        let store = sample_store();
        assert_eq!(store.user("admin").map(|u| u.id.as_str()), Some("admin"));
        assert!(store.user("nobody").is_none());
        assert!(store.contains_role(&RoleKey::local("admin")));
        assert!(!store.contains_role(&RoleKey::new("admin", "ldap")));
        assert_eq!(store.privilege("p1").unwrap().methods(), vec!["read"]);
    }

    #[test]
    fn test_user_role_mapping_lookup_is_case_insensitive() {
        let store = sample_store();
        let upper = store.user_role_mapping("ADMIN", "default").unwrap();
        let lower = store.user_role_mapping("admin", "default").unwrap();
        assert_eq!(upper, lower);
        assert!(store.user_role_mapping("admin", "ldap").is_none());
    }

    #[test]
    fn test_remove_updates_list_and_index() {
        let mut store = sample_store();
        assert!(store.remove_user("admin").is_some());
        assert!(store.remove_user("admin").is_none());
        assert!(store.user("admin").is_none());
        assert_eq!(store.users().count(), 1);
        assert_eq!(store.users().next().unwrap().id, "deployer");
    }

    #[test]
    fn test_replace_keeps_position() {
        let mut store = sample_store();
        let updated = User::local("admin").with_email("admin@example.com");
        let previous = store.add_user(updated).unwrap();

        assert!(previous.is_some());
        let ids: Vec<&str> = store.users().map(|u| u.id.as_str()).collect();
        assert_eq!(ids, vec!["admin", "deployer"]);
        assert_eq!(
            store.user("admin").unwrap().email.as_deref(),
            Some("admin@example.com")
        );
    }

    #[test]
    fn test_rejects_records_without_identity() {
        let mut store = ConfigStore::new();
        assert!(store.add_user(User::local("  ")).is_err());
        assert!(store.add_role(Role::new(RoleKey::new("r", ""), "R")).is_err());
        assert_eq!(store.users().count(), 0);
    }

    #[test]
    fn test_bulk_replace_rebuilds_index() {
        let mut store = sample_store();
        store.replace_all_privileges(vec![
            Privilege::method("p2", "Create", "create"),
            Privilege::method("p3", "Delete", "delete"),
        ]);

        assert!(store.privilege("p1").is_none());
        assert!(store.privilege("p2").is_some());
        assert_eq!(store.privileges().len(), 2);
    }

    #[test]
    fn test_configuration_round_trip_preserves_order() {
        let store = sample_store();
        let configuration = store.to_configuration();
        let rebuilt = ConfigStore::from_configuration(configuration.clone());
        assert_eq!(rebuilt.to_configuration(), configuration);
    }
}
