//! Authorization manager facade
//!
//! Every mutation follows the same path: build a validation context from the
//! live store, validate the candidate, commit it to the store, persist the
//! whole configuration and notify listeners. Validation failures abort before
//! the store is touched. Persistence failures are reported after the commit
//! and are not rolled back.

use crate::cache::ConfigCache;
use crate::config::WardenSettings;
use crate::events::{AuthorizationEvent, ChangeKind, EntityKind, EventBus};
use crate::security::{SecurityPrivilege, SecurityRole, SecurityUser};
use crate::source::{ConfigurationSource, FileConfigurationSource};
use indexmap::IndexSet;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};
use warden_core::model::*;
use warden_core::store::ConfigStore;
use warden_core::utils::json;
use warden_core::validation::{ValidationContext, ValidationResponse, Validator};
use warden_core::{Error, NotFoundError, Result};
use warden_upgrade::{ConfigurationUpgrader, UpgraderRegistry};

/// Stage of a mutation, as reported in debug logs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationState {
    /// No mutation in flight
    Idle,
    /// Checking the candidate against the store
    Validating,
    /// Validation failed; nothing was changed
    Rejected,
    /// Applying the change to the store
    Committing,
    /// The configuration was written back
    Persisted,
    /// Publishing the change event
    NotifyingListeners,
}

impl fmt::Display for MutationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MutationState::Idle => "idle",
            MutationState::Validating => "validating",
            MutationState::Rejected => "rejected",
            MutationState::Committing => "committing",
            MutationState::Persisted => "persisted",
            MutationState::NotifyingListeners => "notifying-listeners",
        };
        f.write_str(name)
    }
}

/// Public CRUD and query surface over the RBAC configuration.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use warden_authz::prelude::*;
/// use warden_core::model::*;
///
/// let source = Arc::new(MemoryConfigurationSource::new());
/// let manager = AuthorizationManager::builder()
///     .with_shared_source(source.clone())
///     .build()?;
///
/// let privilege = manager.create_privilege(Privilege::method("1001", "Create", "create"))?;
/// assert_eq!(privilege.property("method"), Some("create,read"));
///
/// manager.create_role(Role::new(RoleKey::local("deployer"), "Deployer").with_privilege("1001"))?;
/// manager.create_user(User::local("jdoe"), [RoleKey::local("deployer")])?;
///
/// assert!(manager.effective_privileges("jdoe", DEFAULT_SOURCE)?.contains("1001"));
/// assert_eq!(source.store_count(), 3);
/// # Ok::<(), warden_core::Error>(())
/// ```
pub struct AuthorizationManager {
    settings: WardenSettings,
    validator: Validator,
    source: Arc<dyn ConfigurationSource>,
    cache: ConfigCache,
    writer: Mutex<()>,
    events: EventBus,
}

impl AuthorizationManager {
    /// Create a new manager builder
    pub fn builder() -> AuthorizationManagerBuilder {
        AuthorizationManagerBuilder::new()
    }

    /// Settings in use
    pub fn settings(&self) -> &WardenSettings {
        &self.settings
    }

    /// Validator in use
    pub fn validator(&self) -> &Validator {
        &self.validator
    }

    /// Subscribe to change notifications
    pub fn subscribe(&self) -> broadcast::Receiver<AuthorizationEvent> {
        self.events.subscribe()
    }

    /// Load the configuration now instead of on first access
    pub fn load(&self) -> Result<()> {
        self.cache.with(|_| ())
    }

    /// Whether the configuration is currently loaded
    pub fn is_loaded(&self) -> bool {
        self.cache.is_loaded()
    }

    /// Drop the loaded configuration; the next access reloads it
    pub fn clear_cache(&self) {
        let _writer = self.writer.lock();
        self.cache.invalidate();
        info!(source = %self.source.describe(), "Authorization configuration cache cleared");
        self.events.publish(AuthorizationEvent::CacheCleared);
    }

    /// Detached snapshot of the whole configuration
    pub fn configuration(&self) -> Result<Configuration> {
        self.cache.with(ConfigStore::to_configuration)
    }

    // Users

    /// All users, in store order
    pub fn list_users(&self) -> Result<Vec<User>> {
        self.cache.with(|store| store.users().cloned().collect())
    }

    /// Look up a user
    pub fn get_user(&self, id: &str) -> Result<User> {
        self.cache
            .with(|store| store.user(id).cloned())?
            .ok_or_else(|| NotFoundError::User(id.to_string()).into())
    }

    /// Create a user and assign it the given roles in its own source.
    ///
    /// Any mapping left over for the same user and source is replaced.
    pub fn create_user(
        &self,
        user: User,
        roles: impl IntoIterator<Item = RoleKey>,
    ) -> Result<User> {
        let roles: IndexSet<RoleKey> = roles.into_iter().collect();
        let id = user.id.clone();

        self.mutate(EntityKind::User, ChangeKind::Created, &id, |store| {
            let context = ValidationContext::from_store(store);
            let response = self.validator.validate_user(&context, &user, &roles, false);
            Self::admit(EntityKind::User, &user.id, response)?;

            trace_state(MutationState::Committing, EntityKind::User, &user.id);
            store.remove_user_role_mapping(&user.id, &user.source);
            store.add_user(user.clone())?;
            store.add_user_role_mapping(UserRoleMapping::new(&user.id, &user.source, roles))?;
            Ok(user)
        })
    }

    /// Replace a user and its roles in its own source
    pub fn update_user(
        &self,
        user: User,
        roles: impl IntoIterator<Item = RoleKey>,
    ) -> Result<User> {
        let roles: IndexSet<RoleKey> = roles.into_iter().collect();
        let id = user.id.clone();

        self.mutate(EntityKind::User, ChangeKind::Updated, &id, |store| {
            let existing = store
                .user(&user.id)
                .cloned()
                .ok_or_else(|| NotFoundError::User(user.id.clone()))?;

            let context = ValidationContext::from_store(store);
            let response = self.validator.validate_user(&context, &user, &roles, true);
            Self::admit(EntityKind::User, &user.id, response)?;

            trace_state(MutationState::Committing, EntityKind::User, &user.id);
            store.remove_user_role_mapping(&existing.id, &existing.source);
            store.add_user(user.clone())?;
            store.add_user_role_mapping(UserRoleMapping::new(&user.id, &user.source, roles))?;
            Ok(user)
        })
    }

    /// Delete a user together with its role mapping in its own source
    pub fn delete_user(&self, id: &str) -> Result<()> {
        self.mutate(EntityKind::User, ChangeKind::Deleted, id, |store| {
            let user = store
                .remove_user(id)
                .ok_or_else(|| NotFoundError::User(id.to_string()))?;

            if store.remove_user_role_mapping(&user.id, &user.source).is_some() {
                debug!(user = %user.id, source = %user.source, "Removed role mapping of deleted user");
            }
            Ok(())
        })
    }

    /// User together with its roles in its own source
    pub fn get_security_user(&self, id: &str) -> Result<SecurityUser> {
        self.cache
            .with(|store| {
                store.user(id).cloned().map(|user| {
                    let roles = store
                        .user_role_mapping(&user.id, &user.source)
                        .map(|m| m.roles.iter().cloned().collect::<Vec<_>>())
                        .unwrap_or_default();
                    SecurityUser::new(user, roles)
                })
            })?
            .ok_or_else(|| NotFoundError::User(id.to_string()).into())
    }

    // Roles

    /// All roles, in store order
    pub fn list_roles(&self) -> Result<Vec<Role>> {
        self.cache.with(|store| store.roles().cloned().collect())
    }

    /// Look up a role
    pub fn get_role(&self, key: &RoleKey) -> Result<Role> {
        self.cache
            .with(|store| store.role(key).cloned())?
            .ok_or_else(|| NotFoundError::Role(key.clone()).into())
    }

    /// Create a role, returning it as stored (a missing name is filled in)
    pub fn create_role(&self, mut role: Role) -> Result<Role> {
        let id = role.key.to_string();

        self.mutate(EntityKind::Role, ChangeKind::Created, &id, |store| {
            let context = ValidationContext::from_store(store);
            let response = self.validator.validate_role(&context, &mut role, false);
            Self::admit(EntityKind::Role, &id, response)?;

            trace_state(MutationState::Committing, EntityKind::Role, &id);
            store.add_role(role.clone())?;
            Ok(role)
        })
    }

    /// Replace a role
    pub fn update_role(&self, mut role: Role) -> Result<Role> {
        let id = role.key.to_string();

        self.mutate(EntityKind::Role, ChangeKind::Updated, &id, |store| {
            let existing = store
                .role(&role.key)
                .ok_or_else(|| NotFoundError::Role(role.key.clone()))?;
            if existing.read_only {
                return Err(read_only_error(EntityKind::Role, &id));
            }

            let context = ValidationContext::from_store(store);
            let response = self.validator.validate_role(&context, &mut role, true);
            Self::admit(EntityKind::Role, &id, response)?;

            trace_state(MutationState::Committing, EntityKind::Role, &id);
            store.add_role(role.clone())?;
            Ok(role)
        })
    }

    /// Delete a role and, when cascading, every reference to it
    pub fn delete_role(&self, key: &RoleKey) -> Result<()> {
        let id = key.to_string();

        self.mutate(EntityKind::Role, ChangeKind::Deleted, &id, |store| {
            let existing = store
                .role(key)
                .ok_or_else(|| NotFoundError::Role(key.clone()))?;
            if existing.read_only {
                return Err(read_only_error(EntityKind::Role, &id));
            }

            store.remove_role(key);
            if self.settings.cascade_on_delete {
                remove_role_references(store, key);
            }
            Ok(())
        })
    }

    /// All roles in the external security representation
    pub fn list_security_roles(&self) -> Result<Vec<SecurityRole>> {
        Ok(self.list_roles()?.into_iter().map(SecurityRole::from).collect())
    }

    /// Create a role given in the external security representation
    pub fn add_security_role(&self, role: SecurityRole) -> Result<SecurityRole> {
        self.create_role(role.into()).map(SecurityRole::from)
    }

    // Privileges

    /// All privileges, in store order
    pub fn list_privileges(&self) -> Result<Vec<Privilege>> {
        self.cache.with(|store| store.privileges().cloned().collect())
    }

    /// Look up a privilege
    pub fn get_privilege(&self, id: &str) -> Result<Privilege> {
        self.cache
            .with(|store| store.privilege(id).cloned())?
            .ok_or_else(|| NotFoundError::Privilege(id.to_string()).into())
    }

    /// Create a privilege.
    ///
    /// The actions of a `method` privilege are expanded with the actions they
    /// imply before it is stored; the stored privilege is returned.
    pub fn create_privilege(&self, mut privilege: Privilege) -> Result<Privilege> {
        let id = privilege.id.clone();

        self.mutate(EntityKind::Privilege, ChangeKind::Created, &id, |store| {
            let context = ValidationContext::from_store(store);
            let response = self
                .validator
                .validate_privilege(&context, &mut privilege, false);
            Self::admit(EntityKind::Privilege, &id, response)?;

            self.validator.inheritance().apply(&mut privilege);

            trace_state(MutationState::Committing, EntityKind::Privilege, &id);
            store.add_privilege(privilege.clone())?;
            Ok(privilege)
        })
    }

    /// Replace a privilege
    pub fn update_privilege(&self, mut privilege: Privilege) -> Result<Privilege> {
        let id = privilege.id.clone();

        self.mutate(EntityKind::Privilege, ChangeKind::Updated, &id, |store| {
            let existing = store
                .privilege(&privilege.id)
                .ok_or_else(|| NotFoundError::Privilege(privilege.id.clone()))?;
            if existing.read_only {
                return Err(read_only_error(EntityKind::Privilege, &id));
            }

            let context = ValidationContext::from_store(store);
            let response = self
                .validator
                .validate_privilege(&context, &mut privilege, true);
            Self::admit(EntityKind::Privilege, &id, response)?;

            trace_state(MutationState::Committing, EntityKind::Privilege, &id);
            store.add_privilege(privilege.clone())?;
            Ok(privilege)
        })
    }

    /// Delete a privilege and, when cascading, remove it from every role
    pub fn delete_privilege(&self, id: &str) -> Result<()> {
        self.mutate(EntityKind::Privilege, ChangeKind::Deleted, id, |store| {
            let existing = store
                .privilege(id)
                .ok_or_else(|| NotFoundError::Privilege(id.to_string()))?;
            if existing.read_only {
                return Err(read_only_error(EntityKind::Privilege, id));
            }

            store.remove_privilege(id);
            if self.settings.cascade_on_delete {
                remove_privilege_references(store, id);
            }
            Ok(())
        })
    }

    /// All privileges in the external security representation
    pub fn list_security_privileges(&self) -> Result<Vec<SecurityPrivilege>> {
        Ok(self
            .list_privileges()?
            .into_iter()
            .map(SecurityPrivilege::from)
            .collect())
    }

    /// Create a privilege given in the external security representation
    pub fn add_security_privilege(&self, privilege: SecurityPrivilege) -> Result<SecurityPrivilege> {
        self.create_privilege(privilege.into())
            .map(SecurityPrivilege::from)
    }

    // User role mappings

    /// All user role mappings, in store order
    pub fn list_user_role_mappings(&self) -> Result<Vec<UserRoleMapping>> {
        self.cache
            .with(|store| store.user_role_mappings().cloned().collect())
    }

    /// Look up the mapping of a user in a source, ignoring user id case
    pub fn get_user_role_mapping(&self, user_id: &str, source: &str) -> Result<UserRoleMapping> {
        self.cache
            .with(|store| store.user_role_mapping(user_id, source).cloned())?
            .ok_or_else(|| user_role_mapping_not_found(user_id, source))
    }

    /// Create a mapping; a mapping for the same user and source must not exist
    pub fn create_user_role_mapping(&self, mapping: UserRoleMapping) -> Result<UserRoleMapping> {
        let id = mapping.key().to_string();

        self.mutate(EntityKind::UserRoleMapping, ChangeKind::Created, &id, |store| {
            let context = ValidationContext::from_store(store);
            let mut response = self.validator.validate_user_role_mapping(&context, &mapping);
            if store
                .user_role_mapping(&mapping.user_id, &mapping.source)
                .is_some()
            {
                response.add_error(
                    "userId",
                    format!(
                        "User '{}' already has a role mapping in source '{}'",
                        mapping.user_id, mapping.source
                    ),
                );
            }
            Self::admit(EntityKind::UserRoleMapping, &id, response)?;

            trace_state(MutationState::Committing, EntityKind::UserRoleMapping, &id);
            store.add_user_role_mapping(mapping.clone())?;
            Ok(mapping)
        })
    }

    /// Replace an existing mapping
    pub fn update_user_role_mapping(&self, mapping: UserRoleMapping) -> Result<UserRoleMapping> {
        let id = mapping.key().to_string();

        self.mutate(EntityKind::UserRoleMapping, ChangeKind::Updated, &id, |store| {
            if store
                .user_role_mapping(&mapping.user_id, &mapping.source)
                .is_none()
            {
                return Err(user_role_mapping_not_found(&mapping.user_id, &mapping.source));
            }

            let context = ValidationContext::from_store(store);
            let response = self.validator.validate_user_role_mapping(&context, &mapping);
            Self::admit(EntityKind::UserRoleMapping, &id, response)?;

            trace_state(MutationState::Committing, EntityKind::UserRoleMapping, &id);
            store.remove_user_role_mapping(&mapping.user_id, &mapping.source);
            store.add_user_role_mapping(mapping.clone())?;
            Ok(mapping)
        })
    }

    /// Delete the mapping of a user in a source
    pub fn delete_user_role_mapping(&self, user_id: &str, source: &str) -> Result<()> {
        let id = MappingKey::new(user_id, source).to_string();

        self.mutate(EntityKind::UserRoleMapping, ChangeKind::Deleted, &id, |store| {
            store
                .remove_user_role_mapping(user_id, source)
                .map(|_| ())
                .ok_or_else(|| user_role_mapping_not_found(user_id, source))
        })
    }

    // External role mappings

    /// All external role mappings, in store order
    pub fn list_role_mappings(&self) -> Result<Vec<RoleMapping>> {
        self.cache.with(|store| store.role_mappings().cloned().collect())
    }

    /// Look up the mapping of an external role, ignoring role id case
    pub fn get_role_mapping(&self, source: &str, role_id: &str) -> Result<RoleMapping> {
        self.cache
            .with(|store| store.role_mapping(source, role_id).cloned())?
            .ok_or_else(|| role_mapping_not_found(source, role_id))
    }

    /// Create an external role mapping
    pub fn create_role_mapping(&self, mapping: RoleMapping) -> Result<RoleMapping> {
        let id = mapping.key().to_string();

        self.mutate(EntityKind::RoleMapping, ChangeKind::Created, &id, |store| {
            let context = ValidationContext::from_store(store);
            let mut response = self.validator.validate_role_mapping(&context, &mapping);
            if store
                .role_mapping(&mapping.source, &mapping.role_id)
                .is_some()
            {
                response.add_error(
                    "roleId",
                    format!(
                        "External role '{}' of source '{}' is already mapped",
                        mapping.role_id, mapping.source
                    ),
                );
            }
            Self::admit(EntityKind::RoleMapping, &id, response)?;

            trace_state(MutationState::Committing, EntityKind::RoleMapping, &id);
            store.add_role_mapping(mapping.clone())?;
            Ok(mapping)
        })
    }

    /// Replace an existing external role mapping
    pub fn update_role_mapping(&self, mapping: RoleMapping) -> Result<RoleMapping> {
        let id = mapping.key().to_string();

        self.mutate(EntityKind::RoleMapping, ChangeKind::Updated, &id, |store| {
            if store
                .role_mapping(&mapping.source, &mapping.role_id)
                .is_none()
            {
                return Err(role_mapping_not_found(&mapping.source, &mapping.role_id));
            }

            let context = ValidationContext::from_store(store);
            let response = self.validator.validate_role_mapping(&context, &mapping);
            Self::admit(EntityKind::RoleMapping, &id, response)?;

            trace_state(MutationState::Committing, EntityKind::RoleMapping, &id);
            store.remove_role_mapping(&mapping.source, &mapping.role_id);
            store.add_role_mapping(mapping.clone())?;
            Ok(mapping)
        })
    }

    /// Delete the mapping of an external role
    pub fn delete_role_mapping(&self, source: &str, role_id: &str) -> Result<()> {
        let id = MappingKey::new(role_id, source).to_string();

        self.mutate(EntityKind::RoleMapping, ChangeKind::Deleted, &id, |store| {
            store
                .remove_role_mapping(source, role_id)
                .map(|_| ())
                .ok_or_else(|| role_mapping_not_found(source, role_id))
        })
    }

    /// Run `query` against the live store
    pub(crate) fn read<R>(&self, query: impl FnOnce(&ConfigStore) -> R) -> Result<R> {
        self.cache.with(query)
    }

    /// Validate, commit, persist and notify, holding the writer lock
    /// throughout.
    ///
    /// `apply` runs with the store locked. It returns its errors before it
    /// touches the store; once it has started committing, the remaining steps
    /// (cascade cleanup included) log their failures instead of returning them.
    fn mutate<T>(
        &self,
        kind: EntityKind,
        change: ChangeKind,
        id: &str,
        apply: impl FnOnce(&mut ConfigStore) -> Result<T>,
    ) -> Result<T> {
        let _writer = self.writer.lock();
        debug!(kind = %kind, id = %id, state = %MutationState::Validating, "Mutation started");

        let (value, snapshot) = self.cache.with_mut(|store| {
            let value = apply(store)?;
            Ok::<_, Error>((value, store.to_configuration()))
        })??;

        self.persist(&snapshot)?;
        debug!(kind = %kind, id = %id, state = %MutationState::Persisted, "Configuration persisted");

        debug!(kind = %kind, id = %id, state = %MutationState::NotifyingListeners, "Notifying listeners");
        self.events.publish(AuthorizationEvent::ConfigurationChanged {
            kind,
            change,
            id: id.to_string(),
        });

        info!(kind = %kind, id = %id, change = %change, "Authorization configuration changed");
        debug!(state = %MutationState::Idle, "Mutation finished");
        Ok(value)
    }

    fn admit(kind: EntityKind, id: &str, response: ValidationResponse) -> Result<()> {
        for warning in &response.warnings {
            debug!(kind = %kind, id = %id, key = %warning.key, "{}", warning.message);
        }

        if !response.is_valid() {
            warn!(
                kind = %kind,
                id = %id,
                errors = response.errors.len(),
                state = %MutationState::Rejected,
                "Mutation rejected: {}",
                response
            );
        }

        response.into_result().map(|_| ())
    }

    fn persist(&self, configuration: &Configuration) -> Result<()> {
        if !self.settings.persistence_enabled {
            debug!("Persistence disabled, keeping configuration in memory");
            return Ok(());
        }

        self.source
            .store_configuration(configuration)
            .map_err(|e| {
                error!(source = %self.source.describe(), error = %e, "Failed to store configuration");
                Error::persistence(format!(
                    "Failed to store configuration to {}: {}",
                    self.source.describe(),
                    e
                ))
            })
    }
}

impl fmt::Debug for AuthorizationManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthorizationManager")
            .field("source", &self.source.describe())
            .field("cache", &self.cache)
            .finish()
    }
}

fn trace_state(state: MutationState, kind: EntityKind, id: &str) {
    debug!(kind = %kind, id = %id, state = %state, "Mutation state changed");
}

fn read_only_error(kind: EntityKind, id: &str) -> Error {
    Error::invalid("*", format!("The {} '{}' is read only", kind, id))
}

fn user_role_mapping_not_found(user_id: &str, source: &str) -> Error {
    NotFoundError::UserRoleMapping {
        user_id: user_id.to_string(),
        source_id: source.to_string(),
    }
    .into()
}

fn role_mapping_not_found(source: &str, role_id: &str) -> Error {
    NotFoundError::RoleMapping {
        source_id: source.to_string(),
        role_id: role_id.to_string(),
    }
    .into()
}

/// Remove a deleted privilege from every role granting it.
///
/// Best-effort: a role that cannot be rewritten keeps the dangling reference
/// and is logged.
fn remove_privilege_references(store: &mut ConfigStore, id: &str) {
    let affected: Vec<Role> = store
        .roles()
        .filter(|role| role.privileges.contains(id))
        .cloned()
        .collect();

    for mut role in affected {
        role.privileges.shift_remove(id);
        let key = role.key.clone();
        match store.add_role(role) {
            Ok(_) => debug!(role = %key, privilege = %id, "Removed deleted privilege from role"),
            Err(e) => {
                warn!(role = %key, privilege = %id, error = %e, "Could not remove deleted privilege from role")
            }
        }
    }
}

/// Remove a deleted role from every role, user role mapping and role mapping
/// referencing it.
///
/// Best-effort like [`remove_privilege_references`].
fn remove_role_references(store: &mut ConfigStore, key: &RoleKey) {
    let roles: Vec<Role> = store
        .roles()
        .filter(|role| role.roles.contains(key))
        .cloned()
        .collect();
    for mut role in roles {
        role.roles.shift_remove(key);
        let owner = role.key.clone();
        match store.add_role(role) {
            Ok(_) => debug!(role = %owner, removed = %key, "Removed deleted role from role"),
            Err(e) => {
                warn!(role = %owner, removed = %key, error = %e, "Could not remove deleted role from role")
            }
        }
    }

    let user_mappings: Vec<UserRoleMapping> = store
        .user_role_mappings()
        .filter(|mapping| mapping.roles.contains(key))
        .cloned()
        .collect();
    for mut mapping in user_mappings {
        mapping.roles.shift_remove(key);
        let owner = mapping.key();
        match store.add_user_role_mapping(mapping) {
            Ok(_) => debug!(mapping = %owner, removed = %key, "Removed deleted role from user role mapping"),
            Err(e) => {
                warn!(mapping = %owner, removed = %key, error = %e, "Could not remove deleted role from user role mapping")
            }
        }
    }

    let role_mappings: Vec<RoleMapping> = store
        .role_mappings()
        .filter(|mapping| mapping.roles.contains(key))
        .cloned()
        .collect();
    for mut mapping in role_mappings {
        mapping.roles.shift_remove(key);
        let owner = mapping.key();
        match store.add_role_mapping(mapping) {
            Ok(_) => debug!(mapping = %owner, removed = %key, "Removed deleted role from role mapping"),
            Err(e) => {
                warn!(mapping = %owner, removed = %key, error = %e, "Could not remove deleted role from role mapping")
            }
        }
    }
}

/// Read, upgrade if needed, and check a persisted configuration
fn load_store(
    source: &dyn ConfigurationSource,
    registry: &UpgraderRegistry,
    validator: &Validator,
    persist_upgrades: bool,
) -> Result<ConfigStore> {
    let raw = source.load_raw()?;

    let configuration = match json::from_slice::<Configuration>(&raw) {
        Ok(configuration) if configuration.is_current() => configuration,
        parsed => {
            match parsed {
                Ok(configuration) => {
                    debug!(version = %configuration.version, "Configuration is not at the current version")
                }
                Err(e) => debug!(error = %e, "Configuration does not parse as the current model"),
            }

            let upgraded = ConfigurationUpgrader::new(registry).load_old_configuration(&raw)?;
            if persist_upgrades {
                match source.store_configuration(&upgraded) {
                    Ok(()) => info!(source = %source.describe(), "Stored upgraded configuration"),
                    Err(e) => {
                        error!(source = %source.describe(), error = %e, "Failed to store upgraded configuration")
                    }
                }
            }
            upgraded
        }
    };

    let response = validator.validate_model(&configuration);
    for problem in response.errors.iter().chain(response.warnings.iter()) {
        warn!(key = %problem.key, "Configuration problem: {}", problem.message);
    }

    info!(
        source = %source.describe(),
        users = configuration.users.len(),
        roles = configuration.roles.len(),
        privileges = configuration.privileges.len(),
        "Authorization configuration loaded"
    );
    Ok(ConfigStore::from_configuration(configuration))
}

/// Builder for [`AuthorizationManager`]
pub struct AuthorizationManagerBuilder {
    settings: WardenSettings,
    source: Option<Arc<dyn ConfigurationSource>>,
    registry: UpgraderRegistry,
}

impl AuthorizationManagerBuilder {
    /// Create a builder with default settings and the standard upgrade chain
    pub fn new() -> Self {
        Self {
            settings: WardenSettings::default(),
            source: None,
            registry: UpgraderRegistry::standard(),
        }
    }

    /// Use the given settings
    pub fn with_settings(mut self, settings: WardenSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Persist through the given source instead of the configured file
    pub fn with_source<S>(mut self, source: S) -> Self
    where
        S: ConfigurationSource + 'static,
    {
        self.source = Some(Arc::new(source));
        self
    }

    /// Persist through a source shared with the caller
    pub fn with_shared_source(mut self, source: Arc<dyn ConfigurationSource>) -> Self {
        self.source = Some(source);
        self
    }

    /// Use the given upgrade registry
    pub fn with_registry(mut self, registry: UpgraderRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Build the manager. The configuration is loaded on first access.
    pub fn build(self) -> Result<AuthorizationManager> {
        self.settings.validate()?;

        let source: Arc<dyn ConfigurationSource> = match self.source {
            Some(source) => source,
            None => Arc::new(FileConfigurationSource::new(
                self.settings.configuration_file.clone(),
            )),
        };
        let validator = self.settings.validator();

        let loader_source = source.clone();
        let loader_validator = validator.clone();
        let registry = self.registry;
        let persist_upgrades = self.settings.persistence_enabled;
        let cache = ConfigCache::new(move || {
            load_store(
                loader_source.as_ref(),
                &registry,
                &loader_validator,
                persist_upgrades,
            )
        });

        info!(source = %source.describe(), "Authorization manager created");
        Ok(AuthorizationManager {
            events: EventBus::new(self.settings.event_capacity),
            settings: self.settings,
            validator,
            source,
            cache,
            writer: Mutex::new(()),
        })
    }
}

impl Default for AuthorizationManagerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
