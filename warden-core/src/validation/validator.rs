//! Structural and referential rules for every entity class

use super::{PrivilegeDescriptors, PrivilegeInheritance, ValidationContext, ValidationResponse};
use crate::model::*;
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

/// How duplicate user emails are treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmailPolicy {
    /// A duplicate email is an error
    #[default]
    Unique,
    /// A duplicate email is reported as a warning
    Warn,
    /// Emails are not compared
    Ignore,
}

/// Applies the integrity rules to candidate entities.
///
/// Each `validate_*` method checks one candidate against a
/// [`ValidationContext`] and returns every problem found. Methods taking the
/// candidate by `&mut` may auto-correct it (a missing name is filled in from
/// the id) and flag the response as modified.
///
/// # Examples
///
/// ```rust
/// use warden_core::model::{Role, RoleKey};
/// use warden_core::validation::{ValidationContext, Validator};
///
/// let validator = Validator::new();
/// let context = ValidationContext::new();
///
/// let mut role = Role::new(RoleKey::local("role1"), "Role 1")
///     .with_role(RoleKey::local("role2"));
///
/// let response = validator.validate_role(&context, &mut role, false);
/// assert!(!response.is_valid());
/// assert!(response.errors[0].message.contains("role2"));
/// ```
#[derive(Debug, Clone)]
pub struct Validator {
    descriptors: PrivilegeDescriptors,
    inheritance: PrivilegeInheritance,
    email_policy: EmailPolicy,
    local_source: String,
}

impl Validator {
    /// Create a validator with the default descriptors, inheritance rules and
    /// email policy
    pub fn new() -> Self {
        Self {
            descriptors: PrivilegeDescriptors::default(),
            inheritance: PrivilegeInheritance::default(),
            email_policy: EmailPolicy::default(),
            local_source: DEFAULT_SOURCE.to_string(),
        }
    }

    /// Replace the privilege descriptor registry
    pub fn with_descriptors(mut self, descriptors: PrivilegeDescriptors) -> Self {
        self.descriptors = descriptors;
        self
    }

    /// Replace the privilege inheritance rules
    pub fn with_inheritance(mut self, inheritance: PrivilegeInheritance) -> Self {
        self.inheritance = inheritance;
        self
    }

    /// Set the email policy
    pub fn with_email_policy(mut self, email_policy: EmailPolicy) -> Self {
        self.email_policy = email_policy;
        self
    }

    /// Set the source whose users are managed locally
    pub fn with_local_source(mut self, source: impl Into<String>) -> Self {
        self.local_source = source.into();
        self
    }

    /// Privilege inheritance rules in use
    pub fn inheritance(&self) -> &PrivilegeInheritance {
        &self.inheritance
    }

    /// Privilege descriptors in use
    pub fn descriptors(&self) -> &PrivilegeDescriptors {
        &self.descriptors
    }

    /// Email policy in use
    pub fn email_policy(&self) -> EmailPolicy {
        self.email_policy
    }

    /// Validate a privilege.
    ///
    /// On create (`update == false`) the id must not exist yet.
    pub fn validate_privilege(
        &self,
        context: &ValidationContext,
        privilege: &mut Privilege,
        update: bool,
    ) -> ValidationResponse {
        let mut response = ValidationResponse::new();

        if privilege.id.trim().is_empty() {
            response.add_error("id", "Privilege ID is required");
        } else if !update && context.privilege_exists(&privilege.id) {
            response.add_error(
                "id",
                format!("Privilege ID '{}' already exists", privilege.id),
            );
        }

        if privilege.name.trim().is_empty() {
            privilege.name = privilege.id.clone();
            response.modified = true;
            response.add_warning(
                "name",
                format!(
                    "Privilege '{}' has no name, defaulting to its ID",
                    privilege.id
                ),
            );
        }

        match self.descriptors.get(&privilege.privilege_type) {
            Some(descriptor) => {
                for property in descriptor.missing_properties(privilege) {
                    response.add_error(
                        format!("properties.{}", property),
                        format!(
                            "Privilege '{}' of type '{}' requires property '{}'",
                            privilege.id, privilege.privilege_type, property
                        ),
                    );
                }
            }
            None => response.add_error(
                "type",
                format!(
                    "Privilege '{}' has unknown type '{}'",
                    privilege.id, privilege.privilege_type
                ),
            ),
        }

        response
    }

    /// Validate a role, including the containment cycles it would close.
    pub fn validate_role(
        &self,
        context: &ValidationContext,
        role: &mut Role,
        update: bool,
    ) -> ValidationResponse {
        let mut response = self.check_role(context, role, update);

        let graph = context.containment_with(&role.key, &role.roles);
        let reachable = reachable_from(&graph, &role.key);
        if reachable.contains(&role.key) {
            let mut members: Vec<&RoleKey> = reachable
                .iter()
                .filter(|other| reachable_from(&graph, other).contains(&role.key))
                .collect();
            members.sort();
            for member in members {
                response.add_error("roles", cycle_message(member));
            }
        }

        response
    }

    /// Validate a user together with the roles it is about to be assigned.
    pub fn validate_user(
        &self,
        context: &ValidationContext,
        user: &User,
        roles: &IndexSet<RoleKey>,
        update: bool,
    ) -> ValidationResponse {
        let mut response = ValidationResponse::new();

        if user.id.trim().is_empty() {
            response.add_error("id", "User ID is required");
        } else if !update && context.user_exists(&user.id) {
            response.add_error("id", format!("User ID '{}' already exists", user.id));
        }

        if user.source.trim().is_empty() {
            response.add_error("source", format!("User '{}' has no source", user.id));
        }

        if let Some(email) = user.email.as_deref().filter(|e| !e.trim().is_empty()) {
            self.check_email(context, &user.id, email, &mut response);
        }

        check_roles_exist(context, roles, "roles", &mut response);

        if !update {
            if let Some(previous) = context.user_roles(&user.id, &user.source) {
                response.add_warning(
                    "roles",
                    format!(
                        "Existing role mapping of user '{}' in source '{}' with {} role(s) will be replaced",
                        user.id,
                        user.source,
                        previous.len()
                    ),
                );
            }
        }

        response
    }

    /// Validate the role assignment of one user and source
    pub fn validate_user_role_mapping(
        &self,
        context: &ValidationContext,
        mapping: &UserRoleMapping,
    ) -> ValidationResponse {
        let mut response = ValidationResponse::new();

        if mapping.user_id.trim().is_empty() {
            response.add_error("userId", "User ID is required");
        }

        if mapping.source.trim().is_empty() {
            response.add_error("source", "User role mapping source is required");
        } else if mapping.source == self.local_source
            && !mapping.user_id.trim().is_empty()
            && !context.user_exists_ignore_case(&mapping.user_id)
        {
            response.add_error(
                "userId",
                format!(
                    "User '{}' does not exist in source '{}'",
                    mapping.user_id, mapping.source
                ),
            );
        }

        check_roles_exist(context, &mapping.roles, "roles", &mut response);

        response
    }

    /// Validate an external role mapping
    pub fn validate_role_mapping(
        &self,
        context: &ValidationContext,
        mapping: &RoleMapping,
    ) -> ValidationResponse {
        let mut response = ValidationResponse::new();

        if mapping.role_id.trim().is_empty() {
            response.add_error("roleId", "External role ID is required");
        }

        if mapping.source.trim().is_empty() {
            response.add_error("source", "Role mapping source is required");
        }

        check_roles_exist(context, &mapping.roles, "roles", &mut response);

        response
    }

    /// Report every role of the context's containment graph that is its own
    /// ancestor.
    ///
    /// Roles are reported in key order, one error each, so a cycle through N
    /// roles produces N errors.
    pub fn validate_role_containment(&self, context: &ValidationContext) -> ValidationResponse {
        let mut response = ValidationResponse::new();

        let mut keys: Vec<&RoleKey> = context.role_containment_map.keys().collect();
        keys.sort();

        for key in keys {
            if reachable_from(&context.role_containment_map, key).contains(key) {
                response.add_error("roles", cycle_message(key));
            }
        }

        response
    }

    /// Validate a whole configuration document.
    ///
    /// Every entity is checked in update mode against the document itself,
    /// duplicate identities are reported, and the containment graph is checked
    /// once for cycles. Message keys are prefixed with the entity they belong
    /// to. The document is not modified.
    pub fn validate_model(&self, configuration: &Configuration) -> ValidationResponse {
        let context = ValidationContext::from_configuration(configuration);
        let mut response = ValidationResponse::new();

        report_duplicates(
            configuration.users.iter().map(|u| u.id.clone()),
            "user",
            &mut response,
        );
        report_duplicates(
            configuration.roles.iter().map(|r| r.key.to_string()),
            "role",
            &mut response,
        );
        report_duplicates(
            configuration.privileges.iter().map(|p| p.id.clone()),
            "privilege",
            &mut response,
        );
        report_duplicates(
            configuration
                .user_role_mappings
                .iter()
                .map(|m| m.key().to_string()),
            "userRoleMapping",
            &mut response,
        );
        report_duplicates(
            configuration.role_mappings.iter().map(|m| m.key().to_string()),
            "roleMapping",
            &mut response,
        );

        for privilege in &configuration.privileges {
            let mut candidate = privilege.clone();
            let found = self.validate_privilege(&context, &mut candidate, true);
            append_scoped(&mut response, &format!("privilege[{}]", privilege.id), found);
        }

        for role in &configuration.roles {
            let mut candidate = role.clone();
            let found = self.check_role(&context, &mut candidate, true);
            append_scoped(&mut response, &format!("role[{}]", role.key), found);
        }
        response.append(self.validate_role_containment(&context));

        let no_roles = IndexSet::new();
        for user in &configuration.users {
            let roles = configuration
                .user_role_mappings
                .iter()
                .find(|m| m.key() == MappingKey::new(&user.id, &user.source))
                .map(|m| &m.roles)
                .unwrap_or(&no_roles);
            let found = self.validate_user(&context, user, roles, true);
            append_scoped(&mut response, &format!("user[{}]", user.id), found);
        }

        for mapping in &configuration.user_role_mappings {
            let found = self.validate_user_role_mapping(&context, mapping);
            append_scoped(&mut response, &format!("userRoleMapping[{}]", mapping.key()), found);
        }

        for mapping in &configuration.role_mappings {
            let found = self.validate_role_mapping(&context, mapping);
            append_scoped(&mut response, &format!("roleMapping[{}]", mapping.key()), found);
        }

        // Auto-corrections were made on clones only.
        response.modified = false;

        debug!(
            errors = response.errors.len(),
            warnings = response.warnings.len(),
            "Validated configuration model"
        );
        response
    }

    /// Role checks without cycle detection
    fn check_role(
        &self,
        context: &ValidationContext,
        role: &mut Role,
        update: bool,
    ) -> ValidationResponse {
        let mut response = ValidationResponse::new();
        let key = &role.key;

        if key.id.trim().is_empty() {
            response.add_error("id", "Role ID is required");
        }
        if key.source.trim().is_empty() {
            response.add_error("source", format!("Role '{}' has no source", key.id));
        }
        if !update && !key.id.trim().is_empty() && context.role_exists(key) {
            response.add_error(
                "id",
                format!(
                    "Role '{}' from source '{}' already exists",
                    key.id, key.source
                ),
            );
        }

        if role.name.trim().is_empty() {
            role.name = role.key.id.clone();
            response.modified = true;
            response.add_warning(
                "name",
                format!("Role '{}' has no name, defaulting to its ID", role.key.id),
            );
        }

        let name_taken = context
            .existing_role_name_map
            .iter()
            .any(|(other, name)| {
                other != &role.key && other.source == role.key.source && name == &role.name
            });
        if name_taken {
            response.add_error(
                "name",
                format!(
                    "Role name '{}' is already used by another role of source '{}'",
                    role.name, role.key.source
                ),
            );
        }

        check_roles_exist(context, &role.roles, "roles", &mut response);

        for privilege_id in &role.privileges {
            if !context.privilege_exists(privilege_id) {
                response.add_error(
                    "privileges",
                    format!("Privilege '{}' does not exist", privilege_id),
                );
            }
        }

        response
    }

    fn check_email(
        &self,
        context: &ValidationContext,
        user_id: &str,
        email: &str,
        response: &mut ValidationResponse,
    ) {
        if self.email_policy == EmailPolicy::Ignore {
            return;
        }

        let owner = context
            .existing_email_map
            .iter()
            .find(|(id, existing)| id.as_str() != user_id && existing.eq_ignore_ascii_case(email));

        if let Some((owner, _)) = owner {
            let message = format!("Email '{}' is already used by user '{}'", email, owner);
            match self.email_policy {
                EmailPolicy::Unique => response.add_error("email", message),
                EmailPolicy::Warn => response.add_warning("email", message),
                EmailPolicy::Ignore => {}
            }
        }
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new()
    }
}

fn check_roles_exist<'a>(
    context: &ValidationContext,
    roles: impl IntoIterator<Item = &'a RoleKey>,
    field: &str,
    response: &mut ValidationResponse,
) {
    for key in roles {
        if !context.role_exists(key) {
            response.add_error(
                field,
                format!(
                    "Role '{}' from source '{}' does not exist",
                    key.id, key.source
                ),
            );
        }
    }
}

fn cycle_message(key: &RoleKey) -> String {
    format!(
        "Role '{}' from source '{}' is part of a containment cycle",
        key.id, key.source
    )
}

/// Every role reachable from `start` through at least one edge
fn reachable_from(graph: &HashMap<RoleKey, Vec<RoleKey>>, start: &RoleKey) -> HashSet<RoleKey> {
    let mut seen = HashSet::new();
    let mut stack: Vec<&RoleKey> = graph
        .get(start)
        .map(|children| children.iter().collect())
        .unwrap_or_default();

    while let Some(key) = stack.pop() {
        if seen.insert(key.clone()) {
            if let Some(children) = graph.get(key) {
                stack.extend(children.iter().filter(|child| !seen.contains(*child)));
            }
        }
    }

    seen
}

fn report_duplicates(
    ids: impl Iterator<Item = String>,
    kind: &str,
    response: &mut ValidationResponse,
) {
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id.clone()) {
            warn!(kind = kind, id = %id, "Duplicate identity in configuration");
            response.add_error(kind, format!("Duplicate {} '{}'", kind, id));
        }
    }
}

fn append_scoped(response: &mut ValidationResponse, scope: &str, mut found: ValidationResponse) {
    for message in found.errors.iter_mut().chain(found.warnings.iter_mut()) {
        message.key = format!("{}.{}", scope, message.key);
    }
    response.append(found);
}
