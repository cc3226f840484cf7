//! Privilege inheritance: granted actions that imply other actions

use crate::model::{METHOD_PRIVILEGE_TYPE, METHOD_PROPERTY, Privilege};
use indexmap::{IndexMap, IndexSet};
use tracing::debug;

/// Rules stating which actions a granted action implies.
///
/// With the default rules `create`, `update` and `delete` each imply `read`.
/// The rewrite is textual and one-way: it is applied to the `method` property
/// of a privilege when it is created, not re-derived when it is read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrivilegeInheritance {
    rules: IndexMap<String, Vec<String>>,
}

impl PrivilegeInheritance {
    /// Inheritance without any rules
    pub fn none() -> Self {
        Self {
            rules: IndexMap::new(),
        }
    }

    /// Add a rule: granting `method` also grants `implied`
    pub fn with_rule(mut self, method: &str, implied: &[&str]) -> Self {
        self.rules.insert(
            method.to_string(),
            implied.iter().map(|s| s.to_string()).collect(),
        );
        self
    }

    /// Expand a comma-joined action list.
    ///
    /// Actions are trimmed and deduplicated; each action is followed by the
    /// actions it implies, and the first occurrence of an action decides its
    /// position.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use warden_core::validation::PrivilegeInheritance;
    ///
    /// let inheritance = PrivilegeInheritance::default();
    /// assert_eq!(inheritance.inherited_methods("create"), vec!["create", "read"]);
    /// assert_eq!(inheritance.inherited_methods("read, delete"), vec!["read", "delete"]);
    /// ```
    pub fn inherited_methods(&self, value: &str) -> Vec<String> {
        let mut methods: IndexSet<String> = IndexSet::new();

        for method in value.split(',').map(str::trim).filter(|m| !m.is_empty()) {
            methods.insert(method.to_string());
            if let Some(implied) = self.rules.get(method) {
                for implied in implied {
                    methods.insert(implied.clone());
                }
            }
        }

        methods.into_iter().collect()
    }

    /// Rewrite the `method` property of a `method` privilege in place.
    ///
    /// Returns whether the property value changed.
    pub fn apply(&self, privilege: &mut Privilege) -> bool {
        if privilege.privilege_type != METHOD_PRIVILEGE_TYPE {
            return false;
        }

        let Some(value) = privilege.properties.get_mut(METHOD_PROPERTY) else {
            return false;
        };

        let methods = self.inherited_methods(value);
        if methods.is_empty() {
            return false;
        }

        let rewritten = methods.join(",");
        if *value == rewritten {
            return false;
        }

        debug!(privilege = %privilege.id, from = %value, to = %rewritten, "Applied privilege inheritance");
        *value = rewritten;
        true
    }
}

impl Default for PrivilegeInheritance {
    fn default() -> Self {
        Self::none()
            .with_rule("create", &["read"])
            .with_rule("update", &["read"])
            .with_rule("delete", &["read"])
    }
}
