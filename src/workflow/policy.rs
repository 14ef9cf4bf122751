use std::collections::{HashMap, HashSet};

use crate::configuration::WorkflowSettings;
use crate::entity::bug::BugStatus;
use crate::model::auth::Actor;
use crate::model::global_error::{AppError, ErrorCode};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permission {
    Report,
    Transition(BugStatus, BugStatus),
    ManageDependencies,
    Assign,
    Edit,
    LogTime,
}

/// Role rules supplied by the deployment. A permission without a rule is open
/// to every authenticated role; the system actor bypasses all rules.
#[derive(Debug, Clone, Default)]
pub struct AccessPolicy {
    rules: HashMap<Permission, HashSet<String>>,
}

impl AccessPolicy {
    pub fn permissive() -> Self {
        Self::default()
    }

    pub fn from_settings(settings: &WorkflowSettings) -> Self {
        let policy = Self::permissive();
        if settings.close_roles.is_empty() {
            return policy;
        }
        policy.restrict(
            Permission::Transition(BugStatus::Resolved, BugStatus::Closed),
            settings.close_roles.iter().cloned(),
        )
    }

    pub fn restrict<I, S>(mut self, permission: Permission, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rules
            .entry(permission)
            .or_default()
            .extend(roles.into_iter().map(Into::into));
        self
    }

    pub fn is_allowed(&self, permission: Permission, actor: &Actor) -> bool {
        if actor.is_system() {
            return true;
        }
        self.rules
            .get(&permission)
            .map_or(true, |roles| roles.contains(&actor.role))
    }

    pub fn authorize(&self, permission: Permission, actor: &Actor) -> Result<(), AppError> {
        if self.is_allowed(permission, actor) {
            Ok(())
        } else {
            Err(AppError::with_detail(
                ErrorCode::NotEnoughPermission,
                format!("role '{}' may not perform {:?}", actor.role, permission),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unrestricted_permissions_are_open() {
        let policy = AccessPolicy::permissive();
        assert!(policy.is_allowed(Permission::Assign, &Actor::user(1, "developer")));
    }

    #[test]
    fn restricted_transition_checks_role() {
        let close = Permission::Transition(BugStatus::Resolved, BugStatus::Closed);
        let policy = AccessPolicy::permissive().restrict(close, ["tester"]);

        assert!(policy.is_allowed(close, &Actor::user(1, "tester")));
        let err = policy.authorize(close, &Actor::user(2, "developer")).unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotEnoughPermission);

        // other transitions stay open
        let start = Permission::Transition(BugStatus::Open, BugStatus::InProgress);
        assert!(policy.is_allowed(start, &Actor::user(2, "developer")));
    }

    #[test]
    fn system_actor_bypasses_rules() {
        let close = Permission::Transition(BugStatus::Resolved, BugStatus::Closed);
        let policy = AccessPolicy::permissive().restrict(close, ["tester"]);
        assert!(policy.is_allowed(close, &Actor::system()));
    }

    #[test]
    fn settings_close_roles_restrict_closing() {
        let settings = WorkflowSettings {
            close_roles: vec!["admin".to_string()],
            ..WorkflowSettings::default()
        };
        let policy = AccessPolicy::from_settings(&settings);
        let close = Permission::Transition(BugStatus::Resolved, BugStatus::Closed);
        assert!(!policy.is_allowed(close, &Actor::user(1, "developer")));
        assert!(policy.is_allowed(close, &Actor::user(1, "admin")));
    }
}
