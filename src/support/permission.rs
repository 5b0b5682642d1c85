use std::collections::HashSet;
use std::fmt;
use std::sync::RwLock;

/// Operation class checked against an entity type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Read,
    Write,
    Count,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read => write!(f, "READ"),
            Self::Write => write!(f, "WRITE"),
            Self::Count => write!(f, "COUNT"),
        }
    }
}

/// Resolves the current caller's identity and grants.
///
/// The security and ownership layers consult this on every call; an
/// implementation typically reads a request-scoped security context.
pub trait PermissionChecker: Send + Sync {
    fn has_permission(&self, entity_type_name: &str, action: Action) -> bool;

    /// Identity stamped on owned records; `None` for anonymous callers.
    fn current_username(&self) -> Option<String>;

    /// Elevated callers bypass ownership filtering.
    fn is_elevated(&self) -> bool;
}

/// Explicit, mutable permission table.
///
/// Grants are keyed by `(entity type, action)`; a `None` entity type in a
/// grant means "every type". The caller identity can be switched at run
/// time, which keeps multi-caller scenarios testable with one instance.
pub struct StaticPermissions {
    state: RwLock<PermissionState>,
}

struct PermissionState {
    username: Option<String>,
    elevated: bool,
    grants: HashSet<(Option<String>, Action)>,
}

impl StaticPermissions {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            state: RwLock::new(PermissionState {
                username: Some(username.into()),
                elevated: false,
                grants: HashSet::new(),
            }),
        }
    }

    /// Elevated caller; `has_permission` short-circuits on the flag, so no
    /// explicit grants are recorded and `become_user` fully drops the
    /// privilege.
    pub fn elevated(username: impl Into<String>) -> Self {
        let checker = Self::new(username);
        if let Ok(mut state) = checker.state.write() {
            state.elevated = true;
        }
        checker
    }

    pub fn grant(&self, entity_type_name: &str, action: Action) {
        if let Ok(mut state) = self.state.write() {
            state
                .grants
                .insert((Some(entity_type_name.to_string()), action));
        }
    }

    pub fn grant_all(&self, entity_type_name: &str) {
        for action in [Action::Read, Action::Write, Action::Count] {
            self.grant(entity_type_name, action);
        }
    }

    pub fn revoke(&self, entity_type_name: &str, action: Action) {
        if let Ok(mut state) = self.state.write() {
            state
                .grants
                .remove(&(Some(entity_type_name.to_string()), action));
        }
    }

    /// Switches the caller this checker reports.
    pub fn become_user(&self, username: impl Into<String>, elevated: bool) {
        if let Ok(mut state) = self.state.write() {
            state.username = Some(username.into());
            state.elevated = elevated;
        }
    }
}

impl PermissionChecker for StaticPermissions {
    fn has_permission(&self, entity_type_name: &str, action: Action) -> bool {
        self.state
            .read()
            .map(|state| {
                state.elevated
                    || state.grants.contains(&(None, action))
                    || state
                        .grants
                        .contains(&(Some(entity_type_name.to_string()), action))
            })
            .unwrap_or(false)
    }

    fn current_username(&self) -> Option<String> {
        self.state
            .read()
            .map(|state| state.username.clone())
            .unwrap_or(None)
    }

    fn is_elevated(&self) -> bool {
        self.state.read().map(|state| state.elevated).unwrap_or(false)
    }
}
