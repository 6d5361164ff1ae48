//! Caller identity and the authorization gate guarding mutating operations.

use std::sync::Arc;

use thiserror::Error;

/// Default privileged role accepted by [`SingleRolePolicy`].
pub const DEFAULT_ADMIN_ROLE: &str = "admin";

/// Authorization failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("caller is not authorized")]
    Unauthorized { role: Option<String> },
}

/// Verified caller attribute supplied by the hosting platform.
pub trait CallerIdentity {
    /// Role or common name of the caller. `None` when the host could not
    /// supply one.
    fn caller_role(&self) -> Option<&str>;
}

/// Identity with a fixed role, used by tests and by transports that have
/// already extracted the attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticIdentity(String);

impl StaticIdentity {
    pub fn new(role: impl Into<String>) -> Self {
        Self(role.into())
    }
}

impl CallerIdentity for StaticIdentity {
    fn caller_role(&self) -> Option<&str> {
        Some(&self.0)
    }
}

/// Identity for callers that presented nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct Anonymous;

impl CallerIdentity for Anonymous {
    fn caller_role(&self) -> Option<&str> {
        None
    }
}

/// Decides whether a verified role may mutate the ledger.
pub trait AuthorizationPolicy: Send + Sync {
    fn allows(&self, role: &str) -> bool;
}

/// Exact match against one privileged role.
#[derive(Debug, Clone)]
pub struct SingleRolePolicy {
    role: String,
}

impl SingleRolePolicy {
    pub fn new(role: impl Into<String>) -> Self {
        Self { role: role.into() }
    }

    pub fn role(&self) -> &str {
        &self.role
    }
}

impl Default for SingleRolePolicy {
    fn default() -> Self {
        Self::new(DEFAULT_ADMIN_ROLE)
    }
}

impl AuthorizationPolicy for SingleRolePolicy {
    fn allows(&self, role: &str) -> bool {
        role == self.role
    }
}

impl<F> AuthorizationPolicy for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn allows(&self, role: &str) -> bool {
        self(role)
    }
}

/// Global gate shared by every mutating operation.
#[derive(Clone)]
pub struct AuthorizationGate {
    policy: Arc<dyn AuthorizationPolicy>,
}

impl AuthorizationGate {
    pub fn new(policy: Arc<dyn AuthorizationPolicy>) -> Self {
        Self { policy }
    }

    /// Gate that admits only `role`.
    pub fn single_role(role: impl Into<String>) -> Self {
        Self::new(Arc::new(SingleRolePolicy::new(role)))
    }

    /// Fails with [`AuthzError::Unauthorized`] unless the policy admits the
    /// caller's role.
    pub fn authorize(&self, caller: &dyn CallerIdentity) -> Result<(), AuthzError> {
        match caller.caller_role() {
            Some(role) if self.policy.allows(role) => Ok(()),
            role => {
                tracing::warn!(role = ?role, "caller rejected by authorization gate");
                Err(AuthzError::Unauthorized {
                    role: role.map(str::to_string),
                })
            }
        }
    }
}

impl Default for AuthorizationGate {
    fn default() -> Self {
        Self::new(Arc::new(SingleRolePolicy::default()))
    }
}

impl std::fmt::Debug for AuthorizationGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthorizationGate").finish_non_exhaustive()
    }
}
