//! Authorization Adapter: queries an external principal for role/policy
//! membership required by annotated types and fields. The engine never
//! inspects the principal's identity itself, only whether it satisfies a
//! named requirement; an unauthorized result surfaces the rule that
//! failed but not the identity of the missing role/claim.

/// Implemented by the embedder over whatever request-scoped principal
/// their authentication layer produces: an opaque principal with a
/// role/claim lookup capability, nothing more.
pub trait PrincipalAdapter: Send + Sync {
    fn satisfies(&self, requirement: &str) -> bool;

    fn satisfies_all(&self, requirements: &[String]) -> bool {
        requirements.iter().all(|r| self.satisfies(r))
    }
}

/// A principal that satisfies every requirement; useful for tests and for
/// embedders with no authorization model.
#[derive(Clone, Copy, Debug, Default)]
pub struct AllowAll;

impl PrincipalAdapter for AllowAll {
    fn satisfies(&self, _requirement: &str) -> bool {
        true
    }
}

/// A principal holding a fixed set of satisfied roles/claims.
#[derive(Clone, Debug, Default)]
pub struct RoleSetPrincipal {
    roles: std::collections::HashSet<String>,
}

impl RoleSetPrincipal {
    pub fn new(roles: impl IntoIterator<Item = String>) -> Self {
        Self {
            roles: roles.into_iter().collect(),
        }
    }
}

impl PrincipalAdapter for RoleSetPrincipal {
    fn satisfies(&self, requirement: &str) -> bool {
        self.roles.contains(requirement)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allow_all_satisfies_any_requirement_including_none() {
        let principal = AllowAll;
        assert!(principal.satisfies("admin"));
        assert!(principal.satisfies_all(&["admin".to_string(), "owner".to_string()]));
        assert!(principal.satisfies_all(&[]));
    }

    #[test]
    fn role_set_principal_only_satisfies_its_own_roles() {
        let principal = RoleSetPrincipal::new(["admin".to_string()]);
        assert!(principal.satisfies("admin"));
        assert!(!principal.satisfies("owner"));
        assert!(principal.satisfies_all(&[]));
        assert!(!principal.satisfies_all(&["admin".to_string(), "owner".to_string()]));
    }
}
