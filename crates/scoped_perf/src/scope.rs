//! Scope identifiers and name scoping

use std::fmt;
use std::sync::Arc;

/// Separator between a scope identifier and a logical name.
pub const SEPARATOR: &str = "::";

/// Produces a fresh scope identifier.
pub type IdGenerator = Arc<dyn Fn() -> String + Send + Sync>;

/// The default generator: a random UUID v4.
///
/// The hyphenated UUID alphabet never contains the separator.
pub fn default_id_generator() -> IdGenerator {
    Arc::new(|| uuid::Uuid::new_v4().to_string())
}

/// Identifier of one scope, with its name prefix precomputed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScopeId {
    id: String,
    prefix: String,
}

impl ScopeId {
    /// Create a scope identifier.
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        let prefix = format!("{id}{SEPARATOR}");
        Self { id, prefix }
    }

    /// Generate an identifier with the given generator.
    pub fn generate(generator: &IdGenerator) -> Self {
        Self::new(generator())
    }

    /// The raw identifier.
    pub fn as_str(&self) -> &str {
        &self.id
    }

    /// The prefix carried by every name in this scope.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Rewrite a logical name into this scope.
    pub fn scope(&self, name: &str) -> String {
        format!("{}{}", self.prefix, name)
    }

    /// Recover the logical name, or `None` if the name is not in this scope.
    pub fn unscope<'a>(&self, scoped: &'a str) -> Option<&'a str> {
        scoped.strip_prefix(self.prefix.as_str())
    }

    /// Whether a registry name belongs to this scope.
    pub fn owns(&self, scoped: &str) -> bool {
        scoped.starts_with(self.prefix.as_str())
    }
}

impl fmt::Display for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_scope_and_unscope() {
        let scope = ScopeId::new("server");
        assert_eq!(scope.prefix(), "server::");
        assert_eq!(scope.to_string(), "server");
        assert_eq!(scope.scope("start"), "server::start");
        assert_eq!(scope.unscope("server::start"), Some("start"));
        assert_eq!(scope.unscope("client::start"), None);
        assert!(scope.owns("server::"));
        assert!(!scope.owns("server:start"));
    }

    #[test]
    fn test_prefix_requires_full_separator() {
        let scope = ScopeId::new("a");
        assert!(!scope.owns("ab::x"));
        assert_eq!(scope.unscope("a::b::x"), Some("b::x"));
    }

    #[test]
    fn test_default_generator_is_unique() {
        let generator = default_id_generator();
        let a = ScopeId::generate(&generator);
        let b = ScopeId::generate(&generator);

        assert_ne!(a, b);
        assert!(!a.as_str().contains(SEPARATOR));
    }

    proptest! {
        #[test]
        fn prop_unscope_inverts_scope(id in "[a-z0-9-]{1,16}", name in "\\PC*") {
            let scope = ScopeId::new(id);
            let scoped = scope.scope(&name);
            prop_assert!(scope.owns(&scoped));
            prop_assert_eq!(scope.unscope(&scoped), Some(name.as_str()));
        }

        #[test]
        fn prop_disjoint_scopes_never_own_each_other(
            a in "[a-z0-9]{1,8}",
            b in "[a-z0-9]{1,8}",
            name in "[a-z:]{0,12}",
        ) {
            prop_assume!(a != b);
            let (sa, sb) = (ScopeId::new(a), ScopeId::new(b));
            prop_assert!(!sb.owns(&sa.scope(&name)));
            prop_assert!(!sa.owns(&sb.scope(&name)));
        }
    }
}
