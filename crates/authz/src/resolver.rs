//! Permission resolution.

use std::collections::HashSet;
use std::sync::Arc;

use rankwarden_core::PrincipalId;

use crate::cache::AuthorizationCache;

/// Answers permission queries against the cache.
///
/// Hot path: called for nearly every privileged action. No I/O, no locks
/// beyond the momentary snapshot read, no error values. Absence of a
/// principal or group is a denial, never a failure.
#[derive(Debug)]
pub struct PermissionResolver {
    cache: Arc<AuthorizationCache>,
}

impl PermissionResolver {
    pub fn new(cache: Arc<AuthorizationCache>) -> Self {
        Self { cache }
    }

    /// Whether `principal_id` currently holds `permission`.
    ///
    /// Deny-by-default: empty permission strings, unknown principals, and
    /// groups missing from the snapshot all answer `false`.
    pub fn is_allowed(&self, principal_id: PrincipalId, permission: &str) -> bool {
        if permission.trim().is_empty() {
            return false;
        }

        let snapshot = self.cache.snapshot();
        let Some(group_id) = snapshot.principal_group(principal_id) else {
            return false;
        };
        let Some(cached) = snapshot.group(group_id) else {
            return false;
        };

        grants(&cached.permissions, permission)
    }
}

/// Whether a permission set grants a permission string.
///
/// `permissions` must hold lowercase tokens (snapshots guarantee this).
/// Precedence, broadest first:
/// 1. empty/blank input is denied outright, even against `"*"`;
/// 2. exact `"*"`;
/// 3. exact case-insensitive literal;
/// 4. the trailing-wildcard ladder: for `s0.s1...sN` probe `"*"`, `"s0.*"`,
///    `"s0.s1.*"`, up to `"s0.....s{N-1}.*"`.
///
/// With boolean grants and no deny entries the ladder order cannot change
/// the outcome; it is fixed so traces stay deterministic.
pub fn grants(permissions: &HashSet<String>, permission: &str) -> bool {
    let probe = permission.trim().to_ascii_lowercase();
    if probe.is_empty() {
        return false;
    }

    if permissions.contains("*") {
        return true;
    }
    if permissions.contains(probe.as_str()) {
        return true;
    }

    if probe.contains('.') {
        let segments: Vec<&str> = probe.split('.').collect();
        for prefix_len in 0..segments.len() {
            let mut candidate = String::with_capacity(probe.len() + 1);
            for segment in &segments[..prefix_len] {
                candidate.push_str(segment);
                candidate.push('.');
            }
            candidate.push('*');
            if permissions.contains(candidate.as_str()) {
                return true;
            }
        }
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(perms: &[&str]) -> HashSet<String> {
        perms.iter().map(|p| p.to_lowercase()).collect()
    }

    #[test]
    fn deny_by_default_for_empty_set() {
        assert!(!grants(&set(&[]), "x.y"));
    }

    #[test]
    fn star_grants_everything_non_empty() {
        let perms = set(&["*"]);
        assert!(grants(&perms, "x.y"));
        assert!(grants(&perms, "anything"));
        assert!(grants(&perms, "a.b.c.d.e"));
    }

    #[test]
    fn empty_string_denied_even_with_star() {
        let perms = set(&["*"]);
        assert!(!grants(&perms, ""));
        assert!(!grants(&perms, "   "));
    }

    #[test]
    fn exact_match() {
        let perms = set(&["a.b.c"]);
        assert!(grants(&perms, "a.b.c"));
        assert!(!grants(&perms, "a.b.d"));
    }

    #[test]
    fn matching_is_case_insensitive() {
        let perms = set(&["a.b.c"]);
        assert!(grants(&perms, "A.B.C"));
        assert!(grants(&perms, "a.B.c"));
    }

    #[test]
    fn trailing_wildcard_covers_subtree() {
        let perms = set(&["a.b.*"]);
        assert!(grants(&perms, "a.b.c"));
        assert!(grants(&perms, "a.b.anything"));
        assert!(grants(&perms, "a.b.c.d"));
        assert!(!grants(&perms, "a.c.x"));
    }

    #[test]
    fn wildcard_does_not_match_its_own_prefix() {
        // "a.b.*" covers children of a.b, not "a.b" itself.
        let perms = set(&["a.b.*"]);
        assert!(!grants(&perms, "a.b"));
    }

    #[test]
    fn top_level_wildcard_segment() {
        let perms = set(&["a.*"]);
        assert!(grants(&perms, "a.b"));
        assert!(grants(&perms, "a.b.c"));
        assert!(!grants(&perms, "b.a"));
    }

    #[test]
    fn dot_free_tokens_only_match_literally() {
        let perms = set(&["fly"]);
        assert!(grants(&perms, "fly"));
        assert!(!grants(&perms, "flying"));
        assert!(!grants(&perms, "fly.use"));
    }

    #[test]
    fn resolver_denies_unknown_principal() {
        let cache = Arc::new(AuthorizationCache::new());
        let resolver = PermissionResolver::new(cache);
        assert!(!resolver.is_allowed(PrincipalId::new(), "x.y"));
    }

    #[test]
    fn resolver_rejects_empty_before_lookup() {
        let cache = Arc::new(AuthorizationCache::new());
        let resolver = PermissionResolver::new(cache);
        assert!(!resolver.is_allowed(PrincipalId::new(), ""));
    }
}

#[cfg(test)]
mod properties {
    use super::*;
    use proptest::prelude::*;

    fn token() -> impl Strategy<Value = String> {
        "[a-z][a-z0-9]{0,7}"
    }

    fn permission_string() -> impl Strategy<Value = String> {
        proptest::collection::vec(token(), 1..5).prop_map(|segments| segments.join("."))
    }

    proptest! {
        #[test]
        fn star_allows_any_non_empty(perm in permission_string()) {
            let perms: HashSet<String> = ["*".to_string()].into_iter().collect();
            prop_assert!(grants(&perms, &perm));
        }

        #[test]
        fn empty_set_denies_everything(perm in permission_string()) {
            prop_assert!(!grants(&HashSet::new(), &perm));
        }

        #[test]
        fn literal_always_matches_itself(perm in permission_string()) {
            let perms: HashSet<String> = [perm.clone()].into_iter().collect();
            prop_assert!(grants(&perms, &perm));
            prop_assert!(grants(&perms, &perm.to_uppercase()));
        }

        #[test]
        fn wildcard_covers_every_extension(
            base in proptest::collection::vec(token(), 1..4),
            extension in proptest::collection::vec(token(), 1..3),
        ) {
            let wildcard = format!("{}.*", base.join("."));
            let perms: HashSet<String> = [wildcard].into_iter().collect();
            let query = format!("{}.{}", base.join("."), extension.join("."));
            prop_assert!(grants(&perms, &query));
        }

        #[test]
        fn unrelated_wildcard_never_grants(
            base in proptest::collection::vec(token(), 1..4),
            query in permission_string(),
        ) {
            let joined = base.join(".");
            let wildcard = format!("{joined}.*");
            let perms: HashSet<String> = [wildcard].into_iter().collect();
            // Only queries strictly below the base may be granted.
            if grants(&perms, &query) {
                let prefix = format!("{}.", joined);
                prop_assert!(query.starts_with(&prefix));
            }
        }
    }
}
