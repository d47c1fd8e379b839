use crate::error::QueryError;
use crate::scope::{ScopeContext, ScopeSelector};
use crate::storage::key_path::{ResourceTemplate, prefix_successor, scope_prefix};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, warn};

/// How many hierarchy levels below the resource root a scan prefix fixes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PrefixDepth {
    Root,
    Organization,
    Environment,
}

impl PrefixDepth {
    pub fn levels(self) -> usize {
        match self {
            PrefixDepth::Root => 0,
            PrefixDepth::Organization => 1,
            PrefixDepth::Environment => 2,
        }
    }
}

/// Selector shape matched by one policy rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Match {
    Concrete,
    Wildcard,
    Any,
}

impl Match {
    fn accepts(self, selector: &ScopeSelector) -> bool {
        match self {
            Match::Any => true,
            Match::Concrete => !selector.is_wildcard(),
            Match::Wildcard => selector.is_wildcard(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct PolicyRule {
    /// Per hierarchy level, outermost first.
    levels: [Match; 2],
    depth: PrefixDepth,
}

/// Evaluated top-down, first match wins. The scan prefix is truncated at
/// the shallowest wildcarded level; a wildcard organization also drops the
/// environment, since a fixed environment across varying organizations is
/// not one contiguous range.
const SCOPE_POLICY: [PolicyRule; 3] = [
    PolicyRule {
        levels: [Match::Concrete, Match::Concrete],
        depth: PrefixDepth::Environment,
    },
    PolicyRule {
        levels: [Match::Concrete, Match::Wildcard],
        depth: PrefixDepth::Organization,
    },
    PolicyRule {
        levels: [Match::Wildcard, Match::Any],
        depth: PrefixDepth::Root,
    },
];

/// Half-open byte interval `[start, end)` covering every key with one prefix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangePlan {
    pub start: Vec<u8>,
    pub end: Vec<u8>,
    pub depth: PrefixDepth,
}

impl RangePlan {
    /// Plan covering exactly the keys that start with `prefix`.
    pub fn for_prefix(prefix: Vec<u8>, depth: PrefixDepth) -> Result<Self, QueryError> {
        if prefix.is_empty() {
            return Err(QueryError::InvalidPlan {
                reason: "empty scan prefix would cover the whole keyspace".into(),
            });
        }
        let Some(end) = prefix_successor(&prefix) else {
            return Err(QueryError::InvalidPlan {
                reason: "scan prefix has no finite upper bound".into(),
            });
        };
        Ok(Self {
            start: prefix,
            end,
            depth,
        })
    }

    /// Plan covering one exact key and nothing else.
    pub fn for_key(key: Vec<u8>) -> Result<Self, QueryError> {
        if key.is_empty() {
            return Err(QueryError::InvalidPlan {
                reason: "empty point key".into(),
            });
        }
        let mut end = key.clone();
        end.push(0x00);
        Ok(Self {
            start: key,
            end,
            depth: PrefixDepth::Environment,
        })
    }

    pub fn contains(&self, key: &[u8]) -> bool {
        key >= self.start.as_slice() && key < self.end.as_slice()
    }
}

impl fmt::Display for RangePlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}, {}) depth={:?}",
            String::from_utf8_lossy(&self.start),
            String::from_utf8_lossy(&self.end),
            self.depth
        )
    }
}

/// Picks the prefix depth for `scope` from the policy table.
pub fn select_depth(scope: &ScopeContext) -> PrefixDepth {
    let levels = scope.levels();
    SCOPE_POLICY
        .iter()
        .find(|rule| {
            rule.levels
                .iter()
                .zip(levels.iter())
                .all(|(m, selector)| m.accepts(selector))
        })
        .map_or(PrefixDepth::Root, |rule| rule.depth)
}

/// Computes the tightest contiguous range visible under `scope`.
pub fn plan_range(
    template: &ResourceTemplate,
    scope: &ScopeContext,
) -> Result<RangePlan, QueryError> {
    let depth = select_depth(scope);
    let concrete: Vec<&str> = scope
        .levels()
        .into_iter()
        .take(depth.levels())
        .filter_map(ScopeSelector::as_concrete)
        .collect();
    if concrete.len() != depth.levels() {
        return Err(QueryError::InvalidPlan {
            reason: format!("scope {scope} cannot fix {depth:?} levels"),
        });
    }
    if depth == PrefixDepth::Root && !scope.environment().is_wildcard() {
        warn!(
            root = template.root(),
            environment = %scope.environment(),
            "environment selector ignored under wildcard organization"
        );
    }
    let prefix = scope_prefix(template, &concrete)?;
    let plan = RangePlan::for_prefix(prefix, depth)?;
    debug!(root = template.root(), scope = %scope, plan = %plan, "planned scoped range");
    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::{PrefixDepth, RangePlan, plan_range, select_depth};
    use crate::error::QueryErrorCode;
    use crate::scope::ScopeContext;
    use crate::storage::key_path::{ResourceTemplate, encode_key};
    use proptest::prelude::*;

    fn checks() -> ResourceTemplate {
        ResourceTemplate::new("/scopekv", "checks").expect("template")
    }

    #[test]
    fn policy_table_truncates_at_shallowest_wildcard() {
        let cases = [
            (ScopeContext::tenant("acme", "dev"), PrefixDepth::Environment),
            (ScopeContext::organization_wide("acme"), PrefixDepth::Organization),
            (ScopeContext::from_request("*", "dev"), PrefixDepth::Root),
            (ScopeContext::all(), PrefixDepth::Root),
        ];
        for (scope, depth) in cases {
            assert_eq!(select_depth(&scope), depth, "{scope}");
        }
    }

    #[test]
    fn plans_cover_the_expected_prefixes() {
        let t = checks();
        let plan = plan_range(&t, &ScopeContext::tenant("acme", "dev")).expect("plan");
        assert_eq!(plan.start, b"/scopekv/checks/acme/dev/".to_vec());
        assert_eq!(plan.end, b"/scopekv/checks/acme/dev0".to_vec());

        let plan = plan_range(&t, &ScopeContext::organization_wide("acme")).expect("plan");
        assert_eq!(plan.start, b"/scopekv/checks/acme/".to_vec());
        assert_eq!(plan.end, b"/scopekv/checks/acme0".to_vec());

        let plan = plan_range(&t, &ScopeContext::from_request("*", "default")).expect("plan");
        assert_eq!(plan.start, b"/scopekv/checks/".to_vec());
        assert_eq!(plan.end, b"/scopekv/checks0".to_vec());
        assert_eq!(plan.depth, PrefixDepth::Root);
    }

    #[test]
    fn sibling_tenants_fall_outside_the_plan() {
        let t = checks();
        let plan = plan_range(&t, &ScopeContext::organization_wide("acme")).expect("plan");
        let inside = encode_key(&t, "acme", "dev", Some("c")).expect("key");
        let sibling = encode_key(&t, "acme-corp", "dev", Some("c")).expect("key");
        let other = encode_key(&t, "default", "default", Some("c")).expect("key");
        assert!(plan.contains(&inside));
        assert!(!plan.contains(&sibling));
        assert!(!plan.contains(&other));
    }

    #[test]
    fn concrete_scope_rejects_invalid_tenant_names() {
        let err = plan_range(&checks(), &ScopeContext::tenant("ac/me", "dev"))
            .expect_err("invalid segment");
        assert_eq!(err.code(), QueryErrorCode::InvalidSegment);
    }

    #[test]
    fn degenerate_prefixes_are_rejected() {
        let err = RangePlan::for_prefix(Vec::new(), PrefixDepth::Root).expect_err("empty");
        assert_eq!(err.code(), QueryErrorCode::InvalidPlan);
        let err = RangePlan::for_prefix(vec![0xFF, 0xFF], PrefixDepth::Root).expect_err("no end");
        assert_eq!(err.code(), QueryErrorCode::InvalidPlan);
    }

    #[test]
    fn point_plan_covers_only_its_key() {
        let plan = RangePlan::for_key(b"/r/a/b/c".to_vec()).expect("plan");
        assert!(plan.contains(b"/r/a/b/c"));
        assert!(!plan.contains(b"/r/a/b/c2"));
        assert!(!plan.contains(b"/r/a/b/b"));
    }

    proptest! {
        #[test]
        fn prefix_range_matches_exactly_the_prefixed_keys(
            prefix in prop::collection::vec(any::<u8>(), 1..8)
                .prop_filter("has finite end", |p| p.iter().any(|b| *b != 0xFF)),
            suffix in prop::collection::vec(any::<u8>(), 0..8),
            other in prop::collection::vec(any::<u8>(), 0..12),
        ) {
            let plan = RangePlan::for_prefix(prefix.clone(), PrefixDepth::Root).expect("plan");
            let mut with_prefix = prefix.clone();
            with_prefix.extend_from_slice(&suffix);
            prop_assert!(plan.contains(&with_prefix));
            prop_assert_eq!(plan.contains(&other), other.starts_with(&prefix));
        }
    }
}
