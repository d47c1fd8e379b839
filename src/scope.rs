use serde::{Deserialize, Serialize};
use std::fmt;

/// Reserved selector value meaning "every tenant at this level".
pub const WILDCARD: &str = "*";

/// Query-time selector for one level of the tenant hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ScopeSelector {
    Concrete(String),
    Wildcard,
}

impl ScopeSelector {
    /// Interprets caller input, mapping the reserved sentinel to `Wildcard`.
    pub fn parse(value: &str) -> Self {
        if value == WILDCARD {
            ScopeSelector::Wildcard
        } else {
            ScopeSelector::Concrete(value.to_string())
        }
    }

    pub fn concrete(name: impl Into<String>) -> Self {
        ScopeSelector::Concrete(name.into())
    }

    pub fn is_wildcard(&self) -> bool {
        matches!(self, ScopeSelector::Wildcard)
    }

    pub fn as_concrete(&self) -> Option<&str> {
        match self {
            ScopeSelector::Concrete(name) => Some(name.as_str()),
            ScopeSelector::Wildcard => None,
        }
    }
}

impl fmt::Display for ScopeSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScopeSelector::Concrete(name) => f.write_str(name),
            ScopeSelector::Wildcard => f.write_str(WILDCARD),
        }
    }
}

impl From<String> for ScopeSelector {
    fn from(value: String) -> Self {
        if value == WILDCARD {
            ScopeSelector::Wildcard
        } else {
            ScopeSelector::Concrete(value)
        }
    }
}

impl From<ScopeSelector> for String {
    fn from(value: ScopeSelector) -> Self {
        match value {
            ScopeSelector::Concrete(name) => name,
            ScopeSelector::Wildcard => WILDCARD.to_string(),
        }
    }
}

/// The caller's tenant scope for one request.
///
/// Built once from caller identity or input and passed by reference into
/// every query; there are no mutators.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScopeContext {
    organization: ScopeSelector,
    environment: ScopeSelector,
}

impl ScopeContext {
    pub fn new(organization: ScopeSelector, environment: ScopeSelector) -> Self {
        Self {
            organization,
            environment,
        }
    }

    /// Parses raw caller input where `"*"` selects every tenant at that level.
    pub fn from_request(organization: &str, environment: &str) -> Self {
        Self::new(
            ScopeSelector::parse(organization),
            ScopeSelector::parse(environment),
        )
    }

    pub fn tenant(organization: impl Into<String>, environment: impl Into<String>) -> Self {
        Self::new(
            ScopeSelector::Concrete(organization.into()),
            ScopeSelector::Concrete(environment.into()),
        )
    }

    pub fn organization_wide(organization: impl Into<String>) -> Self {
        Self::new(
            ScopeSelector::Concrete(organization.into()),
            ScopeSelector::Wildcard,
        )
    }

    pub fn all() -> Self {
        Self::new(ScopeSelector::Wildcard, ScopeSelector::Wildcard)
    }

    pub fn organization(&self) -> &ScopeSelector {
        &self.organization
    }

    pub fn environment(&self) -> &ScopeSelector {
        &self.environment
    }

    /// Selectors ordered from the outermost hierarchy level inwards.
    pub fn levels(&self) -> [&ScopeSelector; 2] {
        [&self.organization, &self.environment]
    }
}

impl fmt::Display for ScopeContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.organization, self.environment)
    }
}
