use crate::error::QueryError;
use crate::scope::WILDCARD;
use std::fmt;

/// Byte joining key segments. Never legal inside a segment.
pub const SEPARATOR: u8 = b'/';
const SEPARATOR_CHAR: char = SEPARATOR as char;

/// Storage root of one resource type, e.g. `/scopekv/checks`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceTemplate {
    tag: String,
    root: String,
}

impl ResourceTemplate {
    /// Builds `<key_prefix>/<tag>`. An empty prefix yields the bare tag.
    pub fn new(key_prefix: &str, tag: &str) -> Result<Self, QueryError> {
        validate_segment(tag, "resource tag")?;
        let root = if key_prefix.is_empty() {
            tag.to_string()
        } else {
            format!("{key_prefix}{SEPARATOR_CHAR}{tag}")
        };
        Self::from_root(tag, root)
    }

    pub fn from_root(tag: impl Into<String>, root: impl Into<String>) -> Result<Self, QueryError> {
        let tag = tag.into();
        let root = root.into();
        if root.is_empty() {
            return Err(QueryError::invalid_segment(&root, "resource root must not be empty"));
        }
        if root.ends_with(SEPARATOR_CHAR) {
            return Err(QueryError::invalid_segment(
                &root,
                "resource root must not end with the separator",
            ));
        }
        if root.split(SEPARATOR_CHAR).any(|part| part == WILDCARD) {
            return Err(QueryError::invalid_segment(
                &root,
                "resource root must not contain the wildcard sentinel",
            ));
        }
        Ok(Self { tag, root })
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn root(&self) -> &str {
        &self.root
    }
}

/// A fully concrete stored location under some resource root.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct KeyPath {
    organization: String,
    environment: String,
    name: String,
}

impl KeyPath {
    pub fn new(
        organization: impl Into<String>,
        environment: impl Into<String>,
        name: impl Into<String>,
    ) -> Result<Self, QueryError> {
        let path = Self {
            organization: organization.into(),
            environment: environment.into(),
            name: name.into(),
        };
        validate_tenant_segment(&path.organization, "organization")?;
        validate_tenant_segment(&path.environment, "environment")?;
        validate_segment(&path.name, "resource name")?;
        Ok(path)
    }

    pub fn organization(&self) -> &str {
        &self.organization
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn into_parts(self) -> (String, String, String) {
        (self.organization, self.environment, self.name)
    }

    pub fn encode(&self, template: &ResourceTemplate) -> Vec<u8> {
        let mut out = prefix_bytes(
            template,
            &[self.organization.as_str(), self.environment.as_str()],
        );
        out.extend_from_slice(self.name.as_bytes());
        out
    }

    pub fn decode(template: &ResourceTemplate, key: &[u8]) -> Result<Self, QueryError> {
        let root = template.root().as_bytes();
        let rest = key
            .strip_prefix(root)
            .and_then(|rest| rest.strip_prefix(&[SEPARATOR]))
            .ok_or_else(|| {
                QueryError::malformed_key(
                    key,
                    format!("key is not under resource root {:?}", template.root()),
                )
            })?;
        let rest = std::str::from_utf8(rest)
            .map_err(|e| QueryError::malformed_key(key, format!("key is not utf-8: {e}")))?;
        let segments: Vec<&str> = rest.split(SEPARATOR_CHAR).collect();
        let [organization, environment, name] = segments.as_slice() else {
            return Err(QueryError::malformed_key(
                key,
                format!("expected 3 segments below root, found {}", segments.len()),
            ));
        };
        if organization.is_empty() || environment.is_empty() || name.is_empty() {
            return Err(QueryError::malformed_key(key, "key contains an empty segment"));
        }
        Ok(Self {
            organization: (*organization).to_string(),
            environment: (*environment).to_string(),
            name: (*name).to_string(),
        })
    }
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.organization, self.environment, self.name)
    }
}

/// Canonical key for a resource. Without a name, the tenant-pair prefix.
pub fn encode_key(
    template: &ResourceTemplate,
    organization: &str,
    environment: &str,
    name: Option<&str>,
) -> Result<Vec<u8>, QueryError> {
    match name {
        Some(name) => Ok(KeyPath::new(organization, environment, name)?.encode(template)),
        None => prefix_of(template, Some(organization), Some(environment)),
    }
}

pub fn decode_key(
    template: &ResourceTemplate,
    key: &[u8],
) -> Result<(String, String, String), QueryError> {
    KeyPath::decode(template, key).map(KeyPath::into_parts)
}

/// Partial key `root/[org/[env/]]`, always terminated by the separator.
pub fn prefix_of(
    template: &ResourceTemplate,
    organization: Option<&str>,
    environment: Option<&str>,
) -> Result<Vec<u8>, QueryError> {
    match (organization, environment) {
        (None, None) => scope_prefix(template, &[]),
        (Some(org), None) => scope_prefix(template, &[org]),
        (Some(org), Some(env)) => scope_prefix(template, &[org, env]),
        (None, Some(env)) => Err(QueryError::invalid_segment(
            env,
            "environment prefix requires an organization",
        )),
    }
}

/// Prefix for the first `levels.len()` hierarchy levels, outermost first.
pub fn scope_prefix(template: &ResourceTemplate, levels: &[&str]) -> Result<Vec<u8>, QueryError> {
    for (depth, segment) in levels.iter().enumerate() {
        validate_tenant_segment(segment, level_name(depth))?;
    }
    Ok(prefix_bytes(template, levels))
}

/// Smallest byte string greater than every string starting with `prefix`.
///
/// Returns `None` when no such bound exists (empty or all-`0xFF` prefix).
pub fn prefix_successor(prefix: &[u8]) -> Option<Vec<u8>> {
    let mut next = prefix.to_vec();
    for i in (0..next.len()).rev() {
        if next[i] != 0xFF {
            next[i] += 1;
            next.truncate(i + 1);
            return Some(next);
        }
    }
    None
}

fn prefix_bytes(template: &ResourceTemplate, levels: &[&str]) -> Vec<u8> {
    let len = template.root().len() + 1 + levels.iter().map(|s| s.len() + 1).sum::<usize>();
    let mut out = Vec::with_capacity(len);
    out.extend_from_slice(template.root().as_bytes());
    out.push(SEPARATOR);
    for segment in levels {
        out.extend_from_slice(segment.as_bytes());
        out.push(SEPARATOR);
    }
    out
}

fn level_name(depth: usize) -> &'static str {
    match depth {
        0 => "organization",
        1 => "environment",
        _ => "scope level",
    }
}

fn validate_tenant_segment(segment: &str, name: &str) -> Result<(), QueryError> {
    validate_segment(segment, name)?;
    if segment == WILDCARD {
        return Err(QueryError::invalid_segment(
            segment,
            format!("{name} must not be the wildcard sentinel"),
        ));
    }
    Ok(())
}

fn validate_segment(segment: &str, name: &str) -> Result<(), QueryError> {
    if segment.is_empty() {
        return Err(QueryError::invalid_segment(
            segment,
            format!("{name} must not be empty"),
        ));
    }
    if segment.as_bytes().contains(&SEPARATOR) {
        return Err(QueryError::invalid_segment(
            segment,
            format!("{name} must not contain {SEPARATOR_CHAR:?}"),
        ));
    }
    Ok(())
}
