use crate::locality::{LocalityError, Scope, ScwRegion};
use std::fmt::Display;
use std::str::FromStr;
use uuid::Uuid;

const HYPHENATED_UUID_LENGTH: usize = 36;

/// Only the hyphenated form is accepted, `Uuid::parse_str` alone would also take simple and urn forms.
pub fn is_uuid(raw: &str) -> bool {
    raw.len() == HYPHENATED_UUID_LENGTH && Uuid::parse_str(raw).is_ok()
}

pub fn new_scoped_id(scope: impl Display, id: &str) -> String {
    format!("{scope}/{id}")
}

/// Splits `SCOPE/UUID`, anything else is an invalid id.
pub fn parse_scoped_id(raw: &str) -> Result<(Scope, String), LocalityError> {
    let parts: Vec<&str> = raw.split('/').collect();
    if parts.len() != 2 {
        return Err(LocalityError::InvalidId {
            raw_id: raw.to_string(),
            reason: "expected format SCOPE/UUID".to_string(),
        });
    }

    let scope = parse_scope_segment(raw, parts[0])?;
    if !is_uuid(parts[1]) {
        return Err(LocalityError::InvalidId {
            raw_id: raw.to_string(),
            reason: format!("`{}` is not a UUID", parts[1]),
        });
    }

    Ok((scope, parts[1].to_string()))
}

/// Accepts a bare UUID or a scoped id and returns the UUID.
pub fn expand_id(raw: &str) -> Result<String, LocalityError> {
    if is_uuid(raw) {
        return Ok(raw.to_string());
    }

    parse_scoped_id(raw).map(|(_, id)| id)
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChildId {
    pub scope: Scope,
    pub parent_id: String,
    pub subparts: Vec<String>,
}

impl ChildId {
    pub fn subpart(&self, index: usize) -> &str {
        self.subparts.get(index).map(String::as_str).unwrap_or_default()
    }
}

pub fn new_child_id(scope: impl Display, parent_id: &str, subparts: &[&str]) -> String {
    let mut id = new_scoped_id(scope, parent_id);
    for subpart in subparts {
        id.push('/');
        id.push_str(subpart);
    }
    id
}

/// Inverse of [`new_child_id`], the number of sub-parts must match exactly.
pub fn parse_child_id(raw: &str, expected_subparts: usize) -> Result<ChildId, LocalityError> {
    let parts: Vec<&str> = raw.split('/').collect();
    if parts.len() != expected_subparts + 2 {
        return Err(LocalityError::InvalidId {
            raw_id: raw.to_string(),
            reason: format!(
                "expected format SCOPE/UUID followed by {expected_subparts} segment(s), got {} segment(s)",
                parts.len()
            ),
        });
    }

    let scope = parse_scope_segment(raw, parts[0])?;
    if !is_uuid(parts[1]) {
        return Err(LocalityError::InvalidId {
            raw_id: raw.to_string(),
            reason: format!("`{}` is not a UUID", parts[1]),
        });
    }
    if parts[2..].iter().any(|p| p.is_empty()) {
        return Err(LocalityError::InvalidId {
            raw_id: raw.to_string(),
            reason: "empty segment".to_string(),
        });
    }

    Ok(ChildId {
        scope,
        parent_id: parts[1].to_string(),
        subparts: parts[2..].iter().map(|p| p.to_string()).collect(),
    })
}

/// Splits `SCOPE/rest` on the first slash, `rest` being free form (bucket names, object keys).
pub fn parse_scoped_path(raw: &str) -> Result<(Scope, String), LocalityError> {
    match raw.split_once('/') {
        Some((scope, rest)) if !rest.is_empty() => Ok((parse_scope_segment(raw, scope)?, rest.to_string())),
        _ => Err(LocalityError::InvalidId {
            raw_id: raw.to_string(),
            reason: "expected format SCOPE/NAME".to_string(),
        }),
    }
}

/// Accepts `name` or `region/name`, falling back on the given region for the former.
pub fn expand_region_and_name(raw: &str, fallback: ScwRegion) -> Result<(ScwRegion, String), LocalityError> {
    match raw.split_once('/') {
        None => Ok((fallback, raw.to_string())),
        Some((region, name)) if !name.is_empty() && !name.contains('/') => {
            let region = ScwRegion::from_str(region).map_err(|e| LocalityError::InvalidId {
                raw_id: raw.to_string(),
                reason: e.to_string(),
            })?;
            Ok((region, name.to_string()))
        }
        Some(_) => Err(LocalityError::InvalidId {
            raw_id: raw.to_string(),
            reason: "expected format NAME or REGION/NAME".to_string(),
        }),
    }
}

/// A bare UUID and a scoped id naming the same UUID are the same reference.
pub fn diff_suppress_locality(old: &str, new: &str) -> bool {
    if old == new {
        return true;
    }

    match (expand_id(old), expand_id(new)) {
        (Ok(old_id), Ok(new_id)) => old_id == new_id,
        _ => false,
    }
}

fn parse_scope_segment(raw: &str, segment: &str) -> Result<Scope, LocalityError> {
    if segment.is_empty() {
        return Err(LocalityError::InvalidId {
            raw_id: raw.to_string(),
            reason: "missing scope".to_string(),
        });
    }

    Scope::from_str(segment).map_err(|e| LocalityError::InvalidId {
        raw_id: raw.to_string(),
        reason: e.to_string(),
    })
}
