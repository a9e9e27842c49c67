//! Geographic partitioning of Scaleway resources.
//!
//! Every managed resource lives in exactly one region or zone, and its stored
//! identifier starts with that scope label: `fr-par/<uuid>`, `fr-par-1/<uuid>`,
//! `fr-par/<instance uuid>/<database>/<user>`.

mod regions;
mod scoped_id;

pub use regions::{ScwRegion, ScwZone};
pub use scoped_id::{
    ChildId, diff_suppress_locality, expand_id, expand_region_and_name, is_uuid, new_child_id, new_scoped_id,
    parse_child_id, parse_scoped_id, parse_scoped_path,
};

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Clone, Error, Debug, PartialEq, Eq)]
pub enum LocalityError {
    #[error("Invalid id `{raw_id}`: {reason}.")]
    InvalidId { raw_id: String, reason: String },
    #[error("Unknown region `{0}`.")]
    UnknownRegion(String),
    #[error("Unknown zone `{0}`.")]
    UnknownZone(String),
    #[error("Unknown scope `{0}`, expected a region or a zone.")]
    UnknownScope(String),
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum ScopeKind {
    Region,
    Zone,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Scope {
    Region(ScwRegion),
    Zone(ScwZone),
}

impl Scope {
    pub fn kind(&self) -> ScopeKind {
        match self {
            Scope::Region(_) => ScopeKind::Region,
            Scope::Zone(_) => ScopeKind::Zone,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::Region(region) => region.as_str(),
            Scope::Zone(zone) => zone.as_str(),
        }
    }

    /// Region containing the scope.
    pub fn region(&self) -> ScwRegion {
        match self {
            Scope::Region(region) => *region,
            Scope::Zone(zone) => zone.region(),
        }
    }

    pub fn as_zone(&self) -> Option<ScwZone> {
        match self {
            Scope::Zone(zone) => Some(*zone),
            Scope::Region(_) => None,
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<ScwRegion> for Scope {
    fn from(region: ScwRegion) -> Self {
        Scope::Region(region)
    }
}

impl From<ScwZone> for Scope {
    fn from(zone: ScwZone) -> Self {
        Scope::Zone(zone)
    }
}

impl FromStr for Scope {
    type Err = LocalityError;

    fn from_str(s: &str) -> Result<Scope, LocalityError> {
        if let Ok(zone) = ScwZone::from_str(s) {
            return Ok(Scope::Zone(zone));
        }
        if let Ok(region) = ScwRegion::from_str(s) {
            return Ok(Scope::Region(region));
        }

        Err(LocalityError::UnknownScope(s.to_string()))
    }
}
