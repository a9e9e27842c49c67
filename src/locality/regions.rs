use crate::locality::LocalityError;
use std::fmt;
use std::str::FromStr;
use strum_macros::EnumIter;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, EnumIter)]
pub enum ScwRegion {
    Paris,
    Amsterdam,
    Warsaw,
}

impl ScwRegion {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScwRegion::Paris => "fr-par",
            ScwRegion::Amsterdam => "nl-ams",
            ScwRegion::Warsaw => "pl-waw",
        }
    }

    /// First zone of the region, used when only a region is configured.
    pub fn default_zone(&self) -> ScwZone {
        match self {
            ScwRegion::Paris => ScwZone::Paris1,
            ScwRegion::Amsterdam => ScwZone::Amsterdam1,
            ScwRegion::Warsaw => ScwZone::Warsaw1,
        }
    }

    /// S3 compatible endpoint serving the region.
    pub fn object_storage_endpoint(&self) -> String {
        format!("https://s3.{}.scw.cloud", self.as_str())
    }
}

impl fmt::Display for ScwRegion {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScwRegion {
    type Err = LocalityError;

    fn from_str(s: &str) -> Result<ScwRegion, LocalityError> {
        match s {
            "fr-par" => Ok(ScwRegion::Paris),
            "nl-ams" => Ok(ScwRegion::Amsterdam),
            "pl-waw" => Ok(ScwRegion::Warsaw),
            _ => Err(LocalityError::UnknownRegion(s.to_string())),
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, EnumIter)]
pub enum ScwZone {
    Paris1,
    Paris2,
    Paris3,
    Amsterdam1,
    Amsterdam2,
    Amsterdam3,
    Warsaw1,
    Warsaw2,
    Warsaw3,
}

impl ScwZone {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScwZone::Paris1 => "fr-par-1",
            ScwZone::Paris2 => "fr-par-2",
            ScwZone::Paris3 => "fr-par-3",
            ScwZone::Amsterdam1 => "nl-ams-1",
            ScwZone::Amsterdam2 => "nl-ams-2",
            ScwZone::Amsterdam3 => "nl-ams-3",
            ScwZone::Warsaw1 => "pl-waw-1",
            ScwZone::Warsaw2 => "pl-waw-2",
            ScwZone::Warsaw3 => "pl-waw-3",
        }
    }

    pub fn region(&self) -> ScwRegion {
        match self {
            ScwZone::Paris1 | ScwZone::Paris2 | ScwZone::Paris3 => ScwRegion::Paris,
            ScwZone::Amsterdam1 | ScwZone::Amsterdam2 | ScwZone::Amsterdam3 => ScwRegion::Amsterdam,
            ScwZone::Warsaw1 | ScwZone::Warsaw2 | ScwZone::Warsaw3 => ScwRegion::Warsaw,
        }
    }
}

impl fmt::Display for ScwZone {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScwZone {
    type Err = LocalityError;

    fn from_str(s: &str) -> Result<ScwZone, LocalityError> {
        match s {
            "fr-par-1" => Ok(ScwZone::Paris1),
            "fr-par-2" => Ok(ScwZone::Paris2),
            "fr-par-3" => Ok(ScwZone::Paris3),
            "nl-ams-1" => Ok(ScwZone::Amsterdam1),
            "nl-ams-2" => Ok(ScwZone::Amsterdam2),
            "nl-ams-3" => Ok(ScwZone::Amsterdam3),
            "pl-waw-1" => Ok(ScwZone::Warsaw1),
            "pl-waw-2" => Ok(ScwZone::Warsaw2),
            "pl-waw-3" => Ok(ScwZone::Warsaw3),
            _ => Err(LocalityError::UnknownZone(s.to_string())),
        }
    }
}
