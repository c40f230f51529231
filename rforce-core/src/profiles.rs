//! Named region presets.
//!
//! A profile fixes the geographic box to extract and the base list of variables for a project.
//! Profiles are static and looked up by name with [`RegionProfile::find`].
//!
//! ```rust
//! use rforce_core::profiles::RegionProfile;
//!
//! let profile = RegionProfile::find("ROHO800").unwrap();
//! assert_eq!(profile.region.area(), "62/1/56/10");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::{ForcingError, ForcingResult};
use crate::standard_variables::BASE_VARIABLES;
use crate::variable::Era5Variable;

/// Geographic extent in degrees, ordered as the archive expects it (North/West/South/East).
///
/// West may be greater than east for boxes that cross the antimeridian.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegionBox {
    pub north: f64,
    pub west: f64,
    pub south: f64,
    pub east: f64,
}

impl RegionBox {
    pub const fn new(north: f64, west: f64, south: f64, east: f64) -> Self {
        Self {
            north,
            west,
            south,
            east,
        }
    }

    /// Check latitude ordering and coordinate bounds.
    pub fn validate(&self) -> ForcingResult<()> {
        let values = [self.north, self.west, self.south, self.east];
        if values.iter().any(|v| !v.is_finite()) {
            return Err(ForcingError::InvalidRegion(format!(
                "non-finite coordinate in {}",
                self
            )));
        }
        if !(-90.0..=90.0).contains(&self.north) || !(-90.0..=90.0).contains(&self.south) {
            return Err(ForcingError::InvalidRegion(format!(
                "latitudes must lie within [-90, 90] in {}",
                self
            )));
        }
        if self.north < self.south {
            return Err(ForcingError::InvalidRegion(format!(
                "north ({}) is south of south ({})",
                self.north, self.south
            )));
        }
        if !(-180.0..=360.0).contains(&self.west) || !(-180.0..=360.0).contains(&self.east) {
            return Err(ForcingError::InvalidRegion(format!(
                "longitudes must lie within [-180, 360] in {}",
                self
            )));
        }
        Ok(())
    }

    /// Whether the box crosses the antimeridian.
    pub fn wraps(&self) -> bool {
        self.west > self.east
    }

    /// The `N/W/S/E` string used in archive requests.
    pub fn area(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for RegionBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}/{}", self.north, self.west, self.south, self.east)
    }
}

/// A registered project preset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegionProfile {
    pub name: &'static str,
    pub region: RegionBox,
    /// Variables requested before the shortwave variant and optional extras are added
    pub base_variables: &'static [Era5Variable],
}

/// All registered profiles.
pub static REGION_PROFILES: [RegionProfile; 2] = [
    RegionProfile {
        name: "ROHO800",
        region: RegionBox::new(62.0, 1.0, 56.0, 10.0),
        base_variables: &BASE_VARIABLES,
    },
    RegionProfile {
        name: "A20",
        region: RegionBox::new(90.0, -180.0, 40.0, 180.0),
        base_variables: &BASE_VARIABLES,
    },
];

impl RegionProfile {
    /// Look up a registered profile by name.
    pub fn find(name: &str) -> ForcingResult<&'static RegionProfile> {
        REGION_PROFILES
            .iter()
            .find(|p| p.name == name)
            .ok_or_else(|| ForcingError::UnknownProfile(name.to_string(), Self::names().join(", ")))
    }

    pub fn names() -> Vec<&'static str> {
        REGION_PROFILES.iter().map(|p| p.name).collect()
    }
}
