//! Parameter catalog for ERA5 single-level variables.
//!
//! This module provides the registry that maps a canonical archive identifier
//! (for example `mean_sea_level_pressure`) to everything downstream code needs to know
//! about that variable:
//! - the archive parameter code used to address it in a retrieval request
//! - the short code used as the field name in the retrieved files
//! - the name expected by the ROMS bulk-flux forcing reader
//! - its physical unit and the name of its private time axis
//!
//! The set of identifiers is closed ([`Era5Variable`]) and every identifier has exactly one
//! entry, enforced by an exhaustive match in [`crate::standard_variables`].
//! The process-wide catalog is available as [`PARAMETER_CATALOG`].
//!
//! # Usage
//!
//! ```rust
//! use rforce_core::variable::PARAMETER_CATALOG;
//!
//! let entry = PARAMETER_CATALOG.lookup("mean_sea_level_pressure").unwrap();
//! assert_eq!(entry.short_code, "msl");
//! assert_eq!(entry.model_name, "Pair");
//! assert_eq!(entry.time_axis_name, "pair_time");
//! ```

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use crate::errors::{ForcingError, ForcingResult};
use crate::standard_variables::era5_parameter;

/// Canonical identifiers of the ERA5 variables known to the catalog.
///
/// The declaration order of [`Era5Variable::ALL`] is the enumeration order of the catalog
/// and is relied upon to build reproducible variable lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Era5Variable {
    #[serde(rename = "2m_temperature")]
    Temperature2m,
    #[serde(rename = "2m_dewpoint_temperature")]
    DewpointTemperature2m,
    SpecificHumidity,
    #[serde(rename = "10m_v_component_of_wind")]
    VWind10m,
    #[serde(rename = "10m_u_component_of_wind")]
    UWind10m,
    MeanSeaLevelPressure,
    TotalCloudCover,
    TotalPrecipitation,
    MeanSurfaceNetShortWaveRadiationFlux,
    MeanSurfaceNetLongWaveRadiationFlux,
    MeanSurfaceDownwardLongWaveRadiationFlux,
    MeanSurfaceLatentHeatFlux,
    MeanSurfaceSensibleHeatFlux,
    Evaporation,
    MeanSurfaceDownwardShortWaveRadiationFlux,
}

impl Era5Variable {
    /// All identifiers in catalog order.
    pub const ALL: [Era5Variable; 15] = [
        Era5Variable::Temperature2m,
        Era5Variable::DewpointTemperature2m,
        Era5Variable::SpecificHumidity,
        Era5Variable::VWind10m,
        Era5Variable::UWind10m,
        Era5Variable::MeanSeaLevelPressure,
        Era5Variable::TotalCloudCover,
        Era5Variable::TotalPrecipitation,
        Era5Variable::MeanSurfaceNetShortWaveRadiationFlux,
        Era5Variable::MeanSurfaceNetLongWaveRadiationFlux,
        Era5Variable::MeanSurfaceDownwardLongWaveRadiationFlux,
        Era5Variable::MeanSurfaceLatentHeatFlux,
        Era5Variable::MeanSurfaceSensibleHeatFlux,
        Era5Variable::Evaporation,
        Era5Variable::MeanSurfaceDownwardShortWaveRadiationFlux,
    ];

    /// The textual identifier used by the archive, e.g. `"2m_temperature"`.
    pub const fn identifier(&self) -> &'static str {
        match self {
            Era5Variable::Temperature2m => "2m_temperature",
            Era5Variable::DewpointTemperature2m => "2m_dewpoint_temperature",
            Era5Variable::SpecificHumidity => "specific_humidity",
            Era5Variable::VWind10m => "10m_v_component_of_wind",
            Era5Variable::UWind10m => "10m_u_component_of_wind",
            Era5Variable::MeanSeaLevelPressure => "mean_sea_level_pressure",
            Era5Variable::TotalCloudCover => "total_cloud_cover",
            Era5Variable::TotalPrecipitation => "total_precipitation",
            Era5Variable::MeanSurfaceNetShortWaveRadiationFlux => {
                "mean_surface_net_short_wave_radiation_flux"
            }
            Era5Variable::MeanSurfaceNetLongWaveRadiationFlux => {
                "mean_surface_net_long_wave_radiation_flux"
            }
            Era5Variable::MeanSurfaceDownwardLongWaveRadiationFlux => {
                "mean_surface_downward_long_wave_radiation_flux"
            }
            Era5Variable::MeanSurfaceLatentHeatFlux => "mean_surface_latent_heat_flux",
            Era5Variable::MeanSurfaceSensibleHeatFlux => "mean_surface_sensible_heat_flux",
            Era5Variable::Evaporation => "evaporation",
            Era5Variable::MeanSurfaceDownwardShortWaveRadiationFlux => {
                "mean_surface_downward_short_wave_radiation_flux"
            }
        }
    }
}

impl fmt::Display for Era5Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.identifier())
    }
}

impl FromStr for Era5Variable {
    type Err = ForcingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Era5Variable::ALL
            .into_iter()
            .find(|v| v.identifier() == s)
            .ok_or_else(|| ForcingError::UnknownVariable(s.to_string()))
    }
}

/// Metadata for a single archive variable.
///
/// Entries are constructed once from the literal table in
/// [`crate::standard_variables`] and never mutated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ParameterEntry {
    /// Canonical identifier
    pub variable: Era5Variable,
    /// Archive parameter id (e.g. `"167.128"`); `None` when the archive does not publish one
    pub archive_code: Option<&'static str>,
    /// Field name in the retrieved files (unique in the catalog)
    pub short_code: &'static str,
    /// Name expected by the ROMS forcing reader
    pub model_name: &'static str,
    /// Human-readable name
    pub display_name: &'static str,
    /// Source-side physical unit
    pub unit: &'static str,
    /// Name of the variable's private time dimension in the raw dataset
    pub time_axis_name: &'static str,
}

impl ParameterEntry {
    pub fn identifier(&self) -> &'static str {
        self.variable.identifier()
    }

    /// How the archive addresses this variable: the parameter code when one is
    /// published, otherwise the textual identifier.
    pub fn archive_address(&self) -> &'static str {
        self.archive_code.unwrap_or_else(|| self.identifier())
    }
}

/// Read-only registry of [`ParameterEntry`] values keyed by [`Era5Variable`].
#[derive(Debug, Clone)]
pub struct ParameterCatalog {
    entries: IndexMap<Era5Variable, ParameterEntry>,
}

impl ParameterCatalog {
    /// Build a catalog from entries, keeping their order.
    ///
    /// # Errors
    ///
    /// Returns [`ForcingError::InvalidCatalog`] if an identifier appears twice,
    /// if two entries share a short code, or if a short code is empty or contains whitespace.
    pub fn new(entries: impl IntoIterator<Item = ParameterEntry>) -> ForcingResult<Self> {
        let mut map = IndexMap::new();
        let mut short_codes = HashSet::new();

        for entry in entries {
            if entry.short_code.is_empty() || entry.short_code.contains(char::is_whitespace) {
                return Err(ForcingError::InvalidCatalog(format!(
                    "short code '{}' of '{}' is not a valid field name",
                    entry.short_code, entry.variable
                )));
            }
            if !short_codes.insert(entry.short_code) {
                return Err(ForcingError::InvalidCatalog(format!(
                    "short code '{}' is used by more than one variable",
                    entry.short_code
                )));
            }
            if map.insert(entry.variable, entry).is_some() {
                return Err(ForcingError::InvalidCatalog(format!(
                    "variable '{}' is defined more than once",
                    entry.variable
                )));
            }
        }

        Ok(Self { entries: map })
    }

    /// The built-in ERA5 catalog, in [`Era5Variable::ALL`] order.
    pub fn era5() -> ForcingResult<Self> {
        Self::new(Era5Variable::ALL.into_iter().map(era5_parameter))
    }

    /// Look up an entry by its textual identifier.
    pub fn lookup(&self, identifier: &str) -> ForcingResult<&ParameterEntry> {
        let variable = Era5Variable::from_str(identifier)?;
        self.get(variable)
            .ok_or_else(|| ForcingError::UnknownVariable(identifier.to_string()))
    }

    pub fn get(&self, variable: Era5Variable) -> Option<&ParameterEntry> {
        self.entries.get(&variable)
    }

    /// Look up an entry by the field name used in the retrieved files.
    pub fn lookup_short_code(&self, short_code: &str) -> ForcingResult<&ParameterEntry> {
        self.entries
            .values()
            .find(|e| e.short_code == short_code)
            .ok_or_else(|| ForcingError::UnknownVariable(short_code.to_string()))
    }

    /// Identifiers in table order. Stable across calls.
    pub fn enumerate_known(&self) -> Vec<&'static str> {
        self.entries.keys().map(|v| v.identifier()).collect()
    }

    pub fn entries(&self) -> impl Iterator<Item = &ParameterEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Global parameter catalog, built from the literal ERA5 table on first use.
pub static PARAMETER_CATALOG: LazyLock<ParameterCatalog> = LazyLock::new(|| {
    ParameterCatalog::era5().expect("built-in ERA5 parameter table is consistent")
});
