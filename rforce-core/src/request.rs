//! Retrieval request specification.
//!
//! A [`RequestSpec`] describes what to fetch from the reanalysis archive for one run:
//! the region, the inclusive year range, the grid resolution and the ordered list of
//! variables. It never performs a retrieval; [`RequestSpec::archive_requests`] expands it into
//! the per-file [`ArchiveRequest`] values an external retrieval service consumes.
//!
//! # Shortwave variants
//!
//! ROMS flavours disagree on which shortwave flux they read. The Rutgers bulk-flux reader takes
//! net shortwave, while sea-ice enabled builds (Kate's branch) take downward shortwave and apply
//! their own albedo. The choice is explicit: building a spec without a [`ModelVariant`] fails.
//!
//! ```rust
//! use rforce_core::request::RequestSpecBuilder;
//! use rforce_core::variable::Era5Variable;
//!
//! let dir = tempfile::tempdir().unwrap();
//! let spec = RequestSpecBuilder::new("ROHO800")
//!     .variant("net-shortwave-model")
//!     .output_dir(dir.path())
//!     .build()
//!     .unwrap();
//!
//! assert!(spec.variable_set.contains(&Era5Variable::MeanSurfaceNetShortWaveRadiationFlux));
//! assert_eq!(spec.area(), "62/1/56/10");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info};

use crate::errors::{ForcingError, ForcingResult};
use crate::profiles::{RegionBox, RegionProfile};
use crate::standard_variables::OPTIONAL_VARIABLES;
use crate::variable::{Era5Variable, PARAMETER_CATALOG};

/// Which shortwave flux the target ocean model reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ModelVariant {
    /// Net shortwave at the surface (Rutgers ROMS)
    NetShortwaveModel,
    /// Downward shortwave, albedo applied by the model (Kate's sea-ice ROMS)
    DownwardShortwaveModel,
}

impl ModelVariant {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelVariant::NetShortwaveModel => "net-shortwave-model",
            ModelVariant::DownwardShortwaveModel => "downward-shortwave-model",
        }
    }

    /// The shortwave variable requested for this variant.
    pub const fn shortwave_variable(&self) -> Era5Variable {
        match self {
            ModelVariant::NetShortwaveModel => Era5Variable::MeanSurfaceNetShortWaveRadiationFlux,
            ModelVariant::DownwardShortwaveModel => {
                Era5Variable::MeanSurfaceDownwardShortWaveRadiationFlux
            }
        }
    }

    /// Parse an optional selection. A missing selection is an error, never a default.
    pub fn from_selection(selection: Option<&str>) -> ForcingResult<Self> {
        match selection {
            Some(name) => name.parse(),
            None => Err(ForcingError::InvalidVariant("(unset)".to_string())),
        }
    }
}

impl fmt::Display for ModelVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelVariant {
    type Err = ForcingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "net-shortwave-model" | "rutgers" => Ok(ModelVariant::NetShortwaveModel),
            "downward-shortwave-model" | "kate" => Ok(ModelVariant::DownwardShortwaveModel),
            _ => Err(ForcingError::InvalidVariant(format!("'{}'", s))),
        }
    }
}

/// Reanalysis product to request from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Reanalysis {
    #[default]
    Era5,
    /// ERA-Interim, superseded by ERA5 but still addressable in the archive
    Interim,
}

impl Reanalysis {
    pub fn dataset(&self) -> &'static str {
        match self {
            Reanalysis::Era5 => "era5",
            Reanalysis::Interim => "interim",
        }
    }

    /// Archive dataset class (`ea` for ERA5, `ei` for ERA-Interim).
    pub fn dataset_class(&self) -> &'static str {
        match self {
            Reanalysis::Era5 => "ea",
            Reanalysis::Interim => "ei",
        }
    }

    /// Native atmospheric grid spacing in degrees.
    pub fn default_grid_resolution(&self) -> f64 {
        match self {
            Reanalysis::Era5 => 0.25,
            Reanalysis::Interim => 0.75,
        }
    }

    pub fn product(&self) -> &'static str {
        match self {
            Reanalysis::Era5 => "reanalysis-era5-single-levels",
            Reanalysis::Interim => "interim",
        }
    }

    fn description(&self) -> &'static str {
        match self {
            Reanalysis::Era5 => {
                "ERA5 reanalysis: 0.25x0.25 degrees (atmosphere), \
                 0.5x0.5 degrees (ocean waves), 1979 - present"
            }
            Reanalysis::Interim => "ERA-Interim reanalysis: 0.75x0.75 degrees, 1979 - 2019",
        }
    }
}

/// Earliest year accepted in a request.
pub const EARLIEST_YEAR: i32 = 1900;
/// Latest year accepted in a request.
pub const LATEST_YEAR: i32 = 2100;

/// Inclusive range of years, bounded by [`EARLIEST_YEAR`] and [`LATEST_YEAR`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearRange {
    pub start: i32,
    pub end: i32,
}

impl YearRange {
    pub fn new(start: i32, end: i32) -> ForcingResult<Self> {
        if start > end || start < EARLIEST_YEAR || end > LATEST_YEAR {
            return Err(ForcingError::InvalidYearRange { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn years(&self) -> impl Iterator<Item = i32> {
        self.start..=self.end
    }

    pub fn len(&self) -> usize {
        (i64::from(self.end) - i64::from(self.start) + 1).max(0) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A fully validated description of one retrieval run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestSpec {
    pub profile: &'static str,
    pub region_box: RegionBox,
    pub year_range: YearRange,
    /// Ordered, duplicate-free, every entry known to the catalog
    pub variable_set: Vec<Era5Variable>,
    pub grid_resolution: f64,
    pub output_dir: PathBuf,
    pub skip_existing: bool,
    pub optional_variable_policy: bool,
    pub variant: ModelVariant,
    pub reanalysis: Reanalysis,
}

/// One file to retrieve: a single variable over a single year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchiveRequest {
    pub product: String,
    pub dataset_class: String,
    pub variable: Era5Variable,
    /// Parameter code when the archive publishes one, otherwise the textual identifier
    pub param: String,
    pub short_code: String,
    pub year: i32,
    pub area: String,
    pub grid: String,
    pub target: PathBuf,
}

impl RequestSpec {
    /// Build a spec for a registered profile with default settings.
    ///
    /// See [`RequestSpecBuilder`] to override years, resolution or output location.
    pub fn build(profile_name: &str, variant: &str) -> ForcingResult<Self> {
        RequestSpecBuilder::new(profile_name).variant(variant).build()
    }

    /// The `N/W/S/E` area string.
    pub fn area(&self) -> String {
        self.region_box.area()
    }

    /// The `dlat/dlon` grid string.
    pub fn grid(&self) -> String {
        format!("{}/{}", self.grid_resolution, self.grid_resolution)
    }

    pub fn contains(&self, variable: Era5Variable) -> bool {
        self.variable_set.contains(&variable)
    }

    /// Path of the file the retrieval service should write for `variable` in `year`.
    pub fn target_path(&self, variable: Era5Variable, year: i32) -> PathBuf {
        self.output_dir.join(format!(
            "{}_{}_year_{}.nc",
            self.reanalysis.dataset(),
            variable.identifier(),
            year
        ))
    }

    /// Expand into one request per (year, variable), years outermost.
    pub fn archive_requests(&self) -> ForcingResult<Vec<ArchiveRequest>> {
        let area = self.area();
        let grid = self.grid();
        let mut requests = Vec::with_capacity(self.year_range.len() * self.variable_set.len());

        for year in self.year_range.years() {
            for variable in &self.variable_set {
                let entry = PARAMETER_CATALOG.lookup(variable.identifier())?;
                requests.push(ArchiveRequest {
                    product: self.reanalysis.product().to_string(),
                    dataset_class: self.reanalysis.dataset_class().to_string(),
                    variable: *variable,
                    param: entry.archive_address().to_string(),
                    short_code: entry.short_code.to_string(),
                    year,
                    area: area.clone(),
                    grid: grid.clone(),
                    target: self.target_path(*variable, year),
                });
            }
        }
        Ok(requests)
    }

    /// Archive requests still to be performed.
    ///
    /// With `skip_existing` set, requests whose target file is already present are left out.
    /// Otherwise every request is returned and existing files will be overwritten.
    pub fn pending_requests(&self) -> ForcingResult<Vec<ArchiveRequest>> {
        let requests = self.archive_requests()?;
        if !self.skip_existing {
            return Ok(requests);
        }

        let total = requests.len();
        let pending: Vec<_> = requests
            .into_iter()
            .filter(|r| {
                let exists = r.target.exists();
                if exists {
                    info!("Skipping existing file {}", r.target.display());
                }
                !exists
            })
            .collect();
        debug!("{} of {} archive requests pending", pending.len(), total);
        Ok(pending)
    }
}

/// Builder for [`RequestSpec`].
///
/// Defaults follow the reference setup: ERA5 at its native resolution, years 2000-2001,
/// skip existing files, optional variables enabled, output under `ERA5/<profile>`.
#[derive(Debug, Clone)]
pub struct RequestSpecBuilder {
    profile: String,
    variant: Option<String>,
    start_year: i32,
    end_year: i32,
    grid_resolution: Option<f64>,
    reanalysis: Reanalysis,
    output_dir: Option<PathBuf>,
    skip_existing: bool,
    optional_variables: bool,
}

impl RequestSpecBuilder {
    pub fn new(profile: impl Into<String>) -> Self {
        Self {
            profile: profile.into(),
            variant: None,
            start_year: 2000,
            end_year: 2001,
            grid_resolution: None,
            reanalysis: Reanalysis::default(),
            output_dir: None,
            skip_existing: true,
            optional_variables: true,
        }
    }

    pub fn variant(mut self, variant: impl Into<String>) -> Self {
        self.variant = Some(variant.into());
        self
    }

    pub fn model_variant(mut self, variant: ModelVariant) -> Self {
        self.variant = Some(variant.as_str().to_string());
        self
    }

    pub fn years(mut self, start: i32, end: i32) -> Self {
        self.start_year = start;
        self.end_year = end;
        self
    }

    pub fn grid_resolution(mut self, degrees: f64) -> Self {
        self.grid_resolution = Some(degrees);
        self
    }

    pub fn reanalysis(mut self, reanalysis: Reanalysis) -> Self {
        self.reanalysis = reanalysis;
        self
    }

    pub fn output_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.output_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn skip_existing(mut self, skip: bool) -> Self {
        self.skip_existing = skip;
        self
    }

    pub fn optional_variables(mut self, enabled: bool) -> Self {
        self.optional_variables = enabled;
        self
    }

    /// Validate the selection and create the output directory.
    ///
    /// # Errors
    ///
    /// - [`ForcingError::UnknownProfile`] if the profile is not registered
    /// - [`ForcingError::InvalidVariant`] if no variant was given or it is not recognised
    /// - [`ForcingError::UnknownVariable`] if a requested variable is missing from the catalog
    /// - [`ForcingError::InvalidRegion`], [`ForcingError::InvalidYearRange`] or
    ///   [`ForcingError::InvalidResolution`] for out-of-range settings
    /// - [`ForcingError::Io`] if the output directory cannot be created
    pub fn build(self) -> ForcingResult<RequestSpec> {
        let profile = RegionProfile::find(&self.profile)?;
        let variant = ModelVariant::from_selection(self.variant.as_deref())?;

        profile.region.validate()?;
        let year_range = YearRange::new(self.start_year, self.end_year)?;
        let grid_resolution = self
            .grid_resolution
            .unwrap_or_else(|| self.reanalysis.default_grid_resolution());
        if !(grid_resolution.is_finite() && grid_resolution > 0.0) {
            return Err(ForcingError::InvalidResolution(grid_resolution));
        }

        let mut variable_set: Vec<Era5Variable> = profile.base_variables.to_vec();
        variable_set.push(variant.shortwave_variable());
        if self.optional_variables {
            for optional in OPTIONAL_VARIABLES {
                if !variable_set.contains(&optional) {
                    variable_set.push(optional);
                }
            }
        }
        for variable in &variable_set {
            PARAMETER_CATALOG.lookup(variable.identifier())?;
        }

        let output_dir = self
            .output_dir
            .unwrap_or_else(|| PathBuf::from("ERA5").join(profile.name));
        fs::create_dir_all(&output_dir)?;

        info!("{}", self.reanalysis.description());
        info!(
            "Request for {} ({}): years {}-{}, {} variables, {} grid, variant {}",
            profile.name,
            profile.region,
            year_range.start,
            year_range.end,
            variable_set.len(),
            grid_resolution,
            variant
        );

        Ok(RequestSpec {
            profile: profile.name,
            region_box: profile.region,
            year_range,
            variable_set,
            grid_resolution,
            output_dir,
            skip_existing: self.skip_existing,
            optional_variable_policy: self.optional_variables,
            variant,
            reanalysis: self.reanalysis,
        })
    }
}
