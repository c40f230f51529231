//! Per-variable transform rules for ROMS bulk-flux forcing
//!
//! A [`TransformRule`] describes how one raw forcing field becomes a model-ready variable:
//! a linear unit conversion, an optional rename of its time axis, and the attribute record it
//! is stamped with. The rules for a run are collected in a [`TransformTable`], which must cover
//! every data variable of the raw dataset.
//!
//! The reference table for the ROMS bulk-flux reader is [`TransformTable::roms_bulk_flux`].
//! Rules can also be read from configuration:
//!
//! ```toml
//! [[rules]]
//! source_name = "Pair"
//! target_name = "Pair"
//! source_axis = "pair_time"
//! unit_scale = 0.01
//! output_unit_label = "millibar"
//! output_long_name = "surface pressure"
//! ```

use indexmap::IndexMap;
use rforce_core::errors::{ForcingError, ForcingResult};
use rforce_core::request::ModelVariant;
use rforce_core::standard_variables::era5_parameter;
use rforce_core::variable::Era5Variable;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

fn default_scale() -> f64 {
    1.0
}

/// How a single raw variable is transformed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformRule {
    /// Name of the variable in the raw dataset
    pub source_name: String,
    /// Name in the output dataset
    pub target_name: String,
    /// Time axis the variable lives on in the raw dataset
    pub source_axis: String,
    /// Multiplier applied to every value
    #[serde(default = "default_scale")]
    pub unit_scale: f64,
    /// Added after scaling
    #[serde(default)]
    pub unit_offset: f64,
    /// Rename the variable's time axis from `.0` to `.1`
    #[serde(default)]
    pub time_axis_rename: Option<(String, String)>,
    #[serde(default)]
    pub output_unit_label: String,
    #[serde(default)]
    pub output_long_name: String,
    /// Remove the variable from the output
    #[serde(default)]
    pub drop: bool,
}

impl TransformRule {
    /// A rule that keeps `name` unchanged apart from its attributes.
    pub fn keep(name: &str, source_axis: &str, unit: &str, long_name: &str) -> Self {
        Self {
            source_name: name.to_string(),
            target_name: name.to_string(),
            source_axis: source_axis.to_string(),
            unit_scale: 1.0,
            unit_offset: 0.0,
            time_axis_rename: None,
            output_unit_label: unit.to_string(),
            output_long_name: long_name.to_string(),
            drop: false,
        }
    }

    /// A rule that removes `name` from the output.
    pub fn dropped(name: &str, source_axis: &str) -> Self {
        Self {
            drop: true,
            ..Self::keep(name, source_axis, "", "")
        }
    }

    pub fn with_scale(mut self, scale: f64) -> Self {
        self.unit_scale = scale;
        self
    }

    pub fn with_offset(mut self, offset: f64) -> Self {
        self.unit_offset = offset;
        self
    }

    /// Rename the variable's source axis to `new_axis`.
    pub fn with_axis_rename(mut self, new_axis: &str) -> Self {
        self.time_axis_rename = Some((self.source_axis.clone(), new_axis.to_string()));
        self
    }

    /// Whether the rule changes values at all.
    pub fn is_identity_conversion(&self) -> bool {
        self.unit_scale == 1.0 && self.unit_offset == 0.0
    }

    /// Apply the unit conversion to a single value.
    pub fn convert(&self, value: f64) -> f64 {
        value * self.unit_scale + self.unit_offset
    }

    /// Time axis of the variable once the rule has been applied.
    pub fn output_axis(&self) -> &str {
        match &self.time_axis_rename {
            Some((_, new)) => new,
            None => &self.source_axis,
        }
    }
}

/// Fields of the ROMS bulk-flux forcing file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ForcingField {
    Pair,
    Qair,
    Tair,
    Uwind,
    Vwind,
    Rain,
    Swrad,
    LwradDown,
    Cloud,
    Latent,
    Sensible,
    Lwrad,
    Evaporation,
}

impl ForcingField {
    pub const ALL: [ForcingField; 13] = [
        ForcingField::Pair,
        ForcingField::Qair,
        ForcingField::Tair,
        ForcingField::Uwind,
        ForcingField::Vwind,
        ForcingField::Rain,
        ForcingField::Swrad,
        ForcingField::LwradDown,
        ForcingField::Cloud,
        ForcingField::Latent,
        ForcingField::Sensible,
        ForcingField::Lwrad,
        ForcingField::Evaporation,
    ];

    /// The archive variable the field is retrieved as for the net shortwave variant.
    pub const fn source(&self) -> Era5Variable {
        self.source_for(ModelVariant::NetShortwaveModel)
    }

    /// The archive variable the field is retrieved as for `variant`.
    pub const fn source_for(&self, variant: ModelVariant) -> Era5Variable {
        match self {
            ForcingField::Pair => Era5Variable::MeanSeaLevelPressure,
            ForcingField::Qair => Era5Variable::SpecificHumidity,
            ForcingField::Tair => Era5Variable::Temperature2m,
            ForcingField::Uwind => Era5Variable::UWind10m,
            ForcingField::Vwind => Era5Variable::VWind10m,
            ForcingField::Rain => Era5Variable::TotalPrecipitation,
            ForcingField::Swrad => variant.shortwave_variable(),
            ForcingField::LwradDown => Era5Variable::MeanSurfaceDownwardLongWaveRadiationFlux,
            ForcingField::Cloud => Era5Variable::TotalCloudCover,
            ForcingField::Latent => Era5Variable::MeanSurfaceLatentHeatFlux,
            ForcingField::Sensible => Era5Variable::MeanSurfaceSensibleHeatFlux,
            ForcingField::Lwrad => Era5Variable::MeanSurfaceNetLongWaveRadiationFlux,
            ForcingField::Evaporation => Era5Variable::Evaporation,
        }
    }

    /// Variable name in the raw dataset.
    pub const fn name(&self) -> &'static str {
        era5_parameter(self.source()).model_name
    }

    /// Reference rule for the ROMS bulk-flux reader with net shortwave.
    pub fn rule(&self) -> TransformRule {
        self.rule_for(ModelVariant::NetShortwaveModel)
    }

    /// Reference rule for the ROMS bulk-flux reader of `variant`.
    pub fn rule_for(&self, variant: ModelVariant) -> TransformRule {
        let parameter = era5_parameter(self.source_for(variant));
        let name = parameter.model_name;
        let axis = parameter.time_axis_name;

        match self {
            ForcingField::Pair => {
                TransformRule::keep(name, axis, "millibar", "surface pressure").with_scale(0.01)
            }
            ForcingField::Qair => {
                TransformRule::keep(name, axis, "g kg-1", "specific humidity").with_scale(1000.0)
            }
            // The raw axis name is miscapitalised; the reader expects tair_time
            ForcingField::Tair => TransformRule::keep(name, axis, "Celsius", "2 metre temperature")
                .with_axis_rename("tair_time"),
            ForcingField::Uwind => {
                TransformRule::keep(name, axis, "m s-1", "10 metre u-wind component")
            }
            ForcingField::Vwind => {
                TransformRule::keep(name, axis, "m s-1", "10 metre v-wind component")
            }
            ForcingField::Rain => TransformRule::keep(name, axis, "kg m-2 s-1", "rain"),
            ForcingField::Swrad => {
                TransformRule::keep(name, axis, "watt meter-2", parameter.display_name)
                    .with_axis_rename("srf_time")
            }
            ForcingField::LwradDown => {
                TransformRule::keep(name, axis, "watt meter-2", parameter.display_name)
                    .with_axis_rename("lrf_time")
            }
            ForcingField::Cloud => {
                TransformRule::keep(name, axis, "nondimensional", "cloud fraction")
            }
            ForcingField::Latent
            | ForcingField::Sensible
            | ForcingField::Lwrad
            | ForcingField::Evaporation => TransformRule::dropped(name, axis),
        }
    }
}

#[derive(Deserialize)]
struct TransformTableFile {
    rules: Vec<TransformRule>,
}

/// The set of rules for one normalization, keyed by source variable name.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformTable {
    rules: IndexMap<String, TransformRule>,
}

impl TransformTable {
    /// Build a table from rules, keeping their order.
    ///
    /// # Errors
    ///
    /// Returns [`ForcingError::InvalidTransformTable`] if a source variable has more than one rule,
    /// if two rules would produce the same output variable, or if two rules rename different
    /// source axes onto the same new axis.
    pub fn new(rules: impl IntoIterator<Item = TransformRule>) -> ForcingResult<Self> {
        let mut map: IndexMap<String, TransformRule> = IndexMap::new();
        let mut targets: HashMap<String, String> = HashMap::new();
        let mut renames: HashMap<String, String> = HashMap::new();

        for rule in rules {
            if !rule.unit_scale.is_finite() || !rule.unit_offset.is_finite() {
                return Err(ForcingError::InvalidTransformTable(format!(
                    "rule for '{}' has a non-finite unit conversion",
                    rule.source_name
                )));
            }
            if !rule.drop {
                let previous = targets.insert(rule.target_name.clone(), rule.source_name.clone());
                if let Some(other) = previous {
                    return Err(ForcingError::InvalidTransformTable(format!(
                        "'{}' and '{}' both produce '{}'",
                        other, rule.source_name, rule.target_name
                    )));
                }
            }
            if let Some((old, new)) = &rule.time_axis_rename {
                if let Some(existing) = renames.get(new) {
                    if existing != old {
                        return Err(ForcingError::InvalidTransformTable(format!(
                            "axes '{}' and '{}' are both renamed to '{}'",
                            existing, old, new
                        )));
                    }
                }
                renames.insert(new.clone(), old.clone());
            }
            if map.contains_key(&rule.source_name) {
                return Err(ForcingError::InvalidTransformTable(format!(
                    "more than one rule for '{}'",
                    rule.source_name
                )));
            }
            map.insert(rule.source_name.clone(), rule);
        }

        // A rename must not land on an axis another variable keeps
        for rule in map.values().filter(|r| r.time_axis_rename.is_none()) {
            if let Some(old) = renames.get(&rule.source_axis) {
                return Err(ForcingError::InvalidTransformTable(format!(
                    "axis '{}' is renamed to '{}', which '{}' already uses",
                    old, rule.source_axis, rule.source_name
                )));
            }
        }

        Ok(Self { rules: map })
    }

    /// Reference table for the ROMS bulk-flux forcing reader with net shortwave.
    pub fn roms_bulk_flux() -> Self {
        Self::roms_bulk_flux_for(ModelVariant::NetShortwaveModel)
    }

    /// Reference table for the ROMS bulk-flux forcing reader of `variant`.
    ///
    /// The variants only differ in the long name stamped on `swrad`.
    pub fn roms_bulk_flux_for(variant: ModelVariant) -> Self {
        Self::new(ForcingField::ALL.iter().map(|field| field.rule_for(variant)))
            .expect("reference transform table is consistent")
    }

    /// Read a table from TOML containing a `[[rules]]` array.
    pub fn from_toml_str(contents: &str) -> ForcingResult<Self> {
        let file: TransformTableFile =
            toml::from_str(contents).map_err(|e| ForcingError::Config(e.to_string()))?;
        Self::new(file.rules)
    }

    pub fn get(&self, source_name: &str) -> Option<&TransformRule> {
        self.rules.get(source_name)
    }

    /// Rule for `source_name`, or [`ForcingError::UnmappedVariable`].
    pub fn require(&self, source_name: &str) -> ForcingResult<&TransformRule> {
        self.get(source_name)
            .ok_or_else(|| ForcingError::UnmappedVariable(source_name.to_string()))
    }

    pub fn rules(&self) -> impl Iterator<Item = &TransformRule> {
        self.rules.values()
    }

    /// Source time axes of every rule, without duplicates.
    pub fn source_axes(&self) -> Vec<&str> {
        let mut axes: Vec<&str> = Vec::new();
        for rule in self.rules.values() {
            if !axes.contains(&rule.source_axis.as_str()) {
                axes.push(&rule.source_axis);
            }
        }
        axes
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl Default for TransformTable {
    fn default() -> Self {
        Self::roms_bulk_flux()
    }
}
