//! Forcing normalizer
//!
//! Turns a raw multi-file forcing dataset into the single dataset read by the ROMS bulk-flux
//! forcing reader. The work is driven by a [`TransformTable`] and runs in a fixed order:
//!
//! 1. drop lookup indexes on `lon`, `lat` and every source time axis, join parts that continue
//!    the same variables over time, then merge the parts
//! 2. convert units (`value * unit_scale + unit_offset`)
//! 3. copy the primary time axis (`pair_time`) to a shared `time` coordinate
//! 4. reject unmapped variables and remove dropped ones
//! 5. rename time axes
//! 6. replace each variable's attributes with `long_name`, `units`, `coordinates` and `time`
//! 7. clear storage encodings
//!
//! Renames happen before attributes are assigned and conversions before units are labelled.
//! The raw input is never modified; any failure aborts the whole normalization.

use indexmap::IndexMap;
use rforce_core::dataset::{AttributeValue, Attributes, Coordinate, Dataset, RawDataset};
use rforce_core::errors::{ForcingError, ForcingResult};
use tracing::{debug, info};

use super::transform_rule::{TransformRule, TransformTable};

/// Horizontal axes shared by every forcing field.
pub const SPATIAL_AXES: [&str; 2] = ["lon", "lat"];

/// Name of the shared time coordinate in the output.
pub const TIME_COORDINATE: &str = "time";

/// Axis whose values become the output `time` coordinate.
pub const DEFAULT_TIME_AXIS: &str = "pair_time";

/// Applies a [`TransformTable`] to raw forcing datasets.
#[derive(Debug, Clone)]
pub struct ForcingNormalizer {
    table: TransformTable,
    time_axis: String,
}

impl Default for ForcingNormalizer {
    fn default() -> Self {
        Self::new(TransformTable::roms_bulk_flux())
    }
}

impl ForcingNormalizer {
    pub fn new(table: TransformTable) -> Self {
        Self {
            table,
            time_axis: DEFAULT_TIME_AXIS.to_string(),
        }
    }

    /// Use `axis` instead of `pair_time` as the source of the `time` coordinate.
    pub fn with_time_axis(mut self, axis: &str) -> Self {
        self.time_axis = axis.to_string();
        self
    }

    pub fn table(&self) -> &TransformTable {
        &self.table
    }

    pub fn time_axis(&self) -> &str {
        &self.time_axis
    }

    /// Produce the normalized dataset.
    ///
    /// # Errors
    ///
    /// - [`ForcingError::AxisConflict`] if the parts disagree on a shared axis
    /// - [`ForcingError::DuplicateIndex`] if an axis outside the table still indexes duplicates
    /// - [`ForcingError::MissingAxis`] if the primary time axis or a renamed axis is absent
    /// - [`ForcingError::UnmappedVariable`] for a data variable without a rule
    pub fn normalize(&self, raw: &RawDataset) -> ForcingResult<Dataset> {
        let mut dataset = self.merge_parts(raw)?;
        self.convert_units(&mut dataset);
        self.select_time(&mut dataset)?;
        let kept = self.prune_variables(&mut dataset)?;
        self.rename_axes(&mut dataset, &kept)?;
        self.stamp_attributes(&mut dataset, &kept);
        dataset.reset_encodings();
        debug!("Cleared storage encodings");

        info!(
            "Normalized {} raw part(s) into {} variable(s) on {} time step(s)",
            raw.len(),
            kept.len(),
            dataset.dims().get(TIME_COORDINATE).copied().unwrap_or_default()
        );
        Ok(dataset)
    }

    fn merge_parts(&self, raw: &RawDataset) -> ForcingResult<Dataset> {
        let mut axes: Vec<&str> = SPATIAL_AXES.to_vec();
        axes.extend(self.table.source_axes());

        // Parts holding the same variables are consecutive periods of one retrieval
        let mut groups: IndexMap<Vec<String>, Vec<Dataset>> = IndexMap::new();
        for part in raw.parts() {
            let mut part = part.clone();
            part.drop_indexes(&axes);
            let mut names = part.variable_names();
            names.sort();
            groups.entry(names).or_default().push(part);
        }

        let mut merged = Dataset::new();
        for parts in groups.into_values() {
            merged.merge(join_periods(parts)?)?;
        }
        debug!(
            "Merged {} part(s) after dropping indexes on {:?}",
            raw.len(),
            axes
        );
        Ok(merged)
    }

    fn convert_units(&self, dataset: &mut Dataset) {
        for (name, variable) in dataset.variables_mut() {
            let Some(rule) = self.table.get(name) else {
                continue;
            };
            if rule.drop || rule.is_identity_conversion() {
                continue;
            }
            *variable = variable.map_values(|v| rule.convert(v));
            debug!(
                "Converted '{}' (scale {}, offset {})",
                name, rule.unit_scale, rule.unit_offset
            );
        }
    }

    fn select_time(&self, dataset: &mut Dataset) -> ForcingResult<()> {
        let time = dataset
            .coord(&self.time_axis)
            .cloned()
            .ok_or_else(|| ForcingError::MissingAxis(self.time_axis.clone()))?;
        debug!(
            "Using {} values of '{}' as '{}'",
            time.len(),
            self.time_axis,
            TIME_COORDINATE
        );
        dataset.set_coord(TIME_COORDINATE, time)
    }

    /// Remove dropped variables and give kept ones their output names.
    ///
    /// Returns the output name and rule of every kept variable.
    fn prune_variables(
        &self,
        dataset: &mut Dataset,
    ) -> ForcingResult<Vec<(String, TransformRule)>> {
        let names = dataset.variable_names();
        let rules = names
            .iter()
            .map(|name| self.table.require(name).cloned())
            .collect::<ForcingResult<Vec<_>>>()?;

        let mut kept = Vec::new();
        for (name, rule) in names.into_iter().zip(rules) {
            if rule.drop {
                dataset.remove_variable(&name);
                debug!("Dropped '{}'", name);
                continue;
            }
            if rule.target_name != name {
                if let Some(variable) = dataset.remove_variable(&name) {
                    dataset.set_variable(&rule.target_name, variable)?;
                    debug!("Renamed '{}' to '{}'", name, rule.target_name);
                }
            }
            kept.push((rule.target_name.clone(), rule));
        }
        Ok(kept)
    }

    fn rename_axes(
        &self,
        dataset: &mut Dataset,
        kept: &[(String, TransformRule)],
    ) -> ForcingResult<()> {
        for (name, rule) in kept {
            if let Some((old, new)) = &rule.time_axis_rename {
                dataset.rename_variable_dim(name, old, new)?;
                debug!("Renamed axis '{}' to '{}' on '{}'", old, new, name);
            }
        }

        let mut keep = vec![TIME_COORDINATE];
        keep.extend(SPATIAL_AXES);
        dataset.prune_unused_axes(&keep);
        Ok(())
    }

    fn stamp_attributes(&self, dataset: &mut Dataset, kept: &[(String, TransformRule)]) {
        let coordinates = SPATIAL_AXES.join(" ");
        for (name, rule) in kept {
            if let Some(variable) = dataset.variable_mut(name) {
                variable.attrs = Attributes::from([
                    (
                        "long_name".to_string(),
                        AttributeValue::from(rule.output_long_name.as_str()),
                    ),
                    (
                        "units".to_string(),
                        AttributeValue::from(rule.output_unit_label.as_str()),
                    ),
                    (
                        "coordinates".to_string(),
                        AttributeValue::from(coordinates.as_str()),
                    ),
                    ("time".to_string(), AttributeValue::from(TIME_COORDINATE)),
                ]);
            }
        }
        debug!("Stamped attributes on {} variable(s)", kept.len());
    }
}

/// Join parts with the same variables along the one non-spatial axis whose values differ.
///
/// Identical parts are merged; differences along several axes are an
/// [`ForcingError::AxisConflict`].
fn join_periods(parts: Vec<Dataset>) -> ForcingResult<Dataset> {
    if parts.len() < 2 {
        return Ok(parts.into_iter().next().unwrap_or_default());
    }

    let first = &parts[0];
    let differing: Vec<String> = first
        .coord_names()
        .into_iter()
        .filter(|name| !SPATIAL_AXES.contains(&name.as_str()))
        .filter(|name| {
            let values = first.coord(name).map(Coordinate::values);
            parts[1..]
                .iter()
                .any(|p| p.coord(name).map(Coordinate::values) != values)
        })
        .collect();

    match differing.as_slice() {
        [] => {
            let mut merged = Dataset::new();
            for part in parts {
                merged.merge(part)?;
            }
            Ok(merged)
        }
        [axis] => {
            debug!("Joining {} part(s) along '{}'", parts.len(), axis);
            Dataset::concat(parts, axis)
        }
        _ => Err(ForcingError::AxisConflict {
            axis: differing.join(", "),
            reason: "parts with the same variables differ along more than one axis".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use is_close::is_close;
    use ndarray::{Array, IxDyn};
    use rforce_core::dataset::{Coordinate, Encoding, Variable};

    fn part(name: &str, axis: &str, times: Vec<f64>, fill: f64) -> Dataset {
        let n = times.len();
        let values = Array::from_elem(IxDyn(&[n, 2, 2]), fill);
        let variable = Variable::new([axis, "lat", "lon"], values)
            .unwrap()
            .with_attr("long_name", "raw")
            .with_encoding(Encoding {
                compression_level: Some(5),
                ..Encoding::default()
            });
        Dataset::new()
            .with_coord("lon", Coordinate::new(vec![1.0, 1.25]))
            .unwrap()
            .with_coord("lat", Coordinate::new(vec![56.0, 56.25]))
            .unwrap()
            .with_coord(axis, Coordinate::new(times).with_attr("units", "hours since 1948-01-01"))
            .unwrap()
            .with_variable(name, variable)
            .unwrap()
    }

    #[test]
    fn test_time_copied_from_pair_time() {
        let raw = RawDataset::from_parts(vec![
            part("Pair", "pair_time", vec![0.0, 1.0], 101325.0),
            part("Uwind", "wind_time", vec![0.0, 1.0], 3.0),
        ]);
        let ds = ForcingNormalizer::default().normalize(&raw).unwrap();

        let time = ds.coord("time").unwrap();
        assert_eq!(time.values().to_vec(), vec![0.0, 1.0]);
        assert_eq!(
            time.attrs.get("units").and_then(AttributeValue::as_text),
            Some("hours since 1948-01-01")
        );
        assert!(time.encoding.is_empty());
    }

    #[test]
    fn test_yearly_parts_joined() {
        let raw = RawDataset::from_parts(vec![
            part("Pair", "pair_time", vec![2.0, 3.0], 101300.0),
            part("Uwind", "wind_time", vec![0.0, 1.0], 3.0),
            part("Pair", "pair_time", vec![0.0, 1.0], 101325.0),
            part("Uwind", "wind_time", vec![2.0, 3.0], 4.0),
        ]);
        let ds = ForcingNormalizer::default().normalize(&raw).unwrap();

        assert_eq!(ds.coord("time").unwrap().values().to_vec(), vec![0.0, 1.0, 2.0, 3.0]);
        let pair = ds.variable("Pair").unwrap();
        assert_eq!(pair.shape(), &[4, 2, 2]);
        assert!(is_close!(pair.values()[IxDyn(&[0, 0, 0])], 1013.25));
        assert!(is_close!(pair.values()[IxDyn(&[3, 1, 1])], 1013.0));
        assert_eq!(ds.variable("Uwind").unwrap().values()[IxDyn(&[2, 0, 0])], 4.0);
    }

    #[test]
    fn test_yearly_parts_must_share_grid() {
        let mut later = part("Pair", "pair_time", vec![1.0], 101325.0);
        later.set_coord("lat", Coordinate::new(vec![60.0, 60.25])).unwrap();
        let raw = RawDataset::from_parts(vec![
            part("Pair", "pair_time", vec![0.0], 101325.0),
            later,
        ]);

        let result = ForcingNormalizer::default().normalize(&raw);
        assert!(matches!(
            result,
            Err(ForcingError::AxisConflict { ref axis, .. }) if axis == "lat"
        ));
    }

    #[test]
    fn test_missing_time_axis() {
        let raw = RawDataset::single(part("Uwind", "wind_time", vec![0.0], 3.0));
        let result = ForcingNormalizer::default().normalize(&raw);
        assert!(matches!(result, Err(ForcingError::MissingAxis(ref a)) if a == "pair_time"));
    }

    #[test]
    fn test_custom_time_axis() {
        let raw = RawDataset::single(part("Uwind", "wind_time", vec![0.0, 6.0], 3.0));
        let ds = ForcingNormalizer::default()
            .with_time_axis("wind_time")
            .normalize(&raw)
            .unwrap();
        assert_eq!(ds.coord("time").unwrap().values().to_vec(), vec![0.0, 6.0]);
    }

    #[test]
    fn test_target_name_applied() {
        let table = TransformTable::new([
            TransformRule::keep("Pair", "pair_time", "millibar", "surface pressure"),
            TransformRule {
                target_name: "Uwind_10m".to_string(),
                ..TransformRule::keep("Uwind", "wind_time", "m s-1", "u-wind")
            },
        ])
        .unwrap();
        let raw = RawDataset::from_parts(vec![
            part("Pair", "pair_time", vec![0.0], 101325.0),
            part("Uwind", "wind_time", vec![0.0], 3.0),
        ]);
        let ds = ForcingNormalizer::new(table).normalize(&raw).unwrap();
        assert_eq!(ds.variable_names(), vec!["Pair", "Uwind_10m"]);
        assert_eq!(
            ds.variable("Uwind_10m").unwrap().attrs["long_name"],
            AttributeValue::from("u-wind")
        );
    }

    #[test]
    fn test_raw_input_untouched() {
        let raw = RawDataset::single(part("Pair", "pair_time", vec![0.0], 101325.0));
        let before = raw.clone();
        ForcingNormalizer::default().normalize(&raw).unwrap();
        assert_eq!(raw, before);
    }

    #[test]
    fn test_rename_prunes_old_axis() {
        let raw = RawDataset::from_parts(vec![
            part("Pair", "pair_time", vec![0.0, 1.0], 101325.0),
            part("swrad", "swrad_time", vec![0.5, 1.5], 200.0),
        ]);
        let ds = ForcingNormalizer::default().normalize(&raw).unwrap();

        assert_eq!(ds.variable("swrad").unwrap().dims()[0], "srf_time");
        assert_eq!(ds.coord("srf_time").unwrap().values().to_vec(), vec![0.5, 1.5]);
        assert!(ds.coord("swrad_time").is_none());
        assert!(ds.coord("lon").is_some());
        ds.validate().unwrap();
    }
}
