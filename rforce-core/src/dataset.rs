//! In-memory model of gridded array datasets.
//!
//! A [`Dataset`] is a collection of named dimensions, coordinate variables and data variables,
//! in the spirit of a NetCDF file:
//! - a [`Coordinate`] is a 1-D variable along the dimension of the same name (`lon`, `lat`,
//!   `pair_time`, ...). It may carry a lookup index, which requires its values to be unique.
//! - a [`Variable`] is an n-D array over named dimensions, with its own attribute mapping and
//!   storage [`Encoding`] hints.
//!
//! Maps preserve insertion order so that datasets written back out keep a predictable layout.
//!
//! A retrieved forcing dataset usually arrives as several files, one per quantity. Each file is
//! read into its own [`Dataset`] and the parts are collected in a [`RawDataset`]. Parts that
//! continue the same variables over a later period are joined with [`Dataset::concat`]; parts
//! holding different variables are combined with [`Dataset::merge`].

use indexmap::IndexMap;
use ndarray::{concatenate, Array1, ArrayD, ArrayViewD, Axis};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::errors::{ForcingError, ForcingResult};

/// Value of a variable or dataset attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Text(String),
    Number(f64),
    Numbers(Vec<f64>),
}

impl AttributeValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            AttributeValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::Text(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::Text(value)
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        AttributeValue::Number(value)
    }
}

impl From<Vec<f64>> for AttributeValue {
    fn from(value: Vec<f64>) -> Self {
        AttributeValue::Numbers(value)
    }
}

/// Ordered attribute mapping.
pub type Attributes = IndexMap<String, AttributeValue>;

/// Storage hints carried over from the file a variable was read from.
///
/// These only affect how a writer lays the data out on disk, never the values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Encoding {
    /// Deflate level, 0-9
    pub compression_level: Option<u8>,
    pub shuffle: bool,
    pub chunk_sizes: Option<Vec<usize>>,
    pub fill_value: Option<f64>,
    /// File the variable was read from
    pub source: Option<String>,
}

impl Encoding {
    pub fn is_empty(&self) -> bool {
        *self == Encoding::default()
    }
}

/// An n-dimensional data variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    dims: Vec<String>,
    values: ArrayD<f64>,
    pub attrs: Attributes,
    pub encoding: Encoding,
}

impl Variable {
    /// Create a variable; the number of dimension names must match the array rank.
    pub fn new<S: Into<String>>(
        dims: impl IntoIterator<Item = S>,
        values: ArrayD<f64>,
    ) -> ForcingResult<Self> {
        let dims: Vec<String> = dims.into_iter().map(Into::into).collect();
        if dims.len() != values.ndim() {
            return Err(ForcingError::ShapeMismatch {
                variable: String::new(),
                shape: values.shape().to_vec(),
                dims,
            });
        }
        Ok(Self {
            dims,
            values,
            attrs: Attributes::new(),
            encoding: Encoding::default(),
        })
    }

    pub fn with_attr(mut self, name: &str, value: impl Into<AttributeValue>) -> Self {
        self.attrs.insert(name.to_string(), value.into());
        self
    }

    pub fn with_encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn dims(&self) -> &[String] {
        &self.dims
    }

    pub fn values(&self) -> &ArrayD<f64> {
        &self.values
    }

    pub fn shape(&self) -> &[usize] {
        self.values.shape()
    }

    pub fn has_dim(&self, dim: &str) -> bool {
        self.dims.iter().any(|d| d == dim)
    }

    /// Length of `dim` in this variable, if it is one of its dimensions.
    pub fn dim_len(&self, dim: &str) -> Option<usize> {
        self.dims
            .iter()
            .position(|d| d == dim)
            .map(|i| self.values.shape()[i])
    }

    /// A copy of this variable with `f` applied to every value.
    pub fn map_values(&self, f: impl Fn(f64) -> f64) -> Self {
        Self {
            dims: self.dims.clone(),
            values: self.values.mapv(f),
            attrs: self.attrs.clone(),
            encoding: self.encoding.clone(),
        }
    }

    /// Rename a dimension in place. Returns whether the dimension was present.
    pub fn rename_dim(&mut self, old: &str, new: &str) -> bool {
        let mut renamed = false;
        for dim in self.dims.iter_mut().filter(|d| *d == old) {
            *dim = new.to_string();
            renamed = true;
        }
        renamed
    }
}

/// A 1-D coordinate variable.
///
/// Coordinates are created with a lookup index, as dimension coordinates are in most array
/// libraries. An index requires unique values; [`Coordinate::drop_index`] removes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    values: Array1<f64>,
    pub attrs: Attributes,
    pub encoding: Encoding,
    indexed: bool,
}

impl Coordinate {
    pub fn new(values: impl Into<Array1<f64>>) -> Self {
        Self {
            values: values.into(),
            attrs: Attributes::new(),
            encoding: Encoding::default(),
            indexed: true,
        }
    }

    pub fn with_attr(mut self, name: &str, value: impl Into<AttributeValue>) -> Self {
        self.attrs.insert(name.to_string(), value.into());
        self
    }

    pub fn with_encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn values(&self) -> &Array1<f64> {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn is_indexed(&self) -> bool {
        self.indexed
    }

    pub fn drop_index(&mut self) {
        self.indexed = false;
    }

    pub fn has_duplicates(&self) -> bool {
        let mut seen = HashSet::with_capacity(self.values.len());
        self.values.iter().any(|v| !seen.insert(v.to_bits()))
    }

    fn same_values(&self, other: &Coordinate) -> bool {
        self.values.len() == other.values.len()
            && self
                .values
                .iter()
                .zip(other.values.iter())
                .all(|(a, b)| a == b || (a.is_nan() && b.is_nan()))
    }
}

/// A collection of dimensions, coordinates and data variables.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    dims: IndexMap<String, usize>,
    coords: IndexMap<String, Coordinate>,
    data_vars: IndexMap<String, Variable>,
    pub attrs: Attributes,
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`Dataset::set_coord`].
    pub fn with_coord(mut self, name: &str, coord: Coordinate) -> ForcingResult<Self> {
        self.set_coord(name, coord)?;
        Ok(self)
    }

    /// Builder-style [`Dataset::set_variable`].
    pub fn with_variable(mut self, name: &str, variable: Variable) -> ForcingResult<Self> {
        self.set_variable(name, variable)?;
        Ok(self)
    }

    pub fn dims(&self) -> &IndexMap<String, usize> {
        &self.dims
    }

    pub fn coord(&self, name: &str) -> Option<&Coordinate> {
        self.coords.get(name)
    }

    pub fn coords(&self) -> impl Iterator<Item = (&String, &Coordinate)> {
        self.coords.iter()
    }

    pub fn coord_names(&self) -> Vec<String> {
        self.coords.keys().cloned().collect()
    }

    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.data_vars.get(name)
    }

    pub fn variable_mut(&mut self, name: &str) -> Option<&mut Variable> {
        self.data_vars.get_mut(name)
    }

    pub fn variables(&self) -> impl Iterator<Item = (&String, &Variable)> {
        self.data_vars.iter()
    }

    pub fn variables_mut(&mut self) -> impl Iterator<Item = (&String, &mut Variable)> {
        self.data_vars.iter_mut()
    }

    pub fn variable_names(&self) -> Vec<String> {
        self.data_vars.keys().cloned().collect()
    }

    pub fn contains_variable(&self, name: &str) -> bool {
        self.data_vars.contains_key(name)
    }

    /// Insert or replace a coordinate.
    ///
    /// Fails with [`ForcingError::AxisConflict`] if a data variable already uses the dimension
    /// with a different length.
    pub fn set_coord(&mut self, name: &str, coord: Coordinate) -> ForcingResult<()> {
        for (var_name, variable) in &self.data_vars {
            if let Some(len) = variable.dim_len(name) {
                if len != coord.len() {
                    return Err(ForcingError::AxisConflict {
                        axis: name.to_string(),
                        reason: format!(
                            "coordinate has {} values but variable '{}' has {}",
                            coord.len(),
                            var_name,
                            len
                        ),
                    });
                }
            }
        }
        self.dims.insert(name.to_string(), coord.len());
        self.coords.insert(name.to_string(), coord);
        Ok(())
    }

    /// Insert or replace a data variable.
    ///
    /// Every dimension the variable shares with the dataset must have the same length.
    pub fn set_variable(&mut self, name: &str, variable: Variable) -> ForcingResult<()> {
        for (dim, &len) in variable.dims.iter().zip(variable.shape()) {
            // A replaced variable may change the length of a dimension only it uses
            let existing = self
                .coords
                .get(dim)
                .map(Coordinate::len)
                .or_else(|| self.dim_len_elsewhere(dim, name));
            if let Some(expected) = existing {
                if expected != len {
                    return Err(ForcingError::AxisConflict {
                        axis: dim.clone(),
                        reason: format!(
                            "variable '{}' has length {} but the dataset has {}",
                            name, len, expected
                        ),
                    });
                }
            }
        }
        for (dim, &len) in variable.dims.iter().zip(variable.shape()) {
            self.dims.insert(dim.clone(), len);
        }
        self.data_vars.insert(name.to_string(), variable);
        Ok(())
    }

    fn dim_len_elsewhere(&self, dim: &str, except: &str) -> Option<usize> {
        self.data_vars
            .iter()
            .filter(|(n, _)| n.as_str() != except)
            .find_map(|(_, v)| v.dim_len(dim))
    }

    pub fn remove_variable(&mut self, name: &str) -> Option<Variable> {
        self.data_vars.shift_remove(name)
    }

    /// Drop lookup indexes on the named axes. Axes not present are ignored.
    pub fn drop_indexes<S: AsRef<str>>(&mut self, axes: &[S]) {
        for axis in axes {
            if let Some(coord) = self.coords.get_mut(axis.as_ref()) {
                coord.drop_index();
            }
        }
    }

    /// Check that every data variable agrees with the dataset's coordinate lengths.
    pub fn validate(&self) -> ForcingResult<()> {
        for (name, variable) in &self.data_vars {
            for (dim, &len) in variable.dims.iter().zip(variable.shape()) {
                let expected = self.dims.get(dim).copied();
                if expected != Some(len) {
                    return Err(ForcingError::AxisConflict {
                        axis: dim.clone(),
                        reason: format!(
                            "variable '{}' has length {} but the dataset declares {:?}",
                            name, len, expected
                        ),
                    });
                }
            }
        }
        for (name, coord) in &self.coords {
            if coord.is_indexed() && coord.has_duplicates() {
                return Err(ForcingError::DuplicateIndex(name.clone()));
            }
        }
        Ok(())
    }

    /// Merge another dataset into this one.
    ///
    /// Shared coordinates must hold identical values. A shared coordinate that still carries an
    /// index on either side must also be free of duplicates. Data variables present in both must
    /// be identical. Nothing is modified if the merge fails.
    pub fn merge(&mut self, other: Dataset) -> ForcingResult<()> {
        for (name, coord) in &other.coords {
            if let Some(existing) = self.coords.get(name) {
                if (existing.is_indexed() && existing.has_duplicates())
                    || (coord.is_indexed() && coord.has_duplicates())
                {
                    return Err(ForcingError::DuplicateIndex(name.clone()));
                }
                if !existing.same_values(coord) {
                    return Err(ForcingError::AxisConflict {
                        axis: name.clone(),
                        reason: format!(
                            "inputs disagree on coordinate values ({} vs {} values)",
                            existing.len(),
                            coord.len()
                        ),
                    });
                }
            }
        }
        for (dim, &len) in &other.dims {
            if let Some(&existing) = self.dims.get(dim) {
                if existing != len {
                    return Err(ForcingError::AxisConflict {
                        axis: dim.clone(),
                        reason: format!("inputs disagree on length ({} vs {})", existing, len),
                    });
                }
            }
        }
        for (name, variable) in &other.data_vars {
            if let Some(existing) = self.data_vars.get(name) {
                if existing.dims != variable.dims || existing.values != variable.values {
                    return Err(ForcingError::VariableConflict(name.clone()));
                }
            }
        }

        let Dataset {
            dims,
            coords,
            data_vars,
            attrs,
        } = other;
        for (dim, len) in dims {
            self.dims.entry(dim).or_insert(len);
        }
        for (name, coord) in coords {
            match self.coords.get_mut(&name) {
                Some(existing) => existing.indexed = existing.indexed && coord.indexed,
                None => {
                    self.coords.insert(name, coord);
                }
            }
        }
        for (name, variable) in data_vars {
            self.data_vars.entry(name).or_insert(variable);
        }
        for (name, value) in attrs {
            self.attrs.entry(name).or_insert(value);
        }
        Ok(())
    }

    /// Join datasets holding the same data variables end to end along `axis`.
    ///
    /// Variables on `axis` are concatenated and the result is ordered by the values of the
    /// `axis` coordinate, which every part must carry. Everything else must agree between parts:
    /// other coordinates must hold the same values, other dimensions the same lengths, and
    /// variables without `axis` the same contents. Attributes and encodings come from the first
    /// part. The joined axis keeps its index only if every part indexed it, in which case the
    /// joined values must be unique.
    pub fn concat(parts: Vec<Dataset>, axis: &str) -> ForcingResult<Dataset> {
        let mut parts = parts.into_iter();
        let Some(mut combined) = parts.next() else {
            return Ok(Dataset::new());
        };
        let rest: Vec<Dataset> = parts.collect();
        if rest.is_empty() {
            return Ok(combined);
        }

        for part in std::iter::once(&combined).chain(&rest) {
            if !part.coords.contains_key(axis) {
                return Err(ForcingError::MissingAxis(axis.to_string()));
            }
        }
        for part in &rest {
            combined.check_concat_part(part, axis)?;
        }

        // Ordering of the joined axis, stable for repeated values
        let joined_axis: Vec<f64> = std::iter::once(&combined)
            .chain(&rest)
            .flat_map(|p| p.coords[axis].values.iter().copied())
            .collect();
        let mut order: Vec<usize> = (0..joined_axis.len()).collect();
        order.sort_by(|&a, &b| joined_axis[a].total_cmp(&joined_axis[b]));

        let names: Vec<String> = combined.data_vars.keys().cloned().collect();
        for name in names {
            let variable = &combined.data_vars[&name];
            let Some(position) = variable.dims.iter().position(|d| d == axis) else {
                continue;
            };
            let views: Vec<ArrayViewD<f64>> = std::iter::once(variable)
                .chain(rest.iter().map(|p| &p.data_vars[&name]))
                .map(|v| v.values.view())
                .collect();
            let joined = concatenate(Axis(position), &views).map_err(|e| {
                ForcingError::AxisConflict {
                    axis: axis.to_string(),
                    reason: format!("cannot join '{}': {}", name, e),
                }
            })?;
            let values = joined.select(Axis(position), &order);
            if let Some(variable) = combined.data_vars.get_mut(&name) {
                variable.values = values;
            }
        }

        let indexed = std::iter::once(&combined)
            .chain(&rest)
            .all(|p| p.coords[axis].indexed);
        let joined_values = Array1::from(joined_axis).select(Axis(0), &order);
        if let Some(coord) = combined.coords.get_mut(axis) {
            coord.values = joined_values;
            coord.indexed = indexed;
            if indexed && coord.has_duplicates() {
                return Err(ForcingError::DuplicateIndex(axis.to_string()));
            }
        }
        combined.dims.insert(axis.to_string(), order.len());

        for part in rest {
            for (name, coord) in part.coords {
                combined.coords.entry(name).or_insert(coord);
            }
            for (dim, len) in part.dims {
                combined.dims.entry(dim).or_insert(len);
            }
            for (name, value) in part.attrs {
                combined.attrs.entry(name).or_insert(value);
            }
        }
        Ok(combined)
    }

    fn check_concat_part(&self, part: &Dataset, axis: &str) -> ForcingResult<()> {
        let same_names = self.data_vars.len() == part.data_vars.len()
            && part.data_vars.keys().all(|n| self.data_vars.contains_key(n));
        if !same_names {
            let name = part
                .data_vars
                .keys()
                .chain(self.data_vars.keys())
                .find(|n| !(self.data_vars.contains_key(*n) && part.data_vars.contains_key(*n)))
                .cloned()
                .unwrap_or_default();
            return Err(ForcingError::VariableConflict(name));
        }

        for (name, coord) in part.coords.iter().filter(|(n, _)| n.as_str() != axis) {
            if let Some(existing) = self.coords.get(name) {
                if !existing.same_values(coord) {
                    return Err(ForcingError::AxisConflict {
                        axis: name.clone(),
                        reason: format!(
                            "parts joined along '{}' disagree on coordinate values",
                            axis
                        ),
                    });
                }
            }
        }
        for (dim, &len) in part.dims.iter().filter(|(d, _)| d.as_str() != axis) {
            if let Some(&existing) = self.dims.get(dim) {
                if existing != len {
                    return Err(ForcingError::AxisConflict {
                        axis: dim.clone(),
                        reason: format!(
                            "parts joined along '{}' disagree on length ({} vs {})",
                            axis, existing, len
                        ),
                    });
                }
            }
        }
        for (name, variable) in &part.data_vars {
            let existing = &self.data_vars[name];
            let conflicting = existing.dims != variable.dims
                || (!variable.has_dim(axis) && existing.values != variable.values);
            if conflicting {
                return Err(ForcingError::VariableConflict(name.clone()));
            }
        }
        Ok(())
    }

    /// Rename dimension `old` to `new` on a single data variable.
    ///
    /// The coordinate for `old` is copied to `new`, and `old` stays in place for any other
    /// variable still using it. Fails with [`ForcingError::AxisConflict`] if `new` already
    /// exists with different values.
    pub fn rename_variable_dim(
        &mut self,
        variable: &str,
        old: &str,
        new: &str,
    ) -> ForcingResult<()> {
        let var = self
            .data_vars
            .get(variable)
            .ok_or_else(|| ForcingError::UnknownVariable(variable.to_string()))?;
        if !var.has_dim(old) {
            return Err(ForcingError::MissingAxis(format!("{} (on '{}')", old, variable)));
        }

        if let Some(coord) = self.coords.get(old) {
            match self.coords.get(new) {
                Some(existing) if !existing.same_values(coord) => {
                    return Err(ForcingError::AxisConflict {
                        axis: new.to_string(),
                        reason: format!("renaming '{}' would overwrite different values", old),
                    });
                }
                Some(_) => {}
                None => {
                    let coord = coord.clone();
                    self.dims.insert(new.to_string(), coord.len());
                    self.coords.insert(new.to_string(), coord);
                }
            }
        } else if let Some(&len) = self.dims.get(old) {
            match self.dims.get(new) {
                Some(&existing) if existing != len => {
                    return Err(ForcingError::AxisConflict {
                        axis: new.to_string(),
                        reason: format!("renaming '{}' would change its length", old),
                    });
                }
                _ => {
                    self.dims.insert(new.to_string(), len);
                }
            }
        }

        if let Some(var) = self.data_vars.get_mut(variable) {
            var.rename_dim(old, new);
        }
        Ok(())
    }

    /// Remove coordinates and dimensions no data variable uses, except those in `keep`.
    pub fn prune_unused_axes<S: AsRef<str>>(&mut self, keep: &[S]) {
        let used: HashSet<String> = self
            .data_vars
            .values()
            .flat_map(|v| v.dims.iter().cloned())
            .chain(keep.iter().map(|k| k.as_ref().to_string()))
            .collect();
        self.coords.retain(|name, _| used.contains(name));
        self.dims.retain(|name, _| used.contains(name));
    }

    /// Clear the storage encoding of every coordinate and data variable.
    pub fn reset_encodings(&mut self) {
        for coord in self.coords.values_mut() {
            coord.encoding = Encoding::default();
        }
        for variable in self.data_vars.values_mut() {
            variable.encoding = Encoding::default();
        }
    }
}

/// The parts of a retrieved dataset, typically one per file, not yet combined.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawDataset {
    parts: Vec<Dataset>,
}

impl RawDataset {
    pub fn from_parts(parts: Vec<Dataset>) -> Self {
        Self { parts }
    }

    pub fn single(dataset: Dataset) -> Self {
        Self {
            parts: vec![dataset],
        }
    }

    pub fn parts(&self) -> &[Dataset] {
        &self.parts
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Names of all data variables across parts, in first-seen order.
    pub fn variable_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for part in &self.parts {
            for name in part.data_vars.keys() {
                if !names.contains(name) {
                    names.push(name.clone());
                }
            }
        }
        names
    }
}

impl From<Dataset> for RawDataset {
    fn from(dataset: Dataset) -> Self {
        RawDataset::single(dataset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array, IxDyn};

    fn field(dims: &[&str], shape: &[usize], start: f64) -> Variable {
        let n: usize = shape.iter().product();
        let values = Array::range(start, start + n as f64, 1.0)
            .into_shape(IxDyn(shape))
            .unwrap();
        Variable::new(dims.iter().copied(), values).unwrap()
    }

    fn grid(time_axis: &str, times: Vec<f64>) -> Dataset {
        Dataset::new()
            .with_coord("lon", Coordinate::new(vec![1.0, 1.25, 1.5]))
            .unwrap()
            .with_coord("lat", Coordinate::new(vec![56.0, 56.25]))
            .unwrap()
            .with_coord(time_axis, Coordinate::new(times))
            .unwrap()
    }

    #[test]
    fn test_variable_rank_must_match_dims() {
        let result = Variable::new(["time", "lat"], ArrayD::zeros(IxDyn(&[2])));
        assert!(matches!(result, Err(ForcingError::ShapeMismatch { .. })));
    }

    #[test]
    fn test_set_variable_checks_lengths() {
        let ds = grid("pair_time", vec![0.0, 1.0]);
        let bad = field(&["pair_time", "lat", "lon"], &[3, 2, 3], 0.0);
        let result = ds.with_variable("Pair", bad);
        assert!(matches!(
            result,
            Err(ForcingError::AxisConflict { ref axis, .. }) if axis == "pair_time"
        ));
    }

    #[test]
    fn test_map_values_returns_copy() {
        let var = field(&["t"], &[3], 1.0);
        let doubled = var.map_values(|v| v * 2.0);
        assert_eq!(var.values().as_slice().unwrap(), &[1.0, 2.0, 3.0]);
        assert_eq!(doubled.values().as_slice().unwrap(), &[2.0, 4.0, 6.0]);
    }

    #[test]
    fn test_merge_disjoint_parts() {
        let pair = grid("pair_time", vec![0.0, 1.0])
            .with_variable("Pair", field(&["pair_time", "lat", "lon"], &[2, 2, 3], 0.0))
            .unwrap();
        let qair = grid("qair_time", vec![0.0, 1.0])
            .with_variable("Qair", field(&["qair_time", "lat", "lon"], &[2, 2, 3], 0.0))
            .unwrap();

        let mut merged = pair.clone();
        merged.merge(qair).unwrap();
        assert_eq!(merged.variable_names(), vec!["Pair", "Qair"]);
        assert_eq!(
            merged.coord_names(),
            vec!["lon", "lat", "pair_time", "qair_time"]
        );
        merged.validate().unwrap();
    }

    #[test]
    fn test_merge_conflicting_axis() {
        let mut a = grid("wind_time", vec![0.0, 1.0]);
        let b = grid("wind_time", vec![0.0, 2.0]);
        let before = a.clone();
        let result = a.merge(b);
        assert!(matches!(
            result,
            Err(ForcingError::AxisConflict { ref axis, .. }) if axis == "wind_time"
        ));
        assert_eq!(a, before);
    }

    #[test]
    fn test_merge_duplicate_values_need_index_dropped() {
        let mut a = grid("rain_time", vec![0.0, 0.0]);
        let b = grid("rain_time", vec![0.0, 0.0]);

        let result = a.clone().merge(b.clone());
        assert!(matches!(result, Err(ForcingError::DuplicateIndex(ref n)) if n == "rain_time"));

        let mut b = b;
        a.drop_indexes(&["rain_time"]);
        b.drop_indexes(&["rain_time"]);
        a.merge(b).unwrap();
        assert!(!a.coord("rain_time").unwrap().is_indexed());
    }

    #[test]
    fn test_merge_conflicting_variable() {
        let mut a = grid("pair_time", vec![0.0])
            .with_variable("Pair", field(&["pair_time", "lat", "lon"], &[1, 2, 3], 0.0))
            .unwrap();
        let same = a.clone();
        a.merge(same).unwrap();

        let other = grid("pair_time", vec![0.0])
            .with_variable("Pair", field(&["pair_time", "lat", "lon"], &[1, 2, 3], 5.0))
            .unwrap();
        assert!(matches!(
            a.merge(other),
            Err(ForcingError::VariableConflict(ref n)) if n == "Pair"
        ));
    }

    #[test]
    fn test_concat_along_time() {
        let later = grid("pair_time", vec![2.0, 3.0])
            .with_variable("Pair", field(&["pair_time", "lat", "lon"], &[2, 2, 3], 100.0))
            .unwrap();
        let earlier = grid("pair_time", vec![0.0, 1.0])
            .with_variable("Pair", field(&["pair_time", "lat", "lon"], &[2, 2, 3], 0.0))
            .unwrap();

        let joined = Dataset::concat(vec![later, earlier], "pair_time").unwrap();
        assert_eq!(
            joined.coord("pair_time").unwrap().values(),
            &array![0.0, 1.0, 2.0, 3.0]
        );
        assert_eq!(joined.dims()["pair_time"], 4);

        let pair = joined.variable("Pair").unwrap();
        assert_eq!(pair.shape(), &[4, 2, 3]);
        assert_eq!(pair.values()[IxDyn(&[0, 0, 0])], 0.0);
        assert_eq!(pair.values()[IxDyn(&[2, 0, 0])], 100.0);
        assert_eq!(pair.values()[IxDyn(&[3, 1, 2])], 111.0);
        joined.validate().unwrap();
    }

    #[test]
    fn test_concat_checks_other_axes() {
        let a = grid("pair_time", vec![0.0])
            .with_variable("Pair", field(&["pair_time", "lat", "lon"], &[1, 2, 3], 0.0))
            .unwrap();
        let mut b = grid("pair_time", vec![1.0])
            .with_variable("Pair", field(&["pair_time", "lat", "lon"], &[1, 2, 3], 0.0))
            .unwrap();
        b.set_coord("lon", Coordinate::new(vec![2.0, 2.25, 2.5])).unwrap();

        assert!(matches!(
            Dataset::concat(vec![a.clone(), b], "pair_time"),
            Err(ForcingError::AxisConflict { ref axis, .. }) if axis == "lon"
        ));

        let qair = grid("pair_time", vec![1.0])
            .with_variable("Qair", field(&["pair_time", "lat", "lon"], &[1, 2, 3], 0.0))
            .unwrap();
        assert!(matches!(
            Dataset::concat(vec![a.clone(), qair], "pair_time"),
            Err(ForcingError::VariableConflict(_))
        ));

        assert!(matches!(
            Dataset::concat(vec![a.clone(), a], "qair_time"),
            Err(ForcingError::MissingAxis(_))
        ));
    }

    #[test]
    fn test_concat_repeated_values_need_index_dropped() {
        let part = grid("rain_time", vec![0.0, 1.0])
            .with_variable("rain", field(&["rain_time", "lat", "lon"], &[2, 2, 3], 0.0))
            .unwrap();
        assert!(matches!(
            Dataset::concat(vec![part.clone(), part.clone()], "rain_time"),
            Err(ForcingError::DuplicateIndex(_))
        ));

        let mut part = part;
        part.drop_indexes(&["rain_time"]);
        let joined = Dataset::concat(vec![part.clone(), part], "rain_time").unwrap();
        assert_eq!(
            joined.coord("rain_time").unwrap().values(),
            &array![0.0, 0.0, 1.0, 1.0]
        );
    }

    #[test]
    fn test_rename_variable_dim() {
        let mut ds = grid("swrad_time", vec![0.0, 1.0])
            .with_variable("swrad", field(&["swrad_time", "lat", "lon"], &[2, 2, 3], 0.0))
            .unwrap()
            .with_variable("latent", field(&["swrad_time", "lat", "lon"], &[2, 2, 3], 0.0))
            .unwrap();

        ds.rename_variable_dim("swrad", "swrad_time", "srf_time").unwrap();
        assert_eq!(ds.variable("swrad").unwrap().dims()[0], "srf_time");
        assert_eq!(ds.variable("latent").unwrap().dims()[0], "swrad_time");
        assert_eq!(
            ds.coord("srf_time").unwrap().values(),
            &array![0.0, 1.0]
        );

        ds.remove_variable("latent");
        ds.prune_unused_axes(&["time"]);
        assert!(ds.coord("swrad_time").is_none());
        assert!(!ds.dims().contains_key("swrad_time"));
        ds.validate().unwrap();
    }

    #[test]
    fn test_rename_missing_axis() {
        let mut ds = grid("pair_time", vec![0.0])
            .with_variable("Pair", field(&["pair_time", "lat", "lon"], &[1, 2, 3], 0.0))
            .unwrap();
        assert!(matches!(
            ds.rename_variable_dim("Pair", "Tair_time", "tair_time"),
            Err(ForcingError::MissingAxis(_))
        ));
    }

    #[test]
    fn test_reset_encodings() {
        let encoding = Encoding {
            compression_level: Some(4),
            chunk_sizes: Some(vec![1, 2, 3]),
            ..Encoding::default()
        };
        let mut ds = grid("pair_time", vec![0.0])
            .with_variable(
                "Pair",
                field(&["pair_time", "lat", "lon"], &[1, 2, 3], 0.0).with_encoding(encoding),
            )
            .unwrap();
        assert!(!ds.variable("Pair").unwrap().encoding.is_empty());

        ds.reset_encodings();
        assert!(ds.variable("Pair").unwrap().encoding.is_empty());
    }

    #[test]
    fn test_raw_dataset_variable_names() {
        let a = grid("pair_time", vec![0.0])
            .with_variable("Pair", field(&["pair_time", "lat", "lon"], &[1, 2, 3], 0.0))
            .unwrap();
        let b = grid("qair_time", vec![0.0])
            .with_variable("Qair", field(&["qair_time", "lat", "lon"], &[1, 2, 3], 0.0))
            .unwrap();
        let raw = RawDataset::from_parts(vec![a.clone(), b, a]);
        assert_eq!(raw.variable_names(), vec!["Pair", "Qair"]);
        assert_eq!(raw.len(), 3);
    }

    #[test]
    fn test_attribute_serialization() {
        let attrs: Attributes = [
            ("units".to_string(), AttributeValue::from("millibar")),
            ("scale".to_string(), AttributeValue::from(0.01)),
        ]
        .into_iter()
        .collect();
        let json = serde_json::to_string(&attrs).unwrap();
        assert_eq!(json, r#"{"units":"millibar","scale":0.01}"#);
    }
}
