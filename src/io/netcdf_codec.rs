//! NetCDF reader and writer.
//!
//! Packed variables are decoded on read: values equal to `_FillValue` or `missing_value` become
//! NaN, then `scale_factor` and `add_offset` are applied. The packing attributes are removed
//! and the fill value is kept as an [`Encoding`](rforce_core::dataset::Encoding) hint.
//!
//! Everything is written as double precision. Compression and chunking hints are honoured for
//! the NetCDF-4 formats and ignored for the classic format.

use std::path::Path;

use rforce_core::dataset::Dataset;

use super::{DatasetReader, DatasetWriter, IoResult, OutputFormat};
#[cfg(not(feature = "netcdf"))]
use super::IoError;

/// Codec for NetCDF files.
#[derive(Debug, Clone, Copy, Default)]
pub struct NetcdfCodec;

impl NetcdfCodec {
    /// Whether the crate was built with NetCDF support.
    pub const fn is_available() -> bool {
        cfg!(feature = "netcdf")
    }
}

impl DatasetReader for NetcdfCodec {
    fn read(&self, path: &Path) -> IoResult<Dataset> {
        #[cfg(feature = "netcdf")]
        {
            imp::read(path)
        }
        #[cfg(not(feature = "netcdf"))]
        {
            let _ = path;
            Err(IoError::FeatureDisabled)
        }
    }
}

impl DatasetWriter for NetcdfCodec {
    fn write(&self, dataset: &Dataset, path: &Path, format: OutputFormat) -> IoResult<()> {
        #[cfg(feature = "netcdf")]
        {
            imp::write(dataset, path, format)
        }
        #[cfg(not(feature = "netcdf"))]
        {
            let _ = (dataset, path, format);
            Err(IoError::FeatureDisabled)
        }
    }
}

#[cfg(feature = "netcdf")]
mod imp {
    use ndarray::{ArrayD, IxDyn};
    use rforce_core::dataset::{AttributeValue, Attributes, Coordinate, Dataset, Encoding, Variable};
    use std::path::Path;
    use tracing::{debug, info};

    use super::super::{IoError, IoResult, OutputFormat};

    const FILL_VALUE: &str = "_FillValue";
    const MISSING_VALUE: &str = "missing_value";
    const SCALE_FACTOR: &str = "scale_factor";
    const ADD_OFFSET: &str = "add_offset";

    fn from_netcdf(value: netcdf::AttributeValue) -> Option<AttributeValue> {
        use netcdf::AttributeValue as Nc;

        match value {
            Nc::Str(s) => Some(AttributeValue::Text(s)),
            Nc::Strs(s) => Some(AttributeValue::Text(s.join("\n"))),
            Nc::Double(v) => Some(AttributeValue::Number(v)),
            Nc::Float(v) => Some(AttributeValue::Number(v as f64)),
            Nc::Int(v) => Some(AttributeValue::Number(v as f64)),
            Nc::Short(v) => Some(AttributeValue::Number(v as f64)),
            Nc::Longlong(v) => Some(AttributeValue::Number(v as f64)),
            Nc::Doubles(v) => Some(AttributeValue::Numbers(v)),
            Nc::Floats(v) => Some(AttributeValue::Numbers(v.into_iter().map(f64::from).collect())),
            Nc::Ints(v) => Some(AttributeValue::Numbers(v.into_iter().map(f64::from).collect())),
            Nc::Shorts(v) => Some(AttributeValue::Numbers(v.into_iter().map(f64::from).collect())),
            _ => None,
        }
    }

    fn to_netcdf(value: &AttributeValue) -> netcdf::AttributeValue {
        match value {
            AttributeValue::Text(s) => netcdf::AttributeValue::Str(s.clone()),
            AttributeValue::Number(v) => netcdf::AttributeValue::Double(*v),
            AttributeValue::Numbers(v) => netcdf::AttributeValue::Doubles(v.clone()),
        }
    }

    fn number(attrs: &mut Attributes, name: &str) -> Option<f64> {
        match attrs.shift_remove(name) {
            Some(AttributeValue::Number(v)) => Some(v),
            Some(other) => {
                attrs.insert(name.to_string(), other);
                None
            }
            None => None,
        }
    }

    fn read_attributes<'a>(
        attributes: impl Iterator<Item = netcdf::Attribute<'a>>,
    ) -> IoResult<Attributes> {
        let mut attrs = Attributes::new();
        for attr in attributes {
            match from_netcdf(attr.value()?) {
                Some(value) => {
                    attrs.insert(attr.name().to_string(), value);
                }
                None => debug!("Skipping attribute '{}' of unsupported type", attr.name()),
            }
        }
        Ok(attrs)
    }

    /// Values of `var` with masking and scaling applied, plus its remaining attributes.
    fn read_values(
        var: &netcdf::Variable,
        path: &Path,
    ) -> IoResult<(ArrayD<f64>, Attributes, Encoding)> {
        let mut attrs = read_attributes(var.attributes())?;
        let fill = number(&mut attrs, FILL_VALUE);
        let missing = number(&mut attrs, MISSING_VALUE);
        let scale = number(&mut attrs, SCALE_FACTOR).unwrap_or(1.0);
        let offset = number(&mut attrs, ADD_OFFSET).unwrap_or(0.0);

        let shape: Vec<usize> = var.dimensions().iter().map(|d| d.len()).collect();
        let raw: Vec<f64> = var.get_values::<f64, _>(..)?;
        let values = ArrayD::from_shape_vec(IxDyn(&shape), raw)
            .map_err(|e| IoError::InvalidFile {
                path: path.to_path_buf(),
                reason: format!("variable '{}': {}", var.name(), e),
            })?
            .mapv(|v| {
                if Some(v) == fill || Some(v) == missing {
                    f64::NAN
                } else {
                    v * scale + offset
                }
            });

        let encoding = Encoding {
            fill_value: fill.or(missing),
            source: Some(path.display().to_string()),
            ..Encoding::default()
        };
        Ok((values, attrs, encoding))
    }

    pub(super) fn read(path: &Path) -> IoResult<Dataset> {
        let file = netcdf::open(path)?;
        let mut dataset = Dataset::new();
        dataset.attrs = read_attributes(file.attributes())?;

        let variables: Vec<netcdf::Variable> = file.variables().collect();
        let is_coordinate = |var: &netcdf::Variable| {
            let dims = var.dimensions();
            dims.len() == 1 && dims[0].name() == var.name()
        };

        for var in variables.iter().filter(|v| is_coordinate(v)) {
            let (values, attrs, encoding) = read_values(var, path)?;
            let values = values
                .into_dimensionality::<ndarray::Ix1>()
                .map_err(|e| IoError::InvalidFile {
                    path: path.to_path_buf(),
                    reason: format!("coordinate '{}': {}", var.name(), e),
                })?;
            let mut coord = Coordinate::new(values).with_encoding(encoding);
            coord.attrs = attrs;
            dataset.set_coord(&var.name(), coord)?;
        }

        for var in variables.iter().filter(|v| !is_coordinate(v)) {
            let (values, attrs, encoding) = read_values(var, path)?;
            let dims: Vec<String> = var.dimensions().iter().map(|d| d.name()).collect();
            let mut variable = Variable::new(dims, values)?.with_encoding(encoding);
            variable.attrs = attrs;
            dataset.set_variable(&var.name(), variable)?;
        }

        debug!(
            "Read {} variable(s) and {} coordinate(s) from {}",
            dataset.variable_names().len(),
            dataset.coord_names().len(),
            path.display()
        );
        Ok(dataset)
    }

    fn apply_encoding(
        var: &mut netcdf::VariableMut,
        encoding: &Encoding,
        format: OutputFormat,
    ) -> IoResult<()> {
        if format.supports_compression() {
            if let Some(level) = encoding.compression_level {
                var.set_compression(i32::from(level.min(9)), encoding.shuffle)?;
            }
            if let Some(chunks) = &encoding.chunk_sizes {
                var.set_chunking(chunks)?;
            }
        }
        if let Some(fill) = encoding.fill_value {
            var.set_fill_value(fill)?;
        }
        Ok(())
    }

    pub(super) fn write(dataset: &Dataset, path: &Path, format: OutputFormat) -> IoResult<()> {
        let options = match format {
            OutputFormat::Netcdf4 => netcdf::Options::NETCDF4,
            OutputFormat::Netcdf4Classic => netcdf::Options::NETCDF4 | netcdf::Options::CLASSIC,
            OutputFormat::Netcdf3_64Bit => netcdf::Options::_64BIT_OFFSET,
        };
        let mut file = netcdf::create_with(path, options)?;

        // Define everything before writing data; classic files cannot add metadata afterwards
        for (name, len) in dataset.dims() {
            file.add_dimension(name, *len)?;
        }
        for (name, value) in &dataset.attrs {
            file.add_attribute(name, to_netcdf(value))?;
        }
        for (name, coord) in dataset.coords() {
            let mut var = file.add_variable::<f64>(name, &[name.as_str()])?;
            apply_encoding(&mut var, &coord.encoding, format)?;
            for (attr, value) in &coord.attrs {
                var.put_attribute(attr, to_netcdf(value))?;
            }
        }
        for (name, variable) in dataset.variables() {
            let dims: Vec<&str> = variable.dims().iter().map(String::as_str).collect();
            let mut var = file.add_variable::<f64>(name, &dims)?;
            apply_encoding(&mut var, &variable.encoding, format)?;
            for (attr, value) in &variable.attrs {
                var.put_attribute(attr, to_netcdf(value))?;
            }
        }

        for (name, coord) in dataset.coords() {
            if let Some(mut var) = file.variable_mut(name) {
                var.put_values(&coord.values().to_vec(), ..)?;
            }
        }
        for (name, variable) in dataset.variables() {
            if let Some(mut var) = file.variable_mut(name) {
                let values: Vec<f64> = variable.values().iter().copied().collect();
                var.put_values(&values, ..)?;
            }
        }

        info!(
            "Wrote {} variable(s) to {} ({})",
            dataset.variable_names().len(),
            path.display(),
            format
        );
        Ok(())
    }
}
