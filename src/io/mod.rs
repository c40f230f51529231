//! Reading raw forcing files and writing the normalized dataset.
//!
//! The normalizer works on in-memory [`Dataset`] values; this module is the boundary to disk.
//! Files are located with [`discover_files`] and read through a [`DatasetReader`]. The result is
//! written through a [`DatasetWriter`].
//!
//! The NetCDF codec ([`NetcdfCodec`]) links against the system `libnetcdf` and is only
//! functional when the crate is built with the `netcdf` feature. Without it every codec call
//! fails with [`IoError::FeatureDisabled`].

use globset::Glob;
use rforce_core::dataset::{Dataset, RawDataset};
use rforce_core::errors::ForcingError;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, info};
use walkdir::WalkDir;

mod netcdf_codec;

pub use netcdf_codec::NetcdfCodec;

/// Error type for dataset I/O.
#[derive(Debug, Error)]
pub enum IoError {
    #[error("No files matching '{pattern}' in {}", dir.display())]
    NoInputFiles { dir: PathBuf, pattern: String },

    #[error("Invalid file pattern '{pattern}'")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    #[error("Failed to list input directory: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("Unknown output format '{0}'. Expected one of 'netcdf4', 'netcdf4-classic' or 'netcdf3-64bit'")]
    UnknownFormat(String),

    #[error("Cannot read {}: {reason}", path.display())]
    InvalidFile { path: PathBuf, reason: String },

    #[error(transparent)]
    Forcing(#[from] ForcingError),

    #[cfg(feature = "netcdf")]
    #[error("NetCDF error: {0}")]
    Netcdf(#[from] ::netcdf::Error),

    #[error("NetCDF support is not enabled; rebuild with the `netcdf` feature")]
    FeatureDisabled,
}

/// Convenience type for `Result<T, IoError>`.
pub type IoResult<T> = Result<T, IoError>;

/// On-disk format of a written dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// HDF5-based NetCDF-4
    #[default]
    Netcdf4,
    /// NetCDF-4 storage restricted to the classic data model
    Netcdf4Classic,
    /// Classic format with 64-bit offsets
    Netcdf3_64Bit,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Netcdf4 => "netcdf4",
            OutputFormat::Netcdf4Classic => "netcdf4-classic",
            OutputFormat::Netcdf3_64Bit => "netcdf3-64bit",
        }
    }

    /// Whether the format can store compression and chunking settings.
    pub fn supports_compression(&self) -> bool {
        !matches!(self, OutputFormat::Netcdf3_64Bit)
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = IoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "netcdf4" => Ok(OutputFormat::Netcdf4),
            "netcdf4-classic" => Ok(OutputFormat::Netcdf4Classic),
            "netcdf3-64bit" | "netcdf3-64bit-offset" => Ok(OutputFormat::Netcdf3_64Bit),
            _ => Err(IoError::UnknownFormat(s.to_string())),
        }
    }
}

/// Reads one file into a [`Dataset`].
pub trait DatasetReader {
    fn read(&self, path: &Path) -> IoResult<Dataset>;
}

/// Writes a [`Dataset`] to a single file, replacing any existing file.
pub trait DatasetWriter {
    fn write(&self, dataset: &Dataset, path: &Path, format: OutputFormat) -> IoResult<()>;
}

/// Files directly inside `dir` whose names match the glob `pattern`, sorted by path.
///
/// # Errors
///
/// [`IoError::NoInputFiles`] if nothing matches.
pub fn discover_files(dir: impl AsRef<Path>, pattern: &str) -> IoResult<Vec<PathBuf>> {
    let dir = dir.as_ref();
    let matcher = Glob::new(pattern)
        .map_err(|source| IoError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })?
        .compile_matcher();

    let mut files = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).follow_links(true) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        if matcher.is_match(entry.file_name()) {
            files.push(entry.into_path());
        }
    }
    files.sort();

    if files.is_empty() {
        return Err(IoError::NoInputFiles {
            dir: dir.to_path_buf(),
            pattern: pattern.to_string(),
        });
    }
    debug!("Found {} file(s) matching '{}' in {}", files.len(), pattern, dir.display());
    Ok(files)
}

/// Read every file matching `pattern` in `dir` as one part of a raw dataset.
pub fn open_mfdataset(
    reader: &dyn DatasetReader,
    dir: impl AsRef<Path>,
    pattern: &str,
) -> IoResult<RawDataset> {
    let files = discover_files(dir, pattern)?;
    let parts = files
        .iter()
        .map(|path| {
            debug!("Reading {}", path.display());
            reader.read(path)
        })
        .collect::<IoResult<Vec<_>>>()?;
    info!("Read {} raw part(s)", parts.len());
    Ok(RawDataset::from_parts(parts))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_parsing() {
        assert_eq!("netcdf4".parse::<OutputFormat>().unwrap(), OutputFormat::Netcdf4);
        assert_eq!(
            "NETCDF4_CLASSIC".parse::<OutputFormat>().unwrap(),
            OutputFormat::Netcdf4Classic
        );
        assert_eq!(
            "netcdf3-64bit".parse::<OutputFormat>().unwrap(),
            OutputFormat::Netcdf3_64Bit
        );
        assert!(matches!(
            "grib".parse::<OutputFormat>(),
            Err(IoError::UnknownFormat(_))
        ));
    }

    #[test]
    fn test_format_display_round_trip() {
        for format in [
            OutputFormat::Netcdf4,
            OutputFormat::Netcdf4Classic,
            OutputFormat::Netcdf3_64Bit,
        ] {
            assert_eq!(format.to_string().parse::<OutputFormat>().unwrap(), format);
        }
        assert!(!OutputFormat::Netcdf3_64Bit.supports_compression());
    }

    #[test]
    fn test_invalid_pattern() {
        let result = discover_files(".", "[*.nc");
        assert!(matches!(result, Err(IoError::InvalidPattern { .. })));
    }
}
