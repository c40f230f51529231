//! Run configuration.
//!
//! The run parameters of a retrieval (project, years, variant, resolution, output location)
//! are read from a TOML file into a [`RunConfig`].
//!
//! ```toml
//! project = "ROHO800"
//! start_year = 2000
//! end_year = 2001
//! variant = "net-shortwave-model"
//! grid_resolution = 0.25
//! skip_existing = true
//! output_dir = "../oceanography/ERA5/ROHO800"
//! ```
//!
//! Every field except `variant` has a default. The variant must always be stated: a file
//! without it deserializes, but [`RunConfig::request_spec`] fails with
//! [`ForcingError::InvalidVariant`](crate::errors::ForcingError::InvalidVariant).

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::{ForcingError, ForcingResult};
use crate::request::{Reanalysis, RequestSpec, RequestSpecBuilder};

fn default_project() -> String {
    "ROHO800".to_string()
}

fn default_start_year() -> i32 {
    2000
}

fn default_end_year() -> i32 {
    2001
}

fn default_true() -> bool {
    true
}

/// Parameters for one retrieval run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Name of a registered region profile
    #[serde(default = "default_project")]
    pub project: String,
    #[serde(default = "default_start_year")]
    pub start_year: i32,
    #[serde(default = "default_end_year")]
    pub end_year: i32,
    /// `net-shortwave-model` (alias `rutgers`) or `downward-shortwave-model` (alias `kate`)
    #[serde(default)]
    pub variant: Option<String>,
    /// Degrees; defaults to the native resolution of the reanalysis
    #[serde(default)]
    pub grid_resolution: Option<f64>,
    #[serde(default = "default_true")]
    pub skip_existing: bool,
    /// Defaults to `ERA5/<project>`
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
    #[serde(default = "default_true")]
    pub optional_variables: bool,
    #[serde(default)]
    pub reanalysis: Reanalysis,
}

impl RunConfig {
    /// A configuration for `project` using the defaults for every other field.
    pub fn new(project: impl Into<String>, variant: Option<String>) -> Self {
        Self {
            project: project.into(),
            start_year: default_start_year(),
            end_year: default_end_year(),
            variant,
            grid_resolution: None,
            skip_existing: true,
            output_dir: None,
            optional_variables: true,
            reanalysis: Reanalysis::default(),
        }
    }

    pub fn from_toml_str(contents: &str) -> ForcingResult<Self> {
        toml::from_str(contents).map_err(|e| ForcingError::Config(e.to_string()))
    }

    pub fn from_file(path: impl AsRef<Path>) -> ForcingResult<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
            .map_err(|e| ForcingError::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn to_toml_string(&self) -> ForcingResult<String> {
        toml::to_string(self).map_err(|e| ForcingError::Config(e.to_string()))
    }

    /// Translate into a builder without validating anything yet.
    pub fn builder(&self) -> RequestSpecBuilder {
        let mut builder = RequestSpecBuilder::new(&self.project)
            .years(self.start_year, self.end_year)
            .reanalysis(self.reanalysis)
            .skip_existing(self.skip_existing)
            .optional_variables(self.optional_variables);
        if let Some(variant) = &self.variant {
            builder = builder.variant(variant.clone());
        }
        if let Some(resolution) = self.grid_resolution {
            builder = builder.grid_resolution(resolution);
        }
        if let Some(dir) = &self.output_dir {
            builder = builder.output_dir(dir);
        }
        builder
    }

    /// Validate and build the request, creating the output directory.
    pub fn request_spec(&self) -> ForcingResult<RequestSpec> {
        self.builder().build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::ModelVariant;
    use tempfile::tempdir;

    #[test]
    fn test_parse_full() {
        let config = RunConfig::from_toml_str(
            r#"
project = "A20"
start_year = 1995
end_year = 1996
variant = "kate"
grid_resolution = 0.5
skip_existing = false
output_dir = "out/A20"
optional_variables = false
reanalysis = "interim"
"#,
        )
        .unwrap();

        assert_eq!(config.project, "A20");
        assert_eq!(config.start_year, 1995);
        assert_eq!(config.variant.as_deref(), Some("kate"));
        assert_eq!(config.grid_resolution, Some(0.5));
        assert!(!config.skip_existing);
        assert_eq!(config.output_dir, Some(PathBuf::from("out/A20")));
        assert_eq!(config.reanalysis, Reanalysis::Interim);
    }

    #[test]
    fn test_defaults_do_not_include_variant() {
        let config = RunConfig::from_toml_str("").unwrap();
        assert_eq!(config, RunConfig::new("ROHO800", None));

        let dir = tempdir().unwrap();
        let config = RunConfig {
            output_dir: Some(dir.path().to_path_buf()),
            ..config
        };
        assert!(matches!(
            config.request_spec(),
            Err(ForcingError::InvalidVariant(_))
        ));
    }

    #[test]
    fn test_request_spec_from_config() {
        let dir = tempdir().unwrap();
        let mut config = RunConfig::new("ROHO800", Some("rutgers".to_string()));
        config.output_dir = Some(dir.path().join("ROHO800"));
        config.start_year = 2010;
        config.end_year = 2010;

        let spec = config.request_spec().unwrap();
        assert_eq!(spec.variant, ModelVariant::NetShortwaveModel);
        assert_eq!(spec.year_range.len(), 1);
        assert!(spec.output_dir.is_dir());
    }

    #[test]
    fn test_invalid_toml() {
        let result = RunConfig::from_toml_str("start_year = \"two thousand\"");
        assert!(matches!(result, Err(ForcingError::Config(_))));
    }

    #[test]
    fn test_toml_roundtrip() {
        let config = RunConfig::new("A20", Some("net-shortwave-model".to_string()));
        let serialised = config.to_toml_string().unwrap();
        let deserialised = RunConfig::from_toml_str(&serialised).unwrap();
        assert_eq!(deserialised, config);
    }

    #[test]
    fn test_from_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("run.toml");
        fs::write(&path, "project = \"A20\"\nvariant = \"rutgers\"\n").unwrap();

        let config = RunConfig::from_file(&path).unwrap();
        assert_eq!(config.project, "A20");

        assert!(matches!(
            RunConfig::from_file(dir.path().join("missing.toml")),
            Err(ForcingError::Io(_))
        ));
    }
}
