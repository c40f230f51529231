use thiserror::Error;

/// Error type for building requests and normalizing forcing datasets.
#[derive(Error, Debug)]
pub enum ForcingError {
    #[error("Unknown variable '{0}'")]
    UnknownVariable(String),
    #[error("Unknown profile '{0}'. Registered profiles: {1}")]
    UnknownProfile(String, String),
    #[error("Invalid model variant {0}. Expected one of 'net-shortwave-model' (rutgers) or 'downward-shortwave-model' (kate)")]
    InvalidVariant(String),
    #[error("Coordinate conflict on axis '{axis}': {reason}")]
    AxisConflict { axis: String, reason: String },
    #[error("Variable '{0}' is defined by more than one input with different contents")]
    VariableConflict(String),
    #[error("Raw variable '{0}' has no transform rule")]
    UnmappedVariable(String),
    #[error("Axis '{0}' carries an index over duplicated values; drop the index before merging")]
    DuplicateIndex(String),
    #[error("Axis '{0}' is not present in the dataset")]
    MissingAxis(String),
    #[error("Invalid region box: {0}")]
    InvalidRegion(String),
    #[error("Invalid year range {start}..={end}: years must be ordered and within 1900-2100")]
    InvalidYearRange { start: i32, end: i32 },
    #[error("Grid resolution must be a positive number of degrees, got {0}")]
    InvalidResolution(f64),
    #[error("Invalid parameter catalog: {0}")]
    InvalidCatalog(String),
    #[error("Invalid transform table: {0}")]
    InvalidTransformTable(String),
    #[error("Variable '{variable}' has shape {shape:?} which does not match dimensions {dims:?}")]
    ShapeMismatch {
        variable: String,
        shape: Vec<usize>,
        dims: Vec<String>,
    },
    #[error("Failed to read configuration: {0}")]
    Config(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Convenience type for `Result<T, ForcingError>`.
pub type ForcingResult<T> = Result<T, ForcingError>;
