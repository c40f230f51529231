mod normalizer;
pub mod transform_rule;

pub use normalizer::{ForcingNormalizer, DEFAULT_TIME_AXIS, SPATIAL_AXES, TIME_COORDINATE};
pub use transform_rule::{ForcingField, TransformRule, TransformTable};
