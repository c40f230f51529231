pub mod config;
pub mod dataset;
pub mod profiles;
pub mod request;
pub mod standard_variables;
pub mod variable;

pub mod errors;
