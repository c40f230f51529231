//! Build ROMS bulk-flux atmospheric forcing from ERA5 reanalysis data.
//!
//! - [`rforce_core`]: the parameter catalog, region profiles, request specification and dataset
//!   model
//! - [`rforce_components`]: transform rules and the forcing normalizer
//! - [`io`]: file discovery and the NetCDF codec

pub mod io;

pub use rforce_components;
pub use rforce_core;
