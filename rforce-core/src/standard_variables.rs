//! Standard ERA5 parameter definitions.
//!
//! This module holds the literal table behind
//! [`PARAMETER_CATALOG`](crate::variable::PARAMETER_CATALOG).
//! Each [`Era5Variable`] maps to exactly one [`ParameterEntry`]; the mapping is an exhaustive
//! `match`, so adding an identifier without a table row fails to compile.
//!
//! Parameter codes follow the ECMWF GRIB parameter database (`<id>.<table>`).
//!
//! # Time axes
//!
//! Every quantity is retrieved onto its own time dimension. Two entries share an axis only when
//! they belong to the same field family:
//! - `wind_time` is shared by the u and v wind components
//! - `swrad_time` is shared by the net and downward shortwave alternatives, which both become
//!   `swrad` and are never requested together
//!
//! Net long-wave radiation, latent heat flux and evaporation have their own axes.

use crate::variable::{Era5Variable, ParameterEntry};

/// Variables every region profile requests, in request order.
pub const BASE_VARIABLES: [Era5Variable; 8] = [
    Era5Variable::UWind10m,
    Era5Variable::VWind10m,
    Era5Variable::Temperature2m,
    Era5Variable::MeanSeaLevelPressure,
    Era5Variable::MeanSurfaceDownwardLongWaveRadiationFlux,
    Era5Variable::TotalCloudCover,
    Era5Variable::TotalPrecipitation,
    Era5Variable::SpecificHumidity,
];

/// Variables appended when the optional variable policy is enabled.
pub const OPTIONAL_VARIABLES: [Era5Variable; 1] =
    [Era5Variable::MeanSurfaceNetLongWaveRadiationFlux];

const fn entry(
    variable: Era5Variable,
    archive_code: Option<&'static str>,
    short_code: &'static str,
    model_name: &'static str,
    display_name: &'static str,
    unit: &'static str,
    time_axis_name: &'static str,
) -> ParameterEntry {
    ParameterEntry {
        variable,
        archive_code,
        short_code,
        model_name,
        display_name,
        unit,
        time_axis_name,
    }
}

/// Literal catalog row for `variable`.
pub const fn era5_parameter(variable: Era5Variable) -> ParameterEntry {
    use Era5Variable::*;

    match variable {
        // ====================================================================
        // Near-surface state
        // ====================================================================
        Temperature2m => entry(
            variable,
            Some("167.128"),
            "t2m",
            "Tair",
            "2 metre temperature",
            "K",
            "Tair_time",
        ),
        DewpointTemperature2m => entry(
            variable,
            Some("168.128"),
            "d2m",
            "Qair",
            "2 metre dewpoint temperature",
            "K",
            "tdew_time",
        ),
        SpecificHumidity => entry(
            variable,
            Some("133.128"),
            "q",
            "Qair",
            "specific humidity",
            "kg kg-1",
            "qair_time",
        ),
        VWind10m => entry(
            variable,
            Some("166.128"),
            "v10",
            "Vwind",
            "10 metre v-wind component",
            "m s-1",
            "wind_time",
        ),
        UWind10m => entry(
            variable,
            Some("165.128"),
            "u10",
            "Uwind",
            "10 metre u-wind component",
            "m s-1",
            "wind_time",
        ),
        MeanSeaLevelPressure => entry(
            variable,
            Some("151.128"),
            "msl",
            "Pair",
            "Mean sea level pressure",
            "Pa",
            "pair_time",
        ),
        TotalCloudCover => entry(
            variable,
            Some("164.128"),
            "tcc",
            "cloud",
            "Total cloud cover",
            "(0-1)",
            "cloud_time",
        ),

        // ====================================================================
        // Water fluxes
        // ====================================================================
        TotalPrecipitation => entry(
            variable,
            Some("228.128"),
            "tp",
            "rain",
            "Total precipitation",
            "m",
            "rain_time",
        ),
        Evaporation => entry(
            variable,
            Some("182.128"),
            "e",
            "evaporation",
            "Evaporation",
            "m of water equivalent",
            "evap_time",
        ),

        // ====================================================================
        // Radiation and heat fluxes
        // ====================================================================
        MeanSurfaceNetShortWaveRadiationFlux => entry(
            variable,
            Some("37.235"),
            "msnswrf",
            "swrad",
            "Mean surface net short-wave radiation flux",
            "W m-2",
            "swrad_time",
        ),
        MeanSurfaceDownwardShortWaveRadiationFlux => entry(
            variable,
            None,
            "msdwswrf",
            "swrad",
            "Mean surface downward short-wave radiation flux",
            "W m-2",
            "swrad_time",
        ),
        MeanSurfaceNetLongWaveRadiationFlux => entry(
            variable,
            Some("38.235"),
            "msnlwrf",
            "lwrad",
            "Mean surface net long-wave radiation flux",
            "W m-2",
            "lwnet_time",
        ),
        MeanSurfaceDownwardLongWaveRadiationFlux => entry(
            variable,
            Some("36.235"),
            "msdwlwrf",
            "lwrad_down",
            "Mean surface downward long-wave radiation flux",
            "W m-2",
            "lwrad_time",
        ),
        MeanSurfaceLatentHeatFlux => entry(
            variable,
            Some("34.235"),
            "mslhf",
            "latent",
            "Surface latent heat flux",
            "W m-2",
            "latent_time",
        ),
        MeanSurfaceSensibleHeatFlux => entry(
            variable,
            Some("33.235"),
            "msshf",
            "sensible",
            "Surface sensible heat flux",
            "W m-2",
            "sen_time",
        ),
    }
}
