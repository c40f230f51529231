//! File discovery and multi-file reading.

use rforce::io::{discover_files, open_mfdataset, DatasetReader, IoError, IoResult};
use rforce_components::components::ForcingNormalizer;
use rforce_core::dataset::{Coordinate, Dataset, Variable};
use std::fs;
use std::path::Path;
use tempfile::tempdir;

/// Reads a file containing `<variable> <axis> <first step> <value>,<value>,...` into a
/// one-cell dataset with hourly steps.
struct TextReader;

impl DatasetReader for TextReader {
    fn read(&self, path: &Path) -> IoResult<Dataset> {
        let contents = fs::read_to_string(path).unwrap();
        let mut fields = contents.split_whitespace();
        let name = fields.next().unwrap();
        let axis = fields.next().unwrap();
        let first: f64 = fields.next().unwrap().parse().unwrap();
        let values: Vec<f64> = fields
            .next()
            .unwrap()
            .split(',')
            .map(|v| v.parse().unwrap())
            .collect();
        let n = values.len();
        let steps: Vec<f64> = (0..n).map(|i| first + i as f64).collect();

        let variable = Variable::new(
            [axis, "lat", "lon"],
            ndarray::Array::from_shape_vec(ndarray::IxDyn(&[n, 1, 1]), values).unwrap(),
        )?;
        let dataset = Dataset::new()
            .with_coord("lon", Coordinate::new(vec![5.0]))?
            .with_coord("lat", Coordinate::new(vec![60.0]))?
            .with_coord(axis, Coordinate::new(steps))?
            .with_variable(name, variable)?;
        Ok(dataset)
    }
}

fn touch(dir: &Path, name: &str, contents: &str) {
    fs::write(dir.join(name), contents).unwrap();
}

#[test]
fn test_discover_sorted_matches() {
    let dir = tempdir().unwrap();
    touch(dir.path(), "ERA5_2m_temperature_year_2000.nc", "");
    touch(dir.path(), "ERA5_10m_u_component_of_wind_year_2000.nc", "");
    touch(dir.path(), "notes.txt", "");
    fs::create_dir(dir.path().join("nested.nc")).unwrap();

    let files = discover_files(dir.path(), "*.nc").unwrap();
    let names: Vec<String> = files
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(
        names,
        vec![
            "ERA5_10m_u_component_of_wind_year_2000.nc",
            "ERA5_2m_temperature_year_2000.nc",
        ]
    );
}

#[test]
fn test_discover_ignores_subdirectories() {
    let dir = tempdir().unwrap();
    fs::create_dir(dir.path().join("2001")).unwrap();
    touch(&dir.path().join("2001"), "ERA5_total_precipitation_year_2001.nc", "");

    let result = discover_files(dir.path(), "*.nc");
    assert!(matches!(result, Err(IoError::NoInputFiles { .. })));
}

#[test]
fn test_discover_missing_directory() {
    let dir = tempdir().unwrap();
    let result = discover_files(dir.path().join("absent"), "*.nc");
    assert!(matches!(result, Err(IoError::Walk(_))));
}

#[test]
fn test_open_mfdataset_then_normalize() {
    let dir = tempdir().unwrap();
    touch(dir.path(), "a_pressure.txt", "Pair pair_time 0 101325,101300,101400");
    touch(dir.path(), "b_humidity.txt", "Qair qair_time 0 0.012,0.010,0.008");
    touch(dir.path(), "c_latent.txt", "latent latent_time 0 -20,-25,-30");

    let raw = open_mfdataset(&TextReader, dir.path(), "*.txt").unwrap();
    assert_eq!(raw.len(), 3);
    assert_eq!(raw.variable_names(), vec!["Pair", "Qair", "latent"]);

    let ds = ForcingNormalizer::default().normalize(&raw).unwrap();
    assert_eq!(ds.variable_names(), vec!["Pair", "Qair"]);
    assert_eq!(ds.coord("time").unwrap().values().to_vec(), vec![0.0, 1.0, 2.0]);
}

#[test]
fn test_yearly_files_in_one_directory() {
    // Layout written by the request targets: one file per variable and year
    let dir = tempdir().unwrap();
    let pressure = "era5_mean_sea_level_pressure_year";
    touch(dir.path(), &format!("{pressure}_2000.txt"), "Pair pair_time 0 101325,101300");
    touch(dir.path(), &format!("{pressure}_2001.txt"), "Pair pair_time 2 101400,101500");
    touch(dir.path(), "era5_specific_humidity_year_2000.txt", "Qair qair_time 0 0.012,0.010");
    touch(dir.path(), "era5_specific_humidity_year_2001.txt", "Qair qair_time 2 0.008,0.006");

    let raw = open_mfdataset(&TextReader, dir.path(), "*.txt").unwrap();
    assert_eq!(raw.len(), 4);

    let ds = ForcingNormalizer::default().normalize(&raw).unwrap();
    assert_eq!(ds.variable_names(), vec!["Pair", "Qair"]);
    assert_eq!(ds.coord("time").unwrap().values().to_vec(), vec![0.0, 1.0, 2.0, 3.0]);
    assert_eq!(ds.variable("Qair").unwrap().shape(), &[4, 1, 1]);
}
