#![warn(missing_docs)]
#![doc = include_str!("../README.md")]

//! # Detector layout library
//!
//! This library places photosensors on the surfaces of a cylindrical
//! noble-liquid detector, gives every sensor a single global index, and folds
//! the per-event hits and energy deposits of a simulation run into per-array
//! summaries.
//!
//! Sensor tables, parameter tables and event summaries are returned as Polars
//! DataFrames, which can be written to various output formats with
//! [`write_df_to_file`].

pub mod detector;
pub mod events;
pub mod layout;
pub mod params;
pub mod settings;
mod utils;

// Re-export key public types
pub use events::{EmissionPolicy, EventSummary, HitAggregator, SummarySink, SummaryTable};
pub use layout::{ArrayId, LayoutError, SensorIndex, Surface};
pub use params::{params_to_df, ParameterError, ParameterStore};
pub use settings::Settings;
pub use utils::{read_csv, run_with_threads, write_df_to_file, DataFrameFileType};

use polars::prelude::*;
use tracing::debug;

/// Build the sensor index of a detector and return it as a table.
///
/// # Arguments
///
/// * `params` - Geometry parameters, typically from [`detector::default_parameters`]
/// * `settings` - Sensor ceiling and overlap-check options
///
/// # Returns
///
/// A Polars DataFrame with one row per sensor in global index order and columns:
/// - global, array, surface, model, local
/// - x, y, z (window centre, mm)
/// - nx, ny, nz (face normal)
/// - roll, pitch, yaw (degrees)
///
/// # Example
///
/// ```no_run
/// use detector_layout::{detector, get_sensor_table, Settings};
///
/// let params = detector::default_parameters().unwrap();
/// let sensors = get_sensor_table(&params, &Settings::default()).unwrap();
/// println!("Placed {} sensors", sensors.height());
/// ```
pub fn get_sensor_table(params: &ParameterStore, settings: &Settings) -> Result<DataFrame, LayoutError> {
    let index = detector::build_index(params, settings)?;
    let df = layout::sensors_to_df(&index);
    debug!("Sensor table\n{df}");
    Ok(df)
}

/// Aggregate recorded hits and deposit steps into per-event summaries.
///
/// # Arguments
///
/// * `index` - Sensor index the hit table refers to
/// * `policy` - Which finished events produce a summary
/// * `hits` - Table with `event`, `sensor`, `time` columns
/// * `steps` - Table with `event`, `track`, `parent`, `particle`, `x`, `y`, `z`, `energy`, `time` columns
/// * `primaries` - Optional table with `event`, `particle`, `x`, `y`, `z`, `energy` columns
///
/// # Returns
///
/// A [`SummaryTable`] holding every emitted event, in ascending event order.
pub fn get_event_summaries(
    index: &SensorIndex,
    policy: EmissionPolicy,
    hits: &DataFrame,
    steps: &DataFrame,
    primaries: Option<&DataFrame>,
) -> PolarsResult<SummaryTable> {
    let hits = events::hits_from_df(hits, index.total())?;
    let steps = events::steps_from_df(steps)?;
    let primaries = match primaries {
        Some(df) => events::primaries_from_df(df)?,
        None => Vec::new(),
    };
    let records = events::group_by_event(hits, steps, primaries);

    let mut aggregator = HitAggregator::new(index, policy);
    let mut table = SummaryTable::new(index);
    events::replay(&mut aggregator, records, &mut table);
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_sensor_table() {
        let params = detector::default_parameters().unwrap();
        let df = get_sensor_table(&params, &Settings::default()).unwrap();
        assert_eq!(df.shape(), (1123, 14));

        let globals: Vec<Option<u32>> = df.column("global").unwrap().u32().unwrap().into_iter().collect();
        assert!(globals.iter().enumerate().all(|(i, g)| *g == Some(i as u32)));
    }

    #[test]
    fn summaries_from_tables() {
        let params = detector::default_parameters().unwrap();
        let index = detector::build_index(&params, &Settings::default()).unwrap();
        let water_bottom = index.id_of(detector::WATER_BOTTOM).unwrap();
        let first_veto = index.range_of(water_bottom).start as i64;

        let hits = df!(
            "event" => [0i64, 0, 0, 1],
            "sensor" => [0i64, 600, first_veto, 10],
            "time" => [1e-9, 2e-9, 3e-9, 1e-9],
        )
        .unwrap();
        let steps = df!(
            "event" => [0i64, 1],
            "track" => [1i64, 1],
            "parent" => [0i64, 0],
            "particle" => ["e-", "e-"],
            "x" => [0.0, 0.0],
            "y" => [0.0, 0.0],
            "z" => [0.0, 0.0],
            "energy" => [12.0, 0.0],
            "time" => [0.0, 0.0],
        )
        .unwrap();

        let table = get_event_summaries(&index, EmissionPolicy::default(), &hits, &steps, None).unwrap();
        assert_eq!(table.len(), 1);
        let summary = &table.summaries()[0];
        assert_eq!(summary.hits_in(index.id_of(detector::TOP).unwrap()), 1);
        assert_eq!(summary.hits_in(index.id_of(detector::BOTTOM).unwrap()), 1);
        assert_eq!(summary.hits_in(water_bottom), 1);

        let events = table.events();
        // 9 fixed columns and one per array
        assert_eq!(events.width(), 9 + index.arrays().len());
    }
}
