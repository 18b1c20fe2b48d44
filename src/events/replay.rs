//! Reading recorded hits and deposit steps back from tables.
//!
//! Hit tables carry `event`, `sensor`, `time`. Step tables carry `event`,
//! `track`, `parent`, `particle`, `x`, `y`, `z`, `energy`, `time` and
//! optionally `parent_particle`, `creator_process`, `depositing_process` and
//! `kinetic_energy`. Primary tables carry `event`, `particle`, `x`, `y`, `z`,
//! `energy`.

use super::{DepositStep, HitAggregator, HitRecord, PrimaryParticle, SummarySink};
use nalgebra::Point3;
use polars::prelude::*;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Everything recorded for one event before aggregation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventRecords {
    /// Event number
    pub event_id: u64,
    /// Primary particle, if any
    pub primary: Option<PrimaryParticle>,
    /// Hits in table order
    pub hits: Vec<HitRecord>,
    /// Steps in table order, optical ones included
    pub steps: Vec<DepositStep>,
}

fn null_in(name: &str) -> PolarsError {
    PolarsError::ComputeError(format!("Column {name} contains missing values").into())
}

fn u64_column(df: &DataFrame, name: &str) -> PolarsResult<Vec<u64>> {
    let column = df.column(name)?.cast(&DataType::UInt64)?;
    let values = column
        .u64()?
        .into_iter()
        .map(|v| v.ok_or_else(|| null_in(name)))
        .collect::<PolarsResult<Vec<u64>>>();
    values
}

fn i32_column(df: &DataFrame, name: &str) -> PolarsResult<Vec<i32>> {
    let column = df.column(name)?.cast(&DataType::Int32)?;
    let values = column
        .i32()?
        .into_iter()
        .map(|v| v.ok_or_else(|| null_in(name)))
        .collect::<PolarsResult<Vec<i32>>>();
    values
}

fn f64_column(df: &DataFrame, name: &str) -> PolarsResult<Vec<f64>> {
    let column = df.column(name)?.cast(&DataType::Float64)?;
    let values = column
        .f64()?
        .into_iter()
        .map(|v| v.ok_or_else(|| null_in(name)))
        .collect::<PolarsResult<Vec<f64>>>();
    values
}

fn str_column(df: &DataFrame, name: &str) -> PolarsResult<Vec<String>> {
    let column = df.column(name)?.cast(&DataType::String)?;
    let values = column
        .str()?
        .into_iter()
        .map(|v| v.map(|s| s.to_string()).ok_or_else(|| null_in(name)))
        .collect::<PolarsResult<Vec<String>>>();
    values
}

fn has_column(df: &DataFrame, name: &str) -> bool {
    df.get_column_index(name).is_some()
}

fn optional_str_column(df: &DataFrame, name: &str) -> PolarsResult<Vec<String>> {
    if has_column(df, name) {
        str_column(df, name)
    } else {
        Ok(vec![String::new(); df.height()])
    }
}

/// Parse a hit table into `(event, hit)` pairs.
///
/// Sensor indices must be below `total_sensors`.
pub fn hits_from_df(df: &DataFrame, total_sensors: usize) -> PolarsResult<Vec<(u64, HitRecord)>> {
    let events = u64_column(df, "event")?;
    let sensors = u64_column(df, "sensor")?;
    let times = f64_column(df, "time")?;

    events
        .into_iter()
        .zip(sensors)
        .zip(times)
        .map(|((event, sensor), time)| {
            let sensor = sensor as usize;
            if sensor >= total_sensors {
                return Err(PolarsError::OutOfBounds(
                    format!("Sensor {sensor} in event {event} is outside [0, {total_sensors})").into(),
                ));
            }
            Ok((event, HitRecord { sensor, time }))
        })
        .collect()
}

/// Parse a step table into `(event, step)` pairs.
pub fn steps_from_df(df: &DataFrame) -> PolarsResult<Vec<(u64, DepositStep)>> {
    let events = u64_column(df, "event")?;
    let tracks = i32_column(df, "track")?;
    let parents = i32_column(df, "parent")?;
    let particles = str_column(df, "particle")?;
    let x = f64_column(df, "x")?;
    let y = f64_column(df, "y")?;
    let z = f64_column(df, "z")?;
    let energy = f64_column(df, "energy")?;
    let time = f64_column(df, "time")?;
    let parent_particles = optional_str_column(df, "parent_particle")?;
    let creators = optional_str_column(df, "creator_process")?;
    let depositors = optional_str_column(df, "depositing_process")?;
    let kinetic = if has_column(df, "kinetic_energy") {
        f64_column(df, "kinetic_energy")?
    } else {
        vec![0.0; df.height()]
    };

    let steps = (0..df.height())
        .map(|i| {
            (
                events[i],
                DepositStep {
                    track_id: tracks[i],
                    parent_id: parents[i],
                    particle: particles[i].to_owned(),
                    parent_particle: parent_particles[i].to_owned(),
                    creator_process: creators[i].to_owned(),
                    depositing_process: depositors[i].to_owned(),
                    position: Point3::new(x[i], y[i], z[i]),
                    energy: energy[i],
                    kinetic_energy: kinetic[i],
                    time: time[i],
                },
            )
        })
        .collect();
    Ok(steps)
}

/// Parse a primary table into `(event, primary)` pairs.
pub fn primaries_from_df(df: &DataFrame) -> PolarsResult<Vec<(u64, PrimaryParticle)>> {
    let events = u64_column(df, "event")?;
    let particles = str_column(df, "particle")?;
    let x = f64_column(df, "x")?;
    let y = f64_column(df, "y")?;
    let z = f64_column(df, "z")?;
    let energy = f64_column(df, "energy")?;

    Ok((0..df.height())
        .map(|i| {
            (
                events[i],
                PrimaryParticle {
                    particle: particles[i].to_owned(),
                    position: Point3::new(x[i], y[i], z[i]),
                    energy: energy[i],
                },
            )
        })
        .collect())
}

fn entry(events: &mut BTreeMap<u64, EventRecords>, event_id: u64) -> &mut EventRecords {
    events.entry(event_id).or_insert_with(|| EventRecords {
        event_id,
        ..Default::default()
    })
}

/// Group hits, steps and primaries by event, in ascending event order.
///
/// Rows keep their table order within an event.
pub fn group_by_event(
    hits: Vec<(u64, HitRecord)>,
    steps: Vec<(u64, DepositStep)>,
    primaries: Vec<(u64, PrimaryParticle)>,
) -> Vec<EventRecords> {
    let mut events: BTreeMap<u64, EventRecords> = BTreeMap::new();

    for (event_id, hit) in hits {
        entry(&mut events, event_id).hits.push(hit);
    }
    for (event_id, step) in steps {
        entry(&mut events, event_id).steps.push(step);
    }
    for (event_id, primary) in primaries {
        let record = entry(&mut events, event_id);
        if record.primary.is_some() {
            warn!("Event {event_id} has more than one primary, keeping the last one");
        }
        record.primary = Some(primary);
    }

    events.into_values().collect()
}

/// Feed recorded events through `aggregator` into `sink`.
///
/// Returns the number of emitted summaries.
pub fn replay<S: SummarySink>(
    aggregator: &mut HitAggregator,
    events: Vec<EventRecords>,
    sink: &mut S,
) -> usize {
    let total = events.len();
    let mut emitted = 0;
    for event in events {
        if let Some(summary) =
            aggregator.process_event(event.event_id, event.primary, event.hits, event.steps)
        {
            sink.accept(summary);
            emitted += 1;
        }
    }
    debug!(
        "Emitted {emitted} of {total} events under the {} policy",
        aggregator.policy()
    );
    emitted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{EmissionPolicy, SummaryTable};
    use crate::layout::{mount_planar, ArrayDecl, SensorIndex, SensorModel, Surface};
    use crate::settings::Settings;
    use nalgebra::{Point2, Vector3};

    fn index() -> SensorIndex {
        let points: Vec<Point2<f64>> = (0..4).map(|k| Point2::new(k as f64 * 10.0, 0.0)).collect();
        let decl = ArrayDecl {
            name: "top".to_string(),
            surface: Surface::TopCap,
            model: SensorModel {
                name: "test".to_string(),
                footprint_radius: 1.0,
                body_offset: 0.0,
                base_offset: 0.0,
            },
            placements: mount_planar(&points, Surface::TopCap, Vector3::zeros()),
            required: true,
        };
        SensorIndex::build(vec![decl], &Settings::default()).unwrap()
    }

    fn hit_table() -> DataFrame {
        df!(
            "event" => [3i64, 1, 3, 3],
            "sensor" => [0i64, 2, 3, 3],
            "time" => [1e-9, 2e-9, 3e-9, 4e-9],
        )
        .unwrap()
    }

    fn step_table() -> DataFrame {
        df!(
            "event" => [1i64, 2, 3],
            "track" => [1i64, 1, 2],
            "parent" => [0i64, 0, 1],
            "particle" => ["gamma", "opticalphoton", "e-"],
            "x" => [0.0, 1.0, 2.0],
            "y" => [0.0, 1.0, 2.0],
            "z" => [0.0, 1.0, 2.0],
            "energy" => [0.0, 0.002, 30.0],
            "time" => [0.0, 1e-9, 2e-9],
            "creator_process" => ["primary", "Scintillation", "compt"],
        )
        .unwrap()
    }

    #[test]
    fn tables_are_grouped_by_event() {
        let index = index();
        let hits = hits_from_df(&hit_table(), index.total()).unwrap();
        let steps = steps_from_df(&step_table()).unwrap();
        let events = group_by_event(hits, steps, vec![]);

        let ids: Vec<u64> = events.iter().map(|e| e.event_id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(events[2].hits.len(), 3);
        assert_eq!(events[2].hits[0].sensor, 0);
        assert_eq!(events[2].steps[0].creator_process, "compt");
        assert_eq!(events[2].steps[0].depositing_process, "");
        assert_eq!(events[1].hits.len(), 0);
    }

    #[test]
    fn out_of_range_sensor_is_an_error() {
        let df = df!("event" => [0i64], "sensor" => [4i64], "time" => [0.0]).unwrap();
        assert!(hits_from_df(&df, 4).is_err());
        assert!(hits_from_df(&df, 5).is_ok());
    }

    #[test]
    fn missing_required_column_is_an_error() {
        let df = df!("event" => [0i64], "time" => [0.0]).unwrap();
        assert!(hits_from_df(&df, 4).is_err());
    }

    #[test]
    fn replay_applies_the_policy() {
        let index = index();
        let primaries = df!(
            "event" => [3i64],
            "particle" => ["gamma"],
            "x" => [0.0],
            "y" => [0.0],
            "z" => [500.0],
            "energy" => [2614.5],
        )
        .unwrap();
        let events = group_by_event(
            hits_from_df(&hit_table(), index.total()).unwrap(),
            steps_from_df(&step_table()).unwrap(),
            primaries_from_df(&primaries).unwrap(),
        );

        let mut agg = HitAggregator::new(&index, EmissionPolicy::DepositedEnergy);
        let mut table = SummaryTable::new(&index);
        // Event 1 deposits nothing and event 2 only has an optical step
        assert_eq!(replay(&mut agg, events.clone(), &mut table), 1);
        let summary = &table.summaries()[0];
        assert_eq!(summary.event_id, 3);
        assert_eq!(summary.sensor_hits, vec![1, 0, 0, 2]);
        assert_eq!(summary.primary.as_ref().map(|p| p.energy), Some(2614.5));

        let mut any = HitAggregator::new(&index, EmissionPolicy::AnyActivity);
        let mut all: Vec<crate::events::EventSummary> = Vec::new();
        assert_eq!(replay(&mut any, events, &mut all), 2);
        let ids: Vec<u64> = all.iter().map(|s| s.event_id).collect();
        assert_eq!(ids, vec![1, 3]);
    }
}
