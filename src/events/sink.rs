use super::EventSummary;
use crate::layout::SensorIndex;
use polars::prelude::*;

/// Receiver of emitted event summaries.
pub trait SummarySink {
    /// Take ownership of one emitted summary.
    fn accept(&mut self, summary: EventSummary);
}

impl SummarySink for Vec<EventSummary> {
    fn accept(&mut self, summary: EventSummary) {
        self.push(summary);
    }
}

/// Collects summaries and exports them as tables.
#[derive(Debug, Clone)]
pub struct SummaryTable {
    array_names: Vec<String>,
    summaries: Vec<EventSummary>,
}

impl SummaryTable {
    /// Empty table with one hit column per array of `index`.
    pub fn new(index: &SensorIndex) -> Self {
        Self {
            array_names: index.arrays().iter().map(|a| a.name.clone()).collect(),
            summaries: Vec::new(),
        }
    }

    /// Number of collected summaries.
    pub fn len(&self) -> usize {
        self.summaries.len()
    }

    /// Whether no summary was collected.
    pub fn is_empty(&self) -> bool {
        self.summaries.is_empty()
    }

    /// Collected summaries in arrival order.
    pub fn summaries(&self) -> &[EventSummary] {
        &self.summaries
    }

    /// One row per event with per-array hit totals as `hits_<array>` columns.
    pub fn events(&self) -> DataFrame {
        let s = &self.summaries;
        let mut df = df!(
            "eventid" => s.iter().map(|e| e.event_id).collect::<Vec<u64>>(),
            "nhits" => s.iter().map(|e| e.total_hits()).collect::<Vec<u64>>(),
            "etot" => s.iter().map(|e| e.total_energy).collect::<Vec<f64>>(),
            "nsteps" => s.iter().map(|e| e.step_count() as u32).collect::<Vec<u32>>(),
            "type_pri" => s.iter().map(|e| e.primary.as_ref().map(|p| p.particle.to_owned())).collect::<Vec<Option<String>>>(),
            "xp_pri" => s.iter().map(|e| e.primary.as_ref().map(|p| p.position.x)).collect::<Vec<Option<f64>>>(),
            "yp_pri" => s.iter().map(|e| e.primary.as_ref().map(|p| p.position.y)).collect::<Vec<Option<f64>>>(),
            "zp_pri" => s.iter().map(|e| e.primary.as_ref().map(|p| p.position.z)).collect::<Vec<Option<f64>>>(),
            "e_pri" => s.iter().map(|e| e.primary.as_ref().map(|p| p.energy)).collect::<Vec<Option<f64>>>(),
        )
        .unwrap();

        for (i, name) in self.array_names.iter().enumerate() {
            let hits: Vec<u64> = s.iter().map(|e| e.array_hits[i].hits).collect();
            df.with_column(Series::new(format!("hits_{name}").into(), hits))
                .unwrap();
        }
        df
    }

    /// One row per non-optical deposit step of every event.
    pub fn steps(&self) -> DataFrame {
        let rows: Vec<(u64, &super::DepositStep)> = self
            .summaries
            .iter()
            .flat_map(|e| e.deposits.iter().map(move |d| (e.event_id, d)))
            .collect();

        df!(
            "eventid" => rows.iter().map(|r| r.0).collect::<Vec<u64>>(),
            "trackid" => rows.iter().map(|r| r.1.track_id).collect::<Vec<i32>>(),
            "parentid" => rows.iter().map(|r| r.1.parent_id).collect::<Vec<i32>>(),
            "type" => rows.iter().map(|r| r.1.particle.to_owned()).collect::<Vec<String>>(),
            "parenttype" => rows.iter().map(|r| r.1.parent_particle.to_owned()).collect::<Vec<String>>(),
            "creaproc" => rows.iter().map(|r| r.1.creator_process.to_owned()).collect::<Vec<String>>(),
            "edproc" => rows.iter().map(|r| r.1.depositing_process.to_owned()).collect::<Vec<String>>(),
            "xp" => rows.iter().map(|r| r.1.position.x).collect::<Vec<f64>>(),
            "yp" => rows.iter().map(|r| r.1.position.y).collect::<Vec<f64>>(),
            "zp" => rows.iter().map(|r| r.1.position.z).collect::<Vec<f64>>(),
            "ed" => rows.iter().map(|r| r.1.energy).collect::<Vec<f64>>(),
            "ekin" => rows.iter().map(|r| r.1.kinetic_energy).collect::<Vec<f64>>(),
            "time" => rows.iter().map(|r| r.1.time).collect::<Vec<f64>>(),
        )
        .unwrap()
    }
}

impl SummarySink for SummaryTable {
    fn accept(&mut self, summary: EventSummary) {
        self.summaries.push(summary);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{
        DepositStep, EmissionPolicy, HitAggregator, HitRecord, PrimaryParticle,
    };
    use crate::layout::{mount_planar, ArrayDecl, SensorModel, Surface};
    use crate::settings::Settings;
    use nalgebra::{Point2, Point3, Vector3};

    fn two_arrays() -> SensorIndex {
        let decl = |name: &str, surface| ArrayDecl {
            name: name.to_string(),
            surface,
            model: SensorModel {
                name: "test".to_string(),
                footprint_radius: 1.0,
                body_offset: 0.0,
                base_offset: 0.0,
            },
            placements: mount_planar(
                &[Point2::new(0.0, 0.0), Point2::new(5.0, 0.0)],
                surface,
                Vector3::zeros(),
            ),
            required: true,
        };
        SensorIndex::build(
            vec![decl("top", Surface::TopCap), decl("bottom", Surface::BottomCap)],
            &Settings::default(),
        )
        .unwrap()
    }

    fn step(energy: f64) -> DepositStep {
        DepositStep {
            track_id: 2,
            parent_id: 1,
            particle: "e-".to_string(),
            parent_particle: "gamma".to_string(),
            creator_process: "compt".to_string(),
            depositing_process: "eIoni".to_string(),
            position: Point3::new(0.0, 0.0, -100.0),
            energy,
            kinetic_energy: energy,
            time: 2e-9,
        }
    }

    #[test]
    fn tables_follow_emitted_events() {
        let index = two_arrays();
        let mut agg = HitAggregator::new(&index, EmissionPolicy::DepositedEnergy);
        let mut table = SummaryTable::new(&index);
        let hits = |sensors: &[usize]| {
            sensors
                .iter()
                .map(|&sensor| HitRecord { sensor, time: 0.0 })
                .collect::<Vec<HitRecord>>()
        };

        let primary = PrimaryParticle {
            particle: "gamma".to_string(),
            position: Point3::new(0.0, 0.0, 500.0),
            energy: 2614.5,
        };
        for (id, sensors, steps) in [
            (0u64, vec![0, 1, 3], vec![step(10.0), step(5.0)]),
            (1, vec![2], vec![]),
            (2, vec![3, 3], vec![step(1.0)]),
        ] {
            if let Some(summary) = agg.process_event(id, Some(primary.clone()), hits(&sensors), steps) {
                table.accept(summary);
            }
        }

        assert_eq!(table.len(), 2);
        let events = table.events();
        assert_eq!(events.height(), 2);
        assert_eq!(events.width(), 11);
        let top: Vec<Option<u64>> = events.column("hits_top").unwrap().u64().unwrap().into_iter().collect();
        let bottom: Vec<Option<u64>> = events.column("hits_bottom").unwrap().u64().unwrap().into_iter().collect();
        assert_eq!(top, vec![Some(2), Some(0)]);
        assert_eq!(bottom, vec![Some(1), Some(2)]);

        let steps = table.steps();
        assert_eq!(steps.height(), 3);
    }

    #[test]
    fn vec_sink_keeps_order() {
        let index = two_arrays();
        let mut agg = HitAggregator::new(&index, EmissionPolicy::AnyActivity);
        let mut sink: Vec<EventSummary> = Vec::new();
        for id in 0..3u64 {
            let hit = HitRecord {
                sensor: id as usize,
                time: 0.0,
            };
            if let Some(summary) = agg.process_event(id, None, vec![hit], Vec::<DepositStep>::new()) {
                sink.accept(summary);
            }
        }
        let ids: Vec<u64> = sink.iter().map(|s| s.event_id).collect();
        assert_eq!(ids, vec![0, 1, 2]);
    }
}
