//! Flat, zero-based sensor index over all arrays.
//!
//! Arrays own contiguous ranges of the index in declaration order, so the
//! ranges never overlap and together cover `[0, total)`. Per-array sums over
//! a per-sensor vector are then plain range sums.

use super::placement::{Placement, SensorModel, SensorPart, Surface};
use super::LayoutError;
use crate::settings::Settings;
use nalgebra::{Point3, Rotation3};
use polars::prelude::*;
use std::collections::HashSet;
use std::ops::Range;
use tracing::{debug, warn};

/// Position of an array in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArrayId(pub usize);

/// A named group of placements, as handed to [`SensorIndex::build`].
#[derive(Debug, Clone)]
pub struct ArrayDecl {
    /// Unique array name
    pub name: String,
    /// Mounting surface
    pub surface: Surface,
    /// Sensor model of every placement
    pub model: SensorModel,
    /// Placements in local-index order
    pub placements: Vec<Placement>,
    /// Whether the configuration needs at least one sensor in this array
    pub required: bool,
}

/// An array together with its slice of the global index.
#[derive(Debug, Clone)]
pub struct IndexedArray {
    /// Declaration position
    pub id: ArrayId,
    /// Unique array name
    pub name: String,
    /// Mounting surface
    pub surface: Surface,
    /// Sensor model of every placement
    pub model: SensorModel,
    /// Placements in local-index order
    pub placements: Vec<Placement>,
    /// Global indices owned by the array
    pub range: Range<usize>,
}

impl IndexedArray {
    /// Number of sensors.
    pub fn len(&self) -> usize {
        self.placements.len()
    }

    /// Whether the array has no sensors.
    pub fn is_empty(&self) -> bool {
        self.placements.is_empty()
    }
}

/// Everything the index knows about one global sensor number.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedSensor {
    /// Global sensor number
    pub global: usize,
    /// Owning array
    pub array: ArrayId,
    /// Position within the owning array
    pub local: usize,
    /// Window centre in mm
    pub position: Point3<f64>,
    /// Sensor frame to detector frame
    pub orientation: Rotation3<f64>,
}

/// Contiguous global numbering of the sensors of all arrays.
#[derive(Debug, Clone)]
pub struct SensorIndex {
    arrays: Vec<IndexedArray>,
    total: usize,
}

impl SensorIndex {
    /// Assign every declared array its range of global indices.
    pub fn build(decls: Vec<ArrayDecl>, settings: &Settings) -> Result<Self, LayoutError> {
        let mut seen = HashSet::new();
        let mut arrays = Vec::with_capacity(decls.len());
        let mut start = 0;

        for (i, decl) in decls.into_iter().enumerate() {
            if !seen.insert(decl.name.clone()) {
                return Err(LayoutError::DuplicateArray(decl.name));
            }
            let n = decl.placements.len();
            if n == 0 {
                if decl.required {
                    return Err(LayoutError::EmptyArray(decl.name));
                }
                warn!("Array {} has no sensors", decl.name);
            }
            let end = start + n;
            if end > settings.max_sensors {
                return Err(LayoutError::TooManySensors {
                    total: end,
                    ceiling: settings.max_sensors,
                });
            }
            debug!("Array {} holds sensors [{start}, {end})", decl.name);
            arrays.push(IndexedArray {
                id: ArrayId(i),
                name: decl.name,
                surface: decl.surface,
                model: decl.model,
                placements: decl.placements,
                range: start..end,
            });
            start = end;
        }

        Ok(Self {
            arrays,
            total: start,
        })
    }

    /// Number of sensors across all arrays.
    pub fn total(&self) -> usize {
        self.total
    }

    /// Number of arrays.
    pub fn len(&self) -> usize {
        self.arrays.len()
    }

    /// Whether no array was declared.
    pub fn is_empty(&self) -> bool {
        self.arrays.is_empty()
    }

    /// Global indices owned by an array.
    pub fn range_of(&self, id: ArrayId) -> Range<usize> {
        self.array(id).range.clone()
    }

    /// Ranges of all arrays in declaration order.
    pub fn boundaries(&self) -> Vec<Range<usize>> {
        self.arrays.iter().map(|a| a.range.clone()).collect()
    }

    /// Id of the array called `name`.
    pub fn id_of(&self, name: &str) -> Option<ArrayId> {
        self.arrays.iter().find(|a| a.name == name).map(|a| a.id)
    }

    /// Array by id.
    pub fn array(&self, id: ArrayId) -> &IndexedArray {
        &self.arrays[id.0]
    }

    /// All arrays in declaration order.
    pub fn arrays(&self) -> &[IndexedArray] {
        &self.arrays
    }

    /// Array, local index, and placement of a global sensor number.
    ///
    /// Panics for indices outside `[0, total)`, which can only come from a
    /// caller that did not take its sensor numbers from this index.
    pub fn resolve(&self, global: usize) -> ResolvedSensor {
        match self.try_resolve(global) {
            Some(sensor) => sensor,
            None => panic!(
                "Sensor index {global} is outside [0, {}) of the sensor index",
                self.total
            ),
        }
    }

    /// Like [`SensorIndex::resolve`], `None` outside `[0, total)`.
    pub fn try_resolve(&self, global: usize) -> Option<ResolvedSensor> {
        if global >= self.total {
            return None;
        }
        // Empty arrays have end == start and are skipped
        let pos = self.arrays.partition_point(|a| a.range.end <= global);
        let array = &self.arrays[pos];
        let local = global - array.range.start;
        let placement = &array.placements[local];
        Some(ResolvedSensor {
            global,
            array: array.id,
            local,
            position: placement.position,
            orientation: placement.orientation,
        })
    }

    /// Global number of the `local`-th sensor of an array.
    pub fn global_of(&self, id: ArrayId, local: usize) -> Option<usize> {
        let range = self.range_of(id);
        (local < range.len()).then_some(range.start + local)
    }

    /// Centre of one part of a global sensor.
    pub fn part_position(&self, global: usize, part: SensorPart) -> Point3<f64> {
        let sensor = self.resolve(global);
        let array = self.array(sensor.array);
        array.placements[sensor.local].part_position(part, &array.model)
    }

    /// All sensors in global order.
    pub fn iter(&self) -> impl Iterator<Item = ResolvedSensor> + '_ {
        self.arrays.iter().flat_map(|array| {
            array
                .placements
                .iter()
                .enumerate()
                .map(move |(local, placement)| ResolvedSensor {
                    global: array.range.start + local,
                    array: array.id,
                    local,
                    position: placement.position,
                    orientation: placement.orientation,
                })
        })
    }
}

/// One row per sensor, with positions in mm and orientations in degrees.
pub fn sensors_to_df(index: &SensorIndex) -> DataFrame {
    let sensors: Vec<ResolvedSensor> = index.iter().collect();
    let normals: Vec<_> = sensors
        .iter()
        .map(|s| s.orientation * nalgebra::Vector3::z())
        .collect();
    let euler: Vec<(f64, f64, f64)> = sensors
        .iter()
        .map(|s| {
            let (roll, pitch, yaw) = s.orientation.euler_angles();
            (roll.to_degrees(), pitch.to_degrees(), yaw.to_degrees())
        })
        .collect();

    df!(
        "global" => sensors.iter().map(|s| s.global as u32).collect::<Vec<u32>>(),
        "array" => sensors.iter().map(|s| index.array(s.array).name.to_owned()).collect::<Vec<String>>(),
        "surface" => sensors.iter().map(|s| index.array(s.array).surface.to_string()).collect::<Vec<String>>(),
        "model" => sensors.iter().map(|s| index.array(s.array).model.name.to_owned()).collect::<Vec<String>>(),
        "local" => sensors.iter().map(|s| s.local as u32).collect::<Vec<u32>>(),
        "x" => sensors.iter().map(|s| s.position.x).collect::<Vec<f64>>(),
        "y" => sensors.iter().map(|s| s.position.y).collect::<Vec<f64>>(),
        "z" => sensors.iter().map(|s| s.position.z).collect::<Vec<f64>>(),
        "nx" => normals.iter().map(|n| n.x).collect::<Vec<f64>>(),
        "ny" => normals.iter().map(|n| n.y).collect::<Vec<f64>>(),
        "nz" => normals.iter().map(|n| n.z).collect::<Vec<f64>>(),
        "roll" => euler.iter().map(|e| e.0).collect::<Vec<f64>>(),
        "pitch" => euler.iter().map(|e| e.1).collect::<Vec<f64>>(),
        "yaw" => euler.iter().map(|e| e.2).collect::<Vec<f64>>(),
    )
    .unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::placement::mount_planar;
    use nalgebra::{Point2, Vector3};

    fn model() -> SensorModel {
        SensorModel {
            name: "test".to_string(),
            footprint_radius: 1.0,
            body_offset: 2.0,
            base_offset: 3.0,
        }
    }

    fn decl(name: &str, n: usize, required: bool) -> ArrayDecl {
        let points: Vec<Point2<f64>> = (0..n).map(|i| Point2::new(i as f64 * 3.0, 0.0)).collect();
        ArrayDecl {
            name: name.to_string(),
            surface: Surface::BottomCap,
            model: model(),
            placements: mount_planar(&points, Surface::BottomCap, Vector3::zeros()),
            required,
        }
    }

    #[test]
    fn two_equal_arrays_split_the_index() {
        let index = SensorIndex::build(
            vec![decl("top", 121, true), decl("bottom", 121, true)],
            &Settings::default(),
        )
        .unwrap();
        assert_eq!(index.range_of(ArrayId(0)), 0..121);
        assert_eq!(index.range_of(ArrayId(1)), 121..242);
        assert_eq!(index.total(), 242);
    }

    #[test]
    fn ranges_partition_the_index() {
        let counts = [7, 0, 3, 12, 1];
        let decls = counts
            .iter()
            .enumerate()
            .map(|(i, &n)| decl(&format!("a{i}"), n, false))
            .collect();
        let index = SensorIndex::build(decls, &Settings::default()).unwrap();

        let mut expected_start = 0;
        for (i, &n) in counts.iter().enumerate() {
            let range = index.range_of(ArrayId(i));
            assert_eq!(range, expected_start..expected_start + n);
            expected_start += n;
        }
        assert_eq!(index.total(), counts.iter().sum::<usize>());

        let mut covered = vec![0; index.total()];
        for range in index.boundaries() {
            for g in range {
                covered[g] += 1;
            }
        }
        assert!(covered.iter().all(|&c| c == 1), "Ranges overlap or leave gaps");
    }

    #[test]
    fn resolve_inverts_build() {
        let decls = vec![decl("a", 4, true), decl("empty", 0, false), decl("b", 5, true)];
        let index = SensorIndex::build(decls, &Settings::default()).unwrap();
        for g in 0..index.total() {
            let sensor = index.resolve(g);
            let range = index.range_of(sensor.array);
            assert!(sensor.local < range.len());
            assert_eq!(range.start + sensor.local, g);
            assert_eq!(index.global_of(sensor.array, sensor.local), Some(g));
        }
        assert_eq!(index.resolve(4).array, ArrayId(2));
        assert_eq!(index.resolve(4).local, 0);
        assert!(index.try_resolve(9).is_none());
        assert_eq!(index.global_of(ArrayId(1), 0), None);

        let iterated: Vec<usize> = index.iter().map(|s| s.global).collect();
        assert_eq!(iterated, (0..9).collect::<Vec<usize>>());
    }

    #[test]
    #[should_panic(expected = "Sensor index 9 is outside [0, 9)")]
    fn resolve_out_of_range_panics() {
        let index = SensorIndex::build(vec![decl("a", 4, true), decl("b", 5, true)], &Settings::default())
            .unwrap();
        index.resolve(9);
    }

    #[test]
    fn build_failures() {
        assert_eq!(
            SensorIndex::build(vec![decl("a", 0, true)], &Settings::default()).unwrap_err(),
            LayoutError::EmptyArray("a".to_string())
        );
        assert_eq!(
            SensorIndex::build(vec![decl("a", 1, true), decl("a", 1, true)], &Settings::default())
                .unwrap_err(),
            LayoutError::DuplicateArray("a".to_string())
        );
        let settings = Settings {
            max_sensors: 10,
            ..Settings::default()
        };
        assert_eq!(
            SensorIndex::build(vec![decl("a", 6, true), decl("b", 6, true)], &settings)
                .unwrap_err(),
            LayoutError::TooManySensors {
                total: 12,
                ceiling: 10
            }
        );
    }

    #[test]
    fn lookups_by_name_and_part() {
        let index =
            SensorIndex::build(vec![decl("a", 2, true), decl("b", 2, true)], &Settings::default())
                .unwrap();
        assert_eq!(index.id_of("b"), Some(ArrayId(1)));
        assert_eq!(index.id_of("c"), None);
        // Bottom caps face +z, so the base is below the window
        let base = index.part_position(3, SensorPart::Base);
        assert!((base - Point3::new(3.0, 0.0, -3.0)).norm() < 1e-12);
    }

    #[test]
    fn sensor_table_has_one_row_per_sensor() {
        let index =
            SensorIndex::build(vec![decl("a", 2, true), decl("b", 3, true)], &Settings::default())
                .unwrap();
        let df = sensors_to_df(&index);
        assert_eq!(df.height(), 5);
        assert_eq!(df.width(), 14);
    }
}
