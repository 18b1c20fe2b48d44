//! Post-build check that no two sensors of an array overlap.

use super::index::IndexedArray;
use super::LayoutError;
use rayon::prelude::*;
use rstar::{PointDistance, RTree, RTreeObject, AABB};
use tracing::debug;

/// Sensor centre stored in the R-tree together with its local index.
#[derive(Debug, Clone, Copy)]
struct SensorPoint {
    index: usize,
    coords: [f64; 3],
}

impl RTreeObject for SensorPoint {
    type Envelope = AABB<[f64; 3]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.coords)
    }
}

impl PointDistance for SensorPoint {
    fn distance_2(&self, point: &[f64; 3]) -> f64 {
        self.coords
            .iter()
            .zip(point.iter())
            .map(|(a, b)| (a - b) * (a - b))
            .sum()
    }
}

/// Fail if two sensor centres of `array` are closer than `min_separation - tolerance`.
///
/// The reported pair is the one with the lowest global indices.
pub fn check_overlaps(array: &IndexedArray, min_separation: f64, tolerance: f64) -> Result<(), LayoutError> {
    let points: Vec<SensorPoint> = array
        .placements
        .iter()
        .map(|p| SensorPoint {
            index: p.local_index,
            coords: [p.position.x, p.position.y, p.position.z],
        })
        .collect();
    let tree: RTree<SensorPoint> = RTree::bulk_load(points.clone());
    let limit = (min_separation - tolerance).max(0.0);
    let limit2 = limit * limit;

    let clash = points
        .par_iter()
        .filter_map(|p| {
            tree.locate_within_distance(p.coords, limit2)
                .filter(|q| q.index > p.index && q.distance_2(&p.coords) < limit2)
                .map(|q| (p.index, q.index, q.distance_2(&p.coords).sqrt()))
                .min_by_key(|(_, second, _)| *second)
        })
        .min_by_key(|(first, second, _)| (*first, *second));

    match clash {
        Some((first, second, distance)) => Err(LayoutError::Overlap {
            array: array.name.clone(),
            first: array.range.start + first,
            second: array.range.start + second,
            distance,
        }),
        None => {
            debug!(
                "No overlaps among {} sensors of array {} (separation {:.3} mm)",
                array.len(),
                array.name,
                min_separation
            );
            Ok(())
        }
    }
}
