//! Explicit row/column layouts for veto arrays.

use super::{require_positive, LayoutError};
use nalgebra::{Point2, Point3, Rotation3, Vector3};
use std::f64::consts::PI;

/// Rows of sensors on a flat end cap, centred on both axes.
#[derive(Debug, Clone, PartialEq)]
pub struct CapGrid {
    row_counts: Vec<usize>,
    /// Cumulative sensor count through each row
    cumulative: Vec<usize>,
    row_spacing: f64,
    column_spacing: f64,
}

impl CapGrid {
    /// Cap with `row_counts[i]` sensors in row `i`, rows listed from +y to -y.
    pub fn new(row_counts: Vec<usize>, row_spacing: f64, column_spacing: f64) -> Result<Self, LayoutError> {
        require_positive("Cap row spacing", row_spacing)?;
        require_positive("Cap column spacing", column_spacing)?;
        let cumulative = row_counts
            .iter()
            .scan(0, |acc, &c| {
                *acc += c;
                Some(*acc)
            })
            .collect();
        Ok(Self {
            row_counts,
            cumulative,
            row_spacing,
            column_spacing,
        })
    }

    /// Sensors per row.
    pub fn row_counts(&self) -> &[usize] {
        &self.row_counts
    }

    /// Sensors on the cap.
    pub fn count(&self) -> usize {
        self.cumulative.last().copied().unwrap_or(0)
    }

    /// Row and position within the row of the `idx`-th sensor.
    pub fn locate(&self, idx: usize) -> (usize, usize) {
        if idx >= self.count() {
            panic!(
                "Sensor {idx} is outside a cap grid of {} sensors",
                self.count()
            );
        }
        // First row whose cumulative count exceeds idx
        let row = self.cumulative.partition_point(|&c| c <= idx);
        let before = if row == 0 { 0 } else { self.cumulative[row - 1] };
        (row, idx - before)
    }

    /// Cap-local position of the `idx`-th sensor.
    pub fn place(&self, idx: usize) -> Point2<f64> {
        let (row, k) = self.locate(idx);
        let rows = self.row_counts.len() as f64;
        let in_row = self.row_counts[row] as f64;
        Point2::new(
            (-(in_row - 1.0) / 2.0 + k as f64) * self.column_spacing,
            ((rows - 1.0) / 2.0 - row as f64) * self.row_spacing,
        )
    }

    /// All sensor positions in local-index order.
    pub fn place_all(&self) -> Vec<Point2<f64>> {
        (0..self.count()).map(|idx| self.place(idx)).collect()
    }
}

/// Sensors on a cylindrical wall, `rows` rings of `columns` each.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SideGrid {
    rows: usize,
    columns: usize,
    count: usize,
    row_spacing: f64,
    radius: f64,
}

impl SideGrid {
    /// Wall of `rows` rings with `columns` sensors each.
    ///
    /// Fails for a non-positive spacing or radius, or when the sensor count
    /// does not fit in `usize`.
    pub fn new(rows: usize, columns: usize, row_spacing: f64, radius: f64) -> Result<Self, LayoutError> {
        require_positive("Side wall row spacing", row_spacing)?;
        require_positive("Side wall radius", radius)?;
        let count = rows.checked_mul(columns).ok_or_else(|| {
            LayoutError::NonPhysical(format!(
                "Side wall of {rows} rows and {columns} columns has too many sensors"
            ))
        })?;
        Ok(Self {
            rows,
            columns,
            count,
            row_spacing,
            radius,
        })
    }

    /// Number of rows.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Sensors per row.
    pub fn columns(&self) -> usize {
        self.columns
    }

    /// Radius of the window centres.
    pub fn radius(&self) -> f64 {
        self.radius
    }

    /// Sensors on the wall.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Row and column of the `idx`-th sensor.
    pub fn locate(&self, idx: usize) -> (usize, usize) {
        if idx >= self.count() {
            panic!(
                "Sensor {idx} is outside a {}x{} side wall",
                self.rows, self.columns
            );
        }
        (idx / self.columns, idx % self.columns)
    }

    /// Azimuth of the sensor's column in radians.
    pub fn azimuth(&self, idx: usize) -> f64 {
        let (_, column) = self.locate(idx);
        column as f64 * 2.0 * PI / self.columns as f64
    }

    /// Position of the `idx`-th sensor, rows from +z down.
    pub fn place(&self, idx: usize) -> Point3<f64> {
        let (row, _) = self.locate(idx);
        let z = ((self.rows as f64 - 1.0) / 2.0 - row as f64) * self.row_spacing;
        let rotation = Rotation3::from_axis_angle(&Vector3::z_axis(), self.azimuth(idx));
        Point3::from(rotation * Vector3::new(self.radius, 0.0, z))
    }

    /// Positions with their azimuths in local-index order.
    pub fn place_all(&self) -> Vec<(Point3<f64>, f64)> {
        (0..self.count())
            .map(|idx| (self.place(idx), self.azimuth(idx)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cap_rows_are_centred() {
        // 1-3-5-3-1 cap with 80 cm spacing
        let grid = CapGrid::new(vec![1, 3, 5, 3, 1], 800.0, 800.0).unwrap();
        assert_eq!(grid.count(), 13);

        assert_eq!(grid.place(0), Point2::new(0.0, 1600.0));
        assert_eq!(grid.place(1), Point2::new(-800.0, 800.0));
        assert_eq!(grid.place(3), Point2::new(800.0, 800.0));
        assert_eq!(grid.place(6), Point2::new(0.0, 0.0));
        assert_eq!(grid.place(12), Point2::new(0.0, -1600.0));

        let centroid = grid
            .place_all()
            .iter()
            .fold(Vector3::zeros(), |acc, p| acc + Vector3::new(p.x, p.y, 0.0));
        assert!(centroid.norm() < 1e-9, "Cap layout is not symmetric");
    }

    #[test]
    fn cap_index_resolves_through_prefix_sum() {
        let grid = CapGrid::new(vec![3, 3, 3], 1600.0, 1600.0).unwrap();
        assert_eq!(grid.locate(0), (0, 0));
        assert_eq!(grid.locate(2), (0, 2));
        assert_eq!(grid.locate(3), (1, 0));
        assert_eq!(grid.locate(8), (2, 2));

        let uneven = CapGrid::new(vec![1, 3, 5, 3, 1], 1.0, 1.0).unwrap();
        assert_eq!(uneven.locate(0), (0, 0));
        assert_eq!(uneven.locate(1), (1, 0));
        assert_eq!(uneven.locate(4), (2, 0));
        assert_eq!(uneven.locate(8), (2, 4));
        assert_eq!(uneven.locate(9), (3, 0));
        assert_eq!(uneven.locate(12), (4, 0));
    }

    #[test]
    fn empty_rows_are_skipped() {
        let grid = CapGrid::new(vec![2, 0, 2], 1.0, 1.0).unwrap();
        assert_eq!(grid.locate(2), (2, 0));
        let empty = CapGrid::new(vec![], 1.0, 1.0).unwrap();
        assert_eq!(empty.count(), 0);
        assert!(empty.place_all().is_empty());
    }

    #[test]
    #[should_panic(expected = "Sensor 9 is outside a cap grid of 9 sensors")]
    fn cap_index_out_of_range_panics() {
        let grid = CapGrid::new(vec![3, 3, 3], 1600.0, 1600.0).unwrap();
        grid.place(9);
    }

    #[test]
    fn side_wall_rows_and_columns() {
        // 4 x 12 wall at R = 470 cm with 250 cm between rows
        let wall = SideGrid::new(4, 12, 2500.0, 4700.0).unwrap();
        assert_eq!(wall.count(), 48);
        assert_eq!(wall.locate(0), (0, 0));
        assert_eq!(wall.locate(13), (1, 1));
        assert_eq!(wall.locate(47), (3, 11));

        let first = wall.place(0);
        assert!((first - Point3::new(4700.0, 0.0, 3750.0)).norm() < 1e-9);

        // Quarter turn after three of twelve columns
        let quarter = wall.place(3);
        assert!((quarter - Point3::new(0.0, 4700.0, 3750.0)).norm() < 1e-9);
        assert!((wall.azimuth(3) - PI / 2.0).abs() < 1e-12);

        let bottom = wall.place(47);
        assert!((bottom.z + 3750.0).abs() < 1e-9);
        for (p, _) in wall.place_all() {
            assert!(((p.x * p.x + p.y * p.y).sqrt() - 4700.0).abs() < 1e-9);
        }
    }

    #[test]
    fn degenerate_walls_are_empty() {
        assert_eq!(SideGrid::new(0, 12, 1.0, 1.0).unwrap().count(), 0);
        assert_eq!(SideGrid::new(4, 0, 1.0, 1.0).unwrap().count(), 0);
        assert!(SideGrid::new(4, 12, 1.0, 0.0).is_err());
        assert!(CapGrid::new(vec![3], -1.0, 1.0).is_err());
    }

    #[test]
    fn oversized_wall_is_rejected() {
        match SideGrid::new(usize::MAX, 2, 1.0, 1.0) {
            Err(LayoutError::NonPhysical(msg)) => assert!(msg.contains("too many sensors"), "{msg}"),
            other => panic!("Expected NonPhysical, got {other:?}"),
        }
    }
}
