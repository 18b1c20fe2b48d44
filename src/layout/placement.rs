//! Placements in the detector frame and their orientation policy.
//!
//! A sensor's face normal is its local +z axis. Sensors on a top cap look
//! down into the detector, sensors on a bottom cap look up, and sensors on a
//! side wall look radially inward.

use super::grid::SideGrid;
use nalgebra::{Point2, Point3, Rotation3, Unit, Vector3};
use std::f64::consts::{FRAC_PI_2, PI};

/// Mounting surface of an array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Surface {
    /// Flat cap above the target, facing -z
    TopCap,
    /// Flat cap below the target, facing +z
    BottomCap,
    /// Cylinder wall, facing the axis
    SideWall,
}

impl Surface {
    /// Rotation taking the sensor frame into the detector frame.
    ///
    /// `azimuth` is the column angle of a side-wall sensor and is ignored on caps.
    pub fn orientation(&self, azimuth: f64) -> Rotation3<f64> {
        match self {
            Surface::TopCap => Rotation3::from_axis_angle(&Vector3::x_axis(), PI),
            Surface::BottomCap => Rotation3::identity(),
            Surface::SideWall => {
                Rotation3::from_axis_angle(&Vector3::z_axis(), azimuth)
                    * Rotation3::from_axis_angle(&Vector3::y_axis(), -FRAC_PI_2)
            }
        }
    }
}

impl std::fmt::Display for Surface {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Surface::TopCap => write!(f, "top"),
            Surface::BottomCap => write!(f, "bottom"),
            Surface::SideWall => write!(f, "side"),
        }
    }
}

/// One sensor of an array, positioned by its entrance window.
#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    /// Index within the array
    pub local_index: usize,
    /// Window centre in mm
    pub position: Point3<f64>,
    /// Sensor frame to detector frame
    pub orientation: Rotation3<f64>,
}

impl Placement {
    /// Direction the sensor looks into.
    pub fn face_normal(&self) -> Unit<Vector3<f64>> {
        Unit::new_normalize(self.orientation * Vector3::z())
    }

    /// Centre of one part of the sensor.
    ///
    /// Body and base sit behind the window, along the negative face normal.
    pub fn part_position(&self, part: SensorPart, model: &SensorModel) -> Point3<f64> {
        self.position - self.face_normal().into_inner() * model.offset(part)
    }
}

/// Lift a shared flat layout onto a cap.
///
/// Every array built from the same `points` has identical x/y at each local
/// index and differs only by `offset` and orientation.
pub fn mount_planar(points: &[Point2<f64>], surface: Surface, offset: Vector3<f64>) -> Vec<Placement> {
    let orientation = surface.orientation(0.0);
    points
        .iter()
        .enumerate()
        .map(|(local_index, p)| Placement {
            local_index,
            position: Point3::new(p.x, p.y, 0.0) + offset,
            orientation,
        })
        .collect()
}

/// Placements of a side wall, each facing the cylinder axis.
pub fn mount_cylindrical(grid: &SideGrid, offset: Vector3<f64>) -> Vec<Placement> {
    grid.place_all()
        .into_iter()
        .enumerate()
        .map(|(local_index, (position, azimuth))| Placement {
            local_index,
            position: position + offset,
            orientation: Surface::SideWall.orientation(azimuth),
        })
        .collect()
}

/// Stacked parts of a photosensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SensorPart {
    /// Entrance window, the placement reference point
    Window,
    /// Body behind the window
    Body,
    /// Base behind the body
    Base,
}

/// Dimensions of a photosensor model that the layout needs, in mm.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorModel {
    /// Model name
    pub name: String,
    /// Radius of the circular footprint used for packing
    pub footprint_radius: f64,
    /// Distance from the window reference point to the body centre
    pub body_offset: f64,
    /// Distance from the window reference point to the base centre
    pub base_offset: f64,
}

impl SensorModel {
    /// Distance of a part centre behind the window.
    pub fn offset(&self, part: SensorPart) -> f64 {
        match part {
            SensorPart::Window => 0.0,
            SensorPart::Body => self.body_offset,
            SensorPart::Base => self.base_offset,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::grid::SideGrid;

    fn qupid() -> SensorModel {
        SensorModel {
            name: "QUPID".to_string(),
            footprint_radius: 36.0,
            body_offset: 12.035,
            base_offset: 37.0,
        }
    }

    #[test]
    fn caps_face_into_the_detector() {
        let top = Surface::TopCap.orientation(0.0) * Vector3::z();
        let bottom = Surface::BottomCap.orientation(1.0) * Vector3::z();
        assert!((top - Vector3::new(0.0, 0.0, -1.0)).norm() < 1e-12);
        assert!((bottom - Vector3::z()).norm() < 1e-12);
    }

    #[test]
    fn side_wall_faces_the_axis() {
        for column in 0..12 {
            let a = column as f64 * 2.0 * PI / 12.0;
            let normal = Surface::SideWall.orientation(a) * Vector3::z();
            let inward = -Vector3::new(a.cos(), a.sin(), 0.0);
            assert!(
                (normal - inward).norm() < 1e-12,
                "Column {column} does not face inward"
            );
        }
    }

    #[test]
    fn shared_layout_differs_only_in_z_and_orientation() {
        let points = vec![Point2::new(10.0, 0.0), Point2::new(0.0, -10.0)];
        let top = mount_planar(&points, Surface::TopCap, Vector3::new(0.0, 0.0, 582.0));
        let bottom = mount_planar(&points, Surface::BottomCap, Vector3::new(0.0, 0.0, -542.0));
        for (t, b) in top.iter().zip(bottom.iter()) {
            assert_eq!(t.local_index, b.local_index);
            assert_eq!(t.position.x, b.position.x);
            assert_eq!(t.position.y, b.position.y);
            assert_eq!(t.position.z, 582.0);
            assert_eq!(b.position.z, -542.0);
        }
    }

    #[test]
    fn parts_sit_behind_the_window() {
        let model = qupid();
        let top = mount_planar(&[Point2::origin()], Surface::TopCap, Vector3::new(0.0, 0.0, 582.0));
        let body = top[0].part_position(SensorPart::Body, &model);
        let base = top[0].part_position(SensorPart::Base, &model);
        assert!((body.z - (582.0 + 12.035)).abs() < 1e-9);
        assert!((base.z - 619.0).abs() < 1e-9);
        assert_eq!(top[0].part_position(SensorPart::Window, &model), top[0].position);

        let wall = SideGrid::new(1, 4, 1.0, 1700.0).unwrap();
        let side = mount_cylindrical(&wall, Vector3::zeros());
        let body = side[1].part_position(SensorPart::Body, &model);
        // Column 1 of 4 sits on +y; its body points further out
        assert!((body - Point3::new(0.0, 1700.0 + 12.035, 0.0)).norm() < 1e-9);
    }
}
