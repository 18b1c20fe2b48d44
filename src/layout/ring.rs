//! Concentric ring packing of circular sensor footprints inside a disc.
//!
//! Rings are filled from the outside in. The outermost ring holds the centres
//! of sensors touching the array edge (less the clearance), and every further
//! ring sits `2 * (footprint + clearance)` closer to the axis. On each ring the
//! sensors are first laid out at tangent spacing, then the leftover arc is
//! spread evenly over the gaps. Once a ring radius no longer exceeds one
//! separation, a single sensor is put at the centre and packing stops.

use super::{require_positive, LayoutError};
use nalgebra::Point2;
use std::f64::consts::PI;
use tracing::{debug, trace};

/// One ring of a packed disc.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ring {
    /// Radius of the sensor centres, 0 for the centre placement
    pub radius: f64,
    /// Number of sensors on the ring
    pub count: usize,
    /// Angle between neighbouring sensors in radians
    pub step: f64,
}

impl Ring {
    /// Whether this is the single sensor on the axis.
    pub fn is_centre(&self) -> bool {
        self.radius == 0.0
    }
}

/// Packing inputs of a ring-packed array, all in mm.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RingPacking {
    outer_radius: f64,
    footprint_radius: f64,
    clearance: f64,
}

impl RingPacking {
    /// Validate the packing inputs.
    ///
    /// # Arguments
    ///
    /// * `outer_radius` - Usable radius of the array (`Rmax`)
    /// * `footprint_radius` - Radius of one sensor footprint (`Rsmall`)
    /// * `clearance` - Minimum gap added to every separation (`d`)
    pub fn new(outer_radius: f64, footprint_radius: f64, clearance: f64) -> Result<Self, LayoutError> {
        require_positive("Array outer radius", outer_radius)?;
        require_positive("Sensor footprint radius", footprint_radius)?;
        if !clearance.is_finite() || clearance < 0.0 {
            return Err(LayoutError::NonPhysical(format!(
                "Clearance must be non-negative, got {clearance}"
            )));
        }
        if outer_radius <= footprint_radius {
            return Err(LayoutError::NonPhysical(format!(
                "Outer radius {outer_radius} mm cannot hold a sensor of radius {footprint_radius} mm"
            )));
        }
        Ok(Self {
            outer_radius,
            footprint_radius,
            clearance,
        })
    }

    /// `Rmax`
    pub fn outer_radius(&self) -> f64 {
        self.outer_radius
    }

    /// `Rsmall`
    pub fn footprint_radius(&self) -> f64 {
        self.footprint_radius
    }

    /// `d`
    pub fn clearance(&self) -> f64 {
        self.clearance
    }

    /// `Rmin`, half the centre-to-centre distance between neighbouring rings.
    pub fn min_separation(&self) -> f64 {
        self.footprint_radius + self.clearance
    }

    /// `Rbig`, radius of the centres on the outermost ring.
    pub fn outer_ring_radius(&self) -> f64 {
        self.outer_radius - self.footprint_radius - self.clearance
    }

    /// Rings from the outside in, ending with the centre placement if any.
    pub fn rings(&self) -> Vec<Ring> {
        let rings: Vec<Ring> = self.ring_iter().collect();
        debug!(
            "Packed {} rings into R = {} mm (footprint {} mm, clearance {} mm)",
            rings.len(),
            self.outer_radius,
            self.footprint_radius,
            self.clearance
        );
        rings
    }

    /// Number of sensors the disc holds, or `Err` with the running total once
    /// it passes `ceiling`.
    ///
    /// Stops at the first ring that crosses the ceiling, so it stays cheap for
    /// footprints far too small for the array.
    pub fn count_within(&self, ceiling: usize) -> Result<usize, usize> {
        let mut total: usize = 0;
        for ring in self.ring_iter() {
            total = total.saturating_add(ring.count);
            if total > ceiling {
                return Err(total);
            }
        }
        Ok(total)
    }

    fn ring_iter(&self) -> impl Iterator<Item = Ring> {
        let r_min = self.min_separation();
        let r_big = self.outer_ring_radius();

        (0u64..)
            .map(move |j| (j, r_big - 2.0 * j as f64 * r_min))
            .take_while(|&(_, radius)| radius > 0.0)
            .scan(false, move |centred, (j, radius)| {
                if *centred {
                    return None;
                }
                if r_min < radius {
                    let theta = 2.0 * (r_min / radius).asin();
                    let arc = radius * theta;
                    let count = (2.0 * PI * radius / arc).floor() as usize;
                    let epsilon = ((2.0 * PI * radius - count as f64 * arc) / radius) / count as f64;
                    trace!("Ring {j}: radius {radius:.3} mm holds {count} sensors");
                    Some(Ring {
                        radius,
                        count,
                        step: theta + epsilon,
                    })
                } else {
                    trace!("Ring {j}: radius {radius:.3} mm leaves room for the centre sensor");
                    *centred = true;
                    Some(Ring {
                        radius: 0.0,
                        count: 1,
                        step: 0.0,
                    })
                }
            })
    }

    /// Sensor centres in local-index order.
    pub fn place(&self) -> Vec<Point2<f64>> {
        self.rings()
            .iter()
            .flat_map(|ring| {
                (0..ring.count).map(move |i| {
                    let angle = ring.step * i as f64;
                    Point2::new(ring.radius * angle.cos(), ring.radius * angle.sin())
                })
            })
            .collect()
    }

    /// Number of sensors the disc holds.
    pub fn count(&self) -> usize {
        self.rings().iter().map(|ring| ring.count).sum()
    }
}
