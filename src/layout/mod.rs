//! Sensor placement and global addressing.
//!
//! Ring-packed and grid arrays are generated as array-local placements, lifted
//! into the detector frame, and concatenated in declaration order by
//! [`SensorIndex`] into one flat, zero-based sensor index.

pub mod grid;
pub mod index;
pub mod placement;
pub mod ring;
pub mod validate;

use crate::params::ParameterError;
use std::fmt;

pub use grid::{CapGrid, SideGrid};
pub use index::{sensors_to_df, ArrayDecl, ArrayId, IndexedArray, ResolvedSensor, SensorIndex};
pub use placement::{mount_cylindrical, mount_planar, Placement, SensorModel, SensorPart, Surface};
pub use ring::{Ring, RingPacking};
pub use validate::check_overlaps;

/// Error type for geometry construction.
#[derive(Debug, Clone, PartialEq)]
pub enum LayoutError {
    /// Inputs that cannot describe a physical array
    NonPhysical(String),
    /// A required array ended up with no sensors
    EmptyArray(String),
    /// Two arrays were declared with the same name
    DuplicateArray(String),
    /// The index would exceed the sensor-count ceiling
    TooManySensors {
        /// Sensors counted when the ceiling was passed
        total: usize,
        /// Largest allowed total
        ceiling: usize,
    },
    /// A declared sensor count disagrees with the array's capacity
    CountMismatch {
        /// Array name
        array: String,
        /// Count from the parameters
        declared: usize,
        /// Sensors the grid holds
        capacity: usize,
    },
    /// Two sensors of one array are closer than allowed
    Overlap {
        /// Array name
        array: String,
        /// Lower global index of the pair
        first: usize,
        /// Higher global index of the pair
        second: usize,
        /// Centre distance in mm
        distance: f64,
    },
    /// Failed to read a geometry parameter
    Parameter(ParameterError),
}

impl fmt::Display for LayoutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayoutError::NonPhysical(msg) => write!(f, "Non-physical array: {msg}"),
            LayoutError::EmptyArray(name) => write!(f, "Required array {name} has no sensors"),
            LayoutError::DuplicateArray(name) => write!(f, "Array {name} is declared twice"),
            LayoutError::TooManySensors { total, ceiling } => write!(
                f,
                "{total} sensors requested, the index holds at most {ceiling}"
            ),
            LayoutError::CountMismatch {
                array,
                declared,
                capacity,
            } => write!(
                f,
                "Array {array} declares {declared} sensors but its grid holds {capacity}"
            ),
            LayoutError::Overlap {
                array,
                first,
                second,
                distance,
            } => write!(
                f,
                "Sensors {first} and {second} of array {array} overlap (centres {distance:.4} mm apart)"
            ),
            LayoutError::Parameter(e) => write!(f, "Failed to read geometry parameter: {e}"),
        }
    }
}

impl std::error::Error for LayoutError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LayoutError::Parameter(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ParameterError> for LayoutError {
    fn from(err: ParameterError) -> Self {
        LayoutError::Parameter(err)
    }
}

/// Positive and finite, or a [`LayoutError::NonPhysical`] naming `what`.
pub(crate) fn require_positive(what: &str, value: f64) -> Result<f64, LayoutError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(LayoutError::NonPhysical(format!(
            "{what} must be positive, got {value}"
        )))
    }
}
