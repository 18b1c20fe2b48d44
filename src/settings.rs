//! Layout and aggregation settings.

use crate::events::EmissionPolicy;

/// Upper bound on the number of addressable sensors across all arrays
pub const MAX_SENSORS: usize = 100_000;
/// Slack allowed when comparing sensor separations, in mm
pub const OVERLAP_TOLERANCE: f64 = 1e-9;

/// Options for building an index and aggregating events.
#[derive(Clone, Debug)]
pub struct Settings {
    /// Ceiling on the total sensor count of an index
    pub max_sensors: usize,
    /// Predicate deciding whether an event summary is emitted
    pub emission_policy: EmissionPolicy,
    /// Run the post-build overlap validation for every array
    pub check_overlaps: bool,
    /// Floating tolerance of the overlap validation in mm
    pub overlap_tolerance: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            max_sensors: MAX_SENSORS,
            emission_policy: EmissionPolicy::default(),
            check_overlaps: true,
            overlap_tolerance: OVERLAP_TOLERANCE,
        }
    }
}
