//! Per-event hit aggregation.
//!
//! The event loop reports sensor hits tagged with global sensor indices and
//! energy-deposit steps. [`HitAggregator`] turns them into one
//! [`EventSummary`] per event, emitted only when the event passes the
//! configured [`EmissionPolicy`].

mod aggregator;
mod replay;
mod sink;

pub use aggregator::HitAggregator;
pub use replay::{
    group_by_event, hits_from_df, primaries_from_df, replay, steps_from_df, EventRecords,
};
pub use sink::{SummarySink, SummaryTable};

use crate::layout::ArrayId;
use nalgebra::Point3;

/// Particle name of optical quanta
pub const OPTICAL_PHOTON: &str = "opticalphoton";

/// One detected quantum.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitRecord {
    /// Global sensor index
    pub sensor: usize,
    /// Detection time in s
    pub time: f64,
}

/// Energy left by a particle at one simulation step.
#[derive(Debug, Clone, PartialEq)]
pub struct DepositStep {
    /// Track of the depositing particle
    pub track_id: i32,
    /// Track that created it, 0 for primaries
    pub parent_id: i32,
    /// Particle name
    pub particle: String,
    /// Name of the parent particle
    pub parent_particle: String,
    /// Process that created the track
    pub creator_process: String,
    /// Process of this step
    pub depositing_process: String,
    /// Position in mm
    pub position: Point3<f64>,
    /// Deposited energy in keV
    pub energy: f64,
    /// Kinetic energy of the particle in keV
    pub kinetic_energy: f64,
    /// Time in s
    pub time: f64,
}

impl DepositStep {
    /// Optical quanta are counted as sensor hits, never as deposits.
    pub fn is_optical(&self) -> bool {
        self.particle == OPTICAL_PHOTON
    }
}

/// Primary particle of an event.
#[derive(Debug, Clone, PartialEq)]
pub struct PrimaryParticle {
    /// Particle name
    pub particle: String,
    /// Vertex in mm
    pub position: Point3<f64>,
    /// Energy in keV
    pub energy: f64,
}

/// Hit total of one array.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayHits {
    /// Array the total belongs to
    pub array: ArrayId,
    /// Array name
    pub name: String,
    /// Hits summed over the array's index range
    pub hits: u64,
}

/// Everything recorded for one emitted event.
#[derive(Debug, Clone, PartialEq)]
pub struct EventSummary {
    /// Event number
    pub event_id: u64,
    /// Per-array totals in index order
    pub array_hits: Vec<ArrayHits>,
    /// Hits per global sensor index
    pub sensor_hits: Vec<u32>,
    /// Sum of deposited energy in keV
    pub total_energy: f64,
    /// Non-optical deposits in arrival order
    pub deposits: Vec<DepositStep>,
    /// Primary particle, if the event recorded one
    pub primary: Option<PrimaryParticle>,
}

impl EventSummary {
    /// Hit total of one array, 0 for an unknown id.
    pub fn hits_in(&self, array: ArrayId) -> u64 {
        self.array_hits
            .iter()
            .find(|a| a.array == array)
            .map_or(0, |a| a.hits)
    }

    /// Hits across all arrays.
    pub fn total_hits(&self) -> u64 {
        self.array_hits.iter().map(|a| a.hits).sum()
    }

    /// Number of kept deposit records.
    pub fn step_count(&self) -> usize {
        self.deposits.len()
    }
}

/// Decides whether a finished event is worth a summary.
#[derive(clap::ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EmissionPolicy {
    /// Emit when the deposited energy is above zero
    #[default]
    DepositedEnergy,
    /// Emit when the event has deposited energy, a sensor hit or a deposit record
    AnyActivity,
}

impl EmissionPolicy {
    /// Whether an event with these totals gets a summary.
    pub fn accepts(&self, total_energy: f64, total_hits: u64, steps: usize) -> bool {
        match self {
            EmissionPolicy::DepositedEnergy => total_energy > 0.0,
            EmissionPolicy::AnyActivity => total_energy > 0.0 || total_hits > 0 || steps > 0,
        }
    }
}

impl std::fmt::Display for EmissionPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            EmissionPolicy::DepositedEnergy => write!(f, "deposited-energy"),
            EmissionPolicy::AnyActivity => write!(f, "any-activity"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_needs_energy() {
        let policy = EmissionPolicy::default();
        assert_eq!(policy, EmissionPolicy::DepositedEnergy);
        assert!(!policy.accepts(0.0, 10, 0));
        assert!(policy.accepts(1e-3, 0, 1));
    }

    #[test]
    fn any_activity_accepts_hits_or_steps() {
        let policy = EmissionPolicy::AnyActivity;
        assert!(policy.accepts(0.0, 1, 0));
        assert!(policy.accepts(0.0, 0, 1));
        assert!(!policy.accepts(0.0, 0, 0));
    }
}
