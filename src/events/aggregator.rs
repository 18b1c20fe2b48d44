use super::{ArrayHits, DepositStep, EmissionPolicy, EventSummary, HitRecord, PrimaryParticle};
use crate::layout::SensorIndex;
use tracing::{debug, trace};

/// Accumulates one event at a time against a built [`SensorIndex`].
///
/// State belongs to the current event only and is cleared by
/// [`HitAggregator::end_event`] whether or not a summary is emitted.
#[derive(Debug)]
pub struct HitAggregator<'a> {
    index: &'a SensorIndex,
    policy: EmissionPolicy,
    event_id: u64,
    primary: Option<PrimaryParticle>,
    hits: Vec<u32>,
    deposits: Vec<DepositStep>,
    total_energy: f64,
}

impl<'a> HitAggregator<'a> {
    /// Aggregator with one zeroed counter per sensor of `index`.
    pub fn new(index: &'a SensorIndex, policy: EmissionPolicy) -> Self {
        Self {
            index,
            policy,
            event_id: 0,
            primary: None,
            hits: vec![0; index.total()],
            deposits: Vec::new(),
            total_energy: 0.0,
        }
    }

    /// Emission policy applied by [`HitAggregator::end_event`].
    pub fn policy(&self) -> EmissionPolicy {
        self.policy
    }

    /// Start a new event, dropping anything left from the previous one.
    pub fn begin_event(&mut self, event_id: u64, primary: Option<PrimaryParticle>) {
        self.reset();
        self.event_id = event_id;
        self.primary = primary;
    }

    /// Count one detected quantum.
    ///
    /// Panics if the sensor index was not produced by the index this
    /// aggregator was built for.
    pub fn record_hit(&mut self, hit: HitRecord) {
        match self.hits.get_mut(hit.sensor) {
            Some(count) => *count += 1,
            None => panic!(
                "Hit on sensor {} outside [0, {}) in event {}",
                hit.sensor,
                self.hits.len(),
                self.event_id
            ),
        }
    }

    /// Keep a deposit step unless it belongs to an optical quantum.
    pub fn record_step(&mut self, step: DepositStep) {
        if step.is_optical() {
            return;
        }
        self.total_energy += step.energy;
        self.deposits.push(step);
    }

    /// Close the current event.
    ///
    /// Returns the summary if the emission policy accepts the event.
    pub fn end_event(&mut self) -> Option<EventSummary> {
        let array_hits: Vec<ArrayHits> = self
            .index
            .arrays()
            .iter()
            .map(|array| ArrayHits {
                array: array.id,
                name: array.name.clone(),
                hits: self.hits[array.range.clone()]
                    .iter()
                    .map(|&h| h as u64)
                    .sum(),
            })
            .collect();
        let total_hits: u64 = array_hits.iter().map(|a| a.hits).sum();

        let summary = if self
            .policy
            .accepts(self.total_energy, total_hits, self.deposits.len())
        {
            debug!(
                "Event {}: {total_hits} hits, {} steps, {:.3} keV",
                self.event_id,
                self.deposits.len(),
                self.total_energy
            );
            Some(EventSummary {
                event_id: self.event_id,
                array_hits,
                sensor_hits: std::mem::replace(&mut self.hits, vec![0; self.index.total()]),
                total_energy: self.total_energy,
                deposits: std::mem::take(&mut self.deposits),
                primary: self.primary.take(),
            })
        } else {
            trace!("Event {} discarded by {} policy", self.event_id, self.policy);
            None
        };

        self.reset();
        summary
    }

    /// Run the whole begin/record/end sequence for one event.
    pub fn process_event<H, S>(
        &mut self,
        event_id: u64,
        primary: Option<PrimaryParticle>,
        hits: H,
        steps: S,
    ) -> Option<EventSummary>
    where
        H: IntoIterator<Item = HitRecord>,
        S: IntoIterator<Item = DepositStep>,
    {
        self.begin_event(event_id, primary);
        hits.into_iter().for_each(|hit| self.record_hit(hit));
        steps.into_iter().for_each(|step| self.record_step(step));
        self.end_event()
    }

    fn reset(&mut self) {
        self.hits.iter_mut().for_each(|h| *h = 0);
        self.deposits.clear();
        self.total_energy = 0.0;
        self.primary = None;
    }
}
