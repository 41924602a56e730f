//! Time-bucketed event calendar.
//!
//! [`Calendar`] keeps pending events in fixed-width buckets held in a
//! deque ordered by bucket start time. Inserting computes the bucket key
//! `floor(time / width)` and appends to that bucket. A bucket is sorted
//! only when it reaches the front, so insertion is O(1) amortized.
//!
//! # Ordering
//!
//! Events pop in order of the composite key `(time, seq)`, where `seq` is
//! a counter assigned at insertion. Equal times therefore come out in
//! insertion order regardless of which bucket they went through.
//!
//! Events further than [`HORIZON`] buckets ahead of the front wait in an
//! overflow list and are migrated as the front advances.

use std::cmp::Ordering;
use std::collections::VecDeque;

use mote_core::{MoleculeId, ReleaseIndex, ResourceError};

/// Number of buckets kept in the deque before events go to overflow.
pub const HORIZON: usize = 65_536;

/// What a scheduled event does when it fires.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Take one diffusion step for a molecule.
    Diffuse(MoleculeId),
    /// Fire the pending unimolecular reaction of a molecule.
    Unimolecular(MoleculeId),
    /// Run one firing of a release program.
    Release(ReleaseIndex),
    /// Report to the output collaborator.
    PeriodicOutput,
}

/// An event with its scheduled time and insertion sequence number.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScheduledEvent {
    /// Simulated time in seconds.
    pub time: f64,
    /// Insertion order, used to break ties.
    pub seq: u64,
    /// The event payload.
    pub kind: EventKind,
}

/// `Less` when `a` pops after `b`, so a sorted bucket pops from its end.
fn later_first(a: &ScheduledEvent, b: &ScheduledEvent) -> Ordering {
    b.time.total_cmp(&a.time).then(b.seq.cmp(&a.seq))
}

#[derive(Clone, Debug, Default)]
struct Bucket {
    events: Vec<ScheduledEvent>,
    sorted: bool,
}

impl Bucket {
    fn push(&mut self, ev: ScheduledEvent) -> Result<(), ResourceError> {
        self.events
            .try_reserve(1)
            .map_err(|_| ResourceError::exhausted("calendar bucket"))?;
        if self.sorted {
            let pos = self
                .events
                .partition_point(|e| later_first(e, &ev) == Ordering::Less);
            self.events.insert(pos, ev);
        } else {
            self.events.push(ev);
        }
        Ok(())
    }

    fn sort(&mut self) {
        if !self.sorted {
            self.events.sort_unstable_by(later_first);
            self.sorted = true;
        }
    }
}

/// The pending-event queue driving the simulation loop.
#[derive(Clone, Debug)]
pub struct Calendar {
    width: f64,
    first_key: i64,
    buckets: VecDeque<Bucket>,
    far: Vec<ScheduledEvent>,
    far_min_key: i64,
    next_seq: u64,
    len: usize,
}

impl Calendar {
    /// Create an empty calendar with the given bucket width in seconds.
    ///
    /// # Panics
    ///
    /// Panics if `width` is not finite and positive.
    pub fn new(width: f64) -> Self {
        assert!(
            width.is_finite() && width > 0.0,
            "calendar bucket width must be finite and positive"
        );
        Self {
            width,
            first_key: 0,
            buckets: VecDeque::new(),
            far: Vec::new(),
            far_min_key: i64::MAX,
            next_seq: 0,
            len: 0,
        }
    }

    /// Bucket width in seconds.
    pub fn width(&self) -> f64 {
        self.width
    }

    /// Number of pending events.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether no events are pending.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The sequence number the next scheduled event will get.
    pub fn next_seq(&self) -> u64 {
        self.next_seq
    }

    fn key(&self, time: f64) -> i64 {
        // `as` saturates, so TIME_FOREVER lands in the last possible bucket.
        (time / self.width).floor() as i64
    }

    /// Insert an event. Returns its sequence number.
    pub fn schedule(&mut self, kind: EventKind, time: f64) -> Result<u64, ResourceError> {
        debug_assert!(!time.is_nan(), "event scheduled at NaN");
        let seq = self.next_seq;
        self.insert(ScheduledEvent { time, seq, kind })?;
        self.next_seq += 1;
        self.len += 1;
        Ok(seq)
    }

    fn insert(&mut self, ev: ScheduledEvent) -> Result<(), ResourceError> {
        let k = self.key(ev.time);
        if self.buckets.is_empty() {
            self.first_key = k;
        }
        if k < self.first_key {
            self.rebase(k)?;
        }
        let offset = k.saturating_sub(self.first_key);
        if offset >= HORIZON as i64 {
            return self.push_far(ev, k);
        }
        let offset = offset as usize;
        if offset >= self.buckets.len() {
            let grow = offset + 1 - self.buckets.len();
            self.buckets
                .try_reserve(grow)
                .map_err(|_| ResourceError::exhausted("calendar buckets"))?;
            self.buckets.resize_with(offset + 1, Bucket::default);
        }
        self.buckets[offset].push(ev)
    }

    /// Move the window start back to `k`. Buckets that end up beyond the
    /// horizon are spilled to overflow, so the deque never exceeds it.
    fn rebase(&mut self, k: i64) -> Result<(), ResourceError> {
        let growth = self.first_key.saturating_sub(k);
        if growth >= HORIZON as i64 {
            let spilled = std::mem::take(&mut self.buckets);
            self.spill(spilled)?;
        } else {
            let growth = growth as usize;
            self.buckets
                .try_reserve(growth)
                .map_err(|_| ResourceError::exhausted("calendar buckets"))?;
            for _ in 0..growth {
                self.buckets.push_front(Bucket::default());
            }
            if self.buckets.len() > HORIZON {
                let spilled = self.buckets.split_off(HORIZON);
                self.spill(spilled)?;
            }
        }
        self.first_key = k;
        Ok(())
    }

    fn spill(&mut self, buckets: VecDeque<Bucket>) -> Result<(), ResourceError> {
        for ev in buckets.into_iter().flat_map(|b| b.events) {
            let k = self.key(ev.time);
            self.push_far(ev, k)?;
        }
        Ok(())
    }

    fn push_far(&mut self, ev: ScheduledEvent, k: i64) -> Result<(), ResourceError> {
        self.far
            .try_reserve(1)
            .map_err(|_| ResourceError::exhausted("calendar overflow"))?;
        self.far.push(ev);
        self.far_min_key = self.far_min_key.min(k);
        Ok(())
    }

    /// Move overflow events that are now within the horizon into buckets.
    ///
    /// Overflow may also hold events earlier than the window start, left
    /// there when the deque was empty and a later event opened it.
    fn pull_far(&mut self) -> Result<(), ResourceError> {
        if self.far.is_empty() {
            return Ok(());
        }
        if self.buckets.is_empty() || self.far_min_key.saturating_sub(self.first_key) < HORIZON as i64 {
            let far = std::mem::take(&mut self.far);
            self.far_min_key = i64::MAX;
            for ev in far {
                self.insert(ev)?;
            }
        }
        Ok(())
    }

    /// Bring the earliest non-empty bucket to the front, sorted.
    fn settle_front(&mut self) -> Result<Option<&mut Bucket>, ResourceError> {
        loop {
            self.pull_far()?;
            let front_empty = match self.buckets.front() {
                None => return Ok(None),
                Some(b) => b.events.is_empty(),
            };
            if !front_empty {
                break;
            }
            self.buckets.pop_front();
            self.first_key = self.first_key.saturating_add(1);
        }
        Ok(self.buckets.front_mut().map(|b| {
            b.sort();
            b
        }))
    }

    /// Remove and return the earliest event.
    pub fn pop_next(&mut self) -> Result<Option<ScheduledEvent>, ResourceError> {
        let ev = self.settle_front()?.and_then(|b| b.events.pop());
        if ev.is_some() {
            self.len -= 1;
        }
        Ok(ev)
    }

    /// The time of the earliest event, if any.
    pub fn peek_time(&mut self) -> Result<Option<f64>, ResourceError> {
        Ok(self
            .settle_front()?
            .and_then(|b| b.events.last())
            .map(|e| e.time))
    }

    /// All pending events in pop order.
    pub fn events(&self) -> Vec<ScheduledEvent> {
        let mut all: Vec<ScheduledEvent> = self
            .buckets
            .iter()
            .flat_map(|b| b.events.iter().copied())
            .chain(self.far.iter().copied())
            .collect();
        all.sort_unstable_by(|a, b| later_first(b, a));
        all
    }

    /// Drop every pending event. The sequence counter is kept.
    pub fn clear(&mut self) {
        self.buckets.clear();
        self.far.clear();
        self.far_min_key = i64::MAX;
        self.len = 0;
    }

    /// Replace the contents with `events`, keeping their sequence numbers,
    /// and continue numbering from `next_seq`.
    pub fn restore(&mut self, events: &[ScheduledEvent], next_seq: u64) -> Result<(), ResourceError> {
        self.clear();
        for &ev in events {
            debug_assert!(ev.seq < next_seq, "restored event from the future");
            self.insert(ev)?;
            self.len += 1;
        }
        self.next_seq = next_seq;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mol(i: u64) -> EventKind {
        EventKind::Diffuse(MoleculeId(i))
    }

    fn drain(cal: &mut Calendar) -> Vec<ScheduledEvent> {
        let mut out = Vec::new();
        while let Some(ev) = cal.pop_next().unwrap() {
            out.push(ev);
        }
        out
    }

    #[test]
    fn empty_calendar_pops_nothing() {
        let mut cal = Calendar::new(1.0);
        assert!(cal.pop_next().unwrap().is_none());
        assert!(cal.is_empty());
    }

    #[test]
    fn pops_in_time_order() {
        let mut cal = Calendar::new(1.0);
        cal.schedule(mol(0), 3.5).unwrap();
        cal.schedule(mol(1), 0.25).unwrap();
        cal.schedule(mol(2), 1.75).unwrap();
        cal.schedule(mol(3), 0.5).unwrap();
        let times: Vec<f64> = drain(&mut cal).iter().map(|e| e.time).collect();
        assert_eq!(times, vec![0.25, 0.5, 1.75, 3.5]);
    }

    #[test]
    fn equal_times_pop_in_insertion_order() {
        let mut cal = Calendar::new(1.0);
        for i in 0..5 {
            cal.schedule(mol(i), 2.0).unwrap();
        }
        let ids: Vec<EventKind> = drain(&mut cal).iter().map(|e| e.kind).collect();
        assert_eq!(ids, (0..5).map(mol).collect::<Vec<_>>());
    }

    #[test]
    fn insert_into_sorted_front_bucket() {
        let mut cal = Calendar::new(1.0);
        cal.schedule(mol(0), 0.1).unwrap();
        cal.schedule(mol(1), 0.9).unwrap();
        assert_eq!(cal.pop_next().unwrap().map(|e| e.kind), Some(mol(0)));
        cal.schedule(mol(2), 0.5).unwrap();
        cal.schedule(mol(3), 0.95).unwrap();
        let kinds: Vec<EventKind> = drain(&mut cal).iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![mol(2), mol(1), mol(3)]);
    }

    #[test]
    fn schedule_before_front_bucket() {
        let mut cal = Calendar::new(1.0);
        cal.schedule(mol(0), 10.0).unwrap();
        cal.schedule(mol(1), 2.0).unwrap();
        let first = cal.pop_next().unwrap().unwrap();
        assert_eq!(first.kind, mol(1));
    }

    #[test]
    fn far_events_are_migrated() {
        let mut cal = Calendar::new(1.0);
        cal.schedule(mol(0), 0.0).unwrap();
        let far_time = (HORIZON as f64) * 3.0;
        cal.schedule(mol(1), far_time).unwrap();
        cal.schedule(mol(2), far_time - 1.0).unwrap();
        assert_eq!(cal.len(), 3);
        let kinds: Vec<EventKind> = drain(&mut cal).iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![mol(0), mol(2), mol(1)]);
    }

    #[test]
    fn forever_events_sort_last() {
        let mut cal = Calendar::new(1e-6);
        cal.schedule(EventKind::PeriodicOutput, mote_core::TIME_FOREVER)
            .unwrap();
        cal.schedule(mol(0), 1e-6).unwrap();
        assert_eq!(cal.peek_time().unwrap(), Some(1e-6));
        assert_eq!(drain(&mut cal).len(), 2);
    }

    #[test]
    fn near_event_after_far_only_calendar() {
        let mut cal = Calendar::new(1e-6);
        cal.schedule(EventKind::Release(ReleaseIndex(0)), 1.0e4).unwrap();
        cal.schedule(mol(0), 1e-6).unwrap();
        cal.schedule(mol(1), 3e-6).unwrap();
        assert!(cal.buckets.len() <= HORIZON);
        let kinds: Vec<EventKind> = drain(&mut cal).iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![mol(0), mol(1), EventKind::Release(ReleaseIndex(0))]
        );
    }

    #[test]
    fn near_event_after_popping_down_to_forever() {
        let mut cal = Calendar::new(1e-6);
        cal.schedule(mol(0), 2e-6).unwrap();
        cal.schedule(EventKind::PeriodicOutput, mote_core::TIME_FOREVER)
            .unwrap();
        assert_eq!(cal.pop_next().unwrap().map(|e| e.kind), Some(mol(0)));
        assert_eq!(cal.peek_time().unwrap(), Some(mote_core::TIME_FOREVER));
        cal.schedule(mol(1), 3e-6).unwrap();
        assert_eq!(cal.peek_time().unwrap(), Some(3e-6));
        assert_eq!(cal.len(), 2);
    }

    #[test]
    fn rebase_within_horizon_spills_the_tail() {
        let mut cal = Calendar::new(1.0);
        let late = (HORIZON as f64) * 1.5;
        cal.schedule(mol(0), late).unwrap();
        cal.schedule(mol(1), late + 20_000.0).unwrap();
        cal.schedule(mol(2), late - (HORIZON as f64) * 0.75).unwrap();
        assert!(cal.buckets.len() <= HORIZON);
        let kinds: Vec<EventKind> = drain(&mut cal).iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![mol(2), mol(0), mol(1)]);
    }

    #[test]
    fn restore_reproduces_pop_order() {
        let mut cal = Calendar::new(0.5);
        for (i, t) in [1.3, 0.2, 0.2, 7.9, 3.3].into_iter().enumerate() {
            cal.schedule(mol(i as u64), t).unwrap();
        }
        cal.pop_next().unwrap();
        let saved = cal.events();
        let seq = cal.next_seq();

        let mut copy = Calendar::new(0.5);
        copy.restore(&saved, seq).unwrap();
        assert_eq!(copy.len(), cal.len());
        assert_eq!(drain(&mut copy), drain(&mut cal));
        assert_eq!(copy.next_seq(), seq);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn pops_are_ordered(times in prop::collection::vec(0.0f64..50.0, 0..200)) {
                let mut cal = Calendar::new(0.7);
                for (i, &t) in times.iter().enumerate() {
                    cal.schedule(mol(i as u64), t).unwrap();
                }
                let out = drain(&mut cal);
                prop_assert_eq!(out.len(), times.len());
                for w in out.windows(2) {
                    prop_assert!(w[0].time < w[1].time
                        || (w[0].time == w[1].time && w[0].seq < w[1].seq));
                }
            }

            #[test]
            fn interleaved_schedule_and_pop_stay_ordered(
                ops in prop::collection::vec((0.0f64..5.0, any::<bool>()), 1..200)
            ) {
                let mut cal = Calendar::new(0.25);
                let mut now = 0.0;
                for (i, (dt, pop)) in ops.into_iter().enumerate() {
                    if pop {
                        if let Some(ev) = cal.pop_next().unwrap() {
                            prop_assert!(ev.time >= now);
                            now = ev.time;
                        }
                    } else {
                        cal.schedule(mol(i as u64), now + dt).unwrap();
                    }
                }
            }
        }

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(32))]

            #[test]
            fn far_and_forever_times_stay_ordered(
                times in prop::collection::vec(
                    prop_oneof![
                        0.0f64..1e-3,
                        0.0f64..1e4,
                        Just(mote_core::TIME_FOREVER),
                    ],
                    0..30,
                )
            ) {
                let mut cal = Calendar::new(1e-6);
                for (i, &t) in times.iter().enumerate() {
                    cal.schedule(mol(i as u64), t).unwrap();
                    prop_assert!(cal.buckets.len() <= HORIZON);
                }
                let out = drain(&mut cal);
                prop_assert_eq!(out.len(), times.len());
                for w in out.windows(2) {
                    prop_assert!(w[0].time < w[1].time
                        || (w[0].time == w[1].time && w[0].seq < w[1].seq));
                }
            }
        }
    }
}
