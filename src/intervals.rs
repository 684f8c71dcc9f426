//! Comparison intervals A/B and the saved candidate range list.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// A named comparison time range. Both bounds are always set or cleared
/// together; a half-set interval must never exist.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Interval {
    start_date: Option<DateTime<Utc>>,
    end_date: Option<DateTime<Utc>>,
}

impl Interval {
    pub fn is_set(&self) -> bool {
        self.start_date.is_some() && self.end_date.is_some()
    }

    pub fn set(&mut self, start: DateTime<Utc>, end: DateTime<Utc>) {
        self.start_date = Some(start);
        self.end_date = Some(end);
    }

    pub fn clear(&mut self) {
        self.start_date = None;
        self.end_date = None;
    }

    pub fn bounds(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        Some((self.start_date?, self.end_date?))
    }

    /// "01.01.2016 to 31.12.2016" style label for chips and legends.
    pub fn label(&self) -> Option<String> {
        let (start, end) = self.bounds()?;
        Some(format!(
            "{} to {}",
            start.format("%d.%m.%Y"),
            end.format("%d.%m.%Y")
        ))
    }
}

/// A frozen selection from the global timeline, pending assignment to
/// interval A or B. Millisecond timestamps; never mutated after creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateInterval {
    pub min: i64,
    pub max: i64,
}

impl CandidateInterval {
    pub fn label(&self) -> String {
        let fmt = |ms: i64| match Utc.timestamp_millis_opt(ms).single() {
            Some(dt) => dt.format("%d.%m.%Y %H:%M").to_string(),
            None => ms.to_string(),
        };
        format!("{} - {}", fmt(self.min), fmt(self.max))
    }
}

/// Which interval a candidate should land in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IntervalSlot {
    A,
    B,
}

/// Outcome of a first-empty-wins assignment attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assignment {
    Placed(IntervalSlot),
    /// Both intervals are occupied; the caller must prompt for an explicit
    /// overwrite target.
    NeedsChoice,
}

/// Intervals A/B plus the insertion-ordered candidate list.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ComparisonState {
    pub interval_a: Interval,
    pub interval_b: Interval,
    pub candidates: Vec<CandidateInterval>,
}

impl ComparisonState {
    pub fn interval(&self, slot: IntervalSlot) -> &Interval {
        match slot {
            IntervalSlot::A => &self.interval_a,
            IntervalSlot::B => &self.interval_b,
        }
    }

    /// Freeze the current timeline selection into the candidate list.
    /// No de-duplication; insertion order is the only ordering guarantee.
    pub fn save_candidate(&mut self, range: CandidateInterval) {
        self.candidates.push(range);
    }

    /// Remove by position. Later candidates shift down, so callers must not
    /// hold on to indices across this call.
    pub fn delete_candidate(&mut self, index: usize) {
        if index < self.candidates.len() {
            self.candidates.remove(index);
        }
    }

    /// First-empty-wins assignment: A, then B, otherwise the caller has to
    /// ask the user which interval to overwrite.
    pub fn assign_candidate(&mut self, index: usize) -> Option<Assignment> {
        let candidate = *self.candidates.get(index)?;
        if !self.interval_a.is_set() {
            self.apply(candidate, IntervalSlot::A);
            Some(Assignment::Placed(IntervalSlot::A))
        } else if !self.interval_b.is_set() {
            self.apply(candidate, IntervalSlot::B);
            Some(Assignment::Placed(IntervalSlot::B))
        } else {
            Some(Assignment::NeedsChoice)
        }
    }

    /// Explicit-target assignment with overwrite semantics: both bounds are
    /// always replaced together.
    pub fn assign_candidate_to(&mut self, index: usize, slot: IntervalSlot) -> bool {
        match self.candidates.get(index) {
            Some(candidate) => {
                self.apply(*candidate, slot);
                true
            }
            None => false,
        }
    }

    fn apply(&mut self, candidate: CandidateInterval, slot: IntervalSlot) {
        let Some(start) = Utc.timestamp_millis_opt(candidate.min).single() else {
            return;
        };
        let Some(end) = Utc.timestamp_millis_opt(candidate.max).single() else {
            return;
        };
        let target = match slot {
            IntervalSlot::A => &mut self.interval_a,
            IntervalSlot::B => &mut self.interval_b,
        };
        target.set(start, end);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(min: i64, max: i64) -> CandidateInterval {
        CandidateInterval { min, max }
    }

    #[test]
    fn interval_is_set_only_with_both_bounds() {
        let mut interval = Interval::default();
        assert!(!interval.is_set());

        interval.set(Utc::now(), Utc::now());
        assert!(interval.is_set());

        interval.clear();
        assert!(!interval.is_set());
        assert!(interval.bounds().is_none());
    }

    #[test]
    fn first_empty_wins_assignment() {
        let mut state = ComparisonState::default();
        state.save_candidate(candidate(0, 1_000));
        state.save_candidate(candidate(2_000, 3_000));
        state.save_candidate(candidate(4_000, 5_000));

        assert_eq!(
            state.assign_candidate(0),
            Some(Assignment::Placed(IntervalSlot::A))
        );
        assert!(state.interval_a.is_set());
        assert!(!state.interval_b.is_set());

        assert_eq!(
            state.assign_candidate(1),
            Some(Assignment::Placed(IntervalSlot::B))
        );
        assert!(state.interval_b.is_set());

        // both occupied: no interval changes, caller must prompt
        let before = state.clone();
        assert_eq!(state.assign_candidate(2), Some(Assignment::NeedsChoice));
        assert_eq!(state.interval_a, before.interval_a);
        assert_eq!(state.interval_b, before.interval_b);
    }

    #[test]
    fn explicit_assignment_overwrites_both_bounds() {
        let mut state = ComparisonState::default();
        state.save_candidate(candidate(0, 1_000));
        state.save_candidate(candidate(60_000, 120_000));
        state.assign_candidate(0);

        assert!(state.assign_candidate_to(1, IntervalSlot::A));
        let (start, end) = state.interval_a.bounds().unwrap();
        assert_eq!(start.timestamp_millis(), 60_000);
        assert_eq!(end.timestamp_millis(), 120_000);
    }

    #[test]
    fn assignment_of_missing_candidate_is_rejected() {
        let mut state = ComparisonState::default();
        assert_eq!(state.assign_candidate(0), None);
        assert!(!state.assign_candidate_to(0, IntervalSlot::B));
    }

    #[test]
    fn delete_shifts_later_candidates_down() {
        let mut state = ComparisonState::default();
        state.save_candidate(candidate(0, 1));
        state.save_candidate(candidate(2, 3));
        state.save_candidate(candidate(4, 5));

        state.delete_candidate(1);
        assert_eq!(state.candidates.len(), 2);
        assert_eq!(state.candidates[1], candidate(4, 5));

        // out of range is a no-op
        state.delete_candidate(10);
        assert_eq!(state.candidates.len(), 2);
    }
}
