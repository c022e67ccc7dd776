//! Unread diary tracking.
//!
//! Entries with an id above the high-water mark are unread. A non-empty
//! unread set is offered to the user once and then held as `pending` until
//! the user either views and acknowledges it or dismisses it. While anything
//! is pending, the viewer is open, or an acknowledgment is outstanding, no new
//! check runs.
//!
//! The mark only moves after the backend confirms an acknowledgment. A failed
//! or dismissed batch is dropped from `pending` without touching the mark, so
//! the next check finds the same entries again.

use crate::snapshot::DiaryEntry;

#[derive(Debug, Clone, Default)]
pub struct NarrativeNotifier {
    high_water: u64,
    pending: Vec<DiaryEntry>,
    viewer_open: bool,
    check_in_flight: bool,
    ack_in_flight: Option<u64>,
}

impl NarrativeNotifier {
    pub fn new(high_water: u64) -> Self {
        Self {
            high_water,
            ..Self::default()
        }
    }

    pub fn high_water(&self) -> u64 {
        self.high_water
    }

    pub fn pending(&self) -> &[DiaryEntry] {
        &self.pending
    }

    pub fn viewer_open(&self) -> bool {
        self.viewer_open
    }

    pub fn ack_in_flight(&self) -> Option<u64> {
        self.ack_in_flight
    }

    /// Folds in the mark carried by a snapshot. The mark never moves back.
    pub fn observe_mark(&mut self, mark: u64) {
        self.high_water = self.high_water.max(mark);
    }

    pub fn should_check(&self) -> bool {
        !self.viewer_open
            && self.pending.is_empty()
            && !self.check_in_flight
            && self.ack_in_flight.is_none()
    }

    /// Claims the single check slot. Returns `false` when suppressed.
    pub fn begin_check(&mut self) -> bool {
        if !self.should_check() {
            return false;
        }
        self.check_in_flight = true;
        true
    }

    /// Computes the unread set from a fresh entry list.
    ///
    /// Returns the newly pending batch, ordered by id, or `None` when nothing
    /// is unread or a batch is already being shown.
    pub fn finish_check(&mut self, entries: &[DiaryEntry]) -> Option<Vec<DiaryEntry>> {
        self.check_in_flight = false;
        if self.viewer_open || !self.pending.is_empty() {
            return None;
        }

        let mut unread: Vec<DiaryEntry> = entries
            .iter()
            .filter(|e| e.id > self.high_water)
            .cloned()
            .collect();
        if unread.is_empty() {
            return None;
        }
        unread.sort_by_key(|e| e.id);
        unread.dedup_by_key(|e| e.id);

        self.pending = unread.clone();
        Some(unread)
    }

    pub fn check_failed(&mut self) {
        self.check_in_flight = false;
    }

    /// Opens the viewer on the pending batch.
    pub fn open_viewer(&mut self) -> Option<&[DiaryEntry]> {
        if self.viewer_open || self.ack_in_flight.is_some() || self.pending.is_empty() {
            return None;
        }
        self.viewer_open = true;
        Some(&self.pending)
    }

    /// Drops the prompt without viewing. Entries stay unread.
    pub fn dismiss(&mut self) -> bool {
        if self.viewer_open || self.ack_in_flight.is_some() || self.pending.is_empty() {
            return false;
        }
        self.pending.clear();
        true
    }

    /// Closes the viewer and returns the id to acknowledge, if any.
    pub fn close_viewer(&mut self) -> Option<u64> {
        if !self.viewer_open {
            return None;
        }
        self.viewer_open = false;
        let max_id = self.pending.iter().map(|e| e.id).max()?;
        self.ack_in_flight = Some(max_id);
        Some(max_id)
    }

    pub fn ack_succeeded(&mut self, acked: u64) {
        self.ack_in_flight = None;
        self.high_water = self.high_water.max(acked);
        let mark = self.high_water;
        self.pending.retain(|e| e.id > mark);
    }

    pub fn ack_failed(&mut self) {
        self.ack_in_flight = None;
        self.pending.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: u64) -> DiaryEntry {
        DiaryEntry {
            id,
            title: format!("day {id}"),
            ..DiaryEntry::default()
        }
    }

    #[test]
    fn unread_is_above_mark_and_sorted() {
        let mut n = NarrativeNotifier::new(3);
        assert!(n.begin_check());
        // Backend returns newest first.
        let got = n
            .finish_check(&[entry(6), entry(5), entry(3), entry(1)])
            .unwrap();
        assert_eq!(got.iter().map(|e| e.id).collect::<Vec<_>>(), vec![5, 6]);
        assert_eq!(n.pending().len(), 2);
    }

    #[test]
    fn pending_batch_suppresses_further_checks() {
        let mut n = NarrativeNotifier::new(0);
        assert!(n.begin_check());
        assert!(n.finish_check(&[entry(1)]).is_some());

        assert!(!n.begin_check());
        // A stray result while pending does not republish.
        assert!(n.finish_check(&[entry(1), entry(2)]).is_none());
        assert_eq!(n.pending().len(), 1);
    }

    #[test]
    fn open_viewer_suppresses_checks() {
        let mut n = NarrativeNotifier::new(0);
        n.begin_check();
        n.finish_check(&[entry(1), entry(2)]);
        assert_eq!(n.open_viewer().map(<[_]>::len), Some(2));

        for _ in 0..3 {
            assert!(!n.should_check());
            assert!(!n.begin_check());
        }
        assert!(n.open_viewer().is_none());
    }

    #[test]
    fn successful_ack_advances_mark_and_clears() {
        let mut n = NarrativeNotifier::new(0);
        n.begin_check();
        n.finish_check(&[entry(4), entry(9), entry(7)]);
        n.open_viewer();
        assert_eq!(n.close_viewer(), Some(9));
        assert!(!n.should_check());

        n.ack_succeeded(9);
        assert_eq!(n.high_water(), 9);
        assert!(n.pending().is_empty());

        assert!(n.begin_check());
        assert!(n.finish_check(&[entry(4), entry(9), entry(7)]).is_none());
    }

    #[test]
    fn failed_ack_keeps_mark_and_rechecks() {
        let mut n = NarrativeNotifier::new(2);
        n.begin_check();
        n.finish_check(&[entry(3), entry(4)]);
        n.open_viewer();
        assert_eq!(n.close_viewer(), Some(4));

        // The batch cannot be reopened while its acknowledgment is pending.
        assert!(n.open_viewer().is_none());

        n.ack_failed();
        assert_eq!(n.high_water(), 2);
        assert!(n.begin_check());
        let again = n.finish_check(&[entry(3), entry(4)]).unwrap();
        assert_eq!(again.len(), 2);
    }

    #[test]
    fn dismiss_leaves_entries_unread() {
        let mut n = NarrativeNotifier::new(0);
        n.begin_check();
        n.finish_check(&[entry(1)]);
        assert!(n.dismiss());
        assert_eq!(n.high_water(), 0);
        assert!(n.begin_check());
        assert!(n.finish_check(&[entry(1)]).is_some());
    }

    #[test]
    fn snapshot_mark_never_moves_back() {
        let mut n = NarrativeNotifier::new(5);
        n.observe_mark(3);
        assert_eq!(n.high_water(), 5);
        n.observe_mark(8);
        assert_eq!(n.high_water(), 8);
    }
}
