//! Status transition detection.
//!
//! The detector remembers the last status it saw and reports a transition
//! only when a snapshot carries a different one. The first snapshot is a
//! transition from `None`, never from an assumed default, so a pet that is
//! already hatched or dead on first load still fires its effect once.

use crate::snapshot::ObservedStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObservedTransition {
    pub from: Option<ObservedStatus>,
    pub to: ObservedStatus,
}

impl ObservedTransition {
    pub fn is_initial(&self) -> bool {
        self.from.is_none()
    }

    pub fn enters(&self, status: ObservedStatus) -> bool {
        self.to == status
    }

    /// A return from travel is when new diary entries usually appear.
    pub fn leaves_travel(&self) -> bool {
        self.from == Some(ObservedStatus::Traveling)
    }
}

#[derive(Debug, Clone, Default)]
pub struct TransitionDetector {
    last_seen: Option<ObservedStatus>,
}

impl TransitionDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_seen(&self) -> Option<ObservedStatus> {
        self.last_seen
    }

    pub fn observe(&mut self, status: ObservedStatus) -> Option<ObservedTransition> {
        if self.last_seen == Some(status) {
            return None;
        }
        let transition = ObservedTransition {
            from: self.last_seen,
            to: status,
        };
        self.last_seen = Some(status);
        Some(transition)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ObservedStatus::*;

    #[test]
    fn repeated_status_does_not_refire() {
        let mut d = TransitionDetector::new();
        let seen: Vec<_> = [Waiting, Waiting, Hatched, Hatched]
            .into_iter()
            .map(|s| d.observe(s))
            .collect();

        assert_eq!(
            seen[0],
            Some(ObservedTransition {
                from: None,
                to: Waiting
            })
        );
        assert_eq!(seen[1], None);
        assert_eq!(
            seen[2],
            Some(ObservedTransition {
                from: Some(Waiting),
                to: Hatched
            })
        );
        assert_eq!(seen[3], None);
    }

    #[test]
    fn living_siblings_are_freely_revisited() {
        let mut d = TransitionDetector::new();
        d.observe(Sleeping);
        let t = d.observe(Traveling).unwrap();
        assert!(!t.leaves_travel());
        let t = d.observe(Eating).unwrap();
        assert!(t.leaves_travel());
        let t = d.observe(Sleeping).unwrap();
        assert_eq!(t.from, Some(Eating));
        assert_eq!(d.last_seen(), Some(Sleeping));
    }

    #[test]
    fn first_observation_is_initial() {
        let mut d = TransitionDetector::new();
        let t = d.observe(Dead).unwrap();
        assert!(t.is_initial());
        assert!(t.enters(Dead));
        assert!(d.observe(Dead).is_none());
    }
}
