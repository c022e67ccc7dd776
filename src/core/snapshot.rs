//! Server-owned entity types, mirrored read-only.
//!
//! Field names follow the backend's JSON so a snapshot deserializes directly
//! from `GET /pet/my/all`. Nothing in this crate mutates a snapshot after it
//! arrives.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Status string as stored by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum PetStatus {
    #[default]
    #[cfg_attr(feature = "serde", serde(alias = "egg"))]
    EggClaimed,
    #[cfg_attr(feature = "serde", serde(alias = "egg_heating"))]
    EggHatching,
    EggFrozen,
    EggDead,
    EggHatched,
    Sleeping,
    Eating,
    Traveling,
    #[cfg_attr(feature = "serde", serde(other))]
    Unknown,
}

impl PetStatus {
    /// Statuses for which the hatch counters are meaningful.
    pub fn is_incubating_family(self) -> bool {
        matches!(
            self,
            PetStatus::EggClaimed | PetStatus::EggHatching | PetStatus::EggFrozen
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PetStatus::EggClaimed => "egg_claimed",
            PetStatus::EggHatching => "egg_hatching",
            PetStatus::EggFrozen => "egg_frozen",
            PetStatus::EggDead => "egg_dead",
            PetStatus::EggHatched => "egg_hatched",
            PetStatus::Sleeping => "sleeping",
            PetStatus::Eating => "eating",
            PetStatus::Traveling => "traveling",
            PetStatus::Unknown => "unknown",
        }
    }
}

/// Authoritative point-in-time copy of the pet.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EntitySnapshot {
    pub id: u64,
    #[cfg_attr(feature = "serde", serde(default))]
    pub name: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub template_id: Option<String>,
    pub status: PetStatus,

    #[cfg_attr(feature = "serde", serde(default))]
    pub hatch_progress_seconds: i64,
    #[cfg_attr(feature = "serde", serde(default))]
    pub heat_buffer_seconds: i64,
    #[cfg_attr(feature = "serde", serde(default))]
    pub frozen_since: Option<i64>,
    /// One answer index per answered question, in question order.
    #[cfg_attr(feature = "serde", serde(default))]
    pub hatch_answers: Option<Vec<u32>>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub last_read_diary_id: Option<u64>,
}

impl EntitySnapshot {
    pub fn answered_count(&self) -> usize {
        self.hatch_answers.as_ref().map_or(0, Vec::len)
    }

    /// Question indices are answered strictly in order, so the answered set
    /// is `0..answered_count()`.
    pub fn is_answered(&self, question_index: usize) -> bool {
        question_index < self.answered_count()
    }

    /// High-water mark as the server last recorded it.
    pub fn last_acknowledged(&self) -> u64 {
        self.last_read_diary_id.unwrap_or(0)
    }
}

/// A narrative entry written while the pet was away.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DiaryEntry {
    pub id: u64,
    #[cfg_attr(feature = "serde", serde(default))]
    pub title: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub content: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub image_url: Option<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub created_at: String,
}

/// Hatching constants shared with the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct HatchRules {
    pub target_seconds: u64,
    pub max_questions: usize,
    /// Heat granted per answered question. Only used for display.
    pub heat_reward_seconds: u64,
}

impl Default for HatchRules {
    fn default() -> Self {
        Self {
            target_seconds: 180,
            max_questions: 6,
            heat_reward_seconds: 30,
        }
    }
}

/// Status as the detector sees it.
///
/// The incubating family is split by whether heat remains: `Incubating`
/// while the buffer is non-empty, `Waiting` once it has drained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ObservedStatus {
    Frozen,
    Dead,
    Incubating,
    Waiting,
    Hatched,
    Sleeping,
    Eating,
    Traveling,
    Unknown,
}

impl ObservedStatus {
    pub fn classify(snapshot: &EntitySnapshot) -> Self {
        match snapshot.status {
            PetStatus::EggClaimed | PetStatus::EggHatching => {
                if snapshot.heat_buffer_seconds > 0 {
                    ObservedStatus::Incubating
                } else {
                    ObservedStatus::Waiting
                }
            }
            PetStatus::EggFrozen => ObservedStatus::Frozen,
            PetStatus::EggDead => ObservedStatus::Dead,
            PetStatus::EggHatched => ObservedStatus::Hatched,
            PetStatus::Sleeping => ObservedStatus::Sleeping,
            PetStatus::Eating => ObservedStatus::Eating,
            PetStatus::Traveling => ObservedStatus::Traveling,
            PetStatus::Unknown => ObservedStatus::Unknown,
        }
    }

    /// Post-hatch states the pet cycles through on its own.
    pub fn is_living(self) -> bool {
        matches!(
            self,
            ObservedStatus::Sleeping | ObservedStatus::Eating | ObservedStatus::Traveling
        )
    }

    /// States in which answering a question can still add heat.
    pub fn accepts_incubation(self) -> bool {
        matches!(
            self,
            ObservedStatus::Incubating | ObservedStatus::Waiting | ObservedStatus::Frozen
        )
    }
}

/// Formats a second count as `HH:MM:SS`.
pub fn format_clock(seconds: u64) -> String {
    let h = seconds / 3600;
    let m = (seconds % 3600) / 60;
    let s = seconds % 60;
    format!("{h:02}:{m:02}:{s:02}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_splits_incubating_family_on_buffer() {
        let mut snap = EntitySnapshot {
            status: PetStatus::EggHatching,
            heat_buffer_seconds: 3,
            ..EntitySnapshot::default()
        };
        assert_eq!(ObservedStatus::classify(&snap), ObservedStatus::Incubating);

        snap.heat_buffer_seconds = 0;
        assert_eq!(ObservedStatus::classify(&snap), ObservedStatus::Waiting);

        snap.status = PetStatus::EggFrozen;
        assert_eq!(ObservedStatus::classify(&snap), ObservedStatus::Frozen);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn decodes_backend_pet_with_nulls() {
        let json = r#"{
            "id": 3,
            "name": "Pet Egg",
            "template_id": "unknown",
            "personality_prompt": "An unhatched egg.",
            "dynamic_traits": {},
            "owner_id": 1,
            "status": "egg_frozen",
            "last_status_update": 0,
            "hatch_progress_seconds": 45,
            "heat_buffer_seconds": 0,
            "frozen_since": 1700000000,
            "hatch_answers": [0, 2],
            "last_read_diary_id": null
        }"#;
        let snap: EntitySnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(snap.status, PetStatus::EggFrozen);
        assert_eq!(snap.answered_count(), 2);
        assert!(snap.is_answered(1));
        assert!(!snap.is_answered(2));
        assert_eq!(snap.last_acknowledged(), 0);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn unrecognised_status_is_unknown() {
        let snap: EntitySnapshot =
            serde_json::from_str(r#"{"id": 1, "status": "hibernating"}"#).unwrap();
        assert_eq!(snap.status, PetStatus::Unknown);
        assert_eq!(ObservedStatus::classify(&snap), ObservedStatus::Unknown);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn legacy_status_aliases() {
        let snap: EntitySnapshot =
            serde_json::from_str(r#"{"id": 1, "status": "egg_heating"}"#).unwrap();
        assert_eq!(snap.status, PetStatus::EggHatching);
    }

    #[test]
    fn clock_format() {
        assert_eq!(format_clock(0), "00:00:00");
        assert_eq!(format_clock(3725), "01:02:05");
    }
}
