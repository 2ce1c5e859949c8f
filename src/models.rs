use serde::{Deserialize, Serialize};

/// An event document as stored in the events collection.
///
/// Field names follow the stored documents, so snapshots exported by the
/// store deserialize directly. Unknown fields such as image payloads are
/// ignored and every field falls back to its default when absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EventRecord {
    pub id: String,
    pub title: String,
    pub room: String,
    /// Formatted as `dd/MM/yyyy`.
    pub date: String,
    /// Formatted as `HH:mm`.
    pub time: String,
    pub description: String,
    pub attended_students: Vec<String>,
    pub enrolled_students: Vec<String>,
    pub organizer_id: String,
    pub categories: Vec<String>,
    /// Derived on every snapshot refresh; never read as an input.
    pub predicted_popular: bool,
}

impl EventRecord {
    pub fn enrollment_count(&self) -> usize {
        self.enrolled_students.len()
    }

    pub fn is_enrolled(&self, email: &str) -> bool {
        self.enrolled_students.iter().any(|student| student == email)
    }
}

/// Per-signal scores behind a single popularity prediction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PopularityBreakdown {
    pub category: f64,
    pub organizer: f64,
    pub time: f64,
    pub day: f64,
    pub total: f64,
    pub popular: bool,
}

#[derive(Debug, Clone)]
pub struct ScoredEvent {
    pub event: EventRecord,
    pub breakdown: PopularityBreakdown,
}

#[derive(Debug, Clone)]
pub struct CategorySummary {
    pub category: String,
    pub event_count: usize,
    pub avg_enrollment: f64,
}

#[derive(Debug, Clone)]
pub struct OrganizerSummary {
    pub organizer_id: String,
    pub event_count: usize,
    pub avg_enrollment: f64,
}
