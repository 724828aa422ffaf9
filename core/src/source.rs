//! Event-source abstraction.
//!
//! Two heterogeneous origins feed the pipeline: the real-time fleet
//! tracker ("tracker") and spreadsheet imports ("import"). Counter rows
//! are tagged with their origin through the fleet type they reference,
//! so the two never mix inside one aggregation run.

use crate::event::{FleetCreationRecord, ParticipationRecord};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Origin tag stored on every `monthly_fleet_type` row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventSource {
    Tracker,
    Import,
}

impl EventSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tracker => "tracker",
            Self::Import => "import",
        }
    }
}

impl std::str::FromStr for EventSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tracker" => Ok(Self::Tracker),
            "import" => Ok(Self::Import),
            other => Err(format!("unknown event source '{other}'")),
        }
    }
}

impl std::fmt::Display for EventSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Capability contract for the tracker-side event source.
///
/// `fleet_type_names` is independent of any time window: types with zero
/// events in a period must still be registered so they appear in menus
/// and charts. The record methods yield only events whose timestamp falls
/// in `[start, end)`.
pub trait FleetEventSource {
    fn fleet_type_names(&self) -> Vec<String>;

    fn participation_records(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Vec<ParticipationRecord>;

    fn creation_records(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Vec<FleetCreationRecord>;
}

/// In-memory event source. Used by tests and as the backing storage for
/// deserialized tracker exports.
#[derive(Debug, Default, Clone)]
pub struct MemorySource {
    pub catalog: Vec<String>,
    pub participations: Vec<ParticipationRecord>,
    pub creations: Vec<FleetCreationRecord>,
}

impl MemorySource {
    pub fn new(catalog: Vec<String>) -> Self {
        Self {
            catalog,
            participations: Vec::new(),
            creations: Vec::new(),
        }
    }

    pub fn push_participation(&mut self, record: ParticipationRecord) {
        self.participations.push(record);
    }

    pub fn push_creation(&mut self, record: FleetCreationRecord) {
        self.creations.push(record);
    }
}

impl FleetEventSource for MemorySource {
    fn fleet_type_names(&self) -> Vec<String> {
        self.catalog.clone()
    }

    fn participation_records(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Vec<ParticipationRecord> {
        self.participations
            .iter()
            .filter(|r| r.occurred_at >= start && r.occurred_at < end)
            .cloned()
            .collect()
    }

    fn creation_records(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Vec<FleetCreationRecord> {
        self.creations
            .iter()
            .filter(|r| r.occurred_at >= start && r.occurred_at < end)
            .cloned()
            .collect()
    }
}
