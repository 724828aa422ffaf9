//! Tracker export adapter — source A.
//!
//! The fleet tracker's data reaches the pipeline as a JSON snapshot:
//! the full fleet-type catalog plus every tracked participation and
//! fleet-creation row. The snapshot is loaded once and queried through
//! the `FleetEventSource` trait; window filtering happens in memory.

use crate::event::{FleetCreationRecord, ParticipationRecord};
use crate::source::{FleetEventSource, MemorySource};
use crate::types::CharacterId;
use chrono::{DateTime, Utc};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
struct ParticipationRow {
    character_id: CharacterId,
    #[serde(default)]
    fleet_type: Option<String>,
    occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
struct FleetRow {
    creator_character_id: CharacterId,
    #[serde(default)]
    fleet_type: Option<String>,
    occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
struct TrackerExportFile {
    fleet_types: Vec<String>,
    participations: Vec<ParticipationRow>,
    fleets: Vec<FleetRow>,
}

/// A deserialized tracker snapshot.
pub struct TrackerExport {
    inner: MemorySource,
}

impl TrackerExport {
    /// Load a snapshot from a JSON file.
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let file: TrackerExportFile = serde_json::from_str(&content)?;
        Ok(Self::from_file(file))
    }

    fn from_file(file: TrackerExportFile) -> Self {
        let mut inner = MemorySource::new(file.fleet_types);
        for row in file.participations {
            inner.push_participation(ParticipationRecord {
                character_id: row.character_id,
                fleet_type: row.fleet_type,
                occurred_at: row.occurred_at,
            });
        }
        for row in file.fleets {
            inner.push_creation(FleetCreationRecord {
                creator_character_id: row.creator_character_id,
                fleet_type: row.fleet_type,
                occurred_at: row.occurred_at,
            });
        }
        Self { inner }
    }
}

impl FleetEventSource for TrackerExport {
    fn fleet_type_names(&self) -> Vec<String> {
        self.inner.fleet_type_names()
    }

    fn participation_records(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Vec<ParticipationRecord> {
        self.inner.participation_records(start, end)
    }

    fn creation_records(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Vec<FleetCreationRecord> {
        self.inner.creation_records(start, end)
    }
}
