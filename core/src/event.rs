//! Normalized event records — the uniform shape both source adapters
//! produce for the aggregator.

use crate::types::CharacterId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One discrete participation in a fleet, as reported by the tracker.
/// `fleet_type` is None when the fleet link carried no type label;
/// the aggregator routes those to the period's `Unknown` type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParticipationRecord {
    pub character_id: CharacterId,
    pub fleet_type: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// One fleet-creation record (one per fleet, not one per participant).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FleetCreationRecord {
    pub creator_character_id: CharacterId,
    pub fleet_type: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// One non-zero cell from a spreadsheet import: `account` took part in
/// `count` fleets of the mapped `fleet_type` during the import's period.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportRecord {
    pub account: String,
    pub fleet_type: String,
    pub count: u32,
}
