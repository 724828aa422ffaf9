//! Shared primitive types used across the aggregation pipeline.

/// Auth-level user identifier (one user owns many characters).
pub type UserId = i64;

/// In-game corporation identifier.
pub type CorporationId = i64;

/// In-game character identifier.
pub type CharacterId = i64;

/// Row id of a `monthly_fleet_type` entry.
pub type FleetTypeId = i64;
