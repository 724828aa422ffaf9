//! Fleet-type registry — canonical fleet-type rows per period.
//!
//! Counters never reference a fleet type that is not already registered:
//! the aggregator primes the registry for its period before any event is
//! read, and every lookup that misses falls back to the `Unknown`
//! sentinel instead of raising.

use crate::error::StatsResult;
use crate::period::Period;
use crate::source::EventSource;
use crate::store::StatsStore;
use crate::types::FleetTypeId;
use std::collections::HashMap;

/// Catch-all type for events carrying no label (or a label the priming
/// pass never saw). One per (source, month, year).
pub const UNKNOWN_FLEET_TYPE: &str = "Unknown";

pub struct FleetTypeRegistry {
    source: EventSource,
    period: Period,
    ids: HashMap<String, FleetTypeId>,
    unknown_id: FleetTypeId,
}

/// Result of a registry lookup: the id to accrete against, and whether
/// the label had to fall back to `Unknown` despite being present — a
/// priming gap the caller should log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeLookup {
    pub fleet_type_id: FleetTypeId,
    pub fallback: bool,
}

impl FleetTypeRegistry {
    /// Ensure a row per name plus the `Unknown` sentinel, and return the
    /// primed name→id map for the period.
    pub fn prime(
        store: &StatsStore,
        source: EventSource,
        period: Period,
        names: &[String],
    ) -> StatsResult<Self> {
        let mut ids = HashMap::new();
        for name in names {
            let id = store.ensure_fleet_type(name, source, period)?;
            ids.insert(name.clone(), id);
        }
        let unknown_id = store.ensure_fleet_type(UNKNOWN_FLEET_TYPE, source, period)?;
        ids.insert(UNKNOWN_FLEET_TYPE.to_string(), unknown_id);

        log::debug!(
            "registry: primed {} fleet types for {source} {period}",
            ids.len()
        );
        Ok(Self {
            source,
            period,
            ids,
            unknown_id,
        })
    }

    /// Get-or-create a single type after priming. Race-tolerant through
    /// the store's conflict handling.
    pub fn ensure(&mut self, store: &StatsStore, name: &str) -> StatsResult<FleetTypeId> {
        if let Some(id) = self.ids.get(name) {
            return Ok(*id);
        }
        let id = store.ensure_fleet_type(name, self.source, self.period)?;
        self.ids.insert(name.to_string(), id);
        Ok(id)
    }

    /// Resolve an event's type label to a registered id. `None` labels
    /// route to `Unknown` (normal); a named label missing from the map
    /// also routes to `Unknown` but is flagged as a priming gap.
    pub fn resolve(&self, label: Option<&str>) -> TypeLookup {
        match label {
            None => TypeLookup {
                fleet_type_id: self.unknown_id,
                fallback: false,
            },
            Some(name) => match self.ids.get(name) {
                Some(id) => TypeLookup {
                    fleet_type_id: *id,
                    fallback: false,
                },
                None => TypeLookup {
                    fleet_type_id: self.unknown_id,
                    fallback: true,
                },
            },
        }
    }

    pub fn unknown_id(&self) -> FleetTypeId {
        self.unknown_id
    }
}
