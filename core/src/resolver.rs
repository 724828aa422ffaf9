//! Identity resolution with unknown-account fallback.
//!
//! Resolution order for account labels:
//!   1. direct directory lookup (character name → owner → corporation);
//!   2. on miss, the unknown-account ledger — a backfilled user_id
//!      override resolves through the user's current main corporation;
//!   3. otherwise Unresolved, and the label is recorded in the ledger
//!      (idempotently) so an operator can backfill it out-of-band.
//!
//! Character ids (tracker source) use the directory only; the ledger is
//! keyed by account label and never sees tracker events.

use crate::directory::{Identity, IdentityDirectory};
use crate::error::StatsResult;
use crate::store::StatsStore;
use crate::types::CharacterId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Resolved(Identity),
    Unresolved,
}

pub struct IdentityResolver<'a, D: IdentityDirectory> {
    directory: &'a D,
    store: &'a StatsStore,
}

impl<'a, D: IdentityDirectory> IdentityResolver<'a, D> {
    pub fn new(directory: &'a D, store: &'a StatsStore) -> Self {
        Self { directory, store }
    }

    pub fn resolve_character(&self, character_id: CharacterId) -> Resolution {
        match self.directory.character_identity(character_id) {
            Some(identity) => Resolution::Resolved(identity),
            None => {
                log::debug!("resolver: character {character_id} not in directory");
                Resolution::Unresolved
            }
        }
    }

    pub fn resolve_account(&self, label: &str) -> StatsResult<Resolution> {
        if let Some(identity) = self.directory.account_identity(label) {
            return Ok(Resolution::Resolved(identity));
        }

        // Directory miss: an operator may already have mapped this label.
        if let Some(user_id) = self.store.ledger_override(label)? {
            match self.directory.main_corporation(user_id) {
                Some(corporation_id) => {
                    return Ok(Resolution::Resolved(Identity {
                        user_id,
                        corporation_id,
                    }))
                }
                None => {
                    log::warn!(
                        "resolver: ledger maps '{label}' to user {user_id} \
                         but the directory has no main corporation for them"
                    );
                    return Ok(Resolution::Unresolved);
                }
            }
        }

        // Record for backfill. Existing rows are left untouched.
        self.store.record_unknown_account(label)?;
        log::debug!("resolver: account '{label}' unresolved, recorded in ledger");
        Ok(Resolution::Unresolved)
    }
}
