//! Identity directory — the external character/corporation lookup the
//! pipeline consumes. The directory itself (auth service, ESI cache) is
//! not this crate's concern; it is reached through a trait so tests and
//! the CLI can supply a snapshot.

use crate::types::{CharacterId, CorporationId, UserId};
use serde::Deserialize;
use std::collections::HashMap;

/// A resolved `(user, corporation)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
    pub user_id: UserId,
    pub corporation_id: CorporationId,
}

/// Lookup surface of the external identity directory.
pub trait IdentityDirectory {
    /// Character id → owning user and that character's corporation.
    fn character_identity(&self, character_id: CharacterId) -> Option<Identity>;

    /// Account label (character name as imported) → identity.
    fn account_identity(&self, label: &str) -> Option<Identity>;

    /// A user's current main-character corporation. Used when a ledger
    /// override supplies the user but not the corporation.
    fn main_corporation(&self, user_id: UserId) -> Option<CorporationId>;
}

#[derive(Debug, Clone, Deserialize)]
struct CharacterEntry {
    character_id: CharacterId,
    name: String,
    user_id: UserId,
    corporation_id: CorporationId,
}

#[derive(Debug, Clone, Deserialize)]
struct UserEntry {
    user_id: UserId,
    main_corporation_id: CorporationId,
}

#[derive(Debug, Clone, Deserialize)]
struct DirectoryFile {
    characters: Vec<CharacterEntry>,
    users: Vec<UserEntry>,
}

/// Directory backed by an in-memory snapshot. Loadable from JSON for the
/// CLI; built up programmatically in tests.
#[derive(Debug, Default, Clone)]
pub struct StaticDirectory {
    by_id: HashMap<CharacterId, Identity>,
    by_name: HashMap<String, Identity>,
    main_corp: HashMap<UserId, CorporationId>,
}

impl StaticDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a directory snapshot from a JSON file.
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let file: DirectoryFile = serde_json::from_str(&content)?;

        let mut dir = Self::new();
        for u in file.users {
            dir.set_main_corporation(u.user_id, u.main_corporation_id);
        }
        for c in file.characters {
            dir.add_character(c.character_id, &c.name, c.user_id, c.corporation_id);
        }
        Ok(dir)
    }

    pub fn add_character(
        &mut self,
        character_id: CharacterId,
        name: &str,
        user_id: UserId,
        corporation_id: CorporationId,
    ) {
        let identity = Identity {
            user_id,
            corporation_id,
        };
        self.by_id.insert(character_id, identity);
        self.by_name.insert(name.to_string(), identity);
        // First character registered for a user doubles as the main
        // unless one was set explicitly.
        self.main_corp.entry(user_id).or_insert(corporation_id);
    }

    pub fn set_main_corporation(&mut self, user_id: UserId, corporation_id: CorporationId) {
        self.main_corp.insert(user_id, corporation_id);
    }
}

impl IdentityDirectory for StaticDirectory {
    fn character_identity(&self, character_id: CharacterId) -> Option<Identity> {
        self.by_id.get(&character_id).copied()
    }

    fn account_identity(&self, label: &str) -> Option<Identity> {
        self.by_name.get(label).copied()
    }

    fn main_corporation(&self, user_id: UserId) -> Option<CorporationId> {
        self.main_corp.get(&user_id).copied()
    }
}
