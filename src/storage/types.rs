//! Record types persisted by [`BotStore`](super::BotStore).
//!
//! All records are bincode-encoded. Keys are built by the store from the
//! lowercased nick so lookups ignore IRC nick casing, while the records keep the
//! nick exactly as it was first seen.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const BADGE_SCHEMA_VERSION: u8 = 1;
pub const HUNT_SCHEMA_VERSION: u8 = 1;
pub const TELL_SCHEMA_VERSION: u8 = 1;

/// What a player did to a spawned creature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HuntAction {
    Befriend,
    Shoot,
}

impl HuntAction {
    pub fn as_str(self) -> &'static str {
        match self {
            HuntAction::Befriend => "befriend",
            HuntAction::Shoot => "shoot",
        }
    }

    /// Verb used in channel replies ("befriended", "shot").
    pub fn past_tense(self) -> &'static str {
        match self {
            HuntAction::Befriend => "befriended",
            HuntAction::Shoot => "shot",
        }
    }
}

/// Append-only fact written once per successful claim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HuntRecord {
    pub schema_version: u8,
    pub actor: String,
    pub creature: String,
    pub action: HuntAction,
    pub timestamp: DateTime<Utc>,
}

impl HuntRecord {
    pub fn new(actor: &str, creature: &str, action: HuntAction) -> Self {
        Self {
            schema_version: HUNT_SCHEMA_VERSION,
            actor: actor.to_string(),
            creature: creature.to_string(),
            action,
            timestamp: Utc::now(),
        }
    }
}

/// Lifetime befriend/shoot totals for one actor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HuntStats {
    pub befriended: u64,
    pub shot: u64,
}

impl HuntStats {
    pub fn count(&self, action: HuntAction) -> u64 {
        match action {
            HuntAction::Befriend => self.befriended,
            HuntAction::Shoot => self.shot,
        }
    }
}

/// A tell waiting for its recipient to speak.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingMessage {
    pub schema_version: u8,
    /// Monotonic sequence id; delivery order follows it.
    pub id: u64,
    pub recipient: String,
    pub sender: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

/// Badge owned by one nick. `date` is either an RFC 3339 timestamp or whatever
/// opaque text the owner supplied.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BadgeRecord {
    pub schema_version: u8,
    pub owner: String,
    pub name: String,
    pub date: String,
    pub added_at: DateTime<Utc>,
}

impl BadgeRecord {
    pub fn new(owner: &str, name: &str, date: &str) -> Self {
        Self {
            schema_version: BADGE_SCHEMA_VERSION,
            owner: owner.to_string(),
            name: name.to_string(),
            date: date.to_string(),
            added_at: Utc::now(),
        }
    }
}
