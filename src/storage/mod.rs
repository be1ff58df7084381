//! # Storage Module - Bot Record Persistence
//!
//! Sled-backed persistence for the four independent record sets the bot keeps:
//!
//! ```text
//! <data_dir>/shalebot.sled
//! ├── badges   ← owner\0name            → BadgeRecord   (unique per pair)
//! ├── hunts    ← actor\0<seq>           → HuntRecord    (append-only)
//! ├── tells    ← recipient\0<seq>       → PendingMessage (deleted on delivery)
//! └── points   ← granter\0recipient     → i64 big-endian tally
//! ```
//!
//! Every key starts with the ASCII-lowercased nick so a prefix scan yields all
//! rows for one person; `<seq>` comes from [`sled::Db::generate_id`] and is
//! zero-padded so lexicographic order equals creation order.
//!
//! The store does no business logic. Conflicting writes are resolved by sled
//! itself: badge creation is a compare-and-swap against an absent key and point
//! adjustment is a single atomic read-modify-write, so no caller ever has to
//! check-then-insert.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use shalebot::storage::BotStore;
//!
//! fn main() -> Result<(), shalebot::storage::StoreError> {
//!     let store = BotStore::open("./data")?;
//!     let total = store.adjust_points("alice", "bob", 1)?;
//!     println!("alice has given bob {} points", total);
//!     Ok(())
//! }
//! ```

mod errors;
pub mod types;

use std::path::{Path, PathBuf};

use log::{debug, warn};
use sled::IVec;

pub use errors::StoreError;
pub use types::{BadgeRecord, HuntAction, HuntRecord, HuntStats, PendingMessage};
use types::TELL_SCHEMA_VERSION;

const DB_DIR_NAME: &str = "shalebot.sled";
const TREE_BADGES: &str = "badges";
const TREE_HUNTS: &str = "hunts";
const TREE_TELLS: &str = "tells";
const TREE_POINTS: &str = "points";

/// Separator between key components. Nicks and badge names never contain NUL.
const KEY_SEP: char = '\u{0}';

/// Handle to the bot database. Cheap to clone; clones share the same trees.
#[derive(Clone)]
pub struct BotStore {
    db: sled::Db,
    badges: sled::Tree,
    hunts: sled::Tree,
    tells: sled::Tree,
    points: sled::Tree,
}

impl BotStore {
    /// Open (or create) the store under `data_dir`.
    pub fn open<P: AsRef<Path>>(data_dir: P) -> Result<Self, StoreError> {
        let dir = data_dir.as_ref();
        std::fs::create_dir_all(dir)?;
        let path: PathBuf = dir.join(DB_DIR_NAME);
        let db = sled::open(&path)?;
        let store = Self {
            badges: db.open_tree(TREE_BADGES)?,
            hunts: db.open_tree(TREE_HUNTS)?,
            tells: db.open_tree(TREE_TELLS)?,
            points: db.open_tree(TREE_POINTS)?,
            db,
        };
        debug!("Opened bot store at {}", path.display());
        Ok(store)
    }

    fn nick_key(nick: &str) -> String {
        nick.to_ascii_lowercase()
    }

    fn pair_key(first: &str, second: &str) -> Vec<u8> {
        format!("{}{}{}", first, KEY_SEP, second).into_bytes()
    }

    fn nick_prefix(nick: &str) -> Vec<u8> {
        format!("{}{}", Self::nick_key(nick), KEY_SEP).into_bytes()
    }

    fn sequenced_key(nick: &str, seq: u64) -> Vec<u8> {
        format!("{}{}{:020}", Self::nick_key(nick), KEY_SEP, seq).into_bytes()
    }

    fn serialize<T: serde::Serialize>(value: &T) -> Result<Vec<u8>, StoreError> {
        Ok(bincode::serialize(value)?)
    }

    fn deserialize<T: serde::de::DeserializeOwned>(bytes: &IVec) -> Result<T, StoreError> {
        Ok(bincode::deserialize::<T>(bytes)?)
    }

    // ------------------------------------------------------------------
    // Badges
    // ------------------------------------------------------------------

    /// Insert a badge unless `owner` already has one with this name.
    /// Returns `false` (and leaves the stored row untouched) on duplicates.
    pub fn add_badge(&self, owner: &str, name: &str, date: &str) -> Result<bool, StoreError> {
        let key = Self::pair_key(&Self::nick_key(owner), name);
        let bytes = Self::serialize(&BadgeRecord::new(owner, name, date))?;
        let swapped = self
            .badges
            .compare_and_swap(key, None as Option<&[u8]>, Some(bytes))?;
        if swapped.is_err() {
            return Ok(false);
        }
        self.badges.flush()?;
        Ok(true)
    }

    /// Remove a badge. Returns `false` when no such badge existed.
    pub fn delete_badge(&self, owner: &str, name: &str) -> Result<bool, StoreError> {
        let key = Self::pair_key(&Self::nick_key(owner), name);
        let removed = self.badges.remove(key)?.is_some();
        if removed {
            self.badges.flush()?;
        }
        Ok(removed)
    }

    /// All badges owned by `owner`, ordered by name.
    pub fn list_badges(&self, owner: &str) -> Result<Vec<BadgeRecord>, StoreError> {
        self.badges
            .scan_prefix(Self::nick_prefix(owner))
            .map(|entry| {
                let (_key, value) = entry?;
                Self::deserialize(&value)
            })
            .collect()
    }

    // ------------------------------------------------------------------
    // Hunt history
    // ------------------------------------------------------------------

    /// Append one hunt fact.
    pub fn record_hunt(&self, record: &HuntRecord) -> Result<(), StoreError> {
        let seq = self.db.generate_id()?;
        let key = Self::sequenced_key(&record.actor, seq);
        self.hunts.insert(key, Self::serialize(record)?)?;
        self.hunts.flush()?;
        Ok(())
    }

    /// Lifetime befriend/shoot counts for `actor`.
    pub fn hunt_stats(&self, actor: &str) -> Result<HuntStats, StoreError> {
        let mut stats = HuntStats::default();
        for entry in self.hunts.scan_prefix(Self::nick_prefix(actor)) {
            let (_key, value) = entry?;
            let record: HuntRecord = Self::deserialize(&value)?;
            match record.action {
                HuntAction::Befriend => stats.befriended += 1,
                HuntAction::Shoot => stats.shot += 1,
            }
        }
        Ok(stats)
    }

    // ------------------------------------------------------------------
    // Deferred messages
    // ------------------------------------------------------------------

    /// Queue a tell for `recipient`. Returns the sequence id assigned to it.
    pub fn store_tell(&self, recipient: &str, sender: &str, body: &str) -> Result<u64, StoreError> {
        let id = self.db.generate_id()?;
        let message = PendingMessage {
            schema_version: TELL_SCHEMA_VERSION,
            id,
            recipient: recipient.to_string(),
            sender: sender.to_string(),
            body: body.to_string(),
            created_at: chrono::Utc::now(),
        };
        self.tells
            .insert(Self::sequenced_key(recipient, id), Self::serialize(&message)?)?;
        self.tells.flush()?;
        Ok(id)
    }

    /// Remove and return every tell waiting for `recipient`, oldest first.
    ///
    /// A message is only returned by the call whose `remove` actually deleted it,
    /// so two overlapping deliveries never surface the same tell twice.
    pub fn take_tells(&self, recipient: &str) -> Result<Vec<PendingMessage>, StoreError> {
        let mut delivered = Vec::new();
        let keys: Vec<IVec> = self
            .tells
            .scan_prefix(Self::nick_prefix(recipient))
            .keys()
            .collect::<Result<_, _>>()?;
        for key in keys {
            let Some(value) = self.tells.remove(&key)? else {
                continue;
            };
            match Self::deserialize::<PendingMessage>(&value) {
                Ok(message) => delivered.push(message),
                Err(e) => warn!("Dropping undecodable tell for {}: {}", recipient, e),
            }
        }
        if !delivered.is_empty() {
            self.tells.flush()?;
        }
        Ok(delivered)
    }

    /// Number of tells waiting for `recipient`.
    pub fn pending_tell_count(&self, recipient: &str) -> Result<usize, StoreError> {
        let mut count = 0;
        for key in self.tells.scan_prefix(Self::nick_prefix(recipient)).keys() {
            key?;
            count += 1;
        }
        Ok(count)
    }

    // ------------------------------------------------------------------
    // Point tallies
    // ------------------------------------------------------------------

    fn decode_tally(bytes: &[u8]) -> Option<i64> {
        let raw: [u8; 8] = bytes.try_into().ok()?;
        Some(i64::from_be_bytes(raw))
    }

    /// Atomically add `delta` to the `(granter, recipient)` tally, creating it
    /// at zero first if absent. Returns the new total.
    pub fn adjust_points(&self, granter: &str, recipient: &str, delta: i64) -> Result<i64, StoreError> {
        let key = Self::pair_key(&Self::nick_key(granter), &Self::nick_key(recipient));
        let updated = self.points.update_and_fetch(key, |old| {
            let current = old.and_then(Self::decode_tally).unwrap_or(0);
            Some(current.saturating_add(delta).to_be_bytes().to_vec())
        })?;
        self.points.flush()?;
        updated
            .as_deref()
            .and_then(Self::decode_tally)
            .ok_or_else(|| StoreError::Corrupt {
                tree: TREE_POINTS,
                detail: format!("tally {} -> {} missing after update", granter, recipient),
            })
    }

    /// Current `(granter, recipient)` tally; zero when never adjusted.
    pub fn points(&self, granter: &str, recipient: &str) -> Result<i64, StoreError> {
        let key = Self::pair_key(&Self::nick_key(granter), &Self::nick_key(recipient));
        match self.points.get(key)? {
            None => Ok(0),
            Some(bytes) => Self::decode_tally(&bytes).ok_or_else(|| StoreError::Corrupt {
                tree: TREE_POINTS,
                detail: format!("tally {} -> {} has {} bytes", granter, recipient, bytes.len()),
            }),
        }
    }

    /// Write an undecodable value under `nick` in the named tree.
    #[cfg(test)]
    pub(crate) fn insert_garbage(&self, tree: &str, nick: &str) -> Result<(), StoreError> {
        let target = match tree {
            TREE_BADGES => &self.badges,
            TREE_HUNTS => &self.hunts,
            TREE_TELLS => &self.tells,
            _ => &self.points,
        };
        target.insert(Self::sequenced_key(nick, u64::MAX), &b"\xff"[..])?;
        Ok(())
    }
}
