//! Creature hunt mini-game.
//!
//! Overview
//! - A creature from [`CreatureKind::ALL`] periodically appears in the channel
//! - The first player to `bef` (befriend) or `bang` (shoot) it claims it; everyone
//!   after that is told there is nothing to claim
//! - Every claim appends a [`HuntRecord`]; lifetime totals are counted from those
//!
//! Concurrency
//! - [`HuntState`] lives behind a single `std::sync::Mutex`. It is held only for the
//!   O(1) check-and-set in [`HuntEngine::claim`] and the overwrite in
//!   [`HuntEngine::spawn_kind`], never across storage or channel I/O.
//! - Recording a win happens after the lock is released. A crash between the two
//!   loses that one record; the hot path never waits on disk.
//! - The spawn cycle is one long-lived task: sleep a random delay, spawn, repeat.
//!   A failed announcement is logged and the loop carries on.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use log::{debug, info, warn};
use rand::Rng;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::HuntConfig;
use crate::logutil::escape_log;
use crate::storage::{BotStore, HuntAction, HuntRecord, HuntStats, StoreError};

// IRC formatting control codes
const BROWN: &str = "\x0305";
const PINK: &str = "\x0313";
const BOLD: &str = "\x02";
const RESET: &str = "\x0f";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CreatureKind {
    Duck,
    Pig,
    Seal,
    Mouse,
    Shark,
}

impl CreatureKind {
    pub const ALL: [CreatureKind; 5] = [
        CreatureKind::Duck,
        CreatureKind::Pig,
        CreatureKind::Seal,
        CreatureKind::Mouse,
        CreatureKind::Shark,
    ];

    pub fn name(self) -> &'static str {
        match self {
            CreatureKind::Duck => "duck",
            CreatureKind::Pig => "pig",
            CreatureKind::Seal => "seal",
            CreatureKind::Mouse => "mouse",
            CreatureKind::Shark => "shark",
        }
    }

    /// Announcement line, with IRC colour codes.
    pub fn sound(self) -> String {
        match self {
            CreatureKind::Duck => format!("{BROWN}(o)<  ・゜゜・。。・゜゜HONK{RESET}"),
            CreatureKind::Pig => format!("{BROWN}~~(_ _)^{PINK}:{BROWN} OINK{RESET}"),
            CreatureKind::Seal => format!("{BOLD}(ᵔᴥᵔ) BARK{RESET}"),
            CreatureKind::Mouse => format!("{BROWN}<:3)~ SQEEK{RESET}"),
            CreatureKind::Shark => format!("{BOLD}____/\\_______\\o/___ AHHHH! SHARK{RESET}"),
        }
    }

    fn random() -> Self {
        let idx = rand::thread_rng().gen_range(0..Self::ALL.len());
        Self::ALL[idx]
    }
}

/// The single shared piece of game state. `claimed` only exists while a
/// creature is present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HuntState {
    #[default]
    Absent,
    Present { kind: CreatureKind, claimed: bool },
}

impl HuntState {
    pub fn is_claimable(&self) -> bool {
        matches!(self, HuntState::Present { claimed: false, .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimOutcome {
    /// No live unclaimed creature: someone was faster or nothing spawned.
    NothingToClaim,
    Claimed {
        kind: CreatureKind,
        action: HuntAction,
        stats: HuntStats,
    },
}

/// Delay window between spawns.
#[derive(Debug, Clone, Copy)]
pub struct SpawnTiming {
    pub min_delay: Duration,
    pub max_delay: Duration,
    /// When set, every delay is exactly this long.
    pub fixed_delay: Option<Duration>,
}

impl SpawnTiming {
    pub fn from_config(cfg: &HuntConfig) -> Self {
        Self {
            min_delay: Duration::from_secs(cfg.min_delay_secs),
            max_delay: Duration::from_secs(cfg.max_delay_secs),
            fixed_delay: cfg.debug.then(|| Duration::from_secs(cfg.debug_delay_secs)),
        }
    }

    /// Uniform in `[min_delay, max_delay)`, or the fixed delay.
    pub fn next_delay(&self) -> Duration {
        if let Some(fixed) = self.fixed_delay {
            return fixed;
        }
        if self.max_delay <= self.min_delay {
            return self.min_delay;
        }
        rand::thread_rng().gen_range(self.min_delay..self.max_delay)
    }
}

pub struct HuntEngine {
    state: Mutex<HuntState>,
    cycle_started: AtomicBool,
    store: BotStore,
    outgoing: mpsc::UnboundedSender<String>,
    timing: SpawnTiming,
}

impl HuntEngine {
    pub fn new(store: BotStore, outgoing: mpsc::UnboundedSender<String>, timing: SpawnTiming) -> Self {
        Self {
            state: Mutex::new(HuntState::Absent),
            cycle_started: AtomicBool::new(false),
            store,
            outgoing,
            timing,
        }
    }

    // The state is plain data and every critical section leaves it valid, so a
    // poisoned lock is still safe to use.
    fn lock(&self) -> MutexGuard<'_, HuntState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn snapshot(&self) -> HuntState {
        *self.lock()
    }

    /// Spawn a random creature and announce it.
    pub fn spawn(&self) -> CreatureKind {
        let kind = CreatureKind::random();
        self.spawn_kind(kind);
        kind
    }

    /// Replace whatever is in the channel with a fresh, unclaimed `kind`.
    pub fn spawn_kind(&self, kind: CreatureKind) {
        {
            let mut state = self.lock();
            *state = HuntState::Present { kind, claimed: false };
        }
        let sound = kind.sound();
        info!("Spawned a {}: {}", kind.name(), escape_log(&sound));
        if self.outgoing.send(sound).is_err() {
            warn!("Outgoing channel closed; {} announcement dropped", kind.name());
        }
    }

    /// Try to claim the live creature for `actor`.
    ///
    /// Exactly one caller wins per spawn. Losing is a normal outcome, not an error.
    /// The error case only covers recording the win or reading stats back.
    pub fn claim(&self, actor: &str, action: HuntAction) -> Result<ClaimOutcome, StoreError> {
        let kind = {
            let mut state = self.lock();
            match *state {
                HuntState::Present { kind, claimed: false } => {
                    *state = HuntState::Present { kind, claimed: true };
                    kind
                }
                _ => {
                    debug!("{} tried to {} but nothing is claimable", actor, action.as_str());
                    return Ok(ClaimOutcome::NothingToClaim);
                }
            }
        };
        self.store.record_hunt(&HuntRecord::new(actor, kind.name(), action))?;
        let stats = self.store.hunt_stats(actor)?;
        info!(
            "{} {} the {} ({} so far)",
            actor,
            action.past_tense(),
            kind.name(),
            stats.count(action)
        );
        Ok(ClaimOutcome::Claimed { kind, action, stats })
    }

    pub fn stats(&self, actor: &str) -> Result<HuntStats, StoreError> {
        self.store.hunt_stats(actor)
    }

    /// Start the self-rescheduling spawn loop. Only the first call per engine
    /// starts anything; later calls return `None`. With `spawn_now` a creature
    /// appears immediately before the first delay.
    pub fn start_cycle(self: &Arc<Self>, spawn_now: bool) -> Option<JoinHandle<()>> {
        if self.cycle_started.swap(true, Ordering::SeqCst) {
            debug!("Spawn cycle already running");
            return None;
        }
        if spawn_now {
            self.spawn();
        }
        let engine = Arc::clone(self);
        Some(tokio::spawn(async move {
            loop {
                let delay = engine.timing.next_delay();
                debug!("Next creature in {}s", delay.as_secs());
                tokio::time::sleep(delay).await;
                engine.spawn();
            }
        }))
    }
}
