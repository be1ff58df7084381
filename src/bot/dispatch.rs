//! Per-message entry point.
//!
//! Every channel line goes through [`Dispatcher::handle_message`]:
//!
//! 1. Deliver any tells waiting for the sender, whatever the line says.
//! 2. Parse the line with [`CommandParser`] and route the typed [`Command`].
//!
//! Everything except weather is handled synchronously, so replies for those
//! commands leave in arrival order. Weather lookups run on their own task and
//! may reply after later commands. Per-message failures always end as a chat
//! reply; nothing propagates out of here.

use std::sync::Arc;

use chrono::Utc;
use log::{debug, error, info, warn};
use tokio::sync::mpsc;

use super::ask;
use super::badges::{format_badge_list, resolve_date};
use super::commands::{BadgeCommand, Command, CommandParser, PointDirection};
use super::hunt::{ClaimOutcome, HuntEngine};
#[cfg(feature = "weather")]
use super::weather::WeatherService;
use crate::config::Config;
use crate::logutil::{escape_log, strip_formatting};
use crate::storage::{BotStore, HuntAction, StoreError};

pub struct Dispatcher {
    parser: CommandParser,
    store: BotStore,
    hunt: Arc<HuntEngine>,
    #[cfg(feature = "weather")]
    weather: WeatherService,
    outgoing: mpsc::UnboundedSender<String>,
}

impl Dispatcher {
    pub fn new(
        config: &Config,
        store: BotStore,
        hunt: Arc<HuntEngine>,
        outgoing: mpsc::UnboundedSender<String>,
    ) -> Self {
        Self {
            parser: CommandParser::new_with_prefix(Some(&config.bot.command_prefix)),
            store,
            hunt,
            #[cfg(feature = "weather")]
            weather: WeatherService::new(config.weather.clone()),
            outgoing,
        }
    }

    pub fn prefix(&self) -> char {
        self.parser.prefix()
    }

    /// Handle one channel line from `sender`.
    pub fn handle_message(&self, sender: &str, raw: &str) {
        let text = strip_formatting(raw);
        self.deliver_tells(sender);

        let command = self.parser.parse(&text);
        if command != Command::Chatter {
            debug!("{} -> {:?}", sender, command);
        }
        let p = self.prefix();
        match command {
            Command::Chatter => {}
            Command::Weather(location) => self.lookup_weather(location),
            Command::Ask(options) => self.reply(ask::choose(&options)),
            Command::HuntClaim(action) => self.respond(self.claim(sender, action)),
            Command::HuntScore => self.respond(self.hunt_score(sender)),
            Command::Tell { recipient, body } => self.respond(self.tell(sender, &recipient, &body)),
            Command::Points { direction, target } => {
                self.respond(self.adjust_points(sender, direction, &target))
            }
            Command::Badge(badge) => self.respond(self.badge(sender, badge)),
            Command::Help => self.reply(&help_text(p)),
            Command::Invalid(failure) => self.reply(&failure.usage(p)),
            Command::Unrecognized(keyword) => self.reply(&format!(
                "{}: unrecognized command '{}{}'. Try {}help.",
                sender, p, keyword, p
            )),
        }
    }

    fn reply(&self, text: &str) {
        if self.outgoing.send(text.to_string()).is_err() {
            warn!("Outgoing channel closed; dropped reply: {}", escape_log(text));
        }
    }

    fn respond(&self, result: Result<String, StoreError>) {
        match result {
            Ok(text) => self.reply(&text),
            Err(e) => {
                error!("Storage failure: {}", e);
                self.reply(&format!("Database error: {}", e));
            }
        }
    }

    fn deliver_tells(&self, recipient: &str) {
        match self.store.take_tells(recipient) {
            Ok(tells) => {
                for tell in tells {
                    info!(
                        "Delivering tell #{} from {} to {} (queued {})",
                        tell.id,
                        tell.sender,
                        recipient,
                        tell.created_at.format("%Y-%m-%dT%H:%M:%SZ")
                    );
                    self.reply(&format!("{}, {} said: {}", recipient, tell.sender, tell.body));
                }
            }
            Err(e) => {
                error!("Failed to load tells for {}: {}", recipient, e);
                self.reply(&format!("Database error: {}", e));
            }
        }
    }

    #[cfg(feature = "weather")]
    fn lookup_weather(&self, location: String) {
        let weather = self.weather.clone();
        let outgoing = self.outgoing.clone();
        tokio::spawn(async move {
            let reply = match weather.lookup(&location).await {
                Ok(summary) => summary,
                Err(e) => {
                    warn!("Weather lookup for '{}' failed: {}", escape_log(&location), e);
                    format!("Could not get weather for '{}': {}", location, e)
                }
            };
            if outgoing.send(reply).is_err() {
                debug!("Outgoing channel closed before weather reply");
            }
        });
    }

    #[cfg(not(feature = "weather"))]
    fn lookup_weather(&self, location: String) {
        self.reply(&format!(
            "Could not get weather for '{}': weather support is not compiled in",
            location
        ));
    }

    fn claim(&self, nick: &str, action: HuntAction) -> Result<String, StoreError> {
        Ok(match self.hunt.claim(nick, action)? {
            ClaimOutcome::NothingToClaim => "There was no animal, sowwy!".to_string(),
            ClaimOutcome::Claimed { kind, action: HuntAction::Befriend, stats } => format!(
                "{} befriended the {}! You have now befriended {} and shot {}.",
                nick,
                kind.name(),
                stats.befriended,
                stats.shot
            ),
            ClaimOutcome::Claimed { kind, action: HuntAction::Shoot, stats } => format!(
                "{} shot the {}! You have now shot {} and befriended {}.",
                nick,
                kind.name(),
                stats.shot,
                stats.befriended
            ),
        })
    }

    fn hunt_score(&self, nick: &str) -> Result<String, StoreError> {
        let stats = self.hunt.stats(nick)?;
        Ok(format!(
            "{}'s hunt stats: befriended {}, shot {}.",
            nick, stats.befriended, stats.shot
        ))
    }

    fn tell(&self, sender: &str, recipient: &str, body: &str) -> Result<String, StoreError> {
        let id = self.store.store_tell(recipient, sender, body)?;
        debug!("Stored tell #{} from {} for {}", id, sender, recipient);
        Ok(format!("Okay, {}. I'll tell {} next time they speak.", sender, recipient))
    }

    fn adjust_points(&self, granter: &str, direction: PointDirection, target: &str) -> Result<String, StoreError> {
        let total = self.store.adjust_points(granter, target, direction.delta())?;
        Ok(format!("{}: You now have {} points for {}.", granter, total, target))
    }

    fn badge(&self, nick: &str, command: BadgeCommand) -> Result<String, StoreError> {
        let now = Utc::now();
        match command {
            BadgeCommand::Add { name, raw_date } => {
                let date = resolve_date(&raw_date, now);
                if self.store.add_badge(nick, &name, &date)? {
                    Ok(format!("User {} added badge '{}'.", nick, name))
                } else {
                    Ok(format!("{}, you already have a badge named '{}'.", nick, name))
                }
            }
            BadgeCommand::Delete { name } => {
                if self.store.delete_badge(nick, &name)? {
                    Ok(format!("User {} deleted their badge '{}'.", nick, name))
                } else {
                    Ok(format!("No badge named '{}' found under your nickname, {}.", name, nick))
                }
            }
            BadgeCommand::Show => {
                let badges = self.store.list_badges(nick)?;
                if badges.is_empty() {
                    Ok(format!("User {} has no badges.", nick))
                } else {
                    Ok(format!("User {}'s badges: {}", nick, format_badge_list(&badges, now)))
                }
            }
        }
    }
}

/// One-line command summary for `help`.
pub fn help_text(p: char) -> String {
    format!(
        "Commands: {p}weather <location> | {p}ask <a> or <b> | {p}bef / {p}bang | {p}huntscore | \
         {p}tell <nick> <message> | {p}addpoint / {p}rmpoint <nick> | \
         {p}badge [-add -name=\"X\" -date=\"today\" | -delete -name=\"X\"]"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bot::hunt::{CreatureKind, SpawnTiming};
    use std::time::Duration;
    use tempfile::TempDir;

    struct Harness {
        _dir: TempDir,
        dispatcher: Dispatcher,
        store: BotStore,
        hunt: Arc<HuntEngine>,
        rx: mpsc::UnboundedReceiver<String>,
    }

    impl Harness {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            let store = BotStore::open(dir.path()).unwrap();
            let (tx, rx) = mpsc::unbounded_channel();
            let timing = SpawnTiming {
                min_delay: Duration::from_secs(60),
                max_delay: Duration::from_secs(120),
                fixed_delay: None,
            };
            let hunt = Arc::new(HuntEngine::new(store.clone(), tx.clone(), timing));
            let dispatcher = Dispatcher::new(&Config::default(), store.clone(), hunt.clone(), tx);
            Self {
                _dir: dir,
                dispatcher,
                store,
                hunt,
                rx,
            }
        }

        fn say(&mut self, nick: &str, text: &str) -> Vec<String> {
            self.dispatcher.handle_message(nick, text);
            let mut out = Vec::new();
            while let Ok(line) = self.rx.try_recv() {
                out.push(line);
            }
            out
        }
    }

    #[test]
    fn chatter_gets_no_reply() {
        let mut h = Harness::new();
        assert!(h.say("alice", "just chatting").is_empty());
    }

    #[test]
    fn tells_arrive_before_the_command_reply() {
        let mut h = Harness::new();
        h.say("alice", ";tell Bob see you at 5");
        let out = h.say("bob", ";huntscore");
        assert_eq!(
            out,
            vec![
                "bob, alice said: see you at 5".to_string(),
                "bob's hunt stats: befriended 0, shot 0.".to_string(),
            ]
        );
        assert_eq!(h.say("bob", "hi"), Vec::<String>::new());
    }

    #[test]
    fn claim_reports_counts() {
        let mut h = Harness::new();
        h.hunt.spawn_kind(CreatureKind::Duck);
        h.rx.try_recv().unwrap();
        assert_eq!(
            h.say("alice", ";bang"),
            vec!["alice shot the duck! You have now shot 1 and befriended 0.".to_string()]
        );
        assert_eq!(h.say("bob", ";bef"), vec!["There was no animal, sowwy!".to_string()]);
    }

    #[test]
    fn storage_failure_is_reported_and_bot_keeps_going() {
        let mut h = Harness::new();
        h.store.insert_garbage("hunts", "alice").unwrap();
        h.hunt.spawn_kind(CreatureKind::Seal);
        h.rx.try_recv().unwrap();

        let out = h.say("alice", ";bang");
        assert_eq!(out.len(), 1);
        assert!(out[0].starts_with("Database error: serialization error: "), "{}", out[0]);

        // The win was decided before the failing read, so the seal stays taken.
        assert_eq!(h.say("bob", ";bef"), vec!["There was no animal, sowwy!".to_string()]);
        assert_eq!(
            h.say("bob", ";huntscore"),
            vec!["bob's hunt stats: befriended 0, shot 0.".to_string()]
        );
        assert!(h.say("alice", ";huntscore")[0].starts_with("Database error: "));
    }

    #[test]
    fn undecodable_tell_is_skipped() {
        let mut h = Harness::new();
        h.say("alice", ";tell bob lunch?");
        h.store.insert_garbage("tells", "bob").unwrap();
        assert_eq!(h.say("bob", "hello"), vec!["bob, alice said: lunch?".to_string()]);
        assert_eq!(h.store.pending_tell_count("bob").unwrap(), 0);
        assert_eq!(h.say("bob", "hello again"), Vec::<String>::new());
    }

    #[test]
    fn extra_text_after_claim_gets_usage() {
        let mut h = Harness::new();
        h.hunt.spawn_kind(CreatureKind::Duck);
        h.rx.try_recv().unwrap();
        assert_eq!(h.say("alice", ";bef now"), vec!["Usage: ;bef | ;bang".to_string()]);
        assert!(h.hunt.snapshot().is_claimable());
    }

    #[test]
    fn formatted_command_is_still_recognised() {
        let mut h = Harness::new();
        let out = h.say("alice", "\x02;huntscore\x0f");
        assert_eq!(out, vec!["alice's hunt stats: befriended 0, shot 0.".to_string()]);
    }

    #[test]
    fn unknown_keyword_gets_neutral_reply() {
        let mut h = Harness::new();
        assert_eq!(
            h.say("alice", ";dance"),
            vec!["alice: unrecognized command ';dance'. Try ;help.".to_string()]
        );
    }

    #[tokio::test]
    async fn weather_without_key_reports_failure() {
        let mut h = Harness::new();
        h.dispatcher.handle_message("alice", ";weather Denver");
        let line = tokio::time::timeout(Duration::from_secs(2), h.rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(line.starts_with("Could not get weather for 'Denver': "), "{line}");
    }
}
