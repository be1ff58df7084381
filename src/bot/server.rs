//! # Bot server
//!
//! Wires storage, the hunt engine, the dispatcher and the IRC connection
//! together and runs the event loop:
//!
//! ```text
//! ┌──────────────┐ IrcEvent  ┌──────────────┐  replies   ┌──────────────┐
//! │  IRC reader  │──────────→│  BotServer   │←───────────│  Dispatcher  │
//! └──────────────┘           │  (select!)   │←───────────│  HuntEngine  │
//!                            └──────┬───────┘ announces  └──────────────┘
//!                                   │ PRIVMSG
//!                                   ↓
//!                            ┌──────────────┐
//!                            │  IRC writer  │
//!                            └──────────────┘
//! ```
//!
//! Replies from the dispatcher, weather tasks and the spawn cycle all travel
//! through one unbounded channel and are forwarded to the configured channel.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use shalebot::bot::BotServer;
//! use shalebot::config::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load_or_default("shalebot.toml").await?;
//!     let mut server = BotServer::new(config)?;
//!     server.run().await
//! }
//! ```

use std::sync::Arc;

use anyhow::{anyhow, Result};
use log::{debug, info};
#[cfg(feature = "weather")]
use log::warn;
use tokio::sync::mpsc;

use super::dispatch::Dispatcher;
use super::hunt::{HuntEngine, SpawnTiming};
use crate::config::Config;
use crate::irc::{self, IrcClient, IrcCommand, IrcEvent};
use crate::logutil::escape_log;
use crate::storage::BotStore;

pub struct BotServer {
    config: Config,
    hunt: Arc<HuntEngine>,
    dispatcher: Dispatcher,
    outgoing_rx: mpsc::UnboundedReceiver<String>,
}

impl BotServer {
    /// Open storage and build the engine. Storage failure is fatal.
    pub fn new(config: Config) -> Result<Self> {
        let store = BotStore::open(&config.storage.data_dir)
            .map_err(|e| anyhow!("Failed to open storage in {}: {}", config.storage.data_dir, e))?;
        let (outgoing_tx, outgoing_rx) = mpsc::unbounded_channel();
        let hunt = Arc::new(HuntEngine::new(
            store.clone(),
            outgoing_tx.clone(),
            SpawnTiming::from_config(&config.hunt),
        ));
        let dispatcher = Dispatcher::new(&config, store, Arc::clone(&hunt), outgoing_tx);
        #[cfg(feature = "weather")]
        if config.weather.api_key.is_empty() {
            warn!("No OWM_API_KEY configured; weather commands will report an error");
        }
        Ok(Self {
            config,
            hunt,
            dispatcher,
            outgoing_rx,
        })
    }

    /// Connect and process events until shutdown or disconnect.
    pub async fn run(&mut self) -> Result<()> {
        let (client, mut events) = irc::connect(&self.config.irc, &self.config.bot.nickname).await?;
        info!(
            "{} connected to {}, waiting for registration",
            self.config.bot.nickname, self.config.irc.server
        );

        loop {
            tokio::select! {
                event = events.recv() => {
                    match event {
                        Some(IrcEvent::Closed) | None => {
                            return Err(anyhow!("Connection to {} closed", self.config.irc.server));
                        }
                        Some(event) => self.handle_event(&client, event)?,
                    }
                }

                line = self.outgoing_rx.recv() => {
                    if let Some(text) = line {
                        client.privmsg(&self.config.irc.channel, &text)?;
                    }
                }

                _ = tokio::signal::ctrl_c() => {
                    info!("Received shutdown signal");
                    let _ = client.send(IrcCommand::Quit("bye".to_string()));
                    // Let the writer flush the QUIT before the runtime goes away.
                    tokio::time::sleep(std::time::Duration::from_millis(200)).await;
                    return Ok(());
                }
            }
        }
    }

    fn handle_event(&self, client: &IrcClient, event: IrcEvent) -> Result<()> {
        match event {
            IrcEvent::Welcome => {
                if let Some(pass) = self.config.irc.nickserv_password.as_deref().filter(|p| !p.is_empty()) {
                    info!("Identifying with NickServ");
                    client.privmsg("NickServ", &format!("IDENTIFY {}", pass))?;
                }
                info!("Joining {}", self.config.irc.channel);
                client.send(IrcCommand::Join(self.config.irc.channel.clone()))?;
            }
            IrcEvent::Joined { channel, nick } => {
                if nick.eq_ignore_ascii_case(&self.config.bot.nickname)
                    && channel.eq_ignore_ascii_case(&self.config.irc.channel)
                {
                    info!("Joined {}", channel);
                    if self.hunt.start_cycle(self.config.hunt.spawn_on_join).is_some() {
                        info!("Creature spawn cycle started");
                    }
                }
            }
            IrcEvent::Message { sender, target, text } => {
                if target.eq_ignore_ascii_case(&self.config.irc.channel) {
                    self.dispatcher.handle_message(&sender, &text);
                } else {
                    debug!("Ignoring message to {} from {}: {}", target, sender, escape_log(&text));
                }
            }
            IrcEvent::Closed => {}
        }
        Ok(())
    }
}
