//! # Shalebot - IRC channel bot
//!
//! Shalebot sits in one IRC channel and answers a small prefixed command set.
//!
//! ## Features
//!
//! - **Creature hunt**: a random creature appears every few minutes; the first
//!   `bef` or `bang` claims it, with lifetime tallies per nick.
//! - **Tells**: leave a message for someone, delivered the next time they speak.
//! - **Points and badges**: per-pair reputation tallies and dated badges.
//! - **Weather and ask**: OpenWeatherMap lookups and a random picker.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use shalebot::bot::BotServer;
//! use shalebot::config::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load_or_default("shalebot.toml").await?;
//!     config.validate()?;
//!     let mut server = BotServer::new(config)?;
//!     server.run().await
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`bot`] - command parsing, dispatch, hunt engine, weather, event loop
//! - [`irc`] - TCP connection, line protocol, reader and writer tasks
//! - [`storage`] - sled-backed badges, hunts, tells and points
//! - [`config`] - TOML configuration with environment overrides
//! - [`logutil`] - log escaping and IRC formatting helpers
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │   IRC client    │ ← connection, PING/PONG, pacing
//! └─────────────────┘
//!          │
//! ┌─────────────────┐
//! │   Bot server    │ ← dispatcher + hunt engine
//! └─────────────────┘
//!          │
//! ┌─────────────────┐
//! │   Storage       │ ← sled trees
//! └─────────────────┘
//! ```

pub mod bot;
pub mod config;
pub mod irc;
pub mod logutil;
pub mod storage;
