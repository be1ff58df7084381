//! Channel bot: command parsing, routing, and the features behind each command.
//!
//! - [`commands`]: prefix + keyword grammar to a typed [`commands::Command`]
//! - [`dispatch`]: per-message routing, tell delivery first
//! - [`hunt`]: the creature mini-game and its spawn cycle
//! - [`badges`] / [`ask`]: small helpers for their commands
//! - `weather`: OpenWeatherMap lookups (feature `weather`)
//! - [`server`]: event loop tying the IRC connection to the dispatcher

pub mod ask;
pub mod badges;
pub mod commands;
pub mod dispatch;
pub mod hunt;
pub mod server;
#[cfg(feature = "weather")]
pub mod weather;

pub use dispatch::Dispatcher;
pub use server::BotServer;
