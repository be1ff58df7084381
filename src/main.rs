//! Binary entrypoint for the shalebot CLI.
//!
//! Commands:
//! - `start` - connect to IRC and run the bot
//! - `init` - write a starter `shalebot.toml`
//! - `stats <nick> [--json]` - print stored badge, hunt and tell totals for a nick
//!
//! See the library crate docs for module-level details: `shalebot::`.
use anyhow::Result;
use clap::{Parser, Subcommand};
use log::info;

use shalebot::bot::BotServer;
use shalebot::config::Config;
use shalebot::storage::BotStore;

#[derive(Parser)]
#[command(name = "shalebot")]
#[command(about = "An IRC channel bot with a creature hunt, tells, points and badges")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (can be used before or after subcommand)
    #[arg(short, long, default_value = "shalebot.toml", global = true)]
    config: String,

    /// Verbose logging (-v, -vv for more; may appear before or after subcommand)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect and run the bot
    Start,
    /// Write a default configuration file
    Init,
    /// Show stored totals for a nick
    Stats {
        /// Nick to look up (case-insensitive)
        nick: String,
        /// Print a JSON object instead of text
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Init => {
            init_logging(None, cli.verbose);
            if std::path::Path::new(&cli.config).exists() {
                println!("{} already exists; not overwriting.", cli.config);
                return Ok(());
            }
            Config::create_default(&cli.config).await?;
            println!("Wrote default configuration to {}", cli.config);
            println!("Edit the [irc] section, then run: shalebot start");
        }
        Commands::Start => {
            let config = Config::load_or_default(&cli.config).await?;
            init_logging(Some(&config), cli.verbose);
            config.validate()?;
            info!("Starting shalebot v{}", env!("CARGO_PKG_VERSION"));
            let mut server = BotServer::new(config)?;
            server.run().await?;
        }
        Commands::Stats { nick, json } => {
            let config = Config::load_or_default(&cli.config).await?;
            init_logging(Some(&config), cli.verbose);
            let store = BotStore::open(&config.storage.data_dir)?;
            let hunts = store.hunt_stats(&nick)?;
            let badges = store.list_badges(&nick)?;
            let pending = store.pending_tell_count(&nick)?;
            if json {
                let payload = serde_json::json!({
                    "nick": nick,
                    "befriended": hunts.befriended,
                    "shot": hunts.shot,
                    "badges": badges
                        .iter()
                        .map(|b| serde_json::json!({ "name": b.name, "date": b.date }))
                        .collect::<Vec<_>>(),
                    "pending_tells": pending,
                });
                println!("{}", payload);
                return Ok(());
            }
            println!("{}", nick);
            println!("  befriended: {}", hunts.befriended);
            println!("  shot:       {}", hunts.shot);
            println!("  badges:     {}", badges.len());
            for badge in &badges {
                println!("    {} ({})", badge.name, badge.date);
            }
            println!("  tells waiting: {}", pending);
        }
    }

    Ok(())
}

fn init_logging(config: Option<&Config>, verbosity: u8) {
    use std::io::Write;
    let mut builder = env_logger::Builder::new();
    let configured = config.and_then(|c| c.logging.level.parse::<log::LevelFilter>().ok());
    // CLI verbosity wins over the configured level
    let base_level = match verbosity {
        0 => configured.unwrap_or(log::LevelFilter::Info),
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    builder.filter_level(base_level);
    // sled is chatty at debug
    builder.filter_module("sled", log::LevelFilter::Warn);

    let log_file = config
        .and_then(|c| c.logging.file.as_deref())
        .and_then(|path| std::fs::OpenOptions::new().create(true).append(true).open(path).ok());

    if let Some(f) = log_file {
        let write_mutex = std::sync::Arc::new(std::sync::Mutex::new(f));
        // Echo to the console only in the foreground
        let is_tty = atty::is(atty::Stream::Stdout);
        builder.format(move |fmt, record| {
            let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
            let line = format!("{} [{}] {}", ts, record.level(), record.args());
            if let Ok(mut guard) = write_mutex.lock() {
                let _ = writeln!(guard, "{}", line);
            }
            if is_tty {
                writeln!(fmt, "{}", line)
            } else {
                Ok(())
            }
        });
    } else {
        builder.format(|fmt, record| {
            writeln!(
                fmt,
                "{} [{}] {}",
                chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ"),
                record.level(),
                record.args()
            )
        });
    }
    let _ = builder.try_init();
}
