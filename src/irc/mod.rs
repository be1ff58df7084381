//! # IRC transport
//!
//! A thin client: one TCP connection, one reader task and one writer task.
//!
//! ```text
//!   TcpStream ──read half──→ IrcReader ──IrcEvent──→ server loop
//!       ↑                        │ PING
//!       │                        ↓
//!   write half ←── IrcWriter ←── IrcCommand ←── server loop / replies
//! ```
//!
//! The reader answers `PING` itself so keepalives never wait behind chat
//! handling. The writer is the only owner of the socket's write half and paces
//! `PRIVMSG` lines by `min_send_gap_ms` so bursts of replies do not trip the
//! server's flood protection. There is no reconnect: when the socket closes the
//! reader emits [`IrcEvent::Closed`] and exits.

pub mod message;

use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use log::{debug, info, trace, warn};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::timeout;

use crate::config::IrcConfig;
use crate::logutil::escape_log;

pub use message::{IrcCommand, IrcMessage};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_LINE_BYTES: usize = 8 * 1024;

/// What the server loop needs to know about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IrcEvent {
    /// Registration finished (numeric 001).
    Welcome,
    Joined { channel: String, nick: String },
    Message { sender: String, target: String, text: String },
    Closed,
}

impl IrcEvent {
    /// Map a server line to an event. `PING` and everything uninteresting map
    /// to `None`.
    pub fn from_message(msg: &IrcMessage) -> Option<Self> {
        match msg.command.as_str() {
            "001" => Some(IrcEvent::Welcome),
            "JOIN" => Some(IrcEvent::Joined {
                channel: msg.param(0)?.to_string(),
                nick: msg.nick()?.to_string(),
            }),
            "PRIVMSG" => Some(IrcEvent::Message {
                sender: msg.nick()?.to_string(),
                target: msg.param(0)?.to_string(),
                text: msg.param(1)?.to_string(),
            }),
            _ => None,
        }
    }
}

/// Cloneable sending side of a connection.
#[derive(Debug, Clone)]
pub struct IrcClient {
    commands: mpsc::UnboundedSender<IrcCommand>,
}

impl IrcClient {
    pub fn new(commands: mpsc::UnboundedSender<IrcCommand>) -> Self {
        Self { commands }
    }

    pub fn send(&self, command: IrcCommand) -> Result<()> {
        self.commands
            .send(command)
            .map_err(|e| anyhow!("IRC writer is gone, dropped {}", e.0))
    }

    pub fn privmsg(&self, target: &str, text: &str) -> Result<()> {
        self.send(IrcCommand::Privmsg {
            target: target.to_string(),
            text: text.to_string(),
        })
    }
}

/// Connect to `cfg.server`, register as `nickname`, and start the reader and
/// writer tasks.
pub async fn connect(cfg: &IrcConfig, nickname: &str) -> Result<(IrcClient, mpsc::UnboundedReceiver<IrcEvent>)> {
    info!("Connecting to {}", cfg.server);
    let stream = timeout(CONNECT_TIMEOUT, TcpStream::connect(&cfg.server))
        .await
        .map_err(|_| anyhow!("Timed out connecting to {}", cfg.server))?
        .map_err(|e| anyhow!("Failed to connect to {}: {}", cfg.server, e))?;
    let (read_half, write_half) = stream.into_split();

    let (command_tx, command_rx) = mpsc::unbounded_channel();
    let (event_tx, event_rx) = mpsc::unbounded_channel();

    let writer = IrcWriter::new(write_half, command_rx, Duration::from_millis(cfg.min_send_gap_ms));
    tokio::spawn(async move {
        if let Err(e) = writer.run().await {
            warn!("IRC writer stopped: {}", e);
        }
    });
    let reader = IrcReader::new(read_half, event_tx, command_tx.clone());
    tokio::spawn(reader.run());

    let client = IrcClient::new(command_tx);
    client.send(IrcCommand::Nick(nickname.to_string()))?;
    client.send(IrcCommand::User {
        username: nickname.to_string(),
        realname: nickname.to_string(),
    })?;
    Ok((client, event_rx))
}

/// Reads server lines, answers keepalives, and forwards events.
pub struct IrcReader<R> {
    reader: BufReader<R>,
    events: mpsc::UnboundedSender<IrcEvent>,
    commands: mpsc::UnboundedSender<IrcCommand>,
}

impl<R: AsyncRead + Unpin> IrcReader<R> {
    pub fn new(
        read_half: R,
        events: mpsc::UnboundedSender<IrcEvent>,
        commands: mpsc::UnboundedSender<IrcCommand>,
    ) -> Self {
        Self {
            reader: BufReader::new(read_half),
            events,
            commands,
        }
    }

    pub async fn run(mut self) {
        let mut buf = Vec::with_capacity(512);
        // Set while skipping the rest of a line that went past MAX_LINE_BYTES.
        let mut discarding = false;
        loop {
            buf.clear();
            let read = (&mut self.reader)
                .take(MAX_LINE_BYTES as u64 + 1)
                .read_until(b'\n', &mut buf)
                .await;
            match read {
                Ok(0) => {
                    info!("IRC connection closed by server");
                    break;
                }
                Ok(_) => {}
                Err(e) => {
                    warn!("IRC read error: {}", e);
                    break;
                }
            }
            let terminated = buf.last() == Some(&b'\n');
            if discarding {
                discarding = !terminated;
                continue;
            }
            if buf.len() > MAX_LINE_BYTES {
                warn!("Dropping oversized IRC line (over {} bytes)", MAX_LINE_BYTES);
                discarding = !terminated;
                continue;
            }
            let line = String::from_utf8_lossy(&buf);
            trace!("<< {}", escape_log(line.trim_end()));
            let Some(msg) = IrcMessage::parse(&line) else {
                continue;
            };
            if msg.command == "PING" {
                let token = msg.param(0).unwrap_or_default().to_string();
                if self.commands.send(IrcCommand::Pong(token)).is_err() {
                    break;
                }
                continue;
            }
            if msg.command == "ERROR" {
                warn!("Server error: {}", escape_log(msg.param(0).unwrap_or_default()));
            }
            if let Some(event) = IrcEvent::from_message(&msg) {
                if self.events.send(event).is_err() {
                    debug!("Event receiver dropped; stopping IRC reader");
                    return;
                }
            }
        }
        let _ = self.events.send(IrcEvent::Closed);
    }
}

/// Sole owner of the write half. Serialises commands and paces chat lines.
pub struct IrcWriter<W> {
    write_half: W,
    commands: mpsc::UnboundedReceiver<IrcCommand>,
    min_send_gap: Duration,
    last_privmsg: Option<Instant>,
}

impl<W: AsyncWrite + Unpin> IrcWriter<W> {
    pub fn new(write_half: W, commands: mpsc::UnboundedReceiver<IrcCommand>, min_send_gap: Duration) -> Self {
        Self {
            write_half,
            commands,
            min_send_gap,
            last_privmsg: None,
        }
    }

    pub async fn run(mut self) -> Result<()> {
        while let Some(command) = self.commands.recv().await {
            if command.is_privmsg() {
                if let Some(last) = self.last_privmsg {
                    let elapsed = last.elapsed();
                    if elapsed < self.min_send_gap {
                        tokio::time::sleep(self.min_send_gap - elapsed).await;
                    }
                }
                self.last_privmsg = Some(Instant::now());
            }
            trace!(">> {}", escape_log(&command.to_string()));
            let mut line = command.to_line();
            line.push_str("\r\n");
            self.write_half.write_all(line.as_bytes()).await?;
            self.write_half.flush().await?;
            if matches!(command, IrcCommand::Quit(_)) {
                break;
            }
        }
        self.write_half.shutdown().await.ok();
        Ok(())
    }
}
