//! IRC protocol lines (RFC 1459 framing, without IRCv3 tags).

use std::fmt;

/// One parsed line from the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IrcMessage {
    pub prefix: Option<String>,
    pub command: String,
    pub params: Vec<String>,
}

impl IrcMessage {
    /// Parse `[:prefix] COMMAND [params...] [:trailing]`. Leading IRCv3 tags are
    /// skipped. Returns `None` for blank or command-less lines.
    pub fn parse(line: &str) -> Option<Self> {
        let mut rest = line.trim_end_matches(['\r', '\n']).trim_start();
        if rest.starts_with('@') {
            rest = rest.split_once(' ').map(|(_, r)| r.trim_start())?;
        }
        let prefix = match rest.strip_prefix(':') {
            Some(stripped) => {
                let (prefix, r) = stripped.split_once(' ')?;
                rest = r.trim_start();
                Some(prefix.to_string())
            }
            None => None,
        };
        let (head, trailing) = match rest.split_once(" :") {
            Some((head, trailing)) => (head, Some(trailing)),
            None => (rest, None),
        };
        let mut words = head.split_whitespace();
        let command = words.next()?.to_ascii_uppercase();
        let mut params: Vec<String> = words.map(str::to_string).collect();
        if let Some(trailing) = trailing {
            params.push(trailing.to_string());
        }
        Some(Self { prefix, command, params })
    }

    /// Nick part of a `nick!user@host` prefix.
    pub fn nick(&self) -> Option<&str> {
        let prefix = self.prefix.as_deref()?;
        let nick = prefix.split(['!', '@']).next().unwrap_or(prefix);
        (!nick.is_empty()).then_some(nick)
    }

    pub fn param(&self, idx: usize) -> Option<&str> {
        self.params.get(idx).map(String::as_str)
    }
}

/// Commands the bot sends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IrcCommand {
    Nick(String),
    User { username: String, realname: String },
    Privmsg { target: String, text: String },
    Join(String),
    Pong(String),
    Quit(String),
}

impl IrcCommand {
    /// Wire form without the trailing CRLF. Embedded line breaks are removed so
    /// one command can never become two.
    pub fn to_line(&self) -> String {
        match self {
            IrcCommand::Nick(nick) => format!("NICK {}", single_line(nick)),
            IrcCommand::User { username, realname } => {
                format!("USER {} 0 * :{}", single_line(username), single_line(realname))
            }
            IrcCommand::Privmsg { target, text } => {
                format!("PRIVMSG {} :{}", single_line(target), single_line(text))
            }
            IrcCommand::Join(channel) => format!("JOIN {}", single_line(channel)),
            IrcCommand::Pong(token) => format!("PONG :{}", single_line(token)),
            IrcCommand::Quit(reason) => format!("QUIT :{}", single_line(reason)),
        }
    }

    pub fn is_privmsg(&self) -> bool {
        matches!(self, IrcCommand::Privmsg { .. })
    }
}

impl fmt::Display for IrcCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // Never echo credentials into logs.
            IrcCommand::Privmsg { target, .. } if target.eq_ignore_ascii_case("nickserv") => {
                write!(f, "PRIVMSG {} :<redacted>", target)
            }
            other => f.write_str(&other.to_line()),
        }
    }
}

fn single_line(s: &str) -> String {
    s.chars().filter(|c| *c != '\r' && *c != '\n').collect()
}
