//! Channel command parser.
//!
//! Commands are only recognised when the line starts with the configured prefix
//! (default `;`) so ordinary conversation never triggers a reply. The keyword that
//! follows the prefix is matched case-insensitively and must be followed by
//! whitespace or the end of the line.
//!
//! Classification walks [`SHAPES`] in order and the first shape owning the keyword
//! wins. Argument parsing for that shape then yields a typed [`Command`] or a
//! [`ParseFailure`] describing what was missing.
//!
//! Parsing is pure: no storage, no clock, no randomness. Badge dates are carried as
//! the raw text the user typed and resolved later by [`super::badges`].
use std::sync::LazyLock;

use log::trace;
use regex::Regex;

use crate::storage::HuntAction;

/// Prefix characters an operator may configure.
pub const ALLOWED_PREFIXES: &[char] = &[';', '!', '^', '.', '$', '~', '+'];
pub const DEFAULT_PREFIX: char = ';';

/// Reply used when `ask` has nothing to choose from.
pub const ASK_NEUTRAL_REPLY: &str = "perhaps";

static NAME_FLAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"-name="([^"]+)""#).expect("valid regex"));
static DATE_FLAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"-date="([^"]+)""#).expect("valid regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shape {
    Weather,
    Ask,
    HuntClaim,
    HuntScore,
    Tell,
    Points,
    Badge,
    Help,
}

/// Ordered command shapes and the keywords that select them.
const SHAPES: &[(Shape, &[&str])] = &[
    (Shape::Weather, &["weather"]),
    (Shape::Ask, &["ask"]),
    (Shape::HuntClaim, &["bef", "bang"]),
    (Shape::HuntScore, &["huntscore"]),
    (Shape::Tell, &["tell"]),
    (Shape::Points, &["addpoint", "ap", "rmpoint", "rp"]),
    (Shape::Badge, &["badge", "badges"]),
    (Shape::Help, &["help"]),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointDirection {
    Add,
    Remove,
}

impl PointDirection {
    pub fn delta(self) -> i64 {
        match self {
            PointDirection::Add => 1,
            PointDirection::Remove => -1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BadgeCommand {
    Add { name: String, raw_date: String },
    Delete { name: String },
    Show,
}

/// Which badge action a missing `-name` belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BadgeAction {
    Add,
    Delete,
}

/// Malformed command syntax. Reported inline to the sender, never logged as an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseFailure {
    WeatherUsage,
    HuntUsage,
    TellUsage,
    PointsUsage(PointDirection),
    BadgeMissingName(BadgeAction),
    BadgeMissingDate,
}

impl ParseFailure {
    /// Human readable hint, rendered with the active prefix.
    pub fn usage(&self, p: char) -> String {
        match self {
            ParseFailure::WeatherUsage => format!("Usage: {p}weather <location>"),
            ParseFailure::HuntUsage => format!("Usage: {p}bef | {p}bang"),
            ParseFailure::TellUsage => format!("Usage: {p}tell <username> <message>"),
            ParseFailure::PointsUsage(PointDirection::Add) => format!("Usage: {p}addpoint <username>"),
            ParseFailure::PointsUsage(PointDirection::Remove) => format!("Usage: {p}rmpoint <username>"),
            ParseFailure::BadgeMissingName(BadgeAction::Add) => {
                format!("Missing -name=\"...\" for badge add. Usage: {p}badge -add -name=\"X\" -date=\"today\"")
            }
            ParseFailure::BadgeMissingName(BadgeAction::Delete) => {
                format!("Missing -name=\"...\" for badge delete. Usage: {p}badge -delete -name=\"X\"")
            }
            ParseFailure::BadgeMissingDate => format!(
                "Missing -date=\"...\" for badge add (today, N days ago, or RFC 3339). Usage: {p}badge -add -name=\"X\" -date=\"today\""
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Weather(String),
    /// Cleaned options; empty means "no usable ` or ` split".
    Ask(Vec<String>),
    HuntClaim(HuntAction),
    HuntScore,
    Tell { recipient: String, body: String },
    Points { direction: PointDirection, target: String },
    Badge(BadgeCommand),
    Help,
    Invalid(ParseFailure),
    /// Prefixed text whose keyword matches no shape.
    Unrecognized(String),
    /// Plain conversation without the command prefix.
    Chatter,
}

pub struct CommandParser {
    prefix: char,
}

impl CommandParser {
    pub fn new() -> Self {
        Self { prefix: DEFAULT_PREFIX }
    }

    /// Build a parser for a configured prefix. Anything outside
    /// [`ALLOWED_PREFIXES`] falls back to `;`.
    pub fn new_with_prefix(prefix: Option<&str>) -> Self {
        let prefix = prefix
            .and_then(|p| {
                let mut chars = p.trim().chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) if ALLOWED_PREFIXES.contains(&c) => Some(c),
                    _ => None,
                }
            })
            .unwrap_or(DEFAULT_PREFIX);
        Self { prefix }
    }

    pub fn prefix(&self) -> char {
        self.prefix
    }

    pub fn parse(&self, raw: &str) -> Command {
        let trimmed = raw.trim();
        let Some(body) = trimmed.strip_prefix(self.prefix) else {
            return Command::Chatter;
        };
        let (keyword, rest) = match body.split_once(char::is_whitespace) {
            Some((k, r)) => (k, r.trim()),
            None => (body, ""),
        };
        let Some(shape) = classify(keyword) else {
            trace!("No command shape for keyword '{}'", keyword);
            return Command::Unrecognized(keyword.to_string());
        };
        trace!("Parsed {:?} from '{}'", shape, raw);
        match shape {
            Shape::Weather => {
                if rest.is_empty() {
                    Command::Invalid(ParseFailure::WeatherUsage)
                } else {
                    Command::Weather(rest.to_string())
                }
            }
            Shape::Ask => Command::Ask(parse_ask_options(rest)),
            Shape::HuntClaim => {
                if !rest.is_empty() {
                    return Command::Invalid(ParseFailure::HuntUsage);
                }
                if keyword.eq_ignore_ascii_case("bef") {
                    Command::HuntClaim(HuntAction::Befriend)
                } else {
                    Command::HuntClaim(HuntAction::Shoot)
                }
            }
            Shape::HuntScore => Command::HuntScore,
            Shape::Tell => match rest.split_once(char::is_whitespace) {
                Some((recipient, body)) if !body.trim().is_empty() => Command::Tell {
                    recipient: recipient.to_string(),
                    body: body.trim().to_string(),
                },
                _ => Command::Invalid(ParseFailure::TellUsage),
            },
            Shape::Points => {
                let direction = if keyword.eq_ignore_ascii_case("addpoint") || keyword.eq_ignore_ascii_case("ap") {
                    PointDirection::Add
                } else {
                    PointDirection::Remove
                };
                match rest.split_whitespace().next() {
                    Some(target) => Command::Points {
                        direction,
                        target: target.to_string(),
                    },
                    None => Command::Invalid(ParseFailure::PointsUsage(direction)),
                }
            }
            Shape::Badge => match parse_badge_args(rest) {
                Ok(cmd) => Command::Badge(cmd),
                Err(failure) => Command::Invalid(failure),
            },
            Shape::Help => Command::Help,
        }
    }
}

impl Default for CommandParser {
    fn default() -> Self {
        Self::new()
    }
}

fn classify(keyword: &str) -> Option<Shape> {
    SHAPES
        .iter()
        .find(|(_, aliases)| aliases.iter().any(|a| a.eq_ignore_ascii_case(keyword)))
        .map(|(shape, _)| *shape)
}

/// Split `A or B [or C...]` into trimmed, non-empty options.
/// Text without the literal ` or ` separator yields no options.
pub fn parse_ask_options(raw: &str) -> Vec<String> {
    let raw = raw.trim();
    if !raw.contains(" or ") {
        return Vec::new();
    }
    raw.split(" or ")
        .map(str::trim)
        .filter(|opt| !opt.is_empty())
        .map(str::to_string)
        .collect()
}

fn has_marker(args: &str, marker: &str) -> bool {
    let dashed = format!("-{marker}");
    args.split_whitespace().any(|word| word.eq_ignore_ascii_case(&dashed))
        || args
            .split_whitespace()
            .next()
            .is_some_and(|word| word.eq_ignore_ascii_case(marker))
}

fn flag_value(re: &Regex, args: &str) -> Option<String> {
    re.captures(args).and_then(|c| c.get(1)).map(|m| m.as_str().to_string())
}

/// Badge sub-grammar. `-add` takes precedence over `-delete`; neither means Show.
pub fn parse_badge_args(args: &str) -> Result<BadgeCommand, ParseFailure> {
    if has_marker(args, "add") {
        let name = flag_value(&NAME_FLAG, args).ok_or(ParseFailure::BadgeMissingName(BadgeAction::Add))?;
        let raw_date = flag_value(&DATE_FLAG, args).ok_or(ParseFailure::BadgeMissingDate)?;
        return Ok(BadgeCommand::Add { name, raw_date });
    }
    if has_marker(args, "delete") {
        let name = flag_value(&NAME_FLAG, args).ok_or(ParseFailure::BadgeMissingName(BadgeAction::Delete))?;
        return Ok(BadgeCommand::Delete { name });
    }
    Ok(BadgeCommand::Show)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_prefix_falls_back_to_semicolon() {
        assert_eq!(CommandParser::new_with_prefix(Some("#")).prefix(), ';');
        assert_eq!(CommandParser::new_with_prefix(Some("!!")).prefix(), ';');
        assert_eq!(CommandParser::new_with_prefix(Some("!")).prefix(), '!');
        assert_eq!(CommandParser::new_with_prefix(None).prefix(), ';');
    }

    #[test]
    fn every_shape_keyword_is_unique() {
        let mut seen = std::collections::HashSet::new();
        for (_, aliases) in SHAPES {
            for alias in *aliases {
                assert!(seen.insert(*alias), "duplicate keyword {alias}");
            }
        }
    }

    #[test]
    fn ask_options_are_cleaned() {
        assert_eq!(parse_ask_options("tea or coffee"), vec!["tea", "coffee"]);
        assert!(parse_ask_options("tea").is_empty());
        assert!(parse_ask_options("tea or  ").is_empty());
        assert_eq!(parse_ask_options("a or  or b"), vec!["a", "b"]);
    }

    #[test]
    fn badge_add_precedes_delete() {
        let cmd = parse_badge_args(r#"-add -delete -name="X" -date="today""#).unwrap();
        assert_eq!(
            cmd,
            BadgeCommand::Add {
                name: "X".into(),
                raw_date: "today".into()
            }
        );
    }
}
