//! Helpers for putting untrusted chat text into logs and into the parser.
//!
//! Channel lines can carry newlines smuggled through bridges and mIRC
//! formatting codes (bold, colour, reset). Logs get both escaped so every
//! record stays on one line; the parser gets formatting stripped so a bold
//! `;help` still reads as a command.

use std::fmt::Write;

const MAX_PREVIEW: usize = 300;

const BOLD: char = '\x02';
const COLOR: char = '\x03';
const HEX_COLOR: char = '\x04';
const RESET: char = '\x0f';
const MONOSPACE: char = '\x11';
const REVERSE: char = '\x16';
const ITALIC: char = '\x1d';
const STRIKETHROUGH: char = '\x1e';
const UNDERLINE: char = '\x1f';

/// Escape a string for single-line logging:
/// - `\n` => `\\n`
/// - `\r` => `\\r`
/// - `\t` => `\\t`
/// - backslash => `\\\\`
/// - other control characters, IRC formatting included => `\xNN`
///
/// Output is capped with an ellipsis.
pub fn escape_log(s: &str) -> String {
    let mut out = String::with_capacity(s.len().min(MAX_PREVIEW) + 8);
    for (count, ch) in s.chars().enumerate() {
        if count >= MAX_PREVIEW {
            out.push('…');
            break;
        }
        match ch {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => {
                let _ = write!(&mut out, "\\x{:02X}", c as u32);
            }
            c => out.push(c),
        }
    }
    out
}

/// Remove mIRC formatting codes, including the digits of colour selections
/// (`\x03FF[,BB]`) and hex colours (`\x04RRGGBB[,RRGGBB]`).
pub fn strip_formatting(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            BOLD | RESET | MONOSPACE | REVERSE | ITALIC | STRIKETHROUGH | UNDERLINE => {}
            COLOR => {
                skip_color_digits(&mut chars, 2, |c| c.is_ascii_digit());
            }
            HEX_COLOR => {
                skip_color_digits(&mut chars, 6, |c| c.is_ascii_hexdigit());
            }
            c => out.push(c),
        }
    }
    out
}

// Consume `fg[,bg]` where each part is up to `width` characters accepted by `accept`.
fn skip_color_digits<I>(chars: &mut std::iter::Peekable<I>, width: usize, accept: fn(&char) -> bool)
where
    I: Iterator<Item = char> + Clone,
{
    let mut taken = 0;
    while taken < width && chars.next_if(accept).is_some() {
        taken += 1;
    }
    if taken == 0 {
        return;
    }
    // Only swallow the comma when a background colour follows it.
    let mut lookahead = chars.clone();
    if lookahead.next() == Some(',') && lookahead.next().as_ref().is_some_and(accept) {
        chars.next();
        let mut taken = 0;
        while taken < width && chars.next_if(accept).is_some() {
            taken += 1;
        }
    }
}
