//! `ask` command: pick one of the offered options at random.
//!
//! Behavior:
//! - Stateless: no persistence; options come from [`super::commands::parse_ask_options`]
//! - With no usable options the neutral reply is returned instead

use rand::seq::SliceRandom;

use super::commands::ASK_NEUTRAL_REPLY;

/// Choose uniformly among `options`, or the neutral reply when empty.
pub fn choose(options: &[String]) -> &str {
    let mut rng = rand::thread_rng();
    options
        .choose(&mut rng)
        .map(String::as_str)
        .unwrap_or(ASK_NEUTRAL_REPLY)
}
