//! End-to-end command handling through the dispatcher.
mod common;

use common::Harness;
use shalebot::bot::hunt::CreatureKind;
use shalebot::config::Config;

#[test]
fn tells_are_delivered_in_order_then_cleared() {
    let mut h = Harness::new();
    assert_eq!(
        h.say("alice", ";tell bob first"),
        vec!["Okay, alice. I'll tell bob next time they speak."]
    );
    h.say("carol", ";tell BOB second");
    h.say("alice", ";tell bob third one");

    let out = h.say("Bob", "morning all");
    assert_eq!(
        out,
        vec![
            "Bob, alice said: first",
            "Bob, carol said: second",
            "Bob, alice said: third one",
        ]
    );
    assert_eq!(h.store.pending_tell_count("bob").unwrap(), 0);
    assert!(h.say("bob", "still here").is_empty());
}

#[test]
fn tell_needs_recipient_and_body() {
    let mut h = Harness::new();
    assert_eq!(h.say("alice", ";tell bob"), vec!["Usage: ;tell <username> <message>"]);
    assert_eq!(h.say("alice", ";tell"), vec!["Usage: ;tell <username> <message>"]);
}

#[test]
fn point_add_then_remove_nets_zero() {
    let mut h = Harness::new();
    assert_eq!(h.say("alice", ";addpoint bob"), vec!["alice: You now have 1 points for bob."]);
    assert_eq!(h.say("alice", ";rp bob"), vec!["alice: You now have 0 points for bob."]);
    assert_eq!(h.say("bob", ";ap alice"), vec!["bob: You now have 1 points for alice."]);
    assert_eq!(h.store.points("alice", "bob").unwrap(), 0);
    assert_eq!(h.store.points("bob", "alice").unwrap(), 1);
    assert_eq!(h.say("alice", ";ap"), vec!["Usage: ;addpoint <username>"]);
    assert_eq!(h.say("alice", ";rmpoint"), vec!["Usage: ;rmpoint <username>"]);
}

#[test]
fn badge_lifecycle() {
    let mut h = Harness::new();
    assert_eq!(h.say("alice", ";badge"), vec!["User alice has no badges."]);
    assert_eq!(
        h.say("alice", r#";badge -add -name="Rockhound" -date="today""#),
        vec!["User alice added badge 'Rockhound'."]
    );
    assert_eq!(
        h.say("alice", r#";badge -add -name="Fossil Finder" -date="3 days ago""#),
        vec!["User alice added badge 'Fossil Finder'."]
    );
    assert_eq!(
        h.say("alice", ";badges"),
        vec!["User alice's badges: Fossil Finder (3 days), Rockhound (0 days)"]
    );

    // Duplicate keeps the original date.
    assert_eq!(
        h.say("alice", r#";badge -add -name="Rockhound" -date="40 days ago""#),
        vec!["alice, you already have a badge named 'Rockhound'."]
    );
    assert!(h.say("alice", ";badge")[0].contains("Rockhound (0 days)"));

    assert_eq!(
        h.say("alice", r#";badge -delete -name="Geode""#),
        vec!["No badge named 'Geode' found under your nickname, alice."]
    );
    assert_eq!(
        h.say("alice", r#";badge delete -name="Rockhound""#),
        vec!["User alice deleted their badge 'Rockhound'."]
    );
    assert_eq!(
        h.say("alice", ";badge"),
        vec!["User alice's badges: Fossil Finder (3 days)"]
    );
}

#[test]
fn badge_add_reports_what_is_missing() {
    let mut h = Harness::new();
    let out = h.say("alice", r#";badge -add -date="today""#);
    assert!(out[0].starts_with("Missing -name="), "{out:?}");
    let out = h.say("alice", r#";badge -add -name="X""#);
    assert!(out[0].starts_with("Missing -date="), "{out:?}");
}

#[test]
fn opaque_badge_date_ages_as_zero() {
    let mut h = Harness::new();
    h.say("alice", r#";badge -add -name="Old" -date="back in the day""#);
    assert_eq!(h.say("alice", ";badge"), vec!["User alice's badges: Old (0 days)"]);
}

#[test]
fn ask_picks_an_option_or_shrugs() {
    let mut h = Harness::new();
    for _ in 0..20 {
        let out = h.say("alice", ";ask tea or coffee");
        assert!(out == vec!["tea"] || out == vec!["coffee"], "{out:?}");
    }
    assert_eq!(h.say("alice", ";ask tea"), vec!["perhaps"]);
    assert_eq!(h.say("alice", ";ask tea or  "), vec!["perhaps"]);
    assert_eq!(h.say("alice", ";ask"), vec!["perhaps"]);
}

#[test]
fn hunt_commands_through_dispatcher() {
    let mut h = Harness::new();
    assert_eq!(h.say("alice", ";bef"), vec!["There was no animal, sowwy!"]);
    h.hunt.spawn_kind(CreatureKind::Pig);
    assert_eq!(h.drain(), vec![CreatureKind::Pig.sound()]);
    assert_eq!(
        h.say("alice", ";BEF"),
        vec!["alice befriended the pig! You have now befriended 1 and shot 0."]
    );
    assert_eq!(h.say("bob", ";bang"), vec!["There was no animal, sowwy!"]);
    assert_eq!(h.say("alice", ";huntscore"), vec!["alice's hunt stats: befriended 1, shot 0."]);
}

#[test]
fn weather_without_location_shows_usage() {
    let mut h = Harness::new();
    assert_eq!(h.say("alice", ";weather"), vec!["Usage: ;weather <location>"]);
    assert_eq!(h.say("alice", ";weather   "), vec!["Usage: ;weather <location>"]);
}

#[test]
fn unknown_commands_and_chatter() {
    let mut h = Harness::new();
    assert!(h.say("alice", "weather is nice today").is_empty());
    assert_eq!(
        h.say("alice", ";apple"),
        vec!["alice: unrecognized command ';apple'. Try ;help."]
    );
    let help = h.say("alice", ";help");
    assert_eq!(help.len(), 1);
    assert!(help[0].starts_with("Commands: ;weather"));
}

#[test]
fn configured_prefix_is_used_everywhere() {
    let mut config = Config::default();
    config.bot.command_prefix = "!".to_string();
    let mut h = Harness::with_config(config);
    assert!(h.say("alice", ";huntscore").is_empty());
    assert_eq!(h.say("alice", "!huntscore"), vec!["alice's hunt stats: befriended 0, shot 0."]);
    assert_eq!(h.say("alice", "!tell"), vec!["Usage: !tell <username> <message>"]);
}

#[tokio::test]
async fn weather_failure_is_reported_not_raised() {
    let mut h = Harness::new();
    h.dispatcher.handle_message("alice", ";weather Boulder, CO");
    let reply = tokio::time::timeout(std::time::Duration::from_secs(5), h.rx.recv())
        .await
        .expect("reply in time")
        .expect("channel open");
    assert!(reply.starts_with("Could not get weather for 'Boulder, CO': "), "{reply}");
}
