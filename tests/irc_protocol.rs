use shalebot::irc::{IrcCommand, IrcEvent, IrcMessage};

#[test]
fn welcome_join_and_channel_text() {
    let lines = [
        ":irc.example.net 001 jadebot :Welcome to the network",
        ":jadebot!~jade@host JOIN #jadebotdev",
        ":alice!~a@host PRIVMSG #jadebotdev :;tell bob hi there",
        ":alice!~a@host PRIVMSG jadebot :psst",
        ":irc.example.net 372 jadebot :- motd line",
    ];
    let events: Vec<Option<IrcEvent>> = lines
        .iter()
        .map(|l| IrcMessage::parse(l).and_then(|m| IrcEvent::from_message(&m)))
        .collect();
    assert_eq!(
        events,
        vec![
            Some(IrcEvent::Welcome),
            Some(IrcEvent::Joined { channel: "#jadebotdev".into(), nick: "jadebot".into() }),
            Some(IrcEvent::Message {
                sender: "alice".into(),
                target: "#jadebotdev".into(),
                text: ";tell bob hi there".into(),
            }),
            Some(IrcEvent::Message {
                sender: "alice".into(),
                target: "jadebot".into(),
                text: "psst".into(),
            }),
            None,
        ]
    );
}

#[test]
fn privmsg_without_sender_is_ignored() {
    let msg = IrcMessage::parse("PRIVMSG #c :orphan").unwrap();
    assert_eq!(IrcEvent::from_message(&msg), None);
}

#[test]
fn registration_lines() {
    assert_eq!(IrcCommand::Nick("jadebot".into()).to_line(), "NICK jadebot");
    assert_eq!(
        IrcCommand::User { username: "jadebot".into(), realname: "jadebot".into() }.to_line(),
        "USER jadebot 0 * :jadebot"
    );
    assert_eq!(IrcCommand::Join("#jadebotdev".into()).to_line(), "JOIN #jadebotdev");
}
