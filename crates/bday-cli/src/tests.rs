use super::*;

#[test]
fn parses_fetch_command() {
    let cli = Cli::try_parse_from(["bday", "fetch"]).expect("expected valid cli args");
    assert!(matches!(cli.command, Commands::Fetch { dry_run: false }));
}

#[test]
fn parses_fetch_dry_run() {
    let cli = Cli::try_parse_from(["bday", "fetch", "--dry-run"]).unwrap();
    assert!(matches!(cli.command, Commands::Fetch { dry_run: true }));
}

#[test]
fn parses_capture_and_pending() {
    let cli = Cli::try_parse_from(["bday", "capture"]).unwrap();
    assert!(matches!(cli.command, Commands::Capture));

    let cli = Cli::try_parse_from(["bday", "pending"]).unwrap();
    assert!(matches!(cli.command, Commands::Pending));
}

#[test]
fn mark_posted_defaults_card_url_to_marker() {
    let cli = Cli::try_parse_from(["bday", "mark-posted", "42"]).unwrap();
    match cli.command {
        Commands::MarkPosted { id, card_url } => {
            assert_eq!(id, 42);
            assert_eq!(card_url, "true");
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn mark_posted_accepts_explicit_card_url() {
    let cli = Cli::try_parse_from([
        "bday",
        "mark-posted",
        "7",
        "--card-url",
        "https://cdn.test/card.png",
    ])
    .unwrap();
    assert!(matches!(
        cli.command,
        Commands::MarkPosted { id: 7, ref card_url } if card_url == "https://cdn.test/card.png"
    ));
}

#[test]
fn mark_posted_requires_numeric_id() {
    assert!(Cli::try_parse_from(["bday", "mark-posted", "abc"]).is_err());
}

#[test]
fn missing_command_is_rejected() {
    assert!(Cli::try_parse_from(["bday"]).is_err());
}
