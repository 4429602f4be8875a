use super::*;

#[test]
fn parses_db_ping_command() {
    let cli =
        Cli::try_parse_from(["pulsevest-cli", "db", "ping"]).expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Some(Commands::Db {
            command: DbCommands::Ping
        })
    ));
}

#[test]
fn parses_db_migrate_command() {
    let cli =
        Cli::try_parse_from(["pulsevest-cli", "db", "migrate"]).expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Some(Commands::Db {
            command: DbCommands::Migrate
        })
    ));
}

#[test]
fn no_command_is_none() {
    let cli = Cli::try_parse_from(["pulsevest-cli"]).expect("expected valid cli args");
    assert!(cli.command.is_none());
}

#[test]
fn db_requires_a_subcommand() {
    assert!(Cli::try_parse_from(["pulsevest-cli", "db"]).is_err());
}

#[test]
fn unknown_db_subcommand_is_rejected() {
    assert!(Cli::try_parse_from(["pulsevest-cli", "db", "seed"]).is_err());
}
