use super::*;
use std::path::Path;
use vidlink_core::ManagerKind;

fn parse(args: &[&str]) -> Cli {
    Cli::try_parse_from(args).unwrap()
}

#[test]
fn cli_parse_init_default_config() {
    let cli = parse(&["vidlink", "init"]);
    assert!(matches!(cli.command, CliCommand::Init));
    assert_eq!(cli.config, PathBuf::from("vidlink.toml"));
}

#[test]
fn cli_parse_global_config_after_subcommand() {
    let cli = parse(&["vidlink", "show-config", "--config", "course.toml"]);
    assert!(matches!(cli.command, CliCommand::ShowConfig));
    assert_eq!(cli.config, PathBuf::from("course.toml"));
}

#[test]
fn cli_parse_collect_defaults() {
    match parse(&["vidlink", "collect"]).command {
        CliCommand::Collect { start, end, output } => {
            assert!(start.is_none());
            assert!(end.is_none());
            assert!(output.is_none());
        }
        _ => panic!("expected Collect"),
    }
}

#[test]
fn cli_parse_collect_range_and_output() {
    match parse(&[
        "vidlink", "collect", "--start", "5504", "--end", "5510", "-o", "links.txt",
    ])
    .command
    {
        CliCommand::Collect { start, end, output } => {
            assert_eq!(start, Some(5504));
            assert_eq!(end, Some(5510));
            assert_eq!(output.as_deref(), Some(Path::new("links.txt")));
        }
        _ => panic!("expected Collect with range"),
    }
}

#[test]
fn cli_parse_dispatch_modes() {
    match parse(&["vidlink", "dispatch", "--mode", "idm"]).command {
        CliCommand::Dispatch {
            mode,
            links,
            report,
            destination,
        } => {
            assert_eq!(mode, DispatchMode::Manager(ManagerKind::Idm));
            assert!(links.is_none());
            assert!(report.is_none());
            assert!(destination.is_none());
        }
        _ => panic!("expected Dispatch"),
    }

    match parse(&[
        "vidlink",
        "dispatch",
        "-m",
        "clipboard",
        "--links",
        "course.txt",
        "--report",
        "report.json",
    ])
    .command
    {
        CliCommand::Dispatch {
            mode,
            links,
            report,
            ..
        } => {
            assert_eq!(mode, DispatchMode::Clipboard);
            assert_eq!(links.as_deref(), Some(Path::new("course.txt")));
            assert_eq!(report.as_deref(), Some(Path::new("report.json")));
        }
        _ => panic!("expected Dispatch with links and report"),
    }
}

#[test]
fn cli_parse_dispatch_rejects_unknown_mode() {
    assert!(Cli::try_parse_from(["vidlink", "dispatch", "--mode", "ftp"]).is_err());
    assert!(Cli::try_parse_from(["vidlink", "dispatch"]).is_err());
}

#[test]
fn cli_parse_list() {
    match parse(&["vidlink", "list", "--links", "old.txt"]).command {
        CliCommand::List { links } => {
            assert_eq!(links.as_deref(), Some(Path::new("old.txt")));
        }
        _ => panic!("expected List"),
    }
}

#[test]
fn load_config_optional_falls_back_to_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("vidlink.toml");
    assert_eq!(load_config(&missing, false).unwrap(), AppConfig::default());
    assert!(load_config(&missing, true).is_err());
}

#[test]
fn load_config_reads_existing_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("vidlink.toml");
    std::fs::write(&path, "[range]\nstart = 7\nend = 9\n").unwrap();
    let cfg = load_config(&path, true).unwrap();
    assert_eq!(cfg.range.start, 7);
    assert_eq!(cfg.range.end, 9);
}
