//! Command-line arguments.

use clap::builder::BoolishValueParser;
use clap::{ArgAction, Parser};
use std::path::PathBuf;

/// Publish the pacman package cache to IPFS and refresh the sync databases
/// from the IPFS mount.
#[derive(Debug, Parser)]
#[command(version, about)]
pub struct Cli {
    /// Refresh tracked sync databases from the store mount.
    #[arg(value_name = "SYNC_DB", action = ArgAction::Set, default_value_t = true, value_parser = BoolishValueParser::new())]
    pub sync_databases: bool,
    /// Delete package files from the cache once they are published.
    #[arg(value_name = "WIPE_CACHE", action = ArgAction::Set, default_value_t = true, value_parser = BoolishValueParser::new())]
    pub wipe_cache: bool,
    /// Configuration file [default: /etc/pacfs/config.toml]
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,
    /// Increase log verbosity (repeatable).
    #[arg(short, long, action = ArgAction::Count, conflicts_with = "quiet")]
    pub verbose: u8,
    /// Only log warnings and errors.
    #[arg(short, long)]
    pub quiet: bool,
}

impl Cli {
    pub fn options(&self) -> pacfs_sync::Options {
        pacfs_sync::Options { sync_databases: self.sync_databases, wipe_cache: self.wipe_cache }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use clap::error::ErrorKind;
    use rstest::rstest;

    #[test]
    fn test_command() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["pacfs"]).unwrap();
        assert!(cli.sync_databases);
        assert!(cli.wipe_cache);
        assert_eq!(cli.config, None);
        assert_eq!(cli.verbose, 0);
        assert!(!cli.quiet);
    }

    #[rstest]
    #[case(&["pacfs", "false"], false, true)]
    #[case(&["pacfs", "no", "0"], false, false)]
    #[case(&["pacfs", "yes", "off"], true, false)]
    #[case(&["pacfs", "1", "on"], true, true)]
    fn test_positionals(#[case] args: &[&str], #[case] sync_databases: bool, #[case] wipe_cache: bool) {
        let cli = Cli::try_parse_from(args).unwrap();
        assert_eq!(cli.options(), pacfs_sync::Options { sync_databases, wipe_cache });
    }

    #[test]
    fn test_flags() {
        let cli = Cli::try_parse_from(["pacfs", "-vv", "--config", "/tmp/pacfs.toml", "true", "false"]).unwrap();
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/pacfs.toml")));
        assert!(!cli.wipe_cache);
    }

    #[rstest]
    #[case(&["pacfs", "maybe"], ErrorKind::InvalidValue)]
    #[case(&["pacfs", "true", "true", "true"], ErrorKind::UnknownArgument)]
    #[case(&["pacfs", "-v", "-q"], ErrorKind::ArgumentConflict)]
    fn test_usage_errors(#[case] args: &[&str], #[case] expected: ErrorKind) {
        let err = Cli::try_parse_from(args).unwrap_err();
        assert_eq!(err.kind(), expected);
        assert_eq!(err.exit_code(), 2);
    }
}
