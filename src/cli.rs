// Command-line definitions using clap

use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Default, Parser)]
#[command(name = "macrokeyd")]
#[command(version, about = "Linux macro-keyboard daemon")]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Fork into the background (classic daemon mode; not implemented yet)
    #[arg(short, long)]
    pub daemon: bool,

    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_the_three_flags() {
        let cli = Cli::parse_from(["macrokeyd", "-c", "/tmp/mk.conf", "-d", "-vv"]);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/mk.conf")));
        assert!(cli.daemon);
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn all_flags_are_optional() {
        let cli = Cli::parse_from(["macrokeyd"]);
        assert_eq!(cli.config, None);
        assert!(!cli.daemon);
        assert_eq!(cli.verbose, 0);
    }
}
