use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Command line interface for the dirjanitor application.
#[derive(Parser, Debug, Default)]
#[command(author, version, about)]
pub struct Cli {
    /// Path to configuration file.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    /// Directory to clean.
    #[arg(long, global = true)]
    pub directory: Option<PathBuf>,
    /// Remove entries older than this many days.
    #[arg(long, global = true)]
    pub retention_days: Option<u32>,
    /// Seconds between two cleanup passes.
    #[arg(long, global = true)]
    pub frequency_secs: Option<u64>,
    /// Enable or disable logging (true/false).
    #[arg(long, global = true)]
    pub logging: Option<bool>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Default, Clone, PartialEq, Eq)]
pub enum Command {
    /// Clean the directory periodically until Ctrl+C.
    #[default]
    Run,
    /// Run a single cleanup pass and print what happened.
    Clean {
        /// Print the report as JSON.
        #[arg(long)]
        json: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_clean_with_overrides() {
        let cli = Cli::try_parse_from([
            "dirjanitor",
            "clean",
            "--json",
            "--directory",
            "/tmp/uploads",
            "--retention-days",
            "3",
        ])
        .unwrap();
        assert_eq!(cli.command, Command::Clean { json: true });
        assert_eq!(cli.directory, Some(PathBuf::from("/tmp/uploads")));
        assert_eq!(cli.retention_days, Some(3));
    }

    #[test]
    fn subcommand_is_required() {
        assert!(Cli::try_parse_from(["dirjanitor"]).is_err());
    }
}
