pub mod commands;
pub mod config;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Log at debug level
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Also write logs to a file (default location when no path is given)
    #[arg(long, global = true)]
    pub log_file: Option<Option<PathBuf>>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Crawl from seed URLs, or resume an interrupted crawl
    Crawl {
        /// URLs to start from; ignored when a previous run left pending URLs
        #[arg(long, num_args = 1..)]
        urls: Vec<String>,

        /// Directory for fetched pages, created if absent
        #[arg(long)]
        dest: Option<PathBuf>,

        /// Number of concurrent fetch workers
        #[arg(short, long)]
        workers: Option<usize>,

        /// Configuration profile to use
        #[arg(short, long)]
        profile: Option<String>,
    },

    /// Show dedup store and checkpoint counts
    Status {
        /// Configuration profile to use
        #[arg(short, long)]
        profile: Option<String>,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Forget every recorded URL and any saved pending list
    Reset {
        /// Configuration profile to use
        #[arg(short, long)]
        profile: Option<String>,
    },

    /// Manage configuration profiles
    Config {
        /// Profile name to manage
        #[arg(required = false)]
        profile: Option<String>,

        /// List all available profiles
        #[arg(short, long)]
        list: bool,
    },
}

/// Parse command line arguments
pub fn parse_args() -> Cli {
    Cli::parse()
}

impl Cli {
    /// Log file requested on the command line, if any
    pub fn log_file(&self) -> Option<PathBuf> {
        self.log_file
            .clone()
            .map(|path| path.unwrap_or_else(crate::utils::default_log_file))
    }
}

/// Process the command
pub async fn process_command(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Crawl { urls, dest, workers, profile } => {
            info!("Starting crawl with {} seed URLs", urls.len());
            commands::crawl(urls, dest, workers, profile).await
        },
        Commands::Status { profile, json } => {
            commands::status(profile, json).await
        },
        Commands::Reset { profile } => {
            info!("Resetting dedup store");
            commands::reset(profile).await
        },
        Commands::Config { profile, list } => {
            if list {
                info!("Listing all configuration profiles");
                commands::list_profiles().await
            } else if let Some(profile_name) = profile {
                info!("Managing configuration profile: {}", profile_name);
                commands::manage_profile(profile_name).await
            } else {
                info!("Showing current configuration");
                commands::show_config().await
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert()
    }

    #[test]
    fn crawl_accepts_several_seed_urls() {
        let cli = Cli::parse_from([
            "crawler", "crawl", "--urls", "http://a.test/", "https://b.test/", "--dest", "out",
        ]);

        match cli.command {
            Commands::Crawl { urls, dest, workers, .. } => {
                assert_eq!(urls, vec!["http://a.test/", "https://b.test/"]);
                assert_eq!(dest, Some(PathBuf::from("out")));
                assert_eq!(workers, None);
            }
            _ => panic!("expected crawl command"),
        }
    }

    #[test]
    fn crawl_without_urls_is_a_resume() {
        let cli = Cli::parse_from(["crawler", "crawl", "--workers", "3"]);

        assert!(matches!(cli.command, Commands::Crawl { ref urls, workers: Some(3), .. } if urls.is_empty()));
    }

    #[test]
    fn log_file_without_path_uses_default_location() {
        let cli = Cli::parse_from(["crawler", "status", "--log-file"]);
        assert_eq!(cli.log_file(), Some(crate::utils::default_log_file()));

        let cli = Cli::parse_from(["crawler", "status"]);
        assert_eq!(cli.log_file(), None);
    }
}
