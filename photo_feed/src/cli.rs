//! Command-line interface definitions using clap derive API.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::settings::Settings;

/// Photo feed service CLI
#[derive(Parser)]
#[command(name = "photo-feed")]
#[command(about = "Serves paginated, sortable views of a periodically refreshed photo collection")]
#[command(version)]
pub struct Cli {
    /// Configuration file layered over the built-in defaults
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP server and the refresh schedule
    Serve {
        /// Interface to bind to
        #[arg(long)]
        host: Option<String>,
        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,
        /// Seconds between refresh cycles
        #[arg(long)]
        interval: Option<u64>,
        /// URL of the remote photo collection
        #[arg(long)]
        source_url: Option<String>,
        /// Directory of static files to serve for unmatched paths
        #[arg(long)]
        static_dir: Option<PathBuf>,
    },
    /// Run a single refresh cycle and print the merge report
    Fetch {
        /// URL of the remote photo collection
        #[arg(long)]
        source_url: Option<String>,
    },
}

impl Commands {
    /// Apply command-line flags on top of loaded settings.
    pub fn apply_overrides(&self, settings: &mut Settings) {
        match self {
            Commands::Serve {
                host,
                port,
                interval,
                source_url,
                static_dir,
            } => {
                if let Some(host) = host {
                    settings.server.host = host.clone();
                }
                if let Some(port) = port {
                    settings.server.port = *port;
                }
                if let Some(interval) = interval {
                    settings.refresh.interval_seconds = *interval;
                }
                if let Some(url) = source_url {
                    settings.refresh.source_url = url.clone();
                }
                if let Some(dir) = static_dir {
                    settings.server.static_dir = Some(dir.clone());
                }
            }
            Commands::Fetch { source_url } => {
                if let Some(url) = source_url {
                    settings.refresh.source_url = url.clone();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serve_flags_override_settings() {
        let cli = Cli::parse_from([
            "photo-feed",
            "serve",
            "--port",
            "4000",
            "--interval",
            "15",
            "--source-url",
            "http://localhost:9/photos",
        ]);

        let mut settings = Settings::default();
        cli.command.apply_overrides(&mut settings);
        assert_eq!(settings.server.port, 4000);
        assert_eq!(settings.refresh.interval_seconds, 15);
        assert_eq!(settings.refresh.source_url, "http://localhost:9/photos");
        assert_eq!(settings.server.host, "0.0.0.0");
    }

    #[test]
    fn test_global_config_flag() {
        let cli = Cli::parse_from(["photo-feed", "fetch", "--config", "custom.toml"]);
        assert_eq!(cli.config, Some(PathBuf::from("custom.toml")));
        assert!(matches!(cli.command, Commands::Fetch { source_url: None }));
    }
}
