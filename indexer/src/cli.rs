use clap::Parser;
use std::path::PathBuf;

/// Every flag can also be set through the upper-case environment variable named after it.
#[derive(Parser, Debug, Default)]
#[command(name = "alicenet-indexer")]
#[command(about = "Indexes AliceNet blocks, transactions and balances into SQLite", long_about = None)]
pub struct Args {
    /// Path to configuration file (optional, uses defaults if not provided)
    #[arg(short, long, env = "CONFIG_PATH")]
    pub config_path: Option<PathBuf>,

    /// Base URL of the node's local-state API
    #[arg(short, long, env = "API_URL")]
    pub api_url: Option<String>,

    /// SQLite database file
    #[arg(short, long, env = "DATABASE")]
    pub database: Option<PathBuf>,

    /// Seconds to wait between scan cycles
    #[arg(long, env = "POLL_INTERVAL_SECS")]
    pub poll_interval_secs: Option<u64>,

    /// First height to index when no progress has been stored yet
    #[arg(long, env = "START_HEIGHT")]
    pub start_height: Option<u32>,

    /// Serve Prometheus metrics on this port
    #[arg(long, env = "METRICS_PORT")]
    pub metrics_port: Option<u16>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Emit logs as JSON
    #[arg(long, env = "LOG_JSON")]
    pub log_json: bool,
}

pub fn parse_args() -> Args {
    Args::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flags() {
        let args = Args::try_parse_from([
            "alicenet-indexer",
            "--api-url",
            "node.example:8748",
            "--database",
            "/tmp/index.db",
            "--start-height",
            "100",
            "--log-json",
        ])
        .unwrap();

        assert_eq!(args.api_url.as_deref(), Some("node.example:8748"));
        assert_eq!(args.database, Some(PathBuf::from("/tmp/index.db")));
        assert_eq!(args.start_height, Some(100));
        assert!(args.log_json);
        assert_eq!(args.metrics_port, None);
    }
}
