use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "insider-sentinel", about = "SEC Form 4 insider-trading anomaly detection")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the HTTP API server plus the background filing monitor and job scheduler.
    Serve,
    /// Fetch and store Form 4 transactions for the given tickers (or the full universe).
    Ingest {
        #[arg(long)]
        tickers: Vec<String>,
        #[arg(long, default_value_t = 90)]
        days_back: i64,
    },
    /// Run anomaly analysis for a single ticker and print the resulting signal.
    Analyze {
        ticker: String,
    },
    /// Run anomaly analysis across the universe and print a summary.
    Scan,
    /// Run the dual-path filing monitor in the foreground until interrupted.
    Monitor,
    /// Print active (undelivered) alerts.
    Alerts {
        #[arg(long, default_value_t = 50)]
        limit: i64,
    },
    /// Reload the ticker universe CSV from disk.
    UniverseRefresh,
}
