use anyhow::Result;
use clap::Parser;

use soracom_mcp::agent::config::{Config, Overrides};
use soracom_mcp::agent::daemon;
use soracom_mcp::client::Coverage;
use soracom_mcp::utils::logging::{self, LogLevel};

#[derive(Parser)]
#[command(name = "soracom-mcp", version, about = "SORACOM API tool server over stdio")]
struct AppCli {
    /// SORACOM CLI profile to read credentials from (~/.soracom/<name>.json)
    #[arg(long)]
    profile: Option<String>,

    /// API coverage: jp or g
    #[arg(long)]
    coverage: Option<Coverage>,

    /// DEBUG, INFO, WARN or ERROR
    #[arg(long)]
    log_level: Option<LogLevel>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = AppCli::parse();
    let config = Config::from_env(&Overrides {
        profile: args.profile,
        coverage: args.coverage,
        log_level: args.log_level,
    })?;

    logging::init(config.log_level);
    daemon::run(config).await?;

    // The stdin reader thread can still be parked in a blocking read.
    std::process::exit(0);
}
