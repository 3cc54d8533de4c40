//! Report on recently seen delay alerts: routes, causes, daily and hourly trends.
//!
//! Usage:
//!   cargo run --bin alert-report               # last 7 days, text
//!   cargo run --bin alert-report -- --days 30 --json

use chrono::Utc;
use clap::Parser;
use transit_alerts::app::report_use_case::ReportUseCase;
use transit_alerts::config::Config;
use transit_alerts::constants::{DEFAULT_REPORT_DAYS, MAX_REPORT_DAYS};
use transit_alerts::infra::build_store;

#[derive(Parser)]
#[command(name = "alert-report")]
#[command(about = "Summarize recently seen subway delay alerts")]
struct Cli {
    /// How many days back to look, by last seen time (1 to 3650)
    #[arg(
        long,
        default_value_t = DEFAULT_REPORT_DAYS,
        value_parser = clap::value_parser!(i64).range(1..=MAX_REPORT_DAYS)
    )]
    days: i64,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::load()?;
    let store = build_store(&config).await?;
    let report = ReportUseCase::new(store)
        .run(Utc::now().naive_utc(), cli.days)
        .await?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{report}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn days_defaults_to_a_week() {
        let cli = Cli::try_parse_from(["alert-report"]).unwrap();
        assert_eq!(cli.days, DEFAULT_REPORT_DAYS);
        assert!(!cli.json);
    }

    #[test]
    fn days_outside_range_are_rejected() {
        for days in ["0", "-3", "3651", "1000000000000"] {
            assert!(
                Cli::try_parse_from(["alert-report", "--days", days]).is_err(),
                "--days {days} should be rejected"
            );
        }
        let cli = Cli::try_parse_from(["alert-report", "--days", "30", "--json"]).unwrap();
        assert_eq!(cli.days, 30);
        assert!(cli.json);
    }
}
