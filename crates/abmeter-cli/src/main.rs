use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use abmeter_core::{run_comparison, AbmeterError, HarnessConfig};

/// Run the same request batch through a baseline and a resilient HTTP client
/// configuration, printing one summary report per run.
#[derive(Parser, Debug)]
#[command(name = "abmeter", version)]
struct Cli {
    /// Target origin, e.g. https://api.example.com
    #[arg(long)]
    base_url: String,

    /// Path of the POST endpoint
    #[arg(long, default_value = "/v1/track-event")]
    path: String,

    /// Bearer token; falls back to the ABMETER_API_KEY environment variable
    #[arg(long)]
    api_key: Option<String>,

    /// Total number of requests per run
    #[arg(long, default_value_t = 2000)]
    requests: usize,

    /// Maximum concurrent in-flight requests
    #[arg(long, default_value_t = 50)]
    parallelism: usize,

    /// Pause between the two runs, in seconds
    #[arg(long, default_value_t = 3)]
    cooldown_secs: u64,

    /// Value of the fixed `event` form field
    #[arg(long, default_value = "LoadTest Event")]
    event: String,

    /// Prefix of the per-request `id` form field
    #[arg(long, default_value = "test-user")]
    id_prefix: String,

    /// Print summaries as JSON instead of the text report
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    if let Err(err) = run(cli).await {
        eprintln!("abmeter: {err}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), AbmeterError> {
    let api_key = cli
        .api_key
        .or_else(|| std::env::var("ABMETER_API_KEY").ok())
        .ok_or_else(|| {
            AbmeterError::Validation(
                "no API key: pass --api-key or set ABMETER_API_KEY".to_string(),
            )
        })?;

    let mut config = HarnessConfig::new(cli.base_url, api_key);
    config.endpoint_path = cli.path;
    config.total_requests = cli.requests;
    config.parallelism = cli.parallelism;
    config.cooldown = Duration::from_secs(cli.cooldown_secs);
    config.event_name = cli.event;
    config.id_prefix = cli.id_prefix;

    let outcome = run_comparison(&config).await?;

    if cli.json {
        let reports = serde_json::to_string_pretty(&[&outcome.baseline, &outcome.resilient])
            .map_err(|e| AbmeterError::Internal(e.to_string()))?;
        println!("{reports}");
    } else {
        print!("{}", outcome.baseline.render_report());
        println!();
        print!("{}", outcome.resilient.render_report());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_arguments() {
        let cli = Cli::try_parse_from(["abmeter", "--base-url", "https://api.example.com"])
            .expect("should parse");
        assert_eq!(cli.base_url, "https://api.example.com");
        assert_eq!(cli.requests, 2000);
        assert_eq!(cli.parallelism, 50);
        assert_eq!(cli.cooldown_secs, 3);
        assert_eq!(cli.path, "/v1/track-event");
        assert!(!cli.json);
    }

    #[test]
    fn parses_full_argument_set() {
        let cli = Cli::try_parse_from([
            "abmeter",
            "--base-url",
            "https://api.example.com",
            "--api-key",
            "secret",
            "--requests",
            "100",
            "--parallelism",
            "10",
            "--cooldown-secs",
            "1",
            "--event",
            "Smoke Event",
            "--id-prefix",
            "smoke",
            "--json",
        ])
        .expect("should parse");
        assert_eq!(cli.api_key.as_deref(), Some("secret"));
        assert_eq!(cli.requests, 100);
        assert_eq!(cli.parallelism, 10);
        assert_eq!(cli.event, "Smoke Event");
        assert_eq!(cli.id_prefix, "smoke");
        assert!(cli.json);
    }

    #[test]
    fn base_url_is_required() {
        assert!(Cli::try_parse_from(["abmeter"]).is_err());
    }
}
